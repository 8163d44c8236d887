use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rhai::{Array, Dynamic, EvalAltResult, ImmutableString, NativeCallContext};
use se_core::{Diagnostic, ScriptEngineError};

use crate::engine::{ContextPool, ScriptEngine};
use crate::helpers::rhai_bridge::runtime_error;
use crate::module::{ModuleRegistry, ScriptFunction, ScriptModule};

#[derive(Debug)]
pub struct ScriptFile {
    name: String,
    path: Option<PathBuf>,
    module: Rc<ScriptModule>,
}

impl ScriptFile {
    pub fn from_source(
        engine: &mut ScriptEngine,
        name: &str,
        source: &str,
    ) -> Result<Self, ScriptEngineError> {
        let module = engine.compile_module(name, name, source)?;
        Ok(Self {
            name: name.to_string(),
            path: None,
            module,
        })
    }

    pub fn load(engine: &mut ScriptEngine, path: impl AsRef<Path>) -> Result<Self, ScriptEngineError> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .ok_or_else(|| {
                ScriptEngineError::new(
                    "SCRIPT_FILE_READ",
                    format!("Script path \"{}\" has no file name.", path.display()),
                )
            })?;
        let module = compile_path(engine, &name, path)?;
        Ok(Self {
            name,
            path: Some(path.to_path_buf()),
            module,
        })
    }

    pub fn reload(&mut self, engine: &mut ScriptEngine) -> Result<(), ScriptEngineError> {
        let Some(path) = self.path.as_deref() else {
            return Err(ScriptEngineError::new(
                "SCRIPT_FILE_READ",
                format!("Script \"{}\" was not loaded from a file.", self.name),
            ));
        };
        self.module = compile_path(engine, &self.name, path)?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn module(&self) -> &Rc<ScriptModule> {
        &self.module
    }

    pub fn function(&self, name: &str) -> Option<ScriptFunction> {
        ScriptFunction::find(&self.module, name)
    }

    pub fn execute(
        &self,
        engine: &ScriptEngine,
        function: &str,
        arguments: Vec<Dynamic>,
    ) -> Result<Dynamic, ScriptEngineError> {
        let Some(resolved) = self.function(function) else {
            let error = ScriptEngineError::new(
                "SCRIPT_FUNCTION_NOT_FOUND",
                format!(
                    "Function \"{}\" was not found in script \"{}\".",
                    function, self.name
                ),
            );
            engine.log_message(&Diagnostic::error(self.module.section(), error.message.as_str()));
            return Err(error);
        };
        engine.call_function(&resolved, arguments)
    }
}

fn compile_path(
    engine: &mut ScriptEngine,
    name: &str,
    path: &Path,
) -> Result<Rc<ScriptModule>, ScriptEngineError> {
    let source = fs::read_to_string(path).map_err(|error| {
        ScriptEngineError::new(
            "SCRIPT_FILE_READ",
            format!("Failed to read script \"{}\": {}", path.display(), error),
        )
    })?;
    engine.compile_module(name, &path.display().to_string(), &source)
}

/// Installs `call_script(module, function)` and `call_script(module, function, args)`.
pub fn register_script_file_api(engine: &mut ScriptEngine) {
    let registry = engine.module_registry();
    let pool = engine.context_pool();
    let (registry_with_args, pool_with_args) = (Rc::clone(&registry), Rc::clone(&pool));

    let rhai = engine.rhai_engine_mut();
    rhai.register_fn(
        "call_script",
        move |context: NativeCallContext, module: ImmutableString, function: ImmutableString| {
            call_script(&context, &registry, &pool, &module, &function, Array::new())
        },
    );
    rhai.register_fn(
        "call_script",
        move |context: NativeCallContext,
              module: ImmutableString,
              function: ImmutableString,
              arguments: Array| {
            call_script(
                &context,
                &registry_with_args,
                &pool_with_args,
                &module,
                &function,
                arguments,
            )
        },
    );
}

fn call_script(
    context: &NativeCallContext,
    registry: &RefCell<ModuleRegistry>,
    pool: &ContextPool,
    module: &str,
    function: &str,
    arguments: Array,
) -> Result<Dynamic, Box<EvalAltResult>> {
    let resolved = registry.borrow().function(module, function);
    let Some(resolved) = resolved else {
        return Err(runtime_error(
            format!("Script function \"{}::{}\" was not found.", module, function),
            context.position(),
        ));
    };
    pool.call(context.engine(), resolved, arguments)
        .map_err(|error| {
            // Thrown text passes through unchanged; other failures keep their code.
            let message = match error.code.as_str() {
                "ENGINE_EXECUTION" => error.message,
                _ => error.to_string(),
            };
            runtime_error(message, context.position())
        })
}

#[cfg(test)]
mod script_file_tests {
    use super::*;
    use crate::engine::MAX_SCRIPT_NESTING_LEVEL;
    use crate::runtime_test_support::*;
    use rhai::INT;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_script(name: &str, source: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("se-runtime-{}-{}", name, nanos));
        fs::create_dir_all(&dir).expect("temp dir should be created");
        let path = dir.join(format!("{}.rhai", name));
        fs::write(&path, source).expect("script should be written");
        path
    }

    #[test]
    fn from_source_executes_named_function_with_arguments() {
        let mut engine = retained_engine();
        let file = ScriptFile::from_source(&mut engine, "math", "fn add(a, b) { a + b }")
            .expect("script should compile");
        let value = file
            .execute(&engine, "add", vec![Dynamic::from(2 as INT), Dynamic::from(40 as INT)])
            .expect("add should run");
        assert_eq!(value.as_int().expect("int result"), 42);
        assert_eq!(file.name(), "math");
        assert!(file.path().is_none());
    }

    #[test]
    fn missing_function_fails_with_one_diagnostic() {
        let mut engine = retained_engine();
        let file = ScriptFile::from_source(&mut engine, "empty", "fn other() {}")
            .expect("script should compile");
        let error = file
            .execute(&engine, "main", Vec::new())
            .expect_err("missing function should fail");
        assert_eq!(error.code, "SCRIPT_FUNCTION_NOT_FOUND");
        let lines = retained_lines(&engine);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("empty (0,0)"), "{}", lines[0]);
    }

    #[test]
    fn nested_call_script_raises_nesting_level() {
        let mut engine = retained_engine();
        register_script_file_api(&mut engine);
        let _helper = ScriptFile::from_source(&mut engine, "helper", "fn twice(x) { x * 2 }\nfn one() { 1 }")
            .expect("helper should compile");
        let main = ScriptFile::from_source(
            &mut engine,
            "main",
            "fn main() { call_script(\"helper\", \"twice\", [20]) + call_script(\"helper\", \"one\") + 1 }",
        )
        .expect("main should compile");

        let value = main
            .execute(&engine, "main", Vec::new())
            .expect("nested call should pass");
        assert_eq!(value.as_int().expect("int result"), 42);
        assert_eq!(engine.highest_nesting_level(), 2);
        assert_eq!(engine.nesting_level(), 0);
        assert!(engine.log_messages().is_empty());
    }

    #[test]
    fn unknown_call_target_fails_the_caller() {
        let mut engine = retained_engine();
        register_script_file_api(&mut engine);
        let main = ScriptFile::from_source(&mut engine, "main", "fn main() { call_script(\"nope\", \"f\") }")
            .expect("main should compile");

        let error = main
            .execute(&engine, "main", Vec::new())
            .expect_err("unknown target should fail");
        assert_eq!(error.code, "ENGINE_EXECUTION");
        assert!(error.message.contains("nope::f"), "{}", error.message);
        assert_eq!(retained_lines(&engine).len(), 1);
    }

    #[test]
    fn nested_throw_reaches_the_caller_verbatim() {
        let mut engine = retained_engine();
        register_script_file_api(&mut engine);
        let _helper = ScriptFile::from_source(&mut engine, "helper", "fn fail() { throw \"bad input\"; }")
            .expect("helper should compile");
        let main = ScriptFile::from_source(&mut engine, "main", "fn main() { call_script(\"helper\", \"fail\") }")
            .expect("main should compile");

        let error = main
            .execute(&engine, "main", Vec::new())
            .expect_err("nested throw should fail the caller");
        assert_eq!(error.code, "ENGINE_EXECUTION");
        assert_eq!(error.message, "bad input");
        let location = error.location.expect("call site should be located");
        assert_eq!(location.line, 1);
        assert_eq!(
            retained_lines(&engine),
            vec![format!("main ({},{}) bad input", location.line, location.column)]
        );
    }

    #[test]
    fn runaway_recursion_stops_at_max_nesting_level() {
        // Every level nests a full rhai call, so give debug builds room.
        let worker = std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(|| {
                let mut engine = retained_engine();
                register_script_file_api(&mut engine);
                let file = ScriptFile::from_source(
                    &mut engine,
                    "loop",
                    "fn down() { call_script(\"loop\", \"down\") }",
                )
                .expect("loop should compile");

                let error = file
                    .execute(&engine, "down", Vec::new())
                    .expect_err("recursion should be bounded");
                assert_eq!(
                    error.message,
                    "ENGINE_NESTING_TOO_DEEP: Calling \"loop::down/0\" would exceed the maximum script nesting level of 32."
                );
                assert_eq!(engine.highest_nesting_level(), MAX_SCRIPT_NESTING_LEVEL);
                assert_eq!(engine.nesting_level(), 0);
                assert_eq!(retained_lines(&engine).len(), 1);

                engine.garbage_collect(false);
                assert_eq!(engine.highest_nesting_level(), 0);
            })
            .expect("worker should start");
        worker.join().expect("recursion test should pass");
    }

    #[test]
    fn load_and_reload_follow_the_file() {
        let mut engine = retained_engine();
        let path = temp_script("greeter", "fn value() { 1 }");
        let mut file = ScriptFile::load(&mut engine, &path).expect("script should load");
        assert_eq!(file.name(), "greeter");
        let first = Rc::clone(file.module());

        fs::write(&path, "fn value() { 2 }").expect("script should be rewritten");
        file.reload(&mut engine).expect("script should reload");
        assert!(first.is_discarded());
        let value = file
            .execute(&engine, "value", Vec::new())
            .expect("reloaded value should run");
        assert_eq!(value.as_int().expect("int result"), 2);

        drop(first);
        engine.garbage_collect(true);
        assert_eq!(engine.gc_statistics().total_destroyed, 1);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_and_reload_report_read_failures() {
        let mut engine = retained_engine();
        let error = ScriptFile::load(&mut engine, "/definitely/not/here.rhai")
            .expect_err("missing file should fail");
        assert_eq!(error.code, "SCRIPT_FILE_READ");

        let mut inline = ScriptFile::from_source(&mut engine, "inline", "fn f() {}")
            .expect("script should compile");
        let error = inline
            .reload(&mut engine)
            .expect_err("inline script has no file");
        assert_eq!(error.code, "SCRIPT_FILE_READ");
    }
}
