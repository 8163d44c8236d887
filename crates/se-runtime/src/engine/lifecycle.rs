use std::cell::RefCell;
use std::rc::Rc;

use rhai::packages::{BasicArrayPackage, CorePackage, MoreStringPackage, Package};
use rhai::{Dynamic, Engine};
use se_core::{Diagnostic, LogMode, ScriptEngineConfig, ScriptEngineError};
use tracing::{debug, debug_span, info};

use super::context::ScriptContext;
use super::context_pool::ContextPool;
use crate::diagnostics::{install_diagnostic_callbacks, DiagnosticLog, SharedDiagnosticLog};
use crate::gc::{GarbageCollector, GcStatistics};
use crate::helpers::rhai_bridge::compile_error;
use crate::module::{ModuleRegistry, ScriptFunction, ScriptModule};

/// Owns the rhai engine together with every context and module derived from it.
pub struct ScriptEngine {
    pub(super) rhai: Engine,
    config: ScriptEngineConfig,
    diagnostics: SharedDiagnosticLog,
    modules: Rc<RefCell<ModuleRegistry>>,
    pub(super) collector: GarbageCollector,
    pub(super) immediate_context: ScriptContext,
    pub(super) contexts: Rc<ContextPool>,
}

impl ScriptEngine {
    pub fn new(config: ScriptEngineConfig) -> Result<Self, ScriptEngineError> {
        config.validate().map_err(|error| {
            ScriptEngineError::new(
                "ENGINE_CREATE_FAILED",
                format!("Could not create script engine: {}", error.message),
            )
        })?;

        let mut rhai = Engine::new_raw();
        rhai.set_strict_variables(config.strict_variables)
            .set_allow_shadowing(config.allow_shadowing)
            .set_fast_operators(config.fast_operators)
            .set_max_call_levels(config.max_call_levels)
            .set_max_operations(config.max_operations)
            .set_max_expr_depths(config.max_expr_depth, config.max_function_expr_depth);
        info!("Script engine created");

        let diagnostics = Rc::new(RefCell::new(DiagnosticLog::new(config.log_mode)));
        install_diagnostic_callbacks(&mut rhai, &diagnostics);

        {
            let _span = debug_span!("script_register_builtin_types").entered();
            debug!("Registering array and string types");
            register_builtin_types(&mut rhai);
        }

        let contexts = Rc::new(ContextPool::new(Rc::clone(&diagnostics)));
        Ok(Self {
            rhai,
            config,
            diagnostics,
            modules: Rc::new(RefCell::new(ModuleRegistry::new())),
            collector: GarbageCollector::new(),
            immediate_context: ScriptContext::new(),
            contexts,
        })
    }

    pub fn config(&self) -> &ScriptEngineConfig {
        &self.config
    }

    pub fn rhai_engine(&self) -> &Engine {
        &self.rhai
    }

    pub fn rhai_engine_mut(&mut self) -> &mut Engine {
        &mut self.rhai
    }

    pub fn immediate_context(&self) -> &ScriptContext {
        &self.immediate_context
    }

    pub fn script_file_context(&self, level: usize) -> Option<&RefCell<ScriptContext>> {
        self.contexts.get(level)
    }

    pub fn nesting_level(&self) -> usize {
        self.contexts.nesting_level()
    }

    pub fn highest_nesting_level(&self) -> usize {
        self.contexts.highest_nesting_level()
    }

    pub fn log_mode(&self) -> LogMode {
        self.diagnostics.borrow().mode()
    }

    pub fn set_log_mode(&mut self, mode: LogMode) {
        self.diagnostics.borrow_mut().set_mode(mode);
    }

    pub fn clear_log_messages(&mut self) {
        self.diagnostics.borrow_mut().clear();
    }

    pub fn log_messages(&self) -> String {
        self.diagnostics.borrow().messages().to_string()
    }

    pub fn log_message(&self, diagnostic: &Diagnostic) {
        self.diagnostics.borrow_mut().log(diagnostic);
    }

    pub fn gc_statistics(&self) -> GcStatistics {
        self.collector.statistics()
    }

    /// Compiles `source` and installs it as module `name`, discarding any module
    /// of the same name. Compile errors are reported under `section`.
    pub fn compile_module(
        &mut self,
        name: &str,
        section: &str,
        source: &str,
    ) -> Result<Rc<ScriptModule>, ScriptEngineError> {
        let ast = match self.rhai.compile(source) {
            Ok(ast) => ast,
            Err(error) => {
                let error = compile_error(&error);
                self.report(section, &error);
                return Err(error);
            }
        };
        let (module, replaced) = self.modules.borrow_mut().insert(name, section, ast);
        if let Some(replaced) = replaced {
            self.collector.add_candidate(replaced);
        }
        debug!(
            module = name,
            generation = module.generation(),
            "Script module compiled"
        );
        Ok(module)
    }

    pub fn discard_module(&mut self, name: &str) -> bool {
        let discarded = self.modules.borrow_mut().discard(name);
        match discarded {
            Some(module) => {
                self.collector.add_candidate(module);
                true
            }
            None => false,
        }
    }

    pub fn module(&self, name: &str) -> Option<Rc<ScriptModule>> {
        self.modules.borrow().get(name)
    }

    pub fn module_names(&self) -> Vec<String> {
        self.modules.borrow().names()
    }

    pub fn call_function(
        &self,
        function: &ScriptFunction,
        arguments: Vec<Dynamic>,
    ) -> Result<Dynamic, ScriptEngineError> {
        match self.contexts.call(&self.rhai, function.clone(), arguments) {
            Ok(value) => Ok(value),
            Err(error) => {
                self.report(function.module().section(), &error);
                Err(error)
            }
        }
    }

    pub(crate) fn module_registry(&self) -> Rc<RefCell<ModuleRegistry>> {
        Rc::clone(&self.modules)
    }

    pub(crate) fn context_pool(&self) -> Rc<ContextPool> {
        Rc::clone(&self.contexts)
    }

    pub(crate) fn swap_section(&self, section: String) -> String {
        self.diagnostics.borrow_mut().swap_section(section)
    }

    pub(crate) fn report(&self, section: &str, error: &ScriptEngineError) {
        self.log_message(&Diagnostic::error(section, error.message.as_str()).at(error.location));
    }
}

impl Drop for ScriptEngine {
    fn drop(&mut self) {
        info!("Script engine shut down");
        self.immediate_context.unprepare();
        self.contexts.unprepare_all();
        let drained = self.modules.borrow_mut().drain();
        for module in drained {
            self.collector.add_candidate(module);
        }
        self.collector.full_cycle();
    }
}

fn register_builtin_types(engine: &mut Engine) {
    engine.register_global_module(CorePackage::new().as_shared_module());
    engine.register_global_module(BasicArrayPackage::new().as_shared_module());
    engine.register_global_module(MoreStringPackage::new().as_shared_module());
}
