use rhai::{CallFnOptions, Dynamic, Engine, Scope};
use se_core::ScriptEngineError;

use crate::helpers::rhai_bridge::eval_error;
use crate::module::ScriptFunction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Unprepared,
    Prepared,
    Finished,
    Exception,
}

/// A reusable frame for one function invocation. Keeps the prepared function's
/// module alive until it is unprepared.
#[derive(Debug)]
pub struct ScriptContext {
    state: ContextState,
    function: Option<ScriptFunction>,
    arguments: Vec<Dynamic>,
    scope: Scope<'static>,
    return_value: Option<Dynamic>,
    last_error: Option<ScriptEngineError>,
}

impl Default for ScriptContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptContext {
    pub fn new() -> Self {
        Self {
            state: ContextState::Unprepared,
            function: None,
            arguments: Vec::new(),
            scope: Scope::new(),
            return_value: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn is_prepared(&self) -> bool {
        self.function.is_some()
    }

    pub fn function(&self) -> Option<&ScriptFunction> {
        self.function.as_ref()
    }

    pub fn return_value(&self) -> Option<&Dynamic> {
        self.return_value.as_ref()
    }

    pub fn last_error(&self) -> Option<&ScriptEngineError> {
        self.last_error.as_ref()
    }

    pub fn prepare(&mut self, function: ScriptFunction) -> Result<(), ScriptEngineError> {
        if function.module().is_discarded() {
            return Err(ScriptEngineError::new(
                "ENGINE_CONTEXT_PREPARE",
                format!(
                    "Function \"{}\" belongs to a discarded module.",
                    function.declaration()
                ),
            ));
        }
        self.unprepare();
        self.function = Some(function);
        self.state = ContextState::Prepared;
        Ok(())
    }

    pub fn set_arguments(&mut self, arguments: Vec<Dynamic>) -> Result<(), ScriptEngineError> {
        let function = self.prepared_function()?;
        if arguments.len() != function.param_count() {
            return Err(ScriptEngineError::new(
                "ENGINE_CONTEXT_ARGUMENTS",
                format!(
                    "Function \"{}\" expects {} argument(s), got {}.",
                    function.declaration(),
                    function.param_count(),
                    arguments.len()
                ),
            ));
        }
        self.arguments = arguments;
        Ok(())
    }

    pub fn execute(&mut self, engine: &Engine) -> Result<Dynamic, ScriptEngineError> {
        let function = self.prepared_function()?;
        if self.arguments.len() != function.param_count() {
            return Err(ScriptEngineError::new(
                "ENGINE_CONTEXT_ARGUMENTS",
                format!(
                    "Function \"{}\" expects {} argument(s), got {}.",
                    function.declaration(),
                    function.param_count(),
                    self.arguments.len()
                ),
            ));
        }
        let function = function.clone();
        let arguments = std::mem::take(&mut self.arguments);
        let options = CallFnOptions::new().eval_ast(false).rewind_scope(true);

        let outcome = engine.call_fn_with_options::<Dynamic>(
            options,
            &mut self.scope,
            function.module().ast(),
            function.name(),
            arguments,
        );
        match outcome {
            Ok(value) => {
                self.state = ContextState::Finished;
                self.return_value = Some(value.clone());
                Ok(value)
            }
            Err(error) => {
                let error = eval_error(&error);
                self.state = ContextState::Exception;
                self.last_error = Some(error.clone());
                Err(error)
            }
        }
    }

    pub fn unprepare(&mut self) {
        self.function = None;
        self.arguments.clear();
        self.scope.clear();
        self.return_value = None;
        self.last_error = None;
        self.state = ContextState::Unprepared;
    }

    fn prepared_function(&self) -> Result<&ScriptFunction, ScriptEngineError> {
        match (&self.function, self.state) {
            (Some(function), ContextState::Prepared) => Ok(function),
            _ => Err(ScriptEngineError::new(
                "ENGINE_CONTEXT_NOT_PREPARED",
                "Context has no prepared function.",
            )),
        }
    }
}
