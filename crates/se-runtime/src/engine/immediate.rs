use se_core::{Diagnostic, ScriptEngineError};
use tracing::debug_span;

use super::lifecycle::ScriptEngine;
use crate::module::ScriptFunction;

/// Module name reserved for statements run through [`ScriptEngine::execute`].
pub const IMMEDIATE_MODULE_NAME: &str = "ExecuteImmediate";
const IMMEDIATE_FUNCTION_NAME: &str = "f";

impl ScriptEngine {
    /// Compiles and runs a single statement in a fresh `ExecuteImmediate` module.
    /// Diagnostics use the statement text as their section; the statement is row 2.
    pub fn execute(&mut self, statement: &str) -> bool {
        let _span = debug_span!("script_execute_immediate").entered();
        let wrapped = format!("fn {IMMEDIATE_FUNCTION_NAME}() {{\n{statement};\n}}");

        self.discard_module(IMMEDIATE_MODULE_NAME);
        let module = match self.compile_module(IMMEDIATE_MODULE_NAME, statement, &wrapped) {
            Ok(module) => module,
            Err(_) => return false,
        };
        let Some(function) = ScriptFunction::find(&module, IMMEDIATE_FUNCTION_NAME) else {
            self.log_message(&Diagnostic::error(
                statement,
                format!(
                    "Function \"{IMMEDIATE_FUNCTION_NAME}\" was not found in {IMMEDIATE_MODULE_NAME}."
                ),
            ));
            return false;
        };
        drop(module);

        if let Err(error) = self.immediate_context.prepare(function) {
            self.report(statement, &error);
            return false;
        }
        let previous_section = self.swap_section(statement.to_string());
        let outcome = self.immediate_context.execute(&self.rhai);
        self.swap_section(previous_section);

        match outcome {
            Ok(_) => true,
            Err(error) => {
                self.report(statement, &error);
                false
            }
        }
    }

    pub fn immediate_function(&self) -> Result<ScriptFunction, ScriptEngineError> {
        self.module(IMMEDIATE_MODULE_NAME)
            .and_then(|module| ScriptFunction::find(&module, IMMEDIATE_FUNCTION_NAME))
            .ok_or_else(|| {
                ScriptEngineError::new(
                    "ENGINE_FUNCTION_NOT_FOUND",
                    format!("No {IMMEDIATE_MODULE_NAME} module is loaded."),
                )
            })
    }
}

#[cfg(test)]
mod immediate_tests {
    use super::*;
    use crate::engine::ContextState;
    use crate::runtime_test_support::*;

    #[test]
    fn empty_and_trivial_statements_succeed() {
        let mut engine = retained_engine();
        assert!(engine.execute(""));
        assert!(engine.execute(";"));
        assert!(engine.execute("1 + 1"));
        assert!(engine.execute("let x = [1, 2]; x.push(3)"));
        assert!(engine.log_messages().is_empty());
        assert_eq!(engine.immediate_context().state(), ContextState::Finished);
    }

    #[test]
    fn syntax_error_fails_with_one_diagnostic_on_row_two() {
        let mut engine = retained_engine();
        assert!(!engine.execute("let x = ;"));
        let lines = retained_lines(&engine);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("let x = ; (2,"), "{}", lines[0]);
    }

    #[test]
    fn undefined_variable_is_a_compile_failure() {
        let mut engine = retained_engine();
        assert!(!engine.execute("missing_value + 1"));
        let lines = retained_lines(&engine);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("missing_value + 1 (2,"), "{}", lines[0]);
        assert!(lines[0].contains("missing_value"));
    }

    #[test]
    fn runtime_throw_fails_with_one_diagnostic() {
        let mut engine = retained_engine();
        assert!(!engine.execute("throw \"boom\""));
        assert_eq!(retained_lines(&engine), vec!["throw \"boom\" (2,1) boom".to_string()]);
        assert_eq!(engine.immediate_context().state(), ContextState::Exception);
    }

    #[test]
    fn multi_line_throw_is_retained_in_full() {
        let mut engine = retained_engine();
        assert!(!engine.execute("throw \"first line\\nsecond line\""));
        assert_eq!(
            engine.log_messages(),
            "throw \"first line\\nsecond line\" (2,1) first line\nsecond line\n"
        );
    }

    #[test]
    fn information_is_dropped_and_warnings_are_retained() {
        let mut engine = retained_engine();
        assert!(engine.execute("print(\"hello\")"));
        assert!(engine.log_messages().is_empty());

        assert!(engine.execute("warn(\"careful\")"));
        let lines = retained_lines(&engine);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("warn(\"careful\") (2,"), "{}", lines[0]);
        assert!(lines[0].ends_with("careful"));
    }

    #[test]
    fn each_statement_recreates_the_immediate_module() {
        let mut engine = retained_engine();
        assert!(engine.execute("1"));
        let first = engine
            .module(IMMEDIATE_MODULE_NAME)
            .expect("immediate module should exist");
        assert!(engine.execute("2"));
        let second = engine
            .immediate_function()
            .expect("immediate function should resolve");

        assert!(first.is_discarded());
        assert!(second.module().generation() > first.generation());
        assert_eq!(engine.module_names(), vec![IMMEDIATE_MODULE_NAME.to_string()]);
    }

    #[test]
    fn failed_compile_leaves_no_immediate_module() {
        let mut engine = retained_engine();
        assert!(engine.execute("1"));
        assert!(!engine.execute("let = ;"));
        assert!(engine.module(IMMEDIATE_MODULE_NAME).is_none());
        let error = engine
            .immediate_function()
            .expect_err("no immediate module should remain");
        assert_eq!(error.code, "ENGINE_FUNCTION_NOT_FOUND");
    }
}
