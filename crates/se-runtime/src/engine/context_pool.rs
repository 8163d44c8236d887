use std::cell::{Cell, RefCell};

use rhai::{Dynamic, Engine};
use se_core::ScriptEngineError;

use super::context::ScriptContext;
use crate::diagnostics::SharedDiagnosticLog;
use crate::module::ScriptFunction;

pub const MAX_SCRIPT_NESTING_LEVEL: usize = 32;

#[derive(Debug)]
pub struct ContextPool {
    contexts: [RefCell<ScriptContext>; MAX_SCRIPT_NESTING_LEVEL],
    nesting_level: Cell<usize>,
    highest_nesting_level: Cell<usize>,
    diagnostics: SharedDiagnosticLog,
}

impl ContextPool {
    pub(crate) fn new(diagnostics: SharedDiagnosticLog) -> Self {
        Self {
            contexts: std::array::from_fn(|_| RefCell::new(ScriptContext::new())),
            nesting_level: Cell::new(0),
            highest_nesting_level: Cell::new(0),
            diagnostics,
        }
    }

    pub fn capacity(&self) -> usize {
        self.contexts.len()
    }

    pub fn get(&self, level: usize) -> Option<&RefCell<ScriptContext>> {
        self.contexts.get(level)
    }

    pub fn nesting_level(&self) -> usize {
        self.nesting_level.get()
    }

    pub fn highest_nesting_level(&self) -> usize {
        self.highest_nesting_level.get()
    }

    pub fn call(
        &self,
        engine: &Engine,
        function: ScriptFunction,
        arguments: Vec<Dynamic>,
    ) -> Result<Dynamic, ScriptEngineError> {
        let level = self.nesting_level.get();
        let slot = self.contexts.get(level).ok_or_else(|| {
            ScriptEngineError::new(
                "ENGINE_NESTING_TOO_DEEP",
                format!(
                    "Calling \"{}\" would exceed the maximum script nesting level of {}.",
                    function.declaration(),
                    MAX_SCRIPT_NESTING_LEVEL
                ),
            )
        })?;
        let mut context = slot.try_borrow_mut().map_err(|_| {
            ScriptEngineError::new(
                "ENGINE_CONTEXT_BUSY",
                format!("Context for nesting level {} is already executing.", level),
            )
        })?;

        self.nesting_level.set(level + 1);
        if level + 1 > self.highest_nesting_level.get() {
            self.highest_nesting_level.set(level + 1);
        }
        let previous_section = self
            .diagnostics
            .borrow_mut()
            .swap_section(function.module().section().to_string());

        let outcome = run_prepared(&mut context, engine, function, arguments);

        self.diagnostics.borrow_mut().swap_section(previous_section);
        self.nesting_level.set(level);
        outcome
    }

    // Returns how many contexts were skipped because they are still executing.
    pub(crate) fn unprepare_used(&self) -> usize {
        let mut busy = 0;
        for slot in self.contexts.iter().take(self.highest_nesting_level.get()) {
            match slot.try_borrow_mut() {
                Ok(mut context) => context.unprepare(),
                Err(_) => busy += 1,
            }
        }
        busy
    }

    pub(crate) fn unprepare_all(&self) {
        for slot in &self.contexts {
            if let Ok(mut context) = slot.try_borrow_mut() {
                context.unprepare();
            }
        }
    }

    pub(crate) fn reset_highest_nesting_level(&self) {
        self.highest_nesting_level.set(self.nesting_level.get());
    }
}

fn run_prepared(
    context: &mut ScriptContext,
    engine: &Engine,
    function: ScriptFunction,
    arguments: Vec<Dynamic>,
) -> Result<Dynamic, ScriptEngineError> {
    context.prepare(function)?;
    context.set_arguments(arguments)?;
    context.execute(engine)
}
