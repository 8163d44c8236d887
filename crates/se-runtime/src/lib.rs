mod diagnostics;
mod engine;
mod gc;
mod helpers;
mod module;
mod script_file;

pub use diagnostics::DiagnosticLog;
pub use engine::{
    ContextPool, ContextState, ScriptContext, ScriptEngine, IMMEDIATE_MODULE_NAME,
    MAX_SCRIPT_NESTING_LEVEL,
};
pub use gc::{GarbageCollector, GcStatistics};
pub use module::{ModuleRegistry, ScriptFunction, ScriptModule};
pub use script_file::{register_script_file_api, ScriptFile};

pub use rhai::{Array, Dynamic};
