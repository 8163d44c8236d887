use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ScriptEngineError;
use crate::types::LogMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptEngineConfig {
    pub log_mode: LogMode,
    pub strict_variables: bool,
    pub allow_shadowing: bool,
    pub fast_operators: bool,
    pub max_call_levels: usize,
    /// Upper bound on operations per evaluation; `0` disables the limit.
    pub max_operations: u64,
    pub max_expr_depth: usize,
    pub max_function_expr_depth: usize,
    /// Collection candidates examined by one incremental detect step.
    pub gc_step_size: usize,
}

impl Default for ScriptEngineConfig {
    fn default() -> Self {
        Self {
            log_mode: LogMode::Immediate,
            strict_variables: true,
            allow_shadowing: true,
            fast_operators: true,
            max_call_levels: Self::DEFAULT_MAX_CALL_LEVELS,
            max_operations: 0,
            max_expr_depth: Self::DEFAULT_MAX_EXPR_DEPTH,
            max_function_expr_depth: Self::DEFAULT_MAX_FUNCTION_EXPR_DEPTH,
            gc_step_size: Self::DEFAULT_GC_STEP_SIZE,
        }
    }
}

impl ScriptEngineConfig {
    pub const DEFAULT_MAX_CALL_LEVELS: usize = 64;
    pub const DEFAULT_MAX_EXPR_DEPTH: usize = 64;
    pub const DEFAULT_MAX_FUNCTION_EXPR_DEPTH: usize = 32;
    pub const DEFAULT_GC_STEP_SIZE: usize = 16;

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScriptEngineError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|error| {
            ScriptEngineError::new(
                "CONFIG_READ",
                format!("Failed to read config file {}: {}", path.display(), error),
            )
        })?;
        Self::from_json(&text).map_err(|error| {
            ScriptEngineError::new(
                error.code,
                format!("{} ({})", error.message, path.display()),
            )
        })
    }

    pub fn from_json(text: &str) -> Result<Self, ScriptEngineError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|error| ScriptEngineError::new("CONFIG_INVALID", error.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ScriptEngineError> {
        if self.max_call_levels == 0 {
            return Err(ScriptEngineError::new(
                "CONFIG_INVALID",
                "max_call_levels must be greater than zero.",
            ));
        }
        if self.gc_step_size == 0 {
            return Err(ScriptEngineError::new(
                "CONFIG_INVALID",
                "gc_step_size must be greater than zero.",
            ));
        }
        Ok(())
    }

    pub fn with_log_mode(mut self, mode: LogMode) -> Self {
        self.log_mode = mode;
        self
    }
}
