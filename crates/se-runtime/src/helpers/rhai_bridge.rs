use rhai::{Dynamic, EvalAltResult, ParseError, Position};
use se_core::{ScriptEngineError, SourceLocation};

pub(crate) fn location_from_position(position: Position) -> Option<SourceLocation> {
    if position.is_none() {
        return None;
    }
    Some(SourceLocation {
        line: position.line().unwrap_or(0),
        column: position.position().unwrap_or(0),
    })
}

pub(crate) fn compile_error(error: &ParseError) -> ScriptEngineError {
    let message = error.err_type().to_string();
    match location_from_position(error.position()) {
        Some(location) => ScriptEngineError::with_location("ENGINE_COMPILE", message, location),
        None => ScriptEngineError::new("ENGINE_COMPILE", message),
    }
}

pub(crate) fn eval_error(error: &EvalAltResult) -> ScriptEngineError {
    // Errors raised inside a called function arrive wrapped in call-site frames.
    let inner = error.unwrap_inner();
    let position = inner.position();
    let message = match inner {
        // Thrown values keep their own text so nested levels do not stack labels.
        EvalAltResult::ErrorRuntime(value, _) if !value.is_unit() => value.to_string(),
        _ => strip_position_suffix(&inner.to_string(), position),
    };
    match location_from_position(position) {
        Some(location) => ScriptEngineError::with_location("ENGINE_EXECUTION", message, location),
        None => ScriptEngineError::new("ENGINE_EXECUTION", message),
    }
}

pub(crate) fn runtime_error(message: impl Into<String>, position: Position) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(
        Dynamic::from(message.into()),
        position,
    ))
}

fn strip_position_suffix(text: &str, position: Position) -> String {
    if position.is_none() {
        return text.to_string();
    }
    let suffix = format!(" ({})", position);
    text.strip_suffix(suffix.as_str()).unwrap_or(text).to_string()
}
