use se_core::ScriptEngineError;
use std::fmt::Display;

fn map_error(code: &'static str, error: impl Display) -> ScriptEngineError {
    ScriptEngineError::new(code, error.to_string())
}

pub(crate) fn json_string(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

pub(crate) fn emit_error(error: ScriptEngineError) -> i32 {
    println!("RESULT:ERROR");
    println!("ERROR_CODE:{}", error.code);
    println!("ERROR_MSG_JSON:{}", json_string(&error.message));
    1
}

pub(crate) fn map_console_io(error: std::io::Error) -> ScriptEngineError {
    map_error("CLI_CONSOLE_IO", error)
}

pub(crate) fn map_cli_source_path(error: std::io::Error) -> ScriptEngineError {
    map_error("CLI_SOURCE_PATH", error)
}

#[cfg(test)]
mod error_map_tests {
    use super::*;

    #[test]
    fn emit_error_returns_non_zero_exit_code() {
        let code = emit_error(ScriptEngineError::new("ERR", "failed"));
        assert_eq!(code, 1);
    }

    #[test]
    fn mapping_helpers_keep_error_codes() {
        assert_eq!(
            map_console_io(std::io::Error::other("io")).code,
            "CLI_CONSOLE_IO"
        );
        assert_eq!(
            map_cli_source_path(std::io::Error::other("path")).code,
            "CLI_SOURCE_PATH"
        );
    }

    #[test]
    fn json_string_escapes_quotes_and_newlines() {
        assert_eq!(json_string("say \"hi\"\n"), "\"say \\\"hi\\\"\\n\"");
    }
}
