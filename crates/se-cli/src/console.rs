use std::io::{self, BufRead, Write};

use se_core::{LogMode, ScriptEngineError};
use se_runtime::{ScriptEngine, ScriptFile, ScriptFunction};
use tracing::info;

use crate::map_console_io;

pub(crate) const CONSOLE_HELP: &str =
    "commands: :help :gc :gc full :log immediate|retained :messages :stats :call MODULE FUNCTION :reload :quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConsoleAction {
    Continue,
    Quit,
}

pub(crate) fn run_console(
    engine: &mut ScriptEngine,
    scripts: &mut [ScriptFile],
) -> Result<i32, ScriptEngineError> {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut writer = io::stdout();
    run_console_with_io(engine, scripts, &mut reader, &mut writer)
}

pub(crate) fn run_console_with_io(
    engine: &mut ScriptEngine,
    scripts: &mut [ScriptFile],
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<i32, ScriptEngineError> {
    writeln!(writer, "Script engine console").map_err(map_console_io)?;
    writeln!(writer, "{}", CONSOLE_HELP).map_err(map_console_io)?;
    info!(scripts = scripts.len(), "Console started");

    loop {
        let Some(raw) = prompt_input_from("> ", reader, writer)? else {
            return Ok(0);
        };
        let mut lines = Vec::new();
        let mut emit = |line: String| lines.push(line);
        let action = match handle_console_line(raw.as_str(), engine, scripts, &mut emit) {
            Ok(action) => action,
            Err(error) => {
                emit(format!("error: {}", error));
                ConsoleAction::Continue
            }
        };
        for line in lines {
            writeln!(writer, "{}", line).map_err(map_console_io)?;
        }
        if action == ConsoleAction::Quit {
            return Ok(0);
        }
    }
}

pub(crate) fn handle_console_line(
    raw: &str,
    engine: &mut ScriptEngine,
    scripts: &mut [ScriptFile],
    emit: &mut dyn FnMut(String),
) -> Result<ConsoleAction, ScriptEngineError> {
    let line = raw.trim();
    if line.is_empty() {
        return Ok(ConsoleAction::Continue);
    }
    if !line.starts_with(':') {
        let outcome = if engine.execute(line) { "ok" } else { "failed" };
        emit(outcome.to_string());
        return Ok(ConsoleAction::Continue);
    }

    let parts = line.split_whitespace().collect::<Vec<_>>();
    match parts.as_slice() {
        [":help"] => emit(CONSOLE_HELP.to_string()),
        [":quit"] => {
            emit("bye".to_string());
            return Ok(ConsoleAction::Quit);
        }
        [":gc"] => collect(engine, false, emit),
        [":gc", "full"] => collect(engine, true, emit),
        [":log", mode] => {
            let mode = parse_log_mode(mode)?;
            engine.set_log_mode(mode);
            emit(format!("log mode: {}", mode.label()));
        }
        [":messages"] => {
            let messages = engine.log_messages();
            if messages.is_empty() {
                emit("(no messages)".to_string());
            }
            for message in messages.lines() {
                emit(message.to_string());
            }
            engine.clear_log_messages();
        }
        [":stats"] => emit_stats(engine, emit),
        [":call", module, function] => {
            let value = call_module_function(engine, module, function)?;
            emit(format!("=> {}", value));
        }
        [":reload"] => {
            for script in scripts.iter_mut() {
                script.reload(engine)?;
                emit(format!("reloaded: {}", script.name()));
            }
        }
        _ => {
            return Err(ScriptEngineError::new(
                "CLI_CONSOLE_COMMAND",
                format!("Unknown console command: {}", line),
            ))
        }
    }
    Ok(ConsoleAction::Continue)
}

fn collect(engine: &mut ScriptEngine, full_cycle: bool, emit: &mut dyn FnMut(String)) {
    let before = engine.gc_statistics().total_destroyed;
    engine.garbage_collect(full_cycle);
    let after = engine.gc_statistics();
    emit(format!(
        "gc: destroyed {} pending {}",
        after.total_destroyed - before,
        after.current_size
    ));
}

fn emit_stats(engine: &ScriptEngine, emit: &mut dyn FnMut(String)) {
    let gc = engine.gc_statistics();
    emit(format!("modules: {}", engine.module_names().join(", ")));
    emit(format!(
        "nesting: current {} highest {}",
        engine.nesting_level(),
        engine.highest_nesting_level()
    ));
    emit(format!(
        "gc: pending {} detected {} destroyed {}",
        gc.current_size, gc.total_detected, gc.total_destroyed
    ));
    emit(format!("log mode: {}", engine.log_mode().label()));
}

fn call_module_function(
    engine: &ScriptEngine,
    module: &str,
    function: &str,
) -> Result<String, ScriptEngineError> {
    let Some(loaded) = engine.module(module) else {
        return Err(ScriptEngineError::new(
            "CLI_MODULE_NOT_FOUND",
            format!("Module \"{}\" is not loaded.", module),
        ));
    };
    let Some(resolved) = ScriptFunction::find(&loaded, function) else {
        return Err(ScriptEngineError::new(
            "SCRIPT_FUNCTION_NOT_FOUND",
            format!("Function \"{}\" was not found in module \"{}\".", function, module),
        ));
    };
    drop(loaded);
    let value = engine.call_function(&resolved, Vec::new())?;
    Ok(value.to_string())
}

fn parse_log_mode(raw: &str) -> Result<LogMode, ScriptEngineError> {
    match raw {
        "immediate" => Ok(LogMode::Immediate),
        "retained" => Ok(LogMode::Retained),
        _ => Err(ScriptEngineError::new(
            "CLI_CONSOLE_COMMAND",
            format!("Unknown log mode: {}", raw),
        )),
    }
}

pub(crate) fn prompt_input_from(
    prefix: &str,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<Option<String>, ScriptEngineError> {
    write!(writer, "{}", prefix).map_err(map_console_io)?;
    writer.flush().map_err(map_console_io)?;
    let mut input = String::new();
    let read = reader.read_line(&mut input).map_err(map_console_io)?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim_end_matches(&['\r', '\n'][..]).to_string()))
}
