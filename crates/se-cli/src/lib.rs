use std::ffi::OsString;

use clap::Parser;
use se_core::{LogMode, ScriptEngineConfig, ScriptEngineError};
use se_runtime::{register_script_file_api, ScriptEngine, ScriptFile};

mod cli_args;
mod console;
mod error_map;
mod logging;
mod source_loader;

pub(crate) use cli_args::{Cli, ConsoleArgs, EngineArgs, ExecArgs, Mode, RunArgs};
pub(crate) use console::run_console;
#[cfg(test)]
pub(crate) use console::{handle_console_line, run_console_with_io, ConsoleAction};
pub(crate) use error_map::{emit_error, json_string, map_cli_source_path, map_console_io};
pub use logging::init_logging;
pub(crate) use source_loader::load_scripts_dir;
#[cfg(test)]
pub(crate) use source_loader::{find_script_files, resolve_scripts_dir};

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> Result<i32, ScriptEngineError> {
    match cli.command {
        Mode::Console(args) => run_console_mode(args),
        Mode::Exec(args) => run_exec(args),
        Mode::Run(args) => run_script(args),
    }
}

// `--log-mode` wins over the config file; `default_mode` applies when neither names one.
pub(crate) fn create_engine(
    args: &EngineArgs,
    default_mode: Option<LogMode>,
) -> Result<ScriptEngine, ScriptEngineError> {
    let mut config = match &args.config {
        Some(path) => ScriptEngineConfig::load(path)?,
        None => match default_mode {
            Some(mode) => ScriptEngineConfig::default().with_log_mode(mode),
            None => ScriptEngineConfig::default(),
        },
    };
    if let Some(mode) = args.log_mode {
        config.log_mode = mode.into();
    }
    let mut engine = ScriptEngine::new(config)?;
    register_script_file_api(&mut engine);
    Ok(engine)
}

fn load_optional_scripts(
    engine: &mut ScriptEngine,
    scripts_dir: Option<&str>,
) -> Result<Vec<ScriptFile>, ScriptEngineError> {
    match scripts_dir {
        Some(scripts_dir) => load_scripts_dir(engine, scripts_dir),
        None => Ok(Vec::new()),
    }
}

fn run_console_mode(args: ConsoleArgs) -> Result<i32, ScriptEngineError> {
    let mut engine = create_engine(&args.engine, None)?;
    let mut scripts = load_optional_scripts(&mut engine, args.scripts_dir.as_deref())?;
    run_console(&mut engine, &mut scripts)
}

fn run_exec(args: ExecArgs) -> Result<i32, ScriptEngineError> {
    let mut engine = create_engine(&args.engine, Some(LogMode::Retained))?;
    let succeeded = args
        .statements
        .iter()
        .all(|statement| engine.execute(statement));
    engine.garbage_collect(true);

    println!("{}", if succeeded { "RESULT:OK" } else { "RESULT:FAILED" });
    for message in engine.log_messages().lines() {
        println!("MESSAGE_JSON:{}", json_string(message));
    }
    Ok(if succeeded { 0 } else { 1 })
}

fn run_script(args: RunArgs) -> Result<i32, ScriptEngineError> {
    let mut engine = create_engine(&args.engine, None)?;
    let _scripts = load_optional_scripts(&mut engine, args.scripts_dir.as_deref())?;
    let script = ScriptFile::load(&mut engine, &args.script)?;
    let value = script.execute(&engine, &args.function, Vec::new())?;

    println!("RESULT:OK");
    println!("VALUE_JSON:{}", json_string(&value.to_string()));
    Ok(0)
}
