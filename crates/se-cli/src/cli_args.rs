use clap::{Args, Parser, Subcommand, ValueEnum};
use se_core::LogMode;

#[derive(Debug, Parser)]
#[command(name = "se-cli")]
#[command(about = "Script engine console and runner")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    Console(ConsoleArgs),
    Exec(ExecArgs),
    Run(RunArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogModeArg {
    Immediate,
    Retained,
}

impl From<LogModeArg> for LogMode {
    fn from(value: LogModeArg) -> Self {
        match value {
            LogModeArg::Immediate => LogMode::Immediate,
            LogModeArg::Retained => LogMode::Retained,
        }
    }
}

#[derive(Debug, Args)]
pub(crate) struct EngineArgs {
    #[arg(long = "config")]
    pub(crate) config: Option<String>,
    #[arg(long = "log-mode", value_enum)]
    pub(crate) log_mode: Option<LogModeArg>,
}

#[derive(Debug, Args)]
pub(crate) struct ConsoleArgs {
    #[command(flatten)]
    pub(crate) engine: EngineArgs,
    #[arg(long = "scripts-dir")]
    pub(crate) scripts_dir: Option<String>,
}

#[derive(Debug, Args)]
pub(crate) struct ExecArgs {
    #[command(flatten)]
    pub(crate) engine: EngineArgs,
    #[arg(long = "statement", required = true)]
    pub(crate) statements: Vec<String>,
}

#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    #[command(flatten)]
    pub(crate) engine: EngineArgs,
    #[arg(long = "script")]
    pub(crate) script: String,
    #[arg(long = "function", default_value = "main")]
    pub(crate) function: String,
    #[arg(long = "scripts-dir")]
    pub(crate) scripts_dir: Option<String>,
}
