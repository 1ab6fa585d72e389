//! Command-line interface definitions for the demo harness.
//!
//! This binary exists to exercise the action execution core end to end
//! against the local transport; the modules it runs are resolved from a
//! plain directory of executable scripts rather than a real module
//! search path (that search path is out of scope for the core, spec.md
//! §1).

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a single action against the local transport.
    Run(RunArgs),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// The action/module name to invoke, e.g. `ping`, `command`, `copy`.
    pub action: String,

    /// Module arguments as a JSON object, e.g. `{"_raw_params":"uptime"}`.
    #[arg(long, default_value = "{}")]
    pub args: String,

    /// Directory module scripts are resolved from.
    #[arg(long, default_value = "modules", value_hint = ValueHint::DirPath)]
    pub module_dir: Utf8PathBuf,

    /// Escalate privilege via `sudo` to this user.
    #[arg(long)]
    pub become_user: Option<String>,

    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    #[arg(value_enum)]
    pub shell: Shell,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
