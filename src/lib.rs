pub mod action;
pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod module;
pub mod play_context;
pub mod privilege;
pub mod shell;
pub mod task;

pub use error::CoreError;

use anyhow::{Context, Result};
use tracing_subscriber::{filter::LevelFilter, FmtSubscriber};

/// Installs a global `tracing` subscriber at the given verbosity. Intended
/// for top-level entry points (the demo CLI); library consumers embedding
/// this core in a larger agent are expected to install their own
/// subscriber instead.
pub fn init_logging(log_level: cli::LogLevel) -> Result<()> {
    let filter = match log_level {
        cli::LogLevel::Trace => LevelFilter::TRACE,
        cli::LogLevel::Debug => LevelFilter::DEBUG,
        cli::LogLevel::Info => LevelFilter::INFO,
        cli::LogLevel::Warn => LevelFilter::WARN,
        cli::LogLevel::Error => LevelFilter::ERROR,
    };

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder().with_max_level(filter).finish(),
    )
    .context("failed to set global default tracing subscriber")
}
