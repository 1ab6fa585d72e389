//! Demo harness: runs one action against the local transport.
//!
//! Module resolution here is deliberately the simplest thing that works —
//! a flat directory of executable scripts named `<module>[.suffix]` — since
//! the real module search path, compression, and embedded-library injection
//! are all out of scope for this core (spec.md §1). A real agent embedding
//! this crate would supply its own `ModulePathIndex`/`ModuleAssembler`.

use std::io::IsTerminal;

use anyhow::{Context, Result};
use clap::CommandFactory;
use serde_json::{Map, Value};

use remote_action_core::action::modules::{
    CommandModule, CopyModule, DebugModule, FetchModule, PingModule, TemplateModule,
};
use remote_action_core::action::ActionRunner;
use remote_action_core::cli::{self, Cli, Commands};
use remote_action_core::config::Config;
use remote_action_core::connection::LocalConnection;
use remote_action_core::error::CoreError;
use remote_action_core::module::{ConfiguredModule, ModuleAssembler, ModulePathIndex, ModuleStyle};
use remote_action_core::play_context::PlayContext;
use remote_action_core::privilege::BecomeMethod;
use remote_action_core::task::Task;

/// Resolves module scripts from a flat directory: `<module_dir>/<name><suffix>`.
struct DirModuleIndex {
    dir: camino::Utf8PathBuf,
}

impl ModulePathIndex for DirModuleIndex {
    fn find_plugin(&self, module_name: &str, suffix: &str) -> bool {
        self.dir.join(format!("{}{}", module_name, suffix)).is_file()
    }
}

/// Reads a resolved module's script body and its shebang line directly off
/// disk; always treats it as "new style" (legacy calling conventions are
/// out of scope for this demo harness).
struct DirModuleAssembler {
    dir: camino::Utf8PathBuf,
}

impl ModuleAssembler for DirModuleAssembler {
    fn assemble(
        &self,
        module_name: &str,
        _module_args: &Map<String, Value>,
    ) -> Result<ConfiguredModule, CoreError> {
        let mut found = None;
        for suffix in [".py", ".ps1", ""] {
            let candidate = self.dir.join(format!("{}{}", module_name, suffix));
            if candidate.is_file() {
                found = Some(candidate);
                break;
            }
        }
        let path = found.ok_or_else(|| {
            CoreError::execution(format!("no module file found for '{}'", module_name))
        })?;

        let bytes = std::fs::read(&path).map_err(|e| CoreError::io(path.as_str(), e))?;
        let shebang = bytes
            .split(|&b| b == b'\n')
            .next()
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .unwrap_or_default();

        Ok(ConfiguredModule {
            style: ModuleStyle::New,
            shebang,
            bytes,
        })
    }
}

fn main() -> Result<()> {
    let cli = cli::parse_args();

    if let Commands::Completions(args) = &cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        clap_complete::generate(args.shell, &mut cmd, name, &mut std::io::stdout());
        return Ok(());
    }

    let Commands::Run(run_args) = &cli.command else {
        unreachable!("completions handled above");
    };

    remote_action_core::init_logging(run_args.log_level).context("failed to initialize logging")?;

    let module_args: Map<String, Value> =
        serde_json::from_str(&run_args.args).context("--args must be a JSON object")?;

    let task = Task::new(run_args.action.clone(), module_args);
    let connection = LocalConnection::new();
    let config = Config::default();

    let become_enabled = run_args.become_user.is_some();
    let play_context = PlayContext {
        become_enabled,
        become_user: run_args.become_user.clone().unwrap_or_else(|| "root".to_string()),
        become_method: BecomeMethod::Sudo,
        remote_user: whoami_user(),
        pipelining: true,
        check_mode: false,
        no_log: false,
        diff: false,
        verbosity: match run_args.log_level {
            cli::LogLevel::Trace => 4,
            cli::LogLevel::Debug => 3,
            _ => 0,
        },
        executable: None,
        module_compression: "ZIP_DEFLATED".to_string(),
    };

    let index = DirModuleIndex {
        dir: run_args.module_dir.clone(),
    };
    let assembler = DirModuleAssembler {
        dir: run_args.module_dir.clone(),
    };

    let mut runner =
        ActionRunner::new(&task, &connection, &play_context, &config, &index, &assembler);
    let task_vars = Map::new();

    let result = dispatch(&run_args.action, &mut runner, &task_vars)?;

    let stdout_is_tty = std::io::stdout().is_terminal();
    let rendered = if stdout_is_tty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", rendered);

    Ok(())
}

fn dispatch(
    action: &str,
    runner: &mut ActionRunner<'_>,
    task_vars: &Map<String, Value>,
) -> Result<Map<String, Value>, CoreError> {
    match action {
        "command" | "shell" => runner.run_action(&CommandModule, task_vars),
        "copy" => runner.run_action(&CopyModule, task_vars),
        "debug" => runner.run_action(&DebugModule, task_vars),
        "fetch" => runner.run_action(&FetchModule, task_vars),
        "ping" => runner.run_action(&PingModule, task_vars),
        "template" => runner.run_action(&TemplateModule, task_vars),
        other => Err(CoreError::execution(format!("unknown action '{}'", other))),
    }
}

fn whoami_user() -> String {
    std::env::var("USER").unwrap_or_else(|_| "root".to_string())
}
