//! `ping` — the connectivity-check sentinel module used by the resolver
//! itself to distinguish "module not found" from "nothing installed"
//! (spec.md §4.2 step 3).

use serde_json::{Map, Value};

use crate::action::{ActionModule, ActionRunner, ExecuteModuleOptions};
use crate::error::CoreError;

pub struct PingModule;

impl ActionModule for PingModule {
    fn transfers_files(&self) -> bool {
        false
    }

    fn run(
        &self,
        runner: &mut ActionRunner<'_>,
        task_vars: &Map<String, Value>,
    ) -> Result<Map<String, Value>, CoreError> {
        runner.execute_module(
            ExecuteModuleOptions {
                module_name: Some("ping".to_string()),
                module_args: Some(runner.task.args.clone()),
                ..Default::default()
            },
            task_vars,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::connection::LocalConnection;
    use crate::module::{ConfiguredModule, ModuleAssembler, ModulePathIndex, ModuleStyle};
    use crate::play_context::PlayContext;
    use crate::privilege::BecomeMethod;
    use crate::task::Task;
    use serde_json::json;

    struct AlwaysFindsIndex;
    impl ModulePathIndex for AlwaysFindsIndex {
        fn find_plugin(&self, _: &str, _: &str) -> bool {
            true
        }
    }

    struct PongAssembler;
    impl ModuleAssembler for PongAssembler {
        fn assemble(
            &self,
            _: &str,
            _: &Map<String, Value>,
        ) -> Result<ConfiguredModule, CoreError> {
            Ok(ConfiguredModule {
                style: ModuleStyle::New,
                shebang: "#!/bin/sh".to_string(),
                bytes: br#"echo '{"ping":"pong"}'"#.to_vec(),
            })
        }
    }

    #[test]
    fn ping_returns_pong_over_pipelining() {
        let task = Task::new("ping", Map::new());
        let connection = LocalConnection::new();
        let ctx = PlayContext {
            become_enabled: false,
            become_user: "root".to_string(),
            become_method: BecomeMethod::Sudo,
            remote_user: "alice".to_string(),
            pipelining: true,
            check_mode: false,
            no_log: false,
            diff: false,
            verbosity: 0,
            executable: None,
            module_compression: "ZIP_DEFLATED".to_string(),
        };
        let config = Config::default();
        let index = AlwaysFindsIndex;
        let assembler = PongAssembler;
        let mut runner = ActionRunner::new(&task, &connection, &ctx, &config, &index, &assembler);

        let result = PingModule.run(&mut runner, &Map::new()).unwrap();
        assert_eq!(result.get("ping"), Some(&json!("pong")));
    }
}
