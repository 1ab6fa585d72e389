//! `command` — runs an arbitrary command line on the target with no
//! shell interpolation. Thinnest possible `ActionModule`: no file
//! staging, arguments pass straight through.

use serde_json::{Map, Value};

use crate::action::{ActionModule, ActionRunner, ExecuteModuleOptions};
use crate::error::CoreError;

pub struct CommandModule;

impl ActionModule for CommandModule {
    fn supports_check_mode(&self) -> bool {
        false
    }

    fn run(
        &self,
        runner: &mut ActionRunner<'_>,
        task_vars: &Map<String, Value>,
    ) -> Result<Map<String, Value>, CoreError> {
        runner.execute_module(
            ExecuteModuleOptions {
                module_name: Some("command".to_string()),
                module_args: Some(runner.task.args.clone()),
                ..Default::default()
            },
            task_vars,
        )
    }
}
