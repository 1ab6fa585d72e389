//! `debug` — prints a message or a variable's value; never touches the
//! remote host at all; used heavily in check-mode playbooks.

use serde_json::{Map, Value};

use crate::action::{ActionModule, ActionRunner};
use crate::error::CoreError;

pub struct DebugModule;

impl ActionModule for DebugModule {
    fn run(
        &self,
        runner: &mut ActionRunner<'_>,
        _task_vars: &Map<String, Value>,
    ) -> Result<Map<String, Value>, CoreError> {
        let mut result = Map::new();

        if let Some(Value::String(msg)) = runner.task.args.get("msg") {
            result.insert("msg".to_string(), Value::String(msg.clone()));
        } else if let Some(var_name) = runner.task.args.get("var") {
            result.insert("var_name".to_string(), var_name.clone());
        } else {
            result.insert("msg".to_string(), Value::String("Hello world!".to_string()));
        }

        result.insert("changed".to_string(), Value::Bool(false));
        Ok(result)
    }
}
