//! `copy` — stages a local file to the target and invokes the remote
//! `copy` module to place it at `dest` with the right ownership, skipping
//! the transfer entirely when checksums already match.

use camino::Utf8Path;
use serde_json::{Map, Value};

use crate::action::diff::sha1_hex;
use crate::action::{ActionModule, ActionRunner, ExecuteModuleOptions};
use crate::error::CoreError;

pub struct CopyModule;

impl ActionModule for CopyModule {
    fn transfers_files(&self) -> bool {
        true
    }

    fn run(
        &self,
        runner: &mut ActionRunner<'_>,
        task_vars: &Map<String, Value>,
    ) -> Result<Map<String, Value>, CoreError> {
        let src = runner
            .task
            .args
            .get("src")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::execution("copy requires a 'src' argument"))?
            .to_string();
        let dest = runner
            .task
            .args
            .get("dest")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::execution("copy requires a 'dest' argument"))?
            .to_string();

        if runner.play_context.check_mode {
            let mut result = Map::new();
            result.insert("changed".to_string(), Value::Bool(true));
            result.insert(
                "msg".to_string(),
                Value::String("check mode: skipped copy".to_string()),
            );
            return Ok(result);
        }

        let local_bytes = std::fs::read(&src).map_err(|e| CoreError::io(&src, e))?;
        let local_checksum = sha1_hex(&local_bytes);
        let remote_checksum = runner.remote_checksum(&dest, task_vars);

        if local_checksum == remote_checksum {
            let mut result = Map::new();
            result.insert("changed".to_string(), Value::Bool(false));
            result.insert("checksum".to_string(), Value::String(local_checksum));
            result.insert("dest".to_string(), Value::String(dest));
            return Ok(result);
        }

        let remote_user = runner.remote_user(task_vars);
        let tmp = runner.make_tmp_path(&remote_user)?;
        let staged_path = runner
            .connection
            .shell()
            .join_path(&[tmp.as_str(), "source"]);

        runner.transfer_file(
            Utf8Path::new(&src),
            &staged_path,
        )?;
        runner.fixup_perms(Some(&tmp), &remote_user, false, true)?;

        let mut module_args = Map::new();
        module_args.insert("src".to_string(), Value::String(staged_path));
        module_args.insert("dest".to_string(), Value::String(dest.clone()));
        module_args.insert("remote_src".to_string(), Value::Bool(false));
        if let Some(mode) = runner.task.args.get("mode") {
            module_args.insert("mode".to_string(), mode.clone());
        }

        let mut result = runner.execute_module(
            ExecuteModuleOptions {
                module_name: Some("copy".to_string()),
                module_args: Some(module_args),
                tmp: Some(tmp.clone()),
                persist_files: false,
                delete_remote_tmp: true,
            },
            task_vars,
        )?;

        result
            .entry("checksum".to_string())
            .or_insert_with(|| Value::String(local_checksum));
        Ok(result)
    }
}
