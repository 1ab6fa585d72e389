//! `template` — identical staging/permission/transfer story to `copy`,
//! but the source file is assumed already rendered by the templating
//! layer above this core (variable templating is out of scope, spec.md
//! §1); this action only adds the rendered-content diff header.

use camino::Utf8Path;
use serde_json::{Map, Value};

use crate::action::diff::sha1_hex;
use crate::action::{ActionModule, ActionRunner, ExecuteModuleOptions};
use crate::error::CoreError;

pub struct TemplateModule;

impl ActionModule for TemplateModule {
    fn transfers_files(&self) -> bool {
        true
    }

    fn supports_check_mode(&self) -> bool {
        false
    }

    fn run(
        &self,
        runner: &mut ActionRunner<'_>,
        task_vars: &Map<String, Value>,
    ) -> Result<Map<String, Value>, CoreError> {
        let rendered_src = runner
            .task
            .args
            .get("_rendered_src")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                CoreError::execution(
                    "template requires '_rendered_src' (the templating layer's output path)",
                )
            })?
            .to_string();
        let dest = runner
            .task
            .args
            .get("dest")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::execution("template requires a 'dest' argument"))?
            .to_string();

        let rendered_bytes = std::fs::read(&rendered_src).map_err(|e| CoreError::io(&rendered_src, e))?;
        let rendered_checksum = sha1_hex(&rendered_bytes);
        let remote_checksum = runner.remote_checksum(&dest, task_vars);

        if rendered_checksum == remote_checksum {
            let mut result = Map::new();
            result.insert("changed".to_string(), Value::Bool(false));
            result.insert("checksum".to_string(), Value::String(rendered_checksum));
            result.insert("dest".to_string(), Value::String(dest));
            return Ok(result);
        }

        let remote_user = runner.remote_user(task_vars);
        let tmp = runner.make_tmp_path(&remote_user)?;
        let staged_path = runner
            .connection
            .shell()
            .join_path(&[tmp.as_str(), "source"]);

        runner.transfer_file(Utf8Path::new(&rendered_src), &staged_path)?;
        runner.fixup_perms(Some(&tmp), &remote_user, false, true)?;

        let mut module_args = Map::new();
        module_args.insert("src".to_string(), Value::String(staged_path));
        module_args.insert("dest".to_string(), Value::String(dest.clone()));
        module_args.insert("remote_src".to_string(), Value::Bool(false));

        let mut result = runner.execute_module(
            ExecuteModuleOptions {
                module_name: Some("copy".to_string()),
                module_args: Some(module_args),
                tmp: Some(tmp),
                persist_files: false,
                delete_remote_tmp: true,
            },
            task_vars,
        )?;

        if runner.play_context.diff {
            let diff = runner.get_diff_data(&dest, &rendered_src, task_vars, true)?;
            if let Some(after) = diff.after {
                result.insert("diff_after".to_string(), Value::String(after));
            }
        }

        result
            .entry("checksum".to_string())
            .or_insert_with(|| Value::String(rendered_checksum));
        Ok(result)
    }
}
