//! `fetch` — the inverse of `copy`: slurps a remote file back to the
//! controller, base64-decoding the transport's only supported encoding.

use serde_json::{Map, Value};

use crate::action::diff::sha1_hex;
use crate::action::{ActionModule, ActionRunner, ExecuteModuleOptions};
use crate::error::CoreError;

pub struct FetchModule;

impl ActionModule for FetchModule {
    fn supports_check_mode(&self) -> bool {
        false
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
            .ok_or_else(|| CoreError::execution("fetch requires a 'src' argument"))?
            .to_string();
        let dest = runner
            .task
            .args
            .get("dest")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::execution("fetch requires a 'dest' argument"))?
            .to_string();

        let mut slurp_args = Map::new();
        slurp_args.insert("src".to_string(), Value::String(src.clone()));
        let slurp_result = runner.execute_module(
            ExecuteModuleOptions {
                module_name: Some("slurp".to_string()),
                module_args: Some(slurp_args),
                ..Default::default()
            },
            task_vars,
        )?;

        let encoding = slurp_result
            .get("encoding")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if encoding != "base64" {
            return Err(CoreError::execution(format!(
                "fetch: unsupported slurp encoding '{}'",
                encoding
            )));
        }

        let content = slurp_result
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let decoded =
            base64::Engine::decode(&base64::engine::general_purpose::STANDARD, content)
                .map_err(|e| CoreError::execution(format!("fetch: invalid base64 content: {}", e)))?;

        std::fs::write(&dest, &decoded).map_err(|e| CoreError::io(&dest, e))?;

        let mut result = Map::new();
        result.insert("changed".to_string(), Value::Bool(true));
        result.insert("dest".to_string(), Value::String(dest));
        result.insert("checksum".to_string(), Value::String(sha1_hex(&decoded)));
        Ok(result)
    }
}
