//! PowerShell string-builder.

use serde_json::{Map, Value};

use super::{Shell, ShellFamily};

/// PowerShell-compatible command-line builder for Windows targets.
#[derive(Debug, Default, Clone, Copy)]
pub struct PowerShellShell;

impl Shell for PowerShellShell {
    fn family(&self) -> ShellFamily {
        ShellFamily::PowerShell
    }

    fn mkdtemp(&self, prefix: &str, use_system_tmp: bool, _mode: u32) -> String {
        let base = if use_system_tmp {
            "$env:TEMP"
        } else {
            "$env:USERPROFILE"
        };
        format!(
            "New-Item -ItemType Directory -Force -Path (Join-Path {base} ('{prefix}' + [System.IO.Path]::GetRandomFileName())) | Select-Object -ExpandProperty FullName",
            base = base,
            prefix = prefix
        )
    }

    fn remove(&self, path: &str, recurse: bool) -> String {
        if recurse {
            format!(
                "Remove-Item -Recurse -Force -Path {} -ErrorAction SilentlyContinue",
                ps_quote(path)
            )
        } else {
            format!(
                "Remove-Item -Force -Path {} -ErrorAction SilentlyContinue",
                ps_quote(path)
            )
        }
    }

    fn chmod(&self, _path: &str, _mode: &str, _recursive: bool) -> String {
        // POSIX permission bits don't map onto Windows ACLs; the core
        // treats this as a no-op command for PowerShell targets.
        "$null".to_string()
    }

    fn chown(&self, _path: &str, _owner: &str, _recursive: bool) -> String {
        "$null".to_string()
    }

    fn set_user_facl(&self, _path: &str, _owner: &str, _perms: &str, _recursive: bool) -> String {
        "$null".to_string()
    }

    fn exists(&self, path: &str) -> String {
        format!("Test-Path -Path {}", ps_quote(path))
    }

    fn expand_user(&self, path: &str) -> String {
        format!(
            "[System.Environment]::ExpandEnvironmentVariables({})",
            ps_quote(path)
        )
    }

    fn join_path(&self, parts: &[&str]) -> String {
        parts
            .iter()
            .filter(|p| !p.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join("\\")
    }

    fn env_prefix(&self, env: &Map<String, Value>) -> String {
        env.iter()
            .map(|(k, v)| format!("$env:{}={};", k, ps_quote(&value_to_string(v))))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn get_remote_filename(&self, module_name: &str) -> String {
        format!("{}.ps1", module_name)
    }

    fn build_module_command(
        &self,
        env: &str,
        _shebang: &str,
        cmd: &str,
        arg_path: Option<&str>,
        rm_tmp: Option<&str>,
    ) -> String {
        let mut parts = Vec::new();
        if !env.is_empty() {
            parts.push(env.to_string());
        }
        if !cmd.is_empty() {
            parts.push(format!("& {}", ps_quote(cmd)));
        }
        if let Some(args) = arg_path {
            parts.push(ps_quote(args));
        }
        let mut command = parts.join(" ");
        if let Some(tmp) = rm_tmp {
            command = format!(
                "{}; Remove-Item -Recurse -Force -Path {} -ErrorAction SilentlyContinue",
                command,
                ps_quote(tmp)
            );
        }
        command
    }

    fn unquote(&self, s: &str) -> String {
        // win_stat/win_file/win_copy/slurp sometimes receive src/dest/path
        // arguments wrapped in an extra layer of quoting by the templating
        // layer upstream of the core; strip one matching layer of double
        // or single quotes before the module assembler touches the value.
        let trimmed = s.trim();
        if trimmed.len() >= 2 {
            let bytes = trimmed.as_bytes();
            let first = bytes[0];
            let last = bytes[bytes.len() - 1];
            if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
                return trimmed[1..trimmed.len() - 1].to_string();
            }
        }
        trimmed.to_string()
    }
}

fn ps_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mkdtemp_uses_userprofile_by_default() {
        let sh = PowerShellShell;
        let cmd = sh.mkdtemp("ansible-tmp-1-222", false, 0o700);
        assert!(cmd.contains("$env:USERPROFILE"));
        assert!(cmd.contains("ansible-tmp-1-222"));
    }

    #[test]
    fn mkdtemp_uses_system_temp_when_requested() {
        let sh = PowerShellShell;
        let cmd = sh.mkdtemp("ansible-tmp-1-222", true, 0o700);
        assert!(cmd.contains("$env:TEMP"));
    }

    #[test]
    fn remove_recursive_uses_remove_item_recurse() {
        let sh = PowerShellShell;
        assert_eq!(
            sh.remove("C:\\temp\\x", true),
            "Remove-Item -Recurse -Force -Path 'C:\\temp\\x' -ErrorAction SilentlyContinue"
        );
    }

    #[test]
    fn env_prefix_uses_env_colon_syntax() {
        let sh = PowerShellShell;
        let mut env = Map::new();
        env.insert("FOO".to_string(), json!("bar baz"));
        assert_eq!(sh.env_prefix(&env), "$env:FOO='bar baz';");
    }

    #[test]
    fn get_remote_filename_appends_ps1() {
        let sh = PowerShellShell;
        assert_eq!(sh.get_remote_filename("win_ping"), "win_ping.ps1");
    }

    #[test]
    fn build_module_command_with_cleanup() {
        let sh = PowerShellShell;
        let cmd = sh.build_module_command(
            "",
            "",
            "C:\\Users\\a\\AppData\\Local\\Temp\\ansible-tmp-1-2\\win_ping.ps1",
            None,
            Some("C:\\Users\\a\\AppData\\Local\\Temp\\ansible-tmp-1-2"),
        );
        assert!(cmd.starts_with("& 'C:\\Users\\a\\AppData\\Local\\Temp\\ansible-tmp-1-2\\win_ping.ps1'"));
        assert!(cmd.ends_with("-ErrorAction SilentlyContinue"));
    }

    #[test]
    fn unquote_strips_one_layer_of_double_quotes() {
        let sh = PowerShellShell;
        assert_eq!(sh.unquote("\"C:\\foo\\bar\""), "C:\\foo\\bar");
    }

    #[test]
    fn unquote_leaves_unquoted_value_alone() {
        let sh = PowerShellShell;
        assert_eq!(sh.unquote("C:\\foo\\bar"), "C:\\foo\\bar");
    }
}
