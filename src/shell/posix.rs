//! POSIX shell string-builder.

use serde_json::{Map, Value};

use super::{Shell, ShellFamily};
use crate::play_context::shell_quote;

/// `/bin/sh`-compatible command-line builder.
#[derive(Debug, Default, Clone, Copy)]
pub struct PosixShell;

impl Shell for PosixShell {
    fn family(&self) -> ShellFamily {
        ShellFamily::Posix
    }

    fn mkdtemp(&self, prefix: &str, use_system_tmp: bool, mode: u32) -> String {
        let base = if use_system_tmp { "/var/tmp" } else { "$HOME" };
        format!(
            "mkdir -m {mode:o} -p {base} && mktemp -d {base}/{prefix}XXXXXXXXXX",
            mode = mode,
            base = base,
            prefix = prefix
        )
    }

    fn remove(&self, path: &str, recurse: bool) -> String {
        if recurse {
            format!("rm -rf {}", shell_quote(path))
        } else {
            format!("rm -f {}", shell_quote(path))
        }
    }

    fn chmod(&self, path: &str, mode: &str, recursive: bool) -> String {
        if recursive {
            format!("chmod -R {} {}", mode, shell_quote(path))
        } else {
            format!("chmod {} {}", mode, shell_quote(path))
        }
    }

    fn chown(&self, path: &str, owner: &str, recursive: bool) -> String {
        if recursive {
            format!("chown -R {} {}", owner, shell_quote(path))
        } else {
            format!("chown {} {}", owner, shell_quote(path))
        }
    }

    fn set_user_facl(&self, path: &str, owner: &str, perms: &str, recursive: bool) -> String {
        if recursive {
            format!("setfacl -R -m u:{}:{} {}", owner, perms, shell_quote(path))
        } else {
            format!("setfacl -m u:{}:{} {}", owner, perms, shell_quote(path))
        }
    }

    fn exists(&self, path: &str) -> String {
        format!("test -e {}", shell_quote(path))
    }

    fn expand_user(&self, path: &str) -> String {
        format!("echo {}", path)
    }

    fn join_path(&self, parts: &[&str]) -> String {
        parts
            .iter()
            .filter(|p| !p.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join("/")
    }

    fn env_prefix(&self, env: &Map<String, Value>) -> String {
        env.iter()
            .map(|(k, v)| format!("{}={}", k, shell_quote(&value_to_string(v))))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn get_remote_filename(&self, module_name: &str) -> String {
        module_name.to_string()
    }

    fn build_module_command(
        &self,
        env: &str,
        shebang: &str,
        cmd: &str,
        arg_path: Option<&str>,
        rm_tmp: Option<&str>,
    ) -> String {
        let interpreter = shebang.trim_start_matches("#!").trim();
        let mut parts = Vec::new();
        if !env.is_empty() {
            parts.push(env.to_string());
        }
        if cmd.is_empty() {
            parts.push(interpreter.to_string());
        } else {
            parts.push(format!("{} {}", interpreter, cmd));
        }
        if let Some(args) = arg_path {
            parts.push(args.to_string());
        }
        let mut command = parts.join(" ");
        if let Some(tmp) = rm_tmp {
            command = format!("{}; rm -rf {} >/dev/null 2>&1", command, shell_quote(tmp));
        }
        command
    }
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
    fn mkdtemp_includes_prefix_and_mode() {
        let sh = PosixShell;
        let cmd = sh.mkdtemp("ansible-tmp-1-222", false, 0o700);
        assert!(cmd.contains("ansible-tmp-1-222"));
        assert!(cmd.contains("700"));
        assert!(cmd.contains("$HOME"));
    }

    #[test]
    fn mkdtemp_uses_system_tmp_when_requested() {
        let sh = PosixShell;
        let cmd = sh.mkdtemp("ansible-tmp-1-222", true, 0o700);
        assert!(cmd.contains("/var/tmp"));
    }

    #[test]
    fn remove_recursive_uses_rm_rf() {
        let sh = PosixShell;
        assert_eq!(sh.remove("/tmp/x", true), "rm -rf '/tmp/x'");
    }

    #[test]
    fn env_prefix_quotes_values() {
        let sh = PosixShell;
        let mut env = Map::new();
        env.insert("FOO".to_string(), json!("bar baz"));
        assert_eq!(sh.env_prefix(&env), "FOO='bar baz'");
    }

    #[test]
    fn build_module_command_with_env_and_cleanup() {
        let sh = PosixShell;
        let cmd = sh.build_module_command(
            "A=1",
            "#!/usr/bin/python3",
            "/tmp/ansible-tmp-1-2/mod.py",
            None,
            Some("/tmp/ansible-tmp-1-2"),
        );
        assert!(cmd.starts_with("A=1 /usr/bin/python3 /tmp/ansible-tmp-1-2/mod.py"));
        assert!(cmd.ends_with("rm -rf '/tmp/ansible-tmp-1-2' >/dev/null 2>&1"));
    }

    #[test]
    fn build_module_command_pipelined_has_no_cmd_path() {
        let sh = PosixShell;
        let cmd = sh.build_module_command("", "#!/usr/bin/python3", "", None, None);
        assert_eq!(cmd, "/usr/bin/python3");
    }
}
