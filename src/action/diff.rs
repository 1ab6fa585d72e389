//! Stat/checksum/diff helpers (spec.md §4.8).

use serde_json::{Map, Value};
use sha1::{Digest, Sha1};

use super::invoker::ExecuteModuleOptions;
use super::ActionRunner;
use crate::error::CoreError;

/// Sentinel checksum values `remote_checksum` may return in place of a
/// sha1 hex digest (spec.md §4.8).
pub mod checksum_sentinel {
    pub const UNKNOWN: &str = "0";
    pub const ABSENT: &str = "1";
    pub const PERMISSION_DENIED: &str = "2";
    pub const DIRECTORY: &str = "3";
    pub const MODULE_FAILURE: &str = "4";
}

/// Before/after diff payload (spec.md §4.8, §10's field names).
#[derive(Debug, Clone, Default)]
pub struct DiffData {
    pub before_header: Option<String>,
    pub after_header: Option<String>,
    pub before: Option<String>,
    pub after: Option<String>,
    pub src_binary: bool,
    pub dst_binary: bool,
    pub src_larger: Option<i64>,
    pub dst_larger: Option<i64>,
}

impl<'a> ActionRunner<'a> {
    /// Invokes the external `stat` module on `path`, requesting a sha1
    /// checksum rather than md5. A missing file is synthesized as
    /// `checksum = "1"` (absent) rather than treated as an error.
    pub fn execute_remote_stat(
        &self,
        path: &str,
        task_vars: &Map<String, Value>,
        follow: bool,
        tmp: Option<&str>,
    ) -> Result<Map<String, Value>, CoreError> {
        let mut args = Map::new();
        args.insert("path".to_string(), Value::String(path.to_string()));
        args.insert("follow".to_string(), Value::Bool(follow));
        args.insert("get_md5".to_string(), Value::Bool(false));
        args.insert("get_checksum".to_string(), Value::Bool(true));
        args.insert(
            "checksum_algo".to_string(),
            Value::String("sha1".to_string()),
        );

        let mut result = self.execute_module(
            ExecuteModuleOptions {
                module_name: Some("stat".to_string()),
                module_args: Some(args),
                tmp: tmp.map(str::to_string),
                persist_files: true,
                delete_remote_tmp: false,
            },
            task_vars,
        )?;

        let stat = result
            .remove("stat")
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default();

        if !stat.get("exists").and_then(Value::as_bool).unwrap_or(true) {
            let mut missing = Map::new();
            missing.insert("exists".to_string(), Value::Bool(false));
            missing.insert(
                "checksum".to_string(),
                Value::String(checksum_sentinel::ABSENT.to_string()),
            );
            return Ok(missing);
        }

        Ok(stat)
    }

    /// Returns the sha1 hex digest of `path` on the target, or one of the
    /// sentinel values in [`checksum_sentinel`] when it can't be computed.
    /// Never raises (Testable Property 6, spec.md §8): a failure to stat
    /// the path — permission denied, the module itself failing, anything
    /// — degrades to a sentinel instead of propagating, the same way a
    /// missing source file degrades to `"1"` rather than an error.
    ///
    /// Checksums the link itself rather than its target (`follow = false`),
    /// matching the reference implementation — a module managing a
    /// symlinked destination needs to know about the link, not transparently
    /// checksum through it.
    pub fn remote_checksum(&self, path: &str, task_vars: &Map<String, Value>) -> String {
        let stat = match self.execute_remote_stat(path, task_vars, false, None) {
            Ok(stat) => stat,
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "remote_checksum: stat failed");
                let message = err.to_string();
                let sentinel = if message.to_lowercase().contains("permission") {
                    checksum_sentinel::PERMISSION_DENIED
                } else {
                    checksum_sentinel::MODULE_FAILURE
                };
                return sentinel.to_string();
            }
        };

        if let Some(Value::String(checksum)) = stat.get("checksum") {
            if checksum == checksum_sentinel::ABSENT {
                return checksum_sentinel::ABSENT.to_string();
            }
            return checksum.clone();
        }

        if stat.get("isdir").and_then(Value::as_bool) == Some(true) {
            return checksum_sentinel::DIRECTORY.to_string();
        }

        checksum_sentinel::UNKNOWN.to_string()
    }

    /// Expands a leading `~`/`~user` in `path` by asking the remote shell,
    /// so relative-to-home paths resolve against the target's filesystem
    /// rather than the controller's. Paths not starting with `~` are
    /// returned unchanged.
    pub fn remote_expand_user(&self, path: &str) -> Result<String, CoreError> {
        if !path.starts_with('~') {
            return Ok(path.to_string());
        }

        let (mut prefix, tail) = match path.split_once('/') {
            Some((prefix, tail)) => (prefix.to_string(), Some(tail.to_string())),
            None => (path.to_string(), None),
        };

        if prefix == "~" && self.play_context.become_enabled {
            prefix = format!("~{}", self.play_context.become_user);
        }

        let cmd = self.connection.shell().expand_user(&prefix);
        let result = self.low_level_execute_command(&cmd, false, None)?;
        let expanded = last_non_empty_line(&result.stdout);

        match tail {
            Some(tail) => Ok(self.connection.shell().join_path(&[&expanded, &tail])),
            None => Ok(expanded),
        }
    }

    /// Computes a before/after diff payload for a module about to replace
    /// `destination` with `source`. `source_file` selects whether `source`
    /// is a local path to read, or literal content already in hand.
    pub fn get_diff_data(
        &self,
        destination: &str,
        source: &str,
        task_vars: &Map<String, Value>,
        source_file: bool,
    ) -> Result<DiffData, CoreError> {
        if self.play_context.no_log {
            return Ok(DiffData::default());
        }

        let mut diff = DiffData {
            before_header: Some(destination.to_string()),
            after_header: Some(if source_file {
                source.to_string()
            } else {
                "dynamically generated".to_string()
            }),
            ..Default::default()
        };

        let mut peek_args = Map::new();
        peek_args.insert("path".to_string(), Value::String(destination.to_string()));
        peek_args.insert("diff_peek".to_string(), Value::Bool(true));
        let peek = self.execute_module(
            ExecuteModuleOptions {
                module_name: Some("file".to_string()),
                module_args: Some(peek_args),
                tmp: None,
                persist_files: true,
                delete_remote_tmp: false,
            },
            task_vars,
        )?;

        if peek.get("failed").and_then(Value::as_bool) == Some(true)
            || !peek.get("present").and_then(Value::as_bool).unwrap_or(true)
        {
            diff.before = Some(String::new());
        } else if peek.get("binary").and_then(Value::as_bool) == Some(true) {
            diff.dst_binary = true;
        } else if let Some(size) = peek.get("size").and_then(Value::as_i64) {
            if self.config.max_file_size_for_diff > 0
                && size > self.config.max_file_size_for_diff
            {
                diff.dst_larger = Some(size);
            } else {
                diff.before = Some(self.slurp_remote(destination, task_vars)?);
            }
        }

        if source_file {
            let content = std::fs::read(source).map_err(|e| CoreError::io(source, e))?;
            if content.contains(&0u8) {
                diff.src_binary = true;
            } else if self.config.max_file_size_for_diff > 0
                && content.len() as i64 > self.config.max_file_size_for_diff
            {
                diff.src_larger = Some(content.len() as i64);
            } else {
                diff.after = Some(String::from_utf8_lossy(&content).into_owned());
            }
        } else {
            diff.after = Some(source.to_string());
        }

        Ok(diff)
    }

    fn slurp_remote(
        &self,
        path: &str,
        task_vars: &Map<String, Value>,
    ) -> Result<String, CoreError> {
        let mut args = Map::new();
        args.insert("src".to_string(), Value::String(path.to_string()));
        let result = self.execute_module(
            ExecuteModuleOptions {
                module_name: Some("slurp".to_string()),
                module_args: Some(args),
                tmp: None,
                persist_files: true,
                delete_remote_tmp: false,
            },
            task_vars,
        )?;

        let encoding = result.get("encoding").and_then(Value::as_str).unwrap_or("");
        if encoding != "base64" {
            return Err(CoreError::execution(format!(
                "slurp returned unsupported encoding '{}': only base64 is handled",
                encoding
            )));
        }

        let content = result
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let decoded = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, content)
            .map_err(|e| CoreError::execution(format!("slurp content is not valid base64: {}", e)))?;
        Ok(String::from_utf8_lossy(&decoded).into_owned())
    }
}

/// Computes the sha1 hex digest of a local byte buffer (used by `copy` to
/// decide whether the destination already matches before staging it).
pub(crate) fn sha1_hex(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

fn last_non_empty_line(stdout: &[u8]) -> String {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .next_back()
        .unwrap_or("")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::connection::{CommandResult, Connection};
    use crate::module::{ConfiguredModule, ModuleAssembler, ModulePathIndex, ModuleStyle};
    use crate::play_context::PlayContext;
    use crate::privilege::BecomeMethod;
    use crate::shell::{PosixShell, Shell};
    use crate::task::Task;

    #[test]
    fn sha1_hex_matches_known_digest() {
        assert_eq!(
            sha1_hex(b"hello"),
            "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"
        );
    }

    struct AlwaysFindsIndex;
    impl ModulePathIndex for AlwaysFindsIndex {
        fn find_plugin(&self, _: &str, _: &str) -> bool {
            true
        }
    }

    struct NoopAssembler;
    impl ModuleAssembler for NoopAssembler {
        fn assemble(&self, _: &str, _: &Map<String, Value>) -> Result<ConfiguredModule, CoreError> {
            Ok(ConfiguredModule {
                style: ModuleStyle::New,
                shebang: "#!/usr/bin/python3".to_string(),
                bytes: Vec::new(),
            })
        }
    }

    /// A connection whose every `exec_command` fails, used to exercise
    /// `remote_checksum`'s never-raises contract.
    struct FailingConnection {
        shell: PosixShell,
        message: &'static str,
    }

    impl Connection for FailingConnection {
        fn transport_name(&self) -> &'static str {
            "local"
        }
        fn shell(&self) -> &dyn Shell {
            &self.shell
        }
        fn has_pipelining(&self) -> bool {
            true
        }
        fn exec_command(
            &self,
            _cmd: &str,
            _in_data: Option<&[u8]>,
            _sudoable: bool,
        ) -> Result<CommandResult, CoreError> {
            Err(CoreError::execution(self.message))
        }
        fn put_file(&self, _in_path: &camino::Utf8Path, _out_path: &str) -> Result<(), CoreError> {
            Ok(())
        }
        fn fetch_file(&self, _in_path: &str, _out_path: &camino::Utf8Path) -> Result<(), CoreError> {
            unreachable!()
        }
    }

    fn play_context() -> PlayContext {
        PlayContext {
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
        }
    }

    #[test]
    fn remote_checksum_degrades_to_sentinel_on_stat_failure() {
        let task = Task::new("copy", Map::new());
        let connection = FailingConnection {
            shell: PosixShell,
            message: "boom",
        };
        let ctx = play_context();
        let config = Config::default();
        let index = AlwaysFindsIndex;
        let assembler = NoopAssembler;
        let runner = ActionRunner::new(&task, &connection, &ctx, &config, &index, &assembler);

        let checksum = runner.remote_checksum("/etc/whatever", &Map::new());
        assert_eq!(checksum, checksum_sentinel::MODULE_FAILURE);
    }

    #[test]
    fn remote_checksum_maps_permission_errors_to_their_own_sentinel() {
        let task = Task::new("copy", Map::new());
        let connection = FailingConnection {
            shell: PosixShell,
            message: "Permission denied",
        };
        let ctx = play_context();
        let config = Config::default();
        let index = AlwaysFindsIndex;
        let assembler = NoopAssembler;
        let runner = ActionRunner::new(&task, &connection, &ctx, &config, &index, &assembler);

        let checksum = runner.remote_checksum("/etc/whatever", &Map::new());
        assert_eq!(checksum, checksum_sentinel::PERMISSION_DENIED);
    }
}
