//! Module invoker (spec.md §4.6): assembles the command, runs it, and
//! parses the JSON result tolerant of leading banner noise.

use serde_json::{Map, Value};

use super::ActionRunner;
use crate::error::CoreError;
use crate::module::{configure_module, ModuleStyle};

/// Options controlling tmp-path reuse and cleanup for one `execute_module`
/// call (spec.md §4.6's `tmp`, `persist_files`, `delete_remote_tmp`
/// parameters).
#[derive(Debug, Clone, Default)]
pub struct ExecuteModuleOptions {
    pub module_name: Option<String>,
    pub module_args: Option<Map<String, Value>>,
    pub tmp: Option<String>,
    pub persist_files: bool,
    pub delete_remote_tmp: bool,
}

impl<'a> ActionRunner<'a> {
    /// Assembles, stages (or pipelines), runs, and parses the result of a
    /// module invocation. The generic engine behind every concrete
    /// `ActionModule`.
    pub fn execute_module(
        &self,
        options: ExecuteModuleOptions,
        task_vars: &Map<String, Value>,
    ) -> Result<Map<String, Value>, CoreError> {
        let module_name = options
            .module_name
            .clone()
            .unwrap_or_else(|| self.task.action.clone());
        let mut module_args = options
            .module_args
            .clone()
            .unwrap_or_else(|| self.task.args.clone());

        inject_control_args(&mut module_args, self);

        let remote_user = self.remote_user(task_vars);

        let suffixes = self.connection.module_implementation_preferences();
        let (resolved_name, resolved_args, configured) = configure_module(
            &module_name,
            &module_args,
            &self.task.action,
            suffixes,
            self.module_index,
            self.connection.shell(),
            self.assembler,
        )?;
        module_args = resolved_args;

        let mut tmp = options.tmp.clone().or_else(|| self.tmp_path.borrow().clone());
        if tmp.is_none() && self.late_needs_tmp_path(configured.style) {
            tmp = Some(self.make_tmp_path(&remote_user)?);
        }

        let remote_module_path = match &tmp {
            Some(t) => {
                let filename = self.connection.shell().get_remote_filename(&resolved_name);
                Some(self.connection.shell().join_path(&[t.as_str(), filename.as_str()]))
            }
            None => None,
        };
        let args_file_path = if configured.style.needs_args_file() {
            tmp.as_ref()
                .map(|t| self.connection.shell().join_path(&[t.as_str(), "args"]))
        } else {
            None
        };

        let pure_pipelining = configured.style == ModuleStyle::New && tmp.is_none();
        if !pure_pipelining {
            if let Some(remote_path) = &remote_module_path {
                let local = tempfile::NamedTempFile::new()
                    .map_err(|e| CoreError::io("stage module bytes locally", e))?;
                std::fs::write(local.path(), &configured.bytes)
                    .map_err(|e| CoreError::io("write local module staging file", e))?;
                let local_path = camino::Utf8Path::from_path(local.path())
                    .ok_or_else(|| CoreError::execution("staging path is not valid UTF-8"))?;
                self.transfer_file(local_path, remote_path)?;
            }
            if let Some(args_path) = &args_file_path {
                let args_body = encode_args_for_style(configured.style, &module_args)?;
                self.write_remote_text(args_path, &args_body)?;
            }
        }

        let env = self.task.environment.merge();
        let env_prefix = self.connection.shell().env_prefix(&env);

        self.fixup_perms(tmp.as_deref(), &remote_user, true, true)?;

        let use_pipelining = self.connection.has_pipelining()
            && self.play_context.pipelining
            && !self.config.keep_remote_files
            && configured.style == ModuleStyle::New;

        let piggyback_cleanup = tmp
            .as_deref()
            .map(|t| {
                t.contains("-tmp-")
                    && !self.config.keep_remote_files
                    && self.config.cleanup_remote_tmp
                    && !options.persist_files
                    && options.delete_remote_tmp
                    && (!self.play_context.become_enabled || self.play_context.become_user == "root")
            })
            .unwrap_or(false);

        let rm_tmp = if piggyback_cleanup {
            tmp.as_deref()
        } else {
            None
        };

        let cmd_path = if use_pipelining {
            String::new()
        } else {
            remote_module_path.clone().unwrap_or_default()
        };

        let cmd = self.connection.shell().build_module_command(
            &env_prefix,
            &configured.shebang,
            &cmd_path,
            args_file_path.as_deref(),
            rm_tmp,
        );

        let in_data = if use_pipelining {
            Some(configured.bytes.as_slice())
        } else {
            None
        };

        // The `accelerate` connection has its own built-in privilege
        // mechanism and must not be wrapped in a become invocation on top
        // of it (spec.md §4.6 step 14).
        let sudoable = resolved_name != "accelerate";
        let result = self.low_level_execute_command(&cmd, sudoable, in_data)?;

        if !piggyback_cleanup && self.play_context.become_user != "root" {
            self.remove_tmp_path(tmp.as_deref());
        }

        Ok(parse_module_result(&result.stdout, &result.stderr))
    }

    /// Whether a tmp path must be created even though none was supplied
    /// (spec.md §4.6 step 6): pipelining is off/unsupported, files are
    /// being kept, the become method forces it, or the style isn't the
    /// modern pipelineable one.
    fn late_needs_tmp_path(&self, style: ModuleStyle) -> bool {
        !self.connection.has_pipelining()
            || !self.play_context.pipelining
            || self.config.keep_remote_files
            || self.play_context.become_method.forces_tmp_path()
            || style != ModuleStyle::New
    }

    fn write_remote_text(&self, remote_path: &str, text: &str) -> Result<(), CoreError> {
        let local = tempfile::NamedTempFile::new()
            .map_err(|e| CoreError::io("stage args file locally", e))?;
        std::fs::write(local.path(), text.as_bytes())
            .map_err(|e| CoreError::io("write local args staging file", e))?;
        let local_path = camino::Utf8Path::from_path(local.path())
            .ok_or_else(|| CoreError::execution("staging path is not valid UTF-8"))?;
        self.transfer_file(local_path, remote_path)
    }
}

fn inject_control_args(args: &mut Map<String, Value>, runner: &ActionRunner<'_>) {
    args.insert(
        "_ansible_check_mode".to_string(),
        Value::Bool(runner.play_context.check_mode),
    );
    args.insert(
        "_ansible_no_log".to_string(),
        Value::Bool(runner.play_context.no_log || runner.config.no_target_syslog),
    );
    args.insert("_ansible_debug".to_string(), Value::Bool(runner.config.debug));
    args.insert("_ansible_diff".to_string(), Value::Bool(runner.play_context.diff));
    args.insert(
        "_ansible_verbosity".to_string(),
        Value::Number(runner.play_context.verbosity.into()),
    );
}

fn encode_args_for_style(
    style: ModuleStyle,
    args: &Map<String, Value>,
) -> Result<String, CoreError> {
    match style {
        ModuleStyle::Old => Ok(encode_old_style_args(args)),
        ModuleStyle::NonNativeWantJson => {
            serde_json::to_string(args).map_err(|e| CoreError::execution(e.to_string()))
        }
        _ => Ok(String::new()),
    }
}

/// Encodes arguments as `key="value" key2="value2" ` — note the trailing
/// space, which the original-convention parser on the other end relies on.
fn encode_old_style_args(args: &Map<String, Value>) -> String {
    let mut out = String::new();
    for (key, value) in args {
        let value_str = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        out.push_str(key);
        out.push('=');
        out.push_str(&quote_old_style_value(&value_str));
        out.push(' ');
    }
    out
}

fn quote_old_style_value(value: &str) -> String {
    if value.contains(' ') || value.is_empty() {
        format!("\"{}\"", value.replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

/// Strips leading lines that don't start with `{` or `[` (MOTD/tcgetattr
/// noise), then parses the remainder as JSON. A parse failure degrades to
/// a structured failure result rather than raising (spec.md §4.6.2).
fn parse_module_result(stdout: &[u8], stderr: &[u8]) -> Map<String, Value> {
    let stdout_text = String::from_utf8_lossy(stdout);
    let stderr_text = String::from_utf8_lossy(stderr);

    let json_start = stdout_text
        .lines()
        .position(|line| line.starts_with('{') || line.starts_with('['));

    let parsed = json_start.and_then(|start_line| {
        let json_text: String = stdout_text
            .lines()
            .skip(start_line)
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str::<Value>(&json_text).ok()
    });

    match parsed {
        Some(Value::Object(mut map)) => {
            ensure_stdout_lines(&mut map, &stdout_text);
            map
        }
        Some(other) => {
            let mut map = Map::new();
            map.insert("result".to_string(), other);
            map
        }
        None => {
            let mut map = Map::new();
            map.insert("failed".to_string(), Value::Bool(true));
            map.insert("parsed".to_string(), Value::Bool(false));
            map.insert("msg".to_string(), Value::String("MODULE FAILURE".to_string()));
            map.insert(
                "module_stdout".to_string(),
                Value::String(stdout_text.into_owned()),
            );
            map.insert(
                "module_stderr".to_string(),
                Value::String(stderr_text.clone().into_owned()),
            );
            if stderr_text.starts_with("Traceback") {
                map.insert(
                    "exception".to_string(),
                    Value::String(stderr_text.into_owned()),
                );
            }
            map
        }
    }
}

fn ensure_stdout_lines(map: &mut Map<String, Value>, stdout_text: &str) {
    if map.contains_key("stdout_lines") {
        return;
    }
    if let Some(Value::String(stdout)) = map.get("stdout") {
        let lines: Vec<Value> = stdout.lines().map(|l| Value::String(l.to_string())).collect();
        map.insert("stdout_lines".to_string(), Value::Array(lines));
    } else {
        let _ = stdout_text;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_clean_json_object() {
        let result = parse_module_result(br#"{"changed":true}"#, b"");
        assert_eq!(result.get("changed"), Some(&json!(true)));
    }

    #[test]
    fn strips_banner_lines_before_json() {
        let stdout = b"tcgetattr: some banner\nmotd line\n{\"changed\":true}\n";
        let result = parse_module_result(stdout, b"");
        assert_eq!(result.get("changed"), Some(&json!(true)));
    }

    #[test]
    fn corrupt_json_yields_failed_unparsed_result() {
        let result = parse_module_result(b"not json at all", b"");
        assert_eq!(result.get("failed"), Some(&json!(true)));
        assert_eq!(result.get("parsed"), Some(&json!(false)));
        assert_eq!(result.get("msg"), Some(&json!("MODULE FAILURE")));
    }

    #[test]
    fn traceback_stderr_sets_exception_field() {
        let result = parse_module_result(b"garbage", b"Traceback (most recent call last):\nboom");
        assert!(result.get("exception").is_some());
    }

    #[test]
    fn populates_stdout_lines_when_absent() {
        let result = parse_module_result(b"{\"stdout\":\"a\\nb\"}", b"");
        assert_eq!(
            result.get("stdout_lines"),
            Some(&json!(["a", "b"]))
        );
    }

    #[test]
    fn old_style_args_are_quoted_and_space_joined() {
        let mut args = Map::new();
        args.insert("foo".to_string(), json!("a b"));
        args.insert("bar".to_string(), json!("x"));
        let encoded = encode_old_style_args(&args);
        assert!(encoded.contains("foo=\"a b\" "));
        assert!(encoded.contains("bar=x "));
    }

    #[test]
    fn accelerate_module_runs_with_sudoable_false() {
        use std::cell::RefCell;

        use crate::config::Config;
        use crate::connection::{CommandResult, Connection};
        use crate::module::{ConfiguredModule, ModuleAssembler, ModulePathIndex};
        use crate::play_context::PlayContext;
        use crate::privilege::BecomeMethod;
        use crate::shell::{PosixShell, Shell};
        use crate::task::Task;

        struct AlwaysFindsIndex;
        impl ModulePathIndex for AlwaysFindsIndex {
            fn find_plugin(&self, _: &str, _: &str) -> bool {
                true
            }
        }

        struct NewStyleAssembler;
        impl ModuleAssembler for NewStyleAssembler {
            fn assemble(
                &self,
                _: &str,
                _: &Map<String, Value>,
            ) -> Result<ConfiguredModule, CoreError> {
                Ok(ConfiguredModule {
                    style: ModuleStyle::New,
                    shebang: "#!/usr/bin/python3".to_string(),
                    bytes: b"module body".to_vec(),
                })
            }
        }

        struct RecordingConnection {
            shell: PosixShell,
            sudoable_seen: RefCell<Vec<bool>>,
        }

        impl Connection for RecordingConnection {
            fn transport_name(&self) -> &'static str {
                "accelerate"
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
                sudoable: bool,
            ) -> Result<CommandResult, CoreError> {
                self.sudoable_seen.borrow_mut().push(sudoable);
                Ok(CommandResult {
                    rc: 0,
                    stdout: br#"{"changed":false}"#.to_vec(),
                    stderr: Vec::new(),
                })
            }
            fn put_file(&self, _: &camino::Utf8Path, _: &str) -> Result<(), CoreError> {
                Ok(())
            }
            fn fetch_file(&self, _: &str, _: &camino::Utf8Path) -> Result<(), CoreError> {
                unreachable!()
            }
        }

        let task = Task::new("accelerate", Map::new());
        let connection = RecordingConnection {
            shell: PosixShell,
            sudoable_seen: RefCell::new(Vec::new()),
        };
        let ctx = PlayContext {
            become_enabled: true,
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
        let assembler = NewStyleAssembler;
        let runner = ActionRunner::new(&task, &connection, &ctx, &config, &index, &assembler);

        runner
            .execute_module(ExecuteModuleOptions::default(), &Map::new())
            .unwrap();

        assert_eq!(connection.sudoable_seen.borrow().as_slice(), &[false]);
    }
}
