//! Remote tmp manager (spec.md §4.3).

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

use super::ActionRunner;
use crate::error::CoreError;

const TMP_MODE: u32 = 0o700;

impl<'a> ActionRunner<'a> {
    /// Creates a fresh remote scratch directory and returns its absolute
    /// path. Uses the "system" tmp location rather than the user's home
    /// whenever becoming to a peer neither root nor the connecting user —
    /// otherwise a non-root SSH user could create a directory only root
    /// can read (spec.md §4.3).
    pub fn make_tmp_path(&self, remote_user: &str) -> Result<String, CoreError> {
        let prefix = format!("ansible-tmp-{}-{}", unix_time(), rand48());
        let use_system_tmp = self.becoming_unprivileged_peer(remote_user);

        let cmd = self
            .connection
            .shell()
            .mkdtemp(&prefix, use_system_tmp, TMP_MODE);

        let result = self.low_level_execute_command(&cmd, false, None)?;

        if result.rc != 0 {
            return Err(classify_tmp_failure(
                result.rc,
                &result.stderr,
                self.connection.transport_name(),
                self.play_context.verbosity,
            ));
        }

        let raw_path = last_non_empty_line(&result.stdout);
        let joined = self.connection.shell().join_path(&[raw_path.as_str(), ""]);
        let path = joined.trim_end_matches('/').to_string();

        if path.is_empty() || path == "/" {
            return Err(CoreError::execution(
                "failed to resolve remote tmp path: mkdtemp returned the filesystem root",
            ));
        }

        *self.tmp_path.borrow_mut() = Some(path.clone());
        Ok(path)
    }

    /// Removes `path` if it is eligible: contains `-tmp-`, `_cleanup_remote_tmp`
    /// is set (`config.cleanup_remote_tmp`), and `keep_remote_files` is
    /// false. Failures only warn — a functioning transport is needed to
    /// clean up, and if it broke the directory simply leaks (spec.md §4.3).
    pub fn remove_tmp_path(&self, path: Option<&str>) {
        let Some(path) = path else {
            return;
        };
        if self.config.keep_remote_files || !self.config.cleanup_remote_tmp || !path.contains("-tmp-") {
            return;
        }

        let cmd = self.connection.shell().remove(path, true);
        match self.low_level_execute_command(&cmd, true, None) {
            Ok(result) if result.rc == 0 => {
                tracing::debug!(path = %path, "removed remote tmp path");
            }
            Ok(result) => {
                tracing::warn!(
                    path = %path,
                    rc = result.rc,
                    stderr = %String::from_utf8_lossy(&result.stderr),
                    "failed to remove remote tmp path"
                );
            }
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "failed to remove remote tmp path");
            }
        }
    }
}

fn unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn rand48() -> u64 {
    let mut rng = rand::rng();
    rng.random::<u64>() & 0xFFFF_FFFF_FFFF
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

fn classify_tmp_failure(rc: i32, stderr: &[u8], transport: &str, verbosity: u8) -> CoreError {
    let stderr_text = String::from_utf8_lossy(stderr);

    if rc == 5 {
        return CoreError::connection("Authentication failure");
    }
    if rc == 255 && transport == "ssh" {
        if verbosity > 3 {
            return CoreError::connection(format!(
                "SSH encountered an unknown error during the connection. Raw error was: {}",
                stderr_text
            ));
        }
        return CoreError::connection(
            "SSH encountered an unknown error during the connection. \
             Re-run with -vvvv for more information",
        );
    }
    if stderr_text.contains("No space left on device") {
        return CoreError::connection(stderr_text.into_owned());
    }
    CoreError::connection(
        "Authentication or permission failure. In some cases, you may have been able to \
         authenticate and did not have permissions on the target directory. \
         Consider changing the remote tmp path in the configuration.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::connection::{CommandResult as ConnCommandResult, Connection};
    use crate::module::{ConfiguredModule, ModuleAssembler, ModulePathIndex};
    use crate::play_context::PlayContext;
    use crate::privilege::BecomeMethod;
    use crate::shell::{PosixShell, Shell};
    use crate::task::Task;
    use serde_json::{Map, Value};

    struct NoopIndex;
    impl ModulePathIndex for NoopIndex {
        fn find_plugin(&self, _: &str, _: &str) -> bool {
            false
        }
    }
    struct NoopAssembler;
    impl ModuleAssembler for NoopAssembler {
        fn assemble(&self, _: &str, _: &Map<String, Value>) -> Result<ConfiguredModule, CoreError> {
            unreachable!()
        }
    }

    /// Panics if `exec_command` is ever called, so a test using it asserts
    /// "cleanup never even tried to talk to the target" by construction.
    struct PanicsOnExec {
        shell: PosixShell,
    }
    impl Connection for PanicsOnExec {
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
        ) -> Result<ConnCommandResult, CoreError> {
            panic!("remove_tmp_path should not contact the transport when cleanup is suppressed")
        }
        fn put_file(&self, _: &camino::Utf8Path, _: &str) -> Result<(), CoreError> {
            Ok(())
        }
        fn fetch_file(&self, _: &str, _: &camino::Utf8Path) -> Result<(), CoreError> {
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
    fn remove_tmp_path_noops_when_cleanup_remote_tmp_is_false() {
        let task = Task::new("ping", Map::new());
        let connection = PanicsOnExec { shell: PosixShell };
        let ctx = play_context();
        let mut config = Config::default();
        config.cleanup_remote_tmp = false;
        let index = NoopIndex;
        let assembler = NoopAssembler;
        let runner = ActionRunner::new(&task, &connection, &ctx, &config, &index, &assembler);

        runner.remove_tmp_path(Some("/tmp/ansible-tmp-1-2"));
    }

    #[test]
    fn last_non_empty_line_skips_banner_text() {
        let stdout = b"motd banner\n\n/home/alice/.ansible/tmp/ansible-tmp-1-2\n";
        assert_eq!(
            last_non_empty_line(stdout),
            "/home/alice/.ansible/tmp/ansible-tmp-1-2"
        );
    }

    #[test]
    fn rand48_stays_within_48_bits() {
        for _ in 0..100 {
            assert!(rand48() <= 0xFFFF_FFFF_FFFF);
        }
    }

    #[test]
    fn classify_tmp_failure_auth_failure_rc5() {
        let err = classify_tmp_failure(5, b"", "ssh", 0);
        assert!(err.to_string().contains("Authentication failure"));
    }

    #[test]
    fn classify_tmp_failure_ssh_generic_quiet() {
        let err = classify_tmp_failure(255, b"oops", "ssh", 1);
        assert!(err.to_string().contains("SSH encountered an unknown error"));
        assert!(!err.to_string().contains("oops"));
    }

    #[test]
    fn classify_tmp_failure_ssh_generic_verbose_includes_stderr() {
        let err = classify_tmp_failure(255, b"oops", "ssh", 4);
        assert!(err.to_string().contains("oops"));
    }

    #[test]
    fn classify_tmp_failure_disk_full() {
        let err = classify_tmp_failure(1, b"mkdir: No space left on device", "ssh", 0);
        assert!(err.to_string().contains("No space left on device"));
    }
}
