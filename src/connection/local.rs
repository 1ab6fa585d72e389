//! Local (`/bin/sh` on the controller itself) connection.
//!
//! Grounded on the teacher's `RealCommandExecutor`: spawn with piped
//! stdout/stderr, drain both on dedicated reader threads so a child that
//! fills one pipe's buffer can't deadlock the other, then join and wait.
//! The teacher streams lines to `tracing`; this connection instead
//! accumulates the raw bytes, since the action core needs the literal
//! stdout to hand to the JSON result parser (spec.md §4.6).

use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::thread;

use camino::Utf8Path;

use super::{CommandResult, Connection};
use crate::error::CoreError;
use crate::shell::{PosixShell, Shell};

/// Runs commands via `/bin/sh -c` on the same machine the core runs on.
pub struct LocalConnection {
    shell: PosixShell,
}

impl LocalConnection {
    pub fn new() -> Self {
        Self {
            shell: PosixShell,
        }
    }
}

impl Default for LocalConnection {
    fn default() -> Self {
        Self::new()
    }
}

fn drain_to_buffer<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let Some(mut pipe) = pipe else {
            return Vec::new();
        };
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

impl Connection for LocalConnection {
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
        cmd: &str,
        in_data: Option<&[u8]>,
        _sudoable: bool,
    ) -> Result<CommandResult, CoreError> {
        let mut command = Command::new("/bin/sh");
        command.arg("-c").arg(cmd);
        command.stdin(Stdio::piped());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|e| CoreError::io("spawn local command", e))?;

        if let Some(data) = in_data {
            let mut stdin = child.stdin.take().expect("stdin was piped");
            let data = data.to_vec();
            let writer = thread::spawn(move || {
                let _ = stdin.write_all(&data);
            });
            let _ = writer.join();
        } else {
            drop(child.stdin.take());
        }

        let stdout_handle = drain_to_buffer(child.stdout.take());
        let stderr_handle = drain_to_buffer(child.stderr.take());

        let status = child
            .wait()
            .map_err(|e| CoreError::io("wait for local command", e))?;

        let stdout = stdout_handle.join().unwrap_or_default();
        let stderr = stderr_handle.join().unwrap_or_default();

        Ok(CommandResult {
            rc: status.code().unwrap_or(-1),
            stdout,
            stderr,
        })
    }

    fn put_file(&self, in_path: &Utf8Path, out_path: &str) -> Result<(), CoreError> {
        std::fs::copy(in_path, out_path)
            .map_err(|e| CoreError::io(format!("copy {} to {}", in_path, out_path), e))?;
        Ok(())
    }

    fn fetch_file(&self, in_path: &str, out_path: &Utf8Path) -> Result<(), CoreError> {
        std::fs::copy(in_path, out_path)
            .map_err(|e| CoreError::io(format!("copy {} to {}", in_path, out_path), e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_command_captures_stdout() {
        let conn = LocalConnection::new();
        let result = conn.exec_command("echo hello", None, true).unwrap();
        assert_eq!(result.rc, 0);
        assert_eq!(String::from_utf8_lossy(&result.stdout).trim(), "hello");
    }

    #[test]
    fn exec_command_captures_nonzero_rc() {
        let conn = LocalConnection::new();
        let result = conn.exec_command("exit 3", None, true).unwrap();
        assert_eq!(result.rc, 3);
    }

    #[test]
    fn exec_command_pipes_stdin_to_cat() {
        let conn = LocalConnection::new();
        let result = conn.exec_command("cat", Some(b"piped data"), true).unwrap();
        assert_eq!(result.stdout, b"piped data");
    }

    #[test]
    fn put_file_copies_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.txt");
        std::fs::write(&src, b"content").unwrap();
        let dst = dir.path().join("dst.txt");

        let conn = LocalConnection::new();
        let src_utf8 = Utf8Path::from_path(&src).unwrap();
        conn.put_file(src_utf8, dst.to_str().unwrap()).unwrap();

        assert_eq!(std::fs::read(&dst).unwrap(), b"content");
    }
}
