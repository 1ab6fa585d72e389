//! Accelerated connection: a persistent daemon-backed transport that
//! performs its own privilege handling out of band from `become` (spec.md
//! §4.6 step 14 calls it out by name as the one module invoked with
//! `sudoable=false` unconditionally). Wraps an inner `SshConnection` for
//! the initial daemon bootstrap and file transfer; the accelerated
//! command channel itself is out of scope (spec.md §1 Non-goals) so
//! `exec_command` delegates straight through to the inner SSH session.

use camino::Utf8Path;

use super::{CommandResult, Connection, SshConnection};
use crate::error::CoreError;
use crate::shell::Shell;

/// Transport backed by a persistent accelerated daemon connection.
pub struct AccelerateConnection {
    inner: SshConnection,
}

impl AccelerateConnection {
    pub fn new(inner: SshConnection) -> Self {
        Self { inner }
    }
}

impl Connection for AccelerateConnection {
    fn transport_name(&self) -> &'static str {
        "accelerate"
    }

    fn shell(&self) -> &dyn Shell {
        self.inner.shell()
    }

    fn has_pipelining(&self) -> bool {
        false
    }

    fn exec_command(
        &self,
        cmd: &str,
        in_data: Option<&[u8]>,
        _sudoable: bool,
    ) -> Result<CommandResult, CoreError> {
        // The accelerate daemon always runs as the user it was started as;
        // it has no concept of per-call sudoable, so the flag is ignored
        // here regardless of what the caller passed.
        self.inner.exec_command(cmd, in_data, false)
    }

    fn put_file(&self, in_path: &Utf8Path, out_path: &str) -> Result<(), CoreError> {
        self.inner.put_file(in_path, out_path)
    }

    fn fetch_file(&self, in_path: &str, out_path: &Utf8Path) -> Result<(), CoreError> {
        self.inner.fetch_file(in_path, out_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_name_is_accelerate() {
        let conn = AccelerateConnection::new(SshConnection::new("example.com"));
        assert_eq!(conn.transport_name(), "accelerate");
    }

    #[test]
    fn does_not_support_pipelining() {
        let conn = AccelerateConnection::new(SshConnection::new("example.com"));
        assert!(!conn.has_pipelining());
    }
}
