//! Transport abstraction (spec.md §3, §4.1).
//!
//! A `Connection` is the thing that actually talks to the target: it runs
//! commands and moves file content. It is deliberately ignorant of modules,
//! privilege escalation wrapping, or result parsing — those live one layer
//! up in `action`. This mirrors the teacher's `Isolation` trait boundary:
//! `Isolation` only knows how to run a command *inside* a rootfs, the
//! orchestration above it (phases, provisioners) decides *what* to run.

mod accelerate;
mod local;
mod ssh;

pub use accelerate::AccelerateConnection;
pub use local::LocalConnection;
pub use ssh::SshConnection;

use camino::Utf8Path;

use crate::error::CoreError;
use crate::shell::{Shell, ShellFamily};

/// The result of running a command over a connection: exit status plus
/// the two output streams, already flattened to owned buffers (spec.md
/// §4.7 — the core never holds a live pipe past the call that drains it).
#[derive(Debug, Clone, Default)]
pub struct CommandResult {
    pub rc: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Transport abstraction between the core and a target host.
///
/// Implementations are blocking: `exec_command` and `put_file` do not
/// return until the operation has fully completed (spec.md §5 — no async
/// runtime, one executor thread per in-flight task).
pub trait Connection: Send + Sync {
    /// A short transport name used in error messages and logs, e.g.
    /// `"ssh"`, `"local"`, `"accelerate"`.
    fn transport_name(&self) -> &'static str;

    /// The shell family/string-builder this connection's target speaks.
    fn shell(&self) -> &dyn Shell;

    /// Whether this transport supports pipelining (streaming a module's
    /// source on stdin instead of staging a file) at all. Actually using
    /// pipelining additionally requires the module style to support it
    /// (spec.md §4.2's `module_implementation_preferences`/style gate) and
    /// the play context to request it.
    fn has_pipelining(&self) -> bool;

    /// Whether this transport may substitute a shell invocation of `cmd`
    /// for an argv-style exec, when the caller has no special executable
    /// requirement. Local/SSH transports generally allow this; some
    /// sandboxed ones might not.
    fn allow_executable(&self) -> bool {
        true
    }

    /// Ordered module source-file suffixes to probe when resolving a
    /// module name (spec.md §3, §4.2 step 1): `[".py", ""]` for POSIX
    /// targets, `[".ps1"]` for PowerShell ones. Default derives from the
    /// shell family; a transport only needs to override this if it
    /// supports a family-specific suffix set of its own.
    fn module_implementation_preferences(&self) -> &'static [&'static str] {
        match self.shell().family() {
            ShellFamily::Posix => &[".py", ""],
            ShellFamily::PowerShell => &[".ps1"],
        }
    }

    /// Runs `cmd` as a single shell command line on the target, returning
    /// once it has exited. `in_data`, when present, is written to the
    /// child's stdin and the pipe closed (used for pipelined module runs).
    /// `sudoable` mirrors the low-level executor's own become decision
    /// (spec.md §4.7); most transports ignore it since the caller has
    /// already wrapped `cmd` in the become invocation when appropriate,
    /// but a transport with its own built-in privilege mechanism (e.g.
    /// `accelerate`, spec.md §4.6 step 14) may use it to suppress that
    /// wrapping entirely.
    fn exec_command(
        &self,
        cmd: &str,
        in_data: Option<&[u8]>,
        sudoable: bool,
    ) -> Result<CommandResult, CoreError>;

    /// Copies the local file at `in_path` to `out_path` on the target.
    fn put_file(&self, in_path: &Utf8Path, out_path: &str) -> Result<(), CoreError>;

    /// Fetches the target file at `in_path` to the local path `out_path`
    /// (used by the `fetch` action and by diff/checksum helpers that need
    /// to read remote content back for comparison).
    fn fetch_file(&self, in_path: &str, out_path: &Utf8Path) -> Result<(), CoreError>;
}
