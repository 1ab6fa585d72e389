//! Shell capability bundle (spec.md §3, §6).
//!
//! A `Shell` is a pure string-builder: it never touches the network or the
//! filesystem itself, it only knows how to phrase a POSIX or PowerShell
//! command line for a given operation. The low-level executor (§4.7) is
//! the one that actually runs the strings this module builds. This split
//! mirrors the teacher's `Isolation` trait (one trait, multiple backends
//! selected by a config enum) generalized from "how to enter a rootfs" to
//! "how to phrase a remote command".

mod posix;
mod powershell;

pub use posix::PosixShell;
pub use powershell::PowerShellShell;

/// The two target shell families the core composes against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellFamily {
    /// `/bin/sh`-compatible targets.
    Posix,
    /// Windows PowerShell targets.
    PowerShell,
}

/// String-builder capability bundle for a target shell family.
///
/// Every method returns a command string (or path string); none of them
/// execute anything. `env_prefix` takes an already-merged environment
/// mapping (see `task::EnvironmentSpec::merge`) and phrases it as a
/// command-line prefix (POSIX: `A=1 B=2 `) or scripting preamble
/// (PowerShell: `$env:A='1'; $env:B='2'; `).
pub trait Shell: Send + Sync {
    /// The shell family this implementation targets.
    fn family(&self) -> ShellFamily;

    /// Builds a command that creates a temp directory under `prefix`,
    /// printing its absolute path to stdout. `use_system_tmp` selects a
    /// system-wide scratch area (e.g. `/var/tmp`) over the user's home.
    fn mkdtemp(&self, prefix: &str, use_system_tmp: bool, mode: u32) -> String;

    /// Builds a command that removes `path`, recursively if `recurse`.
    fn remove(&self, path: &str, recurse: bool) -> String;

    /// Builds a `chmod`-equivalent command.
    fn chmod(&self, path: &str, mode: &str, recursive: bool) -> String;

    /// Builds a `chown`-equivalent command.
    fn chown(&self, path: &str, owner: &str, recursive: bool) -> String;

    /// Builds a command that grants `owner` the given POSIX ACL
    /// permission bits (e.g. `"rx"`, `"rX"`) on `path`.
    fn set_user_facl(&self, path: &str, owner: &str, perms: &str, recursive: bool) -> String;

    /// Builds a command that tests whether `path` exists (exit code 0/1).
    fn exists(&self, path: &str) -> String;

    /// Builds a command that expands a leading `~`/`~user` in `path` to
    /// an absolute home directory.
    fn expand_user(&self, path: &str) -> String;

    /// Joins path components using this shell family's separator.
    fn join_path(&self, parts: &[&str]) -> String;

    /// Phrases an already-merged environment mapping as a command prefix.
    fn env_prefix(&self, env: &serde_json::Map<String, serde_json::Value>) -> String;

    /// Returns the on-disk filename a module named `module_name` should be
    /// staged under (e.g. appending `.ps1` for PowerShell targets).
    fn get_remote_filename(&self, module_name: &str) -> String;

    /// Assembles the final command line that runs a staged (or piped)
    /// module: `env` is the environment prefix, `shebang` the interpreter
    /// line, `cmd` the path to the staged module file (empty when relying
    /// on pipelining and the shebang alone), `arg_path` the optional
    /// separate args file for old-style/non-native-JSON modules, and
    /// `rm_tmp` an optional tmp directory to remove in the same command
    /// (cleanup piggy-backing, spec.md §4.6 step 12).
    fn build_module_command(
        &self,
        env: &str,
        shebang: &str,
        cmd: &str,
        arg_path: Option<&str>,
        rm_tmp: Option<&str>,
    ) -> String;

    /// Strips outer quoting artifacts from a string, when the shell family
    /// needs it (PowerShell's `win_*`/`slurp` src/dest/path rewriting in
    /// spec.md §4.2 step 2). Not all shells need this; default is a no-op.
    fn unquote(&self, s: &str) -> String {
        s.to_string()
    }
}
