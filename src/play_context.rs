//! Per-play execution context (spec.md §3).
//!
//! `PlayContext` is the caller-supplied bundle of play-wide settings the
//! action core reads but never mutates: whether to escalate privilege and
//! to whom, whether pipelining/check-mode/diff are requested, and the
//! verbosity level that gates some diagnostic text (spec.md §4.3's SSH
//! rc=255 message, in particular).

use crate::privilege::BecomeMethod;

/// Play-wide settings that drive privilege escalation and execution mode.
#[derive(Debug, Clone)]
pub struct PlayContext {
    /// Whether privilege escalation is requested for this play.
    pub become_enabled: bool,
    /// The user to escalate to, when `become_enabled`.
    pub become_user: String,
    /// The escalation method, when `become_enabled`.
    pub become_method: BecomeMethod,
    /// The user the connection authenticates as.
    pub remote_user: String,
    /// Whether pipelining is requested (still gated by the connection's
    /// and module style's own support).
    pub pipelining: bool,
    /// Whether this play is running in check mode (dry run).
    pub check_mode: bool,
    /// Whether task output should be suppressed from logs (`no_log`).
    pub no_log: bool,
    /// Whether to compute and display before/after diffs.
    pub diff: bool,
    /// Verbosity level, 0 (quiet) upward.
    pub verbosity: u8,
    /// Optional shell executable override (e.g. `/bin/bash`).
    pub executable: Option<String>,
    /// Module compression scheme name, passed through to the assembler.
    pub module_compression: String,
}

impl PlayContext {
    /// Builds the become-wrapped command, or returns `cmd` unchanged if
    /// privilege escalation is not in effect. Mirrors the shape of the
    /// teacher's `RealCommandExecutor::execute` privilege-prefix wrapping,
    /// generalized from "wrap the whole argv" to "wrap a shell command
    /// string", since the remote side only ever receives a single command
    /// string (spec.md §4.7).
    pub fn make_become_cmd(&self, cmd: &str) -> String {
        match self.become_method {
            BecomeMethod::Sudo => {
                format!("sudo -H -u {} -- {}", self.become_user, cmd)
            }
            BecomeMethod::Su => {
                format!("su {} -c {}", self.become_user, shell_quote(cmd))
            }
        }
    }
}

/// Minimal POSIX single-quote escaping: wrap in single quotes, replacing
/// any embedded `'` with the `'"'"'` idiom.
pub(crate) fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r#"'"'"'"#))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_context() -> PlayContext {
        PlayContext {
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
        }
    }

    #[test]
    fn sudo_wraps_with_dash_dash_separator() {
        let ctx = base_context();
        assert_eq!(ctx.make_become_cmd("echo hi"), "sudo -H -u root -- echo hi");
    }

    #[test]
    fn su_quotes_the_inner_command() {
        let mut ctx = base_context();
        ctx.become_method = BecomeMethod::Su;
        assert_eq!(ctx.make_become_cmd("echo hi"), "su root -c 'echo hi'");
    }

    #[test]
    fn shell_quote_escapes_embedded_quotes() {
        assert_eq!(shell_quote("it's"), r#"'it'"'"'s'"#);
    }
}
