//! Configuration constants for the action execution core.
//!
//! Configuration constants are process-wide global state in the system this
//! crate is modeled on (spec.md §3). Per the REDESIGN note in spec.md §9,
//! this crate instead threads a `Config` value through `ActionBase::new`,
//! keeping a `Default` impl as the process-wide fallback for top-level
//! entry points (the demo CLI in `main.rs`).

/// Tunable knobs that govern tmp-file retention, syslog noise, debug
/// payload injection, diff size limits, and the two permission-fixer
/// escalation gates.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Keep remote tmp directories instead of cleaning them up after a
    /// module invocation. Also disables pipelining (spec.md §4.6 step 6).
    pub keep_remote_files: bool,
    /// Master switch for remote tmp cleanup, independent of
    /// `keep_remote_files`/a call's own `persist_files`/`delete_remote_tmp`
    /// choice: when `false`, `remove_tmp_path` and the invoker's cleanup
    /// piggy-backing are both suppressed outright (spec.md §4.3's
    /// `_cleanup_remote_tmp` gate).
    pub cleanup_remote_tmp: bool,
    /// Inject `_ansible_no_log = true` into module args regardless of the
    /// task's own `no_log` setting, suppressing target-side syslogging.
    pub no_target_syslog: bool,
    /// Inject `_ansible_debug = true` into module args.
    pub debug: bool,
    /// Files larger than this many bytes are reported as `dst_larger`/
    /// `src_larger` rather than slurped for diffing. Zero or negative
    /// disables the limit.
    pub max_file_size_for_diff: i64,
    /// Gate for the permission fixer's last-resort `chmod a+rX`/`a+rx`
    /// escalation when neither chown nor setfacl succeeded.
    pub allow_world_readable_tmpfiles: bool,
    /// When `become_user == remote_user`, whether to still wrap the
    /// command in the become method (some methods behave differently
    /// becoming to the same user, e.g. re-reading `sudoers`).
    pub become_allow_same_user: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keep_remote_files: false,
            cleanup_remote_tmp: true,
            no_target_syslog: false,
            debug: false,
            max_file_size_for_diff: 1024 * 1024,
            allow_world_readable_tmpfiles: false,
            become_allow_same_user: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_conservative() {
        let cfg = Config::default();
        assert!(!cfg.keep_remote_files);
        assert!(cfg.cleanup_remote_tmp);
        assert!(!cfg.allow_world_readable_tmpfiles);
        assert!(!cfg.become_allow_same_user);
        assert_eq!(cfg.max_file_size_for_diff, 1024 * 1024);
    }
}
