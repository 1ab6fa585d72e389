//! Privilege escalation method.
//!
//! Generalizes the teacher's `sudo`/`doas` pair to the two become methods
//! spec.md's permission-fixer decision table (§4.5) and cleanup
//! piggy-backing rule (§4.6 step 12) distinguish by name: `sudo`, which
//! root-owns the escalated process the same way regardless of target
//! user, and `su`, which spec.md §4.6 calls out by name as always forcing
//! a tmp path (its wrapping mechanics don't compose with pipelining).

use strum::Display;

/// Privilege escalation method used to wrap a remote command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum BecomeMethod {
    /// `sudo -u <user> <cmd>`.
    Sudo,
    /// `su <user> -c '<cmd>'`. Forces tmp-path creation (spec.md §4.6 step 6).
    Su,
}

impl BecomeMethod {
    /// Returns the command name for this method.
    pub fn command_name(&self) -> &'static str {
        match self {
            Self::Sudo => "sudo",
            Self::Su => "su",
        }
    }

    /// Whether this method forces `late_needs_tmp_path` to hold (spec.md
    /// §4.6 step 6: "become method is `su`").
    pub fn forces_tmp_path(&self) -> bool {
        matches!(self, Self::Su)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_names() {
        assert_eq!(BecomeMethod::Sudo.command_name(), "sudo");
        assert_eq!(BecomeMethod::Su.command_name(), "su");
    }

    #[test]
    fn only_su_forces_tmp_path() {
        assert!(!BecomeMethod::Sudo.forces_tmp_path());
        assert!(BecomeMethod::Su.forces_tmp_path());
    }

    #[test]
    fn display_matches_command_name() {
        assert_eq!(BecomeMethod::Sudo.to_string(), "sudo");
    }
}
