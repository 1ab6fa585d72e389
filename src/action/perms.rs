//! Permission fixer (spec.md §4.5).

use super::ActionRunner;
use crate::error::CoreError;
use crate::shell::ShellFamily;

impl<'a> ActionRunner<'a> {
    /// Makes `path` readable (and optionally executable) by the effective
    /// module-executing identity. A no-op on PowerShell targets (the
    /// caller has no POSIX-ACL analog there) and when `path` is absent.
    pub fn fixup_perms(
        &self,
        path: Option<&str>,
        remote_user: &str,
        execute: bool,
        recursive: bool,
    ) -> Result<(), CoreError> {
        let Some(path) = path else {
            tracing::debug!("fixup_perms: no path supplied, nothing to do");
            return Ok(());
        };

        if self.connection.shell().family() == ShellFamily::PowerShell {
            return Ok(());
        }

        if !self.play_context.become_enabled {
            if execute {
                let cmd = self.connection.shell().chmod(path, "u+x", recursive);
                self.low_level_execute_command(&cmd, true, None)?;
            }
            return Ok(());
        }

        let become_user = &self.play_context.become_user;
        if become_user == "root" || become_user == remote_user {
            return Ok(());
        }

        self.fixup_perms_for_peer(path, become_user, execute, recursive)
    }

    fn fixup_perms_for_peer(
        &self,
        path: &str,
        become_user: &str,
        execute: bool,
        recursive: bool,
    ) -> Result<(), CoreError> {
        let chown_cmd = self.connection.shell().chown(path, become_user, recursive);
        let chown_result = self.low_level_execute_command(&chown_cmd, true, None)?;

        if chown_result.rc == 0 {
            if execute {
                let cmd = self.connection.shell().chmod(path, "u+x", recursive);
                self.low_level_execute_command(&cmd, true, None)?;
            }
            return Ok(());
        }

        if self.play_context.remote_user == "root" {
            return Err(CoreError::execution(format!(
                "chown of '{}' to '{}' failed even though the connecting user is root",
                path, become_user
            )));
        }

        let acl_perms = if execute { "rx" } else { "rX" };
        let facl_cmd = self
            .connection
            .shell()
            .set_user_facl(path, become_user, acl_perms, recursive);
        let facl_result = self.low_level_execute_command(&facl_cmd, true, None)?;

        if facl_result.rc == 0 {
            return Ok(());
        }

        if !self.config.allow_world_readable_tmpfiles {
            return Err(CoreError::execution(format!(
                "failed to set permissions on the temporary files for '{}': neither chown \
                 nor setfacl succeeded. Enable world-readable tmpfiles, install the \
                 filesystem ACL package, or use become to a privileged account to fix this.",
                path
            )));
        }

        tracing::warn!(
            path = %path,
            become_user = %become_user,
            "falling back to world-readable permissions: chown and setfacl both failed"
        );
        let chmod_bits = if execute { "a+rx" } else { "a+rX" };
        let chmod_cmd = self.connection.shell().chmod(path, chmod_bits, recursive);
        let chmod_result = self.low_level_execute_command(&chmod_cmd, true, None)?;
        if chmod_result.rc != 0 {
            return Err(CoreError::execution(format!(
                "failed to set world-readable permissions on '{}' as a last resort",
                path
            )));
        }
        Ok(())
    }
}
