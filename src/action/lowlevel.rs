//! Low-level executor (spec.md §4.7).

use super::ActionRunner;
use crate::connection::CommandResult;
use crate::error::CoreError;
use crate::play_context::shell_quote;

const BECOME_SUCCESS_PREFIX: &str = "BECOME-SUCCESS-";

impl<'a> ActionRunner<'a> {
    /// Runs `cmd` on the target, applying the become wrapper and
    /// executable override as the play context dictates, and stripping
    /// the `BECOME-SUCCESS-<token>` sentinel before returning.
    ///
    /// An empty `cmd` short-circuits without contacting the transport at
    /// all — PowerShell has no analog for some POSIX no-ops (spec.md
    /// §4.7).
    pub fn low_level_execute_command(
        &self,
        cmd: &str,
        sudoable: bool,
        in_data: Option<&[u8]>,
    ) -> Result<CommandResult, CoreError> {
        if cmd.is_empty() {
            return Ok(CommandResult {
                rc: 254,
                stdout: Vec::new(),
                stderr: Vec::new(),
            });
        }

        let remote_user = &self.play_context.remote_user;
        let mut wrapped = cmd.to_string();

        if sudoable
            && self.play_context.become_enabled
            && (self.config.become_allow_same_user
                || self.play_context.become_user != *remote_user)
        {
            wrapped = self.play_context.make_become_cmd(&wrapped);
        }

        if self.connection.allow_executable() {
            if let Some(exe) = &self.play_context.executable {
                wrapped = format!("{} -c {}", exe, shell_quote(&wrapped));
            }
        }

        let mut result = self.connection.exec_command(&wrapped, in_data, sudoable)?;
        strip_become_success_sentinel(&mut result.stdout);
        Ok(result)
    }
}

fn strip_become_success_sentinel(stdout: &mut Vec<u8>) {
    if !stdout.starts_with(BECOME_SUCCESS_PREFIX.as_bytes()) {
        return;
    }
    if let Some(newline_pos) = stdout.iter().position(|&b| b == b'\n') {
        stdout.drain(0..=newline_pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_sentinel_line() {
        let mut stdout = b"BECOME-SUCCESS-abc123\n{\"changed\":false}\n".to_vec();
        strip_become_success_sentinel(&mut stdout);
        assert_eq!(stdout, b"{\"changed\":false}\n");
    }

    #[test]
    fn leaves_stdout_untouched_without_sentinel() {
        let mut stdout = b"{\"changed\":false}\n".to_vec();
        strip_become_success_sentinel(&mut stdout);
        assert_eq!(stdout, b"{\"changed\":false}\n");
    }
}
