//! Action base & lifecycle (spec.md §4.1) and the shared helpers every
//! concrete action module calls into: the remote tmp manager (§4.3),
//! transfer pipeline (§4.4), permission fixer (§4.5), module invoker
//! (§4.6), low-level executor (§4.7), and diff/stat helpers (§4.8).
//!
//! Mirrors the teacher's split of `Isolation` (enter-the-rootfs policy)
//! from `provisioners`/`phase` (what-to-run-once-inside), generalized:
//! `ActionRunner` is the "how to talk to this host" half, `ActionModule`
//! implementations are the "what this task does" half.

mod diff;
mod invoker;
mod lowlevel;
pub mod modules;
mod perms;
mod transfer;
mod tmp;

pub use diff::{checksum_sentinel, DiffData};
pub use invoker::ExecuteModuleOptions;

use std::cell::RefCell;

use serde_json::{Map, Value};

use crate::config::Config;
use crate::connection::Connection;
use crate::error::CoreError;
use crate::module::{ModuleAssembler, ModulePathIndex};
use crate::play_context::PlayContext;
use crate::task::Task;

/// Per-(task, host) execution context. Lives for exactly one `run()`
/// invocation (spec.md §3 Lifecycle) and is never reused or shared across
/// threads — the surrounding system creates one per task per host.
pub struct ActionRunner<'a> {
    pub task: &'a Task,
    pub connection: &'a dyn Connection,
    pub play_context: &'a PlayContext,
    pub config: &'a Config,
    pub module_index: &'a dyn ModulePathIndex,
    pub assembler: &'a dyn ModuleAssembler,
    /// The tmp path created (or supplied) by the current invocation, kept
    /// around so a subtype can reuse it across nested `execute_module`
    /// calls (e.g. `copy` staging a file, then re-invoking with the same
    /// `tmp` to avoid a second `mkdtemp`).
    pub(crate) tmp_path: RefCell<Option<String>>,
}

impl<'a> ActionRunner<'a> {
    pub fn new(
        task: &'a Task,
        connection: &'a dyn Connection,
        play_context: &'a PlayContext,
        config: &'a Config,
        module_index: &'a dyn ModulePathIndex,
        assembler: &'a dyn ModuleAssembler,
    ) -> Self {
        Self {
            task,
            connection,
            play_context,
            config,
            module_index,
            assembler,
            tmp_path: RefCell::new(None),
        }
    }

    /// The `remote_user` a module should run as: `task_vars`'
    /// `ansible_ssh_user` if set, else the play context's (spec.md §4.6
    /// step 4).
    pub(crate) fn remote_user(&self, task_vars: &Map<String, Value>) -> String {
        task_vars
            .get("ansible_ssh_user")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.play_context.remote_user.clone())
    }

    /// Whether privilege is actually escalating for the current user, per
    /// spec.md §4.5's decision table: inactive, or active-but-become_user
    /// is root or the connecting user, vs. escalating to an unprivileged
    /// peer.
    pub(crate) fn becoming_unprivileged_peer(&self, remote_user: &str) -> bool {
        self.play_context.become_enabled
            && self.play_context.become_user != "root"
            && self.play_context.become_user != remote_user
    }

    /// Runs `action`, enforcing the check-mode gate first (spec.md §4.1,
    /// §4.6 step 2): in check mode, an action that doesn't advertise
    /// support is rejected fatally before it can stage a single file or
    /// touch the target.
    pub fn run_action(
        &mut self,
        action: &dyn ActionModule,
        task_vars: &Map<String, Value>,
    ) -> Result<Map<String, Value>, CoreError> {
        if self.play_context.check_mode && !action.supports_check_mode() {
            return Err(CoreError::execution(
                "this action does not support check mode",
            ));
        }
        action.run(self, task_vars)
    }
}

/// Contract every concrete action (copy, template, fetch, command, ping,
/// debug, ...) implements. The entry operation, `run`, typically calls
/// `runner.execute_module` (directly exposed on `ActionRunner`) and may
/// invoke it more than once against the same `tmp`.
pub trait ActionModule {
    /// Whether this action needs to stage files up front, before the
    /// module command itself is assembled (spec.md §4.1).
    fn transfers_files(&self) -> bool {
        false
    }

    /// Whether this action supports check mode. Actions that don't must
    /// fail fast in check mode rather than let any remote side effect
    /// happen (spec.md §4.1, §4.6 step 2).
    fn supports_check_mode(&self) -> bool {
        true
    }

    /// Runs this action, returning the module's result map.
    fn run(
        &self,
        runner: &mut ActionRunner<'_>,
        task_vars: &Map<String, Value>,
    ) -> Result<Map<String, Value>, CoreError>;
}
