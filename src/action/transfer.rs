//! Transfer pipeline (spec.md §4.4).

use std::io::Write;

use camino::Utf8Path;
use serde_json::{Map, Value};

use super::ActionRunner;
use crate::error::CoreError;

impl<'a> ActionRunner<'a> {
    /// Copies a local file to a remote path. A thin pass-through to the
    /// connection's own transfer mechanism; the core adds nothing here
    /// beyond a stable call site for the module invoker to use.
    pub fn transfer_file(&self, local: &Utf8Path, remote: &str) -> Result<(), CoreError> {
        self.connection.put_file(local, remote)
    }

    /// Serializes `data` as JSON into a local temp file, transfers it to
    /// `remote`, and unlinks the local file regardless of whether the
    /// transfer succeeded (spec.md §4.4).
    pub fn transfer_data(&self, remote: &str, data: &Map<String, Value>) -> Result<(), CoreError> {
        let payload =
            serde_json::to_vec(data).map_err(|e| CoreError::execution(e.to_string()))?;

        let mut file = tempfile::NamedTempFile::new()
            .map_err(|e| CoreError::io("create local staging file", e))?;
        file.write_all(&payload)
            .map_err(|e| CoreError::io("write local staging file", e))?;
        file.flush()
            .map_err(|e| CoreError::io("flush local staging file", e))?;

        let local_path = Utf8Path::from_path(file.path())
            .ok_or_else(|| CoreError::execution("temp file path is not valid UTF-8"))?;

        let result = self.connection.put_file(local_path, remote);
        // `file` (a `NamedTempFile`) removes itself on drop regardless of
        // the transfer outcome, matching the unlink-even-on-failure
        // requirement without a separate cleanup path.
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::connection::LocalConnection;
    use crate::module::{ModuleAssembler, ModulePathIndex};
    use crate::play_context::PlayContext;
    use crate::privilege::BecomeMethod;
    use crate::task::Task;
    use serde_json::json;

    struct NoopIndex;
    impl ModulePathIndex for NoopIndex {
        fn find_plugin(&self, _: &str, _: &str) -> bool {
            false
        }
    }
    struct NoopAssembler;
    impl ModuleAssembler for NoopAssembler {
        fn assemble(
            &self,
            _: &str,
            _: &Map<String, Value>,
        ) -> Result<crate::module::ConfiguredModule, CoreError> {
            unreachable!()
        }
    }

    fn play_context() -> PlayContext {
        PlayContext {
            become_enabled: false,
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
    fn transfer_data_writes_json_and_cleans_up_local_file() {
        let task = Task::new("ping", Map::new());
        let connection = LocalConnection::new();
        let ctx = play_context();
        let config = Config::default();
        let index = NoopIndex;
        let assembler = NoopAssembler;
        let runner = ActionRunner::new(&task, &connection, &ctx, &config, &index, &assembler);

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("args.json");

        let mut data = Map::new();
        data.insert("foo".to_string(), json!("bar"));
        runner
            .transfer_data(dest.to_str().unwrap(), &data)
            .unwrap();

        let written: Value = serde_json::from_slice(&std::fs::read(&dest).unwrap()).unwrap();
        assert_eq!(written.get("foo"), Some(&json!("bar")));
    }
}
