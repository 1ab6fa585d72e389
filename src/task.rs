//! Task data model (spec.md §3), read-only to the core.

use serde_json::{Map, Value};

/// A declarative operation targeting one host. The core never mutates a
/// `Task`'s `action`/`role`; it reads `args` to seed the module invocation
/// and `environment` to compute the remote environment prefix.
#[derive(Debug, Clone)]
pub struct Task {
    /// The module/action name, e.g. `"command"`, `"copy"`, `"ping"`.
    pub action: String,
    /// Arguments to pass to the module.
    pub args: Map<String, Value>,
    /// Environment variables to set for the module process.
    pub environment: EnvironmentSpec,
    /// Async polling interval in seconds; `0` means run synchronously.
    pub async_val: u64,
    /// Back-reference to a role, used only for file search (out of scope
    /// here — retained as data for callers that do implement search).
    pub role: Option<String>,
}

impl Task {
    /// Convenience constructor for a synchronous task with no environment
    /// or role context, the common case exercised by the demo CLI and
    /// most tests.
    pub fn new(action: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            action: action.into(),
            args,
            environment: EnvironmentSpec::default(),
            async_val: 0,
            role: None,
        }
    }
}

/// `environment:` may be a single mapping or an ordered sequence of
/// mappings, each templated independently (spec.md §4.6.1). Templating
/// itself is out of scope (spec.md §1); this type only carries the
/// pre-templated mappings and performs the merge.
#[derive(Debug, Clone, Default)]
pub enum EnvironmentSpec {
    /// No environment entries.
    #[default]
    Empty,
    /// A single mapping.
    Mapping(Map<String, Value>),
    /// An ordered sequence of mappings; later entries win (spec.md §4.6.1,
    /// §9 "Open question – environment merge order").
    Sequence(Vec<Map<String, Value>>),
}

impl EnvironmentSpec {
    /// Merges all entries into one mapping, shallow-merging key-by-key in
    /// original order so that later entries overwrite earlier ones —
    /// the *originally last* mapping's keys win on conflict.
    pub fn merge(&self) -> Map<String, Value> {
        match self {
            EnvironmentSpec::Empty => Map::new(),
            EnvironmentSpec::Mapping(m) => m.clone(),
            EnvironmentSpec::Sequence(seq) => {
                let mut merged = Map::new();
                for entry in seq {
                    for (k, v) in entry {
                        merged.insert(k.clone(), v.clone());
                    }
                }
                merged
            }
        }
    }
}
