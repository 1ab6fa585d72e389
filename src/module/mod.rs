//! Module resolution and assembly (spec.md §4.2).
//!
//! The core never reads module source files or performs compression and
//! shebang rewriting itself — that's the external assembler's job (spec.md
//! §1 Non-goals). This module only picks *which* on-disk variant to use
//! and hands the decision off, mirroring the teacher's `Isolation`-picks,
//! `Provisioner`-runs split in `phase`/`provisioners`.

mod resolver;

pub use resolver::{configure_module, ModuleAssembler, ModulePathIndex};

/// Module calling convention, in the priority order most connections
/// prefer (spec.md §3, §4.2 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleStyle {
    /// Modern structured modules: arguments are embedded directly, result
    /// is a single JSON document on stdout.
    New,
    /// Legacy modules that want their arguments as JSON but don't use the
    /// new-style boilerplate.
    NonNativeWantJson,
    /// Legacy `key=value` argument convention.
    Old,
    /// A prebuilt, non-Python executable; arguments passed positionally.
    Binary,
}

impl ModuleStyle {
    /// Whether this style can be pipelined (module bytes sent on stdin
    /// rather than staged as a file); only `New` supports this (spec.md
    /// §4.6 step 11).
    pub fn supports_pipelining(&self) -> bool {
        matches!(self, ModuleStyle::New)
    }

    /// Whether this style needs a separate args file alongside the staged
    /// module (spec.md §4.6 step 7): `old` and `non_native_want_json` do,
    /// `new` embeds arguments directly and `binary` takes them positionally.
    pub fn needs_args_file(&self) -> bool {
        matches!(self, ModuleStyle::Old | ModuleStyle::NonNativeWantJson)
    }
}

/// The assembled module ready to stage or pipe to the target: its wire
/// bytes, calling convention, and interpreter shebang line.
#[derive(Debug, Clone)]
pub struct ConfiguredModule {
    pub style: ModuleStyle,
    pub shebang: String,
    pub bytes: Vec<u8>,
}
