//! `configure_module` (spec.md §4.2): picks a module variant for the
//! target's preferred suffixes, applies the `win_*` rewrite, and delegates
//! the actual bytes/style/shebang decision to an external assembler.

use serde_json::{Map, Value};

use super::{ConfiguredModule, ModuleStyle};
use crate::error::CoreError;
use crate::shell::Shell;

/// Looks up module source files by name; a narrow interface over the
/// module search path, out of scope for this core (spec.md §1).
pub trait ModulePathIndex {
    /// Returns whether a module named `module_name + suffix` exists.
    fn find_plugin(&self, module_name: &str, suffix: &str) -> bool;
}

/// Produces the final wire bytes, style, and shebang for a resolved
/// module; the "module-common" service in spec.md §4.2 step 4, out of
/// scope here beyond this narrow interface (compression, embedded library
/// injection, and shebang rewriting all live on the other side of it).
pub trait ModuleAssembler {
    fn assemble(
        &self,
        module_name: &str,
        module_args: &Map<String, Value>,
    ) -> Result<ConfiguredModule, CoreError>;
}

const WIN_REWRITE_CANDIDATES: [&str; 3] = ["stat", "file", "copy"];
const UNQUOTE_MODULES: [&str; 4] = ["win_stat", "win_file", "win_copy", "slurp"];
const UNQUOTE_ARG_KEYS: [&str; 3] = ["src", "dest", "path"];

/// Resolves which on-disk variant of `module_name` to use for the given
/// `preferences` (an ordered list of suffixes, e.g. `[".py", ""]` or
/// `[".ps1"]`), rewriting to `win_<name>` and unquoting `src`/`dest`/`path`
/// arguments as needed, then hands off to `assembler`.
pub fn configure_module(
    module_name: &str,
    module_args: &Map<String, Value>,
    task_action: &str,
    preferences: &[&str],
    index: &dyn ModulePathIndex,
    shell: &dyn Shell,
    assembler: &dyn ModuleAssembler,
) -> Result<(String, Map<String, Value>, ConfiguredModule), CoreError> {
    let mut resolved_name = module_name.to_string();
    let mut resolved_args = module_args.clone();
    let mut found = false;

    for suffix in preferences {
        let mut candidate = module_name.to_string();

        if *suffix == ".ps1" && WIN_REWRITE_CANDIDATES.contains(&module_name) && task_action != module_name {
            candidate = format!("win_{}", module_name);
        }

        if index.find_plugin(&candidate, suffix) {
            resolved_name = candidate;
            found = true;
            break;
        }
    }

    if UNQUOTE_MODULES.contains(&resolved_name.as_str()) {
        for key in UNQUOTE_ARG_KEYS {
            if let Some(Value::String(s)) = resolved_args.get(key) {
                let unquoted = shell.unquote(s);
                resolved_args.insert(key.to_string(), Value::String(unquoted));
            }
        }
    }

    if !found {
        let ping_name = if preferences.contains(&".ps1") {
            "win_ping"
        } else {
            "ping"
        };
        let ping_installed = preferences
            .iter()
            .any(|suffix| index.find_plugin(ping_name, suffix));
        if ping_installed {
            return Err(CoreError::execution(format!(
                "couldn't find module named '{}'",
                module_name
            )));
        }
        return Err(CoreError::execution(
            "no modules appear to be installed on the target",
        ));
    }

    let configured = assembler.assemble(&resolved_name, &resolved_args)?;
    if configured.shebang.is_empty() {
        return Err(CoreError::execution(format!(
            "module '{}' is missing an interpreter shebang",
            resolved_name
        )));
    }

    Ok((resolved_name, resolved_args, configured))
}
