//! Environment directives for the module of an installed component.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::host::HostInfo;
use crate::core::project::ProjectId;
use crate::util::process::find_tool;

/// One environment change a module applies when loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum ModuleDirective {
    /// Prepend install-relative paths to a search-path variable.
    PrependPath { var: String, paths: Vec<String> },
    /// Set a variable to an absolute value.
    SetEnv { var: String, value: String },
}

/// Directives for one install root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleEnv {
    pub root: PathBuf,
    pub directives: Vec<ModuleDirective>,
}

impl ModuleEnv {
    /// Compute the directives for an install.
    ///
    /// Only directories that exist in the install are exposed.
    pub fn for_install(
        project: &ProjectId,
        install_dir: &Path,
        host: &HostInfo,
        python_bindings: bool,
    ) -> Self {
        let mut lib_dirs = vec![
            "lib".to_string(),
            "lib64".to_string(),
            "lib/linux".to_string(),
        ];
        if let Some(runtime_dir) = runtime_lib_dir(install_dir, host) {
            if !lib_dirs.contains(&runtime_dir) {
                lib_dirs.push(runtime_dir);
            }
        }

        let mut env = ModuleEnv {
            root: install_dir.to_path_buf(),
            directives: Vec::new(),
        };
        env.prepend_existing("PATH", &["bin".to_string()]);
        env.prepend_existing("CPATH", &["include".to_string()]);
        env.prepend_existing("LIBRARY_PATH", &lib_dirs);
        env.prepend_existing("LD_LIBRARY_PATH", &lib_dirs);

        if *project == ProjectId::Clang {
            // Sanitizers symbolize their reports through this.
            match find_tool("llvm-symbolizer", &[install_dir.join("bin")]) {
                Some(symbolizer) => env.directives.push(ModuleDirective::SetEnv {
                    var: "ASAN_SYMBOLIZER_PATH".to_string(),
                    value: symbolizer.display().to_string(),
                }),
                None => tracing::warn!("llvm-symbolizer not found, ASAN_SYMBOLIZER_PATH not set"),
            }
            if python_bindings {
                env.directives.push(ModuleDirective::PrependPath {
                    var: "PYTHONPATH".to_string(),
                    paths: vec!["lib/python".to_string()],
                });
            }
        }
        env
    }

    fn prepend_existing(&mut self, var: &str, candidates: &[String]) {
        let paths: Vec<String> = candidates
            .iter()
            .filter(|rel| self.root.join(rel).is_dir())
            .cloned()
            .collect();
        if !paths.is_empty() {
            self.directives.push(ModuleDirective::PrependPath {
                var: var.to_string(),
                paths,
            });
        }
    }

    /// Prepend directives as a variable → path fragments map.
    pub fn prepend_paths(&self) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for directive in &self.directives {
            if let ModuleDirective::PrependPath { var, paths } = directive {
                map.entry(var.clone()).or_default().extend(paths.iter().cloned());
            }
        }
        map
    }

    /// Render as an Lmod Lua snippet.
    pub fn to_lua(&self) -> String {
        let mut out = format!("local root = {}\n\n", lua_string(&self.root.display().to_string()));
        for directive in &self.directives {
            match directive {
                ModuleDirective::PrependPath { var, paths } => {
                    for path in paths {
                        out.push_str(&format!(
                            "prepend_path({}, pathJoin(root, {}))\n",
                            lua_string(var),
                            lua_string(path)
                        ));
                    }
                }
                ModuleDirective::SetEnv { var, value } => {
                    out.push_str(&format!(
                        "setenv({}, {})\n",
                        lua_string(var),
                        lua_string(value)
                    ));
                }
            }
        }
        out
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize module environment")
    }
}

/// Install-relative directory of the per-target runtime libraries, such as
/// `lib/x86_64-unknown-linux-gnu`.
fn runtime_lib_dir(install_dir: &Path, host: &HostInfo) -> Option<String> {
    if host.cpu_arch().is_none() {
        tracing::warn!(
            "Unknown CPU architecture ({}) for runtime libraries check",
            host.arch
        );
    }
    let pattern = install_dir
        .join("lib")
        .join(format!("{}-*", host.runtime_arch_name()));
    let mut matches: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_dir())
        .collect();
    matches.sort();

    let dir = matches.first()?.file_name()?.to_str()?.to_string();
    Some(format!("lib/{}", dir))
}

fn lua_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}
