//! Scoped environment overlays.
//!
//! Native build tools read their search paths and compiler flags from the
//! process environment. Each stage describes what it needs as an
//! [`EnvOverlay`]; applying it yields an [`EnvGuard`] that puts every touched
//! variable back the way it was when dropped, whether the stage succeeded or
//! not.
//!
//! One coordinator per process is assumed: the overlay mutates the
//! process-wide table.

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

/// One environment mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum EnvOp {
    /// Put directories in front of a search-path variable.
    Prepend { var: String, paths: Vec<PathBuf> },
    /// Append a flag to a space-separated flags variable.
    AppendFlag { var: String, flag: String },
    /// Overwrite a variable.
    Set { var: String, value: String },
}

impl EnvOp {
    fn var(&self) -> &str {
        match self {
            EnvOp::Prepend { var, .. } | EnvOp::AppendFlag { var, .. } | EnvOp::Set { var, .. } => {
                var
            }
        }
    }
}

/// An ordered list of environment mutations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EnvOverlay {
    ops: Vec<EnvOp>,
}

impl EnvOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepend_path(&mut self, var: impl Into<String>, path: impl Into<PathBuf>) -> &mut Self {
        self.ops.push(EnvOp::Prepend {
            var: var.into(),
            paths: vec![path.into()],
        });
        self
    }

    pub fn append_flag(&mut self, var: impl Into<String>, flag: impl Into<String>) -> &mut Self {
        self.ops.push(EnvOp::AppendFlag {
            var: var.into(),
            flag: flag.into(),
        });
        self
    }

    pub fn set(&mut self, var: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.ops.push(EnvOp::Set {
            var: var.into(),
            value: value.into(),
        });
        self
    }

    /// This overlay followed by `other`.
    pub fn extended(&self, other: &EnvOverlay) -> EnvOverlay {
        let mut ops = self.ops.clone();
        ops.extend(other.ops.iter().cloned());
        EnvOverlay { ops }
    }

    pub fn ops(&self) -> &[EnvOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply every mutation to the process environment.
    ///
    /// The previous value of each touched variable is captured before the
    /// first mutation and restored when the guard drops.
    pub fn apply(&self) -> Result<EnvGuard> {
        let mut guard = EnvGuard { saved: Vec::new() };

        for op in &self.ops {
            let var = op.var();
            if !guard.saved.iter().any(|(saved, _)| saved == var) {
                guard.saved.push((var.to_string(), std::env::var_os(var)));
            }

            match op {
                EnvOp::Prepend { var, paths } => {
                    let mut entries = paths.clone();
                    if let Some(current) = std::env::var_os(var) {
                        entries.extend(std::env::split_paths(&current));
                    }
                    let joined = std::env::join_paths(entries)
                        .with_context(|| format!("cannot prepend to ${}", var))?;
                    std::env::set_var(var, joined);
                }
                EnvOp::AppendFlag { var, flag } => {
                    let value = match std::env::var(var) {
                        Ok(current) if !current.trim().is_empty() => {
                            format!("{} {}", current.trim_end(), flag)
                        }
                        _ => flag.clone(),
                    };
                    std::env::set_var(var, value);
                }
                EnvOp::Set { var, value } => std::env::set_var(var, value),
            }
            tracing::debug!("{} = {:?}", var, std::env::var_os(var));
        }

        Ok(guard)
    }
}

/// Restores the variables an overlay touched.
#[must_use = "the environment is restored when the guard is dropped"]
#[derive(Debug)]
pub struct EnvGuard {
    saved: Vec<(String, Option<OsString>)>,
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (var, value) in self.saved.drain(..).rev() {
            match value {
                Some(value) => std::env::set_var(&var, value),
                None => std::env::remove_var(&var),
            }
        }
    }
}
