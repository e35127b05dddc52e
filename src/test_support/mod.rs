//! Test utilities and mocks for llvmstage unit tests.
//!
//! [`MockDriver`] stands in for the native build tool: it records every
//! invocation, fabricates the compilers a stage would have produced and
//! can be told to fail at a chosen point.
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::test_support::{env_lock, polly_config, MockDriver};
//!
//! #[test]
//! fn test_example() {
//!     let _lock = env_lock();
//!     let mut driver = MockDriver::new().fail_build_at(1);
//!     // Run a staged build against the mock...
//! }
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;

use crate::builder::cmake::BuildDriver;
use crate::core::errors::BuildToolError;
use crate::util::fs::{ensure_dir, write_executable};

pub use fixtures::*;

/// Executables a mocked stage build leaves in `<build_dir>/bin`.
pub const MOCK_STAGE_TOOLS: &[&str] = &["clang", "clang++", "opt", "llvm-link"];

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Serialize tests that read or mutate the process environment.
///
/// A panicking test poisons the lock; later tests still get it.
pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One recorded driver invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Configure {
        source_dir: PathBuf,
        build_dir: PathBuf,
        args: Vec<String>,
        /// `$PATH` at the time of the call
        path: Option<OsString>,
        /// `$CFLAGS` at the time of the call
        cflags: Option<String>,
    },
    Build {
        build_dir: PathBuf,
        jobs: Option<usize>,
    },
    Install {
        build_dir: PathBuf,
    },
    RunTarget {
        build_dir: PathBuf,
        target: String,
    },
}

/// Scriptable [`BuildDriver`] for unit tests.
#[derive(Debug, Default)]
pub struct MockDriver {
    calls: Vec<MockCall>,
    fail_configure_at: Option<usize>,
    fail_build_at: Option<usize>,
    fail_install: bool,
    test_outputs: HashMap<String, String>,
    default_test_output: String,
    installed_files: Vec<String>,
    installed_dirs: Vec<String>,
}

impl MockDriver {
    /// A driver whose every call succeeds and whose test suites all pass.
    pub fn new() -> Self {
        MockDriver {
            default_test_output: "Testing Time: 1.00s\n  Passed    : 10\n".to_string(),
            ..Default::default()
        }
    }

    /// Fail the `n`th configure call (1-based).
    pub fn fail_configure_at(mut self, n: usize) -> Self {
        self.fail_configure_at = Some(n);
        self
    }

    /// Fail the `n`th build call (1-based).
    pub fn fail_build_at(mut self, n: usize) -> Self {
        self.fail_build_at = Some(n);
        self
    }

    pub fn fail_install(mut self) -> Self {
        self.fail_install = true;
        self
    }

    /// Output returned when `target` is run.
    pub fn test_output(mut self, target: &str, output: &str) -> Self {
        self.test_outputs
            .insert(target.to_string(), output.to_string());
        self
    }

    /// Output returned for targets without a specific one.
    pub fn default_test_output(mut self, output: &str) -> Self {
        self.default_test_output = output.to_string();
        self
    }

    /// Paths created under the install prefix on install.
    pub fn installs<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.installed_files
            .extend(files.into_iter().map(|f| f.as_ref().to_string()));
        self
    }

    /// Directories created under the install prefix on install.
    pub fn installs_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.installed_dirs
            .extend(dirs.into_iter().map(|d| d.as_ref().to_string()));
        self
    }

    pub fn calls(&self) -> &[MockCall] {
        &self.calls
    }

    pub fn configure_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, MockCall::Configure { .. }))
            .count()
    }

    /// `$PATH` as seen by each configure call.
    pub fn configure_paths(&self) -> Vec<Option<OsString>> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                MockCall::Configure { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    /// `$CFLAGS` as seen by each configure call.
    pub fn configure_cflags(&self) -> Vec<Option<String>> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                MockCall::Configure { cflags, .. } => Some(cflags.clone()),
                _ => None,
            })
            .collect()
    }

    /// Test targets in the order they were run.
    pub fn run_targets(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                MockCall::RunTarget { target, .. } => Some(target.clone()),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&MockCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    /// Install prefix of the most recent configure of `build_dir`.
    fn install_prefix(&self, build_dir: &Path) -> Option<PathBuf> {
        self.calls.iter().rev().find_map(|c| match c {
            MockCall::Configure {
                build_dir: dir,
                args,
                ..
            } if dir == build_dir => args
                .iter()
                .find_map(|a| a.strip_prefix("-DCMAKE_INSTALL_PREFIX="))
                .map(PathBuf::from),
            _ => None,
        })
    }

    fn failure(command: String) -> anyhow::Error {
        BuildToolError::CommandFailed {
            command,
            status: Some(1),
            stderr: "mock failure".to_string(),
        }
        .into()
    }
}

impl BuildDriver for MockDriver {
    fn configure(&mut self, source_dir: &Path, build_dir: &Path, args: &[String]) -> Result<()> {
        self.calls.push(MockCall::Configure {
            source_dir: source_dir.to_path_buf(),
            build_dir: build_dir.to_path_buf(),
            args: args.to_vec(),
            path: std::env::var_os("PATH"),
            cflags: std::env::var("CFLAGS").ok(),
        });
        if self.fail_configure_at == Some(self.configure_count()) {
            return Err(Self::failure(format!("cmake -B {}", build_dir.display())));
        }
        Ok(())
    }

    fn build(&mut self, build_dir: &Path, jobs: Option<usize>) -> Result<()> {
        self.calls.push(MockCall::Build {
            build_dir: build_dir.to_path_buf(),
            jobs,
        });
        if self.fail_build_at == Some(self.count(|c| matches!(c, MockCall::Build { .. }))) {
            return Err(Self::failure(format!("cmake --build {}", build_dir.display())));
        }
        let bin = build_dir.join("bin");
        for tool in MOCK_STAGE_TOOLS {
            write_executable(&bin.join(tool), "#!/bin/sh\nexit 0\n")?;
        }
        Ok(())
    }

    fn install(&mut self, build_dir: &Path) -> Result<()> {
        self.calls.push(MockCall::Install {
            build_dir: build_dir.to_path_buf(),
        });
        if self.fail_install {
            return Err(Self::failure(format!(
                "cmake --build {} --target install",
                build_dir.display()
            )));
        }
        let Some(prefix) = self.install_prefix(build_dir) else {
            return Ok(());
        };
        for dir in &self.installed_dirs {
            ensure_dir(&prefix.join(dir))?;
        }
        for file in &self.installed_files {
            let path = prefix.join(file);
            if let Some(parent) = path.parent() {
                ensure_dir(parent)?;
            }
            std::fs::write(&path, "")?;
        }
        Ok(())
    }

    fn run_target(&mut self, build_dir: &Path, target: &str) -> Result<String> {
        self.calls.push(MockCall::RunTarget {
            build_dir: build_dir.to_path_buf(),
            target: target.to_string(),
        });
        Ok(self
            .test_outputs
            .get(target)
            .cloned()
            .unwrap_or_else(|| self.default_test_output.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mock_build_fabricates_compilers() {
        let tmp = TempDir::new().unwrap();
        let mut driver = MockDriver::new();
        driver.build(tmp.path(), Some(4)).unwrap();

        for tool in MOCK_STAGE_TOOLS {
            assert!(tmp.path().join("bin").join(tool).is_file());
        }
        assert_eq!(
            driver.calls(),
            [MockCall::Build {
                build_dir: tmp.path().to_path_buf(),
                jobs: Some(4),
            }]
        );
    }

    #[test]
    fn test_mock_install_uses_configured_prefix() {
        let tmp = TempDir::new().unwrap();
        let prefix = tmp.path().join("install");
        let build_dir = tmp.path().join("llvm.obj.1");
        let mut driver = MockDriver::new()
            .installs(["lib/libPolly.a"])
            .installs_dirs(["include/polly"]);

        driver
            .configure(
                tmp.path(),
                &build_dir,
                &[format!("-DCMAKE_INSTALL_PREFIX={}", prefix.display())],
            )
            .unwrap();
        driver.install(&build_dir).unwrap();

        assert!(prefix.join("lib/libPolly.a").is_file());
        assert!(prefix.join("include/polly").is_dir());
    }

    #[test]
    fn test_mock_failure_is_a_tool_error() {
        let tmp = TempDir::new().unwrap();
        let mut driver = MockDriver::new().fail_configure_at(1);
        let err = driver.configure(tmp.path(), tmp.path(), &[]).unwrap_err();
        assert!(err.downcast_ref::<BuildToolError>().is_some());
    }
}
