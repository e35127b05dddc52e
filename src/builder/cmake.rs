//! Native configure/build/install driver.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::errors::BuildToolError;
use crate::util::process::{find_cmake, ProcessBuilder};

/// The generic configure/build/install tool a stage delegates to.
///
/// Every call blocks until the native tool exits. A non-zero exit from
/// configure, build or install is an error; test targets return their
/// output regardless of exit status.
pub trait BuildDriver {
    /// Configure `build_dir` from `source_dir` with the given flags.
    fn configure(&mut self, source_dir: &Path, build_dir: &Path, args: &[String]) -> Result<()>;

    /// Build everything in a configured directory.
    fn build(&mut self, build_dir: &Path, jobs: Option<usize>) -> Result<()>;

    /// Install a built directory into its configured prefix.
    fn install(&mut self, build_dir: &Path) -> Result<()>;

    /// Build a named target and return its combined output.
    fn run_target(&mut self, build_dir: &Path, target: &str) -> Result<String>;
}

/// [`BuildDriver`] backed by CMake.
#[derive(Debug, Clone)]
pub struct CMakeDriver {
    cmake: PathBuf,
}

impl CMakeDriver {
    /// Locate CMake on PATH.
    pub fn new() -> Result<Self> {
        let cmake = find_cmake().ok_or_else(|| BuildToolError::ToolNotFound("cmake".to_string()))?;
        Ok(CMakeDriver { cmake })
    }

    /// Use a specific CMake executable.
    pub fn with_cmake(cmake: impl Into<PathBuf>) -> Self {
        CMakeDriver {
            cmake: cmake.into(),
        }
    }

    fn cmd(&self) -> ProcessBuilder {
        ProcessBuilder::new(&self.cmake)
    }
}

impl BuildDriver for CMakeDriver {
    fn configure(&mut self, source_dir: &Path, build_dir: &Path, args: &[String]) -> Result<()> {
        tracing::info!("Configuring {}", build_dir.display());

        self.cmd()
            .arg("-S")
            .arg(source_dir)
            .arg("-B")
            .arg(build_dir)
            .args(args)
            .cwd(build_dir)
            .exec_and_check()?;
        Ok(())
    }

    fn build(&mut self, build_dir: &Path, jobs: Option<usize>) -> Result<()> {
        tracing::info!("Building {}", build_dir.display());

        let mut cmd = self.cmd().arg("--build").arg(build_dir);
        if let Some(jobs) = jobs {
            cmd = cmd.arg("--parallel").arg(jobs.to_string());
        }
        cmd.env("VERBOSE", "1").cwd(build_dir).exec_and_check()?;
        Ok(())
    }

    fn install(&mut self, build_dir: &Path) -> Result<()> {
        tracing::info!("Installing from {}", build_dir.display());

        self.cmd()
            .arg("--build")
            .arg(build_dir)
            .arg("--target")
            .arg("install")
            .cwd(build_dir)
            .exec_and_check()?;
        Ok(())
    }

    fn run_target(&mut self, build_dir: &Path, target: &str) -> Result<String> {
        let (status, output) = self
            .cmd()
            .arg("--build")
            .arg(build_dir)
            .arg("--target")
            .arg(target)
            .cwd(build_dir)
            .exec_combined()?;
        tracing::debug!("`{}` exited with {:?}", target, status);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    #[test]
    fn test_failed_configure_is_a_tool_error() {
        let tmp = TempDir::new().unwrap();
        let fake = tmp.path().join("cmake");
        crate::util::fs::write_executable(&fake, "#!/bin/sh\necho 'CMake Error' >&2\nexit 1\n")
            .unwrap();

        let mut driver = CMakeDriver::with_cmake(&fake);
        let err = driver
            .configure(tmp.path(), tmp.path(), &["-DLLVM_ENABLE_ASSERTIONS=ON".to_string()])
            .unwrap_err();

        let tool_err = err.downcast_ref::<BuildToolError>().unwrap();
        assert!(tool_err.to_string().contains("CMake Error"));
        assert!(tool_err.to_string().contains("-DLLVM_ENABLE_ASSERTIONS=ON"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_target_returns_output_of_failing_suite() {
        let tmp = TempDir::new().unwrap();
        let fake = tmp.path().join("cmake");
        crate::util::fs::write_executable(
            &fake,
            "#!/bin/sh\necho \"target: $4\"\necho '  Failed    : 2'\nexit 1\n",
        )
        .unwrap();

        let mut driver = CMakeDriver::with_cmake(&fake);
        let output = driver.run_target(tmp.path(), "check-lld").unwrap();

        assert!(output.contains("target: check-lld"));
        assert!(output.contains("Failed    : 2"));
    }
}
