//! RPATH compiler wrappers.
//!
//! In wrapped-compiler mode every compiler a bootstrap stage uses is
//! replaced by a small script that forwards to the real binary and appends
//! `-Wl,-rpath` flags, so the produced tools find their libraries without
//! `LD_LIBRARY_PATH`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::util::fs::{symlink_force, write_executable};

/// Compilers wrapped for each bootstrap stage.
pub const WRAPPED_COMPILERS: &[&str] = &["clang", "clang++"];

/// Tools the compiler driver expects next to itself.
pub const COMPANION_TOOLS: &[&str] = &["opt"];

/// Silences the warning rpath flags cause on compile-only invocations.
pub const UNUSED_ARGUMENT_FLAG: &str = "-Wno-unused-command-line-argument";

/// Wrapped-compiler mode settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrapperSettings {
    /// Directories every wrapped link gets an RPATH entry for
    pub rpath_dirs: Vec<PathBuf>,
}

impl WrapperSettings {
    /// RPATH the install's own library directory plus `extra` directories.
    pub fn for_install(install_dir: &Path, extra: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut rpath_dirs = vec![install_dir.join("lib")];
        for dir in extra {
            if !rpath_dirs.contains(&dir) {
                rpath_dirs.push(dir);
            }
        }
        WrapperSettings { rpath_dirs }
    }

    /// Write wrappers for every compiler in `compiler_dir` into `wrapper_dir`
    /// and link the companion tools next to them.
    ///
    /// Returns the wrapper paths in [`WRAPPED_COMPILERS`] order.
    pub fn prepare(&self, wrapper_dir: &Path, compiler_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut wrappers = Vec::with_capacity(WRAPPED_COMPILERS.len());
        for compiler in WRAPPED_COMPILERS {
            let real = compiler_dir.join(compiler);
            if !real.is_file() {
                bail!("cannot wrap {}: not found", real.display());
            }
            let wrapper = wrapper_dir.join(compiler);
            write_executable(&wrapper, &self.script(&real))?;
            wrappers.push(wrapper);
        }

        for tool in COMPANION_TOOLS {
            let real = compiler_dir.join(tool);
            if real.exists() {
                symlink_force(&real, &wrapper_dir.join(tool))?;
            } else {
                tracing::warn!("{} not found next to the compiler in {}", tool, compiler_dir.display());
            }
        }

        tracing::info!("Prepared compiler wrappers in {}", wrapper_dir.display());
        Ok(wrappers)
    }

    /// Wrapper script text forwarding to `real`.
    pub fn script(&self, real: &Path) -> String {
        let mut line = format!("exec {} \"$@\"", shell_quote(&real.to_string_lossy()));
        for dir in &self.rpath_dirs {
            line.push(' ');
            line.push_str(&shell_quote(&format!("-Wl,-rpath={}", dir.display())));
        }
        format!("#!/bin/sh\n# RPATH wrapper generated by llvmstage\n{}\n", line)
    }
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_script_forwards_and_adds_rpath() {
        let settings = WrapperSettings::for_install(
            Path::new("/opt/clang"),
            [PathBuf::from("/opt/zlib/lib")],
        );
        let script = settings.script(Path::new("/build/llvm.obj.1/bin/clang"));

        assert!(script.starts_with("#!/bin/sh\n"));
        assert!(script.contains("exec '/build/llvm.obj.1/bin/clang' \"$@\""));
        assert!(script.contains("'-Wl,-rpath=/opt/clang/lib'"));
        assert!(script.contains("'-Wl,-rpath=/opt/zlib/lib'"));
    }

    #[test]
    fn test_shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }

    #[cfg(unix)]
    #[test]
    fn test_prepare_links_opt() {
        let tmp = TempDir::new().unwrap();
        let bin = tmp.path().join("llvm.obj.1/bin");
        for tool in ["clang", "clang++", "opt"] {
            write_executable(&bin.join(tool), "#!/bin/sh\n").unwrap();
        }
        let wrapper_dir = tmp.path().join("wrappers/stage2");

        let settings = WrapperSettings::for_install(&tmp.path().join("install"), []);
        let wrappers = settings.prepare(&wrapper_dir, &bin).unwrap();

        assert_eq!(
            wrappers,
            vec![wrapper_dir.join("clang"), wrapper_dir.join("clang++")]
        );
        let opt = wrapper_dir.join("opt");
        assert!(opt.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read_link(&opt).unwrap(), bin.join("opt"));
    }

    #[test]
    fn test_prepare_requires_compiler() {
        let tmp = TempDir::new().unwrap();
        let settings = WrapperSettings::default();
        assert!(settings
            .prepare(&tmp.path().join("wrappers"), &tmp.path().join("bin"))
            .is_err());
    }
}
