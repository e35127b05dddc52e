//! Post-install verification.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::artifacts::ArtifactExpectation;
use crate::core::errors::VerificationError;
use crate::core::host::HostInfo;
use crate::util::process::{tail, ProcessBuilder};

/// What a successful verification checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub files: Vec<String>,
    pub dirs: Vec<String>,
    pub commands: Vec<String>,
}

/// Check that every expected path exists under `install_dir`, then run the
/// smoke commands with the install's `bin` first on PATH.
///
/// All missing paths are reported together; commands run only once every
/// path is present, and stop at the first failure.
pub fn verify_install(
    artifacts: &ArtifactExpectation,
    install_dir: &Path,
    host: &HostInfo,
) -> Result<VerifyReport> {
    let files = artifacts.files_for_platform(host.shared_lib_ext());
    let dirs = artifacts.dirs().to_vec();

    let mut missing: Vec<String> = files
        .iter()
        .filter(|file| !install_dir.join(file).is_file())
        .cloned()
        .collect();
    missing.extend(
        dirs.iter()
            .filter(|dir| !install_dir.join(dir).is_dir())
            .cloned(),
    );
    if !missing.is_empty() {
        return Err(VerificationError::MissingArtifacts { missing }.into());
    }
    tracing::info!(
        "Found {} expected files and {} directories",
        files.len(),
        dirs.len()
    );

    let path = search_path_with(&install_dir.join("bin"))?;
    for command in artifacts.commands() {
        tracing::info!("Running smoke test `{}`", command);
        let (status, output) = ProcessBuilder::shell(command)
            .env("PATH", &path)
            .cwd(install_dir)
            .exec_combined()?;
        if status != Some(0) {
            return Err(VerificationError::SmokeCommandFailed {
                command: command.clone(),
                status,
                output: tail(&output, 40),
            }
            .into());
        }
    }

    Ok(VerifyReport {
        files,
        dirs,
        commands: artifacts.commands().to_vec(),
    })
}

fn search_path_with(dir: &Path) -> Result<String> {
    let mut entries = vec![dir.to_path_buf()];
    if let Some(current) = std::env::var_os("PATH") {
        entries.extend(std::env::split_paths(&current));
    }
    let joined = std::env::join_paths(entries).context("cannot build smoke test PATH")?;
    Ok(joined.to_string_lossy().into_owned())
}
