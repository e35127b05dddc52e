//! Filesystem utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use glob::glob;
use walkdir::WalkDir;

/// Recursively copy a directory.
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.with_context(|| format!("failed to walk {}", src.display()))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .with_context(|| format!("{} escaped {}", entry.path().display(), src.display()))?;
        let target = dst.join(rel);

        if entry.file_type().is_dir() {
            ensure_dir(&target)?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "failed to copy {} to {}",
                    entry.path().display(),
                    target.display()
                )
            })?;
        }
    }
    Ok(())
}

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write an executable script, creating parent directories if needed.
pub fn write_executable(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents)
        .with_context(|| format!("failed to write file: {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .with_context(|| format!("failed to make {} executable", path.display()))?;
    }

    Ok(())
}

/// Create a symlink at `dst` pointing to `src`, replacing a file or symlink
/// already there.
///
/// A real directory at `dst` is never removed.
pub fn symlink_force(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }
    if let Ok(meta) = dst.symlink_metadata() {
        if meta.is_dir() {
            bail!(
                "refusing to replace directory {} with a symlink to {}",
                dst.display(),
                src.display()
            );
        }
        fs::remove_file(dst).with_context(|| format!("failed to replace {}", dst.display()))?;
    }
    symlink(src, dst).with_context(|| {
        format!("failed to symlink {} -> {}", dst.display(), src.display())
    })
}

/// Rename `<component>-<version>.src` directories under `root` to `<component>`.
///
/// Returns the directories that were renamed, by their new path.
pub fn normalize_source_dirs(root: &Path, version: &str) -> Result<Vec<PathBuf>> {
    let suffix = format!("-{}.src", version);
    let pattern = root.join(format!("*{}", suffix));
    let pattern_str = pattern.to_string_lossy();

    let mut renamed = Vec::new();
    for entry in glob(&pattern_str).with_context(|| format!("invalid glob pattern: {}", pattern_str))? {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("glob error: {}", e);
                continue;
            }
        };
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(component) = name.strip_suffix(&suffix) else {
            continue;
        };

        let target = root.join(component);
        if target.exists() {
            tracing::warn!(
                "not renaming {}: {} already exists",
                path.display(),
                target.display()
            );
            continue;
        }
        fs::rename(&path, &target).with_context(|| {
            format!("failed to rename {} to {}", path.display(), target.display())
        })?;
        tracing::debug!("renamed {} to {}", name, component);
        renamed.push(target);
    }

    renamed.sort();
    Ok(renamed)
}

/// Create a symlink (platform-aware).
#[cfg(unix)]
pub fn symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
pub fn symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
    if src.is_dir() {
        std::os::windows::fs::symlink_dir(src, dst)
    } else {
        std::os::windows::fs::symlink_file(src, dst)
    }
}
