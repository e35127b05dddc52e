//! What a finished install must contain, and which test suites prove it works.

use serde::Serialize;

/// Shared library suffix the profile tables are written with.
pub const DEFAULT_SHARED_LIB_EXT: &str = "so";

/// Files, directories and smoke commands expected after install.
///
/// Paths are relative to the install root. Entries are only ever appended
/// while a build is configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactExpectation {
    files: Vec<String>,
    dirs: Vec<String>,
    commands: Vec<String>,
}

impl ArtifactExpectation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect a file, relative to the install root.
    pub fn file(&mut self, path: impl Into<String>) -> &mut Self {
        self.files.push(path.into());
        self
    }

    /// Expect several files under a common directory prefix.
    pub fn files_in<I, S>(&mut self, prefix: &str, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.files.extend(
            names
                .into_iter()
                .map(|name| format!("{}/{}", prefix, name.as_ref())),
        );
        self
    }

    /// Expect a directory, relative to the install root.
    pub fn dir(&mut self, path: impl Into<String>) -> &mut Self {
        self.dirs.push(path.into());
        self
    }

    /// Register a shell command that must exit zero against the install.
    pub fn command(&mut self, command: impl Into<String>) -> &mut Self {
        self.commands.push(command.into());
        self
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn dirs(&self) -> &[String] {
        &self.dirs
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty() && self.commands.is_empty()
    }

    /// Expected files with the shared library suffix rewritten for a platform.
    ///
    /// Only names ending in `.so` change; static archives, headers and
    /// binaries are returned untouched.
    pub fn files_for_platform(&self, shlib_ext: &str) -> Vec<String> {
        if shlib_ext == DEFAULT_SHARED_LIB_EXT {
            return self.files.clone();
        }
        let default_suffix = format!(".{}", DEFAULT_SHARED_LIB_EXT);
        self.files
            .iter()
            .map(|file| match file.strip_suffix(&default_suffix) {
                Some(stem) => format!("{}.{}", stem, shlib_ext),
                None => file.clone(),
            })
            .collect()
    }
}

/// Ordered test-suite targets of the native build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TestTargetSet(Vec<String>);

impl TestTargetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole set.
    pub fn set<I, S>(&mut self, targets: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0 = targets.into_iter().map(Into::into).collect();
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}
