//! Host facts that shape a build: CPU architecture, OS and library naming.

use std::fmt;

use crate::core::errors::ConfigError;

/// CPU architectures with a known default code-generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CpuArch {
    X86_64,
    Aarch64,
    Power,
    Riscv64,
}

impl CpuArch {
    /// All architectures with a default backend.
    pub const ALL: [CpuArch; 4] = [
        CpuArch::X86_64,
        CpuArch::Aarch64,
        CpuArch::Power,
        CpuArch::Riscv64,
    ];

    /// Map an architecture name (as reported by Rust, `uname -m` or a
    /// target triple) onto a supported architecture.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "x86_64" | "amd64" | "x86-64" => Some(CpuArch::X86_64),
            "aarch64" | "arm64" => Some(CpuArch::Aarch64),
            "powerpc64" | "powerpc64le" | "ppc64" | "ppc64le" | "power" => Some(CpuArch::Power),
            "riscv64" | "riscv64gc" => Some(CpuArch::Riscv64),
            _ => None,
        }
    }

    /// Like [`CpuArch::parse`], but an unknown name is a configuration error.
    pub fn require(name: &str) -> Result<Self, ConfigError> {
        Self::parse(name).ok_or_else(|| ConfigError::UnsupportedArch(name.to_string()))
    }

    /// The architecture component Clang uses in runtime file and directory names.
    pub fn clang_name(&self) -> &'static str {
        match self {
            CpuArch::X86_64 => "x86_64",
            CpuArch::Aarch64 => "aarch64",
            CpuArch::Power => "powerpc64le",
            CpuArch::Riscv64 => "riscv64",
        }
    }
}

impl fmt::Display for CpuArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.clang_name())
    }
}

/// Description of the machine the build runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    /// Raw architecture name
    pub arch: String,
    /// Operating system (linux, macos, ...)
    pub os: String,
}

impl HostInfo {
    /// Create host info for an explicit architecture and OS.
    pub fn new(arch: impl Into<String>, os: impl Into<String>) -> Self {
        HostInfo {
            arch: arch.into(),
            os: os.into(),
        }
    }

    /// Detect the host this process runs on.
    pub fn detect() -> Self {
        HostInfo::new(std::env::consts::ARCH, std::env::consts::OS)
    }

    /// Supported architecture, if the host has one.
    pub fn cpu_arch(&self) -> Option<CpuArch> {
        CpuArch::parse(&self.arch)
    }

    /// Architecture component for runtime file names, falling back to the
    /// raw name on hosts without a default backend.
    pub fn runtime_arch_name(&self) -> String {
        self.cpu_arch()
            .map(|arch| arch.clang_name().to_string())
            .unwrap_or_else(|| self.arch.clone())
    }

    /// File suffix for shared libraries on this OS, without the dot.
    pub fn shared_lib_ext(&self) -> &'static str {
        match self.os.as_str() {
            "macos" | "darwin" | "ios" => "dylib",
            "windows" => "dll",
            _ => "so",
        }
    }
}

/// Refuse hosts known to break the build, given `/etc/os-release` contents.
pub fn check_readiness(os_release: &str) -> Result<(), ConfigError> {
    let mut id = None;
    let mut version = None;
    for line in os_release.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"');
        match key.trim() {
            "ID" => id = Some(value.to_string()),
            "VERSION_ID" => version = Some(value.to_string()),
            _ => {}
        }
    }

    let (Some(id), Some(version)) = (id, version) else {
        return Ok(());
    };

    let affected = matches!(
        id.to_ascii_lowercase().as_str(),
        "rhel" | "redhat" | "centos" | "sl" | "scientific"
    );
    if affected && (version == "5" || version.starts_with("5.")) {
        return Err(ConfigError::UnsupportedHost { os: id });
    }
    Ok(())
}
