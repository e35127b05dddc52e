//! Project identifiers.
//!
//! A recipe names the component it builds (`Clang`, `LLVMruntimes`,
//! `compiler-rt`, ...). The name is normalized into a [`ProjectId`], which is
//! what drives profile selection, bootstrap eligibility and module
//! environment extras.

use std::fmt;

/// An LLVM sub-project this tool knows how to specialize for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProjectId {
    Clang,
    Flang,
    Polly,
    Mlir,
    Lld,
    Lldb,
    CompilerRt,
    /// libunwind, libc++, libc++abi and OpenMP built as one bundle.
    Runtimes,
    /// Anything else is configured and built without specialization.
    Other(String),
}

impl ProjectId {
    /// Normalize a component name into a project identifier.
    ///
    /// Names are compared case-insensitively and a leading `llvm` is
    /// stripped, so `LLVMruntimes` is the runtimes bundle.
    pub fn from_name(name: &str) -> Self {
        let lower = name.trim().to_ascii_lowercase();
        let stripped = lower.strip_prefix("llvm").unwrap_or(&lower);

        match stripped {
            "clang" => ProjectId::Clang,
            "flang" => ProjectId::Flang,
            "polly" => ProjectId::Polly,
            "mlir" => ProjectId::Mlir,
            "lld" => ProjectId::Lld,
            "lldb" => ProjectId::Lldb,
            "compiler-rt" => ProjectId::CompilerRt,
            "runtimes" => ProjectId::Runtimes,
            other => ProjectId::Other(other.to_string()),
        }
    }

    /// Directory name of this project inside the monorepo source tree.
    pub fn source_dir_name(&self) -> &str {
        match self {
            ProjectId::Clang => "clang",
            ProjectId::Flang => "flang",
            ProjectId::Polly => "polly",
            ProjectId::Mlir => "mlir",
            ProjectId::Lld => "lld",
            ProjectId::Lldb => "lldb",
            ProjectId::CompilerRt => "compiler-rt",
            ProjectId::Runtimes => "runtimes",
            ProjectId::Other(name) => name,
        }
    }

    /// Only Clang can be rebuilt by its own output.
    pub fn supports_bootstrap(&self) -> bool {
        matches!(self, ProjectId::Clang)
    }

    /// Projects that ship Python bindings in `bindings/python`.
    pub fn has_python_bindings(&self) -> bool {
        matches!(self, ProjectId::Clang | ProjectId::Mlir)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source_dir_name())
    }
}
