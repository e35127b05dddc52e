//! Install roots exported by loaded environment modules.

use std::path::PathBuf;

use super::DependencyResolver;

/// Name of the variable a loaded module exports its install root in.
///
/// `compiler-rt` becomes `EBROOTCOMPILERMINUSRT`.
pub fn root_env_var(name: &str) -> String {
    format!("EBROOT{}", name.to_ascii_uppercase().replace('-', "MINUS"))
}

/// Resolves dependencies from `EBROOT<NAME>` variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvResolver;

impl DependencyResolver for EnvResolver {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        std::env::var_os(root_env_var(name))
            .filter(|root| !root.is_empty())
            .map(PathBuf::from)
    }
}
