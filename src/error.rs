use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostic::Diagnostic;
use crate::ir::verify::VerifyError;

/// Driver-level failures: everything outside a single construct's lowering.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed AST in '{}': {source}", path.display())]
    Ast {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config '{}': {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{}", summarize(.0))]
    Translate(Vec<Diagnostic>),

    #[error("IR verification failed:\n{}", list(.0))]
    Verify(Vec<VerifyError>),
}

impl Error {
    /// Translation diagnostics carried by this error, if any.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Error::Translate(diags) => diags,
            _ => &[],
        }
    }
}

fn summarize(diags: &[Diagnostic]) -> String {
    let errors = diags.iter().filter(|d| d.is_error()).count();
    match diags.iter().find(|d| d.is_error()) {
        Some(first) if errors > 1 => format!("{} (and {} more errors)", first, errors - 1),
        Some(first) => first.to_string(),
        None => "translation failed".to_string(),
    }
}

fn list(errors: &[VerifyError]) -> String {
    errors
        .iter()
        .map(|e| format!("  {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}
