//! Miette-based error diagnostics for the `check-config` command.

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// A malformed `shockfade.toml`, with the offending span highlighted in the
/// file's own source text.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(shockfade::config))]
pub struct ConfigError {
    pub message: String,

    #[source_code]
    pub src: String,

    #[label("here")]
    pub span: SourceSpan,

    #[help]
    pub help: Option<String>,
}

impl ConfigError {
    #[must_use]
    pub fn from_toml_error(src: &str, err: &toml::de::Error) -> Self {
        let span = err.span().unwrap_or(0..0);
        Self {
            message: err.message().to_string(),
            src: src.to_string(),
            span: (span.start, span.end.saturating_sub(span.start).max(1)).into(),
            help: Some("check the key name and value type against shockfade.toml.example".to_string()),
        }
    }
}
