/// Crate-level error types for portalref diagnostics.
use std::path::PathBuf;

use crate::types::Finding;

/// Every error names the file, URL, or setting that caused it. Variants that
/// carry `findings` aggregate a full pass over the corpus.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// External links returned a broken status.
    #[error("encountered {} broken external URL(s)", findings.len())]
    BrokenLinks {
        /// One finding per broken link occurrence.
        findings: Vec<Finding>,
    },

    /// An explicitly requested config file does not exist on disk.
    #[error("config not found: {}", path.display())]
    ConfigNotFound {
        /// Path to the missing config file.
        path: PathBuf,
    },

    /// A manifest or archive could not be retrieved.
    #[error("cannot retrieve {url}: {reason}")]
    Connectivity {
        /// Why the retrieval failed.
        reason: String,
        /// URL that was requested.
        url: String,
    },

    /// The HTTP client failed outside of a single request.
    #[error("http: {0}")]
    Http(
        /// The wrapped client error.
        #[from]
        reqwest::Error,
    ),

    /// Internal portal links were written without their leading slash.
    #[error("encountered {} syntax error(s) in internal URLs", findings.len())]
    InternalLinkSyntax {
        /// One finding per malformed link.
        findings: Vec<Finding>,
    },

    /// A configured link pattern is not a valid regular expression.
    #[error("invalid pattern `{name}`: {reason}")]
    InvalidPattern {
        /// Config key holding the pattern.
        name: String,
        /// Compiler message from the regex engine.
        reason: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// A manifest body is not the expected JSON shape.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// A URL template needs a value that was neither configured nor passed on the command line.
    #[error("reference set `{reference_set}` needs `{setting}`")]
    MissingSetting {
        /// Reference set whose template could not be expanded.
        reference_set: String,
        /// Name of the missing value.
        setting: String,
    },

    /// Tree-sitter failed to parse a markdown file.
    #[error("parse failed: {}: {reason}", file.display())]
    ParseFailed {
        /// File that failed to parse.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// Placeholder-shaped link targets that are not a configured token.
    #[error("encountered {} placeholder syntax error(s)", findings.len())]
    PlaceholderSyntax {
        /// One finding per unknown token occurrence.
        findings: Vec<Finding>,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// No configured reference set has the given name.
    #[error("unknown reference set: `{name}`")]
    UnknownReferenceSet {
        /// Reference set name that was not found.
        name: String,
    },

    /// Placeholders whose label is missing from the reference set index.
    #[error("API link(s) could not be generated for {} placeholder(s)", findings.len())]
    UnresolvedSymbols {
        /// One finding per failed lookup.
        findings: Vec<Finding>,
    },
}

impl Error {
    /// Whether this error reports a problem in the documentation content
    /// rather than a failure of the tool or its environment.
    pub const fn is_content_problem(&self) -> bool {
        return matches!(
            self,
            Error::BrokenLinks { .. }
                | Error::InternalLinkSyntax { .. }
                | Error::PlaceholderSyntax { .. }
                | Error::UnresolvedSymbols { .. }
        );
    }
}
