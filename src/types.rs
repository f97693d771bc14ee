/// Core domain types for portalref: symbol indexes, findings, and link classes.
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// One diagnostic produced while scanning the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// File the finding was raised for.
    pub file: PathBuf,
    /// One-based line number, absent in line-insensitive mode.
    pub line: Option<u32>,
    /// What is wrong, without the location.
    pub message: String,
}

impl Finding {
    /// Finding located at a specific line, or at the whole file when `line` is `None`.
    pub fn new(message: impl Into<String>, file: impl Into<PathBuf>, line: Option<u32>) -> Self {
        return Self {
            file: file.into(),
            line,
            message: message.into(),
        };
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self.line {
            None => write!(f, "{} in {}", self.message, self.file.display()),
            Some(line) => write!(f, "{} in {}:{line}", self.message, self.file.display()),
        };
    }
}

/// Where a reference set's symbol index comes from, with every template expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexSource {
    /// `.tar.gz` export on an artifact store, extracted then walked.
    Archive {
        /// Fully expanded download URL.
        url: String,
    },
    /// Export already present on disk.
    Directory {
        /// Root of the export.
        path: PathBuf,
    },
    /// JSON array of `{name, location}` pairs.
    Manifest {
        /// Fully expanded manifest URL.
        url: String,
    },
}

/// One versioned API reference, ready to be indexed and resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSet {
    /// Absolute URL that relative index paths are appended to.
    pub base_url: String,
    /// Directory names that are never indexed nor descended into.
    pub ignore: Vec<String>,
    /// Short name used for download directories, logs, and the `index` command.
    pub name: String,
    /// Origin of the symbol index.
    pub source: IndexSource,
    /// Literal placeholder token, e.g. `TTIVI_PLATFORM_API`.
    pub token: String,
    /// Version the URLs were expanded with, when one was needed.
    pub version: Option<String>,
}

/// How an external link is treated by the URL validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkClass {
    /// Ordinary external link; a broken status is a hard error.
    External,
    /// Hosted API reference; only probed in export mode.
    ReferenceHosted,
    /// Project release tree; a broken status is only a warning.
    ReleaseTree,
    /// Access-controlled artifact store; never probed.
    Restricted,
}

/// Symbol key to relative URL, for a single reference set.
/// Keys are unique; a later insert replaces an earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct SymbolIndex {
    /// Ordered so listings and JSON output are stable.
    entries: BTreeMap<String, String>,
}

impl SymbolIndex {
    /// Empty index.
    pub fn new() -> Self {
        return Self::default();
    }

    /// Relative URL for `key`, if indexed.
    pub fn get(&self, key: &str) -> Option<&str> {
        return self.entries.get(key).map(String::as_str);
    }

    /// Add or replace a key.
    pub fn insert(&mut self, key: impl Into<String>, url: impl Into<String>) {
        self.entries.insert(key.into(), url.into());
    }

    /// True when nothing was indexed.
    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        return self.entries.iter().map(|(k, v)| return (k.as_str(), v.as_str()));
    }

    /// Number of indexed keys.
    pub fn len(&self) -> usize {
        return self.entries.len();
    }
}

impl FromIterator<(String, String)> for SymbolIndex {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        return Self {
            entries: iter.into_iter().collect(),
        };
    }
}

/// Join a base URL and a relative path with exactly one `/` between them.
/// An empty relative path yields the base followed by `/`.
pub fn join_url(base: &str, relative: &str) -> String {
    return format!("{}/{}", base.trim_end_matches('/'), relative.trim_start_matches('/'));
}
