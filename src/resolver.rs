//! Placeholder resolution: rewrite `[Label](TOKEN)` links into API reference URLs.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::corpus::{self, CorpusFile};
use crate::error::Error;
use crate::types::{Finding, ReferenceSet, SymbolIndex, join_url};

/// One reference set ready for resolution: its token, index, and base URL.
#[derive(Debug, Clone)]
pub struct Binding {
    /// Absolute root the index's relative URLs are appended to.
    pub base_url: String,
    /// Symbol key to relative URL.
    pub index: SymbolIndex,
    /// Reference set name, used in findings.
    pub name: String,
    /// Placeholder token.
    pub token: String,
}

/// Outcome of a resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    /// Labels that were not found in their reference set's index.
    pub errors: Vec<Finding>,
    /// Files whose content changed, relative to the corpus root.
    pub rewritten: Vec<PathBuf>,
}

impl Binding {
    /// Pair a reference set with its built index.
    pub fn new(set: &ReferenceSet, index: SymbolIndex) -> Self {
        return Self {
            base_url: set.base_url.clone(),
            index,
            name: set.name.clone(),
            token: set.token.clone(),
        };
    }
}

/// Byte offset of the `[` opening the label that ends where `before` ends.
/// Nested brackets are balanced; the search stops at the start of the line.
fn label_start(before: &str) -> Option<usize> {
    let mut depth = 0_u32;
    for (index, ch) in before.char_indices().rev() {
        match ch {
            '\n' => return None,
            ']' => depth = depth.saturating_add(1),
            '[' if depth == 0 => return Some(index),
            '[' => depth = depth.saturating_sub(1),
            _ => {},
        }
    }
    return None;
}

/// Relative URL for `label`, or `""` after recording a finding.
fn lookup<'a>(binding: &'a Binding, label: &str, file: &Path, line: u32, errors: &mut Vec<Finding>) -> &'a str {
    let key = normalize_label(label);
    if let Some(relative) = binding.index.get(key).filter(|_| return !key.is_empty()) {
        return relative;
    }
    errors.push(Finding::new(
        format!("API element '{label}' cannot be found in the {} API Reference map", binding.name),
        file,
        Some(line),
    ));
    return "";
}

/// Strip surrounding backticks (only when both ends carry one), then one leading `@`.
pub fn normalize_label(label: &str) -> &str {
    let unquoted = label
        .strip_prefix('`')
        .and_then(|l| return l.strip_suffix('`'))
        .unwrap_or(label);
    return unquoted.strip_prefix('@').unwrap_or(unquoted);
}

/// Rewrite and write back every file that holds placeholders.
///
/// Lookup failures are collected in the report; they never stop the pass.
///
/// # Errors
///
/// Returns `Error::Io` if a file cannot be read or written.
pub fn resolve(files: &[CorpusFile], bindings: &[Binding]) -> Result<ResolutionReport, Error> {
    let mut report = ResolutionReport::default();

    for file in files {
        let original = std::fs::read_to_string(&file.path)?;
        let mut content = original.clone();
        for binding in bindings {
            content = resolve_content(&content, &file.relative, binding, &mut report.errors);
        }

        if content != original {
            std::fs::write(&file.path, &content)?;
            debug!(file = %file.relative.display(), "rewrote placeholders");
            report.rewritten.push(file.relative.clone());
        }
    }

    info!(
        files = files.len(),
        rewritten = report.rewritten.len(),
        unresolved = report.errors.len(),
        "resolved API links"
    );
    return Ok(report);
}

/// Resolve one token's placeholders in `content`, left to right.
///
/// Every `](TOKEN)` is replaced in place by the URL of its own label. A label that
/// is missing from the index, or a target with no label on its line, substitutes
/// the bare base URL and records a finding.
pub fn resolve_content(content: &str, file: &Path, binding: &Binding, errors: &mut Vec<Finding>) -> String {
    let target = format!("]({})", binding.token);
    let mut out = String::with_capacity(content.len());
    let mut copied = 0_usize;

    for (start, _) in content.match_indices(&target) {
        let before = content.get(..start).unwrap_or("");
        let label = label_start(before)
            .and_then(|open| return before.get(open.saturating_add(1)..))
            .unwrap_or("");
        let line = corpus::line_number(before.matches('\n').count());
        let url = join_url(&binding.base_url, lookup(binding, label, file, line, errors));

        out.push_str(content.get(copied..start).unwrap_or(""));
        out.push_str("](");
        out.push_str(&url);
        out.push(')');
        copied = start.saturating_add(target.len());
    }

    out.push_str(content.get(copied..).unwrap_or(""));
    return out;
}
