//! URL validation: extract links from the corpus, classify them, and probe them.

use std::time::Duration;

use regex::{Regex, RegexBuilder};
use tracing::{debug, info};

use crate::config::Config;
use crate::corpus::{self, CorpusFile};
use crate::error::Error;
use crate::probe::{self, Probe};
use crate::types::{Finding, LinkClass, join_url};

/// Compiled link patterns for one run.
#[derive(Debug, Clone)]
pub struct LinkRules {
    /// `(http...)` link targets.
    external: Regex,
    /// `(/<prefix>...)` link targets.
    internal: Regex,
    /// `(<prefix>...)` link targets, missing the leading slash.
    internal_without_slash: Regex,
    /// Record line numbers in findings.
    line_numbers: bool,
    /// Origin internal links are resolved against.
    portal_base: String,
    /// Anchored reference-hosted pattern.
    reference_hosted: Regex,
    /// Anchored release-tree pattern.
    release_tree: Regex,
    /// Anchored restricted pattern.
    restricted: Regex,
}

/// Outcome of a validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlReport {
    /// Broken links that fail the run.
    pub errors: Vec<Finding>,
    /// Broken links that are only reported.
    pub warnings: Vec<Finding>,
}

/// A link target found in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FoundLink {
    /// One-based line, absent in line-insensitive mode.
    line: Option<u32>,
    /// Target text between the parentheses.
    target: String,
}

impl LinkRules {
    /// Compile the patterns described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPattern` if a configured pattern or the internal prefix
    /// does not compile.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let prefix = &config.portal.internal_prefix;
        let bare_prefix = prefix.trim_start_matches('/');

        return Ok(Self {
            external: compile("external", r"\((http[^)\n]+)\)")?,
            internal: compile("internal", &format!(r"\(({}[^)\n]*)\)", regex::escape(prefix)))?,
            internal_without_slash: compile(
                "internal_without_slash",
                &format!(r"\(({}[^)\n]*)\)", regex::escape(bare_prefix)),
            )?,
            line_numbers: config.line_numbers,
            portal_base: config.portal.base_url.clone(),
            reference_hosted: compile_anchored("reference_hosted", &config.links.reference_hosted)?,
            release_tree: compile_anchored("release_tree", &config.links.release_tree)?,
            restricted: compile_anchored("restricted", &config.links.restricted)?,
        });
    }

    /// Class of an external URL. Restricted wins over reference-hosted, which wins
    /// over release-tree.
    pub fn classify(&self, url: &str) -> LinkClass {
        if self.restricted.is_match(url) {
            return LinkClass::Restricted;
        }
        if self.reference_hosted.is_match(url) {
            return LinkClass::ReferenceHosted;
        }
        if self.release_tree.is_match(url) {
            return LinkClass::ReleaseTree;
        }
        return LinkClass::External;
    }
}

/// Compile a case-insensitive link pattern.
///
/// # Errors
///
/// Returns `Error::InvalidPattern` naming the pattern.
fn compile(name: &str, pattern: &str) -> Result<Regex, Error> {
    return RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| return Error::InvalidPattern {
            name: name.to_string(),
            reason: e.to_string(),
        });
}

/// Compile a case-insensitive pattern that must match a whole URL.
///
/// # Errors
///
/// Returns `Error::InvalidPattern` naming the pattern.
fn compile_anchored(name: &str, pattern: &str) -> Result<Regex, Error> {
    return compile(name, &format!("^(?:{pattern})$"));
}

/// Every capture of `pattern` in `content`, with line numbers when enabled.
fn extract(content: &str, pattern: &Regex, line_numbers: bool) -> Vec<FoundLink> {
    let capture = |text: &str, line: Option<u32>| {
        return pattern
            .captures_iter(text)
            .filter_map(|cap| return cap.get(1))
            .map(|m| return FoundLink {
                line,
                target: m.as_str().to_string(),
            })
            .collect::<Vec<_>>();
    };

    if !line_numbers {
        return capture(content, None);
    }
    return content
        .lines()
        .enumerate()
        .flat_map(|(index, line)| return capture(line, Some(corpus::line_number(index))))
        .collect();
}

/// Read a corpus file with its fenced code blocks blanked.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be read, or `Error::ParseFailed` if the
/// markdown cannot be parsed.
fn read_prose(file: &CorpusFile) -> Result<String, Error> {
    let content = std::fs::read_to_string(&file.path)?;
    return corpus::blank_fenced_code(&file.relative, &content);
}

/// Report internal links written without their leading `/`.
///
/// # Errors
///
/// Returns `Error::Io` or `Error::ParseFailed` if a file cannot be read or parsed.
pub fn validate_internal_link_syntax(files: &[CorpusFile], rules: &LinkRules) -> Result<Vec<Finding>, Error> {
    let mut findings = Vec::new();
    for file in files {
        let prose = read_prose(file)?;
        for link in extract(&prose, &rules.internal_without_slash, rules.line_numbers) {
            findings.push(Finding::new(link.target, &file.relative, link.line));
        }
    }
    return Ok(findings);
}

/// Probe every external and internal link in the corpus.
///
/// Broken external links are errors, except release-tree links which only warn.
/// Reference-hosted links are probed only when `export` is set; restricted links
/// never are. Internal links answering anything above 200 only warn.
///
/// # Errors
///
/// Returns `Error::Io` or `Error::ParseFailed` if a file cannot be read or parsed.
/// Broken links are reported in the returned [`UrlReport`], not as errors.
pub fn validate_urls(
    files: &[CorpusFile],
    rules: &LinkRules,
    export: bool,
    probe: &dyn Probe,
    sleep: &mut dyn FnMut(Duration),
) -> Result<UrlReport, Error> {
    let mut report = UrlReport::default();
    let mut probed = 0_usize;

    for file in files {
        let prose = read_prose(file)?;

        for link in extract(&prose, &rules.external, rules.line_numbers) {
            let class = rules.classify(&link.target);
            let skip = match class {
                LinkClass::ReferenceHosted => !export,
                LinkClass::Restricted => true,
                LinkClass::External | LinkClass::ReleaseTree => false,
            };
            if skip {
                debug!(url = %link.target, ?class, "skipping link");
                continue;
            }

            let status = probe::probe_status(probe, &link.target, sleep);
            probed = probed.saturating_add(1);
            if status < 400 && status != 204 {
                continue;
            }

            let finding = Finding::new(format!("{} (status {status})", link.target), &file.relative, link.line);
            if class == LinkClass::ReleaseTree {
                report.warnings.push(finding);
            } else {
                report.errors.push(finding);
            }
        }

        for link in extract(&prose, &rules.internal, rules.line_numbers) {
            let url = join_url(&rules.portal_base, &link.target);
            let status = probe::probe_status(probe, &url, sleep);
            probed = probed.saturating_add(1);
            if status > 200 {
                report
                    .warnings
                    .push(Finding::new(format!("{url} (status {status})"), &file.relative, link.line));
            }
        }
    }

    info!(
        files = files.len(),
        probed,
        warnings = report.warnings.len(),
        errors = report.errors.len(),
        "validated links"
    );
    return Ok(report);
}
