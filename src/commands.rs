//! CLI commands for portalref: check-placeholders, index, resolve, check-urls, run.

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{info, warn};

use crate::config::{Config, Overrides};
use crate::corpus::{self, CorpusFile};
use crate::error;
use crate::http;
use crate::indexer;
use crate::links::{self, LinkRules};
use crate::placeholder;
use crate::probe::HttpProbe;
use crate::resolver::{self, Binding};

/// Index every configured reference set and pair each index with its token.
///
/// # Errors
///
/// Returns configuration errors for unexpandable templates, or connectivity and I/O
/// errors from fetching an index.
fn build_bindings(config: &Config, overrides: &Overrides, client: &Client) -> Result<Vec<Binding>, error::Error> {
    let sets = config.reference_sets(overrides)?;

    let versions = sets
        .iter()
        .map(|s| return format!("{}={}", s.name, s.version.as_deref().unwrap_or("-")))
        .collect::<Vec<_>>()
        .join(", ");
    info!("Using API reference versions: {versions}");

    let mut bindings = Vec::with_capacity(sets.len());
    for set in &sets {
        let index = indexer::build_index(set, config, client)?;
        if index.is_empty() {
            warn!(reference_set = %set.name, "API reference index is empty");
        }
        bindings.push(Binding::new(set, index));
    }
    return Ok(bindings);
}

/// Check placeholder syntax only.
///
/// # Errors
///
/// Returns `Error::PlaceholderSyntax` listing every unknown token, or `Error::Io`.
pub fn check_placeholders(dir: &Path, config: &Config) -> Result<(), error::Error> {
    let files = corpus_files(dir, config);
    ensure_placeholder_syntax(&files, config)?;
    eprintln!("All placeholders in {} files are known tokens", files.len());
    return Ok(());
}

/// Check internal-link syntax, then probe every link.
///
/// # Errors
///
/// Returns `Error::InternalLinkSyntax` before any request is made, `Error::BrokenLinks`
/// after the whole corpus was probed, or I/O and parse errors.
pub fn check_urls(dir: &Path, export: bool, config: &Config) -> Result<(), error::Error> {
    let files = corpus_files(dir, config);
    let rules = LinkRules::new(config)?;
    ensure_internal_link_syntax(&files, &rules)?;

    let client = http::build_client(config.request_timeout_secs)?;
    return validate_links(&files, &rules, export, client);
}

/// Eligible files under `dir`.
fn corpus_files(dir: &Path, config: &Config) -> Vec<CorpusFile> {
    let files = corpus::eligible_files(dir, config);
    info!(root = %dir.display(), files = files.len(), "collected corpus");
    return files;
}

/// Fail with every internal link that lacks its leading slash.
///
/// # Errors
///
/// Returns `Error::InternalLinkSyntax` when any were found.
fn ensure_internal_link_syntax(files: &[CorpusFile], rules: &LinkRules) -> Result<(), error::Error> {
    let findings = links::validate_internal_link_syntax(files, rules)?;
    if !findings.is_empty() {
        return Err(error::Error::InternalLinkSyntax { findings });
    }
    return Ok(());
}

/// Fail with every unknown placeholder token.
///
/// # Errors
///
/// Returns `Error::PlaceholderSyntax` when any were found.
fn ensure_placeholder_syntax(files: &[CorpusFile], config: &Config) -> Result<(), error::Error> {
    let findings = placeholder::validate_placeholder_syntax(files, config)?;
    if !findings.is_empty() {
        return Err(error::Error::PlaceholderSyntax { findings });
    }
    return Ok(());
}

/// Build one reference set's index and print it.
///
/// # Errors
///
/// Returns `Error::UnknownReferenceSet`, template errors, or fetch errors.
pub fn index(name: &str, json: bool, config: &Config, overrides: &Overrides) -> Result<(), error::Error> {
    let set = config.reference_set(name, overrides)?;
    let client = http::build_client(config.request_timeout_secs)?;
    let index = indexer::build_index(&set, config, &client)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&index)?);
        return Ok(());
    }

    for (key, url) in index.iter() {
        println!("{key} -> {url}");
    }
    eprintln!("{} keys in {}", index.len(), set.name);
    return Ok(());
}

/// Check placeholder syntax, index every reference set, and rewrite placeholders.
///
/// # Errors
///
/// Returns `Error::PlaceholderSyntax` before any request is made,
/// `Error::UnresolvedSymbols` after all files were processed, or index errors.
pub fn resolve(dir: &Path, config: &Config, overrides: &Overrides) -> Result<(), error::Error> {
    let files = corpus_files(dir, config);
    ensure_placeholder_syntax(&files, config)?;

    let client = http::build_client(config.request_timeout_secs)?;
    return resolve_placeholders(&files, config, overrides, &client);
}

/// Index, resolve, and fail on any label that could not be found.
///
/// # Errors
///
/// Returns `Error::UnresolvedSymbols`, or index and I/O errors.
fn resolve_placeholders(
    files: &[CorpusFile],
    config: &Config,
    overrides: &Overrides,
    client: &Client,
) -> Result<(), error::Error> {
    let bindings = build_bindings(config, overrides, client)?;
    let report = resolver::resolve(files, &bindings)?;
    if !report.errors.is_empty() {
        return Err(error::Error::UnresolvedSymbols { findings: report.errors });
    }
    eprintln!("Generated API links in {} files", report.rewritten.len());
    return Ok(());
}

/// Full pipeline: optional staging copy, both syntax checks, resolution, URL validation.
///
/// # Errors
///
/// Returns the first failing stage's error. Syntax errors are raised before any
/// network access.
pub fn run(
    dir: &Path,
    export: bool,
    source: Option<&Path>,
    config: &Config,
    overrides: &Overrides,
) -> Result<(), error::Error> {
    if let Some(source) = source {
        let copied = corpus::stage(source, dir)?;
        info!(from = %source.display(), to = %dir.display(), copied, "staged documentation");
    }

    let files = corpus_files(dir, config);
    let rules = LinkRules::new(config)?;
    ensure_placeholder_syntax(&files, config)?;
    ensure_internal_link_syntax(&files, &rules)?;

    let client = http::build_client(config.request_timeout_secs)?;
    resolve_placeholders(&files, config, overrides, &client)?;
    return validate_links(&files, &rules, export, client);
}

/// Probe every link, log warnings, and fail on errors.
///
/// # Errors
///
/// Returns `Error::BrokenLinks` when any hard error was found.
fn validate_links(files: &[CorpusFile], rules: &LinkRules, export: bool, client: Client) -> Result<(), error::Error> {
    let probe = HttpProbe::new(client);
    let mut sleep = |delay: Duration| return std::thread::sleep(delay);
    let report = links::validate_urls(files, rules, export, &probe, &mut sleep)?;

    for warning in &report.warnings {
        warn!("{warning}");
    }
    if !report.errors.is_empty() {
        return Err(error::Error::BrokenLinks { findings: report.errors });
    }
    eprintln!("All links valid ({} warnings)", report.warnings.len());
    return Ok(());
}
