use std::fmt::Write as _;

use crate::config::CONFIG_FILE;
use crate::error::Error;
use crate::types::Finding;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Content problems list every offending file and line, then how to fix them.
pub fn render_error(e: &Error) -> String {
    match e {
        Error::BrokenLinks { findings } => render_findings(
            "Broken Links",
            "These external links did not answer with a success status:",
            findings,
            "Update or remove each link. Links into the release tree only warn.",
        ),
        Error::InternalLinkSyntax { findings } => render_findings(
            "Internal Link Syntax",
            "These portal links are missing their leading `/`:",
            findings,
            "Write internal links as absolute portal paths, e.g. `/tomtom-digital-cockpit/...`.",
        ),
        Error::PlaceholderSyntax { findings } => render_findings(
            "Unknown Placeholder",
            "These link targets look like placeholders but are not a configured token:",
            findings,
            &format!("Use one of the tokens configured in `{CONFIG_FILE}`, or fix the spelling."),
        ),
        Error::UnresolvedSymbols { findings } => render_findings(
            "Unresolved API Links",
            "These labels are not present in their API reference index:",
            findings,
            "Check the label against the index, then list valid keys with:\n\n    portalref index <SET>",
        ),
        Error::Connectivity { reason, url } => render_connectivity(url, reason),
        Error::MissingSetting { reference_set, setting } => render_missing_setting(reference_set, setting),
        Error::UnknownReferenceSet { name } => render_unknown_reference_set(name),
        _ => render_generic(e),
    }
}

fn render_generic(e: &Error) -> String {
    match e {
        Error::ConfigNotFound { path } => format!("\
# Error: Config Not Found

`{}` does not exist.

## Fix

Check the `--config` path, or omit it to use `{CONFIG_FILE}` from the working directory.
", path.display()),

        Error::InvalidPattern { name, reason } => format!("\
# Error: Invalid Pattern

Pattern `{name}` does not compile: {reason}
"),

        Error::ParseFailed { file, reason } => format!("\
# Error: Parse Failed

Could not parse `{}`: {reason}
", file.display()),

        Error::Io(e) => format!("\
# Error: I/O

{e}
"),
        Error::TomlDe(e) => format!("\
# Error: Invalid TOML

{e}
"),
        // Already handled in render_error, but need exhaustive match.
        _ => format!("\
# Error

{e}
"),
    }
}

fn render_findings(title: &str, summary: &str, findings: &[Finding], fix: &str) -> String {
    let mut out = format!("\
# Error: {title}

{summary}

");
    for finding in findings {
        let _ = writeln!(out, "- {finding}");
    }
    let _ = write!(out, "\n## Fix\n\n{fix}\n");
    out
}

fn render_connectivity(url: &str, reason: &str) -> String {
    format!("\
# Error: Cannot Retrieve API Reference

`{url}` could not be retrieved: {reason}

## Fix

Check network access and the artifact store credentials in the environment.
")
}

fn render_missing_setting(reference_set: &str, setting: &str) -> String {
    let hint = if setting == "version" {
        format!("    portalref --ref-version {reference_set}=<VERSION> ...")
    } else {
        "    portalref --artifact-store <URL> ...".to_string()
    };

    format!("\
# Error: Missing Setting

Reference set `{reference_set}` needs `{setting}` to build its URLs.

## Fix

Set it in `{CONFIG_FILE}` or pass it on the command line:

{hint}
")
}

fn render_unknown_reference_set(name: &str) -> String {
    format!("\
# Error: Unknown Reference Set

No reference set is named `{name}`.

## Fix

Add it to `{CONFIG_FILE}`:

    [[reference_sets]]
    name = \"{name}\"
    token = \"TTIVI_...\"
    base_url = \"https://...\"
    source = {{ kind = \"directory\", path = \"...\" }}
")
}
