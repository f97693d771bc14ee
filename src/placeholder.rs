//! Placeholder syntax validation: every placeholder-shaped link target must be a known token.

use regex::Regex;

use crate::config::Config;
use crate::corpus::{self, CorpusFile};
use crate::error::Error;
use crate::types::Finding;

/// Regex matching any link target that starts with the placeholder prefix.
///
/// # Errors
///
/// Returns `Error::InvalidPattern` if the prefix produces an invalid regex.
fn generic_placeholder_pattern(prefix: &str) -> Result<Regex, Error> {
    let pattern = format!(r"\]\(({}[^)\n]*)\)", regex::escape(prefix));
    return Regex::new(&pattern).map_err(|e| return Error::InvalidPattern {
        name: "placeholder_prefix".to_string(),
        reason: e.to_string(),
    });
}

/// Report every placeholder-shaped link target in `content` that is not in `tokens`.
fn unknown_tokens_in_content(
    content: &str,
    file: &CorpusFile,
    pattern: &Regex,
    tokens: &[&str],
    line_numbers: bool,
    findings: &mut Vec<Finding>,
) {
    if !line_numbers {
        for cap in pattern.captures_iter(content) {
            let token = cap.get(1).map_or("", |m| return m.as_str());
            if !tokens.contains(&token) {
                findings.push(Finding::new(token, &file.relative, None));
            }
        }
        return;
    }

    for (index, line) in content.lines().enumerate() {
        for cap in pattern.captures_iter(line) {
            let token = cap.get(1).map_or("", |m| return m.as_str());
            if !tokens.contains(&token) {
                findings.push(Finding::new(token, &file.relative, Some(corpus::line_number(index))));
            }
        }
    }
}

/// Scan every corpus file for placeholder tokens outside the configured set.
/// Code blocks are scanned too: a placeholder in a sample would still be rewritten.
///
/// # Errors
///
/// Returns `Error::Io` if a file cannot be read, or `Error::InvalidPattern` for a
/// prefix that does not compile.
pub fn validate_placeholder_syntax(
    files: &[CorpusFile],
    config: &Config,
) -> Result<Vec<Finding>, Error> {
    let pattern = generic_placeholder_pattern(&config.placeholder_prefix)?;
    let tokens = config.tokens();
    let mut findings = Vec::new();

    for file in files {
        let content = std::fs::read_to_string(&file.path)?;
        unknown_tokens_in_content(
            &content,
            file,
            &pattern,
            &tokens,
            config.line_numbers,
            &mut findings,
        );
    }

    return Ok(findings);
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn write_corpus(files: &[(&str, &str)]) -> (tempfile::TempDir, Vec<CorpusFile>) {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            std::fs::write(dir.path().join(name), content).unwrap();
        }
        let corpus = corpus::eligible_files(dir.path(), &Config::default());
        (dir, corpus)
    }

    #[test]
    fn bogus_token_is_reported_once_with_file() {
        let (_dir, files) = write_corpus(&[(
            "guide.mdx",
            "Use [Foo](TTIVI_BOGUS_API) and [Bar](TTIVI_PLATFORM_API).\n",
        )]);
        let findings = validate_placeholder_syntax(&files, &Config::default()).unwrap();

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "TTIVI_BOGUS_API");
        assert_eq!(findings[0].file, PathBuf::from("guide.mdx"));
        assert_eq!(findings[0].line, Some(1));
    }

    #[test]
    fn known_tokens_and_ordinary_links_pass() {
        let (_dir, files) = write_corpus(&[(
            "guide.md",
            "[A](TTIVI_COMMS_API)\n[B](https://example.com)\n[C](/tomtom-digital-cockpit/x)\n",
        )]);
        let findings = validate_placeholder_syntax(&files, &Config::default()).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn line_insensitive_mode_reports_file_only() {
        let (_dir, files) = write_corpus(&[("guide.md", "\n\n[A](TTIVI_PLATFORM_APi)\n")]);
        let config = Config::parse("line_numbers = false").unwrap();
        let findings = validate_placeholder_syntax(&files, &config).unwrap();

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, None);
        assert_eq!(findings[0].to_string(), "TTIVI_PLATFORM_APi in guide.md");
    }
}
