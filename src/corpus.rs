//! Corpus discovery: eligible files under a root, and markdown preprocessing.

use std::ops::Range;
use std::path::{Path, PathBuf};

use tree_sitter::{Node, Parser};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Error;

/// A corpus file, addressed both on disk and relative to the corpus root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusFile {
    /// Path used for reading and writing.
    pub path: PathBuf,
    /// Path shown in findings.
    pub relative: PathBuf,
}

/// Blank the body of every fenced code block, keeping newlines so that line
/// numbers of the remaining text are unchanged.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if the markdown grammar cannot be loaded or parsing fails.
pub fn blank_fenced_code(file: &Path, content: &str) -> Result<String, Error> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_md::LANGUAGE.into())
        .map_err(|err| return Error::ParseFailed {
            file: file.to_path_buf(),
            reason: err.to_string(),
        })?;

    let tree = parser.parse(content, None).ok_or_else(|| return Error::ParseFailed {
        file: file.to_path_buf(),
        reason: "tree-sitter returned None".to_string(),
    })?;

    let mut blocks = Vec::new();
    collect_fenced_code_ranges(tree.root_node(), &mut blocks);
    if blocks.is_empty() {
        return Ok(content.to_string());
    }

    let mut out = String::with_capacity(content.len());
    for (offset, ch) in content.char_indices() {
        let in_block = blocks.iter().any(|range| return range.contains(&offset));
        if in_block && ch != '\n' {
            out.push(' ');
        } else {
            out.push(ch);
        }
    }
    return Ok(out);
}

/// Recursively collect byte ranges of fenced code blocks.
fn collect_fenced_code_ranges(node: Node<'_>, ranges: &mut Vec<Range<usize>>) {
    if node.kind() == "fenced_code_block" {
        ranges.push(node.start_byte()..node.end_byte());
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_fenced_code_ranges(child, ranges);
    }
}

/// List every corpus file under `root`, sorted by path.
/// A file is eligible when it has one of the configured extensions and passes the
/// config's include/exclude filters. A missing root yields no files.
pub fn eligible_files(root: &Path, config: &Config) -> Vec<CorpusFile> {
    let mut files: Vec<CorpusFile> = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_file() && config.has_corpus_extension(e.path()))
        .filter_map(|entry| {
            let path = entry.path().to_path_buf();
            let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            if !config.should_scan(&relative.to_string_lossy()) {
                return None;
            }
            return Some(CorpusFile { path, relative });
        })
        .collect();
    files.sort_by(|a, b| return a.relative.cmp(&b.relative));
    return files;
}

/// Convert a zero-based line index into the one-based number shown in findings.
pub fn line_number(index: usize) -> u32 {
    return u32::try_from(index.saturating_add(1)).unwrap_or(u32::MAX);
}

/// Copy `source` into a freshly created `target`, removing whatever was there.
///
/// # Errors
///
/// Returns `Error::Io` if the target cannot be cleaned or any file cannot be copied.
pub fn stage(source: &Path, target: &Path) -> Result<usize, Error> {
    if target.exists() {
        std::fs::remove_dir_all(target)?;
    }
    std::fs::create_dir_all(target)?;

    let mut copied = 0_usize;
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| return Error::Io(e.into()))?;
        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let destination = target.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&destination)?;
        } else {
            std::fs::copy(entry.path(), &destination)?;
            copied = copied.saturating_add(1);
        }
    }
    return Ok(copied);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_code_is_blanked_but_lines_are_kept() {
        let content = "See [a](https://a.test).\n\n```kotlin\nval x = \"(https://b.test)\"\n```\n\nEnd [c](https://c.test).\n";
        let blanked = blank_fenced_code(Path::new("a.md"), content).unwrap();

        assert_eq!(blanked.lines().count(), content.lines().count());
        assert!(blanked.contains("https://a.test"));
        assert!(!blanked.contains("https://b.test"));
        assert!(blanked.contains("https://c.test"));
        assert_eq!(blanked.lines().nth(6), Some("End [c](https://c.test)."));
    }

    #[test]
    fn content_without_code_is_unchanged() {
        let content = "# Title\n\nPlain [link](/tomtom-digital-cockpit/x).\n";
        assert_eq!(blank_fenced_code(Path::new("a.md"), content).unwrap(), content);
    }

    #[test]
    fn eligible_files_filters_extensions_and_excludes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("documentation/archive")).unwrap();
        std::fs::write(root.join("documentation/b.mdx"), "").unwrap();
        std::fs::write(root.join("documentation/a.md"), "").unwrap();
        std::fs::write(root.join("documentation/c.html"), "").unwrap();
        std::fs::write(root.join("documentation/archive/old.md"), "").unwrap();

        let config = Config::parse("exclude = [\"documentation/archive/\"]").unwrap();
        let files = eligible_files(root, &config);
        let relative: Vec<PathBuf> = files.into_iter().map(|f| f.relative).collect();
        assert_eq!(
            relative,
            vec![PathBuf::from("documentation/a.md"), PathBuf::from("documentation/b.mdx")]
        );
    }

    #[test]
    fn stage_replaces_previous_target() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src");
        let target = dir.path().join("build/portal");
        std::fs::create_dir_all(source.join("documentation")).unwrap();
        std::fs::write(source.join("documentation/a.mdx"), "hello").unwrap();
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("stale.mdx"), "old").unwrap();

        let copied = stage(&source, &target).unwrap();

        assert_eq!(copied, 1);
        assert!(!target.join("stale.mdx").exists());
        assert_eq!(std::fs::read_to_string(target.join("documentation/a.mdx")).unwrap(), "hello");
    }
}
