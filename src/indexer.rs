//! Reference indexing: symbol key to relative URL, from an API reference export.
//!
//! Dokka exports encode upper-case letters as `-x` in file names. Keys are rebuilt
//! from path components: `-default-animation-listener/on-animation-start.html`
//! becomes `DefaultAnimationListener.onAnimationStart`.

use std::fs::File;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Error;
use crate::http;
use crate::types::{IndexSource, ReferenceSet, SymbolIndex};

/// Name the downloaded tarball is stored under before extraction.
const ARCHIVE_FILE: &str = "api-reference.tar.gz";

/// Page every module and package directory carries.
const INDEX_FILE: &str = "index.html";

/// One entry of a JSON navigation manifest.
#[derive(Debug, Deserialize)]
struct ManifestEntry {
    /// Relative URL of the page.
    location: String,
    /// Symbol key.
    name: String,
}

/// Build the symbol index for one reference set from its configured source.
///
/// # Errors
///
/// Returns `Error::Connectivity` if a manifest or archive cannot be fetched or a
/// manifest is empty, `Error::Json` for a malformed manifest, or `Error::Io` if an
/// archive cannot be stored or extracted.
pub fn build_index(set: &ReferenceSet, config: &Config, client: &Client) -> Result<SymbolIndex, Error> {
    let index = match &set.source {
        IndexSource::Archive { url } => {
            let target = download_target(config, set);
            let credentials = config.artifact_store.credentials();
            download_archive(client, url, credentials.as_ref(), &target)?;
            index_directory(&target, &set.ignore, &config.navigation_file)
        },
        IndexSource::Directory { path } => index_directory(path, &set.ignore, &config.navigation_file),
        IndexSource::Manifest { url } => fetch_manifest(client, url)?,
    };

    info!(reference_set = %set.name, entries = index.len(), "indexed API reference");
    return Ok(index);
}

/// Upper-case the first character and lower-case the rest.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    return first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect();
}

/// Key for a page from its path components relative to its package directory.
/// The first `index.html` component is dropped and `.html` is stripped everywhere.
pub fn construct_key(components: &[&str]) -> String {
    let mut words: Vec<String> = components
        .iter()
        .map(|c| {
            if c.starts_with('-') {
                return to_pascal_case(c);
            }
            return to_camel_case(c);
        })
        .collect();

    if let Some(position) = words.iter().position(|w| return w == INDEX_FILE) {
        words.remove(position);
    }

    return words
        .iter()
        .map(|w| return w.replace(".html", ""))
        .collect::<Vec<_>>()
        .join(".");
}

/// Fetch `url` into a fresh `target` directory and unpack it there.
///
/// # Errors
///
/// Returns `Error::Connectivity` on a failed or non-2xx download, `Error::Io` if
/// the directory, the tarball, or its entries cannot be written.
pub fn download_archive(
    client: &Client,
    url: &str,
    credentials: Option<&(String, String)>,
    target: &Path,
) -> Result<(), Error> {
    if target.exists() {
        std::fs::remove_dir_all(target)?;
    }
    std::fs::create_dir_all(target)?;

    info!(%url, target = %target.display(), "downloading API reference");
    let body = http::get_bytes(client, url, credentials)?;
    let archive_path = target.join(ARCHIVE_FILE);
    std::fs::write(&archive_path, body)?;

    return extract_archive(&archive_path, target);
}

/// Directory an archive-backed reference set is extracted into.
fn download_target(config: &Config, set: &ReferenceSet) -> PathBuf {
    let version = set.version.as_deref().unwrap_or("latest");
    return config.download_dir.join(format!("{}_{version}", set.name));
}

/// Unpack a `.tar.gz` into `target`.
///
/// # Errors
///
/// Returns `Error::Io` if the archive cannot be opened or an entry cannot be written.
pub fn extract_archive(archive_path: &Path, target: &Path) -> Result<(), Error> {
    let file = File::open(archive_path)?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive.unpack(target)?;
    return Ok(());
}

/// GET a navigation manifest and index its `{name, location}` pairs.
///
/// # Errors
///
/// Returns `Error::Connectivity` if it cannot be fetched or is empty, or
/// `Error::Json` if the body is not an array of entries.
pub fn fetch_manifest(client: &Client, url: &str) -> Result<SymbolIndex, Error> {
    info!(%url, "retrieving API reference manifest");
    let body = http::get_bytes(client, url, None)?;
    return parse_manifest(url, &body);
}

/// Index an extracted API reference. Never fails: unreadable or missing directories
/// contribute no keys.
pub fn index_directory(root: &Path, ignore: &[String], navigation_file: &str) -> SymbolIndex {
    let mut index = SymbolIndex::new();

    for module in subdirectories(root, ignore) {
        index.insert(module.as_str(), format!("{module}/{INDEX_FILE}"));
        let module_path = root.join(&module);

        for package in subdirectories(&module_path, ignore) {
            index.insert(package.as_str(), format!("{module}/{package}/{INDEX_FILE}"));
            let package_path = module_path.join(&package);
            index_package_pages(&package_path, &[module.as_str(), package.as_str()], ignore, navigation_file, &mut index);
        }
    }

    return index;
}

/// Add a key for every page below a package directory.
fn index_package_pages(
    package_path: &Path,
    url_prefix: &[&str],
    ignore: &[String],
    navigation_file: &str,
    index: &mut SymbolIndex,
) {
    let walker = WalkDir::new(package_path)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| return e.depth() == 0 || !is_ignored_dir(e, ignore));

    for entry in walker.filter_map(Result::ok) {
        let path = entry.path();
        let is_page = entry.file_type().is_file()
            && path.extension().is_some_and(|ext| return ext == "html")
            && entry.file_name() != navigation_file;
        if !is_page {
            continue;
        }

        let Ok(relative) = path.strip_prefix(package_path) else {
            continue;
        };
        let components: Vec<String> = relative
            .components()
            .map(|c| return c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let parts: Vec<&str> = components.iter().map(String::as_str).collect();

        let key = construct_key(&parts);
        if key.is_empty() {
            continue;
        }

        let url = url_prefix.iter().copied().chain(parts.iter().copied()).collect::<Vec<_>>().join("/");
        debug!(%key, %url, "indexed page");
        index.insert(key, url);
    }
}

/// Whether a walk entry is a directory named in the ignore list.
fn is_ignored_dir(entry: &walkdir::DirEntry, ignore: &[String]) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    return ignore.iter().any(|i| return *i == name);
}

/// Decode a manifest body.
///
/// # Errors
///
/// Returns `Error::Json` for a malformed body, or `Error::Connectivity` for an empty one.
pub fn parse_manifest(url: &str, body: &[u8]) -> Result<SymbolIndex, Error> {
    let entries: Vec<ManifestEntry> = serde_json::from_slice(body)?;
    if entries.is_empty() {
        return Err(Error::Connectivity {
            reason: "manifest is empty".to_string(),
            url: url.to_string(),
        });
    }
    return Ok(entries.into_iter().map(|e| return (e.name, e.location)).collect());
}

/// Sorted names of the non-ignored subdirectories of `dir`; empty when unreadable.
fn subdirectories(dir: &Path, ignore: &[String]) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_ok_and(|t| return t.is_dir()))
        .map(|e| return e.file_name().to_string_lossy().into_owned())
        .filter(|name| return !ignore.contains(name))
        .collect();
    names.sort();
    return names;
}

/// `on-animation-start` to `onAnimationStart`; the first word keeps its case.
fn to_camel_case(name: &str) -> String {
    let mut words = name.split('-');
    let first = words.next().unwrap_or("").to_string();
    return words.fold(first, |mut acc, word| {
        acc.push_str(&capitalize(word));
        return acc;
    });
}

/// `-overlay-panel` to `OverlayPanel`.
fn to_pascal_case(name: &str) -> String {
    return name.split('-').map(capitalize).collect();
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    fn ignore() -> Vec<String> {
        return vec!["scripts".to_string(), "images".to_string(), "styles".to_string(), "package-list".to_string()];
    }

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "<html></html>").unwrap();
    }

    #[test]
    fn keys_follow_dokka_naming() {
        assert_eq!(construct_key(&["-default-animation-listener", "index.html"]), "DefaultAnimationListener");
        assert_eq!(
            construct_key(&["-default-animation-listener", "on-animation-start.html"]),
            "DefaultAnimationListener.onAnimationStart"
        );
        assert_eq!(
            construct_key(&["-dismissal-strategy", "-dismiss-direction", "-l-e-f-t", "index.html"]),
            "DismissalStrategy.DismissDirection.LEFT"
        );
        assert_eq!(
            construct_key(&[
                "-spring-animation-configuration",
                "-companion",
                "-n-o-r-m-a-l-i-z-a-t-i-o-n_-d-i-v-i-d-e-r.html"
            ]),
            "SpringAnimationConfiguration.Companion.NORMALIZATION_DIVIDER"
        );
        assert_eq!(construct_key(&["index.html"]), "");
    }

    #[test]
    fn directory_index_covers_modules_packages_and_pages() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "frontend_api/index.html");
        touch(root, "frontend_api/com.tomtom.panels/index.html");
        touch(root, "frontend_api/com.tomtom.panels/navigation.html");
        touch(root, "frontend_api/com.tomtom.panels/-overlay-panel/index.html");
        touch(root, "frontend_api/com.tomtom.panels/-overlay-panel/on-open.html");
        touch(root, "scripts/navigation-pane.json");
        touch(root, "frontend_api/com.tomtom.panels/images/-logo/index.html");

        let index = index_directory(root, &ignore(), "navigation.html");

        assert_eq!(index.get("frontend_api"), Some("frontend_api/index.html"));
        assert_eq!(index.get("com.tomtom.panels"), Some("frontend_api/com.tomtom.panels/index.html"));
        assert_eq!(
            index.get("OverlayPanel"),
            Some("frontend_api/com.tomtom.panels/-overlay-panel/index.html")
        );
        assert_eq!(
            index.get("OverlayPanel.onOpen"),
            Some("frontend_api/com.tomtom.panels/-overlay-panel/on-open.html")
        );
        assert_eq!(index.get("scripts"), None);
        assert_eq!(index.get("Logo"), None);
        assert_eq!(index.get("navigation"), None);
        assert!(index.iter().all(|(key, _)| !key.contains("index.html")));
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn missing_directory_yields_empty_index() {
        let index = index_directory(Path::new("/nonexistent/portalref"), &ignore(), "navigation.html");
        assert!(index.is_empty());
    }

    #[test]
    fn manifest_pairs_are_taken_verbatim() {
        let body = br#"[{"name": "OverlayPanel", "location": "api_frontend/-overlay-panel/index.html"}]"#;
        let index = parse_manifest("https://e.test/m.json", body).unwrap();
        assert_eq!(index.get("OverlayPanel"), Some("api_frontend/-overlay-panel/index.html"));
    }

    #[test]
    fn empty_manifest_is_a_connectivity_error() {
        let err = parse_manifest("https://e.test/m.json", b"[]").unwrap_err();
        assert!(matches!(err, Error::Connectivity { .. }));
    }

    #[test]
    fn empty_manifest_over_http_is_a_connectivity_error() {
        let base = crate::http::tests::serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2\r\nConnection: close\r\n\r\n[]",
        );
        let client = crate::http::build_client(5).unwrap();

        let err = fetch_manifest(&client, &format!("{base}/scripts/navigation-pane.json")).unwrap_err();
        assert!(matches!(err, Error::Connectivity { ref reason, .. } if reason == "manifest is empty"));
    }

    #[test]
    fn missing_archive_fails_without_retry() {
        let base = crate::http::tests::serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        let client = crate::http::build_client(5).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("platform_1.0.0");

        let err = download_archive(&client, &format!("{base}/api-reference-docs-1.0.0.tar.gz"), None, &target)
            .unwrap_err();

        assert!(matches!(err, Error::Connectivity { ref reason, .. } if reason == "status 404"));
        assert!(!target.join(ARCHIVE_FILE).exists());
    }

    #[test]
    fn extracted_archive_is_indexable() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join(ARCHIVE_FILE);
        {
            let file = File::create(&archive_path).unwrap();
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);
            let page = b"<html></html>";
            let mut header = tar::Header::new_gnu();
            header.set_size(page.len().try_into().unwrap());
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, "comms_api/com.tomtom.comms/-client/index.html", &page[..])
                .unwrap();
            let mut encoder = builder.into_inner().unwrap();
            encoder.flush().unwrap();
            encoder.finish().unwrap();
        }

        let target = dir.path().join("comms_1.0.0");
        std::fs::create_dir_all(&target).unwrap();
        extract_archive(&archive_path, &target).unwrap();
        let index = index_directory(&target, &ignore(), "navigation.html");

        assert_eq!(index.get("Client"), Some("comms_api/com.tomtom.comms/-client/index.html"));
        assert_eq!(index.get("comms_api"), Some("comms_api/index.html"));
    }
}
