use std::path::Path;
use std::process::{Command, Output};

use walkdir::WalkDir;

const BASE: &str = "https://developer.tomtom.com/assets/downloads/tomtom-digital-cockpit/platform-api/1.0.4732";

/// Copy a fixture into a scratch directory so commands may rewrite it.
fn fixture(name: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let source = Path::new("tests/fixtures").join(name);
    for entry in WalkDir::new(&source) {
        let entry = entry.unwrap();
        let target = dir.path().join(entry.path().strip_prefix(&source).unwrap());
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).unwrap();
        } else {
            std::fs::copy(entry.path(), &target).unwrap();
        }
    }
    dir
}

fn portalref(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_portalref"))
        .current_dir(dir)
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn unknown_token_fails_before_network() {
    let dir = fixture("bogus");
    let out = portalref(dir.path(), &["check-placeholders"]);

    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("TTIVI_BOGUS_API in docs/guide.mdx:3"), "stderr: {stderr}");
}

#[test]
fn resolve_rewrites_then_is_idempotent() {
    let dir = fixture("resolvable");
    let page = dir.path().join("docs/panels.mdx");

    let first = portalref(dir.path(), &["resolve"]);
    assert!(first.status.success(), "resolve failed: {}", String::from_utf8_lossy(&first.stderr));

    let resolved = std::fs::read_to_string(&page).unwrap();
    assert!(!resolved.contains("TTIVI_PLATFORM_API"));
    assert!(resolved.contains(&format!(
        "[`OverlayPanel`]({BASE}/frontend_api/com.tomtom.panels/-overlay-panel/index.html)"
    )));
    assert!(resolved.contains(&format!("[`com.tomtom.panels`]({BASE}/frontend_api/com.tomtom.panels/index.html)")));
    assert!(resolved.contains(&format!(
        "[`@OverlayPanel.onOpen`]({BASE}/frontend_api/com.tomtom.panels/-overlay-panel/on-open.html)"
    )));

    let second = portalref(dir.path(), &["resolve"]);
    assert!(second.status.success());
    assert_eq!(std::fs::read_to_string(&page).unwrap(), resolved);
}

#[test]
fn unresolved_label_is_reported() {
    let dir = fixture("resolvable");
    std::fs::write(dir.path().join("docs/extra.md"), "Use [Nope](TTIVI_PLATFORM_API).\n").unwrap();

    let out = portalref(dir.path(), &["resolve"]);

    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("API element 'Nope' cannot be found in the platform API Reference map in docs/extra.md:1"),
        "stderr: {stderr}"
    );
}

#[test]
fn index_lists_keys() {
    let dir = fixture("resolvable");
    let out = portalref(dir.path(), &["index", "platform"]);

    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("OverlayPanel -> frontend_api/com.tomtom.panels/-overlay-panel/index.html"));
    assert!(stdout.contains("OverlayPanel.onOpen -> frontend_api/com.tomtom.panels/-overlay-panel/on-open.html"));
    assert!(!stdout.contains("navigation"));
    assert!(!stdout.contains("scripts"));
}

#[test]
fn slashless_internal_link_fails_before_network() {
    let dir = fixture("slashless");
    let out = portalref(dir.path(), &["check-urls"]);

    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("tomtom-digital-cockpit/guide in docs/intro.md:3"), "stderr: {stderr}");
}

#[test]
fn run_stops_on_unknown_token_before_indexing() {
    let dir = fixture("bogus");
    let out = portalref(dir.path(), &["run"]);

    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("TTIVI_BOGUS_API in docs/guide.mdx:3"), "stderr: {stderr}");
    assert!(!stderr.contains("--ref-version"), "stderr: {stderr}");
}

#[test]
fn run_stops_on_slashless_link_before_indexing() {
    let dir = fixture("slashless");
    let out = portalref(dir.path(), &["run"]);

    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("tomtom-digital-cockpit/guide in docs/intro.md:3"), "stderr: {stderr}");
    assert!(!stderr.contains("--ref-version"), "stderr: {stderr}");
}

#[test]
fn missing_version_is_a_runtime_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = portalref(dir.path(), &["index", "platform"]);

    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("--ref-version platform=<VERSION>"));
}
