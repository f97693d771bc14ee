use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Error;
use crate::types::{IndexSource, ReferenceSet};

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE: &str = ".portalref.toml";

/// Root of the hosted API references on the portal.
const HOSTED_REFERENCE_ROOT: &str =
    "https://developer.tomtom.com/assets/downloads/tomtom-digital-cockpit";

/// Project configuration loaded from `.portalref.toml`.
/// Every field has a default so a partial file only overrides what it names.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Artifact store holding API reference tarballs.
    pub artifact_store: ArtifactStore,
    /// Where archive-backed reference sets are downloaded and extracted.
    pub download_dir: PathBuf,
    /// Path prefixes (relative to the corpus root) that are never scanned.
    exclude: Vec<String>,
    /// File extensions, without the dot, of files that belong to the corpus.
    pub extensions: Vec<String>,
    /// Path prefixes to scan; empty means everything.
    include: Vec<String>,
    /// Record line numbers for link findings.
    pub line_numbers: bool,
    /// Patterns that classify external links.
    pub links: LinkPatterns,
    /// Dokka navigation page, never indexed.
    pub navigation_file: String,
    /// Prefix shared by every placeholder token.
    pub placeholder_prefix: String,
    /// The developer portal itself.
    pub portal: Portal,
    /// Reference sets in resolution order.
    pub reference_sets: Vec<ReferenceSetConfig>,
    /// Timeout applied to every HTTP request.
    pub request_timeout_secs: u64,
}

/// Location and credentials of the artifact store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactStore {
    /// Expanded into `{artifact_store}` in source URLs.
    pub base_url: Option<String>,
    /// Environment variable holding the access token.
    pub token_env: String,
    /// Environment variable holding the user name.
    pub user_env: String,
}

/// Full-match patterns for the special classes of external links.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkPatterns {
    /// API references hosted by the portal; checked in export mode only.
    pub reference_hosted: String,
    /// Release tree of the examples repository; broken links only warn.
    pub release_tree: String,
    /// Access-controlled artifact store; never checked.
    pub restricted: String,
}

/// The published developer portal.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Portal {
    /// Origin that internal links are resolved against.
    pub base_url: String,
    /// Leading path of internal links, including the leading `/`.
    pub internal_prefix: String,
}

/// Command-line values that complete URL templates.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Replaces `artifact_store.base_url`.
    pub artifact_store: Option<String>,
    /// Reference set name to version, replacing configured versions.
    pub versions: HashMap<String, String>,
}

/// One `[[reference_sets]]` entry as written, templates unexpanded.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceSetConfig {
    /// Template for the hosted reference root.
    pub base_url: String,
    /// Directory names skipped while indexing.
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,
    /// Short unique name.
    pub name: String,
    /// Where the index comes from.
    pub source: SourceConfig,
    /// Placeholder token.
    pub token: String,
    /// Version expanded into `{version}`.
    #[serde(default)]
    pub version: Option<String>,
}

/// Index origin as written in the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    /// Tarball download URL template.
    Archive {
        /// URL template.
        url: String,
    },
    /// Local export directory template.
    Directory {
        /// Path template.
        path: String,
    },
    /// JSON manifest URL template.
    Manifest {
        /// URL template.
        url: String,
    },
}

impl Default for ArtifactStore {
    fn default() -> Self {
        return Self {
            base_url: None,
            token_env: "ARTIFACTORY_TOKEN".to_string(),
            user_env: "ARTIFACTORY_USER".to_string(),
        };
    }
}

impl Default for Config {
    fn default() -> Self {
        return Self {
            artifact_store: ArtifactStore::default(),
            download_dir: PathBuf::from("build/downloads"),
            exclude: Vec::new(),
            extensions: vec!["md".to_string(), "mdx".to_string()],
            include: Vec::new(),
            line_numbers: true,
            links: LinkPatterns::default(),
            navigation_file: "navigation.html".to_string(),
            placeholder_prefix: "TTIVI_".to_string(),
            portal: Portal::default(),
            reference_sets: default_reference_sets(),
            request_timeout_secs: 60,
        };
    }
}

impl Default for LinkPatterns {
    fn default() -> Self {
        return Self {
            reference_hosted: r"https://developer\.tomtom\.com/assets/.*".to_string(),
            release_tree: r"\w+://github\.com/tomtom-international/tomtom-digital-cockpit-sdk-examples/.*"
                .to_string(),
            restricted: r"\w+://repo\.tomtom\.com/.*".to_string(),
        };
    }
}

impl Default for Portal {
    fn default() -> Self {
        return Self {
            base_url: "https://developer.tomtom.com".to_string(),
            internal_prefix: "/tomtom-digital-cockpit/".to_string(),
        };
    }
}

impl ArtifactStore {
    /// Basic-auth credentials, when both environment variables are set.
    pub fn credentials(&self) -> Option<(String, String)> {
        let user = std::env::var(&self.user_env).ok()?;
        let token = std::env::var(&self.token_env).ok()?;
        return Some((user, token));
    }
}

impl Config {
    /// Whether `path` has one of the corpus extensions.
    pub fn has_corpus_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| return e.to_str()) else {
            return false;
        };
        return self.extensions.iter().any(|allowed| return allowed == ext);
    }

    /// Load config from `explicit`, or from `.portalref.toml` in the working directory.
    /// A missing default file yields the built-in defaults; a missing explicit file is an
    /// error. A file that exists but is malformed is always an error.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigNotFound` for a missing explicit file, `Error::Io` if reading
    /// fails, or `Error::TomlDe` if the TOML is malformed.
    pub fn load(explicit: Option<&Path>) -> Result<Self, Error> {
        let path = explicit.map_or_else(|| return PathBuf::from(CONFIG_FILE), Path::to_path_buf);
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if explicit.is_some() {
                    return Err(Error::ConfigNotFound { path });
                }
                return Ok(Self::default());
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Self::parse(&content);
    }

    /// Parse config from TOML content.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed or has unknown keys.
    pub fn parse(content: &str) -> Result<Self, Error> {
        return Ok(toml::from_str(content)?);
    }

    /// Expand every configured reference set.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingSetting` if a template needs a version or artifact store
    /// that was not supplied.
    pub fn reference_sets(&self, overrides: &Overrides) -> Result<Vec<ReferenceSet>, Error> {
        return self
            .reference_sets
            .iter()
            .map(|raw| return self.expand_reference_set(raw, overrides))
            .collect();
    }

    /// Expand the reference set called `name`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownReferenceSet` if no set has that name, or
    /// `Error::MissingSetting` if its templates cannot be expanded.
    pub fn reference_set(&self, name: &str, overrides: &Overrides) -> Result<ReferenceSet, Error> {
        let Some(raw) = self.reference_sets.iter().find(|s| return s.name == name) else {
            return Err(Error::UnknownReferenceSet { name: name.to_string() });
        };
        return self.expand_reference_set(raw, overrides);
    }

    /// Check whether a corpus file should be scanned.
    ///
    /// A path is included if no include patterns are set, or if it starts with at
    /// least one include pattern. An included path is then excluded if it starts with
    /// any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }

    /// The closed set of recognized placeholder tokens.
    pub fn tokens(&self) -> Vec<&str> {
        return self.reference_sets.iter().map(|s| return s.token.as_str()).collect();
    }

    /// Fill `{version}`, `{artifact_store}` and `{base_url}` into one set's templates.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingSetting` for a placeholder without a value.
    fn expand_reference_set(
        &self,
        raw: &ReferenceSetConfig,
        overrides: &Overrides,
    ) -> Result<ReferenceSet, Error> {
        let version = overrides.versions.get(&raw.name).cloned().or_else(|| return raw.version.clone());
        let store = overrides
            .artifact_store
            .clone()
            .or_else(|| return self.artifact_store.base_url.clone());
        let store = store.map(|s| return s.trim_end_matches('/').to_string());

        let mut vars = vec![("version", version.as_deref()), ("artifact_store", store.as_deref())];
        let base_url = expand_template(&raw.base_url, &raw.name, &vars)?;
        vars.push(("base_url", Some(base_url.trim_end_matches('/'))));

        let source = match &raw.source {
            SourceConfig::Archive { url } => IndexSource::Archive {
                url: expand_template(url, &raw.name, &vars)?,
            },
            SourceConfig::Directory { path } => IndexSource::Directory {
                path: PathBuf::from(expand_template(path, &raw.name, &vars)?),
            },
            SourceConfig::Manifest { url } => IndexSource::Manifest {
                url: expand_template(url, &raw.name, &vars)?,
            },
        };

        return Ok(ReferenceSet {
            base_url,
            ignore: raw.ignore.clone(),
            name: raw.name.clone(),
            source,
            token: raw.token.clone(),
            version,
        });
    }
}

/// Directories that Dokka exports alongside the content pages.
fn default_ignore() -> Vec<String> {
    return ["scripts", "images", "styles", "package-list"]
        .iter()
        .map(|s| return (*s).to_string())
        .collect();
}

/// The four reference sets published with every platform release.
fn default_reference_sets() -> Vec<ReferenceSetConfig> {
    let archive = |path: &str| {
        return SourceConfig::Archive {
            url: format!("{{artifact_store}}/{path}/{{version}}/api-reference-docs-{{version}}.tar.gz"),
        };
    };
    let set = |name: &str, token: &str, hosted: &str, source: SourceConfig| {
        return ReferenceSetConfig {
            base_url: format!("{HOSTED_REFERENCE_ROOT}/{hosted}/{{version}}"),
            ignore: default_ignore(),
            name: name.to_string(),
            source,
            token: token.to_string(),
            version: None,
        };
    };

    return vec![
        set(
            "platform",
            "TTIVI_PLATFORM_API",
            "platform-api",
            archive("ivi-maven/com/tomtom/ivi/api-reference-docs"),
        ),
        set(
            "gradleplugins",
            "TTIVI_GRADLEPLUGINS_API",
            "gradleplugins-api",
            archive("ivi-maven/com/tomtom/ivi/platform/gradle/api-reference-docs"),
        ),
        set(
            "comms",
            "TTIVI_COMMS_API",
            "comms-sdk-api",
            archive("ivi-maven/com/tomtom/ivi/sdk/communications/api-reference-docs"),
        ),
        set(
            "android-tools",
            "TTIVI_ANDROID_TOOLS_API",
            "tomtom-android-tools-api",
            archive("nav-maven-release/com/tomtom/tools/android/api-reference-docs"),
        ),
    ];
}

/// Replace each `{name}` in `template` by its value.
///
/// # Errors
///
/// Returns `Error::MissingSetting` when the template uses a name whose value is `None`.
fn expand_template(
    template: &str,
    reference_set: &str,
    vars: &[(&str, Option<&str>)],
) -> Result<String, Error> {
    let mut out = template.to_string();
    for (name, value) in vars {
        let placeholder = format!("{{{name}}}");
        if !out.contains(&placeholder) {
            continue;
        }
        let Some(value) = value else {
            return Err(Error::MissingSetting {
                reference_set: reference_set.to_string(),
                setting: (*name).to_string(),
            });
        };
        out = out.replace(&placeholder, value);
    }
    return Ok(out);
}
