mod commands;
mod config;
mod corpus;
mod diagnostics;
mod error;
mod http;
mod indexer;
mod links;
mod logging;
mod placeholder;
mod probe;
mod resolver;
mod types;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use crate::config::{Config, Overrides};

#[derive(Parser)]
#[command(
    name = "portalref",
    about = "Generate API reference links and validate URLs in developer portal markdown",
    version
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command.
#[derive(Args)]
struct GlobalArgs {
    /// Artifact store URL expanded into `{artifact_store}`
    #[arg(long, global = true, value_name = "URL")]
    artifact_store: Option<String>,

    /// Config file (default: .portalref.toml in the working directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Version for a reference set, e.g. `platform=1.0.4732`
    #[arg(long = "ref-version", global = true, value_name = "NAME=VER", value_parser = parse_version_override)]
    ref_versions: Vec<(String, String)>,
}

#[derive(Subcommand)]
enum Commands {
    /// Report placeholder-shaped link targets that are not a configured token
    CheckPlaceholders {
        /// Documentation root
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    /// Probe every external and internal link
    CheckUrls {
        /// Documentation root
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Also probe links into the hosted API references
        #[arg(long)]
        export: bool,
    },
    /// Build one reference set's index and print it
    Index {
        /// Reference set name, e.g. `platform`
        set: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace API placeholders with reference URLs, in place
    Resolve {
        /// Documentation root
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    /// Stage, check, resolve, and validate in one pass
    Run {
        /// Documentation root (recreated from --source when given)
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Also probe links into the hosted API references
        #[arg(long)]
        export: bool,
        /// Copy this tree into DIR first, replacing DIR
        #[arg(long, value_name = "SRC")]
        source: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    let result = Config::load(cli.global.config.as_deref()).and_then(|config| {
        let overrides = Overrides {
            artifact_store: cli.global.artifact_store,
            versions: cli.global.ref_versions.into_iter().collect(),
        };
        return dispatch(cli.command, &config, &overrides);
    });

    return match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            diagnostics::print_error(&e);
            if e.is_content_problem() {
                ExitCode::from(1)
            } else {
                ExitCode::from(2)
            }
        },
    };
}

/// Run the selected command.
///
/// # Errors
///
/// Returns whatever the command fails with.
fn dispatch(command: Commands, config: &Config, overrides: &Overrides) -> Result<(), error::Error> {
    return match command {
        Commands::CheckPlaceholders { dir } => commands::check_placeholders(&dir, config),
        Commands::CheckUrls { dir, export } => commands::check_urls(&dir, export, config),
        Commands::Index { set, json } => commands::index(&set, json, config, overrides),
        Commands::Resolve { dir } => commands::resolve(&dir, config, overrides),
        Commands::Run { dir, export, source } => {
            commands::run(&dir, export, source.as_deref(), config, overrides)
        },
    };
}

/// Parse `NAME=VERSION`.
///
/// # Errors
///
/// Returns a message when the `=` or either side is missing.
fn parse_version_override(raw: &str) -> Result<(String, String), String> {
    let Some((name, version)) = raw.split_once('=') else {
        return Err(format!("expected NAME=VERSION, got `{raw}`"));
    };
    if name.is_empty() || version.is_empty() {
        return Err(format!("expected NAME=VERSION, got `{raw}`"));
    }
    return Ok((name.to_string(), version.to_string()));
}
