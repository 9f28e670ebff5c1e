//! CLI surface: clap types, routing, and presentation.
//!
//! The run path writes exactly one artifact to stdout and propagates the
//! child's exit code; everything else (child stderr, diagnostics, logs)
//! goes to stderr.

use crate::backend::DEFAULT_REQUEST_TIMEOUT;
use crate::error::ExecError;
use crate::exec;
use crate::profile::EnvDefaults;
use crate::resolve::{ResolutionRequest, Resolver};
use crate::store::ProfileStore;
use crate::transform::TransformFactory;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::time::Duration;
use tracing::{debug, warn};

/// Exit code used when the child command could not be spawned.
const EXIT_SPAWN_FAILURE: i32 = 127;

/// Exit code for pith's own failures (fatal resolution errors, bad usage).
const EXIT_INTERNAL_FAILURE: i32 = 1;

/// Pith CLI - run a command and distill its captured output
#[derive(Parser)]
#[command(name = "pith")]
#[command(version)]
#[command(about = "Runs a command and distills its captured output through a transformation profile")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging to stderr (default: off)
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a command and emit its transformed output
    Run {
        /// Transformation profile name (defaults to the `default` profile)
        #[arg(long)]
        profile: Option<String>,

        /// Backend request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// The command to execute and its arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// List the loaded profiles
    Profiles {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

/// Execute the parsed CLI and return the process exit code.
pub async fn execute(cli: &Cli) -> i32 {
    match &cli.command {
        Commands::Run {
            profile,
            timeout,
            command,
        } => run(profile.as_deref(), *timeout, command).await,
        Commands::Profiles { format } => profiles(format),
    }
}

async fn run(profile: Option<&str>, timeout: Option<u64>, command: &[String]) -> i32 {
    let timeout = timeout.map(Duration::from_secs).unwrap_or(DEFAULT_REQUEST_TIMEOUT);
    let resolver = Resolver::new(
        ProfileStore::load_default(),
        TransformFactory::with_timeout(timeout),
        EnvDefaults,
    );
    let request = ResolutionRequest {
        profile_name: profile.map(str::to_string),
    };

    let resolution = match resolver.resolve(&request).await {
        Ok(resolution) => resolution,
        Err(e) => {
            // Programmer-tier failure: a missing implementation mapping is
            // never papered over with pass-through output.
            eprintln!("pith: {}", e);
            return EXIT_INTERNAL_FAILURE;
        }
    };
    debug!(source = ?resolution.source, kind = %resolution.transformer.kind(), "transformer resolved");

    let processed = match exec::process_command(command, resolution.transformer.as_ref()).await {
        Ok(processed) => processed,
        Err(e @ ExecError::Spawn { .. }) => {
            eprintln!("pith: {}", e);
            return EXIT_SPAWN_FAILURE;
        }
        Err(e) => {
            eprintln!("pith: {}", e);
            return EXIT_INTERNAL_FAILURE;
        }
    };

    // Child stderr passes through for presentation, ahead of the artifact.
    eprint!("{}", processed.stderr);
    if let Some(e) = &processed.transform_error {
        warn!(error = %e, "output transformation failed; emitting original output");
        eprintln!("pith: output transformation failed: {}", e);
    }
    print!("{}", processed.output);
    let _ = std::io::stdout().flush();

    processed.exit_code
}

fn profiles(format: &str) -> i32 {
    let store = ProfileStore::load_default();
    match format {
        "json" => {
            let entries: Vec<serde_json::Value> = store
                .iter()
                .map(|profile| {
                    serde_json::json!({
                        "name": profile.name,
                        "kind": profile.kind_name(),
                        "schemaVersion": profile.schema_version,
                    })
                })
                .collect();
            println!("{:#}", serde_json::Value::Array(entries));
            0
        }
        "text" => {
            if store.is_empty() {
                println!("No profiles loaded.");
                return 0;
            }
            for profile in store.iter() {
                println!("{}  ({})", profile.name, profile.kind_name());
            }
            0
        }
        other => {
            eprintln!("pith: unknown format '{}' (expected text or json)", other);
            EXIT_INTERNAL_FAILURE
        }
    }
}
