mod actions;
mod render;
mod session;
mod shell;

use std::io;
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use papermind_core::error::ExitCode;
use papermind_core::{AppConfig, PapermindError};

use crate::actions::block_on_action;
use crate::session::Session;

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "papermind",
    about = "Ask questions about your Zotero and local papers",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting PAPERMIND_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Show debug logs.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show errors in logs.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the Zotero user the API key belongs to.
    Whoami,

    /// List Zotero collections.
    Collections,

    /// Add a paper to Zotero by DOI and try to download its PDF.
    Add {
        doi: String,
        /// Collection name (or key) to file the item under.
        #[arg(long)]
        collection: Option<String>,
    },

    /// Attach Zotero metadata to the PDFs in the papers directory.
    Sync {
        #[arg(long)]
        collection: Option<String>,
    },

    /// Load both PDF directories and report what was indexed.
    Load,

    /// Ask a question about your papers.
    Ask {
        question: String,
        /// Only search papers in this collection (name or key).
        #[arg(long)]
        collection: Option<String>,
        /// Only search papers with this tag.
        #[arg(long)]
        tag: Option<String>,
        /// Use the metadata of the last sync instead of syncing first.
        #[arg(long)]
        no_sync: bool,
    },

    /// List tags known from the last sync.
    Tags,

    /// Show the effective configuration (API keys masked).
    Config,

    /// Interactive shell (default).
    Shell,
}

// ─── Main ────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let start = Instant::now();
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let json_output = cli.json || std::env::var("PAPERMIND_JSON").as_deref() == Ok("1");

    let config = AppConfig::load()?;

    if let Some(Commands::Config) = cli.command {
        let shown = toml::to_string_pretty(&masked(&config))?;
        if json_output {
            print_json(&serde_json::json!({
                "status": "ok",
                "data": { "path": AppConfig::config_path(), "config": masked(&config) },
                "meta": { "duration_ms": start.elapsed().as_millis() }
            }))?;
        } else {
            println!("# {}", AppConfig::config_path().display());
            print!("{shown}");
        }
        return Ok(());
    }

    if let Err(err) = config.validate() {
        let code = match &err {
            PapermindError::MissingCredential(_) => ExitCode::MissingCredentials,
            _ => ExitCode::InvalidArgs,
        };
        if json_output {
            print_json(&serde_json::json!({
                "status": "error",
                "error": "config",
                "message": err.to_string(),
                "meta": { "duration_ms": start.elapsed().as_millis() }
            }))?;
        } else {
            eprintln!("❌ {err}");
        }
        std::process::exit(code as i32);
    }
    config.ensure_directories()?;

    let mut session = Session::new(config)?;

    let status = match cli.command {
        None | Some(Commands::Shell) => {
            let stdin = io::stdin();
            shell::run_shell(&mut session, stdin.lock(), io::stdout())?;
            return Ok(());
        }

        Some(Commands::Whoami) => detect(&mut session),

        Some(Commands::Collections) => {
            step(detect(&mut session));
            collections(&mut session)
        }

        Some(Commands::Add { doi, collection }) => {
            step(detect(&mut session));
            if collection.is_some() {
                step(collections(&mut session));
            }
            block_on_action(
                "Error adding item",
                session.add_by_doi(&doi, collection.as_deref()),
            )
        }

        Some(Commands::Sync { collection }) => {
            step(detect(&mut session));
            step(collections(&mut session));
            block_on_action("Error during sync", session.sync(collection.as_deref()))
        }

        Some(Commands::Load) => load(&mut session),

        Some(Commands::Ask {
            question,
            collection,
            tag,
            no_sync,
        }) => {
            if !no_sync || collection.is_some() {
                step(detect(&mut session));
                step(collections(&mut session));
            }
            if !no_sync {
                step(block_on_action(
                    "Error during sync",
                    session.sync(collection.as_deref()),
                ));
            }
            step(load(&mut session));
            block_on_action(
                "Error answering question",
                session.ask(&question, collection.as_deref(), tag.as_deref()),
            )
        }

        Some(Commands::Tags) => session.tags(),

        // Printed before validation.
        Some(Commands::Config) => return Ok(()),
    };

    let failed = status.starts_with('❌');
    if json_output {
        print_json(&status_envelope(&status, start.elapsed().as_millis()))?;
    } else {
        println!("{status}");
    }

    if failed {
        std::process::exit(ExitCode::GeneralError as i32);
    }
    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn init_logging(verbose: bool, quiet: bool) {
    let default = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn,papermind_cli=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

/// Log the status of a prerequisite step.
fn step(status: String) {
    for line in status.lines().filter(|l| !l.trim().is_empty()) {
        info!("{line}");
    }
}

fn detect(session: &mut Session) -> String {
    block_on_action("Error connecting to Zotero", session.detect_user())
}

fn collections(session: &mut Session) -> String {
    block_on_action("Error fetching collections", session.list_collections())
}

fn load(session: &mut Session) -> String {
    block_on_action("Error loading papers", session.load_documents())
}

/// Script-facing wrapper around an action status line.
fn status_envelope(status: &str, duration_ms: u128) -> serde_json::Value {
    let failed = status.starts_with('❌');
    serde_json::json!({
        "status": if failed { "error" } else { "ok" },
        "data": { "message": status },
        "meta": { "duration_ms": duration_ms }
    })
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn masked(config: &AppConfig) -> AppConfig {
    let mask = |key: &Option<String>| key.as_ref().map(|_| "********".to_string());
    let mut shown = config.clone();
    shown.zotero.api_key = mask(&config.zotero.api_key);
    shown.llm.api_key = mask(&config.llm.api_key);
    shown
}
