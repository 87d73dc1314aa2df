//! One-shot audit driver: wires the live adapters together, runs a
//! single audit, and prints the report as JSON.
//!
//! Needs a running Ollama instance; point `--backend-url` elsewhere to
//! use a different host. Log verbosity follows `RUST_LOG`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use scopeaudit::audit::AuditOrchestrator;
use scopeaudit::backend::OllamaBackend;
use scopeaudit::config::{self, EngineConfig};
use scopeaudit::schema::SchemaRegistry;
use scopeaudit::scope::{InMemoryScopeLookup, ScopeLookup, ScopeRequest, SqliteScopeLookup};

#[derive(Parser, Debug)]
#[command(
    name = "scopeaudit",
    version,
    about = "Revenue-opportunity audit for one RTO or course code"
)]
struct Cli {
    /// RTO code or nationally recognised course code to audit.
    identifier: String,
    /// Treat the identifier as an RTO code rather than a course code.
    #[arg(long)]
    rto: bool,
    /// SQLite scope cache to consult before the generative fallback.
    #[arg(long)]
    db: Option<PathBuf>,
    /// Model tag handed to the Ollama backend.
    #[arg(long, default_value = config::DEFAULT_MODEL)]
    model: String,
    /// Base URL of the Ollama backend.
    #[arg(long, default_value = config::DEFAULT_BACKEND_URL)]
    backend_url: String,
    /// Per-call timeout in seconds.
    #[arg(long, default_value_t = config::DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,
    /// Fail unknown identifiers instead of estimating a catalogue.
    #[arg(long)]
    no_fallback: bool,
}

fn main() -> ExitCode {
    config::init_tracing();
    let cli = Cli::parse();

    let engine_config = EngineConfig {
        model: cli.model,
        backend_url: cli.backend_url,
        timeout_secs: cli.timeout_secs,
        scope_fallback: !cli.no_fallback,
    };
    let backend = OllamaBackend::new(
        &engine_config.backend_url,
        &engine_config.model,
        engine_config.timeout_secs,
    );
    let lookup: Box<dyn ScopeLookup> = match &cli.db {
        Some(path) => match SqliteScopeLookup::open(path) {
            Ok(store) => Box::new(store),
            Err(error) => {
                eprintln!("cannot open scope cache {}: {error}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => Box::new(InMemoryScopeLookup::new()),
    };
    let registry = SchemaRegistry::new();
    let orchestrator = AuditOrchestrator::new(&backend, lookup.as_ref(), &registry, &engine_config);

    let request = if cli.rto {
        ScopeRequest::rto(&cli.identifier)
    } else {
        ScopeRequest::course(&cli.identifier)
    };

    match orchestrator.run_full_audit(&request) {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(error) => {
                eprintln!("report serialization failed: {error}");
                ExitCode::FAILURE
            }
        },
        Err(error) => {
            eprintln!("audit failed in {}: {error}", error.phase());
            ExitCode::FAILURE
        }
    }
}
