//! Engine configuration, built once at startup and handed to the
//! orchestrator by reference.

use tracing_subscriber::EnvFilter;

/// Default base URL of the local Ollama server.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:11434";
/// Default model tag used when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "llama3:8b";
/// Default per-call timeout. Generous because a full market analysis
/// on modest hardware can take minutes.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Immutable engine settings. One value is shared by reference across
/// every run the orchestrator serves.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Model tag handed to the backend adapter.
    pub model: String,
    /// Base URL of the generative backend.
    pub backend_url: String,
    /// Per-call timeout enforced by the backend client.
    pub timeout_secs: u64,
    /// Whether scope resolution may fall back to a generative estimate
    /// when the store has no record of the identifier.
    pub scope_fallback: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            scope_fallback: true,
        }
    }
}

/// Install the process-wide tracing subscriber, filtered by
/// `RUST_LOG`. Called once from a binary entry point; the library
/// itself never installs one.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
