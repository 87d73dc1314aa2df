//! Seam between the pipeline and whatever produces generative text.
//!
//! Stage runners and the scope fallback only ever see this trait; the
//! concrete Ollama adapter (and the scripted mock in tests) plug in
//! behind it. The backend is stateless from the caller's point of view:
//! every call carries its full instruction and prompt.

pub mod mock;
pub mod ollama;

pub use mock::MockBackend;
pub use ollama::OllamaBackend;

use thiserror::Error;

/// Transport-level failure of one generative call.
///
/// `Timeout` is split out from the other transport failures so callers
/// can report a stage that ran out of time differently from one whose
/// backend was unreachable.
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    #[error("cannot reach generative backend at {0}")]
    Connect(String),
    #[error("generative call exceeded {0}s")]
    Timeout(u64),
    #[error("generative backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("generative transport failure: {0}")]
    Transport(String),
}

/// Raw text produced by one generative call, before any extraction.
#[derive(Debug, Clone)]
pub struct GenerativeReply {
    pub text: String,
}

/// A synchronous generative text producer.
///
/// `schema_hint` names the schema the caller will validate the reply
/// against; adapters that support a strict-JSON output mode switch it on
/// when a hint is present. The hint never replaces the skeleton embedded
/// in the prompt itself.
pub trait GenerativeBackend: Send + Sync {
    fn invoke(
        &self,
        system: &str,
        prompt: &str,
        schema_hint: Option<&str>,
    ) -> Result<GenerativeReply, BackendError>;
}
