//! Multi-stage audit orchestration engine for the Australian VET
//! sector: resolves an RTO or course identifier into a course
//! catalogue, drives three dependent generative stages over it, and
//! merges the validated stage outputs into one immutable
//! revenue-opportunity report.
//!
//! All external effects go through two seams: [`backend::GenerativeBackend`]
//! for model calls and [`scope::ScopeLookup`] for the system of record.
//! Everything in between is deterministic over their responses.

pub mod audit; // Orchestrator: run sequencing, state machine, merged report
pub mod backend; // Generative-model seam: Ollama adapter + scripted mock
pub mod config; // Immutable engine configuration
pub mod extract; // JSON recovery from free-form model text
pub mod schema; // Structural schemas and tolerant-reader validation
pub mod scope; // Identifier -> course catalogue resolution with fallback
pub mod stages; // The three generation stage runners

pub use audit::{AuditError, AuditOrchestrator, AuditReport, MergeValidationFailure, RunPhase};
pub use backend::{BackendError, GenerativeBackend, GenerativeReply};
pub use config::EngineConfig;
pub use extract::{extract_json, ExtractError};
pub use schema::{SchemaRegistry, ValidationFailure};
pub use scope::{
    ScopeDataset, ScopeError, ScopeItem, ScopeLookup, ScopeRequest, ScopeResolver,
    SqliteScopeLookup,
};
pub use stages::{FailureReason, GenerationFailure, StageId};
