//! The three generation stages.
//!
//! Every runner walks the same path: render a prompt, invoke the
//! backend, recover JSON from the reply, validate it against the
//! stage's schema, return the typed output. Any failure along that path
//! is terminal for the stage; nothing is retried or defaulted here.

pub mod market;
pub mod products;
pub mod prompt;
pub mod skills;
pub mod types;

pub use market::run_market_analysis;
pub use products::run_product_strategy;
pub use skills::run_skills_demand;
pub use types::{ProductStageInput, StageContext};

use std::fmt;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::backend::{BackendError, GenerativeBackend};
use crate::extract::extract_json;
use crate::schema::{SchemaId, SchemaRegistry};

/// The stage at which a generation failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageId {
    Stage1,
    Stage2,
    Stage3,
}

impl StageId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Stage1 => "stage1",
            StageId::Stage2 => "stage2",
            StageId::Stage3 => "stage3",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which step of the shared stage path failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The backend call itself failed.
    Transport,
    /// The reply carried no recoverable JSON.
    Extraction,
    /// The recovered value did not conform to the stage schema.
    Validation,
    /// The backend ran out of time.
    Timeout,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Transport => "transport",
            FailureReason::Extraction => "extraction",
            FailureReason::Validation => "validation",
            FailureReason::Timeout => "timeout",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stage's call could not be turned into valid structured data.
///
/// `raw_text` carries the model's reply for extraction and validation
/// failures so callers can log a precise diagnosis; it stays out of the
/// display string, which is meant for one log line.
#[derive(Error, Debug)]
#[error("{stage} failed ({reason}): {detail}")]
pub struct GenerationFailure {
    pub stage: StageId,
    pub reason: FailureReason,
    pub detail: String,
    pub raw_text: Option<String>,
}

/// A validated stage output together with the reply it came from, so
/// per-stage checks that run after schema validation can still attach
/// the raw text to their failures.
#[derive(Debug)]
pub(crate) struct Generated<T> {
    pub value: T,
    pub raw: String,
}

/// The shared middle of every stage: invoke, extract, validate, type.
pub(crate) fn run_generation<T: DeserializeOwned>(
    backend: &dyn GenerativeBackend,
    registry: &SchemaRegistry,
    stage: StageId,
    schema: SchemaId,
    system: &str,
    prompt: &str,
) -> Result<Generated<T>, GenerationFailure> {
    let reply = backend
        .invoke(system, prompt, Some(schema.as_str()))
        .map_err(|error| GenerationFailure {
            stage,
            reason: match error {
                BackendError::Timeout(_) => FailureReason::Timeout,
                _ => FailureReason::Transport,
            },
            detail: error.to_string(),
            raw_text: None,
        })?;
    debug!(%stage, bytes = reply.text.len(), "generative reply received");

    let value = extract_json(&reply.text).map_err(|error| GenerationFailure {
        stage,
        reason: FailureReason::Extraction,
        detail: error.to_string(),
        raw_text: Some(error.raw),
    })?;

    let typed = registry
        .validate_as::<T>(schema, &value)
        .map_err(|error| GenerationFailure {
            stage,
            reason: FailureReason::Validation,
            detail: error.to_string(),
            raw_text: Some(reply.text.clone()),
        })?;
    debug!(%stage, schema = %schema, "stage output validated");

    Ok(Generated {
        value: typed,
        raw: reply.text,
    })
}

#[cfg(test)]
mod tests {
    use crate::backend::MockBackend;
    use crate::stages::types::Stage2Output;

    use super::*;

    fn run_skills_schema(backend: &MockBackend) -> Result<Generated<Stage2Output>, GenerationFailure> {
        let registry = SchemaRegistry::new();
        run_generation::<Stage2Output>(
            backend,
            &registry,
            StageId::Stage2,
            SchemaId::SkillsDemand,
            "system",
            "prompt",
        )
    }

    #[test]
    fn prose_wrapped_reply_is_recovered_and_typed() {
        let backend = MockBackend::new().reply(
            r#"Certainly! {"in_demand_skills": [{"skill": "Wall and floor tiling", "demand": "High"}]}"#,
        );
        let generated = run_skills_schema(&backend).unwrap();
        assert_eq!(generated.value.in_demand_skills.len(), 1);
        assert!(generated.raw.starts_with("Certainly!"));
    }

    #[test]
    fn timeout_is_distinguished_from_other_transport_failures() {
        let backend = MockBackend::new().failure(BackendError::Timeout(120));
        let failure = run_skills_schema(&backend).unwrap_err();
        assert_eq!(failure.reason, FailureReason::Timeout);
        assert!(failure.raw_text.is_none());

        let backend = MockBackend::new().failure(BackendError::Http {
            status: 503,
            body: "loading".into(),
        });
        let failure = run_skills_schema(&backend).unwrap_err();
        assert_eq!(failure.reason, FailureReason::Transport);
    }

    #[test]
    fn refusal_text_fails_extraction_with_raw_attached() {
        let backend = MockBackend::new().reply("Sorry, I cannot help with that.");
        let failure = run_skills_schema(&backend).unwrap_err();
        assert_eq!(failure.stage, StageId::Stage2);
        assert_eq!(failure.reason, FailureReason::Extraction);
        assert_eq!(failure.raw_text.as_deref(), Some("Sorry, I cannot help with that."));
        assert_eq!(failure.to_string().split(':').next(), Some("stage2 failed (extraction)"));
    }

    #[test]
    fn malformed_shape_fails_validation_with_raw_attached() {
        let backend = MockBackend::new().reply(r#"{"in_demand_skills": "tiling"}"#);
        let failure = run_skills_schema(&backend).unwrap_err();
        assert_eq!(failure.reason, FailureReason::Validation);
        assert!(failure.detail.contains("in_demand_skills"));
        assert!(failure.raw_text.is_some());
    }

    #[test]
    fn stage_and_reason_render_in_wire_spelling() {
        assert_eq!(StageId::Stage2.to_string(), "stage2");
        assert_eq!(FailureReason::Extraction.to_string(), "extraction");
    }
}
