//! Typed contracts for pipeline inputs and outputs.
//!
//! The registry performs *structural* validation only: required fields
//! present with the right primitive/container shape, unknown fields
//! ignored (the producer is a generative model whose output drifts), and
//! documented fields coerced from numeric-looking strings. Semantic
//! validation of the model's claims is explicitly not done here.

pub mod coerce;
pub mod registry;

pub use registry::SchemaRegistry;

use std::fmt;

use thiserror::Error;

/// Identifier of one registered schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaId {
    /// Resolved scope dataset (also the generative fallback's payload).
    ScopeDataset,
    /// Stage 1: sector breakdown and market analysis.
    MarketAnalysis,
    /// Stage 2: flat in-demand skill list.
    SkillsDemand,
    /// Stage 3: tiered products and bundle.
    ProductStrategy,
    /// The merged terminal report.
    AuditReport,
}

impl SchemaId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaId::ScopeDataset => "scope_dataset",
            SchemaId::MarketAnalysis => "market_analysis",
            SchemaId::SkillsDemand => "skills_demand",
            SchemaId::ProductStrategy => "product_strategy",
            SchemaId::AuditReport => "audit_report",
        }
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field-level finding: where, and what shape was expected there.
///
/// `path` addresses the field from the value root, e.g.
/// `sector_breakdown[2].market_health.badges_issued`; `$` is the root
/// itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub path: String,
    pub expected: String,
}

impl FieldIssue {
    pub(crate) fn new(path: &str, expected: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            expected: expected.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (expected {})", self.path, self.expected)
    }
}

/// A candidate value did not conform to its schema.
///
/// Always carries the full per-field issue list, never a single opaque
/// message, so callers can log exactly which fields the generative call
/// omitted or mistyped.
#[derive(Error, Debug, Clone)]
#[error("{schema} payload failed validation: {}", summarize(.issues))]
pub struct ValidationFailure {
    pub schema: SchemaId,
    pub issues: Vec<FieldIssue>,
}

/// Compact issue list for error display; the full list stays on the value.
fn summarize(issues: &[FieldIssue]) -> String {
    const SHOWN: usize = 4;
    let mut parts: Vec<String> = issues.iter().take(SHOWN).map(|i| i.to_string()).collect();
    if issues.len() > SHOWN {
        parts.push(format!("and {} more", issues.len() - SHOWN));
    }
    parts.join("; ")
}
