use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::schema::{SchemaId, SchemaRegistry, ValidationFailure};
use crate::stages::types::{Stage1Output, Stage2Output, Stage3Output};

/// The assembled report failed final validation even though every
/// stage individually passed. Signals a cross-stage violation; no
/// report value exists when this is raised.
#[derive(Error, Debug)]
pub enum MergeValidationFailure {
    /// Two stage outputs emitted the same field; the union is no
    /// longer disjoint.
    #[error("stage outputs collide on field {field}")]
    FieldCollision { field: String },
    /// The assembled whole failed schema validation.
    #[error(transparent)]
    Schema(#[from] ValidationFailure),
    /// The summary's winning sector is absent from the merged
    /// breakdown.
    #[error("winning sector {label:?} does not appear in the sector breakdown")]
    UnlistedWinningSector { label: String },
    /// A stage output would not serialize into a JSON object.
    #[error("report assembly failed: {0}")]
    Assembly(String),
}

/// The terminal artifact of a run: the audit identifier plus every
/// stage's fields side by side. Exists only in fully-validated form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub rto_id: String,
    #[serde(flatten)]
    pub market: Stage1Output,
    #[serde(flatten)]
    pub skills: Stage2Output,
    #[serde(flatten)]
    pub strategy: Stage3Output,
}

/// Disjoint-union merge of the three stage outputs plus the
/// identifier, then one final validation over the assembled whole.
pub fn merge_report(
    registry: &SchemaRegistry,
    rto_id: &str,
    market: Stage1Output,
    skills: Stage2Output,
    strategy: Stage3Output,
) -> Result<AuditReport, MergeValidationFailure> {
    let mut merged = Map::new();
    merged.insert("rto_id".to_string(), Value::String(rto_id.to_string()));
    let merged = disjoint_union(
        merged,
        [to_map(&market)?, to_map(&skills)?, to_map(&strategy)?],
    )?;

    registry.validate(SchemaId::AuditReport, &Value::Object(merged))?;

    // Cross-stage invariant: the summary's winning sector must name an
    // entry of the breakdown it shipped with.
    if !market.top_sector_is_listed() {
        return Err(MergeValidationFailure::UnlistedWinningSector {
            label: market.executive_summary.top_performing_sector.clone(),
        });
    }

    Ok(AuditReport {
        rto_id: rto_id.to_string(),
        market,
        skills,
        strategy,
    })
}

/// Union that fails on the first colliding field instead of silently
/// overwriting. The result's key set does not depend on part order.
fn disjoint_union(
    mut merged: Map<String, Value>,
    parts: [Map<String, Value>; 3],
) -> Result<Map<String, Value>, MergeValidationFailure> {
    for part in parts {
        for (field, value) in part {
            if merged.insert(field.clone(), value).is_some() {
                return Err(MergeValidationFailure::FieldCollision { field });
            }
        }
    }
    Ok(merged)
}

fn to_map<T: Serialize>(part: &T) -> Result<Map<String, Value>, MergeValidationFailure> {
    match serde_json::to_value(part) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(MergeValidationFailure::Assembly(format!(
            "stage output serialized to {other:?} instead of an object"
        ))),
        Err(error) => Err(MergeValidationFailure::Assembly(error.to_string())),
    }
}
