//! Declarative shape table and the structural walker that checks
//! candidate JSON against it.
//!
//! Shapes are data, not code: each schema is a tree of [`Kind`] nodes
//! built once at startup. The walker collects every finding in one pass
//! instead of stopping at the first, so a single log line can show all
//! the fields a generative call got wrong.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{FieldIssue, SchemaId, ValidationFailure};

/// Structural shape of one JSON node.
#[derive(Debug, Clone)]
pub(crate) enum Kind {
    /// Any JSON string.
    Str,
    /// A string drawn from a closed label set.
    StrEnum {
        allowed: &'static [&'static str],
        describe: &'static str,
    },
    /// Any JSON number.
    Number,
    /// A number with no fractional part.
    Count,
    /// A whole number, or a string that parses as one. Reserved for
    /// fields whose upstream producers are known to quote numerals.
    CountLike,
    /// A homogeneous array.
    Array(Box<Kind>),
    /// An object with named fields; unknown fields are ignored.
    Object(Vec<Field>),
}

impl Kind {
    /// What a conforming value would look like, for issue reporting.
    fn expected(&self) -> &'static str {
        match self {
            Kind::Str => "string",
            Kind::StrEnum { describe, .. } => describe,
            Kind::Number => "number",
            Kind::Count => "whole number",
            Kind::CountLike => "whole number or numeric string",
            Kind::Array(_) => "array",
            Kind::Object(_) => "object",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Field {
    name: &'static str,
    required: bool,
    kind: Kind,
}

impl Field {
    fn required(name: &'static str, kind: Kind) -> Self {
        Self {
            name,
            required: true,
            kind,
        }
    }

    fn optional(name: &'static str, kind: Kind) -> Self {
        Self {
            name,
            required: false,
            kind,
        }
    }

    fn into_vec(self) -> Vec<Field> {
        vec![self]
    }
}

const DEMAND_LEVELS: &[&str] = &["High", "Medium", "Low"];
const DEMAND_LEVEL_DESC: &str = "one of \"High\", \"Medium\", \"Low\"";

const PRODUCT_TIERS: &[&str] = &["entry", "mid", "premium"];
const PRODUCT_TIER_DESC: &str = "one of \"entry\", \"mid\", \"premium\"";

fn demand_level() -> Kind {
    Kind::StrEnum {
        allowed: DEMAND_LEVELS,
        describe: DEMAND_LEVEL_DESC,
    }
}

/// Scope dataset shape. Item fields are individually optional here:
/// partial items are discarded by the resolver's lenient parse rather
/// than failing the whole dataset.
fn scope_dataset_fields() -> Vec<Field> {
    Field::required(
        "items",
        Kind::Array(Box::new(Kind::Object(vec![
            Field::optional("code", Kind::Str),
            Field::optional("title", Kind::Str),
            Field::optional("anzsco_code", Kind::Str),
        ]))),
    )
    .into_vec()
}

fn market_analysis_fields() -> Vec<Field> {
    vec![
        Field::required(
            "executive_summary",
            Kind::Object(vec![
                Field::required("total_revenue_opportunity", Kind::Str),
                Field::required("top_performing_sector", Kind::Str),
                Field::required("headline_insight", Kind::Str),
            ]),
        ),
        Field::required(
            "sector_breakdown",
            Kind::Array(Box::new(Kind::Object(vec![
                Field::required("sector_name", Kind::Str),
                Field::required("course_count", Kind::Count),
                Field::required(
                    "market_health",
                    Kind::Object(vec![
                        Field::required("demand_level", demand_level()),
                        Field::required("badges_issued", Kind::CountLike),
                        Field::required("competition", Kind::Str),
                        Field::required("outlook", Kind::Str),
                    ]),
                ),
                Field::required(
                    "financial_opportunity",
                    Kind::Object(vec![
                        Field::required("workforce_size", Kind::Count),
                        Field::required("annual_learner_estimate", Kind::Count),
                        Field::required("price_point", Kind::Number),
                        Field::required("revenue_potential", Kind::Number),
                    ]),
                ),
                Field::required("recommended_actions", Kind::Array(Box::new(Kind::Str))),
                Field::required("suggested_courses", Kind::Array(Box::new(Kind::Str))),
            ]))),
        ),
        Field::required(
            "occupation_demand",
            Kind::Array(Box::new(Kind::Object(vec![
                Field::required("occupation", Kind::Str),
                Field::required("demand_level", demand_level()),
                Field::required("market_size", Kind::Str),
                Field::required("growth_rate", Kind::Str),
            ]))),
        ),
    ]
}

fn skills_demand_fields() -> Vec<Field> {
    Field::required(
        "in_demand_skills",
        Kind::Array(Box::new(Kind::Object(vec![
            Field::required("skill", Kind::Str),
            Field::required("demand", demand_level()),
        ]))),
    )
    .into_vec()
}

fn product_strategy_fields() -> Vec<Field> {
    vec![
        Field::required("strategic_theme", Kind::Str),
        Field::required("justification", Kind::Str),
        Field::required(
            "revenue_summary",
            Kind::Object(vec![
                Field::required("annual_revenue_estimate", Kind::Str),
                Field::required("primary_driver", Kind::Str),
            ]),
        ),
        Field::required(
            "products",
            Kind::Array(Box::new(Kind::Object(vec![
                Field::required(
                    "tier",
                    Kind::StrEnum {
                        allowed: PRODUCT_TIERS,
                        describe: PRODUCT_TIER_DESC,
                    },
                ),
                Field::required("title", Kind::Str),
                Field::required("duration", Kind::Str),
                Field::required("price", Kind::Number),
                Field::required("target_audience", Kind::Str),
                Field::required(
                    "content",
                    Kind::Object(vec![
                        Field::required("modules", Kind::Array(Box::new(Kind::Str))),
                        Field::required("delivery_mode", Kind::Str),
                    ]),
                ),
                Field::required(
                    "marketing",
                    Kind::Object(vec![
                        Field::required("hook", Kind::Str),
                        Field::required("channels", Kind::Array(Box::new(Kind::Str))),
                    ]),
                ),
            ]))),
        ),
        Field::required(
            "bundle",
            Kind::Object(vec![
                Field::required("name", Kind::Str),
                Field::required("included_products", Kind::Array(Box::new(Kind::Str))),
                Field::required("total_value", Kind::Number),
                Field::required("discount_percent", Kind::Number),
                Field::required("bundle_price", Kind::Number),
            ]),
        ),
    ]
}

/// The merged report carries every stage's fields side by side under a
/// single `rto_id`, so its shape is the concatenation of the stage
/// shapes.
fn audit_report_fields() -> Vec<Field> {
    let mut fields = vec![Field::required("rto_id", Kind::Str)];
    fields.extend(market_analysis_fields());
    fields.extend(skills_demand_fields());
    fields.extend(product_strategy_fields());
    fields
}

/// Holds every schema the pipeline validates against. Built once and
/// shared by reference; validation itself takes no locks and mutates
/// nothing.
#[derive(Debug)]
pub struct SchemaRegistry {
    scope_dataset: Kind,
    market_analysis: Kind,
    skills_demand: Kind,
    product_strategy: Kind,
    audit_report: Kind,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            scope_dataset: Kind::Object(scope_dataset_fields()),
            market_analysis: Kind::Object(market_analysis_fields()),
            skills_demand: Kind::Object(skills_demand_fields()),
            product_strategy: Kind::Object(product_strategy_fields()),
            audit_report: Kind::Object(audit_report_fields()),
        }
    }

    fn shape(&self, id: SchemaId) -> &Kind {
        match id {
            SchemaId::ScopeDataset => &self.scope_dataset,
            SchemaId::MarketAnalysis => &self.market_analysis,
            SchemaId::SkillsDemand => &self.skills_demand,
            SchemaId::ProductStrategy => &self.product_strategy,
            SchemaId::AuditReport => &self.audit_report,
        }
    }

    /// Structural check only. On failure the error lists every
    /// non-conforming field, not just the first.
    pub fn validate(&self, id: SchemaId, candidate: &Value) -> Result<(), ValidationFailure> {
        let mut issues = Vec::new();
        check_value(self.shape(id), candidate, "$", &mut issues);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationFailure { schema: id, issues })
        }
    }

    /// Structural check, then conversion into the typed representation.
    ///
    /// The conversion step cannot fail for candidates that pass the
    /// structural check and use the documented coercions; if it ever
    /// does, the error is reported against the root rather than
    /// panicking.
    pub fn validate_as<T: DeserializeOwned>(
        &self,
        id: SchemaId,
        candidate: &Value,
    ) -> Result<T, ValidationFailure> {
        self.validate(id, candidate)?;
        serde_json::from_value(candidate.clone()).map_err(|err| ValidationFailure {
            schema: id,
            issues: vec![FieldIssue::new(
                "$",
                format!("value convertible to the {id} type ({err})"),
            )],
        })
    }
}

fn check_value(kind: &Kind, value: &Value, path: &str, issues: &mut Vec<FieldIssue>) {
    let conforms = match kind {
        Kind::Str => value.is_string(),
        Kind::StrEnum { allowed, .. } => {
            matches!(value.as_str(), Some(label) if allowed.contains(&label))
        }
        Kind::Number => value.is_number(),
        Kind::Count => number_is_count(value),
        Kind::CountLike => {
            number_is_count(value)
                || matches!(value.as_str(), Some(s) if super::coerce::parse_count(s).is_some())
        }
        Kind::Array(element) => {
            match value.as_array() {
                Some(elements) => {
                    for (index, element_value) in elements.iter().enumerate() {
                        let element_path = format!("{path}[{index}]");
                        check_value(element, element_value, &element_path, issues);
                    }
                    return;
                }
                None => false,
            }
        }
        Kind::Object(fields) => {
            match value.as_object() {
                Some(map) => {
                    for field in fields {
                        let field_path = join(path, field.name);
                        match map.get(field.name) {
                            // Explicit null on an optional field reads
                            // as absent.
                            Some(field_value) if field_value.is_null() && !field.required => {}
                            Some(field_value) => {
                                check_value(&field.kind, field_value, &field_path, issues);
                            }
                            None if field.required => {
                                issues.push(FieldIssue::new(&field_path, field.kind.expected()));
                            }
                            None => {}
                        }
                    }
                    return;
                }
                None => false,
            }
        }
    };
    if !conforms {
        issues.push(FieldIssue::new(path, kind.expected()));
    }
}

fn number_is_count(value: &Value) -> bool {
    match value {
        Value::Number(n) => super::coerce::number_to_count(n).is_some(),
        _ => false,
    }
}

fn join(path: &str, name: &str) -> String {
    if path == "$" {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}
