use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// What one audit run is about: a provider's whole catalogue or a
/// single course. Immutable for the life of the run.
#[derive(Debug, Clone)]
pub struct ScopeRequest {
    /// RTO code or nationally recognised course code.
    pub identifier: String,
    /// True when the identifier names a training provider, false when
    /// it names one course.
    pub is_rto_audit: bool,
    /// Caller-supplied dataset. When present, resolution is bypassed
    /// and the dataset is used unchanged.
    pub preloaded: Option<ScopeDataset>,
}

impl ScopeRequest {
    pub fn rto(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            is_rto_audit: true,
            preloaded: None,
        }
    }

    pub fn course(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            is_rto_audit: false,
            preloaded: None,
        }
    }

    pub fn with_preloaded(mut self, dataset: ScopeDataset) -> Self {
        self.preloaded = Some(dataset);
        self
    }
}

/// One course on a provider's scope of registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeItem {
    /// National course code, e.g. `CPC30220`.
    pub code: String,
    /// Accredited course title.
    pub title: String,
    /// ANZSCO occupation classification, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anzsco_code: Option<String>,
}

impl ScopeItem {
    pub fn new(code: &str, title: &str) -> Self {
        Self {
            code: code.to_string(),
            title: title.to_string(),
            anzsco_code: None,
        }
    }

    pub fn with_anzsco(mut self, anzsco_code: &str) -> Self {
        self.anzsco_code = Some(anzsco_code.to_string());
        self
    }
}

/// Ordered course catalogue for one audit run. Insertion order is
/// preserved all the way into the stage prompts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeDataset {
    items: Vec<ScopeItem>,
}

impl ScopeDataset {
    pub fn new(items: Vec<ScopeItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[ScopeItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Canonical text block every stage prompt embeds: one ` | `
    /// separated line per item, `-` standing in for a missing ANZSCO
    /// code.
    pub fn to_prompt_block(&self) -> String {
        self.items
            .iter()
            .map(render_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn render_line(item: &ScopeItem) -> String {
    let code = sanitize_field(&item.code);
    let title = sanitize_field(&item.title);
    let anzsco = item
        .anzsco_code
        .as_deref()
        .map(sanitize_field)
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| "-".to_string());
    format!("{code} | {title} | {anzsco}")
}

/// Collapse pipes and whitespace runs to single spaces so punctuation
/// inside a title cannot shift the ` | ` field boundaries.
fn sanitize_field(text: &str) -> String {
    static FIELD_BREAKS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s|]+").unwrap());
    FIELD_BREAKS.replace_all(text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_line_per_item_in_order() {
        let dataset = ScopeDataset::new(vec![
            ScopeItem::new("CPC30220", "Certificate III in Carpentry").with_anzsco("331212"),
            ScopeItem::new("CPC40120", "Certificate IV in Building and Construction"),
        ]);
        assert_eq!(
            dataset.to_prompt_block(),
            "CPC30220 | Certificate III in Carpentry | 331212\n\
             CPC40120 | Certificate IV in Building and Construction | -"
        );
    }

    #[test]
    fn empty_dataset_renders_empty_block() {
        assert_eq!(ScopeDataset::default().to_prompt_block(), "");
        assert!(ScopeDataset::default().is_empty());
    }

    #[test]
    fn embedded_pipes_and_newlines_cannot_break_field_boundaries() {
        let dataset = ScopeDataset::new(vec![ScopeItem::new(
            "BSB50420",
            "Diploma of Leadership | and\nManagement",
        )]);
        assert_eq!(
            dataset.to_prompt_block(),
            "BSB50420 | Diploma of Leadership and Management | -"
        );
    }

    #[test]
    fn blank_anzsco_renders_as_dash() {
        let dataset = ScopeDataset::new(vec![
            ScopeItem::new("CPC30220", "Certificate III in Carpentry").with_anzsco("  "),
        ]);
        assert!(dataset.to_prompt_block().ends_with("| -"));
    }

    #[test]
    fn request_constructors_set_the_audit_mode() {
        let rto = ScopeRequest::rto("91234");
        assert!(rto.is_rto_audit);
        assert!(rto.preloaded.is_none());

        let course = ScopeRequest::course("CPC30220");
        assert!(!course.is_rto_audit);

        let preloaded = ScopeRequest::rto("91234")
            .with_preloaded(ScopeDataset::new(vec![ScopeItem::new("A", "B")]));
        assert_eq!(preloaded.preloaded.as_ref().map(ScopeDataset::len), Some(1));
    }

    #[test]
    fn dataset_serializes_as_a_bare_item_array() {
        let dataset = ScopeDataset::new(vec![ScopeItem::new("CPC30220", "Carpentry")]);
        let json = serde_json::to_value(&dataset).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["code"], "CPC30220");
        assert!(json[0].get("anzsco_code").is_none());
    }
}
