use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::coerce;

/// Inputs shared by the market-analysis and skills stages. Built once
/// by the orchestrator from the resolved scope; never mutated.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub identifier: String,
    pub is_rto_audit: bool,
    /// Canonical ` | ` separated catalogue block.
    pub scope_block: String,
}

/// The product stage's inputs: the shared context plus its genuine data
/// dependencies on the earlier stages.
#[derive(Debug, Clone)]
pub struct ProductStageInput {
    pub context: StageContext,
    /// Stage 1's winning sector label.
    pub winning_sector: String,
    /// Stage 2's full flat skill list.
    pub skills: Vec<SkillDemand>,
}

/// Demand label shared by sector health, occupation demand and the
/// skill list. Serialized exactly as `High` / `Medium` / `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DemandLevel {
    High,
    Medium,
    Low,
}

impl fmt::Display for DemandLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DemandLevel::High => "High",
            DemandLevel::Medium => "Medium",
            DemandLevel::Low => "Low",
        };
        f.write_str(label)
    }
}

// ════════════════════════════════════════════════════════════════════
// Stage 1: market analysis
// ════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage1Output {
    pub executive_summary: ExecutiveSummary,
    pub sector_breakdown: Vec<SectorBreakdown>,
    pub occupation_demand: Vec<OccupationDemand>,
}

impl Stage1Output {
    /// Whether the executive summary's winning sector names one of the
    /// breakdown entries. Comparison is trimmed and case-insensitive.
    pub fn top_sector_is_listed(&self) -> bool {
        self.sector_breakdown.iter().any(|sector| {
            labels_match(
                &sector.sector_name,
                &self.executive_summary.top_performing_sector,
            )
        })
    }
}

pub(crate) fn labels_match(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub total_revenue_opportunity: String,
    pub top_performing_sector: String,
    pub headline_insight: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorBreakdown {
    pub sector_name: String,
    #[serde(deserialize_with = "coerce::count")]
    pub course_count: u64,
    pub market_health: MarketHealth,
    pub financial_opportunity: FinancialOpportunity,
    pub recommended_actions: Vec<String>,
    pub suggested_courses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketHealth {
    pub demand_level: DemandLevel,
    /// Some upstream statistics quote badge counts as strings, so this
    /// field alone also accepts a numeric string.
    #[serde(deserialize_with = "coerce::count_or_numeric_string")]
    pub badges_issued: u64,
    pub competition: String,
    pub outlook: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialOpportunity {
    #[serde(deserialize_with = "coerce::count")]
    pub workforce_size: u64,
    #[serde(deserialize_with = "coerce::count")]
    pub annual_learner_estimate: u64,
    pub price_point: f64,
    pub revenue_potential: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccupationDemand {
    pub occupation: String,
    pub demand_level: DemandLevel,
    pub market_size: String,
    pub growth_rate: String,
}

// ════════════════════════════════════════════════════════════════════
// Stage 2: skills demand
// ════════════════════════════════════════════════════════════════════

/// Deliberately flat: the skill list carries no grouping even though
/// the catalogue it derives from has sector structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage2Output {
    pub in_demand_skills: Vec<SkillDemand>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDemand {
    pub skill: String,
    pub demand: DemandLevel,
}

// ════════════════════════════════════════════════════════════════════
// Stage 3: product strategy
// ════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage3Output {
    pub strategic_theme: String,
    pub justification: String,
    pub revenue_summary: RevenueSummary,
    pub products: Vec<ProductOffer>,
    pub bundle: ProductBundle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueSummary {
    pub annual_revenue_estimate: String,
    pub primary_driver: String,
}

/// Product tiers in their contractual progression order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductTier {
    Entry,
    Mid,
    Premium,
}

impl fmt::Display for ProductTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProductTier::Entry => "entry",
            ProductTier::Mid => "mid",
            ProductTier::Premium => "premium",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductOffer {
    pub tier: ProductTier,
    pub title: String,
    pub duration: String,
    pub price: f64,
    pub target_audience: String,
    pub content: ProductContent,
    pub marketing: ProductMarketing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductContent {
    pub modules: Vec<String>,
    pub delivery_mode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductMarketing {
    pub hook: String,
    pub channels: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductBundle {
    pub name: String,
    pub included_products: Vec<String>,
    /// Nominal sum of the individual product prices, before discount.
    pub total_value: f64,
    pub discount_percent: f64,
    /// The offered price; the only figure the discount applies to.
    pub bundle_price: f64,
}
