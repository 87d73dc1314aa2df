//! Prompt templates for the three generation stages.
//!
//! Rendering is pure template substitution; every behavioural
//! instruction lives in the template text itself. The four-step capped
//! revenue model in Stage 1 is an instruction to the model, not
//! arithmetic this engine performs.

use super::types::{ProductStageInput, SkillDemand, StageContext};

pub const MARKET_ANALYSIS_SYSTEM_PROMPT: &str = r#"
You are a market analyst for the Australian vocational education and
training (VET) sector. You turn a provider's course catalogue into a
sector-level revenue opportunity analysis grounded in labour-market
demand.

RULES:
1. Group the catalogue's courses into industry sectors. Every sector you
   report must be backed by catalogue lines, and course_count must equal
   the number of lines you assigned to that sector.
2. Compute each sector's financial opportunity with the four-step capped
   capacity model, in this exact order:
   a. workforce_size: the addressable occupation workforce.
   b. annual_learner_estimate: the share of that workforce training per
      year, capped by what a single provider can realistically deliver.
      It must NEVER exceed workforce_size.
   c. price_point: a market-rate course price in AUD.
   d. revenue_potential: annual_learner_estimate multiplied by
      price_point.
3. top_performing_sector must be the sector_name of the breakdown entry
   with the highest revenue_potential, copied verbatim.
4. Estimate when exact figures are unavailable; plausible numbers beat
   missing fields. Counts are whole numbers.
5. Output ONLY the JSON object requested. No prose, no markdown fences.
"#;

pub const SKILLS_DEMAND_SYSTEM_PROMPT: &str = r#"
You are a workforce skills analyst for the Australian VET sector. You
identify the individual skills employers currently demand from the
graduates of a course catalogue.

RULES:
1. Derive skills from the catalogue's courses and their occupations, not
   from generic skill lists.
2. Return ONE FLAT LIST. Do not group skills by course, sector or any
   other category, even though the catalogue has structure.
3. Name concrete, assessable skills (e.g. "Wall and floor tiling", never
   "construction skills").
4. Rate each skill's current employer demand as High, Medium or Low.
5. Output ONLY the JSON object requested. No prose, no markdown fences.
"#;

pub const PRODUCT_STRATEGY_SYSTEM_PROMPT: &str = r#"
You are a commercial product strategist for Australian training
providers. You design sellable short-course products from market
analysis and skills-demand evidence.

RULES:
1. Design EXACTLY three products in a strict tier progression: the first
   "entry", the second "mid", the third "premium", with prices rising
   across the tiers.
2. Anchor every product in the winning sector and the in-demand skills
   supplied to you.
3. The bundle includes all three products by title. Its total_value is
   the exact sum of the three product prices before any discount.
4. Apply discount_percent only to bundle_price, the offered price. Never
   discount total_value.
5. Prices are AUD numbers, not strings.
6. Output ONLY the JSON object requested. No prose, no markdown fences.
"#;

fn subject_line(context: &StageContext) -> String {
    if context.is_rto_audit {
        format!(
            "Audit subject: the full scope of registration of Australian RTO {}.",
            context.identifier
        )
    } else {
        format!(
            "Audit subject: nationally recognised course {} and the catalogue of a provider that delivers it.",
            context.identifier
        )
    }
}

/// Stage 1 prompt: catalogue in, sector breakdown out.
pub fn build_market_analysis_prompt(context: &StageContext) -> String {
    format!(
        r#"{subject}

<catalogue>
{scope}
</catalogue>

Each catalogue line reads `course code | course title | ANZSCO code`,
with "-" when no ANZSCO code is known.

Analyse the catalogue into exactly this JSON structure:

{{
  "executive_summary": {{
    "total_revenue_opportunity": "e.g. $4.1M AUD",
    "top_performing_sector": "sector_name copied from sector_breakdown",
    "headline_insight": "one sentence"
  }},
  "sector_breakdown": [
    {{
      "sector_name": "e.g. Construction",
      "course_count": 0,
      "market_health": {{
        "demand_level": "High | Medium | Low",
        "badges_issued": 0,
        "competition": "e.g. moderate, 45 providers nationally",
        "outlook": "one sentence"
      }},
      "financial_opportunity": {{
        "workforce_size": 0,
        "annual_learner_estimate": 0,
        "price_point": 0.0,
        "revenue_potential": 0.0
      }},
      "recommended_actions": ["concrete action"],
      "suggested_courses": ["course code"]
    }}
  ],
  "occupation_demand": [
    {{
      "occupation": "e.g. Carpenter",
      "demand_level": "High | Medium | Low",
      "market_size": "e.g. 141,000 workers",
      "growth_rate": "e.g. 8.7% to 2030"
    }}
  ]
}}
"#,
        subject = subject_line(context),
        scope = context.scope_block,
    )
}

/// Stage 2 prompt: catalogue in, flat skill list out.
pub fn build_skills_demand_prompt(context: &StageContext) -> String {
    format!(
        r#"{subject}

<catalogue>
{scope}
</catalogue>

List the 8 to 15 individual skills employers most demand from graduates
of this catalogue, as one flat ungrouped list, in exactly this JSON
structure:

{{
  "in_demand_skills": [
    {{"skill": "e.g. Wall and floor tiling", "demand": "High | Medium | Low"}}
  ]
}}
"#,
        subject = subject_line(context),
        scope = context.scope_block,
    )
}

fn render_skills(skills: &[SkillDemand]) -> String {
    skills
        .iter()
        .map(|entry| format!("- {} ({})", entry.skill, entry.demand))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Stage 3 prompt: winning sector and skill evidence in, three tiered
/// products and a bundle out.
pub fn build_product_strategy_prompt(input: &ProductStageInput) -> String {
    format!(
        r#"{subject}

Winning sector from the market analysis: {sector}

<catalogue>
{scope}
</catalogue>

<in_demand_skills>
{skills}
</in_demand_skills>

Design the product strategy in exactly this JSON structure:

{{
  "strategic_theme": "one phrase",
  "justification": "2-3 sentences tying the theme to the evidence",
  "revenue_summary": {{
    "annual_revenue_estimate": "e.g. $850K AUD",
    "primary_driver": "e.g. premium tier corporate intakes"
  }},
  "products": [
    {{
      "tier": "entry",
      "title": "product title",
      "duration": "e.g. 2 days",
      "price": 0.0,
      "target_audience": "who buys this",
      "content": {{
        "modules": ["module title"],
        "delivery_mode": "e.g. online self-paced"
      }},
      "marketing": {{
        "hook": "one line",
        "channels": ["e.g. LinkedIn ads"]
      }}
    }}
  ],
  "bundle": {{
    "name": "bundle name",
    "included_products": ["the three product titles"],
    "total_value": 0.0,
    "discount_percent": 0.0,
    "bundle_price": 0.0
  }}
}}
"#,
        subject = subject_line(&input.context),
        sector = input.winning_sector,
        scope = input.context.scope_block,
        skills = render_skills(&input.skills),
    )
}
