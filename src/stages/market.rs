use tracing::warn;

use crate::backend::GenerativeBackend;
use crate::schema::{SchemaId, SchemaRegistry};

use super::prompt::{build_market_analysis_prompt, MARKET_ANALYSIS_SYSTEM_PROMPT};
use super::types::{Stage1Output, StageContext};
use super::{run_generation, GenerationFailure, StageId};

/// Stage 1: sector breakdown and market analysis over the catalogue.
pub fn run_market_analysis(
    backend: &dyn GenerativeBackend,
    registry: &SchemaRegistry,
    context: &StageContext,
) -> Result<Stage1Output, GenerationFailure> {
    let prompt = build_market_analysis_prompt(context);
    let generated = run_generation::<Stage1Output>(
        backend,
        registry,
        StageId::Stage1,
        SchemaId::MarketAnalysis,
        MARKET_ANALYSIS_SYSTEM_PROMPT,
        &prompt,
    )?;

    let mut output = generated.value;
    drop_overcapacity_sectors(&mut output);
    normalize_top_sector(&mut output);
    Ok(output)
}

/// A breakdown entry whose learner estimate exceeds its own workforce
/// size violates the prompt's capped revenue model; the entry is
/// dropped, the rest of the output stands.
fn drop_overcapacity_sectors(output: &mut Stage1Output) {
    output.sector_breakdown.retain(|sector| {
        let opportunity = &sector.financial_opportunity;
        if opportunity.annual_learner_estimate > opportunity.workforce_size {
            warn!(
                sector = %sector.sector_name,
                learners = opportunity.annual_learner_estimate,
                workforce = opportunity.workforce_size,
                "dropping sector whose learner estimate exceeds its workforce"
            );
            false
        } else {
            true
        }
    });
}

/// A winning-sector label that matches no breakdown entry is rewritten
/// to the first entry's name. An empty breakdown is left alone; the
/// merge step's cross-stage invariant rejects it.
fn normalize_top_sector(output: &mut Stage1Output) {
    if output.sector_breakdown.is_empty() || output.top_sector_is_listed() {
        return;
    }
    let replacement = output.sector_breakdown[0].sector_name.clone();
    warn!(
        claimed = %output.executive_summary.top_performing_sector,
        normalized = %replacement,
        "winning sector not in breakdown; using first entry"
    );
    output.executive_summary.top_performing_sector = replacement;
}
