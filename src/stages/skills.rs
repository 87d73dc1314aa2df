use crate::backend::GenerativeBackend;
use crate::schema::{SchemaId, SchemaRegistry};

use super::prompt::{build_skills_demand_prompt, SKILLS_DEMAND_SYSTEM_PROMPT};
use super::types::{Stage2Output, StageContext};
use super::{run_generation, GenerationFailure, StageId};

/// Stage 2: the flat in-demand skill list for the catalogue.
///
/// Runs on the same context as Stage 1 and never sees its output; the
/// two are sequenced only for backpressure.
pub fn run_skills_demand(
    backend: &dyn GenerativeBackend,
    registry: &SchemaRegistry,
    context: &StageContext,
) -> Result<Stage2Output, GenerationFailure> {
    let prompt = build_skills_demand_prompt(context);
    let generated = run_generation::<Stage2Output>(
        backend,
        registry,
        StageId::Stage2,
        SchemaId::SkillsDemand,
        SKILLS_DEMAND_SYSTEM_PROMPT,
        &prompt,
    )?;
    Ok(generated.value)
}
