use crate::backend::GenerativeBackend;
use crate::schema::{SchemaId, SchemaRegistry};

use super::prompt::{build_product_strategy_prompt, PRODUCT_STRATEGY_SYSTEM_PROMPT};
use super::types::{ProductStageInput, ProductTier, Stage3Output};
use super::{run_generation, FailureReason, GenerationFailure, StageId};

/// Cent-level slack for the bundle's nominal total, which the model
/// computes through float-rendered prices.
const BUNDLE_TOTAL_TOLERANCE: f64 = 0.005;

/// Stage 3: three tiered products and a bundle for the winning sector.
pub fn run_product_strategy(
    backend: &dyn GenerativeBackend,
    registry: &SchemaRegistry,
    input: &ProductStageInput,
) -> Result<Stage3Output, GenerationFailure> {
    let prompt = build_product_strategy_prompt(input);
    let generated = run_generation::<Stage3Output>(
        backend,
        registry,
        StageId::Stage3,
        SchemaId::ProductStrategy,
        PRODUCT_STRATEGY_SYSTEM_PROMPT,
        &prompt,
    )?;

    if let Err(detail) = check_offer_rules(&generated.value) {
        return Err(GenerationFailure {
            stage: StageId::Stage3,
            reason: FailureReason::Validation,
            detail,
            raw_text: Some(generated.raw),
        });
    }
    Ok(generated.value)
}

/// Offer rules the schema cannot express: exactly three products, tiers
/// strictly entry then mid then premium, and a bundle whose nominal
/// total equals the sum of the product prices. The discount belongs to
/// `bundle_price` alone.
fn check_offer_rules(output: &Stage3Output) -> Result<(), String> {
    if output.products.len() != 3 {
        return Err(format!(
            "expected exactly 3 products, got {}",
            output.products.len()
        ));
    }

    let progression = [ProductTier::Entry, ProductTier::Mid, ProductTier::Premium];
    for (offer, expected) in output.products.iter().zip(progression) {
        if offer.tier != expected {
            return Err(format!(
                "product tiers must progress entry, mid, premium; found {} where {} was expected",
                offer.tier, expected
            ));
        }
    }

    let nominal: f64 = output.products.iter().map(|offer| offer.price).sum();
    if (output.bundle.total_value - nominal).abs() > BUNDLE_TOTAL_TOLERANCE {
        return Err(format!(
            "bundle total_value {:.2} does not equal the product price sum {:.2}",
            output.bundle.total_value, nominal
        ));
    }

    Ok(())
}
