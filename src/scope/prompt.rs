//! Prompt for the generative scope fallback.
//!
//! Estimation is the point: when the system of record has nothing, the
//! model is instructed to produce a plausible, representative catalogue
//! for that kind of identifier rather than refuse. Approximate data
//! beats no data for an opportunity audit.

pub const SCOPE_FALLBACK_SYSTEM_PROMPT: &str = r#"
You are a research assistant for the Australian vocational education and
training (VET) sector. You reconstruct the scope of registration of
training providers (RTOs) and identify the providers of nationally
recognised courses.

RULES:
1. ALWAYS produce a dataset. When you do not know the exact records,
   produce a plausible, representative catalogue for that kind of
   identifier. Never refuse, never return an empty list.
2. Use real Australian training-package codes and titles wherever
   possible (e.g. CPC30220, Certificate III in Carpentry).
3. Give each course its ANZSCO occupation code when one clearly applies;
   use null when none does.
4. Output ONLY the JSON object requested. No prose before or after it.
"#;

/// Build the fallback prompt for one unresolved identifier.
pub fn build_scope_fallback_prompt(identifier: &str, is_rto_audit: bool) -> String {
    let task = if is_rto_audit {
        format!(
            "Reconstruct the scope of registration for the Australian training \
             provider with RTO code {identifier}. List every nationally recognised \
             course this provider plausibly delivers. If the provider is unknown \
             to you, produce a representative scope for a mid-sized RTO instead."
        )
    } else {
        format!(
            "Identify the nationally recognised Australian course with code \
             {identifier}, as delivered by one representative registered provider \
             of that course. If the code is unknown to you, produce the most \
             plausible course record for a code of that form."
        )
    };

    let count_rule = if is_rto_audit {
        "- Include every course the provider plausibly offers, typically 5 to 30 items."
    } else {
        "- Include exactly one item, for the requested course code."
    };

    format!(
        r#"{task}

Respond with a single JSON object in exactly this shape:

{{
  "items": [
    {{"code": "CPC30220", "title": "Certificate III in Carpentry", "anzsco_code": "331212"}}
  ]
}}

Rules for the items array:
- "code" and "title" are required; omit an item entirely rather than leaving either blank.
- "anzsco_code" may be null.
{count_rule}
"#
    )
}
