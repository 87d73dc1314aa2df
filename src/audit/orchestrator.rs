use tracing::{debug, info, info_span};
use uuid::Uuid;

use crate::backend::GenerativeBackend;
use crate::config::EngineConfig;
use crate::schema::SchemaRegistry;
use crate::scope::{ScopeLookup, ScopeRequest, ScopeResolver};
use crate::stages::{
    run_market_analysis, run_product_strategy, run_skills_demand, ProductStageInput, StageContext,
};

use super::report::{merge_report, AuditReport};
use super::{AuditError, RunState};

/// Drives one audit run through its fixed sequence: resolve scope,
/// three generation stages, merge.
///
/// Holds only shared immutable collaborators. Each `run_full_audit`
/// call keeps its state on the stack, so a single orchestrator value
/// can serve many runs.
pub struct AuditOrchestrator<'a> {
    backend: &'a dyn GenerativeBackend,
    lookup: &'a dyn ScopeLookup,
    registry: &'a SchemaRegistry,
    config: &'a EngineConfig,
}

impl<'a> AuditOrchestrator<'a> {
    pub fn new(
        backend: &'a dyn GenerativeBackend,
        lookup: &'a dyn ScopeLookup,
        registry: &'a SchemaRegistry,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            backend,
            lookup,
            registry,
            config,
        }
    }

    /// Run the full audit for one request. Stages run strictly in
    /// sequence and nothing is retried; the first collaborator failure
    /// ends the run tagged with the phase it occurred in.
    pub fn run_full_audit(&self, request: &ScopeRequest) -> Result<AuditReport, AuditError> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "audit_run",
            %run_id,
            identifier = %request.identifier,
            is_rto_audit = request.is_rto_audit
        );
        let _guard = span.enter();

        let mut state = RunState::Idle;
        let result = self.drive(request, &mut state);
        match &result {
            Ok(report) => info!(state = %state, rto_id = %report.rto_id, "audit run complete"),
            Err(error) => info!(state = %state, error = %error, "audit run failed"),
        }
        result
    }

    fn drive(
        &self,
        request: &ScopeRequest,
        state: &mut RunState,
    ) -> Result<AuditReport, AuditError> {
        transition(state, RunState::ResolvingScope);
        let resolver = ScopeResolver::new(
            self.backend,
            self.lookup,
            self.registry,
            self.config.scope_fallback,
        );
        let dataset = check(state, resolver.resolve(request))?;
        let context = StageContext {
            identifier: request.identifier.clone(),
            is_rto_audit: request.is_rto_audit,
            scope_block: dataset.to_prompt_block(),
        };
        info!(items = dataset.len(), "scope resolved");

        transition(state, RunState::RunningStage1);
        let market = check(
            state,
            run_market_analysis(self.backend, self.registry, &context),
        )?;

        transition(state, RunState::RunningStage2);
        let skills = check(
            state,
            run_skills_demand(self.backend, self.registry, &context),
        )?;

        transition(state, RunState::RunningStage3);
        let product_input = ProductStageInput {
            winning_sector: market.executive_summary.top_performing_sector.clone(),
            skills: skills.in_demand_skills.clone(),
            context,
        };
        let strategy = check(
            state,
            run_product_strategy(self.backend, self.registry, &product_input),
        )?;

        transition(state, RunState::Merging);
        let report = check(
            state,
            merge_report(self.registry, &request.identifier, market, skills, strategy),
        )?;

        transition(state, RunState::Complete);
        Ok(report)
    }
}

fn transition(state: &mut RunState, next: RunState) {
    debug!(from = %state, to = %next, "run state transition");
    *state = next;
}

/// Unwrap a step result, moving the run into `Failed` on error.
fn check<T, E: Into<AuditError>>(
    state: &mut RunState,
    result: Result<T, E>,
) -> Result<T, AuditError> {
    result.map_err(|error| {
        let error: AuditError = error.into();
        transition(state, RunState::Failed(error.phase()));
        error
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::audit::RunPhase;
    use crate::backend::MockBackend;
    use crate::scope::{InMemoryScopeLookup, ScopeDataset, ScopeError, ScopeItem};
    use crate::stages::{FailureReason, StageId};

    const REFUSAL: &str = "Sorry, I cannot help with that.";

    fn stage1_reply(top_sector: &str) -> String {
        json!({
            "executive_summary": {
                "total_revenue_opportunity": "$2.5M AUD",
                "top_performing_sector": top_sector,
                "headline_insight": "Trade demand exceeds local delivery capacity"
            },
            "sector_breakdown": [{
                "sector_name": top_sector,
                "course_count": 1,
                "market_health": {
                    "demand_level": "High",
                    "badges_issued": "12500",
                    "competition": "moderate",
                    "outlook": "growing"
                },
                "financial_opportunity": {
                    "workforce_size": 141000,
                    "annual_learner_estimate": 2100,
                    "price_point": 1650.0,
                    "revenue_potential": 3465000.0
                },
                "recommended_actions": ["partner with group training organisations"],
                "suggested_courses": ["CPC40120"]
            }],
            "occupation_demand": [{
                "occupation": "Carpenter",
                "demand_level": "High",
                "market_size": "141,000 workers",
                "growth_rate": "8.7%"
            }]
        })
        .to_string()
    }

    fn stage2_reply() -> String {
        json!({
            "in_demand_skills": [
                {"skill": "Wall and ceiling framing", "demand": "High"},
                {"skill": "Construction scheduling", "demand": "Medium"}
            ]
        })
        .to_string()
    }

    fn stage3_reply() -> String {
        json!({
            "strategic_theme": "Carpentry career ladder",
            "justification": "Strong demand with thin competition.",
            "revenue_summary": {
                "annual_revenue_estimate": "$740K AUD",
                "primary_driver": "mid tier enrolments"
            },
            "products": [
                {
                    "tier": "entry", "title": "Site Ready Induction", "duration": "2 days",
                    "price": 390.0, "target_audience": "new entrants",
                    "content": {"modules": ["Safety fundamentals"], "delivery_mode": "in person"},
                    "marketing": {"hook": "Be on site Monday", "channels": ["Facebook"]}
                },
                {
                    "tier": "mid", "title": "Formwork Skill Set", "duration": "4 weeks",
                    "price": 1450.0, "target_audience": "second-year apprentices",
                    "content": {"modules": ["Formwork systems"], "delivery_mode": "blended"},
                    "marketing": {"hook": "Specialise early", "channels": ["Email"]}
                },
                {
                    "tier": "premium", "title": "Certificate IV Pathway", "duration": "6 months",
                    "price": 3900.0, "target_audience": "aspiring supervisors",
                    "content": {"modules": ["Estimating and contracts"], "delivery_mode": "blended"},
                    "marketing": {"hook": "Lead the next build", "channels": ["Industry press"]}
                }
            ],
            "bundle": {
                "name": "Carpentry Career Pack",
                "included_products": ["Site Ready Induction", "Formwork Skill Set", "Certificate IV Pathway"],
                "total_value": 5740.0,
                "discount_percent": 10.0,
                "bundle_price": 5166.0
            }
        })
        .to_string()
    }

    fn fallback_scope_reply() -> String {
        json!({
            "items": [{
                "code": "CPC30220",
                "title": "Certificate III in Carpentry",
                "anzsco_code": "331212"
            }]
        })
        .to_string()
    }

    fn preloaded_request() -> ScopeRequest {
        ScopeRequest::rto("91234").with_preloaded(ScopeDataset::new(vec![
            ScopeItem::new("CPC30220", "Certificate III in Carpentry").with_anzsco("331212"),
        ]))
    }

    /// Lookup wrapper that counts store hits, for asserting bypass.
    struct CountingLookup {
        inner: InMemoryScopeLookup,
        calls: AtomicUsize,
    }

    impl CountingLookup {
        fn empty() -> Self {
            Self {
                inner: InMemoryScopeLookup::default(),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ScopeLookup for CountingLookup {
        fn by_rto_code(&self, rto_code: &str) -> Result<Vec<ScopeItem>, ScopeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.by_rto_code(rto_code)
        }

        fn by_course_code(&self, course_code: &str) -> Result<Vec<ScopeItem>, ScopeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.by_course_code(course_code)
        }
    }

    #[test]
    fn untracked_course_code_runs_end_to_end_via_generative_fallback() {
        let backend = MockBackend::default()
            .reply(&fallback_scope_reply())
            .reply(&stage1_reply("Construction"))
            .reply(&stage2_reply())
            .reply(&stage3_reply());
        let lookup = InMemoryScopeLookup::default();
        let registry = SchemaRegistry::new();
        let config = EngineConfig::default();
        let orchestrator = AuditOrchestrator::new(&backend, &lookup, &registry, &config);

        let report = orchestrator
            .run_full_audit(&ScopeRequest::course("CPC30220"))
            .unwrap();

        assert_eq!(report.rto_id, "CPC30220");
        assert_eq!(
            report.market.executive_summary.top_performing_sector,
            "Construction"
        );
        assert_eq!(report.market.sector_breakdown.len(), 1);
        assert_eq!(report.skills.in_demand_skills.len(), 2);
        assert_eq!(report.strategy.products.len(), 3);
        // One fallback call plus one call per stage.
        assert_eq!(backend.calls(), 4);
    }

    #[test]
    fn preloaded_dataset_skips_lookup_and_fallback_entirely() {
        let backend = MockBackend::default()
            .reply(&stage1_reply("Construction"))
            .reply(&stage2_reply())
            .reply(&stage3_reply());
        let lookup = CountingLookup::empty();
        let registry = SchemaRegistry::new();
        let config = EngineConfig::default();
        let orchestrator = AuditOrchestrator::new(&backend, &lookup, &registry, &config);

        let report = orchestrator.run_full_audit(&preloaded_request()).unwrap();

        assert_eq!(report.rto_id, "91234");
        assert_eq!(lookup.calls(), 0);
        assert_eq!(backend.calls(), 3);
    }

    #[test]
    fn stage2_refusal_ends_the_run_before_stage3_is_invoked() {
        let backend = MockBackend::default()
            .reply(&stage1_reply("Construction"))
            .reply(REFUSAL);
        let lookup = InMemoryScopeLookup::default();
        let registry = SchemaRegistry::new();
        let config = EngineConfig::default();
        let orchestrator = AuditOrchestrator::new(&backend, &lookup, &registry, &config);

        let error = orchestrator
            .run_full_audit(&preloaded_request())
            .unwrap_err();

        match &error {
            AuditError::Generation(failure) => {
                assert_eq!(failure.stage, StageId::Stage2);
                assert_eq!(failure.reason, FailureReason::Extraction);
                assert_eq!(failure.raw_text.as_deref(), Some(REFUSAL));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(error.phase(), RunPhase::Stage2);
        assert_eq!(backend.calls(), 2);
    }

    #[test]
    fn unresolvable_scope_fails_in_the_resolution_phase() {
        let backend = MockBackend::default().reply(REFUSAL);
        let lookup = InMemoryScopeLookup::default();
        let registry = SchemaRegistry::new();
        let config = EngineConfig::default();
        let orchestrator = AuditOrchestrator::new(&backend, &lookup, &registry, &config);

        let error = orchestrator
            .run_full_audit(&ScopeRequest::rto("90099"))
            .unwrap_err();

        assert_eq!(error.phase(), RunPhase::ScopeResolution);
        match error {
            AuditError::Scope(ScopeError::NotFound {
                identifier,
                fallback_attempted,
            }) => {
                assert_eq!(identifier, "90099");
                assert!(fallback_attempted);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(backend.calls(), 1);
    }

    #[test]
    fn disabled_fallback_fails_without_touching_the_backend() {
        let backend = MockBackend::default();
        let lookup = InMemoryScopeLookup::default();
        let registry = SchemaRegistry::new();
        let config = EngineConfig {
            scope_fallback: false,
            ..EngineConfig::default()
        };
        let orchestrator = AuditOrchestrator::new(&backend, &lookup, &registry, &config);

        let error = orchestrator
            .run_full_audit(&ScopeRequest::rto("90099"))
            .unwrap_err();

        match error {
            AuditError::Scope(ScopeError::NotFound {
                fallback_attempted, ..
            }) => assert!(!fallback_attempted),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn cross_stage_sector_mismatch_surfaces_as_a_merge_failure() {
        // Stage 1 passes with an empty breakdown, so normalization has
        // nothing to rewrite the top sector to. The merge must refuse.
        let empty_breakdown = json!({
            "executive_summary": {
                "total_revenue_opportunity": "$0",
                "top_performing_sector": "Construction",
                "headline_insight": "No sectors identified"
            },
            "sector_breakdown": [],
            "occupation_demand": []
        })
        .to_string();
        let backend = MockBackend::default()
            .reply(&empty_breakdown)
            .reply(&stage2_reply())
            .reply(&stage3_reply());
        let lookup = InMemoryScopeLookup::default();
        let registry = SchemaRegistry::new();
        let config = EngineConfig::default();
        let orchestrator = AuditOrchestrator::new(&backend, &lookup, &registry, &config);

        let error = orchestrator
            .run_full_audit(&preloaded_request())
            .unwrap_err();

        assert_eq!(error.phase(), RunPhase::Merge);
        assert!(matches!(error, AuditError::Merge(_)));
        // All three stages ran; the run failed only at assembly.
        assert_eq!(backend.calls(), 3);
    }

    #[test]
    fn stage3_receives_stage1_and_stage2_outputs() {
        let backend = MockBackend::default()
            .reply(&stage1_reply("Civil Construction"))
            .reply(&stage2_reply())
            .reply(&stage3_reply());
        let lookup = InMemoryScopeLookup::default();
        let registry = SchemaRegistry::new();
        let config = EngineConfig::default();
        let orchestrator = AuditOrchestrator::new(&backend, &lookup, &registry, &config);

        orchestrator.run_full_audit(&preloaded_request()).unwrap();

        let prompt = backend.prompt_at(2).unwrap();
        assert!(prompt.contains("Civil Construction"));
        assert!(prompt.contains("Wall and ceiling framing"));
    }
}
