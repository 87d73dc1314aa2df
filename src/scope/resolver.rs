use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::backend::GenerativeBackend;
use crate::extract::extract_json;
use crate::schema::{SchemaId, SchemaRegistry};

use super::lookup::ScopeLookup;
use super::prompt::{build_scope_fallback_prompt, SCOPE_FALLBACK_SYSTEM_PROMPT};
use super::types::{ScopeDataset, ScopeItem, ScopeRequest};
use super::ScopeError;

/// Resolves an audit identifier into a course catalogue.
///
/// Holds only borrowed collaborators, so one backend, lookup and
/// registry can serve any number of concurrent resolvers.
pub struct ScopeResolver<'a> {
    backend: &'a dyn GenerativeBackend,
    lookup: &'a dyn ScopeLookup,
    registry: &'a SchemaRegistry,
    fallback_enabled: bool,
}

impl<'a> ScopeResolver<'a> {
    pub fn new(
        backend: &'a dyn GenerativeBackend,
        lookup: &'a dyn ScopeLookup,
        registry: &'a SchemaRegistry,
        fallback_enabled: bool,
    ) -> Self {
        Self {
            backend,
            lookup,
            registry,
            fallback_enabled,
        }
    }

    /// Fixed resolution order: caller bypass, system of record, then
    /// (when enabled) the generative fallback. The request is never
    /// mutated.
    pub fn resolve(&self, request: &ScopeRequest) -> Result<ScopeDataset, ScopeError> {
        // Step 1: a caller-supplied dataset is used unchanged.
        if let Some(dataset) = &request.preloaded {
            debug!(
                identifier = %request.identifier,
                items = dataset.len(),
                "scope resolution bypassed by preloaded dataset"
            );
            return Ok(dataset.clone());
        }

        // Step 2: system of record. Zero rows is a miss, not an error.
        let items = if request.is_rto_audit {
            self.lookup.by_rto_code(&request.identifier)?
        } else {
            self.lookup.by_course_code(&request.identifier)?
        };
        if !items.is_empty() {
            info!(
                identifier = %request.identifier,
                items = items.len(),
                "scope resolved from system of record"
            );
            return Ok(ScopeDataset::new(items));
        }

        // Step 3: generative estimate, deliberately plausible rather
        // than exact.
        if !self.fallback_enabled {
            return Err(ScopeError::NotFound {
                identifier: request.identifier.clone(),
                fallback_attempted: false,
            });
        }
        match self.generative_fallback(request) {
            Some(dataset) if !dataset.is_empty() => {
                info!(
                    identifier = %request.identifier,
                    items = dataset.len(),
                    "scope estimated by generative fallback"
                );
                Ok(dataset)
            }
            _ => Err(ScopeError::NotFound {
                identifier: request.identifier.clone(),
                fallback_attempted: true,
            }),
        }
    }

    /// One fallback attempt. Backend, extraction and validation
    /// failures all degrade to `None` with a warn log; the caller
    /// reports exhaustion, not backend mechanics.
    fn generative_fallback(&self, request: &ScopeRequest) -> Option<ScopeDataset> {
        let prompt = build_scope_fallback_prompt(&request.identifier, request.is_rto_audit);

        let reply = match self.backend.invoke(
            SCOPE_FALLBACK_SYSTEM_PROMPT,
            &prompt,
            Some(SchemaId::ScopeDataset.as_str()),
        ) {
            Ok(reply) => reply,
            Err(error) => {
                warn!(identifier = %request.identifier, error = %error, "scope fallback call failed");
                return None;
            }
        };

        let value = match extract_json(&reply.text) {
            Ok(value) => value,
            Err(error) => {
                warn!(identifier = %request.identifier, error = %error, "scope fallback reply carried no JSON");
                return None;
            }
        };

        let payload: FallbackPayload =
            match self.registry.validate_as(SchemaId::ScopeDataset, &value) {
                Ok(payload) => payload,
                Err(error) => {
                    warn!(identifier = %request.identifier, error = %error, "scope fallback reply failed validation");
                    return None;
                }
            };

        Some(payload.into_dataset(&request.identifier))
    }
}

/// Lenient mirror of the fallback payload: every item field is optional
/// so one partial item cannot sink the dataset.
#[derive(Deserialize)]
struct FallbackPayload {
    items: Vec<FallbackItem>,
}

#[derive(Deserialize)]
struct FallbackItem {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    anzsco_code: Option<String>,
}

impl FallbackPayload {
    fn into_dataset(self, identifier: &str) -> ScopeDataset {
        let mut items = Vec::new();
        let mut discarded = 0usize;
        for raw in self.items {
            match (non_empty(raw.code), non_empty(raw.title)) {
                (Some(code), Some(title)) => items.push(ScopeItem {
                    code,
                    title,
                    anzsco_code: non_empty(raw.anzsco_code),
                }),
                _ => discarded += 1,
            }
        }
        if discarded > 0 {
            warn!(identifier = %identifier, discarded, "discarded partial items from scope fallback");
        }
        ScopeDataset::new(items)
    }
}

fn non_empty(field: Option<String>) -> Option<String> {
    field
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use crate::backend::{BackendError, MockBackend};
    use crate::scope::lookup::InMemoryScopeLookup;

    use super::*;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new()
    }

    fn carpentry_scope() -> Vec<ScopeItem> {
        vec![
            ScopeItem::new("CPC30220", "Certificate III in Carpentry").with_anzsco("331212"),
            ScopeItem::new("CPC40120", "Certificate IV in Building and Construction"),
        ]
    }

    struct FailingLookup;

    impl ScopeLookup for FailingLookup {
        fn by_rto_code(&self, _: &str) -> Result<Vec<ScopeItem>, ScopeError> {
            Err(ScopeError::Store("disk I/O error".to_string()))
        }

        fn by_course_code(&self, _: &str) -> Result<Vec<ScopeItem>, ScopeError> {
            Err(ScopeError::Store("disk I/O error".to_string()))
        }
    }

    #[test]
    fn preloaded_dataset_bypasses_lookup_and_backend() {
        let backend = MockBackend::new();
        let lookup = InMemoryScopeLookup::new().with_rto("91234", carpentry_scope());
        let registry = registry();
        let resolver = ScopeResolver::new(&backend, &lookup, &registry, true);

        let preloaded = ScopeDataset::new(vec![ScopeItem::new("HLT33115", "Health Services")]);
        let request = ScopeRequest::rto("91234").with_preloaded(preloaded.clone());

        let resolved = resolver.resolve(&request).unwrap();
        assert_eq!(resolved, preloaded);
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn preloaded_dataset_is_returned_unchanged_even_when_empty() {
        let backend = MockBackend::new();
        let lookup = InMemoryScopeLookup::new().with_rto("91234", carpentry_scope());
        let registry = registry();
        let resolver = ScopeResolver::new(&backend, &lookup, &registry, true);

        let request = ScopeRequest::rto("91234").with_preloaded(ScopeDataset::default());
        assert!(resolver.resolve(&request).unwrap().is_empty());
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn provider_identifiers_use_the_rto_index() {
        let backend = MockBackend::new();
        let lookup = InMemoryScopeLookup::new().with_rto("91234", carpentry_scope());
        let registry = registry();
        let resolver = ScopeResolver::new(&backend, &lookup, &registry, true);

        let resolved = resolver.resolve(&ScopeRequest::rto("91234")).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn course_identifiers_use_the_course_index() {
        let backend = MockBackend::new();
        let lookup = InMemoryScopeLookup::new().with_rto("91234", carpentry_scope());
        let registry = registry();
        let resolver = ScopeResolver::new(&backend, &lookup, &registry, true);

        let resolved = resolver.resolve(&ScopeRequest::course("CPC30220")).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved.items()[0].code, "CPC30220");
    }

    #[test]
    fn lookup_miss_falls_back_to_generative_estimate() {
        let backend = MockBackend::new().reply(
            r#"Here is my estimate:
            {"items": [
                {"code": "CPC30220", "title": "Certificate III in Carpentry", "anzsco_code": "331212"},
                {"code": "  ", "title": "Blank code"},
                {"title": "No code at all"},
                {"code": "CPC40120", "title": "Certificate IV in Building and Construction", "anzsco_code": null}
            ]}"#,
        );
        let lookup = InMemoryScopeLookup::new();
        let registry = registry();
        let resolver = ScopeResolver::new(&backend, &lookup, &registry, true);

        let resolved = resolver.resolve(&ScopeRequest::rto("99999")).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved.items()[0].code, "CPC30220");
        assert_eq!(resolved.items()[1].anzsco_code, None);
        assert_eq!(backend.calls(), 1);
    }

    #[test]
    fn fallback_transport_failure_degrades_to_not_found() {
        let backend =
            MockBackend::new().failure(BackendError::Connect("http://localhost:11434".into()));
        let lookup = InMemoryScopeLookup::new();
        let registry = registry();
        let resolver = ScopeResolver::new(&backend, &lookup, &registry, true);

        let err = resolver.resolve(&ScopeRequest::rto("99999")).unwrap_err();
        match err {
            ScopeError::NotFound {
                identifier,
                fallback_attempted,
            } => {
                assert_eq!(identifier, "99999");
                assert!(fallback_attempted);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn fallback_refusal_text_degrades_to_not_found() {
        let backend = MockBackend::new().reply("Sorry, I cannot help with that.");
        let lookup = InMemoryScopeLookup::new();
        let registry = registry();
        let resolver = ScopeResolver::new(&backend, &lookup, &registry, true);

        let err = resolver.resolve(&ScopeRequest::course("ZZZ99999")).unwrap_err();
        assert!(matches!(
            err,
            ScopeError::NotFound {
                fallback_attempted: true,
                ..
            }
        ));
    }

    #[test]
    fn fallback_with_no_usable_items_is_not_found() {
        let backend = MockBackend::new().reply(r#"{"items": [{"code": "", "title": ""}]}"#);
        let lookup = InMemoryScopeLookup::new();
        let registry = registry();
        let resolver = ScopeResolver::new(&backend, &lookup, &registry, true);

        let err = resolver.resolve(&ScopeRequest::rto("99999")).unwrap_err();
        assert!(matches!(err, ScopeError::NotFound { .. }));
    }

    #[test]
    fn disabled_fallback_reports_the_narrower_path() {
        let backend = MockBackend::new().reply(r#"{"items": []}"#);
        let lookup = InMemoryScopeLookup::new();
        let registry = registry();
        let resolver = ScopeResolver::new(&backend, &lookup, &registry, false);

        let err = resolver.resolve(&ScopeRequest::rto("99999")).unwrap_err();
        assert!(matches!(
            err,
            ScopeError::NotFound {
                fallback_attempted: false,
                ..
            }
        ));
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn store_failures_propagate_rather_than_degrade() {
        let backend = MockBackend::new();
        let registry = registry();
        let resolver = ScopeResolver::new(&backend, &FailingLookup, &registry, true);

        let err = resolver.resolve(&ScopeRequest::rto("91234")).unwrap_err();
        assert!(matches!(err, ScopeError::Store(_)));
        assert_eq!(backend.calls(), 0);
    }
}
