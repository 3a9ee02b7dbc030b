//! Suggestion Orchestrator — turns one assessment into persisted career guidance.
//!
//! Flow: config check → prompt pair → one provider call → strict parse → one insert.
//! Strictly sequential. Nothing is written unless the provider output parsed cleanly,
//! and nothing is retried.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::assessments::prompts::{build_user_prompt, system_prompt};
use crate::assessments::store::{AssessmentStore, NewAssessment, StoreError};
use crate::config::SuggestionConfig;
use crate::llm_client::{ChatProvider, LlmError};
use crate::models::assessment::{AssessmentInput, SuggestionResult};

/// Every way a suggestion request can end without a result. None are retried.
#[derive(Debug, Error)]
pub enum SuggestionError {
    #[error("Missing required configuration: {}", .missing.join(", "))]
    Configuration { missing: Vec<&'static str> },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Provider rate limit exceeded")]
    RateLimited,

    #[error("Provider requires payment")]
    PaymentRequired,

    #[error("Provider error ({}): {body}", status_label(.status))]
    Provider { status: Option<u16>, body: String },

    #[error("Provider returned a malformed suggestion: {0}")]
    MalformedSuggestion(#[from] MalformedSuggestion),

    /// The suggestion was computed but could not be saved.
    #[error("Failed to persist assessment: {source}")]
    Persistence {
        #[source]
        source: StoreError,
        suggestions: Box<SuggestionResult>,
    },
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(status) => format!("status {status}"),
        None => "no response".to_string(),
    }
}

/// Why provider content could not be turned into a `SuggestionResult`.
#[derive(Debug, Error, PartialEq)]
#[error("{reason}")]
pub struct MalformedSuggestion {
    pub reason: String,
}

impl MalformedSuggestion {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Strictly parses provider content into a `SuggestionResult`.
///
/// All five fields must be present with the right types and `careerPath` must not be blank.
pub fn parse_suggestions(content: &str) -> Result<SuggestionResult, MalformedSuggestion> {
    let result: SuggestionResult = serde_json::from_str(content)
        .map_err(|e| MalformedSuggestion::new(format!("content is not a suggestion object: {e}")))?;

    if result.career_path.trim().is_empty() {
        return Err(MalformedSuggestion::new("careerPath is empty"));
    }

    Ok(result)
}

impl From<LlmError> for SuggestionError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::RateLimited { .. } => SuggestionError::RateLimited,
            LlmError::PaymentRequired { .. } => SuggestionError::PaymentRequired,
            LlmError::Api { status, message } => SuggestionError::Provider {
                status: Some(status),
                body: message,
            },
            LlmError::Http(e) => SuggestionError::Provider {
                status: e.status().map(|s| s.as_u16()),
                body: e.to_string(),
            },
            LlmError::Envelope { source, raw } => {
                warn!("Unparseable provider envelope ({source}): {raw}");
                SuggestionError::MalformedSuggestion(MalformedSuggestion::new(
                    "provider response envelope was not a chat completion",
                ))
            }
            LlmError::EmptyContent => SuggestionError::MalformedSuggestion(
                MalformedSuggestion::new("provider returned no content"),
            ),
        }
    }
}

/// Generates and stores career suggestions. Holds only shared, immutable handles,
/// so one instance serves all concurrent requests.
pub struct SuggestionOrchestrator {
    config: SuggestionConfig,
    provider: Arc<dyn ChatProvider>,
    store: Arc<dyn AssessmentStore>,
}

impl SuggestionOrchestrator {
    pub fn new(
        config: SuggestionConfig,
        provider: Arc<dyn ChatProvider>,
        store: Arc<dyn AssessmentStore>,
    ) -> Self {
        Self {
            config,
            provider,
            store,
        }
    }

    pub async fn generate_suggestions(
        &self,
        assessment: &AssessmentInput,
        user_id: Uuid,
    ) -> Result<SuggestionResult, SuggestionError> {
        // Step 1: configuration, before any I/O
        let missing = self.config.missing();
        if !missing.is_empty() {
            error!("Suggestion request refused, missing configuration: {missing:?}");
            return Err(SuggestionError::Configuration { missing });
        }

        if user_id.is_nil() {
            return Err(SuggestionError::InvalidRequest(
                "user_id must be a non-nil identifier".to_string(),
            ));
        }

        // Step 2: prompts
        let system = system_prompt();
        let user = build_user_prompt(assessment);

        // Step 3 + 4: single provider call, classified
        info!("Requesting career suggestions for user {user_id}");
        let content = self.provider.complete_json(&system, &user).await?;

        let suggestions = match parse_suggestions(&content) {
            Ok(suggestions) => suggestions,
            Err(malformed) => {
                warn!("Malformed suggestion for user {user_id} ({malformed}): {content}");
                return Err(malformed.into());
            }
        };
        info!("Career suggestions generated for user {user_id}");

        // Step 5: exactly one append
        let record = NewAssessment::new(user_id, assessment, &suggestions);
        if let Err(source) = self.store.insert(&record).await {
            error!("Suggestions computed but not saved for user {user_id}: {source}");
            return Err(SuggestionError::Persistence {
                source,
                suggestions: Box::new(suggestions),
            });
        }

        Ok(suggestions)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::assessments::store::memory::{FailingStore, MemoryAssessmentStore};
    use crate::models::assessment::ExperienceLevel;

    const WELL_FORMED: &str = r#"{
        "careerPath": "Start as an ML intern, grow into an applied ML engineer.",
        "skillRecommendations": ["NumPy", "PyTorch", "Statistics", "SQL"],
        "learningRoadmap": ["Python foundations", "Linear algebra", "Classical ML", "Deep learning"],
        "internshipMatches": ["Research lab internships value Python", "Startups want ML prototypes"],
        "resumeTips": ["Link projects", "Quantify results", "Keep it to one page"]
    }"#;

    /// Provider double that replays a canned reply and records the prompts it was sent.
    struct ScriptedProvider {
        reply: Box<dyn Fn() -> Result<String, LlmError> + Send + Sync>,
        calls: AtomicUsize,
        last_user_prompt: Mutex<Option<String>>,
    }

    impl ScriptedProvider {
        fn new(reply: impl Fn() -> Result<String, LlmError> + Send + Sync + 'static) -> Arc<Self> {
            Arc::new(Self {
                reply: Box::new(reply),
                calls: AtomicUsize::new(0),
                last_user_prompt: Mutex::new(None),
            })
        }

        fn replying(content: &'static str) -> Arc<Self> {
            Self::new(move || Ok(content.to_string()))
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        async fn complete_json(&self, _system: &str, user: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_user_prompt.lock().unwrap() = Some(user.to_string());
            (self.reply)()
        }
    }

    fn full_config() -> SuggestionConfig {
        SuggestionConfig {
            llm_api_key: Some("sk-test".to_string()),
            store_url: Some("https://store.example".to_string()),
            store_key: Some("service-key".to_string()),
        }
    }

    fn scenario_input() -> AssessmentInput {
        AssessmentInput {
            skills: vec!["Python".to_string()],
            interests: vec!["ML".to_string()],
            experience_level: Some(ExperienceLevel::Beginner),
            education: "CS".to_string(),
            goals: "Get an ML internship".to_string(),
            linkedin_url: None,
            github_url: None,
        }
    }

    fn orchestrator(
        provider: Arc<ScriptedProvider>,
        store: Arc<dyn AssessmentStore>,
    ) -> SuggestionOrchestrator {
        SuggestionOrchestrator::new(full_config(), provider, store)
    }

    #[test]
    fn test_parse_suggestions_accepts_well_formed_content() {
        let result = parse_suggestions(WELL_FORMED).unwrap();
        assert_eq!(result.learning_roadmap[0], "Python foundations");
        assert_eq!(result.learning_roadmap[3], "Deep learning");
    }

    #[test]
    fn test_parse_suggestions_rejects_missing_field() {
        let err = parse_suggestions(r#"{"careerPath": "x", "skillRecommendations": []}"#)
            .unwrap_err();
        assert!(err.reason.contains("not a suggestion object"));
    }

    #[test]
    fn test_parse_suggestions_rejects_blank_career_path() {
        let content = WELL_FORMED.replace(
            "Start as an ML intern, grow into an applied ML engineer.",
            "  ",
        );
        assert_eq!(
            parse_suggestions(&content).unwrap_err(),
            MalformedSuggestion::new("careerPath is empty")
        );
    }

    #[test]
    fn test_parse_suggestions_rejects_wrong_types() {
        let content = WELL_FORMED.replace(
            r#"["Link projects", "Quantify results", "Keep it to one page"]"#,
            r#""Link projects""#,
        );
        assert!(parse_suggestions(&content).is_err());
    }

    #[tokio::test]
    async fn test_well_formed_completion_is_returned_and_persisted_once() {
        let provider = ScriptedProvider::replying(WELL_FORMED);
        let store = Arc::new(MemoryAssessmentStore::default());
        let user_id = Uuid::new_v4();

        let result = orchestrator(provider.clone(), store.clone())
            .generate_suggestions(&scenario_input(), user_id)
            .await
            .unwrap();

        assert!(!result.career_path.is_empty());
        assert_eq!(result.skill_recommendations.len(), 4);
        assert_eq!(result.learning_roadmap.len(), 4);
        assert_eq!(result.internship_matches.len(), 2);
        assert_eq!(result.resume_tips.len(), 3);
        assert_eq!(provider.calls(), 1);

        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_id, user_id);
        assert_eq!(records[0].skills, vec!["Python"]);
        assert_eq!(records[0].experience_level, Some(ExperienceLevel::Beginner));
        assert_eq!(records[0].ai_suggestions, result);
    }

    #[tokio::test]
    async fn test_provider_receives_placeholder_prompt() {
        let provider = ScriptedProvider::replying(WELL_FORMED);
        let store = Arc::new(MemoryAssessmentStore::default());

        orchestrator(provider.clone(), store)
            .generate_suggestions(&scenario_input(), Uuid::new_v4())
            .await
            .unwrap();

        let prompt = provider.last_user_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("- LinkedIn: Not provided"));
        assert!(prompt.contains("- GitHub: Not provided"));
        assert!(prompt.contains("- Skills: Python"));
    }

    #[tokio::test]
    async fn test_missing_config_fails_before_any_call() {
        for blank in 0..3 {
            let mut config = full_config();
            match blank {
                0 => config.llm_api_key = None,
                1 => config.store_url = None,
                _ => config.store_key = Some(String::new()),
            }
            let provider = ScriptedProvider::replying(WELL_FORMED);
            let store = Arc::new(MemoryAssessmentStore::default());
            let orchestrator =
                SuggestionOrchestrator::new(config, provider.clone(), store.clone());

            let err = orchestrator
                .generate_suggestions(&scenario_input(), Uuid::new_v4())
                .await
                .unwrap_err();

            assert!(matches!(err, SuggestionError::Configuration { ref missing } if missing.len() == 1));
            assert_eq!(provider.calls(), 0);
            assert!(store.records().is_empty());
        }
    }

    #[tokio::test]
    async fn test_nil_user_is_rejected_without_calling_provider() {
        let provider = ScriptedProvider::replying(WELL_FORMED);
        let err = orchestrator(provider.clone(), Arc::new(MemoryAssessmentStore::default()))
            .generate_suggestions(&scenario_input(), Uuid::nil())
            .await
            .unwrap_err();

        assert!(matches!(err, SuggestionError::InvalidRequest(_)));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_persists_nothing() {
        let provider = ScriptedProvider::new(|| {
            Err(LlmError::RateLimited {
                body: "too many requests".to_string(),
            })
        });
        let store = Arc::new(MemoryAssessmentStore::default());

        let err = orchestrator(provider, store.clone())
            .generate_suggestions(&scenario_input(), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, SuggestionError::RateLimited));
        assert!(store.records().is_empty());
    }

    /// Runs one request against a provider that fails with `reply` and checks nothing was stored.
    async fn failing_with(
        reply: impl Fn() -> Result<String, LlmError> + Send + Sync + 'static,
    ) -> SuggestionError {
        let store = Arc::new(MemoryAssessmentStore::default());
        let err = orchestrator(ScriptedProvider::new(reply), store.clone())
            .generate_suggestions(&scenario_input(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(store.records().is_empty());
        err
    }

    #[tokio::test]
    async fn test_payment_required_is_mapped() {
        let err = failing_with(|| {
            Err(LlmError::PaymentRequired {
                body: String::new(),
            })
        })
        .await;
        assert!(matches!(err, SuggestionError::PaymentRequired));
    }

    #[tokio::test]
    async fn test_other_status_is_provider_error_with_body() {
        let err = failing_with(|| {
            Err(LlmError::Api {
                status: 500,
                message: "internal".to_string(),
            })
        })
        .await;
        assert!(
            matches!(err, SuggestionError::Provider { status: Some(500), ref body } if body == "internal")
        );
        assert_eq!(err.to_string(), "Provider error (status 500): internal");
    }

    #[tokio::test]
    async fn test_empty_content_is_malformed() {
        let err = failing_with(|| Err(LlmError::EmptyContent)).await;
        assert!(matches!(err, SuggestionError::MalformedSuggestion(_)));
    }

    #[tokio::test]
    async fn test_non_json_envelope_is_malformed() {
        let err = failing_with(|| {
            let raw = "<html>502 Bad Gateway</html>".to_string();
            Err(LlmError::Envelope {
                source: serde_json::from_str::<serde_json::Value>(&raw).unwrap_err(),
                raw,
            })
        })
        .await;

        match err {
            SuggestionError::MalformedSuggestion(malformed) => {
                assert!(!malformed.reason.contains("Bad Gateway"));
            }
            other => panic!("expected MalformedSuggestion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_provider_error_without_status() {
        use axum::{http::StatusCode, response::IntoResponse};

        use crate::errors::AppError;
        use crate::llm_client::LlmClient;

        // Reserve a port, then free it so nothing is listening there.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = LlmClient::new(
            &format!("http://{addr}/v1"),
            "google/gemini-2.5-flash",
            "sk-test",
            std::time::Duration::from_secs(2),
        )
        .unwrap();
        let store = Arc::new(MemoryAssessmentStore::default());
        let err = SuggestionOrchestrator::new(full_config(), Arc::new(client), store.clone())
            .generate_suggestions(&scenario_input(), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, SuggestionError::Provider { status: None, .. }));
        assert!(store.records().is_empty());
        assert_eq!(
            AppError::from(err).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn test_null_form_fields_render_as_not_specified() {
        let provider = ScriptedProvider::replying(WELL_FORMED);
        let input: AssessmentInput = serde_json::from_value(serde_json::json!({
            "skills": ["Python"],
            "education": null,
            "goals": null
        }))
        .unwrap();

        orchestrator(provider.clone(), Arc::new(MemoryAssessmentStore::default()))
            .generate_suggestions(&input, Uuid::new_v4())
            .await
            .unwrap();

        let prompt = provider.last_user_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("- Education: Not specified"));
        assert!(prompt.contains("- Goals: Not specified"));
    }

    #[tokio::test]
    async fn test_non_json_content_is_malformed_and_not_persisted() {
        let provider = ScriptedProvider::replying("Sure! Here are some career ideas for you.");
        let store = Arc::new(MemoryAssessmentStore::default());

        let err = orchestrator(provider, store.clone())
            .generate_suggestions(&scenario_input(), Uuid::new_v4())
            .await
            .unwrap_err();

        match err {
            SuggestionError::MalformedSuggestion(malformed) => {
                assert!(!malformed.reason.contains("career ideas"));
            }
            other => panic!("expected MalformedSuggestion, got {other:?}"),
        }
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_carries_computed_suggestions() {
        let provider = ScriptedProvider::replying(WELL_FORMED);

        let err = orchestrator(provider.clone(), Arc::new(FailingStore))
            .generate_suggestions(&scenario_input(), Uuid::new_v4())
            .await
            .unwrap_err();

        match err {
            SuggestionError::Persistence {
                source,
                suggestions,
            } => {
                assert!(matches!(source, StoreError::Rejected { status: 503, .. }));
                assert_eq!(*suggestions, parse_suggestions(WELL_FORMED).unwrap());
            }
            other => panic!("expected Persistence, got {other:?}"),
        }
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_resubmission_appends_a_second_record() {
        let provider = ScriptedProvider::replying(WELL_FORMED);
        let store = Arc::new(MemoryAssessmentStore::default());
        let orchestrator = orchestrator(provider, store.clone());
        let user_id = Uuid::new_v4();

        orchestrator
            .generate_suggestions(&scenario_input(), user_id)
            .await
            .unwrap();
        orchestrator
            .generate_suggestions(&scenario_input(), user_id)
            .await
            .unwrap();

        let records = store.records();
        assert_eq!(records.len(), 2);
        assert_ne!(records[0].id, records[1].id);
        assert!(records.iter().all(|r| r.user_id == user_id));
    }
}
