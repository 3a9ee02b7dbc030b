//! Axum route handlers for the Assessments API.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assessments::orchestrator::SuggestionError;
use crate::errors::AppError;
use crate::models::assessment::{AssessmentInput, AssessmentRecord, SuggestionResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateSuggestionsRequest {
    #[serde(alias = "userId")]
    pub user_id: Uuid,
    #[serde(alias = "assessmentData")]
    pub assessment: AssessmentInput,
}

#[derive(Debug, Serialize)]
pub struct GenerateSuggestionsResponse {
    pub suggestions: SuggestionResult,
}

#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

/// POST /api/v1/assessments/suggestions
///
/// Generates suggestions for one assessment and appends it to the user's history.
pub async fn handle_generate_suggestions(
    State(state): State<AppState>,
    request: Result<Json<GenerateSuggestionsRequest>, JsonRejection>,
) -> Result<Json<GenerateSuggestionsResponse>, AppError> {
    let Json(request) = request?;
    let suggestions = state
        .suggestions
        .generate_suggestions(&request.assessment, request.user_id)
        .await?;

    Ok(Json(GenerateSuggestionsResponse { suggestions }))
}

/// Refuses store reads while the store location or credential is absent.
fn require_store(state: &AppState) -> Result<(), AppError> {
    let missing = state.config.suggestions.missing_store();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SuggestionError::Configuration { missing }.into())
    }
}

/// GET /api/v1/assessments/latest
///
/// The most recent assessment is the one the dashboard shows.
pub async fn handle_latest_assessment(
    State(state): State<AppState>,
    params: Result<Query<UserIdQuery>, QueryRejection>,
) -> Result<Json<AssessmentRecord>, AppError> {
    let Query(params) = params?;
    require_store(&state)?;
    let record = state
        .store
        .latest(params.user_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("No assessment found for user {}", params.user_id))
        })?;
    Ok(Json(record))
}

/// GET /api/v1/assessments/history
pub async fn handle_assessment_history(
    State(state): State<AppState>,
    params: Result<Query<UserIdQuery>, QueryRejection>,
) -> Result<Json<Vec<AssessmentRecord>>, AppError> {
    let Query(params) = params?;
    require_store(&state)?;
    let history = state.store.history(params.user_id).await?;
    Ok(Json(history))
}
