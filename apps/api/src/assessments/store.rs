//! Assessment persistence — append-only `user_assessments` storage.
//!
//! Two backends share the `AssessmentStore` trait:
//! - `PgAssessmentStore`: direct PostgreSQL via sqlx.
//! - `PostgrestAssessmentStore`: a hosted PostgREST endpoint (the BaaS deployment).
//!
//! Neither backend ever updates or deletes a row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::assessment::{
    AssessmentInput, AssessmentRecord, AssessmentRow, ExperienceLevel, SuggestionResult,
};

const TABLE: &str = "user_assessments";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store rejected request (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Store returned an unreadable row: {0}")]
    Corrupt(String),
}

/// A record about to be written. `id` and `created_at` are assigned by the store.
#[derive(Debug, Clone, Serialize)]
pub struct NewAssessment {
    pub user_id: Uuid,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub experience_level: Option<ExperienceLevel>,
    pub education: String,
    pub goals: String,
    pub ai_suggestions: SuggestionResult,
}

impl NewAssessment {
    pub fn new(user_id: Uuid, input: &AssessmentInput, suggestions: &SuggestionResult) -> Self {
        Self {
            user_id,
            skills: input.skills.clone(),
            interests: input.interests.clone(),
            experience_level: input.experience_level,
            education: input.education.clone(),
            goals: input.goals.clone(),
            ai_suggestions: suggestions.clone(),
        }
    }

    /// The record as written, given the columns the store assigns.
    fn into_record(self, id: Uuid, created_at: DateTime<Utc>) -> AssessmentRecord {
        AssessmentRecord {
            id,
            user_id: self.user_id,
            skills: self.skills,
            interests: self.interests,
            experience_level: self.experience_level,
            education: self.education,
            goals: self.goals,
            ai_suggestions: self.ai_suggestions,
            created_at,
        }
    }
}

/// Storage seam for assessments. Carried in `AppState` as `Arc<dyn AssessmentStore>`.
#[async_trait]
pub trait AssessmentStore: Send + Sync {
    /// Appends one record. Never overwrites an earlier one.
    async fn insert(&self, assessment: &NewAssessment) -> Result<AssessmentRecord, StoreError>;

    /// Most recent record for the user, if any.
    async fn latest(&self, user_id: Uuid) -> Result<Option<AssessmentRecord>, StoreError>;

    /// Every record for the user, newest first.
    async fn history(&self, user_id: Uuid) -> Result<Vec<AssessmentRecord>, StoreError>;
}

// ────────────────────────────────────────────────────────────────────────────
// PostgreSQL
// ────────────────────────────────────────────────────────────────────────────

pub struct PgAssessmentStore {
    pool: PgPool,
}

impl PgAssessmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssessmentStore for PgAssessmentStore {
    async fn insert(&self, assessment: &NewAssessment) -> Result<AssessmentRecord, StoreError> {
        // Only the store-assigned columns come back, so a committed row is never reported as failed.
        let (id, created_at) = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            r#"
            INSERT INTO user_assessments
                (id, user_id, skills, interests, experience_level, education, goals,
                 ai_suggestions, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(assessment.user_id)
        .bind(&assessment.skills)
        .bind(&assessment.interests)
        .bind(assessment.experience_level.map(|level| level.as_str()))
        .bind(&assessment.education)
        .bind(&assessment.goals)
        .bind(sqlx::types::Json(&assessment.ai_suggestions))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        let record = assessment.clone().into_record(id, created_at);
        info!(
            "Inserted assessment {} for user {}",
            record.id, record.user_id
        );
        Ok(record)
    }

    async fn latest(&self, user_id: Uuid) -> Result<Option<AssessmentRecord>, StoreError> {
        sqlx::query_as::<_, AssessmentRow>(
            "SELECT * FROM user_assessments WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .map(|row| AssessmentRecord::try_from(row).map_err(StoreError::Corrupt))
        .transpose()
    }

    async fn history(&self, user_id: Uuid) -> Result<Vec<AssessmentRecord>, StoreError> {
        sqlx::query_as::<_, AssessmentRow>(
            "SELECT * FROM user_assessments WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| AssessmentRecord::try_from(row).map_err(StoreError::Corrupt))
        .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PostgREST
// ────────────────────────────────────────────────────────────────────────────

/// Talks to `{base_url}/rest/v1/user_assessments` with a service key.
pub struct PostgrestAssessmentStore {
    client: Client,
    table_url: String,
    api_key: String,
}

impl PostgrestAssessmentStore {
    pub fn new(client: Client, base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client,
            table_url: format!("{}/rest/v1/{TABLE}", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
        }
    }

    async fn select(
        &self,
        user_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<AssessmentRecord>, StoreError> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("user_id", format!("eq.{user_id}")),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }

        let response = self
            .client
            .get(&self.table_url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&query)
            .send()
            .await?;

        read_rows(response).await
    }
}

#[async_trait]
impl AssessmentStore for PostgrestAssessmentStore {
    async fn insert(&self, assessment: &NewAssessment) -> Result<AssessmentRecord, StoreError> {
        let response = self
            .client
            .post(&self.table_url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=representation")
            .json(assessment)
            .send()
            .await?;

        // Any 2xx means the row was written; only the echoed representation may be unusable.
        let body = accepted_body(response).await?;
        let record = match serde_json::from_str::<Vec<AssessmentRecord>>(&body) {
            Ok(rows) => rows.into_iter().next(),
            Err(e) => {
                warn!("Unreadable insert representation ({e}): {body}");
                None
            }
        }
        .unwrap_or_else(|| {
            warn!("Store accepted the assessment without echoing it back");
            assessment.clone().into_record(Uuid::new_v4(), Utc::now())
        });

        info!(
            "Inserted assessment {} for user {}",
            record.id, record.user_id
        );
        Ok(record)
    }

    async fn latest(&self, user_id: Uuid) -> Result<Option<AssessmentRecord>, StoreError> {
        Ok(self.select(user_id, Some(1)).await?.into_iter().next())
    }

    async fn history(&self, user_id: Uuid) -> Result<Vec<AssessmentRecord>, StoreError> {
        self.select(user_id, None).await
    }
}

async fn accepted_body(response: reqwest::Response) -> Result<String, StoreError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(StoreError::Rejected {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

async fn read_rows(response: reqwest::Response) -> Result<Vec<AssessmentRecord>, StoreError> {
    let body = accepted_body(response).await?;
    serde_json::from_str(&body).map_err(|e| StoreError::Corrupt(e.to_string()))
}
