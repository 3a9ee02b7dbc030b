use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Self-reported experience band from the assessment form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl ExperienceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Beginner => "beginner",
            ExperienceLevel::Intermediate => "intermediate",
            ExperienceLevel::Advanced => "advanced",
        }
    }
}

impl FromStr for ExperienceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(ExperienceLevel::Beginner),
            "intermediate" => Ok(ExperienceLevel::Intermediate),
            "advanced" => Ok(ExperienceLevel::Advanced),
            other => Err(format!(
                "unknown experience level '{other}' (expected beginner, intermediate or advanced)"
            )),
        }
    }
}

/// A profile snapshot submitted from the assessment form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentInput {
    #[serde(default, deserialize_with = "list_or_csv")]
    pub skills: Vec<String>,
    #[serde(default, deserialize_with = "list_or_csv")]
    pub interests: Vec<String>,
    #[serde(default, deserialize_with = "blank_level_as_none")]
    pub experience_level: Option<ExperienceLevel>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub education: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub goals: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub linkedin_url: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub github_url: Option<String>,
}

/// Structured career guidance returned by the inference provider.
///
/// Every field is required on deserialization; unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionResult {
    pub career_path: String,
    pub skill_recommendations: Vec<String>,
    /// Sequential steps. Order is meaningful.
    pub learning_roadmap: Vec<String>,
    pub internship_matches: Vec<String>,
    pub resume_tips: Vec<String>,
}

/// A stored assessment together with the suggestions it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub experience_level: Option<ExperienceLevel>,
    pub education: String,
    pub goals: String,
    pub ai_suggestions: SuggestionResult,
    pub created_at: DateTime<Utc>,
}

/// Row shape of `user_assessments` as read through sqlx.
#[derive(Debug, Clone, FromRow)]
pub struct AssessmentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub experience_level: Option<String>,
    pub education: String,
    pub goals: String,
    pub ai_suggestions: Json<SuggestionResult>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AssessmentRow> for AssessmentRecord {
    type Error = String;

    fn try_from(row: AssessmentRow) -> Result<Self, Self::Error> {
        let experience_level = match row.experience_level.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(level) => Some(level.parse()?),
        };

        Ok(AssessmentRecord {
            id: row.id,
            user_id: row.user_id,
            skills: row.skills,
            interests: row.interests,
            experience_level,
            education: row.education,
            goals: row.goals,
            ai_suggestions: row.ai_suggestions.0,
            created_at: row.created_at,
        })
    }
}

/// Splits a comma-separated form value into trimmed, non-empty entries.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListOrCsv {
    List(Vec<String>),
    Csv(String),
}

/// Accepts either `["a", "b"]` or `"a, b"`; both come out trimmed without empty entries.
fn list_or_csv<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<ListOrCsv>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(ListOrCsv::Csv(raw)) => split_list(&raw),
        Some(ListOrCsv::List(items)) => items
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
    })
}

/// The form sends `null` for fields the user never touched.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

fn blank_level_as_none<'de, D>(deserializer: D) -> Result<Option<ExperienceLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    blank_as_none(deserializer)?
        .map(|s| s.parse().map_err(de::Error::custom))
        .transpose()
}
