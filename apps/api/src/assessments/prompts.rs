// Career suggestion prompt templates.

use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;
use crate::models::assessment::AssessmentInput;

pub const NOT_SPECIFIED: &str = "Not specified";
pub const NOT_PROVIDED: &str = "Not provided";

pub const SUGGESTION_SYSTEM: &str = r#"You are an expert career counselor and AI advisor. Based on the user's profile, provide personalized career guidance in the following JSON format:
{
  "careerPath": "A detailed career path recommendation (2-3 sentences)",
  "skillRecommendations": ["skill1", "skill2", "skill3", "skill4"],
  "learningRoadmap": ["step1", "step2", "step3", "step4"],
  "internshipMatches": ["Match reasoning 1", "Match reasoning 2"],
  "resumeTips": ["tip1", "tip2", "tip3"]
}
learningRoadmap steps must be listed in the order they should be taken."#;

/// Full system instruction sent with every suggestion request.
pub fn system_prompt() -> String {
    format!("{SUGGESTION_SYSTEM}\n{JSON_ONLY_INSTRUCTION}")
}

/// Renders the user's profile into the user message.
///
/// Output depends only on `input`; empty fields get a fixed placeholder so the
/// prompt never carries blank values.
pub fn build_user_prompt(input: &AssessmentInput) -> String {
    let experience = input
        .experience_level
        .map(|level| level.as_str())
        .unwrap_or(NOT_SPECIFIED);

    format!(
        "User Profile:\n\
         - Skills: {}\n\
         - Interests: {}\n\
         - Experience Level: {}\n\
         - Education: {}\n\
         - Goals: {}\n\
         - LinkedIn: {}\n\
         - GitHub: {}",
        list_or_placeholder(&input.skills),
        list_or_placeholder(&input.interests),
        experience,
        text_or(&input.education, NOT_SPECIFIED),
        text_or(&input.goals, NOT_SPECIFIED),
        input
            .linkedin_url
            .as_deref()
            .map_or(NOT_PROVIDED, |url| text_or(url, NOT_PROVIDED)),
        input
            .github_url
            .as_deref()
            .map_or(NOT_PROVIDED, |url| text_or(url, NOT_PROVIDED)),
    )
}

fn list_or_placeholder(items: &[String]) -> String {
    let joined = items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        joined
    }
}

fn text_or<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        placeholder
    } else {
        trimmed
    }
}
