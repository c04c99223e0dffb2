//! Data model for the generation pipelines: profile, dynamic questions,
//! outfit reports, and synthesized images. Field names follow the wire
//! contracts of the consuming UI (camelCase JSON).

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Static style profile collected by the first wizard step.
/// Immutable once submitted; both engines read it, neither mutates it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub gender: String,
    pub religion: String,
    pub occasion: String,
    pub time_of_day: String,
}

/// Input widget a dynamic question is rendered with
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Select,
    Radio,
    Slider,
    Multiple,
}

impl QuestionKind {
    pub fn is_slider(&self) -> bool {
        matches!(self, QuestionKind::Slider)
    }
}

/// A single AI-generated follow-up question.
/// Invariants (enforced by the questionnaire engine, not by construction):
/// unique id, text ends in '?', options present with 3-5 entries iff
/// non-slider, min/max in [1,10] with min < max iff slider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DynamicQuestion {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// An answer to one dynamic question; shape depends on the question kind
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Many(Vec<String>),
    Number(f64),
}

impl std::fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnswerValue::Text(s) => write!(f, "{}", s),
            AnswerValue::Many(items) => write!(f, "{}", items.join(", ")),
            AnswerValue::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Answers keyed by DynamicQuestion id, built incrementally by the UI
pub type ResponseSet = HashMap<String, AnswerValue>;

/// Everything the report engine needs: profile plus the answered questionnaire
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StyleForm {
    #[serde(flatten)]
    pub profile: Profile,
    #[serde(default)]
    pub dynamic_questions: Vec<DynamicQuestion>,
    #[serde(default)]
    pub dynamic_responses: ResponseSet,
}

/// Three-tier budget guidance; values are display strings.
/// Providers occasionally return bare numbers here despite the prompt;
/// those are coerced to their string form rather than rejected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BudgetTiers {
    #[serde(deserialize_with = "string_or_number")]
    pub premium: String,
    #[serde(deserialize_with = "string_or_number")]
    pub moderate: String,
    #[serde(deserialize_with = "string_or_number")]
    pub budget: String,
}

/// A complete outfit recommendation. `headwear` is optional by convention
/// and excluded from the required-field validation set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutfitReport {
    pub upper_wear: String,
    pub lower_wear: String,
    pub footwear: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headwear: Option<String>,
    pub accessories: Vec<String>,
    pub colors: Vec<String>,
    pub styling_tips: Vec<String>,
    pub cultural: Vec<String>,
    pub budget: BudgetTiers,
}

/// Identifies which provider produced a synthesized image
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageService {
    Huggingface,
    Pollinations,
    Fashn,
}

impl ImageService {
    /// Human-readable service label, matching what the UI displays
    pub fn label(&self) -> &'static str {
        match self {
            ImageService::Huggingface => "Hugging Face FLUX.1-schnell",
            ImageService::Pollinations => "Pollinations.ai",
            ImageService::Fashn => "FASHN.ai",
        }
    }
}

/// One synthesized outfit image. Ephemeral: produced per user action,
/// discarded on retry, never persisted by this crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    /// Either a data URI or a remote URL
    pub url: String,
    pub service: ImageService,
    /// Secondary same-provider rendering the client may substitute once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_url: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Text(s) => s,
        StringOrNumber::Int(n) => n.to_string(),
        StringOrNumber::Float(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_kind_round_trips_lowercase() {
        let q: DynamicQuestion = serde_json::from_value(serde_json::json!({
            "id": "stylePreference",
            "type": "select",
            "question": "What is your preferred fashion style?",
            "options": ["Casual", "Formal", "Bohemian"]
        }))
        .unwrap();
        assert_eq!(q.kind, QuestionKind::Select);
        let out = serde_json::to_value(&q).unwrap();
        assert_eq!(out["type"], "select");
        assert!(out.get("min").is_none());
    }

    #[test]
    fn numeric_budget_tiers_coerce_to_strings() {
        let tiers: BudgetTiers = serde_json::from_value(serde_json::json!({
            "premium": 15000,
            "moderate": "INR 5,000 - 8,000",
            "budget": 1999.5
        }))
        .unwrap();
        assert_eq!(tiers.premium, "15000");
        assert_eq!(tiers.moderate, "INR 5,000 - 8,000");
        assert_eq!(tiers.budget, "1999.5");
    }

    #[test]
    fn report_headwear_is_optional_on_the_wire() {
        let report: OutfitReport = serde_json::from_value(serde_json::json!({
            "upperWear": "Silk saree blouse",
            "lowerWear": "Banarasi silk saree",
            "footwear": "Embellished juttis",
            "accessories": ["Jhumka earrings", "Bangles", "Clutch"],
            "colors": ["Maroon", "Gold"],
            "stylingTips": ["Drape the pallu over the left shoulder"],
            "cultural": ["Appropriate for a Hindu wedding"],
            "budget": {"premium": "a", "moderate": "b", "budget": "c"}
        }))
        .unwrap();
        assert!(report.headwear.is_none());
    }

    #[test]
    fn answers_display_for_prompt_embedding() {
        assert_eq!(AnswerValue::Text("Rainy".into()).to_string(), "Rainy");
        assert_eq!(
            AnswerValue::Many(vec!["Warm".into(), "Neutral".into()]).to_string(),
            "Warm, Neutral"
        );
        assert_eq!(AnswerValue::Number(7.0).to_string(), "7");
    }
}
