//! Dynamic questionnaire engine: one upstream call, strict per-question
//! validation, and an all-or-nothing acceptance policy. Anything short of
//! exactly 5 valid questions yields the fixed sample set.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::client::{GenerateOptions, TextGenerator};
use crate::error::{OotdError, Result};
use crate::fallback::{Generated, or_sample};
use crate::prompts::questionnaire_prompt;
use crate::types::{DynamicQuestion, Profile, QuestionKind, ResponseSet};
use crate::utils::strip_code_fences;

const EXPECTED_QUESTIONS: usize = 5;
const QUESTION_TEMPERATURE: f32 = 0.7;

pub struct QuestionnaireEngine {
    generator: Arc<dyn TextGenerator>,
    model: String,
}

impl QuestionnaireEngine {
    pub fn new(generator: Arc<dyn TextGenerator>, model: impl Into<String>) -> Self {
        Self {
            generator,
            model: model.into(),
        }
    }

    /// Generate the follow-up questionnaire, substituting the sample set on
    /// any failure. Always returns exactly 5 questions.
    pub async fn generate(
        &self,
        profile: &Profile,
        previous_answers: &ResponseSet,
    ) -> Generated<Vec<DynamicQuestion>> {
        let result = self.generate_raw(profile, previous_answers).await;
        or_sample(result, sample_questions(), "dynamic question generation")
    }

    /// Raw generation: call the provider once and validate strictly.
    /// Exposed so the acceptance policy can be tested apart from the
    /// substitution policy.
    pub async fn generate_raw(
        &self,
        profile: &Profile,
        previous_answers: &ResponseSet,
    ) -> Result<Vec<DynamicQuestion>> {
        let prompt = questionnaire_prompt(profile, previous_answers);
        let mut options = GenerateOptions::json(QUESTION_TEMPERATURE);
        options.model = Some(self.model.clone());

        let raw = self.generator.generate(&prompt, &options).await?;
        parse_and_validate(&raw)
    }
}

/// Parse the provider payload and keep only schema-conforming questions;
/// accept the batch only when exactly 5 survive
pub fn parse_and_validate(raw: &str) -> Result<Vec<DynamicQuestion>> {
    let cleaned = strip_code_fences(raw);
    let parsed: Value = serde_json::from_str(&cleaned).map_err(|e| OotdError::Validation {
        message: format!("Questionnaire response is not valid JSON: {}", e),
    })?;

    let items = parsed
        .get("questions")
        .and_then(Value::as_array)
        .ok_or_else(|| OotdError::Validation {
            message: "Questionnaire response has no questions array".to_string(),
        })?;

    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut valid: Vec<DynamicQuestion> = Vec::with_capacity(items.len());
    for item in items {
        if let Some(question) = validate_question(item, &mut seen_ids) {
            valid.push(question);
        }
    }

    if valid.len() != EXPECTED_QUESTIONS {
        return Err(OotdError::Validation {
            message: format!(
                "Expected exactly {} valid questions, got {}",
                EXPECTED_QUESTIONS,
                valid.len()
            ),
        });
    }

    debug!("Accepted {} dynamic questions", valid.len());
    Ok(valid)
}

fn validate_question(item: &Value, seen_ids: &mut HashSet<String>) -> Option<DynamicQuestion> {
    // Unknown type strings fail deserialization and drop the element
    let question: DynamicQuestion = serde_json::from_value(item.clone()).ok()?;

    if question.id.is_empty() || !seen_ids.insert(question.id.clone()) {
        return None;
    }
    if !question.question.trim().ends_with('?') {
        return None;
    }

    if question.kind.is_slider() {
        let min = question.min?;
        let max = question.max?;
        if min < 1.0 || max > 10.0 || min >= max || question.options.is_some() {
            return None;
        }
    } else {
        let options = question.options.as_ref()?;
        if !(3..=5).contains(&options.len())
            || question.min.is_some()
            || question.max.is_some()
        {
            return None;
        }
    }

    Some(question)
}

/// Fixed sample questionnaire substituted on any generation failure
pub fn sample_questions() -> Vec<DynamicQuestion> {
    vec![
        DynamicQuestion {
            id: "weather".to_string(),
            kind: QuestionKind::Select,
            question: "What's the current weather like?".to_string(),
            options: Some(vec![
                "Sunny".to_string(),
                "Rainy".to_string(),
                "Cold".to_string(),
                "Hot".to_string(),
                "Moderate".to_string(),
            ]),
            min: None,
            max: None,
        },
        DynamicQuestion {
            id: "style".to_string(),
            kind: QuestionKind::Radio,
            question: "What's your preferred style?".to_string(),
            options: Some(vec![
                "Classic".to_string(),
                "Modern".to_string(),
                "Bohemian".to_string(),
                "Minimalist".to_string(),
                "Trendy".to_string(),
            ]),
            min: None,
            max: None,
        },
        DynamicQuestion {
            id: "comfort".to_string(),
            kind: QuestionKind::Slider,
            question: "How important is comfort to you? (1-5)".to_string(),
            options: None,
            min: Some(1.0),
            max: Some(5.0),
        },
        DynamicQuestion {
            id: "colors".to_string(),
            kind: QuestionKind::Multiple,
            question: "Select your preferred colors?".to_string(),
            options: Some(vec![
                "Warm".to_string(),
                "Cool".to_string(),
                "Neutral".to_string(),
                "Bright".to_string(),
                "Pastel".to_string(),
            ]),
            min: None,
            max: None,
        },
        DynamicQuestion {
            id: "budget".to_string(),
            kind: QuestionKind::Select,
            question: "What's your budget range?".to_string(),
            options: Some(vec![
                "Budget".to_string(),
                "Moderate".to_string(),
                "Premium".to_string(),
                "Luxury".to_string(),
            ]),
            min: None,
            max: None,
        },
    ]
}
