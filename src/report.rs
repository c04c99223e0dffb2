//! Outfit report engine: one upstream call, presence/non-empty validation
//! over the 8 required keys, and sample substitution on any failure.
//! `headwear` is deliberately not in the required set; it stays optional
//! on the report type.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::client::{GenerateOptions, TextGenerator};
use crate::error::{OotdError, Result};
use crate::fallback::{Generated, or_sample};
use crate::prompts::{preference_lines, report_prompt};
use crate::types::{BudgetTiers, OutfitReport, StyleForm};
use crate::utils::strip_code_fences;

const REPORT_TEMPERATURE: f32 = 0.8;

const REQUIRED_FIELDS: &[&str] = &[
    "upperWear",
    "lowerWear",
    "footwear",
    "accessories",
    "colors",
    "stylingTips",
    "cultural",
    "budget",
];

pub struct OutfitReportEngine {
    generator: Arc<dyn TextGenerator>,
    model: String,
    max_tokens: u32,
}

impl OutfitReportEngine {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        model: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            generator,
            model: model.into(),
            max_tokens,
        }
    }

    /// Generate an outfit report, substituting the fixed sample on any
    /// failure. Re-invocation is always a fresh, independent generation;
    /// memoization is the caller's concern.
    pub async fn generate(&self, form: &StyleForm) -> Generated<OutfitReport> {
        let result = self.generate_raw(form).await;
        or_sample(result, sample_report(), "outfit report generation")
    }

    pub async fn generate_raw(&self, form: &StyleForm) -> Result<OutfitReport> {
        let preferences = preference_lines(&form.dynamic_questions, &form.dynamic_responses);
        let prompt = report_prompt(&form.profile, &preferences);

        let mut options = GenerateOptions::json(REPORT_TEMPERATURE);
        options.model = Some(self.model.clone());
        options.max_tokens = Some(self.max_tokens);

        let raw = self.generator.generate(&prompt, &options).await?;
        parse_and_validate(&raw)
    }
}

/// Parse the provider payload, require all 8 mandatory keys present and
/// non-empty, then deserialize (coercing numeric budget tiers to strings)
pub fn parse_and_validate(raw: &str) -> Result<OutfitReport> {
    let cleaned = strip_code_fences(raw);
    let value: Value = serde_json::from_str(&cleaned).map_err(|e| OotdError::Validation {
        message: format!("Report response is not valid JSON: {}", e),
    })?;

    for field in REQUIRED_FIELDS {
        let present = value.get(field).is_some_and(|v| !is_empty_value(v));
        if !present {
            return Err(OotdError::Validation {
                message: format!("Report response missing required field '{}'", field),
            });
        }
    }

    let report: OutfitReport =
        serde_json::from_value(value).map_err(|e| OotdError::Validation {
            message: format!("Report response has wrong field shapes: {}", e),
        })?;

    debug!("Accepted outfit report ({} accessories)", report.accessories.len());
    Ok(report)
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Fixed sample report substituted on any generation failure
pub fn sample_report() -> OutfitReport {
    OutfitReport {
        upper_wear: "A crisp white cotton kurta with intricate embroidery".to_string(),
        lower_wear: "Traditional silk dhoti pants in beige".to_string(),
        footwear: "Classic brown leather mojaris".to_string(),
        headwear: Some("Optional: A traditional turban in matching beige".to_string()),
        accessories: vec![
            "Gold-plated chain necklace".to_string(),
            "Traditional bracelet".to_string(),
            "Simple ring".to_string(),
        ],
        colors: vec!["White".to_string(), "Beige".to_string(), "Gold".to_string()],
        styling_tips: vec![
            "Keep the kurta well-ironed for a sharp look".to_string(),
            "Fold the dhoti properly for ease of movement".to_string(),
            "Match accessories with the occasion's formality".to_string(),
        ],
        cultural: vec![
            "Appropriate for traditional ceremonies".to_string(),
            "Respects religious customs".to_string(),
            "Suitable for formal gatherings".to_string(),
        ],
        budget: BudgetTiers {
            premium: "Designer boutique options".to_string(),
            moderate: "Local market alternatives".to_string(),
            budget: "Ready-made selections".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_report_value() -> Value {
        json!({
            "upperWear": "Emerald silk anarkali with zari work",
            "lowerWear": "Matching churidar",
            "footwear": "Gold embellished juttis",
            "headwear": "Sheer dupatta draped over the head",
            "accessories": ["Kundan earrings", "Gold bangles", "Potli bag"],
            "colors": ["Emerald", "Gold"],
            "stylingTips": ["Pin the dupatta at the shoulder"],
            "cultural": ["Modest cut appropriate for a temple ceremony"],
            "budget": {
                "premium": "INR 45,000+",
                "moderate": "INR 12,000 - 20,000",
                "budget": "INR 4,000 - 8,000"
            }
        })
    }

    #[test]
    fn complete_report_is_accepted() {
        let report = parse_and_validate(&full_report_value().to_string()).unwrap();
        assert_eq!(report.upper_wear, "Emerald silk anarkali with zari work");
        assert_eq!(report.headwear.as_deref(), Some("Sheer dupatta draped over the head"));
    }

    #[test]
    fn missing_headwear_still_passes() {
        let mut value = full_report_value();
        value.as_object_mut().unwrap().remove("headwear");
        assert!(parse_and_validate(&value.to_string()).is_ok());
    }

    #[test]
    fn missing_required_field_is_rejected() {
        for field in REQUIRED_FIELDS {
            let mut value = full_report_value();
            value.as_object_mut().unwrap().remove(*field);
            assert!(
                parse_and_validate(&value.to_string()).is_err(),
                "field {field} should be required"
            );
        }
    }

    #[test]
    fn empty_required_field_is_rejected() {
        let mut value = full_report_value();
        value["upperWear"] = json!("");
        assert!(parse_and_validate(&value.to_string()).is_err());

        let mut value = full_report_value();
        value["accessories"] = json!([]);
        assert!(parse_and_validate(&value.to_string()).is_err());
    }

    #[test]
    fn numeric_budget_values_pass_and_coerce() {
        let mut value = full_report_value();
        value["budget"]["premium"] = json!(45000);
        let report = parse_and_validate(&value.to_string()).unwrap();
        assert_eq!(report.budget.premium, "45000");
    }

    #[test]
    fn fenced_payload_is_cleaned_before_parsing() {
        let fenced = format!("```json\n{}\n```", full_report_value());
        assert!(parse_and_validate(&fenced).is_ok());
    }
}
