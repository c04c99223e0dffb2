//! Prompt builders for the questionnaire, report, and image pipelines.
//! Each returns one complete prompt string; the engines own temperature
//! and format selection.

use crate::types::{DynamicQuestion, OutfitReport, Profile, ResponseSet};

/// Strict-schema prompt for the dynamic questionnaire. The schema text is
/// load-bearing: the validator downstream enforces exactly what is promised
/// here (5 questions, unique ids, '?' suffix, option counts, slider ranges).
pub fn questionnaire_prompt(profile: &Profile, previous_answers: &ResponseSet) -> String {
    let answers_json =
        serde_json::to_string(previous_answers).unwrap_or_else(|_| "{}".to_string());

    format!(
        r#"You are a fashion advisor API that generates questions about style preferences.

Client profile:
- Gender: {gender}
- Religion: {religion}
- Occasion: {occasion}
- Time of Day: {time_of_day}
Previous answers: {answers_json}

STRICT REQUIREMENTS:
1. Return EXACTLY 5 fashion-related questions
2. Response must be a JSON object with a "questions" array
3. Each question MUST follow the exact schema below
4. NO additional text or explanations - ONLY the JSON object
5. Questions must be relevant to fashion, style, and clothing preferences
6. Each ID must be unique and descriptive (e.g., "stylePreference", "colorChoice")
7. Options must have 3-5 choices for select/radio/multiple types
8. Slider min/max values must be between 1-10

REQUIRED JSON SCHEMA:
{{
  "questions": [
    {{
      "id": "string (required, unique)",
      "type": "select" | "radio" | "multiple" | "slider",
      "question": "string (required, must end with ?)",
      "options": ["string"] (required for select/radio/multiple, 3-5 options),
      "min": number (required for slider only),
      "max": number (required for slider only)
    }}
  ]
}}

VALIDATION RULES:
1. For type "select", "radio", or "multiple":
   - Must include "options" array
   - No "min" or "max" allowed
   - Options must be relevant to fashion

2. For type "slider":
   - Must include "min" and "max" numbers
   - No "options" array allowed
   - Values must be 1-10 range

3. All questions must:
   - Be fashion-related
   - End with a question mark
   - Be clearly worded
   - Have unique IDs

FOCUS AREAS:
- Style preferences
- Color choices
- Fit preferences
- Comfort priorities
- Fashion priorities

ANY DEVIATION FROM THIS SCHEMA WILL BE REJECTED."#,
        gender = profile.gender,
        religion = profile.religion,
        occasion = profile.occasion,
        time_of_day = profile.time_of_day,
    )
}

/// One "question: answer" line per answered dynamic question, for embedding
/// in the report prompt
pub fn preference_lines(questions: &[DynamicQuestion], responses: &ResponseSet) -> String {
    let lines: Vec<String> = questions
        .iter()
        .filter_map(|q| {
            responses
                .get(&q.id)
                .map(|answer| format!("- {}: {}", q.question, answer))
        })
        .collect();

    if lines.is_empty() {
        "No specific preferences provided".to_string()
    } else {
        lines.join("\n")
    }
}

/// Detailed stylist prompt producing the 9-key report JSON
pub fn report_prompt(profile: &Profile, preferences: &str) -> String {
    format!(
        r#"You are a highly knowledgeable fashion advisor specializing in cultural and religious clothing.

CLIENT PROFILE:
- Gender: {gender}
- Religion: {religion}
- Occasion: {occasion}
- Time of Day: {time_of_day}

CLIENT PREFERENCES:
{preferences}

TASK:
Create a detailed outfit recommendation that specifically:
1. Matches the religious and cultural context ({religion})
2. Is appropriate for the occasion ({occasion})
3. Considers the time of day ({time_of_day})
4. Incorporates the client's style preferences
5. Provides specific, actionable recommendations
6. CRITICAL: Design an outfit specifically for a {gender} person - all recommendations MUST be gender-appropriate

IMPORTANT:
- Be specific about fabrics, colors, and styles
- Include exact items rather than general suggestions
- Consider weather and practicality
- Respect religious modesty requirements if applicable
- Suggest both premium and budget-friendly options
- The outfit MUST be designed specifically for a {gender} individual

The response must be a valid JSON object with these exact keys:
{{
  "upperWear": "Detailed description of top/upper body wear appropriate for a {gender} person",
  "lowerWear": "Detailed description of bottom/lower body wear appropriate for a {gender} person",
  "footwear": "Specific footwear recommendation appropriate for a {gender} person",
  "headwear": "Head covering if culturally appropriate for a {gender} person",
  "accessories": ["List of 3-5 specific accessories appropriate for a {gender} person"],
  "colors": ["Primary colors used in the outfit"],
  "stylingTips": ["3-5 specific styling suggestions for a {gender} person"],
  "cultural": ["2-3 cultural considerations relevant to a {gender} person's outfit"],
  "budget": {{
    "premium": "High-end version in INR; STRING ONLY",
    "moderate": "Mid-range version in INR; STRING ONLY",
    "budget": "Affordable version in INR; STRING ONLY"
  }}
}}

Do not return the sample format - generate a unique recommendation based on the client's profile.
Remember that the client is a {gender} individual, so all recommendations must be appropriate for this gender."#,
        gender = profile.gender,
        religion = profile.religion,
        occasion = profile.occasion,
        time_of_day = profile.time_of_day,
    )
}

/// Single-line photography prompt for the image providers, built from the
/// generated report and the profile
pub fn image_prompt(report: &OutfitReport, profile: &Profile) -> String {
    let headwear = report
        .headwear
        .as_deref()
        .filter(|h| !h.is_empty() && *h != "None")
        .map(|h| format!(", {}", h))
        .unwrap_or_default();
    let outfit = format!(
        "{} person wearing {}, {}, {}{}",
        profile.gender, report.upper_wear, report.lower_wear, report.footwear, headwear
    );
    let style = format!(
        "{} colors, {} setting, {} lighting",
        report.colors.join(" and "),
        profile.occasion,
        profile.time_of_day
    );
    format!("fashion photography, {outfit}, {style}, high quality, detailed, professional")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnswerValue, QuestionKind};

    #[test]
    fn preference_lines_skip_unanswered_questions() {
        let questions = vec![
            DynamicQuestion {
                id: "style".into(),
                kind: QuestionKind::Radio,
                question: "What's your preferred style?".into(),
                options: Some(vec!["Classic".into(), "Modern".into(), "Trendy".into()]),
                min: None,
                max: None,
            },
            DynamicQuestion {
                id: "comfort".into(),
                kind: QuestionKind::Slider,
                question: "How important is comfort to you?".into(),
                options: None,
                min: Some(1.0),
                max: Some(10.0),
            },
        ];
        let mut responses = ResponseSet::new();
        responses.insert("style".into(), AnswerValue::Text("Classic".into()));

        let lines = preference_lines(&questions, &responses);
        assert!(lines.contains("preferred style?: Classic"));
        assert!(!lines.contains("comfort"));
    }

    #[test]
    fn empty_responses_get_placeholder() {
        let lines = preference_lines(&[], &ResponseSet::new());
        assert_eq!(lines, "No specific preferences provided");
    }

    #[test]
    fn image_prompt_omits_none_headwear() {
        let profile = Profile {
            gender: "male".into(),
            religion: "hindu".into(),
            occasion: "wedding".into(),
            time_of_day: "evening".into(),
        };
        let mut report = crate::report::sample_report();
        report.headwear = Some("None".into());
        let prompt = image_prompt(&report, &profile);
        assert!(prompt.starts_with("fashion photography, male person wearing"));
        assert!(!prompt.contains("None"));
        assert!(prompt.contains("wedding setting"));
        assert!(prompt.contains("evening lighting"));
    }
}
