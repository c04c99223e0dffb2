//! Text-generation client: one uniform request wrapper over the backing
//! provider. Engines depend on the `TextGenerator` trait so tests can swap
//! in a canned, no-network implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::config::GenerationConfig;
use crate::error::{OotdError, Result, provider_http_error};
use crate::utils::strip_code_fences;

/// Models accepted by the backing provider, first entry is never assumed;
/// unknown names fall back to the caller-supplied default
pub const AVAILABLE_MODELS: &[&str] = &[
    "gemini-2.0-flash",
    "gemini-2.5-flash",
    "gemini-2.5-pro",
    // Fallback models
    "gemini-1.5-pro",
    "gemini-1.5-flash",
];

/// Resolve a requested model name against the catalog.
/// The legacy "llama3" alias maps to the default; unrecognized names also
/// fall back to the default.
pub fn resolve_model(requested: Option<&str>, default: &str) -> String {
    match requested {
        Some("llama3") | None => default.to_string(),
        Some(name) if AVAILABLE_MODELS.contains(&name) => name.to_string(),
        Some(_) => default.to_string(),
    }
}

/// Per-call knobs; everything not set inherits the provider default
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub temperature: Option<f32>,
    /// "json" requests a bare-JSON response; the cleaned string is still
    /// returned as text and callers do their own schema interpretation
    pub format: Option<String>,
    pub max_tokens: Option<u32>,
    pub model: Option<String>,
}

impl GenerateOptions {
    pub fn json(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            format: Some("json".to_string()),
            ..Self::default()
        }
    }

    fn wants_json(&self) -> bool {
        self.format.as_deref() == Some("json")
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// One upstream call; no retries at this layer
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String>;
}

const JSON_SYSTEM_INSTRUCTION: &str = "You are a helpful assistant that responds only in \
     valid JSON format. Do not include any markdown formatting, code blocks, or explanatory \
     text. Return only the JSON object as requested.";

// Google Generative Language API implementation
pub struct GeminiClient {
    client: reqwest::Client,
    // Absent key surfaces as a per-call configuration error, so the engines
    // still serve their sample data instead of the process refusing to start
    api_key: Option<String>,
    default_model: String,
    base_url: String,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    text: String,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiResponseContent,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, generation: &GenerationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(generation.timeout_ms))
            .build()
            .map_err(|e| OotdError::Internal {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            default_model: generation.report_model.clone(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        })
    }

    pub fn from_config(config: &crate::config::Config) -> Result<Self> {
        Self::new(config.runtime.google_api_key.clone(), &config.generation)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(OotdError::InvalidParams {
                message: "Prompt cannot be empty".to_string(),
            });
        }
        let api_key = self.api_key.as_ref().ok_or_else(|| OotdError::NotConfigured {
            message: "GOOGLE_API_KEY is not set".to_string(),
        })?;

        let model = resolve_model(options.model.as_deref(), &self.default_model);
        debug!(
            "Generating text (model={}, json={}, chars={})",
            model,
            options.wants_json(),
            prompt.len()
        );

        let system_instruction = options.wants_json().then(|| GeminiContent {
            parts: vec![GeminiPart {
                text: JSON_SYSTEM_INSTRUCTION,
            }],
        });
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
            system_instruction,
            generation_config: GeminiGenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_tokens,
                response_mime_type: options.wants_json().then_some("application/json"),
            },
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            return Err(provider_http_error(
                status.as_u16(),
                &body_text,
                "text generation",
            ));
        }

        let parsed: GeminiResponse = resp.json().await.map_err(|e| OotdError::Provider {
            message: format!("Failed to parse provider response: {}", e),
        })?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| OotdError::Provider {
                message: "No candidates returned from text generation".to_string(),
            })?;

        if options.wants_json() {
            let cleaned = strip_code_fences(&text);
            serde_json::from_str::<serde_json::Value>(&cleaned).map_err(|_| {
                OotdError::Provider {
                    message: "Model returned invalid JSON despite json format".to_string(),
                }
            })?;
            return Ok(cleaned);
        }

        Ok(text.trim().to_string())
    }
}

// Deterministic, local canned generator for testing/dev (no network)
pub struct CannedGenerator {
    responses: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl CannedGenerator {
    /// Replays the given responses in order; the last one repeats
    pub fn new(responses: Vec<String>) -> Self {
        let mut rev = responses;
        rev.reverse();
        Self {
            responses: Mutex::new(rev),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn single(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(&self, prompt: &str, _options: &GenerateOptions) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(OotdError::InvalidParams {
                message: "Prompt cannot be empty".to_string(),
            });
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().expect("canned responses lock");
        let response = if responses.len() > 1 {
            responses.pop().unwrap()
        } else {
            responses
                .last()
                .cloned()
                .ok_or_else(|| OotdError::Provider {
                    message: "CannedGenerator has no responses".to_string(),
                })?
        };
        Ok(response)
    }
}
