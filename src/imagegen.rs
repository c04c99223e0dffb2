//! Image synthesis orchestration: an ordered, fixed list of providers tried
//! strictly in sequence. The first success wins, a failing provider is never
//! retried, and exhausting the list is a real error surfaced to the caller;
//! no placeholder image is ever fabricated here.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{OotdError, Result, provider_http_error};
use crate::prompts::image_prompt;
use crate::types::{GeneratedImage, ImageService, OutfitReport, Profile};
use crate::utils::{clean_url_prompt, encode_url_component};

#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn service(&self) -> ImageService;

    /// One bounded attempt. Success requires a usable image reference;
    /// every error (timeout, non-2xx, missing key, malformed payload)
    /// advances the chain.
    async fn attempt(&self, prompt: &str, profile: &Profile) -> Result<GeneratedImage>;
}

// Hugging Face Inference API (keyed, hosted)
pub struct HuggingFaceProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    width: u32,
    height: u32,
    base_url: String,
}

#[derive(Serialize)]
struct HfParameters {
    // FLUX.1-schnell is tuned for 4 steps and ignores guidance
    num_inference_steps: u32,
    guidance_scale: f32,
    width: u32,
    height: u32,
}

#[derive(Serialize)]
struct HfRequest<'a> {
    inputs: &'a str,
    parameters: HfParameters,
}

impl HuggingFaceProvider {
    pub fn new(
        api_key: Option<String>,
        model: String,
        width: u32,
        height: u32,
        timeout_ms: u64,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| OotdError::Internal {
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            api_key,
            model,
            width,
            height,
            base_url: "https://api-inference.huggingface.co".to_string(),
        })
    }

}

#[async_trait]
impl ImageProvider for HuggingFaceProvider {
    fn service(&self) -> ImageService {
        ImageService::Huggingface
    }

    async fn attempt(&self, prompt: &str, _profile: &Profile) -> Result<GeneratedImage> {
        let api_key = self.api_key.as_ref().ok_or_else(|| OotdError::NotConfigured {
            message: "Hugging Face API key not configured".to_string(),
        })?;

        let body = HfRequest {
            inputs: prompt,
            parameters: HfParameters {
                num_inference_steps: 4,
                guidance_scale: 0.0,
                width: self.width,
                height: self.height,
            },
        };

        let url = format!("{}/models/{}", self.base_url, self.model);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
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
                "Hugging Face",
            ));
        }

        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Err(OotdError::Provider {
                message: "Hugging Face returned an empty image body".to_string(),
            });
        }
        let encoded = general_purpose::STANDARD.encode(&bytes);
        Ok(GeneratedImage {
            url: format!("data:image/png;base64,{}", encoded),
            service: ImageService::Huggingface,
            fallback_url: None,
        })
    }
}

// Pollinations.ai (keyless, URL-templated). The URL itself is the
// deliverable; no request is made to produce it.
pub struct PollinationsProvider {
    width: u32,
    height: u32,
    prompt_max_chars: usize,
}

impl PollinationsProvider {
    pub fn new(width: u32, height: u32, prompt_max_chars: usize) -> Self {
        Self {
            width,
            height,
            prompt_max_chars,
        }
    }

    fn image_url(&self, encoded_prompt: &str, seed: u64, model: &str) -> String {
        format!(
            "https://pollinations.ai/p/{}?width={}&height={}&seed={}&nologo=true&model={}",
            encoded_prompt, self.width, self.height, seed, model
        )
    }
}

#[async_trait]
impl ImageProvider for PollinationsProvider {
    fn service(&self) -> ImageService {
        ImageService::Pollinations
    }

    async fn attempt(&self, prompt: &str, _profile: &Profile) -> Result<GeneratedImage> {
        let cleaned = clean_url_prompt(prompt, self.prompt_max_chars);
        if cleaned.is_empty() {
            return Err(OotdError::InvalidParams {
                message: "Image prompt is empty after cleaning".to_string(),
            });
        }
        let encoded = encode_url_component(&cleaned);
        // Seed varies per attempt so retries render a fresh image
        let seed = (uuid::Uuid::new_v4().as_u128() % 1_000_000) as u64;

        Ok(GeneratedImage {
            url: self.image_url(&encoded, seed, "flux"),
            service: ImageService::Pollinations,
            fallback_url: Some(self.image_url(&encoded, seed, "turbo")),
        })
    }
}

// FASHN.ai (keyed, fashion-specific)
pub struct FashnProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    width: u32,
    height: u32,
    base_url: String,
}

#[derive(Serialize)]
struct FashnRequest {
    prompt: String,
    style: &'static str,
    gender: String,
    occasion: String,
    width: u32,
    height: u32,
}

#[derive(Deserialize)]
struct FashnResponse {
    image_url: Option<String>,
    url: Option<String>,
}

impl FashnProvider {
    pub fn new(api_key: Option<String>, width: u32, height: u32, timeout_ms: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| OotdError::Internal {
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            api_key,
            width,
            height,
            base_url: "https://api.fashn.ai".to_string(),
        })
    }
}

#[async_trait]
impl ImageProvider for FashnProvider {
    fn service(&self) -> ImageService {
        ImageService::Fashn
    }

    async fn attempt(&self, prompt: &str, profile: &Profile) -> Result<GeneratedImage> {
        let api_key = self.api_key.as_ref().ok_or_else(|| OotdError::NotConfigured {
            message: "FASHN.ai API key not configured".to_string(),
        })?;

        let body = FashnRequest {
            prompt: format!("fashion model wearing {}", prompt),
            style: "fashion_photography",
            gender: profile.gender.clone(),
            occasion: profile.occasion.clone(),
            width: self.width,
            height: self.height,
        };

        let url = format!("{}/v1/generate", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            return Err(provider_http_error(status.as_u16(), &body_text, "FASHN.ai"));
        }

        let parsed: FashnResponse = resp.json().await.map_err(|e| OotdError::Provider {
            message: format!("Failed to parse FASHN.ai response: {}", e),
        })?;
        let image_url = parsed
            .image_url
            .or(parsed.url)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| OotdError::Provider {
                message: "FASHN.ai response carried no image URL".to_string(),
            })?;

        Ok(GeneratedImage {
            url: image_url,
            service: ImageService::Fashn,
            fallback_url: None,
        })
    }
}

/// Orchestrator over the ordered provider chain. Attempts are strictly
/// sequential (cost control: never pay two providers for one image).
pub struct ImageSynthesizer {
    providers: Vec<Box<dyn ImageProvider>>,
}

impl ImageSynthesizer {
    pub fn new(providers: Vec<Box<dyn ImageProvider>>) -> Self {
        Self { providers }
    }

    /// Build the chain in the configured order with the configured keys
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut providers: Vec<Box<dyn ImageProvider>> = Vec::new();
        for name in &config.image.providers {
            match name.as_str() {
                "huggingface" => providers.push(Box::new(HuggingFaceProvider::new(
                    config.runtime.hugging_face_api_key.clone(),
                    config.image.hf_model.clone(),
                    config.image.width,
                    config.image.height,
                    config.image.hf_timeout_ms,
                )?)),
                "pollinations" => providers.push(Box::new(PollinationsProvider::new(
                    config.image.width,
                    config.image.height,
                    config.image.prompt_max_chars,
                ))),
                "fashn" => providers.push(Box::new(FashnProvider::new(
                    config.runtime.fashn_api_key.clone(),
                    config.image.width,
                    config.image.height,
                    config.image.fashn_timeout_ms,
                )?)),
                other => {
                    return Err(OotdError::Config {
                        message: format!("Unknown image provider '{}'", other),
                    });
                }
            }
        }
        Ok(Self::new(providers))
    }

    /// Try each provider in order and return the first success. Invoked on
    /// explicit user action only; the caller owns any repeat invocation.
    pub async fn synthesize(
        &self,
        report: &OutfitReport,
        profile: &Profile,
    ) -> Result<GeneratedImage> {
        let prompt = image_prompt(report, profile);
        let mut last_err: Option<OotdError> = None;

        for provider in &self.providers {
            let label = provider.service().label();
            match provider.attempt(&prompt, profile).await {
                Ok(image) => {
                    info!("Image synthesized via {}", label);
                    return Ok(image);
                }
                Err(err) => {
                    warn!("{} failed, moving to next provider: {}", label, err);
                    last_err = Some(err);
                }
            }
        }

        Err(OotdError::ImageChainExhausted {
            message: last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no providers in chain".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::sample_report;

    fn profile() -> Profile {
        Profile {
            gender: "male".into(),
            religion: "hindu".into(),
            occasion: "wedding".into(),
            time_of_day: "evening".into(),
        }
    }

    #[tokio::test]
    async fn unkeyed_hugging_face_fails_fast() {
        let provider = HuggingFaceProvider::new(None, "m".into(), 512, 768, 1000).unwrap();
        let err = provider.attempt("prompt", &profile()).await.unwrap_err();
        assert!(matches!(err, OotdError::NotConfigured { .. }));
    }

    #[tokio::test]
    async fn pollinations_builds_flux_url_with_turbo_fallback() {
        let provider = PollinationsProvider::new(512, 768, 280);
        let image = provider
            .attempt("fashion photography, silk kurta & dhoti!", &profile())
            .await
            .unwrap();
        assert!(image.url.starts_with("https://pollinations.ai/p/"));
        assert!(image.url.contains("model=flux"));
        assert!(image.url.contains("nologo=true"));
        assert!(image.url.contains("?width=512&height=768"));
        // Cleaned prompt leaves no raw specials in the path
        assert!(!image.url.contains('!'));
        let fallback = image.fallback_url.unwrap();
        assert!(fallback.contains("model=turbo"));
        // Same seed for both renderings
        let seed_of = |u: &str| {
            u.split("seed=")
                .nth(1)
                .and_then(|s| s.split('&').next())
                .unwrap()
                .to_string()
        };
        assert_eq!(seed_of(&image.url), seed_of(&fallback));
    }

    #[tokio::test]
    async fn empty_cleaned_prompt_is_rejected() {
        let provider = PollinationsProvider::new(512, 768, 280);
        let err = provider.attempt("!!!???", &profile()).await.unwrap_err();
        assert!(matches!(err, OotdError::InvalidParams { .. }));
    }

    #[tokio::test]
    async fn chain_exhaustion_reports_an_explicit_error() {
        // Both providers require keys and none are configured
        let synth = ImageSynthesizer::new(vec![
            Box::new(HuggingFaceProvider::new(None, "m".into(), 512, 768, 1000).unwrap()),
            Box::new(FashnProvider::new(None, 512, 768, 1000).unwrap()),
        ]);
        let err = synth
            .synthesize(&sample_report(), &profile())
            .await
            .unwrap_err();
        assert!(matches!(err, OotdError::ImageChainExhausted { .. }));
    }

    #[tokio::test]
    async fn first_success_short_circuits_the_chain() {
        let synth = ImageSynthesizer::new(vec![
            Box::new(HuggingFaceProvider::new(None, "m".into(), 512, 768, 1000).unwrap()),
            Box::new(PollinationsProvider::new(512, 768, 280)),
        ]);
        let image = synth
            .synthesize(&sample_report(), &profile())
            .await
            .unwrap();
        assert_eq!(image.service, ImageService::Pollinations);
    }
}
