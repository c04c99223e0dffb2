use serde::{Deserialize, Serialize};

/// Main configuration structure loaded from ootd.toml and environment variables
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub generation: GenerationConfig,
    pub image: ImageConfig,
    pub cache: CacheConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Text-generation settings for the backing provider
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// Default model for outfit reports and the passthrough endpoint
    pub report_model: String,
    /// Model used for the dynamic questionnaire (cheaper tier is fine)
    pub question_model: String,
    pub timeout_ms: u64,
    pub report_max_tokens: u32,
}

/// Image-synthesis settings, including the ordered provider chain
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageConfig {
    /// Providers tried strictly in this order; reordering is a data change
    pub providers: Vec<String>,
    pub width: u32,
    pub height: u32,
    pub hf_model: String,
    pub hf_timeout_ms: u64,
    pub fashn_timeout_ms: u64,
    /// Hard cap applied to URL-embedded prompts
    pub prompt_max_chars: usize,
}

/// Report memoization settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    pub max_entries: usize,
    /// Seconds before a cached report goes stale; 0 means session-lifetime
    pub ttl_secs: u64,
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub google_api_key: Option<String>,
    pub hugging_face_api_key: Option<String>,
    pub fashn_api_key: Option<String>,
    pub http_bind: std::net::SocketAddr,
    pub bearer_token: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            google_api_key: None,
            hugging_face_api_key: None,
            fashn_api_key: None,
            http_bind: "127.0.0.1:8790"
                .parse()
                .expect("default bind address should parse"),
            bearer_token: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            generation: GenerationConfig {
                report_model: "gemini-2.5-pro".to_string(),
                question_model: "gemini-2.5-flash".to_string(),
                timeout_ms: 60_000,
                report_max_tokens: 1000,
            },
            image: ImageConfig {
                providers: vec!["huggingface".to_string(), "pollinations".to_string()],
                width: 512,
                height: 768,
                hf_model: "black-forest-labs/FLUX.1-schnell".to_string(),
                hf_timeout_ms: 45_000,
                fashn_timeout_ms: 30_000,
                prompt_max_chars: 280,
            },
            cache: CacheConfig {
                max_entries: 256,
                ttl_secs: 0,
            },
            runtime: RuntimeConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables.
    /// Uses OOTD_CONFIG environment variable or defaults to "ootd.toml".
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(None)
    }

    /// Same as `load`, with an explicit path taking precedence over
    /// OOTD_CONFIG (used by the --config CLI flag)
    pub fn load_from(path: Option<&str>) -> anyhow::Result<Self> {
        // Load environment variables with smart fallbacks:
        // 1) OOTD_ENV_FILE if set
        // 2) ./.env
        if let Ok(env_path) = std::env::var("OOTD_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::from_path(".env");
        }

        let config_path = path.map(str::to_string).unwrap_or_else(|| {
            std::env::var("OOTD_CONFIG").unwrap_or_else(|_| "ootd.toml".to_string())
        });

        let mut config: Config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            toml::from_str(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        // Apply env overrides for the generation section (env-first)
        if let Ok(model) = std::env::var("OOTD_REPORT_MODEL") {
            config.generation.report_model = model;
        }
        if let Ok(model) = std::env::var("OOTD_QUESTION_MODEL") {
            config.generation.question_model = model;
        }
        if let Ok(providers) = std::env::var("OOTD_IMAGE_PROVIDERS") {
            config.image.providers = providers
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
        }

        config.runtime = RuntimeConfig::load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration, clamping recoverable values and warning loudly
    pub fn validate(&mut self) -> anyhow::Result<()> {
        for provider in &self.image.providers {
            match provider.as_str() {
                "huggingface" | "pollinations" | "fashn" => {}
                other => {
                    anyhow::bail!("Unknown image provider '{}' in config", other);
                }
            }
        }
        if self.image.providers.is_empty() {
            anyhow::bail!("Image provider list must not be empty");
        }

        if self.image.prompt_max_chars == 0 || self.image.prompt_max_chars > 1000 {
            tracing::warn!(
                "prompt_max_chars {} out of range, clamping to 280",
                self.image.prompt_max_chars
            );
            self.image.prompt_max_chars = 280;
        }

        if self.cache.max_entries == 0 {
            tracing::warn!("cache.max_entries must be positive, clamping to 1");
            self.cache.max_entries = 1;
        }

        if self.generation.timeout_ms < 1_000 {
            tracing::warn!(
                "generation timeout {}ms is suspiciously low",
                self.generation.timeout_ms
            );
        }

        Ok(())
    }

    /// Whether a key-gated image provider is actually usable
    pub fn provider_configured(&self, provider: &str) -> bool {
        match provider {
            "huggingface" => self.runtime.hugging_face_api_key.is_some(),
            "fashn" => self.runtime.fashn_api_key.is_some(),
            // Pollinations is keyless
            "pollinations" => true,
            _ => false,
        }
    }
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        let is_placeholder = |s: &str| {
            let t = s.trim();
            t.is_empty()
                || t.contains("${")
                || t.eq_ignore_ascii_case("your-api-key-here")
                || t.eq_ignore_ascii_case("changeme")
        };
        let read_key = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|k| !is_placeholder(k))
        };

        let mut cfg = Self {
            google_api_key: read_key("GOOGLE_API_KEY"),
            hugging_face_api_key: read_key("HUGGING_FACE_API_KEY"),
            fashn_api_key: read_key("FASHN_API_KEY"),
            ..Self::default()
        };

        if let Ok(v) = std::env::var("OOTD_HTTP_BIND")
            && let Ok(bind) = v.parse::<std::net::SocketAddr>()
        {
            cfg.http_bind = bind;
        }
        cfg.bearer_token = std::env::var("OOTD_BEARER_TOKEN").ok().or_else(|| {
            // Fallback to ~/.ootd_token
            let home = std::env::var("HOME").ok()?;
            std::fs::read_to_string(format!("{}/.ootd_token", home))
                .ok()
                .map(|s| s.trim().to_string())
        });

        cfg
    }
}
