pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod fallback;
pub mod http;
pub mod imagegen;
pub mod prompts;
pub mod questionnaire;
pub mod report;
pub mod types;
pub mod utils;

// Load env from a simple, standardized location resolution.
// This uses dotenvy::dotenv().ok() which loads .env if present and silently ignores if missing.
pub fn load_env() {
    let _ = dotenvy::dotenv();
}
