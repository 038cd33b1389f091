//! Raw TOML deserialization types.
//!
//! These structs mirror the TOML file shape and use `serde` defaults.
//! The `load` module converts them into the public `types` structs.

use serde::Deserialize;

// ── Top-level ────────────────────────────────────────────────────────────────

/// Raw TOML shape — serde target before resolution.
#[derive(Deserialize, Default)]
pub(super) struct RawConfig {
    #[serde(default)]
    pub server: RawServer,
    #[serde(default)]
    pub provider: RawProvider,
    #[serde(default)]
    pub knowledge: RawKnowledge,
    #[serde(default)]
    pub personas: Vec<RawPersona>,
}

#[derive(Deserialize)]
pub(super) struct RawServer {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_file: Option<String>,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for RawServer {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            log_level: default_log_level(),
            log_file: None,
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
pub(super) struct RawProvider {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_poll_timeout_seconds")]
    pub poll_timeout_seconds: u64,
}

impl Default for RawProvider {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            api_base_url: default_api_base_url(),
            timeout_seconds: default_timeout_seconds(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_timeout_seconds: default_poll_timeout_seconds(),
        }
    }
}

#[derive(Deserialize, Default)]
pub(super) struct RawKnowledge {
    #[serde(default)]
    pub vector_store_id: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct RawPersona {
    pub id: u32,
    pub display_name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub personality_brief: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub assistant_id: Option<String>,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

pub(super) fn default_bind() -> String { "127.0.0.1:8000".to_string() }
pub(super) fn default_log_level() -> String { "info".to_string() }
pub(super) fn default_backend() -> String { "openai".to_string() }
pub(super) fn default_api_base_url() -> String { "https://api.openai.com/v1".to_string() }
pub(super) fn default_timeout_seconds() -> u64 { 30 }
pub(super) fn default_poll_interval_ms() -> u64 { 250 }
pub(super) fn default_poll_timeout_seconds() -> u64 { 30 }
pub(super) fn default_model() -> String { "gpt-4o-mini".to_string() }
