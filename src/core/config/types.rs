//! Public configuration types.
//!
//! These are the resolved, ready-to-use structs the rest of the crate consumes.
//! Raw TOML deserialization types live in `raw.rs`.

use std::path::PathBuf;
use std::time::Duration;

// ── Server ───────────────────────────────────────────────────────────────────

/// HTTP listener and logging configuration (`[server]`).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address the axum listener binds to.
    pub bind: String,
    pub log_level: String,
    /// Optional log file (already expanded, no `~`). `None` logs to stderr.
    pub log_file: Option<PathBuf>,
    /// CORS origins. Empty or containing `"*"` allows any origin.
    pub allowed_origins: Vec<String>,
}

// ── Provider ─────────────────────────────────────────────────────────────────

/// Which Assistants API backend serves requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderBackend {
    /// Hosted OpenAI Assistants v2 API over HTTPS.
    OpenAi,
    /// In-process scripted backend; needs no credential or network.
    Scripted,
}

impl ProviderBackend {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "scripted" => Some(Self::Scripted),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Scripted => "scripted",
        }
    }
}

/// Provider connection and run-polling settings (`[provider]`).
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub backend: ProviderBackend,
    /// API root, e.g. `https://api.openai.com/v1`. Paths are appended to it.
    pub api_base_url: String,
    /// Per-request HTTP timeout for non-streaming calls.
    pub timeout_seconds: u64,
    /// Fixed delay between run-status polls.
    pub poll_interval_ms: u64,
    /// Hard ceiling on waiting for one run (and on stream idle gaps).
    pub poll_timeout_seconds: u64,
}

impl ProviderConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_seconds)
    }
}

// ── Knowledge ────────────────────────────────────────────────────────────────

/// The single provider-hosted vector store shared by every persona.
#[derive(Debug, Clone)]
pub struct KnowledgeConfig {
    pub vector_store_id: String,
}

// ── Personas ─────────────────────────────────────────────────────────────────

/// One `[[personas]]` entry as written in the config file.
///
/// Validation (unique ids, assistant id present) happens when the persona
/// registry is built, not here.
#[derive(Debug, Clone)]
pub struct PersonaConfig {
    pub id: u32,
    pub display_name: String,
    pub role: String,
    pub personality_brief: String,
    pub instructions: String,
    pub model: String,
    pub assistant_id: Option<String>,
}

// ── Top level ────────────────────────────────────────────────────────────────

/// Fully-resolved relay configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub knowledge: KnowledgeConfig,
    /// Empty means "use the built-in presets".
    pub personas: Vec<PersonaConfig>,
    /// Provider credential from `OPENAI_API_KEY`. Never sourced from TOML.
    pub api_key: Option<String>,
}

/// Values taken from the environment that override the file.
///
/// Tests construct this directly instead of mutating process env vars.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bind: Option<String>,
    pub log_level: Option<String>,
    pub vector_store_id: Option<String>,
    pub allowed_origins: Option<String>,
    pub api_key: Option<String>,
}

impl Overrides {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            bind: var("RELAY_BIND"),
            log_level: var("RELAY_LOG_LEVEL"),
            vector_store_id: var("SHARED_VECTOR_STORE_ID"),
            allowed_origins: var("ALLOWED_ORIGINS"),
            api_key: var("OPENAI_API_KEY"),
        }
    }
}
