//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory
//! (or the file given with `-f`), then applies `RELAY_BIND`,
//! `RELAY_LOG_LEVEL`, `SHARED_VECTOR_STORE_ID`, `ALLOWED_ORIGINS` and
//! `OPENAI_API_KEY` from the environment.
//!
//! # Module layout
//!
//! - **types** — Public configuration structs (`Config`, `ProviderConfig`, …).
//! - **raw** — Raw TOML deserialization types; kept private.
//! - **load** — `merge_toml`, `load_raw_merged`, `load`, `load_from`,
//!   `expand_home`.

mod load;
mod raw;
mod types;

pub use load::{expand_home, load, load_from};
pub use types::*;

#[cfg(test)]
impl Config {
    /// Safe `Config` for unit tests — scripted backend, no API key.
    pub fn test_default() -> Self {
        Self {
            server: ServerConfig {
                bind: raw::default_bind(),
                log_level: "info".into(),
                log_file: None,
                allowed_origins: Vec::new(),
            },
            provider: ProviderConfig {
                backend: ProviderBackend::Scripted,
                api_base_url: "http://localhost:0/v1".into(),
                timeout_seconds: 1,
                poll_interval_ms: 10,
                poll_timeout_seconds: 1,
            },
            knowledge: KnowledgeConfig {
                vector_store_id: "vs_test".into(),
            },
            personas: Vec::new(),
            api_key: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::io::Write;
    use std::path::Path;
    use tempfile::{NamedTempFile, TempDir};

    const MINIMAL_TOML: &str = r#"
[provider]
backend = "scripted"

[knowledge]
vector_store_id = "vs_shared"
"#;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parse_minimal_config_uses_defaults() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), &Overrides::default()).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:8000");
        assert_eq!(cfg.server.log_level, "info");
        assert_eq!(cfg.provider.backend, ProviderBackend::Scripted);
        assert_eq!(cfg.provider.api_base_url, "https://api.openai.com/v1");
        assert_eq!(cfg.provider.poll_interval_ms, 250);
        assert_eq!(cfg.provider.poll_timeout_seconds, 30);
        assert_eq!(cfg.knowledge.vector_store_id, "vs_shared");
        assert!(cfg.personas.is_empty());
        assert!(cfg.api_key.is_none());
    }

    #[test]
    fn openai_backend_requires_api_key() {
        let f = write_toml("[knowledge]\nvector_store_id = \"vs_1\"\n");
        let err = load_from(f.path(), &Overrides::default()).unwrap_err();
        assert!(matches!(err, AppError::Config(ref m) if m.contains("OPENAI_API_KEY")));

        let overrides = Overrides {
            api_key: Some("sk-test".into()),
            ..Overrides::default()
        };
        let cfg = load_from(f.path(), &overrides).unwrap();
        assert_eq!(cfg.provider.backend, ProviderBackend::OpenAi);
        assert_eq!(cfg.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn missing_vector_store_is_config_error() {
        let f = write_toml("[provider]\nbackend = \"scripted\"\n");
        let err = load_from(f.path(), &Overrides::default()).unwrap_err();
        assert!(matches!(err, AppError::Config(ref m) if m.contains("vector store")));
    }

    #[test]
    fn blank_vector_store_is_config_error() {
        let f = write_toml("[provider]\nbackend = \"scripted\"\n[knowledge]\nvector_store_id = \"  \"\n");
        assert!(load_from(f.path(), &Overrides::default()).is_err());
    }

    #[test]
    fn unknown_backend_rejected() {
        let f = write_toml("[provider]\nbackend = \"llama\"\n[knowledge]\nvector_store_id = \"vs\"\n");
        let err = load_from(f.path(), &Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("llama"));
    }

    #[test]
    fn unknown_log_level_rejected() {
        let f = write_toml(&format!("{MINIMAL_TOML}\n[server]\nlog_level = \"loud\"\n"));
        let err = load_from(f.path(), &Overrides::default()).unwrap_err();
        assert!(matches!(err, AppError::Config(ref m) if m.contains("loud")));

        let f = write_toml(&format!("{MINIMAL_TOML}\n[server]\nlog_level = \"persona_relay=debug,tower_http=info\"\n"));
        assert!(load_from(f.path(), &Overrides::default()).is_ok());
    }

    #[test]
    fn zero_poll_interval_rejected() {
        let f = write_toml(
            "[provider]\nbackend = \"scripted\"\npoll_interval_ms = 0\n[knowledge]\nvector_store_id = \"vs\"\n",
        );
        assert!(load_from(f.path(), &Overrides::default()).is_err());
    }

    #[test]
    fn overrides_win_over_file() {
        let f = write_toml(
            r#"
[server]
bind = "0.0.0.0:9000"
log_level = "warn"
allowed_origins = ["http://file.test"]

[provider]
backend = "scripted"

[knowledge]
vector_store_id = "vs_file"
"#,
        );
        let overrides = Overrides {
            bind: Some("127.0.0.1:7000".into()),
            log_level: Some("debug".into()),
            vector_store_id: Some("vs_env".into()),
            allowed_origins: Some("http://a.test,http://b.test".into()),
            api_key: None,
        };
        let cfg = load_from(f.path(), &overrides).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:7000");
        assert_eq!(cfg.server.log_level, "debug");
        assert_eq!(cfg.knowledge.vector_store_id, "vs_env");
        assert_eq!(cfg.server.allowed_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn personas_parsed_from_array_of_tables() {
        let f = write_toml(
            r#"
[provider]
backend = "scripted"

[knowledge]
vector_store_id = "vs"

[[personas]]
id = 1
display_name = "Maya"
personality_brief = "Hurried salon owner"
assistant_id = "asst_maya"

[[personas]]
id = 2
display_name = "Patricia"
model = "gpt-4o"
"#,
        );
        let cfg = load_from(f.path(), &Overrides::default()).unwrap();
        assert_eq!(cfg.personas.len(), 2);
        assert_eq!(cfg.personas[0].assistant_id.as_deref(), Some("asst_maya"));
        assert_eq!(cfg.personas[0].model, "gpt-4o-mini");
        assert_eq!(cfg.personas[1].model, "gpt-4o");
        assert!(cfg.personas[1].assistant_id.is_none());
    }

    #[test]
    fn trailing_slash_trimmed_from_api_base() {
        let f = write_toml(
            "[provider]\nbackend = \"scripted\"\napi_base_url = \"http://proxy.test/v1/\"\n[knowledge]\nvector_store_id = \"vs\"\n",
        );
        let cfg = load_from(f.path(), &Overrides::default()).unwrap();
        assert_eq!(cfg.provider.api_base_url, "http://proxy.test/v1");
    }

    #[test]
    fn base_inheritance_merges_overlay() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("base.toml"), MINIMAL_TOML).unwrap();
        let overlay = dir.path().join("local.toml");
        std::fs::write(
            &overlay,
            "[meta]\nbase = \"base.toml\"\n\n[server]\nlog_level = \"trace\"\n",
        )
        .unwrap();

        let cfg = load_from(&overlay, &Overrides::default()).unwrap();
        assert_eq!(cfg.server.log_level, "trace");
        assert_eq!(cfg.knowledge.vector_store_id, "vs_shared");
    }

    #[test]
    fn circular_base_detected() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.toml");
        let b = dir.path().join("b.toml");
        std::fs::write(&a, "[meta]\nbase = \"b.toml\"\n").unwrap();
        std::fs::write(&b, "[meta]\nbase = \"a.toml\"\n").unwrap();
        let err = load_from(&a, &Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("circular"));
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = load_from(Path::new("/nonexistent/relay.toml"), &Overrides::default()).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn backend_names_round_trip() {
        for backend in [ProviderBackend::OpenAi, ProviderBackend::Scripted] {
            assert_eq!(ProviderBackend::parse(backend.as_str()), Some(backend));
        }
        assert_eq!(ProviderBackend::parse(" OpenAI "), Some(ProviderBackend::OpenAi));
    }
}
