//! Configuration loading with env-var overrides.
//!
//! Reads TOML files, supports `[meta] base = "..."` inheritance chains,
//! applies environment overrides and validates the result.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::AppError;

use super::raw::RawConfig;
use super::types::*;

/// Deep-merge two TOML values.
/// Tables are merged recursively — the overlay only needs to specify keys that
/// differ from the base. Any other value (including the `personas` array)
/// replaces the base value wholesale.
fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_tbl), toml::Value::Table(overlay_tbl)) => {
            for (key, ov_val) in overlay_tbl {
                let merged = match base_tbl.remove(&key) {
                    Some(base_val) => merge_toml(base_val, ov_val),
                    None => ov_val,
                };
                base_tbl.insert(key, merged);
            }
            toml::Value::Table(base_tbl)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file, follow any `[meta] base = "..."` chain, and return the
/// merged value. `visited` holds canonical paths already seen so cycles fail.
fn load_raw_merged(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<toml::Value, AppError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(canonical) {
        return Err(AppError::Config(format!(
            "circular base reference detected at: {}",
            path.display()
        )));
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let overlay_val: toml::Value = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let base_ref = overlay_val
        .get("meta")
        .and_then(|m| m.get("base"))
        .and_then(|b| b.as_str())
        .map(str::to_owned);

    match base_ref {
        Some(base_str) => {
            let base_path = if Path::new(&base_str).is_absolute() {
                PathBuf::from(base_str)
            } else {
                path.parent().unwrap_or(Path::new(".")).join(base_str)
            };
            let base_val = load_raw_merged(&base_path, visited)?;
            Ok(merge_toml(base_val, overlay_val))
        }
        None => Ok(overlay_val),
    }
}

/// Load config from the given path, or `config/default.toml`, then apply
/// environment overrides. With no path and no default file, built-in defaults
/// are used (personas fall back to the presets).
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let overrides = Overrides::from_env();

    if let Some(path) = config_path {
        return load_from(Path::new(path), &overrides);
    }

    let default_path = Path::new("config/default.toml");
    if default_path.exists() {
        load_from(default_path, &overrides)
    } else {
        resolve(RawConfig::default(), &overrides)
    }
}

/// Load one file (plus its base chain) with explicit overrides.
pub fn load_from(path: &Path, overrides: &Overrides) -> Result<Config, AppError> {
    let merged = load_raw_merged(path, &mut HashSet::new())?;

    let parsed = RawConfig::deserialize(merged).map_err(|e: toml::de::Error| {
        AppError::Config(format!("config error in {}: {e}", path.display()))
    })?;

    resolve(parsed, overrides)
}

fn resolve(parsed: RawConfig, overrides: &Overrides) -> Result<Config, AppError> {
    let s = parsed.server;
    let p = parsed.provider;

    let backend = ProviderBackend::parse(&p.backend).ok_or_else(|| {
        AppError::Config(format!(
            "unknown provider backend '{}' (expected \"openai\" or \"scripted\")",
            p.backend
        ))
    })?;

    if p.poll_interval_ms == 0 {
        return Err(AppError::Config("provider.poll_interval_ms must be > 0".into()));
    }
    if p.poll_timeout_seconds == 0 {
        return Err(AppError::Config("provider.poll_timeout_seconds must be > 0".into()));
    }

    let log_level = overrides.log_level.clone().unwrap_or(s.log_level);
    // Full filter directives are checked when the logger starts.
    if !log_level.contains(['=', ',']) {
        crate::logger::parse_level(&log_level).map_err(|e| AppError::Config(e.to_string()))?;
    }

    let allowed_origins = match overrides.allowed_origins.as_deref() {
        Some(list) => split_origins(list),
        None => s.allowed_origins,
    };

    let vector_store_id = overrides
        .vector_store_id
        .clone()
        .or(parsed.knowledge.vector_store_id)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            AppError::Config(
                "shared vector store id is not configured \
                 (set SHARED_VECTOR_STORE_ID or [knowledge] vector_store_id)"
                    .into(),
            )
        })?;

    let api_key = overrides.api_key.clone();
    if backend == ProviderBackend::OpenAi && api_key.is_none() {
        return Err(AppError::Config(
            "OPENAI_API_KEY is not set (required by the openai backend)".into(),
        ));
    }

    let personas = parsed
        .personas
        .into_iter()
        .map(|r| PersonaConfig {
            id: r.id,
            display_name: r.display_name,
            role: r.role,
            personality_brief: r.personality_brief,
            instructions: r.instructions,
            model: r.model,
            assistant_id: r.assistant_id,
        })
        .collect();

    Ok(Config {
        server: ServerConfig {
            bind: overrides.bind.clone().unwrap_or(s.bind),
            log_level,
            log_file: s.log_file.as_deref().map(expand_home),
            allowed_origins,
        },
        provider: ProviderConfig {
            backend,
            api_base_url: p.api_base_url.trim_end_matches('/').to_string(),
            timeout_seconds: p.timeout_seconds,
            poll_interval_ms: p.poll_interval_ms,
            poll_timeout_seconds: p.poll_timeout_seconds,
        },
        knowledge: KnowledgeConfig { vector_store_id },
        personas,
        api_key,
    })
}

/// Split a comma-separated origin list, dropping blanks.
fn split_origins(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overlays_nested_tables() {
        let base: toml::Value = toml::from_str("[server]\nbind = \"a\"\nlog_level = \"info\"").unwrap();
        let overlay: toml::Value = toml::from_str("[server]\nlog_level = \"debug\"").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["server"]["bind"].as_str(), Some("a"));
        assert_eq!(merged["server"]["log_level"].as_str(), Some("debug"));
    }

    #[test]
    fn split_origins_trims_and_drops_blanks() {
        assert_eq!(
            split_origins(" http://a.test , ,http://b.test"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }

    #[test]
    fn expand_home_leaves_plain_paths() {
        assert_eq!(expand_home("/var/log/relay.log"), PathBuf::from("/var/log/relay.log"));
        assert_eq!(expand_home("relay.log"), PathBuf::from("relay.log"));
    }
}
