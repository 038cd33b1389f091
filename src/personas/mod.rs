//! Persona registry.
//!
//! A persona is a simulated customer bound to one provider-side assistant.
//! The registry is built once at startup, validated, and then only read;
//! handlers share it behind an `Arc`.

mod preset;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::PersonaConfig;
use crate::error::{AppError, RelayError};

pub use preset::default_presets;

/// One configured customer persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Persona {
    pub id: u32,
    pub display_name: String,
    pub role: String,
    pub personality_brief: String,
    /// Prompt the assistant was created with. Informational only; the
    /// provider already holds it.
    #[serde(skip_serializing)]
    pub instructions: String,
    pub model: String,
    /// Opaque assistant handle owned by the provider.
    pub external_assistant_id: String,
}

/// Public listing shape for `GET /api/agents`.
#[derive(Debug, Clone, Serialize)]
pub struct PersonaSummary {
    pub id: u32,
    pub display_name: String,
    pub role: String,
    pub personality_brief: String,
}

impl From<&Persona> for PersonaSummary {
    fn from(p: &Persona) -> Self {
        Self {
            id: p.id,
            display_name: p.display_name.clone(),
            role: p.role.clone(),
            personality_brief: p.personality_brief.clone(),
        }
    }
}

/// Immutable id → persona table, iterated in ascending id order.
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    personas: BTreeMap<u32, Persona>,
}

impl PersonaRegistry {
    /// Validate and index `personas`.
    ///
    /// Rejects an empty table, duplicate ids, blank display names and blank
    /// assistant ids.
    pub fn new(personas: Vec<Persona>) -> Result<Self, AppError> {
        if personas.is_empty() {
            return Err(AppError::Config("persona table is empty".into()));
        }

        let mut table = BTreeMap::new();
        for persona in personas {
            if persona.display_name.trim().is_empty() {
                return Err(AppError::Config(format!(
                    "persona {} has an empty display_name",
                    persona.id
                )));
            }
            if persona.external_assistant_id.trim().is_empty() {
                return Err(AppError::Config(format!(
                    "persona {} has no assistant_id",
                    persona.id
                )));
            }
            let id = persona.id;
            if table.insert(id, persona).is_some() {
                return Err(AppError::Config(format!("duplicate persona id {id}")));
            }
        }

        Ok(Self { personas: table })
    }

    /// Build from `[[personas]]` entries, or from the built-in presets when
    /// the config supplies none.
    pub fn from_config(entries: &[PersonaConfig]) -> Result<Self, AppError> {
        if entries.is_empty() {
            return Self::new(default_presets());
        }

        let personas = entries
            .iter()
            .map(|e| {
                let assistant_id = e.assistant_id.clone().ok_or_else(|| {
                    AppError::Config(format!("persona {} has no assistant_id", e.id))
                })?;
                Ok(Persona {
                    id: e.id,
                    display_name: e.display_name.clone(),
                    role: e.role.clone(),
                    personality_brief: e.personality_brief.clone(),
                    instructions: e.instructions.clone(),
                    model: e.model.clone(),
                    external_assistant_id: assistant_id,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        Self::new(personas)
    }

    /// All personas, ascending by id.
    pub fn list(&self) -> impl Iterator<Item = &Persona> {
        self.personas.values()
    }

    pub fn get(&self, id: u32) -> Result<&Persona, RelayError> {
        self.personas.get(&id).ok_or_else(|| {
            RelayError::NotFound(format!(
                "agent {id} not found; valid agent ids are {}",
                self.id_range()
            ))
        })
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    fn id_range(&self) -> String {
        match (self.personas.keys().next(), self.personas.keys().next_back()) {
            (Some(lo), Some(hi)) if lo != hi => format!("{lo}-{hi}"),
            (Some(lo), _) => lo.to_string(),
            _ => "none".into(),
        }
    }
}
