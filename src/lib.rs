//! Persona relay — customer-persona chat agents in front of a hosted
//! Assistants API.
//!
//! The binary in `main.rs` wires these modules together; integration tests
//! drive [`http::build_router`] with the scripted provider.

pub mod bootstrap;
pub mod conversation;
pub mod core;
pub mod documents;
pub mod http;
pub mod personas;
pub mod provider;

pub use crate::core::{config, error};
pub use bootstrap::logger;
