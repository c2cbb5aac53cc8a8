//! attest-service — wires the core verification logic to its
//! collaborators: the feature-extraction engine thread, the persistence
//! backend, and session issuance.

pub mod config;
pub mod engine;
pub mod extract_cmd;
pub mod service;

pub use config::{Config, ConfigError};
pub use engine::{spawn_engine, EngineHandle};
pub use extract_cmd::CommandExtractor;
pub use service::{LoginSession, Service, ServiceError};
