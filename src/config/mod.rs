//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional TOML file (loader.rs)
//!     → environment + flags (cli.rs, clap)
//!     → validation.rs (semantic checks)
//!     → ScalerConfig (validated, immutable)
//!     → handed to the controller and server at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Durations use Go-style strings ("2m0s") to match existing manifests

pub mod cli;
pub mod duration;
pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use schema::ListenerConfig;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::OrchestratorConfig;
pub use schema::ScalerConfig;
pub use schema::ScalingConfig;
pub use schema::ShutdownConfig;
pub use schema::WorkloadConfig;
