//! # osign-config
//!
//! TOML-driven configuration for the OSIGN signing engine.
//!
//! The configuration is loaded once and passed explicitly to the engine,
//! the notification gateway and the document renderer at construction.
//!
//! ```rust,ignore
//! use std::path::Path;
//! use osign_config::EngineConfig;
//!
//! let config = EngineConfig::from_file(Path::new("osign.toml"))?;
//! ```

pub mod config;

pub use config::{
    AssemblyConfig, EngineConfig, NotificationConfig, SigningConfig, StorageConfig,
    MIN_LINE_WIDTH,
};

// ── Tests ─────────────────────────────────────────────────────────────────────
