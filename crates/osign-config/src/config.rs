//! Engine configuration schema.
//!
//! Every section and field has a default, so an empty document is a valid
//! configuration. Values are checked once at load time by
//! `EngineConfig::validate`.
//!
//! Example:
//! ```toml
//! [signing]
//! ip_lookup_timeout_ms = 1500
//!
//! [assembly]
//! issuer_name = "Acme Serviços"
//! line_width = 90
//!
//! [notifications]
//! sender_name = "Acme"
//! app_base_url = "https://sign.acme.example"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use osign_contracts::error::{OsignError, OsignResult};

/// Narrowest evidence page the layout will wrap to.
pub const MIN_LINE_WIDTH: usize = 20;

/// Settings for the signing protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Upper bound on the best-effort IP lookup.
    pub ip_lookup_timeout_ms: u64,
    /// Recorded as the signer's IP when the lookup is unavailable.
    pub ip_sentinel: String,
    /// Earliest accepted birth year.
    pub min_birth_year: i32,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            ip_lookup_timeout_ms: 3000,
            ip_sentinel: "unavailable".to_string(),
            min_birth_year: 1900,
        }
    }
}

/// Blob store layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Originals are stored at `<order_prefix>/<order id>/<file name>`.
    pub order_prefix: String,
    pub signed_url_ttl_secs: u64,
    /// Appended to the original path to locate the final artifact.
    pub final_suffix: String,
    /// Replaces the `.pdf` extension in the final artifact's display name.
    pub signed_name_suffix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            order_prefix: "orders".to_string(),
            signed_url_ttl_secs: 3600,
            final_suffix: ".final.pdf".to_string(),
            signed_name_suffix: "-assinado.pdf".to_string(),
        }
    }
}

/// Evidence page layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Printed in the evidence page header.
    pub issuer_name: String,
    /// Column budget for wrapped text.
    pub line_width: usize,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            issuer_name: "OSIGN".to_string(),
            line_width: 78,
        }
    }
}

/// Outbound email settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub sender_name: String,
    /// Signing links are `<app_base_url>/sign/<signer id>`.
    pub app_base_url: String,
    pub request_subject: String,
    pub reminder_subject: String,
    pub cancelled_subject: String,
    pub finalized_subject: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            sender_name: "OSIGN".to_string(),
            app_base_url: "http://localhost:8080".to_string(),
            request_subject: "Assinatura solicitada".to_string(),
            reminder_subject: "Lembrete: assinatura pendente".to_string(),
            cancelled_subject: "Ordem de serviço cancelada".to_string(),
            finalized_subject: "Documento assinado por todas as partes".to_string(),
        }
    }
}

/// The top-level structure deserialized from a TOML configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub signing: SigningConfig,
    pub storage: StorageConfig,
    pub assembly: AssemblyConfig,
    pub notifications: NotificationConfig,
}

impl EngineConfig {
    /// Parse `s` as TOML and validate the result.
    ///
    /// Returns `OsignError::Config` if the TOML is malformed, does not match
    /// the schema, or carries an out-of-range value.
    pub fn from_toml_str(s: &str) -> OsignResult<Self> {
        let config: EngineConfig = toml::from_str(s).map_err(|e| OsignError::Config {
            reason: format!("failed to parse engine TOML: {}", e),
        })?;
        config.validate()?;
        debug!(
            issuer = %config.assembly.issuer_name,
            line_width = config.assembly.line_width,
            "engine configuration loaded"
        );
        Ok(config)
    }

    /// Read the file at `path` and parse it as engine configuration.
    pub fn from_file(path: &Path) -> OsignResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| OsignError::Config {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> OsignResult<()> {
        if self.signing.ip_sentinel.trim().is_empty() {
            return Err(config_error("signing.ip_sentinel must not be empty"));
        }
        if self.signing.min_birth_year < 1800 {
            return Err(config_error("signing.min_birth_year must be 1800 or later"));
        }
        if self.storage.order_prefix.trim_matches('/').is_empty() {
            return Err(config_error("storage.order_prefix must not be empty"));
        }
        if self.storage.final_suffix.is_empty() {
            return Err(config_error("storage.final_suffix must not be empty"));
        }
        if self.storage.signed_name_suffix.is_empty() {
            return Err(config_error("storage.signed_name_suffix must not be empty"));
        }
        if self.storage.signed_url_ttl_secs == 0 {
            return Err(config_error("storage.signed_url_ttl_secs must be positive"));
        }
        if self.assembly.line_width < MIN_LINE_WIDTH {
            return Err(config_error(&format!(
                "assembly.line_width must be at least {}",
                MIN_LINE_WIDTH
            )));
        }
        Ok(())
    }
}

fn config_error(reason: &str) -> OsignError {
    OsignError::Config { reason: reason.to_string() }
}
