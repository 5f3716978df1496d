//! Typed configuration schema.
//!
//! The configuration is a TOML document with one distinguished `[service]`
//! table and one table per mirrored project, keyed by `"org/name"`:
//!
//! ```toml
//! [service]
//! listen_address = "127.0.0.1"
//! listen_port = 8080
//! cache_dir = "/var/cache/forge-mirror"
//! token = "ghp_..."
//!
//! ["acme/widget"]
//! source = "https://example.com/widget.git"
//! homepage = "https://example.com/widget"
//! ```
//!
//! Validation is eager: a missing `[service]` table or a malformed project
//! key fails [`MirrorConfig::load`] rather than surfacing at first use.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::types::{InvalidProjectKey, ProjectKey};

/// Errors raised while loading configuration. All are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Could not read the configuration file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid TOML or does not match the schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The distinguished `[service]` table is absent.
    #[error("config is missing the [service] table")]
    MissingService,

    /// A project table's name is not of the form `org/name`.
    #[error(transparent)]
    InvalidProjectKey(#[from] InvalidProjectKey),
}

/// Service-wide settings from the `[service]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSettings {
    /// Address the trigger listener binds to.
    pub listen_address: String,

    /// Port the trigger listener binds to.
    pub listen_port: u16,

    /// Root directory for local mirror clones.
    pub cache_dir: PathBuf,

    /// Forge bearer token used for metadata reconciliation.
    pub token: String,
}

/// One project table from the configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectEntry {
    /// Upstream location, used for the mirror clone and fetches.
    pub source: String,

    /// Free-text homepage published as forge metadata.
    #[serde(default)]
    pub homepage: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    service: Option<ServiceSettings>,

    #[serde(flatten)]
    projects: BTreeMap<String, ProjectEntry>,
}

/// Validated configuration: service settings plus the project tables.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    pub service: ServiceSettings,
    pub projects: BTreeMap<ProjectKey, ProjectEntry>,
}

impl MirrorConfig {
    /// Reads and validates the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parses and validates a configuration document.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text)?;
        let service = raw.service.ok_or(ConfigError::MissingService)?;

        let mut projects = BTreeMap::new();
        for (key, entry) in raw.projects {
            projects.insert(ProjectKey::parse(&key)?, entry);
        }

        Ok(MirrorConfig { service, projects })
    }
}
