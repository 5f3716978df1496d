//! Newtype wrappers for domain identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a project key is not of the form `org/name`.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid project key {key:?}: expected exactly one '/' separating org and name")]
pub struct InvalidProjectKey {
    pub key: String,
}

/// A project identifier in `org/name` form.
///
/// The key doubles as the repository path on the forge and as the directory
/// name of the local mirror, so both segments must be non-empty and the key
/// must contain exactly one separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectKey {
    pub org: String,
    pub name: String,
}

impl ProjectKey {
    pub fn new(org: impl Into<String>, name: impl Into<String>) -> Self {
        ProjectKey {
            org: org.into(),
            name: name.into(),
        }
    }

    /// Parses an `org/name` string into a key.
    pub fn parse(key: &str) -> Result<Self, InvalidProjectKey> {
        match key.split('/').collect::<Vec<_>>().as_slice() {
            [org, name] if !org.is_empty() && !name.is_empty() => {
                Ok(ProjectKey::new(*org, *name))
            }
            _ => Err(InvalidProjectKey {
                key: key.to_string(),
            }),
        }
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.org, self.name)
    }
}
