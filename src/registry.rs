//! In-memory project registry.
//!
//! Built once at startup from a validated [`MirrorConfig`] and read-only for
//! the process lifetime. Safe for unsynchronized concurrent reads; sync
//! workers share it via `Arc`. Adding or removing projects requires a
//! restart.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::MirrorConfig;
use crate::types::ProjectKey;

/// A single mirrored project and its sync parameters.
#[derive(Debug, Clone)]
pub struct Project {
    pub key: ProjectKey,

    /// Upstream URL fetched from as the `origin` remote.
    pub source: String,

    /// Homepage published as forge metadata.
    pub homepage: Option<String>,
}

impl Project {
    /// The description published to the forge on every sync.
    pub fn description(&self) -> String {
        format!("Official mirror of {}", self.source)
    }

    /// Deterministic location of the local mirror under `cache_dir`.
    pub fn mirror_path(&self, cache_dir: &Path) -> PathBuf {
        cache_dir.join(&self.key.org).join(&self.key.name)
    }
}

/// Immutable mapping from project key to project.
#[derive(Debug, Default)]
pub struct Registry {
    projects: BTreeMap<ProjectKey, Project>,
}

impl Registry {
    pub fn from_config(config: &MirrorConfig) -> Self {
        let projects = config
            .projects
            .iter()
            .map(|(key, entry)| {
                let project = Project {
                    key: key.clone(),
                    source: entry.source.clone(),
                    homepage: entry.homepage.clone(),
                };
                (key.clone(), project)
            })
            .collect();

        Registry { projects }
    }

    pub fn get(&self, key: &ProjectKey) -> Option<&Project> {
        self.projects.get(key)
    }

    pub fn contains(&self, key: &ProjectKey) -> bool {
        self.projects.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ProjectKey> {
        self.projects.keys()
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }
}
