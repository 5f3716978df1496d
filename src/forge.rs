//! Forge API client for metadata reconciliation.
//!
//! The sync protocol needs exactly two forge operations: update a
//! repository's metadata (`PATCH /repos/{org}/{name}`) and create a
//! repository under an organization (`POST /orgs/{org}/repos`). Both carry
//! the same payload and expose the repository's `ssh_url`, which is the push
//! target for the mirror.
//!
//! The trait-based design enables mock forges for testing the sync protocol
//! without network access.

use std::future::Future;

use http::StatusCode;
use octocrab::Octocrab;
use serde::Serialize;
use thiserror::Error;

use crate::registry::Project;
use crate::types::ProjectKey;

/// Preview media type required for the issue/wiki/downloads flag set.
const PREVIEW_ACCEPT: &str = "application/vnd.github.mercy-preview+json";

/// Errors from forge API calls.
#[derive(Debug, Error)]
pub enum ForgeError {
    /// The repository does not exist on the forge (metadata update hit 404).
    /// Distinct from other failures because it triggers the creation
    /// fallback.
    #[error("repository not found on forge: {key}")]
    NotFound { key: ProjectKey },

    /// The forge rejected the request.
    #[error("forge API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The request never produced a forge response (network, TLS, auth
    /// construction).
    #[error("forge request failed: {0}")]
    Transport(String),

    /// The forge response lacked a field the sync protocol depends on.
    #[error("forge response missing field: {0}")]
    MissingField(&'static str),
}

/// The slice of a forge repository record the sync protocol consumes.
///
/// Captured fresh on every sync; never cached across runs, since the push
/// URL can change under renames and forge migrations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgeRepo {
    pub ssh_url: String,
}

/// Metadata payload sent on both update and create.
///
/// Issue tracker, wiki and downloads are always disabled: mirrors must not
/// accept forge-native activity.
#[derive(Debug, Serialize)]
struct RepoMetadata<'a> {
    name: &'a str,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    homepage: Option<&'a str>,
    has_issues: bool,
    has_wiki: bool,
    has_downloads: bool,
}

impl<'a> RepoMetadata<'a> {
    fn for_project(project: &'a Project) -> Self {
        RepoMetadata {
            name: &project.key.name,
            description: project.description(),
            homepage: project.homepage.as_deref(),
            has_issues: false,
            has_wiki: false,
            has_downloads: false,
        }
    }
}

/// The forge operations the sync protocol depends on.
pub trait Forge {
    /// Updates the metadata of an existing repository and returns its
    /// current record. Fails with [`ForgeError::NotFound`] when the
    /// repository does not exist.
    fn update_repository(
        &self,
        project: &Project,
    ) -> impl Future<Output = Result<ForgeRepo, ForgeError>> + Send;

    /// Creates the repository under the project's organization with the same
    /// metadata payload. Any failure is fatal for the sync attempt.
    fn create_repository(
        &self,
        project: &Project,
    ) -> impl Future<Output = Result<ForgeRepo, ForgeError>> + Send;
}

/// GitHub client backed by octocrab.
#[derive(Clone)]
pub struct GitHubForge {
    client: Octocrab,
}

impl GitHubForge {
    /// Builds a client authenticated with a personal bearer token, carrying
    /// the preview `Accept` header on every request.
    pub fn new(token: impl Into<String>) -> Result<Self, ForgeError> {
        let client = Octocrab::builder()
            .personal_token(token.into())
            .add_header(http::header::ACCEPT, PREVIEW_ACCEPT.to_string())
            .build()
            .map_err(|e| ForgeError::Transport(e.to_string()))?;

        Ok(GitHubForge { client })
    }
}

impl Forge for GitHubForge {
    async fn update_repository(&self, project: &Project) -> Result<ForgeRepo, ForgeError> {
        let route = format!("/repos/{}/{}", project.key.org, project.key.name);
        let payload = RepoMetadata::for_project(project);

        let response: serde_json::Value = self
            .client
            .patch(route, Some(&payload))
            .await
            .map_err(|e| classify(&project.key, e))?;

        extract_repo(&response)
    }

    async fn create_repository(&self, project: &Project) -> Result<ForgeRepo, ForgeError> {
        let route = format!("/orgs/{}/repos", project.key.org);
        let payload = RepoMetadata::for_project(project);

        let response: serde_json::Value = self
            .client
            .post(route, Some(&payload))
            .await
            .map_err(|e| classify(&project.key, e))?;

        extract_repo(&response)
    }
}

impl std::fmt::Debug for GitHubForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubForge").finish_non_exhaustive()
    }
}

/// Categorizes an octocrab error, mapping 404 to the creation-fallback
/// signal and everything else to a fatal API or transport error.
fn classify(key: &ProjectKey, err: octocrab::Error) -> ForgeError {
    match err {
        octocrab::Error::GitHub { source, .. } => {
            if source.status_code == StatusCode::NOT_FOUND {
                ForgeError::NotFound { key: key.clone() }
            } else {
                ForgeError::Api {
                    status: source.status_code.as_u16(),
                    message: source.message,
                }
            }
        }
        other => ForgeError::Transport(other.to_string()),
    }
}

fn extract_repo(response: &serde_json::Value) -> Result<ForgeRepo, ForgeError> {
    let ssh_url = response
        .get("ssh_url")
        .and_then(serde_json::Value::as_str)
        .ok_or(ForgeError::MissingField("ssh_url"))?;

    Ok(ForgeRepo {
        ssh_url: ssh_url.to_string(),
    })
}
