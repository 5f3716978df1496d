//! Shared test fixtures: throwaway git repositories and a recording forge.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;

use crate::forge::{Forge, ForgeError, ForgeRepo};
use crate::registry::Project;

/// Runs a git command in `repo` with a fixed identity, panicking on failure.
pub fn upstream_git(repo: &Path, args: &[&str]) {
    let output = Command::new("git")
        .current_dir(repo)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("GIT_CONFIG_GLOBAL", "/dev/null")
        .args(["-c", "user.name=test", "-c", "user.email=test@example.com"])
        .args(args)
        .output()
        .expect("failed to spawn git");

    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Creates a non-bare repository at `path` with one initial commit.
pub fn init_upstream_repo(path: &Path) -> PathBuf {
    std::fs::create_dir_all(path).unwrap();
    upstream_git(path, &["init", "-q"]);
    upstream_git(path, &["commit", "--allow-empty", "-m", "initial"]);
    path.to_path_buf()
}

/// Creates an empty bare repository at `path`, usable as a push target.
pub fn init_bare_repo(path: &Path) -> PathBuf {
    std::fs::create_dir_all(path).unwrap();
    upstream_git(path, &["init", "-q", "--bare"]);
    path.to_path_buf()
}

/// Returns the full ref set of a repository as sorted `refname objectname`
/// lines.
pub fn list_refs(repo: &Path) -> Vec<String> {
    let output = Command::new("git")
        .current_dir(repo)
        .args(["for-each-ref", "--format=%(refname) %(objectname)"])
        .output()
        .expect("failed to spawn git");

    assert!(output.status.success());

    let mut refs: Vec<String> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect();
    refs.sort();
    refs
}

/// A forge double that records calls and serves a fixed push URL.
///
/// The repository starts absent (metadata updates fail with `NotFound`)
/// unless constructed with [`RecordingForge::existing`]; a create call makes
/// it present for the rest of the test. An optional gate semaphore lets
/// dispatcher tests hold workers inside their first forge call.
pub struct RecordingForge {
    ssh_url: String,
    state: Mutex<State>,
    gate: Option<Arc<Semaphore>>,
}

struct State {
    exists: bool,
    calls: Vec<&'static str>,
}

impl RecordingForge {
    pub fn new(ssh_url: impl Into<String>) -> Self {
        Self::with_state(ssh_url, false, None)
    }

    pub fn existing(ssh_url: impl Into<String>) -> Self {
        Self::with_state(ssh_url, true, None)
    }

    pub fn gated(ssh_url: impl Into<String>, gate: Arc<Semaphore>) -> Self {
        Self::with_state(ssh_url, true, Some(gate))
    }

    fn with_state(ssh_url: impl Into<String>, exists: bool, gate: Option<Arc<Semaphore>>) -> Self {
        RecordingForge {
            ssh_url: ssh_url.into(),
            state: Mutex::new(State {
                exists,
                calls: Vec::new(),
            }),
            gate,
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    fn repo(&self) -> ForgeRepo {
        ForgeRepo {
            ssh_url: self.ssh_url.clone(),
        }
    }
}

impl Forge for RecordingForge {
    async fn update_repository(&self, project: &Project) -> Result<ForgeRepo, ForgeError> {
        let exists = {
            let mut state = self.state.lock().unwrap();
            state.calls.push("update");
            state.exists
        };

        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.expect("gate closed");
            permit.forget();
        }

        if exists {
            Ok(self.repo())
        } else {
            Err(ForgeError::NotFound {
                key: project.key.clone(),
            })
        }
    }

    async fn create_repository(&self, _project: &Project) -> Result<ForgeRepo, ForgeError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("create");
        state.exists = true;
        Ok(self.repo())
    }
}
