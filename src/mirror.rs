//! Local mirror store backed by git subprocesses.
//!
//! Each project gets a bare `--mirror` clone of its upstream with two
//! remotes: `origin` (upstream, fetch) and `github` (forge, push). After a
//! successful sync the mirror's ref set exactly equals the upstream's; the
//! forge side is then made an exact image of the mirror by a force mirror
//! push.
//!
//! All operations are synchronous subprocess invocations; callers in async
//! context run them on the blocking pool.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

/// Name of the fetch-only remote pointing at the upstream source.
pub const ORIGIN_REMOTE: &str = "origin";

/// Name of the push-only remote pointing at the forge.
pub const FORGE_REMOTE: &str = "github";

/// Errors from mirror operations.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// A git subprocess returned a non-success status.
    #[error("git command failed: {command}\nstderr: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// IO error spawning git or managing the mirror directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for mirror operations.
pub type MirrorResult<T> = Result<T, MirrorError>;

/// A bare mirror clone at a deterministic path.
#[derive(Debug, Clone)]
pub struct LocalMirror {
    path: PathBuf,
}

impl LocalMirror {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LocalMirror { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a bootstrapped mirror exists at this path.
    ///
    /// Checks for the bare repository's `HEAD` file rather than the bare
    /// directory, so an empty or partially-removed directory is not mistaken
    /// for an existing mirror.
    pub fn exists(&self) -> bool {
        self.path.join("HEAD").is_file()
    }

    /// First-sync bootstrap: `clone --mirror` the upstream, then register the
    /// forge push remote.
    ///
    /// On any failure the partially-created directory is removed, so a later
    /// sync attempt re-bootstraps from scratch instead of operating on a
    /// half-initialized clone.
    pub fn bootstrap(&self, source: &str, push_url: &str) -> MirrorResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let path_arg = self.path.to_string_lossy().into_owned();
        let clone = run_git(
            self.path.parent().unwrap_or(Path::new(".")),
            &["clone", "--mirror", source, &path_arg],
        );
        if let Err(e) = clone {
            self.discard();
            return Err(e);
        }

        if let Err(e) = run_git(&self.path, &["remote", "add", FORGE_REMOTE, push_url]) {
            self.discard();
            return Err(e);
        }

        Ok(())
    }

    /// Fetches from the upstream with pruning, so upstream branch and tag
    /// deletions are reflected locally before mirroring forward.
    pub fn fetch_origin(&self) -> MirrorResult<()> {
        run_git(&self.path, &["fetch", ORIGIN_REMOTE, "--prune"])
    }

    /// Points the forge remote at `push_url`. Run unconditionally on every
    /// sync so a renamed or migrated forge repository never goes stale.
    pub fn set_push_url(&self, push_url: &str) -> MirrorResult<()> {
        run_git(&self.path, &["remote", "set-url", FORGE_REMOTE, push_url])
    }

    /// Force-pushes all refs to the forge in mirror mode, making the forge's
    /// ref set an exact image of the mirror's.
    pub fn push_mirror(&self) -> MirrorResult<()> {
        run_git(&self.path, &["push", FORGE_REMOTE, "--force", "--mirror"])
    }

    fn discard(&self) {
        // Best-effort cleanup; a leftover directory without HEAD is still
        // treated as absent by `exists`.
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

/// Create a git Command with clean environment (no system/user config).
///
/// This ensures consistent behavior across different machines by ignoring
/// system and user git configuration (e.g., hooks, aliases, credential
/// helpers).
fn git_command(workdir: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(workdir);

    // Disable system and user config for reproducible behavior
    cmd.env("GIT_CONFIG_NOSYSTEM", "1");
    cmd.env("GIT_CONFIG_GLOBAL", "/dev/null");

    // Disable terminal prompts
    cmd.env("GIT_TERMINAL_PROMPT", "0");

    cmd
}

/// Run a git command in the given working directory.
fn run_git(workdir: &Path, args: &[&str]) -> MirrorResult<()> {
    let output = git_command(workdir).args(args).output()?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let command = format!("git {}", args.join(" "));
        Err(MirrorError::CommandFailed { command, stderr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{init_bare_repo, init_upstream_repo, list_refs, upstream_git};
    use tempfile::tempdir;

    #[test]
    fn bootstrap_creates_bare_mirror_with_forge_remote() {
        let dir = tempdir().unwrap();
        let upstream = init_upstream_repo(&dir.path().join("upstream"));
        let target = init_bare_repo(&dir.path().join("target.git"));

        let mirror = LocalMirror::new(dir.path().join("mirrors/acme/widget"));
        assert!(!mirror.exists());

        mirror
            .bootstrap(&upstream.to_string_lossy(), &target.to_string_lossy())
            .unwrap();

        assert!(mirror.exists());
        assert_eq!(list_refs(mirror.path()), list_refs(&upstream));
    }

    #[test]
    fn bootstrap_failure_leaves_no_directory() {
        let dir = tempdir().unwrap();
        let mirror = LocalMirror::new(dir.path().join("mirrors/acme/widget"));

        let missing = dir.path().join("no-such-upstream");
        let result = mirror.bootstrap(&missing.to_string_lossy(), "unused");

        assert!(matches!(result, Err(MirrorError::CommandFailed { .. })));
        assert!(!mirror.exists());
        assert!(!mirror.path().exists());
    }

    #[test]
    fn fetch_prune_propagates_upstream_deletions() {
        let dir = tempdir().unwrap();
        let upstream = init_upstream_repo(&dir.path().join("upstream"));
        upstream_git(&upstream, &["branch", "doomed"]);

        let mirror = LocalMirror::new(dir.path().join("mirror"));
        mirror
            .bootstrap(&upstream.to_string_lossy(), "unused")
            .unwrap();
        assert!(list_refs(mirror.path()).iter().any(|r| r.contains("doomed")));

        upstream_git(&upstream, &["branch", "-D", "doomed"]);
        upstream_git(&upstream, &["branch", "fresh"]);
        mirror.fetch_origin().unwrap();

        let refs = list_refs(mirror.path());
        assert!(!refs.iter().any(|r| r.contains("doomed")));
        assert!(refs.iter().any(|r| r.contains("fresh")));
        assert_eq!(refs, list_refs(&upstream));
    }

    #[test]
    fn push_mirror_makes_target_an_exact_image() {
        let dir = tempdir().unwrap();
        let upstream = init_upstream_repo(&dir.path().join("upstream"));
        upstream_git(&upstream, &["tag", "v1"]);
        let target = init_bare_repo(&dir.path().join("target.git"));

        let mirror = LocalMirror::new(dir.path().join("mirror"));
        mirror
            .bootstrap(&upstream.to_string_lossy(), &target.to_string_lossy())
            .unwrap();
        mirror.push_mirror().unwrap();

        assert_eq!(list_refs(&target), list_refs(&upstream));
    }

    #[test]
    fn set_push_url_repoints_forge_remote() {
        let dir = tempdir().unwrap();
        let upstream = init_upstream_repo(&dir.path().join("upstream"));
        let first = init_bare_repo(&dir.path().join("first.git"));
        let second = init_bare_repo(&dir.path().join("second.git"));

        let mirror = LocalMirror::new(dir.path().join("mirror"));
        mirror
            .bootstrap(&upstream.to_string_lossy(), &first.to_string_lossy())
            .unwrap();

        mirror.set_push_url(&second.to_string_lossy()).unwrap();
        mirror.push_mirror().unwrap();

        assert!(list_refs(&first).is_empty());
        assert_eq!(list_refs(&second), list_refs(&upstream));
    }
}
