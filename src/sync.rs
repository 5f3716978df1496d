//! The per-project reconciliation protocol.
//!
//! One sync run is strictly sequential:
//!
//! 1. Attempt a forge metadata update; a 404 means the repository is absent.
//! 2. Creation fallback under the organization; any failure here is fatal.
//! 3. Capture the push URL from whichever call succeeded.
//! 4. Bootstrap the local mirror if it does not exist yet.
//! 5. Fetch from the upstream with pruning.
//! 6. Unconditionally refresh the forge remote's push URL.
//! 7. Force mirror push, making the forge an exact image of the mirror.
//!
//! The whole protocol is idempotent: re-running it from scratch converges to
//! the same end state, so there is no automatic retry. A failure aborts the
//! remaining steps for that project only and is logged by [`run_sync`];
//! nothing propagates to the dispatcher or to other workers.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::forge::{Forge, ForgeError};
use crate::mirror::{LocalMirror, MirrorError};
use crate::registry::Registry;
use crate::types::ProjectKey;

/// Errors aborting a single project's sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Metadata update and creation both failed.
    #[error("forge reconciliation failed: {0}")]
    Forge(#[from] ForgeError),

    /// A clone/fetch/push subprocess returned non-success.
    #[error("mirror operation failed: {0}")]
    Mirror(#[from] MirrorError),

    /// The key is not in the registry. Triggers validate keys before
    /// dispatching, so this indicates a bug rather than operator error.
    #[error("unknown project: {0}")]
    UnknownProject(ProjectKey),

    /// A blocking git task panicked or was aborted.
    #[error("git task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Everything a sync worker needs, constructed once at startup and shared by
/// the listener, the dispatcher and every worker invocation. No ambient
/// globals.
pub struct SyncContext<F> {
    pub registry: Arc<Registry>,
    pub forge: F,
    pub cache_dir: PathBuf,
}

/// Runs one sync to completion, logging the outcome. Never returns an error:
/// a single project's failure must not affect other workers.
pub async fn run_sync<F>(ctx: &SyncContext<F>, key: &ProjectKey)
where
    F: Forge + Send + Sync,
{
    info!(project = %key, "starting sync");

    match sync_project(ctx, key).await {
        Ok(()) => info!(project = %key, "sync complete"),
        Err(err) => error!(project = %key, error = %err, "sync failed"),
    }
}

/// Executes the seven-step reconciliation protocol for one project.
pub async fn sync_project<F>(ctx: &SyncContext<F>, key: &ProjectKey) -> Result<(), SyncError>
where
    F: Forge + Send + Sync,
{
    let project = ctx
        .registry
        .get(key)
        .ok_or_else(|| SyncError::UnknownProject(key.clone()))?;

    // Steps 1-3: reconcile metadata, falling back to creation, and capture
    // the push URL fresh from whichever call succeeded.
    let repo = match ctx.forge.update_repository(project).await {
        Ok(repo) => repo,
        Err(ForgeError::NotFound { .. }) => {
            debug!(project = %key, "repository absent on forge, creating");
            ctx.forge.create_repository(project).await?
        }
        Err(err) => return Err(err.into()),
    };
    let ssh_url = repo.ssh_url;

    let mirror = LocalMirror::new(project.mirror_path(&ctx.cache_dir));

    // Step 4: first-sync bootstrap. A failed bootstrap cleans up after
    // itself, so the next trigger starts over instead of inheriting a
    // partial clone.
    if !mirror.exists() {
        debug!(project = %key, path = %mirror.path().display(), "bootstrapping mirror");
        let m = mirror.clone();
        let source = project.source.clone();
        let url = ssh_url.clone();
        tokio::task::spawn_blocking(move || m.bootstrap(&source, &url)).await??;
    }

    // Step 5: prune-fetch so upstream deletions propagate.
    {
        let m = mirror.clone();
        tokio::task::spawn_blocking(move || m.fetch_origin()).await??;
    }

    // Step 6: the forge-side URL can change between syncs; never let it go
    // stale.
    {
        let m = mirror.clone();
        let url = ssh_url.clone();
        tokio::task::spawn_blocking(move || m.set_push_url(&url)).await??;
    }

    // Step 7: the only step that mutates forge-visible ref state.
    tokio::task::spawn_blocking(move || mirror.push_mirror()).await??;

    Ok(())
}
