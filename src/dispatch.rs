//! Bounded-concurrency job dispatcher.
//!
//! Submissions go through a bounded channel into a scheduling loop that
//! admits workers through a semaphore: at most `capacity` sync workers run
//! at once, and at most `capacity` submissions wait their turn. A submission
//! that finds the queue full is dropped with a warning rather than growing
//! the backlog without bound; the caller learns whether the job was
//! accepted, never waits for it.
//!
//! There is no per-project mutual exclusion: two concurrent runs for the
//! same project are admitted. This is a known gap inherited from the design,
//! kept deliberately (see DESIGN.md); the protocol's idempotence means the
//! next trigger repairs whatever a race left behind.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::forge::Forge;
use crate::sync::{run_sync, SyncContext};
use crate::types::ProjectKey;

/// Default ceiling on simultaneously executing sync workers.
pub const DEFAULT_CAPACITY: usize = 256;

/// Fire-and-forget scheduler for sync jobs.
pub struct Dispatcher {
    tx: mpsc::Sender<ProjectKey>,
    cancel: CancellationToken,
}

impl Dispatcher {
    /// Starts a dispatcher whose workers share `ctx`. `capacity` bounds both
    /// the number of concurrently running workers and the waiting queue.
    pub fn new<F>(ctx: Arc<SyncContext<F>>, capacity: usize) -> Self
    where
        F: Forge + Send + Sync + 'static,
    {
        let capacity = capacity.max(1);
        let (tx, mut rx) = mpsc::channel::<ProjectKey>(capacity);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let workers = Arc::new(Semaphore::new(capacity));

        tokio::spawn(async move {
            loop {
                let key = tokio::select! {
                    _ = token.cancelled() => break,
                    received = rx.recv() => match received {
                        Some(key) => key,
                        None => break,
                    },
                };

                let permit = tokio::select! {
                    _ = token.cancelled() => break,
                    permit = workers.clone().acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    },
                };

                let ctx = ctx.clone();
                tokio::spawn(async move {
                    run_sync(ctx.as_ref(), &key).await;
                    drop(permit);
                });
            }

            debug!("dispatcher scheduling loop stopped");
        });

        Dispatcher { tx, cancel }
    }

    /// Schedules a sync for `key` without waiting for it. Returns whether
    /// the job was accepted; a full queue drops the submission.
    pub fn submit(&self, key: ProjectKey) -> bool {
        match self.tx.try_send(key) {
            Ok(()) => true,
            Err(TrySendError::Full(key)) => {
                warn!(project = %key, "dispatcher at capacity, dropping sync job");
                false
            }
            Err(TrySendError::Closed(key)) => {
                warn!(project = %key, "dispatcher stopped, dropping sync job");
                false
            }
        }
    }

    /// Stops the scheduling loop. Queued jobs are dropped; in-flight workers
    /// run to completion (there is no cancellation of a started sync).
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}
