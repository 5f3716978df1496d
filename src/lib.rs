//! forge-mirror - webhook-triggered one-way mirroring of upstream
//! repositories into a hosted Git forge.
//!
//! An HTTP trigger schedules sync jobs through a bounded dispatcher; each
//! job reconciles forge metadata, refreshes a local bare mirror clone and
//! force-pushes the mirror's full ref set to the forge.

pub mod config;
pub mod dispatch;
pub mod forge;
pub mod mirror;
pub mod registry;
pub mod server;
pub mod sync;
pub mod types;

#[cfg(test)]
pub mod test_util;
