//! Strata DNS Background Jobs
//!
//! Periodic work that must never touch the request path: the refresh
//! sweeper and blocklist source synchronization. All jobs are
//! cancellation-aware and stop on token cancellation.

pub mod blocklist_sync;
pub mod refresh_sweep;
pub mod runner;

pub use blocklist_sync::BlocklistSyncJob;
pub use refresh_sweep::RefreshSweepJob;
pub use runner::JobRunner;
