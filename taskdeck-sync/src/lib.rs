//! # taskdeck-sync
//!
//! Profile reconciliation and the background sync job.
//!
//! [`reconcile`] decides which copy of the profile wins; [`SyncJobRunner`]
//! fetches both copies, applies the decision, and reports a [`JobOutcome`]
//! the scheduler uses to decide whether to retry. Call [`job::run_at`] to run
//! one pass with the on-disk session, cache, and configured backend.

pub mod adapters;
pub mod error;
pub mod job;
pub mod ports;
pub mod reconcile;

pub use error::{Collaborator, SyncError};
pub use job::{JobOutcome, SyncAction, SyncJobRunner, SyncReport};
pub use ports::{AuthProvider, LocalProfiles, RemoteProfiles};
pub use reconcile::{reconcile, Reconciliation};
