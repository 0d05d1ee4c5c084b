//! Sync job runner: one reconciliation pass for the signed-in user.
//!
//! Steps, strictly in order and each awaited before the next:
//!
//! 1. current identity (auth provider)
//! 2. remote fetch
//! 3. local fetch
//! 4. [`reconcile`]
//! 5. at most one write: local upsert or remote update
//!
//! Any collaborator failure ends the run as [`JobOutcome::RetryableFailure`].
//! A write that already happened is not rolled back.

use std::path::Path;
use std::time::{Duration, Instant};

use serde::Serialize;

use taskdeck_api::BackendClient;
use taskdeck_core::{config, ProfileCache, SessionStore, UserId};

use crate::error::{Collaborator, SyncError};
use crate::ports::{AuthProvider, LocalProfiles, RemoteProfiles};
use crate::reconcile::{reconcile, Reconciliation};

/// What a successful run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    AdoptedRemote,
    PushedLocal,
    NoOp,
    /// Nobody is signed in; nothing was fetched.
    SignedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub user_id: Option<UserId>,
    pub action: SyncAction,
    pub duration: Duration,
}

/// Result handed back to the scheduler.
#[derive(Debug)]
pub enum JobOutcome {
    Success(SyncReport),
    RetryableFailure(SyncError),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success(_))
    }
}

/// Runs one sync pass against injected collaborators.
#[derive(Debug)]
pub struct SyncJobRunner<A, R, S> {
    auth: A,
    remote: R,
    store: S,
}

impl<A, R, S> SyncJobRunner<A, R, S>
where
    A: AuthProvider,
    R: RemoteProfiles,
    S: LocalProfiles,
{
    pub fn new(auth: A, remote: R, store: S) -> Self {
        Self {
            auth,
            remote,
            store,
        }
    }

    /// Run once and classify the result for the scheduler. Never panics on
    /// collaborator failure.
    pub fn run(&self) -> JobOutcome {
        match self.try_run() {
            Ok(report) => {
                tracing::info!(
                    "profile sync finished: action={:?} user={} in {}ms",
                    report.action,
                    report
                        .user_id
                        .as_ref()
                        .map(UserId::as_str)
                        .unwrap_or("-"),
                    report.duration.as_millis()
                );
                JobOutcome::Success(report)
            }
            Err(err) => {
                tracing::warn!("profile sync failed, will retry: {err}");
                JobOutcome::RetryableFailure(err)
            }
        }
    }

    pub fn try_run(&self) -> Result<SyncReport, SyncError> {
        let started = Instant::now();

        let identity = self
            .auth
            .current_identity()
            .map_err(|e| SyncError::unavailable(Collaborator::Auth, "current_identity", e))?;
        let Some(identity) = identity else {
            tracing::debug!("no signed-in user; skipping profile sync");
            return Ok(SyncReport {
                user_id: None,
                action: SyncAction::SignedOut,
                duration: started.elapsed(),
            });
        };

        let remote = self
            .remote
            .fetch_profile(&identity)
            .map_err(|e| SyncError::unavailable(Collaborator::Remote, "fetch_profile", e))?;
        let local = self
            .store
            .get(&identity.user_id)
            .map_err(|e| SyncError::unavailable(Collaborator::Local, "get", e))?;

        let action = match reconcile(local.as_ref(), remote.as_ref()) {
            Reconciliation::AdoptRemote(record) => {
                self.store
                    .upsert(&record)
                    .map_err(|e| SyncError::unavailable(Collaborator::Local, "upsert", e))?;
                tracing::debug!("cached remote profile for {}", record.id);
                SyncAction::AdoptedRemote
            }
            Reconciliation::PushLocal(update) => {
                self.remote
                    .update_profile(&identity, &update)
                    .map_err(|e| SyncError::unavailable(Collaborator::Remote, "update_profile", e))?;
                tracing::debug!("pushed local profile for {}", identity.user_id);
                SyncAction::PushedLocal
            }
            Reconciliation::NoOp if local.is_none() && remote.is_none() => {
                return Err(SyncError::ProfileMissing {
                    user_id: identity.user_id,
                });
            }
            Reconciliation::NoOp => SyncAction::NoOp,
        };

        Ok(SyncReport {
            user_id: Some(identity.user_id),
            action,
            duration: started.elapsed(),
        })
    }
}

/// Run one pass with the production collaborators rooted at `home`.
///
/// Configuration is re-read on every call so sign-in, sign-out, and backend
/// changes take effect on the next scheduled run. This is the canonical sync
/// entrypoint for both `taskdeck sync` and the daemon.
pub fn run_at(home: &Path) -> JobOutcome {
    let config = match config::load_at(home) {
        Ok(config) => config,
        Err(err) => {
            return failure(SyncError::unavailable(Collaborator::Local, "load_config", err));
        }
    };
    let session = SessionStore::at(home);

    // Signed out is a clean no-op even when the backend is not configured yet.
    match session.load() {
        Ok(None) => {
            return JobOutcome::Success(SyncReport {
                user_id: None,
                action: SyncAction::SignedOut,
                duration: Duration::ZERO,
            })
        }
        Ok(Some(_)) => {}
        Err(err) => {
            return failure(SyncError::unavailable(Collaborator::Auth, "current_identity", err));
        }
    }

    let client = match BackendClient::from_config(&config) {
        Ok(client) => client,
        Err(err) => return failure(SyncError::unavailable(Collaborator::Remote, "configure", err)),
    };

    SyncJobRunner::new(session, client, ProfileCache::at(home)).run()
}

fn failure(err: SyncError) -> JobOutcome {
    tracing::warn!("profile sync failed, will retry: {err}");
    JobOutcome::RetryableFailure(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use taskdeck_core::{Identity, ProfileRecord};
    use tempfile::TempDir;

    #[test]
    fn run_at_signed_out_is_success_without_config() {
        let home = TempDir::new().expect("home");
        match run_at(home.path()) {
            JobOutcome::Success(report) => {
                assert_eq!(report.action, SyncAction::SignedOut);
                assert_eq!(report.user_id, None);
            }
            other => panic!("expected success, got {other:?}"),
        }
        assert!(ProfileCache::at(home.path()).list().unwrap().is_empty());
    }

    #[test]
    fn run_at_signed_in_without_backend_is_retryable() {
        let home = TempDir::new().expect("home");
        SessionStore::at(home.path())
            .save(&Identity {
                user_id: UserId::from("u1"),
                access_token: "t".to_string(),
                refresh_token: None,
                email: None,
                signed_in_at: Utc::now(),
            })
            .expect("save session");

        match run_at(home.path()) {
            JobOutcome::RetryableFailure(SyncError::Unavailable {
                collaborator,
                operation,
                ..
            }) => {
                assert_eq!(collaborator, Collaborator::Remote);
                assert_eq!(operation, "configure");
            }
            other => panic!("expected retryable configure failure, got {other:?}"),
        }
        let cached: Vec<ProfileRecord> = ProfileCache::at(home.path()).list().unwrap();
        assert!(cached.is_empty(), "nothing written on failure");
    }
}
