//! Error types for taskdeck-sync.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use taskdeck_core::UserId;

/// Which collaborator a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collaborator {
    Auth,
    Remote,
    Local,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collaborator::Auth => write!(f, "auth provider"),
            Collaborator::Remote => write!(f, "remote api"),
            Collaborator::Local => write!(f, "local store"),
        }
    }
}

/// All errors that can end a sync run. Every one of them is retryable.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A network or storage call failed.
    #[error("{collaborator} unavailable during {operation}: {source}")]
    Unavailable {
        collaborator: Collaborator,
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Neither the cache nor the backend has a profile for the signed-in user.
    #[error("no profile for user {user_id} locally or remotely")]
    ProfileMissing { user_id: UserId },

    /// The run did not finish before the scheduler's deadline.
    #[error("sync run exceeded its {after:?} deadline")]
    TimedOut { after: Duration },
}

impl SyncError {
    pub fn unavailable(
        collaborator: Collaborator,
        operation: &'static str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SyncError::Unavailable {
            collaborator,
            operation,
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_names_collaborator_and_operation() {
        let err = SyncError::unavailable(
            Collaborator::Remote,
            "fetch_profile",
            std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out"),
        );
        let msg = err.to_string();
        assert!(msg.contains("remote api"), "{msg}");
        assert!(msg.contains("fetch_profile"), "{msg}");
        assert!(msg.contains("timed out"), "{msg}");
    }
}
