pub mod auth;
pub mod config;
pub mod daemon;
pub mod log;
pub mod profile;
pub mod project;
pub mod sync;
pub mod task;

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};

use taskdeck_api::{ApiError, BackendClient};
use taskdeck_core::{config as settings, store, Identity, SessionStore};

pub(crate) fn home() -> Result<PathBuf> {
    Ok(store::home_dir()?)
}

/// Wrap a backend error with `what`, pointing at `auth login` when the
/// stored token was rejected.
pub(crate) fn backend_error(err: ApiError, what: String) -> anyhow::Error {
    if err.is_unauthorized() {
        anyhow!(err)
            .context(what)
            .context("session expired or revoked; run `taskdeck auth login --email EMAIL`")
    } else {
        anyhow!(err).context(what)
    }
}

/// Backend client from the effective configuration.
pub(crate) fn client(home: &std::path::Path) -> Result<BackendClient> {
    let config = settings::load_at(home).context("failed to load configuration")?;
    BackendClient::from_config(&config)
        .context("backend not configured; run `taskdeck config set --backend-url URL --api-key KEY`")
}

/// Backend client plus the stored session, or an error telling the user to
/// sign in.
pub(crate) fn signed_in(home: &std::path::Path) -> Result<(BackendClient, Identity)> {
    let identity = SessionStore::at(home)
        .load()
        .context("failed to read session")?;
    let Some(identity) = identity else {
        bail!("not signed in; run `taskdeck auth login --email EMAIL`");
    };
    Ok((client(home)?, identity))
}
