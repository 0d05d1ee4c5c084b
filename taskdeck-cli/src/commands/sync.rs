//! `taskdeck sync`: one reconciliation pass in the foreground.

use anyhow::{anyhow, Context, Result};
use clap::Args;
use serde_json::json;

use taskdeck_sync::{job, JobOutcome, SyncAction};

use super::home;

/// Arguments for `taskdeck sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let home = home()?;

        let report = match job::run_at(&home) {
            JobOutcome::Success(report) => report,
            JobOutcome::RetryableFailure(err) => {
                return Err(anyhow!(err).context("profile sync failed; safe to retry"));
            }
        };

        if self.json {
            let payload = json!({
                "action": report.action,
                "user_id": report.user_id.as_ref().map(|id| id.as_str()),
                "duration_ms": report.duration.as_millis() as u64,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize sync JSON")?
            );
            return Ok(());
        }

        let message = match report.action {
            SyncAction::AdoptedRemote => "✓ Profile updated from backend",
            SyncAction::PushedLocal => "✓ Local profile changes pushed to backend",
            SyncAction::NoOp => "✓ Profile already up to date",
            SyncAction::SignedOut => "Not signed in; nothing to sync.",
        };
        println!("{message}");
        Ok(())
    }
}
