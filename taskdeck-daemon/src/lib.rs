//! Background scheduler for the profile sync job: periodic trigger, retry
//! with backoff, a single job processor, and a Unix-socket control server.

mod error;
pub mod paths;
pub mod protocol;
pub mod retry;
mod runtime;

pub use error::DaemonError;
pub use protocol::{
    request_status, request_stop, request_sync, ControlClient, ControlCommand, DaemonRequest,
    DaemonResponse,
};
pub use retry::RetryPolicy;
pub use runtime::{run, run_with, start_blocking, DaemonStatus, HomeSyncJob, RunSummary, SyncJob};
