//! Taskdeck core library: domain records, local stores, errors.
//!
//! Public API surface:
//! - [`types`]: identifiers, profile and CRUD records
//! - [`timestamp`]: lenient `updated_at` parsing
//! - [`error`]: [`StoreError`]
//! - [`store`]: on-disk profile cache
//! - [`session`]: signed-in identity
//! - [`config`]: backend and sync settings

pub mod config;
pub mod error;
pub mod session;
pub mod store;
pub mod timestamp;
pub mod types;

pub use config::{BackendConfig, Config, SyncSettings};
pub use error::StoreError;
pub use session::SessionStore;
pub use store::ProfileCache;
pub use types::{
    Identity, NewProject, NewTask, NewWorkLog, ProfileRecord, ProfileUpdate, Project, ProjectId,
    Task, TaskId, TaskStatus, UserId, WorkLog, WorkLogId,
};
