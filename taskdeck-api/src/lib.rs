//! # taskdeck-api
//!
//! Blocking client for the Taskdeck backend: password sign-in, the profile
//! row used by sync, and CRUD for projects, tasks, and work logs.

pub mod client;
pub mod error;
mod resources;

pub use client::BackendClient;
pub use error::ApiError;
