//! Error types for taskdeck-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from local store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure, with the path that was being touched.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`; cannot locate `~/.taskdeck/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// A record id that cannot be used as a cache file name.
    #[error("invalid record id {id:?}; refusing to use it as a file name")]
    InvalidRecordId { id: String },

    /// A setting required to reach the backend is empty.
    #[error("missing setting `{key}`; run `taskdeck config set` or export {env}")]
    MissingSetting { key: &'static str, env: &'static str },
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
