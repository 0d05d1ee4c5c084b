use std::path::{Path, PathBuf};

pub use taskdeck_core::store::taskdeck_root;

pub const DAEMON_SOCKET: &str = "taskdeck.sock";

pub fn socket_path(home: &Path) -> PathBuf {
    taskdeck_root(home).join(DAEMON_SOCKET)
}
