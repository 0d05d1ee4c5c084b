//! Control socket wire format and blocking client.
//!
//! One JSON object per line in each direction:
//!
//! ```text
//! -> {"cmd":"status"}            {"cmd":"sync"}            {"cmd":"stop"}
//! <- {"ok":true,"data":{...}}    {"ok":false,"error":"..."}
//! ```

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{io_err, DaemonError};
use crate::paths::socket_path;

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);
const STATUS_ATTEMPTS: u32 = 5;
const STATUS_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlCommand {
    Status,
    /// Run a sync now; answered with the run summary once it finishes.
    Sync,
    Stop,
}

impl ControlCommand {
    fn name(self) -> &'static str {
        match self {
            ControlCommand::Status => "status",
            ControlCommand::Sync => "sync",
            ControlCommand::Stop => "stop",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonRequest {
    pub cmd: ControlCommand,
}

impl From<ControlCommand> for DaemonRequest {
    fn from(cmd: ControlCommand) -> Self {
        Self { cmd }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DaemonResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// The payload of a successful reply, or the daemon's message as
    /// [`DaemonError::Protocol`].
    pub fn into_result(self) -> Result<Value, DaemonError> {
        match (self.ok, self.error) {
            (true, _) => Ok(self.data.unwrap_or(Value::Null)),
            (false, Some(message)) => Err(DaemonError::Protocol(message)),
            (false, None) => Err(DaemonError::Protocol("daemon reported an unnamed error".into())),
        }
    }
}

/// One request per connection against the daemon under a given home.
#[derive(Debug, Clone)]
pub struct ControlClient {
    socket: PathBuf,
    reply_timeout: Duration,
}

impl ControlClient {
    pub fn for_home(home: &Path) -> Self {
        Self {
            socket: socket_path(home),
            reply_timeout: REPLY_TIMEOUT,
        }
    }

    /// Bound on the wait for `status` and `stop` replies. A `sync` reply
    /// waits for the run itself and is never cut short.
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    pub fn call(&self, cmd: ControlCommand) -> Result<Value, DaemonError> {
        let mut stream = self.connect()?;
        let wait = match cmd {
            ControlCommand::Sync => None,
            ControlCommand::Status | ControlCommand::Stop => Some(self.reply_timeout),
        };
        stream
            .set_read_timeout(wait)
            .map_err(|e| io_err(&self.socket, e))?;

        let mut line = serde_json::to_string(&DaemonRequest::from(cmd))?;
        line.push('\n');
        stream
            .write_all(line.as_bytes())
            .and_then(|()| stream.flush())
            .map_err(|e| io_err(&self.socket, e))?;

        let mut reply = String::new();
        match BufReader::new(stream).read_line(&mut reply) {
            Ok(0) => Err(DaemonError::Protocol(format!(
                "daemon closed the connection without answering `{}`",
                cmd.name()
            ))),
            Ok(_) => serde_json::from_str::<DaemonResponse>(reply.trim_end())?.into_result(),
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Err(DaemonError::Protocol(format!(
                    "daemon did not answer `{}` within {:?}",
                    cmd.name(),
                    self.reply_timeout
                )))
            }
            Err(err) => Err(io_err(&self.socket, err)),
        }
    }

    fn connect(&self) -> Result<UnixStream, DaemonError> {
        if !self.socket.exists() {
            return Err(self.not_running());
        }
        UnixStream::connect(&self.socket).map_err(|err| match err.kind() {
            ErrorKind::NotFound | ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset => {
                self.not_running()
            }
            _ => io_err(&self.socket, err),
        })
    }

    fn not_running(&self) -> DaemonError {
        DaemonError::DaemonNotRunning {
            socket: self.socket.clone(),
        }
    }
}

/// Status payload. Retries briefly while a freshly started daemon binds its
/// socket.
pub fn request_status(home: &Path) -> Result<Value, DaemonError> {
    let client = ControlClient::for_home(home);
    let mut attempt = 1;
    loop {
        match client.call(ControlCommand::Status) {
            Err(DaemonError::DaemonNotRunning { .. }) if attempt < STATUS_ATTEMPTS => {
                attempt += 1;
                sleep(STATUS_RETRY_DELAY);
            }
            result => return result,
        }
    }
}

pub fn request_stop(home: &Path) -> Result<(), DaemonError> {
    ControlClient::for_home(home)
        .call(ControlCommand::Stop)
        .map(drop)
}

/// Run a sync now and wait for its summary.
pub fn request_sync(home: &Path) -> Result<Value, DaemonError> {
    ControlClient::for_home(home).call(ControlCommand::Sync)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixListener;
    use std::thread;

    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn commands_use_snake_case_wire_names() {
        let encoded = serde_json::to_string(&DaemonRequest::from(ControlCommand::Status)).unwrap();
        assert_eq!(encoded, r#"{"cmd":"status"}"#);

        let decoded: DaemonRequest = serde_json::from_str(r#"{"cmd":"sync"}"#).unwrap();
        assert_eq!(decoded.cmd, ControlCommand::Sync);
    }

    #[test]
    fn unknown_command_does_not_decode() {
        assert!(serde_json::from_str::<DaemonRequest>(r#"{"cmd":"reboot"}"#).is_err());
    }

    #[test]
    fn error_reply_omits_data_and_becomes_protocol_error() {
        let reply = DaemonResponse::error("sync failed");
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({"ok": false, "error": "sync failed"})
        );
        let err = reply.into_result().unwrap_err();
        assert!(matches!(err, DaemonError::Protocol(msg) if msg == "sync failed"));
    }

    #[test]
    fn ok_reply_without_data_is_null() {
        let reply: DaemonResponse = serde_json::from_str(r#"{"ok":true}"#).unwrap();
        assert_eq!(reply.into_result().unwrap(), Value::Null);
    }

    #[test]
    fn missing_socket_reports_not_running() {
        let home = TempDir::new().unwrap();
        let err = request_stop(home.path()).unwrap_err();
        assert!(matches!(err, DaemonError::DaemonNotRunning { .. }), "{err}");
    }

    #[test]
    fn silent_daemon_times_out_status() {
        let home = TempDir::new().unwrap();
        let socket = socket_path(home.path());
        std::fs::create_dir_all(socket.parent().unwrap()).unwrap();
        let listener = UnixListener::bind(&socket).unwrap();
        let holder = thread::spawn(move || {
            // Accept and hold the connection without replying.
            let (stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_millis(500));
            drop(stream);
        });

        let err = ControlClient::for_home(home.path())
            .with_reply_timeout(Duration::from_millis(50))
            .call(ControlCommand::Status)
            .unwrap_err();
        assert!(
            matches!(&err, DaemonError::Protocol(msg) if msg.contains("did not answer `status`")),
            "{err}"
        );
        holder.join().unwrap();
    }
}
