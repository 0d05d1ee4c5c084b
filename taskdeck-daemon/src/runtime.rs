use std::fs;
use std::io::ErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use taskdeck_core::{config, SyncSettings};
use taskdeck_sync::{job, JobOutcome, SyncAction, SyncError};

use crate::error::{io_err, DaemonError};
use crate::paths::{socket_path, taskdeck_root};
use crate::protocol::{ControlCommand, DaemonRequest, DaemonResponse};
use crate::retry::RetryPolicy;

const QUEUE_CAPACITY: usize = 64;

/// One unit of background work. Runs on the blocking pool.
pub trait SyncJob: Send + Sync + 'static {
    fn run_once(&self) -> JobOutcome;
}

/// Profile sync against the session, cache, and backend under `home`.
#[derive(Debug, Clone)]
pub struct HomeSyncJob {
    home: PathBuf,
}

impl HomeSyncJob {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }
}

impl SyncJob for HomeSyncJob {
    fn run_once(&self) -> JobOutcome {
        job::run_at(&self.home)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Schedule,
    Socket,
    /// Retry number `n` (1-based) after a failed run.
    Retry(u32),
}

impl Trigger {
    fn retry_number(self) -> u32 {
        match self {
            Trigger::Retry(n) => n,
            Trigger::Schedule | Trigger::Socket => 0,
        }
    }

    fn label(self) -> String {
        match self {
            Trigger::Schedule => "schedule".to_string(),
            Trigger::Socket => "socket".to_string(),
            Trigger::Retry(n) => format!("retry-{n}"),
        }
    }
}

struct JobRequest {
    trigger: Trigger,
    respond_to: Option<oneshot::Sender<RunSummary>>,
}

/// Result of one run, as reported over the control socket.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub trigger: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<SyncAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u128,
}

impl RunSummary {
    fn new(trigger: Trigger, outcome: &JobOutcome, duration: Duration) -> Self {
        let (ok, action, user_id, error) = match outcome {
            JobOutcome::Success(report) => (
                true,
                Some(report.action),
                report.user_id.as_ref().map(ToString::to_string),
                None,
            ),
            JobOutcome::RetryableFailure(err) => (false, None, None, Some(err.to_string())),
        };
        Self {
            trigger: trigger.label(),
            ok,
            action,
            user_id,
            error,
            duration_ms: duration.as_millis(),
        }
    }
}

/// In-memory scheduler state. Lost on restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DaemonStatus {
    pub started_at_unix: u64,
    pub last_attempt_at_unix: Option<u64>,
    pub last_success_at_unix: Option<u64>,
    pub last_action: Option<SyncAction>,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    /// Retry number waiting on its backoff timer, if any.
    pub next_retry: Option<u32>,
}

type SharedStatus = Arc<RwLock<DaemonStatus>>;

#[derive(Debug, Clone, Copy)]
struct ProcessorSettings {
    retry: RetryPolicy,
    job_timeout: Duration,
}

#[derive(Clone)]
struct ControlContext {
    home: PathBuf,
    status: SharedStatus,
    queue_tx: mpsc::Sender<JobRequest>,
    shutdown_tx: broadcast::Sender<()>,
    interval: Duration,
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf()))
}

/// Run the daemon with the production sync job and the settings in
/// `~/.taskdeck/config.yaml`.
pub async fn run(home: PathBuf) -> Result<(), DaemonError> {
    let settings = config::load_at(&home)?.sync;
    let job = HomeSyncJob::new(home.clone());
    run_with(home, job, settings).await
}

/// Run the daemon around an arbitrary job until `stop` or ctrl-c.
pub async fn run_with<J: SyncJob>(
    home: PathBuf,
    job: J,
    settings: SyncSettings,
) -> Result<(), DaemonError> {
    ensure_runtime_dirs(&home)?;

    let interval = settings.interval();
    let processor_settings = ProcessorSettings {
        retry: RetryPolicy::from(&settings),
        job_timeout: settings.job_timeout(),
    };
    let status: SharedStatus = Arc::new(RwLock::new(DaemonStatus {
        started_at_unix: unix_seconds_now(),
        ..DaemonStatus::default()
    }));

    let (queue_tx, queue_rx) = mpsc::channel::<JobRequest>(QUEUE_CAPACITY);
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    tracing::info!(
        interval_secs = interval.as_secs(),
        job_timeout_secs = processor_settings.job_timeout.as_secs(),
        max_retries = processor_settings.retry.max_retries,
        "taskdeck daemon starting",
    );

    let ticker_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown.subscribe();
        let queue_tx = queue_tx.clone();
        tokio::spawn(async move {
            let result = ticker_task(interval, queue_tx, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let processor_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown.subscribe();
        let status = status.clone();
        let queue_tx = queue_tx.clone();
        let job = Arc::new(job);
        tokio::spawn(async move {
            let result = processor_task(
                job,
                processor_settings,
                status,
                queue_tx,
                queue_rx,
                shutdown_rx,
            )
            .await;
            let _ = shutdown.send(());
            result
        })
    };

    let socket_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown.subscribe();
        let ctx = ControlContext {
            home: home.clone(),
            status: status.clone(),
            queue_tx: queue_tx.clone(),
            shutdown_tx: shutdown.clone(),
            interval,
        };
        tokio::spawn(async move {
            let result = socket_server_task(ctx, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        let mut shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Protocol(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    drop(queue_tx);

    let (ticker_result, processor_result, socket_result, signal_result) = tokio::join!(
        ticker_handle,
        processor_handle,
        socket_handle,
        signal_handle
    );

    handle_join("ticker", ticker_result)?;
    handle_join("sync_processor", processor_result)?;
    handle_join("socket_server", socket_result)?;
    handle_join("signal_handler", signal_result)?;
    tracing::info!("taskdeck daemon stopped");
    Ok(())
}

/// Enqueue a scheduled run every `interval`, starting immediately.
async fn ticker_task(
    interval: Duration,
    queue_tx: mpsc::Sender<JobRequest>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = ticker.tick() => {
                let request = JobRequest { trigger: Trigger::Schedule, respond_to: None };
                match queue_tx.try_send(request) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        tracing::debug!("sync queue full; skipping scheduled run");
                    }
                    Err(TrySendError::Closed(_)) => {
                        return Err(DaemonError::ChannelClosed("sync queue"));
                    }
                }
            }
        }
    }

    Ok(())
}

/// The only consumer of the queue, so runs never overlap.
async fn processor_task<J: SyncJob>(
    job: Arc<J>,
    settings: ProcessorSettings,
    status: SharedStatus,
    queue_tx: mpsc::Sender<JobRequest>,
    mut queue_rx: mpsc::Receiver<JobRequest>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let mut executor = Executor::new(job, settings.job_timeout);
    let mut pending_retry: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            maybe_request = queue_rx.recv() => {
                let Some(request) = maybe_request else { break };

                // Any run supersedes a retry still waiting on its timer.
                if let Some(handle) = pending_retry.take() {
                    handle.abort();
                }

                status.write().await.last_attempt_at_unix = Some(unix_seconds_now());
                let started = Instant::now();
                let outcome = executor.execute().await?;
                let summary = RunSummary::new(request.trigger, &outcome, started.elapsed());

                let next = record_outcome(&status, request.trigger, &outcome, &settings.retry).await;
                if let Some((retry, delay)) = next {
                    pending_retry = Some(schedule_retry(queue_tx.clone(), retry, delay));
                }

                if let Some(respond_to) = request.respond_to {
                    let _ = respond_to.send(summary);
                }
            }
        }
    }

    if let Some(handle) = pending_retry {
        handle.abort();
    }
    Ok(())
}

/// Runs the job on the blocking pool under a deadline.
///
/// A run that misses its deadline cannot be interrupted; its handle is kept
/// and awaited before the next run starts, so runs never overlap.
struct Executor<J> {
    job: Arc<J>,
    deadline: Duration,
    abandoned: Option<JoinHandle<JobOutcome>>,
}

impl<J: SyncJob> Executor<J> {
    fn new(job: Arc<J>, deadline: Duration) -> Self {
        Self {
            job,
            deadline,
            abandoned: None,
        }
    }

    async fn execute(&mut self) -> Result<JobOutcome, DaemonError> {
        self.drain_abandoned().await;

        let job = self.job.clone();
        let mut handle = tokio::task::spawn_blocking(move || job.run_once());
        match tokio::time::timeout(self.deadline, &mut handle).await {
            Ok(joined) => {
                joined.map_err(|err| DaemonError::Protocol(format!("sync task join error: {err}")))
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.deadline.as_millis() as u64,
                    "sync run exceeded its deadline",
                );
                self.abandoned = Some(handle);
                Ok(JobOutcome::RetryableFailure(SyncError::TimedOut {
                    after: self.deadline,
                }))
            }
        }
    }

    /// Wait for a run left behind by an earlier deadline. Its outcome is
    /// already reported as a timeout and is only logged.
    async fn drain_abandoned(&mut self) {
        let Some(handle) = self.abandoned.take() else {
            return;
        };
        tracing::info!("waiting for timed-out sync run to finish");
        match handle.await {
            Ok(outcome) => tracing::info!(
                succeeded = outcome.is_success(),
                "timed-out sync run finished",
            ),
            Err(err) => tracing::warn!(error = %err, "timed-out sync run did not complete"),
        }
    }
}

/// Fold one outcome into the status; returns the retry to schedule, if any.
async fn record_outcome(
    status: &SharedStatus,
    trigger: Trigger,
    outcome: &JobOutcome,
    policy: &RetryPolicy,
) -> Option<(u32, Duration)> {
    let mut status = status.write().await;
    match outcome {
        JobOutcome::Success(report) => {
            status.last_success_at_unix = Some(unix_seconds_now());
            status.last_action = Some(report.action);
            status.consecutive_failures = 0;
            status.next_retry = None;
            tracing::debug!(
                trigger = %trigger.label(),
                action = ?report.action,
                "sync run succeeded",
            );
            None
        }
        JobOutcome::RetryableFailure(err) => {
            status.consecutive_failures = status.consecutive_failures.saturating_add(1);
            status.last_error = Some(err.to_string());

            let retry = trigger.retry_number() + 1;
            let next = policy.delay_for(retry).map(|delay| (retry, delay));
            status.next_retry = next.map(|(retry, _)| retry);

            match next {
                Some((retry, delay)) => tracing::warn!(
                    error = %err,
                    retry,
                    delay_ms = delay.as_millis() as u64,
                    "sync run failed; retry scheduled",
                ),
                None => tracing::warn!(
                    error = %err,
                    failures = status.consecutive_failures,
                    "sync run failed; retries exhausted until next scheduled run",
                ),
            }
            next
        }
    }
}

fn schedule_retry(
    queue_tx: mpsc::Sender<JobRequest>,
    retry: u32,
    delay: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let request = JobRequest {
            trigger: Trigger::Retry(retry),
            respond_to: None,
        };
        if queue_tx.send(request).await.is_err() {
            tracing::debug!(retry, "sync queue closed before retry was enqueued");
        }
    })
}

async fn socket_server_task(
    ctx: ControlContext,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let socket = socket_path(&ctx.home);
    prepare_socket_for_bind(&socket)?;

    let listener = UnixListener::bind(&socket).map_err(|e| io_err(&socket, e))?;
    set_socket_permissions(&socket)?;
    tracing::info!(socket = %socket.display(), "control socket listening");

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.map_err(|e| io_err(&socket, e))?;
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_socket_client(stream, ctx).await {
                        tracing::error!(error = %err, "socket client error");
                    }
                });
            }
        }
    }

    if socket.exists() {
        let _ = fs::remove_file(&socket);
    }
    Ok(())
}

async fn handle_socket_client(stream: UnixStream, ctx: ControlContext) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_err("daemon socket read", e))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let request = match serde_json::from_str::<DaemonRequest>(&line) {
            Ok(request) => request,
            Err(err) => {
                write_response(
                    &mut writer,
                    &DaemonResponse::error(format!("invalid request: {err}")),
                )
                .await?;
                continue;
            }
        };

        let response = match request.cmd {
            ControlCommand::Status => {
                DaemonResponse::ok(build_status_payload(&ctx.home, &ctx.status, ctx.interval).await)
            }
            ControlCommand::Sync => match enqueue_and_wait(&ctx.queue_tx, Trigger::Socket).await {
                Ok(summary) if summary.ok => DaemonResponse::ok(json!(summary)),
                Ok(summary) => DaemonResponse::error(
                    summary
                        .error
                        .unwrap_or_else(|| "sync failed".to_string()),
                ),
                Err(err) => DaemonResponse::error(err.to_string()),
            },
            ControlCommand::Stop => {
                let _ = ctx.shutdown_tx.send(());
                DaemonResponse::ok(json!({ "stopping": true }))
            }
        };

        write_response(&mut writer, &response).await?;
        if request.cmd == ControlCommand::Stop {
            break;
        }
    }

    Ok(())
}

async fn build_status_payload(home: &Path, status: &SharedStatus, interval: Duration) -> Value {
    let snapshot = status.read().await.clone();
    json!({
        "running": true,
        "pid": std::process::id(),
        "socket": socket_path(home).display().to_string(),
        "interval_secs": interval.as_secs(),
        "started_at_unix": snapshot.started_at_unix,
        "last_attempt_at_unix": snapshot.last_attempt_at_unix,
        "last_success_at_unix": snapshot.last_success_at_unix,
        "last_action": snapshot.last_action,
        "consecutive_failures": snapshot.consecutive_failures,
        "last_error": snapshot.last_error,
        "next_retry": snapshot.next_retry,
    })
}

async fn enqueue_and_wait(
    queue_tx: &mpsc::Sender<JobRequest>,
    trigger: Trigger,
) -> Result<RunSummary, DaemonError> {
    let (tx, rx) = oneshot::channel();
    queue_tx
        .send(JobRequest {
            trigger,
            respond_to: Some(tx),
        })
        .await
        .map_err(|_| DaemonError::ChannelClosed("sync queue"))?;

    rx.await
        .map_err(|_| DaemonError::ChannelClosed("sync response"))
}

fn prepare_socket_for_bind(socket: &Path) -> Result<(), DaemonError> {
    if !socket.exists() {
        return Ok(());
    }

    match StdUnixStream::connect(socket) {
        Ok(_) => {
            return Err(DaemonError::Protocol(format!(
                "daemon socket already in use: {}",
                socket.display()
            )));
        }
        Err(err) => {
            tracing::warn!(
                socket = %socket.display(),
                error = %err,
                "removing stale daemon socket before bind",
            );
        }
    }

    match fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(socket, err)),
    }
}

fn ensure_runtime_dirs(home: &Path) -> Result<(), DaemonError> {
    let root = taskdeck_root(home);
    if !root.exists() {
        fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
        set_private_dir_permissions(&root)?;
    }
    Ok(())
}

async fn write_response(
    writer: &mut OwnedWriteHalf,
    response: &DaemonResponse,
) -> Result<(), DaemonError> {
    let payload = serde_json::to_string(response)?;
    writer
        .write_all(payload.as_bytes())
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .flush()
        .await
        .map_err(|e| io_err("daemon socket flush", e))?;
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

fn unix_seconds_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[cfg(unix)]
fn set_socket_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_socket_permissions(_path: &Path) -> Result<(), DaemonError> {
    Ok(())
}

#[cfg(unix)]
fn set_private_dir_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o700)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_private_dir_permissions(_path: &Path) -> Result<(), DaemonError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use taskdeck_core::UserId;
    use taskdeck_sync::SyncReport;
    use tempfile::TempDir;
    use tokio::time::sleep;

    /// Fails its first `fail_first` runs, then succeeds.
    #[derive(Default)]
    struct ScriptedJob {
        fail_first: usize,
        work: Duration,
        runs: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedJob {
        fn failing(fail_first: usize) -> Arc<Self> {
            Arc::new(Self {
                fail_first,
                ..Self::default()
            })
        }

        fn runs(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }
    }

    impl SyncJob for ScriptedJob {
        fn run_once(&self) -> JobOutcome {
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(running, Ordering::SeqCst);
            if !self.work.is_zero() {
                std::thread::sleep(self.work);
            }
            let run = self.runs.fetch_add(1, Ordering::SeqCst);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if run < self.fail_first {
                JobOutcome::RetryableFailure(SyncError::ProfileMissing {
                    user_id: UserId::from("u1"),
                })
            } else {
                JobOutcome::Success(SyncReport {
                    user_id: Some(UserId::from("u1")),
                    action: SyncAction::NoOp,
                    duration: Duration::ZERO,
                })
            }
        }
    }

    struct Harness {
        queue_tx: mpsc::Sender<JobRequest>,
        status: SharedStatus,
        shutdown_tx: broadcast::Sender<()>,
        handle: JoinHandle<Result<(), DaemonError>>,
    }

    impl Harness {
        fn spawn(job: Arc<ScriptedJob>, retry: RetryPolicy) -> Self {
            let status: SharedStatus = Arc::new(RwLock::new(DaemonStatus::default()));
            let (queue_tx, queue_rx) = mpsc::channel(QUEUE_CAPACITY);
            let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
            let settings = ProcessorSettings {
                retry,
                job_timeout: Duration::from_secs(60),
            };
            let handle = tokio::spawn(processor_task(
                job,
                settings,
                status.clone(),
                queue_tx.clone(),
                queue_rx,
                shutdown_rx,
            ));
            Self {
                queue_tx,
                status,
                shutdown_tx,
                handle,
            }
        }

        async fn trigger(&self, trigger: Trigger) {
            self.queue_tx
                .send(JobRequest {
                    trigger,
                    respond_to: None,
                })
                .await
                .expect("queue open");
        }

        async fn status(&self) -> DaemonStatus {
            self.status.read().await.clone()
        }

        async fn stop(self) {
            let _ = self.shutdown_tx.send(());
            self.handle
                .await
                .expect("processor join")
                .expect("processor result");
        }
    }

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn ticker_enqueues_once_per_interval() {
        let (queue_tx, mut queue_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let ticker = tokio::spawn(ticker_task(
            Duration::from_secs(10),
            queue_tx,
            shutdown_rx,
        ));

        sleep(Duration::from_secs(25)).await;
        let _ = shutdown_tx.send(());
        ticker.await.expect("join").expect("ticker result");

        let mut triggers = Vec::new();
        while let Ok(request) = queue_rx.try_recv() {
            triggers.push(request.trigger);
        }
        assert_eq!(
            triggers,
            vec![Trigger::Schedule; 3],
            "ticks at 0s, 10s and 20s"
        );
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn failed_runs_retry_with_growing_delays_and_success_resets() {
        let job = ScriptedJob::failing(2);
        let harness = Harness::spawn(job.clone(), policy(5));

        harness.trigger(Trigger::Schedule).await;
        sleep(Duration::from_millis(500)).await;
        assert_eq!(job.runs(), 1);
        let status = harness.status().await;
        assert_eq!(status.consecutive_failures, 1);
        assert_eq!(status.next_retry, Some(1));
        assert!(status.last_error.is_some());

        // First retry after 1s.
        sleep(Duration::from_secs(1)).await;
        assert_eq!(job.runs(), 2);
        assert_eq!(harness.status().await.consecutive_failures, 2);

        // Second retry waits 2s, not 1s.
        sleep(Duration::from_secs(1)).await;
        assert_eq!(job.runs(), 2);
        sleep(Duration::from_secs(1)).await;
        assert_eq!(job.runs(), 3);

        let status = harness.status().await;
        assert_eq!(status.consecutive_failures, 0);
        assert_eq!(status.next_retry, None);
        assert_eq!(status.last_action, Some(SyncAction::NoOp));
        assert!(status.last_success_at_unix.is_some());

        harness.stop().await;
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn retries_stop_after_budget() {
        let job = ScriptedJob::failing(usize::MAX);
        let harness = Harness::spawn(job.clone(), policy(2));

        harness.trigger(Trigger::Schedule).await;
        sleep(Duration::from_secs(100)).await;

        assert_eq!(job.runs(), 3, "initial run plus two retries");
        let status = harness.status().await;
        assert_eq!(status.consecutive_failures, 3);
        assert_eq!(status.next_retry, None);

        harness.stop().await;
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn new_run_supersedes_pending_retry() {
        let job = ScriptedJob::failing(1);
        let harness = Harness::spawn(job.clone(), policy(5));

        harness.trigger(Trigger::Schedule).await;
        sleep(Duration::from_millis(100)).await;
        harness.trigger(Trigger::Socket).await;
        sleep(Duration::from_secs(10)).await;

        assert_eq!(job.runs(), 2, "the pending retry was cancelled");
        assert_eq!(harness.status().await.consecutive_failures, 0);

        harness.stop().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn queued_runs_never_overlap() {
        let job = Arc::new(ScriptedJob {
            work: Duration::from_millis(20),
            ..ScriptedJob::default()
        });
        let harness = Harness::spawn(job.clone(), policy(0));

        let mut waiters = Vec::new();
        for _ in 0..4 {
            let (tx, rx) = oneshot::channel();
            harness
                .queue_tx
                .send(JobRequest {
                    trigger: Trigger::Socket,
                    respond_to: Some(tx),
                })
                .await
                .expect("queue open");
            waiters.push(rx);
        }
        for rx in waiters {
            let summary = rx.await.expect("summary");
            assert!(summary.ok);
            assert_eq!(summary.trigger, "socket");
        }

        assert_eq!(job.runs(), 4);
        assert_eq!(job.max_in_flight.load(Ordering::SeqCst), 1);
        harness.stop().await;
    }

    #[tokio::test]
    async fn run_past_deadline_is_a_retryable_timeout() {
        let job = Arc::new(ScriptedJob {
            work: Duration::from_millis(300),
            ..ScriptedJob::default()
        });
        let mut executor = Executor::new(job, Duration::from_millis(20));

        let outcome = tokio_test::assert_ok!(executor.execute().await);

        match outcome {
            JobOutcome::RetryableFailure(SyncError::TimedOut { after }) => {
                assert_eq!(after, Duration::from_millis(20));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(executor.abandoned.is_some(), "timed-out run is kept");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn next_run_waits_for_a_timed_out_run() {
        let job = Arc::new(ScriptedJob {
            work: Duration::from_millis(300),
            ..ScriptedJob::default()
        });
        let mut executor = Executor::new(job.clone(), Duration::from_millis(20));

        let first = tokio_test::assert_ok!(executor.execute().await);
        let second = tokio_test::assert_ok!(executor.execute().await);
        assert!(!first.is_success());
        assert!(!second.is_success());

        // The second run only starts once the first has finished.
        assert_eq!(job.runs(), 1);
        executor.drain_abandoned().await;
        assert_eq!(job.runs(), 2);
        assert_eq!(job.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn processor_never_overlaps_timed_out_runs() {
        let job = Arc::new(ScriptedJob {
            work: Duration::from_millis(150),
            ..ScriptedJob::default()
        });
        let status: SharedStatus = Arc::new(RwLock::new(DaemonStatus::default()));
        let (queue_tx, queue_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let settings = ProcessorSettings {
            retry: policy(0),
            job_timeout: Duration::from_millis(10),
        };
        let handle = tokio::spawn(processor_task(
            job.clone(),
            settings,
            status.clone(),
            queue_tx.clone(),
            queue_rx,
            shutdown_rx,
        ));

        let mut waiters = Vec::new();
        for _ in 0..3 {
            let (tx, rx) = oneshot::channel();
            queue_tx
                .send(JobRequest {
                    trigger: Trigger::Socket,
                    respond_to: Some(tx),
                })
                .await
                .expect("queue open");
            waiters.push(rx);
        }
        for rx in waiters {
            let summary = rx.await.expect("summary");
            assert!(!summary.ok, "every run misses the deadline");
        }

        let _ = shutdown_tx.send(());
        handle.await.expect("join").expect("processor result");
        assert_eq!(job.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(status.read().await.consecutive_failures, 3);
    }

    #[test]
    fn summary_reports_failure_text() {
        let outcome = JobOutcome::RetryableFailure(SyncError::TimedOut {
            after: Duration::from_secs(60),
        });
        let summary = RunSummary::new(Trigger::Retry(2), &outcome, Duration::from_millis(5));
        assert_eq!(summary.trigger, "retry-2");
        assert!(!summary.ok);
        assert!(summary.error.is_some());
        assert_eq!(summary.action, None);
    }

    #[tokio::test]
    async fn status_payload_before_any_run() {
        let home = TempDir::new().expect("home");
        let status: SharedStatus = Arc::new(RwLock::new(DaemonStatus {
            started_at_unix: 1_000_000,
            ..DaemonStatus::default()
        }));

        let payload = build_status_payload(home.path(), &status, Duration::from_secs(900)).await;

        assert_eq!(payload["running"], json!(true));
        assert_eq!(payload["started_at_unix"], json!(1_000_000u64));
        assert_eq!(payload["interval_secs"], json!(900u64));
        assert_eq!(payload["last_success_at_unix"], Value::Null);
        assert_eq!(payload["consecutive_failures"], json!(0));
        assert!(payload["socket"]
            .as_str()
            .expect("socket path")
            .ends_with(".taskdeck/taskdeck.sock"));
    }

    #[tokio::test]
    async fn status_payload_reflects_last_outcome() {
        let home = TempDir::new().expect("home");
        let status: SharedStatus = Arc::new(RwLock::new(DaemonStatus::default()));
        let outcome = JobOutcome::Success(SyncReport {
            user_id: Some(UserId::from("u1")),
            action: SyncAction::AdoptedRemote,
            duration: Duration::ZERO,
        });
        let next = record_outcome(&status, Trigger::Schedule, &outcome, &policy(3)).await;
        assert_eq!(next, None);

        let payload = build_status_payload(home.path(), &status, Duration::from_secs(60)).await;
        assert_eq!(payload["last_action"], json!("adopted_remote"));
        assert!(payload["last_success_at_unix"].is_u64());
    }

    #[test]
    fn stale_socket_file_is_removed_before_bind() {
        let home = TempDir::new().expect("home");
        let socket = socket_path(home.path());
        fs::create_dir_all(socket.parent().expect("parent")).expect("root dir");
        fs::write(&socket, b"").expect("stale socket");

        prepare_socket_for_bind(&socket).expect("stale socket cleared");
        assert!(!socket.exists());
    }
}
