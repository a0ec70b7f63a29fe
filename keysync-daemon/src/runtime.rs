use std::fs;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use keysync_client::HttpTranslationClient;
use keysync_core::{config, SyncConfig};
use keysync_sync::{
    DiskFileAccess, FileAccess, StatusReporter, SyncCoordinator, SyncPaths, TranslationService,
};

use crate::error::{fs_err, socket_err, DaemonError};
use crate::paths::{run_dir, socket_path};
use crate::protocol::{DaemonClient, DaemonReply, DaemonRequest, DaemonStatus, SyncSummary, Trigger};
use crate::status::{unix_seconds_now, StatusLog};
use crate::watcher::{PathWatcher, Side};

const QUEUE_DEPTH: usize = 64;

struct SyncJob {
    trigger: Trigger,
    source: &'static str,
    done: Option<oneshot::Sender<SyncSummary>>,
}

/// Queue handle plus everything the control socket reports. Cheap to clone
/// into each connection task.
#[derive(Clone)]
struct Control {
    queue: mpsc::Sender<SyncJob>,
    shutdown: broadcast::Sender<()>,
    last_sync: Arc<RwLock<Option<SyncSummary>>>,
    status_log: StatusLog,
    config: Arc<SyncConfig>,
    socket: PathBuf,
    started_at_unix: u64,
}

impl Control {
    fn new(
        config: SyncConfig,
        status_log: StatusLog,
        socket: PathBuf,
        queue: mpsc::Sender<SyncJob>,
        shutdown: broadcast::Sender<()>,
    ) -> Self {
        Self {
            queue,
            shutdown,
            last_sync: Arc::new(RwLock::new(None)),
            status_log,
            config: Arc::new(config),
            socket,
            started_at_unix: unix_seconds_now(),
        }
    }

    async fn submit(&self, trigger: Trigger, source: &'static str) -> Result<(), DaemonError> {
        self.enqueue(trigger, source, None).await
    }

    async fn run_and_wait(
        &self,
        trigger: Trigger,
        source: &'static str,
    ) -> Result<SyncSummary, DaemonError> {
        let (done, finished) = oneshot::channel();
        self.enqueue(trigger, source, Some(done)).await?;
        finished
            .await
            .map_err(|_| DaemonError::QueueClosed("sync processor"))
    }

    async fn enqueue(
        &self,
        trigger: Trigger,
        source: &'static str,
        done: Option<oneshot::Sender<SyncSummary>>,
    ) -> Result<(), DaemonError> {
        self.queue
            .send(SyncJob {
                trigger,
                source,
                done,
            })
            .await
            .map_err(|_| DaemonError::QueueClosed("sync queue"))
    }

    async fn status(&self) -> DaemonStatus {
        DaemonStatus {
            started_at_unix: self.started_at_unix,
            editor: self.config.editor.clone(),
            native_path: self.config.native_path.clone(),
            shared_path: self.config.shared_path.clone(),
            service_url: self.config.service.url.clone(),
            last_sync: self.last_sync.read().await.clone(),
            recent: self.status_log.recent(),
            socket: self.socket.clone(),
        }
    }

    async fn handle(&self, request: DaemonRequest) -> DaemonReply {
        let data = match request {
            DaemonRequest::Status => serde_json::to_value(self.status().await),
            DaemonRequest::Sync { direction } => match self.run_and_wait(direction, "socket").await {
                Ok(summary) => serde_json::to_value(summary),
                Err(err) => return DaemonReply::error(err.to_string()),
            },
            DaemonRequest::Stop => {
                tracing::info!("stop requested over control socket");
                let _ = self.shutdown.send(());
                Ok(serde_json::Value::Null)
            }
        };
        match data {
            Ok(data) => DaemonReply::ok(data),
            Err(err) => DaemonReply::error(format!("cannot encode reply: {err}")),
        }
    }
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path) -> Result<(), DaemonError> {
    init_tracing();
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(DaemonError::Runtime)?
        .block_on(run(home.to_path_buf()))
}

/// Run until `stop`, ctrl-c, or the first task failure.
pub async fn run(home: PathBuf) -> Result<(), DaemonError> {
    let config = config::load_at(&home)?;
    let dir = run_dir(&home);
    fs::create_dir_all(&dir).map_err(|e| fs_err(&dir, e))?;
    let socket = socket_path(&home);
    let listener = bind_control_socket(&socket)?;

    let status_log = StatusLog::default();
    let coordinator = Arc::new(SyncCoordinator::new(
        SyncPaths {
            native: config.native_path.clone(),
            shared: config.shared_path.clone(),
        },
        config.editor.clone(),
        DiskFileAccess::new(),
        HttpTranslationClient::from_config(&config),
        status_log.clone(),
    ));
    let window = Duration::from_millis(config.debounce_ms);
    let (queue, jobs) = mpsc::channel(QUEUE_DEPTH);
    let (shutdown, _) = broadcast::channel(4);
    let control = Control::new(config, status_log, socket.clone(), queue.clone(), shutdown.clone());

    tracing::info!(
        editor = %control.config.editor,
        native = %control.config.native_path.display(),
        shared = %control.config.shared_path.display(),
        socket = %socket.display(),
        "keysync daemon starting",
    );

    // Queued before the watchers exist, so it is the first job processed.
    control.submit(Trigger::Bootstrap, "startup").await?;

    let processor = spawn_task(
        &shutdown,
        process_jobs(
            coordinator.clone(),
            control.last_sync.clone(),
            jobs,
            shutdown.subscribe(),
        ),
    );
    let watchers = spawn_task(
        &shutdown,
        watch_files(
            coordinator.paths().clone(),
            window,
            queue,
            shutdown.subscribe(),
        ),
    );
    let server = spawn_task(
        &shutdown,
        serve_control(listener, control, shutdown.subscribe()),
    );
    let signal = spawn_task(&shutdown, wait_for_ctrl_c(shutdown.subscribe()));

    let (processor, watchers, server, signal) = tokio::join!(processor, watchers, server, signal);
    let _ = fs::remove_file(&socket);

    for (task, joined) in [
        ("sync processor", processor),
        ("watcher", watchers),
        ("control socket", server),
        ("signal", signal),
    ] {
        joined.map_err(|err| DaemonError::Task {
            task,
            reason: err.to_string(),
        })??;
    }
    tracing::info!("keysync daemon stopped");
    Ok(())
}

/// Spawn `task`; whichever way it ends, every other task is told to stop.
fn spawn_task<Fut>(
    shutdown: &broadcast::Sender<()>,
    task: Fut,
) -> JoinHandle<Result<(), DaemonError>>
where
    Fut: Future<Output = Result<(), DaemonError>> + Send + 'static,
{
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        let result = task.await;
        if let Err(err) = &result {
            tracing::error!(error = %err, "daemon task failed");
        }
        let _ = shutdown.send(());
        result
    })
}

async fn wait_for_ctrl_c(mut stop: broadcast::Receiver<()>) -> Result<(), DaemonError> {
    tokio::select! {
        _ = stop.recv() => Ok(()),
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|err| DaemonError::Task { task: "signal", reason: err.to_string() })?;
            tracing::info!("ctrl-c received, shutting down");
            Ok(())
        }
    }
}

async fn watch_files(
    paths: SyncPaths,
    window: Duration,
    queue: mpsc::Sender<SyncJob>,
    mut stop: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let (settled_tx, mut settled) = mpsc::unbounded_channel::<Side>();
    let mut native = PathWatcher::new(paths.native, Side::Native, window, settled_tx.clone());
    let mut shared = PathWatcher::new(paths.shared, Side::Shared, window, settled_tx);
    native.start()?;
    shared.start()?;

    loop {
        tokio::select! {
            _ = stop.recv() => break,
            side = settled.recv() => {
                let Some(side) = side else { break };
                tracing::debug!(side = ?side, "settled file change");
                let job = SyncJob { trigger: side.into(), source: "watcher", done: None };
                if queue.send(job).await.is_err() {
                    // The processor is gone, which only happens on shutdown.
                    tracing::debug!("sync queue closed, dropping {side:?} change");
                    break;
                }
            }
        }
    }

    native.stop();
    shared.stop();
    Ok(())
}

/// Runs queued jobs one at a time, so transactions never overlap.
async fn process_jobs<F, T, R>(
    coordinator: Arc<SyncCoordinator<F, T, R>>,
    last_sync: Arc<RwLock<Option<SyncSummary>>>,
    mut jobs: mpsc::Receiver<SyncJob>,
    mut stop: broadcast::Receiver<()>,
) -> Result<(), DaemonError>
where
    F: FileAccess,
    T: TranslationService,
    R: StatusReporter,
{
    loop {
        let job = tokio::select! {
            _ = stop.recv() => break,
            job = jobs.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        let started = Instant::now();
        let outcome = match job.trigger {
            Trigger::Native => coordinator.on_native_file_changed().await,
            Trigger::Shared => coordinator.on_shared_file_changed().await,
            Trigger::Bootstrap => coordinator.initialize_if_needed().await,
        };
        let summary =
            SyncSummary::from_outcome(job.trigger, job.source, &outcome, started.elapsed());
        tracing::info!(
            trigger = %summary.trigger,
            source = %summary.source,
            result = %summary.result,
            detail = %summary.detail,
            duration_ms = summary.duration_ms,
            "sync job done",
        );

        *last_sync.write().await = Some(summary.clone());
        if let Some(done) = job.done {
            let _ = done.send(summary);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Control socket
// ---------------------------------------------------------------------------

/// Bind `socket` with owner-only permissions. A leftover socket file nobody
/// listens on is removed first.
fn bind_control_socket(socket: &Path) -> Result<UnixListener, DaemonError> {
    if socket.exists() {
        if DaemonClient::at_socket(socket.to_path_buf()).is_running() {
            return Err(DaemonError::AlreadyRunning {
                socket: socket.to_path_buf(),
            });
        }
        tracing::warn!(socket = %socket.display(), "removing stale control socket");
        match fs::remove_file(socket) {
            Err(err) if err.kind() != ErrorKind::NotFound => return Err(socket_err(socket, err)),
            _ => {}
        }
    }

    let listener = UnixListener::bind(socket).map_err(|e| socket_err(socket, e))?;
    restrict_to_owner(socket)?;
    Ok(listener)
}

async fn serve_control(
    listener: UnixListener,
    control: Control,
    mut stop: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = stop.recv() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.map_err(|e| socket_err(&control.socket, e))?;
                let control = control.clone();
                tokio::spawn(async move {
                    if let Err(err) = serve_connection(stream, control).await {
                        tracing::warn!(error = %err, "control connection ended with error");
                    }
                });
            }
        }
    }
    Ok(())
}

/// Answer request lines until the peer hangs up or asks the daemon to stop.
async fn serve_connection(stream: UnixStream, control: Control) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| socket_err(&control.socket, e))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let (reply, stopping) = match serde_json::from_str::<DaemonRequest>(&line) {
            Ok(request) => (
                control.handle(request).await,
                request == DaemonRequest::Stop,
            ),
            Err(err) => (DaemonReply::error(format!("bad request: {err}")), false),
        };

        let mut out = serde_json::to_string(&reply)?;
        out.push('\n');
        writer
            .write_all(out.as_bytes())
            .await
            .map_err(|e| socket_err(&control.socket, e))?;
        writer
            .flush()
            .await
            .map_err(|e| socket_err(&control.socket, e))?;

        if stopping {
            break;
        }
    }
    Ok(())
}

/// Install the fmt subscriber (`RUST_LOG`, default `info`). Set
/// `KEYSYNC_LOG_FORMAT=json` for one JSON object per line.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("KEYSYNC_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let _ = if json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
    } else {
        fmt().with_env_filter(filter).with_target(false).try_init()
    };
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| socket_err(path, e))
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) -> Result<(), DaemonError> {
    Ok(())
}
