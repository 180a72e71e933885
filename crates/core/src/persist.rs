use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{self, Instant};

use crate::error::Result;
use crate::roster::Roster;

/// Quiet period before a scheduled roster write lands on disk
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Read the state file. `Ok(None)` when it does not exist.
pub async fn read_roster(path: &Path) -> Result<Option<Roster>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Startup load: the persisted roster when readable, otherwise `default`.
///
/// Missing, unreadable and malformed files are never fatal.
pub async fn load_roster_or(path: &Path, default: Roster) -> Roster {
    match read_roster(path).await {
        Ok(Some(roster)) => {
            info!(
                "Loaded roster from {} ({} categories, {} members)",
                path.display(),
                roster.categories().len(),
                roster.member_count()
            );
            roster
        }
        Ok(None) => {
            debug!("No roster state at {}; starting fresh", path.display());
            default
        }
        Err(err) => {
            warn!("Could not load {}: {err}; starting fresh", path.display());
            default
        }
    }
}

/// Write the whole roster, pretty-printed, via a temp file and rename.
pub async fn write_roster(path: &Path, roster: &Roster) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let bytes = serde_json::to_vec_pretty(roster)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Emitted after every write attempt
#[derive(Debug, Clone)]
pub struct FlushReport {
    pub success: bool,
    pub categories: usize,
    pub members: usize,
    pub error: Option<String>,
}

enum PersistCommand {
    Schedule(Roster),
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Debounced background writer for the roster state file.
///
/// Every [`RosterPersister::schedule`] replaces the pending snapshot and
/// restarts the quiet-period timer, so a burst of mutations produces a single
/// write holding the last state.
#[derive(Clone)]
pub struct RosterPersister {
    inner: Arc<PersisterInner>,
}

struct PersisterInner {
    path: PathBuf,
    command_tx: mpsc::UnboundedSender<PersistCommand>,
    update_tx: broadcast::Sender<FlushReport>,
}

impl RosterPersister {
    /// Spawn the writer task. Must be called inside a tokio runtime.
    pub fn start(path: impl Into<PathBuf>, debounce: Duration) -> Self {
        let path = path.into();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (update_tx, _) = broadcast::channel(32);

        spawn_writer_loop(path.clone(), debounce, command_rx, update_tx.clone());

        Self {
            inner: Arc::new(PersisterInner {
                path,
                command_tx,
                update_tx,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Queue `roster` for writing once the debounce window goes quiet.
    pub fn schedule(&self, roster: Roster) {
        if self
            .inner
            .command_tx
            .send(PersistCommand::Schedule(roster))
            .is_err()
        {
            warn!("Roster writer is gone; change kept in memory only");
        }
    }

    /// Write any pending snapshot now.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self
            .inner
            .command_tx
            .send(PersistCommand::Flush(done_tx))
            .is_ok()
        {
            let _ = done_rx.await;
        }
    }

    /// Flush and stop the writer task.
    pub async fn shutdown(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self
            .inner
            .command_tx
            .send(PersistCommand::Shutdown(done_tx))
            .is_ok()
        {
            let _ = done_rx.await;
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<FlushReport> {
        self.inner.update_tx.subscribe()
    }
}

fn spawn_writer_loop(
    path: PathBuf,
    debounce: Duration,
    mut command_rx: mpsc::UnboundedReceiver<PersistCommand>,
    update_tx: broadcast::Sender<FlushReport>,
) {
    tokio::spawn(async move {
        let mut pending: Option<Roster> = None;
        let mut deadline: Option<Instant> = None;

        loop {
            let next_deadline = deadline;

            tokio::select! {
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(PersistCommand::Schedule(roster)) => {
                            if pending.is_some() {
                                debug!("Coalescing roster write");
                            }
                            pending = Some(roster);
                            deadline = Some(Instant::now() + debounce);
                        }
                        Some(PersistCommand::Flush(done)) => {
                            deadline = None;
                            write_pending(&path, &mut pending, &update_tx).await;
                            let _ = done.send(());
                        }
                        Some(PersistCommand::Shutdown(done)) => {
                            write_pending(&path, &mut pending, &update_tx).await;
                            let _ = done.send(());
                            break;
                        }
                        None => {
                            write_pending(&path, &mut pending, &update_tx).await;
                            break;
                        }
                    }
                }
                () = async {
                    if let Some(at) = next_deadline {
                        time::sleep_until(at).await;
                    }
                }, if next_deadline.is_some() => {
                    deadline = None;
                    write_pending(&path, &mut pending, &update_tx).await;
                }
            }
        }
        debug!("Roster writer for {} stopped", path.display());
    });
}

async fn write_pending(
    path: &Path,
    pending: &mut Option<Roster>,
    update_tx: &broadcast::Sender<FlushReport>,
) {
    let Some(roster) = pending.take() else {
        return;
    };
    let report = match write_roster(path, &roster).await {
        Ok(()) => {
            info!("Roster saved to {}", path.display());
            FlushReport {
                success: true,
                categories: roster.categories().len(),
                members: roster.member_count(),
                error: None,
            }
        }
        Err(err) => {
            warn!("Could not save {}: {err}", path.display());
            FlushReport {
                success: false,
                categories: roster.categories().len(),
                members: roster.member_count(),
                error: Some(err.to_string()),
            }
        }
    };
    let _ = update_tx.send(report);
}
