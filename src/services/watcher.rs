use crate::error::AppError;
use crate::services::fs_service::is_image_file;
use crate::services::gallery::GalleryService;
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A filesystem change the gallery cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Created(PathBuf),
    Deleted(PathBuf),
}

/// Map a raw notify event onto gallery events, dropping directories and
/// unsupported extensions. Renames count as a delete of the old name and a
/// create of the new one.
pub fn normalize_event(event: &Event, extensions: &BTreeSet<String>) -> Vec<WatchEvent> {
    let created = |p: &PathBuf| (!p.is_dir()).then(|| WatchEvent::Created(p.clone()));
    let deleted = |p: &PathBuf| Some(WatchEvent::Deleted(p.clone()));

    let events: Vec<WatchEvent> = match &event.kind {
        EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => Vec::new(),
        EventKind::Create(_) => event.paths.iter().filter_map(created).collect(),
        EventKind::Remove(_) => event.paths.iter().filter_map(deleted).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths.iter().filter_map(created).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => event.paths.iter().filter_map(deleted).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut out = Vec::new();
            if let Some(from) = event.paths.first() {
                out.extend(deleted(from));
            }
            if let Some(to) = event.paths.get(1) {
                out.extend(created(to));
            }
            out
        }
        // Some backends cannot tell which side of the rename a path is on
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .filter_map(|p| if p.exists() { created(p) } else { deleted(p) })
            .collect(),
        _ => Vec::new(),
    };

    events
        .into_iter()
        .filter(|e| match e {
            WatchEvent::Created(p) | WatchEvent::Deleted(p) => is_image_file(p, extensions),
        })
        .collect()
}

/// Per-path delayed tasks. Rescheduling a path restarts its delay.
pub struct Debouncer {
    delay: Duration,
    pending: HashMap<PathBuf, JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: HashMap::new(),
        }
    }

    /// Run `work` once `path` has been quiet for the delay. Only the wait can
    /// be cancelled; once `work` starts it runs to completion.
    pub fn schedule<F>(&mut self, path: PathBuf, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.retain(|_, handle| !handle.is_finished());
        if let Some(previous) = self.pending.remove(&path) {
            previous.abort();
        }

        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(work);
        });
        self.pending.insert(path, handle);
    }

    /// Returns true if a pending task was cancelled.
    pub fn cancel(&mut self, path: &Path) -> bool {
        match self.pending.remove(path) {
            Some(handle) => {
                let was_waiting = !handle.is_finished();
                handle.abort();
                was_waiting
            }
            None => false,
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.values().filter(|h| !h.is_finished()).count()
    }
}

/// Watches the screenshot folder (non-recursively) for the lifetime of the value.
pub struct FolderWatcher {
    _watcher: RecommendedWatcher,
    dispatcher: JoinHandle<()>,
}

impl FolderWatcher {
    pub fn start(service: Arc<GalleryService>, debounce: Duration) -> Result<Self, AppError> {
        let dir = service.watch_dir().to_path_buf();
        if !dir.is_dir() {
            return Err(AppError::WatchedFolderMissing(dir));
        }

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Event>();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                let _ = tx.send(event);
            }
            Err(e) => warn!("Watcher error: {}", e),
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        let dispatcher = tokio::spawn(dispatch(rx, service, debounce));
        info!("Watching folder: {}", dir.display());

        Ok(Self {
            _watcher: watcher,
            dispatcher,
        })
    }
}

impl Drop for FolderWatcher {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

async fn dispatch(
    mut rx: tokio::sync::mpsc::UnboundedReceiver<Event>,
    service: Arc<GalleryService>,
    debounce: Duration,
) {
    let mut debouncer = Debouncer::new(debounce);

    while let Some(event) = rx.recv().await {
        for change in normalize_event(&event, service.extensions()) {
            match change {
                WatchEvent::Created(path) => {
                    info!("New file detected: {}", path.display());
                    let svc = service.clone();
                    let target = path.clone();
                    debouncer.schedule(path, async move {
                        svc.handle_created(&target).await;
                    });
                }
                WatchEvent::Deleted(path) => {
                    if debouncer.cancel(&path) {
                        debug!("Cancelled pending ingest for {}", path.display());
                    }
                    service.handle_deleted(&path).await;
                }
            }
        }
    }

    debug!("Watcher channel closed");
}
