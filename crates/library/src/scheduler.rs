use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use common::{AlbumUnit, Bitrate, CompletedRecord, NamingMode};
use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::audio::{AudioSource, FileAudioSource};
use crate::discovery::{album_dir, discover, track_files};
use crate::engine::{consolidate, ConsolidateError};
use crate::export::export;
use crate::progress::{AlbumEnricher, BatchEvent, NoEnrichment, ProgressSink};
use crate::LibraryError;

const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);
const SHUTDOWN_POLL: Duration = Duration::from_millis(10);

#[derive(Debug)]
pub enum BatchError {
    InvalidDirectory(PathBuf),
    AlreadyRunning,
    NoInputRoot,
    Io(std::io::Error),
}

impl std::fmt::Display for BatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchError::InvalidDirectory(path) => {
                write!(f, "invalid directory: {}", path.display())
            }
            BatchError::AlreadyRunning => write!(f, "a batch is already running"),
            BatchError::NoInputRoot => write!(f, "no input folder loaded"),
            BatchError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for BatchError {}

impl From<LibraryError> for BatchError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::InvalidDirectory(path) => BatchError::InvalidDirectory(path),
            LibraryError::Io(err) => BatchError::Io(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub output_root: PathBuf,
    pub bitrate: Bitrate,
    pub naming: NamingMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingEntry {
    pub artist: String,
    pub album: String,
    pub gap: bool,
}

/// The album currently being consolidated and how far it has got.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InFlight {
    pub artist: String,
    pub album: String,
    pub processed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSnapshot {
    pub state: RunState,
    pub input_root: Option<PathBuf>,
    pub pending: Vec<PendingEntry>,
    pub completed: Vec<CompletedRecord>,
    pub current: Option<InFlight>,
}

struct BatchState {
    run: RunState,
    input_root: Option<PathBuf>,
    pending: VecDeque<AlbumUnit>,
    gaps: HashMap<AlbumUnit, bool>,
    default_gap: bool,
    completed: Vec<CompletedRecord>,
    current: Option<InFlight>,
    batch_token: Option<CancellationToken>,
    album_token: Option<CancellationToken>,
}

impl BatchState {
    fn gap_for(&self, unit: &AlbumUnit) -> bool {
        self.gaps.get(unit).copied().unwrap_or(self.default_gap)
    }
}

struct Shared {
    state: Mutex<BatchState>,
    /// Serialises delivery to `sink`. Taken before `state` when both are held.
    emit: Mutex<()>,
    sink: Arc<dyn ProgressSink>,
    source: Arc<dyn AudioSource>,
    enricher: Arc<dyn AlbumEnricher>,
}

impl Shared {
    fn emit(&self, event: BatchEvent) {
        let _order = self.emit.lock();
        self.sink.on_event(event);
    }
}

/// Everything the worker needs, fixed at `start`.
struct BatchJob {
    input_root: PathBuf,
    options: BatchOptions,
    gaps: HashMap<AlbumUnit, bool>,
    default_gap: bool,
    cancel: CancellationToken,
}

/// Owns the pending queue and drives one worker thread through it.
///
/// Control calls (`load_albums`, `start`, the cancels, gap toggles) take the
/// state lock briefly and return; consolidation and export run on the
/// worker. `cancel_all` cancels the batch token, whose child tokens are the
/// per-album tokens, so cancelling everything always cancels the current
/// album too.
#[derive(Clone)]
pub struct BatchScheduler {
    shared: Arc<Shared>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
    shutdown_grace: Duration,
}

impl BatchScheduler {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self::with_collaborators(sink, Arc::new(FileAudioSource), Arc::new(NoEnrichment))
    }

    pub fn with_collaborators(
        sink: Arc<dyn ProgressSink>,
        source: Arc<dyn AudioSource>,
        enricher: Arc<dyn AlbumEnricher>,
    ) -> Self {
        let state = BatchState {
            run: RunState::Idle,
            input_root: None,
            pending: VecDeque::new(),
            gaps: HashMap::new(),
            default_gap: true,
            completed: Vec::new(),
            current: None,
            batch_token: None,
            album_token: None,
        };
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                emit: Mutex::new(()),
                sink,
                source,
                enricher,
            }),
            worker: Arc::new(Mutex::new(None)),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Gap preference given to albums the first time they are discovered.
    pub fn with_default_gap(self, enabled: bool) -> Self {
        self.shared.state.lock().default_gap = enabled;
        self
    }

    /// Replaces the pending queue with the albums found under `root`.
    /// Preferences of albums already known are kept.
    pub fn load_albums(&self, root: &Path) -> Result<usize, BatchError> {
        if self.is_running() {
            return Err(BatchError::AlreadyRunning);
        }
        let units = discover(root)?;

        let mut state = self.shared.state.lock();
        if state.run == RunState::Running {
            return Err(BatchError::AlreadyRunning);
        }
        let gaps: HashMap<AlbumUnit, bool> = units
            .iter()
            .map(|unit| (unit.clone(), state.gap_for(unit)))
            .collect();
        state.gaps = gaps;
        state.pending = units.into_iter().collect();
        state.input_root = Some(root.to_path_buf());
        info!("Loaded {} albums from {}", state.pending.len(), root.display());
        Ok(state.pending.len())
    }

    /// Returns false when `unit` is not pending.
    pub fn set_gap(&self, unit: &AlbumUnit, enabled: bool) -> bool {
        let mut state = self.shared.state.lock();
        if !state.pending.contains(unit) {
            return false;
        }
        state.gaps.insert(unit.clone(), enabled);
        true
    }

    pub fn set_all_gaps(&self, enabled: bool) {
        let mut state = self.shared.state.lock();
        let units: Vec<AlbumUnit> = state.pending.iter().cloned().collect();
        for unit in units {
            state.gaps.insert(unit, enabled);
        }
    }

    /// Drops `unit` from the queue. The album in flight is not pending and
    /// is unaffected; use `cancel_current` for that.
    pub fn remove_pending(&self, unit: &AlbumUnit) -> bool {
        let mut state = self.shared.state.lock();
        let before = state.pending.len();
        state.pending.retain(|pending| pending != unit);
        state.pending.len() != before
    }

    pub fn remove_pending_many(&self, units: &[AlbumUnit]) -> usize {
        let mut state = self.shared.state.lock();
        let before = state.pending.len();
        state.pending.retain(|pending| !units.contains(pending));
        before - state.pending.len()
    }

    pub fn start(&self, options: BatchOptions) -> Result<(), BatchError> {
        if !options.output_root.is_dir() {
            return Err(BatchError::InvalidDirectory(options.output_root));
        }

        let mut worker = self.worker.lock();
        let job = {
            let mut state = self.shared.state.lock();
            if state.run == RunState::Running {
                return Err(BatchError::AlreadyRunning);
            }
            let input_root = state.input_root.clone().ok_or(BatchError::NoInputRoot)?;
            let cancel = CancellationToken::new();
            state.run = RunState::Running;
            state.batch_token = Some(cancel.clone());
            state.current = None;
            BatchJob {
                input_root,
                gaps: state.gaps.clone(),
                default_gap: state.default_gap,
                options,
                cancel,
            }
        };

        info!(
            "Starting batch: output={} bitrate={} naming={:?}",
            job.options.output_root.display(),
            job.options.bitrate,
            job.options.naming
        );
        let shared = self.shared.clone();
        let spawned = thread::Builder::new()
            .name("album-batch".to_string())
            .spawn(move || run_batch(shared, job));
        match spawned {
            Ok(handle) => {
                *worker = Some(handle);
                Ok(())
            }
            Err(err) => {
                error!("Failed to spawn batch worker: {}", err);
                let mut state = self.shared.state.lock();
                state.run = RunState::Idle;
                state.batch_token = None;
                Err(BatchError::Io(err))
            }
        }
    }

    /// Aborts the album in progress; the batch moves on to the next one.
    /// Between albums there is nothing to cancel and the call is a no-op.
    pub fn cancel_current(&self) {
        let state = self.shared.state.lock();
        if let Some(token) = &state.album_token {
            info!("Cancelling current album");
            token.cancel();
        }
    }

    /// Aborts the album in progress and empties the queue before returning.
    pub fn cancel_all(&self) {
        let mut state = self.shared.state.lock();
        let dropped = state.pending.len();
        state.pending.clear();
        if let Some(token) = &state.batch_token {
            token.cancel();
        }
        info!("Cancelling batch; {} pending albums dropped", dropped);
    }

    pub fn snapshot(&self) -> BatchSnapshot {
        let state = self.shared.state.lock();
        BatchSnapshot {
            state: state.run,
            input_root: state.input_root.clone(),
            pending: state
                .pending
                .iter()
                .map(|unit| PendingEntry {
                    artist: unit.artist.clone(),
                    album: unit.album.clone(),
                    gap: state.gap_for(unit),
                })
                .collect(),
            completed: state.completed.clone(),
            current: state.current.clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.lock().run == RunState::Running
    }

    /// Blocks until the current worker, if any, has exited.
    pub fn join(&self) {
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("Batch worker panicked");
            }
        }
    }

    /// Cancels everything. With `wait`, gives the worker up to the shutdown
    /// grace to exit; otherwise it is left to wind down on its own. Returns
    /// whether the worker is known to have stopped.
    pub fn shutdown(&self, wait: bool) -> bool {
        self.cancel_all();
        let mut worker = self.worker.lock();
        let Some(handle) = worker.take() else {
            return true;
        };
        if handle.is_finished() {
            let _ = handle.join();
            return true;
        }
        if !wait {
            info!("Abandoning running batch worker");
            *worker = Some(handle);
            return false;
        }

        let deadline = Instant::now() + self.shutdown_grace;
        while Instant::now() < deadline {
            if handle.is_finished() {
                let _ = handle.join();
                return true;
            }
            thread::sleep(SHUTDOWN_POLL);
        }
        warn!(
            "Batch worker still busy after {:?}; abandoning it",
            self.shutdown_grace
        );
        *worker = Some(handle);
        false
    }
}

fn run_batch(shared: Arc<Shared>, job: BatchJob) {
    loop {
        let next = {
            let mut state = shared.state.lock();
            if job.cancel.is_cancelled() {
                None
            } else {
                state.pending.pop_front().map(|unit| {
                    let token = job.cancel.child_token();
                    state.album_token = Some(token.clone());
                    state.current = Some(InFlight {
                        artist: unit.artist.clone(),
                        album: unit.album.clone(),
                        processed: 0,
                        total: 0,
                    });
                    (unit, token)
                })
            }
        };
        let Some((unit, token)) = next else {
            break;
        };

        shared.emit(BatchEvent::AlbumStarted(unit.clone()));
        spawn_enrichment(&shared, &unit);

        let gap = job.gaps.get(&unit).copied().unwrap_or(job.default_gap);
        let record = match catch_unwind(AssertUnwindSafe(|| {
            process_album(&shared, &job, &unit, gap, &token)
        })) {
            Ok(record) => record,
            Err(_) => {
                error!("Processing {} panicked", unit);
                CompletedRecord::failed(&unit)
            }
        };

        {
            let mut state = shared.state.lock();
            state.completed.push(record.clone());
            state.album_token = None;
            state.current = None;
        }
        shared.emit(BatchEvent::AlbumFinished(record));
    }

    // A new run can start as soon as the state reads Idle; holding the emit
    // lock across the switch keeps its first event behind our BatchIdle.
    let _order = shared.emit.lock();
    {
        let mut state = shared.state.lock();
        state.run = RunState::Idle;
        state.current = None;
        state.album_token = None;
        state.batch_token = None;
    }
    shared.sink.on_event(BatchEvent::BatchIdle);
}

fn process_album(
    shared: &Shared,
    job: &BatchJob,
    unit: &AlbumUnit,
    gap: bool,
    token: &CancellationToken,
) -> CompletedRecord {
    let Some(dir) = album_dir(&job.input_root, unit) else {
        warn!("Album folder for {} not found", unit);
        return CompletedRecord::failed(unit);
    };
    let files = track_files(&dir);

    let mut progress = |index: usize, total: usize| {
        if let Some(current) = shared.state.lock().current.as_mut() {
            current.processed = index;
            current.total = total;
        }
        shared.emit(BatchEvent::TrackProgress { index, total });
    };

    let buffer = match consolidate(shared.source.as_ref(), &files, gap, token, &mut progress) {
        Ok(buffer) => buffer,
        Err(ConsolidateError::Cancelled) => {
            info!("Cancelled {}", unit);
            return CompletedRecord::failed(unit);
        }
        Err(ConsolidateError::NoPlayableTracks) => {
            warn!("No playable tracks in {}", dir.display());
            return CompletedRecord::failed(unit);
        }
    };

    let options = &job.options;
    match export(
        &buffer,
        &unit.artist,
        &unit.album,
        options.bitrate,
        options.naming,
        &options.output_root,
    ) {
        Ok(result) => CompletedRecord::succeeded(unit, result.duration_label, result.size_mb),
        Err(err) => {
            error!("Export of {} failed: {}", unit, err);
            CompletedRecord::failed(unit)
        }
    }
}

fn spawn_enrichment(shared: &Arc<Shared>, unit: &AlbumUnit) {
    let shared = shared.clone();
    let unit = unit.clone();
    let spawned = thread::Builder::new()
        .name("album-details".to_string())
        .spawn(move || {
            let details = shared.enricher.fetch_art_and_facts(&unit.artist, &unit.album);
            if !details.is_empty() {
                shared.emit(BatchEvent::AlbumDetails { unit, details });
            }
        });
    if let Err(err) = spawned {
        warn!("Failed to spawn details lookup: {}", err);
    }
}
