use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use crossbeam_channel::{Sender, TrySendError, bounded};
use rayon::{ThreadPool, ThreadPoolBuilder};
use strata_chunk::{Chunk, ChunkHandle, VisibilityProvider};
use strata_geom::ChunkCoord;

use crate::filter::filter_dirty;
use crate::inflight::InFlightTracker;
use crate::ordering::nearest_index;
use crate::stats::{SchedulerStats, UpdateStats};
use crate::vbo_queue::{VboSender, VboUpdateQueue};
use crate::{SchedulerConfig, SchedulerError};

/// What one call to `process_chunk_updates` decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing visible needed work.
    Idle,
    /// The nearest dirty chunk was handed to the worker pool.
    Dispatched(ChunkCoord),
    /// The nearest dirty chunk is still being processed.
    AlreadyInFlight(ChunkCoord),
    /// The job queue was full; the chunk will be picked up on a later tick.
    Deferred(ChunkCoord),
}

struct ChunkJob<C: Chunk + ?Sized> {
    chunk: ChunkHandle<C>,
    queued_at: Instant,
}

#[derive(Default)]
struct WorkerCounters {
    completed: AtomicU64,
    changed: AtomicU64,
    panicked: AtomicU64,
}

fn run_job<C: Chunk + ?Sized>(
    job: ChunkJob<C>,
    tracker: &InFlightTracker<C>,
    vbo_tx: &VboSender<C>,
    counters: &WorkerCounters,
) {
    let ChunkJob { chunk, queued_at } = job;
    let coord = chunk.coord();
    let lease = tracker.admit(chunk);
    let t_wait_ms = queued_at.elapsed().as_millis().min(u128::from(u32::MAX)) as u32;

    let t0 = Instant::now();
    let result = panic::catch_unwind(AssertUnwindSafe(|| lease.chunk().process_chunk()));
    let t_process_ms = t0.elapsed().as_millis().min(u128::from(u32::MAX)) as u32;

    match result {
        Ok(true) => {
            counters.changed.fetch_add(1, Ordering::Relaxed);
            if !vbo_tx.push(lease.chunk().clone()) {
                log::debug!(target: "vbo", "VBO queue gone; dropping upload for chunk {}", coord);
            }
        }
        Ok(false) => {}
        Err(_) => {
            counters.panicked.fetch_add(1, Ordering::Relaxed);
            log::error!(target: "chunk_updates", "processing chunk {} panicked", coord);
        }
    }
    counters.completed.fetch_add(1, Ordering::Relaxed);
    log::trace!(
        target: "chunk_updates",
        "chunk {} done wait_ms={} process_ms={}",
        coord,
        t_wait_ms,
        t_process_ms
    );
    drop(lease);
}

/// Decides each tick which dirty chunk is regenerated next and hands finished
/// chunks to the rendering thread for buffer upload.
///
/// `process_chunk_updates` never blocks. Work runs on a fixed pool of
/// `worker_cap` threads fed by a bounded job channel; the in-flight tracker
/// keeps at most `worker_cap` chunks processing and never the same chunk twice.
pub struct ChunkUpdateManager<C: Chunk + ?Sized, P: VisibilityProvider<C>> {
    provider: P,
    tracker: Arc<InFlightTracker<C>>,
    vbo_updates: VboUpdateQueue<C>,
    job_tx: Sender<ChunkJob<C>>,
    _pool: ThreadPool,
    counters: Arc<WorkerCounters>,
    stats: Mutex<UpdateStats>,
    dispatched: AtomicU64,
    deferred: AtomicU64,
    uploaded: AtomicU64,
    render_thread: OnceLock<ThreadId>,
}

impl<C: Chunk + ?Sized, P: VisibilityProvider<C>> ChunkUpdateManager<C, P> {
    pub fn new(provider: P, config: &SchedulerConfig) -> Result<Self, SchedulerError> {
        config.validate()?;
        let worker_cap = config.worker_cap();
        let queue_cap = config.queue_capacity();

        let tracker = Arc::new(InFlightTracker::new(worker_cap));
        let vbo_updates = VboUpdateQueue::new();
        let counters = Arc::new(WorkerCounters::default());
        let (job_tx, job_rx) = bounded::<ChunkJob<C>>(queue_cap);

        let prefix = config.thread_name_prefix.clone();
        let pool = ThreadPoolBuilder::new()
            .num_threads(worker_cap)
            .thread_name(move |i| format!("{prefix}-{i}"))
            .build()?;
        for _ in 0..worker_cap {
            let rx = job_rx.clone();
            let tracker = Arc::clone(&tracker);
            let vbo_tx = vbo_updates.sender();
            let counters = Arc::clone(&counters);
            pool.spawn(move || {
                while let Ok(job) = rx.recv() {
                    run_job(job, tracker.as_ref(), &vbo_tx, counters.as_ref());
                }
            });
        }
        log::info!(
            target: "chunk_updates",
            "chunk update workers started: threads={} job_queue={}",
            worker_cap,
            queue_cap
        );

        Ok(Self {
            provider,
            tracker,
            vbo_updates,
            job_tx,
            _pool: pool,
            counters,
            stats: Mutex::new(UpdateStats::default()),
            dispatched: AtomicU64::new(0),
            deferred: AtomicU64::new(0),
            uploaded: AtomicU64::new(0),
            render_thread: OnceLock::new(),
        })
    }

    fn stats_lock(&self) -> MutexGuard<'_, UpdateStats> {
        self.stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Per-tick entry point: picks the nearest dirty visible chunk and, unless it
    /// is already being processed, dispatches it to a worker.
    pub fn process_chunk_updates(&self) -> TickOutcome {
        let started = Instant::now();

        let dirty = filter_dirty(self.provider.fetch_visible_chunks());
        let reference = self.provider.reference_point();
        let Some(idx) = nearest_index(&dirty, reference) else {
            log::trace!(target: "chunk_updates", "no dirty chunks visible");
            return TickOutcome::Idle;
        };
        let head = dirty[idx].clone();
        let coord = head.coord();

        let outcome = if self.tracker.try_acquire(&head) {
            self.dispatch(head)
        } else {
            log::trace!(target: "chunk_updates", "nearest dirty chunk {} already in flight", coord);
            TickOutcome::AlreadyInFlight(coord)
        };

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.stats_lock().record(dirty.len(), elapsed_ms);
        outcome
    }

    fn dispatch(&self, chunk: ChunkHandle<C>) -> TickOutcome {
        let coord = chunk.coord();
        let job = ChunkJob {
            chunk,
            queued_at: Instant::now(),
        };
        match self.job_tx.try_send(job) {
            Ok(()) => {
                self.dispatched.fetch_add(1, Ordering::Relaxed);
                log::debug!(target: "chunk_updates", "dispatched chunk {}", coord);
                TickOutcome::Dispatched(coord)
            }
            Err(TrySendError::Full(job)) => {
                self.tracker.forget(&job.chunk);
                self.deferred.fetch_add(1, Ordering::Relaxed);
                log::debug!(target: "chunk_updates", "job queue full; deferring chunk {}", coord);
                TickOutcome::Deferred(coord)
            }
            Err(TrySendError::Disconnected(job)) => {
                self.tracker.forget(&job.chunk);
                self.deferred.fetch_add(1, Ordering::Relaxed);
                log::warn!(target: "chunk_updates", "worker pool stopped; chunk {} not dispatched", coord);
                TickOutcome::Deferred(coord)
            }
        }
    }

    /// Binds the calling thread as the only one allowed to apply VBO updates.
    /// The first call to `update_vbos` binds implicitly.
    pub fn bind_render_thread(&self) -> Result<(), SchedulerError> {
        self.check_render_thread()
    }

    fn check_render_thread(&self) -> Result<(), SchedulerError> {
        let actual = thread::current().id();
        let expected = *self.render_thread.get_or_init(|| actual);
        if expected != actual {
            log::warn!(
                target: "vbo",
                "VBO update requested off the rendering thread ({:?} != {:?})",
                actual,
                expected
            );
            return Err(SchedulerError::WrongRenderThread { expected, actual });
        }
        Ok(())
    }

    /// Uploads buffers for every chunk queued right now, nearest first.
    /// Returns the number of chunks applied.
    pub fn update_vbos(&self) -> Result<usize, SchedulerError> {
        self.check_render_thread()?;
        let applied = self
            .vbo_updates
            .drain_and_apply(self.provider.reference_point());
        if applied > 0 {
            self.uploaded.fetch_add(applied as u64, Ordering::Relaxed);
            log::trace!(target: "vbo", "applied {} VBO updates", applied);
        }
        Ok(applied)
    }

    /// Dirty chunks seen by the last tick that found any.
    pub fn updates_size(&self) -> usize {
        self.stats_lock().last_dirty_count
    }

    pub fn vbo_updates_size(&self) -> usize {
        self.vbo_updates.len()
    }

    /// Damped mean of per-tick dispatch latency in milliseconds.
    pub fn mean_update_duration(&self) -> f64 {
        self.stats_lock().mean_update_ms
    }

    pub fn worker_cap(&self) -> usize {
        self.tracker.capacity()
    }

    pub fn in_flight(&self) -> &InFlightTracker<C> {
        self.tracker.as_ref()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Waits for every dispatched chunk to finish processing.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.tracker.wait_idle(timeout)
    }

    pub fn stats(&self) -> SchedulerStats {
        let update = *self.stats_lock();
        SchedulerStats {
            dirty_chunks: update.last_dirty_count,
            mean_update_ms: update.mean_update_ms,
            vbo_queue: self.vbo_updates.len(),
            in_flight: self.tracker.in_flight(),
            active_workers: self.tracker.active(),
            peak_workers: self.tracker.peak_active(),
            worker_cap: self.tracker.capacity(),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            deferred: self.deferred.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            changed: self.counters.changed.load(Ordering::Relaxed),
            panicked: self.counters.panicked.load(Ordering::Relaxed),
            uploaded: self.uploaded.load(Ordering::Relaxed),
        }
    }
}
