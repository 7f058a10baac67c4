#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded};
use strata_chunk::{Chunk, ChunkHandle, VisibilityProvider, VisibleSnapshot};
use strata_geom::{ChunkCoord, Vec3};

pub struct MockChunk {
    pub coord: ChunkCoord,
    pub center: Vec3,
    dirty: AtomicBool,
    fresh: AtomicBool,
    light_dirty: AtomicBool,
    pub changes: bool,
    pub panics: bool,
    /// Clear status flags when processing starts instead of when it ends.
    pub clear_early: bool,
    pub work: Duration,
    gate: Mutex<Option<Receiver<()>>>,
    pub processed: AtomicUsize,
    pub uploads: AtomicUsize,
}

impl MockChunk {
    pub fn at(x: f32, dirty: bool) -> Self {
        Self {
            coord: ChunkCoord::new(x as i32, 0, 0),
            center: Vec3::new(x, 0.0, 0.0),
            dirty: AtomicBool::new(dirty),
            fresh: AtomicBool::new(false),
            light_dirty: AtomicBool::new(false),
            changes: true,
            panics: false,
            clear_early: false,
            work: Duration::ZERO,
            gate: Mutex::new(None),
            processed: AtomicUsize::new(0),
            uploads: AtomicUsize::new(0),
        }
    }

    pub fn unchanged(mut self) -> Self {
        self.changes = false;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    pub fn clearing_early(mut self, work: Duration) -> Self {
        self.clear_early = true;
        self.work = work;
        self
    }

    /// Processing blocks until the returned sender fires (or is dropped).
    pub fn gated(self) -> (Self, Sender<()>) {
        let (tx, rx) = bounded(1);
        *self.gate.lock().unwrap() = Some(rx);
        (self, tx)
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    fn clear_flags(&self) {
        self.dirty.store(false, Ordering::SeqCst);
        self.fresh.store(false, Ordering::SeqCst);
        self.light_dirty.store(false, Ordering::SeqCst);
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

impl Chunk for MockChunk {
    fn coord(&self) -> ChunkCoord {
        self.coord
    }
    fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }
    fn is_fresh(&self) -> bool {
        self.fresh.load(Ordering::SeqCst)
    }
    fn is_light_dirty(&self) -> bool {
        self.light_dirty.load(Ordering::SeqCst)
    }
    fn center(&self) -> Vec3 {
        self.center
    }
    fn process_chunk(&self) -> bool {
        self.processed.fetch_add(1, Ordering::SeqCst);
        if self.clear_early {
            self.clear_flags();
        }
        let gate = self.gate.lock().unwrap().clone();
        if let Some(rx) = gate {
            let _ = rx.recv_timeout(Duration::from_secs(10));
        }
        if !self.work.is_zero() {
            thread::sleep(self.work);
        }
        if self.panics {
            panic!("mesh build failed for {}", self.coord);
        }
        self.clear_flags();
        self.changes
    }
    fn generate_vbos(&self) {
        self.uploads.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct TestWorld {
    pub slots: Mutex<Vec<Option<ChunkHandle<MockChunk>>>>,
    pub reference: Mutex<Vec3>,
}

impl TestWorld {
    pub fn new(slots: Vec<Option<ChunkHandle<MockChunk>>>) -> Arc<Self> {
        Arc::new(Self {
            slots: Mutex::new(slots),
            reference: Mutex::new(Vec3::ZERO),
        })
    }
}

impl VisibilityProvider<MockChunk> for TestWorld {
    fn fetch_visible_chunks(&self) -> VisibleSnapshot<MockChunk> {
        self.slots.lock().unwrap().clone()
    }

    fn reference_point(&self) -> Vec3 {
        *self.reference.lock().unwrap()
    }
}

pub fn handle(chunk: MockChunk) -> ChunkHandle<MockChunk> {
    ChunkHandle::from_chunk(chunk)
}

/// Polls `cond` until it holds or `timeout` passes.
pub fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    cond()
}
