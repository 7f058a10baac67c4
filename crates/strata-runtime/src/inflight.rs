use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use hashbrown::HashSet;
use strata_chunk::{Chunk, ChunkHandle};

struct TrackerState<C: Chunk + ?Sized> {
    in_flight: HashSet<ChunkHandle<C>>,
    active: usize,
    peak: usize,
}

/// Set of chunks under background regeneration plus a counting semaphore that
/// caps how many of them run at once.
///
/// Both live behind one mutex; waiters are woken with `notify_all` and re-check
/// their predicate, so a freed slot is never left unclaimed.
pub struct InFlightTracker<C: Chunk + ?Sized> {
    state: Mutex<TrackerState<C>>,
    changed: Condvar,
    capacity: usize,
}

impl<C: Chunk + ?Sized> InFlightTracker<C> {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(TrackerState {
                in_flight: HashSet::new(),
                active: 0,
                peak: 0,
            }),
            changed: Condvar::new(),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState<C>> {
        self.state.lock().unwrap_or_else(|poisoned| {
            log::error!(target: "chunk_updates", "in-flight lock poisoned; recovering state");
            poisoned.into_inner()
        })
    }

    /// Registers `chunk` as in flight. Returns `false` if it already is.
    pub fn try_acquire(&self, chunk: &ChunkHandle<C>) -> bool {
        self.lock().in_flight.insert(chunk.clone())
    }

    /// Blocks until fewer than `capacity` workers are active, then takes a slot.
    pub fn await_slot(&self) {
        let mut state = self.lock();
        while state.active >= self.capacity {
            state = match self.changed.wait(state) {
                Ok(guard) => guard,
                Err(poisoned) => {
                    log::error!(
                        target: "chunk_updates",
                        "wait for worker slot interrupted by poisoned lock; retrying"
                    );
                    poisoned.into_inner()
                }
            };
        }
        state.active += 1;
        state.peak = state.peak.max(state.active);
    }

    /// Waits for a slot and returns a lease that releases `chunk` when dropped,
    /// including during unwinding.
    pub fn admit(&self, chunk: ChunkHandle<C>) -> SlotLease<'_, C> {
        self.await_slot();
        SlotLease {
            tracker: self,
            chunk,
        }
    }

    /// Drops `chunk` from the in-flight set, frees its slot and wakes all waiters.
    pub fn release(&self, chunk: &ChunkHandle<C>) {
        {
            let mut state = self.lock();
            if !state.in_flight.remove(chunk) {
                log::warn!(
                    target: "chunk_updates",
                    "released chunk {} that was not in flight",
                    chunk.coord()
                );
            }
            match state.active.checked_sub(1) {
                Some(active) => state.active = active,
                None => log::warn!(
                    target: "chunk_updates",
                    "released chunk {} without a held worker slot",
                    chunk.coord()
                ),
            }
        }
        self.changed.notify_all();
    }

    /// Drops `chunk` from the in-flight set without touching the slot count.
    /// Used when a job was registered but never handed to a worker.
    pub fn forget(&self, chunk: &ChunkHandle<C>) {
        self.lock().in_flight.remove(chunk);
        self.changed.notify_all();
    }

    /// Waits until nothing is in flight. Returns `false` if `timeout` elapsed first.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        while !state.in_flight.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = match self.changed.wait_timeout(state, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => {
                    log::error!(target: "chunk_updates", "idle wait interrupted by poisoned lock; retrying");
                    poisoned.into_inner().0
                }
            };
        }
        true
    }

    pub fn contains(&self, chunk: &ChunkHandle<C>) -> bool {
        self.lock().in_flight.contains(chunk)
    }

    pub fn in_flight(&self) -> usize {
        self.lock().in_flight.len()
    }

    pub fn active(&self) -> usize {
        self.lock().active
    }

    /// Highest active count observed since creation.
    pub fn peak_active(&self) -> usize {
        self.lock().peak
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Held by a worker while it processes a chunk.
pub struct SlotLease<'a, C: Chunk + ?Sized> {
    tracker: &'a InFlightTracker<C>,
    chunk: ChunkHandle<C>,
}

impl<C: Chunk + ?Sized> SlotLease<'_, C> {
    #[inline]
    pub fn chunk(&self) -> &ChunkHandle<C> {
        &self.chunk
    }
}

impl<C: Chunk + ?Sized> Drop for SlotLease<'_, C> {
    fn drop(&mut self) {
        self.tracker.release(&self.chunk);
    }
}
