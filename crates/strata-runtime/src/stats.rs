/// Per-tick dispatch metrics updated by `process_chunk_updates`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UpdateStats {
    pub last_dirty_count: usize,
    /// Exponentially damped mean of dispatch-decision latency in milliseconds.
    pub mean_update_ms: f64,
    pub ticks_recorded: u64,
}

impl UpdateStats {
    /// Folds one tick in: the mean moves halfway towards `elapsed_ms`.
    pub fn record(&mut self, dirty_count: usize, elapsed_ms: f64) {
        self.last_dirty_count = dirty_count;
        self.mean_update_ms = (self.mean_update_ms + elapsed_ms) / 2.0;
        self.ticks_recorded += 1;
    }
}

/// Point-in-time view of scheduler counters for overlays and logs.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SchedulerStats {
    pub dirty_chunks: usize,
    pub mean_update_ms: f64,
    pub vbo_queue: usize,
    pub in_flight: usize,
    pub active_workers: usize,
    pub peak_workers: usize,
    pub worker_cap: usize,
    pub dispatched: u64,
    pub deferred: u64,
    pub completed: u64,
    pub changed: u64,
    pub panicked: u64,
    pub uploaded: u64,
}
