use std::sync::{Mutex, MutexGuard};

use crossbeam_channel::{Receiver, Sender, unbounded};
use strata_chunk::{Chunk, ChunkHandle};
use strata_geom::Vec3;

use crate::ordering::{nearest_index, sort_by_distance};

/// Hands chunks with fresh meshes from workers to the rendering thread.
///
/// Any number of `VboSender`s may push concurrently; exactly one consumer pops.
/// Pops are nearest-first relative to the reference point passed by the
/// consumer, independent of arrival order. A chunk pushed again before it is
/// applied keeps its single queued entry. There is no backpressure.
pub struct VboUpdateQueue<C: Chunk + ?Sized> {
    tx: Sender<ChunkHandle<C>>,
    rx: Receiver<ChunkHandle<C>>,
    // Items already pulled off the channel by the consumer but not yet applied.
    staged: Mutex<Vec<ChunkHandle<C>>>,
}

pub struct VboSender<C: Chunk + ?Sized> {
    tx: Sender<ChunkHandle<C>>,
}

impl<C: Chunk + ?Sized> Clone for VboSender<C> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<C: Chunk + ?Sized> VboSender<C> {
    /// Returns `false` if the queue has been dropped.
    pub fn push(&self, chunk: ChunkHandle<C>) -> bool {
        self.tx.send(chunk).is_ok()
    }
}

impl<C: Chunk + ?Sized> Default for VboUpdateQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Chunk + ?Sized> VboUpdateQueue<C> {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            staged: Mutex::new(Vec::new()),
        }
    }

    pub fn sender(&self) -> VboSender<C> {
        VboSender {
            tx: self.tx.clone(),
        }
    }

    pub fn push(&self, chunk: ChunkHandle<C>) {
        // Cannot fail: `self` holds the receiver.
        let _ = self.tx.send(chunk);
    }

    fn staged(&self) -> MutexGuard<'_, Vec<ChunkHandle<C>>> {
        let mut staged = self.staged.lock().unwrap_or_else(|poisoned| {
            log::error!(target: "vbo", "VBO staging lock poisoned; recovering");
            poisoned.into_inner()
        });
        for chunk in self.rx.try_iter() {
            if !staged.contains(&chunk) {
                staged.push(chunk);
            }
        }
        staged
    }

    pub fn len(&self) -> usize {
        self.staged().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes the queued chunk closest to `reference`. Ties go to the earlier arrival.
    pub fn pop_nearest(&self, reference: Vec3) -> Option<ChunkHandle<C>> {
        let mut staged = self.staged();
        let idx = nearest_index(&staged, reference)?;
        Some(staged.remove(idx))
    }

    /// Takes everything queued right now, nearest first. Later arrivals stay queued.
    pub fn take_sorted(&self, reference: Vec3) -> Vec<ChunkHandle<C>> {
        let mut batch = std::mem::take(&mut *self.staged());
        sort_by_distance(&mut batch, reference);
        batch
    }

    /// Uploads buffers for every chunk queued at call time, nearest first.
    /// Must be called from the rendering thread only.
    ///
    /// If an upload panics, only that chunk is lost; the rest of the batch is
    /// staged again for the next call.
    pub fn drain_and_apply(&self, reference: Vec3) -> usize {
        let mut pending = Restage {
            queue: self,
            rest: self.take_sorted(reference).into_iter(),
        };
        let mut applied = 0;
        while let Some(chunk) = pending.rest.next() {
            chunk.generate_vbos();
            applied += 1;
        }
        applied
    }
}

struct Restage<'a, C: Chunk + ?Sized> {
    queue: &'a VboUpdateQueue<C>,
    rest: std::vec::IntoIter<ChunkHandle<C>>,
}

impl<C: Chunk + ?Sized> Drop for Restage<'_, C> {
    fn drop(&mut self) {
        if self.rest.len() == 0 {
            return;
        }
        log::warn!(
            target: "vbo",
            "VBO upload interrupted; restaging {} chunks",
            self.rest.len()
        );
        let mut staged = self.queue.staged();
        for chunk in self.rest.by_ref() {
            if !staged.contains(&chunk) {
                staged.push(chunk);
            }
        }
    }
}
