//! Synthetic voxel world that feeds the scheduler without terrain or rendering.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use hashbrown::HashSet;
use strata_chunk::{Chunk, ChunkHandle, VisibilityProvider, VisibleSnapshot};
use strata_geom::{ChunkCoord, Vec3};
use strata_lighting::{LightPropagationItem, PropagationMode, PropagationQueue};

use crate::config::SimConfig;

const TORCH_LIGHT: u8 = 14;

pub struct SimChunk {
    coord: ChunkCoord,
    size: u32,
    work: Duration,
    dirty: AtomicBool,
    fresh: AtomicBool,
    light_dirty: AtomicBool,
    light_queue: Mutex<PropagationQueue>,
    mesh_rev: AtomicU64,
    uploaded_rev: AtomicU64,
    light_steps: AtomicU64,
    uploads: AtomicU64,
}

impl SimChunk {
    pub fn new(coord: ChunkCoord, size: u32, work: Duration) -> Self {
        Self {
            coord,
            size,
            work,
            dirty: AtomicBool::new(false),
            fresh: AtomicBool::new(true),
            light_dirty: AtomicBool::new(false),
            light_queue: Mutex::new(PropagationQueue::new()),
            mesh_rev: AtomicU64::new(0),
            uploaded_rev: AtomicU64::new(0),
            light_steps: AtomicU64::new(0),
            uploads: AtomicU64::new(0),
        }
    }

    fn base(&self) -> (i32, i32, i32) {
        let s = self.size as i32;
        (self.coord.cx * s, self.coord.cy * s, self.coord.cz * s)
    }

    /// Simulates a block edit at local `(lx, ly, lz)`: the mesh goes stale and
    /// light changes at that block.
    pub fn edit(&self, lx: i32, ly: i32, lz: i32, place_torch: bool) {
        let (bx, by, bz) = self.base();
        let item = LightPropagationItem::new(
            bx + lx,
            by + ly,
            bz + lz,
            TORCH_LIGHT,
            if place_torch {
                PropagationMode::Spread
            } else {
                PropagationMode::Unspread
            },
        );
        self.light_queue
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(item);
        self.dirty.store(true, Ordering::Release);
        self.light_dirty.store(true, Ordering::Release);
    }

    // Light falls straight down the column until it fades or leaves the chunk.
    fn propagate_light(&self) -> u64 {
        let mut queue = std::mem::take(&mut *self.light_queue.lock().unwrap_or_else(|p| p.into_inner()));
        let (_, by, _) = self.base();
        let mut steps = 0u64;
        while let Some(item) = queue.pop() {
            steps += 1;
            if let Some(next) = item.step(0, -1, 0, 1) {
                if next.y >= by {
                    queue.push(next);
                }
            }
        }
        steps
    }

    pub fn uploads(&self) -> u64 {
        self.uploads.load(Ordering::Acquire)
    }

    pub fn is_synced(&self) -> bool {
        self.uploaded_rev.load(Ordering::Acquire) == self.mesh_rev.load(Ordering::Acquire)
    }

    pub fn light_steps(&self) -> u64 {
        self.light_steps.load(Ordering::Acquire)
    }
}

impl Chunk for SimChunk {
    fn coord(&self) -> ChunkCoord {
        self.coord
    }

    fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    fn is_fresh(&self) -> bool {
        self.fresh.load(Ordering::Acquire)
    }

    fn is_light_dirty(&self) -> bool {
        self.light_dirty.load(Ordering::Acquire)
    }

    fn center(&self) -> Vec3 {
        self.coord.center(self.size)
    }

    fn process_chunk(&self) -> bool {
        let was_fresh = self.fresh.swap(false, Ordering::AcqRel);
        let was_dirty = self.dirty.swap(false, Ordering::AcqRel);
        let light_steps = if self.light_dirty.swap(false, Ordering::AcqRel) {
            self.propagate_light()
        } else {
            0
        };
        if !self.work.is_zero() {
            thread::sleep(self.work);
        }
        self.light_steps.fetch_add(light_steps, Ordering::AcqRel);
        let changed = was_fresh || was_dirty || light_steps > 0;
        if changed {
            self.mesh_rev.fetch_add(1, Ordering::AcqRel);
        }
        changed
    }

    fn generate_vbos(&self) {
        self.uploaded_rev
            .store(self.mesh_rev.load(Ordering::Acquire), Ordering::Release);
        self.uploads.fetch_add(1, Ordering::AcqRel);
    }
}

pub struct SimWorld {
    cfg: SimConfig,
    slots: Vec<Option<ChunkHandle<SimChunk>>>,
    player: Mutex<Vec3>,
    edited: Mutex<HashSet<ChunkCoord>>,
}

impl SimWorld {
    pub fn new(cfg: &SimConfig) -> Self {
        let r = cfg.radius.max(0);
        let work = Duration::from_millis(cfg.work_ms);
        let mut slots = Vec::new();
        for cz in -r..=r {
            for cx in -r..=r {
                let idx = slots.len();
                if cfg.unloaded_every > 0 && idx % cfg.unloaded_every == cfg.unloaded_every - 1 {
                    slots.push(None);
                    continue;
                }
                let coord = ChunkCoord::new(cx, 0, cz);
                slots.push(Some(ChunkHandle::from_chunk(SimChunk::new(
                    coord,
                    cfg.chunk_size.max(1),
                    work,
                ))));
            }
        }
        Self {
            cfg: cfg.clone(),
            slots,
            player: Mutex::new(Vec3::new(0.0, cfg.chunk_size as f32 * 0.5, 0.0)),
            edited: Mutex::new(HashSet::new()),
        }
    }

    /// Moves the player and applies this tick's synthetic edit, if any.
    pub fn advance(&self, tick: u64) {
        {
            let mut player = self.player.lock().unwrap_or_else(|p| p.into_inner());
            player.x += self.cfg.player_speed;
        }
        if self.cfg.edit_every == 0 || tick % self.cfg.edit_every != 0 {
            return;
        }
        let loaded: Vec<&ChunkHandle<SimChunk>> = self.slots.iter().flatten().collect();
        if loaded.is_empty() {
            return;
        }
        let pick = (tick.wrapping_mul(7919) % loaded.len() as u64) as usize;
        let chunk = loaded[pick];
        let s = self.cfg.chunk_size.max(1) as i32;
        let local = (tick as i32).rem_euclid(s);
        chunk.edit(local, s - 1, (local * 3).rem_euclid(s), tick % 3 != 0);
        self.edited
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(chunk.coord());
        log::debug!(target: "events", "[tick {}] edit in chunk {}", tick, chunk.coord());
    }

    pub fn chunks(&self) -> impl Iterator<Item = &ChunkHandle<SimChunk>> {
        self.slots.iter().flatten()
    }

    pub fn loaded_count(&self) -> usize {
        self.chunks().count()
    }

    pub fn pending_count(&self) -> usize {
        self.chunks().filter(|c| c.needs_update()).count()
    }

    pub fn edited_count(&self) -> usize {
        self.edited.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

impl VisibilityProvider<SimChunk> for SimWorld {
    fn fetch_visible_chunks(&self) -> VisibleSnapshot<SimChunk> {
        self.slots.clone()
    }

    fn reference_point(&self) -> Vec3 {
        *self.player.lock().unwrap_or_else(|p| p.into_inner())
    }
}
