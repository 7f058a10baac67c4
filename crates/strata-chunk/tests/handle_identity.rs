use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use proptest::prelude::*;
use strata_chunk::{Chunk, ChunkHandle};
use strata_geom::{ChunkCoord, Vec3};

struct FlagChunk {
    coord: ChunkCoord,
    dirty: AtomicBool,
    fresh: AtomicBool,
    light_dirty: AtomicBool,
}

impl FlagChunk {
    fn new(coord: ChunkCoord, dirty: bool, fresh: bool, light_dirty: bool) -> Self {
        Self {
            coord,
            dirty: AtomicBool::new(dirty),
            fresh: AtomicBool::new(fresh),
            light_dirty: AtomicBool::new(light_dirty),
        }
    }
}

impl Chunk for FlagChunk {
    fn coord(&self) -> ChunkCoord {
        self.coord
    }
    fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Relaxed)
    }
    fn is_fresh(&self) -> bool {
        self.fresh.load(Ordering::Relaxed)
    }
    fn is_light_dirty(&self) -> bool {
        self.light_dirty.load(Ordering::Relaxed)
    }
    fn center(&self) -> Vec3 {
        self.coord.center(16)
    }
    fn process_chunk(&self) -> bool {
        false
    }
    fn generate_vbos(&self) {}
}

#[test]
fn equal_values_are_distinct_identities() {
    let a = ChunkHandle::from_chunk(FlagChunk::new(ChunkCoord::new(1, 0, 1), true, false, false));
    let b = ChunkHandle::from_chunk(FlagChunk::new(ChunkCoord::new(1, 0, 1), true, false, false));
    assert_ne!(a, b);
    assert_eq!(a, a.clone());

    let mut set = HashSet::new();
    assert!(set.insert(a.clone()));
    assert!(!set.insert(a.clone()));
    assert!(set.insert(b));
    assert_eq!(set.len(), 2);
}

#[test]
fn handle_from_shared_arc_keeps_identity() {
    let arc = Arc::new(FlagChunk::new(ChunkCoord::new(0, 0, 0), false, true, false));
    let h1 = ChunkHandle::new(Arc::clone(&arc));
    let h2: ChunkHandle<FlagChunk> = Arc::clone(&arc).into();
    assert_eq!(h1, h2);
    assert!(Arc::ptr_eq(h1.arc(), &arc));
}

#[test]
fn distance_uses_center() {
    let c = FlagChunk::new(ChunkCoord::new(0, 0, 0), false, false, false);
    assert_eq!(c.distance_to(Vec3::new(8.0, 8.0, 8.0)), 0.0);
    assert_eq!(c.distance_to(Vec3::new(8.0, 8.0, 11.0)), 3.0);
}

proptest! {
    // needs_update is exactly the disjunction of the three status flags
    #[test]
    fn needs_update_is_flag_disjunction(dirty: bool, fresh: bool, light: bool) {
        let c = FlagChunk::new(ChunkCoord::new(0, 0, 0), dirty, fresh, light);
        prop_assert_eq!(c.needs_update(), dirty || fresh || light);
    }
}
