use strata_chunk::{Chunk, ChunkHandle, VisibleSnapshot};

/// Keeps loaded chunks that are dirty, fresh or light-dirty, in snapshot order.
pub fn filter_dirty<C: Chunk + ?Sized>(snapshot: VisibleSnapshot<C>) -> Vec<ChunkHandle<C>> {
    snapshot
        .into_iter()
        .flatten()
        .filter(|chunk| chunk.needs_update())
        .collect()
}
