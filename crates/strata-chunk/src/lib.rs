//! Chunk collaborator contracts shared by the scheduler and world crates.
#![forbid(unsafe_code)]

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use strata_geom::{ChunkCoord, Vec3};

/// A voxel-world region whose mesh is regenerated in the background and whose
/// GPU buffers are uploaded on the rendering thread.
///
/// Implementations are shared across worker threads, so any state touched by
/// `process_chunk` must use interior mutability.
pub trait Chunk: Send + Sync + 'static {
    fn coord(&self) -> ChunkCoord;

    /// Modified since the last mesh build.
    fn is_dirty(&self) -> bool;

    /// Never meshed yet.
    fn is_fresh(&self) -> bool;

    /// Lighting needs to be recomputed.
    fn is_light_dirty(&self) -> bool;

    /// World-space point used for distance ordering.
    fn center(&self) -> Vec3;

    /// Regenerates the chunk mesh. Returns whether the content changed and the
    /// buffers must be re-uploaded.
    fn process_chunk(&self) -> bool;

    /// Uploads the chunk buffers. Must only run on the thread that owns the
    /// rendering context.
    fn generate_vbos(&self);

    #[inline]
    fn needs_update(&self) -> bool {
        self.is_dirty() || self.is_fresh() || self.is_light_dirty()
    }

    #[inline]
    fn distance_to(&self, reference: Vec3) -> f32 {
        self.center().distance(reference)
    }
}

/// Shared reference to a chunk compared by identity rather than by value.
///
/// Two handles are equal only when they point at the same allocation, which is
/// what in-flight tracking and queue membership rely on.
pub struct ChunkHandle<C: ?Sized>(Arc<C>);

impl<C: ?Sized> ChunkHandle<C> {
    #[inline]
    pub fn new(chunk: Arc<C>) -> Self {
        Self(chunk)
    }

    #[inline]
    pub fn arc(&self) -> &Arc<C> {
        &self.0
    }

    #[inline]
    pub fn into_arc(self) -> Arc<C> {
        self.0
    }

    #[inline]
    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl<C> ChunkHandle<C> {
    pub fn from_chunk(chunk: C) -> Self {
        Self(Arc::new(chunk))
    }
}

impl<C: ?Sized> Clone for ChunkHandle<C> {
    #[inline]
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<C: ?Sized> PartialEq for ChunkHandle<C> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl<C: ?Sized> Eq for ChunkHandle<C> {}

impl<C: ?Sized> Hash for ChunkHandle<C> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl<C: ?Sized> Deref for ChunkHandle<C> {
    type Target = C;
    #[inline]
    fn deref(&self) -> &C {
        &self.0
    }
}

impl<C: ?Sized> From<Arc<C>> for ChunkHandle<C> {
    fn from(value: Arc<C>) -> Self {
        Self(value)
    }
}

impl<C: Chunk + ?Sized> fmt::Debug for ChunkHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkHandle")
            .field("coord", &self.coord())
            .field("addr", &format_args!("{:#x}", self.addr()))
            .finish()
    }
}

/// Owned copy of the currently visible chunk slots. `None` marks an unloaded slot.
pub type VisibleSnapshot<C> = Vec<Option<ChunkHandle<C>>>;

/// Source of the chunks the scheduler considers each tick.
pub trait VisibilityProvider<C: Chunk + ?Sized>: Send + Sync {
    /// Returns a stable snapshot; callers may hold it while the world keeps changing.
    fn fetch_visible_chunks(&self) -> VisibleSnapshot<C>;

    /// Point distances are measured from, normally the player position.
    fn reference_point(&self) -> Vec3;
}

impl<C: Chunk + ?Sized, P: VisibilityProvider<C> + ?Sized> VisibilityProvider<C> for Arc<P> {
    fn fetch_visible_chunks(&self) -> VisibleSnapshot<C> {
        (**self).fetch_visible_chunks()
    }

    fn reference_point(&self) -> Vec3 {
        (**self).reference_point()
    }
}
