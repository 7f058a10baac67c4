//! Distance ordering relative to a reference point supplied per call.
//!
//! Distances are computed fresh every time; chunks never cache them because the
//! reference point (normally the player) moves between ticks. Ties keep input order.

use std::cmp::Ordering;

use strata_chunk::{Chunk, ChunkHandle};
use strata_geom::Vec3;

#[inline]
pub fn distance_cmp<C: Chunk + ?Sized>(a: &C, b: &C, reference: Vec3) -> Ordering {
    a.distance_to(reference).total_cmp(&b.distance_to(reference))
}

/// Stable ascending sort by distance to `reference`.
pub fn sort_by_distance<C: Chunk + ?Sized>(chunks: &mut Vec<ChunkHandle<C>>, reference: Vec3) {
    let mut keyed: Vec<(f32, ChunkHandle<C>)> = chunks
        .drain(..)
        .map(|chunk| (chunk.distance_to(reference), chunk))
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    chunks.extend(keyed.into_iter().map(|(_, chunk)| chunk));
}

/// Index of the head a stable distance sort would produce.
pub fn nearest_index<C: Chunk + ?Sized>(chunks: &[ChunkHandle<C>], reference: Vec3) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, chunk) in chunks.iter().enumerate() {
        let d = chunk.distance_to(reference);
        match best {
            Some((_, bd)) if d.total_cmp(&bd) != Ordering::Less => {}
            _ => best = Some((i, d)),
        }
    }
    best.map(|(i, _)| i)
}
