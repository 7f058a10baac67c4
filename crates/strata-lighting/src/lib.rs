//! Light propagation work items consumed by the flood-fill lighting pass.
#![forbid(unsafe_code)]

use std::collections::VecDeque;


/// Whether light is being pushed outward or retracted at a position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropagationMode {
    Spread,
    Unspread,
}

impl PropagationMode {
    #[inline]
    pub fn is_spread(self) -> bool {
        matches!(self, PropagationMode::Spread)
    }

    #[inline]
    pub fn inverse(self) -> Self {
        match self {
            PropagationMode::Spread => PropagationMode::Unspread,
            PropagationMode::Unspread => PropagationMode::Spread,
        }
    }
}

/// One pending light spread/unspread step at a block position.
///
/// Items are values: changing the intensity or mode yields a new item instead
/// of mutating one that may already be queued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LightPropagationItem {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    intensity: u8,
    mode: PropagationMode,
}

impl LightPropagationItem {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32, intensity: u8, mode: PropagationMode) -> Self {
        Self {
            x,
            y,
            z,
            intensity,
            mode,
        }
    }

    #[inline]
    pub const fn spread(x: i32, y: i32, z: i32, intensity: u8) -> Self {
        Self::new(x, y, z, intensity, PropagationMode::Spread)
    }

    #[inline]
    pub const fn unspread(x: i32, y: i32, z: i32, intensity: u8) -> Self {
        Self::new(x, y, z, intensity, PropagationMode::Unspread)
    }

    #[inline]
    pub fn intensity(&self) -> u8 {
        self.intensity
    }

    #[inline]
    pub fn mode(&self) -> PropagationMode {
        self.mode
    }

    #[inline]
    pub fn position(&self) -> (i32, i32, i32) {
        (self.x, self.y, self.z)
    }

    #[inline]
    pub fn with_intensity(self, intensity: u8) -> Self {
        Self { intensity, ..self }
    }

    #[inline]
    pub fn with_mode(self, mode: PropagationMode) -> Self {
        Self { mode, ..self }
    }

    /// Item for the neighbor one step away, with intensity reduced by `falloff`.
    /// Returns `None` once the light would be fully attenuated or the neighbor
    /// lies outside the `i32` coordinate range.
    pub fn step(&self, dx: i32, dy: i32, dz: i32, falloff: u8) -> Option<Self> {
        let next = self.intensity.saturating_sub(falloff.max(1));
        if next == 0 {
            return None;
        }
        Some(Self::new(
            self.x.checked_add(dx)?,
            self.y.checked_add(dy)?,
            self.z.checked_add(dz)?,
            next,
            self.mode,
        ))
    }
}

/// FIFO of propagation items, split by mode so retractions drain before spreads.
#[derive(Debug, Default, Clone)]
pub struct PropagationQueue {
    unspread: VecDeque<LightPropagationItem>,
    spread: VecDeque<LightPropagationItem>,
}

impl PropagationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: LightPropagationItem) {
        match item.mode() {
            PropagationMode::Spread => self.spread.push_back(item),
            PropagationMode::Unspread => self.unspread.push_back(item),
        }
    }

    /// Pops the next item; all pending unspread items come before any spread item.
    pub fn pop(&mut self) -> Option<LightPropagationItem> {
        self.unspread
            .pop_front()
            .or_else(|| self.spread.pop_front())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.unspread.len() + self.spread.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.unspread.is_empty() && self.spread.is_empty()
    }

    pub fn pending(&self, mode: PropagationMode) -> usize {
        match mode {
            PropagationMode::Spread => self.spread.len(),
            PropagationMode::Unspread => self.unspread.len(),
        }
    }

    pub fn clear(&mut self) {
        self.unspread.clear();
        self.spread.clear();
    }
}

impl Extend<LightPropagationItem> for PropagationQueue {
    fn extend<T: IntoIterator<Item = LightPropagationItem>>(&mut self, iter: T) {
        for item in iter {
            self.push(item);
        }
    }
}

impl FromIterator<LightPropagationItem> for PropagationQueue {
    fn from_iter<T: IntoIterator<Item = LightPropagationItem>>(iter: T) -> Self {
        let mut q = Self::new();
        q.extend(iter);
        q
    }
}
