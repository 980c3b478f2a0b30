//! Ping-pong pair of same-shaped render targets.

use glam::Vec2;

use crate::error::Result;
use crate::field::{Filter, GridField, Resolution};

/// Two targets of identical shape and an index saying which one holds the
/// committed data.
///
/// Every pass reads [`read`](Self::read), writes [`write`](Self::write) and
/// then calls [`swap`](Self::swap). The targets are never resized apart from
/// each other.
#[derive(Debug)]
pub struct DoubleTarget<T> {
    targets: [T; 2],
    index: usize,
    resolution: Resolution,
    texel_size: Vec2,
}

impl<T> DoubleTarget<T> {
    /// Pair two already-allocated targets of `resolution`.
    pub fn from_pair(first: T, second: T, resolution: Resolution) -> Self {
        Self {
            targets: [first, second],
            index: 0,
            resolution,
            texel_size: resolution.texel_size(),
        }
    }

    pub fn read(&self) -> &T {
        &self.targets[self.index]
    }

    pub fn write(&self) -> &T {
        &self.targets[1 - self.index]
    }

    pub fn write_mut(&mut self) -> &mut T {
        &mut self.targets[1 - self.index]
    }

    /// Committed target and the target the next pass renders into.
    pub fn split(&mut self) -> (&T, &mut T) {
        let [first, second] = &mut self.targets;
        if self.index == 0 {
            (&*first, second)
        } else {
            (&*second, first)
        }
    }

    /// Flip the roles of the two targets.
    pub fn swap(&mut self) {
        self.index = 1 - self.index;
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn texel_size(&self) -> Vec2 {
        self.texel_size
    }

    /// Release both targets.
    pub fn dispose(self) {
        log::trace!("disposing {} double target", self.resolution);
    }
}

impl DoubleTarget<GridField> {
    /// Allocate two zeroed fields.
    pub fn new(resolution: Resolution, filter: Filter) -> Result<Self> {
        let first = GridField::new(resolution, filter)?;
        let second = first.zeroed_like()?;
        Ok(Self::from_pair(first, second, resolution))
    }

    /// Reallocate both fields at a new size. History is discarded.
    ///
    /// Backends resize by building a whole new field set instead, so that a
    /// failed allocation leaves every pair untouched.
    pub fn set_size(&mut self, resolution: Resolution) -> Result<()> {
        let filter = self.read().filter();
        let first = GridField::new(resolution, filter)?;
        let second = first.zeroed_like()?;
        self.targets = [first, second];
        self.resolution = resolution;
        self.texel_size = resolution.texel_size();
        Ok(())
    }
}
