//! Fixed-capacity byte region shared between the frame writer and display images.
//!
//! Capacity is fixed at allocation. All copies are length-bounded against it, and
//! readers see whole writes because the bytes sit behind a reader/writer lock.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::trace;

use crate::error::{FrameError, Result};

static NEXT_REGION_ID: AtomicU64 = AtomicU64::new(1);

pub struct SharedRegion {
    id: u64,
    capacity: usize,
    bytes: RwLock<Box<[u8]>>,
    released: AtomicBool,
}

impl SharedRegion {
    /// Allocate a zeroed region of exactly `len` bytes.
    pub fn allocate(len: usize) -> Result<Self> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(len)
            .map_err(|_| FrameError::RegionAllocation { len })?;
        bytes.resize(len, 0);

        let id = NEXT_REGION_ID.fetch_add(1, Ordering::Relaxed);
        trace!(region = id, len, "shared region allocated");
        Ok(Self {
            id,
            capacity: len,
            bytes: RwLock::new(bytes.into_boxed_slice()),
            released: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Copy `min(src.len(), capacity)` bytes into the start of the region.
    ///
    /// Returns the number of bytes copied.
    pub fn copy_from(&self, src: &[u8]) -> Result<usize> {
        let mut bytes = self.bytes.write();
        if self.is_released() {
            return Err(FrameError::Disposed);
        }
        let len = src.len().min(bytes.len());
        bytes[..len].copy_from_slice(&src[..len]);
        Ok(len)
    }

    /// Run `f` over the region's bytes while holding off writers.
    pub fn read<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        let bytes = self.bytes.read();
        if self.is_released() {
            return Err(FrameError::Disposed);
        }
        Ok(f(&bytes))
    }

    /// Free the backing memory. Handles that still reference the region read `Disposed`.
    pub fn release(&self) {
        let mut bytes = self.bytes.write();
        if !self.released.swap(true, Ordering::AcqRel) {
            *bytes = Box::default();
            trace!(region = self.id, "shared region released");
        }
    }
}

impl std::fmt::Debug for SharedRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRegion")
            .field("id", &self.id)
            .field("capacity", &self.capacity)
            .field("released", &self.is_released())
            .finish()
    }
}
