//! Shared buffer pool for transient byte buffers.
//!
//! Rentals hand out cleared `Vec<u8>` buffers behind an RAII guard; the
//! guard returns the buffer on drop, which covers every exit path —
//! success, error, and cancellation alike. Buffers that should outlive the
//! request (the final output document) are detached instead of returned.

use std::sync::{Arc, Mutex};

use crate::config::{POOL_MAX_BUFFERS, POOL_MAX_RETAINED_CAPACITY};

/// Thread-safe pool of reusable byte buffers.
pub struct BufferPool {
    idle: Mutex<Vec<Vec<u8>>>,
}

impl BufferPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self { idle: Mutex::new(Vec::new()) })
    }

    /// Rents a cleared buffer with at least `min_capacity` bytes reserved.
    pub fn rent(self: &Arc<Self>, min_capacity: usize) -> PooledBuffer {
        let mut buffer = self.idle.lock().map_or_else(|_| Vec::new(), |mut idle| idle.pop().unwrap_or_default());
        buffer.clear();
        if buffer.capacity() < min_capacity {
            buffer.reserve(min_capacity - buffer.capacity());
        }
        PooledBuffer { buffer, pool: Arc::clone(self) }
    }

    /// Takes a buffer back; oversized and surplus buffers are dropped.
    fn give_back(&self, buffer: Vec<u8>) {
        if buffer.capacity() > POOL_MAX_RETAINED_CAPACITY {
            return;
        }
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < POOL_MAX_BUFFERS {
                idle.push(buffer);
            }
        }
    }

    #[cfg(test)]
    fn idle_count(&self) -> usize {
        self.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }
}

/// A rented buffer; returns to its pool on drop.
pub struct PooledBuffer {
    buffer: Vec<u8>,
    pool: Arc<BufferPool>,
}

impl PooledBuffer {
    /// Detaches the buffer from the pool, handing ownership to the caller.
    ///
    /// Used for the final output document, which the caller owns and
    /// disposes of; everything transient goes back via drop.
    #[must_use]
    pub fn into_inner(mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }
}

impl std::ops::Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buffer
    }
}

impl std::ops::DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let buffer = std::mem::take(&mut self.buffer);
        // An empty Vec is the signature of into_inner(); nothing to retain.
        if buffer.capacity() > 0 {
            self.pool.give_back(buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rent_reserves_capacity() {
        let pool = BufferPool::new();
        let buffer = pool.rent(1024);
        assert!(buffer.capacity() >= 1024);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_buffers_are_reused() {
        let pool = BufferPool::new();
        {
            let mut buffer = pool.rent(64);
            buffer.extend_from_slice(b"scratch");
        }
        assert_eq!(pool.idle_count(), 1);

        let buffer = pool.rent(8);
        assert!(buffer.is_empty());
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn test_into_inner_detaches() {
        let pool = BufferPool::new();
        let mut buffer = pool.rent(16);
        buffer.extend_from_slice(b"kept");
        let owned = buffer.into_inner();
        assert_eq!(owned, b"kept");
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn test_oversized_buffers_are_dropped() {
        let pool = BufferPool::new();
        {
            let _buffer = pool.rent(POOL_MAX_RETAINED_CAPACITY + 1);
        }
        assert_eq!(pool.idle_count(), 0);
    }
}
