//! Buffer pool for reducing allocations when re-serializing frames.
//!
//! Every reflected frame is copied into a fresh buffer before its Ethernet
//! header is rewritten. The pool keeps those buffers around between frames.

use std::sync::Arc;

use parking_lot::Mutex;

/// Largest frame a pooled buffer is sized for.
/// Ethernet (14) + 802.1Q tag (4) + 1500 byte MTU + FCS (4) = 1522
pub const MAX_FRAME_SIZE: usize = 1522;

/// A reusable buffer from the pool.
pub struct PooledBuffer {
    data: Vec<u8>,
    pool: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl PooledBuffer {
    /// Get a mutable slice of the buffer.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Get an immutable slice of the buffer.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Replace the buffer contents with a copy of `bytes`.
    #[inline]
    pub fn fill_from(&mut self, bytes: &[u8]) {
        self.data.clear();
        self.data.extend_from_slice(bytes);
    }

    /// Get the length of the data in the buffer.
    #[inline]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let mut buffer = std::mem::take(&mut self.data);
        buffer.clear();
        // Jumbo frames grow the buffer; those are not worth keeping.
        if buffer.capacity() <= MAX_FRAME_SIZE * 2 {
            self.pool.lock().push(buffer);
        }
    }
}

impl AsRef<[u8]> for PooledBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl AsMut<[u8]> for PooledBuffer {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// A pool of reusable frame buffers.
#[derive(Clone)]
pub struct BufferPool {
    buffers: Arc<Mutex<Vec<Vec<u8>>>>,
    initial_capacity: usize,
}

impl BufferPool {
    /// Create a new buffer pool with the specified number of pre-allocated buffers.
    pub fn new(pool_size: usize) -> Self {
        let buffers: Vec<Vec<u8>> = (0..pool_size)
            .map(|_| Vec::with_capacity(MAX_FRAME_SIZE))
            .collect();

        Self {
            buffers: Arc::new(Mutex::new(buffers)),
            initial_capacity: pool_size,
        }
    }

    /// Get a buffer from the pool.
    ///
    /// If the pool is empty, a new buffer is allocated.
    /// The returned `PooledBuffer` goes back to the pool when dropped.
    pub fn get(&self) -> PooledBuffer {
        let data = self
            .buffers
            .lock()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(MAX_FRAME_SIZE));

        PooledBuffer {
            data,
            pool: Arc::clone(&self.buffers),
        }
    }

    /// Returns the current number of available buffers in the pool.
    pub fn available(&self) -> usize {
        self.buffers.lock().len()
    }

    /// Returns the initial pool capacity.
    pub const fn capacity(&self) -> usize {
        self.initial_capacity
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(64)
    }
}
