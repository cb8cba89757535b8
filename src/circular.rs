//! Wrap-around bounded buffer.
//!
//! The write and read cursors both move forward modulo the store length.
//! With nothing but two cursors, `write == read` could mean either empty or
//! full, so one slot is kept permanently free: the buffer is empty when
//! `write == read` and full when `(write + 1) % capacity == read`. A store of
//! `capacity` words therefore holds at most `capacity - 1` live words. This
//! is how the buffer tells full from empty without a separate counter, and
//! it is not a defect to be worked around.
//!
//! A transfer of `count` words starting at cursor `c` may run past the end of
//! the store. It is then split into two contiguous moves:
//!
//! ```text
//! first  = min(count, capacity - c)    // c .. end of store
//! second = count - first               // 0 .. second
//! ```
//!
//! Because `count` never exceeds the free (or used) space, the second move
//! can never reach the opposite cursor, and a write never touches the
//! reserved slot.

use crate::endpoint::{Pipe, Sink, Source};
use crate::error::{PipelineError, Result};
use crate::word::Word;
use parking_lot::{Condvar, Mutex};

struct Cursors<W> {
    store: Box<[W]>,
    write: usize,
    read: usize,
    stopped: bool,
}

impl<W: Copy> Cursors<W> {
    #[inline]
    fn capacity(&self) -> usize {
        self.store.len()
    }

    #[inline]
    fn used(&self) -> usize {
        (self.write + self.capacity() - self.read) % self.capacity()
    }

    #[inline]
    fn free(&self) -> usize {
        (self.read + self.capacity() - self.write - 1) % self.capacity()
    }

    fn push(&mut self, src: &[W]) -> usize {
        let capacity = self.capacity();
        let count = src.len().min(self.free());
        let first = count.min(capacity - self.write);
        let second = count - first;

        let write = self.write;
        self.store[write..write + first].copy_from_slice(&src[..first]);
        self.store[..second].copy_from_slice(&src[first..count]);
        debug_assert!(second == 0 || second < self.read);

        self.write = (write + count) % capacity;
        debug_assert!(self.used() < capacity);
        count
    }

    fn pull(&mut self, dst: &mut [W]) -> usize {
        let capacity = self.capacity();
        let count = dst.len().min(self.used());
        let first = count.min(capacity - self.read);
        let second = count - first;

        let read = self.read;
        dst[..first].copy_from_slice(&self.store[read..read + first]);
        dst[first..count].copy_from_slice(&self.store[..second]);
        debug_assert!(second == 0 || second <= self.write);

        self.read = (read + count) % capacity;
        count
    }
}

/// A bounded, blocking ring buffer that reuses space continuously.
pub struct CircularBuffer<W: Word> {
    cursors: Mutex<Cursors<W>>,
    cond: Condvar,
    capacity: usize,
}

impl<W: Word> CircularBuffer<W> {
    /// Create a ring over a store of `capacity` words, of which
    /// `capacity - 1` are usable.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity < 2 {
            return Err(PipelineError::ConfigError(format!(
                "circular buffer capacity must be at least 2 words, got {}",
                capacity
            )));
        }

        Ok(Self {
            cursors: Mutex::new(Cursors {
                store: vec![W::default(); capacity].into_boxed_slice(),
                write: 0,
                read: 0,
                stopped: false,
            }),
            cond: Condvar::new(),
            capacity,
        })
    }

    /// Copy a prefix of `src` into the ring, blocking while full.
    /// Returns zero only when the buffer has been stopped.
    pub fn write(&self, src: &[W]) -> usize {
        if src.is_empty() {
            return 0;
        }

        let mut cursors = self.cursors.lock();
        while cursors.free() == 0 && !cursors.stopped {
            self.cond.wait(&mut cursors);
        }

        let count = cursors.push(src);
        drop(cursors);

        if count > 0 {
            self.cond.notify_one();
        }
        count
    }

    /// Copy a prefix of the stored words into `dst`, blocking while empty.
    /// Returns zero only when the buffer has been stopped and drained.
    pub fn read(&self, dst: &mut [W]) -> usize {
        if dst.is_empty() {
            return 0;
        }

        let mut cursors = self.cursors.lock();
        while cursors.used() == 0 && !cursors.stopped {
            self.cond.wait(&mut cursors);
        }

        let count = cursors.pull(dst);
        drop(cursors);

        if count > 0 {
            self.cond.notify_one();
        }
        count
    }

    /// Mark the buffer stopped and wake every waiter. Idempotent.
    pub fn signal_stop(&self) {
        self.cursors.lock().stopped = true;
        self.cond.notify_all();
    }

    /// Whether `signal_stop` has been called
    pub fn is_stopped(&self) -> bool {
        self.cursors.lock().stopped
    }

    /// Number of unread words
    pub fn len(&self) -> usize {
        self.cursors.lock().used()
    }

    /// Check if the buffer holds no words
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Words that can be written before the writer would block
    pub fn available(&self) -> usize {
        self.cursors.lock().free()
    }

    /// Length of the backing store, including the reserved slot
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<W: Word> Source<W> for CircularBuffer<W> {
    fn produce(&self, dst: &mut [W]) -> Result<usize> {
        Ok(self.read(dst))
    }

    fn signal_stop(&self) {
        CircularBuffer::signal_stop(self)
    }
}

impl<W: Word> Sink<W> for CircularBuffer<W> {
    fn consume(&self, src: &[W]) -> Result<usize> {
        Ok(self.write(src))
    }

    fn signal_stop(&self) {
        CircularBuffer::signal_stop(self)
    }
}

impl<W: Word> Pipe<W> for CircularBuffer<W> {
    fn len(&self) -> usize {
        CircularBuffer::len(self)
    }

    fn usable_capacity(&self) -> usize {
        self.capacity - 1
    }
}
