use crate::endpoint::{Pipe, Sink, Source};
use crate::error::{PipelineError, Result};
use crate::word::Word;
use parking_lot::{Condvar, Mutex};

/// Selects the bounded buffer implementation placed between two workers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Contiguous buffer that compacts once fully drained
    Fixed,
    /// Wrap-around buffer with one reserved slot
    Circular,
}

struct FixedState<W> {
    store: Box<[W]>,
    write: usize,
    read: usize,
    stopped: bool,
}

/// A bounded, blocking, non-wrapping buffer.
///
/// Writes append at the write cursor until it reaches the end of the store.
/// Space in front of the read cursor is only reclaimed when every stored word
/// has been read, at which point both cursors reset to zero. This keeps every
/// copy a single contiguous move at the cost of stalling the writer while a
/// partially drained buffer is full at the tail.
///
/// One producer and one consumer share the buffer; both block on the same
/// condition variable, and since the buffer cannot be empty and full at once,
/// at most one of them is ever waiting.
pub struct FixedBuffer<W: Word> {
    state: Mutex<FixedState<W>>,
    cond: Condvar,
    capacity: usize,
}

impl<W: Word> FixedBuffer<W> {
    /// Create a buffer holding up to `capacity` words
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(PipelineError::ConfigError(
                "fixed buffer capacity must be at least 1 word".into(),
            ));
        }

        Ok(Self {
            state: Mutex::new(FixedState {
                store: vec![W::default(); capacity].into_boxed_slice(),
                write: 0,
                read: 0,
                stopped: false,
            }),
            cond: Condvar::new(),
            capacity,
        })
    }

    /// Copy a prefix of `src` into the buffer, blocking while the tail is
    /// full. Returns the number of words copied, which is zero only when the
    /// buffer has been stopped.
    pub fn write(&self, src: &[W]) -> usize {
        if src.is_empty() {
            return 0;
        }

        let mut state = self.state.lock();
        while state.write == self.capacity && !state.stopped {
            self.cond.wait(&mut state);
        }

        let write = state.write;
        let count = (self.capacity - write).min(src.len());
        state.store[write..write + count].copy_from_slice(&src[..count]);
        state.write += count;
        debug_assert!(state.write <= self.capacity);

        drop(state);
        if count > 0 {
            self.cond.notify_one();
        }
        count
    }

    /// Copy a prefix of the stored words into `dst`, blocking while empty.
    /// Returns the number of words copied, which is zero only when the
    /// buffer has been stopped and drained.
    pub fn read(&self, dst: &mut [W]) -> usize {
        if dst.is_empty() {
            return 0;
        }

        let mut state = self.state.lock();
        while state.read == state.write && !state.stopped {
            self.cond.wait(&mut state);
        }

        let read = state.read;
        let count = (state.write - read).min(dst.len());
        dst[..count].copy_from_slice(&state.store[read..read + count]);
        state.read += count;
        debug_assert!(state.read <= state.write);

        if state.read == state.write {
            state.read = 0;
            state.write = 0;
        }

        drop(state);
        if count > 0 {
            self.cond.notify_one();
        }
        count
    }

    /// Mark the buffer stopped and wake every waiter. Idempotent.
    pub fn signal_stop(&self) {
        self.state.lock().stopped = true;
        self.cond.notify_all();
    }

    /// Whether `signal_stop` has been called
    pub fn is_stopped(&self) -> bool {
        self.state.lock().stopped
    }

    /// Number of unread words
    pub fn len(&self) -> usize {
        let state = self.state.lock();
        state.write - state.read
    }

    /// Check if the buffer holds no words
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Words that can be written before the writer would block
    pub fn available(&self) -> usize {
        self.capacity - self.state.lock().write
    }

    /// Get the capacity of the buffer in words
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<W: Word> Source<W> for FixedBuffer<W> {
    fn produce(&self, dst: &mut [W]) -> Result<usize> {
        Ok(self.read(dst))
    }

    fn signal_stop(&self) {
        FixedBuffer::signal_stop(self)
    }
}

impl<W: Word> Sink<W> for FixedBuffer<W> {
    fn consume(&self, src: &[W]) -> Result<usize> {
        Ok(self.write(src))
    }

    fn signal_stop(&self) {
        FixedBuffer::signal_stop(self)
    }
}

impl<W: Word> Pipe<W> for FixedBuffer<W> {
    fn len(&self) -> usize {
        FixedBuffer::len(self)
    }

    fn usable_capacity(&self) -> usize {
        self.capacity
    }
}
