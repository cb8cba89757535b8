use crate::endpoint::{Sink, Source};
use crate::error::{PipelineError, Result};
use crate::metrics::Sample;
use crate::word::Word;
use crossbeam::utils::CachePadded;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error};

/// Lifecycle of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Idle = 0,
    Running = 1,
    Stopping = 2,
    Stopped = 3,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Idle,
            1 => WorkerState::Running,
            2 => WorkerState::Stopping,
            _ => WorkerState::Stopped,
        }
    }
}

/// State shared between a worker handle, its thread and its probes
#[derive(Debug)]
struct Shared {
    /// Words delivered downstream; written only by the worker thread
    transferred: CachePadded<AtomicU64>,
    stop: AtomicBool,
    state: AtomicU8,
}

impl Shared {
    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}

/// Read-only handle on a worker's progress counter.
///
/// Probes are cheap to clone and can be polled from any thread without
/// disturbing the copy loop.
#[derive(Debug, Clone)]
pub struct Probe {
    shared: Arc<Shared>,
}

impl Probe {
    /// Take a sample of the progress counter
    pub fn poll(&self) -> Sample {
        Sample {
            time: Instant::now(),
            count: self.shared.transferred.load(Ordering::Acquire),
        }
    }

    /// Get the current lifecycle state of the worker
    pub fn state(&self) -> WorkerState {
        self.shared.state()
    }
}

/// Moves words from one endpoint to another on a dedicated thread.
///
/// Endpoints are shared: a pipe is the sink of one worker and the source of
/// the next, so both workers hold an `Arc` to it.
pub struct Worker<W: Word> {
    name: String,
    source: Arc<dyn Source<W>>,
    sink: Arc<dyn Sink<W>>,
    chunk_size: usize,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<Result<u64>>>,
}

impl<W: Word> Worker<W> {
    /// Create an idle worker that will move up to `chunk_size` words per
    /// round trip.
    pub fn new(
        name: impl Into<String>,
        source: Arc<dyn Source<W>>,
        sink: Arc<dyn Sink<W>>,
        chunk_size: usize,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            sink,
            chunk_size,
            shared: Arc::new(Shared {
                transferred: CachePadded::new(AtomicU64::new(0)),
                stop: AtomicBool::new(false),
                state: AtomicU8::new(WorkerState::Idle as u8),
            }),
            handle: None,
        }
    }

    /// Get the worker name, also used as its thread name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the current lifecycle state
    pub fn state(&self) -> WorkerState {
        self.shared.state()
    }

    /// Spawn the copy loop. Configuration problems are reported here,
    /// before the thread exists.
    pub fn start(&mut self) -> Result<()> {
        if self.state() != WorkerState::Idle || self.handle.is_some() {
            return Err(PipelineError::AlreadyStarted);
        }
        if self.chunk_size == 0 {
            return Err(PipelineError::ConfigError(format!(
                "worker {} needs a chunk size of at least 1 word",
                self.name
            )));
        }

        let copy_loop = CopyLoop {
            name: self.name.clone(),
            source: Arc::clone(&self.source),
            sink: Arc::clone(&self.sink),
            chunk_size: self.chunk_size,
            shared: Arc::clone(&self.shared),
        };

        self.shared.set_state(WorkerState::Running);
        let handle = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || copy_loop.run())
            .map_err(|e| {
                self.shared.set_state(WorkerState::Stopped);
                PipelineError::ThreadError(format!("failed to spawn {}: {}", self.name, e))
            })?;

        debug!(worker = %self.name, chunk_size = self.chunk_size, "worker started");
        self.handle = Some(handle);
        Ok(())
    }

    /// Ask the copy loop to exit and unblock both endpoints. Never blocks
    /// and may be called any number of times.
    pub fn stop(&self) {
        let already = self.shared.stop.swap(true, Ordering::AcqRel);
        let _ = self.shared.state.compare_exchange(
            WorkerState::Running as u8,
            WorkerState::Stopping as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        self.source.signal_stop();
        self.sink.signal_stop();

        if !already {
            debug!(worker = %self.name, "stop signaled");
        }
    }

    /// Wait for the thread to finish and return the total words moved.
    /// Joining a worker that was never started returns its counter.
    pub fn join(&mut self) -> Result<u64> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| {
                PipelineError::ThreadError(format!("worker {} panicked", self.name))
            })?,
            None => Ok(self.transferred()),
        }
    }

    /// Current sample of the progress counter
    pub fn poll(&self) -> Sample {
        self.probe().poll()
    }

    /// Create a probe for sampling this worker from another thread
    pub fn probe(&self) -> Probe {
        Probe {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Get the total words delivered downstream so far
    pub fn transferred(&self) -> u64 {
        self.shared.transferred.load(Ordering::Acquire)
    }
}

impl<W: Word> Drop for Worker<W> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
            if let Err(e) = self.join() {
                error!(worker = %self.name, error = %e, "worker failed during drop");
            }
        }
    }
}

/// The part of a worker that runs on its thread
struct CopyLoop<W: Word> {
    name: String,
    source: Arc<dyn Source<W>>,
    sink: Arc<dyn Sink<W>>,
    chunk_size: usize,
    shared: Arc<Shared>,
}

impl<W: Word> CopyLoop<W> {
    fn run(self) -> Result<u64> {
        let result = self.copy();
        self.shared.set_state(WorkerState::Stopped);

        match &result {
            Ok(total) => debug!(worker = %self.name, total, "worker stopped"),
            Err(e) => {
                error!(worker = %self.name, error = %e, "worker failed");
                self.source.signal_stop();
                self.sink.signal_stop();
            }
        }
        result
    }

    fn copy(&self) -> Result<u64> {
        let mut scratch = vec![W::default(); self.chunk_size];
        let mut total = 0u64;

        'copy: while !self.shared.stopped() {
            let count = self.source.produce(&mut scratch)?;
            if count == 0 {
                if !self.shared.stopped() {
                    debug!(worker = %self.name, "upstream exhausted, closing downstream");
                    self.sink.signal_stop();
                }
                break;
            }

            let mut written = 0;
            while written < count && !self.shared.stopped() {
                let n = self.sink.consume(&scratch[written..count])?;
                if n == 0 {
                    debug!(worker = %self.name, "downstream closed, stopping upstream");
                    self.source.signal_stop();
                    break 'copy;
                }
                written += n;
                total += n as u64;
                self.shared.transferred.fetch_add(n as u64, Ordering::Release);
            }
        }

        Ok(total)
    }
}
