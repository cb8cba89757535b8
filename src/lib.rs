//! A streaming I/O benchmark harness.
//!
//! Words flow from a [`Source`] through zero or more bounded buffers to a
//! [`Sink`]. Every edge of the chain is driven by its own [`Worker`] thread,
//! and a [`Sampler`] polls the workers' progress counters to report
//! throughput.
//!
//! # Features
//!
//! - Blocking bounded buffers with backpressure: [`FixedBuffer`] (compacts
//!   when drained) and [`CircularBuffer`] (wrap-around, one reserved slot)
//! - File, repeating pseudo-random and pseudo-random sources; file and
//!   discarding sinks
//! - Cooperative, idempotent stop that wakes blocked stages
//! - End-of-stream and closed-sink propagation along the chain
//! - Periodic throughput sampling without touching the copy loops
//!
//! # Example
//!
//! ```ignore
//! use ioperf::{BufferKind, NullSink, PipelineBuilder, RepeatingRandomSource, Sampler};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let running = PipelineBuilder::<u8>::new()
//!     .source(Arc::new(RepeatingRandomSource::<u8>::new(1 << 20, None)?))
//!     .add_buffer(BufferKind::Circular, 1 << 18)
//!     .sink(Arc::new(NullSink::<u8>::new()))
//!     .build()?
//!     .start()?;
//!
//! let mut sampler = Sampler::new(Duration::from_secs(1), 5)?;
//! for (name, probe) in running.probes() {
//!     sampler.watch(name, probe);
//! }
//! print!("{}", sampler.run());
//! running.stop()?;
//! ```

pub mod buffer;
pub mod circular;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod word;
pub mod worker;

// Re-exports for convenience
pub use buffer::{BufferKind, FixedBuffer};
pub use circular::CircularBuffer;
pub use config::{BenchConfig, BufferConfig, SamplingConfig, SinkConfig, SourceConfig};
pub use endpoint::{Pipe, Sink, Source};
pub use error::{PipelineError, Result};
pub use metrics::{Report, Sample, Sampler, Series, Timing};
pub use pipeline::{open_sink, open_source, Pipeline, PipelineBuilder, RunningPipeline};
pub use sink::{FileSink, NullSink};
pub use source::{FileSource, RandomSource, RepeatingRandomSource};
pub use word::Word;
pub use worker::{Probe, Worker, WorkerState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
