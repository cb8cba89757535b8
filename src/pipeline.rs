use crate::buffer::{BufferKind, FixedBuffer};
use crate::circular::CircularBuffer;
use crate::config::{BenchConfig, BufferConfig, SinkConfig, SourceConfig};
use crate::endpoint::{Pipe, Sink, Source};
use crate::error::{PipelineError, Result};
use crate::sink::{FileSink, NullSink};
use crate::source::{FileSource, RandomSource, RepeatingRandomSource};
use crate::word::Word;
use crate::worker::{Probe, Worker};
use std::sync::Arc;
use tracing::{info, warn};

/// Default worker scratch size in words
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Both faces of one bounded buffer, plus an inspection handle
struct PipeEnds<W: Word> {
    input: Arc<dyn Sink<W>>,
    output: Arc<dyn Source<W>>,
    pipe: Arc<dyn Pipe<W>>,
}

fn make_pipe<W: Word>(config: BufferConfig) -> Result<PipeEnds<W>> {
    Ok(match config.kind {
        BufferKind::Fixed => {
            let buffer = Arc::new(FixedBuffer::<W>::new(config.capacity)?);
            PipeEnds {
                input: buffer.clone(),
                output: buffer.clone(),
                pipe: buffer,
            }
        }
        BufferKind::Circular => {
            let buffer = Arc::new(CircularBuffer::<W>::new(config.capacity)?);
            PipeEnds {
                input: buffer.clone(),
                output: buffer.clone(),
                pipe: buffer,
            }
        }
    })
}

/// Open the source described by `config`
pub fn open_source<W: Word>(config: &SourceConfig) -> Result<Arc<dyn Source<W>>> {
    let source: Arc<dyn Source<W>> = match config {
        SourceConfig::File { path, looping: true } => Arc::new(FileSource::<W>::open(path)?),
        SourceConfig::File { path, looping: false } => {
            Arc::new(FileSource::<W>::open_once(path)?)
        }
        SourceConfig::RepeatingRandom { len, seed } => {
            Arc::new(RepeatingRandomSource::<W>::new(*len, *seed)?)
        }
        SourceConfig::Random { seed } => Arc::new(RandomSource::<W>::new(*seed)),
    };
    Ok(source)
}

/// Open the sink described by `config`
pub fn open_sink<W: Word>(config: &SinkConfig) -> Result<Arc<dyn Sink<W>>> {
    let sink: Arc<dyn Sink<W>> = match config {
        SinkConfig::File { path } => Arc::new(FileSink::<W>::create(path)?),
        SinkConfig::Null => Arc::new(NullSink::<W>::new()),
    };
    Ok(sink)
}

/// Builder for a linear pipeline: source → buffer → … → sink
pub struct PipelineBuilder<W: Word> {
    source: Option<Arc<dyn Source<W>>>,
    buffers: Vec<BufferConfig>,
    sink: Option<Arc<dyn Sink<W>>>,
    chunk_size: usize,
}

impl<W: Word> PipelineBuilder<W> {
    /// Create an empty builder with the default chunk size
    pub fn new() -> Self {
        Self {
            source: None,
            buffers: Vec::new(),
            sink: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Open every endpoint named in `config`. File errors surface here.
    pub fn from_config(config: &BenchConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Self::new()
            .source(open_source(&config.source)?)
            .sink(open_sink(&config.sink)?)
            .chunk_size(config.chunk_size);
        for buffer in &config.buffers {
            builder = builder.add_buffer(buffer.kind, buffer.capacity);
        }
        Ok(builder)
    }

    /// Set the endpoint the first worker reads from
    pub fn source(mut self, source: Arc<dyn Source<W>>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the endpoint the last worker writes to
    pub fn sink(mut self, sink: Arc<dyn Sink<W>>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Append a bounded buffer, and with it one more worker
    pub fn add_buffer(mut self, kind: BufferKind, capacity: usize) -> Self {
        self.buffers.push(BufferConfig { kind, capacity });
        self
    }

    /// Words each worker moves per round trip
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Allocate the buffers and wire up the workers
    pub fn build(self) -> Result<Pipeline<W>> {
        let (source, sink) = match (self.source, self.sink) {
            (Some(source), Some(sink)) => (source, sink),
            _ => return Err(PipelineError::NoStages),
        };
        if self.chunk_size == 0 {
            return Err(PipelineError::ConfigError(
                "chunk size must be at least 1 word".into(),
            ));
        }

        let mut pipes = Vec::with_capacity(self.buffers.len());
        let mut workers = Vec::with_capacity(self.buffers.len() + 1);

        let mut upstream = source;
        let mut upstream_name = String::from("source");
        for (i, config) in self.buffers.iter().enumerate() {
            let ends = make_pipe::<W>(*config)?;
            let name = format!("pipe{}", i);
            workers.push(Worker::new(
                format!("{}->{}", upstream_name, name),
                upstream,
                ends.input,
                self.chunk_size,
            ));
            pipes.push(ends.pipe);
            upstream = ends.output;
            upstream_name = name;
        }
        workers.push(Worker::new(
            format!("{}->sink", upstream_name),
            upstream,
            sink,
            self.chunk_size,
        ));

        Ok(Pipeline { workers, pipes })
    }
}

impl<W: Word> Default for PipelineBuilder<W> {
    fn default() -> Self {
        Self::new()
    }
}

/// A wired but not yet running pipeline
pub struct Pipeline<W: Word> {
    workers: Vec<Worker<W>>,
    pipes: Vec<Arc<dyn Pipe<W>>>,
}

impl<W: Word> Pipeline<W> {
    /// Get the workers in pipeline order
    pub fn workers(&self) -> &[Worker<W>] {
        &self.workers
    }

    /// Inspection handle on the `index`th buffer
    pub fn pipe(&self, index: usize) -> Option<&Arc<dyn Pipe<W>>> {
        self.pipes.get(index)
    }

    /// Named probes for every worker, in pipeline order
    pub fn probes(&self) -> Vec<(String, Probe)> {
        self.workers
            .iter()
            .map(|w| (w.name().to_string(), w.probe()))
            .collect()
    }

    /// Start every worker. If one fails to start, the ones already running
    /// are stopped and joined before the error is returned.
    pub fn start(mut self) -> Result<RunningPipeline<W>> {
        for i in 0..self.workers.len() {
            if let Err(e) = self.workers[i].start() {
                warn!(worker = %self.workers[i].name(), error = %e, "worker failed to start");
                if let Err(shutdown_error) = self.shutdown() {
                    warn!(error = %shutdown_error, "started workers did not shut down cleanly");
                }
                return Err(e);
            }
        }

        info!(
            workers = self.workers.len(),
            buffers = self.pipes.len(),
            "pipeline started"
        );
        Ok(RunningPipeline { pipeline: self })
    }

    /// Stop every worker, then join them all. Returns per-worker totals, or
    /// the first error once every thread has been joined.
    fn shutdown(&mut self) -> Result<Vec<u64>> {
        for worker in &self.workers {
            worker.stop();
        }
        self.join_all()
    }

    fn join_all(&mut self) -> Result<Vec<u64>> {
        let mut totals = Vec::with_capacity(self.workers.len());
        let mut first_error = None;
        for worker in &mut self.workers {
            match worker.join() {
                Ok(total) => totals.push(total),
                Err(e) => {
                    totals.push(worker.transferred());
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(totals),
        }
    }

    /// Human-readable totals per worker
    pub fn summary(&self) -> String {
        let mut summary = String::from("Pipeline summary:\n");
        for worker in &self.workers {
            summary.push_str(&format!(
                "  {}: {} words ({:?})\n",
                worker.name(),
                worker.transferred(),
                worker.state()
            ));
        }
        summary
    }
}

/// A pipeline whose workers are running
pub struct RunningPipeline<W: Word> {
    pipeline: Pipeline<W>,
}

impl<W: Word> RunningPipeline<W> {
    /// Named probes for every worker, in pipeline order
    pub fn probes(&self) -> Vec<(String, Probe)> {
        self.pipeline.probes()
    }

    /// Inspection handle on the `index`th buffer
    pub fn pipe(&self, index: usize) -> Option<&Arc<dyn Pipe<W>>> {
        self.pipeline.pipe(index)
    }

    /// Human-readable totals per worker
    pub fn summary(&self) -> String {
        self.pipeline.summary()
    }

    /// Stop and join every worker
    pub fn stop(mut self) -> Result<Vec<u64>> {
        let totals = self.pipeline.shutdown();
        info!("pipeline stopped");
        totals
    }

    /// Join every worker without stopping them. Only returns once the
    /// source runs dry and the end of stream has propagated to the sink.
    pub fn wait(mut self) -> Result<Vec<u64>> {
        let totals = self.pipeline.join_all();
        info!("pipeline finished");
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn random_builder() -> PipelineBuilder<u8> {
        PipelineBuilder::new()
            .source(Arc::new(RepeatingRandomSource::<u8>::new(1024, Some(5)).unwrap()))
            .sink(Arc::new(NullSink::<u8>::new()))
            .chunk_size(256)
    }

    #[test]
    fn test_pipeline_builder() {
        let pipeline = random_builder()
            .add_buffer(BufferKind::Fixed, 512)
            .add_buffer(BufferKind::Circular, 512)
            .build()
            .unwrap();

        let names: Vec<_> = pipeline.probes().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["source->pipe0", "pipe0->pipe1", "pipe1->sink"]);
        assert_eq!(pipeline.pipe(1).unwrap().usable_capacity(), 511);
        assert!(pipeline.pipe(2).is_none());
    }

    #[test]
    fn test_no_stages_error() {
        let result = PipelineBuilder::<u8>::new().build();
        assert!(matches!(result, Err(PipelineError::NoStages)));
    }

    #[test]
    fn test_bad_buffer_capacity() {
        let result = random_builder().add_buffer(BufferKind::Circular, 1).build();
        assert!(matches!(result, Err(PipelineError::ConfigError(_))));
    }

    #[test]
    fn test_direct_pipeline_runs() {
        let running = random_builder().build().unwrap().start().unwrap();
        std::thread::sleep(Duration::from_millis(20));
        let totals = running.stop().unwrap();
        assert_eq!(totals.len(), 1);
        assert!(totals[0] > 0);
    }

    #[test]
    fn test_zero_chunk_rejected_at_build() {
        let builder = random_builder()
            .chunk_size(0)
            .add_buffer(BufferKind::Fixed, 64);
        assert!(matches!(builder.build(), Err(PipelineError::ConfigError(_))));
    }

    #[test]
    fn test_summary_lists_workers() {
        let pipeline = random_builder()
            .add_buffer(BufferKind::Fixed, 64)
            .build()
            .unwrap();
        let summary = pipeline.summary();
        assert!(summary.contains("source->pipe0: 0 words (Idle)"));
        assert!(summary.contains("pipe0->sink"));
    }

    struct FailingSource;

    impl Source<u8> for FailingSource {
        fn produce(&self, _dst: &mut [u8]) -> Result<usize> {
            Err(PipelineError::ConfigError("source went away".into()))
        }
    }

    #[test]
    fn test_failed_start_still_joins_failed_workers() {
        let mut pipeline = PipelineBuilder::<u8>::new()
            .source(Arc::new(FailingSource))
            .add_buffer(BufferKind::Fixed, 64)
            .sink(Arc::new(NullSink::<u8>::new()))
            .chunk_size(16)
            .build()
            .unwrap();
        let probes = pipeline.probes();

        // The first worker is already running, so starting the pipeline
        // fails and the rollback joins a worker that returned an error
        pipeline.workers[0].start().unwrap();
        let result = pipeline.start();

        assert!(matches!(result, Err(PipelineError::AlreadyStarted)));
        for (_, probe) in probes {
            assert_ne!(probe.state(), crate::worker::WorkerState::Running);
        }
    }
}
