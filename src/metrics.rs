use crate::error::{PipelineError, Result};
use crate::worker::Probe;
use crossbeam::channel;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

/// One observation of a worker's cumulative transfer counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub time: Instant,
    pub count: u64,
}

/// The samples collected for one stage, in polling order
#[derive(Debug, Clone)]
pub struct Series {
    name: String,
    samples: Vec<Sample>,
}

impl Series {
    /// Create an empty series for the named stage
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            samples: Vec::new(),
        }
    }

    /// Get the stage name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append the next observation
    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    /// Get all samples in polling order
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Cumulative count at the last sample
    pub fn total(&self) -> u64 {
        self.samples.last().map(|s| s.count).unwrap_or(0)
    }

    /// Words per second between each sample and the one before it.
    /// The first sample has no predecessor and reports zero.
    pub fn throughput(&self) -> Vec<f64> {
        let mut rates = Vec::with_capacity(self.samples.len());
        for (i, sample) in self.samples.iter().enumerate() {
            let rate = match i.checked_sub(1).map(|j| &self.samples[j]) {
                Some(prev) => {
                    let secs = sample.time.duration_since(prev.time).as_secs_f64();
                    if secs == 0.0 {
                        0.0
                    } else {
                        sample.count.saturating_sub(prev.count) as f64 / secs
                    }
                }
                None => 0.0,
            };
            rates.push(rate);
        }
        rates
    }
}

/// Polls worker probes on a fixed cadence
pub struct Sampler {
    interval: Duration,
    sample_count: usize,
    probes: Vec<(String, Probe)>,
}

impl Sampler {
    /// Create a sampler that takes `sample_count` samples `interval` apart
    pub fn new(interval: Duration, sample_count: usize) -> Result<Self> {
        if interval.is_zero() {
            return Err(PipelineError::ConfigError(
                "sampling interval must be non-zero".into(),
            ));
        }
        if sample_count == 0 {
            return Err(PipelineError::ConfigError(
                "sampler needs at least one sample".into(),
            ));
        }

        Ok(Self {
            interval,
            sample_count,
            probes: Vec::new(),
        })
    }

    /// Register a stage to be polled on every tick
    pub fn watch(&mut self, name: impl Into<String>, probe: Probe) -> &mut Self {
        self.probes.push((name.into(), probe));
        self
    }

    /// Get the polling interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block for `sample_count` ticks, polling every probe once per tick
    pub fn run(&self) -> Report {
        let start = Instant::now();
        let ticker = channel::tick(self.interval);
        let mut series: Vec<Series> = self
            .probes
            .iter()
            .map(|(name, _)| Series::new(name.clone()))
            .collect();

        for tick in 0..self.sample_count {
            if ticker.recv().is_err() {
                break;
            }
            for ((_, probe), series) in self.probes.iter().zip(series.iter_mut()) {
                series.push(probe.poll());
            }
            debug!(tick, "sampled {} stages", self.probes.len());
        }

        Report::new(start, series)
    }
}

/// Sampled throughput of every watched stage
#[derive(Debug, Clone)]
pub struct Report {
    start: Instant,
    word_width: usize,
    series: Vec<Series>,
}

impl Report {
    /// Create a report whose elapsed times are measured from `start`
    pub fn new(start: Instant, series: Vec<Series>) -> Self {
        Self {
            start,
            word_width: 1,
            series,
        }
    }

    /// Scale word counts to bytes when rendering
    pub fn with_word_width(mut self, width: usize) -> Self {
        self.word_width = width.max(1);
        self
    }

    /// Get the series of every watched stage
    pub fn series(&self) -> &[Series] {
        &self.series
    }

    /// Get the instant sampling began
    pub fn start(&self) -> Instant {
        self.start
    }

    /// One line per tick: elapsed time, cumulative bytes and delta KiB/s
    /// for every stage.
    pub fn lines(&self) -> Vec<String> {
        let ticks = self.series.iter().map(|s| s.samples().len()).max().unwrap_or(0);
        let rates: Vec<Vec<f64>> = self.series.iter().map(Series::throughput).collect();
        let width = self.word_width as f64;

        (0..ticks)
            .map(|i| {
                self.series
                    .iter()
                    .zip(&rates)
                    .filter_map(|(series, rates)| {
                        let sample = series.samples().get(i)?;
                        let elapsed = sample.time.duration_since(self.start).as_micros();
                        let bytes = sample.count * self.word_width as u64;
                        let kib = rates[i] * width / 1024.0;
                        Some(format!("{:>10} us: {:>14} ({:>10.0} KiB/s)", elapsed, bytes, kib))
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .collect()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Wall-clock cost of a pipeline that ran to completion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    elapsed: Duration,
    words: u64,
    word_width: usize,
}

impl Timing {
    /// Record `words` delivered in `elapsed`
    pub fn new(elapsed: Duration, words: u64) -> Self {
        Self {
            elapsed,
            words,
            word_width: 1,
        }
    }

    /// Scale word counts to bytes when rendering
    pub fn with_word_width(mut self, width: usize) -> Self {
        self.word_width = width.max(1);
        self
    }

    /// Get the wall-clock duration of the run
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Bytes delivered to the sink
    pub fn bytes(&self) -> u64 {
        self.words * self.word_width as u64
    }

    /// Overall throughput, 0 when no time was measured
    pub fn kib_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.bytes() as f64 / 1024.0 / secs
        }
    }
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total time: {} us, {} bytes ({:.0} KiB/s)",
            self.elapsed.as_micros(),
            self.bytes(),
            self.kib_per_sec()
        )
    }
}
