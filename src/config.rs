use crate::buffer::BufferKind;
use crate::error::{PipelineError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Where the first worker pulls words from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    /// Read a file, rewinding at the end when `looping`
    File { path: PathBuf, looping: bool },
    /// Tile a precomputed pseudo-random pattern of `len` words
    RepeatingRandom { len: usize, seed: Option<u64> },
    /// Generate pseudo-random words on every request
    Random { seed: Option<u64> },
}

/// Where the last worker pushes words to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkConfig {
    /// Truncate and write a file
    File { path: PathBuf },
    /// Discard everything
    Null,
}

/// One bounded buffer between two workers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferConfig {
    pub kind: BufferKind,
    /// Store length in words
    pub capacity: usize,
}

impl BufferConfig {
    /// A compacting buffer of `capacity` words
    pub fn fixed(capacity: usize) -> Self {
        Self {
            kind: BufferKind::Fixed,
            capacity,
        }
    }

    /// A wrap-around buffer of `capacity` words
    pub fn circular(capacity: usize) -> Self {
        Self {
            kind: BufferKind::Circular,
            capacity,
        }
    }

    fn min_capacity(&self) -> usize {
        match self.kind {
            BufferKind::Fixed => 1,
            BufferKind::Circular => 2,
        }
    }
}

/// How often and how many times the reporter polls the workers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingConfig {
    pub interval: Duration,
    pub samples: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            samples: 10,
        }
    }
}

/// Static description of a benchmark pipeline:
/// source → buffers[0] → … → buffers[n-1] → sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    pub source: SourceConfig,
    pub sink: SinkConfig,
    pub buffers: Vec<BufferConfig>,
    /// Scratch size of every worker, in words
    pub chunk_size: usize,
    pub sampling: SamplingConfig,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::RepeatingRandom {
                len: 1 << 20,
                seed: None,
            },
            sink: SinkConfig::Null,
            buffers: vec![BufferConfig::fixed(1 << 20)],
            chunk_size: 256 * 1024,
            sampling: SamplingConfig::default(),
        }
    }
}

impl BenchConfig {
    /// Check everything that can be checked without touching the filesystem
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(PipelineError::ConfigError(
                "chunk size must be at least 1 word".into(),
            ));
        }

        if let SourceConfig::RepeatingRandom { len: 0, .. } = self.source {
            return Err(PipelineError::ConfigError(
                "repeating source needs a pattern of at least 1 word".into(),
            ));
        }

        for (i, buffer) in self.buffers.iter().enumerate() {
            if buffer.capacity < buffer.min_capacity() {
                return Err(PipelineError::ConfigError(format!(
                    "buffer {} ({:?}) needs a capacity of at least {} words, got {}",
                    i,
                    buffer.kind,
                    buffer.min_capacity(),
                    buffer.capacity
                )));
            }
        }

        if self.sampling.samples == 0 || self.sampling.interval.is_zero() {
            return Err(PipelineError::ConfigError(
                "sampling needs a non-zero interval and at least one sample".into(),
            ));
        }

        Ok(())
    }

    /// Number of workers the pipeline will run
    pub fn worker_count(&self) -> usize {
        self.buffers.len() + 1
    }

    /// True when the source runs dry on its own, so the pipeline finishes
    /// without being stopped
    pub fn is_finite(&self) -> bool {
        matches!(self.source, SourceConfig::File { looping: false, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = BenchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.worker_count(), 2);
    }

    #[test]
    fn test_zero_chunk_rejected() {
        let config = BenchConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PipelineError::ConfigError(_))));
    }

    #[test]
    fn test_circular_capacity_minimum() {
        let mut config = BenchConfig {
            buffers: vec![BufferConfig::circular(1)],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.buffers = vec![BufferConfig::circular(2), BufferConfig::fixed(1)];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sampling_rejected() {
        let config = BenchConfig {
            sampling: SamplingConfig {
                interval: Duration::from_secs(1),
                samples: 0,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_direct_pipeline_has_one_worker() {
        let config = BenchConfig {
            buffers: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.worker_count(), 1);
    }

    #[test]
    fn test_only_one_shot_file_is_finite() {
        let mut config = BenchConfig::default();
        assert!(!config.is_finite());

        config.source = SourceConfig::File {
            path: PathBuf::from("in.dat"),
            looping: true,
        };
        assert!(!config.is_finite());

        config.source = SourceConfig::File {
            path: PathBuf::from("in.dat"),
            looping: false,
        };
        assert!(config.is_finite());
    }
}
