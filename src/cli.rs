use clap::{Parser, ValueEnum};
use ioperf::{BenchConfig, BufferConfig, BufferKind, SamplingConfig, SinkConfig, SourceConfig};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    /// Tile a precomputed pseudo-random buffer
    Repeat,
    /// Generate pseudo-random words on every request
    Random,
    /// Read the input file, looping at its end
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkArg {
    /// Discard everything
    Null,
    /// Write to the output file
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BufferArg {
    Fixed,
    Circular,
}

impl From<BufferArg> for BufferKind {
    fn from(arg: BufferArg) -> Self {
        match arg {
            BufferArg::Fixed => BufferKind::Fixed,
            BufferArg::Circular => BufferKind::Circular,
        }
    }
}

fn parse_word_width(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(width @ (1 | 2 | 4 | 8)) => Ok(width),
        _ => Err(format!("word width must be 1, 2, 4 or 8 bytes, got {}", s)),
    }
}

#[derive(Debug, Parser)]
#[command(name = "ioperf")]
#[command(author, version, about = "Measure streaming throughput through bounded in-memory pipes")]
pub struct Cli {
    /// Where words come from
    #[arg(long, value_enum, default_value_t = SourceArg::Repeat)]
    pub source: SourceArg,

    /// Input file for the file source
    #[arg(long, default_value = "512k.dat")]
    pub input_file: PathBuf,

    /// Stop at the end of the input file instead of rewinding
    #[arg(long)]
    pub once: bool,

    /// Where words go
    #[arg(long, value_enum, default_value_t = SinkArg::Null)]
    pub sink: SinkArg,

    /// Output file for the file sink
    #[arg(long, default_value = "out.dat")]
    pub output_file: PathBuf,

    /// Bounded buffer implementation
    #[arg(long, value_enum, default_value_t = BufferArg::Fixed)]
    pub buffer: BufferArg,

    /// Capacity of each buffer, in words
    #[arg(long, default_value_t = 1 << 20)]
    pub buffer_size: usize,

    /// Number of buffers chained between source and sink
    #[arg(long, default_value_t = 1)]
    pub stages: usize,

    /// Words each worker moves per round trip
    #[arg(long, default_value_t = 256 * 1024)]
    pub chunk_size: usize,

    /// Pattern length of the repeating source, in words
    #[arg(long, default_value_t = 1 << 20)]
    pub source_buffer: usize,

    /// Seed for the pseudo-random sources
    #[arg(long)]
    pub seed: Option<u64>,

    /// Word width in bytes
    #[arg(long, default_value_t = 1, value_parser = parse_word_width)]
    pub word_width: usize,

    /// Sampling interval in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub interval_ms: u64,

    /// Number of samples to take before stopping
    #[arg(long, default_value_t = 10)]
    pub samples: usize,
}

impl Cli {
    /// Translate the parsed arguments into a benchmark configuration
    pub fn to_config(&self) -> BenchConfig {
        let source = match self.source {
            SourceArg::Repeat => SourceConfig::RepeatingRandom {
                len: self.source_buffer,
                seed: self.seed,
            },
            SourceArg::Random => SourceConfig::Random { seed: self.seed },
            SourceArg::File => SourceConfig::File {
                path: self.input_file.clone(),
                looping: !self.once,
            },
        };

        let sink = match self.sink {
            SinkArg::Null => SinkConfig::Null,
            SinkArg::File => SinkConfig::File {
                path: self.output_file.clone(),
            },
        };

        BenchConfig {
            source,
            sink,
            buffers: vec![
                BufferConfig {
                    kind: self.buffer.into(),
                    capacity: self.buffer_size,
                };
                self.stages
            ],
            chunk_size: self.chunk_size,
            sampling: SamplingConfig {
                interval: Duration::from_millis(self.interval_ms),
                samples: self.samples,
            },
        }
    }
}
