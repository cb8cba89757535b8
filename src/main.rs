use anyhow::{Context, Result};
use clap::Parser;
use ioperf::{BenchConfig, Pipeline, PipelineBuilder, Sampler, Timing, Word};
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli;

use cli::Cli;

fn run<W: Word>(config: &BenchConfig) -> Result<()> {
    let pipeline = PipelineBuilder::<W>::from_config(config)
        .context("failed to set up pipeline")?
        .build()
        .context("failed to build pipeline")?;

    if config.is_finite() {
        let timing = copy_to_end(pipeline)?;
        println!("{}", timing);
        return Ok(());
    }

    let mut sampler = Sampler::new(config.sampling.interval, config.sampling.samples)?;
    for (name, probe) in pipeline.probes() {
        sampler.watch(name, probe);
    }

    let running = pipeline.start().context("failed to start pipeline")?;
    let report = sampler.run().with_word_width(W::WIDTH);
    let summary = running.summary();
    let totals = running.stop().context("pipeline did not shut down cleanly")?;

    print!("{}", report);
    for (series, total) in report.series().iter().zip(&totals) {
        info!(
            stage = series.name(),
            words = total,
            bytes = total * W::WIDTH as u64,
            "stage total"
        );
    }
    debug!("{}", summary);

    Ok(())
}

/// Run a pipeline whose source runs dry until every worker has finished,
/// timing it from start to the last join.
fn copy_to_end<W: Word>(pipeline: Pipeline<W>) -> Result<Timing> {
    let start = Instant::now();
    let running = pipeline.start().context("failed to start pipeline")?;
    let totals = running.wait().context("pipeline did not finish cleanly")?;
    let elapsed = start.elapsed();

    let words = totals.last().copied().unwrap_or(0);
    info!(words, elapsed_us = elapsed.as_micros() as u64, "copy finished");
    Ok(Timing::new(elapsed, words).with_word_width(W::WIDTH))
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    let config = cli.to_config();
    info!(word_width = cli.word_width, ?config, "starting benchmark");

    match cli.word_width {
        1 => run::<u8>(&config),
        2 => run::<u16>(&config),
        4 => run::<u32>(&config),
        8 => run::<u64>(&config),
        other => anyhow::bail!("unsupported word width: {}", other),
    }
}
