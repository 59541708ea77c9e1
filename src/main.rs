use std::path::PathBuf;
use std::time::Instant;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use chunkmap::io::{LineReader, LineWriter, create_progress_bar};
use chunkmap::ops::Operation;
use chunkmap::{ChunkMapper, MapperConfig};

const DEFAULT_BATCH_LINES: usize = 4096;

#[derive(Parser, Debug)]
#[command(name = "chunkmap")]
#[command(about = "Apply a line transform to a file using a small fixed worker pool", long_about = None)]
struct Args {
    /// Input text file, one item per line
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file path (defaults to input with .out extension)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Transform applied to every line
    #[arg(short = 'f', long, value_enum, default_value_t = Operation::Square)]
    op: Operation,

    /// Maximum execution contexts per batch, caller thread included (defaults to 3)
    #[arg(short = 'j', long)]
    contexts: Option<usize>,

    /// Map every batch on the main thread
    #[arg(long)]
    sequential: bool,

    /// Lines handed to the mapper at a time
    #[arg(short, long, default_value_t = DEFAULT_BATCH_LINES)]
    batch: usize,

    /// Disable progress bar and status output
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Determine output path
    let output_path = args.output.clone().unwrap_or_else(|| {
        let mut path = args.input.clone();
        path.set_extension("out");
        path
    });

    // Validate input
    if !args.input.exists() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }

    if args.input == output_path {
        anyhow::bail!("Input and output files cannot be the same");
    }

    if args.batch == 0 {
        anyhow::bail!("Batch size must be at least 1");
    }

    let status = |message: String| {
        if !args.quiet {
            println!("{}", message);
        }
    };

    status(format!(
        "Mapping {} over {} into {}",
        args.op
            .to_possible_value()
            .map(|value| value.get_name().to_string())
            .unwrap_or_default(),
        args.input.display(),
        output_path.display()
    ));

    let start_time = Instant::now();

    let reader = LineReader::new(&args.input)?;
    let lines = reader.lines()?;
    let total_lines = lines.len();

    status(format!(
        "Total lines: {} ({:.2} MB)",
        total_lines,
        reader.total_bytes() as f64 / (1024.0 * 1024.0)
    ));

    let mut writer = LineWriter::new(&output_path)?;

    let progress = if !args.quiet {
        Some(create_progress_bar(total_lines)?)
    } else {
        None
    };

    let config = if args.sequential {
        MapperConfig::sequential()
    } else {
        MapperConfig::with_contexts(args.contexts)
    };
    let mapper = ChunkMapper::new(config);
    status(format!(
        "Using up to {} execution contexts{}",
        mapper.max_contexts(),
        if mapper.is_parallel() { "" } else { " (sequential)" }
    ));

    let op = args.op;
    let numbered: Vec<(usize, &str)> = lines.into_iter().enumerate().collect();

    for (batch_index, batch) in numbered.chunks(args.batch).enumerate() {
        tracing::debug!(batch = batch_index, lines = batch.len(), "mapping batch");

        let results = mapper
            .try_map(
                |&(index, line): &(usize, &str)| {
                    op.apply(line).with_context(|| format!("line {}", index + 1))
                },
                batch,
            )
            .with_context(|| format!("batch {} failed", batch_index))?;

        for result in &results {
            writer.write_line(result)?;
        }

        if let Some(ref pb) = progress {
            pb.inc(batch.len() as u64);
        }
    }

    let written = writer.finish()?;

    if let Some(ref pb) = progress {
        pb.finish_with_message("Mapping complete");
    }

    let elapsed = start_time.elapsed();
    status(format!(
        "\nMapped {} lines in {:.2?} ({:.0} lines/s)",
        written,
        elapsed,
        written as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
    ));
    status(format!("Output file: {}", output_path.display()));

    Ok(())
}
