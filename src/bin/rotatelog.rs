//! rotatelog CLI
//!
//! Pipes stdin into a rotating log, or reads a rotated chain back.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rotatelog::{segment, Capacity, Compression, Config, RotatingWriter};
use tracing_subscriber::{fmt, EnvFilter};

/// rotatelog
#[derive(Parser, Debug)]
#[command(name = "rotatelog")]
#[command(about = "Size-bounded rotating log files with compressed backlog")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Layout of the chain on disk
#[derive(clap::Args, Debug)]
struct Layout {
    /// Path of the active log file
    path: PathBuf,

    /// Total number of files kept, active file included
    #[arg(long = "max-file", default_value = "1")]
    max_files: usize,

    /// Compression of segments .2 and older (gzip, bzip2, xz)
    #[arg(long = "compress", default_value = "")]
    compression: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append stdin to the log, one line per record
    Write {
        #[command(flatten)]
        layout: Layout,

        /// Rotate once the active file reaches this size (e.g. 10m, -1 to disable)
        #[arg(long = "max-size", default_value = "-1", allow_hyphen_values = true)]
        max_size: String,
    },

    /// Print the whole chain, oldest record first
    Cat {
        #[command(flatten)]
        layout: Layout,
    },

    /// List the segments on disk
    Ls {
        #[command(flatten)]
        layout: Layout,
    },
}

fn main() {
    // Logs go to stderr so `cat` output stays clean
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rotatelog=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args.command) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> rotatelog::Result<()> {
    match command {
        Commands::Write { layout, max_size } => {
            let config = Config::builder()
                .path(layout.path)
                .capacity(max_size.parse::<Capacity>()?)
                .max_files(layout.max_files)
                .compression(layout.compression.parse()?)
                .build();

            let writer = RotatingWriter::open(config)?;
            let stdin = io::stdin();
            let mut line = Vec::new();
            let mut records = 0u64;

            let mut input = stdin.lock();
            loop {
                line.clear();
                if input.read_until(b'\n', &mut line)? == 0 {
                    break;
                }
                if !line.ends_with(b"\n") {
                    line.push(b'\n');
                }
                writer.write(&line)?;
                records += 1;
            }

            writer.sync()?;
            writer.close()?;
            tracing::info!(records, rotations = writer.rotations(), "stdin exhausted");
        }

        Commands::Cat { layout } => {
            let compression: Compression = layout.compression.parse()?;
            let mut stdout = io::stdout().lock();
            for seg in segment::list_segments(&layout.path, layout.max_files, compression)? {
                io::copy(&mut seg.open()?, &mut stdout)?;
            }
            stdout.flush()?;
        }

        Commands::Ls { layout } => {
            let compression: Compression = layout.compression.parse()?;
            let mut stdout = io::stdout().lock();
            for seg in segment::list_segments(&layout.path, layout.max_files, compression)? {
                writeln!(
                    stdout,
                    "{:>3}  {:>10}  {}",
                    seg.index,
                    seg.stored_len()?,
                    seg.path.display()
                )?;
            }
        }
    }

    Ok(())
}
