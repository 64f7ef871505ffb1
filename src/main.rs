use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use ip_sift::constants::{DEFAULT_INPUT_PATH, RESULT_LABEL};
use ip_sift::utils::{format_bytes, format_duration, setup_logging};
use ip_sift::{CountError, DistinctCountConfig, DistinctCounter};

#[derive(Parser)]
#[command(name = "ip-sift")]
#[command(about = "IP Sift - exact distinct counting of IP address lines in files larger than memory")]
#[command(version)]
struct Args {
    #[arg(short, long, default_value = DEFAULT_INPUT_PATH, help = "Input file, one address per line")]
    input: PathBuf,

    #[arg(short, long, help = "JSON configuration file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Lines read per in-memory chunk before spilling a run")]
    chunk_lines: Option<usize>,

    #[arg(long, help = "Directory that holds temporary runs")]
    temp_dir: Option<PathBuf>,

    #[arg(long, help = "Ignore lines that are empty after trimming")]
    skip_blank_lines: bool,

    #[arg(long, help = "Print run statistics as JSON instead of the summary line")]
    json: bool,

    #[arg(short, long, help = "Verbose output")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let verbosity = if args.verbose { "verbose" } else { "normal" };
    if let Err(e) = setup_logging(verbosity) {
        eprintln!("error [Logging]: {}", e);
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<CountError>() {
                Some(count_error) => eprintln!("error [{}]: {}", count_error.kind(), e),
                None => eprintln!("error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => DistinctCountConfig::from_file(path)?,
        None => DistinctCountConfig::default(),
    };

    if let Some(chunk_lines) = args.chunk_lines {
        config.chunk_line_limit = chunk_lines;
    }
    if let Some(temp_dir) = args.temp_dir {
        config.temp_directory = temp_dir;
    }
    if args.skip_blank_lines {
        config.skip_blank_lines = true;
    }

    info!("Input: {}", args.input.display());
    info!("Chunk line limit: {}", config.chunk_line_limit);

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let shutdown_flag_clone = shutdown_flag.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Shutdown signal received. Cleaning up workspace...");
            shutdown_flag_clone.store(true, Ordering::Relaxed);
        }
    });

    let counter = DistinctCounter::new(config)?.with_shutdown_signal(shutdown_flag);
    let input = args.input.clone();
    let stats = tokio::task::spawn_blocking(move || counter.process(&input)).await??;

    info!(
        "{} runs, {} spilled, {} duplicates absorbed in chunks, {} across runs, took {}",
        stats.runs_created,
        format_bytes(stats.spill_bytes),
        stats.duplicates_in_chunks,
        stats.duplicates_across_runs,
        format_duration(stats.processing_time_ms as f64 / 1000.0)
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{}: {}", RESULT_LABEL, stats.unique_values);
    }

    Ok(())
}
