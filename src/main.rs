use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use clap::error::ErrorKind;

use audio_batch_converter::cli::commands::Cli;
use audio_batch_converter::{CancellationToken, Dispatcher, Reporter};
use log::{debug, warn};

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let report_path = cli.report.clone();
    let Some(job) = cli.into_job() else {
        Cli::command()
            .error(ErrorKind::MissingRequiredArgument, "--codec or --ipod is required")
            .exit();
    };

    if job.dry_run {
        println!("=== DRY RUN MODE - No files will be converted ===");
    }
    println!("=== Starting Conversion ===");
    println!("Input directory: {}", job.input_root.display());
    println!("Output directory: {}", job.output_root.display());
    println!("Codec: {}", job.codec);
    println!("iPod optimizations: {}", job.device_optimized);
    println!("Strip lyrics: {}", job.strip_lyrics);

    let dispatcher = Dispatcher::new(job);
    cancel_on_ctrl_c(dispatcher.cancellation_token());

    let summary = match dispatcher.run() {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(1);
        }
    };

    let reporter = Reporter::new();
    reporter.print_summary(&summary);

    if let Some(path) = report_path {
        if let Err(e) = reporter.generate_failure_report(&summary, &path) {
            eprintln!("Error generating report: {}", e);
        }
    }

    // 1 = the run never got going, 2 = some files failed.
    if summary.has_failures() {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}

/// Tools run in their own process groups and never see the terminal's
/// SIGINT, so Ctrl-C is turned into a cancel that kills them. A second
/// Ctrl-C exits immediately.
fn cancel_on_ctrl_c(token: CancellationToken) {
    std::thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                warn!("Ctrl-C handling unavailable: {}", e);
                return;
            }
        };
        rt.block_on(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Interrupted, stopping running conversions...");
                token.cancel();
            }
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        });
        debug!("Ctrl-C watcher exiting");
    });
}
