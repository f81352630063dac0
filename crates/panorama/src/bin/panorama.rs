use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use panorama::image_io::run_config;
use panorama::io::{StitchConfig, StitchReport};
use panorama::{Lookup, PanoramaError};

#[derive(Parser, Debug)]
#[command(name = "panorama", version, about = "Stitch overlapping photos and trace panorama pixels back to their source")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a stitching job from a JSON config.
    Stitch {
        /// Path to the stitch config JSON.
        config: PathBuf,
    },
    /// Report which source image a panorama pixel comes from.
    #[command(allow_negative_numbers = true)]
    Locate {
        /// Report JSON written by `stitch`.
        report: PathBuf,
        x: f64,
        y: f64,
    },
}

fn init_logging(verbosity: u8) {
    #[cfg(feature = "tracing")]
    {
        let _ = verbosity;
        panorama::core::init_tracing(false);
    }
    #[cfg(not(feature = "tracing"))]
    {
        let level = panorama::core::level_from_verbosity(verbosity);
        if let Err(err) = panorama::core::init_with_level(level) {
            eprintln!("failed to install logger: {err}");
        }
    }
}

fn run(cli: Cli) -> Result<(), PanoramaError> {
    match cli.command {
        Command::Stitch { config } => {
            let cfg = StitchConfig::load_json(&config)?;
            let report = run_config(&cfg, &config)?;
            println!(
                "stitched {} images into {}x{} (reference {})",
                report.image_paths.len(),
                report.canvas_width,
                report.canvas_height,
                report.reference.unwrap_or_default()
            );
            println!("wrote report JSON to {}", cfg.report_path().display());
        }
        Command::Locate { report, x, y } => {
            let report = StitchReport::load_json(&report)?;
            match report.locate(x, y) {
                Lookup::Source(index) => {
                    println!("source {index} {}", report.image_path(index).unwrap_or("?"));
                }
                Lookup::NotFound => println!("not found"),
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
