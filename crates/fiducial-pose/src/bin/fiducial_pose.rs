use clap::Parser;
use fiducial_pose::core::parse_level;
use fiducial_pose::detect::load_frame;
use fiducial_pose::{FrameOutcome, Localizer, LocalizerConfig, RecordingSink, Signal};
use log::LevelFilter;
use serde::Serialize;
use std::path::PathBuf;

/// Replay image files through the marker localizer and print one JSON line
/// per frame.
#[derive(Parser, Debug)]
#[command(name = "fiducial-pose", version, about)]
struct Cli {
    /// JSON localizer configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level: off, error, warn, info, debug, trace. Under the `tracing`
    /// feature `RUST_LOG` takes precedence.
    #[arg(long, default_value = "info", value_parser = parse_level)]
    log_level: LevelFilter,

    /// Keep registrations and poses in vision axes.
    #[arg(long)]
    vision_coords: bool,

    /// Images to process, in order.
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

#[derive(Serialize)]
struct FrameReport<'a> {
    image: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    block_size: u32,
    signals: Vec<Signal>,
}

fn outcome_name(outcome: &FrameOutcome) -> &'static str {
    match outcome {
        FrameOutcome::Located(_) => "located",
        FrameOutcome::NotVisible(_) => "not_visible",
        FrameOutcome::Skipped(_) => "skipped",
    }
}

#[cfg(feature = "tracing")]
fn init_logging(level: LevelFilter) {
    fiducial_pose::core::init_tracing(level, false);
}

#[cfg(not(feature = "tracing"))]
fn init_logging(level: LevelFilter) {
    if let Err(err) = fiducial_pose::core::init_with_level(level) {
        eprintln!("logging disabled: {err}");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    let mut config = match &cli.config {
        Some(path) => LocalizerConfig::load_json(path)?,
        None => LocalizerConfig::default(),
    };
    if cli.vision_coords {
        config.use_vision_coords = true;
    }

    let mut localizer = Localizer::new(config)?;
    let mut sink = RecordingSink::new();

    for path in &cli.images {
        let image = path.to_string_lossy();
        let report = match load_frame(path) {
            Ok(frame) => {
                let outcome = localizer.process_frame(&frame, &mut sink);
                FrameReport {
                    image: &image,
                    outcome: Some(outcome_name(&outcome)),
                    error: match outcome {
                        FrameOutcome::Skipped(err) => Some(err.to_string()),
                        _ => None,
                    },
                    block_size: localizer.block_size(),
                    signals: sink.take(),
                }
            }
            Err(err) => {
                log::error!("cannot read {image}: {err}");
                FrameReport {
                    image: &image,
                    outcome: None,
                    error: Some(err.to_string()),
                    block_size: localizer.block_size(),
                    signals: Vec::new(),
                }
            }
        };
        println!("{}", serde_json::to_string(&report)?);
    }

    Ok(())
}
