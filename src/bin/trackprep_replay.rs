//! Replays recorded inference output against a directory of frames.
//!
//! Frames are read in file-name order, filtered and staged exactly as a live
//! run would, and the engine call is answered from a JSON-lines file with one
//! `{"data": [...], "shape": [1, N, 6]}` object per frame. The Nth line
//! always belongs to the Nth frame, including frames that fail to decode.
//! Validated boxes are written to stdout as JSON lines.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use trackprep_rs::integration::replay;
use trackprep_rs::logging::{LoggingConfig, init_logging};
use trackprep_rs::{
    ChannelOrder, Frame, JsonLinesRenderer, PipelineConfig, RunControl, VideoSource,
};

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Replay recorded detections through the frame pipeline
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory of frame images, processed in file-name order
    #[arg(long, value_name = "DIR")]
    frames: PathBuf,

    /// JSON-lines file with one raw inference output per frame
    #[arg(long, value_name = "FILE")]
    detections: PathBuf,

    /// Number of frames for the moving average filter
    #[arg(short = 'w', long = "frame-averaging-window", value_name = "N")]
    averaging_window: Option<usize>,

    /// Kernel size for the median filter (even sizes are rounded up)
    #[arg(short = 'k', long = "median-window", value_name = "N")]
    median_window: Option<usize>,

    /// JSON pipeline configuration; command-line windows override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Stop after this many frames (0 = no limit)
    #[arg(long, default_value = "0", value_name = "COUNT")]
    max_frames: u64,

    /// Log level filter, overridden by RUST_LOG
    #[arg(long, default_value = "info", value_name = "FILTER")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

/// Frames decoded from image files, in RGB order.
struct ImageDirSource {
    paths: std::vec::IntoIter<PathBuf>,
    count: u64,
}

impl ImageDirSource {
    fn open(dir: &Path) -> Result<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("reading frame directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            })
            .collect();
        paths.sort();
        let count = paths.len() as u64;
        Ok(Self {
            paths: paths.into_iter(),
            count,
        })
    }

    fn load(path: &Path) -> Result<Frame> {
        let image = image::open(path)
            .with_context(|| format!("decoding {}", path.display()))?
            .to_rgb8();
        let (width, height) = image.dimensions();
        Ok(Frame::from_raw(
            width as usize,
            height as usize,
            image.into_raw(),
        )?)
    }
}

impl VideoSource for ImageDirSource {
    type Error = anyhow::Error;

    fn next_frame(&mut self) -> Option<Result<Frame, Self::Error>> {
        self.paths.next().map(|path| Self::load(&path))
    }

    fn frame_count(&self) -> Option<u64> {
        Some(self.count)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&LoggingConfig {
        level: args.log_level.clone(),
        json: args.log_json,
    });

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        // image decodes to RGB already
        None => PipelineConfig {
            channel_order: ChannelOrder::Preserve,
            ..Default::default()
        },
    };
    if args.averaging_window.is_some() {
        config.averaging_window = args.averaging_window;
    }
    if args.median_window.is_some() {
        config.median_window = args.median_window;
    }

    info!("Frames: {}", args.frames.display());
    info!("Detections: {}", args.detections.display());

    let frames = ImageDirSource::open(&args.frames)?;
    let recorded = File::open(&args.detections)
        .with_context(|| format!("opening detections {}", args.detections.display()))?;
    // One recorded line per source frame, even for frames that fail early.
    let (source, engine) = replay(frames, BufReader::new(recorded));
    let mut pipeline = trackprep_rs::FramePipeline::new(engine, &config)?;

    let mut control = RunControl::new();
    if args.max_frames > 0 {
        control = control.with_max_frames(args.max_frames);
    }
    let stop = control.stop_handle();
    ctrlc::set_handler(move || {
        warn!("interrupt received, stopping after the current frame");
        stop.store(true, Ordering::SeqCst);
    })
    .context("installing Ctrl-C handler")?;

    let renderer = JsonLinesRenderer::new(std::io::stdout().lock())
        .with_class_names(pipeline.class_names().to_vec());
    let summary = pipeline.run(source, renderer, &control);

    info!("Processed frames: {}", summary.frames_processed);
    if summary.frames_failed > 0 {
        warn!("Failed frames: {}", summary.frames_failed);
    }
    Ok(())
}
