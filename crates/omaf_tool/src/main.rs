mod config;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use omaf_model::{
    ContentCoverage, ProjectionFormat, RegionWisePacking, SourceInfo, TilesMergeDirection,
};
use packing::{ExtractorTrack, TwoResExtractorTrackGenerator};
use playback::{CountingSink, PlayerSession, SessionReport};
use render_target::{RecordingBackend, RenderBackend, RgbFrame, SoftwareCompositor};
use scvp::ErpScvp;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use viewport::{FieldOfView, Pose, get_tiles_in_viewport};

use crate::config::ToolConfig;

const HIGH_COLOR: [u8; 3] = [220, 70, 50];
const LOW_COLOR: [u8; 3] = [50, 90, 220];

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Generate two-resolution OMAF extractor tracks and play them back"
)]
struct Arguments {
    #[command(subcommand)]
    command: Command,

    /// Pretty print JSON output.
    #[arg(long, global = true)]
    pretty: bool,

    /// Write JSON output to this file instead of stdout.
    #[arg(long, global = true)]
    output: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate one extractor track per viewport and print its packing metadata.
    Pack {
        /// TOML file describing the input streams.
        #[arg(long)]
        config: PathBuf,
    },
    /// Play the generated tracks along the configured pose trace.
    Play {
        #[arg(long)]
        config: PathBuf,

        /// Number of frames to render.
        #[arg(long, default_value_t = 90)]
        frames: u64,

        #[arg(long, value_enum, default_value_t = Backend::Recording)]
        backend: Backend,

        /// Override the player's horizontal field of view.
        #[arg(long)]
        h_fov: Option<f32>,

        /// Override the player's vertical field of view.
        #[arg(long)]
        v_fov: Option<f32>,
    },
    /// Print the high resolution tile ids visible from a pose.
    Tiles {
        #[arg(long)]
        config: PathBuf,

        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        yaw: f32,

        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        pitch: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
enum Backend {
    /// Record blit commands without touching pixels.
    Recording,
    /// Composite a synthetic packed frame on the CPU.
    Software,
}

#[derive(Debug, Serialize)]
struct TrackSummary<'a> {
    viewport_idx: u16,
    projection: ProjectionFormat,
    packed_width: u32,
    packed_height: u32,
    rwpk: &'a RegionWisePacking,
    coverage: &'a ContentCoverage,
    tiles_merge_direction: &'a TilesMergeDirection,
    nal_sizes: NalSizes,
}

#[derive(Debug, Serialize)]
struct NalSizes {
    vps: usize,
    sps: usize,
    pps: usize,
    projection_sei: usize,
    rwpk_sei: usize,
}

impl<'a> TrackSummary<'a> {
    fn new(track: &'a ExtractorTrack) -> Self {
        Self {
            viewport_idx: track.viewport_idx,
            projection: track.projection,
            packed_width: track.dst_width,
            packed_height: track.dst_height,
            rwpk: &track.rwpk,
            coverage: &track.coverage,
            tiles_merge_direction: &track.tiles_merge_direction,
            nal_sizes: NalSizes {
                vps: track.vps.len(),
                sps: track.sps.len(),
                pps: track.pps.len(),
                projection_sei: track.projection_sei.len(),
                rwpk_sei: track.rwpk_sei.len(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct PlaySummary {
    backend: Backend,
    viewport_feedback_pushes: u64,
    /// Surface pixels covered by a blit on the last frame, software backend only.
    covered_pixels: Option<u64>,
    report: SessionReport,
}

#[derive(Debug, Serialize)]
struct TilesSummary {
    yaw: f32,
    pitch: f32,
    h_fov: f32,
    v_fov: f32,
    tiles: Vec<u32>,
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .try_init();

    let arguments = Arguments::parse();
    match &arguments.command {
        Command::Pack { config } => {
            let config = ToolConfig::load(config)?;
            let tracks = generate_tracks(&config)?;
            let summaries: Vec<_> = tracks.values().map(TrackSummary::new).collect();
            write_json(&arguments, &summaries)
        }
        Command::Play {
            config,
            frames,
            backend,
            h_fov,
            v_fov,
        } => {
            let mut config = ToolConfig::load(config)?;
            if let Some(h_fov) = h_fov {
                config.player.h_fov = *h_fov;
            }
            if let Some(v_fov) = v_fov {
                config.player.v_fov = *v_fov;
            }
            let summary = play(&config, *frames, *backend)?;
            write_json(&arguments, &summary)
        }
        Command::Tiles { config, yaw, pitch } => {
            let config = ToolConfig::load(config)?;
            let main = config.main_source()?;
            let fov = FieldOfView::new(config.player.h_fov, config.player.v_fov)?;
            let tiles = get_tiles_in_viewport(Pose::new(*yaw, *pitch)?, fov, &main)?;
            write_json(
                &arguments,
                &TilesSummary {
                    yaw: *yaw,
                    pitch: *pitch,
                    h_fov: fov.h_fov(),
                    v_fov: fov.v_fov(),
                    tiles,
                },
            )
        }
    }
}

fn generate_tracks(config: &ToolConfig) -> Result<BTreeMap<u16, ExtractorTrack>> {
    let streams = config.streams()?;
    let mut generator =
        TwoResExtractorTrackGenerator::new(config.initial_info(), &streams, ErpScvp::default());
    generator
        .initialize()
        .context("initialize extractor track generator")?;
    let tracks = generator
        .generate_extractor_tracks()
        .context("generate extractor tracks")?;
    info!(tracks = tracks.len(), "generated extractor tracks");
    Ok(tracks)
}

fn play(config: &ToolConfig, frames: u64, backend: Backend) -> Result<PlaySummary> {
    let tracks = generate_tracks(config)?;
    let main = config.main_source()?;
    match backend {
        Backend::Recording => {
            let (report, pushes, _) =
                run_session(config, frames, tracks, main, RecordingBackend::new())?;
            Ok(PlaySummary {
                backend,
                viewport_feedback_pushes: pushes,
                covered_pixels: None,
                report,
            })
        }
        Backend::Software => {
            let mut compositor = SoftwareCompositor::new(main.width, main.height);
            if let Some(frame) = tracks.values().next().map(synthetic_packed_frame) {
                compositor.set_frame(playback::VIDEO_ID, frame);
            }
            let (report, pushes, compositor) = run_session(config, frames, tracks, main, compositor)?;
            Ok(PlaySummary {
                backend,
                viewport_feedback_pushes: pushes,
                covered_pixels: Some(covered_pixels(compositor.surface())),
                report,
            })
        }
    }
}

fn run_session<B: RenderBackend>(
    config: &ToolConfig,
    frames: u64,
    tracks: BTreeMap<u16, ExtractorTrack>,
    main: SourceInfo,
    backend: B,
) -> Result<(SessionReport, u64, B)> {
    let mut session = PlayerSession::new(
        config.player.clone(),
        tracks,
        main,
        ErpScvp::default(),
        backend,
    )?;
    let sink = CountingSink::new();
    let report = session.run(frames, sink.clone())?;
    Ok((report, sink.pushes(), session.into_backend()))
}

/// Packed picture with every high resolution area in one colour and every
/// low resolution area in another.
fn synthetic_packed_frame(track: &ExtractorTrack) -> RgbFrame {
    let mut frame = RgbFrame::new(track.dst_width, track.dst_height, [0, 0, 0]);
    for source in &track.source_resolutions {
        let color = if source.quality_ranking == 1 {
            HIGH_COLOR
        } else {
            LOW_COLOR
        };
        frame.fill_rect(source.packed_area(), color);
    }
    frame
}

fn covered_pixels(surface: &RgbFrame) -> u64 {
    let mut covered = 0;
    for y in 0..surface.height() {
        for x in 0..surface.width() {
            if surface.pixel(x, y).is_some_and(|pixel| pixel != [0, 0, 0]) {
                covered += 1;
            }
        }
    }
    covered
}

fn write_json<T: Serialize>(arguments: &Arguments, value: &T) -> Result<()> {
    match &arguments.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("create output {}", path.display()))?;
            write_to(BufWriter::new(file), arguments.pretty, value, path)
        }
        None => write_to(io::stdout().lock(), arguments.pretty, value, Path::new("stdout")),
    }
}

fn write_to<W: Write, T: Serialize>(
    mut writer: W,
    pretty: bool,
    value: &T,
    path: &Path,
) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut writer, value)
    } else {
        serde_json::to_writer(&mut writer, value)
    }
    .with_context(|| format!("write json to {}", path.display()))?;
    writeln!(writer).with_context(|| format!("write json to {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("flush {}", path.display()))
}
