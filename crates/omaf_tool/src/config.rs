use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use omaf_model::{PicResolution, ProjectionFormat, SourceInfo};
use packing::{InitialInfo, MediaStream, MediaType, VideoStream};
use playback::PlayerConfig;
use scvp::ViewportInformation;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub packing: PackingConfig,
    pub player: PlayerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackingConfig {
    pub h_fov: f32,
    pub v_fov: f32,
    pub streams: Vec<StreamConfig>,
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            h_fov: 80.0,
            v_fov: 80.0,
            streams: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub width: u32,
    pub height: u32,
    pub tile_columns: u32,
    pub tile_rows: u32,
    pub projection: ProjectionFormat,
    /// Annex-B bitstream to take VPS/SPS/PPS and the picture size from,
    /// relative to the config file.
    pub annex_b: Option<PathBuf>,
}

impl StreamConfig {
    fn source_info(&self) -> SourceInfo {
        SourceInfo {
            width: self.width,
            height: self.height,
            tile_columns: self.tile_columns,
            tile_rows: self.tile_rows,
        }
    }
}

impl ToolConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let mut config: ToolConfig =
            toml::from_str(&text).with_context(|| format!("parse config {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for stream in &mut config.packing.streams {
            if let Some(annex_b) = stream.annex_b.as_mut() {
                *annex_b = base.join(&*annex_b);
            }
        }
        Ok(config)
    }

    pub fn initial_info(&self) -> InitialInfo {
        let videos = self.packing.streams.len();
        InitialInfo {
            bs_num_video: u8::try_from(videos).unwrap_or(u8::MAX),
            bs_num_audio: 0,
            media_types: vec![MediaType::Video; videos],
            viewport: ViewportInformation {
                h_fov: self.packing.h_fov,
                v_fov: self.packing.v_fov,
                ..ViewportInformation::default()
            },
            ..InitialInfo::default()
        }
    }

    pub fn streams(&self) -> Result<BTreeMap<u8, MediaStream>> {
        let mut streams = BTreeMap::new();
        for (index, stream) in self.packing.streams.iter().enumerate() {
            let stream_idx = u8::try_from(index).context("too many streams")?;
            let video = match &stream.annex_b {
                Some(path) => {
                    let bitstream = fs::read(path)
                        .with_context(|| format!("read bitstream {}", path.display()))?;
                    VideoStream::from_annex_b(
                        stream_idx,
                        &bitstream,
                        stream.tile_columns,
                        stream.tile_rows,
                        stream.projection,
                    )
                    .with_context(|| format!("load parameter sets from {}", path.display()))?
                }
                None => VideoStream::with_minimal_parameter_sets(
                    stream_idx,
                    PicResolution::new(stream.width, stream.height),
                    stream.tile_columns,
                    stream.tile_rows,
                    stream.projection,
                ),
            };
            streams.insert(stream_idx, MediaStream::Video(video));
        }
        Ok(streams)
    }

    /// Geometry of the largest stream, which playback renders at.
    pub fn main_source(&self) -> Result<SourceInfo> {
        self.packing
            .streams
            .iter()
            .max_by_key(|stream| PicResolution::new(stream.width, stream.height).area())
            .map(StreamConfig::source_info)
            .context("config has no [[packing.streams]]")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const DEMO: &str = include_str!("../demos/two_res.toml");

    #[test]
    fn demo_config_parses() {
        let config: ToolConfig = toml::from_str(DEMO).expect("demo config");

        assert_eq!(config.packing.streams.len(), 2);
        assert_eq!(config.packing.streams[1].tile_columns, 2);
        assert_eq!(config.packing.streams[0].projection, ProjectionFormat::Equirectangular);
        assert_eq!(config.player.decode_latency_frames, 3);
        assert_eq!(config.player.pose_trace.len(), 6);
        assert_eq!(config.player.h_fov, 80.0);
        assert_eq!(
            config.main_source().expect("main"),
            SourceInfo {
                width: 3840,
                height: 1920,
                tile_columns: 4,
                tile_rows: 2
            }
        );
    }

    #[test]
    fn omitted_sections_use_defaults() {
        let config: ToolConfig = toml::from_str("").expect("empty config");

        assert_eq!(config, ToolConfig::default());
        assert!(config.main_source().is_err());
    }

    #[test]
    fn streams_without_bitstream_get_minimal_parameter_sets() {
        let config: ToolConfig = toml::from_str(DEMO).expect("demo config");

        let streams = config.streams().expect("streams");
        let info = config.initial_info();

        assert_eq!(streams.len(), 2);
        let low = streams[&1].as_video().expect("video");
        assert_eq!(low.resolution, PicResolution::new(1920, 960));
        assert!(!low.sps.is_empty());
        assert_eq!(info.video_indices(), vec![0, 1]);
    }

    #[test]
    fn missing_bitstream_is_reported() {
        let config = ToolConfig {
            packing: PackingConfig {
                streams: vec![StreamConfig {
                    annex_b: Some(PathBuf::from("/nonexistent/stream.h265")),
                    ..StreamConfig::default()
                }],
                ..PackingConfig::default()
            },
            ..ToolConfig::default()
        };

        let error = config.streams().unwrap_err();
        assert!(format!("{error:#}").contains("/nonexistent/stream.h265"));
    }
}
