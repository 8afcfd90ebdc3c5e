//! Input streams and packaging parameters.

use std::collections::BTreeMap;

use omaf_model::{Nalu, PicResolution, ProjectionFormat, TileDef};
use scvp::ViewportInformation;
use scvp::hevc::{self, find_parameter_sets, parse_sps};
use serde::{Deserialize, Serialize};
use tile_grid::TileLayout;

use crate::{PackingError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Video,
    Audio,
}

/// One tiled HEVC source and the parameter sets it was coded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoStream {
    pub stream_idx: u8,
    pub resolution: PicResolution,
    pub tile_in_row: u32,
    pub tile_in_col: u32,
    pub projection: ProjectionFormat,
    pub vps: Nalu,
    pub sps: Nalu,
    pub pps: Nalu,
}

impl VideoStream {
    /// Stream described by geometry only, with synthesized parameter sets.
    pub fn with_minimal_parameter_sets(
        stream_idx: u8,
        resolution: PicResolution,
        tile_in_row: u32,
        tile_in_col: u32,
        projection: ProjectionFormat,
    ) -> Self {
        Self {
            stream_idx,
            resolution,
            tile_in_row,
            tile_in_col,
            projection,
            vps: hevc::minimal_vps(),
            sps: hevc::minimal_sps(resolution.width, resolution.height),
            pps: hevc::minimal_pps(),
        }
    }

    /// Stream whose parameter sets and picture size come from an Annex-B
    /// bitstream.
    pub fn from_annex_b(
        stream_idx: u8,
        bitstream: &[u8],
        tile_in_row: u32,
        tile_in_col: u32,
        projection: ProjectionFormat,
    ) -> Result<Self> {
        let sets = find_parameter_sets(bitstream);
        let sps = sets.sps.ok_or(PackingError::InvalidSps)?;
        let pps = sets.pps.ok_or(PackingError::InvalidPps)?;
        let vps = sets.vps.ok_or(PackingError::NullPointer("vps"))?;
        let info = parse_sps(&sps).map_err(|_| PackingError::InvalidSps)?;
        Ok(Self {
            stream_idx,
            resolution: info.resolution(),
            tile_in_row,
            tile_in_col,
            projection,
            vps,
            sps,
            pps,
        })
    }

    /// Coding tree block edge the stream was coded with.
    pub fn ctb_size(&self) -> Result<u32> {
        parse_sps(&self.sps)
            .map(|info| info.ctb_size)
            .map_err(|_| PackingError::InvalidSps)
    }

    pub fn tile_layout(&self) -> Result<TileLayout> {
        Ok(TileLayout::new(
            self.resolution,
            self.tile_in_row,
            self.tile_in_col,
        )?)
    }

    pub fn tiles(&self) -> Result<Vec<TileDef>> {
        Ok(self.tile_layout()?.tiles())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaStream {
    Video(VideoStream),
    /// Audio passes through packaging untouched.
    Audio,
}

impl MediaStream {
    pub fn media_type(&self) -> MediaType {
        match self {
            MediaStream::Video(_) => MediaType::Video,
            MediaStream::Audio => MediaType::Audio,
        }
    }

    pub fn as_video(&self) -> Option<&VideoStream> {
        match self {
            MediaStream::Video(video) => Some(video),
            MediaStream::Audio => None,
        }
    }
}

/// Looks up a video stream by its index in the media.
pub(crate) fn video_stream(
    streams: &BTreeMap<u8, MediaStream>,
    index: u8,
) -> Result<&VideoStream> {
    streams
        .get(&index)
        .and_then(MediaStream::as_video)
        .ok_or(PackingError::StreamNotFound { index })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationInfo {
    /// 0 lets the generator pick a value from the tile count.
    pub extractor_tracks_per_seg_thread: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialInfo {
    pub bs_num_video: u8,
    pub bs_num_audio: u8,
    /// Media type of every input bitstream, by stream index.
    pub media_types: Vec<MediaType>,
    pub viewport: ViewportInformation,
    pub segmentation: SegmentationInfo,
}

impl Default for InitialInfo {
    fn default() -> Self {
        Self {
            bs_num_video: 2,
            bs_num_audio: 0,
            media_types: vec![MediaType::Video, MediaType::Video],
            viewport: ViewportInformation::default(),
            segmentation: SegmentationInfo::default(),
        }
    }
}

impl InitialInfo {
    /// Stream indices of the declared video bitstreams, in stream order.
    pub fn video_indices(&self) -> Vec<u8> {
        let total = self.bs_num_video as usize + self.bs_num_audio as usize;
        self.media_types
            .iter()
            .take(total)
            .enumerate()
            .filter(|(_, media_type)| **media_type == MediaType::Video)
            .map(|(index, _)| index as u8)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annex_b_stream_takes_size_from_sps() {
        let mut bitstream = hevc::minimal_vps().data;
        bitstream.extend_from_slice(&hevc::minimal_sps(1920, 960).data);
        bitstream.extend_from_slice(&hevc::minimal_pps().data);

        let stream =
            VideoStream::from_annex_b(1, &bitstream, 2, 1, ProjectionFormat::Equirectangular)
                .expect("stream");
        assert_eq!(stream.resolution, PicResolution::new(1920, 960));
        assert_eq!(stream.tiles().expect("tiles").len(), 2);
    }

    #[test]
    fn annex_b_stream_without_pps_is_rejected() {
        let mut bitstream = hevc::minimal_vps().data;
        bitstream.extend_from_slice(&hevc::minimal_sps(1920, 960).data);
        assert_eq!(
            VideoStream::from_annex_b(0, &bitstream, 2, 1, ProjectionFormat::Equirectangular),
            Err(PackingError::InvalidPps)
        );
    }

    #[test]
    fn video_indices_skip_audio() {
        let info = InitialInfo {
            bs_num_video: 2,
            bs_num_audio: 1,
            media_types: vec![MediaType::Audio, MediaType::Video, MediaType::Video],
            ..InitialInfo::default()
        };
        assert_eq!(info.video_indices(), vec![1, 2]);
    }

    #[test]
    fn video_lookup_rejects_audio_and_missing_streams() {
        let streams = BTreeMap::from([(0, MediaStream::Audio)]);
        assert_eq!(
            video_stream(&streams, 0),
            Err(PackingError::StreamNotFound { index: 0 })
        );
        assert_eq!(
            video_stream(&streams, 3),
            Err(PackingError::StreamNotFound { index: 3 })
        );
    }
}
