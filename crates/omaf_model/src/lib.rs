//! Shared data model for tiled omnidirectional video.
//!
//! Both the packaging side (extractor track generation) and the playback side
//! (tile selection and compositing) speak in these types.

use serde::{Deserialize, Serialize};

pub mod coverage;
pub mod nalu;
pub mod packing;
pub mod region;
pub mod sphere;
pub mod status;

pub use coverage::{ContentCoverage, SphereRegion};
pub use nalu::{
    HEVC_PPS_NALU_TYPE, HEVC_SEI_PREFIX_NALU_TYPE, HEVC_SPS_NALU_TYPE, HEVC_STARTCODES_LEN,
    HEVC_VPS_NALU_TYPE, Nalu,
};
pub use packing::{
    RectRegionPacking, RegionWisePacking, ResolutionTier, SingleTile, TileArrangement,
    TilesMergeDirection, TilesMergeDirectionInCol, TilesMergeDirectionInRow,
};
pub use region::{QualityRankingInfo, RegionData, SourceInfo, SourceResolution, TileInformation};

/// Upper bound on the number of tiles a viewport selection may return.
pub const MAX_TILES_NUM_IN_VIEWPORT: usize = 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionFormat {
    #[default]
    Equirectangular,
    Cubemap,
    Planar,
}

impl ProjectionFormat {
    pub fn is_equirectangular(self) -> bool {
        matches!(self, ProjectionFormat::Equirectangular)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PicResolution {
    pub width: u32,
    pub height: u32,
}

impl PicResolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// One rectangular tile of a source picture, offsets and size in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileDef {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Raster index of the tile inside its source picture.
    pub idx: u32,
    pub face_id: u8,
}

impl TileDef {
    pub fn rect(&self) -> PixelRect {
        PixelRect::new(self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub const fn right(&self) -> u64 {
        self.left as u64 + self.width as u64
    }

    pub const fn bottom(&self) -> u64 {
        self.top as u64 + self.height as u64
    }

    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn contains_point(&self, x: u32, y: u32) -> bool {
        x >= self.left && (x as u64) < self.right() && y >= self.top && (y as u64) < self.bottom()
    }

    pub fn overlaps(&self, other: &PixelRect) -> bool {
        (self.left as u64) < other.right()
            && (other.left as u64) < self.right()
            && (self.top as u64) < other.bottom()
            && (other.top as u64) < self.bottom()
    }
}
