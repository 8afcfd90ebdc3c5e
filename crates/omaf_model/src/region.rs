//! Playback-side per-frame region metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{PixelRect, RegionWisePacking, ResolutionTier};

/// Area of the packed picture that carries one source stream's tiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceResolution {
    pub quality_ranking: i32,
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl SourceResolution {
    pub fn packed_area(&self) -> PixelRect {
        PixelRect::new(self.left, self.top, self.width, self.height)
    }
}

/// Geometry of a projected source picture and its uniform tile grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    pub tile_columns: u32,
    pub tile_rows: u32,
}

impl SourceInfo {
    pub fn tile_width(&self) -> Option<u32> {
        self.width.checked_div(self.tile_columns).filter(|width| *width > 0)
    }

    pub fn tile_height(&self) -> Option<u32> {
        self.height.checked_div(self.tile_rows).filter(|height| *height > 0)
    }

    /// `None` when the grid has more tiles than a `u32` counts.
    pub fn tiles_num(&self) -> Option<u32> {
        self.tile_columns.checked_mul(self.tile_rows)
    }
}

/// Region metadata attached to one decoded frame. Owned by the queue entry
/// that carries it until the render thread releases it.
#[derive(Debug, PartialEq, Eq)]
pub struct RegionData {
    video_id: u32,
    pts: u64,
    rwpk: RegionWisePacking,
    sources: Vec<SourceResolution>,
}

impl RegionData {
    pub fn new(video_id: u32, pts: u64, rwpk: RegionWisePacking, sources: Vec<SourceResolution>) -> Self {
        Self {
            video_id,
            pts,
            rwpk,
            sources,
        }
    }

    pub fn video_id(&self) -> u32 {
        self.video_id
    }

    pub fn pts(&self) -> u64 {
        self.pts
    }

    pub fn region_wise_packing(&self) -> &RegionWisePacking {
        &self.rwpk
    }

    pub fn source_info(&self) -> &[SourceResolution] {
        &self.sources
    }

    pub fn source_in_region(&self) -> usize {
        self.sources.len()
    }
}

/// A packed region resolved to a tile of one source, recomputed every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileInformation {
    pub video_id: u32,
    pub tile_id: u32,
    pub tier: ResolutionTier,
    pub proj: PixelRect,
    pub packed: PixelRect,
    pub packed_pic_width: u32,
    pub packed_pic_height: u32,
}

/// Tiles of the current frame grouped by quality ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QualityRankingInfo {
    pub main_quality_ranking: i32,
    pub selection: BTreeMap<i32, Vec<TileInformation>>,
}

impl QualityRankingInfo {
    pub fn num_quality(&self) -> usize {
        self.selection.len()
    }

    pub fn main_tiles(&self) -> &[TileInformation] {
        self.selection
            .get(&self.main_quality_ranking)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn main_contains_tile(&self, tile_id: u32) -> bool {
        self.main_tiles().iter().any(|tile| tile.tile_id == tile_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_count_does_not_overflow() {
        let grid = SourceInfo {
            width: 3840,
            height: 1920,
            tile_columns: 4,
            tile_rows: 2,
        };
        assert_eq!(grid.tiles_num(), Some(8));
        let huge = SourceInfo {
            tile_columns: 1 << 17,
            tile_rows: 1 << 16,
            ..grid
        };
        assert_eq!(huge.tiles_num(), None);
    }
}
