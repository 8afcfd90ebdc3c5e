//! Region-wise packing and merged tile layout metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::PixelRect;

/// Which of the two source resolutions a packed region was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    High,
    Low,
}

impl ResolutionTier {
    /// Quality ranking advertised for the tier, smaller is better.
    pub const fn quality_ranking(self) -> i32 {
        match self {
            ResolutionTier::High => 1,
            ResolutionTier::Low => 2,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            ResolutionTier::High => 0,
            ResolutionTier::Low => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectRegionPacking {
    /// Location in the projected (source) picture.
    pub proj: PixelRect,
    /// Location in the packed (coded) picture.
    pub packed: PixelRect,
    pub transform_type: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<ResolutionTier>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionWisePacking {
    pub constituent_pic_matching: bool,
    pub proj_pic_width: u32,
    pub proj_pic_height: u32,
    pub packed_pic_width: u32,
    pub packed_pic_height: u32,
    pub regions: Vec<RectRegionPacking>,
}

impl RegionWisePacking {
    pub fn num_regions(&self) -> usize {
        self.regions.len()
    }

    pub fn packed_picture(&self) -> PixelRect {
        PixelRect::new(0, 0, self.packed_pic_width, self.packed_pic_height)
    }

    /// True when the packed rectangles cover the packed picture exactly once.
    pub fn partitions_packed_picture(&self) -> bool {
        let picture = self.packed_picture();
        if picture.area() == 0 {
            return false;
        }
        let mut covered = 0u64;
        for (index, region) in self.regions.iter().enumerate() {
            let packed = region.packed;
            if packed.area() == 0
                || packed.right() > picture.right()
                || packed.bottom() > picture.bottom()
            {
                return false;
            }
            if self.regions[..index]
                .iter()
                .any(|earlier| earlier.packed.overlaps(&packed))
            {
                return false;
            }
            covered += packed.area();
        }
        covered == picture.area()
    }

    pub fn regions_of_tier(&self, tier: ResolutionTier) -> impl Iterator<Item = &RectRegionPacking> {
        self.regions
            .iter()
            .filter(move |region| region.tier == Some(tier))
    }
}

/// Tile grid of a merged coded picture, sizes in CTUs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileArrangement {
    pub row_heights: Vec<u16>,
    pub column_widths: Vec<u16>,
}

impl TileArrangement {
    pub fn tile_rows_num(&self) -> usize {
        self.row_heights.len()
    }

    pub fn tile_cols_num(&self) -> usize {
        self.column_widths.len()
    }

    pub fn width_in_ctus(&self) -> u32 {
        self.column_widths.iter().map(|width| *width as u32).sum()
    }

    pub fn height_in_ctus(&self) -> u32 {
        self.row_heights.iter().map(|height| *height as u32).sum()
    }
}

/// One original tile placed in the merged picture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleTile {
    pub stream_idx_in_media: u8,
    pub orig_tile_idx: u32,
    /// Raster CTU address of the tile's first CTU in the merged picture.
    pub dst_ctu_index: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilesMergeDirectionInCol {
    pub tiles: Vec<SingleTile>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilesMergeDirectionInRow {
    pub tiles: Vec<SingleTile>,
}

/// Ordering of original tiles inside the merged picture, one entry per
/// merged tile column, top to bottom.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilesMergeDirection {
    pub columns: Vec<TilesMergeDirectionInCol>,
}

impl TilesMergeDirection {
    pub fn tiles_num(&self) -> usize {
        self.columns.iter().map(|column| column.tiles.len()).sum()
    }

    /// Regroups the placed tiles by CTU row, each row left to right.
    pub fn rows(&self, packed_width_in_ctus: u64) -> Vec<TilesMergeDirectionInRow> {
        if packed_width_in_ctus == 0 {
            return Vec::new();
        }
        let mut rows: BTreeMap<u64, Vec<SingleTile>> = BTreeMap::new();
        for tile in self.columns.iter().flat_map(|column| column.tiles.iter()) {
            rows.entry(tile.dst_ctu_index / packed_width_in_ctus)
                .or_default()
                .push(*tile);
        }
        rows.into_values()
            .map(|mut tiles| {
                tiles.sort_by_key(|tile| tile.dst_ctu_index % packed_width_in_ctus);
                TilesMergeDirectionInRow { tiles }
            })
            .collect()
    }
}
