//! Packing of a high resolution viewport block next to the low resolution
//! picture.
//!
//! The merged picture is laid out as
//!
//! ```text
//! +-----------------------+--------+
//! | high tiles of the     | low    |
//! | viewport, one column  | tiles, |
//! | after the other       | padded |
//! +-----------------------+--------+
//! ```
//!
//! and coded with one row of HEVC tiles, one tile per merged column. Each
//! original tile keeps its own slice inside its merged column.

use std::collections::BTreeMap;

use omaf_model::{
    MAX_TILES_NUM_IN_VIEWPORT, PixelRect, RectRegionPacking, RegionWisePacking,
    ResolutionTier, SingleTile, TileArrangement, TileDef, TilesMergeDirection,
    TilesMergeDirectionInCol,
};
use tile_grid::{TileGrid, TileLayout, TilePos, reconstruct_grid};
use tracing::debug;

use crate::stream::{MediaStream, video_stream};
use crate::{PackingError, Result};

#[derive(Debug, Clone)]
pub struct TwoResRegionWisePackingGenerator {
    high: TileLayout,
    low: TileLayout,
    stream_idx: [u8; 2],
    high_tiles_in_view: TileGrid,
    ctb_size: u32,
    low_rows: u32,
    low_columns: u32,
    packed_pic_width: u32,
    packed_pic_height: u32,
    merged_tiles_arrange: TileArrangement,
}

fn ctus(pixels: u32, ctb_size: u32) -> u32 {
    pixels.div_ceil(ctb_size)
}

fn ctus_u16(pixels: u32, ctb_size: u32) -> Result<u16> {
    u16::try_from(ctus(pixels, ctb_size))
        .map_err(|_| PackingError::TilesMergeArrangement("tile is too large for the tile grid"))
}

/// Maps a low resolution rectangle into high resolution picture space.
fn scale_rect(rect: PixelRect, from: TileLayout, to: TileLayout) -> PixelRect {
    let scale = |value: u32, to_size: u32, from_size: u32| {
        (value as u64 * to_size as u64 / from_size as u64) as u32
    };
    let (to_width, from_width) = (to.picture().width, from.picture().width);
    let (to_height, from_height) = (to.picture().height, from.picture().height);
    PixelRect::new(
        scale(rect.left, to_width, from_width),
        scale(rect.top, to_height, from_height),
        scale(rect.width, to_width, from_width),
        scale(rect.height, to_height, from_height),
    )
}

impl TwoResRegionWisePackingGenerator {
    /// `video_idx_in_media[0]` names the high resolution stream and
    /// `video_idx_in_media[1]` the low resolution one. `tiles_in_viewport` is
    /// the raster ordered high resolution selection for the default viewport.
    pub fn initialize(
        streams: &BTreeMap<u8, MediaStream>,
        video_idx_in_media: &[u8],
        tiles_in_viewport: &[TileDef],
        final_viewport_width: u32,
        final_viewport_height: u32,
    ) -> Result<Self> {
        if tiles_in_viewport.is_empty() {
            return Err(PackingError::NullPointer("tiles in viewport"));
        }
        if tiles_in_viewport.len() > MAX_TILES_NUM_IN_VIEWPORT {
            return Err(PackingError::BadParam("more than 1024 tiles in viewport"));
        }
        let [high_idx, low_idx] = match video_idx_in_media {
            [high, low, ..] => [*high, *low],
            _ => return Err(PackingError::BadParam("two video stream indices are required")),
        };
        let high_stream = video_stream(streams, high_idx)?;
        let low_stream = video_stream(streams, low_idx)?;
        let high = high_stream.tile_layout()?;
        let low = low_stream.tile_layout()?;
        let ctb_size = high_stream.ctb_size()?;
        if low_stream.ctb_size()? != ctb_size {
            return Err(PackingError::TilesMergeArrangement(
                "streams are coded with different ctb sizes",
            ));
        }

        let grid = reconstruct_grid(
            tiles_in_viewport,
            high.tiles_per_row(),
            high.tiles_per_column(),
        )?;
        if grid.tile_width() != high.tile_width() || grid.tile_height() != high.tile_height() {
            return Err(PackingError::TilesMergeArrangement(
                "viewport tiles do not match the high resolution tiling",
            ));
        }
        if grid.width() != final_viewport_width as u64
            || grid.height() != final_viewport_height as u64
        {
            return Err(PackingError::InvalidData("viewport size does not match its tiles"));
        }
        let tile_sizes = [
            high.tile_width(),
            high.tile_height(),
            low.tile_width(),
            low.tile_height(),
        ];
        if tile_sizes.iter().any(|size| size % ctb_size != 0) {
            return Err(PackingError::TilesMergeArrangement(
                "tile size is not a multiple of the ctu size",
            ));
        }

        let high_width = final_viewport_width;
        let block_height = final_viewport_height;
        if block_height % low.tile_height() != 0 {
            return Err(PackingError::TilesMergeArrangement(
                "low resolution tiles do not stack to the viewport height",
            ));
        }
        let low_rows = block_height / low.tile_height();
        if low_rows == 0 {
            return Err(PackingError::TilesMergeArrangement(
                "low resolution tile is taller than the viewport",
            ));
        }
        let low_columns = (low.max_tiles() as u32).div_ceil(low_rows);
        let packed_pic_width = low_columns
            .checked_mul(low.tile_width())
            .and_then(|low_width| low_width.checked_add(high_width))
            .ok_or(PackingError::TilesMergeArrangement("packed picture is too wide"))?;
        let packed_pic_height = block_height;

        let mut column_widths = Vec::with_capacity((grid.columns() + low_columns) as usize);
        for _ in 0..grid.columns() {
            column_widths.push(ctus_u16(high.tile_width(), ctb_size)?);
        }
        for _ in 0..low_columns {
            column_widths.push(ctus_u16(low.tile_width(), ctb_size)?);
        }
        let merged_tiles_arrange = TileArrangement {
            row_heights: vec![ctus_u16(packed_pic_height, ctb_size)?],
            column_widths,
        };

        debug!(
            high_columns = grid.columns(),
            high_rows = grid.rows(),
            low_columns,
            low_rows,
            packed_pic_width,
            packed_pic_height,
            "merged tile arrangement"
        );

        Ok(Self {
            high,
            low,
            stream_idx: [high_idx, low_idx],
            high_tiles_in_view: grid,
            ctb_size,
            low_rows,
            low_columns,
            packed_pic_width,
            packed_pic_height,
            merged_tiles_arrange,
        })
    }

    pub fn tiles_num_in_viewport_row(&self) -> u32 {
        self.high_tiles_in_view.columns()
    }

    pub fn tile_row_num_in_viewport(&self) -> u32 {
        self.high_tiles_in_view.rows()
    }

    pub fn packed_pic_width(&self) -> u32 {
        self.packed_pic_width
    }

    pub fn packed_pic_height(&self) -> u32 {
        self.packed_pic_height
    }

    /// Coding tree block edge shared by both input streams.
    pub fn ctb_size(&self) -> u32 {
        self.ctb_size
    }

    pub fn merged_tiles_arrange(&self) -> &TileArrangement {
        &self.merged_tiles_arrange
    }

    pub fn high_layout(&self) -> TileLayout {
        self.high
    }

    pub fn low_layout(&self) -> TileLayout {
        self.low
    }

    /// Selection the generator was initialized with.
    pub fn default_viewport_tiles(&self) -> &TileGrid {
        &self.high_tiles_in_view
    }

    /// Packed-picture area holding the high resolution tiles.
    pub fn high_block(&self) -> PixelRect {
        PixelRect::new(
            0,
            0,
            self.high_tiles_in_view.columns() * self.high.tile_width(),
            self.packed_pic_height,
        )
    }

    /// Packed-picture area holding the low resolution tiles.
    pub fn low_block(&self) -> PixelRect {
        let high = self.high_block();
        PixelRect::new(
            high.width,
            0,
            self.packed_pic_width - high.width,
            self.packed_pic_height,
        )
    }

    pub fn viewport_num(&self) -> usize {
        self.high.max_tiles()
    }

    /// Top-left tile of the high resolution block for `viewport_idx`.
    /// Columns wrap around the picture; the row is clamped so the block stays
    /// inside it.
    pub fn high_block_origin(&self, viewport_idx: u16) -> Result<TilePos> {
        if viewport_idx as usize >= self.viewport_num() {
            return Err(PackingError::BadParam("viewport index out of range"));
        }
        let native_columns = self.high.tiles_per_row();
        let last_row = self
            .high
            .tiles_per_column()
            .saturating_sub(self.high_tiles_in_view.rows());
        let anchor = viewport_idx as u32;
        Ok(TilePos {
            x: anchor % native_columns,
            y: (anchor / native_columns).min(last_row),
        })
    }

    /// High resolution tile at `row`, `column` of the block for `viewport_idx`.
    fn high_tile(&self, viewport_idx: u16, row: u32, column: u32) -> Result<TileDef> {
        let origin = self.high_block_origin(viewport_idx)?;
        let pos = TilePos {
            x: (origin.x + column) % self.high.tiles_per_row(),
            y: origin.y + row,
        };
        Ok(self.high.tile_def(self.high.tile_index(pos)?)?)
    }

    /// Low resolution tile placed in slot `slot`, slots running top to bottom
    /// and then left to right. Slots past the last tile repeat from tile 0.
    fn low_tile(&self, slot: u32) -> Result<TileDef> {
        let index = slot as usize % self.low.max_tiles();
        Ok(self.low.tile_def(index)?)
    }

    pub fn generate_dst_rwpk(&self, viewport_idx: u16) -> Result<RegionWisePacking> {
        let rows = self.high_tiles_in_view.rows();
        let columns = self.high_tiles_in_view.columns();
        let tile_width = self.high.tile_width();
        let tile_height = self.high.tile_height();
        let low_width = self.low.tile_width();
        let low_height = self.low.tile_height();
        let low_slots = self.low_rows * self.low_columns;
        let high_width = self.high_block().width;

        let mut regions = Vec::with_capacity((rows * columns + low_slots) as usize);
        for index in 0..rows * columns {
            let (row, column) = (index % rows, index / rows);
            let tile = self.high_tile(viewport_idx, row, column)?;
            regions.push(RectRegionPacking {
                proj: tile.rect(),
                packed: PixelRect::new(column * tile_width, row * tile_height, tile_width, tile_height),
                transform_type: 0,
                tier: Some(ResolutionTier::High),
            });
        }
        for slot in 0..low_slots {
            let tile = self.low_tile(slot)?;
            let (row, column) = (slot % self.low_rows, slot / self.low_rows);
            regions.push(RectRegionPacking {
                proj: scale_rect(tile.rect(), self.low, self.high),
                packed: PixelRect::new(
                    high_width + column * low_width,
                    row * low_height,
                    low_width,
                    low_height,
                ),
                transform_type: 0,
                tier: Some(ResolutionTier::Low),
            });
        }

        let rwpk = RegionWisePacking {
            constituent_pic_matching: false,
            proj_pic_width: self.high.picture().width,
            proj_pic_height: self.high.picture().height,
            packed_pic_width: self.packed_pic_width,
            packed_pic_height: self.packed_pic_height,
            regions,
        };
        if !rwpk.partitions_packed_picture() {
            return Err(PackingError::GenerateRwpk);
        }
        debug!(viewport_idx, num_regions = rwpk.num_regions(), "generated rwpk");
        Ok(rwpk)
    }

    pub fn generate_tiles_merge_direction(&self, viewport_idx: u16) -> Result<TilesMergeDirection> {
        let rows = self.high_tiles_in_view.rows();
        let columns = self.high_tiles_in_view.columns();
        let width_in_ctus = ctus(self.packed_pic_width, self.ctb_size) as u64;
        let high_ctu_width = ctus(self.high.tile_width(), self.ctb_size) as u64;
        let high_ctu_height = ctus(self.high.tile_height(), self.ctb_size) as u64;
        let low_ctu_width = ctus(self.low.tile_width(), self.ctb_size) as u64;
        let low_ctu_height = ctus(self.low.tile_height(), self.ctb_size) as u64;

        let mut merged_columns = Vec::with_capacity((columns + self.low_columns) as usize);
        for column in 0..columns {
            let mut tiles = Vec::with_capacity(rows as usize);
            for row in 0..rows {
                let tile = self.high_tile(viewport_idx, row, column)?;
                tiles.push(SingleTile {
                    stream_idx_in_media: self.stream_idx[0],
                    orig_tile_idx: tile.idx,
                    dst_ctu_index: row as u64 * high_ctu_height * width_in_ctus
                        + column as u64 * high_ctu_width,
                });
            }
            merged_columns.push(TilesMergeDirectionInCol { tiles });
        }

        let low_left = columns as u64 * high_ctu_width;
        for column in 0..self.low_columns {
            let mut tiles = Vec::with_capacity(self.low_rows as usize);
            for row in 0..self.low_rows {
                let tile = self.low_tile(column * self.low_rows + row)?;
                tiles.push(SingleTile {
                    stream_idx_in_media: self.stream_idx[1],
                    orig_tile_idx: tile.idx,
                    dst_ctu_index: row as u64 * low_ctu_height * width_in_ctus
                        + low_left
                        + column as u64 * low_ctu_width,
                });
            }
            merged_columns.push(TilesMergeDirectionInCol { tiles });
        }
        Ok(TilesMergeDirection {
            columns: merged_columns,
        })
    }
}
