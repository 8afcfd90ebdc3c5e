use bitvec::prelude::{BitVec, Lsb0};
use omaf_model::{MAX_TILES_NUM_IN_VIEWPORT, PicResolution, TileDef};
use thiserror::Error;

mod reconstruct;

pub use reconstruct::{GridError, TileGrid, reconstruct_grid};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TilePos {
    pub x: u32,
    pub y: u32,
}

/// Uniform tile grid of one source picture.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TileLayout {
    picture: PicResolution,
    tiles_per_row: u32,
    tiles_per_column: u32,
    tile_width: u32,
    tile_height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TileLayoutError {
    #[error("tile index out of bounds")]
    TileIndexOutOfBounds,
    #[error("tile grid must have at least one row and one column")]
    ZeroTileCount,
    #[error("picture {width}x{height} does not split evenly into the tile grid")]
    NonUniformTiling { width: u32, height: u32 },
    #[error("tile grid has more than 1024 tiles")]
    TooManyTiles,
}

impl TileLayout {
    pub fn new(
        picture: PicResolution,
        tiles_per_row: u32,
        tiles_per_column: u32,
    ) -> Result<Self, TileLayoutError> {
        if tiles_per_row == 0 || tiles_per_column == 0 {
            return Err(TileLayoutError::ZeroTileCount);
        }
        if tiles_per_row as usize * tiles_per_column as usize > MAX_TILES_NUM_IN_VIEWPORT {
            return Err(TileLayoutError::TooManyTiles);
        }
        if picture.width % tiles_per_row != 0
            || picture.height % tiles_per_column != 0
            || picture.width == 0
            || picture.height == 0
        {
            return Err(TileLayoutError::NonUniformTiling {
                width: picture.width,
                height: picture.height,
            });
        }
        Ok(Self {
            picture,
            tiles_per_row,
            tiles_per_column,
            tile_width: picture.width / tiles_per_row,
            tile_height: picture.height / tiles_per_column,
        })
    }

    pub fn picture(&self) -> PicResolution {
        self.picture
    }

    pub fn tiles_per_row(&self) -> u32 {
        self.tiles_per_row
    }

    pub fn tiles_per_column(&self) -> u32 {
        self.tiles_per_column
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    pub const fn max_tiles(self) -> usize {
        self.tiles_per_row as usize * self.tiles_per_column as usize
    }

    pub fn tile_index(&self, tile: TilePos) -> Result<usize, TileLayoutError> {
        if tile.x >= self.tiles_per_row || tile.y >= self.tiles_per_column {
            Err(TileLayoutError::TileIndexOutOfBounds)
        } else {
            Ok((tile.y * self.tiles_per_row + tile.x) as usize)
        }
    }

    pub fn tile_pos(&self, index: usize) -> Result<TilePos, TileLayoutError> {
        if index >= self.max_tiles() {
            Err(TileLayoutError::TileIndexOutOfBounds)
        } else {
            let x = index % self.tiles_per_row as usize;
            let y = index / self.tiles_per_row as usize;
            Ok(TilePos {
                x: x as u32,
                y: y as u32,
            })
        }
    }

    pub fn tile_def(&self, index: usize) -> Result<TileDef, TileLayoutError> {
        let pos = self.tile_pos(index)?;
        Ok(TileDef {
            x: pos.x * self.tile_width,
            y: pos.y * self.tile_height,
            width: self.tile_width,
            height: self.tile_height,
            idx: index as u32,
            face_id: 0,
        })
    }

    /// Every tile of the picture in raster order.
    pub fn tiles(&self) -> Vec<TileDef> {
        (0..self.max_tiles())
            .filter_map(|index| self.tile_def(index).ok())
            .collect()
    }

    pub fn tile_at_pixel(&self, x: u32, y: u32) -> Result<TilePos, TileLayoutError> {
        let pos = TilePos {
            x: x / self.tile_width,
            y: y / self.tile_height,
        };
        self.tile_index(pos)?;
        Ok(pos)
    }
}

/// Set of tiles of one layout, addressed by 1-based tile id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilePresence {
    layout: TileLayout,
    present_bits: BitVec<usize, Lsb0>,
    present_count: usize,
}

impl TilePresence {
    pub fn new(layout: TileLayout) -> Self {
        Self {
            layout,
            present_bits: BitVec::repeat(false, layout.max_tiles()),
            present_count: 0,
        }
    }

    pub fn layout(&self) -> TileLayout {
        self.layout
    }

    pub fn insert_id(&mut self, tile_id: u32) -> Result<(), TileLayoutError> {
        let index = self.index_of_id(tile_id)?;
        let was_present = self.present_bits[index];
        self.present_bits.set(index, true);
        self.present_count += !was_present as usize;
        Ok(())
    }

    pub fn contains_id(&self, tile_id: u32) -> bool {
        self.index_of_id(tile_id)
            .is_ok_and(|index| self.present_bits[index])
    }

    pub fn len(&self) -> usize {
        self.present_count
    }

    pub fn is_empty(&self) -> bool {
        self.present_count == 0
    }

    /// Ids absent from this set, in ascending order.
    pub fn missing_ids<'a>(&'a self, required: &'a [u32]) -> impl Iterator<Item = u32> + 'a {
        required
            .iter()
            .copied()
            .filter(|tile_id| !self.contains_id(*tile_id))
    }

    pub fn iter_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.present_bits.iter_ones().map(|index| index as u32 + 1)
    }

    pub fn clear(&mut self) {
        self.present_bits.fill(false);
        self.present_count = 0;
    }

    fn index_of_id(&self, tile_id: u32) -> Result<usize, TileLayoutError> {
        let index = tile_id
            .checked_sub(1)
            .ok_or(TileLayoutError::TileIndexOutOfBounds)? as usize;
        if index >= self.layout.max_tiles() {
            return Err(TileLayoutError::TileIndexOutOfBounds);
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests;
