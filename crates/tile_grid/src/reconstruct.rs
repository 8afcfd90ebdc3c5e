//! Rebuilds the implicit 2D grid behind a flat, raster-ordered tile list.
//!
//! The list comes from viewport tile selection and may start anywhere in the
//! source grid, so columns are allowed to wrap past the right edge and rows
//! past the bottom edge of the source picture.

use omaf_model::{MAX_TILES_NUM_IN_VIEWPORT, TileDef};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("tile list is empty")]
    Empty,
    #[error("tile list holds {count} tiles, more than the supported maximum")]
    TooManyTiles { count: usize },
    #[error("native grid must have at least one row and one column")]
    ZeroNativeGrid,
    #[error("tile {index} is not aligned to the tile size of the list")]
    MisalignedTile { index: usize },
    #[error("tile {index} lies outside the native tile grid")]
    OutsideNativeGrid { index: usize },
    #[error("columns of row {row} are not contiguous")]
    NonContiguousColumns { row: usize },
    #[error("rows of the tile list are not contiguous")]
    NonContiguousRows,
    #[error("row {row} does not match the shape of the first row")]
    NotRectangular { row: usize },
}

/// Rectangular block of tiles, stored row by row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    columns: u32,
    rows: u32,
    first_column: u32,
    first_row: u32,
    tile_width: u32,
    tile_height: u32,
    tiles: Vec<TileDef>,
}

impl TileGrid {
    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn first_column(&self) -> u32 {
        self.first_column
    }

    pub fn first_row(&self) -> u32 {
        self.first_row
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    pub fn width(&self) -> u64 {
        self.columns as u64 * self.tile_width as u64
    }

    pub fn height(&self) -> u64 {
        self.rows as u64 * self.tile_height as u64
    }

    pub fn tiles(&self) -> &[TileDef] {
        &self.tiles
    }

    pub fn tile(&self, row: u32, column: u32) -> Option<&TileDef> {
        if row >= self.rows || column >= self.columns {
            return None;
        }
        self.tiles.get((row * self.columns + column) as usize)
    }
}

struct RowRun {
    y: u32,
    columns: Vec<u32>,
}

/// Groups tiles into rows on every change of the y offset, then checks that
/// each row is a contiguous run of native columns (modulo wraparound), that
/// all rows share one shape and that the rows themselves are contiguous.
pub fn reconstruct_grid(
    tiles: &[TileDef],
    native_columns: u32,
    native_rows: u32,
) -> Result<TileGrid, GridError> {
    let first = tiles.first().ok_or(GridError::Empty)?;
    if tiles.len() > MAX_TILES_NUM_IN_VIEWPORT {
        return Err(GridError::TooManyTiles { count: tiles.len() });
    }
    if native_columns == 0 || native_rows == 0 {
        return Err(GridError::ZeroNativeGrid);
    }
    let tile_width = first.width;
    let tile_height = first.height;
    if tile_width == 0 || tile_height == 0 {
        return Err(GridError::MisalignedTile { index: 0 });
    }

    let mut runs: Vec<RowRun> = Vec::new();
    for (index, tile) in tiles.iter().enumerate() {
        if tile.width != tile_width
            || tile.height != tile_height
            || tile.x % tile_width != 0
            || tile.y % tile_height != 0
        {
            return Err(GridError::MisalignedTile { index });
        }
        let column = tile.x / tile_width;
        if column >= native_columns || tile.y / tile_height >= native_rows {
            return Err(GridError::OutsideNativeGrid { index });
        }
        match runs.last_mut() {
            Some(run) if run.y == tile.y => run.columns.push(column),
            _ => runs.push(RowRun {
                y: tile.y,
                columns: vec![column],
            }),
        }
    }

    let first_run = &runs[0];
    for (row, run) in runs.iter().enumerate() {
        if run.columns.len() > native_columns as usize
            || run
                .columns
                .windows(2)
                .any(|pair| pair[1] != (pair[0] + 1) % native_columns)
        {
            return Err(GridError::NonContiguousColumns { row });
        }
        if run.columns.len() != first_run.columns.len() || run.columns[0] != first_run.columns[0] {
            return Err(GridError::NotRectangular { row });
        }
    }

    let row_indices: Vec<u32> = runs.iter().map(|run| run.y / tile_height).collect();
    if row_indices.len() > native_rows as usize
        || row_indices
            .windows(2)
            .any(|pair| pair[1] != (pair[0] + 1) % native_rows)
    {
        return Err(GridError::NonContiguousRows);
    }

    Ok(TileGrid {
        columns: first_run.columns.len() as u32,
        rows: runs.len() as u32,
        first_column: first_run.columns[0],
        first_row: row_indices[0],
        tile_width,
        tile_height,
        tiles: tiles.to_vec(),
    })
}
