use omaf_model::{PicResolution, TileDef};
use proptest::prelude::*;

use super::*;

fn layout_4x2() -> TileLayout {
    TileLayout::new(PicResolution::new(3840, 1920), 4, 2).expect("layout")
}

fn block(layout: &TileLayout, first_column: u32, first_row: u32, columns: u32, rows: u32) -> Vec<TileDef> {
    let mut tiles = Vec::new();
    for row in 0..rows {
        for column in 0..columns {
            let pos = TilePos {
                x: (first_column + column) % layout.tiles_per_row(),
                y: (first_row + row) % layout.tiles_per_column(),
            };
            let index = layout.tile_index(pos).expect("index");
            tiles.push(layout.tile_def(index).expect("tile"));
        }
    }
    tiles
}

#[test]
fn layout_rejects_uneven_split() {
    assert_eq!(
        TileLayout::new(PicResolution::new(1000, 500), 3, 1),
        Err(TileLayoutError::NonUniformTiling {
            width: 1000,
            height: 500
        })
    );
    assert_eq!(
        TileLayout::new(PicResolution::new(1000, 500), 0, 1),
        Err(TileLayoutError::ZeroTileCount)
    );
}

#[test]
fn tile_index_and_pos_are_inverse() {
    let layout = layout_4x2();
    for index in 0..layout.max_tiles() {
        let pos = layout.tile_pos(index).expect("pos");
        assert_eq!(layout.tile_index(pos), Ok(index));
    }
    assert_eq!(
        layout.tile_pos(8),
        Err(TileLayoutError::TileIndexOutOfBounds)
    );
}

#[test]
fn tiles_are_listed_in_raster_order() {
    let tiles = layout_4x2().tiles();
    assert_eq!(tiles.len(), 8);
    assert_eq!((tiles[5].x, tiles[5].y, tiles[5].idx), (960, 960, 5));
}

#[test]
fn presence_counts_each_tile_once() {
    let mut presence = TilePresence::new(layout_4x2());
    presence.insert_id(3).expect("insert");
    presence.insert_id(3).expect("insert again");
    presence.insert_id(8).expect("insert last");
    assert_eq!(presence.len(), 2);
    assert!(presence.contains_id(3));
    assert!(!presence.contains_id(0));
    assert_eq!(presence.iter_ids().collect::<Vec<_>>(), vec![3, 8]);
    assert_eq!(
        presence.missing_ids(&[1, 3, 8]).collect::<Vec<_>>(),
        vec![1]
    );
    assert_eq!(
        presence.insert_id(9),
        Err(TileLayoutError::TileIndexOutOfBounds)
    );
    presence.clear();
    assert!(presence.is_empty());
}

#[test]
fn reconstructs_plain_block() {
    let layout = layout_4x2();
    let grid = reconstruct_grid(&block(&layout, 1, 0, 2, 2), 4, 2).expect("grid");
    assert_eq!((grid.columns(), grid.rows()), (2, 2));
    assert_eq!((grid.first_column(), grid.first_row()), (1, 0));
    assert_eq!((grid.width(), grid.height()), (1920, 1920));
    assert_eq!(grid.tile(1, 1).map(|tile| tile.idx), Some(6));
}

#[test]
fn reconstructs_block_across_the_right_edge() {
    let layout = layout_4x2();
    let grid = reconstruct_grid(&block(&layout, 3, 0, 2, 1), 4, 2).expect("grid");
    assert_eq!((grid.columns(), grid.rows()), (2, 1));
    assert_eq!(grid.first_column(), 3);
    assert_eq!(grid.tile(0, 1).map(|tile| tile.x), Some(0));
}

#[test]
fn reconstructs_block_across_the_bottom_edge() {
    let layout = layout_4x2();
    let grid = reconstruct_grid(&block(&layout, 0, 1, 1, 2), 4, 2).expect("grid");
    assert_eq!((grid.columns(), grid.rows(), grid.first_row()), (1, 2, 1));
}

#[test]
fn ragged_rows_are_rejected() {
    let layout = layout_4x2();
    let mut tiles = block(&layout, 0, 0, 2, 2);
    tiles.pop();
    assert_eq!(
        reconstruct_grid(&tiles, 4, 2),
        Err(GridError::NotRectangular { row: 1 })
    );
}

#[test]
fn gaps_inside_a_row_are_rejected() {
    let layout = layout_4x2();
    let tiles = vec![
        layout.tile_def(0).expect("tile"),
        layout.tile_def(2).expect("tile"),
    ];
    assert_eq!(
        reconstruct_grid(&tiles, 4, 2),
        Err(GridError::NonContiguousColumns { row: 0 })
    );
}

#[test]
fn empty_and_misaligned_lists_are_rejected() {
    assert_eq!(reconstruct_grid(&[], 4, 2), Err(GridError::Empty));
    let mut tile = layout_4x2().tile_def(0).expect("tile");
    let first = tile;
    tile.x = 100;
    assert_eq!(
        reconstruct_grid(&[first, tile], 4, 2),
        Err(GridError::MisalignedTile { index: 1 })
    );
}

proptest! {
    #[test]
    fn any_wrapped_block_reconstructs_to_its_shape(
        first_column in 0u32..6,
        first_row in 0u32..3,
        columns in 1u32..=6,
        rows in 1u32..=3,
    ) {
        let layout = TileLayout::new(PicResolution::new(5760, 2880), 6, 3).unwrap();
        let grid = reconstruct_grid(&block(&layout, first_column, first_row, columns, rows), 6, 3).unwrap();
        prop_assert_eq!(grid.columns(), columns);
        prop_assert_eq!(grid.rows(), rows);
        prop_assert_eq!(grid.first_column(), first_column);
        prop_assert_eq!(grid.first_row(), first_row);
    }
}
