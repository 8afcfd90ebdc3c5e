//! Viewer pose and the mapping from a viewing direction to tile ids.
//!
//! Tile ids are 1-based raster indices into a source picture's uniform grid.

use omaf_model::sphere::{
    self, SphereError, azimuth_degrees_to_fixed, clamp_elevation, degrees_to_fixed,
};
use omaf_model::{PicResolution, PixelRect, SourceInfo, SphereRegion, status};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MAX_PITCH_DEGREES: f32 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ViewportError {
    #[error("field of view must be positive and finite")]
    InvalidFov,
    #[error("value is not finite")]
    NonFiniteValue,
    #[error("source has no usable tile grid")]
    InvalidTileGrid,
    #[error("tile id {0} is outside the tile grid")]
    TileIdOutOfRange(u32),
    #[error(transparent)]
    Sphere(#[from] SphereError),
}

impl ViewportError {
    pub fn code(&self) -> i32 {
        status::RENDER_ERROR
    }
}

/// Viewing direction in degrees. Yaw grows to the left, pitch grows up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    yaw: f32,
    pitch: f32,
}

impl Pose {
    pub fn new(yaw: f32, pitch: f32) -> Result<Self, ViewportError> {
        let mut pose = Self::default();
        pose.set(yaw, pitch)?;
        Ok(pose)
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Yaw is kept within one turn of zero and pitch is clamped to the poles.
    pub fn set(&mut self, yaw: f32, pitch: f32) -> Result<(), ViewportError> {
        if !yaw.is_finite() || !pitch.is_finite() {
            return Err(ViewportError::NonFiniteValue);
        }
        self.yaw = yaw % 360.0;
        self.pitch = pitch.clamp(-MAX_PITCH_DEGREES, MAX_PITCH_DEGREES);
        Ok(())
    }

    pub fn rotate_by(&mut self, delta_yaw: f32, delta_pitch: f32) -> Result<(), ViewportError> {
        let yaw = checked_add(self.yaw, delta_yaw)?;
        let pitch = checked_add(self.pitch, delta_pitch)?;
        self.set(yaw, pitch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldOfView {
    h_fov: f32,
    v_fov: f32,
}

impl Default for FieldOfView {
    fn default() -> Self {
        Self {
            h_fov: 80.0,
            v_fov: 80.0,
        }
    }
}

impl FieldOfView {
    pub fn new(h_fov: f32, v_fov: f32) -> Result<Self, ViewportError> {
        if !h_fov.is_finite() || !v_fov.is_finite() || h_fov <= 0.0 || v_fov <= 0.0 {
            return Err(ViewportError::InvalidFov);
        }
        Ok(Self {
            h_fov: h_fov.min(360.0),
            v_fov: v_fov.min(180.0),
        })
    }

    pub fn h_fov(&self) -> f32 {
        self.h_fov
    }

    pub fn v_fov(&self) -> f32 {
        self.v_fov
    }
}

pub fn sphere_region_for_pose(pose: Pose, fov: FieldOfView) -> Result<SphereRegion, ViewportError> {
    Ok(SphereRegion {
        centre_azimuth: azimuth_degrees_to_fixed(pose.yaw)?,
        centre_elevation: clamp_elevation(degrees_to_fixed(pose.pitch)?),
        centre_tilt: 0,
        azimuth_range: degrees_to_fixed(fov.h_fov)? as u32,
        elevation_range: degrees_to_fixed(fov.v_fov)? as u32,
        interpolate: false,
    })
}

struct Grid {
    width: f64,
    height: f64,
    columns: u32,
    rows: u32,
    tile_width: f64,
    tile_height: f64,
}

fn grid_of(source: &SourceInfo) -> Result<Grid, ViewportError> {
    let tile_width = source.tile_width().ok_or(ViewportError::InvalidTileGrid)?;
    let tile_height = source.tile_height().ok_or(ViewportError::InvalidTileGrid)?;
    Ok(Grid {
        width: source.width as f64,
        height: source.height as f64,
        columns: source.tile_columns,
        rows: source.tile_rows,
        tile_width: tile_width as f64,
        tile_height: tile_height as f64,
    })
}

/// Last tile touched by a span ending at `end`. An end on a tile boundary
/// belongs to the tile before it.
fn last_tile(end: f64, tile_size: f64) -> i64 {
    (end / tile_size).ceil() as i64 - 1
}

/// Sorted ids of every tile the sphere region overlaps. Columns wrap at the
/// +-180 degree seam and rows stop at the poles.
pub fn get_region_tile_id(
    region: &SphereRegion,
    source: &SourceInfo,
) -> Result<Vec<u32>, ViewportError> {
    let grid = grid_of(source)?;
    let centre_x = sphere::pixel_x_for_azimuth(region.centre_azimuth, source.width)?;
    let centre_y = sphere::pixel_y_for_elevation(region.centre_elevation, source.height)?;
    let margin_x = sphere::width_for_azimuth_range(region.azimuth_range, source.width)?;
    let margin_y = sphere::height_for_elevation_range(region.elevation_range, source.height)?;

    let (first_column, column_count) = if margin_x >= grid.width {
        (0, grid.columns)
    } else {
        let left = (centre_x - margin_x / 2.0).rem_euclid(grid.width);
        let first = (left / grid.tile_width).floor() as i64;
        let last = last_tile(left + margin_x, grid.tile_width);
        let count = (last - first + 1).clamp(1, grid.columns as i64);
        (first as u32 % grid.columns, count as u32)
    };

    let top = (centre_y - margin_y / 2.0).clamp(0.0, grid.height);
    let bottom = (centre_y + margin_y / 2.0).clamp(0.0, grid.height);
    let first_row = ((top / grid.tile_height).floor() as i64).clamp(0, grid.rows as i64 - 1);
    let last_row = last_tile(bottom, grid.tile_height).clamp(first_row, grid.rows as i64 - 1);

    let mut ids = Vec::with_capacity((column_count as i64 * (last_row - first_row + 1)) as usize);
    for step in 0..column_count {
        let column = (first_column + step) % grid.columns;
        for row in first_row..=last_row {
            ids.push(column + row as u32 * grid.columns + 1);
        }
    }
    ids.sort_unstable();
    Ok(ids)
}

/// Sphere region of one tile, the inverse of [`get_region_tile_id`].
pub fn transfer_tile_id_to_region(
    tile_id: u32,
    source: &SourceInfo,
) -> Result<SphereRegion, ViewportError> {
    let tile_width = source.tile_width().ok_or(ViewportError::InvalidTileGrid)?;
    let tile_height = source.tile_height().ok_or(ViewportError::InvalidTileGrid)?;
    let tiles_num = source.tiles_num().ok_or(ViewportError::InvalidTileGrid)?;
    if tile_id == 0 || tile_id > tiles_num {
        return Err(ViewportError::TileIdOutOfRange(tile_id));
    }
    let column = (tile_id - 1) % source.tile_columns;
    let row = (tile_id - 1) / source.tile_columns;
    Ok(SphereRegion::from_pixel_box(
        PixelRect::new(column * tile_width, row * tile_height, tile_width, tile_height),
        PicResolution::new(source.width, source.height),
    )?)
}

/// Tile ids needed to fill the viewport at `pose`.
pub fn get_tiles_in_viewport(
    pose: Pose,
    fov: FieldOfView,
    source: &SourceInfo,
) -> Result<Vec<u32>, ViewportError> {
    get_region_tile_id(&sphere_region_for_pose(pose, fov)?, source)
}

fn checked_add(current: f32, delta: f32) -> Result<f32, ViewportError> {
    if !delta.is_finite() {
        return Err(ViewportError::NonFiniteValue);
    }
    let next = current + delta;
    if !next.is_finite() {
        return Err(ViewportError::NonFiniteValue);
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn source() -> SourceInfo {
        SourceInfo {
            width: 3840,
            height: 1920,
            tile_columns: 4,
            tile_rows: 2,
        }
    }

    fn tiles(yaw: f32, pitch: f32, h_fov: f32, v_fov: f32) -> Vec<u32> {
        get_tiles_in_viewport(
            Pose::new(yaw, pitch).expect("pose"),
            FieldOfView::new(h_fov, v_fov).expect("fov"),
            &source(),
        )
        .expect("tiles")
    }

    #[test]
    fn front_view_needs_the_centre_tiles() {
        assert_eq!(tiles(0.0, 0.0, 80.0, 80.0), vec![2, 3, 6, 7]);
    }

    #[test]
    fn view_across_the_seam_wraps_columns() {
        assert_eq!(tiles(180.0, 0.0, 80.0, 80.0), vec![1, 4, 5, 8]);
    }

    #[test]
    fn looking_up_stays_in_the_top_row() {
        assert_eq!(tiles(0.0, 60.0, 80.0, 40.0), vec![2, 3]);
    }

    #[test]
    fn full_fov_needs_every_tile() {
        assert_eq!(tiles(37.0, 0.0, 360.0, 180.0), (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn narrow_view_inside_one_tile() {
        // centre of tile 2 is 45 degrees left of the front
        assert_eq!(tiles(45.0, 45.0, 10.0, 10.0), vec![2]);
    }

    #[test]
    fn tile_region_maps_back_to_its_tile() {
        for tile_id in 1..=8 {
            let region = transfer_tile_id_to_region(tile_id, &source()).expect("region");
            assert_eq!(
                get_region_tile_id(&region, &source()).expect("ids"),
                vec![tile_id]
            );
        }
        assert_eq!(
            transfer_tile_id_to_region(9, &source()),
            Err(ViewportError::TileIdOutOfRange(9))
        );
    }

    #[test]
    fn invalid_fov_and_grid_are_rejected() {
        assert_eq!(FieldOfView::new(0.0, 80.0), Err(ViewportError::InvalidFov));
        assert_eq!(FieldOfView::new(80.0, -1.0), Err(ViewportError::InvalidFov));
        let broken = SourceInfo {
            tile_columns: 0,
            ..source()
        };
        assert_eq!(
            get_tiles_in_viewport(Pose::default(), FieldOfView::default(), &broken),
            Err(ViewportError::InvalidTileGrid)
        );
    }

    #[test]
    fn oversized_grid_is_rejected_instead_of_overflowing() {
        let huge = SourceInfo {
            width: 1 << 17,
            height: 1 << 16,
            tile_columns: 1 << 17,
            tile_rows: 1 << 16,
        };
        assert_eq!(
            transfer_tile_id_to_region(1, &huge),
            Err(ViewportError::InvalidTileGrid)
        );
    }

    #[test]
    fn rotate_rejects_non_finite_input() {
        let mut pose = Pose::default();
        pose.rotate_by(30.0, 100.0).expect("rotate");
        assert_eq!((pose.yaw(), pose.pitch()), (30.0, 90.0));
        assert_eq!(
            pose.rotate_by(f32::NAN, 0.0),
            Err(ViewportError::NonFiniteValue)
        );
    }

    #[test]
    fn huge_yaw_still_selects_a_block() {
        for yaw in [1.0e30, -1.0e30, f32::MAX] {
            let selected = tiles(yaw, 0.0, 80.0, 80.0);
            assert!(!selected.is_empty(), "yaw {yaw}");
            assert_eq!(selected, tiles(yaw % 360.0, 0.0, 80.0, 80.0));
        }
    }

    #[test]
    fn repeated_rotation_keeps_yaw_within_a_turn() {
        let mut pose = Pose::default();
        for _ in 0..100_000 {
            pose.rotate_by(37.0, 0.0).expect("rotate");
            assert!(pose.yaw().abs() < 360.0);
        }
        // 3_700_000 degrees is 10277 turns plus 280 degrees
        assert_eq!(pose.yaw(), 280.0);
        assert_eq!(
            get_tiles_in_viewport(pose, FieldOfView::default(), &source()).expect("tiles"),
            tiles(-80.0, 0.0, 80.0, 80.0)
        );
    }

    proptest! {
        #[test]
        fn full_turn_of_yaw_selects_the_same_tiles(
            yaw in -180i32..180,
            pitch in -80i32..80,
            h_fov in 10i32..200,
            v_fov in 10i32..120,
        ) {
            let a = tiles(yaw as f32, pitch as f32, h_fov as f32, v_fov as f32);
            let b = tiles(yaw as f32 + 360.0, pitch as f32, h_fov as f32, v_fov as f32);
            prop_assert_eq!(a, b);
        }
    }
}
