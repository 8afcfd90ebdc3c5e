use omaf_model::sphere::{
    azimuth_degrees_to_fixed, clamp_elevation, degrees_to_fixed, pixel_x_for_azimuth,
    pixel_y_for_elevation,
};
use omaf_model::{
    Nalu, PicResolution, PixelRect, RegionWisePacking, SphereRegion, TileArrangement,
};
use tile_grid::TileLayout;
use tracing::debug;

use crate::{FixedTileSelection, ScvpError, ScvpService, ViewportInformation, hevc, sei};

#[derive(Debug, Clone, Copy)]
struct Configured {
    info: ViewportInformation,
    layout: TileLayout,
}

#[derive(Debug, Clone)]
struct Selection {
    tiles: FixedTileSelection,
    block: PixelRect,
}

/// Tile selection over a uniformly tiled equirectangular picture.
#[derive(Debug, Default)]
pub struct ErpScvp {
    configured: Option<Configured>,
    yaw: f32,
    pitch: f32,
    selection: Option<Selection>,
}

impl ErpScvp {
    pub fn new() -> Self {
        Self::default()
    }

    fn configured(&self) -> Result<&Configured, ScvpError> {
        self.configured.as_ref().ok_or(ScvpError::NotInitialized)
    }

    fn selection(&self) -> Result<&Selection, ScvpError> {
        self.configured()?;
        self.selection.as_ref().ok_or(ScvpError::NotProcessed)
    }

    fn select(configured: &Configured, yaw: f32, pitch: f32) -> Result<Selection, ScvpError> {
        let info = &configured.info;
        let layout = &configured.layout;
        let picture = layout.picture();
        let columns = layout.tiles_per_row();
        let rows = layout.tiles_per_column();
        let tile_width = layout.tile_width();
        let tile_height = layout.tile_height();

        let fov_width = info.h_fov as f64 / 360.0 * picture.width as f64;
        let fov_height = info.v_fov as f64 / 180.0 * picture.height as f64;
        let columns_selected = ((fov_width / tile_width as f64).ceil() as u32 + 1).min(columns);
        let rows_selected = ((fov_height / tile_height as f64).ceil() as u32 + 1).min(rows);

        let azimuth = azimuth_degrees_to_fixed(yaw)?;
        let elevation = clamp_elevation(degrees_to_fixed(pitch)?);
        let centre_x = pixel_x_for_azimuth(azimuth, picture.width)?;
        let centre_y = pixel_y_for_elevation(elevation, picture.height)?;

        let left_x = (centre_x - fov_width / 2.0).rem_euclid(picture.width as f64);
        let first_column = ((left_x / tile_width as f64).floor() as u32).min(columns - 1);
        let top_y = (centre_y - fov_height / 2.0).clamp(0.0, picture.height as f64);
        let first_row = ((top_y / tile_height as f64).floor() as u32).min(rows - rows_selected);

        let mut tiles = Vec::with_capacity((columns_selected * rows_selected) as usize);
        for row in first_row..first_row + rows_selected {
            for step in 0..columns_selected {
                let column = (first_column + step) % columns;
                tiles.push(layout.tile_def((row * columns + column) as usize)?);
            }
        }
        let dst_width = columns_selected * tile_width;
        let dst_height = rows_selected * tile_height;
        Ok(Selection {
            tiles: FixedTileSelection {
                tiles,
                dst_width,
                dst_height,
            },
            block: PixelRect::new(
                first_column * tile_width,
                first_row * tile_height,
                dst_width,
                dst_height,
            ),
        })
    }
}

impl ScvpService for ErpScvp {
    fn init(&mut self, info: &ViewportInformation) -> Result<(), ScvpError> {
        if !info.projection.is_equirectangular() {
            return Err(ScvpError::InvalidProjection(info.projection));
        }
        if !(info.h_fov > 0.0 && info.h_fov <= 360.0) || !(info.v_fov > 0.0 && info.v_fov <= 180.0) {
            return Err(ScvpError::InvalidParam("field of view out of range"));
        }
        let layout = TileLayout::new(
            PicResolution::new(info.in_width, info.in_height),
            info.tile_in_row,
            info.tile_in_col,
        )?;
        self.configured = Some(Configured {
            info: *info,
            layout,
        });
        self.yaw = info.yaw;
        self.pitch = info.pitch;
        self.selection = None;
        Ok(())
    }

    fn set_viewport(&mut self, yaw: f32, pitch: f32) -> Result<(), ScvpError> {
        self.configured()?;
        if !yaw.is_finite() || !pitch.is_finite() {
            return Err(ScvpError::InvalidParam("viewport angle is not finite"));
        }
        self.yaw = yaw;
        self.pitch = pitch;
        Ok(())
    }

    fn process(&mut self) -> Result<(), ScvpError> {
        let selection = Self::select(self.configured()?, self.yaw, self.pitch)?;
        debug!(
            yaw = self.yaw,
            pitch = self.pitch,
            tiles = selection.tiles.tiles.len(),
            "selected viewport tiles"
        );
        self.selection = Some(selection);
        Ok(())
    }

    fn fixed_num_tiles(&self) -> Result<FixedTileSelection, ScvpError> {
        Ok(self.selection()?.tiles.clone())
    }

    fn content_coverage(&self) -> Result<SphereRegion, ScvpError> {
        let picture = self.configured()?.layout.picture();
        Ok(SphereRegion::from_pixel_box(self.selection()?.block, picture)?)
    }

    fn generate_sps(&self, orig: &Nalu, width: u32, height: u32) -> Result<Vec<u8>, ScvpError> {
        self.configured()?;
        Ok(hevc::rewrite_sps(orig, width, height)?)
    }

    fn generate_pps(
        &self,
        orig: &Nalu,
        arrangement: &TileArrangement,
    ) -> Result<Vec<u8>, ScvpError> {
        self.configured()?;
        Ok(hevc::rewrite_pps(orig, arrangement)?)
    }

    fn parse_rwpk(&self, nalu: &Nalu) -> Result<RegionWisePacking, ScvpError> {
        self.configured()?;
        Ok(sei::parse_rwpk_sei(nalu)?)
    }
}

#[cfg(test)]
mod tests {
    use omaf_model::ProjectionFormat;
    use omaf_model::sphere::FIXED_POINT_ONE;
    use pretty_assertions::assert_eq;
    use tile_grid::reconstruct_grid;

    use super::*;

    fn info() -> ViewportInformation {
        ViewportInformation {
            in_width: 3840,
            in_height: 1920,
            tile_in_row: 4,
            tile_in_col: 2,
            ..ViewportInformation::default()
        }
    }

    fn processed(yaw: f32, pitch: f32) -> ErpScvp {
        let mut scvp = ErpScvp::new();
        scvp.init(&info()).expect("init");
        scvp.set_viewport(yaw, pitch).expect("set viewport");
        scvp.process().expect("process");
        scvp
    }

    fn indices(selection: &FixedTileSelection) -> Vec<u32> {
        selection.tiles.iter().map(|tile| tile.idx).collect()
    }

    #[test]
    fn front_viewport_selects_centre_block() {
        let selection = processed(0.0, 0.0).fixed_num_tiles().expect("tiles");
        assert_eq!(indices(&selection), vec![1, 2, 5, 6]);
        assert_eq!((selection.dst_width, selection.dst_height), (1920, 1920));
    }

    #[test]
    fn selection_wraps_past_the_right_edge() {
        // centre at x = 3840 * 0.875, block starts at column 3
        let selection = processed(-135.0, 0.0).fixed_num_tiles().expect("tiles");
        assert_eq!(indices(&selection), vec![3, 0, 7, 4]);
        let grid = reconstruct_grid(&selection.tiles, 4, 2).expect("grid");
        assert_eq!((grid.columns(), grid.rows(), grid.first_column()), (2, 2, 3));
    }

    #[test]
    fn yaw_is_periodic() {
        let a = processed(30.0, 10.0).fixed_num_tiles().expect("tiles");
        let b = processed(390.0, 10.0).fixed_num_tiles().expect("tiles");
        assert_eq!(a, b);
    }

    #[test]
    fn huge_yaw_selects_a_full_block() {
        for yaw in [1.0e30, -1.0e30] {
            let selection = processed(yaw, 0.0).fixed_num_tiles().expect("tiles");
            assert_eq!(selection.tiles.len(), 4, "yaw {yaw}");
            assert_eq!((selection.dst_width, selection.dst_height), (1920, 1920));
        }
    }

    #[test]
    fn coverage_of_centre_block() {
        let coverage = processed(0.0, 0.0).content_coverage().expect("coverage");
        assert_eq!(coverage.centre_azimuth, 0);
        assert_eq!(coverage.azimuth_range, (180 * FIXED_POINT_ONE) as u32);
        assert_eq!(coverage.elevation_range, (180 * FIXED_POINT_ONE) as u32);
    }

    #[test]
    fn operations_before_init_fail() {
        let mut scvp = ErpScvp::new();
        assert_eq!(scvp.process(), Err(ScvpError::NotInitialized));
        assert_eq!(scvp.fixed_num_tiles(), Err(ScvpError::NotInitialized));
        assert_eq!(
            scvp.generate_pps(&hevc::minimal_pps(), &TileArrangement::default()),
            Err(ScvpError::NotInitialized)
        );
        assert_eq!(ScvpError::NotInitialized.code(), omaf_model::status::OMAF_ERROR_SCVP_INIT_FAILED);
    }

    #[test]
    fn selection_requires_process() {
        let mut scvp = ErpScvp::new();
        scvp.init(&info()).expect("init");
        assert_eq!(scvp.content_coverage(), Err(ScvpError::NotProcessed));
    }

    #[test]
    fn init_rejects_bad_input() {
        let mut scvp = ErpScvp::new();
        let cubemap = ViewportInformation {
            projection: ProjectionFormat::Cubemap,
            ..info()
        };
        assert_eq!(
            scvp.init(&cubemap),
            Err(ScvpError::InvalidProjection(ProjectionFormat::Cubemap))
        );
        let zero_fov = ViewportInformation { h_fov: 0.0, ..info() };
        assert!(matches!(scvp.init(&zero_fov), Err(ScvpError::InvalidParam(_))));
        let ragged = ViewportInformation { tile_in_row: 7, ..info() };
        assert!(matches!(scvp.init(&ragged), Err(ScvpError::Layout(_))));
    }

    #[test]
    fn wide_fov_selects_every_column() {
        let mut scvp = ErpScvp::new();
        scvp.init(&ViewportInformation {
            h_fov: 300.0,
            ..info()
        })
        .expect("init");
        scvp.process().expect("process");
        let selection = scvp.fixed_num_tiles().expect("tiles");
        assert_eq!(selection.dst_width, 3840);
        let coverage = scvp.content_coverage().expect("coverage");
        assert_eq!(coverage.centre_azimuth, 0);
    }
}
