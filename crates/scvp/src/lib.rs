//! Viewport tile selection and bitstream services for tiled 360 video.
//!
//! [`ScvpService`] is the contract the packaging and playback sides use to
//! ask which tiles a viewport needs and to rewrite parameter sets for merged
//! pictures. [`ErpScvp`] implements it for equirectangular input.

use omaf_model::sphere::SphereError;
use omaf_model::{
    Nalu, ProjectionFormat, RegionWisePacking, SphereRegion, TileArrangement, TileDef, status,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tile_grid::TileLayoutError;

mod erp;
pub mod hevc;
pub mod sei;

pub use erp::ErpScvp;
pub use hevc::BitstreamError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScvpError {
    #[error("service used before init")]
    NotInitialized,
    #[error("no tile selection has been processed")]
    NotProcessed,
    #[error("invalid parameter: {0}")]
    InvalidParam(&'static str),
    #[error("projection {0:?} is not supported")]
    InvalidProjection(ProjectionFormat),
    #[error(transparent)]
    Layout(#[from] TileLayoutError),
    #[error(transparent)]
    Sphere(#[from] SphereError),
    #[error(transparent)]
    Bitstream(#[from] BitstreamError),
}

impl ScvpError {
    pub fn code(&self) -> i32 {
        match self {
            ScvpError::NotInitialized => status::OMAF_ERROR_SCVP_INIT_FAILED,
            ScvpError::NotProcessed => status::OMAF_ERROR_SCVP_PROCESS_FAILED,
            ScvpError::InvalidParam(_) => status::OMAF_ERROR_BAD_PARAM,
            ScvpError::InvalidProjection(_) => status::OMAF_ERROR_INVALID_PROJECTIONTYPE,
            ScvpError::Layout(_) | ScvpError::Sphere(_) => status::OMAF_ERROR_INVALID_DATA,
            ScvpError::Bitstream(_) => status::OMAF_ERROR_SCVP_OPERATION_FAILED,
        }
    }
}

/// Source geometry and viewing parameters handed to [`ScvpService::init`].
/// Angles are in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportInformation {
    pub in_width: u32,
    pub in_height: u32,
    pub tile_in_row: u32,
    pub tile_in_col: u32,
    /// 2 requests a fixed tile count per viewport.
    pub out_geo_type: u8,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub h_fov: f32,
    pub v_fov: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub projection: ProjectionFormat,
}

impl Default for ViewportInformation {
    fn default() -> Self {
        Self {
            in_width: 0,
            in_height: 0,
            tile_in_row: 0,
            tile_in_col: 0,
            out_geo_type: 2,
            viewport_width: 1024,
            viewport_height: 1024,
            h_fov: 80.0,
            v_fov: 80.0,
            yaw: 0.0,
            pitch: 0.0,
            projection: ProjectionFormat::Equirectangular,
        }
    }
}

/// Tiles needed for the current viewport, raster ordered, plus the size of
/// the block they form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedTileSelection {
    pub tiles: Vec<TileDef>,
    pub dst_width: u32,
    pub dst_height: u32,
}

pub trait ScvpService {
    fn init(&mut self, info: &ViewportInformation) -> Result<(), ScvpError>;

    /// Moves the viewport centre. Takes effect on the next [`Self::process`].
    fn set_viewport(&mut self, yaw: f32, pitch: f32) -> Result<(), ScvpError>;

    fn process(&mut self) -> Result<(), ScvpError>;

    fn fixed_num_tiles(&self) -> Result<FixedTileSelection, ScvpError>;

    fn content_coverage(&self) -> Result<SphereRegion, ScvpError>;

    fn generate_sps(&self, orig: &Nalu, width: u32, height: u32) -> Result<Vec<u8>, ScvpError>;

    fn generate_pps(&self, orig: &Nalu, arrangement: &TileArrangement)
    -> Result<Vec<u8>, ScvpError>;

    fn parse_rwpk(&self, nalu: &Nalu) -> Result<RegionWisePacking, ScvpError>;
}
