//! Extractor track generation for two-resolution tiled 360 video.
//!
//! Every extractor track merges the high resolution tiles around one viewport
//! with the whole low resolution picture into a single coded picture, and
//! describes that picture with region-wise packing, content coverage and
//! rewritten parameter sets.

use omaf_model::status;
use scvp::{BitstreamError, ScvpError};
use thiserror::Error;
use tile_grid::{GridError, TileLayoutError};

pub mod extractor;
pub mod rwpk;
pub mod stream;

pub use extractor::{ExtractorTrack, TwoResExtractorTrackGenerator};
pub use rwpk::TwoResRegionWisePackingGenerator;
pub use stream::{InitialInfo, MediaStream, MediaType, SegmentationInfo, VideoStream};

pub type Result<T> = std::result::Result<T, PackingError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackingError {
    #[error("required input is missing: {0}")]
    NullPointer(&'static str),
    #[error("bad parameter: {0}")]
    BadParam(&'static str),
    #[error("expected exactly 2 video streams, found {found}")]
    VideoNum { found: usize },
    #[error("video streams must differ in resolution and pixel area")]
    VideoResolution,
    #[error("no viewport to generate extractor tracks for")]
    ViewportNum,
    #[error("invalid sps")]
    InvalidSps,
    #[error("invalid pps")]
    InvalidPps,
    #[error("tile selection init failed: {0}")]
    ScvpInitFailed(ScvpError),
    #[error("tile selection rejected the viewport: {0}")]
    ScvpSetFailed(ScvpError),
    #[error("tile selection failed: {0}")]
    ScvpProcessFailed(ScvpError),
    #[error("tile selection returned {count} tiles")]
    ScvpIncorrectResult { count: usize },
    #[error("parameter set generation failed: {0}")]
    ScvpOperationFailed(ScvpError),
    #[error("invalid data: {0}")]
    InvalidData(&'static str),
    #[error("projection cannot be signalled: {0}")]
    InvalidProjection(BitstreamError),
    #[error("stream {index} not found")]
    StreamNotFound { index: u8 },
    #[error("tiles cannot be merged: {0}")]
    TilesMergeArrangement(&'static str),
    #[error("viewport tiles do not form a grid: {0}")]
    TilesGrid(#[from] GridError),
    #[error("tile layout: {0}")]
    TileLayout(#[from] TileLayoutError),
    #[error("region-wise packing does not fit the packed picture: {0}")]
    TilesMergeRwpk(BitstreamError),
    #[error("region-wise packing does not partition the packed picture")]
    GenerateRwpk,
}

impl PackingError {
    pub fn code(&self) -> i32 {
        match self {
            PackingError::NullPointer(_) => status::OMAF_ERROR_NULL_PTR,
            PackingError::BadParam(_) => status::OMAF_ERROR_BAD_PARAM,
            PackingError::VideoNum { .. } => status::OMAF_ERROR_VIDEO_NUM,
            PackingError::VideoResolution => status::OMAF_ERROR_VIDEO_RESOLUTION,
            PackingError::ViewportNum => status::OMAF_ERROR_VIEWPORT_NUM,
            PackingError::InvalidSps => status::OMAF_ERROR_INVALID_SPS,
            PackingError::InvalidPps => status::OMAF_ERROR_INVALID_PPS,
            PackingError::ScvpInitFailed(_) => status::OMAF_ERROR_SCVP_INIT_FAILED,
            PackingError::ScvpSetFailed(_) => status::OMAF_ERROR_SCVP_SET_FAILED,
            PackingError::ScvpProcessFailed(_) => status::OMAF_ERROR_SCVP_PROCESS_FAILED,
            PackingError::ScvpIncorrectResult { .. } => status::OMAF_ERROR_SCVP_INCORRECT_RESULT,
            PackingError::ScvpOperationFailed(_) => status::OMAF_ERROR_SCVP_OPERATION_FAILED,
            PackingError::InvalidData(_) => status::OMAF_ERROR_INVALID_DATA,
            PackingError::InvalidProjection(_) => status::OMAF_ERROR_INVALID_PROJECTIONTYPE,
            PackingError::StreamNotFound { .. } => status::OMAF_ERROR_STREAM_NOT_FOUND,
            PackingError::TilesMergeArrangement(_)
            | PackingError::TilesGrid(_)
            | PackingError::TileLayout(_) => status::OMAF_ERROR_TILES_MERGE_ARRANGEMENT,
            PackingError::TilesMergeRwpk(_) => status::OMAF_ERROR_TILES_MERGE_RWPK,
            PackingError::GenerateRwpk => status::OMAF_ERROR_GENERATE_RWPK,
        }
    }
}
