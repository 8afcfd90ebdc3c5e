//! Per-frame tile selection and compositing for equirectangular playback.
//!
//! Decoder threads hand [`omaf_model::RegionData`] snapshots to the render
//! thread through one bounded queue per video. Each frame the render target
//! groups the packed regions by quality, checks whether the viewport is fully
//! covered by the best quality and issues blits, lower qualities first.

mod backend;
mod blit;
mod ranking;
mod source;
mod target;

#[cfg(test)]
mod tests;

use omaf_model::{PixelRect, status};
use thiserror::Error;
use viewport::ViewportError;

pub use backend::{RecordingBackend, RenderBackend, RgbFrame, SoftwareCompositor};
pub use blit::{BlitCommand, RenderGeometry, plan_blits};
pub use ranking::{calc_quality_ranking, region_data_is_valid, transfer_region_info};
pub use source::{RegionDataSender, RenderSource, region_data_channel};
pub use target::{ErpRenderTarget, FrameOutcome, FrameRequest};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("no render source delivered a frame")]
    NoFrame,
    #[error("no render source carries valid region information")]
    NoValidRegionInfo,
    #[error("render source for video {video_id} is closed")]
    SourceClosed { video_id: u32 },
    #[error("region data for video {found} sent to the source of video {expected}")]
    VideoIdMismatch { expected: u32, found: u32 },
    #[error("no decoded frame for video {video_id}")]
    MissingFrame { video_id: u32 },
    #[error("blit source {rect:?} lies outside the frame of video {video_id}")]
    BlitOutOfBounds { video_id: u32, rect: PixelRect },
    #[error("render geometry has no usable tile grid")]
    InvalidGeometry,
    #[error(transparent)]
    Viewport(#[from] ViewportError),
}

impl RenderError {
    pub fn code(&self) -> i32 {
        match self {
            RenderError::NoFrame => status::RENDER_NO_FRAME,
            RenderError::SourceClosed { .. } => status::RENDER_NULL_HANDLE,
            _ => status::RENDER_ERROR,
        }
    }
}
