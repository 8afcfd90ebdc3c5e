//! Playback runtime around the render target: pose sharing, viewport
//! feedback, extractor track selection and a simulated decode path.

mod feedback;
mod feeder;
mod pose;
mod selector;
mod session;

use omaf_model::status;
use render_target::RenderError;
use scvp::ScvpError;
use thiserror::Error;
use viewport::ViewportError;

pub use feedback::{CountingSink, PoseSink, ViewportFeedback};
pub use feeder::{DecodeRequest, DecoderFeeder};
pub use pose::PoseLock;
pub use selector::ExtractorTracksSelector;
pub use session::{PlayerConfig, PlayerSession, PoseSample, SessionReport, TrackSelection, VIDEO_ID};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("no extractor track carries a coverage region")]
    NoTracks,
    #[error("invalid player configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("failed to spawn {name} thread: {message}")]
    Spawn { name: &'static str, message: String },
    #[error("decoder feeder for video {video_id} has stopped")]
    FeederStopped { video_id: u32 },
    #[error(transparent)]
    Scvp(#[from] ScvpError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Viewport(#[from] ViewportError),
}

impl PlaybackError {
    pub fn code(&self) -> i32 {
        match self {
            PlaybackError::Scvp(error) => error.code(),
            PlaybackError::Render(error) => error.code(),
            PlaybackError::FeederStopped { .. } => status::RENDER_NULL_HANDLE,
            _ => status::RENDER_ERROR,
        }
    }
}
