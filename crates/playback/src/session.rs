use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use omaf_model::SourceInfo;
use packing::ExtractorTrack;
use quality_monitor::QualityState;
use render_target::{
    ErpRenderTarget, FrameRequest, RenderBackend, RenderError, RenderGeometry, region_data_channel,
};
use scvp::{ScvpService, ViewportInformation};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use viewport::{FieldOfView, Pose};

use crate::{
    DecodeRequest, DecoderFeeder, ExtractorTracksSelector, PlaybackError, PoseLock, PoseSink,
    ViewportFeedback,
};

/// Video id of the single packed stream a session decodes.
pub const VIDEO_ID: u32 = 0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseSample {
    pub yaw: f32,
    pub pitch: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub h_fov: f32,
    pub v_fov: f32,
    pub frame_rate: u32,
    pub decode_latency_frames: usize,
    pub decode_timeout_ms: u64,
    pub feedback_interval_ms: u64,
    pub queue_capacity: usize,
    /// One sample per frame. The last sample holds once the trace runs out.
    pub pose_trace: Vec<PoseSample>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            h_fov: 80.0,
            v_fov: 80.0,
            frame_rate: 30,
            decode_latency_frames: 2,
            decode_timeout_ms: 1000,
            feedback_interval_ms: 100,
            queue_capacity: 4,
            pose_trace: Vec::new(),
        }
    }
}

impl PlayerConfig {
    fn pose_at(&self, frame: u64) -> PoseSample {
        let index = usize::try_from(frame).unwrap_or(usize::MAX);
        self.pose_trace
            .get(index)
            .or(self.pose_trace.last())
            .copied()
            .unwrap_or_default()
    }

    fn timestamp_ms(&self, frame: u64) -> u64 {
        frame * 1000 / u64::from(self.frame_rate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackSelection {
    pub frame: u64,
    pub viewport_idx: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub frames: u64,
    pub frames_rendered: u64,
    pub frames_skipped: u64,
    pub quality_transitions: u64,
    pub avg_changed_time_ms: f64,
    pub final_state: QualityState,
    pub selections: Vec<TrackSelection>,
}

/// Drives playback of a set of extractor tracks for a scripted pose trace.
pub struct PlayerSession<S, B> {
    config: PlayerConfig,
    pose: PoseLock,
    selector: ExtractorTracksSelector<S>,
    tracks: Arc<BTreeMap<u16, ExtractorTrack>>,
    target: ErpRenderTarget,
    backend: B,
}

impl<S: ScvpService, B: RenderBackend> PlayerSession<S, B> {
    /// `main` is the geometry of the high resolution source the tracks were
    /// packed from.
    pub fn new(
        config: PlayerConfig,
        tracks: BTreeMap<u16, ExtractorTrack>,
        main: SourceInfo,
        scvp: S,
        backend: B,
    ) -> Result<Self, PlaybackError> {
        FieldOfView::new(config.h_fov, config.v_fov)?;
        if config.frame_rate == 0 {
            return Err(PlaybackError::InvalidConfig("frame rate must be positive"));
        }
        let geometry = RenderGeometry::new(main)?;
        let info = ViewportInformation {
            in_width: main.width,
            in_height: main.height,
            tile_in_row: main.tile_columns,
            tile_in_col: main.tile_rows,
            h_fov: config.h_fov,
            v_fov: config.v_fov,
            ..ViewportInformation::default()
        };
        let selector = ExtractorTracksSelector::new(scvp, &info, &tracks)?;
        Ok(Self {
            config,
            pose: PoseLock::default(),
            selector,
            tracks: Arc::new(tracks),
            target: ErpRenderTarget::new(geometry),
            backend,
        })
    }

    pub fn pose_lock(&self) -> PoseLock {
        self.pose.clone()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn render_target(&self) -> &ErpRenderTarget {
        &self.target
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    pub fn run<K: PoseSink>(&mut self, frames: u64, sink: K) -> Result<SessionReport, PlaybackError> {
        let _feedback = ViewportFeedback::spawn(
            self.pose.clone(),
            sink,
            Duration::from_millis(self.config.feedback_interval_ms),
        )?;
        let (output, source) = region_data_channel(VIDEO_ID, self.config.queue_capacity);
        let feeder = DecoderFeeder::spawn(
            output,
            Arc::clone(&self.tracks),
            self.config.decode_latency_frames,
        )?;
        let mut sources = vec![source];
        let decode_timeout = Duration::from_millis(self.config.decode_timeout_ms);

        let mut frames_rendered = 0;
        let mut frames_skipped = 0;
        let mut selections: Vec<TrackSelection> = Vec::new();
        for frame in 0..frames {
            let sample = self.config.pose_at(frame);
            let pose = Pose::new(sample.yaw, sample.pitch)?;
            self.pose.set(pose);
            if let Some(viewport_idx) = self.selector.select(pose)? {
                if selections.last().map(|last| last.viewport_idx) != Some(viewport_idx) {
                    selections.push(TrackSelection {
                        frame,
                        viewport_idx,
                    });
                }
            }
            let viewport_idx = self.selector.selected().ok_or(PlaybackError::NoTracks)?;
            feeder.request(DecodeRequest {
                pts: frame,
                viewport_idx,
            })?;

            for source in &mut sources {
                source.acquire_timeout(decode_timeout);
            }
            let request = FrameRequest {
                yaw: pose.yaw(),
                pitch: pose.pitch(),
                h_fov: self.config.h_fov,
                v_fov: self.config.v_fov,
                pts: frame,
                timestamp_ms: self.config.timestamp_ms(frame),
            };
            match self.target.update(&mut self.backend, &mut sources, request) {
                Ok(_) => frames_rendered += 1,
                Err(RenderError::NoFrame) => frames_skipped += 1,
                Err(error @ RenderError::NoValidRegionInfo) => {
                    warn!(pts = frame, %error, "skipping frame");
                    frames_skipped += 1;
                }
                Err(error) => return Err(error.into()),
            }
        }

        let report = SessionReport {
            frames,
            frames_rendered,
            frames_skipped,
            quality_transitions: self.target.transition_count(),
            avg_changed_time_ms: self.target.avg_changed_time_ms(),
            final_state: self.target.quality_state(),
            selections,
        };
        info!(
            frames,
            frames_skipped,
            quality_transitions = report.quality_transitions,
            avg_changed_time_ms = report.avg_changed_time_ms,
            "playback session finished"
        );
        Ok(report)
    }
}
