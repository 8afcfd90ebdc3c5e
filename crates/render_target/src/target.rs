use omaf_model::QualityRankingInfo;
use quality_monitor::{FrameObservation, QualityMonitor, QualityState, QualityTransition};
use tracing::{debug, info};
use viewport::{FieldOfView, Pose, get_tiles_in_viewport};

use crate::{
    RenderBackend, RenderError, RenderGeometry, RenderSource, calc_quality_ranking, plan_blits,
    transfer_region_info,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRequest {
    pub yaw: f32,
    pub pitch: f32,
    pub h_fov: f32,
    pub v_fov: f32,
    pub pts: u64,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameOutcome {
    pub pts: u64,
    pub state: QualityState,
    pub transition: Option<QualityTransition>,
    pub required_tiles: Vec<u32>,
    pub blits: usize,
}

#[derive(Debug)]
pub struct ErpRenderTarget {
    geometry: RenderGeometry,
    monitor: QualityMonitor,
    quality_info: QualityRankingInfo,
}

impl ErpRenderTarget {
    pub fn new(geometry: RenderGeometry) -> Self {
        Self {
            geometry,
            monitor: QualityMonitor::new(),
            quality_info: QualityRankingInfo::default(),
        }
    }

    pub fn geometry(&self) -> &RenderGeometry {
        &self.geometry
    }

    pub fn quality_state(&self) -> QualityState {
        self.monitor.state()
    }

    /// Tiles of the last composited frame.
    pub fn quality_ranking_info(&self) -> &QualityRankingInfo {
        &self.quality_info
    }

    pub fn transition_count(&self) -> u64 {
        self.monitor.transition_count()
    }

    pub fn avg_changed_time_ms(&self) -> f64 {
        self.monitor.avg_changed_time_ms()
    }

    /// Composites one frame. Every source contributes at most one snapshot,
    /// which is released once its regions are filed. On error the quality
    /// state is left as it was.
    pub fn update<B>(
        &mut self,
        backend: &mut B,
        sources: &mut [RenderSource],
        request: FrameRequest,
    ) -> Result<FrameOutcome, RenderError>
    where
        B: RenderBackend + ?Sized,
    {
        let pose = Pose::new(request.yaw, request.pitch)?;
        let fov = FieldOfView::new(request.h_fov, request.v_fov)?;

        for source in sources.iter_mut() {
            source.acquire();
        }
        if sources.iter().all(|source| source.current().is_none()) {
            return Err(RenderError::NoFrame);
        }

        let ranking = calc_quality_ranking(sources.iter().filter_map(RenderSource::current));
        let mut info = match ranking {
            Ok(info) => info,
            Err(error) => {
                for source in sources.iter_mut() {
                    source.release();
                }
                info!(pts = request.pts, "no valid region information this frame");
                return Err(error);
            }
        };
        for source in sources.iter_mut() {
            if let Some(data) = source.release() {
                transfer_region_info(&data, &self.geometry, &mut info);
            }
        }

        let required_tiles = get_tiles_in_viewport(pose, fov, self.geometry.main())?;
        let all_required_present = required_tiles
            .iter()
            .all(|tile_id| info.main_contains_tile(*tile_id));

        let commands = plan_blits(&info, &self.geometry);
        backend.clear();
        for command in &commands {
            backend.blit(command)?;
        }
        debug!(
            pts = request.pts,
            blits = commands.len(),
            main_quality = info.main_quality_ranking,
            "composited frame"
        );

        let decision = self.monitor.observe_frame(FrameObservation {
            timestamp_ms: request.timestamp_ms,
            pts: request.pts,
            all_required_present,
        });
        self.quality_info = info;
        Ok(FrameOutcome {
            pts: request.pts,
            state: decision.state,
            transition: decision.transition,
            required_tiles,
            blits: commands.len(),
        })
    }
}

impl Drop for ErpRenderTarget {
    fn drop(&mut self) {
        info!(
            avg_changed_time_ms = self.monitor.avg_changed_time_ms(),
            transitions = self.monitor.transition_count(),
            "render target released"
        );
    }
}
