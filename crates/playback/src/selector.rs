use std::collections::BTreeMap;

use omaf_model::SphereRegion;
use packing::ExtractorTrack;
use scvp::{ScvpService, ViewportInformation};
use tracing::info;
use viewport::Pose;

use crate::PlaybackError;

/// Picks the extractor track whose coverage is centred closest to what the
/// tile-selection service reports for the current pose.
#[derive(Debug)]
pub struct ExtractorTracksSelector<S> {
    scvp: S,
    coverages: Vec<(u16, SphereRegion)>,
    last_pose: Option<Pose>,
    selected: Option<u16>,
}

impl<S: ScvpService> ExtractorTracksSelector<S> {
    pub fn new(
        mut scvp: S,
        info: &ViewportInformation,
        tracks: &BTreeMap<u16, ExtractorTrack>,
    ) -> Result<Self, PlaybackError> {
        let coverages: Vec<_> = tracks
            .iter()
            .filter_map(|(viewport_idx, track)| {
                track
                    .coverage
                    .primary_region()
                    .map(|region| (*viewport_idx, *region))
            })
            .collect();
        if coverages.is_empty() {
            return Err(PlaybackError::NoTracks);
        }
        scvp.init(info)?;
        Ok(Self {
            scvp,
            coverages,
            last_pose: None,
            selected: None,
        })
    }

    pub fn selected(&self) -> Option<u16> {
        self.selected
    }

    /// `Ok(None)` when the pose has not moved since the last call.
    pub fn select(&mut self, pose: Pose) -> Result<Option<u16>, PlaybackError> {
        if self.last_pose == Some(pose) {
            return Ok(None);
        }
        self.scvp.set_viewport(pose.yaw(), pose.pitch())?;
        self.scvp.process()?;
        let wanted = self.scvp.content_coverage()?;
        let nearest = self
            .coverages
            .iter()
            .min_by(|(_, a), (_, b)| {
                a.centre_distance_squared(&wanted)
                    .total_cmp(&b.centre_distance_squared(&wanted))
            })
            .map(|(viewport_idx, _)| *viewport_idx)
            .ok_or(PlaybackError::NoTracks)?;

        self.last_pose = Some(pose);
        if self.selected != Some(nearest) {
            info!(
                viewport_idx = nearest,
                yaw = pose.yaw(),
                pitch = pose.pitch(),
                "selected extractor track"
            );
            self.selected = Some(nearest);
        }
        Ok(Some(nearest))
    }
}
