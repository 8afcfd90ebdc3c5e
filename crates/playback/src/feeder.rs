use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, bounded};
use omaf_model::RegionData;
use packing::ExtractorTrack;
use render_target::RegionDataSender;
use tracing::{debug, warn};

use crate::PlaybackError;

const REQUEST_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeRequest {
    pub pts: u64,
    pub viewport_idx: u16,
}

/// Stand-in for one video's decoder thread. Each request yields one region
/// snapshot for the track that was selected `latency_frames` requests
/// earlier, mimicking the delay before a track switch reaches the screen.
///
/// The render side's [`render_target::RenderSource`] must be dropped before
/// the feeder, otherwise the join can wait on a full queue.
#[derive(Debug)]
pub struct DecoderFeeder {
    video_id: u32,
    requests: Option<Sender<DecodeRequest>>,
    handle: Option<JoinHandle<()>>,
}

impl DecoderFeeder {
    pub fn spawn(
        output: RegionDataSender,
        tracks: Arc<BTreeMap<u16, ExtractorTrack>>,
        latency_frames: usize,
    ) -> Result<Self, PlaybackError> {
        let video_id = output.video_id();
        let (requests, incoming) = bounded::<DecodeRequest>(REQUEST_CAPACITY);
        let handle = thread::Builder::new()
            .name(format!("decoder-feeder-{video_id}"))
            .spawn(move || {
                let mut in_flight = VecDeque::with_capacity(latency_frames + 1);
                while let Ok(request) = incoming.recv() {
                    in_flight.push_back(request.viewport_idx);
                    if in_flight.len() > latency_frames + 1 {
                        in_flight.pop_front();
                    }
                    let Some(track) = in_flight.front().and_then(|idx| tracks.get(idx)) else {
                        warn!(video_id, pts = request.pts, "requested track is unknown");
                        continue;
                    };
                    let data = RegionData::new(
                        video_id,
                        request.pts,
                        track.rwpk.clone(),
                        track.source_resolutions.clone(),
                    );
                    if output.send(data).is_err() {
                        break;
                    }
                }
                debug!(video_id, "decoder feeder stopped");
            })
            .map_err(|error| PlaybackError::Spawn {
                name: "decoder-feeder",
                message: error.to_string(),
            })?;
        Ok(Self {
            video_id,
            requests: Some(requests),
            handle: Some(handle),
        })
    }

    pub fn video_id(&self) -> u32 {
        self.video_id
    }

    pub fn request(&self, request: DecodeRequest) -> Result<(), PlaybackError> {
        let stopped = PlaybackError::FeederStopped {
            video_id: self.video_id,
        };
        let requests = self.requests.as_ref().ok_or_else(|| stopped.clone())?;
        requests.send(request).map_err(|_| stopped)
    }
}

impl Drop for DecoderFeeder {
    fn drop(&mut self) {
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(video_id = self.video_id, "decoder feeder thread panicked");
            }
        }
    }
}
