use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded};
use omaf_model::RegionData;

use crate::RenderError;

/// Creates the queue that carries decoded region metadata of one video from
/// its decoder thread to the render thread.
pub fn region_data_channel(video_id: u32, capacity: usize) -> (RegionDataSender, RenderSource) {
    let (sender, receiver) = bounded(capacity.max(1));
    (
        RegionDataSender { video_id, sender },
        RenderSource {
            video_id,
            receiver,
            current: None,
        },
    )
}

#[derive(Debug, Clone)]
pub struct RegionDataSender {
    video_id: u32,
    sender: Sender<RegionData>,
}

impl RegionDataSender {
    pub fn video_id(&self) -> u32 {
        self.video_id
    }

    /// Blocks while the queue is full. Ownership of `data` moves to the
    /// render thread.
    pub fn send(&self, data: RegionData) -> Result<(), RenderError> {
        if data.video_id() != self.video_id {
            return Err(RenderError::VideoIdMismatch {
                expected: self.video_id,
                found: data.video_id(),
            });
        }
        self.sender.send(data).map_err(|_| RenderError::SourceClosed {
            video_id: self.video_id,
        })
    }
}

/// Render-thread end of a video's region queue. Holds at most one snapshot
/// until it is released.
#[derive(Debug)]
pub struct RenderSource {
    video_id: u32,
    receiver: Receiver<RegionData>,
    current: Option<RegionData>,
}

impl RenderSource {
    pub fn video_id(&self) -> u32 {
        self.video_id
    }

    /// Pops one snapshot when none is held.
    pub fn acquire(&mut self) -> Option<&RegionData> {
        if self.current.is_none() {
            match self.receiver.try_recv() {
                Ok(data) => self.current = Some(data),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
            }
        }
        self.current.as_ref()
    }

    /// Like [`RenderSource::acquire`], waiting up to `timeout` for the decoder.
    pub fn acquire_timeout(&mut self, timeout: Duration) -> Option<&RegionData> {
        if self.current.is_none() {
            self.current = self.receiver.recv_timeout(timeout).ok();
        }
        self.current.as_ref()
    }

    pub fn current(&self) -> Option<&RegionData> {
        self.current.as_ref()
    }

    pub fn release(&mut self) -> Option<RegionData> {
        self.current.take()
    }

    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}
