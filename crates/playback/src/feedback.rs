use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender, TrySendError, bounded};
use tracing::{debug, warn};
use viewport::Pose;

use crate::{PlaybackError, PoseLock};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Receiver of periodic pose reports, usually the network or decoder layer.
pub trait PoseSink: Send + 'static {
    fn push_pose(&mut self, pose: Pose);
}

/// Drops the report when the receiver is busy.
impl PoseSink for Sender<Pose> {
    fn push_pose(&mut self, pose: Pose) {
        match self.try_send(pose) {
            Ok(()) | Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CountingSink {
    pushes: Arc<AtomicU64>,
}

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pushes(&self) -> u64 {
        self.pushes.load(Ordering::Relaxed)
    }
}

impl PoseSink for CountingSink {
    fn push_pose(&mut self, _pose: Pose) {
        self.pushes.fetch_add(1, Ordering::Relaxed);
    }
}

/// Low-priority thread that reports the current pose at a fixed interval.
/// Stopped and joined on drop.
#[derive(Debug)]
pub struct ViewportFeedback {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ViewportFeedback {
    pub fn spawn<S: PoseSink>(
        pose: PoseLock,
        mut sink: S,
        interval: Duration,
    ) -> Result<Self, PlaybackError> {
        let interval = interval.max(MIN_INTERVAL);
        let (shutdown, signal) = bounded::<()>(1);
        let handle = thread::Builder::new()
            .name("viewport-feedback".to_owned())
            .spawn(move || {
                loop {
                    match signal.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => sink.push_pose(pose.get()),
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("viewport feedback stopped");
            })
            .map_err(|error| PlaybackError::Spawn {
                name: "viewport-feedback",
                message: error.to_string(),
            })?;
        Ok(Self {
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }

    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.try_send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("viewport feedback thread panicked");
            }
        }
    }
}

impl Drop for ViewportFeedback {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::unbounded;

    use super::*;

    #[test]
    fn reports_the_latest_pose() {
        let lock = PoseLock::new(Pose::new(45.0, 5.0).expect("pose"));
        let (sender, receiver) = unbounded();

        let feedback =
            ViewportFeedback::spawn(lock.clone(), sender, Duration::from_millis(1)).expect("spawn");
        let pushed = receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("feedback");
        drop(feedback);

        assert_eq!(pushed, Pose::new(45.0, 5.0).expect("pose"));
    }

    #[test]
    fn stop_joins_and_silences_the_thread() {
        let sink = CountingSink::new();
        let mut feedback =
            ViewportFeedback::spawn(PoseLock::default(), sink.clone(), Duration::from_secs(3600))
                .expect("spawn");

        feedback.stop();
        feedback.stop();

        assert_eq!(sink.pushes(), 0);
    }
}
