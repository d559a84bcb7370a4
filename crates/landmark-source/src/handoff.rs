//! Latest-frame-wins hand-off between capture and the processing worker
//!
//! Holds at most one pending frame. Publishing while a frame is still
//! pending replaces it, so a slow consumer never backs up the producer.

use crate::frame::LandmarkFrame;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;
use tracing::debug;

struct Slot {
    pending: Mutex<Option<LandmarkFrame>>,
    notify: Notify,
    closed: AtomicBool,
    published: AtomicU64,
    superseded: AtomicU64,
}

impl Slot {
    fn pending(&self) -> MutexGuard<'_, Option<LandmarkFrame>> {
        // A panicking holder cannot leave the Option half-written
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Create a connected publisher/subscriber pair
pub fn frame_slot() -> (FramePublisher, FrameSubscriber) {
    let slot = Arc::new(Slot {
        pending: Mutex::new(None),
        notify: Notify::new(),
        closed: AtomicBool::new(false),
        published: AtomicU64::new(0),
        superseded: AtomicU64::new(0),
    });

    (
        FramePublisher { slot: slot.clone() },
        FrameSubscriber { slot },
    )
}

/// Producer side (capture / landmark provider)
pub struct FramePublisher {
    slot: Arc<Slot>,
}

impl FramePublisher {
    /// Hand a frame to the worker. Returns `true` if an unconsumed frame was replaced.
    pub fn publish(&self, frame: LandmarkFrame) -> bool {
        let replaced = self.slot.pending().replace(frame);
        self.slot.published.fetch_add(1, Ordering::Relaxed);
        self.slot.notify.notify_one();

        match replaced {
            Some(old) => {
                self.slot.superseded.fetch_add(1, Ordering::Relaxed);
                debug!("Frame {} superseded before processing", old.sequence);
                true
            }
            None => false,
        }
    }

    /// Total frames published
    pub fn published(&self) -> u64 {
        self.slot.published.load(Ordering::Relaxed)
    }
}

impl Drop for FramePublisher {
    fn drop(&mut self) {
        self.slot.closed.store(true, Ordering::Release);
        self.slot.notify.notify_one();
    }
}

/// Consumer side (processing worker)
pub struct FrameSubscriber {
    slot: Arc<Slot>,
}

impl FrameSubscriber {
    /// Wait for the next frame. Returns `None` once the publisher is gone and
    /// nothing is pending.
    pub async fn next_frame(&self) -> Option<LandmarkFrame> {
        loop {
            if let Some(frame) = self.slot.pending().take() {
                return Some(frame);
            }
            if self.slot.closed.load(Ordering::Acquire) {
                return None;
            }
            self.slot.notify.notified().await;
        }
    }

    /// Take the pending frame without waiting
    pub fn try_next_frame(&self) -> Option<LandmarkFrame> {
        self.slot.pending().take()
    }

    /// Frames dropped because a newer one arrived first
    pub fn superseded(&self) -> u64 {
        self.slot.superseded.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.slot.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Timestamp;

    fn frame(sequence: u64) -> LandmarkFrame {
        LandmarkFrame::empty(Timestamp::from_nanos(sequence * 33_000_000), sequence, 640, 480)
    }

    #[tokio::test]
    async fn test_latest_frame_wins() {
        let (publisher, subscriber) = frame_slot();

        assert!(!publisher.publish(frame(1)));
        assert!(publisher.publish(frame(2)));
        assert!(publisher.publish(frame(3)));

        let next = subscriber.next_frame().await.unwrap();
        assert_eq!(next.sequence, 3);
        assert_eq!(subscriber.superseded(), 2);
        assert_eq!(publisher.published(), 3);
        assert!(subscriber.try_next_frame().is_none());
    }

    #[tokio::test]
    async fn test_waits_for_publisher() {
        let (publisher, subscriber) = frame_slot();

        let consumer = tokio::spawn(async move { subscriber.next_frame().await });
        tokio::task::yield_now().await;
        publisher.publish(frame(7));

        let received = consumer.await.unwrap().unwrap();
        assert_eq!(received.sequence, 7);
    }

    #[tokio::test]
    async fn test_closed_after_publisher_drop() {
        let (publisher, subscriber) = frame_slot();
        publisher.publish(frame(1));
        drop(publisher);

        // The pending frame is still delivered, then the stream ends
        assert_eq!(subscriber.next_frame().await.unwrap().sequence, 1);
        assert!(subscriber.next_frame().await.is_none());
        assert!(subscriber.is_closed());
    }
}
