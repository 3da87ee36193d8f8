use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::warn;

use crate::utils::errors::AuctionError;

/// A messaging collaborator that makes an enqueued payload visible for
/// consumption only after its visibility delay has elapsed.
///
/// The contract is best-effort and at-least-once: a message becomes
/// available no earlier than its delay, at a single consumption point, and
/// consumers must tolerate duplicates.
#[async_trait]
pub trait DelayQueue: Send + Sync {
    async fn enqueue(&self, payload: Vec<u8>, visibility_delay: Duration)
        -> Result<(), AuctionError>;
}

/// In-process delay queue backed by timer tasks and an mpsc channel. Each
/// enqueued payload sleeps out its delay in a spawned task, then lands on
/// the dead-letter receiver handed out at construction.
pub struct InProcessDelayQueue {
    expired_tx: mpsc::Sender<Vec<u8>>,
}

impl InProcessDelayQueue {
    /// Creates the queue plus the dead-letter consumption point read by the
    /// closing workers.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Vec<u8>>) {
        let (expired_tx, expired_rx) = mpsc::channel(capacity);
        (InProcessDelayQueue { expired_tx }, expired_rx)
    }
}

#[async_trait]
impl DelayQueue for InProcessDelayQueue {
    async fn enqueue(
        &self,
        payload: Vec<u8>,
        visibility_delay: Duration,
    ) -> Result<(), AuctionError> {
        if self.expired_tx.is_closed() {
            return Err(AuctionError::ChannelClosed(
                "dead-letter consumer is gone".to_string(),
            ));
        }

        let tx = self.expired_tx.clone();
        tokio::spawn(async move {
            sleep(visibility_delay).await;
            if tx.send(payload).await.is_err() {
                warn!("dead-letter consumer gone, dropping expired message");
            }
        });

        Ok(())
    }
}

/// Test double shared by the scheduler and processor tests: records every
/// enqueue instead of delivering it.
#[cfg(test)]
pub mod testing {
    use super::*;
    use tokio::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingQueue {
        enqueued: Mutex<Vec<(Vec<u8>, Duration)>>,
    }

    impl RecordingQueue {
        /// Takes everything recorded so far.
        pub async fn drain(&self) -> Vec<(Vec<u8>, Duration)> {
            std::mem::take(&mut *self.enqueued.lock().await)
        }
    }

    #[async_trait]
    impl DelayQueue for RecordingQueue {
        async fn enqueue(
            &self,
            payload: Vec<u8>,
            visibility_delay: Duration,
        ) -> Result<(), AuctionError> {
            self.enqueued.lock().await.push((payload, visibility_delay));
            Ok(())
        }
    }
}
