use std::{sync::Arc, time::Duration};

use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

use crate::core::channel::DelayQueue;
use crate::core::notify::Notifier;
use crate::db::store::AuctionStore;
use crate::domain::{AuctionStatus, ClosingTrigger};
use crate::utils::errors::AuctionError;

/// Retry policy for closing attempts. The spacing is deliberately fixed
/// rather than exponential; it is an observable behavioral contract.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Extra attempts after the first delivery.
    pub max_retry: u32,
    /// Visibility delay of a re-enqueued trigger.
    pub retry_delay: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        ProcessorConfig {
            max_retry: 3,
            retry_delay: Duration::from_millis(5_000),
        }
    }
}

/// What a finalize attempt did to the auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    Completed,
    Failed,
    /// The auction was already terminal; the delivery was a duplicate and
    /// the attempt is a no-op success.
    AlreadyTerminal,
}

/// Consumes expired closing triggers and drives the referenced auction to a
/// terminal status exactly once in effect. Delivery is at-least-once, so
/// finalize is idempotent; transient failures are retried through fresh
/// delayed messages, up to `max_retry`.
pub struct ClosingProcessor {
    store: Arc<AuctionStore>,
    queue: Arc<dyn DelayQueue>,
    notifier: Arc<dyn Notifier>,
    config: ProcessorConfig,
}

impl ClosingProcessor {
    pub fn new(
        store: Arc<AuctionStore>,
        queue: Arc<dyn DelayQueue>,
        notifier: Arc<dyn Notifier>,
        config: ProcessorConfig,
    ) -> Self {
        ClosingProcessor {
            store,
            queue,
            notifier,
            config,
        }
    }

    /// Long-lived worker loop over the dead-letter consumption point.
    /// Several workers may share the receiver; they serialize on `recv` and
    /// process deliveries concurrently.
    pub async fn run(&self, receiver: Arc<Mutex<mpsc::Receiver<Vec<u8>>>>) {
        loop {
            let payload = { receiver.lock().await.recv().await };
            match payload {
                Some(payload) => self.handle_delivery(&payload).await,
                None => {
                    info!("delay channel closed, stopping closing worker");
                    break;
                }
            }
        }
    }

    /// One delivery attempt. Never returns an error to the channel: a
    /// malformed payload is a poison message and gets dropped here instead
    /// of bouncing through redelivery forever.
    pub async fn handle_delivery(&self, payload: &[u8]) {
        let trigger: ClosingTrigger = match serde_json::from_slice(payload) {
            Ok(trigger) => trigger,
            Err(e) => {
                error!(error = %e, "dropping malformed closing trigger");
                return;
            }
        };

        match self.finalize(&trigger.auction_id).await {
            Ok(outcome) => {
                info!(
                    auction_id = %trigger.auction_id,
                    retry = trigger.retry_count,
                    ?outcome,
                    "closing trigger processed"
                );
            }
            Err(e) if e.is_transient() => self.schedule_retry(trigger, e).await,
            Err(e) => {
                // Permanent: the auction id is immutable, so a missing row
                // cannot appear on a later attempt.
                error!(
                    auction_id = %trigger.auction_id,
                    error = %e,
                    "permanent failure finalizing auction, dropping trigger"
                );
            }
        }
    }

    /// Finalizes one auction under its exclusive lock. Safe to invoke any
    /// number of times: an already-terminal auction is a no-op success.
    pub async fn finalize(&self, auction_id: &str) -> Result<FinalizeOutcome, AuctionError> {
        let mut guard = self.store.find_for_update(auction_id).await?;

        if guard.auction().status.is_terminal() {
            return Ok(FinalizeOutcome::AlreadyTerminal);
        }

        let (status, outcome) = if guard.auction().winning_bidder.is_some() {
            (AuctionStatus::Completed, FinalizeOutcome::Completed)
        } else {
            (AuctionStatus::Failed, FinalizeOutcome::Failed)
        };

        guard.set_status(status).await?;
        let auction = guard.commit().await?;

        // Best-effort, after commit: the lock must not be held across an
        // external call.
        if outcome == FinalizeOutcome::Completed {
            if let Err(e) = self.notifier.auction_completed(&auction).await {
                warn!(auction_id = %auction.id, error = %e, "winner notification failed");
            }
        }

        Ok(outcome)
    }

    async fn schedule_retry(&self, trigger: ClosingTrigger, cause: AuctionError) {
        if trigger.retry_count >= self.config.max_retry {
            error!(
                auction_id = %trigger.auction_id,
                retries = trigger.retry_count,
                error = %cause,
                "closing retries exhausted, auction requires operator attention"
            );
            return;
        }

        let next = trigger.next_retry();
        let payload = match serde_json::to_vec(&next) {
            Ok(payload) => payload,
            Err(e) => {
                error!(auction_id = %next.auction_id, error = %e, "failed to encode retry trigger");
                return;
            }
        };

        match self.queue.enqueue(payload, self.config.retry_delay).await {
            Ok(()) => warn!(
                auction_id = %next.auction_id,
                retry = next.retry_count,
                error = %cause,
                "finalize failed, retrying after delay"
            ),
            Err(e) => error!(
                auction_id = %next.auction_id,
                error = %e,
                "failed to re-enqueue closing trigger"
            ),
        }
    }
}
