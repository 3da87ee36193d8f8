use std::{sync::Arc, time::Duration};

use tracing::debug;

use crate::core::channel::DelayQueue;
use crate::domain::{ClosingTrigger, UnixMs};
use crate::utils::{errors::AuctionError, helpers::current_unix_ms};

/// Schedules exactly one closing attempt per auction at or after its end
/// time, by enqueueing a delayed trigger on the channel. Fire-and-forget:
/// the scheduler never observes the firing and never touches the store.
pub struct ClosingScheduler {
    queue: Arc<dyn DelayQueue>,
}

impl ClosingScheduler {
    pub fn new(queue: Arc<dyn DelayQueue>) -> Self {
        ClosingScheduler { queue }
    }

    /// Enqueues the initial closing trigger for `auction_id`, visible once
    /// `end_time` has passed. An end time at or before now is a caller
    /// error.
    pub async fn schedule_close(
        &self,
        auction_id: &str,
        end_time: UnixMs,
    ) -> Result<(), AuctionError> {
        let now = current_unix_ms();
        let delay = end_time - now;
        if delay <= 0 {
            return Err(AuctionError::InvalidSchedule { end_time, now });
        }

        let trigger = ClosingTrigger::initial(auction_id.to_owned());
        let payload = serde_json::to_vec(&trigger)?;

        self.queue
            .enqueue(payload, Duration::from_millis(delay as u64))
            .await?;

        debug!(auction_id, delay_ms = delay, "scheduled closing trigger");
        Ok(())
    }
}
