use std::sync::Arc;

use tracing::debug;

use crate::db::store::AuctionStore;
use crate::domain::{AuctionStatus, Bid, BidId, BidderId};
use crate::utils::{errors::AuctionError, helpers::current_unix_ms};

/// Serialized write path for bids. All mutation of an auction's price and
/// winning bidder goes through here, under the auction's exclusive lock, so
/// accepted prices are strictly increasing and no accepted bid is lost.
pub struct BidAdmission {
    store: Arc<AuctionStore>,
}

impl BidAdmission {
    pub fn new(store: Arc<AuctionStore>) -> Self {
        BidAdmission { store }
    }

    /// Validates and records a bid as a single transaction. Concurrent
    /// submissions on the same auction are admitted one at a time in lock
    /// acquisition order; validation failures roll back in full.
    pub async fn submit_bid(
        &self,
        auction_id: &str,
        bidder_id: BidderId,
        amount: i64,
    ) -> Result<BidId, AuctionError> {
        if amount <= 0 {
            return Err(AuctionError::InvalidBidAmount(amount));
        }

        let mut guard = self.store.find_for_update(auction_id).await?;
        let auction = guard.auction();

        if auction.status != AuctionStatus::Open || current_unix_ms() >= auction.end_time {
            return Err(AuctionError::AuctionClosed(auction_id.to_owned()));
        }

        if !auction.beats_floor(amount) {
            return Err(AuctionError::BidTooLow {
                amount,
                floor: auction.floor(),
            });
        }

        let bid = Bid::new(auction_id.to_owned(), bidder_id.clone(), amount);
        guard.insert_bid(&bid).await?;
        guard.apply_price(amount, &bidder_id).await?;
        guard.commit().await?;

        debug!(auction_id, bidder_id = %bidder_id, amount, "bid accepted");
        Ok(bid.id)
    }

    /// Bid history for an auction, newest first. Read-only and unlocked.
    pub async fn bid_history(&self, auction_id: &str) -> Result<Vec<Bid>, AuctionError> {
        self.store.bid_history(auction_id).await
    }
}
