use std::sync::Arc;

use tracing::info;

use crate::core::{admission::BidAdmission, channel::DelayQueue, scheduler::ClosingScheduler};
use crate::db::store::AuctionStore;
use crate::domain::{Auction, AuctionId, AuctionStatus, Bid, BidId, BidderId, UnixMs};
use crate::utils::{errors::AuctionError, helpers::current_unix_ms};

/// Facade over the auction core: listing creation (which schedules the
/// close), bid submission, cancellation, and the read surface. The closing
/// processor runs separately against the same store and channel.
pub struct AuctionHouse {
    store: Arc<AuctionStore>,
    scheduler: ClosingScheduler,
    admission: BidAdmission,
}

impl AuctionHouse {
    pub fn new(store: Arc<AuctionStore>, queue: Arc<dyn DelayQueue>) -> Self {
        AuctionHouse {
            scheduler: ClosingScheduler::new(queue),
            admission: BidAdmission::new(store.clone()),
            store,
        }
    }

    /// Lists a new auction and schedules exactly one closing trigger for its
    /// end time. The end time is validated up front so a rejected schedule
    /// leaves no auction row behind.
    pub async fn create_auction(
        &self,
        seller_id: String,
        minimum_bid: i64,
        end_time: UnixMs,
    ) -> Result<AuctionId, AuctionError> {
        if minimum_bid <= 0 {
            return Err(AuctionError::InvalidBidAmount(minimum_bid));
        }

        let now = current_unix_ms();
        if end_time <= now {
            return Err(AuctionError::InvalidSchedule { end_time, now });
        }

        let auction = Auction::new(seller_id, minimum_bid, end_time);
        self.store.insert_auction(&auction).await?;
        self.scheduler.schedule_close(&auction.id, end_time).await?;

        info!(auction_id = %auction.id, end_time, "auction listed");
        Ok(auction.id)
    }

    pub async fn submit_bid(
        &self,
        auction_id: &str,
        bidder_id: BidderId,
        amount: i64,
    ) -> Result<BidId, AuctionError> {
        self.admission.submit_bid(auction_id, bidder_id, amount).await
    }

    /// Seller-initiated cancellation: a status transition under the same
    /// lock discipline as every other auction write, never a delete.
    pub async fn cancel_auction(
        &self,
        auction_id: &str,
        seller_id: &str,
    ) -> Result<(), AuctionError> {
        let mut guard = self.store.find_for_update(auction_id).await?;

        if guard.auction().seller_id != seller_id {
            return Err(AuctionError::NotSeller(auction_id.to_owned()));
        }
        if guard.auction().status != AuctionStatus::Open {
            return Err(AuctionError::AuctionClosed(auction_id.to_owned()));
        }

        guard.set_status(AuctionStatus::Canceled).await?;
        guard.commit().await?;

        info!(auction_id, "auction canceled by seller");
        Ok(())
    }

    pub async fn get_auction(&self, auction_id: &str) -> Result<Auction, AuctionError> {
        self.store.get_auction(auction_id).await
    }

    pub async fn bid_history(&self, auction_id: &str) -> Result<Vec<Bid>, AuctionError> {
        self.admission.bid_history(auction_id).await
    }
}
