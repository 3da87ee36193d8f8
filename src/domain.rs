use serde::{Deserialize, Serialize};

use crate::utils::helpers::{compute_hash, current_unix_ms};

// ------------------------------------------------------------------------
// Type aliases
// ------------------------------------------------------------------------

pub type AuctionId = String;
pub type BidId = String;
pub type BidderId = String;
/// Unix timestamp in milliseconds.
pub type UnixMs = i64;

/// Lifecycle status of an auction. `Open` is the only state that accepts
/// bids; every other state is terminal and one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE")]
pub enum AuctionStatus {
    Open,
    Completed,
    Failed,
    Canceled,
}

impl AuctionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AuctionStatus::Open)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuctionStatus::Open => "OPEN",
            AuctionStatus::Completed => "COMPLETED",
            AuctionStatus::Failed => "FAILED",
            AuctionStatus::Canceled => "CANCELED",
        }
    }
}

impl std::fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A timed listing. Mutated only by bid admission (price/bidder) and by the
/// closing processor (status); never deleted.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Auction {
    pub id: AuctionId,
    pub seller_id: String,
    pub minimum_bid: i64,
    pub end_time: UnixMs,
    pub current_price: Option<i64>,
    pub winning_bidder: Option<BidderId>,
    pub status: AuctionStatus,
    pub created_at: UnixMs,
}

impl Auction {
    /// Creates a new open auction; the id is a content hash of the listing.
    pub fn new(seller_id: String, minimum_bid: i64, end_time: UnixMs) -> Self {
        let created_at = current_unix_ms();
        let id = compute_hash(&[
            seller_id.as_bytes(),
            minimum_bid.to_be_bytes().as_ref(),
            end_time.to_be_bytes().as_ref(),
            created_at.to_be_bytes().as_ref(),
        ]);

        Auction {
            id,
            seller_id,
            minimum_bid,
            end_time,
            current_price: None,
            winning_bidder: None,
            status: AuctionStatus::Open,
            created_at,
        }
    }

    /// The amount a new bid has to clear: strictly above the current price,
    /// or at least the minimum bid when nothing has been bid yet.
    pub fn beats_floor(&self, amount: i64) -> bool {
        match self.current_price {
            Some(price) => amount > price,
            None => amount >= self.minimum_bid,
        }
    }

    /// The reference price reported back with a rejected bid.
    pub fn floor(&self) -> i64 {
        self.current_price.unwrap_or(self.minimum_bid)
    }
}

/// A single accepted or submitted bid. Immutable once created.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Bid {
    pub id: BidId,
    pub auction_id: AuctionId,
    pub bidder_id: BidderId,
    pub amount: i64,
    pub created_at: UnixMs,
}

impl Bid {
    pub fn new(auction_id: AuctionId, bidder_id: BidderId, amount: i64) -> Self {
        let created_at = current_unix_ms();
        let id = compute_hash(&[
            auction_id.as_bytes(),
            bidder_id.as_bytes(),
            amount.to_be_bytes().as_ref(),
            created_at.to_be_bytes().as_ref(),
        ]);

        Bid {
            id,
            auction_id,
            bidder_id,
            amount,
            created_at,
        }
    }
}

/// Payload carried by the delay channel. Not persisted; consumed once per
/// delivery attempt and rebuilt with an incremented counter on retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingTrigger {
    pub auction_id: AuctionId,
    pub retry_count: u32,
}

impl ClosingTrigger {
    pub fn initial(auction_id: AuctionId) -> Self {
        ClosingTrigger {
            auction_id,
            retry_count: 0,
        }
    }

    pub fn next_retry(&self) -> Self {
        ClosingTrigger {
            auction_id: self.auction_id.clone(),
            retry_count: self.retry_count + 1,
        }
    }
}
