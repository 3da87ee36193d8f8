use thiserror::Error;

use crate::db::errors::DatabaseError;
use crate::domain::AuctionId;

/// A set of possible errors that can occur in the auction workflow.
#[derive(Error, Debug)]
pub enum AuctionError {
    #[error("auction {0} not found")]
    AuctionNotFound(AuctionId),

    #[error("auction {0} is no longer open for bidding")]
    AuctionClosed(AuctionId),

    #[error("bid of {amount} does not beat the current floor of {floor}")]
    BidTooLow { amount: i64, floor: i64 },

    #[error("bid amount must be positive, got {0}")]
    InvalidBidAmount(i64),

    #[error("end time {end_time} is not in the future (now {now})")]
    InvalidSchedule { end_time: i64, now: i64 },

    #[error("only the seller may cancel auction {0}")]
    NotSeller(AuctionId),

    #[error("timed out waiting for the lock on auction {0}")]
    LockTimeout(AuctionId),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("delay channel rejected the message: {0}")]
    ChannelClosed(String),

    #[error("failed to encode or decode a closing trigger: {0}")]
    Codec(#[from] serde_json::Error),
}

impl AuctionError {
    /// Whether a later retry of the same operation can succeed. Validation
    /// and structural errors are final; infrastructure errors are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AuctionError::LockTimeout(_)
                | AuctionError::Database(_)
                | AuctionError::ChannelClosed(_)
        )
    }
}
