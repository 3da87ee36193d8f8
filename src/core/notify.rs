use async_trait::async_trait;
use tracing::info;

use crate::domain::Auction;
use crate::utils::errors::AuctionError;

/// Downstream effect of a completed auction. Invoked after the finalizing
/// transaction commits, never inside the locked section; failures are
/// logged, not retried.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn auction_completed(&self, auction: &Auction) -> Result<(), AuctionError>;
}

/// Default notifier that only writes a log line.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn auction_completed(&self, auction: &Auction) -> Result<(), AuctionError> {
        info!(
            auction_id = %auction.id,
            winner = ?auction.winning_bidder,
            price = ?auction.current_price,
            "auction completed, notifying winner"
        );
        Ok(())
    }
}
