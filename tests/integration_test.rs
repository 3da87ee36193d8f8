use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};

use gavel::core::{
    AuctionHouse, ClosingProcessor, DelayQueue, InProcessDelayQueue, LogNotifier, ProcessorConfig,
};
use gavel::db::{pool::DbPool, store::AuctionStore};
use gavel::domain::AuctionStatus;
use gavel::utils::errors::AuctionError;
use gavel::utils::helpers::current_unix_ms;

struct Harness {
    house: AuctionHouse,
    _workers: Vec<tokio::task::JoinHandle<()>>,
}

/// Wires the full core together the way the binary does: store, delay
/// channel, closing workers, and the facade.
async fn start_harness() -> Harness {
    let db = DbPool::in_memory().await.expect("in-memory db");
    let store = Arc::new(AuctionStore::new(db));

    let (queue, receiver) = InProcessDelayQueue::new(64);
    let queue: Arc<dyn DelayQueue> = Arc::new(queue);

    let processor = Arc::new(ClosingProcessor::new(
        store.clone(),
        queue.clone(),
        Arc::new(LogNotifier),
        ProcessorConfig {
            max_retry: 3,
            retry_delay: Duration::from_millis(100),
        },
    ));

    let receiver = Arc::new(Mutex::new(receiver));
    let mut workers = Vec::new();
    for _ in 0..2 {
        let processor = processor.clone();
        let receiver = receiver.clone();
        workers.push(tokio::spawn(async move {
            processor.run(receiver).await;
        }));
    }

    Harness {
        house: AuctionHouse::new(store, queue),
        _workers: workers,
    }
}

#[tokio::test]
async fn test_auction_lifecycle_with_bids() -> Result<(), Box<dyn std::error::Error>> {
    let harness = start_harness().await;
    let house = &harness.house;

    // Auction ending shortly; two bidders compete before the close fires.
    let auction_id = house
        .create_auction("seller-1".to_string(), 1000, current_unix_ms() + 800)
        .await?;

    house
        .submit_bid(&auction_id, "bidder-x".to_string(), 1500)
        .await?;
    house
        .submit_bid(&auction_id, "bidder-z".to_string(), 2000)
        .await?;

    // An undercutting bid is rejected without touching the state.
    let rejected = house
        .submit_bid(&auction_id, "bidder-y".to_string(), 1200)
        .await;
    assert!(matches!(rejected, Err(AuctionError::BidTooLow { .. })));

    // Wait past the end time for the closing worker to fire.
    sleep(Duration::from_millis(1_500)).await;

    let auction = house.get_auction(&auction_id).await?;
    assert_eq!(auction.status, AuctionStatus::Completed);
    assert_eq!(auction.current_price, Some(2000));
    assert_eq!(auction.winning_bidder, Some("bidder-z".to_string()));

    let history = house.bid_history(&auction_id).await?;
    let amounts: Vec<i64> = history.iter().map(|b| b.amount).collect();
    assert_eq!(amounts, vec![2000, 1500]);

    // Bids after the close are rejected.
    let late = house
        .submit_bid(&auction_id, "bidder-late".to_string(), 9000)
        .await;
    assert!(matches!(late, Err(AuctionError::AuctionClosed(_))));

    Ok(())
}

#[tokio::test]
async fn test_auction_without_bids_fails() -> Result<(), Box<dyn std::error::Error>> {
    let harness = start_harness().await;
    let house = &harness.house;

    let auction_id = house
        .create_auction("seller-1".to_string(), 1000, current_unix_ms() + 500)
        .await?;

    sleep(Duration::from_millis(1_200)).await;

    let auction = house.get_auction(&auction_id).await?;
    assert_eq!(auction.status, AuctionStatus::Failed);
    assert_eq!(auction.current_price, None);
    assert_eq!(auction.winning_bidder, None);

    Ok(())
}

#[tokio::test]
async fn test_listing_with_past_end_time_is_rejected() {
    let harness = start_harness().await;

    let result = harness
        .house
        .create_auction("seller-1".to_string(), 1000, current_unix_ms() - 2_000)
        .await;
    assert!(matches!(result, Err(AuctionError::InvalidSchedule { .. })));
}

#[tokio::test]
async fn test_canceled_auction_survives_closing_trigger(
) -> Result<(), Box<dyn std::error::Error>> {
    let harness = start_harness().await;
    let house = &harness.house;

    let auction_id = house
        .create_auction("seller-1".to_string(), 1000, current_unix_ms() + 500)
        .await?;

    // Seller cancels before the end time; the later trigger must treat the
    // terminal status as a no-op instead of overwriting it.
    house.cancel_auction(&auction_id, "seller-1").await?;

    sleep(Duration::from_millis(1_200)).await;

    let auction = house.get_auction(&auction_id).await?;
    assert_eq!(auction.status, AuctionStatus::Canceled);

    Ok(())
}
