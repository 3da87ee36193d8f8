use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::time::{sleep, Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gavel::core::{
    AuctionHouse, ClosingProcessor, DelayQueue, InProcessDelayQueue, LogNotifier, ProcessorConfig,
};
use gavel::db::{pool::DbPool, store::AuctionStore};

const CLOSING_WORKERS: usize = 2;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:gavel.db?mode=rwc".to_string());
    let db = DbPool::new(&database_url).await?;
    let store = Arc::new(AuctionStore::new(db));

    let (queue, receiver) = InProcessDelayQueue::new(256);
    let queue: Arc<dyn DelayQueue> = Arc::new(queue);

    let processor = Arc::new(ClosingProcessor::new(
        store.clone(),
        queue.clone(),
        Arc::new(LogNotifier),
        ProcessorConfig::default(),
    ));

    let receiver: Arc<Mutex<mpsc::Receiver<Vec<u8>>>> = Arc::new(Mutex::new(receiver));
    for _ in 0..CLOSING_WORKERS {
        let processor = processor.clone();
        let receiver = receiver.clone();
        tokio::spawn(async move {
            processor.run(receiver).await;
        });
    }

    let _house = AuctionHouse::new(store, queue);
    info!("auction house running, closing workers started");

    // Keep the runtime alive; listings and bids arrive through the facade.
    loop {
        sleep(Duration::from_secs(60)).await;
    }
}
