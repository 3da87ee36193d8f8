use std::{collections::HashMap, sync::Arc, time::Duration};

use sqlx::{Sqlite, Transaction};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::db::{errors::DatabaseError, pool::DbPool};
use crate::domain::{Auction, AuctionId, AuctionStatus, Bid, BidderId};
use crate::utils::errors::AuctionError;

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_AUCTION: &str = r#"
    SELECT id, seller_id, minimum_bid, end_time, current_price, winning_bidder, status, created_at
    FROM auctions
    WHERE id = ?
"#;

/// Persistent store for auctions and bids.
///
/// SQLite has no `SELECT ... FOR UPDATE`, so the exclusive row lock is a
/// keyed `tokio::sync::Mutex` per auction id paired with a transaction:
/// whoever holds the entry mutex owns the auction row until commit or drop.
/// The tokio mutex is fair, so contending writers are served in arrival
/// order.
pub struct AuctionStore {
    db: DbPool,
    row_locks: Mutex<HashMap<AuctionId, Arc<Mutex<()>>>>,
    lock_timeout: Duration,
}

impl AuctionStore {
    pub fn new(db: DbPool) -> Self {
        AuctionStore {
            db,
            row_locks: Mutex::new(HashMap::new()),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Overrides how long callers wait for a contended auction before the
    /// attempt is reported as a transient lock timeout.
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Loads an auction under its exclusive lock. The returned guard keeps
    /// both the lock and an open transaction; all writes through the guard
    /// become visible atomically on `commit`, and dropping the guard without
    /// committing rolls everything back.
    pub async fn find_for_update(&self, auction_id: &str) -> Result<AuctionGuard, AuctionError> {
        let cell = {
            let mut locks = self.row_locks.lock().await;
            locks.entry(auction_id.to_owned()).or_default().clone()
        };

        let row_lock = tokio::time::timeout(self.lock_timeout, cell.lock_owned())
            .await
            .map_err(|_| AuctionError::LockTimeout(auction_id.to_owned()))?;

        let mut tx = self.db.pool.begin().await.map_err(DatabaseError::from)?;

        let auction = sqlx::query_as::<_, Auction>(SELECT_AUCTION)
            .bind(auction_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DatabaseError::from)?
            .ok_or_else(|| AuctionError::AuctionNotFound(auction_id.to_owned()))?;

        debug!(auction_id, "acquired exclusive auction lock");

        Ok(AuctionGuard {
            auction,
            tx,
            _row_lock: row_lock,
        })
    }

    /// Inserts a freshly listed auction. Plain write, no lock needed: the id
    /// is unknown to anyone else until this returns.
    pub async fn insert_auction(&self, auction: &Auction) -> Result<(), AuctionError> {
        let query = r#"
            INSERT INTO auctions (id, seller_id, minimum_bid, end_time, current_price, winning_bidder, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#;

        sqlx::query(query)
            .bind(&auction.id)
            .bind(&auction.seller_id)
            .bind(auction.minimum_bid)
            .bind(auction.end_time)
            .bind(auction.current_price)
            .bind(&auction.winning_bidder)
            .bind(auction.status)
            .bind(auction.created_at)
            .execute(&self.db.pool)
            .await
            .map_err(DatabaseError::from)?;

        Ok(())
    }

    /// Unlocked point read.
    pub async fn get_auction(&self, auction_id: &str) -> Result<Auction, AuctionError> {
        sqlx::query_as::<_, Auction>(SELECT_AUCTION)
            .bind(auction_id)
            .fetch_optional(&self.db.pool)
            .await
            .map_err(DatabaseError::from)?
            .ok_or_else(|| AuctionError::AuctionNotFound(auction_id.to_owned()))
    }

    /// All bids for an auction, newest first. Read-only and unlocked.
    pub async fn bid_history(&self, auction_id: &str) -> Result<Vec<Bid>, AuctionError> {
        // Surface a typed error for unknown auctions instead of an empty list.
        self.get_auction(auction_id).await?;

        let query = r#"
            SELECT id, auction_id, bidder_id, amount, created_at
            FROM bids
            WHERE auction_id = ?
            ORDER BY created_at DESC, rowid DESC
        "#;

        let bids = sqlx::query_as::<_, Bid>(query)
            .bind(auction_id)
            .fetch_all(&self.db.pool)
            .await
            .map_err(DatabaseError::from)?;

        Ok(bids)
    }
}

/// Exclusive ownership of one auction row for the duration of one logical
/// operation. Holds the row lock and the open transaction.
pub struct AuctionGuard {
    auction: Auction,
    tx: Transaction<'static, Sqlite>,
    _row_lock: OwnedMutexGuard<()>,
}

impl AuctionGuard {
    pub fn auction(&self) -> &Auction {
        &self.auction
    }

    /// Persists an accepted bid row.
    pub async fn insert_bid(&mut self, bid: &Bid) -> Result<(), AuctionError> {
        let query = r#"
            INSERT INTO bids (id, auction_id, bidder_id, amount, created_at)
            VALUES (?, ?, ?, ?, ?)
        "#;

        sqlx::query(query)
            .bind(&bid.id)
            .bind(&bid.auction_id)
            .bind(&bid.bidder_id)
            .bind(bid.amount)
            .bind(bid.created_at)
            .execute(&mut *self.tx)
            .await
            .map_err(DatabaseError::from)?;

        Ok(())
    }

    /// Raises the standing price and winning bidder to the accepted bid.
    pub async fn apply_price(&mut self, amount: i64, bidder_id: &BidderId) -> Result<(), AuctionError> {
        let query = r#"
            UPDATE auctions SET current_price = ?, winning_bidder = ? WHERE id = ?
        "#;

        sqlx::query(query)
            .bind(amount)
            .bind(bidder_id)
            .bind(&self.auction.id)
            .execute(&mut *self.tx)
            .await
            .map_err(DatabaseError::from)?;

        self.auction.current_price = Some(amount);
        self.auction.winning_bidder = Some(bidder_id.clone());
        Ok(())
    }

    /// Transitions the auction to a terminal status. The `status = 'OPEN'`
    /// predicate keeps terminal states one-way at the SQL level as well.
    pub async fn set_status(&mut self, status: AuctionStatus) -> Result<(), AuctionError> {
        let query = r#"
            UPDATE auctions SET status = ? WHERE id = ? AND status = 'OPEN'
        "#;

        sqlx::query(query)
            .bind(status)
            .bind(&self.auction.id)
            .execute(&mut *self.tx)
            .await
            .map_err(DatabaseError::from)?;

        self.auction.status = status;
        Ok(())
    }

    /// Commits the transaction and releases the row lock, returning the
    /// auction as written.
    pub async fn commit(self) -> Result<Auction, AuctionError> {
        self.tx.commit().await.map_err(DatabaseError::from)?;
        Ok(self.auction)
    }
}
