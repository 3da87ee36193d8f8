use sqlx::{migrate::Migrator, sqlite::SqlitePoolOptions, Pool, Sqlite};

use crate::db::errors::DatabaseError;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Clone)]
pub struct DbPool {
    pub pool: Pool<Sqlite>,
}

impl DbPool {
    pub async fn new(database_url: &str) -> Result<DbPool, DatabaseError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        // Run the migrations
        MIGRATOR.run(&pool).await?;

        Ok(DbPool { pool })
    }

    /// An in-memory database on a single connection. With more connections,
    /// every pooled connection of `sqlite::memory:` would see its own empty
    /// database.
    pub async fn in_memory() -> Result<DbPool, DatabaseError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        MIGRATOR.run(&pool).await?;

        Ok(DbPool { pool })
    }
}
