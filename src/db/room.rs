//! Durable room records.
//!
//! Live rooms exist only in memory; this table remembers which room ids were
//! created so they can be required on join and listed across restarts.

use sqlx::SqlitePool;

use crate::Result;

/// A recorded room.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RoomRecord {
    pub room_id: String,
    pub created_by: Option<i64>,
    pub created_at: String,
}

/// Repository for room records.
pub struct RoomRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> RoomRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a room.
    ///
    /// Returns false if a room with that id is already recorded.
    pub async fn create(&self, room_id: &str, created_by: Option<i64>) -> Result<bool> {
        let result = sqlx::query("INSERT OR IGNORE INTO rooms (room_id, created_by) VALUES (?, ?)")
            .bind(room_id)
            .bind(created_by)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Check whether a room is recorded.
    pub async fn exists(&self, room_id: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM rooms WHERE room_id = ?)")
                .bind(room_id)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// List all recorded rooms ordered by id.
    pub async fn list(&self) -> Result<Vec<RoomRecord>> {
        let records = sqlx::query_as::<_, RoomRecord>(
            "SELECT room_id, created_by, created_at FROM rooms ORDER BY room_id",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(records)
    }
}
