//! SQLite Song Repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::FromRow;

use super::DbPool;
use crate::application::ports::{RepositoryError, SongRepositoryPort};
use crate::domain::song::{SongInfo, SongKey};

/// SQLite Song Repository - 歌曲注册表
pub struct SqliteSongRepository {
    pool: DbPool,
}

impl SqliteSongRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
pub(super) struct SongRow {
    pub domain: String,
    pub id: String,
    pub duration: i64,
    pub title: String,
}

impl TryFrom<SongRow> for SongInfo {
    type Error = RepositoryError;

    fn try_from(row: SongRow) -> Result<Self, Self::Error> {
        let duration = u32::try_from(row.duration)
            .map_err(|_| RepositoryError::InvalidData(format!("duration {}", row.duration)))?;
        Ok(SongInfo::new(row.domain, row.id, duration, row.title))
    }
}

#[async_trait]
impl SongRepositoryPort for SqliteSongRepository {
    async fn save(&self, song: &SongInfo) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO songs (domain, id, duration, title, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(domain, id) DO UPDATE SET
                duration = excluded.duration,
                title = excluded.title
            "#,
        )
        .bind(&song.domain)
        .bind(&song.id)
        .bind(i64::from(song.duration))
        .bind(&song.title)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find(&self, key: &SongKey) -> Result<Option<SongInfo>, RepositoryError> {
        let row: Option<SongRow> = sqlx::query_as(
            "SELECT domain, id, duration, title FROM songs WHERE domain = ? AND id = ?",
        )
        .bind(&key.domain)
        .bind(&key.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(SongInfo::try_from).transpose()
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM songs")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(count as u64)
    }
}
