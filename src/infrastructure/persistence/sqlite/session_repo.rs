//! SQLite Session Repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::DbPool;
use crate::application::ports::{RepositoryError, SessionRecord, SessionRepositoryPort};
use crate::domain::guild::GuildId;
use crate::domain::playback::PlaybackMode;
use crate::domain::song::SongKey;

/// SQLite Session Repository
pub struct SqliteSessionRepository {
    pool: DbPool,
}

impl SqliteSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct SessionRow {
    guild_id: i64,
    shuffle: bool,
    radio: bool,
    active: bool,
    queue_json: String,
    updated_at: String,
}

impl TryFrom<SessionRow> for SessionRecord {
    type Error = RepositoryError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let queue: Vec<SongKey> = serde_json::from_str(&row.queue_json)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;
        Ok(SessionRecord {
            guild_id: GuildId::new(row.guild_id as u64),
            mode: PlaybackMode::new(row.shuffle, row.radio),
            active: row.active,
            queue,
            updated_at: DateTime::parse_from_rfc3339(&row.updated_at)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?
                .with_timezone(&Utc),
        })
    }
}

#[async_trait]
impl SessionRepositoryPort for SqliteSessionRepository {
    async fn save(&self, session: &SessionRecord) -> Result<(), RepositoryError> {
        let queue_json = serde_json::to_string(&session.queue)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO guild_sessions (guild_id, shuffle, radio, active, queue_json, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(session.guild_id.as_u64() as i64)
        .bind(session.mode.shuffle)
        .bind(session.mode.radio)
        .bind(session.active)
        .bind(queue_json)
        .bind(session.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find(&self, guild_id: GuildId) -> Result<Option<SessionRecord>, RepositoryError> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT guild_id, shuffle, radio, active, queue_json, updated_at FROM guild_sessions WHERE guild_id = ?",
        )
        .bind(guild_id.as_u64() as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(SessionRecord::try_from).transpose()
    }

    async fn find_all(&self) -> Result<Vec<SessionRecord>, RepositoryError> {
        let rows: Vec<SessionRow> = sqlx::query_as(
            "SELECT guild_id, shuffle, radio, active, queue_json, updated_at FROM guild_sessions ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(SessionRecord::try_from).collect()
    }

    async fn find_active(&self) -> Result<Vec<SessionRecord>, RepositoryError> {
        let rows: Vec<SessionRow> = sqlx::query_as(
            "SELECT guild_id, shuffle, radio, active, queue_json, updated_at FROM guild_sessions WHERE active = 1 ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(SessionRecord::try_from).collect()
    }

    async fn delete(&self, guild_id: GuildId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM guild_sessions WHERE guild_id = ?")
            .bind(guild_id.as_u64() as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}
