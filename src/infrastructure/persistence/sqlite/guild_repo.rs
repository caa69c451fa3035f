//! SQLite Guild Repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::FromRow;

use super::song_repo::SongRow;
use super::DbPool;
use crate::application::ports::{GuildRepositoryPort, RepositoryError};
use crate::domain::guild::{GuildConfig, GuildId};
use crate::domain::song::{SongInfo, SongKey};

/// SQLite Guild Repository - 服务器歌单与配置
pub struct SqliteGuildRepository {
    pool: DbPool,
}

impl SqliteGuildRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct GuildConfigRow {
    min_repeat_interval: i64,
    max_cached_duration: i64,
}

impl TryFrom<GuildConfigRow> for GuildConfig {
    type Error = RepositoryError;

    fn try_from(row: GuildConfigRow) -> Result<Self, Self::Error> {
        let interval = u32::try_from(row.min_repeat_interval).map_err(|_| {
            RepositoryError::InvalidData(format!("min_repeat_interval {}", row.min_repeat_interval))
        })?;
        GuildConfig::new(interval, row.max_cached_duration)
            .map_err(|e| RepositoryError::InvalidData(e.to_string()))
    }
}

fn db_guild_id(guild_id: GuildId) -> i64 {
    guild_id.as_u64() as i64
}

#[async_trait]
impl GuildRepositoryPort for SqliteGuildRepository {
    async fn add_to_set(&self, guild_id: GuildId, key: &SongKey) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO guild_songs (guild_id, domain, id, added_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(db_guild_id(guild_id))
        .bind(&key.domain)
        .bind(&key.id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn load_set(&self, guild_id: GuildId) -> Result<Vec<SongInfo>, RepositoryError> {
        let rows: Vec<SongRow> = sqlx::query_as(
            r#"
            SELECT s.domain, s.id, s.duration, s.title
            FROM guild_songs g
            JOIN songs s ON s.domain = g.domain AND s.id = g.id
            WHERE g.guild_id = ?
            ORDER BY g.added_at
            "#,
        )
        .bind(db_guild_id(guild_id))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(SongInfo::try_from).collect()
    }

    async fn set_size(&self, guild_id: GuildId) -> Result<u64, RepositoryError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM guild_songs WHERE guild_id = ?")
                .bind(db_guild_id(guild_id))
                .fetch_one(&self.pool)
                .await
                .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(count as u64)
    }

    async fn load_config(&self, guild_id: GuildId) -> Result<Option<GuildConfig>, RepositoryError> {
        let row: Option<GuildConfigRow> = sqlx::query_as(
            "SELECT min_repeat_interval, max_cached_duration FROM guild_configs WHERE guild_id = ?",
        )
        .bind(db_guild_id(guild_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(GuildConfig::try_from).transpose()
    }

    async fn save_config(&self, guild_id: GuildId, config: &GuildConfig) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO guild_configs (guild_id, min_repeat_interval, max_cached_duration, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(guild_id) DO UPDATE SET
                min_repeat_interval = excluded.min_repeat_interval,
                max_cached_duration = excluded.max_cached_duration,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(db_guild_id(guild_id))
        .bind(i64::from(config.min_repeat_interval()))
        .bind(config.max_cached_duration())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::SongRepositoryPort;
    use crate::infrastructure::persistence::sqlite::{
        create_pool, run_migrations, DatabaseConfig, SqliteSongRepository,
    };

    async fn repos() -> (SqliteSongRepository, SqliteGuildRepository) {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        (
            SqliteSongRepository::new(pool.clone()),
            SqliteGuildRepository::new(pool),
        )
    }

    #[tokio::test]
    async fn test_guild_set_membership() {
        let (songs, guilds) = repos().await;
        let guild = GuildId::new(42);
        let song = SongInfo::new("youtube", "abc", 60, "Song");
        songs.save(&song).await.unwrap();

        assert!(guilds.add_to_set(guild, &song.key()).await.unwrap());
        assert!(!guilds.add_to_set(guild, &song.key()).await.unwrap());
        assert_eq!(guilds.set_size(guild).await.unwrap(), 1);
        assert_eq!(guilds.set_size(GuildId::new(7)).await.unwrap(), 0);

        let set = guilds.load_set(guild).await.unwrap();
        assert_eq!(set, vec![song]);
    }

    #[tokio::test]
    async fn test_guild_config_roundtrip() {
        let (_, guilds) = repos().await;
        let guild = GuildId::new(42);
        assert!(guilds.load_config(guild).await.unwrap().is_none());

        let config = GuildConfig::new(8, -1).unwrap();
        guilds.save_config(guild, &config).await.unwrap();
        assert_eq!(guilds.load_config(guild).await.unwrap(), Some(config));

        let updated = GuildConfig::new(16, 300).unwrap();
        guilds.save_config(guild, &updated).await.unwrap();
        assert_eq!(guilds.load_config(guild).await.unwrap(), Some(updated));
    }
}
