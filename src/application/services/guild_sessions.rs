//! Guild Sessions - 按需加载服务器会话

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{
    GuildRepositoryPort, Session, SessionError, SessionManagerPort, SessionRepositoryPort,
    SongRepositoryPort,
};
use crate::domain::guild::{GuildConfig, GuildId};
use crate::domain::song::SongSet;

/// 会话加载结果
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionLoad {
    /// 本次调用新建了会话
    pub created: bool,
    /// 新会话从保存的记录恢复了模式与队列
    pub restored: bool,
    /// 保存时播放任务仍在运行
    pub resumable: bool,
    /// 注册表中已不存在的排队歌曲数
    pub missing_songs: usize,
}

/// 服务器会话加载器
///
/// 首次访问时从仓储加载配置、歌单以及上次保存的模式和队列
pub struct GuildSessions {
    session_manager: Arc<dyn SessionManagerPort>,
    guild_repo: Arc<dyn GuildRepositoryPort>,
    session_repo: Arc<dyn SessionRepositoryPort>,
    song_repo: Arc<dyn SongRepositoryPort>,
    defaults: GuildConfig,
}

impl GuildSessions {
    pub fn new(
        session_manager: Arc<dyn SessionManagerPort>,
        guild_repo: Arc<dyn GuildRepositoryPort>,
        session_repo: Arc<dyn SessionRepositoryPort>,
        song_repo: Arc<dyn SongRepositoryPort>,
        defaults: GuildConfig,
    ) -> Self {
        Self {
            session_manager,
            guild_repo,
            session_repo,
            song_repo,
            defaults,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn manager(&self) -> &Arc<dyn SessionManagerPort> {
        &self.session_manager
    }

    pub fn defaults(&self) -> &GuildConfig {
        &self.defaults
    }

    /// 确保会话存在
    pub async fn ensure(&self, guild_id: GuildId) -> Result<(), ApplicationError> {
        self.load(guild_id).await.map(|_| ())
    }

    /// 加载会话；会话已在内存中时不做任何改动
    pub async fn load(&self, guild_id: GuildId) -> Result<SessionLoad, ApplicationError> {
        let mut load = SessionLoad::default();
        if self.session_manager.exists(guild_id) {
            return Ok(load);
        }

        let config = self
            .guild_repo
            .load_config(guild_id)
            .await?
            .unwrap_or_else(|| self.defaults.clone());
        let song_set = SongSet::from_songs(self.guild_repo.load_set(guild_id).await?);
        let set_size = song_set.len();
        let mut session = Session::new(guild_id, config, song_set);

        if let Some(record) = self.session_repo.find(guild_id).await? {
            let mut queue = Vec::with_capacity(record.queue.len());
            for key in &record.queue {
                match self.song_repo.find(key).await? {
                    Some(song) => queue.push(song),
                    None => {
                        tracing::warn!(guild_id = %guild_id, song = %key, "Queued song missing from registry, skipping");
                        load.missing_songs += 1;
                    }
                }
            }
            session.selector.set_mode(record.mode);
            session.selector.enqueue(queue);
            load.restored = true;
            load.resumable = record.active;
        }
        let queue_len = session.selector.queue().len();

        match self.session_manager.create(session) {
            Ok(()) => {
                load.created = true;
                tracing::info!(
                    guild_id = %guild_id,
                    set_size,
                    queue_len,
                    restored = load.restored,
                    "Guild session loaded"
                );
                Ok(load)
            }
            Err(SessionError::AlreadyExists(_)) => Ok(SessionLoad::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::SessionRecord;
    use crate::application::testing::{song, FakePlayer, FakeResolver, MusicFixture};
    use crate::domain::playback::PlaybackMode;
    use crate::domain::song::SongKey;
    use chrono::Utc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_load_without_record_uses_defaults() {
        let f = MusicFixture::new(FakeResolver::new(), FakePlayer::new(1, Duration::ZERO)).await;
        let guild = GuildId::new(11);

        let load = f.guild_sessions.load(guild).await.unwrap();
        assert!(load.created);
        assert!(!load.restored);

        let session = f.sessions.get(guild).unwrap();
        assert_eq!(session.mode(), PlaybackMode::default());
        assert!(session.selector.queue().is_empty());

        let again = f.guild_sessions.load(guild).await.unwrap();
        assert_eq!(again, SessionLoad::default());
    }

    #[tokio::test]
    async fn test_load_applies_saved_record() {
        let f = MusicFixture::new(FakeResolver::new(), FakePlayer::new(1, Duration::ZERO)).await;
        let guild = GuildId::new(12);
        f.song_repo.save(&song("a", 10)).await.unwrap();
        f.session_repo
            .save(&SessionRecord {
                guild_id: guild,
                mode: PlaybackMode::new(false, true),
                active: true,
                queue: vec![SongKey::new("youtube", "a"), SongKey::new("youtube", "gone")],
                updated_at: Utc::now(),
            })
            .await
            .unwrap();

        let load = f.guild_sessions.load(guild).await.unwrap();
        assert!(load.created && load.restored && load.resumable);
        assert_eq!(load.missing_songs, 1);

        let session = f.sessions.get(guild).unwrap();
        assert_eq!(session.mode(), PlaybackMode::new(false, true));
        assert_eq!(
            session.selector.queue().keys(),
            vec![SongKey::new("youtube", "a")]
        );
    }
}
