//! Session Command Handlers - 会话持久化与恢复

use std::sync::Arc;

use crate::application::commands::session_commands::*;
use crate::application::error::ApplicationError;
use crate::application::ports::{
    PlaybackPort, SessionManagerPort, SessionRecord, SessionRepositoryPort,
};
use crate::application::services::GuildSessions;

/// PersistSessions Handler - 保存所有内存会话
pub struct PersistSessionsHandler {
    session_manager: Arc<dyn SessionManagerPort>,
    session_repo: Arc<dyn SessionRepositoryPort>,
    playback: Arc<dyn PlaybackPort>,
}

impl PersistSessionsHandler {
    pub fn new(
        session_manager: Arc<dyn SessionManagerPort>,
        session_repo: Arc<dyn SessionRepositoryPort>,
        playback: Arc<dyn PlaybackPort>,
    ) -> Self {
        Self {
            session_manager,
            session_repo,
            playback,
        }
    }

    pub async fn handle(
        &self,
        _cmd: PersistSessionsCommand,
    ) -> Result<PersistSessionsResponse, ApplicationError> {
        let mut resp = PersistSessionsResponse::default();

        for guild_id in self.session_manager.list_all() {
            let Ok(session) = self.session_manager.get(guild_id) else {
                continue;
            };
            let record = SessionRecord::from_session(&session, self.playback.is_active(guild_id));
            match self.session_repo.save(&record).await {
                Ok(()) => resp.saved += 1,
                Err(e) => {
                    tracing::error!(guild_id = %guild_id, error = %e, "Failed to persist session");
                    resp.failed += 1;
                }
            }
        }

        tracing::info!(saved = resp.saved, failed = resp.failed, "Sessions persisted");
        Ok(resp)
    }
}

/// RestoreSessions Handler - 启动时恢复会话
///
/// 模式与队列的恢复由 `GuildSessions::load` 完成，此处只负责续播
pub struct RestoreSessionsHandler {
    sessions: Arc<GuildSessions>,
    session_repo: Arc<dyn SessionRepositoryPort>,
    playback: Arc<dyn PlaybackPort>,
}

impl RestoreSessionsHandler {
    pub fn new(
        sessions: Arc<GuildSessions>,
        session_repo: Arc<dyn SessionRepositoryPort>,
        playback: Arc<dyn PlaybackPort>,
    ) -> Self {
        Self {
            sessions,
            session_repo,
            playback,
        }
    }

    pub async fn handle(
        &self,
        _cmd: RestoreSessionsCommand,
    ) -> Result<RestoreSessionsResponse, ApplicationError> {
        let mut resp = RestoreSessionsResponse::default();

        for record in self.session_repo.find_all().await? {
            let guild_id = record.guild_id;
            let load = self.sessions.load(guild_id).await?;
            if !load.restored {
                continue;
            }
            resp.restored += 1;
            resp.missing_songs += load.missing_songs;

            if load.resumable && self.playback.start(guild_id) {
                resp.resumed += 1;
            }
        }

        tracing::info!(
            restored = resp.restored,
            resumed = resp.resumed,
            missing_songs = resp.missing_songs,
            "Sessions restored"
        );
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::SongRepositoryPort;
    use crate::application::testing::{song, FakePlayer, FakeResolver, MusicFixture};
    use crate::domain::guild::GuildId;
    use crate::domain::playback::PlaybackMode;
    use crate::domain::song::SongKey;
    use chrono::Utc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_persist_then_restore() {
        let f = MusicFixture::new(FakeResolver::new(), FakePlayer::new(1, Duration::ZERO)).await;
        let guild = GuildId::new(3);
        for id in ["a", "b"] {
            f.song_repo.save(&song(id, 10)).await.unwrap();
        }
        f.guild_sessions.ensure(guild).await.unwrap();
        f.sessions
            .set_mode(guild, PlaybackMode::new(true, false))
            .unwrap();
        f.sessions.enqueue(guild, vec![song("a", 10), song("b", 10)]).unwrap();

        let persisted = PersistSessionsHandler::new(f.sessions.clone(), f.session_repo.clone(), f.playback.clone())
            .handle(PersistSessionsCommand)
            .await
            .unwrap();
        assert_eq!(persisted.saved, 1);

        f.sessions.close(guild).unwrap();
        let restored = RestoreSessionsHandler::new(
            f.guild_sessions.clone(),
            f.session_repo.clone(),
            f.playback.clone(),
        )
        .handle(RestoreSessionsCommand)
        .await
        .unwrap();

        assert_eq!(restored.restored, 1);
        assert_eq!(restored.resumed, 0);
        let session = f.sessions.get(guild).unwrap();
        assert_eq!(session.mode(), PlaybackMode::new(true, false));
        assert_eq!(session.selector.queue().len(), 2);
    }

    #[tokio::test]
    async fn test_restore_skips_unknown_songs_and_resumes_active() {
        let f = MusicFixture::new(FakeResolver::new(), FakePlayer::new(1, Duration::from_millis(5))).await;
        let guild = GuildId::new(4);
        f.song_repo.save(&song("known", 10)).await.unwrap();
        f.session_repo
            .save(&SessionRecord {
                guild_id: guild,
                mode: PlaybackMode::default(),
                active: true,
                queue: vec![SongKey::new("youtube", "known"), SongKey::new("youtube", "gone")],
                updated_at: Utc::now(),
            })
            .await
            .unwrap();

        let restored = RestoreSessionsHandler::new(
            f.guild_sessions.clone(),
            f.session_repo.clone(),
            f.playback.clone(),
        )
        .handle(RestoreSessionsCommand)
        .await
        .unwrap();

        assert_eq!(restored.restored, 1);
        assert_eq!(restored.missing_songs, 1);
        assert_eq!(restored.resumed, 1);
    }
}
