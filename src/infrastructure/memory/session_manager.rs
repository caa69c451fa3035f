//! In-Memory Session Manager Implementation

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;

use crate::application::ports::{Session, SessionError, SessionManagerPort};
use crate::domain::guild::{GuildConfig, GuildId};
use crate::domain::playback::{PlaybackMode, PlaybackState};
use crate::domain::song::{SongInfo, SongKey};

/// 内存会话管理器
pub struct InMemorySessionManager {
    sessions: DashMap<GuildId, Session>,
}

impl InMemorySessionManager {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn with_session<T>(
        &self,
        guild_id: GuildId,
        f: impl FnOnce(&mut Session) -> T,
    ) -> Result<T, SessionError> {
        let mut session = self
            .sessions
            .get_mut(&guild_id)
            .ok_or(SessionError::NotFound(guild_id))?;
        session.last_activity = Utc::now();
        Ok(f(&mut session))
    }
}

impl Default for InMemorySessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManagerPort for InMemorySessionManager {
    fn create(&self, session: Session) -> Result<(), SessionError> {
        let guild_id = session.guild_id;
        match self.sessions.entry(guild_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(SessionError::AlreadyExists(guild_id)),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(session);
                tracing::info!(guild_id = %guild_id, "Session created");
                Ok(())
            }
        }
    }

    fn get(&self, guild_id: GuildId) -> Result<Session, SessionError> {
        self.sessions
            .get(&guild_id)
            .map(|s| s.clone())
            .ok_or(SessionError::NotFound(guild_id))
    }

    fn exists(&self, guild_id: GuildId) -> bool {
        self.sessions.contains_key(&guild_id)
    }

    fn enqueue(&self, guild_id: GuildId, songs: Vec<SongInfo>) -> Result<(), SessionError> {
        self.with_session(guild_id, |session| {
            let count = songs.len();
            session.selector.enqueue(songs);
            tracing::debug!(
                guild_id = %guild_id,
                count,
                queue_len = session.selector.queue().len(),
                "Songs enqueued"
            );
        })
    }

    fn select_next(&self, guild_id: GuildId) -> Result<Option<SongInfo>, SessionError> {
        self.with_session(guild_id, |session| {
            let interval = session.config.min_repeat_interval() as usize;
            let mut rng = rand::thread_rng();
            let Session {
                selector, song_set, ..
            } = session;
            selector.select_next(song_set, interval, &mut rng)
        })
    }

    fn requeue_current(&self, guild_id: GuildId) -> Result<Option<SongKey>, SessionError> {
        self.with_session(guild_id, |session| session.selector.requeue_current())
    }

    fn set_mode(&self, guild_id: GuildId, mode: PlaybackMode) -> Result<(), SessionError> {
        self.with_session(guild_id, |session| {
            session.selector.set_mode(mode);
            tracing::debug!(guild_id = %guild_id, mode = %mode, "Playback mode updated");
        })
    }

    fn set_state(&self, guild_id: GuildId, state: PlaybackState) -> Result<(), SessionError> {
        self.with_session(guild_id, |session| {
            session.state = state;
        })
    }

    fn clear_queue(&self, guild_id: GuildId) -> Result<(), SessionError> {
        self.with_session(guild_id, |session| session.selector.clear_queue())
    }

    fn reset(&self, guild_id: GuildId) -> Result<(), SessionError> {
        self.with_session(guild_id, |session| session.selector.clear())
    }

    fn set_config(&self, guild_id: GuildId, config: GuildConfig) -> Result<(), SessionError> {
        self.with_session(guild_id, |session| session.config = config)
    }

    fn add_to_set(&self, guild_id: GuildId, song: SongInfo) -> Result<bool, SessionError> {
        self.with_session(guild_id, |session| session.song_set.add(song))
    }

    fn touch(&self, guild_id: GuildId) {
        if let Some(mut session) = self.sessions.get_mut(&guild_id) {
            session.last_activity = Utc::now();
        }
    }

    fn get_expired_sessions(&self, idle_timeout_secs: u64) -> Vec<GuildId> {
        let now = Utc::now();
        let timeout = chrono::Duration::seconds(idle_timeout_secs as i64);

        self.sessions
            .iter()
            .filter_map(|entry| {
                let elapsed = now - entry.last_activity;
                if entry.state == PlaybackState::Idle && elapsed > timeout {
                    Some(*entry.key())
                } else {
                    None
                }
            })
            .collect()
    }

    fn list_all(&self) -> Vec<GuildId> {
        self.sessions.iter().map(|e| *e.key()).collect()
    }

    fn close(&self, guild_id: GuildId) -> Result<(), SessionError> {
        self.sessions
            .remove(&guild_id)
            .map(|_| {
                tracing::info!(guild_id = %guild_id, "Session closed");
            })
            .ok_or(SessionError::NotFound(guild_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::song::SongSet;

    fn song(id: &str) -> SongInfo {
        SongInfo::new("youtube", id, 100, id)
    }

    fn manager_with(guild_id: GuildId) -> InMemorySessionManager {
        let manager = InMemorySessionManager::new();
        manager
            .create(Session::new(guild_id, GuildConfig::default(), SongSet::new()))
            .unwrap();
        manager
    }

    #[test]
    fn test_session_lifecycle() {
        let guild = GuildId::new(1);
        let manager = manager_with(guild);

        assert!(matches!(
            manager.create(Session::new(guild, GuildConfig::default(), SongSet::new())),
            Err(SessionError::AlreadyExists(_))
        ));
        assert!(manager.exists(guild));

        manager.enqueue(guild, vec![song("a"), song("b")]).unwrap();
        let snapshot = manager.get(guild).unwrap();
        assert_eq!(snapshot.selector.queue().len(), 2);

        assert_eq!(manager.select_next(guild).unwrap().unwrap().id, "a");
        assert_eq!(manager.get(guild).unwrap().current().unwrap().id, "a");

        manager.close(guild).unwrap();
        assert!(!manager.exists(guild));
        assert!(matches!(manager.get(guild), Err(SessionError::NotFound(_))));
    }

    #[test]
    fn test_radio_uses_guild_set() {
        let guild = GuildId::new(1);
        let manager = manager_with(guild);
        assert!(manager.add_to_set(guild, song("r")).unwrap());
        assert!(!manager.add_to_set(guild, song("r")).unwrap());

        assert!(manager.select_next(guild).unwrap().is_none());
        manager.set_mode(guild, PlaybackMode::new(false, true)).unwrap();
        assert_eq!(manager.select_next(guild).unwrap().unwrap().id, "r");
    }

    #[test]
    fn test_reset_clears_mode_and_queue() {
        let guild = GuildId::new(1);
        let manager = manager_with(guild);
        manager.set_mode(guild, PlaybackMode::new(true, true)).unwrap();
        manager.enqueue(guild, vec![song("a")]).unwrap();

        manager.reset(guild).unwrap();
        let session = manager.get(guild).unwrap();
        assert_eq!(session.mode(), PlaybackMode::default());
        assert!(session.selector.queue().is_empty());
    }

    #[test]
    fn test_only_idle_sessions_expire() {
        let idle = GuildId::new(1);
        let playing = GuildId::new(2);
        let manager = manager_with(idle);
        manager
            .create(Session::new(playing, GuildConfig::default(), SongSet::new()))
            .unwrap();
        manager.set_state(playing, PlaybackState::Playing).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(1100));
        let expired = manager.get_expired_sessions(0);
        assert_eq!(expired, vec![idle]);
    }
}
