//! Session Player - 服务器播放循环

use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use crate::application::ports::{
    AudioPlayerPort, PlaybackControl, PlaybackError, PlaybackPort, SessionManagerPort,
};
use crate::application::services::AudioSourceService;
use crate::domain::guild::GuildId;
use crate::domain::playback::PlaybackState;
use crate::domain::song::SongInfo;
use crate::infrastructure::events::EventPublisher;

type Runners = DashMap<GuildId, mpsc::Sender<PlaybackControl>>;

/// 播放器配置
#[derive(Debug, Clone)]
pub struct SessionPlayerConfig {
    /// 连续失败多少首后停止播放
    pub max_consecutive_failures: u32,
    /// 没有听众时是否暂停选曲
    pub require_listeners: bool,
    /// 每个服务器音频广播通道容量（块数）
    pub channel_capacity: usize,
}

impl Default for SessionPlayerConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 3,
            require_listeners: true,
            channel_capacity: 256,
        }
    }
}

/// 服务器播放器
///
/// - 广播通道按服务器创建，播放任务重启后听众保持连接
/// - 播放任务句柄在任务结束时移除
pub struct SessionPlayer {
    config: SessionPlayerConfig,
    session_manager: Arc<dyn SessionManagerPort>,
    audio_source: Arc<AudioSourceService>,
    player: Arc<dyn AudioPlayerPort>,
    event_publisher: Arc<EventPublisher>,
    channels: DashMap<GuildId, broadcast::Sender<Bytes>>,
    runners: Arc<Runners>,
}

impl SessionPlayer {
    pub fn new(
        config: SessionPlayerConfig,
        session_manager: Arc<dyn SessionManagerPort>,
        audio_source: Arc<AudioSourceService>,
        player: Arc<dyn AudioPlayerPort>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            config,
            session_manager,
            audio_source,
            player,
            event_publisher,
            channels: DashMap::new(),
            runners: Arc::new(DashMap::new()),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn content_type(&self) -> &'static str {
        self.player.content_type()
    }

    fn audio_channel(&self, guild_id: GuildId) -> broadcast::Sender<Bytes> {
        self.channels
            .entry(guild_id)
            .or_insert_with(|| broadcast::channel(self.config.channel_capacity.max(1)).0)
            .clone()
    }

    fn send(&self, guild_id: GuildId, control: PlaybackControl) -> Result<(), PlaybackError> {
        let sender = self
            .runners
            .get(&guild_id)
            .map(|r| r.clone())
            .ok_or(PlaybackError::NotActive(guild_id))?;
        sender
            .try_send(control)
            .map_err(|_| PlaybackError::NotActive(guild_id))
    }
}

impl PlaybackPort for SessionPlayer {
    fn start(&self, guild_id: GuildId) -> bool {
        let (control_tx, control_rx) = mpsc::channel(16);
        match self.runners.entry(guild_id) {
            Entry::Occupied(entry) if !entry.get().is_closed() => return false,
            Entry::Occupied(mut entry) => {
                entry.insert(control_tx.clone());
            }
            Entry::Vacant(entry) => {
                entry.insert(control_tx.clone());
            }
        }

        let runner = Runner {
            guild_id,
            config: self.config.clone(),
            session_manager: self.session_manager.clone(),
            audio_source: self.audio_source.clone(),
            player: self.player.clone(),
            event_publisher: self.event_publisher.clone(),
            audio_tx: self.audio_channel(guild_id),
            control_tx,
            control_rx,
            runners: self.runners.clone(),
        };
        tokio::spawn(runner.run());
        tracing::info!(guild_id = %guild_id, "Playback task started");
        true
    }

    fn is_active(&self, guild_id: GuildId) -> bool {
        self.runners
            .get(&guild_id)
            .map(|r| !r.is_closed())
            .unwrap_or(false)
    }

    fn skip(&self, guild_id: GuildId) -> Result<(), PlaybackError> {
        self.send(guild_id, PlaybackControl::Skip)
    }

    fn pause(&self, guild_id: GuildId) -> Result<(), PlaybackError> {
        self.send(guild_id, PlaybackControl::Pause)
    }

    fn resume(&self, guild_id: GuildId) -> Result<(), PlaybackError> {
        self.send(guild_id, PlaybackControl::Resume)
    }

    fn stop(&self, guild_id: GuildId) -> Result<(), PlaybackError> {
        let (_, sender) = self
            .runners
            .remove(&guild_id)
            .ok_or(PlaybackError::NotActive(guild_id))?;
        let _ = sender.try_send(PlaybackControl::Stop);
        tracing::info!(guild_id = %guild_id, "Playback task stopping");
        Ok(())
    }

    fn subscribe(&self, guild_id: GuildId) -> broadcast::Receiver<Bytes> {
        let receiver = self.audio_channel(guild_id).subscribe();
        let _ = self.send(guild_id, PlaybackControl::Wake);
        tracing::debug!(
            guild_id = %guild_id,
            listeners = self.listener_count(guild_id),
            "Listener attached"
        );
        receiver
    }

    fn listener_count(&self, guild_id: GuildId) -> usize {
        self.channels
            .get(&guild_id)
            .map(|c| c.receiver_count())
            .unwrap_or(0)
    }
}

/// 单首歌曲的结束方式
enum TrackEnd {
    Finished,
    Skipped,
    Stopped,
    Failed(String),
}

/// 单个服务器的播放任务
struct Runner {
    guild_id: GuildId,
    config: SessionPlayerConfig,
    session_manager: Arc<dyn SessionManagerPort>,
    audio_source: Arc<AudioSourceService>,
    player: Arc<dyn AudioPlayerPort>,
    event_publisher: Arc<EventPublisher>,
    audio_tx: broadcast::Sender<Bytes>,
    control_tx: mpsc::Sender<PlaybackControl>,
    control_rx: mpsc::Receiver<PlaybackControl>,
    runners: Arc<Runners>,
}

impl Runner {
    async fn run(mut self) {
        let mut failures = 0u32;

        loop {
            if self.config.require_listeners && self.audio_tx.receiver_count() == 0 {
                self.set_state(PlaybackState::Waiting);
                tracing::debug!(guild_id = %self.guild_id, "Waiting for listeners");
                match self.control_rx.recv().await {
                    Some(PlaybackControl::Stop) | None => break,
                    Some(_) => continue,
                }
            }

            let song = match self.next_song() {
                Some(song) => song,
                None => {
                    tracing::info!(guild_id = %self.guild_id, "Nothing left to play");
                    break;
                }
            };

            match self.play(&song).await {
                TrackEnd::Finished | TrackEnd::Skipped => failures = 0,
                TrackEnd::Stopped => {
                    // 被打断的歌曲放回队首，下次启动时继续
                    if let Ok(Some(key)) = self.session_manager.requeue_current(self.guild_id) {
                        tracing::debug!(guild_id = %self.guild_id, song = %key, "Interrupted track requeued");
                    }
                    break;
                }
                TrackEnd::Failed(error) => {
                    failures += 1;
                    tracing::warn!(
                        guild_id = %self.guild_id,
                        song = %song.key(),
                        failures,
                        error = %error,
                        "Track failed"
                    );
                    self.event_publisher
                        .publish_track_failed(self.guild_id, &song, &error);
                    if failures >= self.config.max_consecutive_failures.max(1) {
                        tracing::error!(
                            guild_id = %self.guild_id,
                            failures,
                            "Too many consecutive failures, stopping playback"
                        );
                        break;
                    }
                }
            }
        }

        self.finish();
    }

    /// 选择下一首；队列为空时在同一锁内注销任务，避免与 start 竞争
    ///
    /// 任务已被 stop 注销时不再选曲
    fn next_song(&self) -> Option<SongInfo> {
        let entry = self.runners.entry(self.guild_id);
        match &entry {
            Entry::Occupied(owner) if owner.get().same_channel(&self.control_tx) => {}
            _ => return None,
        }
        match self.session_manager.select_next(self.guild_id) {
            Ok(Some(song)) => Some(song),
            Ok(None) | Err(_) => {
                if let Entry::Occupied(entry) = entry {
                    if entry.get().same_channel(&self.control_tx) {
                        entry.remove();
                    }
                }
                None
            }
        }
    }

    async fn play(&mut self, song: &SongInfo) -> TrackEnd {
        let config = match self.session_manager.get(self.guild_id) {
            Ok(session) => session.config,
            Err(e) => return TrackEnd::Failed(e.to_string()),
        };
        let source = match self.audio_source.audio_source(song, &config).await {
            Ok(source) => source,
            Err(e) => return TrackEnd::Failed(e.to_string()),
        };
        let mut stream = match self.player.open(&source).await {
            Ok(stream) => stream,
            Err(e) => return TrackEnd::Failed(e.to_string()),
        };

        self.set_state(PlaybackState::Playing);
        self.event_publisher
            .publish_track_started(self.guild_id, song, source.is_cached());
        tracing::info!(
            guild_id = %self.guild_id,
            song = %song.key(),
            title = %song.title,
            cached = source.is_cached(),
            "Now playing"
        );

        let mut paused = false;
        loop {
            if paused {
                match self.control_rx.recv().await {
                    Some(PlaybackControl::Resume) => {
                        paused = false;
                        self.set_state(PlaybackState::Playing);
                    }
                    Some(PlaybackControl::Skip) => return TrackEnd::Skipped,
                    Some(PlaybackControl::Stop) | None => return TrackEnd::Stopped,
                    Some(PlaybackControl::Pause) | Some(PlaybackControl::Wake) => {}
                }
                continue;
            }

            tokio::select! {
                control = self.control_rx.recv() => match control {
                    Some(PlaybackControl::Skip) => {
                        tracing::debug!(guild_id = %self.guild_id, song = %song.key(), "Track skipped");
                        return TrackEnd::Skipped;
                    }
                    Some(PlaybackControl::Stop) | None => return TrackEnd::Stopped,
                    Some(PlaybackControl::Pause) => {
                        paused = true;
                        self.set_state(PlaybackState::Paused);
                    }
                    Some(PlaybackControl::Resume) | Some(PlaybackControl::Wake) => {}
                },
                chunk = stream.next() => match chunk {
                    // 没有听众时发送失败，歌曲照常推进
                    Some(Ok(bytes)) => {
                        let _ = self.audio_tx.send(bytes);
                    }
                    Some(Err(e)) => return TrackEnd::Failed(e.to_string()),
                    None => return TrackEnd::Finished,
                },
            }
        }
    }

    fn set_state(&self, state: PlaybackState) {
        if self.session_manager.set_state(self.guild_id, state).is_ok() {
            self.event_publisher.publish_state(self.guild_id, state);
        }
    }

    /// 注销任务；句柄已被新任务替换时不改动会话状态
    fn finish(&self) {
        let owned = match self.runners.entry(self.guild_id) {
            Entry::Occupied(entry) if entry.get().same_channel(&self.control_tx) => {
                entry.remove();
                true
            }
            Entry::Occupied(_) => false,
            Entry::Vacant(_) => true,
        };
        if owned {
            self.set_state(PlaybackState::Idle);
        }
        tracing::info!(guild_id = %self.guild_id, "Playback task finished");
    }
}
