//! Event Publisher Implementation
//!
//! WebSocket 事件推送实现

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::application::ports::{CacheTask, CacheTaskState};
use crate::domain::guild::GuildId;
use crate::domain::playback::{PlaybackMode, PlaybackState};
use crate::domain::song::SongInfo;

/// WebSocket 事件类型
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum WsEvent {
    /// 缓存任务状态变更
    CacheTaskChanged {
        task_id: String,
        cache_key: String,
        title: String,
        state: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// 开始播放歌曲
    TrackStarted {
        guild_id: GuildId,
        song: SongInfo,
        cached: bool,
    },
    /// 歌曲播放失败
    TrackFailed {
        guild_id: GuildId,
        song: SongInfo,
        error: String,
    },
    /// 播放状态变更
    PlaybackStateChanged {
        guild_id: GuildId,
        state: PlaybackState,
    },
    /// 队列更新
    QueueUpdated {
        guild_id: GuildId,
        added: usize,
        queue_len: usize,
        queue_duration: u64,
    },
    /// 播放模式变更
    ModeChanged {
        guild_id: GuildId,
        mode: PlaybackMode,
    },
    /// 会话关闭
    SessionClosed {
        guild_id: GuildId,
        reason: String,
    },
}

/// 事件发布器
pub struct EventPublisher {
    /// guild_id -> broadcast sender (for guild-specific events)
    guild_channels: DashMap<GuildId, broadcast::Sender<WsEvent>>,
    /// Global broadcast channel for cache events
    global_channel: broadcast::Sender<WsEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (global_tx, _) = broadcast::channel(100);
        Self {
            guild_channels: DashMap::new(),
            global_channel: global_tx,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅全局事件（缓存任务）
    pub fn subscribe_global(&self) -> broadcast::Receiver<WsEvent> {
        self.global_channel.subscribe()
    }

    /// 订阅服务器事件，通道不存在时创建
    pub fn subscribe_guild(&self, guild_id: GuildId) -> broadcast::Receiver<WsEvent> {
        self.guild_channels
            .entry(guild_id)
            .or_insert_with(|| broadcast::channel(100).0)
            .subscribe()
    }

    /// 取消注册服务器通道
    pub fn unregister_guild(&self, guild_id: GuildId) {
        self.guild_channels.remove(&guild_id);
    }

    /// 发布缓存任务状态（全局广播）
    pub fn publish_cache_task(&self, task: &CacheTask) {
        self.publish_cache_state(task, task.state, task.error_message.clone());
    }

    /// 发布缓存任务指定状态（全局广播）
    pub fn publish_cache_state(
        &self,
        task: &CacheTask,
        state: CacheTaskState,
        error: Option<String>,
    ) {
        let event = WsEvent::CacheTaskChanged {
            task_id: task.task_id.clone(),
            cache_key: task.cache_key.clone(),
            title: task.song.title.clone(),
            state: state.as_str().to_string(),
            error,
        };
        if let Err(e) = self.global_channel.send(event) {
            tracing::debug!(
                cache_key = %task.cache_key,
                error = %e,
                "Failed to publish CacheTaskChanged event (no receivers)"
            );
        }
    }

    pub fn publish_track_started(&self, guild_id: GuildId, song: &SongInfo, cached: bool) {
        self.publish_to_guild(
            guild_id,
            WsEvent::TrackStarted {
                guild_id,
                song: song.clone(),
                cached,
            },
        );
    }

    pub fn publish_track_failed(&self, guild_id: GuildId, song: &SongInfo, error: &str) {
        self.publish_to_guild(
            guild_id,
            WsEvent::TrackFailed {
                guild_id,
                song: song.clone(),
                error: error.to_string(),
            },
        );
    }

    pub fn publish_state(&self, guild_id: GuildId, state: PlaybackState) {
        self.publish_to_guild(guild_id, WsEvent::PlaybackStateChanged { guild_id, state });
    }

    pub fn publish_queue_updated(
        &self,
        guild_id: GuildId,
        added: usize,
        queue_len: usize,
        queue_duration: u64,
    ) {
        self.publish_to_guild(
            guild_id,
            WsEvent::QueueUpdated {
                guild_id,
                added,
                queue_len,
                queue_duration,
            },
        );
    }

    pub fn publish_mode_changed(&self, guild_id: GuildId, mode: PlaybackMode) {
        self.publish_to_guild(guild_id, WsEvent::ModeChanged { guild_id, mode });
    }

    /// 发布会话关闭事件
    pub fn publish_session_closed(&self, guild_id: GuildId, reason: &str) {
        self.publish_to_guild(
            guild_id,
            WsEvent::SessionClosed {
                guild_id,
                reason: reason.to_string(),
            },
        );
    }

    /// 发布事件到指定服务器
    fn publish_to_guild(&self, guild_id: GuildId, event: WsEvent) {
        if let Some(sender) = self.guild_channels.get(&guild_id) {
            if let Err(e) = sender.send(event) {
                tracing::debug!(
                    guild_id = %guild_id,
                    error = %e,
                    "Failed to publish event (no receivers)"
                );
            }
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
