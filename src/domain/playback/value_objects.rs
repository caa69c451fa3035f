//! Playback Context - Value Objects

use serde::{Deserialize, Serialize};

/// 播放模式
///
/// 电台与随机播放相互独立，可同时开启
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackMode {
    pub shuffle: bool,
    pub radio: bool,
}

impl PlaybackMode {
    pub fn new(shuffle: bool, radio: bool) -> Self {
        Self { shuffle, radio }
    }
}

impl std::fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let order = if self.shuffle { "shuffle" } else { "queue" };
        if self.radio {
            write!(f, "{}+radio", order)
        } else {
            write!(f, "{}", order)
        }
    }
}

/// 会话播放状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// 没有播放任务
    #[default]
    Idle,
    /// 播放任务存活，等待听众
    Waiting,
    Playing,
    Paused,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Waiting => "waiting",
            Self::Playing => "playing",
            Self::Paused => "paused",
        }
    }

    /// 播放任务是否存活
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
