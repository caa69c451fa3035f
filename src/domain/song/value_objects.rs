//! Song Context - Value Objects

use serde::{Deserialize, Serialize};

use super::SongError;

/// 缓存音频文件扩展名
pub const SONG_EXTENSION: &str = "opus";

/// 歌曲唯一标识 - (来源域, 域内 ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SongKey {
    pub domain: String,
    pub id: String,
}

impl SongKey {
    pub fn new(domain: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for SongKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.domain, self.id)
    }
}

/// 歌曲元数据
///
/// 不变量:
/// - (domain, id) 唯一标识一首歌
/// - duration 单位为秒
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongInfo {
    pub domain: String,
    pub id: String,
    pub duration: u32,
    pub title: String,
}

impl SongInfo {
    pub fn new(
        domain: impl Into<String>,
        id: impl Into<String>,
        duration: u32,
        title: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            id: id.into(),
            duration,
            title: title.into(),
        }
    }

    pub fn key(&self) -> SongKey {
        SongKey::new(self.domain.clone(), self.id.clone())
    }

    /// 归一化后的缓存文件名
    pub fn filename(&self) -> String {
        format!("{}_{}.{}", self.domain, self.id, SONG_EXTENSION)
    }

    /// 歌曲页面链接，仅支持已知来源域
    pub fn link(&self) -> Result<String, SongError> {
        link_for(&self.domain, &self.id)
    }

    /// Markdown 格式的可点击标题
    pub fn pretty_link(&self) -> Result<String, SongError> {
        Ok(format!("[{}]({})", self.title, self.link()?))
    }
}

/// 检查来源域是否可生成链接
pub fn is_known_domain(domain: &str) -> bool {
    matches!(domain, "youtube")
}

fn link_for(domain: &str, id: &str) -> Result<String, SongError> {
    match domain {
        "youtube" => Ok(format!("https://www.youtube.com/watch?v={}", id)),
        other => Err(SongError::UnsupportedDomain(other.to_string())),
    }
}

/// 将秒数格式化为 `H:MM:SS` 或 `M:SS`
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}
