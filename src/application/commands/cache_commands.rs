//! Cache Commands - 预取命令

use serde::Serialize;

/// 预取命令 - 解析请求并为每首歌曲提交缓存任务（不受时长限制）
#[derive(Debug, Clone)]
pub struct PrefetchCommand {
    pub query: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrefetchedSong {
    pub cache_key: String,
    pub task_id: String,
    pub title: String,
    /// 已有进行中的任务
    pub in_flight: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrefetchResponse {
    pub submitted: Vec<PrefetchedSong>,
    pub unplayable: usize,
}
