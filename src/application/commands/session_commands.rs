//! Session Commands - 会话持久化命令

/// 保存所有会话（关闭时执行）
#[derive(Debug, Clone, Default)]
pub struct PersistSessionsCommand;

#[derive(Debug, Clone, Default)]
pub struct PersistSessionsResponse {
    pub saved: usize,
    pub failed: usize,
}

/// 恢复持久化的会话（启动时执行）
#[derive(Debug, Clone, Default)]
pub struct RestoreSessionsCommand;

#[derive(Debug, Clone, Default)]
pub struct RestoreSessionsResponse {
    pub restored: usize,
    /// 重新启动播放的会话数
    pub resumed: usize,
    /// 注册表中找不到的歌曲数
    pub missing_songs: usize,
}
