//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（SongResolver、LoudnessNormalizer、AudioCache、Repository 等）
//! - services: 会话加载与音频来源选择
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod ports;
pub mod queries;
pub mod services;

#[cfg(test)]
pub mod testing;

// Re-exports
pub use commands::{
    ClearCommand, ControlResponse, PauseCommand, PersistSessionsCommand, PlayAllCommand,
    PlayCommand, PrefetchCommand, ResetCommand, RestoreSessionsCommand, ResumeCommand,
    SetModeCommand, SkipCommand, StopCommand, UpdateGuildConfigCommand,
    // Handlers
    handlers::{
        ClearHandler, PauseHandler, PersistSessionsHandler, PlayAllHandler, PlayHandler,
        PrefetchHandler, ResetHandler, RestoreSessionsHandler, ResumeHandler, SetModeHandler,
        SkipHandler, StopHandler, UpdateGuildConfigHandler,
    },
};

pub use error::ApplicationError;

pub use queries::{
    GetCacheStatsQuery, GetGuildConfigQuery, GetQueueQuery, GetSessionStatusQuery,
    ListCacheTasksQuery,
    // Handlers
    handlers::{
        GetCacheStatsHandler, GetGuildConfigHandler, GetQueueHandler, GetSessionStatusHandler,
        ListCacheTasksHandler,
    },
};

pub use services::{AudioSourceService, GuildSessions, SessionLoad};
