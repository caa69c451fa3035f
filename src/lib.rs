//! Bottica - 服务器音乐播放服务
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Song Context: 歌曲标识、队列与服务器歌单
//! - Guild Context: 服务器配置
//! - Playback Context: 播放模式与选曲
//!
//! 应用层 (application/):
//! - Ports: SongResolver, LoudnessNormalizer, AudioCache, AudioPlayer, Playback, Repositories
//! - Commands / Queries: CQRS 处理器
//! - Services: 会话加载与音频来源选择
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: yt-dlp 解析器, ffmpeg 归一化与播放
//! - Persistence: SQLite 注册表 + Sled 缓存索引
//! - Playback: 每个服务器一个播放任务
//! - Worker: 缓存任务与过期清理
//! - HTTP: RESTful API + 音频流 + WebSocket

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
