//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_cache;
mod audio_player;
mod loudness_normalizer;
mod playback;
mod repositories;
mod session_manager;
mod song_resolver;
mod task_manager;

pub use audio_cache::{
    cache_file_name, generate_cache_key, AudioCachePort, CacheError, CacheMetadata, CacheStats,
};
pub use audio_player::{AudioPlayerPort, AudioSource, AudioStream, PlayerError};
pub use loudness_normalizer::{
    LoudnessNormalizerPort, LoudnessTarget, NormalizeError, NormalizeOutcome,
};
pub use playback::{PlaybackControl, PlaybackError, PlaybackPort};
pub use repositories::{
    GuildRepositoryPort, RepositoryError, SessionRecord, SessionRepositoryPort,
    SongRepositoryPort,
};
pub use session_manager::{Session, SessionError, SessionManagerPort};
pub use song_resolver::{ResolveError, ResolvedRequest, SongResolverPort};
pub use task_manager::{CacheTask, CacheTaskManagerPort, CacheTaskState, Submitted, TaskError};
