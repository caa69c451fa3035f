//! Application Services - 跨命令共享的用例逻辑

mod audio_source;
mod guild_sessions;

pub use audio_source::AudioSourceService;
pub use guild_sessions::{GuildSessions, SessionLoad};
