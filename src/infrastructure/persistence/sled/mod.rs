//! Sled Persistence - 音频缓存索引

mod audio_cache;

pub use audio_cache::{SledAudioCache, SledCacheConfig};
