//! Song Context - Guild Song Set

use rand::Rng;
use std::collections::{HashMap, HashSet};

use super::{SongInfo, SongKey};

/// 服务器歌单 - 曾在该服务器排队过的所有歌曲
///
/// 电台模式从这里随机选曲
#[derive(Debug, Clone, Default)]
pub struct SongSet {
    songs: HashMap<SongKey, SongInfo>,
}

impl SongSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_songs(songs: impl IntoIterator<Item = SongInfo>) -> Self {
        let mut set = Self::new();
        for song in songs {
            set.add(song);
        }
        set
    }

    /// 添加歌曲，仅当歌曲此前不在歌单中时返回 true
    pub fn add(&mut self, song: SongInfo) -> bool {
        let key = song.key();
        if self.songs.contains_key(&key) {
            return false;
        }
        self.songs.insert(key, song);
        true
    }

    pub fn contains(&self, key: &SongKey) -> bool {
        self.songs.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn get(&self, key: &SongKey) -> Option<&SongInfo> {
        self.songs.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SongInfo> {
        self.songs.values()
    }

    /// 随机选择一首未被屏蔽且满足谓词的歌曲
    pub fn select_random<R, P>(
        &self,
        block_list: &HashSet<SongKey>,
        allow: P,
        rng: &mut R,
    ) -> Option<SongInfo>
    where
        R: Rng + ?Sized,
        P: Fn(&SongInfo) -> bool,
    {
        let candidates: Vec<&SongInfo> = self
            .songs
            .iter()
            .filter(|(key, song)| !block_list.contains(*key) && allow(song))
            .map(|(_, song)| song)
            .collect();

        if candidates.is_empty() {
            return None;
        }
        let idx = rng.gen_range(0..candidates.len());
        Some(candidates[idx].clone())
    }
}
