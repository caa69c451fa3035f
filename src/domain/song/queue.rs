//! Song Context - Playback Queue

use rand::Rng;
use std::collections::VecDeque;

use super::{SongInfo, SongKey};

/// 待播放歌曲队列
///
/// 不变量:
/// - duration 始终等于队列中所有歌曲时长之和
#[derive(Debug, Clone, Default)]
pub struct SongQueue {
    songs: VecDeque<SongInfo>,
    duration: u64,
}

impl SongQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// 队列总时长（秒）
    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn push(&mut self, song: SongInfo) {
        self.duration += u64::from(song.duration);
        self.songs.push_back(song);
    }

    /// 放回队首
    pub fn push_front(&mut self, song: SongInfo) {
        self.duration += u64::from(song.duration);
        self.songs.push_front(song);
    }

    pub fn extend(&mut self, songs: impl IntoIterator<Item = SongInfo>) {
        for song in songs {
            self.push(song);
        }
    }

    /// 取出队首歌曲
    pub fn pop(&mut self) -> Option<SongInfo> {
        let song = self.songs.pop_front();
        self.settle(song.as_ref());
        song
    }

    /// 随机取出一首歌曲
    pub fn pop_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<SongInfo> {
        if self.songs.is_empty() {
            self.duration = 0;
            return None;
        }
        let idx = rng.gen_range(0..self.songs.len());
        let song = self.songs.remove(idx);
        self.settle(song.as_ref());
        song
    }

    pub fn clear(&mut self) {
        self.songs.clear();
        self.duration = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = &SongInfo> {
        self.songs.iter()
    }

    pub fn keys(&self) -> Vec<SongKey> {
        self.songs.iter().map(SongInfo::key).collect()
    }

    fn settle(&mut self, taken: Option<&SongInfo>) {
        match taken {
            Some(song) if !self.songs.is_empty() => {
                self.duration = self.duration.saturating_sub(u64::from(song.duration));
            }
            _ => self.duration = 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn song(id: &str, duration: u32) -> SongInfo {
        SongInfo::new("youtube", id, duration, format!("Song {}", id))
    }

    #[test]
    fn test_fifo_order_and_duration() {
        let mut queue = SongQueue::new();
        queue.push(song("a", 100));
        queue.extend(vec![song("b", 50), song("c", 25)]);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.duration(), 175);

        assert_eq!(queue.pop().unwrap().id, "a");
        assert_eq!(queue.duration(), 75);
        assert_eq!(queue.pop().unwrap().id, "b");
        assert_eq!(queue.pop().unwrap().id, "c");
        assert_eq!(queue.duration(), 0);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_pop_random_drains_everything() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut queue = SongQueue::new();
        queue.extend((0..10).map(|i| song(&i.to_string(), 10)));

        let mut seen = Vec::new();
        while let Some(s) = queue.pop_random(&mut rng) {
            seen.push(s.id);
            assert_eq!(queue.duration(), queue.len() as u64 * 10);
        }
        seen.sort();
        assert_eq!(seen.len(), 10);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear_resets_duration() {
        let mut queue = SongQueue::new();
        queue.push(song("a", 100));
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.duration(), 0);
    }
}
