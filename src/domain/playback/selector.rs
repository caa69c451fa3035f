//! Playback Context - Song Selector
//!
//! 决定下一首播放的歌曲：显式请求队列优先，其次电台随机选曲

use rand::Rng;
use std::collections::{HashSet, VecDeque};

use super::PlaybackMode;
use crate::domain::song::{SongInfo, SongKey, SongQueue, SongSet};

/// 选曲器
///
/// 不变量:
/// - history 长度不超过最近一次选曲时的 min_repeat_interval
/// - current 为最近一次 select_next 的结果
#[derive(Debug, Clone, Default)]
pub struct SongSelector {
    queue: SongQueue,
    current: Option<SongInfo>,
    history: VecDeque<SongKey>,
    mode: PlaybackMode,
}

impl SongSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn queue(&self) -> &SongQueue {
        &self.queue
    }

    pub fn current(&self) -> Option<&SongInfo> {
        self.current.as_ref()
    }

    pub fn history(&self) -> impl Iterator<Item = &SongKey> {
        self.history.iter()
    }

    pub fn enqueue(&mut self, songs: impl IntoIterator<Item = SongInfo>) {
        self.queue.extend(songs);
    }

    /// 切换模式，电台开关变化时清空历史
    pub fn set_mode(&mut self, mode: PlaybackMode) {
        if mode.radio != self.mode.radio {
            self.history.clear();
        }
        self.mode = mode;
    }

    /// 清空队列与历史，并恢复默认模式
    pub fn clear(&mut self) {
        self.queue.clear();
        self.history.clear();
        self.current = None;
        self.mode = PlaybackMode::default();
    }

    /// 清空待播队列，并丢弃当前歌曲
    pub fn clear_queue(&mut self) {
        self.queue.clear();
        self.current = None;
    }

    /// 将被打断的当前歌曲放回队首，不计入历史
    pub fn requeue_current(&mut self) -> Option<SongKey> {
        let song = self.current.take()?;
        let key = song.key();
        self.queue.push_front(song);
        Some(key)
    }

    /// 选择下一首歌曲
    pub fn select_next<R: Rng + ?Sized>(
        &mut self,
        song_set: &SongSet,
        min_repeat_interval: usize,
        rng: &mut R,
    ) -> Option<SongInfo> {
        let outgoing = self.current.take().map(|song| song.key());
        if let Some(key) = &outgoing {
            self.history.push_back(key.clone());
        }
        while self.history.len() > min_repeat_interval {
            self.history.pop_front();
        }

        let next = if !self.queue.is_empty() {
            if self.mode.shuffle {
                self.queue.pop_random(rng)
            } else {
                self.queue.pop()
            }
        } else if self.mode.radio {
            self.pick_radio(song_set, outgoing.as_ref(), rng)
        } else {
            None
        };

        self.current = next.clone();
        next
    }

    fn pick_radio<R: Rng + ?Sized>(
        &self,
        song_set: &SongSet,
        outgoing: Option<&SongKey>,
        rng: &mut R,
    ) -> Option<SongInfo> {
        let mut blocked: HashSet<SongKey> = self.history.iter().cloned().collect();
        if let Some(key) = outgoing {
            blocked.insert(key.clone());
        }
        if let Some(song) = song_set.select_random(&blocked, |_| true, rng) {
            return Some(song);
        }

        // 歌单太小，放宽到只避开刚播完的歌
        let blocked: HashSet<SongKey> = outgoing.into_iter().cloned().collect();
        if let Some(song) = song_set.select_random(&blocked, |_| true, rng) {
            return Some(song);
        }

        song_set.select_random(&HashSet::new(), |_| true, rng)
    }
}
