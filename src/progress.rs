//! 进度统计。
//!
//! 纯观察性质：回调只读取快照，不影响流水线的正确性。

use std::time::{Duration, Instant};

/// 每处理完一个 chunk 后的进度快照
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// 刚处理完的 chunk 序号（从 0 开始）
    pub chunk_index: u64,
    pub chunk_count: u64,
    pub bytes_done: u64,
    pub bytes_total: u64,
    pub elapsed: Duration,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.bytes_total == 0 {
            return 100.0;
        }
        self.bytes_done as f64 / self.bytes_total as f64 * 100.0
    }

    /// 按当前平均速率估算的剩余时间
    pub fn eta(&self) -> Option<Duration> {
        if self.bytes_done == 0 {
            return None;
        }
        let remaining = self.bytes_total.saturating_sub(self.bytes_done);
        let per_byte = self.elapsed.as_secs_f64() / self.bytes_done as f64;
        Some(Duration::from_secs_f64(per_byte * remaining as f64))
    }
}

/// 流水线内部使用的计数器
pub(crate) struct Tracker {
    started: Instant,
    chunk_count: u64,
    bytes_total: u64,
    bytes_done: u64,
}

impl Tracker {
    pub(crate) fn new(chunk_count: u64, bytes_total: u64) -> Self {
        Self {
            started: Instant::now(),
            chunk_count,
            bytes_total,
            bytes_done: 0,
        }
    }

    pub(crate) fn advance(&mut self, chunk_index: u64, bytes: u64) -> Progress {
        self.bytes_done += bytes;

        let progress = Progress {
            chunk_index,
            chunk_count: self.chunk_count,
            bytes_done: self.bytes_done,
            bytes_total: self.bytes_total,
            elapsed: self.started.elapsed(),
        };

        tracing::debug!(
            chunk = chunk_index,
            chunks = self.chunk_count,
            done = self.bytes_done,
            total = self.bytes_total,
            percent = progress.percent(),
            "chunk processed"
        );

        progress
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(done: u64, total: u64, secs: u64) -> Progress {
        Progress {
            chunk_index: 0,
            chunk_count: 1,
            bytes_done: done,
            bytes_total: total,
            elapsed: Duration::from_secs(secs),
        }
    }

    #[test]
    fn percent_of_total() {
        assert_eq!(snapshot(25, 100, 1).percent(), 25.0);
        assert_eq!(snapshot(0, 0, 0).percent(), 100.0);
    }

    #[test]
    fn eta_extrapolates_average_rate() {
        assert_eq!(snapshot(0, 100, 1).eta(), None);
        assert_eq!(snapshot(64, 128, 2).eta(), Some(Duration::from_secs(2)));
        assert_eq!(snapshot(100, 100, 3).eta(), Some(Duration::ZERO));
    }

    #[test]
    fn tracker_accumulates() {
        let mut tracker = Tracker::new(3, 30);
        tracker.advance(0, 10);
        let p = tracker.advance(1, 10);
        assert_eq!(p.bytes_done, 20);
        assert_eq!(p.chunk_index, 1);
        assert_eq!(p.chunk_count, 3);
    }
}
