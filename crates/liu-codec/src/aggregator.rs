//! 输出聚合.
//!
//! 把时间上连续的小块解码输出合并为较大的缓冲区, 降低下游的逐块开销.
//! 阈值为 0 或处于直播管道时不做任何处理, 输入原样输出.

use bytes::BytesMut;
use liu_core::{Buffer, BufferFlags, clock};
use log::trace;
use std::time::Duration;

/// 输出聚合器
#[derive(Debug)]
pub struct OutputAggregator {
    /// 聚合阈值
    threshold: Duration,
    /// 相邻输出判定为连续的容差
    tolerance: Duration,
    /// 是否允许聚合 (非直播管道)
    allowed: bool,
    /// 已聚合的数据
    pending: BytesMut,
    /// 聚合起点时间戳
    start: Option<Duration>,
    /// 已聚合时长
    duration: Duration,
    /// 聚合中第一块的标志
    flags: BufferFlags,
    /// 聚合中第一块的偏移
    offset: Option<u64>,
}

impl OutputAggregator {
    /// 创建聚合器, 默认不允许聚合
    pub fn new(threshold: Duration, tolerance: Duration) -> Self {
        Self {
            threshold,
            tolerance,
            allowed: false,
            pending: BytesMut::new(),
            start: None,
            duration: Duration::ZERO,
            flags: BufferFlags::empty(),
            offset: None,
        }
    }

    /// 更新阈值与容差
    pub fn configure(&mut self, threshold: Duration, tolerance: Duration) {
        self.threshold = threshold;
        self.tolerance = tolerance;
    }

    /// 设置是否允许聚合
    pub fn set_allowed(&mut self, allowed: bool) {
        self.allowed = allowed;
    }

    /// 当前是否处于聚合模式
    pub fn is_active(&self) -> bool {
        self.allowed && !self.threshold.is_zero()
    }

    /// 是否有未输出的数据
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// 送入一块输出, 返回需要立即下发的缓冲区 (0 到 2 个)
    pub fn push(&mut self, buffer: Buffer) -> Vec<Buffer> {
        if !self.is_active() {
            // 聚合被关闭时先送出残留数据
            let mut out: Vec<Buffer> = self.take().into_iter().collect();
            out.push(buffer);
            return out;
        }

        let mut out = Vec::new();
        if self.has_pending() {
            let contiguous = match (self.start, buffer.pts) {
                (Some(start), Some(pts)) => {
                    clock::abs_diff(start + self.duration, pts) <= self.tolerance
                }
                _ => false,
            };
            if !contiguous {
                trace!("输出与当前聚合不连续, 先下发已聚合数据");
                out.extend(self.take());
            }
        }

        if !self.has_pending() {
            self.start = buffer.pts;
            self.duration = Duration::ZERO;
            self.flags = buffer.flags;
            self.offset = buffer.offset;
        }
        self.pending.extend_from_slice(&buffer.data);
        self.duration += buffer.duration.unwrap_or_default();

        if self.duration >= self.threshold {
            out.extend(self.take());
        }
        out
    }

    /// 强制下发已聚合的数据
    pub fn drain(&mut self) -> Option<Buffer> {
        self.take()
    }

    /// 丢弃已聚合的数据
    pub fn clear(&mut self) {
        self.pending.clear();
        self.start = None;
        self.duration = Duration::ZERO;
        self.flags = BufferFlags::empty();
        self.offset = None;
    }

    fn take(&mut self) -> Option<Buffer> {
        if self.pending.is_empty() {
            return None;
        }
        let data = self.pending.split().freeze();
        let buffer = Buffer {
            data,
            pts: self.start,
            duration: Some(self.duration),
            offset: self.offset,
            flags: self.flags,
        };
        trace!(
            "下发聚合缓冲区 {} 字节, 起点 {}, 时长 {:?}",
            buffer.len(),
            clock::display(buffer.pts),
            self.duration
        );
        self.clear();
        Some(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn piece(pts_ms: u64, dur_ms: u64, len: usize) -> Buffer {
        Buffer::new(vec![pts_ms as u8; len])
            .with_pts(Duration::from_millis(pts_ms))
            .with_duration(Duration::from_millis(dur_ms))
    }

    fn active(threshold_ms: u64) -> OutputAggregator {
        let mut agg = OutputAggregator::new(
            Duration::from_millis(threshold_ms),
            Duration::from_millis(10),
        );
        agg.set_allowed(true);
        agg
    }

    #[test]
    fn test_阈值为零时原样输出() {
        let mut agg = OutputAggregator::new(Duration::ZERO, Duration::from_millis(10));
        agg.set_allowed(true);
        let input = piece(0, 20, 8);
        assert_eq!(agg.push(input.clone()), vec![input]);
        assert!(agg.drain().is_none());
    }

    #[test]
    fn test_直播管道不聚合() {
        let mut agg = OutputAggregator::new(Duration::from_millis(100), Duration::from_millis(10));
        let input = piece(0, 20, 8);
        assert_eq!(agg.push(input.clone()), vec![input]);
    }

    #[test]
    fn test_达到阈值后下发() {
        let mut agg = active(50);
        assert!(agg.push(piece(0, 20, 4)).is_empty());
        assert!(agg.push(piece(20, 20, 4)).is_empty());
        let out = agg.push(piece(40, 20, 4));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 12);
        assert_eq!(out[0].pts, Some(Duration::ZERO));
        assert_eq!(out[0].duration, Some(Duration::from_millis(60)));
    }

    #[test]
    fn test_不连续时先下发() {
        let mut agg = active(100);
        assert!(agg.push(piece(0, 20, 4)).is_empty());
        // 间隔 30ms, 超出 10ms 容差
        let out = agg.push(piece(50, 20, 4));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].pts, Some(Duration::ZERO));
        let rest = agg.drain().unwrap();
        assert_eq!(rest.pts, Some(Duration::from_millis(50)));
    }

    #[test]
    fn test_缺失时间戳视为不连续() {
        let mut agg = active(100);
        agg.push(piece(0, 20, 4));
        let out = agg.push(Buffer::new(vec![0u8; 4]).with_duration(Duration::from_millis(20)));
        assert_eq!(out.len(), 1);
        assert_eq!(agg.drain().unwrap().pts, None);
    }
}
