//! 倒放重排队列.
//!
//! 倒放时上游按 "块" 逆序送入数据, 每块内部仍是正序, 块首带 DISCONT 标志.
//! 三个队列的职责:
//! - `gather`: 收集当前块, 最新到达的在队首
//! - `decode`: 按时间正序排列, 逐个交给正向解码路径
//! - `queued`: 解码输出, 最新产生的在队首, 按队列顺序下发即为倒序
//!
//! 缓冲区只在队列之间移动, 不会复制.

use liu_core::{Buffer, clock};
use log::trace;
use std::collections::VecDeque;
use std::time::Duration;

/// 倒放重排队列
#[derive(Debug, Default)]
pub struct ReverseQueues {
    gather: VecDeque<Buffer>,
    decode: VecDeque<Buffer>,
    queued: VecDeque<Buffer>,
}

impl ReverseQueues {
    /// 创建空队列
    pub fn new() -> Self {
        Self::default()
    }

    /// 收集一个到达的缓冲区
    pub fn gather(&mut self, buffer: Buffer) {
        trace!(
            "收集缓冲区 {} 字节, 时间戳 {}",
            buffer.len(),
            clock::display(buffer.pts)
        );
        self.gather.push_front(buffer);
    }

    /// 收集队列是否为空
    pub fn is_gather_empty(&self) -> bool {
        self.gather.is_empty()
    }

    /// 把收集队列整体移入解码队列, 保持时间正序
    ///
    /// 上一轮保留下来的解码项在时间上更晚, 排在新移入项之后.
    pub fn move_gather_to_decode(&mut self) {
        while let Some(buffer) = self.gather.pop_front() {
            self.decode.push_front(buffer);
        }
    }

    /// 取出解码队列, 供逐个正向解码
    pub fn take_decode(&mut self) -> VecDeque<Buffer> {
        std::mem::take(&mut self.decode)
    }

    /// 放回未产生输出、下一轮仍需使用的解码项
    pub fn retain_decode(&mut self, retained: VecDeque<Buffer>) {
        debug_assert!(self.decode.is_empty());
        self.decode = retained;
    }

    /// 解码队列长度
    pub fn decode_len(&self) -> usize {
        self.decode.len()
    }

    /// 记录一个解码输出
    pub fn queue_output(&mut self, buffer: Buffer) {
        self.queued.push_front(buffer);
    }

    /// 输出队列长度
    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }

    /// 按倒序取出全部输出
    ///
    /// 缺失时间戳的输出由后一个 (时间上更晚的) 输出的时间戳减去自身时长反推.
    /// 正向解码留下的 DISCONT 标志在倒序下无意义, 一并清除.
    pub fn take_output(&mut self) -> Vec<Buffer> {
        let mut out = Vec::with_capacity(self.queued.len());
        let mut timestamp: Option<Duration> = None;
        while let Some(mut buffer) = self.queued.pop_front() {
            let duration = buffer.duration.unwrap_or_default();
            timestamp = timestamp.map(|t| t.saturating_sub(duration));
            match buffer.pts {
                None => buffer.pts = timestamp,
                Some(pts) => timestamp = Some(pts),
            }
            buffer.set_discont(false);
            out.push(buffer);
        }
        out
    }

    /// 清空全部队列
    pub fn clear(&mut self) {
        self.gather.clear();
        self.decode.clear();
        self.queued.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(tag: u8) -> Buffer {
        Buffer::new(vec![tag])
    }

    #[test]
    fn test_收集后按时间正序解码() {
        let mut q = ReverseQueues::new();
        for tag in [1, 2, 3] {
            q.gather(tagged(tag));
        }
        q.move_gather_to_decode();
        assert!(q.is_gather_empty());
        let order: Vec<u8> = q.take_decode().iter().map(|b| b.data[0]).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_保留项排在新块之后() {
        let mut q = ReverseQueues::new();
        q.retain_decode(VecDeque::from(vec![tagged(9)]));
        q.gather(tagged(5));
        q.gather(tagged(6));
        q.move_gather_to_decode();
        let order: Vec<u8> = q.take_decode().iter().map(|b| b.data[0]).collect();
        assert_eq!(order, vec![5, 6, 9]);
    }

    #[test]
    fn test_输出倒序并反推时间戳() {
        let mut q = ReverseQueues::new();
        let ms = Duration::from_millis;
        q.queue_output(tagged(1).with_pts(ms(0)).with_duration(ms(10)));
        q.queue_output(tagged(2).with_duration(ms(10)).discont());
        q.queue_output(tagged(3).with_pts(ms(20)).with_duration(ms(10)));
        let out = q.take_output();
        let tags: Vec<u8> = out.iter().map(|b| b.data[0]).collect();
        assert_eq!(tags, vec![3, 2, 1]);
        assert_eq!(out[1].pts, Some(ms(10)));
        assert!(out.iter().all(|b| !b.is_discont()));
        assert_eq!(q.queued_len(), 0);
    }
}
