//! 字节累积器.
//!
//! 接收任意大小的输入块, 按需取出连续的 N 字节. 每个输入块的起始时间戳与字节偏移
//! 被记录为一个标记, 取出数据时据此为输出缓冲区打上时间戳.
//!
//! 同一个上游时间戳只会被使用一次: 若多个帧都位于同一输入块内, 只有第一个帧拿到
//! 该时间戳, 其余帧的时间戳为空, 由下游按采样数推算.

use bytes::{Bytes, BytesMut};
use liu_core::{Buffer, LiuError, LiuResult};
use log::trace;
use std::collections::VecDeque;
use std::time::Duration;

/// 输入块标记
#[derive(Debug, Clone, Copy)]
struct Marker<T> {
    /// 块起始处的绝对字节位置 (自上次清空以来)
    at: u64,
    value: T,
}

/// 读取位置之前最近的标记
fn head<T: Copy>(marks: &VecDeque<Marker<T>>, consumed: u64) -> Option<Marker<T>> {
    marks.iter().rev().find(|m| m.at <= consumed).copied()
}

/// 只保留读取位置之前的最后一个标记
fn prune<T>(marks: &mut VecDeque<Marker<T>>, consumed: u64) {
    while marks.len() > 1 && marks[1].at <= consumed {
        marks.pop_front();
    }
}

/// 字节累积器
#[derive(Debug, Default)]
pub struct Adapter {
    /// 未消费的数据
    data: BytesMut,
    /// 已消费 (取出或丢弃) 的字节总数
    consumed: u64,
    /// 带时间戳的输入块, 按位置升序
    pts_marks: VecDeque<Marker<Duration>>,
    /// 带上游偏移的输入块, 按位置升序
    offset_marks: VecDeque<Marker<u64>>,
    /// 最近一次取出时使用的时间戳
    last_pts: Option<Duration>,
}

impl Adapter {
    /// 创建空累积器
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个输入块
    pub fn push(&mut self, buffer: Buffer) {
        let at = self.consumed + self.data.len() as u64;
        if let Some(pts) = buffer.pts {
            self.pts_marks.push_back(Marker { at, value: pts });
        }
        if let Some(offset) = buffer.offset {
            self.offset_marks.push_back(Marker { at, value: offset });
        }
        self.data.extend_from_slice(&buffer.data);
    }

    /// 可用字节数
    pub fn available(&self) -> usize {
        self.data.len()
    }

    /// 全部未消费数据
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// 查看前 `n` 字节, 不消费
    pub fn peek(&self, n: usize) -> LiuResult<&[u8]> {
        if self.data.len() < n {
            return Err(LiuError::NeedMoreData);
        }
        Ok(&self.data[..n])
    }

    /// 在 `[offset, offset + size)` 范围内查找满足 `(word & mask) == pattern` 的
    /// 大端 32 位字, 返回其相对偏移
    pub fn masked_scan_u32(&self, mask: u32, pattern: u32, offset: usize, size: usize) -> Option<usize> {
        let end = offset.checked_add(size)?.min(self.data.len());
        if end < offset + 4 {
            return None;
        }
        self.data[offset..end]
            .windows(4)
            .position(|w| u32::from_be_bytes([w[0], w[1], w[2], w[3]]) & mask == pattern)
            .map(|p| p + offset)
    }

    /// 读取位置之前最近的上游时间戳, 以及自该时间戳以来的字节距离
    pub fn prev_timestamp(&self) -> (Option<Duration>, u64) {
        match head(&self.pts_marks, self.consumed) {
            Some(m) => (Some(m.value), self.consumed - m.at),
            None => (None, 0),
        }
    }

    /// 读取位置在上游字节流中的偏移
    pub fn prev_offset(&self) -> Option<u64> {
        let m = head(&self.offset_marks, self.consumed)?;
        Some(m.value + (self.consumed - m.at))
    }

    /// 取出恰好 `n` 字节
    ///
    /// 返回的缓冲区带有读取位置对应的上游时间戳; 与上次取出相同的时间戳被丢弃.
    pub fn take(&mut self, n: usize) -> LiuResult<Buffer> {
        if self.data.len() < n {
            return Err(LiuError::NeedMoreData);
        }
        let (pts, _) = self.prev_timestamp();
        let pts = if pts.is_some() && pts == self.last_pts {
            trace!("时间戳与上次相同, 丢弃");
            None
        } else {
            if pts.is_some() {
                self.last_pts = pts;
            }
            pts
        };
        let offset = self.prev_offset();

        let data: Bytes = self.data.split_to(n).freeze();
        self.advance(n);

        let mut buffer = Buffer::new(data);
        buffer.pts = pts;
        buffer.offset = offset;
        Ok(buffer)
    }

    /// 丢弃前 `n` 字节
    pub fn flush(&mut self, n: usize) {
        let n = n.min(self.data.len());
        let _ = self.data.split_to(n);
        self.advance(n);
    }

    /// 清空全部数据与时间戳关联
    pub fn clear(&mut self) {
        self.data.clear();
        self.consumed = 0;
        self.pts_marks.clear();
        self.offset_marks.clear();
        self.last_pts = None;
    }

    fn advance(&mut self, n: usize) {
        self.consumed += n as u64;
        prune(&mut self.pts_marks, self.consumed);
        prune(&mut self.offset_marks, self.consumed);
    }
}
