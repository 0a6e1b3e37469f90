//! 时间 seek 到字节 seek 的转换.
//!
//! 只支持字节 seek 的上游 (如普通文件源) 无法直接处理时间 seek. 此时把时间目标
//! 换算为字节偏移向上游发出字节 seek, 并按该偏移登记一条待决记录; 上游随后送来
//! 字节格式的段事件时, 用待决记录把它改写回最初请求的时间段.
//!
//! 一次 flush seek 会使之前所有尚未兑现的记录失效, 因此同一时刻最多保留一条记录,
//! 上游丢弃请求时也不会无限累积.

use liu_core::{Format, LiuError, LiuResult, SeekEvent, SeekFlags, SeekType, Segment, clock};
use log::debug;
use std::time::Duration;

/// 可 seek 的位置: 字节偏移及其对应的时间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekPoint {
    /// 上游字节偏移
    pub byte: u64,
    /// 该偏移处数据的时间戳
    pub time: Duration,
}

/// 待决 seek 记录
#[derive(Debug, Clone, PartialEq)]
struct PendingSeek {
    /// 请求方期望的时间段
    segment: Segment,
    /// 发往上游的字节起点
    upstream_start: u64,
    /// 该字节起点处数据的实际时间戳
    timestamp_start: Duration,
    /// 原请求序列号
    seqnum: u32,
}

/// 字节段改写结果
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSeek {
    /// 改写后的时间段
    pub segment: Segment,
    /// 新数据起点的时间戳, 作为时间线锚点
    pub timestamp_start: Duration,
    /// 原请求序列号
    pub seqnum: u32,
}

/// 时间/字节 seek 转换器
#[derive(Debug, Default)]
pub struct SeekTranslator {
    pending: Vec<PendingSeek>,
}

impl SeekTranslator {
    /// 创建转换器
    pub fn new() -> Self {
        Self::default()
    }

    /// 检查 seek 请求形态是否可转换
    ///
    /// 仅支持: 速率 1.0, 带 FLUSH, 起点 SET, 终点 NONE.
    pub fn check(seek: &SeekEvent) -> LiuResult<()> {
        if seek.format != Format::Time {
            return Err(LiuError::UnsupportedSeek(format!("格式 {}", seek.format)));
        }
        if (seek.rate - 1.0).abs() > f64::EPSILON {
            return Err(LiuError::UnsupportedSeek(format!("速率 {}", seek.rate)));
        }
        if !seek.flags.contains(SeekFlags::FLUSH) {
            return Err(LiuError::UnsupportedSeek("非 flush seek".into()));
        }
        if seek.start_type != SeekType::Set {
            return Err(LiuError::UnsupportedSeek("起点类型".into()));
        }
        if seek.stop_type != SeekType::None || seek.stop.is_some() {
            return Err(LiuError::UnsupportedSeek("终点类型".into()));
        }
        Ok(())
    }

    /// 登记一次转换, 返回发往上游的字节 seek
    ///
    /// `seek` 须已通过 `check`, 因此终点总是开放的.
    pub fn register(&mut self, seek: &SeekEvent, current: &Segment, point: SeekPoint) -> SeekEvent {
        let mut segment = current.clone();
        segment.format = Format::Time;
        segment.rate = seek.rate;
        segment.start = seek.start;
        segment.time = seek.start;
        segment.position = Some(seek.start);
        // 估算值可能有偏差, 开放的终点保持开放, 避免提前截断
        segment.stop = None;

        if !self.pending.is_empty() {
            debug!("丢弃 {} 条被新 seek 取代的待决记录", self.pending.len());
            self.pending.clear();
        }
        debug!(
            "时间 seek {} 转换为字节 seek {}, 数据起点 {}",
            clock::display(Some(Duration::from_nanos(seek.start))),
            point.byte,
            clock::display(Some(point.time))
        );
        self.pending.push(PendingSeek {
            segment,
            upstream_start: point.byte,
            timestamp_start: point.time,
            seqnum: seek.seqnum,
        });

        SeekEvent {
            rate: 1.0,
            format: Format::Bytes,
            flags: seek.flags,
            start_type: SeekType::Set,
            start: point.byte,
            stop_type: SeekType::None,
            stop: None,
            seqnum: seek.seqnum,
        }
    }

    /// 用待决记录改写字节段
    ///
    /// 找不到起点匹配的记录时返回 `None`.
    pub fn resolve(&mut self, byte_segment: &Segment) -> Option<ResolvedSeek> {
        if byte_segment.format != Format::Bytes {
            return None;
        }
        let idx = self
            .pending
            .iter()
            .position(|p| p.upstream_start == byte_segment.start)?;
        let p = self.pending.swap_remove(idx);
        debug!("字节段 {} 匹配待决 seek, 改写为时间段", byte_segment.start);
        Some(ResolvedSeek {
            segment: p.segment,
            timestamp_start: p.timestamp_start,
            seqnum: p.seqnum,
        })
    }

    /// 待决记录数
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// 清空待决记录
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// 由实际观察到的帧位置构建的时间 -> 字节索引
#[derive(Debug, Clone)]
pub struct SeekIndex {
    /// (时间, 字节偏移), 按时间升序
    entries: Vec<(Duration, u64)>,
    /// 相邻条目的最小时间间隔
    interval: Duration,
}

impl SeekIndex {
    /// 创建索引
    pub fn new(interval: Duration) -> Self {
        Self {
            entries: Vec::new(),
            interval,
        }
    }

    /// 尝试加入一个条目, 与上一条目间隔不足或时间回退时忽略
    pub fn add(&mut self, time: Duration, byte: u64) -> bool {
        if let Some(&(last, _)) = self.entries.last() {
            if time < last + self.interval {
                return false;
            }
        }
        self.entries.push((time, byte));
        true
    }

    /// 查找时间不晚于 `time` 的最后一个条目
    pub fn lookup_before(&self, time: Duration) -> Option<SeekPoint> {
        let idx = self.entries.partition_point(|&(t, _)| t <= time);
        let &(t, b) = self.entries.get(idx.checked_sub(1)?)?;
        Some(SeekPoint { byte: b, time: t })
    }

    /// 条目数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 清空索引
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
