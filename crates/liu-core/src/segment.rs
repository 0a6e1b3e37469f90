//! 播放段 (segment) 定义.
//!
//! 段描述了下游应当播放的区间以及播放速率. 数值的单位由 `format` 决定:
//! `Time` 为纳秒, `Bytes` 为字节, `Default` 为采样帧.

use serde::Serialize;
use std::fmt;

/// 数值格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Format {
    /// 未定义
    Undefined,
    /// 默认单位 (音频为采样帧)
    Default,
    /// 字节
    Bytes,
    /// 时间 (纳秒)
    Time,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Undefined => "undefined",
            Self::Default => "default",
            Self::Bytes => "bytes",
            Self::Time => "time",
        };
        write!(f, "{name}")
    }
}

/// 播放段
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// 数值格式
    pub format: Format,
    /// 播放速率, 负数表示倒放
    pub rate: f64,
    /// 上游已经应用的速率
    pub applied_rate: f64,
    /// 段起点
    pub start: u64,
    /// 段终点, `None` 表示开放
    pub stop: Option<u64>,
    /// 段起点对应的流时间
    pub time: u64,
    /// 最近一次推送到达的位置
    pub position: Option<u64>,
    /// 总时长 (若已知)
    pub duration: Option<u64>,
}

impl Segment {
    /// 创建以 0 为起点, 开放终点的段
    pub fn new(format: Format) -> Self {
        Self {
            format,
            rate: 1.0,
            applied_rate: 1.0,
            start: 0,
            stop: None,
            time: 0,
            position: None,
            duration: None,
        }
    }

    /// 将 `[start, stop)` 裁剪到段内
    ///
    /// 完全落在段外时返回 `None`.
    pub fn clip(&self, start: u64, stop: Option<u64>) -> Option<(u64, Option<u64>)> {
        if let Some(seg_stop) = self.stop {
            // 起止相同的零长度段保留整个区间
            if start > seg_stop || (self.start != seg_stop && start == seg_stop) {
                return None;
            }
        }
        if let Some(stop) = stop {
            if stop < self.start || (start != stop && stop == self.start) {
                return None;
            }
        }
        let cstart = start.max(self.start);
        let cstop = match (stop, self.stop) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, b) => b,
        };
        Some((cstart, cstop))
    }

    /// 段内位置转换为流时间
    pub fn to_stream_time(&self, position: u64) -> Option<u64> {
        if position < self.start {
            return None;
        }
        if let Some(stop) = self.stop {
            if position > stop {
                return None;
            }
        }
        let offset = position - self.start;
        let abs_rate = self.applied_rate.abs();
        let scaled = if (abs_rate - 1.0).abs() < f64::EPSILON {
            offset
        } else {
            (offset as f64 * abs_rate) as u64
        };
        if self.applied_rate > 0.0 {
            Some(self.time + scaled)
        } else {
            self.time.checked_sub(scaled)
        }
    }
}

impl Default for Segment {
    fn default() -> Self {
        Self::new(Format::Time)
    }
}
