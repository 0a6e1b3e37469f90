//! 输出时间戳推算.
//!
//! 以 `base` 为锚点, 按累计输出采样数推算每个输出缓冲区的时间戳 ("完美时间戳").
//! 输入时间戳只在偏离推算值超过容差时才被采纳, 此时锚点重新同步到输入时间戳.
//!
//! 输出时长取相邻两次推算值之差, 而不是单块时长的乘积, 长时间运行也不会累积舍入误差.

use liu_core::clock;
use log::debug;
use std::time::Duration;

/// 一次推算得到的时间信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    /// 输出时间戳
    pub pts: Duration,
    /// 输出时长
    pub duration: Duration,
}

/// 时间戳推算器状态快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    base: Option<Duration>,
    samples: u64,
}

/// 输出时间戳推算器
#[derive(Debug, Clone, Default)]
pub struct TimestampReconciler {
    /// 时间线锚点
    base: Option<Duration>,
    /// 自锚点以来输出的采样帧数
    samples: u64,
    /// 抖动容差
    tolerance: Duration,
}

impl TimestampReconciler {
    /// 创建推算器
    pub fn new(tolerance: Duration) -> Self {
        Self {
            base: None,
            samples: 0,
            tolerance,
        }
    }

    /// 更新抖动容差
    pub fn set_tolerance(&mut self, tolerance: Duration) {
        self.tolerance = tolerance;
    }

    /// 当前锚点
    pub fn base(&self) -> Option<Duration> {
        self.base
    }

    /// 自锚点以来的采样帧数
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// 下一个输出的推算时间戳
    pub fn expected(&self, rate: u32) -> Option<Duration> {
        Some(self.base? + clock::frames_to_time(self.samples, rate)?)
    }

    /// 用输入时间戳校准锚点
    ///
    /// - 锚点未设置: 锁定到输入时间戳, 没有则锁定到 `fallback`
    /// - 容差为 0: 每个有效输入时间戳都重新同步
    /// - 容差大于 0: 偏离推算值超过容差才重新同步
    ///
    /// 返回是否发生了重新同步.
    pub fn observe(&mut self, input: Option<Duration>, fallback: Duration, rate: u32) -> bool {
        let Some(base) = self.base else {
            let anchor = input.unwrap_or(fallback);
            debug!("锁定时间线锚点 {}", clock::display(Some(anchor)));
            self.base = Some(anchor);
            self.samples = 0;
            return input.is_some();
        };
        let Some(ts) = input else {
            return false;
        };
        if !self.tolerance.is_zero() {
            let expected = base + clock::frames_to_time(self.samples, rate).unwrap_or_default();
            let diff = clock::abs_diff(ts, expected);
            if diff <= self.tolerance {
                return false;
            }
            debug!(
                "输入时间戳 {} 偏离推算值 {} 达 {:?}, 重新同步",
                clock::display(Some(ts)),
                clock::display(Some(expected)),
                diff
            );
        }
        self.base = Some(ts);
        self.samples = 0;
        true
    }

    /// 为 `n` 个采样帧的输出推算时间戳与时长, 并累加采样数
    ///
    /// 锚点未设置或采样率无效时返回 `None`.
    pub fn stamp(&mut self, n: u64, rate: u32) -> Option<Stamp> {
        let base = self.base?;
        let start = clock::frames_to_time(self.samples, rate)?;
        let end = clock::frames_to_time(self.samples + n, rate)?;
        self.samples += n;
        Some(Stamp {
            pts: base + start,
            duration: end - start,
        })
    }

    /// 采样率变化时, 把已输出的采样折算进锚点
    pub fn rebase(&mut self, old_rate: u32) {
        if self.samples == 0 {
            return;
        }
        if let (Some(base), Some(elapsed)) =
            (self.base, clock::frames_to_time(self.samples, old_rate))
        {
            self.base = Some(base + elapsed);
            self.samples = 0;
        }
    }

    /// 强制设置锚点
    pub fn set_base(&mut self, base: Option<Duration>) {
        self.base = base;
        self.samples = 0;
    }

    /// 清除锚点
    pub fn reset(&mut self) {
        self.base = None;
        self.samples = 0;
    }

    /// 保存当前状态
    pub fn anchor(&self) -> Anchor {
        Anchor {
            base: self.base,
            samples: self.samples,
        }
    }

    /// 恢复保存的状态
    pub fn restore(&mut self, anchor: Anchor) {
        self.base = anchor.base;
        self.samples = anchor.samples;
    }
}
