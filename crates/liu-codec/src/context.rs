//! 解码会话状态.
//!
//! `DecoderContext` 持有一个解码会话的全部流状态, 并作为基类交给实现方的句柄:
//! 实现方通过它交回解码输出、声明输出格式、报告错误.

use liu_core::{
    AudioInfo, Buffer, Caps, Event, Format, LiuError, LiuResult, Query, QueryAnswer, Segment,
    TagList, clock,
};
use log::{debug, error, trace, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::aggregator::OutputAggregator;
use crate::pad::{Output, Upstream};
use crate::reverse::ReverseQueues;
use crate::settings::DecoderSettings;
use crate::timestamp::TimestampReconciler;

/// 获取互斥锁, 持锁线程 panic 后仍继续使用其数据
pub(crate) fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 解码器声明的延迟区间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LatencyRange {
    /// 最小延迟
    pub min: Duration,
    /// 最大延迟, `None` 表示无上限
    pub max: Option<Duration>,
}

/// 解码会话上下文
pub struct DecoderContext {
    pub(crate) settings: Arc<Mutex<DecoderSettings>>,
    pub(crate) latency: Arc<Mutex<LatencyRange>>,
    pub(crate) upstream: Arc<Mutex<Box<dyn Upstream>>>,

    /// 协商后的输出格式
    pub(crate) info: Option<AudioInfo>,
    /// 输入格式
    pub(crate) input_caps: Option<Caps>,
    pub(crate) input_segment: Segment,
    pub(crate) output_segment: Segment,

    /// 已交给实现方、尚未交代的输入帧
    pub(crate) frames: VecDeque<Buffer>,
    pub(crate) reconciler: TimestampReconciler,
    pub(crate) aggregator: OutputAggregator,
    pub(crate) reverse: ReverseQueues,

    /// 等待第一个输出缓冲区一同下发的事件
    pub(crate) pending_events: Vec<Event>,
    /// 本次调用中产生的输出, 由基类统一后处理
    pub(crate) staged: Vec<Output>,
    pub(crate) taglist: Option<TagList>,

    pub(crate) discont: bool,
    pub(crate) drained: bool,
    /// 排空阶段, 允许交代数超出队列长度
    pub(crate) force: bool,
    pub(crate) eos: bool,

    pub(crate) bytes_in: u64,
    pub(crate) samples_out: u64,
    pub(crate) error_count: i32,
    /// 连续丢弃的失步字节数
    pub(crate) sync_flush: usize,
    /// 是否允许聚合, 首个数据到达时探测一次
    pub(crate) agg: Option<bool>,

    pub(crate) plc_aware: bool,
    pub(crate) byte_time: bool,
    pub(crate) drainable: bool,
    pub(crate) needs_format: bool,
}

impl DecoderContext {
    pub(crate) fn new(
        settings: Arc<Mutex<DecoderSettings>>,
        latency: Arc<Mutex<LatencyRange>>,
        upstream: Arc<Mutex<Box<dyn Upstream>>>,
    ) -> Self {
        let s = *lock(&settings);
        Self {
            settings,
            latency,
            upstream,
            info: None,
            input_caps: None,
            input_segment: Segment::default(),
            output_segment: Segment::default(),
            frames: VecDeque::new(),
            reconciler: TimestampReconciler::new(s.tolerance),
            aggregator: OutputAggregator::new(s.min_latency, s.aggregate_tolerance),
            reverse: ReverseQueues::new(),
            pending_events: Vec::new(),
            staged: Vec::new(),
            taglist: None,
            discont: true,
            drained: true,
            force: false,
            eos: false,
            bytes_in: 0,
            samples_out: 0,
            error_count: 0,
            sync_flush: 0,
            agg: None,
            plc_aware: false,
            byte_time: false,
            drainable: true,
            needs_format: false,
        }
    }

    /// 当前配置快照
    pub fn settings(&self) -> DecoderSettings {
        *lock(&self.settings)
    }

    /// 交回解码输出
    ///
    /// - `buffer`: 解码后的 PCM 数据, 长度须为整采样帧; `None` 表示这些输入帧
    ///   没有输出 (被丢弃), 同时强制下发已聚合的数据
    /// - `frames`: 本次交代的输入帧数; 负数表示从队尾倒数, `-1` 即全部
    pub fn finish_frame(&mut self, buffer: Option<Buffer>, frames: i32) -> LiuResult<()> {
        if frames == 0 {
            return Err(LiuError::InvalidArgument("交代的输入帧数不能为 0".into()));
        }

        // 挂起的事件先于数据下发
        for ev in self.pending_events.drain(..) {
            self.staged.push(Output::Event(ev));
        }

        let mut samples = 0u64;
        if let Some(buf) = &buffer {
            let info = self
                .info
                .ok_or_else(|| LiuError::NotNegotiated("输出格式未设置".into()))?;
            let bpf = info.bpf();
            if bpf == 0 {
                return Err(LiuError::NotNegotiated("输出格式每帧字节数为 0".into()));
            }
            if buf.len() % bpf != 0 {
                error!("输出 {} 字节不是整采样帧 (每帧 {} 字节)", buf.len(), bpf);
                return Err(LiuError::BufferSizeMismatch {
                    size: buf.len(),
                    bpf,
                });
            }
            samples = (buf.len() / bpf) as u64;
        }

        let queued = self.frames.len();
        let count = if frames > 0 {
            let requested = frames as usize;
            if requested > queued {
                if !self.force {
                    error!("交代 {requested} 帧, 但只有 {queued} 帧在队列中");
                    return Err(LiuError::FrameAccountingOverflow { requested, queued });
                }
                queued
            } else {
                requested
            }
        } else {
            // -1 表示全部, -2 表示保留最后一帧, 以此类推
            let keep = (-(i64::from(frames)) - 1) as usize;
            if keep > queued {
                if !self.force {
                    return Err(LiuError::FrameAccountingOverflow {
                        requested: keep,
                        queued,
                    });
                }
                0
            } else {
                queued - keep
            }
        };

        let ts = self.frames.front().and_then(|f| f.pts);
        trace!(
            "交代 {count} 帧, 输出 {samples} 采样, 输入时间戳 {}",
            clock::display(ts)
        );
        self.frames.drain(..count);

        let Some(mut buffer) = buffer else {
            return self.output(None);
        };
        let Some(info) = self.info else {
            return Err(LiuError::NotNegotiated("输出格式未设置".into()));
        };

        let settings = self.settings();
        let fallback = if self.output_segment.rate > 0.0 && self.output_segment.format == Format::Time {
            Duration::from_nanos(self.output_segment.start)
        } else {
            Duration::ZERO
        };
        self.reconciler.set_tolerance(settings.tolerance);
        if self.reconciler.observe(ts, fallback, info.rate) {
            debug!("时间线重新同步到 {}", clock::display(ts));
        }

        if let Some(tags) = self.taglist.take() {
            if !tags.is_empty() {
                self.staged.push(Output::Event(Event::Tags(tags)));
            }
        }

        if let Some(stamp) = self.reconciler.stamp(samples, info.rate) {
            buffer.pts = Some(stamp.pts);
            buffer.duration = Some(stamp.duration);
        }
        self.samples_out += samples;

        if self.error_count > 0 {
            self.error_count -= 1;
        }

        self.output(Some(buffer))
    }

    /// 经聚合后进入下发队列; 倒放时进入倒序输出队列
    pub(crate) fn output(&mut self, buffer: Option<Buffer>) -> LiuResult<()> {
        let settings = self.settings();
        self.aggregator
            .configure(settings.min_latency, settings.aggregate_tolerance);
        self.aggregator.set_allowed(self.agg.unwrap_or(false));

        let out = match buffer {
            Some(b) => self.aggregator.push(b),
            None => self.aggregator.drain().into_iter().collect(),
        };
        for b in out {
            if self.output_segment.rate > 0.0 {
                self.staged.push(Output::Buffer(b));
            } else {
                self.reverse.queue_output(b);
            }
        }
        Ok(())
    }

    /// 设置输出格式
    ///
    /// 采样率变化时, 已输出的采样按旧采样率折算进时间线锚点.
    pub fn set_output_format(&mut self, info: AudioInfo) -> LiuResult<()> {
        if !info.is_valid() {
            return Err(LiuError::InvalidArgument(format!("无效的输出格式 {info:?}")));
        }
        if let Some(old) = self.info {
            if old == info {
                return Ok(());
            }
            if old.rate != info.rate {
                self.reconciler.rebase(old.rate);
            }
        }
        debug!(
            "输出格式: {} Hz, {} 声道, {}",
            info.rate, info.channels, info.format
        );
        self.info = Some(info);
        self.staged.push(Output::Event(Event::Caps(Caps::raw(info))));
        Ok(())
    }

    /// 协商后的输出格式
    pub fn output_info(&self) -> Option<AudioInfo> {
        self.info
    }

    /// 输入格式
    pub fn input_caps(&self) -> Option<&Caps> {
        self.input_caps.as_ref()
    }

    /// 报告一次解码错误
    ///
    /// 错误计数按 `weight` 累加, 超过 `max_errors` 时返回致命错误, 否则仅记录
    /// 警告并标记输出不连续.
    pub fn error(&mut self, weight: i32, message: impl Into<String>) -> LiuResult<()> {
        let message = message.into();
        self.error_count += weight;
        self.discont = true;
        let max = self.settings().max_errors;
        if max >= 0 && self.error_count > max {
            error!("{message} (累计错误 {} 超过上限 {max})", self.error_count);
            return Err(LiuError::Decode(message));
        }
        warn!("{message} (累计错误 {})", self.error_count);
        Ok(())
    }

    /// 当前错误计数
    pub fn error_count(&self) -> i32 {
        self.error_count
    }

    /// 声明解码延迟
    pub fn set_latency(&mut self, min: Duration, max: Option<Duration>) {
        *lock(&self.latency) = LatencyRange { min, max };
    }

    /// 已声明的解码延迟
    pub fn latency(&self) -> LatencyRange {
        *lock(&self.latency)
    }

    /// 声明支持丢包补偿
    pub fn set_plc_aware(&mut self, aware: bool) {
        self.plc_aware = aware;
    }

    /// 声明可按平均码率在字节与时间之间换算
    pub fn set_byte_time(&mut self, enabled: bool) {
        self.byte_time = enabled;
    }

    /// 声明排空时需要收到 `FrameInput::Drain`
    pub fn set_drainable(&mut self, drainable: bool) {
        self.drainable = drainable;
    }

    /// 声明在收到输入格式前不能处理数据
    pub fn set_needs_format(&mut self, needs: bool) {
        self.needs_format = needs;
    }

    /// 合并标签, 随下一个输出缓冲区下发
    pub fn merge_tags(&mut self, tags: &TagList) {
        self.taglist.get_or_insert_with(TagList::default).merge(tags);
    }

    /// 通知下游总时长已变化
    pub fn post_duration_changed(&mut self) {
        self.staged.push(Output::Event(Event::DurationChanged));
    }

    /// 下一个输出的推算时间戳
    pub fn expected_timestamp(&self) -> Option<Duration> {
        self.reconciler.expected(self.info?.rate)
    }

    /// 输入段
    pub fn input_segment(&self) -> &Segment {
        &self.input_segment
    }

    /// 输出段
    pub fn output_segment(&self) -> &Segment {
        &self.output_segment
    }

    /// 已交给实现方的输入字节数
    pub fn bytes_in(&self) -> u64 {
        self.bytes_in
    }

    /// 已输出的采样帧数
    pub fn samples_out(&self) -> u64 {
        self.samples_out
    }

    /// 尚未交代的输入帧数
    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    /// 是否处于排空阶段
    pub fn is_draining(&self) -> bool {
        self.force
    }

    /// 是否启用了丢包补偿
    pub fn plc_enabled(&self) -> bool {
        self.plc_aware && self.settings().plc
    }

    /// 向上游发起查询
    pub fn query_upstream(&self, query: &Query) -> Option<QueryAnswer> {
        lock(&self.upstream).query(query)
    }

    /// 上游字节总长
    pub fn upstream_bytes(&self) -> Option<u64> {
        match self.query_upstream(&Query::Duration(Format::Bytes))? {
            QueryAnswer::Duration(b) => Some(b),
            _ => None,
        }
    }

    pub(crate) fn take_staged(&mut self) -> Vec<Output> {
        std::mem::take(&mut self.staged)
    }
}
