//! 流式音频解码基类.
//!
//! `AudioDecoder` 把任意切分的编码字节流交给 `AudioDecoderImpl` 逐帧解码, 负责:
//! - 字节累积与帧定位、失步跳过
//! - 输出时间戳推算与抖动容忍
//! - 段裁剪、输出聚合、标签与挂起事件的下发顺序
//! - 倒放时的块重排
//! - 时间 seek 到字节 seek 的转换, 以及位置/时长/换算查询
//!
//! 所有流状态由一把流锁保护, 数据路径与控制路径 (flush、seek、配置) 在其上串行.
//! 配置与延迟各有独立的细粒度锁, 只读查询无需等待数据路径.
//! 锁顺序: 流锁 -> 配置/延迟/上游/输出队列.

use liu_core::{
    Buffer, Caps, Event, Format, LiuError, LiuResult, Query, QueryAnswer, SeekEvent, SeekFlags,
    Segment, clock,
};
use log::{debug, info, trace, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::adapter::Adapter;
use crate::context::{DecoderContext, LatencyRange, lock};
use crate::convert::encoded_audio_convert;
use crate::decoder::{AudioDecoderImpl, FrameInput, ParseOutcome, ParseState};
use crate::pad::{NullUpstream, Output, Upstream};
use crate::seek::{SeekPoint, SeekTranslator};
use crate::settings::DecoderSettings;

/// 连续失步跳过的字节上限, 超过即判定为无法同步
pub const MAX_SYNC_FLUSH: usize = 163_840;

/// 流式音频解码器
pub struct AudioDecoder<D: AudioDecoderImpl> {
    stream: Mutex<Stream<D>>,
    settings: Arc<Mutex<DecoderSettings>>,
    latency: Arc<Mutex<LatencyRange>>,
    upstream: Arc<Mutex<Box<dyn Upstream>>>,
    outbox: Mutex<VecDeque<Output>>,
}

/// 流锁保护的状态
struct Stream<D> {
    imp: D,
    ctx: DecoderContext,
    adapter: Adapter,
    seek: SeekTranslator,
    started: bool,
    flushing: bool,
    /// 本次调用产生、等待移入输出队列的数据与事件
    ready: Vec<Output>,
}

impl<D: AudioDecoderImpl> AudioDecoder<D> {
    /// 创建没有上游对端的解码器
    pub fn new(imp: D) -> Self {
        Self::with_upstream(imp, Box::new(NullUpstream))
    }

    /// 创建连接到上游对端的解码器
    pub fn with_upstream(imp: D, upstream: Box<dyn Upstream>) -> Self {
        Self::with_settings(imp, upstream, DecoderSettings::default())
    }

    /// 以指定配置创建解码器
    pub fn with_settings(imp: D, upstream: Box<dyn Upstream>, settings: DecoderSettings) -> Self {
        let settings = Arc::new(Mutex::new(settings));
        let latency = Arc::new(Mutex::new(LatencyRange::default()));
        let upstream = Arc::new(Mutex::new(upstream));
        let ctx = DecoderContext::new(settings.clone(), latency.clone(), upstream.clone());
        Self {
            stream: Mutex::new(Stream {
                imp,
                ctx,
                adapter: Adapter::new(),
                seek: SeekTranslator::new(),
                started: false,
                flushing: false,
                ready: Vec::new(),
            }),
            settings,
            latency,
            upstream,
            outbox: Mutex::new(VecDeque::new()),
        }
    }

    /// 解码器名称
    pub fn name(&self) -> String {
        lock(&self.stream).imp.name().to_string()
    }

    // ---------- 配置 ----------

    /// 当前配置
    pub fn settings(&self) -> DecoderSettings {
        *lock(&self.settings)
    }

    /// 整体替换配置
    pub fn set_settings(&self, settings: DecoderSettings) {
        *lock(&self.settings) = settings;
    }

    /// 设置输出聚合阈值
    pub fn set_min_latency(&self, min_latency: Duration) {
        lock(&self.settings).set_min_latency(min_latency);
    }

    /// 设置时间戳抖动容差
    pub fn set_tolerance(&self, tolerance: Duration) {
        lock(&self.settings).set_tolerance(tolerance);
    }

    /// 启用/禁用丢包补偿
    pub fn set_plc(&self, plc: bool) {
        lock(&self.settings).set_plc(plc);
    }

    /// 设置最大解码错误容忍数
    pub fn set_max_errors(&self, max_errors: i32) -> LiuResult<()> {
        lock(&self.settings).set_max_errors(max_errors)
    }

    /// 实现方声明的解码延迟
    pub fn latency(&self) -> LatencyRange {
        *lock(&self.latency)
    }

    /// 只读访问实现方状态
    pub fn with_impl<R>(&self, f: impl FnOnce(&D) -> R) -> R {
        f(&lock(&self.stream).imp)
    }

    // ---------- 生命周期 ----------

    /// 进入工作状态; 未显式调用时, 第一次送入数据或事件时自动进入
    pub fn start(&self) -> LiuResult<()> {
        self.run(|_| Ok(()))
    }

    /// 退出工作状态, 丢弃全部流状态
    pub fn stop(&self) -> LiuResult<()> {
        let mut s = lock(&self.stream);
        if !s.started {
            return Ok(());
        }
        let result = s.imp.stop();
        s.reset(true);
        s.started = false;
        debug!("{} 已停止", s.imp.name());
        result
    }

    // ---------- 数据路径 ----------

    /// 设置输入格式
    pub fn set_caps(&self, caps: Caps) -> LiuResult<()> {
        self.run(|s| s.set_caps(caps))
    }

    /// 送入一块编码数据
    pub fn push_buffer(&self, buffer: Buffer) -> LiuResult<()> {
        self.run(|s| {
            if s.flushing {
                return Err(LiuError::Flushing);
            }
            s.chain(buffer)
        })
    }

    /// 送入输入侧事件
    pub fn send_event(&self, event: Event) -> LiuResult<()> {
        self.run(|s| s.sink_event(event))
    }

    /// 取出一个待下发的数据或事件
    pub fn pop_output(&self) -> Option<Output> {
        lock(&self.outbox).pop_front()
    }

    /// 取出全部待下发的数据与事件
    pub fn take_outputs(&self) -> Vec<Output> {
        lock(&self.outbox).drain(..).collect()
    }

    // ---------- 控制路径 ----------

    /// 输出侧事件, 返回是否被处理
    pub fn src_event(&self, event: Event) -> bool {
        match event {
            Event::Seek(seek) => match self.seek(seek) {
                Ok(()) => true,
                Err(e) => {
                    debug!("seek 未被处理: {e}");
                    false
                }
            },
            other => self.push_upstream(other),
        }
    }

    /// 处理 seek 请求
    ///
    /// 先交给上游原样处理; 上游不支持时, 时间 seek 转换为字节 seek,
    /// 其他格式换算为时间后重试.
    pub fn seek(&self, seek: SeekEvent) -> LiuResult<()> {
        if self.push_upstream(Event::Seek(seek.clone())) {
            debug!("上游直接处理了 seek");
            return Ok(());
        }

        if seek.format != Format::Time {
            let converted = {
                let s = lock(&self.stream);
                let start = s
                    .src_convert(seek.format, seek.start, Format::Time)
                    .ok_or_else(|| LiuError::UnsupportedSeek("无法换算起点".into()))?;
                let stop = match seek.stop {
                    Some(v) => Some(
                        s.src_convert(seek.format, v, Format::Time)
                            .ok_or_else(|| LiuError::UnsupportedSeek("无法换算终点".into()))?,
                    ),
                    None => None,
                };
                SeekEvent {
                    format: Format::Time,
                    start,
                    stop,
                    ..seek
                }
            };
            return self.seek(converted);
        }

        let byte_seek = lock(&self.stream).translate_seek(&seek)?;
        if self.push_upstream(Event::Seek(byte_seek)) {
            Ok(())
        } else {
            lock(&self.stream).seek.clear();
            Err(LiuError::UnsupportedSeek("上游拒绝字节 seek".into()))
        }
    }

    /// 输出侧查询
    pub fn src_query(&self, query: &Query) -> Option<QueryAnswer> {
        match query {
            Query::Position(format) => {
                if let Some(answer) = self.query_upstream(query) {
                    return Some(answer);
                }
                let s = lock(&self.stream);
                let segment = &s.ctx.output_segment;
                let time = segment.to_stream_time(segment.position?)?;
                s.src_convert(Format::Time, time, *format)
                    .map(QueryAnswer::Position)
            }
            Query::Duration(format) => {
                if let Some(answer) = self.query_upstream(query) {
                    return Some(answer);
                }
                let s = lock(&self.stream);
                let time = s.duration_time()?;
                s.src_convert(Format::Time, time, *format)
                    .map(QueryAnswer::Duration)
            }
            Query::Seeking(format) => {
                let upstream = self.query_upstream(query);
                if matches!(upstream, Some(QueryAnswer::Seeking { seekable: true, .. })) {
                    return upstream;
                }
                if *format != Format::Time {
                    return upstream.or(Some(QueryAnswer::Seeking {
                        seekable: false,
                        start: None,
                        stop: None,
                    }));
                }
                let s = lock(&self.stream);
                let bytes_seekable = matches!(
                    s.ctx.query_upstream(&Query::Seeking(Format::Bytes)),
                    Some(QueryAnswer::Seeking { seekable: true, .. })
                );
                let seekable = bytes_seekable && s.can_translate();
                Some(QueryAnswer::Seeking {
                    seekable,
                    start: seekable.then_some(0),
                    stop: if seekable { s.duration_time() } else { None },
                })
            }
            Query::Convert {
                src_format,
                src_value,
                dest_format,
            } => lock(&self.stream)
                .src_convert(*src_format, *src_value, *dest_format)
                .map(QueryAnswer::Convert),
            Query::Latency => {
                let Some(QueryAnswer::Latency { live, min, max }) = self.query_upstream(query)
                else {
                    return None;
                };
                let own = *lock(&self.latency);
                Some(QueryAnswer::Latency {
                    live,
                    min: min + own.min,
                    max: match (max, own.max) {
                        (Some(a), Some(b)) => Some(a + b),
                        _ => None,
                    },
                })
            }
            Query::Formats => Some(QueryAnswer::Formats(vec![
                Format::Default,
                Format::Bytes,
                Format::Time,
            ])),
        }
    }

    /// 输入侧查询
    pub fn sink_query(&self, query: &Query) -> Option<QueryAnswer> {
        match query {
            Query::Convert {
                src_format,
                src_value,
                dest_format,
            } => lock(&self.stream)
                .sink_convert(*src_format, *src_value, *dest_format)
                .map(QueryAnswer::Convert),
            Query::Formats => Some(QueryAnswer::Formats(vec![Format::Bytes, Format::Time])),
            _ => self.query_upstream(query),
        }
    }

    fn push_upstream(&self, event: Event) -> bool {
        lock(&self.upstream).push_event(event)
    }

    fn query_upstream(&self, query: &Query) -> Option<QueryAnswer> {
        lock(&self.upstream).query(query)
    }

    /// 在流锁下执行一次操作, 随后把产生的输出移入输出队列
    fn run<R>(&self, f: impl FnOnce(&mut Stream<D>) -> LiuResult<R>) -> LiuResult<R> {
        let mut s = lock(&self.stream);
        let result = if s.started {
            f(&mut s)
        } else {
            s.start().and_then(|()| f(&mut s))
        };
        s.dispatch();
        if !s.ready.is_empty() {
            let ready = std::mem::take(&mut s.ready);
            lock(&self.outbox).extend(ready);
        }
        result
    }

    fn lock_stream(&self) -> MutexGuard<'_, Stream<D>> {
        lock(&self.stream)
    }
}

impl<D: AudioDecoderImpl> AudioDecoder<D> {
    /// 已输出的采样帧数
    pub fn samples_out(&self) -> u64 {
        self.lock_stream().ctx.samples_out
    }

    /// 已交给实现方的输入字节数
    pub fn bytes_in(&self) -> u64 {
        self.lock_stream().ctx.bytes_in
    }

    /// 当前输出段
    pub fn output_segment(&self) -> Segment {
        self.lock_stream().ctx.output_segment.clone()
    }
}

impl<D: AudioDecoderImpl> Stream<D> {
    fn start(&mut self) -> LiuResult<()> {
        self.reset(true);
        self.imp.start(&mut self.ctx)?;
        self.started = true;
        debug!("{} 已启动", self.imp.name());
        Ok(())
    }

    fn reset(&mut self, full: bool) {
        if full {
            self.ctx.bytes_in = 0;
            self.ctx.samples_out = 0;
            self.ctx.agg = None;
            self.ctx.error_count = 0;
            self.ctx.info = None;
            self.ctx.input_caps = None;
            self.ctx.taglist = None;
            self.ctx.input_segment = Segment::default();
            self.ctx.output_segment = Segment::default();
            self.ctx.pending_events.clear();
            self.ctx.reverse.clear();
            self.ctx.plc_aware = false;
            self.ctx.byte_time = false;
            self.ctx.set_latency(Duration::ZERO, Some(Duration::ZERO));
            self.seek.clear();
            self.flushing = false;
        }
        self.ctx.frames.clear();
        self.adapter.clear();
        self.ctx.aggregator.clear();
        self.ctx.reconciler.reset();
        self.ctx.drained = true;
        self.ctx.discont = true;
        self.ctx.eos = false;
        self.ctx.sync_flush = 0;
    }

    fn set_caps(&mut self, caps: Caps) -> LiuResult<()> {
        debug!("输入格式: {}", caps.media_type);
        self.imp.set_format(&mut self.ctx, &caps)?;
        self.ctx.input_caps = Some(caps);
        self.dispatch();
        Ok(())
    }

    /// 探测下游是否允许聚合: 上游声明非直播时允许
    fn setup(&mut self) {
        let answer = self.ctx.query_upstream(&Query::Latency);
        let allowed = matches!(answer, Some(QueryAnswer::Latency { live: false, .. }));
        debug!("输出聚合: {}", if allowed { "允许" } else { "禁止" });
        self.ctx.agg = Some(allowed);
    }

    fn chain(&mut self, buffer: Buffer) -> LiuResult<()> {
        if self.ctx.needs_format && self.ctx.input_caps.is_none() {
            return Err(LiuError::NotNegotiated("输入格式未设置".into()));
        }
        if self.ctx.agg.is_none() {
            self.setup();
        }
        trace!(
            "收到 {} 字节, 时间戳 {}, 不连续 {}",
            buffer.len(),
            clock::display(buffer.pts),
            buffer.is_discont()
        );

        if buffer.is_discont() {
            // 不连续点前后的时间线相互独立, 但新数据没有时间戳时沿用旧锚点
            let anchor = self.ctx.reconciler.anchor();
            if self.ctx.input_segment.rate > 0.0 {
                debug!("输入不连续, 排空当前数据");
                self.flush(false)?;
                if buffer.pts.is_none() {
                    self.ctx.reconciler.restore(anchor);
                }
            }
            self.ctx.discont = true;
        }

        if self.ctx.input_segment.rate > 0.0 {
            self.chain_forward(buffer)
        } else {
            self.chain_reverse(Some(buffer))
        }
    }

    fn chain_forward(&mut self, buffer: Buffer) -> LiuResult<()> {
        self.ctx.drained = false;
        self.adapter.push(buffer);
        self.push_buffers(false)
    }

    /// 反复解析并解码累积的数据; `force` 为 true 时是排空
    fn push_buffers(&mut self, force: bool) -> LiuResult<()> {
        loop {
            let available = self.adapter.available();
            let frame = if available > 0 {
                let state = ParseState {
                    sync: !self.ctx.discont,
                    draining: force || self.ctx.eos,
                };
                let outcome = self.imp.parse(&mut self.ctx, &self.adapter, state)?;
                let (skip, len) = match outcome {
                    ParseOutcome::Frame { skip, len } => (skip, Some(len)),
                    ParseOutcome::NeedMoreData { skip } => (skip, None),
                };
                if skip > 0 {
                    let skip = skip.min(available);
                    debug!("跳过 {skip} 字节以重新同步");
                    self.adapter.flush(skip);
                    self.ctx.discont = true;
                    self.ctx.sync_flush += skip;
                    if self.ctx.sync_flush > MAX_SYNC_FLUSH {
                        warn!("已跳过 {} 字节仍无法同步", self.ctx.sync_flush);
                        return Err(LiuError::SyncFailure {
                            skipped: self.ctx.sync_flush,
                        });
                    }
                }
                let Some(len) = len else {
                    trace!("需要更多数据, 当前 {} 字节", self.adapter.available());
                    break;
                };
                if len == 0 || len > self.adapter.available() {
                    return Err(LiuError::InvalidData(format!(
                        "帧长度 {len} 超出可用数据 {}",
                        self.adapter.available()
                    )));
                }
                self.ctx.sync_flush = 0;
                Some(self.adapter.take(len)?)
            } else {
                if !force {
                    break;
                }
                if !self.ctx.drainable {
                    self.ctx.drained = true;
                    break;
                }
                None
            };

            let last = frame.is_none();
            self.handle_frame(frame)?;
            if last {
                self.ctx.drained = true;
                break;
            }
        }
        Ok(())
    }

    fn handle_frame(&mut self, frame: Option<Buffer>) -> LiuResult<()> {
        let result = match frame {
            Some(frame) => {
                trace!(
                    "解码帧 {} 字节, 时间戳 {}",
                    frame.len(),
                    clock::display(frame.pts)
                );
                self.ctx.bytes_in += frame.len() as u64;
                self.ctx.frames.push_back(frame.clone());
                self.imp.handle_frame(&mut self.ctx, FrameInput::Data(&frame))
            }
            None => self.imp.handle_frame(&mut self.ctx, FrameInput::Drain),
        };
        self.dispatch();
        result
    }

    /// 补偿 `gap` 时长的缺失数据
    fn conceal(&mut self, gap: Duration) -> LiuResult<()> {
        debug!("丢包补偿 {gap:?}");
        let mut frame = Buffer::new(Vec::new()).with_duration(gap);
        frame.pts = self.ctx.output_segment.position.map(Duration::from_nanos);
        self.ctx.frames.push_back(frame);
        let result = self.imp.handle_frame(&mut self.ctx, FrameInput::Conceal(gap));
        self.dispatch();
        result
    }

    fn drain(&mut self) -> LiuResult<()> {
        if self.ctx.drained && self.ctx.reverse.is_gather_empty() {
            return Ok(());
        }
        if self.ctx.input_segment.rate < 0.0 && !self.ctx.reverse.is_gather_empty() {
            self.chain_reverse(None)?;
        }

        self.ctx.force = true;
        let result = self.push_buffers(true);
        self.ctx.force = false;
        result?;

        self.ctx.output(None)?;
        self.dispatch();

        if !self.ctx.frames.is_empty() {
            warn!("排空后仍有 {} 个输入帧未被交代, 丢弃", self.ctx.frames.len());
            self.ctx.frames.clear();
        }
        self.adapter.clear();
        Ok(())
    }

    /// `hard` 为 true 时丢弃全部数据 (seek), 否则先排空
    fn flush(&mut self, hard: bool) -> LiuResult<()> {
        let result = if hard {
            self.ctx.reverse.clear();
            self.ctx.input_segment = Segment::default();
            self.ctx.output_segment = Segment::default();
            self.ctx.error_count = 0;
            Ok(())
        } else {
            self.drain()
        };
        if self.ctx.samples_out > 0 {
            self.imp.flush(&mut self.ctx, hard);
            self.dispatch();
        }
        self.reset(false);
        result
    }

    // ---------- 倒放 ----------

    fn chain_reverse(&mut self, buffer: Option<Buffer>) -> LiuResult<()> {
        let mut result = Ok(());
        if buffer.as_ref().is_none_or(Buffer::is_discont) {
            self.ctx.reverse.move_gather_to_decode();
            result = self.flush_decode();
        }
        if let Some(buffer) = buffer {
            self.ctx.reverse.gather(buffer);
        }
        result
    }

    /// 正向解码一个块, 再把输出倒序下发
    fn flush_decode(&mut self) -> LiuResult<()> {
        debug!("倒放: 解码 {} 个缓冲区", self.ctx.reverse.decode_len());
        self.flush(false)?;

        let mut retained = VecDeque::new();
        for buffer in self.ctx.reverse.take_decode() {
            let before = self.ctx.samples_out;
            self.chain_forward(buffer.clone())?;
            if self.ctx.samples_out == before {
                trace!("缓冲区 {} 暂无输出, 保留到下一轮", clock::display(buffer.pts));
                retained.push_back(buffer);
            }
        }
        self.ctx.reverse.retain_decode(retained);

        self.drain()?;

        for buffer in self.ctx.reverse.take_output() {
            self.push_forward(buffer);
        }
        Ok(())
    }

    // ---------- 下发 ----------

    /// 对实现方本次产生的输出做后处理
    fn dispatch(&mut self) {
        for item in self.ctx.take_staged() {
            match item {
                Output::Buffer(buffer) => self.push_forward(buffer),
                Output::Event(event) => self.ready.push(Output::Event(event)),
            }
        }
    }

    /// 裁剪、打不连续标志、更新位置后下发
    fn push_forward(&mut self, buffer: Buffer) {
        let buffer = match self.ctx.info {
            Some(info) => match info.clip_buffer(&self.ctx.output_segment, buffer) {
                Some(b) => b,
                None => {
                    trace!("缓冲区落在段外, 丢弃");
                    return;
                }
            },
            None => buffer,
        };
        let mut buffer = buffer;
        if self.ctx.discont {
            buffer.set_discont(true);
            self.ctx.discont = false;
        }

        let position = if self.ctx.output_segment.rate >= 0.0 {
            buffer.end()
        } else {
            buffer.pts
        };
        if let Some(position) = position {
            self.ctx.output_segment.position = Some(clock::nanos(position));
        }

        let Some(buffer) = self.imp.pre_push(buffer) else {
            return;
        };
        trace!(
            "下发 {} 字节, 时间戳 {}, 时长 {}",
            buffer.len(),
            clock::display(buffer.pts),
            clock::display(buffer.duration)
        );
        self.ready.push(Output::Buffer(buffer));
    }

    // ---------- 事件 ----------

    fn sink_event(&mut self, event: Event) -> LiuResult<()> {
        if self.imp.sink_event(&mut self.ctx, &event) {
            self.dispatch();
            return Ok(());
        }
        trace!("输入侧事件 {}", event.name());

        match event {
            Event::Caps(caps) => self.set_caps(caps),
            Event::Segment { update, segment } => self.handle_segment(update, segment),
            Event::FlushStart => {
                self.flushing = true;
                self.ready.push(Output::Event(Event::FlushStart));
                Ok(())
            }
            Event::FlushStop => {
                self.flushing = false;
                let result = self.flush(true);
                self.ctx.pending_events.clear();
                self.ready.push(Output::Event(Event::FlushStop));
                result
            }
            Event::Eos => {
                self.ctx.eos = true;
                let result = self.drain();
                // 没有任何输出时挂起的事件也要送达
                for ev in self.ctx.pending_events.drain(..) {
                    self.ready.push(Output::Event(ev));
                }
                self.ready.push(Output::Event(Event::Eos));
                result
            }
            other if other.is_serialized() => {
                self.ctx.pending_events.push(other);
                Ok(())
            }
            other => {
                self.ready.push(Output::Event(other));
                Ok(())
            }
        }
    }

    fn handle_segment(&mut self, update: bool, segment: Segment) -> LiuResult<()> {
        let mut segment = segment;
        let mut timing_base = None;

        if segment.format != Format::Time {
            if let Some(resolved) = self.seek.resolve(&segment) {
                timing_base = Some(resolved.timestamp_start);
                segment = resolved.segment;
            } else if self.ctx.byte_time && segment.format == Format::Bytes {
                let Some(start) = self.sink_convert(Format::Bytes, segment.start, Format::Time)
                else {
                    debug!("无法把字节段换算为时间, 忽略");
                    return Ok(());
                };
                debug!("字节段 {} 换算为时间段 {}", segment.start, start);
                segment = Segment {
                    format: Format::Time,
                    start,
                    stop: None,
                    time: start,
                    position: None,
                    duration: None,
                    ..segment
                };
                timing_base = Some(Duration::from_nanos(start));
            } else {
                debug!("不支持 {} 格式的段, 忽略", segment.format);
                return Ok(());
            }
        }

        self.drain()?;

        if update {
            let plc = self.ctx.settings().plc;
            if plc && self.ctx.plc_aware && self.ctx.output_segment.rate > 0.0 {
                if let Some(position) = self.ctx.output_segment.position {
                    if position < segment.start {
                        let gap = Duration::from_nanos(segment.start - position);
                        if let Err(e) = self.conceal(gap) {
                            warn!("丢包补偿失败: {e}");
                        }
                    }
                }
            }
            segment.position = self.ctx.output_segment.position;
        } else {
            self.flush(false)?;
            if timing_base.is_some() {
                self.ctx.reconciler.set_base(timing_base);
            }
        }

        info!(
            "新段: {} [{}, {}) 速率 {}",
            segment.format,
            segment.start,
            segment
                .stop
                .map_or_else(|| "-".to_string(), |s| s.to_string()),
            segment.rate
        );
        self.ctx.input_segment = segment.clone();
        self.ctx.output_segment = segment.clone();
        self.ctx
            .pending_events
            .push(Event::Segment { update, segment });
        Ok(())
    }

    // ---------- 换算与 seek ----------

    fn src_convert(&self, src: Format, value: u64, dest: Format) -> Option<u64> {
        if src == dest {
            return Some(value);
        }
        self.ctx.info?.convert(src, value, dest)
    }

    fn sink_convert(&self, src: Format, value: u64, dest: Format) -> Option<u64> {
        self.imp.convert(src, value, dest).or_else(|| {
            encoded_audio_convert(
                self.ctx.info.as_ref(),
                self.ctx.bytes_in,
                self.ctx.samples_out,
                src,
                value,
                dest,
            )
        })
    }

    /// 是否已有足够统计数据按平均码率换算
    fn do_byte(&self) -> bool {
        self.ctx.byte_time
            && self
                .ctx
                .info
                .is_some_and(|i| i.is_valid() && self.ctx.samples_out >= u64::from(i.rate))
    }

    fn can_translate(&self) -> bool {
        self.do_byte() || self.imp.seek_point(Duration::ZERO, false).is_some()
    }

    fn duration_time(&self) -> Option<u64> {
        if let Some(d) = self.imp.duration() {
            return Some(clock::nanos(d));
        }
        if !self.do_byte() {
            return None;
        }
        let bytes = self.ctx.upstream_bytes()?;
        self.sink_convert(Format::Bytes, bytes, Format::Time)
    }

    fn translate_seek(&mut self, seek: &SeekEvent) -> LiuResult<SeekEvent> {
        SeekTranslator::check(seek)?;
        let target = Duration::from_nanos(seek.start);
        let accurate = seek.flags.contains(SeekFlags::ACCURATE);
        let point = match self.imp.seek_point(target, accurate) {
            Some(point) => point,
            None => {
                if !self.do_byte() {
                    return Err(LiuError::UnsupportedSeek("缺少字节与时间的换算依据".into()));
                }
                let byte = self
                    .sink_convert(Format::Time, seek.start, Format::Bytes)
                    .ok_or_else(|| LiuError::UnsupportedSeek("无法换算字节位置".into()))?;
                SeekPoint { byte, time: target }
            }
        };
        Ok(self.seek.register(seek, &self.ctx.output_segment, point))
    }
}
