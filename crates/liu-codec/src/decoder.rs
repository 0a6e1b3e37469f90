//! 音频解码器扩展接口.
//!
//! 基类 `AudioDecoder` 负责缓冲、时间戳、聚合、倒放与 seek 转换, 具体编码格式
//! 只需实现 `AudioDecoderImpl`:
//!
//! 1. `parse()` 在累积的字节中定位下一帧 (可选, 默认整块作为一帧)
//! 2. `handle_frame()` 解码该帧, 通过 `DecoderContext::finish_frame()` 交回输出
//! 3. 其余回调在格式协商、flush、事件到达时被调用

use liu_core::{Buffer, Caps, Event, Format, LiuResult};
use std::time::Duration;

use crate::adapter::Adapter;
use crate::context::DecoderContext;
use crate::seek::SeekPoint;

/// `parse()` 时的流状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseState {
    /// 上一帧之后数据是否连续; 为 false 时解析器应重新校验同步
    pub sync: bool,
    /// 是否正在排空 (流结束或 flush), 此后不会再有新数据
    pub draining: bool,
}

/// `parse()` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// 跳过 `skip` 字节后有一个长度为 `len` 的完整帧
    Frame { skip: usize, len: usize },
    /// 跳过 `skip` 字节后需要更多数据
    NeedMoreData { skip: usize },
}

/// 交给 `handle_frame()` 的输入
#[derive(Debug, Clone, Copy)]
pub enum FrameInput<'a> {
    /// 一个完整的编码帧
    Data(&'a Buffer),
    /// 需要补偿的缺失时长 (丢包补偿)
    Conceal(Duration),
    /// 排空: 输出内部缓存的全部数据
    Drain,
}

/// 音频解码器实现
pub trait AudioDecoderImpl: Send {
    /// 解码器名称
    fn name(&self) -> &str;

    /// 进入工作状态, 可在此声明能力 (丢包补偿、字节时间换算等)
    fn start(&mut self, _ctx: &mut DecoderContext) -> LiuResult<()> {
        Ok(())
    }

    /// 退出工作状态
    fn stop(&mut self) -> LiuResult<()> {
        Ok(())
    }

    /// 输入格式到达
    fn set_format(&mut self, ctx: &mut DecoderContext, caps: &Caps) -> LiuResult<()>;

    /// 在累积数据中定位下一帧
    ///
    /// 默认实现把全部可用数据当作一帧.
    fn parse(
        &mut self,
        _ctx: &mut DecoderContext,
        adapter: &Adapter,
        _state: ParseState,
    ) -> LiuResult<ParseOutcome> {
        Ok(ParseOutcome::Frame {
            skip: 0,
            len: adapter.available(),
        })
    }

    /// 解码一帧
    ///
    /// 每次调用都应最终以 `finish_frame()` 交代该帧 (可合并多帧或延迟交代).
    fn handle_frame(&mut self, ctx: &mut DecoderContext, input: FrameInput<'_>) -> LiuResult<()>;

    /// 丢弃内部状态; `hard` 表示 seek 引起的完全清空
    fn flush(&mut self, _ctx: &mut DecoderContext, _hard: bool) {}

    /// 输入侧事件, 返回 true 表示已处理, 基类不再处理
    fn sink_event(&mut self, _ctx: &mut DecoderContext, _event: &Event) -> bool {
        false
    }

    /// 输出前的最后一次改写机会, 返回 `None` 丢弃该缓冲区
    fn pre_push(&mut self, buffer: Buffer) -> Option<Buffer> {
        Some(buffer)
    }

    /// 编码数据的格式换算 (输入侧), 无专用表时返回 `None` 由基类估算
    fn convert(&self, _src: Format, _value: u64, _dest: Format) -> Option<u64> {
        None
    }

    /// 已知的总时长
    fn duration(&self) -> Option<Duration> {
        None
    }

    /// 时间 seek 目标对应的字节位置
    ///
    /// `accurate` 为 true 时应返回能正确解码目标位置所需的最早位置.
    fn seek_point(&self, _target: Duration, _accurate: bool) -> Option<SeekPoint> {
        None
    }
}
