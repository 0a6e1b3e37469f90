//! PCM 音频解码器.
//!
//! 将未压缩的 PCM 字节流按整采样帧切分, 转换为本机字节序输出.
//! 支持 6 种 PCM 变体, 共用解码逻辑.

use liu_core::{AudioInfo, Buffer, Caps, LiuError, LiuResult, SampleFormat};
use log::debug;

use crate::adapter::Adapter;
use crate::context::DecoderContext;
use crate::decoder::{AudioDecoderImpl, FrameInput, ParseOutcome, ParseState};

/// PCM 变体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcmVariant {
    U8,
    S16le,
    S16be,
    S24le,
    S32le,
    F32le,
}

/// PCM 格式描述, 描述各 PCM 变体的差异
struct PcmFormatDesc {
    /// 名称, 同时是输入格式的媒体类型后缀
    name: &'static str,
    /// 码流中每个样本的字节数
    bytes_per_sample: u32,
    /// 输出的采样格式
    output_format: SampleFormat,
    /// 解码转换函数: 将码流字节转换为输出格式字节
    decode_fn: fn(&[u8], &mut Vec<u8>),
}

/// 直接拷贝
fn decode_copy(src: &[u8], dst: &mut Vec<u8>) {
    dst.extend_from_slice(src);
}

/// S16 大端转小端: 每 2 字节翻转
fn decode_s16be(src: &[u8], dst: &mut Vec<u8>) {
    for chunk in src.chunks_exact(2) {
        dst.push(chunk[1]);
        dst.push(chunk[0]);
    }
}

/// S24LE 符号扩展到 S32: 3 字节 -> 4 字节
fn decode_s24le(src: &[u8], dst: &mut Vec<u8>) {
    for chunk in src.chunks_exact(3) {
        let sign_ext = if chunk[2] & 0x80 != 0 { 0xFF } else { 0x00 };
        dst.extend_from_slice(&[chunk[0], chunk[1], chunk[2], sign_ext]);
    }
}

fn format_desc(variant: PcmVariant) -> PcmFormatDesc {
    match variant {
        PcmVariant::U8 => PcmFormatDesc {
            name: "pcm_u8",
            bytes_per_sample: 1,
            output_format: SampleFormat::U8,
            decode_fn: decode_copy,
        },
        PcmVariant::S16le => PcmFormatDesc {
            name: "pcm_s16le",
            bytes_per_sample: 2,
            output_format: SampleFormat::S16,
            decode_fn: decode_copy,
        },
        PcmVariant::S16be => PcmFormatDesc {
            name: "pcm_s16be",
            bytes_per_sample: 2,
            output_format: SampleFormat::S16,
            decode_fn: decode_s16be,
        },
        PcmVariant::S24le => PcmFormatDesc {
            name: "pcm_s24le",
            bytes_per_sample: 3,
            output_format: SampleFormat::S32,
            decode_fn: decode_s24le,
        },
        PcmVariant::S32le => PcmFormatDesc {
            name: "pcm_s32le",
            bytes_per_sample: 4,
            output_format: SampleFormat::S32,
            decode_fn: decode_copy,
        },
        PcmVariant::F32le => PcmFormatDesc {
            name: "pcm_f32le",
            bytes_per_sample: 4,
            output_format: SampleFormat::F32,
            decode_fn: decode_copy,
        },
    }
}

/// PCM 音频解码器
pub struct PcmDecoder {
    /// 格式描述
    desc: PcmFormatDesc,
    /// 每个样本块的字节数 (每样本字节数 * 声道数)
    block_align: usize,
    /// 单次解码的最大采样帧数, 0 表示不限制
    frame_size: usize,
}

impl PcmDecoder {
    /// 创建指定变体的解码器, 每次解码全部可用的整采样帧
    pub fn new(variant: PcmVariant) -> Self {
        Self {
            desc: format_desc(variant),
            block_align: 0,
            frame_size: 0,
        }
    }

    /// 限制单次解码的采样帧数
    pub fn with_frame_size(mut self, frame_size: usize) -> Self {
        self.frame_size = frame_size;
        self
    }
}

impl AudioDecoderImpl for PcmDecoder {
    fn name(&self) -> &str {
        self.desc.name
    }

    fn start(&mut self, ctx: &mut DecoderContext) -> LiuResult<()> {
        ctx.set_needs_format(true);
        ctx.set_byte_time(true);
        ctx.set_drainable(false);
        Ok(())
    }

    fn set_format(&mut self, ctx: &mut DecoderContext, caps: &Caps) -> LiuResult<()> {
        let rate = caps.rate.unwrap_or(0);
        let channels = caps.channels.unwrap_or(0);
        if rate == 0 {
            return Err(LiuError::InvalidArgument("采样率不能为 0".into()));
        }
        if channels == 0 {
            return Err(LiuError::InvalidArgument("声道数不能为 0".into()));
        }
        self.block_align = (self.desc.bytes_per_sample * channels) as usize;
        debug!(
            "打开 {} 解码器: {} Hz, {} 声道, 输出格式={}",
            self.desc.name, rate, channels, self.desc.output_format,
        );
        ctx.set_output_format(AudioInfo::new(rate, channels, self.desc.output_format))
    }

    fn parse(
        &mut self,
        _ctx: &mut DecoderContext,
        adapter: &Adapter,
        _state: ParseState,
    ) -> LiuResult<ParseOutcome> {
        if self.block_align == 0 {
            return Err(LiuError::NotNegotiated("输入格式未设置".into()));
        }
        let mut blocks = adapter.available() / self.block_align;
        if self.frame_size > 0 {
            blocks = blocks.min(self.frame_size);
        }
        if blocks == 0 {
            return Ok(ParseOutcome::NeedMoreData { skip: 0 });
        }
        Ok(ParseOutcome::Frame {
            skip: 0,
            len: blocks * self.block_align,
        })
    }

    fn handle_frame(&mut self, ctx: &mut DecoderContext, input: FrameInput<'_>) -> LiuResult<()> {
        let FrameInput::Data(frame) = input else {
            return Ok(());
        };
        let samples = frame.len() / self.desc.bytes_per_sample as usize;
        let mut decoded =
            Vec::with_capacity(samples * self.desc.output_format.bytes_per_sample() as usize);
        (self.desc.decode_fn)(&frame.data, &mut decoded);
        ctx.finish_frame(Some(Buffer::new(decoded)), 1)
    }
}
