//! # liu-format
//!
//! Liu 流式音频框架 MPEG 音频解析库.
//!
//! 本 crate 在 `liu-codec` 的解码基类上实现 MPEG 音频: 帧同步、VBR 元数据、
//! 字节与时间换算, 单帧解码交给可替换的后端.

pub mod mpegaudio;
pub mod probe;

// 重导出常用类型
pub use mpegaudio::{FrameDecoder, FrameHeader, MpegAudioDecoder, MpegAudioSettings};
pub use probe::{ProbeResult, ProbeScore};
