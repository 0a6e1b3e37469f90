//! # Liu (流)
//!
//! 纯 Rust 实现的流式音频解码框架.
//!
//! Liu 提供:
//! - **解码基类**: 把任意切分的编码字节流交给具体格式逐帧解码,
//!   负责时间戳推算、段裁剪、输出聚合、倒放重排、seek 换算与查询
//! - **MPEG 音频**: MPEG-1/2/2.5 Layer I/II/III 的帧同步、VBR 元数据 (Xing/Info/VBRI)
//!   与字节/时间换算
//!
//! # 快速开始
//!
//! ```rust
//! use liu::codec::{AudioDecoder, Output};
//! use liu::core::{Buffer, Caps};
//! use liu::format::mpegaudio::{MEDIA_TYPE, MpegAudioDecoder, MpegAudioSettings, SilenceDecoder};
//!
//! // 3 个 MPEG-1 Layer III 帧 (128 kbps, 44.1 kHz, 立体声)
//! let mut data = Vec::new();
//! for _ in 0..3 {
//!     let mut frame = vec![0u8; 417];
//!     frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
//!     data.extend(frame);
//! }
//!
//! let imp = MpegAudioDecoder::with_backend(MpegAudioSettings::default(), Box::new(SilenceDecoder));
//! let dec = AudioDecoder::new(imp);
//! dec.set_caps(Caps::new(MEDIA_TYPE)).unwrap();
//! dec.push_buffer(Buffer::new(data)).unwrap();
//! dec.send_event(liu::core::Event::Eos).unwrap();
//!
//! let pcm: Vec<Buffer> = dec
//!     .take_outputs()
//!     .into_iter()
//!     .filter_map(Output::into_buffer)
//!     .collect();
//! assert_eq!(pcm.len(), 3);
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `liu-core` | 缓冲区、段、事件、查询与时间换算 |
//! | `liu-codec` | 音频解码基类 |
//! | `liu-format` | MPEG 音频解析与探测 |

/// 核心类型与工具
pub use liu_core as core;

/// 音频解码基类
pub use liu_codec as codec;

/// MPEG 音频解析
pub use liu_format as format;

/// 获取 Liu 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// 以默认配置创建 MPEG 音频解码器
pub fn mpeg_audio_decoder() -> liu_codec::AudioDecoder<liu_format::MpegAudioDecoder> {
    liu_codec::AudioDecoder::new(liu_format::MpegAudioDecoder::new(
        liu_format::MpegAudioSettings::default(),
    ))
}
