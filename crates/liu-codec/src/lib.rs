//! # liu-codec
//!
//! Liu 流式音频框架的解码基类库.
//!
//! `AudioDecoder` 承担与具体编码格式无关的流处理: 字节累积、帧定位、输出时间戳推算、
//! 输出聚合、段裁剪、倒放重排、seek 转换与查询应答. 具体格式只需实现
//! `AudioDecoderImpl`.
//!
//! ## 使用示例
//!
//! ```rust
//! use liu_codec::{AudioDecoder, Output};
//! use liu_codec::decoders::{PcmDecoder, PcmVariant};
//! use liu_core::{Buffer, Caps};
//!
//! let dec = AudioDecoder::new(PcmDecoder::new(PcmVariant::S16le));
//! let mut caps = Caps::new("audio/x-raw");
//! caps.rate = Some(8000);
//! caps.channels = Some(1);
//! dec.set_caps(caps).unwrap();
//! dec.push_buffer(Buffer::new(vec![0u8; 160])).unwrap();
//!
//! let pcm: Vec<Buffer> = dec
//!     .take_outputs()
//!     .into_iter()
//!     .filter_map(Output::into_buffer)
//!     .collect();
//! assert_eq!(pcm[0].len(), 160);
//! ```

pub mod adapter;
pub mod aggregator;
pub mod audio_decoder;
pub mod context;
pub mod convert;
pub mod decoder;
pub mod decoders;
pub mod pad;
pub mod reverse;
pub mod seek;
pub mod settings;
pub mod timestamp;

// 重导出常用类型
pub use adapter::Adapter;
pub use audio_decoder::{AudioDecoder, MAX_SYNC_FLUSH};
pub use context::{DecoderContext, LatencyRange};
pub use decoder::{AudioDecoderImpl, FrameInput, ParseOutcome, ParseState};
pub use pad::{NullUpstream, Output, Upstream};
pub use seek::{ResolvedSeek, SeekIndex, SeekPoint, SeekTranslator};
pub use settings::DecoderSettings;
