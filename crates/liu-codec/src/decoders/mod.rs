//! 解码器实现模块.

pub mod pcm;

pub use pcm::{PcmDecoder, PcmVariant};
