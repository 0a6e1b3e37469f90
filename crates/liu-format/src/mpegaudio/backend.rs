//! 帧解码后端.
//!
//! 解析器负责分帧、时间戳与元数据, 单帧到 PCM 的解码交给 `FrameDecoder`.
//! 启用 `symphonia-backend` 特性时使用 symphonia 的 MPEG 音频解码器.

use liu_core::{LiuResult, SampleFormat};

use super::header::FrameHeader;

/// 单帧解码器
pub trait FrameDecoder: Send {
    /// 后端名称
    fn name(&self) -> &str;

    /// 输出的采样格式
    fn sample_format(&self) -> SampleFormat;

    /// 解码一个完整帧, 返回交错排列的 PCM 字节
    ///
    /// 返回空数据表示该帧没有输出 (如比特储备尚未填满).
    fn decode(&mut self, frame: &[u8], header: &FrameHeader) -> LiuResult<Vec<u8>>;

    /// 丢弃帧间状态 (seek 后调用)
    fn reset(&mut self);
}

/// 输出静音的解码器
///
/// 只验证分帧与时间线, 每帧输出与帧时长等长的 S16 静音.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilenceDecoder;

impl FrameDecoder for SilenceDecoder {
    fn name(&self) -> &str {
        "silence"
    }

    fn sample_format(&self) -> SampleFormat {
        SampleFormat::S16
    }

    fn decode(&mut self, _frame: &[u8], header: &FrameHeader) -> LiuResult<Vec<u8>> {
        let len = header.samples_per_frame as usize * header.channels() as usize * 2;
        Ok(vec![0u8; len])
    }

    fn reset(&mut self) {}
}

#[cfg(feature = "symphonia-backend")]
pub use self::symphonia::SymphoniaDecoder;

#[cfg(feature = "symphonia-backend")]
mod symphonia {
    use liu_core::{LiuError, LiuResult, SampleFormat};
    use log::trace;
    use symphonia_bundle_mp3::MpaDecoder as SymMpaDecoder;
    use symphonia_core::audio::SampleBuffer;
    use symphonia_core::codecs::{
        CODEC_TYPE_MP1, CODEC_TYPE_MP2, CODEC_TYPE_MP3, CodecParameters as SymCodecParameters,
        Decoder as SymDecoderTrait, DecoderOptions as SymDecoderOptions,
    };
    use symphonia_core::errors::Error as SymError;
    use symphonia_core::formats::Packet as SymPacket;

    use super::FrameDecoder;
    use crate::mpegaudio::header::FrameHeader;

    /// symphonia MPEG 音频解码器, 输出 F32
    pub struct SymphoniaDecoder {
        decoder: Option<SymMpaDecoder>,
        layer: u8,
        /// 已解码的采样帧数, 作为 packet 时间戳
        ts: u64,
    }

    impl SymphoniaDecoder {
        pub fn new() -> Self {
            Self {
                decoder: None,
                layer: 0,
                ts: 0,
            }
        }

        fn open(&mut self, layer: u8) -> LiuResult<&mut SymMpaDecoder> {
            if self.layer != layer {
                self.decoder = None;
            }
            if self.decoder.is_none() {
                let codec = match layer {
                    1 => CODEC_TYPE_MP1,
                    2 => CODEC_TYPE_MP2,
                    _ => CODEC_TYPE_MP3,
                };
                let params = SymCodecParameters {
                    codec,
                    ..Default::default()
                };
                let decoder = SymMpaDecoder::try_new(&params, &SymDecoderOptions::default())
                    .map_err(|e| LiuError::Decode(format!("symphonia 解码器初始化失败: {e}")))?;
                self.decoder = Some(decoder);
                self.layer = layer;
            }
            self.decoder
                .as_mut()
                .ok_or_else(|| LiuError::Decode("symphonia 解码器未初始化".into()))
        }
    }

    impl Default for SymphoniaDecoder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl FrameDecoder for SymphoniaDecoder {
        fn name(&self) -> &str {
            "symphonia"
        }

        fn sample_format(&self) -> SampleFormat {
            SampleFormat::F32
        }

        fn decode(&mut self, frame: &[u8], header: &FrameHeader) -> LiuResult<Vec<u8>> {
            let ts = self.ts;
            let dur = u64::from(header.samples_per_frame);
            self.ts += dur;
            let decoder = self.open(header.layer)?;
            let packet = SymPacket::new_from_slice(0, ts, dur, frame);
            let decoded = decoder.decode(&packet).map_err(|e| match e {
                SymError::DecodeError(msg) => LiuError::Decode(format!("帧解码失败: {msg}")),
                other => LiuError::Decode(format!("symphonia: {other}")),
            })?;

            let spec = *decoded.spec();
            if decoded.frames() == 0 {
                trace!("symphonia 本帧无输出");
                return Ok(Vec::new());
            }
            let mut samples = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            samples.copy_interleaved_ref(decoded);
            let mut out = Vec::with_capacity(samples.samples().len() * 4);
            for s in samples.samples() {
                out.extend_from_slice(&s.to_le_bytes());
            }
            Ok(out)
        }

        fn reset(&mut self) {
            if let Some(decoder) = self.decoder.as_mut() {
                decoder.reset();
            }
            self.ts = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_静音解码器输出长度() {
        let header = FrameHeader::parse(0xFFFB_9000).unwrap();
        let mut dec = SilenceDecoder;
        let pcm = dec.decode(&[0u8; 417], &header).unwrap();
        assert_eq!(pcm.len(), 1152 * 2 * 2);
        assert_eq!(dec.sample_format(), SampleFormat::S16);
    }
}
