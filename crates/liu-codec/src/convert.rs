//! 编码数据的字节/时间估算.
//!
//! 在没有专用索引的情况下, 用已消费字节数与已输出采样数的比例估算平均码率,
//! 据此在字节与时间之间换算.

use liu_core::{AudioInfo, Format, clock::SECOND};
use log::debug;

/// 编码数据的字节/时间换算
///
/// - `bytes`: 已消费的编码字节数
/// - `samples`: 已输出的采样帧数
///
/// 同格式、0 值原样返回; 统计数据不足时返回 `None`.
pub fn encoded_audio_convert(
    info: Option<&AudioInfo>,
    bytes: u64,
    samples: u64,
    src: Format,
    value: u64,
    dest: Format,
) -> Option<u64> {
    if src == dest || value == 0 {
        return Some(value);
    }
    let rate = info.map(|i| u64::from(i.rate)).unwrap_or(0);
    if samples == 0 || bytes == 0 || rate == 0 {
        debug!("统计数据不足, 暂无法换算");
        return None;
    }
    let bytes = u128::from(bytes) * u128::from(rate);
    let samples = u128::from(samples);
    let value = u128::from(value);
    let result = match (src, dest) {
        (Format::Bytes, Format::Time) => value * u128::from(SECOND) * samples / bytes,
        (Format::Time, Format::Bytes) => value * bytes / (samples * u128::from(SECOND)),
        _ => return None,
    };
    u64::try_from(result).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use liu_core::SampleFormat;

    #[test]
    fn test_按平均码率换算() {
        let info = AudioInfo::new(44100, 2, SampleFormat::S16);
        // 16000 字节对应 44100 采样 (1 秒) => 128 kbps
        let t = encoded_audio_convert(Some(&info), 16000, 44100, Format::Bytes, 32000, Format::Time);
        assert_eq!(t, Some(2 * SECOND));
        let b = encoded_audio_convert(Some(&info), 16000, 44100, Format::Time, SECOND, Format::Bytes);
        assert_eq!(b, Some(16000));
    }

    #[test]
    fn test_统计不足() {
        let info = AudioInfo::new(44100, 2, SampleFormat::S16);
        assert_eq!(
            encoded_audio_convert(Some(&info), 0, 0, Format::Bytes, 10, Format::Time),
            None
        );
        assert_eq!(
            encoded_audio_convert(None, 10, 10, Format::Bytes, 0, Format::Time),
            Some(0)
        );
    }
}
