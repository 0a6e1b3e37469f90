//! 原始音频格式信息与换算.

use serde::Serialize;
use std::time::Duration;

use crate::buffer::Buffer;
use crate::clock::{self, SECOND};
use crate::sample_format::SampleFormat;
use crate::segment::{Format, Segment};

/// 原始 (已解码) 音频格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AudioInfo {
    /// 采样率 (Hz)
    pub rate: u32,
    /// 声道数
    pub channels: u32,
    /// 采样格式
    pub format: SampleFormat,
}

impl AudioInfo {
    /// 创建音频格式信息
    pub fn new(rate: u32, channels: u32, format: SampleFormat) -> Self {
        Self {
            rate,
            channels,
            format,
        }
    }

    /// 每个采样帧 (所有声道各一个采样点) 的字节数
    pub fn bpf(&self) -> usize {
        self.channels as usize * self.format.bytes_per_sample() as usize
    }

    /// 格式是否完整可用
    pub fn is_valid(&self) -> bool {
        self.rate > 0 && self.bpf() > 0
    }

    /// 字节/采样帧/时间之间的换算
    ///
    /// 时间单位为纳秒. 无法换算 (格式未知或缺少参数) 时返回 `None`.
    pub fn convert(&self, src: Format, value: u64, dest: Format) -> Option<u64> {
        if src == dest {
            return Some(value);
        }
        if !self.is_valid() {
            return None;
        }
        let bpf = self.bpf() as u64;
        let rate = u64::from(self.rate);
        match (src, dest) {
            (Format::Bytes, Format::Default) => Some(value / bpf),
            (Format::Bytes, Format::Time) => clock::scale(value, SECOND, bpf * rate),
            (Format::Default, Format::Bytes) => value.checked_mul(bpf),
            (Format::Default, Format::Time) => clock::scale(value, SECOND, rate),
            // 时间转字节后对齐到整帧
            (Format::Time, Format::Bytes) => clock::scale(value, rate, SECOND)?.checked_mul(bpf),
            (Format::Time, Format::Default) => clock::scale(value, rate, SECOND),
            _ => None,
        }
    }

    /// 按段裁剪解码输出, 以整采样帧为单位
    ///
    /// 返回 `None` 表示整块落在段外, 应当丢弃. 非时间段或缺少时间戳的缓冲区原样返回.
    pub fn clip_buffer(&self, segment: &Segment, buffer: Buffer) -> Option<Buffer> {
        if segment.format != Format::Time || !self.is_valid() {
            return Some(buffer);
        }
        let Some(pts) = buffer.pts else {
            return Some(buffer);
        };
        let bpf = self.bpf();
        let frames = (buffer.len() / bpf) as u64;
        let duration = buffer
            .duration
            .or_else(|| clock::frames_to_time(frames, self.rate))?;
        let start = clock::nanos(pts);
        let stop = clock::nanos(pts + duration);

        let (cstart, cstop) = segment.clip(start, Some(stop))?;
        let cstop = cstop.unwrap_or(stop);
        if cstart == start && cstop == stop {
            return Some(buffer);
        }

        let head = clock::time_to_frames(Duration::from_nanos(cstart - start), self.rate);
        let tail = clock::time_to_frames(Duration::from_nanos(stop - cstop), self.rate);
        if head + tail >= frames {
            return None;
        }
        let kept = frames - head - tail;
        let begin = head as usize * bpf;
        let end = begin + kept as usize * bpf;

        let mut out = buffer;
        out.data = out.data.slice(begin..end);
        out.pts = Some(Duration::from_nanos(cstart));
        out.duration = Some(Duration::from_nanos(cstop - cstart));
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo_s16() -> AudioInfo {
        AudioInfo::new(48000, 2, SampleFormat::S16)
    }

    #[test]
    fn test_换算() {
        let info = stereo_s16();
        assert_eq!(info.bpf(), 4);
        assert_eq!(info.convert(Format::Bytes, 192_000, Format::Time), Some(SECOND));
        assert_eq!(info.convert(Format::Time, SECOND, Format::Bytes), Some(192_000));
        assert_eq!(info.convert(Format::Bytes, 400, Format::Default), Some(100));
        assert_eq!(info.convert(Format::Default, 48000, Format::Time), Some(SECOND));
        assert_eq!(info.convert(Format::Undefined, 1, Format::Time), None);
    }

    #[test]
    fn test_裁剪_去掉段前部分() {
        let info = stereo_s16();
        // 100 帧 = 2.0833ms, 段从 1ms 开始
        let buf = Buffer::new(vec![0u8; 400])
            .with_pts(Duration::ZERO)
            .with_duration(clock::frames_to_time(100, 48000).unwrap());
        let seg = Segment {
            start: clock::MSECOND,
            ..Segment::new(Format::Time)
        };
        let out = info.clip_buffer(&seg, buf).unwrap();
        assert_eq!(out.len(), (100 - 48) * 4);
        assert_eq!(out.pts, Some(Duration::from_millis(1)));
    }

    #[test]
    fn test_裁剪_段外丢弃() {
        let info = stereo_s16();
        let buf = Buffer::new(vec![0u8; 400])
            .with_pts(Duration::from_secs(5))
            .with_duration(Duration::from_millis(2));
        let seg = Segment {
            stop: Some(SECOND),
            ..Segment::new(Format::Time)
        };
        assert!(info.clip_buffer(&seg, buf).is_none());
    }
}
