//! MPEG 音频帧头解析.
//!
//! 帧头结构 (32 位):
//! ```text
//! AAAA AAAA  AAAB BCCD  EEEE FFGH  IIJJ KLMM
//! A = 同步位 (11 bit, 全1)   B = MPEG 版本    C = 层
//! D = CRC 保护 (0 表示有)    E = 比特率索引    F = 采样率索引
//! G = 填充位                H = 私有位        I = 声道模式
//! J = 模式扩展              K = 版权         L = 原始/复制
//! M = 强调
//! ```

use std::fmt;

/// 同一流内不应变化的帧头位: 同步、版本、层、CRC、采样率
pub const STREAM_MASK: u32 = 0xFFFF_0C00;

/// MPEG 音频版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MpegVersion {
    /// MPEG-1
    V1,
    /// MPEG-2
    V2,
    /// MPEG-2.5
    V25,
}

impl MpegVersion {
    /// 低采样率扩展标志 (MPEG-2/2.5 为 1)
    pub fn lsf(self) -> u32 {
        match self {
            Self::V1 => 0,
            Self::V2 | Self::V25 => 1,
        }
    }
}

impl fmt::Display for MpegVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => write!(f, "MPEG-1"),
            Self::V2 => write!(f, "MPEG-2"),
            Self::V25 => write!(f, "MPEG-2.5"),
        }
    }
}

/// 声道模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    Stereo,
    JointStereo,
    DualChannel,
    Mono,
}

impl ChannelMode {
    /// 标签中使用的名称
    pub fn name(self) -> &'static str {
        match self {
            Self::Stereo => "stereo",
            Self::JointStereo => "joint-stereo",
            Self::DualChannel => "dual-channel",
            Self::Mono => "mono",
        }
    }
}

/// 比特率表 (kbps), [lsf][layer - 1][索引], 索引 0 与 15 无效
const BITRATES: [[[u32; 16]; 3]; 2] = [
    [
        [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448, 0],
        [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 0],
        [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0],
    ],
    [
        [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256, 0],
        [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0],
        [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0],
    ],
];

/// MPEG-1 采样率表, MPEG-2 减半, MPEG-2.5 再减半
const SAMPLE_RATES_V1: [u32; 3] = [44100, 48000, 32000];

/// MPEG 音频帧头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// 原始 32 位帧头
    pub raw: u32,
    /// MPEG 版本
    pub version: MpegVersion,
    /// 层 (1, 2, 3)
    pub layer: u8,
    /// 是否有 CRC 校验
    pub has_crc: bool,
    /// 比特率 (bps)
    pub bitrate: u32,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 是否有填充字节
    pub padding: bool,
    /// 声道模式
    pub mode: ChannelMode,
    /// 强调
    pub emphasis: u8,
    /// 帧总字节数 (含头部)
    pub frame_len: usize,
    /// 每帧采样数
    pub samples_per_frame: u32,
}

impl FrameHeader {
    /// 解析 4 字节帧头, 结构无效时返回 `None`
    pub fn parse(header: u32) -> Option<Self> {
        if header & 0xFFE0_0000 != 0xFFE0_0000 {
            return None;
        }

        let version = match (header >> 19) & 0x3 {
            0 => MpegVersion::V25,
            2 => MpegVersion::V2,
            3 => MpegVersion::V1,
            _ => return None, // 1 = reserved
        };

        let layer = match (header >> 17) & 0x3 {
            1 => 3,
            2 => 2,
            3 => 1,
            _ => return None, // 0 = reserved
        };

        let has_crc = (header >> 16) & 0x1 == 0;

        // 0 为自由格式, 15 为无效
        let br_idx = ((header >> 12) & 0xF) as usize;
        if br_idx == 0 || br_idx == 15 {
            return None;
        }

        let sr_idx = ((header >> 10) & 0x3) as usize;
        if sr_idx == 3 {
            return None;
        }

        let emphasis = (header & 0x3) as u8;
        if emphasis == 2 {
            return None;
        }

        let padding = (header >> 9) & 0x1 == 1;
        let mode = match (header >> 6) & 0x3 {
            0 => ChannelMode::Stereo,
            1 => ChannelMode::JointStereo,
            2 => ChannelMode::DualChannel,
            _ => ChannelMode::Mono,
        };

        let lsf = version.lsf();
        let bitrate = BITRATES[lsf as usize][layer as usize - 1][br_idx] * 1000;
        let sample_rate = match version {
            MpegVersion::V1 => SAMPLE_RATES_V1[sr_idx],
            MpegVersion::V2 => SAMPLE_RATES_V1[sr_idx] / 2,
            MpegVersion::V25 => SAMPLE_RATES_V1[sr_idx] / 4,
        };

        let pad = u32::from(padding);
        let (frame_len, samples_per_frame) = match layer {
            1 => (4 * ((bitrate * 12) / sample_rate + pad), 384),
            2 => ((bitrate * 144) / sample_rate + pad, 1152),
            _ => (
                (bitrate * 144) / (sample_rate << lsf) + pad,
                if lsf == 1 { 576 } else { 1152 },
            ),
        };

        Some(Self {
            raw: header,
            version,
            layer,
            has_crc,
            bitrate,
            sample_rate,
            padding,
            mode,
            emphasis,
            frame_len: frame_len as usize,
            samples_per_frame,
        })
    }

    /// 从字节切片开头解析帧头
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let word = data.get(..4)?;
        Self::parse(u32::from_be_bytes([word[0], word[1], word[2], word[3]]))
    }

    /// 声道数
    pub fn channels(&self) -> u32 {
        if self.mode == ChannelMode::Mono { 1 } else { 2 }
    }

    /// 是否与 `other` 属于同一流 (比特率、填充、声道模式等可变位除外)
    pub fn same_stream(&self, other: &FrameHeader) -> bool {
        self.raw & STREAM_MASK == other.raw & STREAM_MASK
    }

    /// 帧时长 (纳秒)
    pub fn frame_duration_ns(&self) -> u64 {
        u64::from(self.samples_per_frame) * 1_000_000_000 / u64::from(self.sample_rate)
    }

    /// Xing/Info 头相对帧起点的偏移
    pub fn xing_offset(&self) -> usize {
        let side_info = match (self.version, self.mode) {
            (MpegVersion::V1, ChannelMode::Mono) => 17,
            (MpegVersion::V1, _) => 32,
            (_, ChannelMode::Mono) => 9,
            (_, _) => 17,
        };
        4 + side_info
    }

    /// VBRI 头相对帧起点的偏移
    pub fn vbri_offset(&self) -> usize {
        4 + 32
    }

    /// 编码格式名称
    pub fn codec_name(&self) -> String {
        let suffix = if self.layer == 3 { " (MP3)" } else { "" };
        format!("{} Layer {}{}", self.version, self.layer, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 构造帧头: 版本位、层位、比特率索引、采样率索引、填充、声道模式
    fn make(ver: u32, layer: u32, br: u32, sr: u32, pad: u32, mode: u32) -> u32 {
        0xFFE0_0000 | ver << 19 | layer << 17 | 1 << 16 | br << 12 | sr << 10 | pad << 9 | mode << 6
    }

    #[test]
    fn test_帧头解析_mpeg1_layer3() {
        let h = FrameHeader::parse(0xFFFB_9000).unwrap();
        assert_eq!(h.version, MpegVersion::V1);
        assert_eq!(h.layer, 3);
        assert!(!h.has_crc);
        assert_eq!(h.bitrate, 128_000);
        assert_eq!(h.sample_rate, 44100);
        assert_eq!(h.frame_len, 417);
        assert_eq!(h.samples_per_frame, 1152);
        assert_eq!(h.channels(), 2);
    }

    #[test]
    fn test_帧长公式_各层() {
        // Layer I, 32 kHz, 32 kbps: 4 * (32000 * 12 / 32000 + 0) = 48
        let l1 = FrameHeader::parse(make(3, 3, 1, 2, 0, 0)).unwrap();
        assert_eq!(l1.frame_len, 48);
        assert_eq!(l1.samples_per_frame, 384);
        // Layer II, 48 kHz, 192 kbps: 192000 * 144 / 48000 = 576
        let l2 = FrameHeader::parse(make(3, 2, 10, 1, 0, 0)).unwrap();
        assert_eq!(l2.frame_len, 576);
        // MPEG-2 Layer III, 22.05 kHz, 64 kbps, 填充: 64000 * 144 / 44100 + 1 = 209
        let v2 = FrameHeader::parse(make(2, 1, 8, 0, 1, 3)).unwrap();
        assert_eq!(v2.frame_len, 209);
        assert_eq!(v2.samples_per_frame, 576);
        assert_eq!(v2.channels(), 1);
        // MPEG-2.5 Layer III, 8 kHz, 8 kbps: 8000 * 144 / 16000 = 72
        let v25 = FrameHeader::parse(make(0, 1, 1, 2, 0, 3)).unwrap();
        assert_eq!(v25.sample_rate, 8000);
        assert_eq!(v25.frame_len, 72);
    }

    #[test]
    fn test_帧长确定性_全部组合() {
        for ver in [0u32, 2, 3] {
            for layer in 1..=3u32 {
                for br in 1..15u32 {
                    for sr in 0..3u32 {
                        let raw = make(ver, layer, br, sr, 1, 0);
                        let a = FrameHeader::parse(raw).unwrap();
                        let b = FrameHeader::parse(raw).unwrap();
                        assert_eq!(a.frame_len, b.frame_len);
                        assert!(a.frame_len > 4, "{raw:#010x}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_拒绝保留字段() {
        assert!(FrameHeader::parse(0x0000_0000).is_none());
        // 保留版本
        assert!(FrameHeader::parse(make(1, 1, 9, 0, 0, 0)).is_none());
        // 保留层
        assert!(FrameHeader::parse(make(3, 0, 9, 0, 0, 0)).is_none());
        // 自由格式与无效比特率
        assert!(FrameHeader::parse(make(3, 1, 0, 0, 0, 0)).is_none());
        assert!(FrameHeader::parse(make(3, 1, 15, 0, 0, 0)).is_none());
        // 保留采样率
        assert!(FrameHeader::parse(make(3, 1, 9, 3, 0, 0)).is_none());
        // 保留强调
        assert!(FrameHeader::parse(make(3, 1, 9, 0, 0, 0) | 0x2).is_none());
    }

    #[test]
    fn test_同流判定忽略可变位() {
        let a = FrameHeader::parse(make(3, 1, 9, 0, 0, 0)).unwrap();
        let b = FrameHeader::parse(make(3, 1, 11, 0, 1, 3)).unwrap();
        let c = FrameHeader::parse(make(3, 1, 9, 1, 0, 0)).unwrap();
        assert!(a.same_stream(&b));
        assert!(!a.same_stream(&c));
    }

    #[test]
    fn test_vbr_头偏移() {
        let stereo = FrameHeader::parse(make(3, 1, 9, 0, 0, 0)).unwrap();
        assert_eq!(stereo.xing_offset(), 36);
        let mono = FrameHeader::parse(make(3, 1, 9, 0, 0, 3)).unwrap();
        assert_eq!(mono.xing_offset(), 21);
        let v2 = FrameHeader::parse(make(2, 1, 8, 0, 0, 0)).unwrap();
        assert_eq!(v2.xing_offset(), 21);
        assert_eq!(stereo.vbri_offset(), 36);
    }
}
