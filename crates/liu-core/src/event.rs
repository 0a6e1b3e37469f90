//! 控制事件定义.
//!
//! 事件沿数据方向 (上游 -> 下游) 或反方向 (seek) 传递.
//! 串行化事件 (segment, tag, caps 等) 必须与数据保持相对顺序.

use bitflags::bitflags;
use serde::Serialize;

use crate::audio_info::AudioInfo;
use crate::segment::{Format, Segment};

/// 媒体格式描述
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Caps {
    /// 媒体类型, 如 "audio/mpeg", "audio/x-raw"
    pub media_type: String,
    /// 采样率
    pub rate: Option<u32>,
    /// 声道数
    pub channels: Option<u32>,
    /// 原始音频格式 (仅 audio/x-raw)
    pub info: Option<AudioInfo>,
}

impl Caps {
    /// 创建仅含媒体类型的描述
    pub fn new(media_type: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            rate: None,
            channels: None,
            info: None,
        }
    }

    /// 由原始音频格式生成描述
    pub fn raw(info: AudioInfo) -> Self {
        Self {
            media_type: "audio/x-raw".into(),
            rate: Some(info.rate),
            channels: Some(info.channels),
            info: Some(info),
        }
    }
}

/// 标签列表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagList {
    /// 编解码器名称
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    /// 标称比特率 (kbps)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nominal_bitrate_kbps: Option<u32>,
    /// 平均比特率 (kbps)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<u32>,
    /// 是否带 CRC 保护
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crc: Option<bool>,
    /// 声道模式名称
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_mode: Option<String>,
}

impl TagList {
    /// 是否不含任何标签
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// 合并另一个列表, 对方已设置的字段覆盖本方
    pub fn merge(&mut self, other: &TagList) {
        if other.codec.is_some() {
            self.codec.clone_from(&other.codec);
        }
        if other.nominal_bitrate_kbps.is_some() {
            self.nominal_bitrate_kbps = other.nominal_bitrate_kbps;
        }
        if other.bitrate_kbps.is_some() {
            self.bitrate_kbps = other.bitrate_kbps;
        }
        if other.crc.is_some() {
            self.crc = other.crc;
        }
        if other.channel_mode.is_some() {
            self.channel_mode.clone_from(&other.channel_mode);
        }
    }
}

bitflags! {
    /// seek 标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SeekFlags: u32 {
        /// 丢弃管道中所有数据后再 seek
        const FLUSH = 1 << 0;
        /// 精确定位到目标位置
        const ACCURATE = 1 << 1;
        /// 定位到最近的关键单元
        const KEY_UNIT = 1 << 2;
    }
}

/// seek 起止点的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekType {
    /// 不改变
    None,
    /// 设置为绝对位置
    Set,
}

/// seek 请求
#[derive(Debug, Clone, PartialEq)]
pub struct SeekEvent {
    /// 播放速率
    pub rate: f64,
    /// 数值格式
    pub format: Format,
    /// 标志
    pub flags: SeekFlags,
    /// 起点类型
    pub start_type: SeekType,
    /// 起点
    pub start: u64,
    /// 终点类型
    pub stop_type: SeekType,
    /// 终点
    pub stop: Option<u64>,
    /// 序列号, 转换后的请求沿用原值
    pub seqnum: u32,
}

impl SeekEvent {
    /// 常用形式: 以 1.0 速率 flush seek 到 `start`, 终点不变
    pub fn flush_to(format: Format, start: u64, flags: SeekFlags) -> Self {
        Self {
            rate: 1.0,
            format,
            flags: flags | SeekFlags::FLUSH,
            start_type: SeekType::Set,
            start,
            stop_type: SeekType::None,
            stop: None,
            seqnum: 0,
        }
    }
}

/// 控制事件
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// 格式描述
    Caps(Caps),
    /// 新的播放段; `update` 表示对当前段的就地更新
    Segment { update: bool, segment: Segment },
    /// 开始 flush, 丢弃在途数据
    FlushStart,
    /// 结束 flush
    FlushStop,
    /// 流结束
    Eos,
    /// 标签
    Tags(TagList),
    /// 总时长发生变化, 下游应重新查询
    DurationChanged,
    /// seek 请求 (反方向)
    Seek(SeekEvent),
    /// 自定义事件
    Custom { name: String, serialized: bool },
}

impl Event {
    /// 是否需要与数据保持相对顺序
    pub fn is_serialized(&self) -> bool {
        match self {
            Self::FlushStart | Self::Seek(_) | Self::DurationChanged => false,
            Self::Custom { serialized, .. } => *serialized,
            _ => true,
        }
    }

    /// 事件名称, 用于日志
    pub fn name(&self) -> &str {
        match self {
            Self::Caps(_) => "caps",
            Self::Segment { .. } => "segment",
            Self::FlushStart => "flush-start",
            Self::FlushStop => "flush-stop",
            Self::Eos => "eos",
            Self::Tags(_) => "tags",
            Self::DurationChanged => "duration-changed",
            Self::Seek(_) => "seek",
            Self::Custom { name, .. } => name,
        }
    }
}
