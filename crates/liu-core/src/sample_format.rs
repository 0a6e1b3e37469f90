//! 音频采样格式定义.
//!
//! 解码器输出始终为交错 (Interleaved) 排列, 故只保留交错格式.

use serde::Serialize;
use std::fmt;

/// 音频采样格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[non_exhaustive]
pub enum SampleFormat {
    /// 未指定 (编码数据)
    None,
    /// 无符号 8 位整数
    U8,
    /// 有符号 16 位整数, 小端
    S16,
    /// 有符号 32 位整数, 小端
    S32,
    /// 32 位浮点, 小端
    F32,
    /// 64 位浮点, 小端
    F64,
}

impl SampleFormat {
    /// 每个采样点占用的字节数
    pub const fn bytes_per_sample(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::U8 => 1,
            Self::S16 => 2,
            Self::S32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// 按名称解析 (与 `Display` 输出对应)
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "u8" => Some(Self::U8),
            "s16" => Some(Self::S16),
            "s32" => Some(Self::S32),
            "flt" | "f32" => Some(Self::F32),
            "dbl" | "f64" => Some(Self::F64),
            _ => None,
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::U8 => "u8",
            Self::S16 => "s16",
            Self::S32 => "s32",
            Self::F32 => "flt",
            Self::F64 => "dbl",
        };
        write!(f, "{name}")
    }
}
