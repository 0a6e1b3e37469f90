//! 查询定义.
//!
//! 查询为请求/应答形式: 请求方构造 `Query`, 处理方返回 `Some(QueryAnswer)`
//! 表示已回答, 返回 `None` 表示无法回答.

use std::time::Duration;

use crate::segment::Format;

/// 查询请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// 当前播放位置
    Position(Format),
    /// 总时长
    Duration(Format),
    /// 是否可 seek
    Seeking(Format),
    /// 数值格式换算
    Convert {
        src_format: Format,
        src_value: u64,
        dest_format: Format,
    },
    /// 延迟
    Latency,
    /// 支持的数值格式
    Formats,
}

/// 查询应答
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryAnswer {
    /// 当前位置
    Position(u64),
    /// 总时长
    Duration(u64),
    /// seek 能力及可 seek 区间
    Seeking {
        seekable: bool,
        start: Option<u64>,
        stop: Option<u64>,
    },
    /// 换算结果
    Convert(u64),
    /// 延迟: 是否直播, 最小/最大延迟 (`None` 表示无上限)
    Latency {
        live: bool,
        min: Duration,
        max: Option<Duration>,
    },
    /// 支持的数值格式
    Formats(Vec<Format>),
}

impl QueryAnswer {
    /// 提取数值型应答 (位置/时长/换算)
    pub fn value(&self) -> Option<u64> {
        match self {
            Self::Position(v) | Self::Duration(v) | Self::Convert(v) => Some(*v),
            _ => None,
        }
    }
}
