//! # liu-core
//!
//! Liu 流式音频框架核心库, 提供基础类型定义、错误处理和时间换算.
//!
//! 本 crate 为解码基类与各格式解析器提供共同的数据模型: 缓冲区、播放段、
//! 控制事件与查询.

pub mod audio_info;
pub mod buffer;
pub mod clock;
pub mod error;
pub mod event;
pub mod query;
pub mod sample_format;
pub mod segment;

// 重导出常用类型
pub use audio_info::AudioInfo;
pub use buffer::{Buffer, BufferFlags};
pub use error::{LiuError, LiuResult};
pub use event::{Caps, Event, SeekEvent, SeekFlags, SeekType, TagList};
pub use query::{Query, QueryAnswer};
pub use sample_format::SampleFormat;
pub use segment::{Format, Segment};
