//! 元素边界: 上游对端与下游输出.

use liu_core::{Buffer, Event, Query, QueryAnswer};

/// 上游对端
///
/// 解码器通过它向上游发送事件 (seek 等) 与查询 (字节总长、延迟、是否可 seek).
/// 实现不应在回调中再次调用同一个解码器.
pub trait Upstream: Send {
    /// 向上游发送事件, 返回是否被处理
    fn push_event(&mut self, event: Event) -> bool;

    /// 向上游发起查询
    fn query(&mut self, _query: &Query) -> Option<QueryAnswer> {
        None
    }
}

/// 不处理任何事件与查询的上游
#[derive(Debug, Default, Clone, Copy)]
pub struct NullUpstream;

impl Upstream for NullUpstream {
    fn push_event(&mut self, _event: Event) -> bool {
        false
    }
}

/// 下发到下游的数据或事件, 按产生顺序排列
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// 解码后的数据
    Buffer(Buffer),
    /// 控制事件
    Event(Event),
}

impl Output {
    /// 若为数据则返回其引用
    pub fn as_buffer(&self) -> Option<&Buffer> {
        match self {
            Self::Buffer(b) => Some(b),
            Self::Event(_) => None,
        }
    }

    /// 若为事件则返回其引用
    pub fn as_event(&self) -> Option<&Event> {
        match self {
            Self::Event(e) => Some(e),
            Self::Buffer(_) => None,
        }
    }

    /// 若为数据则取出
    pub fn into_buffer(self) -> Option<Buffer> {
        match self {
            Self::Buffer(b) => Some(b),
            Self::Event(_) => None,
        }
    }
}
