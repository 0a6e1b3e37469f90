//! 数据缓冲区.
//!
//! 元素之间传递的数据单元: 负载字节 + 时间戳 + 时长 + 标志.
//! 负载使用 `Bytes`, 克隆与切片都是引用计数操作.

use bitflags::bitflags;
use bytes::Bytes;
use std::time::Duration;

bitflags! {
    /// 缓冲区标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BufferFlags: u32 {
        /// 与前一个缓冲区的时间线不连续
        const DISCONT = 1 << 0;
        /// 内容为静音/补偿数据
        const GAP = 1 << 1;
    }
}

/// 数据缓冲区
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Buffer {
    /// 负载数据
    pub data: Bytes,
    /// 显示时间戳
    pub pts: Option<Duration>,
    /// 时长
    pub duration: Option<Duration>,
    /// 在上游字节流中的偏移
    pub offset: Option<u64>,
    /// 标志位
    pub flags: BufferFlags,
}

impl Buffer {
    /// 从字节创建无时间戳的缓冲区
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..Default::default()
        }
    }

    /// 设置时间戳 (构建器风格)
    pub fn with_pts(mut self, pts: Duration) -> Self {
        self.pts = Some(pts);
        self
    }

    /// 设置时长 (构建器风格)
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// 设置字节偏移 (构建器风格)
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// 标记为不连续 (构建器风格)
    pub fn discont(mut self) -> Self {
        self.flags.insert(BufferFlags::DISCONT);
        self
    }

    /// 负载字节数
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 负载是否为空
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 是否带有不连续标志
    pub fn is_discont(&self) -> bool {
        self.flags.contains(BufferFlags::DISCONT)
    }

    /// 设置/清除不连续标志
    pub fn set_discont(&mut self, discont: bool) {
        self.flags.set(BufferFlags::DISCONT, discont);
    }

    /// 结束时间 (pts + duration)
    pub fn end(&self) -> Option<Duration> {
        Some(self.pts? + self.duration?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_构建与标志() {
        let mut buf = Buffer::new(vec![1u8, 2, 3])
            .with_pts(Duration::from_millis(10))
            .with_duration(Duration::from_millis(5))
            .discont();
        assert_eq!(buf.len(), 3);
        assert!(buf.is_discont());
        assert_eq!(buf.end(), Some(Duration::from_millis(15)));
        buf.set_discont(false);
        assert!(!buf.is_discont());
    }

    #[test]
    fn test_缺失时间戳无结束时间() {
        let buf = Buffer::new(Bytes::new()).with_duration(Duration::from_millis(5));
        assert!(buf.is_empty());
        assert_eq!(buf.end(), None);
    }
}
