//! 文件数据源.
//!
//! 把内存中的文件按块切分后送入解码器, 并作为解码器的上游对端回答字节域的
//! 时长/seek 查询. 字节 seek 只记录目标位置, 由主循环在解码器锁外执行 flush.

use bytes::Bytes;
use liu_codec::Upstream;
use liu_core::{Buffer, Event, Format, Query, QueryAnswer, SeekType};
use log::debug;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 文件数据与读取位置
#[derive(Debug)]
pub struct FileSource {
    data: Bytes,
    pos: usize,
    chunk_size: usize,
    /// 上游接受但尚未执行的字节 seek
    pending_seek: Option<u64>,
    /// 下一块需要标记不连续
    discont: bool,
}

impl FileSource {
    /// 创建数据源, 从 `start` 开始读取
    pub fn new(data: Bytes, start: u64, chunk_size: usize) -> Self {
        Self {
            pos: (start as usize).min(data.len()),
            data,
            chunk_size: chunk_size.max(1),
            pending_seek: None,
            discont: true,
        }
    }

    /// 文件总长
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    /// 读取下一块, 已到结尾时返回 `None`
    pub fn next_chunk(&mut self) -> Option<Buffer> {
        if self.pos >= self.data.len() {
            return None;
        }
        let end = (self.pos + self.chunk_size).min(self.data.len());
        let mut buffer = Buffer::new(self.data.slice(self.pos..end)).with_offset(self.pos as u64);
        if self.discont {
            buffer.set_discont(true);
            self.discont = false;
        }
        self.pos = end;
        Some(buffer)
    }

    /// 取出待执行的 seek 并跳转
    pub fn take_seek(&mut self) -> Option<u64> {
        let target = self.pending_seek.take()?;
        self.pos = (target as usize).min(self.data.len());
        self.discont = true;
        Some(target)
    }

    /// 文件数据
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// 当前读取位置
    pub fn position(&self) -> u64 {
        self.pos as u64
    }

    /// 取出 `[start, end)` 作为一个不连续块 (倒放时使用)
    pub fn block(&self, start: u64, end: u64) -> Buffer {
        let end = (end as usize).min(self.data.len());
        let start = (start as usize).min(end);
        Buffer::new(self.data.slice(start..end))
            .with_offset(start as u64)
            .discont()
    }
}

/// 解码器看到的上游对端
#[derive(Debug, Clone)]
pub struct FileUpstream(pub Arc<Mutex<FileSource>>);

impl FileUpstream {
    fn with<R>(&self, f: impl FnOnce(&mut FileSource) -> R) -> R {
        let mut guard = match self.0.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl Upstream for FileUpstream {
    fn push_event(&mut self, event: Event) -> bool {
        match event {
            Event::Seek(seek) if seek.format == Format::Bytes && seek.start_type == SeekType::Set => {
                debug!("文件源接受字节 seek: {}", seek.start);
                self.with(|s| s.pending_seek = Some(seek.start));
                true
            }
            _ => false,
        }
    }

    fn query(&mut self, query: &Query) -> Option<QueryAnswer> {
        match query {
            Query::Duration(Format::Bytes) => Some(QueryAnswer::Duration(self.with(|s| s.len()))),
            Query::Seeking(Format::Bytes) => Some(QueryAnswer::Seeking {
                seekable: true,
                start: Some(0),
                stop: Some(self.with(|s| s.len())),
            }),
            Query::Latency => Some(QueryAnswer::Latency {
                live: false,
                min: Duration::ZERO,
                max: Some(Duration::ZERO),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liu_core::{SeekEvent, SeekFlags};

    fn source() -> FileSource {
        FileSource::new(Bytes::from(vec![0u8; 10]), 2, 4)
    }

    #[test]
    fn test_按块读取() {
        let mut s = source();
        let a = s.next_chunk().unwrap();
        assert_eq!(a.offset, Some(2));
        assert!(a.is_discont());
        let b = s.next_chunk().unwrap();
        assert_eq!((b.offset, b.len()), (Some(6), 4));
        assert!(!b.is_discont());
        assert!(s.next_chunk().is_none());
    }

    #[test]
    fn test_字节_seek() {
        let shared = Arc::new(Mutex::new(source()));
        let mut up = FileUpstream(shared.clone());
        assert!(!up.push_event(Event::Seek(SeekEvent::flush_to(
            Format::Time,
            0,
            SeekFlags::empty()
        ))));
        assert!(up.push_event(Event::Seek(SeekEvent::flush_to(
            Format::Bytes,
            8,
            SeekFlags::empty()
        ))));
        let mut s = shared.lock().unwrap();
        assert_eq!(s.take_seek(), Some(8));
        let c = s.next_chunk().unwrap();
        assert!(c.is_discont());
        assert_eq!(c.offset, Some(8));
    }

    #[test]
    fn test_查询() {
        let mut up = FileUpstream(Arc::new(Mutex::new(source())));
        assert_eq!(
            up.query(&Query::Duration(Format::Bytes)),
            Some(QueryAnswer::Duration(10))
        );
        assert!(matches!(
            up.query(&Query::Latency),
            Some(QueryAnswer::Latency { live: false, .. })
        ));
        assert!(up.query(&Query::Duration(Format::Time)).is_none());
    }

    #[test]
    fn test_取块() {
        let s = source();
        let b = s.block(4, 20);
        assert_eq!((b.offset, b.len()), (Some(4), 6));
        assert!(b.is_discont());
        assert!(s.block(12, 20).is_empty());
    }
}
