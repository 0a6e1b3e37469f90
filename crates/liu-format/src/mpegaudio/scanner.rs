//! 帧同步扫描.
//!
//! 在累积的字节中定位下一个 MPEG 音频帧. 失步 (首次启动、输入不连续、帧头无效)
//! 后需要扩展校验: 按帧长推算出的后续若干帧头都必须有效且属于同一流,
//! 才认定找到了同步点. 数据不足以完成校验时报告需要更多数据, 流结束时放宽.

use liu_core::{LiuError, LiuResult};
use log::{debug, trace, warn};

use super::header::FrameHeader;

/// 扫描器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// seek 之后等待第一个帧
    Seeking,
    /// 失步, 逐字节寻找同步点
    Resyncing,
    /// 已同步
    Synced,
}

/// 扫描结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanResult {
    /// 跳过 `skip` 字节后是一个完整帧
    Frame {
        skip: usize,
        header: FrameHeader,
        len: usize,
    },
    /// 跳过 `skip` 字节后需要更多数据
    NeedMoreData { skip: usize },
}

/// 扩展校验结果
enum Validation {
    Valid,
    Invalid,
    NeedMoreData,
}

/// 帧同步扫描器
#[derive(Debug, Clone)]
pub struct FrameScanner {
    state: SyncState,
    /// 最近一个被接受的帧头
    last: Option<FrameHeader>,
    /// 扩展校验要求的连续有效帧数 (含当前帧)
    min_sync_frames: u32,
    /// 单次失步最多跳过的字节数
    max_resync: usize,
    /// 本次失步已跳过的字节数
    skipped: usize,
}

impl FrameScanner {
    /// 创建扫描器
    pub fn new(min_sync_frames: u32, max_resync: usize) -> Self {
        Self {
            state: SyncState::Resyncing,
            last: None,
            min_sync_frames: min_sync_frames.max(1),
            max_resync,
            skipped: 0,
        }
    }

    /// 当前状态
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// 最近一个被接受的帧头
    pub fn last_header(&self) -> Option<&FrameHeader> {
        self.last.as_ref()
    }

    /// 丢弃同步状态; `seeking` 表示由 seek 引起
    pub fn reset(&mut self, seeking: bool) {
        self.state = if seeking {
            SyncState::Seeking
        } else {
            SyncState::Resyncing
        };
        self.skipped = 0;
    }

    /// 在 `data` 中定位下一帧
    ///
    /// - `sync`: 上一帧之后数据是否连续
    /// - `draining`: 此后不会再有新数据, 扩展校验按已有数据判定
    pub fn scan(&mut self, data: &[u8], sync: bool, draining: bool) -> LiuResult<ScanResult> {
        if !sync && self.state == SyncState::Synced {
            debug!("输入不连续, 重新校验同步");
            self.state = SyncState::Resyncing;
        }

        let mut off = 0usize;
        loop {
            if self.skipped + off > self.max_resync {
                warn!("跳过 {} 字节仍未找到有效帧", self.skipped + off);
                return Err(LiuError::SyncFailure {
                    skipped: self.skipped + off,
                });
            }
            if data.len() < off + 4 {
                return Ok(self.need_more(off));
            }

            let Some(header) = FrameHeader::from_bytes(&data[off..]) else {
                if self.state == SyncState::Synced {
                    debug!("偏移 {off} 处帧头无效, 失去同步");
                    self.state = SyncState::Resyncing;
                }
                off = self.next_candidate(data, off);
                continue;
            };

            let changed = self.last.is_none_or(|last| !last.same_stream(&header));
            if self.state != SyncState::Synced || changed {
                match self.validate(data, off, &header, draining) {
                    Validation::Valid => {}
                    Validation::NeedMoreData => return Ok(self.need_more(off)),
                    Validation::Invalid => {
                        trace!("偏移 {off} 处的候选帧未通过扩展校验");
                        off = self.next_candidate(data, off);
                        continue;
                    }
                }
            }

            if data.len() < off + header.frame_len {
                return Ok(self.need_more(off));
            }

            if self.state != SyncState::Synced {
                debug!(
                    "在偏移 {off} 处取得同步: {} Layer {}, {} Hz, {} kbps",
                    header.version,
                    header.layer,
                    header.sample_rate,
                    header.bitrate / 1000
                );
            }
            self.state = SyncState::Synced;
            self.last = Some(header);
            self.skipped = 0;
            return Ok(ScanResult::Frame {
                skip: off,
                header,
                len: header.frame_len,
            });
        }
    }

    fn need_more(&mut self, skip: usize) -> ScanResult {
        self.skipped += skip;
        ScanResult::NeedMoreData { skip }
    }

    /// 下一个可能的同步字节位置
    fn next_candidate(&self, data: &[u8], off: usize) -> usize {
        match data[off + 1..].iter().position(|&b| b == 0xFF) {
            Some(p) => off + 1 + p,
            // 保留末尾 3 字节, 帧头可能跨越输入块
            None => data.len().saturating_sub(3).max(off + 1),
        }
    }

    /// 校验 `off` 处帧之后的若干帧头
    fn validate(&self, data: &[u8], off: usize, first: &FrameHeader, draining: bool) -> Validation {
        let mut next = off + first.frame_len;
        for _ in 1..self.min_sync_frames {
            if data.len() < next + 4 {
                return if draining {
                    Validation::Valid
                } else {
                    Validation::NeedMoreData
                };
            }
            match FrameHeader::from_bytes(&data[next..]) {
                Some(h) if h.same_stream(first) => next += h.frame_len,
                _ => return Validation::Invalid,
            }
        }
        Validation::Valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HDR_128K: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];

    fn frames(n: usize) -> Vec<u8> {
        let mut out = Vec::new();
        for _ in 0..n {
            let mut f = vec![0u8; 417];
            f[..4].copy_from_slice(&HDR_128K);
            out.extend(f);
        }
        out
    }

    #[test]
    fn test_初始状态为失步() {
        let sc = FrameScanner::new(3, 20480);
        assert_eq!(sc.state(), SyncState::Resyncing);
    }

    #[test]
    fn test_扩展校验通过后同步() {
        let mut sc = FrameScanner::new(3, 20480);
        let data = frames(3);
        let r = sc.scan(&data, false, false).unwrap();
        assert!(matches!(r, ScanResult::Frame { skip: 0, len: 417, .. }));
        assert_eq!(sc.state(), SyncState::Synced);
    }

    #[test]
    fn test_数据不足时等待() {
        let mut sc = FrameScanner::new(3, 20480);
        let data = frames(2);
        assert_eq!(
            sc.scan(&data, false, false).unwrap(),
            ScanResult::NeedMoreData { skip: 0 }
        );
        assert_eq!(sc.state(), SyncState::Resyncing);
        // 流结束时按已有数据判定
        assert!(matches!(
            sc.scan(&data, false, true).unwrap(),
            ScanResult::Frame { skip: 0, .. }
        ));
    }

    #[test]
    fn test_垃圾数据后取得同步() {
        let mut sc = FrameScanner::new(3, 20480);
        // 含伪同步字节的垃圾
        let mut data = vec![0x12, 0xFF, 0xFB, 0x00, 0xFF, 0x00, 0x33];
        let garbage = data.len();
        data.extend(frames(3));
        let r = sc.scan(&data, false, false).unwrap();
        match r {
            ScanResult::Frame { skip, .. } => assert_eq!(skip, garbage),
            other => panic!("期望帧, 实际 {other:?}"),
        }
    }

    #[test]
    fn test_已同步时不做扩展校验() {
        let mut sc = FrameScanner::new(3, 20480);
        let data = frames(3);
        sc.scan(&data, false, false).unwrap();
        // 只剩最后一帧, 已同步且帧头未变
        let r = sc.scan(&data[834..], true, false).unwrap();
        assert!(matches!(r, ScanResult::Frame { skip: 0, .. }));
    }

    #[test]
    fn test_超出失步窗口() {
        let mut sc = FrameScanner::new(3, 1024);
        let data = vec![0u8; 4096];
        let err = sc.scan(&data, false, false).unwrap_err();
        assert!(matches!(err, LiuError::SyncFailure { .. }));
    }

    #[test]
    fn test_失步字节跨调用累计() {
        let mut sc = FrameScanner::new(3, 1000);
        let r = sc.scan(&[0u8; 600], false, false).unwrap();
        assert_eq!(r, ScanResult::NeedMoreData { skip: 597 });
        let err = sc.scan(&[0u8; 600], false, false).unwrap_err();
        assert!(matches!(err, LiuError::SyncFailure { .. }));
    }
}
