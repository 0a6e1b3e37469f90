//! 格式探测.
//!
//! 通过文件头部数据和文件扩展名识别 MPEG 音频流.

use crate::mpegaudio::header::FrameHeader;
use crate::mpegaudio::scanner::{FrameScanner, ScanResult};

/// 探测置信度
///
/// 数值越高, 表示对格式判断越有信心.
pub type ProbeScore = u32;

/// 最低探测分数 (仅根据扩展名)
pub const SCORE_EXTENSION: ProbeScore = 50;

/// 最高探测分数 (魔数完全匹配)
pub const SCORE_MAX: ProbeScore = 100;

/// 探测结果
#[derive(Debug, Clone)]
pub struct ProbeResult {
    /// 置信度分数
    pub score: ProbeScore,
    /// 第一帧在数据中的偏移
    pub offset: u64,
    /// 第一帧的帧头, 仅凭扩展名识别时为 `None`
    pub header: Option<FrameHeader>,
}

/// ID3v2 标签总长度 (含 10 字节头部), 数据不以 ID3v2 开头时返回 `None`
pub fn id3v2_len(data: &[u8]) -> Option<u64> {
    if data.len() < 10 || &data[0..3] != b"ID3" {
        return None;
    }
    // syncsafe integer, 每字节只用 7 位
    let size = (u64::from(data[6] & 0x7F) << 21)
        | (u64::from(data[7] & 0x7F) << 14)
        | (u64::from(data[8] & 0x7F) << 7)
        | u64::from(data[9] & 0x7F);
    // 带页脚时再加 10 字节
    let footer = if data[5] & 0x10 != 0 { 10 } else { 0 };
    Some(10 + size + footer)
}

/// 根据文件头部数据探测
///
/// # 参数
/// - `data`: 文件开头的若干字节 (通常 4KB ~ 32KB)
/// - `filename`: 文件名 (可选, 用于扩展名匹配)
pub fn probe(data: &[u8], filename: Option<&str>) -> Option<ProbeResult> {
    let start = id3v2_len(data).unwrap_or(0);
    if let Some(rest) = usize::try_from(start).ok().and_then(|s| data.get(s..)) {
        let mut scanner = FrameScanner::new(3, rest.len());
        if let Ok(ScanResult::Frame { skip, header, .. }) = scanner.scan(rest, false, true) {
            // 帧紧跟在开头 (或 ID3 之后) 时最可信
            let score = if skip == 0 {
                SCORE_MAX - 5
            } else {
                SCORE_MAX / 2 + 1
            };
            return Some(ProbeResult {
                score,
                offset: start + skip as u64,
                header: Some(header),
            });
        }
    }

    let ext = filename?.rsplit('.').next()?;
    ["mp3", "mp2", "mp1", "mpa"]
        .iter()
        .any(|e| ext.eq_ignore_ascii_case(e))
        .then_some(ProbeResult {
            score: SCORE_EXTENSION,
            offset: start,
            header: None,
        })
}
