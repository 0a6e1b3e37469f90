//! VBR 元数据 (Xing/Info, LAME, VBRI).
//!
//! 编码器在第一帧的主数据区写入总帧数、总字节数与 seek 表. 这一帧本身不含音频,
//! 其中的表用于在字节与时间之间换算.
//!
//! Xing 布局 (帧头后 side info 之后):
//! ```text
//! "Xing"|"Info"  flags(u32 BE)  [frames u32] [bytes u32] [toc 100B] [scale u32]
//! ```
//! VBRI 布局 (固定在帧头后 32 字节处):
//! ```text
//! "VBRI" version(u16) delay(u16) quality(u16) bytes(u32) frames(u32)
//! entries(u16) scale(u16) entry_bytes(u16) frames_per_entry(u16) table...
//! ```

use byteorder::{BigEndian, ByteOrder};
use liu_core::clock::{self, SECOND};
use liu_core::{LiuError, LiuResult};
use log::{debug, warn};
use std::time::Duration;

use super::header::FrameHeader;

const XING_FRAMES: u32 = 0x1;
const XING_BYTES: u32 = 0x2;
const XING_TOC: u32 = 0x4;
const XING_VBR_SCALE: u32 = 0x8;

/// LAME 扩展标签
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LameTag {
    /// 编码器版本, 如 "LAME3.100"
    pub version: String,
    /// 编码器延迟 (采样)
    pub encoder_delay: u16,
    /// 末尾填充 (采样)
    pub encoder_padding: u16,
}

/// Xing/Info 头
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XingHeader {
    /// "Info" 表示 CBR 编码
    pub is_info: bool,
    pub frames: Option<u32>,
    pub bytes: Option<u32>,
    /// 已减去首项偏置的 100 项目录
    pub toc: Option<[u8; 100]>,
    pub vbr_scale: Option<u32>,
    pub lame: Option<LameTag>,
}

/// VBRI 头
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VbriHeader {
    pub delay: u16,
    pub quality: u16,
    pub bytes: u32,
    pub frames: u32,
    /// 每个表项覆盖的帧数
    pub frames_per_entry: u16,
    /// 各段的字节数 (已乘以比例因子)
    pub table: Vec<u32>,
}

/// 第一帧的检查结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VbrProbe {
    Xing(XingHeader),
    Vbri(VbriHeader),
    /// 没有 VBR 头
    Absent,
    /// 头部字段超出已缓冲的数据
    NeedMoreData,
}

/// 检查从帧起点开始的数据中的 VBR 头
///
/// `data` 可以比帧长, 读取范围不受帧边界限制.
pub fn probe(data: &[u8], header: &FrameHeader) -> VbrProbe {
    let off = header.xing_offset();
    if data.len() < off + 4 {
        return VbrProbe::NeedMoreData;
    }
    let id = &data[off..off + 4];
    if id == b"Xing" || id == b"Info" {
        return match parse_xing(data, off) {
            Ok(Some(x)) => VbrProbe::Xing(x),
            Ok(None) => VbrProbe::NeedMoreData,
            Err(e) => {
                warn!("{e}");
                VbrProbe::Absent
            }
        };
    }

    let off = header.vbri_offset();
    if data.len() < off + 4 {
        return VbrProbe::NeedMoreData;
    }
    if &data[off..off + 4] == b"VBRI" {
        return match parse_vbri(data, off) {
            Ok(Some(v)) => VbrProbe::Vbri(v),
            Ok(None) => VbrProbe::NeedMoreData,
            Err(e) => {
                warn!("{e}");
                VbrProbe::Absent
            }
        };
    }
    VbrProbe::Absent
}

/// 解析 Xing/Info 头, 数据不足时返回 `Ok(None)`
fn parse_xing(data: &[u8], off: usize) -> LiuResult<Option<XingHeader>> {
    let is_info = &data[off..off + 4] == b"Info";
    if data.len() < off + 8 {
        return Ok(None);
    }
    let flags = BigEndian::read_u32(&data[off + 4..]);

    let mut needed = off + 8;
    for (flag, size) in [
        (XING_FRAMES, 4),
        (XING_BYTES, 4),
        (XING_TOC, 100),
        (XING_VBR_SCALE, 4),
    ] {
        if flags & flag != 0 {
            needed += size;
        }
    }
    if data.len() < needed {
        debug!("Xing 头需要 {needed} 字节, 当前只有 {}", data.len());
        return Ok(None);
    }

    let mut pos = off + 8;

    let mut frames = None;
    if flags & XING_FRAMES != 0 {
        let n = BigEndian::read_u32(field(data, &mut pos, 4));
        if n == 0 {
            warn!("Xing 头声明的总帧数为 0, 忽略");
        } else {
            frames = Some(n);
        }
    }

    let mut bytes = None;
    if flags & XING_BYTES != 0 {
        let n = BigEndian::read_u32(field(data, &mut pos, 4));
        if n == 0 {
            warn!("Xing 头声明的总字节数为 0, 忽略");
        } else {
            bytes = Some(n);
        }
    }

    let mut toc = None;
    if flags & XING_TOC != 0 {
        let raw = field(data, &mut pos, 100);
        match normalize_toc(raw) {
            Ok(t) => toc = Some(t),
            Err(e) => warn!("{e}, 改用平均码率换算"),
        }
    }

    let vbr_scale =
        (flags & XING_VBR_SCALE != 0).then(|| BigEndian::read_u32(field(data, &mut pos, 4)));

    let lame = parse_lame(&data[needed..]);
    debug!(
        "{} 头: {} 帧, {} 字节, 目录 {}, LAME {}",
        if is_info { "Info" } else { "Xing" },
        frames.map_or_else(|| "-".into(), |n| n.to_string()),
        bytes.map_or_else(|| "-".into(), |n| n.to_string()),
        toc.is_some(),
        lame.as_ref().map_or("-", |l| l.version.as_str()),
    );

    Ok(Some(XingHeader {
        is_info,
        frames,
        bytes,
        toc,
        vbr_scale,
        lame,
    }))
}

/// 读取 `size` 字节并前移读取位置, 调用方已确认长度足够
fn field<'a>(data: &'a [u8], pos: &mut usize, size: usize) -> &'a [u8] {
    let f = &data[*pos..*pos + size];
    *pos += size;
    f
}

/// 减去首项偏置; 目录非单调时视为损坏
fn normalize_toc(raw: &[u8]) -> LiuResult<[u8; 100]> {
    let bias = raw[0];
    let mut toc = [0u8; 100];
    let mut prev = 0u8;
    for (i, &v) in raw.iter().enumerate().take(100) {
        let v = v.checked_sub(bias).ok_or_else(|| {
            LiuError::MalformedVbrMetadata(format!("Xing 目录第 {i} 项小于首项"))
        })?;
        if v < prev {
            return Err(LiuError::MalformedVbrMetadata(format!(
                "Xing 目录第 {i} 项 {v} 小于前一项 {prev}"
            )));
        }
        toc[i] = v;
        prev = v;
    }
    Ok(toc)
}

/// LAME 标签紧随 Xing 字段之后
fn parse_lame(data: &[u8]) -> Option<LameTag> {
    if data.len() < 36 || &data[..4] != b"LAME" {
        return None;
    }
    let version: String = data[..9]
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| char::from(b))
        .collect();
    let v = BigEndian::read_u24(&data[21..24]);
    Some(LameTag {
        version: version.trim_end().to_string(),
        encoder_delay: (v >> 12) as u16,
        encoder_padding: (v & 0xFFF) as u16,
    })
}

/// 解析 VBRI 头, 数据不足时返回 `Ok(None)`
fn parse_vbri(data: &[u8], off: usize) -> LiuResult<Option<VbriHeader>> {
    if data.len() < off + 26 {
        return Ok(None);
    }
    let h = &data[off + 4..off + 26];
    let version = BigEndian::read_u16(&h[0..]);
    if version != 1 {
        return Err(LiuError::MalformedVbrMetadata(format!(
            "不支持的 VBRI 版本 {version}"
        )));
    }
    let delay = BigEndian::read_u16(&h[2..]);
    let quality = BigEndian::read_u16(&h[4..]);
    let bytes = BigEndian::read_u32(&h[6..]);
    let frames = BigEndian::read_u32(&h[10..]);
    let entries = usize::from(BigEndian::read_u16(&h[14..]));
    let scale = u64::from(BigEndian::read_u16(&h[16..]));
    let entry_bytes = usize::from(BigEndian::read_u16(&h[18..]));
    let frames_per_entry = BigEndian::read_u16(&h[20..]);

    let mut vbri = VbriHeader {
        delay,
        quality,
        bytes,
        frames,
        frames_per_entry,
        table: Vec::new(),
    };

    if entries == 0 {
        return Ok(Some(vbri));
    }
    if scale == 0 || entry_bytes == 0 || entry_bytes > 4 || frames_per_entry == 0 {
        warn!(
            "VBRI 表参数无效 (比例 {scale}, 项宽 {entry_bytes}, 每项帧数 {frames_per_entry}), 忽略该表"
        );
        return Ok(Some(vbri));
    }
    let table_end = off + 26 + entries * entry_bytes;
    if data.len() < table_end {
        return Ok(None);
    }

    let covered = u64::from(frames_per_entry) * entries as u64;
    let total = u64::from(frames);
    let step = u64::from(frames_per_entry);
    if covered + step < total || covered > total + step {
        warn!("VBRI 表覆盖 {covered} 帧, 与声明的 {total} 帧不一致, 忽略该表");
        return Ok(Some(vbri));
    }

    vbri.table = data[off + 26..table_end]
        .chunks_exact(entry_bytes)
        .map(|e| (BigEndian::read_uint(e, entry_bytes) * scale).min(u64::from(u32::MAX)) as u32)
        .collect();
    debug!(
        "VBRI 头: {frames} 帧, {bytes} 字节, {} 个表项",
        vbri.table.len()
    );
    Ok(Some(vbri))
}

/// 由 Xing 目录构建的双向换算表
#[derive(Debug, Clone, PartialEq, Eq)]
struct XingTables {
    toc: [u8; 100],
    /// 字节位置 (1/256) 到时间进度 (1/10000)
    inverse: [u16; 256],
}

impl XingTables {
    fn new(toc: [u8; 100]) -> Self {
        let mut inverse = [0u16; 256];
        let mut percent = 0usize;
        for (i, slot) in inverse.iter_mut().enumerate() {
            let i = i as u32;
            while percent < 99 && u32::from(toc[percent + 1]) <= i {
                percent += 1;
            }
            let fa = u32::from(toc[percent]);
            let fb = if percent < 99 {
                u32::from(toc[percent + 1])
            } else {
                256
            };
            let base = percent as u32 * 100;
            *slot = if fa >= i || fb <= fa {
                base as u16
            } else {
                (base + (i - fa) * 100 / (fb - fa)).min(10_000) as u16
            };
        }
        Self { toc, inverse }
    }
}

/// VBR 信息的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VbrKind {
    Xing,
    Info,
    Vbri,
}

impl VbrKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Xing => "Xing",
            Self::Info => "Info",
            Self::Vbri => "VBRI",
        }
    }
}

/// 整理后的 VBR 信息, 供时长查询与 seek 换算
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VbrInfo {
    pub kind: VbrKind,
    /// 总帧数 (不含 VBR 头所在帧)
    pub frames: Option<u32>,
    /// 总字节数
    pub bytes: Option<u32>,
    /// 总时长
    pub total_time: Option<Duration>,
    /// 平均比特率 (bps, 取整到 kbps)
    pub bitrate: Option<u32>,
    pub lame: Option<LameTag>,
    xing: Option<XingTables>,
    vbri: Vec<u32>,
    /// 总量不可信时另行标定的 (字节数, 时长), 仅用于目录换算
    rescaled: Option<(u64, Duration)>,
}

impl VbrInfo {
    /// 由第一帧的检查结果构建
    pub fn from_probe(probe: VbrProbe, header: &FrameHeader) -> Option<Self> {
        let mut info = match probe {
            VbrProbe::Xing(x) => Self {
                kind: if x.is_info {
                    VbrKind::Info
                } else {
                    VbrKind::Xing
                },
                frames: x.frames,
                bytes: x.bytes,
                total_time: None,
                bitrate: None,
                lame: x.lame,
                xing: x.toc.map(XingTables::new),
                vbri: Vec::new(),
                rescaled: None,
            },
            VbrProbe::Vbri(v) => Self {
                kind: VbrKind::Vbri,
                frames: (v.frames > 0).then_some(v.frames),
                bytes: (v.bytes > 0).then_some(v.bytes),
                total_time: None,
                bitrate: None,
                lame: None,
                xing: None,
                vbri: v.table,
                rescaled: None,
            },
            VbrProbe::Absent | VbrProbe::NeedMoreData => return None,
        };
        info.update_totals(header);
        Some(info)
    }

    fn update_totals(&mut self, header: &FrameHeader) {
        self.total_time = self.frames.and_then(|n| {
            clock::scale(
                u64::from(n) * u64::from(header.samples_per_frame),
                SECOND,
                u64::from(header.sample_rate),
            )
            .map(Duration::from_nanos)
        });
        self.bitrate = match (self.bytes, self.total_time) {
            (Some(bytes), Some(t)) if !t.is_zero() => {
                clock::scale(u64::from(bytes) * 8, SECOND, clock::nanos(t))
                    .map(|bps| {
                        let r = bps + 500;
                        (r - r % 1000) as u32
                    })
                    .filter(|&bps| bps > 0)
            }
            _ => None,
        };
    }

    /// 与上游实际字节数比对, 相差过大时丢弃总量字段并返回 true
    ///
    /// 目录本身保留, 经 `rescale` 重新标定后继续参与换算.
    pub fn check_size(&mut self, upstream: u64, ratio: f64) -> bool {
        let Some(declared) = self.bytes else {
            return false;
        };
        let declared = u64::from(declared);
        let (lo, hi) = if declared < upstream {
            (declared, upstream)
        } else {
            (upstream, declared)
        };
        if hi == 0 || (lo as f64) / (hi as f64) >= ratio {
            return false;
        }
        warn!(
            "{} 头声明 {declared} 字节, 上游实际 {upstream} 字节, 忽略总量信息",
            self.kind.name()
        );
        self.frames = None;
        self.bytes = None;
        self.total_time = None;
        self.bitrate = None;
        true
    }

    /// 以外部得到的总字节数与总时长标定目录
    ///
    /// 只在头中的总量缺失或被丢弃时生效.
    pub fn rescale(&mut self, bytes: u64, total: Duration) {
        if bytes > 0 && !total.is_zero() {
            self.rescaled = Some((bytes, total));
        }
    }

    /// 是否带有 Xing 目录或 VBRI 表
    pub fn has_toc(&self) -> bool {
        self.xing.is_some() || !self.vbri.is_empty()
    }

    /// 是否带有可用的 seek 表
    pub fn has_table(&self) -> bool {
        self.has_toc() && self.extent().is_some()
    }

    /// 目录换算所用的总字节数与总时长 (纳秒)
    fn extent(&self) -> Option<(u64, u64)> {
        match (self.bytes, self.total_time) {
            (Some(bytes), Some(total)) => Some((u64::from(bytes), clock::nanos(total))),
            _ => self
                .rescaled
                .map(|(bytes, total)| (bytes, clock::nanos(total))),
        }
    }

    /// 时间到 (相对第一帧数据的) 字节位置
    pub fn time_to_byte(&self, ts: Duration) -> Option<u64> {
        let (bytes, total) = self.extent()?;
        let bytes = bytes as f64;
        if total == 0 {
            return None;
        }
        let ts = clock::nanos(ts).min(total);

        if let Some(x) = &self.xing {
            let percent = (100.0 * ts as f64 / total as f64).clamp(0.0, 100.0);
            let idx = (percent as usize).min(99);
            let fa = f64::from(x.toc[idx]);
            let fb = if idx < 99 {
                f64::from(x.toc[idx + 1])
            } else {
                256.0
            };
            let fx = fa + (fb - fa) * (percent - idx as f64);
            return Some((fx / 256.0 * bytes) as u64);
        }

        if !self.vbri.is_empty() {
            // 第 i 项覆盖时间区间 [i * T / n, (i + 1) * T / n)
            let n = self.vbri.len() as u64;
            let i = clock::scale(ts, n, total)?.min(n - 1);
            let a = clock::scale(i, total, n)?;
            let b = clock::scale(i + 1, total, n)?;
            let fa: u64 = self.vbri[..i as usize].iter().map(|&v| u64::from(v)).sum();
            let len = u64::from(self.vbri[i as usize]);
            if b <= a {
                return Some(fa);
            }
            return Some(fa + clock::scale(ts.saturating_sub(a), len, b - a)?);
        }
        None
    }

    /// (相对第一帧数据的) 字节位置到时间
    pub fn byte_to_time(&self, byte: u64) -> Option<Duration> {
        let (bytes, total) = self.extent()?;
        if byte == 0 {
            return Some(Duration::ZERO);
        }
        if byte >= bytes {
            return Some(Duration::from_nanos(total));
        }

        if let Some(x) = &self.xing {
            let pos = (byte as f64 * 256.0 / bytes as f64).clamp(0.0, 256.0);
            let idx = (pos as usize).min(255);
            let fa = f64::from(x.inverse[idx]);
            let fb = if idx < 255 {
                f64::from(x.inverse[idx + 1])
            } else {
                10_000.0
            };
            let fx = fa + (fb - fa) * (pos - idx as f64);
            return Some(Duration::from_nanos((fx / 10_000.0 * total as f64) as u64));
        }

        if !self.vbri.is_empty() {
            let n = self.vbri.len() as u64;
            let mut cum = 0u64;
            for (i, &entry) in self.vbri.iter().enumerate() {
                let entry = u64::from(entry);
                if cum + entry > byte {
                    let a = clock::scale(i as u64, total, n)?;
                    let b = clock::scale(i as u64 + 1, total, n)?;
                    let t = a + clock::scale(byte - cum, b - a, entry)?;
                    return Some(Duration::from_nanos(t));
                }
                cum += entry;
            }
            return Some(Duration::from_nanos(total));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HDR_128K: u32 = 0xFFFB_9000;

    fn header() -> FrameHeader {
        FrameHeader::parse(HDR_128K).unwrap()
    }

    /// 构造带 Xing 头的第一帧
    fn xing_frame(frames: u32, bytes: u32, toc: Option<&[u8; 100]>) -> Vec<u8> {
        let mut f = vec![0u8; 417];
        f[..4].copy_from_slice(&HDR_128K.to_be_bytes());
        let mut pos = 36;
        f[pos..pos + 4].copy_from_slice(b"Xing");
        let flags = XING_FRAMES | XING_BYTES | if toc.is_some() { XING_TOC } else { 0 };
        f[pos + 4..pos + 8].copy_from_slice(&flags.to_be_bytes());
        pos += 8;
        f[pos..pos + 4].copy_from_slice(&frames.to_be_bytes());
        f[pos + 4..pos + 8].copy_from_slice(&bytes.to_be_bytes());
        pos += 8;
        if let Some(toc) = toc {
            f[pos..pos + 100].copy_from_slice(toc);
        }
        f
    }

    fn linear_toc() -> [u8; 100] {
        let mut toc = [0u8; 100];
        for (i, v) in toc.iter_mut().enumerate() {
            *v = (i * 256 / 100) as u8;
        }
        toc
    }

    #[test]
    fn test_xing_头解析() {
        let frame = xing_frame(1000, 417_000, Some(&linear_toc()));
        let VbrProbe::Xing(x) = probe(&frame, &header()) else {
            panic!("期望 Xing 头");
        };
        assert!(!x.is_info);
        assert_eq!(x.frames, Some(1000));
        assert_eq!(x.bytes, Some(417_000));
        assert!(x.toc.is_some());

        let info = VbrInfo::from_probe(VbrProbe::Xing(x), &header()).unwrap();
        // 1000 * 1152 / 44100 ≈ 26.122 s
        assert_eq!(info.total_time, Some(Duration::from_nanos(26_122_448_979)));
        // 417000 * 8 / 26.122 ≈ 127.7 kbps -> 128 kbps
        assert_eq!(info.bitrate, Some(128_000));
        assert!(info.has_table());
    }

    #[test]
    fn test_xing_数据不足() {
        let frame = xing_frame(1000, 417_000, Some(&linear_toc()));
        assert_eq!(probe(&frame[..100], &header()), VbrProbe::NeedMoreData);
        assert_eq!(probe(&frame[..20], &header()), VbrProbe::NeedMoreData);
    }

    #[test]
    fn test_无_vbr_头() {
        let mut f = vec![0u8; 417];
        f[..4].copy_from_slice(&HDR_128K.to_be_bytes());
        assert_eq!(probe(&f, &header()), VbrProbe::Absent);
    }

    #[test]
    fn test_零值字段被忽略() {
        let frame = xing_frame(0, 417_000, None);
        let VbrProbe::Xing(x) = probe(&frame, &header()) else {
            panic!("期望 Xing 头");
        };
        assert_eq!(x.frames, None);
        assert_eq!(x.bytes, Some(417_000));
    }

    #[test]
    fn test_非单调目录被丢弃() {
        let mut toc = linear_toc();
        toc[50] = 10;
        let frame = xing_frame(1000, 417_000, Some(&toc));
        let VbrProbe::Xing(x) = probe(&frame, &header()) else {
            panic!("期望 Xing 头");
        };
        assert!(x.toc.is_none());
        assert_eq!(x.frames, Some(1000));
        let info = VbrInfo::from_probe(VbrProbe::Xing(x), &header()).unwrap();
        assert!(!info.has_table());
        assert_eq!(info.time_to_byte(Duration::from_secs(1)), None);
    }

    #[test]
    fn test_目录偏置() {
        let mut toc = linear_toc();
        for v in toc.iter_mut() {
            *v = v.saturating_add(3).min(255);
        }
        let t = normalize_toc(&toc).unwrap();
        assert_eq!(t[0], 0);
    }

    #[test]
    fn test_目录换算单调且互逆() {
        let frame = xing_frame(1000, 417_000, Some(&linear_toc()));
        let info = VbrInfo::from_probe(probe(&frame, &header()), &header()).unwrap();
        let total = info.total_time.unwrap();

        let mut prev = 0u64;
        for ms in (0..=26_000u64).step_by(500) {
            let byte = info.time_to_byte(Duration::from_millis(ms)).unwrap();
            assert!(byte >= prev, "{ms} ms");
            prev = byte;
        }
        assert_eq!(info.byte_to_time(0), Some(Duration::ZERO));
        assert_eq!(info.byte_to_time(417_000), Some(total));

        // 线性目录下往返误差应在 1% 以内
        let t = Duration::from_secs(13);
        let back = info.byte_to_time(info.time_to_byte(t).unwrap()).unwrap();
        let diff = clock::abs_diff(back, t);
        assert!(diff < total / 100, "{back:?}");
    }

    #[test]
    fn test_声明大小与实际不符() {
        let frame = xing_frame(1000, 417_000, Some(&linear_toc()));
        let mut info = VbrInfo::from_probe(probe(&frame, &header()), &header()).unwrap();
        assert!(!info.check_size(400_000, 0.8));
        assert_eq!(info.bytes, Some(417_000));

        assert!(info.check_size(200_000, 0.8));
        assert_eq!(info.bytes, None);
        assert_eq!(info.total_time, None);
        assert_eq!(info.bitrate, None);
        assert!(info.has_toc());
        assert!(!info.has_table());
        assert_eq!(info.time_to_byte(Duration::from_secs(1)), None);

        // 目录按实际大小重新标定后继续可用
        info.rescale(200_000, Duration::from_millis(12_500));
        assert!(info.has_table());
        assert_eq!(
            info.time_to_byte(Duration::from_micros(6_250_000)),
            Some(100_000)
        );
        assert_eq!(
            info.byte_to_time(200_000),
            Some(Duration::from_millis(12_500))
        );
    }

    #[test]
    fn test_过低的比特率视为未知() {
        // 1000 帧 (约 26 秒) 只声明 10 字节, 平均比特率取整后为 0
        let frame = xing_frame(1000, 10, None);
        let info = VbrInfo::from_probe(probe(&frame, &header()), &header()).unwrap();
        assert!(info.total_time.is_some());
        assert_eq!(info.bitrate, None);
    }

    #[test]
    fn test_lame_标签() {
        let mut frame = xing_frame(1000, 417_000, None);
        let pos = 36 + 16;
        frame[pos..pos + 9].copy_from_slice(b"LAME3.100");
        // 延迟 576, 填充 1000
        let v: u32 = (576 << 12) | 1000;
        frame[pos + 21..pos + 24].copy_from_slice(&v.to_be_bytes()[1..]);
        let VbrProbe::Xing(x) = probe(&frame, &header()) else {
            panic!("期望 Xing 头");
        };
        let lame = x.lame.unwrap();
        assert_eq!(lame.version, "LAME3.100");
        assert_eq!(lame.encoder_delay, 576);
        assert_eq!(lame.encoder_padding, 1000);
    }

    /// 构造 VBRI 帧: 每项 2 字节, 比例 1
    fn vbri_frame(version: u16, frames: u32, fpe: u16, table: &[u16]) -> Vec<u8> {
        let mut f = vec![0u8; 417];
        f[..4].copy_from_slice(&HDR_128K.to_be_bytes());
        let off = 36;
        f[off..off + 4].copy_from_slice(b"VBRI");
        let bytes: u32 = table.iter().map(|&v| u32::from(v)).sum();
        let mut h = Vec::new();
        h.extend_from_slice(&version.to_be_bytes());
        h.extend_from_slice(&0u16.to_be_bytes());
        h.extend_from_slice(&75u16.to_be_bytes());
        h.extend_from_slice(&bytes.to_be_bytes());
        h.extend_from_slice(&frames.to_be_bytes());
        h.extend_from_slice(&(table.len() as u16).to_be_bytes());
        h.extend_from_slice(&1u16.to_be_bytes());
        h.extend_from_slice(&2u16.to_be_bytes());
        h.extend_from_slice(&fpe.to_be_bytes());
        for v in table {
            h.extend_from_slice(&v.to_be_bytes());
        }
        f[off + 4..off + 4 + h.len()].copy_from_slice(&h);
        f
    }

    #[test]
    fn test_vbri_头解析() {
        let frame = vbri_frame(1, 100, 10, &[4170; 10]);
        let VbrProbe::Vbri(v) = probe(&frame, &header()) else {
            panic!("期望 VBRI 头");
        };
        assert_eq!(v.frames, 100);
        assert_eq!(v.table.len(), 10);
        assert_eq!(v.bytes, 41_700);

        let info = VbrInfo::from_probe(VbrProbe::Vbri(v), &header()).unwrap();
        assert!(info.has_table());
        let total = info.total_time.unwrap();
        assert_eq!(info.byte_to_time(41_700), Some(total));
        let mid = info.time_to_byte(total / 2).unwrap();
        assert!((20_000..=22_000).contains(&mid), "{mid}");
        let back = info.byte_to_time(mid).unwrap();
        assert!(clock::abs_diff(back, total / 2) < total / 20, "{back:?}");
    }

    #[test]
    fn test_vbri_版本错误视为缺失() {
        let frame = vbri_frame(2, 100, 10, &[4170; 10]);
        assert_eq!(probe(&frame, &header()), VbrProbe::Absent);
    }

    #[test]
    fn test_vbri_表与帧数不一致() {
        // 表覆盖 10 * 10 = 100 帧, 声明 200 帧
        let frame = vbri_frame(1, 200, 10, &[4170; 10]);
        let VbrProbe::Vbri(v) = probe(&frame, &header()) else {
            panic!("期望 VBRI 头");
        };
        assert!(v.table.is_empty());
        assert_eq!(v.frames, 200);
    }
}
