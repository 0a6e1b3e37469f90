//! liu-probe - MPEG 音频探测与解码检查工具
//!
//! 识别文件中的 MPEG 音频流, 经解码基类完整解码一遍, 汇报流参数、VBR 元数据、
//! 输出时间线与标签. 可选执行一次时间 seek 或按块倒放, 用于检查 seek 换算与
//! 倒放重排.

mod logging;
mod report;
mod source;

use anyhow::{Context, anyhow};
use bytes::Bytes;
use clap::Parser;
use liu_codec::{AudioDecoder, DecoderSettings};
use liu_core::{Caps, Event, Format, Query, SeekEvent, SeekFlags, Segment, clock::SECOND};
use liu_format::mpegaudio::{FrameScanner, MEDIA_TYPE, MpegAudioDecoder, MpegAudioSettings, ScanResult};
use liu_format::probe;
use log::{info, warn};
use serde::Deserialize;
use std::path::PathBuf;
use std::process;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use report::{Report, SeekReport, StreamInfo, VbrSummary, secs};
use source::{FileSource, FileUpstream};

/// 探测时读取的文件头部字节数
const PROBE_SIZE: usize = 64 * 1024;

/// 倒放时每块至少包含的帧数
const MIN_REVERSE_FRAMES: usize = 8;

/// Liu MPEG 音频探测工具
#[derive(Parser, Debug)]
#[command(name = "liu-probe", version, about = "纯 Rust MPEG 音频探测与解码检查工具")]
struct Cli {
    /// 输入文件路径
    input: PathBuf,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// 每次送入解码器的字节数
    #[arg(long, default_value_t = 4096)]
    chunk_size: usize,

    /// 出现第一个输出后 seek 到该时间 (秒)
    #[arg(long)]
    seek: Option<f64>,

    /// 按块倒放
    #[arg(long, conflicts_with = "seek")]
    reverse: bool,

    /// JSON 配置文件, 含 `decoder` 与 `mpeg` 两部分, 均可部分覆盖
    #[arg(long)]
    config: Option<PathBuf>,

    /// 时间戳抖动容差 (毫秒)
    #[arg(long)]
    tolerance_ms: Option<u64>,

    /// 输出聚合阈值 (毫秒)
    #[arg(long)]
    min_latency_ms: Option<u64>,

    /// 日志详细程度 (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// 配置文件
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    decoder: DecoderSettings,
    mpeg: MpegAudioSettings,
}

/// 帧边界
#[derive(Debug, Clone, Copy)]
struct FrameEntry {
    offset: u64,
    len: usize,
    pts: Duration,
}

fn main() {
    let cli = Cli::parse();
    logging::init("liu-probe", cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("错误: {e:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let data = Bytes::from(
        std::fs::read(&cli.input)
            .with_context(|| format!("无法读取文件 '{}'", cli.input.display()))?,
    );
    let filename = cli.input.file_name().and_then(|n| n.to_str());

    let probed = probe::probe(&data[..data.len().min(PROBE_SIZE)], filename)
        .ok_or_else(|| anyhow!("无法识别为 MPEG 音频"))?;
    info!(
        "探测到 MPEG 音频, 置信度 {}, 第一帧偏移 {}",
        probed.score, probed.offset
    );

    let source = Arc::new(Mutex::new(FileSource::new(
        data,
        probed.offset,
        cli.chunk_size,
    )));
    let dec = AudioDecoder::with_settings(
        MpegAudioDecoder::new(config.mpeg),
        Box::new(FileUpstream(source.clone())),
        config.decoder,
    );
    dec.set_caps(Caps::new(MEDIA_TYPE))?;

    let mut report = Report {
        filename: cli.input.display().to_string(),
        probe_score: probed.score,
        first_frame_offset: probed.offset,
        ..Default::default()
    };

    if cli.reverse {
        play_reverse(&dec, &source, &config.mpeg, cli.chunk_size, &mut report)?;
    } else {
        play_forward(&dec, &source, cli.seek, &mut report)?;
    }

    dec.send_event(Event::Eos)?;
    report.collect(dec.take_outputs());

    report.duration = dec
        .src_query(&Query::Duration(Format::Time))
        .and_then(|a| a.value())
        .map(|ns| secs(Duration::from_nanos(ns)));
    report.output.samples = dec.samples_out();
    dec.with_impl(|d| {
        report.stream = d.current_header().map(StreamInfo::from_header);
        report.vbr = d.vbr_info().map(VbrSummary::from_info);
        report.output.backend = d.backend_name().to_string();
        report.output.frames_parsed = d.frames();
        report.output.average_bitrate_kbps = d.average_bitrate().map(|b| b / 1000);
        report.output.index_entries = d.index_len();
    });
    dec.stop()?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print_text();
    }
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("无法读取配置 '{}'", path.display()))?;
            serde_json::from_str::<Config>(&text).context("配置解析失败")?
        }
        None => Config::default(),
    };
    if let Some(ms) = cli.tolerance_ms {
        config.decoder.set_tolerance(Duration::from_millis(ms));
    }
    if let Some(ms) = cli.min_latency_ms {
        config.decoder.set_min_latency(Duration::from_millis(ms));
    }
    config.mpeg.validate()?;
    Ok(config)
}

fn lock_source(source: &Mutex<FileSource>) -> MutexGuard<'_, FileSource> {
    match source.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// 正向送入整个文件, 出现第一个输出后按需 seek
fn play_forward(
    dec: &AudioDecoder<MpegAudioDecoder>,
    source: &Mutex<FileSource>,
    seek: Option<f64>,
    report: &mut Report,
) -> anyhow::Result<()> {
    dec.send_event(Event::Segment {
        update: false,
        segment: Segment::new(Format::Time),
    })?;

    let mut seek = seek;
    loop {
        let chunk = lock_source(source).next_chunk();
        let Some(chunk) = chunk else {
            break;
        };
        dec.push_buffer(chunk)?;
        report.collect(dec.take_outputs());

        if report.output.buffers > 0 {
            if let Some(target) = seek.take() {
                seek_to(dec, source, target, report)?;
            }
        }
    }
    if seek.is_some() {
        warn!("文件过短, 未执行 seek");
    }
    Ok(())
}

/// 时间 seek: 解码器换算为字节 seek 交给文件源, 再按上游 flush 的顺序送入事件
fn seek_to(
    dec: &AudioDecoder<MpegAudioDecoder>,
    source: &Mutex<FileSource>,
    target: f64,
    report: &mut Report,
) -> anyhow::Result<()> {
    let target_ns = (target.max(0.0) * SECOND as f64) as u64;
    dec.seek(SeekEvent::flush_to(
        Format::Time,
        target_ns,
        SeekFlags::ACCURATE,
    ))?;
    let byte = lock_source(source)
        .take_seek()
        .ok_or_else(|| anyhow!("文件源未收到字节 seek"))?;
    info!("seek 到 {target:.3}s, 字节偏移 {byte}");

    dec.send_event(Event::FlushStart)?;
    dec.send_event(Event::FlushStop)?;
    let mut segment = Segment::new(Format::Bytes);
    segment.start = byte;
    dec.send_event(Event::Segment {
        update: false,
        segment,
    })?;

    report.collect(dec.take_outputs());
    report.seek = Some(SeekReport {
        target,
        byte_offset: byte,
        first_pts: None,
    });
    Ok(())
}

/// 按帧边界把文件切成约 `chunk_size` 字节的块, 从最后一块开始倒序送入
fn play_reverse(
    dec: &AudioDecoder<MpegAudioDecoder>,
    source: &Mutex<FileSource>,
    settings: &MpegAudioSettings,
    chunk_size: usize,
    report: &mut Report,
) -> anyhow::Result<()> {
    let blocks = {
        let src = lock_source(source);
        let frames = scan_frames(src.data(), src.position(), settings);
        if frames.is_empty() {
            return Err(anyhow!("未找到可倒放的帧"));
        }
        let avg_len = frames.iter().map(|f| f.len).sum::<usize>() / frames.len();
        let per_block = (chunk_size / avg_len.max(1)).max(MIN_REVERSE_FRAMES);
        frames
            .chunks(per_block)
            .rev()
            .filter_map(|group| {
                let first = group.first()?;
                let last = group.last()?;
                Some(
                    src.block(first.offset, last.offset + last.len as u64)
                        .with_pts(first.pts),
                )
            })
            .collect::<Vec<_>>()
    };
    info!("倒放: {} 块", blocks.len());

    let mut segment = Segment::new(Format::Time);
    segment.rate = -1.0;
    dec.send_event(Event::Segment {
        update: false,
        segment,
    })?;
    for block in blocks {
        dec.push_buffer(block)?;
        report.collect(dec.take_outputs());
    }
    Ok(())
}

/// 扫描全部帧边界
fn scan_frames(data: &[u8], start: u64, settings: &MpegAudioSettings) -> Vec<FrameEntry> {
    let mut scanner = FrameScanner::new(settings.min_sync_frames, settings.max_resync_bytes);
    let mut frames = Vec::new();
    let mut pos = start as usize;
    let mut pts = 0u64;
    while pos < data.len() {
        match scanner.scan(&data[pos..], !frames.is_empty(), true) {
            Ok(ScanResult::Frame { skip, header, len }) => {
                frames.push(FrameEntry {
                    offset: (pos + skip) as u64,
                    len,
                    pts: Duration::from_nanos(pts),
                });
                pts += header.frame_duration_ns();
                pos += skip + len;
            }
            Ok(ScanResult::NeedMoreData { .. }) => break,
            Err(e) => {
                warn!("扫描帧边界失败: {e}");
                break;
            }
        }
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(n: usize) -> Vec<u8> {
        let mut out = Vec::new();
        for _ in 0..n {
            let mut f = vec![0u8; 417];
            f[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
            out.extend(f);
        }
        out
    }

    #[test]
    fn test_扫描帧边界() {
        let mut data = vec![0u8; 5];
        data.extend(frames(4));
        let entries = scan_frames(&data, 0, &MpegAudioSettings::default());
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].offset, 5);
        assert_eq!(entries[3].offset, 5 + 3 * 417);
        assert_eq!(entries[1].pts, Duration::from_nanos(26_122_448));
    }

    #[test]
    fn test_配置文件() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("liu.json");
        std::fs::write(
            &path,
            r#"{ "decoder": { "tolerance": 40 }, "mpeg": { "skip_initial_frames": 1 } }"#,
        )
        .unwrap();
        let cli = Cli::parse_from([
            "liu-probe",
            "in.mp3",
            "--config",
            path.to_str().unwrap(),
            "--min-latency-ms",
            "20",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.decoder.tolerance, Duration::from_millis(40));
        assert_eq!(config.decoder.min_latency, Duration::from_millis(20));
        assert_eq!(config.mpeg.skip_initial_frames, 1);
    }
}
