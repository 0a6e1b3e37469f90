//! 探测结果汇总与输出.

use liu_codec::Output;
use liu_core::{Event, TagList, clock::SECOND};
use liu_format::mpegaudio::{FrameHeader, VbrInfo};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// 完整探测结果
#[derive(Debug, Default, Serialize)]
pub struct Report {
    pub filename: String,
    pub probe_score: u32,
    pub first_frame_offset: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<StreamInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vbr: Option<VbrSummary>,
    /// 解码器回答的总时长 (秒)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub output: OutputSummary,
    pub tags: TagList,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seek: Option<SeekReport>,
}

/// 输入流信息
#[derive(Debug, Serialize)]
pub struct StreamInfo {
    pub codec_name: String,
    pub layer: u8,
    pub sample_rate: u32,
    pub channels: u32,
    pub channel_mode: String,
    pub bitrate_kbps: u32,
    pub crc: bool,
}

impl StreamInfo {
    pub fn from_header(header: &FrameHeader) -> Self {
        Self {
            codec_name: header.codec_name(),
            layer: header.layer,
            sample_rate: header.sample_rate,
            channels: header.channels(),
            channel_mode: header.mode.name().to_string(),
            bitrate_kbps: header.bitrate / 1000,
            crc: header.has_crc,
        }
    }
}

/// VBR 元数据
#[derive(Debug, Serialize)]
pub struct VbrSummary {
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<u32>,
    pub seek_table: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoder_delay: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoder_padding: Option<u16>,
}

impl VbrSummary {
    pub fn from_info(info: &VbrInfo) -> Self {
        Self {
            kind: info.kind.name().to_string(),
            frames: info.frames,
            bytes: info.bytes,
            duration: info.total_time.map(secs),
            bitrate_kbps: info.bitrate.map(|b| b / 1000),
            seek_table: info.has_table(),
            encoder: info.lame.as_ref().map(|l| l.version.clone()),
            encoder_delay: info.lame.as_ref().map(|l| l.encoder_delay),
            encoder_padding: info.lame.as_ref().map(|l| l.encoder_padding),
        }
    }
}

/// 解码输出统计
#[derive(Debug, Default, Serialize)]
pub struct OutputSummary {
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u32>,
    pub frames_parsed: u64,
    pub buffers: u64,
    pub bytes: u64,
    pub samples: u64,
    pub discont: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_pts: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_end: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_bitrate_kbps: Option<u32>,
    pub index_entries: usize,
    /// 各类事件的数量
    pub events: BTreeMap<String, u64>,
}

/// seek 结果
#[derive(Debug, Serialize)]
pub struct SeekReport {
    pub target: f64,
    pub byte_offset: u64,
    /// seek 后第一个输出的时间戳
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_pts: Option<f64>,
}

impl Report {
    /// 统计一批解码器输出
    pub fn collect(&mut self, outputs: Vec<Output>) {
        for output in outputs {
            match output {
                Output::Buffer(buffer) => {
                    let out = &mut self.output;
                    out.buffers += 1;
                    out.bytes += buffer.len() as u64;
                    if buffer.is_discont() {
                        out.discont += 1;
                    }
                    if out.first_pts.is_none() {
                        out.first_pts = buffer.pts.map(secs);
                    }
                    if let Some(end) = buffer.end() {
                        let end = secs(end);
                        out.last_end = Some(out.last_end.map_or(end, |e: f64| e.max(end)));
                    }
                    if let Some(seek) = self.seek.as_mut() {
                        if seek.first_pts.is_none() {
                            seek.first_pts = buffer.pts.map(secs);
                        }
                    }
                }
                Output::Event(event) => {
                    match &event {
                        Event::Caps(caps) => {
                            if let Some(info) = caps.info {
                                self.output.sample_format = Some(info.format.to_string());
                            }
                            self.output.sample_rate = caps.rate;
                            self.output.channels = caps.channels;
                        }
                        Event::Tags(tags) => self.tags.merge(tags),
                        _ => {}
                    }
                    *self
                        .output
                        .events
                        .entry(event.name().to_string())
                        .or_default() += 1;
                }
            }
        }
    }

    /// 文本格式输出
    pub fn print_text(&self) {
        println!("[FORMAT]");
        println!("filename={}", self.filename);
        println!("probe_score={}", self.probe_score);
        println!("first_frame_offset={}", self.first_frame_offset);
        if let Some(d) = self.duration {
            println!("duration={d:.6}");
        }
        println!("[/FORMAT]");

        if let Some(s) = &self.stream {
            println!("[STREAM]");
            println!("codec_name={}", s.codec_name);
            println!("sample_rate={}", s.sample_rate);
            println!("channels={}", s.channels);
            println!("channel_mode={}", s.channel_mode);
            println!("bit_rate={}", s.bitrate_kbps * 1000);
            println!("crc={}", s.crc);
            println!("[/STREAM]");
        }

        if let Some(v) = &self.vbr {
            println!("[VBR]");
            println!("kind={}", v.kind);
            print_opt("frames", v.frames);
            print_opt("bytes", v.bytes);
            print_opt("duration", v.duration.map(|d| format!("{d:.6}")));
            print_opt("bit_rate", v.bitrate_kbps.map(|b| b * 1000));
            println!("seek_table={}", v.seek_table);
            print_opt("encoder", v.encoder.as_deref());
            print_opt("encoder_delay", v.encoder_delay);
            print_opt("encoder_padding", v.encoder_padding);
            println!("[/VBR]");
        }

        let o = &self.output;
        println!("[OUTPUT]");
        println!("backend={}", o.backend);
        print_opt("sample_fmt", o.sample_format.as_deref());
        print_opt("sample_rate", o.sample_rate);
        print_opt("channels", o.channels);
        println!("frames_parsed={}", o.frames_parsed);
        println!("buffers={}", o.buffers);
        println!("bytes={}", o.bytes);
        println!("samples={}", o.samples);
        println!("discont={}", o.discont);
        print_opt("first_pts", o.first_pts.map(|t| format!("{t:.6}")));
        print_opt("last_end", o.last_end.map(|t| format!("{t:.6}")));
        print_opt("avg_bit_rate", o.average_bitrate_kbps.map(|b| b * 1000));
        println!("index_entries={}", o.index_entries);
        for (name, count) in &o.events {
            println!("event.{name}={count}");
        }
        println!("[/OUTPUT]");

        if !self.tags.is_empty() {
            println!("[TAGS]");
            print_opt("codec", self.tags.codec.as_deref());
            print_opt("nominal_bitrate", self.tags.nominal_bitrate_kbps);
            print_opt("bitrate", self.tags.bitrate_kbps);
            print_opt("crc", self.tags.crc);
            print_opt("channel_mode", self.tags.channel_mode.as_deref());
            println!("[/TAGS]");
        }

        if let Some(s) = &self.seek {
            println!("[SEEK]");
            println!("target={:.6}", s.target);
            println!("byte_offset={}", s.byte_offset);
            print_opt("first_pts", s.first_pts.map(|t| format!("{t:.6}")));
            println!("[/SEEK]");
        }
    }
}

fn print_opt<T: std::fmt::Display>(key: &str, value: Option<T>) {
    if let Some(v) = value {
        println!("{key}={v}");
    }
}

/// 时长转秒
pub fn secs(d: Duration) -> f64 {
    d.as_nanos() as f64 / SECOND as f64
}
