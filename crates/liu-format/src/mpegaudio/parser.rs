//! MPEG 音频解码器.
//!
//! 在解码基类上实现 MPEG-1/2/2.5 Layer I/II/III:
//! - `parse()` 用 `FrameScanner` 分帧, 并在第一帧检查 VBR 元数据
//! - `handle_frame()` 声明输出格式与标签, 丢弃 VBR 头所在帧与开头的若干帧,
//!   其余交给 `FrameDecoder` 解码
//! - 字节与时间的换算依次使用 Xing 目录、VBRI 表、平均比特率

use liu_codec::{
    Adapter, AudioDecoderImpl, DecoderContext, FrameInput, ParseOutcome, ParseState, SeekIndex,
    SeekPoint,
};
use liu_core::clock::{self, SECOND};
use liu_core::{AudioInfo, Buffer, Caps, Format, LiuError, LiuResult, TagList};
use log::{debug, info, trace};
use std::time::Duration;

use super::backend::FrameDecoder;
use super::header::{FrameHeader, MpegVersion};
use super::scanner::{FrameScanner, ScanResult};
use super::settings::MpegAudioSettings;
use super::vbr::{self, VbrInfo, VbrProbe};

/// 输入媒体类型
pub const MEDIA_TYPE: &str = "audio/mpeg";

/// 精确 seek 时向前多解码的帧数 (Layer III 比特储备)
const LOOKBACK_FRAMES_V1: u32 = 10;
const LOOKBACK_FRAMES_LSF: u32 = 30;

/// 单次丢包补偿输出的最长静音
const MAX_CONCEAL: Duration = Duration::from_secs(1);

/// 平均比特率统计
#[derive(Debug, Default, Clone, Copy)]
struct BitrateStats {
    sum: u64,
    frames: u64,
    /// 上次下发的平均比特率 (kbps)
    posted_kbps: u32,
}

impl BitrateStats {
    fn average(&self) -> Option<u32> {
        (self.frames > 0).then(|| (self.sum / self.frames) as u32)
    }

    /// 加入一帧; 平均值偏离上次下发值达到 1% 时返回新值 (kbps)
    fn add(&mut self, bitrate: u32) -> Option<u32> {
        self.sum += u64::from(bitrate);
        self.frames += 1;
        let kbps = self.average()? / 1000;
        let posted = self.posted_kbps;
        if kbps == posted || kbps.abs_diff(posted) * 100 < posted {
            return None;
        }
        self.posted_kbps = kbps;
        Some(kbps)
    }
}

/// MPEG 音频解码器
pub struct MpegAudioDecoder {
    settings: MpegAudioSettings,
    backend: Box<dyn FrameDecoder>,
    scanner: FrameScanner,
    /// 最近一帧的帧头, 决定输出格式
    current: Option<FrameHeader>,
    vbr_checked: bool,
    vbr: Option<VbrInfo>,
    /// 下一个被处理的帧是 VBR 头所在帧
    drop_next: bool,
    /// VBR 头所在帧的上游偏移, seek 回开头时据此再次丢弃
    vbr_frame_offset: Option<u64>,
    /// 第一帧在上游字节流中的偏移
    first_offset: Option<u64>,
    /// VBR 头的总量被丢弃时记下的上游大小, 用于重新标定目录
    table_bytes: Option<u64>,
    /// 已处理的帧数
    frames: u64,
    /// 已处理的音频帧数 (不含 VBR 头所在帧)
    audio_frames: u64,
    bitrate: BitrateStats,
    index: SeekIndex,
}

impl MpegAudioDecoder {
    /// 使用默认解码后端创建
    #[cfg(feature = "symphonia-backend")]
    pub fn new(settings: MpegAudioSettings) -> Self {
        Self::with_backend(settings, Box::new(super::backend::SymphoniaDecoder::new()))
    }

    /// 使用默认解码后端创建
    #[cfg(not(feature = "symphonia-backend"))]
    pub fn new(settings: MpegAudioSettings) -> Self {
        Self::with_backend(settings, Box::new(super::backend::SilenceDecoder))
    }

    /// 使用指定解码后端创建
    pub fn with_backend(settings: MpegAudioSettings, backend: Box<dyn FrameDecoder>) -> Self {
        Self {
            settings,
            backend,
            scanner: FrameScanner::new(settings.min_sync_frames, settings.max_resync_bytes),
            current: None,
            vbr_checked: false,
            vbr: None,
            drop_next: false,
            vbr_frame_offset: None,
            first_offset: None,
            table_bytes: None,
            frames: 0,
            audio_frames: 0,
            bitrate: BitrateStats::default(),
            index: SeekIndex::new(settings.index_interval),
        }
    }

    /// 配置
    pub fn settings(&self) -> &MpegAudioSettings {
        &self.settings
    }

    /// 最近一帧的帧头
    pub fn current_header(&self) -> Option<&FrameHeader> {
        self.current.as_ref()
    }

    /// 第一帧中的 VBR 信息
    pub fn vbr_info(&self) -> Option<&VbrInfo> {
        self.vbr.as_ref()
    }

    /// 已处理的帧数 (含被丢弃的帧)
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// 平均比特率 (bps)
    pub fn average_bitrate(&self) -> Option<u32> {
        self.bitrate.average()
    }

    /// seek 索引条目数
    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    /// 解码后端名称
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    fn reset(&mut self) {
        self.scanner = FrameScanner::new(
            self.settings.min_sync_frames,
            self.settings.max_resync_bytes,
        );
        self.backend.reset();
        self.current = None;
        self.vbr_checked = false;
        self.vbr = None;
        self.drop_next = false;
        self.vbr_frame_offset = None;
        self.first_offset = None;
        self.table_bytes = None;
        self.frames = 0;
        self.audio_frames = 0;
        self.bitrate = BitrateStats::default();
        self.index = SeekIndex::new(self.settings.index_interval);
    }

    /// 第一帧的 VBR 检查结果生效
    fn apply_vbr(&mut self, ctx: &mut DecoderContext, probe: VbrProbe, header: &FrameHeader) {
        self.vbr_checked = true;
        let Some(mut vbr) = VbrInfo::from_probe(probe, header) else {
            debug!("第一帧不含 VBR 头");
            return;
        };
        if let Some(upstream) = ctx.upstream_bytes() {
            if vbr.check_size(upstream, self.settings.vbr_size_ratio) && vbr.has_toc() {
                self.table_bytes = Some(upstream);
            }
        }
        if let Some(lame) = &vbr.lame {
            debug!(
                "{}: 编码延迟 {} 采样, 末尾填充 {} 采样",
                lame.version, lame.encoder_delay, lame.encoder_padding
            );
        }
        info!(
            "{} 头: 时长 {}, 平均比特率 {}",
            vbr.kind.name(),
            clock::display(vbr.total_time),
            vbr.bitrate
                .map_or_else(|| "-".to_string(), |b| format!("{} kbps", b / 1000))
        );

        if let Some(bps) = vbr.bitrate {
            ctx.merge_tags(&TagList {
                bitrate_kbps: Some(bps / 1000),
                ..Default::default()
            });
        }
        if vbr.total_time.is_some() {
            ctx.post_duration_changed();
        }
        self.drop_next = self.settings.drop_vbr_header_frame;
        self.vbr = Some(vbr);
        self.rescale_vbr_table();
    }

    /// VBR 头的总量不可信时, 按上游大小与平均比特率重新标定目录
    fn rescale_vbr_table(&mut self) {
        let Some(upstream) = self.table_bytes else {
            return;
        };
        let Some(bitrate) = self.byte_rate_bitrate() else {
            return;
        };
        let bytes = upstream.saturating_sub(self.first_offset.unwrap_or(0));
        let Some(ns) = clock::scale(bytes, 8 * SECOND, bitrate) else {
            return;
        };
        if let Some(vbr) = self.vbr.as_mut() {
            trace!("VBR 目录按 {bytes} 字节 / {bitrate} bps 重新标定");
            vbr.rescale(bytes, Duration::from_nanos(ns));
        }
    }

    /// 帧头中的格式变化时重新声明输出格式与标签
    fn update_format(&mut self, ctx: &mut DecoderContext, header: &FrameHeader) -> LiuResult<()> {
        let changed = self.current.is_none_or(|c| {
            c.sample_rate != header.sample_rate
                || c.channels() != header.channels()
                || c.layer != header.layer
                || c.version != header.version
                || c.mode != header.mode
                || c.has_crc != header.has_crc
        });
        self.current = Some(*header);
        if !changed {
            return Ok(());
        }

        debug!(
            "格式: {}, {} Hz, {} 声道 ({})",
            header.codec_name(),
            header.sample_rate,
            header.channels(),
            header.mode.name()
        );
        ctx.set_output_format(AudioInfo::new(
            header.sample_rate,
            header.channels(),
            self.backend.sample_format(),
        ))?;
        ctx.merge_tags(&TagList {
            codec: Some(header.codec_name()),
            nominal_bitrate_kbps: Some(header.bitrate / 1000),
            crc: Some(header.has_crc),
            channel_mode: Some(header.mode.name().to_string()),
            ..Default::default()
        });
        Ok(())
    }

    fn decode_frame(&mut self, ctx: &mut DecoderContext, frame: &Buffer) -> LiuResult<()> {
        let Some(header) = FrameHeader::from_bytes(&frame.data) else {
            ctx.error(1, "帧头无效")?;
            return ctx.finish_frame(None, 1);
        };
        self.update_format(ctx, &header)?;

        if self.frames == 0 {
            self.first_offset = frame.offset;
            self.rescale_vbr_table();
        }
        self.frames += 1;

        let time = frame.pts.or_else(|| ctx.expected_timestamp());
        if let (Some(time), Some(byte)) = (time, frame.offset) {
            if self.index.add(time, byte) {
                trace!("索引: {} -> {byte}", clock::display(Some(time)));
            }
        }

        let is_vbr_frame = self.drop_next
            || (self.vbr_frame_offset.is_some() && self.vbr_frame_offset == frame.offset);
        if is_vbr_frame {
            if self.drop_next {
                self.vbr_frame_offset = frame.offset;
                self.drop_next = false;
            }
            debug!("丢弃 VBR 头所在帧");
            return ctx.finish_frame(None, 1);
        }

        self.audio_frames += 1;
        if self.audio_frames <= u64::from(self.settings.skip_initial_frames) {
            debug!("跳过开头第 {} 帧", self.audio_frames);
            return ctx.finish_frame(None, 1);
        }

        if let Some(kbps) = self.bitrate.add(header.bitrate) {
            self.rescale_vbr_table();
            // VBR 头给出的比特率优先
            if self.vbr.as_ref().is_none_or(|v| v.bitrate.is_none()) {
                trace!("平均比特率更新为 {kbps} kbps");
                ctx.merge_tags(&TagList {
                    bitrate_kbps: Some(kbps),
                    ..Default::default()
                });
                ctx.post_duration_changed();
            }
        }

        match self.backend.decode(&frame.data, &header) {
            Ok(pcm) if pcm.is_empty() => ctx.finish_frame(None, 1),
            Ok(pcm) => ctx.finish_frame(Some(Buffer::new(pcm)), 1),
            Err(e) => {
                ctx.error(1, format!("{} 解码失败: {e}", self.backend.name()))?;
                ctx.finish_frame(None, 1)
            }
        }
    }

    /// 用静音补偿缺失的时长
    fn conceal(&mut self, ctx: &mut DecoderContext, gap: Duration) -> LiuResult<()> {
        let Some(info) = ctx.output_info() else {
            return ctx.finish_frame(None, 1);
        };
        if gap > MAX_CONCEAL {
            debug!("缺失 {gap:?}, 只补偿 {MAX_CONCEAL:?}");
        }
        let gap = gap.min(MAX_CONCEAL);
        let samples = clock::time_to_frames(gap, info.rate) as usize;
        if samples == 0 {
            return ctx.finish_frame(None, 1);
        }
        debug!("以 {samples} 个静音采样补偿 {gap:?}");
        self.backend.reset();
        ctx.finish_frame(Some(Buffer::new(vec![0u8; samples * info.bpf()])), 1)
    }

    /// 用于 CBR 换算的比特率
    fn byte_rate_bitrate(&self) -> Option<u64> {
        let bps = self
            .vbr
            .as_ref()
            .and_then(|v| v.bitrate)
            .or_else(|| self.bitrate.average())
            .or_else(|| self.current.map(|h| h.bitrate))?;
        (bps > 0).then_some(u64::from(bps))
    }

    /// 上游字节位置到时间
    fn byte_to_time(&self, byte: u64) -> Option<Duration> {
        let rel = byte.saturating_sub(self.first_offset.unwrap_or(0));
        if let Some(vbr) = self.vbr.as_ref().filter(|v| v.has_table()) {
            return vbr.byte_to_time(rel);
        }
        let bitrate = self.byte_rate_bitrate()?;
        clock::scale(rel, 8 * SECOND, bitrate).map(Duration::from_nanos)
    }

    /// 时间到上游字节位置
    fn time_to_byte(&self, ts: Duration) -> Option<u64> {
        let base = self.first_offset.unwrap_or(0);
        if let Some(vbr) = self.vbr.as_ref().filter(|v| v.has_table()) {
            return vbr.time_to_byte(ts).map(|b| b + base);
        }
        let bitrate = self.byte_rate_bitrate()?;
        clock::scale(clock::nanos(ts), bitrate, 8 * SECOND).map(|b| b + base)
    }
}

impl AudioDecoderImpl for MpegAudioDecoder {
    fn name(&self) -> &str {
        "mpegaudio"
    }

    fn start(&mut self, ctx: &mut DecoderContext) -> LiuResult<()> {
        self.settings.validate()?;
        self.reset();
        ctx.set_byte_time(true);
        ctx.set_drainable(false);
        ctx.set_plc_aware(true);
        debug!("MPEG 音频解码器启动, 后端 {}", self.backend.name());
        Ok(())
    }

    fn stop(&mut self) -> LiuResult<()> {
        self.reset();
        Ok(())
    }

    fn set_format(&mut self, _ctx: &mut DecoderContext, caps: &Caps) -> LiuResult<()> {
        if caps.media_type != MEDIA_TYPE {
            return Err(LiuError::NotNegotiated(format!(
                "不支持的输入格式 {}",
                caps.media_type
            )));
        }
        Ok(())
    }

    fn parse(
        &mut self,
        ctx: &mut DecoderContext,
        adapter: &Adapter,
        state: ParseState,
    ) -> LiuResult<ParseOutcome> {
        let data = adapter.as_slice();
        match self.scanner.scan(data, state.sync, state.draining)? {
            ScanResult::NeedMoreData { skip } => Ok(ParseOutcome::NeedMoreData { skip }),
            ScanResult::Frame { skip, header, len } => {
                if !self.vbr_checked {
                    match vbr::probe(&data[skip..], &header) {
                        VbrProbe::NeedMoreData if !state.draining => {
                            return Ok(ParseOutcome::NeedMoreData { skip });
                        }
                        probe => self.apply_vbr(ctx, probe, &header),
                    }
                }
                Ok(ParseOutcome::Frame { skip, len })
            }
        }
    }

    fn handle_frame(&mut self, ctx: &mut DecoderContext, input: FrameInput<'_>) -> LiuResult<()> {
        match input {
            FrameInput::Data(frame) => self.decode_frame(ctx, frame),
            FrameInput::Conceal(gap) => self.conceal(ctx, gap),
            FrameInput::Drain => Ok(()),
        }
    }

    fn flush(&mut self, _ctx: &mut DecoderContext, hard: bool) {
        self.scanner.reset(hard);
        self.backend.reset();
        self.drop_next = false;
    }

    fn convert(&self, src: Format, value: u64, dest: Format) -> Option<u64> {
        if src == dest {
            return Some(value);
        }
        let header = self.current?;
        match (src, dest) {
            (Format::Bytes, Format::Time) => self.byte_to_time(value).map(clock::nanos),
            (Format::Time, Format::Bytes) => self.time_to_byte(Duration::from_nanos(value)),
            (Format::Default, Format::Time) => {
                clock::frames_to_time(value, header.sample_rate).map(clock::nanos)
            }
            (Format::Time, Format::Default) => Some(clock::time_to_frames(
                Duration::from_nanos(value),
                header.sample_rate,
            )),
            _ => None,
        }
    }

    fn duration(&self) -> Option<Duration> {
        self.vbr.as_ref()?.total_time
    }

    fn seek_point(&self, target: Duration, accurate: bool) -> Option<SeekPoint> {
        let header = self.current?;
        let start = if accurate {
            let lookback = match header.version {
                MpegVersion::V1 => LOOKBACK_FRAMES_V1,
                MpegVersion::V2 | MpegVersion::V25 => LOOKBACK_FRAMES_LSF,
            };
            let back = Duration::from_nanos(header.frame_duration_ns() * u64::from(lookback));
            let start = target.saturating_sub(back);
            if let Some(point) = self.index.lookup_before(start) {
                debug!(
                    "精确 seek {}: 使用索引位置 {}",
                    clock::display(Some(target)),
                    point.byte
                );
                return Some(point);
            }
            start
        } else {
            target
        };
        let byte = self.time_to_byte(start)?;
        Some(SeekPoint { byte, time: start })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mpegaudio::backend::SilenceDecoder;
    use liu_codec::{AudioDecoder, Output};
    use liu_core::{Event, Segment};

    const HDR_128K: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];
    /// 1152 / 44100 秒
    const FRAME_NS: u64 = 26_122_448;

    fn frames(n: usize) -> Vec<u8> {
        let mut out = Vec::new();
        for _ in 0..n {
            let mut f = vec![0u8; 417];
            f[..4].copy_from_slice(&HDR_128K);
            out.extend(f);
        }
        out
    }

    fn xing_frame(total_frames: u32, total_bytes: u32) -> Vec<u8> {
        let mut f = frames(1);
        f[36..40].copy_from_slice(b"Xing");
        f[40..44].copy_from_slice(&3u32.to_be_bytes());
        f[44..48].copy_from_slice(&total_frames.to_be_bytes());
        f[48..52].copy_from_slice(&total_bytes.to_be_bytes());
        f
    }

    fn decoder(settings: MpegAudioSettings) -> AudioDecoder<MpegAudioDecoder> {
        let dec = AudioDecoder::new(MpegAudioDecoder::with_backend(
            settings,
            Box::new(SilenceDecoder),
        ));
        dec.set_caps(Caps::new(MEDIA_TYPE)).unwrap();
        dec
    }

    fn buffers(outputs: &[Output]) -> Vec<&Buffer> {
        outputs.iter().filter_map(Output::as_buffer).collect()
    }

    #[test]
    fn test_cbr_流逐帧解码() {
        let dec = decoder(MpegAudioSettings::default());
        dec.push_buffer(Buffer::new(frames(10)).with_pts(Duration::ZERO))
            .unwrap();
        dec.send_event(Event::Eos).unwrap();
        let out = dec.take_outputs();

        assert!(matches!(out[0], Output::Event(Event::Caps(_))));
        let tags = out.iter().find_map(|o| match o {
            Output::Event(Event::Tags(t)) => Some(t),
            _ => None,
        });
        let tags = tags.unwrap();
        assert_eq!(tags.codec.as_deref(), Some("MPEG-1 Layer 3 (MP3)"));
        assert_eq!(tags.nominal_bitrate_kbps, Some(128));
        assert_eq!(tags.channel_mode.as_deref(), Some("stereo"));

        let bufs = buffers(&out);
        assert_eq!(bufs.len(), 10);
        for (i, b) in bufs.iter().enumerate() {
            assert_eq!(b.len(), 1152 * 2 * 2);
            let pts = b.pts.unwrap();
            let expected = Duration::from_nanos(FRAME_NS * i as u64);
            assert!(clock::abs_diff(pts, expected) < Duration::from_micros(1));
        }
        assert!(bufs[0].is_discont());
        assert!(!bufs[1].is_discont());
        assert_eq!(dec.samples_out(), 11_520);
    }

    #[test]
    fn test_垃圾数据后同步() {
        let dec = decoder(MpegAudioSettings::default());
        let mut data = vec![0x00, 0xFF, 0x13, 0x37, 0xFF];
        data.extend(frames(5));
        dec.push_buffer(Buffer::new(data)).unwrap();
        dec.send_event(Event::Eos).unwrap();
        assert_eq!(buffers(&dec.take_outputs()).len(), 5);
    }

    #[test]
    fn test_xing_帧被丢弃并给出时长() {
        let dec = decoder(MpegAudioSettings::default());
        let mut data = xing_frame(8, 417 * 9);
        data.extend(frames(8));
        dec.push_buffer(Buffer::new(data).with_pts(Duration::ZERO))
            .unwrap();
        dec.send_event(Event::Eos).unwrap();
        let out = dec.take_outputs();

        let bufs = buffers(&out);
        assert_eq!(bufs.len(), 8);
        assert_eq!(bufs[0].pts, Some(Duration::ZERO));
        assert!(
            out.iter()
                .any(|o| matches!(o, Output::Event(Event::DurationChanged)))
        );

        let duration = dec.with_impl(|d| d.duration()).unwrap();
        // 8 * 1152 / 44100
        assert_eq!(duration, Duration::from_nanos(208_979_591));
        let kind = dec.with_impl(|d| d.vbr_info().map(|v| v.kind));
        assert_eq!(kind, Some(vbr::VbrKind::Xing));
    }

    #[test]
    fn test_保留_vbr_头所在帧() {
        let settings = MpegAudioSettings {
            drop_vbr_header_frame: false,
            ..Default::default()
        };
        let dec = decoder(settings);
        let mut data = xing_frame(8, 417 * 9);
        data.extend(frames(8));
        dec.push_buffer(Buffer::new(data)).unwrap();
        dec.send_event(Event::Eos).unwrap();
        assert_eq!(buffers(&dec.take_outputs()).len(), 9);
    }

    #[test]
    fn test_跳过开头帧() {
        let settings = MpegAudioSettings {
            skip_initial_frames: 3,
            ..Default::default()
        };
        let dec = decoder(settings);
        dec.push_buffer(Buffer::new(frames(6)).with_pts(Duration::ZERO))
            .unwrap();
        dec.send_event(Event::Eos).unwrap();
        let out = dec.take_outputs();
        let bufs = buffers(&out);
        assert_eq!(bufs.len(), 3);
        assert_eq!(dec.with_impl(MpegAudioDecoder::frames), 6);
    }

    #[test]
    fn test_拒绝非_mpeg_输入() {
        let dec = AudioDecoder::new(MpegAudioDecoder::with_backend(
            MpegAudioSettings::default(),
            Box::new(SilenceDecoder),
        ));
        let err = dec.set_caps(Caps::new("audio/x-flac")).unwrap_err();
        assert!(matches!(err, LiuError::NotNegotiated(_)));
    }

    #[test]
    fn test_cbr_字节时间换算() {
        let dec = decoder(MpegAudioSettings::default());
        dec.push_buffer(Buffer::new(frames(4)).with_offset(0))
            .unwrap();
        // 128 kbps: 16000 字节 = 1 秒
        let t = dec.with_impl(|d| d.convert(Format::Bytes, 16_000, Format::Time));
        assert_eq!(t, Some(SECOND));
        let b = dec.with_impl(|d| d.convert(Format::Time, 2 * SECOND, Format::Bytes));
        assert_eq!(b, Some(32_000));
        let p = dec.with_impl(|d| d.seek_point(Duration::from_secs(1), false));
        assert_eq!(p.map(|p| p.byte), Some(16_000));
    }

    #[test]
    fn test_丢包补偿长度有上限() {
        let dec = decoder(MpegAudioSettings::default());
        dec.set_plc(true);
        dec.send_event(Event::Segment {
            update: false,
            segment: Segment::new(Format::Time),
        })
        .unwrap();
        dec.push_buffer(Buffer::new(frames(3)).with_pts(Duration::ZERO))
            .unwrap();
        dec.send_event(Event::Eos).unwrap();
        dec.take_outputs();

        // 段更新跳过一小时
        let mut next = Segment::new(Format::Time);
        next.start = 3600 * SECOND;
        dec.send_event(Event::Segment {
            update: true,
            segment: next,
        })
        .unwrap();
        let out = dec.take_outputs();
        let bufs = buffers(&out);
        assert_eq!(bufs.len(), 1);
        assert_eq!(bufs[0].len(), 44_100 * 2 * 2);
        assert_eq!(dec.samples_out(), 3 * 1152 + 44_100);
    }

    #[test]
    fn test_比特率统计() {
        let mut s = BitrateStats::default();
        assert_eq!(s.add(128_000), Some(128));
        assert_eq!(s.add(128_000), None);
        // 平均 (128 + 128 + 320) / 3 = 192
        assert_eq!(s.add(320_000), Some(192));
        assert_eq!(s.average(), Some(192_000));
    }
}
