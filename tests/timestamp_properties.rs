//! 输出时间线性质测试.
//!
//! 覆盖: 容差内的抖动不影响完美时间线、超出容差立即重新同步、
//! 阈值为 0 时聚合不改变输出、聚合合并、丢包补偿, 以及多线程并发访问.

use liu::codec::decoders::{PcmDecoder, PcmVariant};
use liu::codec::{AudioDecoder, Output, Upstream};
use liu::core::{Buffer, Caps, Event, Format, Query, QueryAnswer, Segment};
use liu::format::mpegaudio::{MEDIA_TYPE, MpegAudioDecoder, MpegAudioSettings, SilenceDecoder};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// 8 kHz 单声道 S16: 160 字节 = 10 ms
const CHUNK: usize = 160;

fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 非直播上游, 允许输出聚合
struct FileLike;

impl Upstream for FileLike {
    fn push_event(&mut self, _event: Event) -> bool {
        false
    }

    fn query(&mut self, query: &Query) -> Option<QueryAnswer> {
        match query {
            Query::Latency => Some(QueryAnswer::Latency {
                live: false,
                min: Duration::ZERO,
                max: Some(Duration::ZERO),
            }),
            _ => None,
        }
    }
}

fn pcm_caps() -> Caps {
    let mut caps = Caps::new("audio/x-raw");
    caps.rate = Some(8000);
    caps.channels = Some(1);
    caps
}

fn open() -> AudioDecoder<PcmDecoder> {
    let dec = AudioDecoder::with_upstream(PcmDecoder::new(PcmVariant::S16le), Box::new(FileLike));
    dec.set_caps(pcm_caps()).unwrap();
    dec
}

fn buffers(dec: &AudioDecoder<PcmDecoder>) -> Vec<Buffer> {
    dec.take_outputs()
        .into_iter()
        .filter_map(Output::into_buffer)
        .collect()
}

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

#[test]
fn test_容差内抖动保持完美时间线() {
    init_log();
    let dec = open();
    dec.set_tolerance(ms(5));
    let jitter = [0i64, 2, -3, 4, -1, 3, -4, 1, 0, -2];
    for (i, j) in jitter.iter().enumerate() {
        let pts = (i as i64 * 10 + j) as u64;
        dec.push_buffer(Buffer::new(vec![0u8; CHUNK]).with_pts(ms(pts)))
            .unwrap();
    }
    let out = buffers(&dec);
    assert_eq!(out.len(), jitter.len());
    for (i, b) in out.iter().enumerate() {
        assert_eq!(b.pts, Some(ms(i as u64 * 10)));
        assert_eq!(b.duration, Some(ms(10)));
    }
}

#[test]
fn test_超出容差立即重新同步() {
    init_log();
    let dec = open();
    dec.set_tolerance(ms(5));
    let input = [0u64, 10, 20, 30, 40, 100, 110];
    for pts in input {
        dec.push_buffer(Buffer::new(vec![0u8; CHUNK]).with_pts(ms(pts)))
            .unwrap();
    }
    let out = buffers(&dec);
    let pts: Vec<_> = out.iter().map(|b| b.pts).collect();
    assert_eq!(pts, input.iter().map(|&v| Some(ms(v))).collect::<Vec<_>>());
}

#[test]
fn test_零阈值聚合原样输出() {
    init_log();
    let dec = open();
    let inputs: Vec<Buffer> = (0..8u8)
        .map(|i| {
            Buffer::new(vec![i; CHUNK]).with_pts(Duration::from_micros(u64::from(i) * 10_250))
        })
        .collect();
    for b in &inputs {
        dec.push_buffer(b.clone()).unwrap();
    }
    let out = buffers(&dec);
    assert_eq!(out.len(), inputs.len());
    for (a, b) in out.iter().zip(&inputs) {
        assert_eq!(a.data, b.data);
        // 容差为 0 时每个输入时间戳都被采纳
        assert_eq!(a.pts, b.pts);
        assert_eq!(a.duration, Some(ms(10)));
    }
}

#[test]
fn test_按阈值聚合输出() {
    init_log();
    let dec = open();
    dec.set_min_latency(ms(40));
    for i in 0..8u64 {
        dec.push_buffer(Buffer::new(vec![0u8; CHUNK]).with_pts(ms(i * 10)))
            .unwrap();
    }
    let out = buffers(&dec);
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].len(), 4 * CHUNK);
    assert_eq!(out[0].pts, Some(ms(0)));
    assert_eq!(out[0].duration, Some(ms(40)));
    assert_eq!(out[1].pts, Some(ms(40)));
}

#[test]
fn test_直播上游不聚合() {
    init_log();
    let dec = AudioDecoder::new(PcmDecoder::new(PcmVariant::S16le));
    dec.set_caps(pcm_caps()).unwrap();
    dec.set_min_latency(ms(40));
    for i in 0..4u64 {
        dec.push_buffer(Buffer::new(vec![0u8; CHUNK]).with_pts(ms(i * 10)))
            .unwrap();
    }
    assert_eq!(buffers(&dec).len(), 4);
}

#[test]
fn test_段更新时补偿缺口() {
    init_log();
    let dec = AudioDecoder::new(MpegAudioDecoder::with_backend(
        MpegAudioSettings::default(),
        Box::new(SilenceDecoder),
    ));
    dec.set_plc(true);
    dec.set_caps(Caps::new(MEDIA_TYPE)).unwrap();
    dec.send_event(Event::Segment {
        update: false,
        segment: Segment::new(Format::Time),
    })
    .unwrap();

    let mut data = Vec::new();
    for _ in 0..3 {
        let mut f = vec![0u8; 417];
        f[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
        data.extend(f);
    }
    dec.push_buffer(Buffer::new(data).with_pts(Duration::ZERO))
        .unwrap();
    dec.send_event(Event::Eos).unwrap();
    dec.take_outputs();
    assert_eq!(dec.samples_out(), 3 * 1152);

    // 下一段从 1 秒开始, 中间缺失约 0.92 秒
    let mut next = Segment::new(Format::Time);
    next.start = 1_000_000_000;
    dec.send_event(Event::Segment {
        update: true,
        segment: next,
    })
    .unwrap();
    let out: Vec<Buffer> = dec
        .take_outputs()
        .into_iter()
        .filter_map(Output::into_buffer)
        .collect();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].pts, Some(Duration::from_nanos(78_367_347)));
    // 补偿到整秒: 44100 - 3456 个采样
    assert_eq!(out[0].len(), 40_644 * 4);
    assert_eq!(dec.samples_out(), 44_100);
}

#[test]
fn test_多线程送数据与查询() {
    init_log();
    let dec = Arc::new(open());
    let total = 200u64;

    let producer = {
        let dec = Arc::clone(&dec);
        thread::spawn(move || {
            for i in 0..total {
                dec.push_buffer(Buffer::new(vec![0u8; CHUNK]).with_pts(ms(i * 10)))
                    .unwrap();
            }
            dec.send_event(Event::Eos).unwrap();
        })
    };
    let observer = {
        let dec = Arc::clone(&dec);
        thread::spawn(move || {
            let mut positions = 0;
            for i in 0..500u64 {
                if dec.src_query(&Query::Position(Format::Time)).is_some() {
                    positions += 1;
                }
                dec.set_tolerance(ms(i % 3));
                let _ = dec.latency();
                let _ = dec.settings();
                let _ = dec.src_query(&Query::Convert {
                    src_format: Format::Default,
                    src_value: 8000,
                    dest_format: Format::Time,
                });
            }
            positions
        })
    };

    let mut collected = 0u64;
    while !producer.is_finished() {
        collected += dec
            .take_outputs()
            .iter()
            .filter(|o| o.as_buffer().is_some())
            .count() as u64;
        thread::yield_now();
    }
    producer.join().unwrap();
    observer.join().unwrap();
    collected += buffers(&dec).len() as u64;

    assert_eq!(collected, total);
    assert_eq!(dec.samples_out(), total * 80);
    assert_eq!(
        dec.src_query(&Query::Convert {
            src_format: Format::Default,
            src_value: 8000,
            dest_format: Format::Time,
        }),
        Some(QueryAnswer::Convert(1_000_000_000))
    );
}
