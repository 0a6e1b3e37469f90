//! 倒放集成测试.
//!
//! 上游以负速率送入不连续的数据块 (块内正序, 块间倒序), 解码器逐块正向解码后
//! 把输出倒序下发.

use liu::codec::decoders::{PcmDecoder, PcmVariant};
use liu::codec::{AudioDecoder, Output};
use liu::core::{Buffer, Caps, Event, Format, Segment};
use std::time::Duration;

/// 8 kHz 单声道 S16: 160 字节 = 80 采样 = 10 ms
const CHUNK: usize = 160;

fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn open() -> AudioDecoder<PcmDecoder> {
    let dec = AudioDecoder::new(PcmDecoder::new(PcmVariant::S16le));
    let mut caps = Caps::new("audio/x-raw");
    caps.rate = Some(8000);
    caps.channels = Some(1);
    dec.set_caps(caps).unwrap();
    dec
}

fn segment(rate: f64) -> Event {
    let mut segment = Segment::new(Format::Time);
    segment.rate = rate;
    Event::Segment {
        update: false,
        segment,
    }
}

/// 编号为 `n` 的 10 ms 数据块, 时间戳 (n - 1) * 10 ms
fn chunk(n: u8) -> Buffer {
    Buffer::new(vec![n; CHUNK]).with_pts(Duration::from_millis(u64::from(n - 1) * 10))
}

fn buffers(dec: &AudioDecoder<PcmDecoder>) -> Vec<Buffer> {
    dec.take_outputs()
        .into_iter()
        .filter_map(Output::into_buffer)
        .collect()
}

fn tags(bufs: &[Buffer]) -> Vec<u8> {
    bufs.iter().map(|b| b.data[0]).collect()
}

#[test]
fn test_倒放_逐块倒序下发() {
    init_log();
    let dec = open();
    dec.send_event(segment(-1.0)).unwrap();

    let mut out = Vec::new();
    for n in [4, 3, 2, 1] {
        dec.push_buffer(chunk(n).discont()).unwrap();
        out.extend(buffers(&dec));
    }
    dec.send_event(Event::Eos).unwrap();
    out.extend(buffers(&dec));

    assert_eq!(tags(&out), vec![4, 3, 2, 1]);
    for b in &out {
        let n = u64::from(b.data[0]);
        assert_eq!(b.pts, Some(Duration::from_millis((n - 1) * 10)));
        assert_eq!(b.duration, Some(Duration::from_millis(10)));
    }
}

#[test]
fn test_倒放_块内多缓冲区() {
    init_log();
    let dec = open();
    dec.send_event(segment(-1.0)).unwrap();

    // 块 [4] 之后是块 [1, 2, 3], 只有块首带不连续标志
    dec.push_buffer(chunk(4).discont()).unwrap();
    assert!(buffers(&dec).is_empty());
    dec.push_buffer(chunk(1).discont()).unwrap();
    // 新块开始时上一块才被解码下发
    assert_eq!(tags(&buffers(&dec)), vec![4]);
    dec.push_buffer(chunk(2)).unwrap();
    dec.push_buffer(chunk(3)).unwrap();
    assert!(buffers(&dec).is_empty());

    dec.send_event(Event::Eos).unwrap();
    assert_eq!(tags(&buffers(&dec)), vec![3, 2, 1]);
}

#[test]
fn test_倒放与正放输出一致() {
    init_log();
    let forward = open();
    forward.send_event(segment(1.0)).unwrap();
    for n in 1..=6 {
        forward.push_buffer(chunk(n)).unwrap();
    }
    forward.send_event(Event::Eos).unwrap();
    let fwd = buffers(&forward);

    let reverse = open();
    reverse.send_event(segment(-1.0)).unwrap();
    for n in (1..=6).rev() {
        reverse.push_buffer(chunk(n).discont()).unwrap();
    }
    reverse.send_event(Event::Eos).unwrap();
    let mut rev = buffers(&reverse);
    rev.reverse();

    assert_eq!(fwd.len(), 6);
    assert_eq!(rev.len(), fwd.len());
    for (a, b) in fwd.iter().zip(&rev) {
        assert_eq!(a.data, b.data);
        assert_eq!(a.duration, b.duration);
        assert_eq!(a.pts, b.pts);
    }
}

#[test]
fn test_倒放_无输出的缓冲区保留到下一块() {
    init_log();
    let dec = open();
    dec.send_event(segment(-1.0)).unwrap();

    // 不足一个采样, 本块不会产生输出
    dec.push_buffer(Buffer::new(vec![7u8]).discont()).unwrap();
    dec.push_buffer(chunk(1).discont()).unwrap();
    assert!(buffers(&dec).is_empty());

    dec.send_event(Event::Eos).unwrap();
    let out = buffers(&dec);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].len(), CHUNK);
    assert_eq!(out[0].pts, Some(Duration::ZERO));
    assert_eq!(dec.samples_out(), 80);
}
