//! 时钟与时间换算.
//!
//! 流内部统一使用纳秒精度的 `Duration` 表示时间, 缺失的时间戳用 `None` 表示.
//! 所有缩放运算在 u128 上完成, 避免 `采样数 * 1e9` 之类的中间结果溢出.

use std::time::Duration;

/// 每秒纳秒数
pub const SECOND: u64 = 1_000_000_000;

/// 每毫秒纳秒数
pub const MSECOND: u64 = 1_000_000;

/// 计算 `val * num / denom`, 向下取整
///
/// `denom` 为 0 或结果超出 u64 时返回 `None`.
pub fn scale(val: u64, num: u64, denom: u64) -> Option<u64> {
    if denom == 0 {
        return None;
    }
    let r = u128::from(val) * u128::from(num) / u128::from(denom);
    u64::try_from(r).ok()
}

/// 计算 `val * num / denom`, 四舍五入
pub fn scale_round(val: u64, num: u64, denom: u64) -> Option<u64> {
    if denom == 0 {
        return None;
    }
    let d = u128::from(denom);
    let r = (u128::from(val) * u128::from(num) + d / 2) / d;
    u64::try_from(r).ok()
}

/// `Duration` 转纳秒 (饱和)
pub fn nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

/// 采样帧数转时长
///
/// 采样率为 0 时返回 `None`.
pub fn frames_to_time(frames: u64, rate: u32) -> Option<Duration> {
    scale_round(frames, SECOND, u64::from(rate)).map(Duration::from_nanos)
}

/// 时长转采样帧数
pub fn time_to_frames(time: Duration, rate: u32) -> u64 {
    scale_round(nanos(time), u64::from(rate), SECOND).unwrap_or(0)
}

/// 两个时间点的绝对差
pub fn abs_diff(a: Duration, b: Duration) -> Duration {
    if a > b { a - b } else { b - a }
}

/// 可选时间戳的显示辅助, 缺失时输出 `none`
pub fn display(t: Option<Duration>) -> String {
    match t {
        Some(t) => format!("{:.6}s", t.as_secs_f64()),
        None => "none".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_缩放_不溢出() {
        // 24 小时 @ 192kHz 的采样数换算到纳秒
        let samples = 192_000u64 * 86_400;
        assert_eq!(scale(samples, SECOND, 192_000), Some(86_400 * SECOND));
        assert_eq!(scale(1, 1, 0), None);
    }

    #[test]
    fn test_帧时换算_四舍五入() {
        // 1152 / 44100 s = 26122448.97... ns
        assert_eq!(
            frames_to_time(1152, 44100),
            Some(Duration::from_nanos(26_122_449))
        );
        assert_eq!(frames_to_time(1152, 0), None);
        assert_eq!(time_to_frames(Duration::from_nanos(26_122_449), 44100), 1152);
    }

    #[test]
    fn test_绝对差() {
        let a = Duration::from_millis(10);
        let b = Duration::from_millis(25);
        assert_eq!(abs_diff(a, b), Duration::from_millis(15));
        assert_eq!(abs_diff(b, a), Duration::from_millis(15));
    }
}
