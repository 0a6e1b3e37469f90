//! MPEG 音频解析配置.

use liu_codec::settings::duration_ms;
use liu_core::{LiuError, LiuResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 默认的扩展校验帧数
pub const DEFAULT_MIN_SYNC_FRAMES: u32 = 3;

/// 默认的失步窗口
pub const DEFAULT_MAX_RESYNC_BYTES: usize = 20480;

/// MPEG 音频解析配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MpegAudioSettings {
    /// 开头丢弃的帧数
    pub skip_initial_frames: u32,
    /// 取得同步前要求的连续有效帧数 (含当前帧)
    pub min_sync_frames: u32,
    /// 单次失步最多跳过的字节数
    pub max_resync_bytes: usize,
    /// VBR 头声明字节数与实际字节数之比低于该值时不采信总量
    pub vbr_size_ratio: f64,
    /// seek 索引条目的最小时间间隔
    #[serde(with = "duration_ms")]
    pub index_interval: Duration,
    /// 丢弃携带 VBR 头的帧
    pub drop_vbr_header_frame: bool,
}

impl Default for MpegAudioSettings {
    fn default() -> Self {
        Self {
            skip_initial_frames: 0,
            min_sync_frames: DEFAULT_MIN_SYNC_FRAMES,
            max_resync_bytes: DEFAULT_MAX_RESYNC_BYTES,
            vbr_size_ratio: 0.8,
            index_interval: Duration::from_secs(1),
            drop_vbr_header_frame: true,
        }
    }
}

impl MpegAudioSettings {
    /// 检查取值范围
    pub fn validate(&self) -> LiuResult<()> {
        if self.min_sync_frames == 0 {
            return Err(LiuError::InvalidArgument(
                "min_sync_frames 不能为 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.vbr_size_ratio) {
            return Err(LiuError::InvalidArgument(format!(
                "vbr_size_ratio 必须在 [0, 1] 内, 实际为 {}",
                self.vbr_size_ratio
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_默认值() {
        let s = MpegAudioSettings::default();
        assert_eq!(s.min_sync_frames, 3);
        assert_eq!(s.max_resync_bytes, 20480);
        assert!(s.drop_vbr_header_frame);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_json_部分覆盖() {
        let s: MpegAudioSettings =
            serde_json::from_str(r#"{ "skip_initial_frames": 2, "index_interval": 500 }"#)
                .unwrap();
        assert_eq!(s.skip_initial_frames, 2);
        assert_eq!(s.index_interval, Duration::from_millis(500));
        assert_eq!(s.vbr_size_ratio, 0.8);
    }

    #[test]
    fn test_取值校验() {
        let s = MpegAudioSettings {
            vbr_size_ratio: 1.5,
            ..Default::default()
        };
        assert!(matches!(s.validate(), Err(LiuError::InvalidArgument(_))));
    }
}
