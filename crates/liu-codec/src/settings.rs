//! 解码基类配置.
//!
//! 字段均带有默认值, 可由 JSON 等格式部分覆盖. 运行期修改通过带校验的 setter 进行.

use liu_core::{LiuError, LiuResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 默认的最大解码错误容忍数
pub const DEFAULT_MAX_ERRORS: i32 = 10;

/// 默认的聚合边界容差
pub const DEFAULT_AGGREGATE_TOLERANCE: Duration = Duration::from_millis(10);

/// 解码基类配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderSettings {
    /// 输出聚合阈值, 0 表示不聚合
    #[serde(with = "duration_ms")]
    pub min_latency: Duration,
    /// 输入时间戳抖动容差, 0 表示每个有效时间戳都重新同步
    #[serde(with = "duration_ms")]
    pub tolerance: Duration,
    /// 是否启用丢包补偿
    pub plc: bool,
    /// 最大解码错误容忍数, -1 表示从不升级为致命错误
    pub max_errors: i32,
    /// 聚合时判定相邻输出连续的容差
    #[serde(with = "duration_ms")]
    pub aggregate_tolerance: Duration,
}

impl Default for DecoderSettings {
    fn default() -> Self {
        Self {
            min_latency: Duration::ZERO,
            tolerance: Duration::ZERO,
            plc: false,
            max_errors: DEFAULT_MAX_ERRORS,
            aggregate_tolerance: DEFAULT_AGGREGATE_TOLERANCE,
        }
    }
}

impl DecoderSettings {
    /// 设置输出聚合阈值
    pub fn set_min_latency(&mut self, min_latency: Duration) {
        self.min_latency = min_latency;
    }

    /// 设置时间戳抖动容差
    pub fn set_tolerance(&mut self, tolerance: Duration) {
        self.tolerance = tolerance;
    }

    /// 启用/禁用丢包补偿
    pub fn set_plc(&mut self, plc: bool) {
        self.plc = plc;
    }

    /// 设置最大解码错误容忍数
    pub fn set_max_errors(&mut self, max_errors: i32) -> LiuResult<()> {
        if max_errors < -1 {
            return Err(LiuError::InvalidArgument(format!(
                "max_errors 必须 >= -1, 实际为 {max_errors}"
            )));
        }
        self.max_errors = max_errors;
        Ok(())
    }

    /// 设置聚合边界容差
    pub fn set_aggregate_tolerance(&mut self, tolerance: Duration) -> LiuResult<()> {
        if tolerance > Duration::from_secs(1) {
            return Err(LiuError::InvalidArgument(format!(
                "聚合容差过大: {tolerance:?}"
            )));
        }
        self.aggregate_tolerance = tolerance;
        Ok(())
    }
}

/// 以毫秒整数序列化 `Duration`
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
