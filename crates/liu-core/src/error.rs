//! 统一错误类型定义.
//!
//! 所有 Liu crate 共用的错误类型, 支持跨模块传播.
//!
//! 错误分为三类:
//! - 本地可恢复: `NeedMoreData`, `MalformedVbrMetadata`, 不会越过元素边界
//! - 请求级失败: `UnsupportedSeek`, 仅表示该请求未被处理
//! - 终止流: 其余解码/同步/契约类错误, 出现后不再期待任何输出

use thiserror::Error;

/// Liu 框架统一错误类型
#[derive(Debug, Error)]
pub enum LiuError {
    /// 数据不足, 需要更多输入
    #[error("数据不足, 需要更多输入")]
    NeedMoreData,

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,

    /// 元素处于 flush 状态, 拒绝数据
    #[error("正在 flush, 数据被拒绝")]
    Flushing,

    /// 在重同步窗口内未找到有效帧
    #[error("帧同步失败: 已跳过 {skipped} 字节仍未找到有效帧")]
    SyncFailure { skipped: usize },

    /// VBR 元数据 (Xing/Info/VBRI) 损坏或不可信
    #[error("VBR 元数据损坏: {0}")]
    MalformedVbrMetadata(String),

    /// 解码错误 (累计权重超过容忍上限后升级为致命错误)
    #[error("解码错误: {0}")]
    Decode(String),

    /// 不支持的 seek 请求形态
    #[error("不支持的 seek: {0}")]
    UnsupportedSeek(String),

    /// 解码输出大小不是每帧字节数的整数倍
    #[error("输出大小 {size} 字节不是每帧字节数 {bpf} 的整数倍")]
    BufferSizeMismatch { size: usize, bpf: usize },

    /// 子类声明消耗的帧数超过队列中的帧数
    #[error("帧计数溢出: 请求消耗 {requested} 帧, 队列中仅有 {queued} 帧")]
    FrameAccountingOverflow { requested: usize, queued: usize },

    /// 输入/输出格式尚未协商
    #[error("格式未协商: {0}")]
    NotNegotiated(String),

    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 无效数据 (损坏的码流等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 不支持的操作
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
}

impl LiuError {
    /// 是否为终止流的错误
    ///
    /// 终止错误出现后, 会话不会自行恢复, 调用方应停止送入数据.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::NeedMoreData
                | Self::Eof
                | Self::Flushing
                | Self::MalformedVbrMetadata(_)
                | Self::UnsupportedSeek(_)
        )
    }
}

/// Liu 框架统一 Result 类型
pub type LiuResult<T> = Result<T, LiuError>;
