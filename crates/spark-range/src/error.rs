//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义区间提取对外暴露的错误语义：构造期的配置错误与运行期的写入拒绝；
//! - 截断（源在区间上界之前结束）不属于错误，由 [`RangeOutcome`](crate::RangeOutcome) 表达。
//!
//! ## 设计要求（What）
//! - 所有错误类型派生 `thiserror::Error`；
//! - 每个变体提供稳定错误码 [`code`](ConfigError::code)，前缀为 `range.*`，
//!   便于上层映射告警而不依赖 `Display` 文本。

use alloc::string::{String, ToString};
use core::{convert::Infallible, fmt::Display};

use spark_buffer::GrowthPolicyError;
use thiserror::Error;

/// 构造期配置错误，调用方必须修正参数，不应重试。
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    /// 增长策略参数非法（因子不大于 1、增量为 0 等）。
    #[error(transparent)]
    GrowthPolicy(#[from] GrowthPolicyError),

    /// 同时指定了增长因子与增量。
    #[error("cannot specify both growth factor ({factor}) and growth increment ({increment})")]
    ConflictingGrowthPolicy { factor: f64, increment: usize },

    /// 区间起点大于终点。
    #[error("range start {start} must not exceed end {end}")]
    InvalidRange { start: usize, end: usize },

    /// 读取器已开始消费，不能再调整区间。
    #[error("range reader already started; bounds can only change before the first pull")]
    ReaderStarted,

    /// 配置记录无法解码（类型错误、负数、未知字段等）。
    #[error("malformed options: {detail}")]
    Malformed { detail: String },
}

impl ConfigError {
    /// 由任意反序列化错误构造 [`ConfigError::Malformed`]。
    pub fn malformed(detail: impl Display) -> Self {
        Self::Malformed {
            detail: detail.to_string(),
        }
    }

    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::GrowthPolicy(inner) => inner.code(),
            Self::ConflictingGrowthPolicy { .. } => "range.config.conflicting_growth",
            Self::InvalidRange { .. } => "range.config.invalid_range",
            Self::ReaderStarted => "range.config.reader_started",
            Self::Malformed { .. } => "range.config.malformed",
        }
    }
}

impl From<Infallible> for ConfigError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

/// 区间提取的运行期错误域。
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RangeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Sink 已经结束，后续写入被拒绝且不会提交任何字节。
    #[error("sink already finished; rejected write of {rejected} bytes")]
    SinkFinished { rejected: usize },
}

impl RangeError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(inner) => inner.code(),
            Self::SinkFinished { .. } => "range.sink.finished",
        }
    }
}
