//! 构造参数的归一化与校验。
//!
//! # 模块定位（Why）
//! - 调用方既可能按位置传参（容量 + 增长因子、起点 + 终点），也可能传入一份配置记录；
//!   两种约定在这里统一解析为强类型的 [`SinkConfig`] 与 [`ByteRange`]。
//! - 配置记录派生 `serde::Deserialize`，可以来自 JSON、TOML 或任意 serde 格式，
//!   并兼容旧字段名 `size`、`growFactor`、`growSize`。
//!
//! # 契约（What）
//! - 所有校验失败都返回 [`ConfigError`]，发生在任何写入之前；
//! - 记录本身无法解码时，调用方可用 [`ConfigError::malformed`] 包装解码错误，
//!   或直接使用 `from_deserializer` 系列函数。

use serde::{Deserialize, Deserializer};
use spark_buffer::GrowthPolicy;

use crate::{
    error::ConfigError,
    filter::{self, DirectFilter, FilterReader, FilterWriter},
    range::ByteRange,
    sink::BufferedSink,
};

/// 缓冲 Sink 的默认初始容量。
pub const DEFAULT_CAPACITY: usize = 1024;

/// 经过校验的 Sink 配置。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SinkConfig {
    pub capacity: usize,
    pub policy: GrowthPolicy,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            policy: GrowthPolicy::default(),
        }
    }
}

impl SinkConfig {
    pub fn build(self) -> BufferedSink {
        BufferedSink::with_config(self)
    }
}

/// Sink 的配置记录。
///
/// - `capacity`：初始容量，缺省 1024；
/// - `growth_factor` / `growth_increment`：至多指定一个，均缺省时按 2 倍增长。
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SinkOptions {
    #[serde(alias = "size")]
    pub capacity: Option<usize>,
    #[serde(alias = "growthFactor", alias = "growFactor")]
    pub growth_factor: Option<f64>,
    #[serde(alias = "growthIncrement", alias = "growSize")]
    pub growth_increment: Option<usize>,
}

impl SinkOptions {
    /// 位置参数约定：`(capacity, growth_factor)`。
    pub fn positional(capacity: usize, growth_factor: Option<f64>) -> Self {
        Self {
            capacity: Some(capacity),
            growth_factor,
            growth_increment: None,
        }
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn growth_factor(mut self, factor: f64) -> Self {
        self.growth_factor = Some(factor);
        self
    }

    pub fn growth_increment(mut self, increment: usize) -> Self {
        self.growth_increment = Some(increment);
        self
    }

    /// 从任意 serde 反序列化器解析并校验。
    pub fn from_deserializer<'de, D>(deserializer: D) -> Result<SinkConfig, ConfigError>
    where
        D: Deserializer<'de>,
    {
        Self::deserialize(deserializer)
            .map_err(ConfigError::malformed)?
            .validate()
    }

    pub fn validate(&self) -> Result<SinkConfig, ConfigError> {
        let policy = match (self.growth_factor, self.growth_increment) {
            (Some(factor), Some(increment)) => {
                return Err(ConfigError::ConflictingGrowthPolicy { factor, increment });
            }
            (Some(factor), None) => GrowthPolicy::factor(factor)?,
            (None, Some(increment)) => GrowthPolicy::increment(increment)?,
            (None, None) => GrowthPolicy::default(),
        };
        Ok(SinkConfig {
            capacity: self.capacity.unwrap_or(DEFAULT_CAPACITY),
            policy,
        })
    }

    pub fn build(&self) -> Result<BufferedSink, ConfigError> {
        self.validate().map(SinkConfig::build)
    }
}

/// 区间配置记录，缺省为 `[0, ∞)`；直通过滤器与缓冲读取器共用。
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RangeOptions {
    pub start: Option<usize>,
    pub end: Option<usize>,
}

impl RangeOptions {
    pub fn new(start: Option<usize>, end: Option<usize>) -> Self {
        Self { start, end }
    }

    pub fn from_deserializer<'de, D>(deserializer: D) -> Result<ByteRange, ConfigError>
    where
        D: Deserializer<'de>,
    {
        Self::deserialize(deserializer)
            .map_err(ConfigError::malformed)?
            .validate()
    }

    pub fn validate(&self) -> Result<ByteRange, ConfigError> {
        ByteRange::new(self.start.unwrap_or(0), self.end)
    }
}

impl TryFrom<RangeOptions> for ByteRange {
    type Error = ConfigError;

    fn try_from(options: RangeOptions) -> Result<Self, Self::Error> {
        options.validate()
    }
}

/// 以上游流构造内联直通过滤器。
///
/// `range` 接受 `(start, end)` 元组、`start..end`、[`RangeOptions`] 或已校验的 [`ByteRange`]。
pub fn direct_filter<S, R>(source: S, range: R) -> Result<DirectFilter<S>, ConfigError>
where
    R: TryInto<ByteRange>,
    ConfigError: From<R::Error>,
{
    let range = range.try_into()?;
    Ok(DirectFilter::over(source, range))
}

/// 构造不绑定上游的直通过滤器，返回写入端与读取端。
pub fn direct_channel<R>(range: R) -> Result<(FilterWriter, FilterReader), ConfigError>
where
    R: TryInto<ByteRange>,
    ConfigError: From<R::Error>,
{
    let range = range.try_into()?;
    Ok(filter::channel(range))
}
