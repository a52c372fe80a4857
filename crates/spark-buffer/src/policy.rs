use core::num::NonZeroUsize;

use thiserror::Error;

/// 默认的乘性增长因子。
pub const DEFAULT_GROWTH_FACTOR: f64 = 2.0;

/// 单次分配允许的最大容量，与 `Vec`/`BytesMut` 的分配上限一致。
pub const MAX_CAPACITY: usize = isize::MAX as usize;

/// `GrowthPolicy` 描述缓冲在容量不足时的扩容规则。
///
/// # 教案式说明
/// - **意图 (Why)**：写入方无法预知流的总长度，扩容规则必须可配置：
///   乘性增长摊薄大流量场景下的复制成本，加性增长则让内存占用更可预测。
/// - **逻辑 (How)**：两种规则互斥，由枚举在类型层面保证“只有一个生效”；
///   [`next_capacity`](Self::next_capacity) 统一计算下一次的容量并与最小需求取最大值。
/// - **契约 (What)**：
///   - `Factor(f)`：`f` 必须有限且严格大于 1，只能通过 [`GrowthPolicy::factor`] 构造时校验；
///   - `Increment(n)`：`n` 非零，由 [`NonZeroUsize`] 保证；
///   - **后置条件**：`next_capacity(current, min) >= min` 恒成立。
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GrowthPolicy {
    /// 新容量 = `ceil(current * factor)`。
    Factor(f64),
    /// 新容量 = `current + increment`。
    Increment(NonZeroUsize),
}

impl GrowthPolicy {
    /// 构造乘性增长策略，拒绝 `<= 1`、NaN 与无穷大。
    pub fn factor(factor: f64) -> Result<Self, GrowthPolicyError> {
        if factor.is_finite() && factor > 1.0 {
            Ok(Self::Factor(factor))
        } else {
            Err(GrowthPolicyError::InvalidFactor { factor })
        }
    }

    /// 构造加性增长策略，拒绝 0。
    pub fn increment(increment: usize) -> Result<Self, GrowthPolicyError> {
        NonZeroUsize::new(increment)
            .map(Self::Increment)
            .ok_or(GrowthPolicyError::ZeroIncrement)
    }

    /// 计算扩容后的容量。
    ///
    /// - `current`：当前容量；
    /// - `min_required`：本次写入完成后所需的最小容量。
    ///
    /// 乘性增长在 `current == 0` 时不会产生增量，此时结果退化为 `min_required`。
    /// 策略给出的容量不超过 [`MAX_CAPACITY`]，避免浮点饱和或加法溢出后分配失败；
    /// 只有 `min_required` 本身超出上限时结果才会大于它。
    pub fn next_capacity(&self, current: usize, min_required: usize) -> usize {
        let proposed = match *self {
            Self::Factor(factor) => libm::ceil(current as f64 * factor) as usize,
            Self::Increment(step) => current.saturating_add(step.get()),
        };
        proposed.min(MAX_CAPACITY).max(min_required)
    }
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self::Factor(DEFAULT_GROWTH_FACTOR)
    }
}

/// 增长策略的构造错误。
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GrowthPolicyError {
    /// 增长因子不大于 1 或不是有限数。
    #[error("growth factor must be a finite number greater than 1, got {factor}")]
    InvalidFactor { factor: f64 },

    /// 增量为 0，扩容将永远无法推进。
    #[error("growth increment must be greater than 0")]
    ZeroIncrement,
}

impl GrowthPolicyError {
    /// 稳定错误码，供上层映射与告警聚合。
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFactor { .. } => "buffer.growth.invalid_factor",
            Self::ZeroIncrement => "buffer.growth.zero_increment",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factor_rejects_non_growing_values() {
        assert!(GrowthPolicy::factor(1.0).is_err());
        assert!(GrowthPolicy::factor(0.5).is_err());
        assert!(GrowthPolicy::factor(f64::NAN).is_err());
        assert!(GrowthPolicy::factor(f64::INFINITY).is_err());
        assert_eq!(GrowthPolicy::factor(1.5), Ok(GrowthPolicy::Factor(1.5)));
    }

    #[test]
    fn increment_rejects_zero() {
        assert_eq!(
            GrowthPolicy::increment(0),
            Err(GrowthPolicyError::ZeroIncrement)
        );
        assert_eq!(GrowthPolicy::increment(0).unwrap_err().code(), "buffer.growth.zero_increment");
    }

    #[test]
    fn next_capacity_never_undershoots_requirement() {
        let doubling = GrowthPolicy::default();
        assert_eq!(doubling.next_capacity(16, 17), 32);
        assert_eq!(doubling.next_capacity(16, 100), 100);
        assert_eq!(doubling.next_capacity(0, 5), 5);

        let stepping = GrowthPolicy::increment(50).expect("非零增量");
        assert_eq!(stepping.next_capacity(1024, 1025), 1074);
        assert_eq!(stepping.next_capacity(1024, 4096), 4096);

        let fractional = GrowthPolicy::factor(1.5).expect("合法因子");
        assert_eq!(fractional.next_capacity(3, 4), 5);
    }

    #[test]
    fn next_capacity_is_capped_near_allocation_limit() {
        let near_limit = MAX_CAPACITY - 10;
        let doubling = GrowthPolicy::default();
        assert_eq!(doubling.next_capacity(near_limit, near_limit + 1), MAX_CAPACITY);

        let huge_factor = GrowthPolicy::factor(1e300).expect("有限因子");
        assert_eq!(huge_factor.next_capacity(16, 17), MAX_CAPACITY);

        let stepping = GrowthPolicy::increment(usize::MAX).expect("非零增量");
        assert_eq!(stepping.next_capacity(near_limit, near_limit + 1), MAX_CAPACITY);
        assert_eq!(stepping.next_capacity(0, 8), MAX_CAPACITY);
    }
}
