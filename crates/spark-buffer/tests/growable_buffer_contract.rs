//! `growable_buffer_contract` 集成测试：聚焦 `GrowableBuffer` 的扩容与前缀保留契约。
//!
//! # 测试总览（Why）
//! - 校验两种增长策略的容量计算与“惰性扩容”时机；
//! - 确认扩容前后已提交前缀逐字节一致；
//! - 以 proptest 覆盖任意分块写入序列，防止边界处的丢字节或重复。

use proptest::prelude::*;
use spark_buffer::{GrowableBuffer, GrowthPolicy};

/// 恰好写满容量时不扩容，多写一个字节才触发。
#[test]
fn growth_is_lazy_and_triggered_by_overflowing_write() {
    let mut buffer = GrowableBuffer::new(4, GrowthPolicy::default());
    buffer.append(b"abcd");
    assert_eq!(buffer.capacity(), 4, "写满容量不应提前扩容");
    assert_eq!(buffer.growth_count(), 0);

    buffer.append(b"e");
    assert_eq!(buffer.capacity(), 8, "默认策略按 2 倍扩容");
    assert_eq!(buffer.growth_count(), 1);
    assert_eq!(buffer.committed(), b"abcde");
}

/// 加性增长：超大写入直接扩到最小需求。
#[test]
fn increment_policy_jumps_to_requirement_for_large_writes() {
    let policy = GrowthPolicy::increment(50).expect("增量合法");
    let mut buffer = GrowableBuffer::new(10, policy);
    buffer.append(&[7u8; 11]);
    assert_eq!(buffer.capacity(), 60);

    buffer.append(&[9u8; 200]);
    assert_eq!(buffer.capacity(), 211, "增量不足时取最小需求");
    assert_eq!(buffer.len(), 211);
}

/// 零容量起步也能正确写入。
#[test]
fn zero_capacity_buffer_accepts_writes() {
    let mut buffer = GrowableBuffer::new(0, GrowthPolicy::default());
    assert!(buffer.is_empty());
    buffer.append(b"hello");
    assert_eq!(buffer.capacity(), 5);
    assert_eq!(buffer.copy_range(0, 5).as_ref(), b"hello");
}

/// 显式 `grow` 在需求不超过当前容量时为空操作。
#[test]
fn explicit_grow_below_capacity_is_noop() {
    let mut buffer = GrowableBuffer::new(32, GrowthPolicy::default());
    buffer.grow(16);
    assert_eq!(buffer.capacity(), 32);
    assert_eq!(buffer.growth_count(), 0);
}

fn policy_strategy() -> impl Strategy<Value = GrowthPolicy> {
    prop_oneof![
        (1.01f64..4.0).prop_map(|f| GrowthPolicy::factor(f).expect("区间内的因子合法")),
        (1usize..64).prop_map(|n| GrowthPolicy::increment(n).expect("非零增量")),
    ]
}

proptest! {
    /// 任意分块写入后，已提交内容等于输入拼接，且容量覆盖总长度。
    #[test]
    fn committed_prefix_matches_concatenated_input(
        capacity in 0usize..64,
        policy in policy_strategy(),
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..40), 0..20),
    ) {
        let mut buffer = GrowableBuffer::new(capacity, policy);
        let mut expected = Vec::new();
        for chunk in &chunks {
            buffer.append(chunk);
            expected.extend_from_slice(chunk);
            prop_assert!(buffer.capacity() >= buffer.len());
        }
        prop_assert_eq!(buffer.committed(), expected.as_slice());
        prop_assert!(buffer.capacity() >= expected.len());
    }
}
