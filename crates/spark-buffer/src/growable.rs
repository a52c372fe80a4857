use core::fmt;

use bytes::{Bytes, BytesMut};

use crate::policy::GrowthPolicy;

/// `GrowableBuffer` 是只追加、可重新分配的字节缓冲。
///
/// # 设计动机（Why）
/// - 区间读取需要随时回放任意已写入的前缀，因此缓冲必须完整保留所有已提交字节，
///   且在写入量超过初始容量时按策略扩容。
/// - 扩容节奏需要可观测、可预测：容量由 [`GrowthPolicy`] 显式计算，
///   不依赖 `BytesMut` 内部的倍增启发式。
///
/// # 架构关系（How）
/// - `storage` 的长度即已提交字节数（写游标），`capacity` 记录逻辑容量；
/// - 扩容时分配新的 `BytesMut`，复制已提交前缀后整体替换旧存储，
///   替换发生在 `&mut self` 之内，持有者只能看到扩容前或扩容后的完整状态；
/// - 读取一律通过 [`copy_range`](Self::copy_range) 复制出独立的 [`Bytes`]，
///   调用方拿到的切片不会随后续扩容失效，也不会暴露未初始化内存。
///
/// # 契约说明（What）
/// - **不变量**：`len() <= capacity()`；`[0, len())` 内每个字节都已提交；
/// - **后置条件**：任一次扩容后 `capacity()` 不小于触发扩容的最小需求。
pub struct GrowableBuffer {
    storage: BytesMut,
    capacity: usize,
    policy: GrowthPolicy,
    growths: usize,
}

impl GrowableBuffer {
    /// 以给定初始容量与增长策略创建空缓冲。
    pub fn new(capacity: usize, policy: GrowthPolicy) -> Self {
        Self {
            storage: BytesMut::with_capacity(capacity),
            capacity,
            policy,
            growths: 0,
        }
    }

    /// 已提交字节数。
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// 尚未提交任何字节。
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// 当前逻辑容量。
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 创建时指定的增长策略。
    pub fn policy(&self) -> GrowthPolicy {
        self.policy
    }

    /// 自创建以来发生的扩容次数。
    pub fn growth_count(&self) -> usize {
        self.growths
    }

    /// 已提交前缀的只读视图，借用期间无法扩容。
    pub fn committed(&self) -> &[u8] {
        &self.storage
    }

    /// 复制 `[start, end)` 为独立的 [`Bytes`]。
    ///
    /// 越过已提交区域的部分会被截断到 `len()`，`start > end` 时返回空切片。
    pub fn copy_range(&self, start: usize, end: usize) -> Bytes {
        let end = end.min(self.storage.len());
        let start = start.min(end);
        Bytes::copy_from_slice(&self.storage[start..end])
    }

    /// 扩容到至少 `min_required` 字节。
    ///
    /// # 教案式说明
    /// - **执行 (How)**：
    ///   1. 由策略计算新容量；
    ///   2. 分配新存储并复制已提交前缀；
    ///   3. 整体替换旧存储并刷新容量统计。
    /// - **契约 (What)**：`min_required <= capacity()` 时不做任何事；
    ///   已提交内容与长度在扩容前后完全一致。
    pub fn grow(&mut self, min_required: usize) {
        if min_required <= self.capacity {
            return;
        }
        let next = self.policy.next_capacity(self.capacity, min_required);
        let mut fresh = BytesMut::with_capacity(next);
        fresh.extend_from_slice(&self.storage);
        self.storage = fresh;
        let previous = core::mem::replace(&mut self.capacity, next);
        self.growths += 1;
        tracing::debug!(
            previous,
            capacity = next,
            committed = self.storage.len(),
            "growable buffer reallocated"
        );
    }

    /// 追加 `chunk`，容量不足时先按策略扩容，返回追加后的已提交长度。
    pub fn append(&mut self, chunk: &[u8]) -> usize {
        let required = self.storage.len().saturating_add(chunk.len());
        if required > self.capacity {
            self.grow(required);
        }
        self.storage.extend_from_slice(chunk);
        self.storage.len()
    }
}

impl Default for GrowableBuffer {
    fn default() -> Self {
        Self::new(0, GrowthPolicy::default())
    }
}

impl fmt::Debug for GrowableBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrowableBuffer")
            .field("len", &self.storage.len())
            .field("capacity", &self.capacity)
            .field("policy", &self.policy)
            .field("growths", &self.growths)
            .finish()
    }
}
