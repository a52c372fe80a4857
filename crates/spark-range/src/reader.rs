use alloc::sync::Arc;
use core::{
    pin::Pin,
    task::{Context, Poll, Waker},
};

use bytes::Bytes;
use futures::{Stream, stream::FusedStream};

use crate::{
    error::ConfigError,
    range::ByteRange,
    sink::{ReaderId, SinkShared},
};

/// 读取器生命周期：`Idle → Draining ⇄ WaitingForWrites → Complete`。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReaderState {
    /// 尚未被拉取，不持有订阅。
    Idle,
    /// 已订阅，正在回放已提交字节。
    Draining,
    /// 已追上写游标，等待下一次写入或结束信号。
    WaitingForWrites,
    /// 已完成，订阅已释放。
    Complete,
}

/// 读取器的结束方式。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Termination {
    /// 完整交付到区间上界。
    Reached,
    /// 源在上界之前结束，只交付了可用字节；无上界区间总以此结束。
    Truncated,
    /// 调用方显式取消或丢弃了读取器。
    Cancelled,
}

/// 读取器完成后的交付摘要。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RangeOutcome {
    pub delivered: usize,
    pub termination: Termination,
}

impl RangeOutcome {
    /// 源在区间上界之前结束。
    pub fn is_truncated(&self) -> bool {
        self.termination == Termination::Truncated
    }
}

/// 同步拉取的结果。
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Pull {
    /// 一段按序、无缝衔接的新数据。
    Data(Bytes),
    /// 暂无新数据，需等待写入或结束。
    Pending,
    /// 已完成，不会再产生数据。
    Complete(RangeOutcome),
}

/// `RangeReader` 在 [`BufferedSink`](crate::BufferedSink) 上以独立游标回放 `[start, end)`。
///
/// # 教案式说明
/// - **意图 (Why)**：同一 Sink 上的多个读取器互不干扰，各自以自己的节奏消费，
///   并且无论创建于数据到达之前还是之后，都能拿到完整、有序的区间内容。
/// - **逻辑 (How)**：每次推进（drain step）加锁读取写游标 `w` 与读游标 `c`：
///   1. `c < min(w, end)`：复制 `[c, min(w, end))` 交付并推进 `c`，若到达 `end` 则完成；
///   2. `c >= end`：完成；
///   3. Sink 已结束：以截断方式完成；
///   4. 否则登记 waker，进入 `WaitingForWrites`。
///
///   每一步都从共享状态重新取缓冲，不跨挂起点持有任何存储引用，扩容不会使读取器失效。
/// - **契约 (What)**：
///   - `[start, min(最终 w, end))` 内每个字节恰好交付一次，按序且无缺口；
///   - 完成（到达、截断或取消）时立即释放 Sink 上的订阅；`Drop` 等价于取消。
pub struct RangeReader {
    shared: Arc<SinkShared>,
    range: ByteRange,
    cursor: Option<usize>,
    state: ReaderState,
    subscription: Option<ReaderId>,
    outcome: Option<RangeOutcome>,
}

impl RangeReader {
    pub(crate) fn new(shared: Arc<SinkShared>, range: ByteRange) -> Self {
        Self {
            shared,
            range,
            cursor: None,
            state: ReaderState::Idle,
            subscription: None,
            outcome: None,
        }
    }

    /// 当前绑定的区间，首次拉取后不再变化。
    pub fn range(&self) -> ByteRange {
        self.range
    }

    /// 生命周期状态。
    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// 读游标，首次拉取前为 `None`。
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// 已交付的字节数。
    pub fn delivered(&self) -> usize {
        self.cursor
            .map_or(0, |cursor| cursor.saturating_sub(self.range.start()))
    }

    /// 完成后的摘要，未完成时为 `None`。
    pub fn outcome(&self) -> Option<RangeOutcome> {
        self.outcome
    }

    /// 调整起点，仅在首次拉取前有效。
    pub fn from(mut self, start: usize) -> Result<Self, ConfigError> {
        self.ensure_idle()?;
        self.range = self.range.with_start(start)?;
        Ok(self)
    }

    /// 调整上界，仅在首次拉取前有效。
    pub fn to(mut self, end: usize) -> Result<Self, ConfigError> {
        self.ensure_idle()?;
        self.range = self.range.with_end(end)?;
        Ok(self)
    }

    fn ensure_idle(&self) -> Result<(), ConfigError> {
        match self.state {
            ReaderState::Idle => Ok(()),
            _ => Err(ConfigError::ReaderStarted),
        }
    }

    /// 不登记 waker 的单步推进，供自带事件循环的调用方使用。
    pub fn try_pull(&mut self) -> Pull {
        self.drain(None)
    }

    /// 取消读取并立即释放订阅；已完成时为空操作。
    pub fn cancel(&mut self) {
        if self.state == ReaderState::Complete {
            return;
        }
        if let Some(id) = self.subscription.take() {
            self.shared.state.lock().unsubscribe(id);
        }
        tracing::debug!(range = %self.range, delivered = self.delivered(), "range reader cancelled");
        self.settle(Termination::Cancelled);
    }

    fn settle(&mut self, termination: Termination) -> RangeOutcome {
        let outcome = RangeOutcome {
            delivered: self.delivered(),
            termination,
        };
        self.state = ReaderState::Complete;
        self.outcome = Some(outcome);
        outcome
    }

    fn drain(&mut self, waker: Option<&Waker>) -> Pull {
        if let Some(outcome) = self.outcome {
            return Pull::Complete(outcome);
        }

        let shared = Arc::clone(&self.shared);
        let mut state = shared.state.lock();

        let id = match self.subscription {
            Some(id) => id,
            None => {
                let id = state.subscribe();
                self.subscription = Some(id);
                self.cursor = Some(self.range.start());
                id
            }
        };
        self.state = ReaderState::Draining;

        let cursor = self.cursor.unwrap_or(self.range.start());
        let end = self.range.end_bound();
        let available = state.buffer.len().min(end);

        if cursor < available {
            let chunk = state.buffer.copy_range(cursor, available);
            self.cursor = Some(available);
            tracing::trace!(range = %self.range, from = cursor, to = available, "range reader drained");
            if available >= end {
                state.unsubscribe(id);
                self.subscription = None;
                drop(state);
                self.finish_with(Termination::Reached);
            }
            return Pull::Data(chunk);
        }

        let termination = if cursor >= end {
            Termination::Reached
        } else if state.finished {
            Termination::Truncated
        } else {
            state.park(id, waker);
            self.state = ReaderState::WaitingForWrites;
            return Pull::Pending;
        };

        state.unsubscribe(id);
        self.subscription = None;
        drop(state);
        Pull::Complete(self.finish_with(termination))
    }

    fn finish_with(&mut self, termination: Termination) -> RangeOutcome {
        let outcome = self.settle(termination);
        tracing::debug!(
            range = %self.range,
            delivered = outcome.delivered,
            ?termination,
            "range reader complete"
        );
        outcome
    }
}

impl Drop for RangeReader {
    fn drop(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.shared.state.lock().unsubscribe(id);
        }
    }
}

impl core::fmt::Debug for RangeReader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RangeReader")
            .field("range", &self.range)
            .field("cursor", &self.cursor)
            .field("state", &self.state)
            .field("outcome", &self.outcome)
            .finish()
    }
}

impl Stream for RangeReader {
    type Item = Bytes;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.get_mut().drain(Some(cx.waker())) {
            Pull::Data(chunk) => Poll::Ready(Some(chunk)),
            Pull::Pending => Poll::Pending,
            Pull::Complete(_) => Poll::Ready(None),
        }
    }
}

impl FusedStream for RangeReader {
    fn is_terminated(&self) -> bool {
        self.state == ReaderState::Complete
    }
}
