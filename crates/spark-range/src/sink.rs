use alloc::{collections::BTreeMap, sync::Arc, vec::Vec};
use core::{
    pin::Pin,
    task::{Context, Poll, Waker},
};

use bytes::Bytes;
use spark_buffer::{GrowableBuffer, GrowthPolicy};
use spin::Mutex;

use crate::{
    capability::{ChunkConsumer, ChunkSource, pump},
    error::{ConfigError, RangeError},
    options::SinkConfig,
    range::ByteRange,
    reader::RangeReader,
};

/// 订阅表中的读取器标识。
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct ReaderId(u64);

/// Sink 与全部读取器共享的状态。
///
/// 读取器每次推进都重新加锁并直接访问 `buffer`，
/// 因此总能看到扩容后的最新存储，从不缓存旧的存储引用。
pub(crate) struct SinkState {
    pub(crate) buffer: GrowableBuffer,
    pub(crate) finished: bool,
    subscribers: BTreeMap<ReaderId, Option<Waker>>,
    next_id: u64,
}

impl SinkState {
    fn new(config: SinkConfig) -> Self {
        Self {
            buffer: GrowableBuffer::new(config.capacity, config.policy),
            finished: false,
            subscribers: BTreeMap::new(),
            next_id: 0,
        }
    }

    pub(crate) fn subscribe(&mut self) -> ReaderId {
        let id = ReaderId(self.next_id);
        self.next_id += 1;
        self.subscribers.insert(id, None);
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: ReaderId) {
        self.subscribers.remove(&id);
    }

    /// 登记等待中的读取器；同一读取器的旧 waker 被覆盖，`None` 表示同步拉取，不登记。
    pub(crate) fn park(&mut self, id: ReaderId, waker: Option<&Waker>) {
        let (Some(slot), Some(waker)) = (self.subscribers.get_mut(&id), waker) else {
            return;
        };
        let stale = slot
            .as_ref()
            .is_none_or(|current| !current.will_wake(waker));
        if stale {
            *slot = Some(waker.clone());
        }
    }

    /// 取出所有等待中的 waker，调用方需在释放锁之后再唤醒。
    fn take_wakers(&mut self) -> Vec<Waker> {
        self.subscribers
            .values_mut()
            .filter_map(Option::take)
            .collect()
    }
}

pub(crate) struct SinkShared {
    pub(crate) state: Mutex<SinkState>,
}

/// `BufferedSink` 是缓冲模式的写入端：完整保留写入的字节，供任意多个区间读取器回放。
///
/// # 设计动机（Why）
/// - 同一条字节流常常需要被多个消费者按不同区间、不同节奏读取，
///   且读取器可能在数据到达之前或之后才创建；
/// - 生产者独占写入，读取器只读，二者通过共享状态与订阅表解耦。
///
/// # 架构关系（How）
/// - `shared` 通过 `Arc` 与读取器共享；状态由 `spin::Mutex` 保护，锁内只做内存拷贝；
/// - 写入：按需扩容 → 追加 → 推进写游标 → 释放锁后唤醒所有等待中的读取器；
/// - 结束：标记 `finished` 并唤醒全部读取器，未达上界的读取器随后以截断方式完成。
///
/// # 契约说明（What）
/// - **所有权**：本类型不可克隆，唯一持有者即唯一生产者；
/// - **结束后写入**：返回 [`RangeError::SinkFinished`]，不提交任何字节；重复结束为空操作；
/// - **Drop**：若尚未结束则自动结束，避免读取器永久挂起。
pub struct BufferedSink {
    shared: Arc<SinkShared>,
}

impl BufferedSink {
    /// 默认容量 1024、2 倍增长。
    pub fn new() -> Self {
        Self::with_config(SinkConfig::default())
    }

    /// 以已校验的配置创建。
    pub fn with_config(config: SinkConfig) -> Self {
        tracing::trace!(capacity = config.capacity, policy = ?config.policy, "buffered sink created");
        Self {
            shared: Arc::new(SinkShared {
                state: Mutex::new(SinkState::new(config)),
            }),
        }
    }

    /// 指定初始容量与增长策略。
    pub fn with_capacity(capacity: usize, policy: GrowthPolicy) -> Self {
        Self::with_config(SinkConfig { capacity, policy })
    }

    /// 追加一块数据并通知读取器。
    pub fn write(&mut self, chunk: &[u8]) -> Result<(), RangeError> {
        let wakers = {
            let mut state = self.shared.state.lock();
            if state.finished {
                tracing::warn!(rejected = chunk.len(), "write after finish rejected");
                return Err(RangeError::SinkFinished {
                    rejected: chunk.len(),
                });
            }
            if chunk.is_empty() {
                return Ok(());
            }
            let written = state.buffer.append(chunk);
            tracing::trace!(len = chunk.len(), written, "chunk committed");
            state.take_wakers()
        };
        wakers.into_iter().for_each(Waker::wake);
        Ok(())
    }

    /// 标记输入结束并唤醒全部读取器，重复调用为空操作。
    pub fn finish(&mut self) {
        let wakers = {
            let mut state = self.shared.state.lock();
            if state.finished {
                return;
            }
            state.finished = true;
            tracing::debug!(
                written = state.buffer.len(),
                capacity = state.buffer.capacity(),
                readers = state.subscribers.len(),
                "buffered sink finished"
            );
            state.take_wakers()
        };
        wakers.into_iter().for_each(Waker::wake);
    }

    /// 将 `source` 全部写入后结束，返回写入的字节数。
    pub async fn feed<S>(&mut self, source: S) -> Result<usize, RangeError>
    where
        S: ChunkSource,
    {
        pump(source, self).await
    }

    /// 绑定 `[start, end)` 的读取器；无上界区间使用 [`from`](Self::from) 或 [`reader`](Self::reader)。
    pub fn range(&self, start: usize, end: usize) -> Result<RangeReader, ConfigError> {
        ByteRange::new(start, Some(end)).map(|range| self.reader(range))
    }

    /// `[start, ∞)`。
    pub fn from(&self, start: usize) -> RangeReader {
        self.reader(ByteRange::starting_at(start))
    }

    /// `[0, end)`。
    pub fn to(&self, end: usize) -> RangeReader {
        self.reader(ByteRange::ending_at(end))
    }

    /// 以已校验的区间创建读取器；读取器在首次拉取前不订阅、不做任何工作。
    pub fn reader(&self, range: ByteRange) -> RangeReader {
        RangeReader::new(Arc::clone(&self.shared), range)
    }

    /// 写游标：已提交的字节总数。
    pub fn written(&self) -> usize {
        self.shared.state.lock().buffer.len()
    }

    /// 底层缓冲的当前容量。
    pub fn capacity(&self) -> usize {
        self.shared.state.lock().buffer.capacity()
    }

    /// 是否已收到结束信号。
    pub fn is_finished(&self) -> bool {
        self.shared.state.lock().finished
    }

    /// 当前仍持有订阅的读取器数量。
    pub fn subscriber_count(&self) -> usize {
        self.shared.state.lock().subscribers.len()
    }
}

impl Default for BufferedSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BufferedSink {
    fn drop(&mut self) {
        self.finish();
    }
}

impl core::fmt::Debug for BufferedSink {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("BufferedSink")
            .field("buffer", &state.buffer)
            .field("finished", &state.finished)
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}

impl ChunkConsumer for BufferedSink {
    type Error = RangeError;

    fn consume(&mut self, chunk: Bytes) -> Result<(), Self::Error> {
        self.write(&chunk)
    }

    fn complete(&mut self) {
        self.finish();
    }
}

impl futures::Sink<Bytes> for BufferedSink {
    type Error = RangeError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        if self.is_finished() {
            Poll::Ready(Err(RangeError::SinkFinished { rejected: 0 }))
        } else {
            Poll::Ready(Ok(()))
        }
    }

    fn start_send(self: Pin<&mut Self>, item: Bytes) -> Result<(), Self::Error> {
        self.get_mut().write(&item)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.get_mut().finish();
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_write_keeps_cursor_and_succeeds() {
        let mut sink = BufferedSink::new();
        sink.write(b"").expect("空块合法");
        assert_eq!(sink.written(), 0);
    }

    #[test]
    fn park_overwrites_stale_waker() {
        let mut state = SinkState::new(SinkConfig::default());
        let id = state.subscribe();
        state.park(id, Some(futures::task::noop_waker_ref()));
        assert_eq!(state.take_wakers().len(), 1);
        assert!(state.take_wakers().is_empty(), "唤醒后需重新登记");
        state.park(id, None);
        assert!(state.take_wakers().is_empty(), "同步拉取不登记 waker");
        state.unsubscribe(id);
        state.park(id, Some(futures::task::noop_waker_ref()));
        assert!(state.take_wakers().is_empty(), "已退订的读取器不应被登记");
    }
}
