use alloc::{collections::VecDeque, sync::Arc};
use core::{
    pin::Pin,
    task::{Context, Poll, Waker},
};

use bytes::Bytes;
use futures::{Stream, stream::FusedStream};
use spin::Mutex;

use crate::{capability::ChunkConsumer, error::RangeError, range::ByteRange};

/// 单块裁剪的结果。
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Trimmed {
    /// 与区间无交集，整块丢弃。
    Skip,
    /// 区间内的部分，之后可能还有数据。
    Emit(Bytes),
    /// 区间内的最后一段，之后不会再有输出。
    Final(Bytes),
    /// 区间已交付完毕，本块被忽略。
    Done,
}

/// `RangeTrim` 是直通模式的纯状态机：只记录已经过的字节数，从不保留数据。
///
/// # 教案式说明
/// - **意图 (Why)**：直通过滤器与其写入/读取两端共享同一裁剪逻辑，
///   抽成无 I/O 的结构便于单独验证边界。
/// - **逻辑 (How)**：块 `[seen, seen + L)` 与区间求交，非空时借助 `Bytes::slice`
///   零拷贝截取；交集上沿触及 `end` 即进入完成态。无论是否输出，`seen` 都前移 `L`。
/// - **契约 (What)**：输出按序、无缺口，且只包含区间内字节；空区间在构造时即完成。
#[derive(Clone, Debug)]
pub struct RangeTrim {
    range: ByteRange,
    seen: usize,
    done: bool,
}

impl RangeTrim {
    /// 空区间在构造时即处于完成态。
    pub fn new(range: ByteRange) -> Self {
        Self {
            range,
            seen: 0,
            done: range.is_empty(),
        }
    }

    /// 裁剪区间。
    pub fn range(&self) -> ByteRange {
        self.range
    }

    /// 已经过的字节总数（包括被丢弃的）。
    pub fn seen(&self) -> usize {
        self.seen
    }

    /// 区间是否已交付完毕。
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// 处理下一块输入，返回其中落在区间内的部分。
    pub fn push(&mut self, chunk: Bytes) -> Trimmed {
        let offset = self.seen;
        self.seen = offset.saturating_add(chunk.len());
        if self.done {
            return Trimmed::Done;
        }
        let Some(window) = self.range.overlap(offset, chunk.len()) else {
            return Trimmed::Skip;
        };
        let reaches_end = self.range.end() == Some(offset + window.end);
        let piece = if window.start == 0 && window.end == chunk.len() {
            chunk
        } else {
            chunk.slice(window)
        };
        if reaches_end {
            self.done = true;
            Trimmed::Final(piece)
        } else {
            Trimmed::Emit(piece)
        }
    }
}

/// `DirectFilter` 以内联方式包装上游流，只放行区间内的字节。
///
/// - 区间上界到达后立即丢弃上游（分离），上游可借此提前停止生产；
/// - 上游在上界之前结束视为静默截断，照常结束输出；
/// - 要求上游为 `Unpin`，非 `Unpin` 的流可先 `Box::pin`。
pub struct DirectFilter<S> {
    source: Option<S>,
    trim: RangeTrim,
}

impl<S> DirectFilter<S> {
    /// 包装上游；区间为空时立即丢弃上游。
    pub fn over(source: S, range: ByteRange) -> Self {
        let trim = RangeTrim::new(range);
        let source = (!trim.is_done()).then_some(source);
        Self { source, trim }
    }

    /// 裁剪区间。
    pub fn range(&self) -> ByteRange {
        self.trim.range()
    }

    /// 已经过的字节总数（包括被丢弃的）。
    pub fn seen(&self) -> usize {
        self.trim.seen()
    }

    /// 上游是否已被释放。
    pub fn is_detached(&self) -> bool {
        self.source.is_none()
    }

    fn detach(&mut self) {
        if self.source.take().is_some() {
            tracing::debug!(range = %self.trim.range(), seen = self.trim.seen(), "direct filter detached from source");
        }
    }
}

impl<S> Stream for DirectFilter<S>
where
    S: Stream<Item = Bytes> + Unpin,
{
    type Item = Bytes;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            let Some(source) = this.source.as_mut() else {
                return Poll::Ready(None);
            };
            let chunk = match Pin::new(source).poll_next(cx) {
                Poll::Ready(Some(chunk)) => chunk,
                Poll::Ready(None) => {
                    tracing::debug!(range = %this.trim.range(), seen = this.trim.seen(), "source ended before range end");
                    this.source = None;
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            };
            match this.trim.push(chunk) {
                Trimmed::Skip | Trimmed::Done => continue,
                Trimmed::Emit(piece) => return Poll::Ready(Some(piece)),
                Trimmed::Final(piece) => {
                    this.detach();
                    return Poll::Ready(Some(piece));
                }
            }
        }
    }
}

impl<S> FusedStream for DirectFilter<S>
where
    S: Stream<Item = Bytes> + Unpin,
{
    fn is_terminated(&self) -> bool {
        self.source.is_none()
    }
}

#[derive(Default)]
struct ChannelState {
    queue: VecDeque<Bytes>,
    closed: bool,
    reader_gone: bool,
    waker: Option<Waker>,
}

/// 创建独立的直通过滤器：写入端接收整条流，读取端只产出区间内的字节。
///
/// 队列中只保存裁剪后的区间内数据；区间完成、写入端结束或被丢弃都会关闭读取端。
pub fn channel(range: ByteRange) -> (FilterWriter, FilterReader) {
    let trim = RangeTrim::new(range);
    let shared = Arc::new(Mutex::new(ChannelState {
        closed: trim.is_done(),
        ..ChannelState::default()
    }));
    (
        FilterWriter {
            shared: Arc::clone(&shared),
            trim,
        },
        FilterReader { shared },
    )
}

/// 直通过滤器的写入端。
pub struct FilterWriter {
    shared: Arc<Mutex<ChannelState>>,
    trim: RangeTrim,
}

impl FilterWriter {
    /// 写入一块数据；分离或结束之后的写入被静默丢弃，读取端不会因此重新产出数据。
    pub fn write(&mut self, chunk: Bytes) {
        let (piece, last) = match self.trim.push(chunk) {
            Trimmed::Skip | Trimmed::Done => return,
            Trimmed::Emit(piece) => (piece, false),
            Trimmed::Final(piece) => (piece, true),
        };
        let waker = {
            let mut state = self.shared.lock();
            if state.reader_gone || state.closed {
                return;
            }
            state.queue.push_back(piece);
            if last {
                state.closed = true;
                tracing::debug!(range = %self.trim.range(), seen = self.trim.seen(), "direct filter range complete");
            }
            state.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// 结束输入；未到达上界时读取端以截断方式结束。
    pub fn finish(&mut self) {
        let waker = {
            let mut state = self.shared.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            tracing::debug!(range = %self.trim.range(), seen = self.trim.seen(), "direct filter input ended");
            state.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// 裁剪区间。
    pub fn range(&self) -> ByteRange {
        self.trim.range()
    }

    /// 已经过的字节总数（包括被丢弃的）。
    pub fn seen(&self) -> usize {
        self.trim.seen()
    }

    /// 区间已交付完毕、输入已结束或读取端已丢弃，继续生产没有意义。
    pub fn is_detached(&self) -> bool {
        if self.trim.is_done() {
            return true;
        }
        let state = self.shared.lock();
        state.closed || state.reader_gone
    }
}

impl Drop for FilterWriter {
    fn drop(&mut self) {
        self.finish();
    }
}

impl ChunkConsumer for FilterWriter {
    type Error = RangeError;

    fn consume(&mut self, chunk: Bytes) -> Result<(), Self::Error> {
        self.write(chunk);
        Ok(())
    }

    fn complete(&mut self) {
        self.finish();
    }

    fn is_detached(&self) -> bool {
        FilterWriter::is_detached(self)
    }
}

impl futures::Sink<Bytes> for FilterWriter {
    type Error = RangeError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: Bytes) -> Result<(), Self::Error> {
        self.get_mut().write(item);
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.get_mut().finish();
        Poll::Ready(Ok(()))
    }
}

/// 直通过滤器的读取端。
pub struct FilterReader {
    shared: Arc<Mutex<ChannelState>>,
}

impl Drop for FilterReader {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.reader_gone = true;
        state.queue.clear();
    }
}

impl Stream for FilterReader {
    type Item = Bytes;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut state = self.shared.lock();
        if let Some(chunk) = state.queue.pop_front() {
            return Poll::Ready(Some(chunk));
        }
        if state.closed {
            return Poll::Ready(None);
        }
        state.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl FusedStream for FilterReader {
    fn is_terminated(&self) -> bool {
        let state = self.shared.lock();
        state.closed && state.queue.is_empty()
    }
}
