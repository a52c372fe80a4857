use alloc::vec::Vec;

use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};

/// 写入端能力：逐块接收字节并在输入结束时收到一次完成信号。
///
/// # 教案式说明
/// - **意图 (Why)**：缓冲 Sink 与直通过滤器的写入端语义相同（追加、结束），
///   核心逻辑只依赖该能力而非具体类型，生产者因此可以在二者之间自由切换。
/// - **契约 (What)**：
///   - `consume` 按到达顺序调用，空块合法；
///   - `complete` 表示输入结束，实现应保证幂等；
///   - `is_detached` 返回 `true` 时，生产者可以提前停止生产，后续写入不会再产生任何输出。
pub trait ChunkConsumer {
    type Error;

    fn consume(&mut self, chunk: Bytes) -> Result<(), Self::Error>;

    fn complete(&mut self);

    fn is_detached(&self) -> bool {
        false
    }
}

/// 读取端能力：惰性、单遍、不可重启的字节块序列。
///
/// 任意 `Stream<Item = Bytes>` 都自动具备该能力。
pub trait ChunkSource: Stream<Item = Bytes> {}

impl<S> ChunkSource for S where S: Stream<Item = Bytes> + ?Sized {}

/// 将 `source` 全部泵入 `consumer`，结束后发送完成信号。
///
/// - 返回实际交给 `consumer` 的字节数；
/// - `consumer` 进入分离状态时立即停止拉取上游，并丢弃上游；
/// - `consume` 出错时直接返回错误，不发送完成信号。
pub async fn pump<S, C>(source: S, consumer: &mut C) -> Result<usize, C::Error>
where
    S: ChunkSource,
    C: ChunkConsumer + ?Sized,
{
    pin_mut!(source);
    let mut forwarded = 0usize;
    while !consumer.is_detached() {
        let Some(chunk) = source.next().await else {
            break;
        };
        forwarded += chunk.len();
        consumer.consume(chunk)?;
    }
    consumer.complete();
    tracing::trace!(forwarded, detached = consumer.is_detached(), "pump finished");
    Ok(forwarded)
}

/// 将字节块序列拼接为连续的 `Vec<u8>`。
pub async fn collect_bytes<S>(source: S) -> Vec<u8>
where
    S: ChunkSource,
{
    source
        .fold(Vec::new(), |mut acc, chunk| async move {
            acc.extend_from_slice(&chunk);
            acc
        })
        .await
}
