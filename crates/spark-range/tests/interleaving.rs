//! `interleaving` 集成测试：生产者与多个读取器在同一运行时上交错推进。
//!
//! 读取器先于数据启动并挂起，生产者分块写入且块间让出执行权，
//! 验证唤醒链路完整、区间内容不因交错而错位。

use std::{sync::Once, time::Duration};

use bytes::Bytes;
use futures::{StreamExt, stream};
use spark_range::{BufferedSink, RangeOptions, Termination, collect_bytes, direct_filter};
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

/// 以 `RUST_LOG` 控制的测试日志，多次调用只初始化一次。
fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// 两个重叠区间在延迟分块写入下各自得到正确内容。
#[tokio::test]
async fn overlapping_readers_follow_delayed_writes() {
    init_logging();
    let mut sink = BufferedSink::new();
    let low = sink.range(0, 10).expect("合法区间");
    let high = sink.range(5, 15).expect("合法区间");

    let low_task = tokio::spawn(collect_bytes(low));
    let high_task = tokio::spawn(collect_bytes(high));

    let producer = tokio::spawn(async move {
        for chunk in [&b"0123"[..], b"4567", b"89ab", b"cdef", b"ghij"] {
            sink.write(chunk).expect("写入应成功");
            sleep(Duration::from_millis(5)).await;
        }
        sink.finish();
    });

    producer.await.expect("生产者不应 panic");
    assert_eq!(low_task.await.expect("读取任务不应 panic"), b"0123456789");
    assert_eq!(high_task.await.expect("读取任务不应 panic"), b"56789abcde");
}

/// 读取器在生产中途才加入，仍能回放此前已提交的字节。
#[tokio::test]
async fn reader_joining_mid_stream_replays_committed_bytes() {
    init_logging();
    let mut sink = BufferedSink::with_capacity(4, Default::default());
    sink.write(b"abcdef").expect("写入应成功");

    let mut late = sink.from(2);
    let first = late.next().await.expect("已提交的数据立即可读");
    assert_eq!(first, Bytes::from_static(b"cdef"));

    let consumer = tokio::spawn(async move {
        let rest = collect_bytes(&mut late).await;
        (rest, late.outcome())
    });

    sleep(Duration::from_millis(5)).await;
    sink.write(b"ghij").expect("写入应成功");
    sleep(Duration::from_millis(5)).await;
    sink.finish();

    let (rest, outcome) = consumer.await.expect("读取任务不应 panic");
    assert_eq!(rest, b"ghij");
    let outcome = outcome.expect("已完成");
    assert_eq!(outcome.delivered, 8);
    assert_eq!(outcome.termination, Termination::Truncated);
}

/// 有界读取器完成后，生产者继续写入不受影响。
#[tokio::test]
async fn completed_reader_does_not_block_producer() {
    init_logging();
    let mut sink = BufferedSink::new();
    let head = sink.to(3);
    let reader = tokio::spawn(collect_bytes(head));

    sink.write(b"xyz").expect("写入应成功");
    assert_eq!(reader.await.expect("读取任务不应 panic"), b"xyz");
    assert_eq!(sink.subscriber_count(), 0);

    sink.write(b"more").expect("后续写入应成功");
    assert_eq!(sink.written(), 7);
}

/// 直通过滤器包装带延迟的上游，按需拉取并提前释放。
#[tokio::test]
async fn direct_filter_over_delayed_source() {
    init_logging();
    let source = Box::pin(stream::iter(0u8..20).then(|i| async move {
        sleep(Duration::from_millis(1)).await;
        Bytes::from(vec![b'a' + i])
    }));
    let filter = direct_filter(source, RangeOptions::new(Some(3), Some(7))).expect("合法区间");
    assert_eq!(collect_bytes(filter).await, b"defg");
}
