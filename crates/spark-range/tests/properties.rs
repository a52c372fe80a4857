//! 基于 proptest 的性质测试：任意容量、增长策略与分块方式下的区间交付正确性。

use bytes::Bytes;
use futures::{executor::block_on, stream};
use proptest::prelude::*;
use spark_range::{BufferedSink, ByteRange, GrowthPolicy, collect_bytes, direct_filter};

fn policy_strategy() -> impl Strategy<Value = GrowthPolicy> {
    prop_oneof![
        (1.05f64..4.0).prop_map(|f| GrowthPolicy::factor(f).expect("因子大于 1")),
        (1usize..64).prop_map(|n| GrowthPolicy::increment(n).expect("增量非零")),
    ]
}

/// 输入与一组切分点，切分点用于把输入拆成任意大小的块。
fn input_strategy() -> impl Strategy<Value = (Vec<u8>, Vec<usize>)> {
    prop::collection::vec(any::<u8>(), 0..512)
        .prop_flat_map(|data| {
            let len = data.len();
            (Just(data), prop::collection::vec(0..=len, 0..8))
        })
}

fn split(data: &[u8], mut cuts: Vec<usize>) -> Vec<Vec<u8>> {
    cuts.push(0);
    cuts.push(data.len());
    cuts.sort_unstable();
    cuts.dedup();
    cuts.windows(2).map(|w| data[w[0]..w[1]].to_vec()).collect()
}

fn fill(sink: &mut BufferedSink, chunks: &[Vec<u8>]) {
    for chunk in chunks {
        sink.write(chunk).expect("未结束的 Sink 接受写入");
    }
    sink.finish();
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    /// 全区间读取器逐字节重现输入，容量最终覆盖总长度。
    #[test]
    fn full_range_reproduces_input(
        (data, cuts) in input_strategy(),
        capacity in 0usize..64,
        policy in policy_strategy(),
    ) {
        let mut sink = BufferedSink::with_capacity(capacity, policy);
        let mut reader = sink.to(data.len());
        let mut unbounded = sink.from(0);
        fill(&mut sink, &split(&data, cuts));

        prop_assert!(sink.capacity() >= data.len());
        prop_assert_eq!(block_on(collect_bytes(&mut reader)), data.clone());
        let outcome = unbounded.outcome();
        prop_assert!(outcome.is_none(), "首次拉取前不应完成");
        prop_assert_eq!(block_on(collect_bytes(&mut unbounded)).len(), data.len());
        prop_assert!(unbounded.outcome().is_some_and(|o| o.is_truncated()));
    }

    /// 两个区间在交集上看到相同的字节，且各自等于输入的对应切片。
    #[test]
    fn overlapping_ranges_agree(
        (data, cuts) in input_strategy(),
        a in 0usize..600,
        b in 0usize..600,
        c in 0usize..600,
        d in 0usize..600,
    ) {
        let (s1, e1) = (a.min(b), a.max(b));
        let (s2, e2) = (c.min(d), c.max(d));
        let mut sink = BufferedSink::with_capacity(16, GrowthPolicy::default());
        let mut first = sink.range(s1, e1).expect("起点不大于终点");
        let mut second = sink.range(s2, e2).expect("起点不大于终点");
        fill(&mut sink, &split(&data, cuts));

        let out1 = block_on(collect_bytes(&mut first));
        let out2 = block_on(collect_bytes(&mut second));
        let clamp = |x: usize| x.min(data.len());
        prop_assert_eq!(&out1[..], &data[clamp(s1)..clamp(e1)]);
        prop_assert_eq!(&out2[..], &data[clamp(s2)..clamp(e2)]);

        let lo = s1.max(s2);
        let hi = e1.min(e2).min(data.len());
        if lo < hi {
            prop_assert_eq!(&out1[lo - s1..hi - s1], &out2[lo - s2..hi - s2]);
        }
    }

    /// 直通过滤器与缓冲读取器对同一区间产出相同的字节。
    #[test]
    fn direct_filter_matches_buffered_reader(
        (data, cuts) in input_strategy(),
        start in 0usize..600,
        len in 0usize..600,
    ) {
        let range = ByteRange::new(start, Some(start + len)).expect("合法区间");
        let chunks = split(&data, cuts);

        let mut sink = BufferedSink::new();
        let mut reader = sink.reader(range);
        fill(&mut sink, &chunks);
        let buffered = block_on(collect_bytes(&mut reader));

        let source = stream::iter(chunks.into_iter().map(Bytes::from));
        let filter = direct_filter(source, range).expect("合法区间");
        prop_assert_eq!(block_on(collect_bytes(filter)), buffered);
    }
}
