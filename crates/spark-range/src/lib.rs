#![cfg_attr(not(feature = "std"), no_std)]

//! # spark-range
//!
//! ## 定位与职责（Why）
//! - 从流式字节源中提取连续的字节区间，提供两种模式：
//!   - **缓冲模式**：[`BufferedSink`] 完整保留写入的字节，任意多个 [`RangeReader`]
//!     以各自的节奏、在数据到达之前或之后读取可能重叠的区间；
//!   - **直通模式**：[`DirectFilter`] 单遍裁剪，只放行区间内字节，不保留区间外的任何数据。
//! - 截断（源在区间上界之前结束）是正常的结束方式，不是错误。
//!
//! ## 架构嵌入（Where）
//! - 存储来自 `spark-buffer` 的 [`GrowableBuffer`](spark_buffer::GrowableBuffer)；
//! - 读取端统一实现 `futures::Stream<Item = Bytes>`，写入端实现 [`ChunkConsumer`]
//!   与 `futures::Sink<Bytes>`，可直接与任意异步流水线拼接；
//! - 调度模型为单所有者写入 + 唤醒通知：读取器在追上写游标后登记 waker 并挂起，
//!   写入或结束时由 Sink 在锁外统一唤醒。
//!
//! ## 使用示例（How）
//! ```
//! use futures::executor::block_on;
//! use spark_range::{BufferedSink, collect_bytes};
//!
//! let mut sink = BufferedSink::new();
//! let head = sink.range(0, 6).expect("合法区间");
//! let tail = sink.from(5);
//! sink.write(b"0123456789").expect("未结束的 Sink 接受写入");
//! sink.finish();
//!
//! assert_eq!(block_on(collect_bytes(head)), b"012345");
//! assert_eq!(block_on(collect_bytes(tail)), b"56789");
//! ```

extern crate alloc;

mod capability;
mod error;
mod filter;
mod options;
mod range;
mod reader;
mod sink;

pub use capability::{ChunkConsumer, ChunkSource, collect_bytes, pump};
pub use error::{ConfigError, RangeError};
pub use filter::{DirectFilter, FilterReader, FilterWriter, RangeTrim, Trimmed, channel};
pub use options::{
    DEFAULT_CAPACITY, RangeOptions, SinkConfig, SinkOptions, direct_channel, direct_filter,
};
pub use range::ByteRange;
pub use reader::{Pull, RangeOutcome, RangeReader, ReaderState, Termination};
pub use sink::BufferedSink;
pub use spark_buffer::GrowthPolicy;
