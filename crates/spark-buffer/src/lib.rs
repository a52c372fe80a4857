#![cfg_attr(not(feature = "std"), no_std)]

//! `spark-buffer` 提供带可插拔增长策略的可增长字节缓冲。
//!
//! # 模块定位（Why）
//! - 为 `spark-range` 的缓冲 Sink 提供底层存储：一次写入、完整保留、按需扩容；
//! - 将“如何扩容”从“何时扩容”中剥离，使调用方能在乘性与加性两种策略之间选择。
//!
//! # 设计概要（How）
//! - `policy` 模块定义 [`GrowthPolicy`]，以枚举保证两种策略互斥，并负责参数校验；
//! - `growable` 模块实现 [`GrowableBuffer`]，基于 `bytes::BytesMut` 存储已提交字节，
//!   仅在下一次写入超出容量时才触发扩容。
//!
//! # 命名约定（Consistency）
//! - “已提交（committed）”指写游标之前的全部字节，与 `spark-range` 中 Sink 的写游标一一对应。

extern crate alloc;

mod growable;
mod policy;

pub use growable::GrowableBuffer;
pub use policy::{DEFAULT_GROWTH_FACTOR, GrowthPolicy, GrowthPolicyError, MAX_CAPACITY};
