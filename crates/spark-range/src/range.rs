use core::{fmt, ops::Range};

use crate::error::ConfigError;

/// 半开字节区间 `[start, end)`，`end` 为 `None` 时表示无上界。
///
/// # 教案式说明
/// - **意图 (Why)**：缓冲读取器与直通过滤器共享同一套区间语义，
///   将“无上界”编码为 `Option` 而非哨兵值，避免把 `usize::MAX` 误当成真实长度。
/// - **契约 (What)**：`start <= end` 在构造时校验，之后不可变；
///   [`end_bound`](Self::end_bound) 将无上界映射为 `usize::MAX`，只用于比较运算。
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct ByteRange {
    start: usize,
    end: Option<usize>,
}

impl ByteRange {
    /// 覆盖整条流的区间 `[0, ∞)`。
    pub const FULL: ByteRange = ByteRange {
        start: 0,
        end: None,
    };

    /// 构造区间，`start > end` 时返回 [`ConfigError::InvalidRange`]。
    pub fn new(start: usize, end: Option<usize>) -> Result<Self, ConfigError> {
        match end {
            Some(end) if start > end => Err(ConfigError::InvalidRange { start, end }),
            _ => Ok(Self { start, end }),
        }
    }

    /// `[start, ∞)`。
    pub const fn starting_at(start: usize) -> Self {
        Self { start, end: None }
    }

    /// `[0, end)`。
    pub const fn ending_at(end: usize) -> Self {
        Self {
            start: 0,
            end: Some(end),
        }
    }

    /// 起点（含）。
    pub fn start(&self) -> usize {
        self.start
    }

    /// 上界（不含），无上界时为 `None`。
    pub fn end(&self) -> Option<usize> {
        self.end
    }

    /// 比较用的上界，无上界时为 `usize::MAX`。
    pub fn end_bound(&self) -> usize {
        self.end.unwrap_or(usize::MAX)
    }

    /// 是否有上界。
    pub fn is_bounded(&self) -> bool {
        self.end.is_some()
    }

    /// 区间长度，无上界时为 `None`。
    pub fn len(&self) -> Option<usize> {
        self.end.map(|end| end - self.start)
    }

    /// 有上界且长度为 0。
    pub fn is_empty(&self) -> bool {
        self.end == Some(self.start)
    }

    /// `offset` 是否落在区间内。
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end_bound()
    }

    /// 计算区间与 `[offset, offset + len)` 的交集，返回相对 `offset` 的下标。
    ///
    /// 交集为空时返回 `None`。
    pub fn overlap(&self, offset: usize, len: usize) -> Option<Range<usize>> {
        let chunk_end = offset.saturating_add(len);
        let lo = offset.max(self.start);
        let hi = chunk_end.min(self.end_bound());
        (lo < hi).then(|| (lo - offset)..(hi - offset))
    }

    /// 以新的起点替换，保持上界不变。
    pub fn with_start(self, start: usize) -> Result<Self, ConfigError> {
        Self::new(start, self.end)
    }

    /// 以新的上界替换，保持起点不变。
    pub fn with_end(self, end: usize) -> Result<Self, ConfigError> {
        Self::new(self.start, Some(end))
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "[{}, {})", self.start, end),
            None => write!(f, "[{}, ∞)", self.start),
        }
    }
}

impl TryFrom<(usize, usize)> for ByteRange {
    type Error = ConfigError;

    fn try_from((start, end): (usize, usize)) -> Result<Self, Self::Error> {
        Self::new(start, Some(end))
    }
}

impl TryFrom<(usize, Option<usize>)> for ByteRange {
    type Error = ConfigError;

    fn try_from((start, end): (usize, Option<usize>)) -> Result<Self, Self::Error> {
        Self::new(start, end)
    }
}

impl TryFrom<Range<usize>> for ByteRange {
    type Error = ConfigError;

    fn try_from(range: Range<usize>) -> Result<Self, Self::Error> {
        Self::new(range.start, Some(range.end))
    }
}
