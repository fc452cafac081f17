use std::fmt;

use tree::NodeId;

/// A destination window whose bytes equal one source block.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BlockMatch {
    /// Matched source block.
    pub src_block: NodeId,
    /// Byte offset of the block within its source file.
    pub src_offset: u64,
    /// Number of matched bytes (the block length).
    pub len: u64,
    /// Byte offset of the window within the destination file.
    pub dst_offset: u64,
}

/// Half-open byte range `[from, to)`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct RangePair {
    /// First byte of the range.
    pub from: u64,
    /// One past the last byte.
    pub to: u64,
}

impl RangePair {
    /// Number of bytes covered.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.to.saturating_sub(self.from)
    }

    /// `true` when the range covers no bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.to <= self.from
    }
}

impl fmt::Display for RangePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.from, self.to)
    }
}

/// Result of scanning a destination file against a source file's blocks.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FileMatch {
    /// Size of the source file.
    pub src_size: u64,
    /// Bytes read from the destination.
    pub dst_size: u64,
    /// Verified matches in destination order.
    pub block_matches: Vec<BlockMatch>,
}

impl FileMatch {
    /// Source byte ranges covered by the matches, sorted and merged.
    #[must_use]
    pub fn matched(&self) -> Vec<RangePair> {
        let mut ranges: Vec<RangePair> = self
            .block_matches
            .iter()
            .map(|m| RangePair {
                from: m.src_offset.min(self.src_size),
                to: (m.src_offset + m.len).min(self.src_size),
            })
            .filter(|range| !range.is_empty())
            .collect();
        ranges.sort_unstable();

        let mut merged: Vec<RangePair> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if range.from <= last.to => last.to = last.to.max(range.to),
                _ => merged.push(range),
            }
        }
        merged
    }

    /// Source byte ranges no match covers, i.e. the bytes that must be
    /// fetched from the source.
    ///
    /// The ranges are sorted, disjoint, and together with [`Self::matched`]
    /// cover `[0, src_size)` exactly.
    #[must_use]
    pub fn not_matched(&self) -> Vec<RangePair> {
        let mut gaps = Vec::new();
        let mut cursor = 0;
        for range in self.matched() {
            if range.from > cursor {
                gaps.push(RangePair {
                    from: cursor,
                    to: range.from,
                });
            }
            cursor = range.to;
        }
        if cursor < self.src_size {
            gaps.push(RangePair {
                from: cursor,
                to: self.src_size,
            });
        }
        gaps
    }
}
