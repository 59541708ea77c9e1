use std::ops::Range;

/// Contiguous chunk layout for one map call.
///
/// Every chunk but the last holds `floor(len / count)` items; the last one
/// absorbs the remainder, so no element is dropped or duplicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    len: usize,
    count: usize,
    chunk_size: usize,
}

impl ChunkPlan {
    pub fn new(len: usize, max_contexts: usize) -> Self {
        // Never more chunks than items
        let count = max_contexts.max(1).min(len);
        let chunk_size = if count == 0 { 0 } else { len / count };

        Self {
            len,
            count,
            chunk_size,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// A plan with at most one chunk gains nothing from workers.
    pub fn is_sequential(&self) -> bool {
        self.count <= 1
    }

    pub fn range(&self, index: usize) -> Option<Range<usize>> {
        if index >= self.count {
            return None;
        }

        let start = index * self.chunk_size;
        let end = if index + 1 == self.count {
            self.len
        } else {
            start + self.chunk_size
        };

        Some(start..end)
    }

    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.count).filter_map(move |index| self.range(index))
    }

    pub fn split<'a, T>(&self, items: &'a [T]) -> Vec<&'a [T]> {
        debug_assert_eq!(items.len(), self.len);
        self.ranges().map(|range| &items[range]).collect()
    }
}
