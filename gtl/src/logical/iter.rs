//! Iteration across segment boundaries.

use std::collections::btree_map;
use std::iter::FusedIterator;

use super::{LogicalBuffer, SegmentEntry};
use crate::cell::Cell;

/// Iterator over the cells of a [`LogicalBuffer`].
pub struct Iter<'a, C: Cell> {
    segments: btree_map::Values<'a, usize, SegmentEntry<C>>,
    front: std::slice::Iter<'a, C>,
    back: std::slice::Iter<'a, C>,
    remaining: usize,
}

impl<'a, C: Cell> Iter<'a, C> {
    pub(super) fn new(buffer: &'a LogicalBuffer<C>) -> Self {
        Self {
            segments: buffer.segments.values(),
            front: Default::default(),
            back: Default::default(),
            remaining: buffer.len(),
        }
    }
}

impl<'a, C: Cell> Iterator for Iter<'a, C> {
    type Item = &'a C;

    fn next(&mut self) -> Option<&'a C> {
        loop {
            if let Some(cell) = self.front.next() {
                self.remaining -= 1;
                return Some(cell);
            }
            match self.segments.next() {
                Some(entry) => self.front = entry.segment.as_slice().iter(),
                None => {
                    let cell = self.back.next()?;
                    self.remaining -= 1;
                    return Some(cell);
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, C: Cell> DoubleEndedIterator for Iter<'a, C> {
    fn next_back(&mut self) -> Option<&'a C> {
        loop {
            if let Some(cell) = self.back.next_back() {
                self.remaining -= 1;
                return Some(cell);
            }
            match self.segments.next_back() {
                Some(entry) => self.back = entry.segment.as_slice().iter(),
                None => {
                    let cell = self.front.next_back()?;
                    self.remaining -= 1;
                    return Some(cell);
                }
            }
        }
    }
}

impl<C: Cell> ExactSizeIterator for Iter<'_, C> {}
impl<C: Cell> FusedIterator for Iter<'_, C> {}

/// Mutable iterator over the cells of a [`LogicalBuffer`].
///
/// Every segment the iterator enters is tainted in full.
pub struct IterMut<'a, C: Cell> {
    segments: btree_map::ValuesMut<'a, usize, SegmentEntry<C>>,
    front: std::slice::IterMut<'a, C>,
    back: std::slice::IterMut<'a, C>,
    remaining: usize,
}

impl<'a, C: Cell> IterMut<'a, C> {
    pub(super) fn new(buffer: &'a mut LogicalBuffer<C>) -> Self {
        let remaining = buffer.len();
        Self {
            segments: buffer.segments.values_mut(),
            front: Default::default(),
            back: Default::default(),
            remaining,
        }
    }
}

impl<'a, C: Cell> Iterator for IterMut<'a, C> {
    type Item = &'a mut C;

    fn next(&mut self) -> Option<&'a mut C> {
        loop {
            if let Some(cell) = self.front.next() {
                self.remaining -= 1;
                return Some(cell);
            }
            match self.segments.next() {
                Some(entry) => self.front = entry.segment.as_mut_slice().iter_mut(),
                None => {
                    let cell = self.back.next()?;
                    self.remaining -= 1;
                    return Some(cell);
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, C: Cell> DoubleEndedIterator for IterMut<'a, C> {
    fn next_back(&mut self) -> Option<&'a mut C> {
        loop {
            if let Some(cell) = self.back.next_back() {
                self.remaining -= 1;
                return Some(cell);
            }
            match self.segments.next_back() {
                Some(entry) => self.back = entry.segment.as_mut_slice().iter_mut(),
                None => {
                    let cell = self.front.next_back()?;
                    self.remaining -= 1;
                    return Some(cell);
                }
            }
        }
    }
}

impl<C: Cell> ExactSizeIterator for IterMut<'_, C> {}
impl<C: Cell> FusedIterator for IterMut<'_, C> {}

// ============================================================================
// Cursor
// ============================================================================

/// A random-access position in a [`LogicalBuffer`].
///
/// The cursor tracks its logical index together with the segment and local
/// index it resolves to. Positions on a segment boundary always resolve to
/// the start of the later segment, so only the end of the buffer sits one
/// past the end of a segment.
///
/// Two cursors are equal when they address the same storage slot of the
/// same segment.
pub struct Cursor<'a, C: Cell> {
    buffer: &'a LogicalBuffer<C>,
    index: usize,
    start: usize,
    local: usize,
}

impl<'a, C: Cell> Cursor<'a, C> {
    pub(super) fn new(buffer: &'a LogicalBuffer<C>, index: usize) -> Self {
        let mut cursor = Self {
            buffer,
            index: 0,
            start: 0,
            local: 0,
        };
        cursor.seek_to(index);
        cursor
    }

    /// Logical index of the cursor.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Logical index of the segment the cursor is in.
    pub fn segment_start(&self) -> usize {
        self.start
    }

    /// Index of the cursor within its segment.
    pub fn local_index(&self) -> usize {
        self.local
    }

    /// Get the cell under the cursor, or `None` at the end.
    pub fn get(&self) -> Option<&'a C> {
        let buffer: &'a LogicalBuffer<C> = self.buffer;
        buffer.segments.get(&self.start)?.segment.get(self.local)
    }

    /// Check whether the cursor is one past the last cell.
    pub fn is_end(&self) -> bool {
        self.index >= self.buffer.len()
    }

    /// Move to the next cell, crossing into the next segment at a boundary.
    ///
    /// Does nothing at the end of the buffer.
    pub fn move_next(&mut self) {
        let Some(entry) = self.buffer.segments.get(&self.start) else {
            return;
        };
        if self.local >= entry.segment.len() {
            return;
        }
        self.index += 1;
        self.local += 1;
        if self.local == entry.segment.len() {
            if let Some((&next, _)) = self.buffer.segments.range(self.start + 1..).next() {
                self.start = next;
                self.local = 0;
            }
        }
    }

    /// Move to the previous cell, crossing into the previous segment at a
    /// boundary.
    ///
    /// Does nothing at the start of the buffer.
    pub fn move_prev(&mut self) {
        if self.index == 0 {
            return;
        }
        self.index -= 1;
        if self.local > 0 {
            self.local -= 1;
        } else if let Some((&prev, entry)) = self.buffer.segments.range(..self.start).next_back() {
            self.start = prev;
            self.local = entry.segment.len().saturating_sub(1);
        }
    }

    /// Move by `offset` cells, clamping to the start and end of the buffer.
    pub fn seek(&mut self, offset: isize) {
        let target = if offset < 0 {
            self.index.saturating_sub(offset.unsigned_abs())
        } else {
            self.index.saturating_add(offset as usize)
        };
        self.seek_to(target);
    }

    /// Move to a logical index, clamped to the end of the buffer.
    pub fn seek_to(&mut self, index: usize) {
        let len = self.buffer.len();
        let index = index.min(len);
        let (start, local) = if index == len {
            let start = self.buffer.back_start();
            (start, len - start)
        } else {
            self.buffer.map_index(index)
        };
        self.index = index;
        self.start = start;
        self.local = local;
    }

    /// Signed distance from `other` to this cursor.
    pub fn distance_from(&self, other: &Self) -> isize {
        self.index as isize - other.index as isize
    }

    fn slot(&self) -> Option<*const SegmentEntry<C>> {
        self.buffer
            .segments
            .get(&self.start)
            .map(|entry| entry as *const SegmentEntry<C>)
    }
}

impl<C: Cell> Clone for Cursor<'_, C> {
    fn clone(&self) -> Self {
        Self {
            buffer: self.buffer,
            index: self.index,
            start: self.start,
            local: self.local,
        }
    }
}

impl<C: Cell> PartialEq for Cursor<'_, C> {
    fn eq(&self, other: &Self) -> bool {
        self.slot() == other.slot() && self.local == other.local
    }
}

impl<C: Cell> std::fmt::Debug for Cursor<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("index", &self.index)
            .field("segment_start", &self.start)
            .field("local", &self.local)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::DummyBackend;
    use crate::cell::V2f;
    use crate::component::Vertex2f;
    use crate::segment::PhysicalSegment;

    fn v(x: usize) -> V2f {
        (Vertex2f::new([x as f32, 0.0]),)
    }

    fn x(cell: &V2f) -> usize {
        cell.0 .0[0] as usize
    }

    fn segmented(lens: &[usize]) -> LogicalBuffer<V2f> {
        let mut buffer: LogicalBuffer<V2f> = LogicalBuffer::new(Arc::new(DummyBackend::new()));
        buffer.segments.clear();
        let mut start = 0;
        for &len in lens {
            let cells = (start..start + len).map(v).collect();
            let segment = PhysicalSegment::from_cells(buffer.api.clone(), buffer.default_mode, cells);
            buffer.segments.insert(start, SegmentEntry::new(segment));
            start += len;
        }
        buffer
    }

    #[test]
    fn test_iter_crosses_segments() {
        let buffer = segmented(&[2, 3, 1]);
        let forward: Vec<_> = buffer.iter().map(x).collect();
        assert_eq!(forward, vec![0, 1, 2, 3, 4, 5]);
        let backward: Vec<_> = buffer.iter().rev().map(x).collect();
        assert_eq!(backward, vec![5, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_iter_from_both_ends() {
        let buffer = segmented(&[2, 2]);
        let mut iter = buffer.iter();
        assert_eq!(iter.len(), 4);
        assert_eq!(iter.next().map(x), Some(0));
        assert_eq!(iter.next_back().map(x), Some(3));
        assert_eq!(iter.next_back().map(x), Some(2));
        assert_eq!(iter.next().map(x), Some(1));
        assert_eq!(iter.len(), 0);
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);
    }

    #[test]
    fn test_iter_mut_taints_visited_segments() {
        let mut buffer = segmented(&[2, 2]);
        for entry in buffer.segments.values_mut() {
            entry.segment.enable().unwrap();
        }
        for cell in buffer.iter_mut().take(1) {
            *cell = v(9);
        }
        assert_eq!(buffer[0], v(9));
        let tainted: Vec<_> = buffer
            .segments
            .values()
            .map(|e| e.segment.tainted().is_some())
            .collect();
        assert_eq!(tainted, vec![true, false]);
    }

    #[test]
    fn test_cursor_moves_across_boundaries() {
        let buffer = segmented(&[2, 2]);
        let mut cursor = buffer.begin();
        cursor.move_next();
        assert_eq!((cursor.segment_start(), cursor.local_index()), (0, 1));
        cursor.move_next();
        assert_eq!((cursor.segment_start(), cursor.local_index()), (2, 0));
        assert_eq!(cursor.get().map(x), Some(2));

        cursor.move_prev();
        assert_eq!((cursor.segment_start(), cursor.local_index()), (0, 1));
        assert_eq!(cursor.get().map(x), Some(1));
    }

    #[test]
    fn test_cursor_saturates() {
        let buffer = segmented(&[2, 1]);
        let mut cursor = buffer.end();
        assert!(cursor.is_end());
        assert_eq!(cursor.get(), None);
        cursor.move_next();
        assert_eq!(cursor.index(), 3);

        let mut cursor = buffer.begin();
        cursor.move_prev();
        assert_eq!(cursor.index(), 0);
    }

    #[test]
    fn test_cursor_seek() {
        let buffer = segmented(&[3, 3]);
        let mut cursor = buffer.begin();
        cursor.seek(4);
        assert_eq!(cursor.get().map(x), Some(4));
        cursor.seek(-2);
        assert_eq!(cursor.get().map(x), Some(2));
        cursor.seek(100);
        assert_eq!(cursor, buffer.end());
        assert_eq!(cursor.distance_from(&buffer.begin()), 6);
    }

    #[test]
    fn test_cursor_equality_is_by_slot() {
        let buffer = segmented(&[2, 2]);
        let mut walked = buffer.begin();
        walked.move_next();
        walked.move_next();
        assert_eq!(walked, buffer.cursor(2));
        assert_ne!(walked, buffer.cursor(3));

        let other = segmented(&[2, 2]);
        assert_ne!(buffer.cursor(1), other.cursor(1));
    }
}
