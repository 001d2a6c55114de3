//! Logical vertex buffers.
//!
//! A [`LogicalBuffer`] presents one contiguous, random-access sequence of
//! cells stored across any number of [`PhysicalSegment`]s. Segments are kept
//! in an ordered map keyed by the logical index of their first cell; each
//! segment's start plus its length is exactly the next segment's start.
//!
//! Appends always go to the last segment, which may grow without bound while
//! the buffer is being authored. Segments larger than the GPU-suggested
//! vertex count are split at render time (see [`LogicalBuffer::render`]).
//!
//! Each segment also carries a set of restart markers: local indices at
//! which a new primitive run begins. Rendering issues a separate draw call
//! for every run.
//!
//! Segments emptied by erasure are moved to a death row and only released
//! at the next render, on [`purge`](LogicalBuffer::purge), or when the buffer
//! is dropped, since a draw issued earlier may still reference them.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gtl::{LogicalBuffer, DummyBackend, PrimitiveMode};
//! use gtl::cell::V3f;
//! use gtl::component::Vertex3f;
//!
//! let mut buffer: LogicalBuffer<V3f> = LogicalBuffer::new(Arc::new(DummyBackend::new()));
//! buffer.push_back((Vertex3f::new([0.0, 0.0, 0.0]),));
//! buffer.push_back((Vertex3f::new([1.0, 0.0, 0.0]),));
//! buffer.push_back((Vertex3f::new([0.0, 1.0, 0.0]),));
//! buffer.render(Some(PrimitiveMode::Triangles), 0, None)?;
//! ```

mod iter;
mod render;

pub use iter::{Cursor, Iter, IterMut};

use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Index, IndexMut, RangeBounds};
use std::sync::Arc;

use crate::backend::{BufferId, GraphicsApi};
use crate::cell::Cell;
use crate::descriptor::VertexBufferDescriptor;
use crate::error::BufferError;
use crate::segment::{to_range, PhysicalSegment};
use crate::topology::{
    hard_reset_discard, hard_reset_repeat_next, hard_reset_repeat_previous, PrimitiveMode,
};

/// A segment together with its restart markers.
#[derive(Debug, Clone)]
pub(crate) struct SegmentEntry<C: Cell> {
    pub(crate) segment: PhysicalSegment<C>,
    pub(crate) restarts: BTreeSet<usize>,
}

impl<C: Cell> SegmentEntry<C> {
    fn new(segment: PhysicalSegment<C>) -> Self {
        Self {
            segment,
            restarts: BTreeSet::new(),
        }
    }

    /// Drop markers past the end of the segment.
    fn prune_restarts(&mut self) {
        let len = self.segment.len();
        self.restarts.retain(|&r| r <= len);
    }
}

/// Read-only view of one segment of a logical buffer.
#[derive(Debug, Clone, Copy)]
pub struct SegmentRef<'a, C: Cell> {
    /// Logical index of the segment's first cell.
    pub start: usize,
    /// Cells stored in the segment.
    pub cells: &'a [C],
    /// Local indices at which a new primitive run begins.
    pub restarts: &'a BTreeSet<usize>,
    /// GPU buffer object, once the segment has been enabled.
    pub buffer: Option<BufferId>,
}

/// A contiguous vertex sequence stored across GPU buffer segments.
pub struct LogicalBuffer<C: Cell> {
    api: Arc<dyn GraphicsApi>,
    label: Option<String>,
    segments: BTreeMap<usize, SegmentEntry<C>>,
    death_row: Vec<PhysicalSegment<C>>,
    segment_limit: Option<usize>,
    suggested_segment_len: usize,
    default_mode: PrimitiveMode,
}

impl<C: Cell> LogicalBuffer<C> {
    /// Create an empty buffer with default settings.
    pub fn new(api: Arc<dyn GraphicsApi>) -> Self {
        Self::with_descriptor(api, &VertexBufferDescriptor::default())
    }

    /// Create an empty buffer from a descriptor.
    pub fn with_descriptor(api: Arc<dyn GraphicsApi>, descriptor: &VertexBufferDescriptor) -> Self {
        let mut buffer = Self {
            api,
            label: descriptor.label.clone(),
            segments: BTreeMap::new(),
            death_row: Vec::new(),
            segment_limit: descriptor.segment_limit,
            suggested_segment_len: 0,
            default_mode: descriptor.default_mode,
        };
        buffer.add_segment(0);
        buffer
    }

    /// Create a buffer holding the cells of an iterator.
    pub fn from_iter_with<I: IntoIterator<Item = C>>(api: Arc<dyn GraphicsApi>, iter: I) -> Self {
        let mut buffer = Self::new(api);
        buffer.insert_iter(0, iter);
        buffer
    }

    fn add_segment(&mut self, start: usize) -> &mut SegmentEntry<C> {
        let (api, mode) = (&self.api, self.default_mode);
        self.segments
            .entry(start)
            .or_insert_with(|| SegmentEntry::new(PhysicalSegment::new(api.clone(), mode)))
    }

    /// Get the debug label.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Get the graphics API this buffer talks to.
    pub fn api(&self) -> &Arc<dyn GraphicsApi> {
        &self.api
    }

    /// Get the default primitive mode.
    pub fn default_mode(&self) -> PrimitiveMode {
        self.default_mode
    }

    /// Set the default primitive mode of the buffer and all its segments.
    pub fn set_default_mode(&mut self, mode: PrimitiveMode) {
        self.default_mode = mode;
        for entry in self.segments.values_mut() {
            entry.segment.set_default_mode(mode);
        }
    }

    // ========================================================================
    // Index mapping
    // ========================================================================

    /// Map a logical index to its segment start and local index.
    ///
    /// The local index is clamped to the segment length, so indices past the
    /// end map to the end of the last segment.
    pub(crate) fn map_index(&self, index: usize) -> (usize, usize) {
        match self.segments.range(..=index).next_back() {
            Some((&start, entry)) => (start, (index - start).min(entry.segment.len())),
            None => (0, 0),
        }
    }

    fn back_start(&self) -> usize {
        self.segments.keys().next_back().copied().unwrap_or(0)
    }

    fn back_entry_mut(&mut self) -> &mut SegmentEntry<C> {
        let start = self.back_start();
        self.add_segment(start)
    }

    /// Shift the keys of every segment starting after `start`.
    fn renumber_after(&mut self, start: usize, shift: impl Fn(usize) -> usize) {
        let tail = self.segments.split_off(&(start + 1));
        for (key, entry) in tail {
            self.segments.insert(shift(key), entry);
        }
    }

    // ========================================================================
    // Size and capacity
    // ========================================================================

    /// Number of cells in the buffer.
    pub fn len(&self) -> usize {
        self.segments
            .iter()
            .next_back()
            .map_or(0, |(start, entry)| start + entry.segment.len())
    }

    /// Check whether the buffer holds no cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of cells the buffer can hold before the last segment
    /// reallocates.
    pub fn capacity(&self) -> usize {
        self.segments
            .iter()
            .next_back()
            .map_or(0, |(start, entry)| start + entry.segment.capacity())
    }

    /// Largest number of cells a buffer of this cell type can hold.
    pub fn max_size(&self) -> usize {
        usize::MAX / C::STRIDE.max(1)
    }

    /// Reserve room for at least `additional` more cells.
    pub fn reserve(&mut self, additional: usize) -> Result<(), BufferError> {
        let max = self.max_size();
        let requested = self.len().saturating_add(additional);
        if requested > max {
            return Err(BufferError::CapacityOverflow { requested, max });
        }
        self.back_entry_mut().segment.try_reserve(additional)
    }

    /// Number of segments currently holding the buffer.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Iterate over the segments in logical order.
    pub fn segments(&self) -> impl Iterator<Item = SegmentRef<'_, C>> + '_ {
        self.segments.iter().map(|(&start, entry)| SegmentRef {
            start,
            cells: entry.segment.as_slice(),
            restarts: &entry.restarts,
            buffer: entry.segment.buffer(),
        })
    }

    /// Number of retired segments waiting to be released.
    pub fn death_row_len(&self) -> usize {
        self.death_row.len()
    }

    /// Vertex count per segment used at render time, once known.
    pub fn suggested_segment_len(&self) -> Option<usize> {
        (self.suggested_segment_len > 0).then_some(self.suggested_segment_len)
    }

    // ========================================================================
    // Element access
    // ========================================================================

    /// Get a cell, or `None` when out of range.
    pub fn get(&self, index: usize) -> Option<&C> {
        if index >= self.len() {
            return None;
        }
        let (start, local) = self.map_index(index);
        self.segments.get(&start)?.segment.get(local)
    }

    /// Get a cell mutably, tainting it.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut C> {
        if index >= self.len() {
            return None;
        }
        let (start, local) = self.map_index(index);
        self.segments.get_mut(&start)?.segment.get_mut(local)
    }

    /// Get a cell, failing when out of range.
    pub fn at(&self, index: usize) -> Result<&C, BufferError> {
        let len = self.len();
        self.get(index)
            .ok_or(BufferError::OutOfRange { index, len })
    }

    /// Get a cell mutably, failing when out of range. The cell is tainted.
    pub fn at_mut(&mut self, index: usize) -> Result<&mut C, BufferError> {
        let len = self.len();
        self.get_mut(index)
            .ok_or(BufferError::OutOfRange { index, len })
    }

    /// Get the first cell.
    pub fn front(&self) -> Option<&C> {
        self.get(0)
    }

    /// Get the first cell mutably.
    pub fn front_mut(&mut self) -> Option<&mut C> {
        self.get_mut(0)
    }

    /// Get the last cell.
    pub fn back(&self) -> Option<&C> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// Get the last cell mutably.
    pub fn back_mut(&mut self) -> Option<&mut C> {
        let last = self.len().checked_sub(1)?;
        self.get_mut(last)
    }

    /// Iterate over all cells.
    pub fn iter(&self) -> Iter<'_, C> {
        Iter::new(self)
    }

    /// Iterate mutably over all cells. Each visited segment is tainted.
    pub fn iter_mut(&mut self) -> IterMut<'_, C> {
        IterMut::new(self)
    }

    /// Get a cursor at `index`, clamped to the end of the buffer.
    pub fn cursor(&self, index: usize) -> Cursor<'_, C> {
        Cursor::new(self, index)
    }

    /// Get a cursor at the first cell.
    pub fn begin(&self) -> Cursor<'_, C> {
        self.cursor(0)
    }

    /// Get a cursor one past the last cell.
    pub fn end(&self) -> Cursor<'_, C> {
        self.cursor(self.len())
    }

    // ========================================================================
    // Modifiers
    // ========================================================================

    /// Append a cell to the last segment and taint it.
    ///
    /// A pending hard reset is applied first. It is measured over the whole
    /// primitive run in progress, so how the run is split across segments
    /// does not change what gets stored.
    pub fn push_back(&mut self, value: C) {
        let entry = self.back_entry_mut();
        if let Some(mode) = entry.segment.take_hard_reset() {
            let mode = mode.unwrap_or(entry.segment.default_mode());
            self.repair_run(mode, value);
        }
        let entry = self.back_entry_mut();
        entry.segment.push_back(value);
        entry.prune_restarts();
        entry.segment.taint_all();
    }

    /// Number of cells in the run in progress at the end of the segment
    /// starting at `start`: cells after the latest restart marker, counted
    /// back across segments.
    pub(crate) fn run_len_through(&self, start: usize) -> usize {
        let mut run = 0;
        for entry in self.segments.range(..=start).rev().map(|(_, entry)| entry) {
            match entry.restarts.iter().next_back() {
                None => run += entry.segment.len(),
                Some(&restart) => {
                    run += entry.segment.len().saturating_sub(restart);
                    break;
                }
            }
        }
        run
    }

    /// Terminate the run in progress ahead of `value`: trim an incomplete
    /// primitive from the logical tail, then pad with degenerate vertices.
    fn repair_run(&mut self, mode: PrimitiveMode, value: C) {
        let len = self.len();
        let run = self.run_len_through(self.back_start());
        let discard = hard_reset_discard(mode, run);
        if discard > 0 {
            self.erase_range(len - discard..);
        }

        let remaining = run - discard;
        let Some(&last) = self.back().filter(|_| remaining > 0) else {
            return;
        };
        let previous = hard_reset_repeat_previous(mode, remaining);
        let next = hard_reset_repeat_next(mode);
        log::trace!(
            "Hard reset ({}): run {}, discarded {}, repeating previous {} and next {}",
            mode,
            run,
            discard,
            previous,
            next
        );
        let segment = &mut self.back_entry_mut().segment;
        let end = segment.len();
        segment.insert_n(end, previous, last);
        segment.insert_n(end + previous, next, value);
    }

    /// Remove and return the last cell.
    ///
    /// The last segment is retired once it empties, unless it is the only one.
    pub fn pop(&mut self) -> Option<C> {
        let start = self.back_start();
        let entry = self.segments.get_mut(&start)?;
        let value = entry.segment.pop()?;
        entry.prune_restarts();
        if entry.segment.is_empty() && self.segments.len() > 1 {
            if let Some(mut entry) = self.segments.remove(&start) {
                log::debug!("Retiring emptied segment at {}", start);
                if let Some(mode) = entry.segment.take_hard_reset() {
                    self.back_entry_mut().segment.hard_reset(mode);
                }
                self.death_row.push(entry.segment);
            }
        }
        Some(value)
    }

    /// Insert a cell before `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, value: C) {
        self.insert_n(index, 1, value);
    }

    /// Insert `count` copies of a cell before `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert_n(&mut self, index: usize, count: usize, value: C) {
        self.insert_iter(index, std::iter::repeat(value).take(count));
    }

    /// Insert the cells of an iterator before `index`. Returns how many cells
    /// were inserted.
    ///
    /// The cells go into the segment holding `index`, or the last segment
    /// when inserting at the end. That segment is tainted in full.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert_iter<I: IntoIterator<Item = C>>(&mut self, index: usize, iter: I) -> usize {
        let len = self.len();
        assert!(
            index <= len,
            "insertion index (is {index}) should be <= len (is {len})"
        );

        let (start, local) = if index == len {
            let start = self.back_start();
            (start, len - start)
        } else {
            self.map_index(index)
        };

        let Some(entry) = self.segments.get_mut(&start) else {
            return 0;
        };
        let inserted = entry.segment.insert_iter(local, iter);
        if inserted == 0 {
            return 0;
        }
        entry.restarts = entry
            .restarts
            .iter()
            .map(|&r| if r > local { r + inserted } else { r })
            .collect();
        entry.segment.taint_all();

        self.renumber_after(start, |key| key + inserted);
        inserted
    }

    /// Remove and return the cell at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn erase(&mut self, index: usize) -> C {
        let value = self[index];
        self.erase_range(index..index + 1);
        value
    }

    /// Remove the cells in a logical range.
    ///
    /// Restart markers inside the range collapse onto its start and markers
    /// after it move down. Segments left empty are retired, except that the
    /// buffer always keeps at least one segment. Later segments are
    /// renumbered to keep the buffer contiguous.
    ///
    /// # Panics
    ///
    /// Panics if the range starts after it ends or after the end of the buffer.
    pub fn erase_range(&mut self, range: impl RangeBounds<usize>) {
        let len = self.len();
        let range = to_range(range);
        let (first, last) = (range.start, range.end.min(len));
        assert!(
            first <= last,
            "erase range {first}..{last} is invalid for vertex buffer of length {len}"
        );
        if first == last {
            return;
        }

        let segments = std::mem::take(&mut self.segments);
        let mut retired = Vec::new();
        let mut pending_reset = None;
        let mut removed = 0;
        for (start, mut entry) in segments {
            let seg_len = entry.segment.len();
            let lo = first.clamp(start, start + seg_len) - start;
            let hi = last.clamp(start, start + seg_len) - start;
            let new_start = start - removed;

            if lo < hi {
                let count = hi - lo;
                entry.segment.erase(lo..hi);
                entry.restarts = entry
                    .restarts
                    .iter()
                    .map(|&r| match r {
                        r if r <= lo => r,
                        r if r <= hi => lo,
                        r => r - count,
                    })
                    .collect();
                entry.segment.taint(lo..);
                removed += count;
            }

            if entry.segment.is_empty() && seg_len > 0 {
                if let Some(mode) = entry.segment.take_hard_reset() {
                    pending_reset = Some(mode);
                }
                retired.push(entry.segment);
            } else {
                self.segments.insert(new_start, entry);
            }
        }

        if self.segments.is_empty() {
            let segment = match retired.pop() {
                Some(segment) => segment,
                None => PhysicalSegment::new(self.api.clone(), self.default_mode),
            };
            self.segments.insert(0, SegmentEntry::new(segment));
        }
        if let Some(mode) = pending_reset {
            self.back_entry_mut().segment.hard_reset(mode);
        }
        if !retired.is_empty() {
            log::debug!("Retiring {} emptied segment(s)", retired.len());
            self.death_row.extend(retired);
        }
    }

    /// Mark the end of the last segment as the start of a new primitive run.
    ///
    /// Rendering splits the draw call there without creating a new segment.
    pub fn soft_reset(&mut self) {
        let entry = self.back_entry_mut();
        let end = entry.segment.len();
        entry.restarts.insert(end);
    }

    /// Terminate the primitive in progress before the next append.
    ///
    /// `None` uses the default mode of the last segment.
    pub fn hard_reset(&mut self, mode: Option<PrimitiveMode>) {
        self.back_entry_mut().segment.hard_reset(mode);
    }

    /// Remove every cell.
    ///
    /// All segments are retired and one fresh segment takes their place, then
    /// death row is purged. Do not call this while a draw may still read the
    /// buffer objects.
    pub fn clear(&mut self) {
        let segments = std::mem::take(&mut self.segments);
        log::debug!("Clearing buffer, retiring {} segment(s)", segments.len());
        self.death_row
            .extend(segments.into_values().map(|entry| entry.segment));
        self.add_segment(0);
        self.purge();
    }

    /// Release every retired segment.
    ///
    /// Only call this once no draw issued before the retirement can still be
    /// reading the segments' buffer objects.
    pub fn purge(&mut self) {
        if !self.death_row.is_empty() {
            log::debug!("Purging {} retired segment(s)", self.death_row.len());
            self.death_row.clear();
        }
    }

    /// Replace the contents with `count` copies of a cell.
    pub fn assign(&mut self, count: usize, value: C) {
        self.clear();
        self.insert_n(0, count, value);
    }

    /// Replace the contents with the cells of an iterator.
    pub fn assign_iter<I: IntoIterator<Item = C>>(&mut self, iter: I) {
        self.clear();
        self.insert_iter(0, iter);
    }

    /// Resize to `len` cells, appending copies of `value` when growing.
    pub fn resize(&mut self, len: usize, value: C) {
        let current = self.len();
        if len < current {
            self.erase_range(len..);
        } else if len > current {
            self.insert_n(current, len - current, value);
        }
    }

    /// Resize to `len` cells, appending default cells when growing.
    pub fn resize_default(&mut self, len: usize) {
        self.resize(len, C::default());
    }

    /// Swap the contents of two buffers.
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }

    /// Mark a logical range of cells as needing re-upload.
    pub fn taint(&mut self, range: impl RangeBounds<usize>) {
        let range = to_range(range);
        for (&start, entry) in self.segments.iter_mut() {
            let end = start + entry.segment.len();
            if range.start >= end || range.end <= start {
                continue;
            }
            let lo = range.start.max(start) - start;
            let hi = range.end.min(end) - start;
            entry.segment.taint(lo..hi);
        }
    }

    /// Mark every segment as needing re-upload.
    pub fn taint_all(&mut self) {
        for entry in self.segments.values_mut() {
            entry.segment.taint_all();
        }
    }
}

impl<C: Cell> Index<usize> for LogicalBuffer<C> {
    type Output = C;

    fn index(&self, index: usize) -> &C {
        match self.get(index) {
            Some(cell) => cell,
            None => panic!(
                "index {} out of range for vertex buffer of length {}",
                index,
                self.len()
            ),
        }
    }
}

impl<C: Cell> IndexMut<usize> for LogicalBuffer<C> {
    fn index_mut(&mut self, index: usize) -> &mut C {
        let len = self.len();
        match self.get_mut(index) {
            Some(cell) => cell,
            None => panic!(
                "index {} out of range for vertex buffer of length {}",
                index, len
            ),
        }
    }
}

impl<C: Cell> Clone for LogicalBuffer<C> {
    /// Deep-copy every segment. Retired segments are not copied and every
    /// cloned segment gets its own buffer object on first use.
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            label: self.label.clone(),
            segments: self.segments.clone(),
            death_row: Vec::new(),
            segment_limit: self.segment_limit,
            suggested_segment_len: self.suggested_segment_len,
            default_mode: self.default_mode,
        }
    }
}

impl<C: Cell> std::fmt::Debug for LogicalBuffer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogicalBuffer")
            .field("label", &self.label)
            .field("len", &self.len())
            .field("segments", &self.segments.len())
            .field("death_row", &self.death_row.len())
            .field("default_mode", &self.default_mode)
            .finish()
    }
}

impl<'a, C: Cell> IntoIterator for &'a LogicalBuffer<C> {
    type Item = &'a C;
    type IntoIter = Iter<'a, C>;

    fn into_iter(self) -> Iter<'a, C> {
        self.iter()
    }
}

impl<'a, C: Cell> IntoIterator for &'a mut LogicalBuffer<C> {
    type Item = &'a mut C;
    type IntoIter = IterMut<'a, C>;

    fn into_iter(self) -> IterMut<'a, C> {
        self.iter_mut()
    }
}

impl<C: Cell> Extend<C> for LogicalBuffer<C> {
    fn extend<I: IntoIterator<Item = C>>(&mut self, iter: I) {
        for cell in iter {
            self.push_back(cell);
        }
    }
}

static_assertions::assert_impl_all!(LogicalBuffer<crate::cell::C4ubV3f>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;
    use crate::cell::V2f;
    use crate::component::Vertex2f;

    fn v(x: usize) -> V2f {
        (Vertex2f::new([x as f32, 0.0]),)
    }

    fn xs(buffer: &LogicalBuffer<V2f>) -> Vec<usize> {
        buffer.iter().map(|c| c.0 .0[0] as usize).collect()
    }

    fn buffer_of(n: usize) -> LogicalBuffer<V2f> {
        LogicalBuffer::from_iter_with(Arc::new(RecordingBackend::default()), (0..n).map(v))
    }

    /// Build a buffer whose segments hold the given lengths, in order.
    fn segmented(lens: &[usize]) -> LogicalBuffer<V2f> {
        let mut buffer: LogicalBuffer<V2f> =
            LogicalBuffer::new(Arc::new(RecordingBackend::default()));
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

    fn starts(buffer: &LogicalBuffer<V2f>) -> Vec<usize> {
        buffer.segments().map(|s| s.start).collect()
    }

    #[test]
    fn test_new_buffer_has_one_empty_segment() {
        let buffer = buffer_of(0);
        assert!(buffer.is_empty());
        assert_eq!(buffer.segment_count(), 1);
        assert_eq!(buffer.front(), None);
    }

    #[test]
    fn test_map_index() {
        let buffer = segmented(&[3, 2, 4]);
        assert_eq!(buffer.map_index(0), (0, 0));
        assert_eq!(buffer.map_index(3), (3, 0));
        assert_eq!(buffer.map_index(4), (3, 1));
        assert_eq!(buffer.map_index(8), (5, 3));
        assert_eq!(buffer.map_index(20), (5, 4));
    }

    #[test]
    fn test_access() {
        let mut buffer = segmented(&[3, 2]);
        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer[3], v(3));
        assert_eq!(buffer.at(4), Ok(&v(4)));
        assert_eq!(
            buffer.at(5),
            Err(BufferError::OutOfRange { index: 5, len: 5 })
        );
        assert_eq!(buffer.front(), Some(&v(0)));
        assert_eq!(buffer.back(), Some(&v(4)));

        *buffer.back_mut().unwrap() = v(9);
        assert_eq!(buffer[4], v(9));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_index_out_of_range_panics() {
        let buffer = buffer_of(2);
        let _ = buffer[2];
    }

    #[test]
    fn test_mutable_access_taints() {
        let mut buffer = segmented(&[3, 2]);
        for entry in buffer.segments.values_mut() {
            entry.segment.enable().unwrap();
        }
        buffer[4] = v(7);
        let tainted: Vec<_> = buffer
            .segments
            .values()
            .map(|e| e.segment.tainted().cloned())
            .collect();
        assert_eq!(tainted, vec![None, Some(1..2)]);
    }

    #[test]
    fn test_push_back_goes_to_last_segment() {
        let mut buffer = segmented(&[3, 2]);
        buffer.push_back(v(5));
        let lens: Vec<_> = buffer.segments().map(|s| s.cells.len()).collect();
        assert_eq!(lens, vec![3, 3]);
        assert_eq!(xs(&buffer), (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn test_insert_renumbers_later_segments() {
        let mut buffer = segmented(&[3, 2, 2]);
        buffer.insert_n(4, 2, v(9));
        assert_eq!(starts(&buffer), vec![0, 3, 7]);
        assert_eq!(xs(&buffer), vec![0, 1, 2, 3, 9, 9, 4, 5, 6]);
    }

    #[test]
    fn test_insert_shifts_restarts() {
        let mut buffer = buffer_of(4);
        buffer.soft_reset();
        buffer.push_back(v(4));
        buffer.insert(1, v(9));
        let restarts: Vec<_> = buffer.segments().next().unwrap().restarts.iter().copied().collect();
        assert_eq!(restarts, vec![5]);
    }

    #[test]
    fn test_insert_at_end() {
        let mut buffer = segmented(&[2, 2]);
        buffer.insert(4, v(4));
        assert_eq!(starts(&buffer), vec![0, 2]);
        assert_eq!(xs(&buffer), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_erase_middle_segment_element() {
        let mut buffer = segmented(&[3, 2, 2]);
        assert_eq!(buffer.erase(3), v(3));
        assert_eq!(starts(&buffer), vec![0, 3, 4]);
        assert_eq!(xs(&buffer), vec![0, 1, 2, 4, 5, 6]);
    }

    #[test]
    fn test_erase_sole_element_of_trailing_segment() {
        let mut buffer = segmented(&[3, 1]);
        buffer.erase(3);
        assert_eq!(buffer.len(), 3);
        assert_eq!(starts(&buffer), vec![0]);
        assert_eq!(buffer.death_row_len(), 1);
    }

    #[test]
    fn test_erase_sole_element_of_inner_segment() {
        let mut buffer = segmented(&[3, 1, 2]);
        buffer.erase(3);
        assert_eq!(starts(&buffer), vec![0, 3]);
        assert_eq!(xs(&buffer), vec![0, 1, 2, 4, 5]);
        assert_eq!(buffer.death_row_len(), 1);
    }

    #[test]
    fn test_erase_range_across_segments() {
        let mut buffer = segmented(&[3, 2, 3]);
        buffer.erase_range(2..6);
        assert_eq!(starts(&buffer), vec![0, 2]);
        assert_eq!(xs(&buffer), vec![0, 1, 6, 7]);
        assert_eq!(buffer.death_row_len(), 1);
    }

    #[test]
    fn test_erase_everything_keeps_one_segment() {
        let mut buffer = segmented(&[2, 2]);
        buffer.erase_range(..);
        assert!(buffer.is_empty());
        assert_eq!(buffer.segment_count(), 1);
        assert_eq!(buffer.death_row_len(), 1);
    }

    #[test]
    fn test_erase_relabels_restarts() {
        let mut buffer = buffer_of(3);
        buffer.soft_reset();
        buffer.extend((3..6).map(v));
        buffer.soft_reset();
        buffer.extend((6..8).map(v));
        // Markers at 3 and 6.
        buffer.erase_range(2..4);
        let restarts: Vec<_> = buffer.segments().next().unwrap().restarts.iter().copied().collect();
        assert_eq!(restarts, vec![2, 4]);
    }

    #[test]
    fn test_pop() {
        let mut buffer = segmented(&[2, 1]);
        assert_eq!(buffer.pop(), Some(v(2)));
        assert_eq!(buffer.segment_count(), 1);
        assert_eq!(buffer.death_row_len(), 1);
        assert_eq!(buffer.pop(), Some(v(1)));
        assert_eq!(buffer.pop(), Some(v(0)));
        assert_eq!(buffer.pop(), None);
        assert_eq!(buffer.segment_count(), 1);
    }

    #[test]
    fn test_pop_drops_trailing_restart() {
        let mut buffer = buffer_of(3);
        buffer.soft_reset();
        buffer.push_back(v(3));
        buffer.pop();
        buffer.pop();
        assert!(buffer.segments().next().unwrap().restarts.is_empty());
    }

    #[test]
    fn test_push_back_reuses_back_segment() {
        let mut buffer = buffer_of(0);
        let api = buffer.api().clone();
        let before = Arc::strong_count(&api);
        buffer.extend((0..16).map(v));
        assert_eq!(buffer.segment_count(), 1);
        assert_eq!(Arc::strong_count(&api), before);
    }

    #[test]
    fn test_retiring_back_segment_keeps_hard_reset() {
        let mut popped = segmented(&[4, 1]);
        popped.hard_reset(Some(PrimitiveMode::TriangleStrip));
        popped.pop();

        let mut erased = segmented(&[4, 1]);
        erased.hard_reset(Some(PrimitiveMode::TriangleStrip));
        erased.erase_range(4..5);

        for mut buffer in [popped, erased] {
            assert_eq!(buffer.segment_count(), 1);
            assert_eq!(buffer.death_row_len(), 1);
            buffer.push_back(v(9));
            assert_eq!(xs(&buffer), vec![0, 1, 2, 3, 3, 3, 9, 9, 9]);
        }
    }

    #[test]
    fn test_hard_reset_measures_run_since_restart() {
        let mut buffer = buffer_of(4);
        buffer.soft_reset();
        buffer.extend((4..6).map(v));
        buffer.hard_reset(Some(PrimitiveMode::TriangleStrip));
        buffer.push_back(v(9));
        // The two-cell run after the restart cannot form a triangle.
        assert_eq!(xs(&buffer), vec![0, 1, 2, 3, 9]);
    }

    #[test]
    fn test_clear_retires_and_purges_segments() {
        let mut buffer = segmented(&[2, 2, 2]);
        buffer.erase_range(0..2);
        assert_eq!(buffer.death_row_len(), 1);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.segment_count(), 1);
        assert_eq!(buffer.death_row_len(), 0);
    }

    #[test]
    fn test_resize_and_assign() {
        let mut buffer = buffer_of(3);
        buffer.resize(5, v(7));
        assert_eq!(xs(&buffer), vec![0, 1, 2, 7, 7]);
        buffer.resize(2, v(7));
        assert_eq!(xs(&buffer), vec![0, 1]);
        buffer.resize_default(3);
        assert_eq!(buffer[2], V2f::default());

        buffer.assign(2, v(4));
        assert_eq!(xs(&buffer), vec![4, 4]);
        buffer.assign_iter((0..3).map(v));
        assert_eq!(xs(&buffer), vec![0, 1, 2]);
    }

    #[test]
    fn test_reserve() {
        let mut buffer = buffer_of(2);
        buffer.reserve(100).unwrap();
        assert!(buffer.capacity() >= 102);

        let max = buffer.max_size();
        assert_eq!(
            buffer.reserve(max),
            Err(BufferError::CapacityOverflow {
                requested: max.saturating_add(2),
                max,
            })
        );
    }

    #[test]
    fn test_swap() {
        let mut a = buffer_of(2);
        let mut b = buffer_of(5);
        a.swap(&mut b);
        assert_eq!(a.len(), 5);
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn test_logical_taint_maps_onto_segments() {
        let mut buffer = segmented(&[3, 3]);
        for entry in buffer.segments.values_mut() {
            entry.segment.enable().unwrap();
        }
        buffer.taint(2..4);
        let tainted: Vec<_> = buffer
            .segments
            .values()
            .map(|e| e.segment.tainted().cloned())
            .collect();
        assert_eq!(tainted, vec![Some(2..3), Some(0..1)]);
    }

    #[test]
    fn test_default_mode_propagates() {
        let mut buffer = segmented(&[1, 1]);
        buffer.set_default_mode(PrimitiveMode::Quads);
        assert!(buffer
            .segments
            .values()
            .all(|e| e.segment.default_mode() == PrimitiveMode::Quads));
    }

    #[test]
    fn test_clone_is_deep() {
        let buffer = segmented(&[2, 2]);
        let mut copy = buffer.clone();
        copy[0] = v(9);
        assert_eq!(buffer[0], v(0));
        assert_eq!(starts(&copy), vec![0, 2]);
        assert!(copy
            .segments
            .values()
            .all(|e| e.segment.tainted() == Some(&(0..usize::MAX))));
    }
}
