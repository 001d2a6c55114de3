//! Physical vertex buffer segments.
//!
//! A [`PhysicalSegment`] is a growable array of cells backed by exactly one
//! GPU buffer object. The buffer object is created lazily on the first
//! [`enable`](PhysicalSegment::enable) and released when the segment is
//! dropped.
//!
//! # Taint tracking
//!
//! Mutations are not uploaded immediately. Callers mark the range that needs
//! re-uploading with [`taint`](PhysicalSegment::taint); repeated calls extend
//! the range to cover every request. The next `enable` uploads either the
//! whole array or only the tainted sub-range.
//!
//! Appending through [`push_back`](PhysicalSegment::push_back) does not taint
//! anything on its own. Methods handing out mutable access to stored cells
//! taint the affected range themselves.
//!
//! # Hard resets
//!
//! [`hard_reset`](PhysicalSegment::hard_reset) terminates the primitive in
//! progress. It is applied lazily: the next `push_back` first trims any
//! incomplete primitive and then pads with repeated vertices so that the new
//! vertex starts a fresh strip inside the same draw call.

use std::ops::{Bound, Deref, Range, RangeBounds};
use std::sync::Arc;

use crate::backend::{BufferId, GraphicsApi};
use crate::cell::{cells_to_bytes, Cell};
use crate::error::BufferError;
use crate::topology::{
    hard_reset_discard, hard_reset_repeat_next, hard_reset_repeat_previous, PrimitiveMode,
};

/// Dirty range of a segment, in cell indices. The end may exceed the length.
pub type Taint = Range<usize>;

/// Convert any range expression into a half-open cell range.
pub(crate) fn to_range(range: impl RangeBounds<usize>) -> Range<usize> {
    let start = match range.start_bound() {
        Bound::Included(&s) => s,
        Bound::Excluded(&s) => s.saturating_add(1),
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(&e) => e.saturating_add(1),
        Bound::Excluded(&e) => e,
        Bound::Unbounded => usize::MAX,
    };
    start..end
}

/// A growable array of cells backed by one GPU buffer object.
pub struct PhysicalSegment<C: Cell> {
    api: Arc<dyn GraphicsApi>,
    cells: Vec<C>,
    buffer: Option<BufferId>,
    uploaded_len: usize,
    taint: Option<Taint>,
    default_mode: PrimitiveMode,
    hard_reset_pending: bool,
    hard_reset_mode: Option<PrimitiveMode>,
}

impl<C: Cell> PhysicalSegment<C> {
    /// Create an empty segment.
    pub fn new(api: Arc<dyn GraphicsApi>, default_mode: PrimitiveMode) -> Self {
        Self {
            api,
            cells: Vec::new(),
            buffer: None,
            uploaded_len: 0,
            taint: None,
            default_mode,
            hard_reset_pending: false,
            hard_reset_mode: None,
        }
    }

    /// Create a segment holding the given cells, fully tainted.
    pub fn from_cells(api: Arc<dyn GraphicsApi>, default_mode: PrimitiveMode, cells: Vec<C>) -> Self {
        let mut segment = Self::new(api, default_mode);
        segment.cells = cells;
        segment.taint_all();
        segment
    }

    /// Get the graphics API this segment talks to.
    pub fn api(&self) -> &Arc<dyn GraphicsApi> {
        &self.api
    }

    /// Get the GPU buffer object, if one has been created.
    pub fn buffer(&self) -> Option<BufferId> {
        self.buffer
    }

    /// Get the stored cells.
    pub fn as_slice(&self) -> &[C] {
        &self.cells
    }

    /// Get the stored cells mutably. The whole segment is tainted.
    pub fn as_mut_slice(&mut self) -> &mut [C] {
        self.taint_all();
        &mut self.cells
    }

    /// Get one cell mutably, tainting just that cell.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut C> {
        if index < self.cells.len() {
            self.taint(index..index + 1);
        }
        self.cells.get_mut(index)
    }

    /// Number of cells the segment can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.cells.capacity()
    }

    /// Get the default primitive mode.
    pub fn default_mode(&self) -> PrimitiveMode {
        self.default_mode
    }

    /// Set the default primitive mode.
    pub fn set_default_mode(&mut self, mode: PrimitiveMode) {
        self.default_mode = mode;
    }

    // ========================================================================
    // Taint
    // ========================================================================

    /// Mark a range of cells as needing re-upload.
    ///
    /// The stored range grows to cover both the existing and the new range.
    pub fn taint(&mut self, range: impl RangeBounds<usize>) {
        let range = to_range(range);
        if range.start >= range.end {
            return;
        }
        self.taint = Some(match self.taint.take() {
            Some(existing) => existing.start.min(range.start)..existing.end.max(range.end),
            None => range,
        });
    }

    /// Mark the whole segment as needing re-upload.
    pub fn taint_all(&mut self) {
        self.taint(..);
    }

    /// Get the pending dirty range.
    pub fn tainted(&self) -> Option<&Taint> {
        self.taint.as_ref()
    }

    // ========================================================================
    // Array operations
    // ========================================================================

    /// Replace the contents with `count` copies of `value`.
    pub fn assign(&mut self, count: usize, value: C) {
        self.cells.clear();
        self.cells.resize(count, value);
    }

    /// Replace the contents with the cells of an iterator.
    pub fn assign_iter<I: IntoIterator<Item = C>>(&mut self, iter: I) {
        self.cells.clear();
        self.cells.extend(iter);
    }

    /// Insert one cell before `index`.
    pub fn insert(&mut self, index: usize, value: C) {
        self.cells.insert(index, value);
    }

    /// Insert `count` copies of `value` before `index`.
    pub fn insert_n(&mut self, index: usize, count: usize, value: C) {
        self.cells
            .splice(index..index, std::iter::repeat(value).take(count));
    }

    /// Insert the cells of an iterator before `index`. Returns how many were
    /// inserted.
    pub fn insert_iter<I: IntoIterator<Item = C>>(&mut self, index: usize, iter: I) -> usize {
        let before = self.cells.len();
        self.cells.splice(index..index, iter);
        self.cells.len() - before
    }

    /// Remove the cells in `range`.
    pub fn erase(&mut self, range: Range<usize>) {
        self.cells.drain(range);
    }

    /// Remove and return the last cell.
    pub fn pop(&mut self) -> Option<C> {
        self.cells.pop()
    }

    /// Shorten the segment to `len` cells.
    pub fn truncate(&mut self, len: usize) {
        self.cells.truncate(len);
    }

    /// Split off the cells from `at` onwards.
    pub fn split_off(&mut self, at: usize) -> Vec<C> {
        self.cells.split_off(at)
    }

    /// Resize to `len` cells, filling with `value`.
    pub fn resize(&mut self, len: usize, value: C) {
        self.cells.resize(len, value);
    }

    /// Reserve room for at least `additional` more cells.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), BufferError> {
        self.cells
            .try_reserve(additional)
            .map_err(|_| BufferError::CapacityOverflow {
                requested: self.cells.len().saturating_add(additional),
                max: usize::MAX / C::STRIDE.max(1),
            })
    }

    /// Remove every cell.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Append a cell, applying a pending hard reset first.
    pub fn push_back(&mut self, value: C) {
        if self.hard_reset_pending {
            let mode = self.hard_reset_mode.take().unwrap_or(self.default_mode);
            self.hard_reset_pending = false;
            self.repair(mode, &value);
        }
        self.cells.push(value);
    }

    /// Request that the next `push_back` terminates the primitive in progress.
    ///
    /// `None` uses the segment's default mode at the time of the push.
    pub fn hard_reset(&mut self, mode: Option<PrimitiveMode>) {
        self.hard_reset_pending = true;
        self.hard_reset_mode = mode;
    }

    /// Check whether a hard reset is waiting for the next push.
    pub fn hard_reset_pending(&self) -> bool {
        self.hard_reset_pending
    }

    /// Withdraw a pending hard reset, returning its requested mode.
    pub(crate) fn take_hard_reset(&mut self) -> Option<Option<PrimitiveMode>> {
        if !self.hard_reset_pending {
            return None;
        }
        self.hard_reset_pending = false;
        Some(self.hard_reset_mode.take())
    }

    fn repair(&mut self, mode: PrimitiveMode, value: &C) {
        let discard = hard_reset_discard(mode, self.cells.len());
        self.cells.truncate(self.cells.len() - discard);

        let Some(&last) = self.cells.last() else {
            return;
        };
        let previous = hard_reset_repeat_previous(mode, self.cells.len());
        let next = hard_reset_repeat_next(mode);
        log::trace!(
            "Hard reset ({}): discarded {}, repeating previous {} and next {}",
            mode,
            discard,
            previous,
            next
        );
        self.cells.extend(std::iter::repeat(last).take(previous));
        self.cells.extend(std::iter::repeat(*value).take(next));
    }

    // ========================================================================
    // GPU
    // ========================================================================

    /// Enable this segment for drawing.
    ///
    /// Creates the buffer object on first use, uploads any tainted cells and
    /// points the client arrays into the buffer.
    pub fn enable(&mut self) -> Result<(), BufferError> {
        C::enable(self.api.as_ref());

        let buffer = match self.buffer {
            Some(buffer) => buffer,
            None => {
                let buffer = match self.api.create_buffer() {
                    Ok(buffer) => buffer,
                    Err(e) => {
                        C::disable(self.api.as_ref());
                        return Err(e);
                    }
                };
                log::trace!("Created buffer object {:?} for segment", buffer);
                self.buffer = Some(buffer);
                self.taint_all();
                buffer
            }
        };
        self.api.bind_array_buffer(buffer);

        if let Some(taint) = self.taint.take() {
            let len = self.cells.len();
            if (taint.start == 0 && taint.end >= len) || self.uploaded_len != len {
                self.api.buffer_data(buffer, &cells_to_bytes(&self.cells));
                self.uploaded_len = len;
            } else {
                let end = taint.end.min(len);
                if taint.start < end {
                    let bytes = cells_to_bytes(&self.cells[taint.start..end]);
                    self.api.buffer_sub_data(buffer, taint.start * C::STRIDE, &bytes);
                }
            }
        }

        C::pointers(self.api.as_ref());
        Ok(())
    }

    /// Disable the client arrays enabled by [`enable`](Self::enable).
    pub fn disable(&self) {
        C::disable(self.api.as_ref());
    }

    /// Issue one draw call over `count` cells from `first`.
    ///
    /// `None` draws to the end of the segment.
    pub fn draw(&self, mode: PrimitiveMode, first: usize, count: Option<usize>) {
        let count = count.unwrap_or_else(|| self.cells.len().saturating_sub(first));
        self.api.draw_arrays(mode, first, count);
    }

    /// Enable, draw and disable in one call.
    ///
    /// `None` for the mode uses the default mode.
    pub fn render(
        &mut self,
        mode: Option<PrimitiveMode>,
        first: usize,
        count: Option<usize>,
    ) -> Result<(), BufferError> {
        self.enable()?;
        self.draw(mode.unwrap_or(self.default_mode), first, count);
        self.disable();
        Ok(())
    }
}

impl<C: Cell> Deref for PhysicalSegment<C> {
    type Target = [C];

    fn deref(&self) -> &[C] {
        &self.cells
    }
}

impl<C: Cell> Clone for PhysicalSegment<C> {
    /// Deep-copy the cells. The clone gets its own buffer object on first use.
    fn clone(&self) -> Self {
        let mut segment = Self::from_cells(self.api.clone(), self.default_mode, self.cells.clone());
        segment.hard_reset_pending = self.hard_reset_pending;
        segment.hard_reset_mode = self.hard_reset_mode;
        segment
    }
}

impl<C: Cell> std::fmt::Debug for PhysicalSegment<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicalSegment")
            .field("len", &self.cells.len())
            .field("buffer", &self.buffer)
            .field("taint", &self.taint)
            .field("default_mode", &self.default_mode)
            .field("hard_reset_pending", &self.hard_reset_pending)
            .finish()
    }
}

impl<C: Cell> Drop for PhysicalSegment<C> {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            log::trace!("Releasing buffer object {:?}", buffer);
            self.api.delete_buffer(buffer);
        }
    }
}

static_assertions::assert_impl_all!(PhysicalSegment<crate::cell::C4ubV3f>: Send, Sync);
