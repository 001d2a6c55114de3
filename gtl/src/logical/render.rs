//! Rendering a logical buffer.
//!
//! A render pass runs in three steps:
//!
//! 1. Release retired segments. No draw from an earlier pass can still be
//!    using them once the caller starts a new pass.
//! 2. Split every segment longer than the suggested vertex count into
//!    segments of at most that length, carrying restart markers along.
//! 3. Walk the segments covering the requested range. Each segment issues
//!    one draw call per restart-delimited run. Between two segments a bridge
//!    re-emits the vertices around the boundary in immediate mode so that
//!    strips continue across it; the next segment's first draw then skips
//!    the vertices the bridge already covered.

use super::{LogicalBuffer, SegmentEntry};
use crate::cell::Cell;
use crate::error::BufferError;
use crate::segment::PhysicalSegment;
use crate::topology::{BridgePlan, PrimitiveMode};

impl<C: Cell> LogicalBuffer<C> {
    /// Render `count` cells from `first`.
    ///
    /// `None` for the mode uses the buffer's default mode; `None` for the
    /// count renders to the end of the buffer. Ranges past the end are
    /// clamped.
    pub fn render(
        &mut self,
        mode: Option<PrimitiveMode>,
        first: usize,
        count: Option<usize>,
    ) -> Result<(), BufferError> {
        let mode = mode.unwrap_or(self.default_mode);

        self.purge();
        let limit = self.resolve_segment_limit();
        self.decompose(limit);

        let len = self.len();
        if first >= len {
            return Ok(());
        }
        let last = match count {
            Some(0) => return Ok(()),
            Some(count) => first.saturating_add(count - 1).min(len - 1),
            None => len - 1,
        };

        let (first_start, first_local) = self.map_index(first);
        let (last_start, last_local) = self.map_index(last);
        let keys: Vec<usize> = self
            .segments
            .range(first_start..=last_start)
            .map(|(&start, _)| start)
            .collect();

        log::trace!(
            "Rendering {} cells from {} in {} over {} segment(s)",
            last + 1 - first,
            first,
            mode,
            keys.len()
        );

        let mut skip = 0;
        for (i, &start) in keys.iter().enumerate() {
            let is_last = start == last_start;
            let Some(entry) = self.segments.get_mut(&start) else {
                continue;
            };

            entry.segment.enable()?;
            let begin = if i == 0 { first_local } else { skip };
            let end = if is_last {
                last_local + 1
            } else {
                entry.segment.len()
            };
            draw_runs(entry, mode, begin, end);

            skip = 0;
            if let Some(&next) = keys.get(i + 1) {
                let available = if next == last_start {
                    last_local + 1
                } else {
                    self.segments.get(&next).map_or(0, |e| e.segment.len())
                };
                skip = self.bridge(start, next, mode, available);
            }

            if let Some(entry) = self.segments.get(&start) {
                entry.segment.disable();
            }
        }
        Ok(())
    }

    /// Render the whole buffer in its default mode.
    pub fn render_all(&mut self) -> Result<(), BufferError> {
        self.render(None, 0, None)
    }

    /// Get the segment length limit, querying the graphics API the first time.
    fn resolve_segment_limit(&mut self) -> usize {
        if self.suggested_segment_len == 0 {
            let limit = self
                .segment_limit
                .unwrap_or_else(|| self.api.max_elements_vertices())
                .max(1);
            log::debug!(
                "Using {} vertices per segment{}",
                limit,
                if self.segment_limit.is_some() {
                    " (configured)"
                } else {
                    ""
                }
            );
            self.suggested_segment_len = limit;
        }
        self.suggested_segment_len
    }

    /// Split every segment longer than `limit`.
    ///
    /// The head keeps the first `limit` cells and the tail is cut into new
    /// segments of at most `limit` cells. A restart marker `r` belongs to the
    /// chunk whose range `(k * limit, (k + 1) * limit]` contains it, so a marker
    /// on a chunk boundary stays at the end of the earlier chunk. A pending
    /// hard reset moves to the last chunk.
    fn decompose(&mut self, limit: usize) {
        let oversized: Vec<usize> = self
            .segments
            .iter()
            .filter(|(_, entry)| entry.segment.len() > limit)
            .map(|(&start, _)| start)
            .collect();

        for start in oversized {
            let Some(entry) = self.segments.get_mut(&start) else {
                continue;
            };
            let tail = entry.segment.split_off(limit);
            let restarts = std::mem::take(&mut entry.restarts);
            let hard_reset = entry.segment.take_hard_reset();
            let default_mode = entry.segment.default_mode();

            let mut chunks: Vec<SegmentEntry<C>> = tail
                .chunks(limit)
                .map(|cells| {
                    SegmentEntry::new(PhysicalSegment::from_cells(
                        self.api.clone(),
                        default_mode,
                        cells.to_vec(),
                    ))
                })
                .collect();

            for r in restarts {
                let chunk = if r == 0 { 0 } else { (r - 1) / limit };
                let local = r - chunk * limit;
                match chunk {
                    0 => entry.restarts.insert(local),
                    k => match chunks.get_mut(k - 1) {
                        Some(target) => target.restarts.insert(local),
                        None => false,
                    },
                };
            }

            if let (Some(mode), Some(last)) = (hard_reset, chunks.last_mut()) {
                last.segment.hard_reset(mode);
            }

            log::debug!(
                "Decomposed segment at {} into {} segment(s) of at most {} vertices",
                start,
                chunks.len() + 1,
                limit
            );
            for (k, chunk) in chunks.into_iter().enumerate() {
                self.segments.insert(start + (k + 1) * limit, chunk);
            }
        }
    }

    /// Re-emit the cells around the boundary between two adjacent segments.
    ///
    /// `available` is how many leading cells of the next segment fall inside
    /// the rendered range. Only cells before the next segment's first restart
    /// marker are emitted. Returns how many of them the next segment's first
    /// draw call must skip.
    fn bridge(&self, from: usize, to: usize, mode: PrimitiveMode, available: usize) -> usize {
        let (Some(from_entry), Some(to_entry)) = (self.segments.get(&from), self.segments.get(&to))
        else {
            return 0;
        };

        let drawn = self.run_len_through(from);
        let Some(plan) = BridgePlan::for_mode(mode, drawn) else {
            return 0;
        };

        // The leading run of the next segment ends at its first restart.
        let to_cells = to_entry.segment.as_slice();
        let leading = to_entry
            .restarts
            .iter()
            .next()
            .map_or(to_cells.len(), |&r| r.min(to_cells.len()));
        if leading == 0 {
            return 0;
        }
        let from_cells = from_entry.segment.as_slice();
        let plan = plan.clamped(from_cells.len(), available.min(leading));

        log::debug!(
            "Bridging segments {} -> {} in {}: drawn {}, redraw {}, predraw {}, skip {}",
            from,
            to,
            mode,
            drawn,
            plan.redraw,
            plan.predraw,
            plan.skip
        );

        let api = self.api.as_ref();
        api.begin_immediate(mode);
        for cell in &from_cells[from_cells.len() - plan.redraw..] {
            cell.gl(api);
        }
        for cell in &to_cells[..plan.predraw] {
            cell.gl(api);
        }
        api.end_immediate();
        plan.skip
    }
}

/// Draw the cells `[begin, end)` of a segment, one call per restart run.
fn draw_runs<C: Cell>(entry: &SegmentEntry<C>, mode: PrimitiveMode, begin: usize, end: usize) {
    let len = entry.segment.len();
    let single_run = entry.restarts.is_empty()
        || (entry.restarts.len() == 1 && entry.restarts.contains(&len));
    if single_run {
        if end > begin {
            entry.segment.draw(mode, begin, Some(end - begin));
        }
        return;
    }

    let mut cursor = begin;
    let boundaries = entry
        .restarts
        .iter()
        .copied()
        .filter(|&r| r > begin && r < end)
        .chain(std::iter::once(end));
    for boundary in boundaries {
        if boundary > cursor {
            entry.segment.draw(mode, cursor, Some(boundary - cursor));
            cursor = boundary;
        }
    }
}
