//! Primitive topology and the policies that depend on it.
//!
//! Two places in the buffer code need to know how vertices group into
//! primitives:
//!
//! - **Hard resets** terminate the primitive in progress by trimming an
//!   incomplete primitive and padding with degenerate (repeated) vertices, so
//!   that a new, unrelated strip can follow in the same draw call.
//! - **Bridging** re-emits a handful of vertices around a segment boundary so
//!   that a strip keeps its state when the underlying storage is split across
//!   two GPU buffer objects.
//!
//! Modes without a policy here (points, lines, fans, polygons) are left
//! untouched: nothing is trimmed, repeated or bridged.

/// Topology used to assemble vertices into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveMode {
    /// Each vertex is a point.
    Points,
    /// Every pair of vertices is a line.
    Lines,
    /// Consecutive vertices form a connected polyline.
    LineStrip,
    /// A closed polyline.
    LineLoop,
    /// Every three vertices form a triangle.
    Triangles,
    /// Each vertex after the second forms a triangle with the previous two.
    #[default]
    TriangleStrip,
    /// Triangles sharing the first vertex.
    TriangleFan,
    /// Every four vertices form a quad.
    Quads,
    /// Each pair of vertices after the first pair forms a quad with the previous pair.
    QuadStrip,
    /// A single convex polygon.
    Polygon,
}

impl PrimitiveMode {
    /// Get the lowercase name of this mode.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Points => "points",
            Self::Lines => "lines",
            Self::LineStrip => "line_strip",
            Self::LineLoop => "line_loop",
            Self::Triangles => "triangles",
            Self::TriangleStrip => "triangle_strip",
            Self::TriangleFan => "triangle_fan",
            Self::Quads => "quads",
            Self::QuadStrip => "quad_strip",
            Self::Polygon => "polygon",
        }
    }
}

impl std::fmt::Display for PrimitiveMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Hard reset policy
// ============================================================================

/// Number of trailing vertices a hard reset discards from a run of `size`
/// vertices, so that no partial primitive is left behind.
pub fn hard_reset_discard(mode: PrimitiveMode, size: usize) -> usize {
    match mode {
        PrimitiveMode::Triangles => size % 3,
        PrimitiveMode::TriangleStrip => {
            if size < 3 {
                size
            } else {
                0
            }
        }
        PrimitiveMode::QuadStrip => {
            if size < 4 {
                size
            } else {
                size % 2
            }
        }
        PrimitiveMode::Quads => size % 4,
        _ => 0,
    }
}

/// Number of times the last remaining vertex is repeated once `remaining`
/// vertices survive the discard step. The parity term keeps the winding of
/// the following strip intact.
pub fn hard_reset_repeat_previous(mode: PrimitiveMode, remaining: usize) -> usize {
    match mode {
        PrimitiveMode::TriangleStrip if remaining > 0 => ((remaining - 1) % 2) + 1,
        PrimitiveMode::QuadStrip => 2,
        _ => 0,
    }
}

/// Number of times the incoming vertex is emitted ahead of the append itself.
pub fn hard_reset_repeat_next(mode: PrimitiveMode) -> usize {
    match mode {
        PrimitiveMode::TriangleStrip | PrimitiveMode::QuadStrip => 2,
        _ => 0,
    }
}

// ============================================================================
// Bridging policy
// ============================================================================

/// How many vertices to re-emit around a segment boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BridgePlan {
    /// Trailing vertices of the outgoing segment to re-emit.
    pub redraw: usize,
    /// Leading vertices of the incoming segment to emit.
    pub predraw: usize,
    /// Leading vertices of the incoming segment its first draw call skips.
    pub skip: usize,
}

impl BridgePlan {
    /// Compute the bridge for a primitive run of which `drawn` vertices have
    /// been issued when the boundary is reached.
    ///
    /// Returns `None` when nothing needs bridging: the mode has no policy, or
    /// no vertex of the current run precedes the boundary.
    ///
    /// Quad strips are bridged like triangle strips. Both advance one
    /// primitive per vertex pair parity, so the same trailing/leading counts
    /// keep the pairing of the continuous stream.
    pub fn for_mode(mode: PrimitiveMode, drawn: usize) -> Option<Self> {
        if drawn == 0 {
            return None;
        }
        match mode {
            PrimitiveMode::Triangles => {
                let redraw = drawn % 6;
                let predraw = 6 - redraw;
                Some(Self {
                    redraw,
                    predraw,
                    skip: predraw,
                })
            }
            PrimitiveMode::TriangleStrip | PrimitiveMode::QuadStrip => {
                let redraw = if drawn == 1 { 1 } else { (drawn % 2) + 2 };
                Some(Self {
                    redraw,
                    predraw: (redraw % 2) + 2,
                    skip: redraw % 2,
                })
            }
            PrimitiveMode::Quads => {
                let redraw = drawn % 4;
                let predraw = 4 - redraw;
                Some(Self {
                    redraw,
                    predraw,
                    skip: predraw,
                })
            }
            _ => None,
        }
    }

    /// Clamp the plan to the vertices actually available on either side of
    /// the boundary.
    pub fn clamped(self, available_before: usize, available_after: usize) -> Self {
        let predraw = self.predraw.min(available_after);
        Self {
            redraw: self.redraw.min(available_before),
            predraw,
            skip: self.skip.min(predraw),
        }
    }

    /// Total number of vertices emitted by the bridge.
    pub fn emitted(&self) -> usize {
        self.redraw + self.predraw
    }
}
