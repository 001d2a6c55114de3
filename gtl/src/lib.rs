//! # gtl
//!
//! Segmented GPU vertex buffers.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`LogicalBuffer`] - One contiguous vertex sequence stored across GPU buffer segments
//! - [`PhysicalSegment`] - A growable cell array backed by a single GPU buffer object
//! - [`Cell`] - Interleaved vertex layouts built from attribute [`component`]s
//! - [`GraphicsApi`] - Trait for the graphics API the buffers draw through
//! - Dummy and recording backends for running without a graphics context
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gtl::{LogicalBuffer, RecordingBackend, PrimitiveMode, VertexBufferDescriptor};
//! use gtl::cell::V2f;
//! use gtl::component::Vertex2f;
//!
//! let api = Arc::new(RecordingBackend::new(4096));
//! let mut strip: LogicalBuffer<V2f> = LogicalBuffer::with_descriptor(
//!     api,
//!     &VertexBufferDescriptor::new().with_label("strip"),
//! );
//! for i in 0..10 {
//!     strip.push_back((Vertex2f::new([i as f32, (i % 2) as f32]),));
//! }
//! strip.hard_reset(None);
//! strip.push_back((Vertex2f::new([0.0, 5.0]),));
//! strip.render(Some(PrimitiveMode::TriangleStrip), 0, None)?;
//! ```

pub mod backend;
pub mod cell;
pub mod component;
pub mod descriptor;
pub mod error;
pub mod logical;
pub mod segment;
pub mod topology;

// Re-export main types for convenience
pub use backend::{BufferId, DummyBackend, GraphicsApi, RecordingBackend};
pub use cell::Cell;
pub use component::VertexComponent;
pub use descriptor::VertexBufferDescriptor;
pub use error::BufferError;
pub use logical::{Cursor, Iter, IterMut, LogicalBuffer, SegmentRef};
pub use segment::PhysicalSegment;
pub use topology::{BridgePlan, PrimitiveMode};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library.
///
/// Only logs the version; buffers need no global setup.
pub fn init() {
    log::info!("gtl v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_init() {
        init();
    }
}
