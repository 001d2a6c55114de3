//! Common utilities for vertex buffer integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use gtl::cell::{cells_to_bytes, V2f};
use gtl::component::Vertex2f;
use gtl::{DummyBackend, GraphicsApi, LogicalBuffer, RecordingBackend, VertexBufferDescriptor};

/// Initialize logging once per test binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Backend Enumeration
// ============================================================================

/// Available graphics backends for testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// No-op backend that only logs.
    Dummy,
    /// Backend recording every call.
    Recording,
}

/// Test context holding a backend and, for the recording backend, a handle
/// to inspect its calls.
pub struct TestContext {
    pub api: Arc<dyn GraphicsApi>,
    pub recorder: Option<Arc<RecordingBackend>>,
}

impl TestContext {
    /// Create a context whose backend suggests `max_vertices` per buffer.
    pub fn new(backend: Backend, max_vertices: usize) -> Self {
        init_logging();
        match backend {
            Backend::Dummy => Self {
                api: Arc::new(DummyBackend::with_max_vertices(max_vertices)),
                recorder: None,
            },
            Backend::Recording => {
                let recorder = Arc::new(RecordingBackend::new(max_vertices));
                Self {
                    api: recorder.clone(),
                    recorder: Some(recorder),
                }
            }
        }
    }

    /// Create an empty buffer on this context's backend.
    pub fn buffer(&self) -> LogicalBuffer<V2f> {
        LogicalBuffer::with_descriptor(
            self.api.clone(),
            &VertexBufferDescriptor::new().with_label("test"),
        )
    }
}

/// Create a recording backend and an empty buffer with a fixed segment limit.
pub fn recorded_buffer(limit: usize) -> (Arc<RecordingBackend>, LogicalBuffer<V2f>) {
    init_logging();
    let recorder = Arc::new(RecordingBackend::default());
    let buffer = LogicalBuffer::with_descriptor(
        recorder.clone(),
        &VertexBufferDescriptor::new().with_segment_limit(limit),
    );
    (recorder, buffer)
}

// ============================================================================
// Cells
// ============================================================================

/// A cell whose x coordinate carries `tag`.
pub fn tagged(tag: usize) -> V2f {
    (Vertex2f::new([tag as f32, 0.0]),)
}

/// Read back the tag of a cell built by [`tagged`].
pub fn tag(cell: &V2f) -> usize {
    cell.0 .0[0] as usize
}

/// Tags of every cell of a buffer, in logical order.
pub fn tags(buffer: &LogicalBuffer<V2f>) -> Vec<usize> {
    buffer.iter().map(tag).collect()
}

/// Decode the tag from the raw position bytes of an immediate-mode vertex.
pub fn tag_from_bytes(bytes: &[u8]) -> usize {
    let position: [f32; 2] = bytemuck::pod_read_unaligned(bytes);
    position[0] as usize
}

// ============================================================================
// Invariant Checks
// ============================================================================

/// Assert that every segment starts where the previous one ends and that the
/// buffer length is the sum of the segment lengths.
pub fn assert_contiguous(buffer: &LogicalBuffer<V2f>) {
    let mut expected_start = 0;
    for segment in buffer.segments() {
        assert_eq!(
            segment.start, expected_start,
            "segment starts at {} but the previous one ends at {}",
            segment.start, expected_start
        );
        expected_start += segment.cells.len();
    }
    assert_eq!(buffer.len(), expected_start);
}

/// Assert that every enabled segment's buffer object holds its cells.
pub fn assert_uploaded(recorder: &RecordingBackend, buffer: &LogicalBuffer<V2f>) {
    for segment in buffer.segments() {
        if let Some(id) = segment.buffer {
            assert_eq!(
                recorder.buffer_contents(id),
                Some(cells_to_bytes(segment.cells)),
                "segment at {} is out of date on the GPU",
                segment.start
            );
        }
    }
}
