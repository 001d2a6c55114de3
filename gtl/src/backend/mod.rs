//! Graphics API abstraction layer.
//!
//! Vertex buffers never talk to a GPU API directly. Everything they need,
//! buffer objects, client array state, draw calls and immediate-mode
//! emission, goes through the [`GraphicsApi`] trait.
//!
//! # Available Backends
//!
//! - [`DummyBackend`]: No-op backend for development, logs every call
//! - [`RecordingBackend`]: Records every call for inspection in tests and tools
//!
//! Rendering code embedding these buffers provides its own implementation
//! over the context it owns.

pub mod dummy;
pub mod recording;

pub use dummy::DummyBackend;
pub use recording::{ApiCall, RecordingBackend};

use crate::component::{ClientArray, ComponentFormat};
use crate::error::BufferError;
use crate::topology::PrimitiveMode;

/// Handle to a GPU buffer object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

/// Graphics API trait consumed by vertex buffers.
///
/// All calls are issued from the rendering thread. Implementations must not
/// assume any call is ever made concurrently.
pub trait GraphicsApi: Send + Sync + 'static {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    /// Create a buffer object.
    fn create_buffer(&self) -> Result<BufferId, BufferError>;

    /// Release a buffer object.
    fn delete_buffer(&self, buffer: BufferId);

    /// Bind a buffer object as the vertex array source.
    fn bind_array_buffer(&self, buffer: BufferId);

    /// Replace the whole contents of a buffer object.
    fn buffer_data(&self, buffer: BufferId, data: &[u8]);

    /// Overwrite part of a buffer object starting at `offset` bytes.
    fn buffer_sub_data(&self, buffer: BufferId, offset: usize, data: &[u8]);

    /// Enable a client-side vertex array.
    fn enable_client_state(&self, array: ClientArray);

    /// Disable a client-side vertex array.
    fn disable_client_state(&self, array: ClientArray);

    /// Configure where a client array reads from in the bound buffer.
    fn attribute_pointer(
        &self,
        array: ClientArray,
        format: ComponentFormat,
        stride: usize,
        offset: usize,
    );

    /// Draw `count` vertices starting at `first` from the enabled arrays.
    fn draw_arrays(&self, mode: PrimitiveMode, first: usize, count: usize);

    /// Open an immediate-mode block.
    fn begin_immediate(&self, mode: PrimitiveMode);

    /// Emit one attribute of the current immediate-mode vertex.
    ///
    /// Emitting a [`ClientArray::Vertex`] attribute completes the vertex.
    fn immediate_attribute(&self, array: ClientArray, format: ComponentFormat, data: &[u8]);

    /// Close the current immediate-mode block.
    fn end_immediate(&self);

    /// GPU-recommended maximum number of vertices per buffer object.
    fn max_elements_vertices(&self) -> usize;
}
