//! Dummy graphics backend for development.
//!
//! This backend doesn't perform any GPU work but provides a valid
//! implementation so buffers can be exercised without a graphics context.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::backend::{BufferId, GraphicsApi};
use crate::component::{ClientArray, ComponentFormat};
use crate::error::BufferError;
use crate::topology::PrimitiveMode;

/// Dummy graphics backend.
#[derive(Debug)]
pub struct DummyBackend {
    next_buffer: AtomicU64,
    max_vertices: usize,
}

impl DummyBackend {
    /// Suggested vertex limit reported when none is configured.
    pub const DEFAULT_MAX_VERTICES: usize = 1 << 16;

    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self::with_max_vertices(Self::DEFAULT_MAX_VERTICES)
    }

    /// Create a dummy backend reporting the given suggested vertex limit.
    pub fn with_max_vertices(max_vertices: usize) -> Self {
        Self {
            next_buffer: AtomicU64::new(1),
            max_vertices,
        }
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsApi for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy"
    }

    fn create_buffer(&self) -> Result<BufferId, BufferError> {
        let id = BufferId(self.next_buffer.fetch_add(1, Ordering::Relaxed));
        log::trace!("DummyBackend: create_buffer {:?}", id);
        Ok(id)
    }

    fn delete_buffer(&self, buffer: BufferId) {
        log::trace!("DummyBackend: delete_buffer {:?}", buffer);
    }

    fn bind_array_buffer(&self, buffer: BufferId) {
        log::trace!("DummyBackend: bind_array_buffer {:?}", buffer);
    }

    fn buffer_data(&self, buffer: BufferId, data: &[u8]) {
        log::trace!("DummyBackend: buffer_data {:?} len={}", buffer, data.len());
    }

    fn buffer_sub_data(&self, buffer: BufferId, offset: usize, data: &[u8]) {
        log::trace!(
            "DummyBackend: buffer_sub_data {:?} offset={} len={}",
            buffer,
            offset,
            data.len()
        );
    }

    fn enable_client_state(&self, array: ClientArray) {
        log::trace!("DummyBackend: enable_client_state {:?}", array);
    }

    fn disable_client_state(&self, array: ClientArray) {
        log::trace!("DummyBackend: disable_client_state {:?}", array);
    }

    fn attribute_pointer(
        &self,
        array: ClientArray,
        format: ComponentFormat,
        stride: usize,
        offset: usize,
    ) {
        log::trace!(
            "DummyBackend: attribute_pointer {:?} {:?} stride={} offset={}",
            array,
            format,
            stride,
            offset
        );
    }

    fn draw_arrays(&self, mode: PrimitiveMode, first: usize, count: usize) {
        log::trace!("DummyBackend: draw_arrays {} first={} count={}", mode, first, count);
    }

    fn begin_immediate(&self, mode: PrimitiveMode) {
        log::trace!("DummyBackend: begin_immediate {}", mode);
    }

    fn immediate_attribute(&self, array: ClientArray, _format: ComponentFormat, data: &[u8]) {
        log::trace!("DummyBackend: immediate_attribute {:?} len={}", array, data.len());
    }

    fn end_immediate(&self) {
        log::trace!("DummyBackend: end_immediate");
    }

    fn max_elements_vertices(&self) -> usize {
        self.max_vertices
    }
}
