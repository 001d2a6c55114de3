//! Recording graphics backend.
//!
//! Every call is appended to a call log and applied to a small CPU-side model
//! of the GPU state: live buffer objects and their contents, the bound array
//! buffer, and the enabled client arrays. Tests inspect the log to verify
//! draw partitioning, bridging and deferred deletion.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::backend::{BufferId, GraphicsApi};
use crate::component::{ClientArray, ClientState, ComponentFormat};
use crate::error::BufferError;
use crate::topology::PrimitiveMode;

/// One recorded graphics API call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    CreateBuffer(BufferId),
    DeleteBuffer(BufferId),
    BindArrayBuffer(BufferId),
    BufferData {
        buffer: BufferId,
        len: usize,
    },
    BufferSubData {
        buffer: BufferId,
        offset: usize,
        len: usize,
    },
    EnableClientState(ClientArray),
    DisableClientState(ClientArray),
    AttributePointer {
        array: ClientArray,
        format: ComponentFormat,
        stride: usize,
        offset: usize,
    },
    DrawArrays {
        buffer: Option<BufferId>,
        mode: PrimitiveMode,
        first: usize,
        count: usize,
    },
    BeginImmediate(PrimitiveMode),
    ImmediateAttribute {
        array: ClientArray,
        data: Vec<u8>,
    },
    EndImmediate,
}

/// A draw call extracted from the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    /// Buffer object bound when the call was issued.
    pub buffer: Option<BufferId>,
    /// Topology of the call.
    pub mode: PrimitiveMode,
    /// First vertex drawn.
    pub first: usize,
    /// Number of vertices drawn.
    pub count: usize,
}

/// An immediate-mode block extracted from the call log.
#[derive(Debug, Clone, PartialEq)]
pub struct ImmediateBlock {
    /// Topology of the block.
    pub mode: PrimitiveMode,
    /// Raw bytes of each emitted position attribute, in emission order.
    pub vertices: Vec<Vec<u8>>,
}

#[derive(Debug, Default)]
struct RecorderState {
    calls: Vec<ApiCall>,
    next_buffer: u64,
    bound: Option<BufferId>,
    buffers: HashMap<BufferId, Vec<u8>>,
    enabled: ClientState,
    immediate: Option<PrimitiveMode>,
}

/// Graphics backend that records every call.
#[derive(Debug)]
pub struct RecordingBackend {
    state: Mutex<RecorderState>,
    max_vertices: usize,
    buffer_limit: Option<usize>,
}

impl RecordingBackend {
    /// Create a recording backend reporting the given suggested vertex limit.
    pub fn new(max_vertices: usize) -> Self {
        Self {
            state: Mutex::new(RecorderState {
                next_buffer: 1,
                ..Default::default()
            }),
            max_vertices,
            buffer_limit: None,
        }
    }

    /// Fail buffer creation once `limit` buffer objects are live.
    pub fn with_buffer_limit(mut self, limit: usize) -> Self {
        self.buffer_limit = Some(limit);
        self
    }

    /// Get a copy of the call log.
    pub fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().calls.clone()
    }

    /// Take the call log, leaving it empty. The GPU state model is kept.
    pub fn take_calls(&self) -> Vec<ApiCall> {
        std::mem::take(&mut self.state.lock().calls)
    }

    /// Get every draw call in the log, in order.
    pub fn draw_calls(&self) -> Vec<DrawCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match *call {
                ApiCall::DrawArrays {
                    buffer,
                    mode,
                    first,
                    count,
                } => Some(DrawCall {
                    buffer,
                    mode,
                    first,
                    count,
                }),
                _ => None,
            })
            .collect()
    }

    /// Get every immediate-mode block in the log, in order.
    pub fn immediate_blocks(&self) -> Vec<ImmediateBlock> {
        let state = self.state.lock();
        let mut blocks = Vec::new();
        let mut current: Option<ImmediateBlock> = None;
        for call in &state.calls {
            match call {
                ApiCall::BeginImmediate(mode) => {
                    current = Some(ImmediateBlock {
                        mode: *mode,
                        vertices: Vec::new(),
                    });
                }
                ApiCall::ImmediateAttribute {
                    array: ClientArray::Vertex,
                    data,
                } => {
                    if let Some(block) = current.as_mut() {
                        block.vertices.push(data.clone());
                    }
                }
                ApiCall::EndImmediate => {
                    if let Some(block) = current.take() {
                        blocks.push(block);
                    }
                }
                _ => {}
            }
        }
        blocks
    }

    /// Count the calls matching a predicate.
    pub fn count_calls(&self, predicate: impl Fn(&ApiCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    /// Get the buffer objects that have been created and not yet deleted.
    pub fn live_buffers(&self) -> Vec<BufferId> {
        let mut ids: Vec<_> = self.state.lock().buffers.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Get the uploaded contents of a live buffer object.
    pub fn buffer_contents(&self, buffer: BufferId) -> Option<Vec<u8>> {
        self.state.lock().buffers.get(&buffer).cloned()
    }

    /// Get the currently enabled client arrays.
    pub fn enabled_arrays(&self) -> ClientState {
        self.state.lock().enabled
    }

    /// Get the currently bound array buffer.
    pub fn bound_buffer(&self) -> Option<BufferId> {
        self.state.lock().bound
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new(usize::MAX)
    }
}

impl GraphicsApi for RecordingBackend {
    fn name(&self) -> &'static str {
        "Recording"
    }

    fn create_buffer(&self) -> Result<BufferId, BufferError> {
        let mut state = self.state.lock();
        if let Some(limit) = self.buffer_limit {
            if state.buffers.len() >= limit {
                return Err(BufferError::ResourceCreationFailed(format!(
                    "out of buffer objects ({} live)",
                    limit
                )));
            }
        }
        let id = BufferId(state.next_buffer);
        state.next_buffer += 1;
        state.buffers.insert(id, Vec::new());
        state.calls.push(ApiCall::CreateBuffer(id));
        Ok(id)
    }

    fn delete_buffer(&self, buffer: BufferId) {
        let mut state = self.state.lock();
        if state.buffers.remove(&buffer).is_none() {
            log::warn!("RecordingBackend: deleting unknown buffer {:?}", buffer);
        }
        if state.bound == Some(buffer) {
            state.bound = None;
        }
        state.calls.push(ApiCall::DeleteBuffer(buffer));
    }

    fn bind_array_buffer(&self, buffer: BufferId) {
        let mut state = self.state.lock();
        state.bound = Some(buffer);
        state.calls.push(ApiCall::BindArrayBuffer(buffer));
    }

    fn buffer_data(&self, buffer: BufferId, data: &[u8]) {
        let mut state = self.state.lock();
        state.buffers.insert(buffer, data.to_vec());
        state.calls.push(ApiCall::BufferData {
            buffer,
            len: data.len(),
        });
    }

    fn buffer_sub_data(&self, buffer: BufferId, offset: usize, data: &[u8]) {
        let mut state = self.state.lock();
        let contents = state.buffers.entry(buffer).or_default();
        let end = offset + data.len();
        if contents.len() < end {
            log::warn!(
                "RecordingBackend: sub data past end of {:?} ({} > {})",
                buffer,
                end,
                contents.len()
            );
            contents.resize(end, 0);
        }
        contents[offset..end].copy_from_slice(data);
        state.calls.push(ApiCall::BufferSubData {
            buffer,
            offset,
            len: data.len(),
        });
    }

    fn enable_client_state(&self, array: ClientArray) {
        let mut state = self.state.lock();
        state.enabled |= array.state();
        state.calls.push(ApiCall::EnableClientState(array));
    }

    fn disable_client_state(&self, array: ClientArray) {
        let mut state = self.state.lock();
        state.enabled.remove(array.state());
        state.calls.push(ApiCall::DisableClientState(array));
    }

    fn attribute_pointer(
        &self,
        array: ClientArray,
        format: ComponentFormat,
        stride: usize,
        offset: usize,
    ) {
        self.state.lock().calls.push(ApiCall::AttributePointer {
            array,
            format,
            stride,
            offset,
        });
    }

    fn draw_arrays(&self, mode: PrimitiveMode, first: usize, count: usize) {
        let mut state = self.state.lock();
        let buffer = state.bound;
        state.calls.push(ApiCall::DrawArrays {
            buffer,
            mode,
            first,
            count,
        });
    }

    fn begin_immediate(&self, mode: PrimitiveMode) {
        let mut state = self.state.lock();
        if let Some(open) = state.immediate {
            log::warn!("RecordingBackend: nested immediate block (open: {})", open);
        }
        state.immediate = Some(mode);
        state.calls.push(ApiCall::BeginImmediate(mode));
    }

    fn immediate_attribute(&self, array: ClientArray, _format: ComponentFormat, data: &[u8]) {
        self.state.lock().calls.push(ApiCall::ImmediateAttribute {
            array,
            data: data.to_vec(),
        });
    }

    fn end_immediate(&self) {
        let mut state = self.state.lock();
        state.immediate = None;
        state.calls.push(ApiCall::EndImmediate);
    }

    fn max_elements_vertices(&self) -> usize {
        self.max_vertices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ScalarType;

    #[test]
    fn test_buffer_lifecycle() {
        let backend = RecordingBackend::default();
        let id = backend.create_buffer().unwrap();
        assert_eq!(backend.live_buffers(), vec![id]);

        backend.bind_array_buffer(id);
        backend.buffer_data(id, &[1, 2, 3, 4]);
        backend.buffer_sub_data(id, 2, &[9, 9]);
        assert_eq!(backend.buffer_contents(id), Some(vec![1, 2, 9, 9]));

        backend.delete_buffer(id);
        assert!(backend.live_buffers().is_empty());
        assert_eq!(backend.bound_buffer(), None);
    }

    #[test]
    fn test_draw_calls_capture_bound_buffer() {
        let backend = RecordingBackend::default();
        let id = backend.create_buffer().unwrap();
        backend.bind_array_buffer(id);
        backend.draw_arrays(PrimitiveMode::Triangles, 3, 6);

        let draws = backend.draw_calls();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].buffer, Some(id));
        assert_eq!((draws[0].first, draws[0].count), (3, 6));
    }

    #[test]
    fn test_immediate_blocks() {
        let backend = RecordingBackend::default();
        let format = ComponentFormat::new(ScalarType::U8, 1);
        backend.begin_immediate(PrimitiveMode::TriangleStrip);
        backend.immediate_attribute(ClientArray::Color, format, &[7]);
        backend.immediate_attribute(ClientArray::Vertex, format, &[1]);
        backend.immediate_attribute(ClientArray::Vertex, format, &[2]);
        backend.end_immediate();

        let blocks = backend.immediate_blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].mode, PrimitiveMode::TriangleStrip);
        assert_eq!(blocks[0].vertices, vec![vec![1], vec![2]]);
    }

    #[test]
    fn test_client_state_tracking() {
        let backend = RecordingBackend::default();
        backend.enable_client_state(ClientArray::Vertex);
        backend.enable_client_state(ClientArray::Normal);
        backend.disable_client_state(ClientArray::Vertex);
        assert_eq!(backend.enabled_arrays(), ClientState::NORMAL);
    }
}
