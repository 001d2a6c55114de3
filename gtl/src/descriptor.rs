//! Vertex buffer descriptors.

use crate::topology::PrimitiveMode;

/// Descriptor for creating a logical vertex buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VertexBufferDescriptor {
    /// Debug label for the buffer.
    pub label: Option<String>,
    /// Mode used when rendering or hard resetting without an explicit mode.
    pub default_mode: PrimitiveMode,
    /// Maximum cells per segment at render time.
    ///
    /// `None` asks the graphics API for its suggested vertex count on the
    /// first render.
    pub segment_limit: Option<usize>,
}

impl VertexBufferDescriptor {
    /// Create a new descriptor with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the default primitive mode.
    pub fn with_default_mode(mut self, mode: PrimitiveMode) -> Self {
        self.default_mode = mode;
        self
    }

    /// Override the suggested vertex count per segment. Zero is treated as one.
    pub fn with_segment_limit(mut self, limit: usize) -> Self {
        self.segment_limit = Some(limit);
        self
    }
}
