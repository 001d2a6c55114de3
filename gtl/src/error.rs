//! Vertex buffer error types.

use thiserror::Error;

/// Errors reported by vertex buffers and graphics backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// A checked access was made past the end of the buffer.
    #[error("index {index} out of range for vertex buffer of length {len}")]
    OutOfRange { index: usize, len: usize },
    /// A reservation exceeded the largest representable buffer.
    #[error("cannot reserve {requested} vertices (maximum is {max})")]
    CapacityOverflow { requested: usize, max: usize },
    /// The backend failed to create a buffer object.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BufferError::OutOfRange { index: 7, len: 3 };
        assert_eq!(
            err.to_string(),
            "index 7 out of range for vertex buffer of length 3"
        );

        let err = BufferError::ResourceCreationFailed("no context".to_string());
        assert_eq!(err.to_string(), "resource creation failed: no context");
    }
}
