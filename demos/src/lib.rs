//! # gtl Demos
//!
//! Command line demos for the gtl vertex buffers.
//!
//! ## Available Demos
//!
//! - `vertex_buffer_demo` - Builds a segmented strip and logs the graphics calls it issues

use gtl::PrimitiveMode;

/// Demos library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Primitive mode selection for CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CliMode {
    Points,
    Lines,
    LineStrip,
    LineLoop,
    Triangles,
    #[default]
    TriangleStrip,
    TriangleFan,
    Quads,
    QuadStrip,
    Polygon,
}

impl From<CliMode> for PrimitiveMode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Points => PrimitiveMode::Points,
            CliMode::Lines => PrimitiveMode::Lines,
            CliMode::LineStrip => PrimitiveMode::LineStrip,
            CliMode::LineLoop => PrimitiveMode::LineLoop,
            CliMode::Triangles => PrimitiveMode::Triangles,
            CliMode::TriangleStrip => PrimitiveMode::TriangleStrip,
            CliMode::TriangleFan => PrimitiveMode::TriangleFan,
            CliMode::Quads => PrimitiveMode::Quads,
            CliMode::QuadStrip => PrimitiveMode::QuadStrip,
            CliMode::Polygon => PrimitiveMode::Polygon,
        }
    }
}
