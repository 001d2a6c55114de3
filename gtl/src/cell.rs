//! Vertex cells.
//!
//! A cell is one vertex worth of interleaved attributes: a tuple of one to
//! four [`VertexComponent`]s. Cells are plain values; setting a cell is tuple
//! construction and reading it back is tuple destructuring.
//!
//! # Example
//!
//! ```ignore
//! use gtl::cell::C4ubV3f;
//! use gtl::component::{Color4ub, Vertex3f};
//!
//! let cell: C4ubV3f = (Color4ub::new([255, 0, 0, 255]), Vertex3f::new([0.0, 1.0, 0.0]));
//! let (color, position) = cell;
//! ```

use crate::backend::GraphicsApi;
use crate::component::{
    Color3f, Color3ub, Color4f, Color4ub, Normal3f, TexCoord2f, TexCoord4f, Vertex2f, Vertex3f,
    Vertex4f, VertexComponent,
};

/// One interleaved vertex stored in a vertex buffer.
///
/// Implemented for tuples of one to four [`VertexComponent`]s. Every
/// per-component operation visits the components in tuple order.
pub trait Cell: Copy + Default + PartialEq + std::fmt::Debug + Send + Sync + 'static {
    /// Number of components in the cell.
    const ARITY: usize;

    /// Size in bytes of one interleaved cell on the GPU.
    const STRIDE: usize;

    /// Enable the client array of every component.
    fn enable(api: &dyn GraphicsApi);

    /// Point every component's client array into the bound buffer.
    fn pointers(api: &dyn GraphicsApi);

    /// Disable the client array of every component.
    fn disable(api: &dyn GraphicsApi);

    /// Emit this cell in immediate mode.
    fn gl(&self, api: &dyn GraphicsApi);

    /// Append the interleaved byte representation of this cell.
    fn write_bytes(&self, out: &mut Vec<u8>);
}

/// Serialize a run of cells into their interleaved GPU representation.
pub fn cells_to_bytes<C: Cell>(cells: &[C]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(cells.len() * C::STRIDE);
    for cell in cells {
        cell.write_bytes(&mut bytes);
    }
    bytes
}

macro_rules! impl_cell {
    ($arity:literal; $($name:ident $idx:tt),+) => {
        impl<$($name: VertexComponent + 'static),+> Cell for ($($name,)+) {
            const ARITY: usize = $arity;
            const STRIDE: usize = 0 $(+ <$name as VertexComponent>::FORMAT.size())+;

            fn enable(api: &dyn GraphicsApi) {
                $($name::enable_client_state(api);)+
            }

            fn pointers(api: &dyn GraphicsApi) {
                let mut offset = 0;
                $(
                    $name::pointer(api, Self::STRIDE, offset);
                    offset += <$name as VertexComponent>::FORMAT.size();
                )+
                debug_assert_eq!(offset, Self::STRIDE);
            }

            fn disable(api: &dyn GraphicsApi) {
                $($name::disable_client_state(api);)+
            }

            fn gl(&self, api: &dyn GraphicsApi) {
                $(self.$idx.gl(api);)+
            }

            fn write_bytes(&self, out: &mut Vec<u8>) {
                $(out.extend_from_slice(bytemuck::bytes_of(&self.$idx));)+
            }
        }
    };
}

impl_cell!(1; A 0);
impl_cell!(2; A 0, B 1);
impl_cell!(3; A 0, B 1, C 2);
impl_cell!(4; A 0, B 1, C 2, D 3);

// ============================================================================
// Standard interleaved layouts
// ============================================================================

pub type V2f = (Vertex2f,);
pub type V3f = (Vertex3f,);
pub type C4ubV2f = (Color4ub, Vertex2f);
pub type C4ubV3f = (Color4ub, Vertex3f);
pub type C3fV3f = (Color3f, Vertex3f);
pub type N3fV3f = (Normal3f, Vertex3f);
pub type C4fN3fV3f = (Color4f, Normal3f, Vertex3f);
pub type T2fV3f = (TexCoord2f, Vertex3f);
pub type T4fV4f = (TexCoord4f, Vertex4f);
pub type T2fC4ubV3f = (TexCoord2f, Color4ub, Vertex3f);
pub type T2fC3fV3f = (TexCoord2f, Color3f, Vertex3f);
pub type T2fN3fV3f = (TexCoord2f, Normal3f, Vertex3f);
pub type T2fC4fN3fV3f = (TexCoord2f, Color4f, Normal3f, Vertex3f);
pub type T4fC4fN3fV4f = (TexCoord4f, Color4f, Normal3f, Vertex4f);

// Single attribute arrays
pub type N3f = (Normal3f,);
pub type C3f = (Color3f,);
pub type C4f = (Color4f,);
pub type C3ub = (Color3ub,);
pub type C4ub = (Color4ub,);
