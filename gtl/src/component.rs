//! Vertex attribute components.
//!
//! A component is one attribute of a vertex (position, normal, colour or
//! texture coordinate) stored as a small fixed-size array of scalars. Each
//! component type knows which client-side array it feeds, how it is laid out,
//! and how to emit itself in immediate mode.

use bitflags::bitflags;

use crate::backend::GraphicsApi;

/// Client-side vertex array an attribute feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientArray {
    /// Vertex positions.
    Vertex,
    /// Vertex normals.
    Normal,
    /// Vertex colours.
    Color,
    /// Texture coordinates.
    TexCoord,
}

impl ClientArray {
    /// Get the state flag matching this array.
    pub fn state(&self) -> ClientState {
        match self {
            Self::Vertex => ClientState::VERTEX,
            Self::Normal => ClientState::NORMAL,
            Self::Color => ClientState::COLOR,
            Self::TexCoord => ClientState::TEX_COORD,
        }
    }
}

bitflags! {
    /// Set of enabled client-side vertex arrays.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClientState: u32 {
        /// Vertex position array.
        const VERTEX = 1 << 0;
        /// Normal array.
        const NORMAL = 1 << 1;
        /// Colour array.
        const COLOR = 1 << 2;
        /// Texture coordinate array.
        const TEX_COORD = 1 << 3;
    }
}

impl Default for ClientState {
    fn default() -> Self {
        Self::empty()
    }
}

/// Scalar type of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// 32-bit float.
    F32,
    /// 8-bit unsigned integer (normalized when used as a colour).
    U8,
}

impl ScalarType {
    /// Get the size in bytes of one scalar.
    pub const fn size(&self) -> usize {
        match self {
            Self::F32 => 4,
            Self::U8 => 1,
        }
    }
}

/// Layout of a component: scalar type and scalar count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentFormat {
    /// Scalar type.
    pub scalar: ScalarType,
    /// Number of scalars (1 to 4).
    pub count: u8,
}

impl ComponentFormat {
    /// Create a new component format.
    pub const fn new(scalar: ScalarType, count: u8) -> Self {
        Self { scalar, count }
    }

    /// Get the size in bytes of this format.
    pub const fn size(&self) -> usize {
        self.scalar.size() * self.count as usize
    }
}

/// A vertex attribute that can be stored in a vertex buffer.
///
/// The provided methods form the capability contract the buffers rely on:
/// client-state enable/disable, attribute pointer setup, and immediate-mode
/// emission.
pub trait VertexComponent:
    bytemuck::Pod + Default + PartialEq + std::fmt::Debug + Send + Sync
{
    /// Client array this component feeds.
    const ARRAY: ClientArray;
    /// Memory layout of this component.
    const FORMAT: ComponentFormat;

    /// Enable the client array for this component.
    fn enable_client_state(api: &dyn GraphicsApi) {
        api.enable_client_state(Self::ARRAY);
    }

    /// Disable the client array for this component.
    fn disable_client_state(api: &dyn GraphicsApi) {
        api.disable_client_state(Self::ARRAY);
    }

    /// Point the client array at `offset` bytes into each `stride`-byte vertex
    /// of the bound buffer.
    fn pointer(api: &dyn GraphicsApi, stride: usize, offset: usize) {
        api.attribute_pointer(Self::ARRAY, Self::FORMAT, stride, offset);
    }

    /// Emit this component in immediate mode.
    fn gl(&self, api: &dyn GraphicsApi) {
        api.immediate_attribute(Self::ARRAY, Self::FORMAT, bytemuck::bytes_of(self));
    }
}

macro_rules! vertex_component {
    ($(#[$meta:meta])* $name:ident, $array:ident, $scalar:ty, $kind:ident, $count:literal) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
        pub struct $name(pub [$scalar; $count]);

        impl $name {
            /// Create a new component from its scalars.
            pub const fn new(values: [$scalar; $count]) -> Self {
                Self(values)
            }
        }

        impl From<[$scalar; $count]> for $name {
            fn from(values: [$scalar; $count]) -> Self {
                Self(values)
            }
        }

        impl VertexComponent for $name {
            const ARRAY: ClientArray = ClientArray::$array;
            const FORMAT: ComponentFormat = ComponentFormat::new(ScalarType::$kind, $count);
        }

        static_assertions::const_assert_eq!(
            std::mem::size_of::<$name>(),
            <$name as VertexComponent>::FORMAT.size()
        );
    };
}

vertex_component!(
    /// 2D position.
    Vertex2f, Vertex, f32, F32, 2
);
vertex_component!(
    /// 3D position.
    Vertex3f, Vertex, f32, F32, 3
);
vertex_component!(
    /// Homogeneous position.
    Vertex4f, Vertex, f32, F32, 4
);
vertex_component!(
    /// Vertex normal.
    Normal3f, Normal, f32, F32, 3
);
vertex_component!(
    /// RGB float colour.
    Color3f, Color, f32, F32, 3
);
vertex_component!(
    /// RGBA float colour.
    Color4f, Color, f32, F32, 4
);
vertex_component!(
    /// RGB byte colour.
    Color3ub, Color, u8, U8, 3
);
vertex_component!(
    /// RGBA byte colour.
    Color4ub, Color, u8, U8, 4
);
vertex_component!(
    /// 2D texture coordinate.
    TexCoord2f, TexCoord, f32, F32, 2
);
vertex_component!(
    /// 4D texture coordinate.
    TexCoord4f, TexCoord, f32, F32, 4
);
