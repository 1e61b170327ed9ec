/// hwraster core library - mesh export and software preview for a
/// fixed-function FPGA rasterizer
///
/// Meshes are normalised, encoded as Q16.16 memory images the hardware loads
/// at start-up, and rendered in software with the same transform, culling,
/// painter's ordering and affine texturing the hardware performs.

pub mod atlas;
pub mod error;
pub mod fixed;
pub mod geometry;
pub mod memfile;
pub mod obj;
pub mod pipeline;
pub mod projection;
pub mod raster;
pub mod transform;
pub mod visibility;

// Re-export commonly used types
pub use atlas::{AtlasProvider, GridPalette, MaterialAllocator, Passthrough, TextureAtlas, VerticalStrips};
pub use error::{Error, Result};
pub use geometry::{Face, Mat4, MaterialId, Mesh, Vec2, Vec3, Vertex};
pub use pipeline::{Frame, FrameStats, PipelineConfig, Renderer};
pub use projection::{Camera, ScreenVertex, VerticalConvention, Viewport};
pub use raster::{Canvas, Coverage, Rgb};
pub use transform::{RotationState, Transform};
pub use visibility::{CullMode, DepthOrder};
