/// Software rasterization pipeline
/// Shading contract, tiled rasterizer, shaders and post-processing
pub mod buffers;
pub mod rasterizer;
pub mod shader;
pub mod shaders;
pub mod ssao;
pub mod texture;
pub mod tiles;

pub use buffers::{Color, ColorBuffer, DepthBuffer, DrawTarget, NormalBuffer, RenderBuffers};
pub use rasterizer::{barycentric, signed_area, BoundingBox, DrawStats, Rasterizer};
pub use shader::{FragmentOutput, Shader, ShadowMap, Uniforms, Varyings};
pub use shaders::{DepthShader, Material, PhongConfig, PhongShader};
pub use ssao::{SsaoConfig, SsaoKernel};
pub use texture::Texture;
pub use tiles::{TileGrid, TileRect, DEFAULT_TILE_SIZE};
