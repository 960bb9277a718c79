/// Soft Renderer - CPU multi-pass rasterizer
/// Shadow mapping, Phong shading and SSAO on a tiled, lock-free pipeline
pub mod camera;
pub mod error;
pub mod math;
pub mod mesh;
pub mod perf;
pub mod renderer;
pub mod rendering;
pub mod thread_pool;

pub use camera::Camera;
pub use error::{Error, Result};
pub use mesh::{Face, Mesh, TangentBasis};
pub use perf::{CounterSnapshot, FunctionCounters, FUNCTION_COUNTERS};
pub use renderer::{FrameStats, ModelInstance, Renderer, RendererConfig, Scene};
pub use rendering::{
    ColorBuffer, DepthBuffer, DrawStats, DrawTarget, Material, PhongConfig, Rasterizer,
    RenderBuffers, Shader, SsaoConfig, Texture,
};
pub use thread_pool::ThreadPool;
