/// Multi-pass frame renderer: shadow map, lit colour pass, then SSAO.
///
/// Passes run strictly in order on the calling thread; each one fans out
/// over the thread pool and returns only after its last task finished, so
/// the colour pass always sees a complete shadow map and SSAO a complete
/// depth buffer.
use crate::camera::Camera;
use crate::math;
use crate::mesh::Mesh;
use crate::perf::PerfTimer;
use crate::rendering::buffers::{DrawTarget, RenderBuffers};
use crate::rendering::rasterizer::{DrawStats, Rasterizer};
use crate::rendering::shader::{ShadowMap, Uniforms};
use crate::rendering::shaders::{DepthShader, Material, PhongConfig, PhongShader};
use crate::rendering::ssao::{self, SsaoConfig, SsaoKernel};
use crate::thread_pool::ThreadPool;
use glam::{Mat4, Vec3};
use std::sync::Arc;
use std::time::Duration;

/// One placed copy of a mesh. Meshes and materials are shared so many
/// instances can reuse the same data.
#[derive(Debug, Clone)]
pub struct ModelInstance {
    pub mesh: Arc<Mesh>,
    pub material: Arc<Material>,
    pub transform: Mat4,
}

impl ModelInstance {
    pub fn new(mesh: Arc<Mesh>, material: Arc<Material>) -> Self {
        Self {
            mesh,
            material,
            transform: Mat4::IDENTITY,
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Scene {
    pub models: Vec<ModelInstance>,
    pub camera: Camera,
    /// The light looks from here at `camera.target`.
    pub light_position: Vec3,
}

impl Scene {
    pub fn new(camera: Camera, light_position: Vec3) -> Self {
        Self {
            models: Vec::new(),
            camera,
            light_position,
        }
    }

    pub fn add_model(&mut self, model: ModelInstance) {
        self.models.push(model);
    }

    /// Direction from the scene centre towards the light.
    pub fn light_dir(&self) -> Vec3 {
        (self.light_position - self.camera.target).normalize_or_zero()
    }

    /// Light projection × light view, shared by the shadow pass and the
    /// colour pass lookup.
    pub fn light_proj_view(&self, light_projection_distance: f32) -> Mat4 {
        let view = math::look_at(self.light_position, self.camera.target, self.camera.up);
        math::projection(light_projection_distance) * view
    }
}

/// Configuration for frame rendering
#[derive(Debug, Clone, Copy)]
pub struct RendererConfig {
    pub rasterizer: Rasterizer,
    pub phong: PhongConfig,
    /// `None` skips the ambient occlusion pass.
    pub ssao: Option<SsaoConfig>,
    /// Focal distance of the light's perspective projection.
    pub light_projection_distance: f32,
    /// Fraction of the frame left empty on each side of the camera viewport.
    pub viewport_margin: f32,
}

impl RendererConfig {
    /// Camera viewport for a `width`×`height` frame.
    pub fn camera_viewport(&self, width: usize, height: usize) -> Mat4 {
        let margin = self.viewport_margin.clamp(0.0, 0.49);
        let (w, h) = (width as f32, height as f32);
        math::viewport(
            w * margin,
            h * margin,
            w * (1.0 - 2.0 * margin),
            h * (1.0 - 2.0 * margin),
        )
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            rasterizer: Rasterizer::default(),
            phong: PhongConfig::default(),
            ssao: Some(SsaoConfig::default()),
            light_projection_distance: 3.0,
            viewport_margin: 0.125,
        }
    }
}

/// Per-pass timings and rasterizer counters of one frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub shadow: DrawStats,
    pub color: DrawStats,
    pub shadow_time: Duration,
    pub color_time: Duration,
    pub ssao_time: Duration,
    pub ssao_pixels: u64,
}

impl FrameStats {
    pub fn total_time(&self) -> Duration {
        self.shadow_time + self.color_time + self.ssao_time
    }
}

pub struct Renderer {
    config: RendererConfig,
    /// Built eagerly so worker threads only ever read it.
    ssao_kernel: Option<SsaoKernel>,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        let ssao_kernel = config
            .ssao
            .map(|ssao| SsaoKernel::new(ssao.samples, ssao.seed));
        Self {
            config,
            ssao_kernel,
        }
    }

    #[inline]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Render `scene` into `buffers`, which are reset first.
    pub fn render(
        &self,
        pool: &ThreadPool,
        scene: &Scene,
        buffers: &mut RenderBuffers,
    ) -> FrameStats {
        let mut stats = FrameStats::default();
        buffers.reset();

        let light_proj_view = scene.light_proj_view(self.config.light_projection_distance);

        log::info!("shadow pass: {} models", scene.models.len());
        let timer = PerfTimer::new("shadow pass");
        stats.shadow = self.shadow_pass(pool, scene, buffers, light_proj_view);
        stats.shadow_time = timer.elapsed();
        drop(timer);

        log::info!("color pass: {} models", scene.models.len());
        let timer = PerfTimer::new("color pass");
        stats.color = self.color_pass(pool, scene, buffers, light_proj_view);
        stats.color_time = timer.elapsed();
        drop(timer);

        if let (Some(config), Some(kernel)) = (&self.config.ssao, &self.ssao_kernel) {
            log::info!("ssao pass: {} samples", kernel.samples().len());
            let timer = PerfTimer::new("ssao pass");
            stats.ssao_pixels = ssao::apply(pool, &mut buffers.color, &buffers.depth, kernel, config);
            stats.ssao_time = timer.elapsed();
        }

        log::debug!(
            "frame: shadow {:?} ({} px), color {:?} ({} px), ssao {:?}",
            stats.shadow_time,
            stats.shadow.depth_passed,
            stats.color_time,
            stats.color.fragments_shaded,
            stats.ssao_time
        );
        stats
    }

    fn shadow_pass(
        &self,
        pool: &ThreadPool,
        scene: &Scene,
        buffers: &mut RenderBuffers,
        light_proj_view: Mat4,
    ) -> DrawStats {
        let shadow = &mut buffers.shadow;
        let viewport = math::viewport(0.0, 0.0, shadow.width() as f32, shadow.height() as f32);
        let mut total = DrawStats::default();

        for model in &scene.models {
            let uniforms = Uniforms {
                model: model.transform,
                model_view: light_proj_view * model.transform,
                projection: Mat4::IDENTITY,
                viewport,
                ..Default::default()
            };
            let shader = DepthShader::new(uniforms);
            let mut target = DrawTarget::depth_only(shadow);
            total += self
                .config
                .rasterizer
                .draw(pool, &model.mesh, &shader, &mut target);
        }
        total
    }

    fn color_pass(
        &self,
        pool: &ThreadPool,
        scene: &Scene,
        buffers: &mut RenderBuffers,
        light_proj_view: Mat4,
    ) -> DrawStats {
        let RenderBuffers {
            color,
            depth,
            normals,
            shadow,
            ..
        } = buffers;
        let shadow_map = ShadowMap {
            depth: shadow,
            light_proj_view,
        };

        let view = scene.camera.view_matrix();
        let projection = scene.camera.projection_matrix();
        let viewport = self.config.camera_viewport(color.width(), color.height());
        let light_dir = scene.light_dir();
        let mut total = DrawStats::default();

        for model in &scene.models {
            let uniforms = Uniforms {
                model: model.transform,
                model_view: view * model.transform,
                projection,
                viewport,
                normal_matrix: math::normal_matrix(&model.transform),
                light_dir,
                camera_pos: scene.camera.position,
                shadow: Some(shadow_map),
            };
            let shader = PhongShader::new(uniforms, &model.material, self.config.phong);
            let mut target = DrawTarget::new(depth, Some(&mut *color), normals.as_mut());
            total += self
                .config
                .rasterizer
                .draw(pool, &model.mesh, &shader, &mut target);
        }
        total
    }
}
