/// The two shaders the renderer ships with: a depth-only shader for the
/// shadow pass and a Phong shader with normal mapping and PCF shadows for
/// the colour pass.
use super::shader::{FragmentOutput, Shader, Uniforms, Varyings};
use super::texture::Texture;
use glam::{Vec2, Vec3};

/// Populates only screen position and `inv_w`; used to fill depth buffers.
pub struct DepthShader<'a> {
    pub uniforms: Uniforms<'a>,
}

impl<'a> DepthShader<'a> {
    pub fn new(uniforms: Uniforms<'a>) -> Self {
        Self { uniforms }
    }
}

impl Shader for DepthShader<'_> {
    fn vertex(&self, position: Vec3, _: Vec3, _: Vec2, _: Vec3, _: Vec3) -> Varyings {
        let (screen_pos, inv_w) = self.uniforms.project(position);
        Varyings {
            screen_pos,
            inv_w,
            ..Default::default()
        }
    }

    fn fragment(&self, _: &Varyings, _: &mut FragmentOutput) -> bool {
        true
    }

    fn is_depth_only(&self) -> bool {
        true
    }
}

/// Surface maps of a model. All maps are sampled with the same uv.
#[derive(Debug, Clone)]
pub struct Material {
    pub diffuse: Texture,
    /// Tangent-space normal map.
    pub normal: Texture,
    /// Red channel scales the specular term; `None` disables specular.
    pub specular: Option<Texture>,
    /// Discard texels whose diffuse alpha is below the configured threshold.
    pub alpha_test: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse: Texture::solid([255, 255, 255, 255]),
            normal: Texture::flat_normal(),
            specular: None,
            alpha_test: false,
        }
    }
}

impl Material {
    pub fn with_diffuse(diffuse: Texture) -> Self {
        Self {
            diffuse,
            ..Default::default()
        }
    }
}

/// Lighting constants of the Phong shader.
#[derive(Debug, Clone, Copy)]
pub struct PhongConfig {
    pub ambient: f32,
    pub specular_exponent: f32,
    /// Subtracted from the shadow-map depth before comparing; suppresses acne.
    pub shadow_bias: f32,
    /// PCF neighbourhood radius in texels (1 = 3x3).
    pub pcf_radius: i32,
    pub alpha_threshold: u8,
}

impl Default for PhongConfig {
    fn default() -> Self {
        Self {
            ambient: 0.2,
            specular_exponent: 10.0,
            shadow_bias: 0.005,
            pcf_radius: 1,
            alpha_threshold: 200,
        }
    }
}

pub struct PhongShader<'a> {
    pub uniforms: Uniforms<'a>,
    pub material: &'a Material,
    pub config: PhongConfig,
}

impl<'a> PhongShader<'a> {
    pub fn new(uniforms: Uniforms<'a>, material: &'a Material, config: PhongConfig) -> Self {
        Self {
            uniforms,
            material,
            config,
        }
    }
}

impl Shader for PhongShader<'_> {
    fn vertex(
        &self,
        position: Vec3,
        normal: Vec3,
        uv: Vec2,
        tangent: Vec3,
        bitangent: Vec3,
    ) -> Varyings {
        let u = &self.uniforms;
        let (screen_pos, inv_w) = u.project(position);
        let world = u.model.transform_point3(position);

        Varyings {
            screen_pos,
            uv: uv * inv_w,
            normal: (u.normal_matrix * normal).normalize_or_zero() * inv_w,
            world_pos: world * inv_w,
            tangent: (u.normal_matrix * tangent).normalize_or_zero() * inv_w,
            bitangent: (u.normal_matrix * bitangent).normalize_or_zero() * inv_w,
            inv_w,
        }
    }

    fn fragment(&self, varyings: &Varyings, out: &mut FragmentOutput) -> bool {
        if varyings.inv_w <= 0.0 {
            return true;
        }
        let u = &self.uniforms;
        let cfg = &self.config;
        let w = varyings.w();
        let uv = varyings.uv * w;
        let world_pos = varyings.world_pos * w;

        let shadow = u.shadow.map_or(1.0, |map| {
            map.visibility(world_pos, cfg.shadow_bias, cfg.pcf_radius)
        });

        let n = varyings.normal.normalize_or_zero();
        let t = varyings.tangent.normalize_or_zero();
        let b = varyings.bitangent.normalize_or_zero();
        let mapped = self.material.normal.sample_normal(uv);
        let mut normal = (t * mapped.x + b * mapped.y + n * mapped.z).normalize_or_zero();
        if normal == Vec3::ZERO {
            normal = n;
        }

        let l = u.light_dir.normalize_or_zero();
        let v = (u.camera_pos - world_pos).normalize_or_zero();
        let n_dot_l = normal.dot(l);
        let diffuse = n_dot_l.max(0.0) * shadow;

        let specular = match &self.material.specular {
            Some(map) => {
                let r = (normal * (2.0 * n_dot_l) - l).normalize_or_zero();
                let weight = map.sample(uv)[0] as f32 / 255.0;
                r.dot(v).max(0.0).powf(cfg.specular_exponent) * weight * shadow
            }
            None => 0.0,
        };

        let intensity = cfg.ambient + diffuse + specular;
        let texel = self.material.diffuse.sample(uv);
        for (dst, src) in out.color.iter_mut().zip(texel).take(3) {
            *dst = (src as f32 * intensity).min(255.0) as u8;
        }
        out.color[3] = 255;
        out.normal = Some(normal);

        self.material.alpha_test && texel[3] < cfg.alpha_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shade(shader: &PhongShader, varyings: &Varyings) -> (bool, FragmentOutput) {
        let mut out = FragmentOutput::default();
        let discard = shader.fragment(varyings, &mut out);
        (discard, out)
    }

    fn facing_up() -> Varyings {
        Varyings {
            normal: Vec3::Z,
            tangent: Vec3::X,
            bitangent: Vec3::Y,
            ..Default::default()
        }
    }

    #[test]
    fn depth_shader_only_projects() {
        let shader = DepthShader::new(Uniforms::default());
        let v = shader.vertex(Vec3::new(0.5, 0.25, 0.0), Vec3::Z, Vec2::ONE, Vec3::X, Vec3::Y);
        assert_eq!(v.screen_pos, Vec3::new(0.5, 0.25, 0.0));
        assert_eq!(v.uv, Vec2::ZERO);
        assert!(shader.is_depth_only());
        assert!(shader.fragment(&v, &mut FragmentOutput::default()));
    }

    #[test]
    fn no_light_gives_pure_ambient() {
        let material = Material::default();
        let shader = PhongShader::new(Uniforms::default(), &material, PhongConfig::default());
        let (discard, out) = shade(&shader, &facing_up());
        assert!(!discard);
        assert_eq!(out.color, [51, 51, 51, 255]);
        let normal = out.normal.unwrap();
        assert!((normal - Vec3::Z).length() < 0.01);
    }

    #[test]
    fn head_on_light_adds_full_diffuse() {
        let material = Material::with_diffuse(Texture::solid([100, 100, 100, 255]));
        let uniforms = Uniforms {
            light_dir: Vec3::Z,
            ..Default::default()
        };
        let shader = PhongShader::new(uniforms, &material, PhongConfig::default());
        let (_, out) = shade(&shader, &facing_up());
        // 100 * (0.2 + 1.0), less the flat map's 8-bit quantisation
        assert!((119..=120).contains(&out.color[0]));
    }

    #[test]
    fn intensity_saturates_at_white() {
        let material = Material {
            specular: Some(Texture::solid([255, 255, 255, 255])),
            ..Default::default()
        };
        let uniforms = Uniforms {
            light_dir: Vec3::Z,
            camera_pos: Vec3::new(0.0, 0.0, 5.0),
            ..Default::default()
        };
        let shader = PhongShader::new(uniforms, &material, PhongConfig::default());
        let (_, out) = shade(&shader, &facing_up());
        assert_eq!(out.color, [255, 255, 255, 255]);
    }

    #[test]
    fn alpha_test_discards_transparent_texels() {
        let material = Material {
            diffuse: Texture::solid([255, 255, 255, 10]),
            alpha_test: true,
            ..Default::default()
        };
        let shader = PhongShader::new(Uniforms::default(), &material, PhongConfig::default());
        assert!(shade(&shader, &facing_up()).0);
    }
}
