/// Screen-space ambient occlusion over the main depth buffer.
///
/// Each foreground pixel probes a fixed kernel of 2D offsets, rotated by a
/// 4x4 tiled noise pattern, and counts the probes that land on geometry
/// nearer to the viewer (within `max_distance`). The colour is scaled by
/// `1 - min(1, ratio * strength)`. Work is split by contiguous row ranges.
use super::buffers::{ColorBuffer, DepthBuffer};
use crate::count_add;
#[cfg_attr(not(feature = "profiling"), allow(unused_imports))]
use crate::perf::FUNCTION_COUNTERS;
use crate::thread_pool::ThreadPool;
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const NOISE_DIM: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct SsaoConfig {
    pub samples: usize,
    /// Kernel radius in pixels.
    pub radius: f32,
    /// Minimum depth lead a probe needs to count as an occluder.
    pub bias: f32,
    /// Probes further than this in depth are unrelated geometry. Screen
    /// depth spans (-1, 0.5] for the default projection, and one world unit
    /// around a subject 3 units from the camera is roughly 0.15 of it.
    pub max_distance: f32,
    pub strength: f32,
    pub seed: u64,
}

impl Default for SsaoConfig {
    fn default() -> Self {
        Self {
            samples: 16,
            radius: 25.0,
            bias: 0.005,
            max_distance: 0.15,
            strength: 0.3,
            seed: 0x55A0,
        }
    }
}

/// Sample offsets and rotation noise. Built once, read-only afterwards.
#[derive(Debug, Clone)]
pub struct SsaoKernel {
    samples: Vec<Vec2>,
    noise: [Vec2; NOISE_DIM * NOISE_DIM],
}

fn random_direction(rng: &mut ChaCha8Rng) -> Vec2 {
    let v = Vec2::new(rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0));
    v.try_normalize().unwrap_or(Vec2::X)
}

impl SsaoKernel {
    /// Unit directions scaled from 0.1 up towards 1.0 so that early samples
    /// probe close to the pixel.
    pub fn new(sample_count: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let n = sample_count.max(1) as f32;
        let samples = (0..sample_count)
            .map(|i| random_direction(&mut rng) * (0.1 + 0.9 * i as f32 / n))
            .collect();
        let noise = std::array::from_fn(|_| random_direction(&mut rng));
        Self { samples, noise }
    }

    #[inline]
    pub fn samples(&self) -> &[Vec2] {
        &self.samples
    }

    /// Rotation for pixel `(x, y)`, repeating every 4 pixels.
    #[inline]
    pub fn rotation(&self, x: usize, y: usize) -> Vec2 {
        self.noise[(x % NOISE_DIM) + (y % NOISE_DIM) * NOISE_DIM]
    }
}

/// Colour multiplier for one pixel, or `None` for background pixels.
pub fn compute_pixel_occlusion(
    x: usize,
    y: usize,
    depth: &DepthBuffer,
    kernel: &SsaoKernel,
    config: &SsaoConfig,
) -> Option<f32> {
    let current = depth.get(x, y);
    if DepthBuffer::is_background(current) || kernel.samples().is_empty() {
        return None;
    }

    let rot = kernel.rotation(x, y);
    let (w, h) = (depth.width() as i64, depth.height() as i64);
    let mut occlusion = 0u32;

    for s in kernel.samples() {
        let r = rot.rotate(*s) * config.radius;
        let sx = x as i64 + r.x as i64;
        let sy = y as i64 + r.y as i64;
        if sx < 0 || sy < 0 || sx >= w || sy >= h {
            continue;
        }
        let sample = depth.get(sx as usize, sy as usize);
        if sample > current + config.bias && (sample - current).abs() < config.max_distance {
            occlusion += 1;
        }
    }

    let ratio = occlusion as f32 / kernel.samples().len() as f32;
    Some(1.0 - (ratio * config.strength).min(1.0))
}

/// Darken `color` in place. Returns the number of foreground pixels.
pub fn apply(
    pool: &ThreadPool,
    color: &mut ColorBuffer,
    depth: &DepthBuffer,
    kernel: &SsaoKernel,
    config: &SsaoConfig,
) -> u64 {
    assert_eq!(
        (color.width(), color.height()),
        (depth.width(), depth.height()),
        "color and depth buffer sizes differ"
    );
    let width = color.width();
    let height = color.height();
    if width == 0 || height == 0 {
        return 0;
    }

    let rows_per_task = height.div_ceil(pool.thread_count().max(1));
    let chunk_len = rows_per_task * width * 4;
    let shaded = std::sync::atomic::AtomicU64::new(0);

    pool.scope(|scope| {
        for (task, rows) in color.raw_mut().chunks_mut(chunk_len).enumerate() {
            let shaded = &shaded;
            scope.enqueue(move || {
                let first_row = task * rows_per_task;
                let mut count = 0u64;
                for (i, pixel) in rows.chunks_exact_mut(4).enumerate() {
                    let (x, y) = (i % width, first_row + i / width);
                    let Some(factor) = compute_pixel_occlusion(x, y, depth, kernel, config)
                    else {
                        continue;
                    };
                    for channel in &mut pixel[..3] {
                        *channel = (*channel as f32 * factor) as u8;
                    }
                    count += 1;
                }
                shaded.fetch_add(count, std::sync::atomic::Ordering::Relaxed);
            });
        }
    });

    let shaded = shaded.into_inner();
    count_add!(FUNCTION_COUNTERS.ssao_pixels, shaded);
    shaded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_is_reproducible_and_bounded() {
        let a = SsaoKernel::new(16, 7);
        let b = SsaoKernel::new(16, 7);
        assert_eq!(a.samples(), b.samples());
        for (i, s) in a.samples().iter().enumerate() {
            let expected = 0.1 + 0.9 * i as f32 / 16.0;
            assert!((s.length() - expected).abs() < 1e-4);
        }
        assert_eq!(a.rotation(1, 2), a.rotation(5, 6));
    }

    #[test]
    fn background_pixels_are_skipped() {
        let depth = DepthBuffer::new(8, 8);
        let kernel = SsaoKernel::new(16, 1);
        assert_eq!(
            compute_pixel_occlusion(3, 3, &depth, &kernel, &SsaoConfig::default()),
            None
        );
    }

    #[test]
    fn flat_depth_is_unoccluded() {
        let mut depth = DepthBuffer::new(16, 16);
        for y in 0..16 {
            for x in 0..16 {
                depth.set(x, y, 0.5);
            }
        }
        let kernel = SsaoKernel::new(16, 1);
        let factor = compute_pixel_occlusion(8, 8, &depth, &kernel, &SsaoConfig::default());
        assert_eq!(factor, Some(1.0));
    }

    #[test]
    fn pixel_in_a_pit_is_darkened_but_not_black() {
        let mut depth = DepthBuffer::new(64, 64);
        for y in 0..64 {
            for x in 0..64 {
                depth.set(x, y, 0.35);
            }
        }
        depth.set(32, 32, 0.3);
        let kernel = SsaoKernel::new(16, 1);
        let config = SsaoConfig::default();
        let factor = compute_pixel_occlusion(32, 32, &depth, &kernel, &config).unwrap();
        // Every in-bounds probe is nearer: ratio 1, scaled by strength.
        assert!((factor - (1.0 - config.strength)).abs() < 1e-6);
    }

    #[test]
    fn distant_foreground_does_not_occlude() {
        // Background-far pixel surrounded by the nearest possible depth.
        let mut depth = DepthBuffer::new(64, 64);
        for y in 0..64 {
            for x in 0..64 {
                depth.set(x, y, 0.49995);
            }
        }
        depth.set(32, 32, -0.99999);
        let kernel = SsaoKernel::new(16, 1);
        let config = SsaoConfig::default();
        assert_eq!(
            compute_pixel_occlusion(32, 32, &depth, &kernel, &config),
            Some(1.0)
        );

        // The same probes inside the cutoff do count.
        depth.set(32, 32, 0.49995 - config.max_distance * 0.5);
        let factor = compute_pixel_occlusion(32, 32, &depth, &kernel, &config).unwrap();
        assert!((factor - (1.0 - config.strength)).abs() < 1e-6);
    }
}
