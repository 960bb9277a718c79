/// Function call counting for the rasterization pipeline.
/// Counters are always present; increments compile in only with the
/// `profiling` feature so the hot loops pay nothing by default.
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe performance counters for function call tracking
pub struct FunctionCounters {
    // Triangle setup counters
    pub draw_calls: AtomicU64,
    pub triangles_submitted: AtomicU64,
    pub triangles_culled: AtomicU64,
    pub triangles_near_rejected: AtomicU64,
    pub triangles_binned: AtomicU64,

    // Tile dispatch counters
    pub tiles_dispatched: AtomicU64,

    // Pixel counters
    pub pixels_tested: AtomicU64,
    pub depth_test_passed: AtomicU64,
    pub depth_test_failed: AtomicU64,
    pub fragments_shaded: AtomicU64,
    pub fragments_discarded: AtomicU64,

    // Post-processing counters
    pub ssao_pixels: AtomicU64,
}

impl FunctionCounters {
    pub const fn new() -> Self {
        Self {
            draw_calls: AtomicU64::new(0),
            triangles_submitted: AtomicU64::new(0),
            triangles_culled: AtomicU64::new(0),
            triangles_near_rejected: AtomicU64::new(0),
            triangles_binned: AtomicU64::new(0),
            tiles_dispatched: AtomicU64::new(0),
            pixels_tested: AtomicU64::new(0),
            depth_test_passed: AtomicU64::new(0),
            depth_test_failed: AtomicU64::new(0),
            fragments_shaded: AtomicU64::new(0),
            fragments_discarded: AtomicU64::new(0),
            ssao_pixels: AtomicU64::new(0),
        }
    }

    fn all(&self) -> [&AtomicU64; 12] {
        [
            &self.draw_calls,
            &self.triangles_submitted,
            &self.triangles_culled,
            &self.triangles_near_rejected,
            &self.triangles_binned,
            &self.tiles_dispatched,
            &self.pixels_tested,
            &self.depth_test_passed,
            &self.depth_test_failed,
            &self.fragments_shaded,
            &self.fragments_discarded,
            &self.ssao_pixels,
        ]
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        for counter in self.all() {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            draw_calls: self.draw_calls.load(Ordering::Relaxed),
            triangles_submitted: self.triangles_submitted.load(Ordering::Relaxed),
            triangles_culled: self.triangles_culled.load(Ordering::Relaxed),
            triangles_near_rejected: self.triangles_near_rejected.load(Ordering::Relaxed),
            triangles_binned: self.triangles_binned.load(Ordering::Relaxed),
            tiles_dispatched: self.tiles_dispatched.load(Ordering::Relaxed),
            pixels_tested: self.pixels_tested.load(Ordering::Relaxed),
            depth_test_passed: self.depth_test_passed.load(Ordering::Relaxed),
            depth_test_failed: self.depth_test_failed.load(Ordering::Relaxed),
            fragments_shaded: self.fragments_shaded.load(Ordering::Relaxed),
            fragments_discarded: self.fragments_discarded.load(Ordering::Relaxed),
            ssao_pixels: self.ssao_pixels.load(Ordering::Relaxed),
        }
    }
}

impl Default for FunctionCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of counter values at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub draw_calls: u64,
    pub triangles_submitted: u64,
    pub triangles_culled: u64,
    pub triangles_near_rejected: u64,
    pub triangles_binned: u64,
    pub tiles_dispatched: u64,
    pub pixels_tested: u64,
    pub depth_test_passed: u64,
    pub depth_test_failed: u64,
    pub fragments_shaded: u64,
    pub fragments_discarded: u64,
    pub ssao_pixels: u64,
}

impl CounterSnapshot {
    /// Log a formatted report at info level
    pub fn log_report(&self) {
        log::info!("=== Performance Counters Report ===");
        log::info!("Triangle setup:");
        log::info!("  draw calls:                 {:12}", self.draw_calls);
        log::info!("  triangles submitted:        {:12}", self.triangles_submitted);
        log::info!("  triangles culled:           {:12}", self.triangles_culled);
        log::info!("  near-plane rejected:        {:12}", self.triangles_near_rejected);
        log::info!("  triangles binned:           {:12}", self.triangles_binned);
        log::info!("  tiles dispatched:           {:12}", self.tiles_dispatched);

        log::info!("Pixel operations:");
        log::info!("  pixels tested:              {:12}", self.pixels_tested);
        log::info!("  depth test passed:          {:12}", self.depth_test_passed);
        log::info!("  depth test failed:          {:12}", self.depth_test_failed);
        if self.pixels_tested > 0 {
            let pass_rate = (self.depth_test_passed as f64 / self.pixels_tested as f64) * 100.0;
            log::info!("  depth test pass rate:       {:11.2}%", pass_rate);
        }
        log::info!("  fragments shaded:           {:12}", self.fragments_shaded);
        log::info!("  fragments discarded:        {:12}", self.fragments_discarded);
        log::info!("  ssao pixels:                {:12}", self.ssao_pixels);
    }
}

/// Global function counters instance
pub static FUNCTION_COUNTERS: FunctionCounters = FunctionCounters::new();

/// Macro for incrementing a counter (only when profiling feature is enabled)
#[macro_export]
macro_rules! count_call {
    ($counter:expr) => {
        #[cfg(feature = "profiling")]
        {
            $counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    };
}

/// Macro for adding to a counter (only when profiling feature is enabled)
#[macro_export]
macro_rules! count_add {
    ($counter:expr, $value:expr) => {
        #[cfg(feature = "profiling")]
        {
            $counter.fetch_add($value as u64, std::sync::atomic::Ordering::Relaxed);
        }
    };
}
