/// Screen-space tile binning.
///
/// The framebuffer is partitioned into `tile_size`-square tiles (edge tiles
/// may be smaller). Each triangle is appended to every tile its bounding box
/// overlaps; a tile task then only touches pixels inside its own rectangle,
/// which is what lets tile tasks write the shared buffers without locks.

/// Default tile edge in pixels (32×32 × (4 B depth + 4 B color) = 8KB per tile)
pub const DEFAULT_TILE_SIZE: usize = 32;

/// Pixel rectangle `[x0, x1) × [y0, y1)` of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

/// Tile binning system
///
/// Tracks which triangles need to be rasterized into which tiles
#[derive(Debug, Clone)]
pub struct TileGrid {
    width: usize,
    height: usize,
    tile_size: usize,
    /// Number of tiles horizontally
    pub tiles_x: usize,
    /// Number of tiles vertically
    pub tiles_y: usize,
    /// Per-tile triangle lists (tile_index -> triangle indices)
    bins: Vec<Vec<u32>>,
}

impl TileGrid {
    /// Create an empty grid for a `width`×`height` framebuffer.
    pub fn new(width: usize, height: usize, tile_size: usize) -> Self {
        let tile_size = tile_size.max(1);
        let tiles_x = width.div_ceil(tile_size);
        let tiles_y = height.div_ceil(tile_size);

        Self {
            width,
            height,
            tile_size,
            tiles_x,
            tiles_y,
            bins: vec![Vec::new(); tiles_x * tiles_y],
        }
    }

    #[inline]
    pub fn tile_count(&self) -> usize {
        self.bins.len()
    }

    /// Add a triangle to every tile overlapped by the inclusive pixel range
    /// `min..=max`. Ranges are clamped to the framebuffer; a range entirely
    /// off-screen is dropped and `false` returned.
    pub fn add_triangle(
        &mut self,
        triangle: u32,
        min_x: i64,
        min_y: i64,
        max_x: i64,
        max_y: i64,
    ) -> bool {
        if self.bins.is_empty() {
            return false;
        }
        let min_x = min_x.max(0) as usize;
        let min_y = min_y.max(0) as usize;
        let max_x = max_x.min(self.width as i64 - 1);
        let max_y = max_y.min(self.height as i64 - 1);
        if max_x < 0 || max_y < 0 {
            return false;
        }
        let (max_x, max_y) = (max_x as usize, max_y as usize);
        if min_x > max_x || min_y > max_y {
            return false;
        }

        for ty in min_y / self.tile_size..=max_y / self.tile_size {
            for tx in min_x / self.tile_size..=max_x / self.tile_size {
                self.bins[ty * self.tiles_x + tx].push(triangle);
            }
        }
        true
    }

    /// Get the triangle list for a specific tile
    #[inline]
    pub fn bin(&self, tile_x: usize, tile_y: usize) -> &[u32] {
        &self.bins[tile_y * self.tiles_x + tile_x]
    }

    /// Pixel rectangle of a tile, clipped to the framebuffer.
    #[inline]
    pub fn tile_rect(&self, tile_x: usize, tile_y: usize) -> TileRect {
        let x0 = tile_x * self.tile_size;
        let y0 = tile_y * self.tile_size;
        TileRect {
            x0,
            y0,
            x1: (x0 + self.tile_size).min(self.width),
            y1: (y0 + self.tile_size).min(self.height),
        }
    }

    /// Tiles with at least one triangle, with their rectangle and bin.
    pub fn occupied(&self) -> impl Iterator<Item = (TileRect, &[u32])> + '_ {
        (0..self.tiles_y)
            .flat_map(move |ty| (0..self.tiles_x).map(move |tx| (tx, ty)))
            .filter_map(move |(tx, ty)| {
                let bin = self.bin(tx, ty);
                (!bin.is_empty()).then(|| (self.tile_rect(tx, ty), bin))
            })
    }
}
