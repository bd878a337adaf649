//! Grayscale frames and the pixel work done on them before detection:
//! YUYV unpacking, dark-frame checks and CLAHE.

/// A captured grayscale camera frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Grayscale pixel data (width * height bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub sequence: u32,
    pub is_dark: bool,
}

impl Frame {
    /// Wrap an already-grayscale buffer; the dark flag is computed here.
    pub fn from_gray(data: Vec<u8>, width: u32, height: u32, sequence: u32) -> Self {
        let is_dark = is_dark_frame(&data, DARK_FRAME_RATIO);
        Self {
            data,
            width,
            height,
            sequence,
            is_dark,
        }
    }

    /// Average pixel brightness (0.0–255.0).
    pub fn avg_brightness(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|&b| b as f32).sum::<f32>() / self.data.len() as f32
    }
}

/// Share of near-black pixels above which a frame counts as dark.
pub const DARK_FRAME_RATIO: f32 = 0.95;

/// Pixels below this value are counted as near-black.
const DARK_PIXEL: u8 = 32;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid YUYV length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Convert packed YUYV 4:2:2 (`[Y0, U, Y1, V]` per pixel pair) to grayscale
/// by keeping the luma bytes.
pub fn yuyv_to_grayscale(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = width as usize * height as usize * 2;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: yuyv.len(),
        });
    }
    Ok(yuyv[..expected].iter().step_by(2).copied().collect())
}

/// True when more than `ratio` of the pixels are near-black. Empty frames are dark.
pub fn is_dark_frame(gray: &[u8], ratio: f32) -> bool {
    if gray.is_empty() {
        return true;
    }
    let dark = gray.iter().filter(|&&p| p < DARK_PIXEL).count();
    dark as f32 / gray.len() as f32 > ratio
}

/// Per-tile equalization lookup tables for CLAHE.
struct TileLuts {
    cols: usize,
    rows: usize,
    tile_w: usize,
    tile_h: usize,
    luts: Vec<[f32; 256]>,
}

impl TileLuts {
    fn build(gray: &[u8], width: usize, grid: usize, tile_w: usize, tile_h: usize, clip_limit: f32) -> Self {
        let tile_pixels = tile_w * tile_h;
        let clip = (clip_limit * tile_pixels as f32) as u32;
        let mut luts = Vec::with_capacity(grid * grid);

        for row in 0..grid {
            for col in 0..grid {
                let mut hist = [0u32; 256];
                for y in row * tile_h..(row + 1) * tile_h {
                    let line = &gray[y * width + col * tile_w..y * width + (col + 1) * tile_w];
                    for &p in line {
                        hist[p as usize] += 1;
                    }
                }
                luts.push(clipped_cdf(&mut hist, clip, tile_pixels));
            }
        }

        Self {
            cols: grid,
            rows: grid,
            tile_w,
            tile_h,
            luts,
        }
    }

    /// Bilinear blend of the four surrounding tile tables at pixel (x, y).
    fn map(&self, x: usize, y: usize, value: u8) -> u8 {
        let gx = (x as f32 / self.tile_w as f32 - 0.5).clamp(0.0, (self.cols - 1) as f32);
        let gy = (y as f32 / self.tile_h as f32 - 0.5).clamp(0.0, (self.rows - 1) as f32);
        let (c0, r0) = (gx as usize, gy as usize);
        let (c1, r1) = ((c0 + 1).min(self.cols - 1), (r0 + 1).min(self.rows - 1));
        let (dx, dy) = (gx - c0 as f32, gy - r0 as f32);

        let lut = |r: usize, c: usize| self.luts[r * self.cols + c][value as usize];
        let top = lut(r0, c0) * (1.0 - dx) + lut(r0, c1) * dx;
        let bottom = lut(r1, c0) * (1.0 - dx) + lut(r1, c1) * dx;
        (top * (1.0 - dy) + bottom * dy).round().clamp(0.0, 255.0) as u8
    }
}

/// Clip a histogram, spread the excess evenly and return its CDF scaled to 0–255.
fn clipped_cdf(hist: &mut [u32; 256], clip: u32, total: usize) -> [f32; 256] {
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }
    let share = excess / 256;
    let remainder = (excess % 256) as usize;
    for (i, bin) in hist.iter_mut().enumerate() {
        *bin += share + u32::from(i < remainder);
    }

    let mut cdf = [0f32; 256];
    let mut running = 0f32;
    for (slot, &count) in cdf.iter_mut().zip(hist.iter()) {
        running += count as f32;
        *slot = running;
    }

    let floor = cdf.iter().copied().find(|&v| v > 0.0).unwrap_or(0.0);
    let span = total as f32 - floor;
    if span > 0.0 {
        for v in cdf.iter_mut() {
            *v = ((*v - floor) / span * 255.0).clamp(0.0, 255.0);
        }
    }
    cdf
}

/// Contrast-limited adaptive histogram equalization, in place, over a
/// `grid`×`grid` tile layout. Frames too small for the grid are left alone.
pub fn clahe_enhance(gray: &mut [u8], width: u32, height: u32, grid: u32, clip_limit: f32) {
    let (w, h, grid) = (width as usize, height as usize, grid as usize);
    if grid == 0 || gray.len() < w * h {
        return;
    }
    let (tile_w, tile_h) = (w / grid, h / grid);
    if tile_w == 0 || tile_h == 0 {
        return;
    }

    let luts = TileLuts::build(gray, w, grid, tile_w, tile_h, clip_limit);
    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            gray[i] = luts.map(x, y, gray[i]);
        }
    }
}
