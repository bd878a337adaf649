//! Turning a detection into a face chip.
//!
//! Detections with five landmarks are warped onto the InsightFace reference
//! pose with a least-squares similarity transform. Detections without
//! landmarks fall back to a clamped box crop resized to the chip size.

use crate::chip::{FaceChip, CHIP_SIZE};
use crate::types::BoundingBox;

/// ArcFace reference landmarks for a 112×112 chip:
/// left eye, right eye, nose, left mouth corner, right mouth corner.
pub const REFERENCE_LANDMARKS: [(f32, f32); 5] = [
    (38.2946, 51.6963),
    (73.5318, 51.5014),
    (56.0252, 71.7366),
    (41.5493, 92.3655),
    (70.7299, 92.2041),
];

/// Similarity transform `dst = [[a, -b], [b, a]] * src + [tx, ty]`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Similarity {
    a: f32,
    b: f32,
    tx: f32,
    ty: f32,
}

impl Similarity {
    const IDENTITY: Similarity = Similarity {
        a: 1.0,
        b: 0.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// Least-squares fit mapping `src` points onto `dst` points.
    ///
    /// Each correspondence contributes two rows of the overdetermined system
    /// `[sx, -sy, 1, 0]·p = dx` and `[sy, sx, 0, 1]·p = dy`, solved through the
    /// normal equations.
    fn estimate(src: &[(f32, f32); 5], dst: &[(f32, f32); 5]) -> Self {
        let mut normal = [[0.0f32; 5]; 4];

        for ((sx, sy), (dx, dy)) in src.iter().copied().zip(dst.iter().copied()) {
            let rows = [([sx, -sy, 1.0, 0.0], dx), ([sy, sx, 0.0, 1.0], dy)];
            for (row, rhs) in rows {
                for j in 0..4 {
                    for k in 0..4 {
                        normal[j][k] += row[j] * row[k];
                    }
                    normal[j][4] += row[j] * rhs;
                }
            }
        }

        match solve_augmented(normal) {
            Some([a, b, tx, ty]) => Self { a, b, tx, ty },
            None => Self::IDENTITY,
        }
    }

    /// Map a destination pixel back into source coordinates.
    fn invert_point(&self, x: f32, y: f32) -> Option<(f32, f32)> {
        let det = self.a * self.a + self.b * self.b;
        if det < 1e-12 {
            return None;
        }
        let dx = x - self.tx;
        let dy = y - self.ty;
        Some((
            (self.a * dx + self.b * dy) / det,
            (-self.b * dx + self.a * dy) / det,
        ))
    }
}

/// Gaussian elimination with partial pivoting on a 4×5 augmented matrix.
/// Returns `None` for a singular system.
#[allow(clippy::needless_range_loop)]
fn solve_augmented(mut m: [[f32; 5]; 4]) -> Option<[f32; 4]> {
    for col in 0..4 {
        let pivot_row = (col..4)
            .max_by(|&i, &j| m[i][col].abs().total_cmp(&m[j][col].abs()))
            .unwrap_or(col);
        m.swap(col, pivot_row);

        let pivot = m[col][col];
        if pivot.abs() < 1e-12 {
            return None;
        }
        for row in (col + 1)..4 {
            let factor = m[row][col] / pivot;
            for j in col..5 {
                m[row][j] -= factor * m[col][j];
            }
        }
    }

    let mut x = [0.0f32; 4];
    for i in (0..4).rev() {
        let tail: f32 = ((i + 1)..4).map(|j| m[i][j] * x[j]).sum();
        x[i] = (m[i][4] - tail) / m[i][i];
    }
    Some(x)
}

/// Bilinear sample with black outside the frame.
fn sample_bilinear(frame: &[u8], width: usize, height: usize, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let at = |px: i64, py: i64| -> f32 {
        if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
            0.0
        } else {
            frame[py as usize * width + px as usize] as f32
        }
    };

    let top = at(x0, y0) * (1.0 - fx) + at(x0 + 1, y0) * fx;
    let bottom = at(x0, y0 + 1) * (1.0 - fx) + at(x0 + 1, y0 + 1) * fx;
    top * (1.0 - fy) + bottom * fy
}

fn warp(frame: &[u8], width: usize, height: usize, transform: &Similarity) -> Vec<u8> {
    let mut out = vec![0u8; CHIP_SIZE * CHIP_SIZE];
    for oy in 0..CHIP_SIZE {
        for ox in 0..CHIP_SIZE {
            let Some((sx, sy)) = transform.invert_point(ox as f32, oy as f32) else {
                return vec![0u8; CHIP_SIZE * CHIP_SIZE];
            };
            let v = sample_bilinear(frame, width, height, sx, sy);
            out[oy * CHIP_SIZE + ox] = v.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Warp a face onto the canonical 112×112 pose using its five landmarks.
pub fn align_face(frame: &[u8], width: u32, height: u32, landmarks: &[(f32, f32); 5]) -> FaceChip {
    let transform = Similarity::estimate(landmarks, &REFERENCE_LANDMARKS);
    let pixels = warp(frame, width as usize, height as usize, &transform);
    FaceChip::from_sized(pixels)
}

/// Crop the bounding box (clamped to the frame) and resize it to 112×112.
pub fn crop_face(frame: &[u8], width: u32, height: u32, face: &BoundingBox) -> FaceChip {
    let (w, h) = (width as f32, height as f32);
    let x0 = face.x.clamp(0.0, w);
    let y0 = face.y.clamp(0.0, h);
    let x1 = (face.x + face.width).clamp(0.0, w);
    let y1 = (face.y + face.height).clamp(0.0, h);

    let crop_w = (x1 - x0).max(1.0);
    let crop_h = (y1 - y0).max(1.0);
    let step_x = crop_w / CHIP_SIZE as f32;
    let step_y = crop_h / CHIP_SIZE as f32;

    let mut out = vec![0u8; CHIP_SIZE * CHIP_SIZE];
    for oy in 0..CHIP_SIZE {
        let sy = (y0 + (oy as f32 + 0.5) * step_y - 0.5).clamp(0.0, (h - 1.0).max(0.0));
        for ox in 0..CHIP_SIZE {
            let sx = (x0 + (ox as f32 + 0.5) * step_x - 0.5).clamp(0.0, (w - 1.0).max(0.0));
            let v = sample_bilinear(frame, width as usize, height as usize, sx, sy);
            out[oy * CHIP_SIZE + ox] = v.round().clamp(0.0, 255.0) as u8;
        }
    }
    FaceChip::from_sized(out)
}

/// Chip for a detection: aligned when landmarks are present, cropped otherwise.
pub fn face_chip(frame: &[u8], width: u32, height: u32, face: &BoundingBox) -> FaceChip {
    match &face.landmarks {
        Some(landmarks) => align_face(frame, width, height, landmarks),
        None => crop_face(frame, width, height, face),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x: f32, y: f32, w: f32, h: f32) -> BoundingBox {
        BoundingBox {
            x,
            y,
            width: w,
            height: h,
            confidence: 0.9,
            landmarks: None,
        }
    }

    #[test]
    fn test_identity_fit() {
        let t = Similarity::estimate(&REFERENCE_LANDMARKS, &REFERENCE_LANDMARKS);
        assert!((t.a - 1.0).abs() < 1e-4, "a = {}", t.a);
        assert!(t.b.abs() < 1e-4, "b = {}", t.b);
        assert!(t.tx.abs() < 1e-3, "tx = {}", t.tx);
        assert!(t.ty.abs() < 1e-3, "ty = {}", t.ty);
    }

    #[test]
    fn test_half_scale_fit() {
        let doubled = REFERENCE_LANDMARKS.map(|(x, y)| (x * 2.0, y * 2.0));
        let t = Similarity::estimate(&doubled, &REFERENCE_LANDMARKS);
        assert!((t.a - 0.5).abs() < 0.01, "a = {}, expected ~0.5", t.a);
    }

    #[test]
    fn test_singular_system_has_no_solution() {
        assert!(solve_augmented([[0.0; 5]; 4]).is_none());
    }

    #[test]
    fn test_aligned_landmark_lands_on_reference() {
        let (w, h) = (200usize, 200usize);
        let mut frame = vec![0u8; w * h];
        let src: [(f32, f32); 5] = [
            (80.0, 60.0),
            (120.0, 60.0),
            (100.0, 85.0),
            (85.0, 110.0),
            (115.0, 110.0),
        ];
        // 5×5 bright patch on the left eye survives interpolation
        for py in 58..63 {
            for px in 78..83 {
                frame[py * w + px] = 255;
            }
        }

        let chip = align_face(&frame, w as u32, h as u32, &src);
        let (rx, ry) = (
            REFERENCE_LANDMARKS[0].0.round() as usize,
            REFERENCE_LANDMARKS[0].1.round() as usize,
        );
        let peak = (ry - 1..=ry + 1)
            .flat_map(|y| (rx - 1..=rx + 1).map(move |x| (x, y)))
            .map(|(x, y)| chip.pixels()[y * CHIP_SIZE + x])
            .max()
            .unwrap();
        assert!(peak > 100, "left eye patch missing near ({rx}, {ry}), peak={peak}");
    }

    #[test]
    fn test_crop_uniform_region() {
        let frame = vec![77u8; 320 * 240];
        let chip = crop_face(&frame, 320, 240, &bbox(40.0, 30.0, 100.0, 120.0));
        assert!(chip.pixels().iter().all(|&p| p == 77));
    }

    #[test]
    fn test_crop_clamps_box_outside_frame() {
        let frame = vec![200u8; 64 * 64];
        let chip = crop_face(&frame, 64, 64, &bbox(-50.0, -50.0, 400.0, 400.0));
        assert_eq!(chip.pixels().len(), CHIP_SIZE * CHIP_SIZE);
        assert!(chip.pixels().iter().all(|&p| p == 200));
    }

    #[test]
    fn test_face_chip_uses_crop_without_landmarks() {
        let mut frame = vec![0u8; 100 * 100];
        for y in 0..50 {
            for x in 0..50 {
                frame[y * 100 + x] = 180;
            }
        }
        let face = bbox(0.0, 0.0, 50.0, 50.0);
        assert_eq!(face_chip(&frame, 100, 100, &face), crop_face(&frame, 100, 100, &face));
    }
}
