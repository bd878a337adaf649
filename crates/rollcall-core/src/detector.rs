//! SCRFD face detector via ONNX Runtime.
//!
//! Letterboxes the grayscale frame to 640×640, decodes the three stride
//! heads (anchor-free, two anchors per cell) and runs NMS.

use crate::types::{BoundingBox, FaceLocator};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const INPUT_SIZE: usize = 640;
const PIXEL_MEAN: f32 = 127.5;
const PIXEL_STD: f32 = 128.0;
const NMS_IOU: f32 = 0.4;
const STRIDES: [usize; 3] = [8, 16, 32];
const ANCHORS_PER_CELL: usize = 2;

/// File name of the detector model inside the model directory.
pub const DETECTOR_MODEL_FILE: &str = "det_10g.onnx";

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("detector model not found: {0}; download det_10g.onnx from insightface")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Letterbox placement of the source frame inside the square input.
#[derive(Debug, Clone, Copy)]
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

impl Letterbox {
    fn fit(width: usize, height: usize) -> Self {
        let scale = (INPUT_SIZE as f32 / width as f32).min(INPUT_SIZE as f32 / height as f32);
        let new_w = (width as f32 * scale).round();
        let new_h = (height as f32 * scale).round();
        Self {
            scale,
            pad_x: (INPUT_SIZE as f32 - new_w) / 2.0,
            pad_y: (INPUT_SIZE as f32 - new_h) / 2.0,
        }
    }

    fn to_frame(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// (score, bbox, kps) output indices for one stride.
type HeadIndices = (usize, usize, usize);

/// SCRFD-based face detector with a fixed confidence threshold.
pub struct FaceDetector {
    session: Session,
    heads: [HeadIndices; 3],
    confidence: f32,
}

impl FaceDetector {
    /// Load the SCRFD model; detections scoring at or below `confidence` are dropped.
    pub fn load(model_path: &Path, confidence: f32) -> Result<Self, DetectorError> {
        if !model_path.exists() {
            return Err(DetectorError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let names: Vec<String> = session.outputs().iter().map(|o| o.name().to_string()).collect();
        if names.len() < 9 {
            return Err(DetectorError::InferenceFailed(format!(
                "SCRFD needs 9 outputs (3 strides × score/bbox/kps), model has {}",
                names.len()
            )));
        }

        let heads = head_indices(&names);
        tracing::info!(path = %model_path.display(), ?heads, confidence, "loaded SCRFD detector");

        Ok(Self {
            session,
            heads,
            confidence,
        })
    }

    /// Detect faces, highest confidence first.
    pub fn detect(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<BoundingBox>, DetectorError> {
        let (width, height) = (width as usize, height as usize);
        if width == 0 || height == 0 || frame.len() < width * height {
            return Err(DetectorError::InferenceFailed(format!(
                "frame of {} bytes does not cover {width}x{height}",
                frame.len()
            )));
        }

        let letterbox = Letterbox::fit(width, height);
        let input = letterbox_tensor(frame, width, height, &letterbox);
        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut candidates = Vec::new();
        for (&stride, &(score_idx, bbox_idx, kps_idx)) in STRIDES.iter().zip(self.heads.iter()) {
            let extract = |idx: usize, what: &str| {
                outputs[idx]
                    .try_extract_tensor::<f32>()
                    .map(|(_, data)| data)
                    .map_err(|e| DetectorError::InferenceFailed(format!("{what} stride {stride}: {e}")))
            };
            let scores = extract(score_idx, "scores")?;
            let boxes = extract(bbox_idx, "boxes")?;
            let kps = extract(kps_idx, "landmarks")?;

            candidates.extend(decode_head(scores, boxes, kps, stride, &letterbox, self.confidence));
        }

        Ok(nms(candidates, NMS_IOU))
    }
}

impl FaceLocator for FaceDetector {
    fn locate(
        &mut self,
        gray: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<BoundingBox>, DetectorError> {
        self.detect(gray, width, height)
    }
}

/// Map output names to stride heads. Exports named `score_8`, `bbox_16`, ...
/// are matched by name; anything else uses the positional layout
/// `[scores 8/16/32, boxes 8/16/32, kps 8/16/32]`.
fn head_indices(names: &[String]) -> [HeadIndices; 3] {
    let find = |prefix: &str, stride: usize| {
        let target = format!("{prefix}_{stride}");
        names.iter().position(|n| *n == target)
    };

    let named: Option<Vec<HeadIndices>> = STRIDES
        .iter()
        .map(|&s| Some((find("score", s)?, find("bbox", s)?, find("kps", s)?)))
        .collect();

    match named.as_deref() {
        Some(&[a, b, c]) => [a, b, c],
        _ => {
            tracing::debug!(?names, "SCRFD output names not recognized, using positional layout");
            [(0, 3, 6), (1, 4, 7), (2, 5, 8)]
        }
    }
}

/// Bilinear resize into the letterbox and normalize to NCHW with the gray
/// channel replicated three times. Padding is filled with the mean so it
/// normalizes to zero.
fn letterbox_tensor(frame: &[u8], width: usize, height: usize, lb: &Letterbox) -> Array4<f32> {
    let new_w = (width as f32 * lb.scale).round() as usize;
    let new_h = (height as f32 * lb.scale).round() as usize;
    let left = lb.pad_x.floor() as usize;
    let top = lb.pad_y.floor() as usize;
    let inv = 1.0 / lb.scale;

    let mut tensor = Array4::<f32>::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));
    for y in 0..INPUT_SIZE {
        for x in 0..INPUT_SIZE {
            let inside = y >= top && y < top + new_h && x >= left && x < left + new_w;
            let pixel = if inside {
                let src_x = ((x - left) as f32 + 0.5) * inv - 0.5;
                let src_y = ((y - top) as f32 + 0.5) * inv - 0.5;
                bilinear_clamped(frame, width, height, src_x, src_y)
            } else {
                PIXEL_MEAN
            };
            let v = (pixel - PIXEL_MEAN) / PIXEL_STD;
            for c in 0..3 {
                tensor[[0, c, y, x]] = v;
            }
        }
    }
    tensor
}

fn bilinear_clamped(frame: &[u8], width: usize, height: usize, x: f32, y: f32) -> f32 {
    let x0 = (x.floor().max(0.0) as usize).min(width - 1);
    let y0 = (y.floor().max(0.0) as usize).min(height - 1);
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = (x - x.floor()).clamp(0.0, 1.0);
    let fy = (y - y.floor()).clamp(0.0, 1.0);

    let px = |xx: usize, yy: usize| frame[yy * width + xx] as f32;
    let top = px(x0, y0) * (1.0 - fx) + px(x1, y0) * fx;
    let bottom = px(x0, y1) * (1.0 - fx) + px(x1, y1) * fx;
    (top * (1.0 - fy) + bottom * fy).round()
}

/// Decode one stride head into frame-space boxes.
fn decode_head(
    scores: &[f32],
    boxes: &[f32],
    kps: &[f32],
    stride: usize,
    lb: &Letterbox,
    threshold: f32,
) -> Vec<BoundingBox> {
    let grid_w = INPUT_SIZE / stride;
    let grid_h = INPUT_SIZE / stride;
    let step = stride as f32;

    let mut out = Vec::new();
    for idx in 0..grid_w * grid_h * ANCHORS_PER_CELL {
        let score = scores.get(idx).copied().unwrap_or(0.0);
        if score <= threshold {
            continue;
        }
        let Some(dist) = boxes.get(idx * 4..idx * 4 + 4) else {
            continue;
        };

        let cell = idx / ANCHORS_PER_CELL;
        let ax = (cell % grid_w) as f32 * step;
        let ay = (cell / grid_w) as f32 * step;

        let (x1, y1) = lb.to_frame(ax - dist[0] * step, ay - dist[1] * step);
        let (x2, y2) = lb.to_frame(ax + dist[2] * step, ay + dist[3] * step);

        let landmarks = kps.get(idx * 10..idx * 10 + 10).map(|pts| {
            std::array::from_fn(|i| lb.to_frame(ax + pts[i * 2] * step, ay + pts[i * 2 + 1] * step))
        });

        out.push(BoundingBox {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
            confidence: score,
            landmarks,
        });
    }
    out
}

/// Greedy non-maximum suppression; output is sorted by descending confidence.
fn nms(mut candidates: Vec<BoundingBox>, iou_threshold: f32) -> Vec<BoundingBox> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<BoundingBox> = Vec::new();
    for candidate in candidates {
        if keep.iter().all(|k| k.iou(&candidate) <= iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bbox(x: f32, y: f32, w: f32, h: f32, conf: f32) -> BoundingBox {
        BoundingBox {
            x,
            y,
            width: w,
            height: h,
            confidence: conf,
            landmarks: None,
        }
    }

    #[test]
    fn test_nms_suppresses_overlapping() {
        let result = nms(
            vec![
                make_bbox(5.0, 5.0, 100.0, 100.0, 0.8),
                make_bbox(0.0, 0.0, 100.0, 100.0, 0.9),
                make_bbox(200.0, 200.0, 50.0, 50.0, 0.7),
            ],
            0.4,
        );
        assert_eq!(result.len(), 2);
        assert!((result[0].confidence - 0.9).abs() < 1e-6);
        assert!((result[1].confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_nms_empty() {
        assert!(nms(vec![], 0.4).is_empty());
    }

    #[test]
    fn test_letterbox_roundtrip() {
        let lb = Letterbox::fit(320, 240);
        let (x, y) = lb.to_frame(100.0 * lb.scale + lb.pad_x, 50.0 * lb.scale + lb.pad_y);
        assert!((x - 100.0).abs() < 0.1, "x = {x}");
        assert!((y - 50.0).abs() < 0.1, "y = {y}");
    }

    #[test]
    fn test_letterbox_pads_short_side() {
        let lb = Letterbox::fit(640, 320);
        assert!((lb.scale - 1.0).abs() < 1e-6);
        assert!(lb.pad_x.abs() < 1e-6);
        assert!((lb.pad_y - 160.0).abs() < 1e-6);
    }

    #[test]
    fn test_tensor_padding_normalizes_to_zero() {
        let frame = vec![200u8; 640 * 320];
        let lb = Letterbox::fit(640, 320);
        let t = letterbox_tensor(&frame, 640, 320, &lb);
        assert_eq!(t.shape(), &[1, 3, INPUT_SIZE, INPUT_SIZE]);
        assert_eq!(t[[0, 0, 0, 0]], 0.0);
        let inside = (200.0 - PIXEL_MEAN) / PIXEL_STD;
        assert!((t[[0, 1, 320, 320]] - inside).abs() < 1e-6);
    }

    #[test]
    fn test_head_indices_named_any_order() {
        let names: Vec<String> = [
            "bbox_8", "kps_8", "score_8", "bbox_16", "kps_16", "score_16", "bbox_32", "kps_32",
            "score_32",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(head_indices(&names), [(2, 0, 1), (5, 3, 4), (8, 6, 7)]);
    }

    #[test]
    fn test_head_indices_positional_fallback() {
        let names: Vec<String> = (0..9).map(|i: usize| i.to_string()).collect();
        assert_eq!(head_indices(&names), [(0, 3, 6), (1, 4, 7), (2, 5, 8)]);
    }

    #[test]
    fn test_decode_head_maps_single_anchor() {
        let stride = 32;
        let cells = (INPUT_SIZE / stride) * (INPUT_SIZE / stride) * ANCHORS_PER_CELL;
        let mut scores = vec![0.0f32; cells];
        let mut boxes = vec![0.0f32; cells * 4];
        // anchor 2 → cell 1 → (32, 0) in input space
        scores[2] = 0.9;
        boxes[8..12].copy_from_slice(&[0.5, 0.0, 0.5, 1.0]);

        let lb = Letterbox { scale: 1.0, pad_x: 0.0, pad_y: 0.0 };
        let dets = decode_head(&scores, &boxes, &[], stride, &lb, 0.5);
        assert_eq!(dets.len(), 1);
        let d = &dets[0];
        assert!((d.x - 16.0).abs() < 1e-4);
        assert!((d.width - 32.0).abs() < 1e-4);
        assert!((d.height - 32.0).abs() < 1e-4);
        assert!(d.landmarks.is_none());
    }
}
