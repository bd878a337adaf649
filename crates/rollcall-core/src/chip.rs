//! Fixed-size grayscale face crops ("chips").
//!
//! Chips are what registration writes to `TrainingImage/` and what the
//! encoder consumes, so training and live recognition see identical input.

use image::{imageops::FilterType, GrayImage};
use std::path::Path;
use thiserror::Error;

/// Side length of a face chip in pixels (ArcFace input size).
pub const CHIP_SIZE: usize = 112;

#[derive(Error, Debug)]
pub enum ChipError {
    #[error("chip has {actual} pixels, expected {expected}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("image: {0}")]
    Image(#[from] image::ImageError),
}

/// A 112×112 grayscale face crop, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceChip {
    pixels: Vec<u8>,
}

impl FaceChip {
    pub fn from_pixels(pixels: Vec<u8>) -> Result<Self, ChipError> {
        let expected = CHIP_SIZE * CHIP_SIZE;
        if pixels.len() != expected {
            return Err(ChipError::InvalidLength {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self { pixels })
    }

    /// For buffers built at exactly `CHIP_SIZE²` within this crate.
    pub(crate) fn from_sized(pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), CHIP_SIZE * CHIP_SIZE);
        Self { pixels }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Write the chip as a grayscale image; format follows the file extension.
    pub fn save(&self, path: &Path) -> Result<(), ChipError> {
        let img = GrayImage::from_raw(CHIP_SIZE as u32, CHIP_SIZE as u32, self.pixels.clone())
            .ok_or(ChipError::InvalidLength {
                expected: CHIP_SIZE * CHIP_SIZE,
                actual: self.pixels.len(),
            })?;
        img.save(path)?;
        Ok(())
    }

    /// Read an image file as a chip, converting to grayscale and resizing
    /// when the stored image is not already 112×112.
    pub fn load(path: &Path) -> Result<Self, ChipError> {
        let mut gray = image::open(path)?.into_luma8();
        if gray.width() as usize != CHIP_SIZE || gray.height() as usize != CHIP_SIZE {
            gray = image::imageops::resize(
                &gray,
                CHIP_SIZE as u32,
                CHIP_SIZE as u32,
                FilterType::Triangle,
            );
        }
        Self::from_pixels(gray.into_raw())
    }
}
