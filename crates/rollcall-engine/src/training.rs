//! Build the trained model from the chips in `TrainingImage/`.

use crate::error::{EngineError, Result};
use rollcall_core::{FaceChip, FaceEncoder, TrainedModel};
use rollcall_store::DataLayout;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingReport {
    /// Images that contributed a sample.
    pub images: usize,
    /// Distinct labels in the model.
    pub students: usize,
    pub model_path: PathBuf,
}

/// Serial label of a training image file name. The serial is the third
/// `_`-separated field from the right, so names containing `_` still parse.
pub fn label_from_file_name(name: &str) -> Option<u32> {
    let stem = name.strip_suffix(".jpg")?;
    let mut fields = stem.rsplit('_');
    let _sample = fields.next()?;
    let _prn = fields.next()?;
    let serial = fields.next()?;
    fields.next()?;
    serial.parse().ok()
}

/// Embed every `.jpg` chip in the training directory and save the model.
/// Files that do not load, parse or encode are logged and skipped.
pub fn save_student_profile<E>(layout: &DataLayout, encoder: &mut E) -> Result<TrainingReport>
where
    E: FaceEncoder + ?Sized,
{
    let dir = layout.training_images_dir();
    let mut samples = Vec::new();

    for path in training_images(&dir)? {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let Some(label) = label_from_file_name(name) else {
            tracing::warn!(file = %path.display(), "skipping image without a serial label");
            continue;
        };
        let chip = match FaceChip::load(&path) {
            Ok(chip) => chip,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "skipping unreadable image");
                continue;
            }
        };
        match encoder.encode(&chip) {
            Ok(embedding) => samples.push((label, embedding)),
            Err(e) => tracing::warn!(file = %path.display(), error = %e, "skipping image that failed to encode"),
        }
    }

    if samples.is_empty() {
        return Err(EngineError::NoTrainingImages(dir));
    }

    let images = samples.len();
    let model = TrainedModel::train(samples)?;
    let model_path = layout.model_path();
    model.save(&model_path)?;
    tracing::info!(images, students = model.label_count(), path = %model_path.display(), "model trained");

    Ok(TrainingReport {
        images,
        students: model.label_count(),
        model_path,
    })
}

fn training_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "jpg"))
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture, FnEncoder};
    use rollcall_core::{Embedding, RecognizerError, CHIP_SIZE};

    fn write_chip(dir: &Path, name: &str, value: u8) {
        fs::create_dir_all(dir).unwrap();
        let chip = FaceChip::from_pixels(vec![value; CHIP_SIZE * CHIP_SIZE]).unwrap();
        chip.save(&dir.join(name)).unwrap();
    }

    #[test]
    fn test_label_parses_from_the_right() {
        assert_eq!(label_from_file_name("Asha_Rao_3_P1_12.jpg"), Some(3));
        assert_eq!(label_from_file_name("Mary_Ann_De_Souza_14_PRN9_1.jpg"), Some(14));
        assert_eq!(label_from_file_name("Asha_Rao_x_P1_1.jpg"), None);
        assert_eq!(label_from_file_name("3_P1_1.jpg"), None);
        assert_eq!(label_from_file_name("Asha_Rao_3_P1_1.png"), None);
    }

    #[test]
    fn test_trains_and_saves_model() {
        let fx = fixture(1);
        let dir = fx.layout.training_images_dir();
        write_chip(&dir, "Asha_Rao_1_P1_1.jpg", 40);
        write_chip(&dir, "Asha_Rao_1_P1_2.jpg", 40);
        write_chip(&dir, "Dev_Nair_2_P2_1.jpg", 200);
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let mut encoder = FnEncoder::new(|chip: &FaceChip| {
            let bright = chip.pixels()[0] > 128;
            Ok(Embedding::new(if bright { vec![0.0, 1.0] } else { vec![1.0, 0.0] }))
        });
        let report = save_student_profile(&fx.layout, &mut encoder).unwrap();
        assert_eq!(report.images, 3);
        assert_eq!(report.students, 2);
        assert_eq!(report.model_path, fx.layout.model_path());

        let model = TrainedModel::load(&report.model_path).unwrap();
        let p = model.predict(&Embedding::new(vec![0.1, 0.9])).unwrap();
        assert_eq!(p.label, 2);
    }

    #[test]
    fn test_bad_files_are_skipped() {
        let fx = fixture(1);
        let dir = fx.layout.training_images_dir();
        write_chip(&dir, "Asha_Rao_1_P1_1.jpg", 40);
        write_chip(&dir, "unlabelled.jpg", 40);
        fs::write(dir.join("Broken_File_3_P3_1.jpg"), b"not a jpeg").unwrap();

        let mut calls = 0;
        let mut encoder = FnEncoder::new(|_: &FaceChip| {
            calls += 1;
            Ok(Embedding::new(vec![1.0, 0.0]))
        });
        let report = save_student_profile(&fx.layout, &mut encoder).unwrap();
        drop(encoder);
        assert_eq!(report.images, 1);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_no_images_is_an_error() {
        let fx = fixture(1);
        let mut encoder = FnEncoder::new(|_: &FaceChip| Ok(Embedding::new(vec![1.0])));
        assert!(matches!(
            save_student_profile(&fx.layout, &mut encoder),
            Err(EngineError::NoTrainingImages(_))
        ));

        write_chip(&fx.layout.training_images_dir(), "Asha_Rao_1_P1_1.jpg", 40);
        let mut failing = FnEncoder::new(|_: &FaceChip| Err(RecognizerError::InferenceFailed("boom".into())));
        assert!(matches!(
            save_student_profile(&fx.layout, &mut failing),
            Err(EngineError::NoTrainingImages(_))
        ));
        assert!(!TrainedModel::exists(&fx.layout.model_path()));
    }
}
