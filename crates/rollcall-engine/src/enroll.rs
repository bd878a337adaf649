//! Registration capture: save face chips for a new student, then add the
//! student row.

use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::stop::StopHandle;
use rollcall_core::{alignment, FaceLocator};
use rollcall_hw::FrameSource;
use rollcall_store::{DataLayout, NewStudent};
use std::path::PathBuf;

/// Outcome of a registration capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub serial: u32,
    pub samples: usize,
    pub images_dir: PathBuf,
}

/// `<first>_<last>_<serial>_<prn>_<n>.jpg`
pub fn sample_file_name(student: &NewStudent, serial: u32, n: usize) -> String {
    format!(
        "{}_{}_{}_{}_{}.jpg",
        student.first_name, student.last_name, serial, student.prn, n
    )
}

/// Capture up to `samples_per_student` chips of `student` from `source`.
///
/// Every face the locator reports at or above the registration threshold is
/// one sample. The loop ends on the sample target, the stop flag, or the
/// first source error. The student row is written however the loop ended,
/// including with zero samples.
pub fn take_student_images<S, L>(
    config: &Config,
    layout: &DataLayout,
    source: &mut S,
    locator: &mut L,
    student: &NewStudent,
    stop: &StopHandle,
) -> Result<Registration>
where
    S: FrameSource + ?Sized,
    L: FaceLocator + ?Sized,
{
    check_registration(config, layout, student)?;

    let table = layout.students();
    let serial = table.next_serial()?;
    let images_dir = layout.training_images_dir();
    std::fs::create_dir_all(&images_dir)?;

    let warmed = match source.discard(config.warmup_frames) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "camera failed during warmup");
            false
        }
    };

    let target = config.samples_per_student;
    let interval = config.sample_interval();
    let mut samples = 0usize;

    while warmed && samples < target && !stop.is_stopped() {
        let frame = match source.next_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, samples, "registration capture ended early");
                break;
            }
        };
        if !frame.is_dark {
            let faces = locator.locate(&frame.data, frame.width, frame.height)?;
            for face in faces
                .iter()
                .filter(|f| f.confidence >= config.registration_threshold)
            {
                if samples >= target {
                    break;
                }
                samples += 1;
                let chip = alignment::face_chip(&frame.data, frame.width, frame.height, face);
                chip.save(&images_dir.join(sample_file_name(student, serial, samples)))?;
            }
            tracing::debug!(samples, target, "registration progress");
        }
        if samples < target && !interval.is_zero() {
            std::thread::sleep(interval);
        }
    }

    table.append(serial, student)?;
    tracing::info!(serial, prn = %student.prn, samples, "registration captured");

    Ok(Registration {
        serial,
        samples,
        images_dir,
    })
}

/// Checks that must pass before any camera or model is opened: the detector
/// file, every field non-blank, a PRN without `_` (sample file names are
/// `_`-separated and parsed from the right) and not already registered.
pub fn check_registration(config: &Config, layout: &DataLayout, student: &NewStudent) -> Result<()> {
    ensure_detector(config)?;
    if let Some(field) = student.missing_field() {
        return Err(EngineError::MissingField(field));
    }
    if student.prn.contains('_') {
        return Err(EngineError::InvalidPrn(student.prn.clone()));
    }
    if layout.students().exists(&student.prn)? {
        return Err(EngineError::DuplicateStudent(student.prn.clone()));
    }
    Ok(())
}

pub(crate) fn ensure_detector(config: &Config) -> Result<()> {
    let path = config.detector_model_path();
    if !path.is_file() {
        return Err(EngineError::MissingDetector(path));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{face, fixture, ScriptedFrames, ScriptedLocator};

    fn student(prn: &str) -> NewStudent {
        NewStudent {
            prn: prn.into(),
            first_name: "Asha".into(),
            last_name: "Rao".into(),
            gender: "F".into(),
            date_of_birth: "01/01/2005".into(),
            roll_number: "7".into(),
            email: "asha@example.edu".into(),
            phone: "9800000000".into(),
            department: "Computer Engineering".into(),
            course: "BTech".into(),
            year: "First Year".into(),
            semester: "1".into(),
        }
    }

    #[test]
    fn test_file_name_format() {
        assert_eq!(sample_file_name(&student("P1"), 3, 12), "Asha_Rao_3_P1_12.jpg");
    }

    #[test]
    fn test_captures_target_samples_and_saves_row() {
        let fx = fixture(3);
        let mut frames = ScriptedFrames::lit(10);
        let mut locator = ScriptedLocator::always(vec![face(0.9)]);

        let reg = take_student_images(&fx.config, &fx.layout, &mut frames, &mut locator, &student("P1"), &fx.stop)
            .unwrap();
        assert_eq!(reg.serial, 1);
        assert_eq!(reg.samples, 3);
        assert!(reg.images_dir.join("Asha_Rao_1_P1_3.jpg").is_file());
        assert!(!reg.images_dir.join("Asha_Rao_1_P1_4.jpg").exists());

        let row = fx.layout.students().find_by_serial(1).unwrap().unwrap();
        assert_eq!(row.identifier(), Some("P1"));
    }

    #[test]
    fn test_low_confidence_faces_are_not_samples() {
        let fx = fixture(2);
        let mut frames = ScriptedFrames::lit(3);
        let mut locator = ScriptedLocator::always(vec![face(0.55), face(0.95)]);

        let reg = take_student_images(&fx.config, &fx.layout, &mut frames, &mut locator, &student("P1"), &fx.stop)
            .unwrap();
        assert_eq!(reg.samples, 2);
        assert_eq!(locator.calls, 2);
    }

    #[test]
    fn test_stream_end_still_saves_row() {
        let fx = fixture(100);
        let mut frames = ScriptedFrames::lit(2);
        let mut locator = ScriptedLocator::always(Vec::new());

        let reg = take_student_images(&fx.config, &fx.layout, &mut frames, &mut locator, &student("P1"), &fx.stop)
            .unwrap();
        assert_eq!(reg.samples, 0);
        assert!(fx.layout.students().exists("P1").unwrap());
        assert_eq!(fx.layout.students().next_serial().unwrap(), 2);
    }

    #[test]
    fn test_warmup_failure_still_saves_row() {
        let mut fx = fixture(5);
        fx.config.warmup_frames = 4;
        let mut frames = ScriptedFrames::lit(2);
        let mut locator = ScriptedLocator::always(vec![face(0.9)]);

        let reg = take_student_images(&fx.config, &fx.layout, &mut frames, &mut locator, &student("P1"), &fx.stop)
            .unwrap();
        assert_eq!(reg.samples, 0);
        assert_eq!(locator.calls, 0);
        assert!(fx.layout.students().exists("P1").unwrap());
    }

    #[test]
    fn test_prn_with_underscore_rejected() {
        let fx = fixture(1);
        let err = check_registration(&fx.config, &fx.layout, &student("CS_01")).unwrap_err();
        assert!(matches!(err, EngineError::InvalidPrn(prn) if prn == "CS_01"));
        assert!(check_registration(&fx.config, &fx.layout, &student("CS-01")).is_ok());
    }

    #[test]
    fn test_check_registration_sees_existing_prn() {
        let fx = fixture(1);
        assert!(check_registration(&fx.config, &fx.layout, &student("P1")).is_ok());
        fx.layout.students().append_on(1, &student("P1"), "01/09/2026").unwrap();
        assert!(matches!(
            check_registration(&fx.config, &fx.layout, &student("P1")),
            Err(EngineError::DuplicateStudent(_))
        ));
    }

    #[test]
    fn test_duplicate_prn_rejected_before_capture() {
        let fx = fixture(1);
        let mut locator = ScriptedLocator::always(vec![face(0.9)]);
        take_student_images(&fx.config, &fx.layout, &mut ScriptedFrames::lit(5), &mut locator, &student("P1"), &fx.stop)
            .unwrap();

        let mut frames = ScriptedFrames::lit(5);
        let err = take_student_images(&fx.config, &fx.layout, &mut frames, &mut locator, &student("P1"), &fx.stop)
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateStudent(prn) if prn == "P1"));
        assert_eq!(frames.remaining(), 5);
    }

    #[test]
    fn test_missing_detector_and_blank_field() {
        let fx = fixture(1);
        let mut locator = ScriptedLocator::always(vec![face(0.9)]);

        let mut incomplete = student("P1");
        incomplete.email.clear();
        let err = take_student_images(&fx.config, &fx.layout, &mut ScriptedFrames::lit(1), &mut locator, &incomplete, &fx.stop)
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingField("Email")));

        std::fs::remove_file(fx.config.detector_model_path()).unwrap();
        let err = take_student_images(&fx.config, &fx.layout, &mut ScriptedFrames::lit(1), &mut locator, &student("P1"), &fx.stop)
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingDetector(_)));
        assert!(!fx.layout.students().exists("P1").unwrap());
    }
}
