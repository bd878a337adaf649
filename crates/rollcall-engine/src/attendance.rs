//! The attendance capture loop.

use crate::config::Config;
use crate::enroll::ensure_detector;
use crate::error::{EngineError, Result};
use crate::session::{AttendanceSession, Recognition, SessionSummary};
use crate::stop::StopHandle;
use rollcall_core::{alignment, BoundingBox, Embedding, FaceEncoder, FaceLocator, TrainedModel};
use rollcall_hw::{CameraError, FrameSource};
use rollcall_store::{AttendanceBook, DataLayout, StudentTable};

/// Recognize faces from `source` and mark students present until the stop
/// flag is set, `max_frames` frames have been read, or the source fails.
///
/// Each detected face produces one [`Recognition`] passed to `observe`.
/// A face that fails to encode is reported and skipped; detector and
/// storage failures end the session with an error.
#[allow(clippy::too_many_arguments)]
pub fn start_attendance<S, L, E, F>(
    config: &Config,
    layout: &DataLayout,
    source: &mut S,
    locator: &mut L,
    encoder: &mut E,
    mut session: AttendanceSession,
    max_frames: Option<u64>,
    stop: &StopHandle,
    mut observe: F,
) -> Result<SessionSummary>
where
    S: FrameSource + ?Sized,
    L: FaceLocator + ?Sized,
    E: FaceEncoder + ?Sized,
    F: FnMut(&Recognition),
{
    ensure_detector(config)?;
    let model_path = layout.model_path();
    if !TrainedModel::exists(&model_path) {
        return Err(EngineError::ModelMissing(model_path));
    }
    let model = TrainedModel::load(&model_path)?;
    let matcher = Matcher {
        model: &model,
        threshold: config.match_threshold,
        students: layout.students(),
        book: layout.attendance(),
    };

    let warmed = match source.discard(config.warmup_frames) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "camera failed during warmup; ending session");
            false
        }
    };

    let details = session.details();
    tracing::info!(
        subject = %details.subject,
        faculty = %details.faculty,
        date = %details.date,
        samples = model.len(),
        "attendance session started"
    );

    let mut frames = 0u64;
    let mut faces_seen = 0u64;
    while warmed && !stop.is_stopped() && max_frames.map_or(true, |limit| frames < limit) {
        let frame = match source.next_frame() {
            Ok(frame) => frame,
            Err(CameraError::StreamEnded) => break,
            Err(e) => {
                tracing::warn!(error = %e, "frame capture failed; ending session");
                break;
            }
        };
        frames += 1;
        if frame.is_dark {
            tracing::trace!(sequence = frame.sequence, "skipping dark frame");
            continue;
        }

        for face in locator.locate(&frame.data, frame.width, frame.height)? {
            faces_seen += 1;
            let chip = alignment::face_chip(&frame.data, frame.width, frame.height, &face);
            let event = match encoder.encode(&chip) {
                Ok(embedding) => matcher.recognize(&mut session, face, &embedding)?,
                Err(e) => {
                    tracing::warn!(error = %e, "face recognition failed");
                    Recognition::Error {
                        face,
                        message: e.to_string(),
                    }
                }
            };
            observe(&event);
        }
    }

    tracing::info!(
        attended = session.attended().len(),
        frames,
        faces_seen,
        "attendance session ended"
    );
    Ok(SessionSummary::from_session(session, frames, faces_seen))
}

struct Matcher<'a> {
    model: &'a TrainedModel,
    threshold: f32,
    students: StudentTable,
    book: AttendanceBook,
}

impl Matcher<'_> {
    fn recognize(
        &self,
        session: &mut AttendanceSession,
        face: BoundingBox,
        embedding: &Embedding,
    ) -> Result<Recognition> {
        let Some(prediction) = self.model.predict(embedding) else {
            return Ok(Recognition::LowConfidence { face, distance: None });
        };
        let distance = prediction.distance;
        if distance >= self.threshold {
            return Ok(Recognition::LowConfidence {
                face,
                distance: Some(distance),
            });
        }

        let Some(student) = self.students.find_by_serial(prediction.label)? else {
            return Ok(Recognition::UnknownStudent {
                face,
                label: prediction.label,
                distance,
            });
        };
        let student_id = student
            .identifier()
            .map(str::to_string)
            .unwrap_or_else(|| prediction.label.to_string());
        let name = student.display_name();

        if !session.mark(&student_id) {
            return Ok(Recognition::AlreadyMarked {
                face,
                student_id,
                name,
                distance,
            });
        }
        self.book.record(&student, session.details())?;
        tracing::info!(student = %student_id, name = %name, distance, "marked present");
        Ok(Recognition::Marked {
            face,
            student_id,
            name,
            distance,
        })
    }
}
