//! One class session: its details, when it started and who has been marked.

use crate::error::{EngineError, Result};
use chrono::{DateTime, Local};
use rollcall_core::BoundingBox;
use rollcall_store::SessionDetails;
use serde::Serialize;
use std::collections::HashSet;

/// What the loop saw for one detected face.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recognition {
    /// Recognized and appended to today's attendance file.
    Marked {
        face: BoundingBox,
        student_id: String,
        name: String,
        distance: f32,
    },
    /// Recognized, but already marked earlier in this session.
    AlreadyMarked {
        face: BoundingBox,
        student_id: String,
        name: String,
        distance: f32,
    },
    /// Matched a label with no row in the student table.
    UnknownStudent {
        face: BoundingBox,
        label: u32,
        distance: f32,
    },
    /// Nearest sample was not close enough (or the model had nothing).
    LowConfidence { face: BoundingBox, distance: Option<f32> },
    Error { face: BoundingBox, message: String },
}

impl Recognition {
    pub fn face(&self) -> &BoundingBox {
        match self {
            Self::Marked { face, .. }
            | Self::AlreadyMarked { face, .. }
            | Self::UnknownStudent { face, .. }
            | Self::LowConfidence { face, .. }
            | Self::Error { face, .. } => face,
        }
    }

    /// Overlay text for the face.
    pub fn label(&self) -> String {
        match self {
            Self::Marked { name, student_id, .. } | Self::AlreadyMarked { name, student_id, .. } => {
                format!("{name} (ID: {student_id})")
            }
            Self::UnknownStudent { .. } => "Unknown Student".to_string(),
            Self::LowConfidence { .. } => "Low Confidence".to_string(),
            Self::Error { .. } => "Recognition Error".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AttendanceSession {
    details: SessionDetails,
    started_at: DateTime<Local>,
    attended: Vec<String>,
    seen: HashSet<String>,
}

impl AttendanceSession {
    /// Every detail must be non-blank.
    pub fn new(details: SessionDetails) -> Result<Self> {
        let fields = [
            ("subject", &details.subject),
            ("faculty", &details.faculty),
            ("date", &details.date),
            ("time", &details.time),
        ];
        if let Some((name, _)) = fields.into_iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(EngineError::MissingSessionDetail(name));
        }
        Ok(Self {
            details,
            started_at: Local::now(),
            attended: Vec::new(),
            seen: HashSet::new(),
        })
    }

    /// Session for `subject`/`faculty` stamped with the current date and time.
    pub fn starting_now(subject: &str, faculty: &str) -> Result<Self> {
        let now = Local::now();
        Self::new(SessionDetails {
            subject: subject.to_string(),
            faculty: faculty.to_string(),
            date: now.format("%d/%m/%Y").to_string(),
            time: now.format("%H:%M").to_string(),
        })
    }

    pub fn details(&self) -> &SessionDetails {
        &self.details
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Add `student_id` to the attended set. False if it was already there.
    pub fn mark(&mut self, student_id: &str) -> bool {
        if !self.seen.insert(student_id.to_string()) {
            return false;
        }
        self.attended.push(student_id.to_string());
        true
    }

    pub fn is_marked(&self, student_id: &str) -> bool {
        self.seen.contains(student_id)
    }

    /// Identifiers in the order they were marked.
    pub fn attended(&self) -> &[String] {
        &self.attended
    }
}

/// What a finished session did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub details: SessionDetails,
    pub started_at: String,
    pub attended: Vec<String>,
    pub frames_processed: u64,
    pub faces_seen: u64,
}

impl SessionSummary {
    pub(crate) fn from_session(session: AttendanceSession, frames_processed: u64, faces_seen: u64) -> Self {
        Self {
            started_at: session.started_at.format("%d/%m/%Y %H:%M:%S").to_string(),
            details: session.details,
            attended: session.attended,
            frames_processed,
            faces_seen,
        }
    }
}
