//! On-disk layout of a rollcall data directory.
//!
//! ```text
//! <root>/
//!   TrainingImage/                 face chips, <first>_<last>_<serial>_<prn>_<n>.jpg
//!   TrainingImageLabel/Trainner.yml
//!   StudentDetails/StudentDetails.csv
//!   Attendance/Attendance_DD_MM_YYYY.csv
//!   StudentProfiles/
//!   Reports/Attendance_Report_DD_MM_YYYY.csv
//! ```

use crate::attendance::AttendanceBook;
use crate::students::StudentTable;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const TRAINING_IMAGES: &str = "TrainingImage";
const TRAINING_LABELS: &str = "TrainingImageLabel";
const STUDENT_DETAILS: &str = "StudentDetails";
const ATTENDANCE: &str = "Attendance";
const STUDENT_PROFILES: &str = "StudentProfiles";
const REPORTS: &str = "Reports";

const MODEL_FILE: &str = "Trainner.yml";
const STUDENT_FILE: &str = "StudentDetails.csv";

/// `31/12/2025` → `31_12_2025`, the form dates take in file names.
pub fn date_key(date: &str) -> String {
    date.replace('/', "_")
}

/// Today's date in the `%d/%m/%Y` form used throughout the tables.
pub fn today() -> String {
    chrono::Local::now().format("%d/%m/%Y").to_string()
}

#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the working directories. `Reports/` is created on first export.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        for dir in [TRAINING_IMAGES, TRAINING_LABELS, STUDENT_DETAILS, ATTENDANCE, STUDENT_PROFILES] {
            fs::create_dir_all(self.root.join(dir))?;
        }
        Ok(())
    }

    pub fn training_images_dir(&self) -> PathBuf {
        self.root.join(TRAINING_IMAGES)
    }

    pub fn model_path(&self) -> PathBuf {
        self.root.join(TRAINING_LABELS).join(MODEL_FILE)
    }

    pub fn student_file(&self) -> PathBuf {
        self.root.join(STUDENT_DETAILS).join(STUDENT_FILE)
    }

    pub fn attendance_dir(&self) -> PathBuf {
        self.root.join(ATTENDANCE)
    }

    pub fn profiles_dir(&self) -> PathBuf {
        self.root.join(STUDENT_PROFILES)
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.root.join(REPORTS)
    }

    pub fn report_file(&self, date: &str) -> PathBuf {
        self.reports_dir().join(format!("Attendance_Report_{}.csv", date_key(date)))
    }

    pub fn students(&self) -> StudentTable {
        StudentTable::new(self.student_file())
    }

    pub fn attendance(&self) -> AttendanceBook {
        AttendanceBook::new(self.attendance_dir())
    }
}
