//! The student table, `StudentDetails/StudentDetails.csv`.
//!
//! Rows are keyed by an auto-incremented serial (the label the face model
//! predicts) and by an external identifier (PRN). PRN uniqueness is checked
//! by scanning the file; there is no index.

use crate::error::Result;
use crate::layout;
use crate::record::{self, Record, FIRST_NAME_COLUMNS, ID_COLUMNS, SERIAL_COLUMNS};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const STUDENT_HEADER: [&str; 14] = [
    "Serial",
    "PRN",
    "First Name",
    "Last Name",
    "Gender",
    "Date of Birth",
    "Roll Number",
    "Email",
    "Phone Number",
    "Department",
    "Course",
    "Year",
    "Semester",
    "Registration Date",
];

/// Registration details for a student not yet in the table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewStudent {
    pub prn: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub date_of_birth: String,
    pub roll_number: String,
    pub email: String,
    pub phone: String,
    pub department: String,
    pub course: String,
    pub year: String,
    pub semester: String,
}

impl NewStudent {
    /// Header name of the first blank required field, if any. Every field is
    /// required.
    pub fn missing_field(&self) -> Option<&'static str> {
        let fields = [
            ("PRN", &self.prn),
            ("First Name", &self.first_name),
            ("Last Name", &self.last_name),
            ("Gender", &self.gender),
            ("Date of Birth", &self.date_of_birth),
            ("Roll Number", &self.roll_number),
            ("Email", &self.email),
            ("Phone Number", &self.phone),
            ("Department", &self.department),
            ("Course", &self.course),
            ("Year", &self.year),
            ("Semester", &self.semester),
        ];
        fields
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
    }
}

/// A student row as read back from the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    record: Record,
}

impl Student {
    pub fn from_record(record: Record) -> Self {
        Self { record }
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Serial from the first non-empty serial column, if it parses.
    pub fn serial(&self) -> Option<u32> {
        self.record
            .first_nonempty(SERIAL_COLUMNS)
            .and_then(|v| v.trim().parse().ok())
    }

    /// External identifier (`PRN`, else `ID`).
    pub fn identifier(&self) -> Option<&str> {
        self.record.first_present(ID_COLUMNS)
    }

    pub fn first_name(&self) -> &str {
        self.record.first_present(FIRST_NAME_COLUMNS).unwrap_or("")
    }

    pub fn last_name(&self) -> &str {
        self.record.field("Last Name")
    }

    /// `"First Last"`, trimmed so single-name rows don't carry a space.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name(), self.last_name())
            .trim()
            .to_string()
    }

    pub fn field(&self, column: &str) -> &str {
        self.record.field(column)
    }
}

#[derive(Debug, Clone)]
pub struct StudentTable {
    path: PathBuf,
}

impl StudentTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next serial to hand out: the file's row count including the header,
    /// or 1 for a table that does not exist yet.
    pub fn next_serial(&self) -> Result<u32> {
        let rows = record::count_rows(&self.path)?;
        Ok(rows.max(1) as u32)
    }

    /// Linear scan for a row carrying `prn` as its identifier.
    pub fn exists(&self, prn: &str) -> Result<bool> {
        Ok(self.all()?.iter().any(|s| s.identifier() == Some(prn)))
    }

    /// Append with today's registration date.
    pub fn append(&self, serial: u32, student: &NewStudent) -> Result<()> {
        self.append_on(serial, student, &layout::today())
    }

    pub fn append_on(&self, serial: u32, student: &NewStudent, registered: &str) -> Result<()> {
        let serial = serial.to_string();
        let row = [
            serial.as_str(),
            student.prn.as_str(),
            student.first_name.as_str(),
            student.last_name.as_str(),
            student.gender.as_str(),
            student.date_of_birth.as_str(),
            student.roll_number.as_str(),
            student.email.as_str(),
            student.phone.as_str(),
            student.department.as_str(),
            student.course.as_str(),
            student.year.as_str(),
            student.semester.as_str(),
            registered,
        ];
        record::append_row(&self.path, &STUDENT_HEADER, row)?;
        tracing::info!(serial = %serial, prn = %student.prn, "student registered");
        Ok(())
    }

    pub fn find_by_serial(&self, serial: u32) -> Result<Option<Student>> {
        Ok(self.all()?.into_iter().find(|s| s.serial() == Some(serial)))
    }

    pub fn find_by_identifier(&self, prn: &str) -> Result<Option<Student>> {
        Ok(self.all()?.into_iter().find(|s| s.identifier() == Some(prn)))
    }

    /// Data rows in the table (header excluded).
    pub fn count(&self) -> Result<usize> {
        Ok(record::count_rows(&self.path)?.saturating_sub(1))
    }

    pub fn all(&self) -> Result<Vec<Student>> {
        Ok(record::read_records(&self.path)?
            .unwrap_or_default()
            .into_iter()
            .map(Student::from_record)
            .collect())
    }
}
