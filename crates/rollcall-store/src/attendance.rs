//! Daily attendance files, `Attendance/Attendance_DD_MM_YYYY.csv`.

use crate::error::Result;
use crate::layout::{self, date_key};
use crate::record::{self, Record, FIRST_NAME_COLUMNS, ID_COLUMNS};
use crate::students::Student;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const ATTENDANCE_HEADER: [&str; 9] = [
    "PRN",
    "First Name",
    "Last Name",
    "Subject",
    "Faculty",
    "Date",
    "Time",
    "Department",
    "Year",
];

/// Subject filter value that disables filtering.
pub const ALL_SUBJECTS: &str = "All";

const FILE_PREFIX: &str = "Attendance_";

/// What a class session is; every row recorded during it carries these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionDetails {
    pub subject: String,
    pub faculty: String,
    /// `%d/%m/%Y`; also selects the file rows go to.
    pub date: String,
    pub time: String,
}

/// One attendance row as presented in listings and reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceRecord {
    pub prn: String,
    pub name: String,
    pub subject: String,
    pub faculty: String,
    pub date: String,
    pub time: String,
    pub status: String,
}

impl AttendanceRecord {
    fn from_row(row: &Record) -> Self {
        Self {
            prn: row.field("PRN").to_string(),
            name: format!("{} {}", row.field("First Name"), row.field("Last Name")),
            subject: row.field("Subject").to_string(),
            faculty: row.field("Faculty").to_string(),
            date: row.field("Date").to_string(),
            time: row.field("Time").to_string(),
            status: "Present".to_string(),
        }
    }

    pub fn to_row(&self) -> [&str; 7] {
        [
            self.prn.as_str(),
            self.name.as_str(),
            self.subject.as_str(),
            self.faculty.as_str(),
            self.date.as_str(),
            self.time.as_str(),
            self.status.as_str(),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct AttendanceBook {
    dir: PathBuf,
}

impl AttendanceBook {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_for(&self, date: &str) -> PathBuf {
        self.dir.join(format!("{FILE_PREFIX}{}.csv", date_key(date)))
    }

    /// Append one row for `student` to the session date's file, creating it
    /// with a header when needed.
    pub fn record(&self, student: &Student, session: &SessionDetails) -> Result<()> {
        let r = student.record();
        let row = [
            r.first_present(ID_COLUMNS).unwrap_or(""),
            r.first_present(FIRST_NAME_COLUMNS).unwrap_or(""),
            r.field("Last Name"),
            session.subject.as_str(),
            session.faculty.as_str(),
            session.date.as_str(),
            session.time.as_str(),
            r.field("Department"),
            r.field("Year"),
        ];
        record::append_row(&self.file_for(&session.date), &ATTENDANCE_HEADER, row)
    }

    /// Rows for `date` (today when `None`), optionally restricted to one
    /// subject. `None` or `"All"` keeps every subject. A date with no file
    /// has no records.
    pub fn records(&self, date: Option<&str>, subject: Option<&str>) -> Result<Vec<AttendanceRecord>> {
        let date = date.map_or_else(layout::today, str::to_string);
        let subject = subject.filter(|s| *s != ALL_SUBJECTS);

        let rows = record::read_records(&self.file_for(&date))?.unwrap_or_default();
        Ok(rows
            .iter()
            .filter(|row| subject.map_or(true, |s| row.field("Subject") == s))
            .map(AttendanceRecord::from_row)
            .collect())
    }

    /// Every attendance file in the directory, sorted by name.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension().is_some_and(|ext| ext == "csv")
                    && p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with(FILE_PREFIX))
            })
            .collect();
        files.sort();
        Ok(files)
    }

    /// Raw rows of one attendance file.
    pub(crate) fn rows_in(&self, file: &Path) -> Result<Vec<Record>> {
        Ok(record::read_records(file)?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(prn: &str, first: &str) -> Student {
        Student::from_record(Record::from_pairs([
            ("Serial", "1"),
            ("PRN", prn),
            ("First Name", first),
            ("Last Name", "Iyer"),
            ("Department", "Mechanical"),
            ("Year", "Second Year"),
        ]))
    }

    fn session(subject: &str) -> SessionDetails {
        SessionDetails {
            subject: subject.into(),
            faculty: "Dr. Kulkarni".into(),
            date: "14/10/2026".into(),
            time: "09:30".into(),
        }
    }

    #[test]
    fn test_record_then_list() {
        let dir = tempfile::tempdir().unwrap();
        let book = AttendanceBook::new(dir.path());
        book.record(&student("P1", "Asha"), &session("Maths")).unwrap();
        book.record(&student("P2", "Dev"), &session("Physics")).unwrap();

        assert!(dir.path().join("Attendance_14_10_2026.csv").is_file());
        let all = book.records(Some("14/10/2026"), None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Asha Iyer");
        assert_eq!(all[0].status, "Present");
        assert_eq!(all[0].faculty, "Dr. Kulkarni");
    }

    #[test]
    fn test_subject_filter() {
        let dir = tempfile::tempdir().unwrap();
        let book = AttendanceBook::new(dir.path());
        book.record(&student("P1", "Asha"), &session("Maths")).unwrap();
        book.record(&student("P2", "Dev"), &session("Physics")).unwrap();

        let maths = book.records(Some("14/10/2026"), Some("Maths")).unwrap();
        assert_eq!(maths.len(), 1);
        assert_eq!(maths[0].prn, "P1");
        assert_eq!(book.records(Some("14/10/2026"), Some(ALL_SUBJECTS)).unwrap().len(), 2);
    }

    #[test]
    fn test_missing_date_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let book = AttendanceBook::new(dir.path());
        assert!(book.records(Some("01/01/2001"), None).unwrap().is_empty());
        assert!(AttendanceBook::new(dir.path().join("nope")).files().unwrap().is_empty());
    }

    #[test]
    fn test_record_uses_legacy_columns() {
        let dir = tempfile::tempdir().unwrap();
        let book = AttendanceBook::new(dir.path());
        let legacy = Student::from_record(Record::from_pairs([("SERIAL NO.", "5"), ("ID", "A5"), ("NAME", "Zoya")]));
        book.record(&legacy, &session("Maths")).unwrap();

        let rows = book.records(Some("14/10/2026"), None).unwrap();
        assert_eq!(rows[0].prn, "A5");
        assert_eq!(rows[0].name, "Zoya ");
    }

    #[test]
    fn test_files_lists_only_attendance_csv() {
        let dir = tempfile::tempdir().unwrap();
        let book = AttendanceBook::new(dir.path());
        book.record(&student("P1", "Asha"), &session("Maths")).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::write(dir.path().join("other.csv"), "x").unwrap();
        assert_eq!(book.files().unwrap(), vec![dir.path().join("Attendance_14_10_2026.csv")]);
    }
}
