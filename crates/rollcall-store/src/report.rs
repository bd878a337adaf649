//! Exports and aggregates over the student and attendance tables.

use crate::attendance::AttendanceRecord;
use crate::error::{Result, StoreError};
use crate::layout::DataLayout;
use crate::record::ID_COLUMNS;
use csv::Writer;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;

pub const REPORT_HEADER: [&str; 7] = ["PRN", "Name", "Subject", "Faculty", "Date", "Time", "Status"];

/// Write the attendance report for `date`. Only `csv` is supported; a date
/// with no attendance file exports a header-only report.
pub fn export(layout: &DataLayout, date: &str, format: &str) -> Result<PathBuf> {
    if !format.eq_ignore_ascii_case("csv") {
        return Err(StoreError::UnsupportedFormat(format.to_string()));
    }

    let records = layout.attendance().records(Some(date), None)?;
    fs::create_dir_all(layout.reports_dir())?;
    let path = layout.report_file(date);

    let mut writer = Writer::from_path(&path)?;
    writer.write_record(REPORT_HEADER)?;
    for record in &records {
        writer.write_record(record.to_row())?;
    }
    writer.flush()?;

    tracing::info!(path = %path.display(), rows = records.len(), "exported attendance report");
    Ok(path)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total_students: usize,
    /// Distinct subjects with attendance on the day.
    pub total_subjects: usize,
    pub todays_attendance: usize,
    /// Percent of registered students marked on the day, one decimal.
    pub attendance_rate: f64,
}

/// Headline numbers for `date` (normally today).
pub fn statistics(layout: &DataLayout, date: &str) -> Result<Statistics> {
    let total_students = layout.students().count()?;
    let todays: Vec<AttendanceRecord> = layout.attendance().records(Some(date), None)?;

    let attendance_rate = if total_students > 0 {
        round1(todays.len() as f64 / total_students as f64 * 100.0)
    } else {
        0.0
    };
    let subjects: BTreeSet<&str> = todays.iter().map(|r| r.subject.as_str()).collect();

    Ok(Statistics {
        total_students,
        total_subjects: subjects.len(),
        todays_attendance: todays.len(),
        attendance_rate,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StudentSummary {
    /// Days with an attendance file.
    pub total_days: usize,
    /// Days on which the student appears at least once.
    pub present_days: usize,
    pub attendance_percentage: f64,
    /// Rows recorded per subject across all days.
    pub subjects: BTreeMap<String, usize>,
}

/// Attendance history of one student across every attendance file.
pub fn student_summary(layout: &DataLayout, prn: &str) -> Result<StudentSummary> {
    let book = layout.attendance();
    let mut summary = StudentSummary::default();

    for file in book.files()? {
        summary.total_days += 1;
        let mut present = false;
        for row in book.rows_in(&file)? {
            if row.first_present(ID_COLUMNS) != Some(prn) {
                continue;
            }
            present = true;
            *summary.subjects.entry(row.field("Subject").to_string()).or_default() += 1;
        }
        if present {
            summary.present_days += 1;
        }
    }

    if summary.total_days > 0 {
        summary.attendance_percentage =
            round1(summary.present_days as f64 / summary.total_days as f64 * 100.0);
    }
    Ok(summary)
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
