use rollcall_engine::{Recognition, SessionSummary};
use rollcall_hw::DeviceInfo;
use rollcall_store::{AttendanceRecord, Statistics, Student, StudentSummary};
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "PRN")]
    prn: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Faculty")]
    faculty: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// Pretty prints attendance records.
pub fn show_records(date: &str, records: Vec<AttendanceRecord>) {
    if records.is_empty() {
        println!("No attendance recorded for {date}.");
        return;
    }
    let rows = records.into_iter().map(|r| RecordRow {
        prn: r.prn,
        name: r.name,
        subject: r.subject,
        faculty: r.faculty,
        date: r.date,
        time: r.time,
        status: r.status,
    });
    let mut table = Table::new(rows);
    table.with(Style::modern());
    println!("Attendance for {date}:\n{table}");
}

/// Pretty prints the student table.
pub fn show_students(students: Vec<Student>, verbose: bool) {
    if students.is_empty() {
        println!("No students registered.");
        return;
    }

    let mut table = if verbose {
        #[derive(Tabled)]
        struct FullStudent {
            #[tabled(rename = "Serial")]
            serial: String,
            #[tabled(rename = "PRN")]
            prn: String,
            #[tabled(rename = "Name")]
            name: String,
            #[tabled(rename = "Gender")]
            gender: String,
            #[tabled(rename = "Email")]
            email: String,
            #[tabled(rename = "Phone")]
            phone: String,
            #[tabled(rename = "Department")]
            department: String,
            #[tabled(rename = "Course")]
            course: String,
            #[tabled(rename = "Year")]
            year: String,
            #[tabled(rename = "Semester")]
            semester: String,
            #[tabled(rename = "Registered")]
            registered: String,
        }

        Table::new(students.iter().map(|s| FullStudent {
            serial: serial_text(s),
            prn: s.identifier().unwrap_or_default().to_string(),
            name: s.display_name(),
            gender: s.field("Gender").to_string(),
            email: s.field("Email").to_string(),
            phone: s.field("Phone Number").to_string(),
            department: s.field("Department").to_string(),
            course: s.field("Course").to_string(),
            year: s.field("Year").to_string(),
            semester: s.field("Semester").to_string(),
            registered: s.field("Registration Date").to_string(),
        }))
    } else {
        #[derive(Tabled)]
        struct SimpleStudent {
            #[tabled(rename = "Serial")]
            serial: String,
            #[tabled(rename = "PRN")]
            prn: String,
            #[tabled(rename = "Name")]
            name: String,
            #[tabled(rename = "Department")]
            department: String,
            #[tabled(rename = "Year")]
            year: String,
        }

        Table::new(students.iter().map(|s| SimpleStudent {
            serial: serial_text(s),
            prn: s.identifier().unwrap_or_default().to_string(),
            name: s.display_name(),
            department: s.field("Department").to_string(),
            year: s.field("Year").to_string(),
        }))
    };

    table.with(Style::modern());
    println!("Students ({}):\n{table}", students.len());
}

fn serial_text(student: &Student) -> String {
    student.serial().map(|s| s.to_string()).unwrap_or_else(|| "-".to_string())
}

pub fn show_statistics(date: &str, stats: &Statistics) {
    #[derive(Tabled)]
    struct Line {
        #[tabled(rename = "Metric")]
        metric: &'static str,
        #[tabled(rename = "Value")]
        value: String,
    }

    let lines = [
        Line {
            metric: "Total students",
            value: stats.total_students.to_string(),
        },
        Line {
            metric: "Attendance today",
            value: stats.todays_attendance.to_string(),
        },
        Line {
            metric: "Attendance rate",
            value: format!("{:.1}%", stats.attendance_rate),
        },
        Line {
            metric: "Subjects today",
            value: stats.total_subjects.to_string(),
        },
    ];
    let mut table = Table::new(lines);
    table.with(Style::modern());
    println!("Statistics for {date}:\n{table}");
}

pub fn show_summary(prn: &str, summary: &StudentSummary) {
    println!(
        "{prn}: present {} of {} days ({:.1}%)",
        summary.present_days, summary.total_days, summary.attendance_percentage
    );
    if summary.subjects.is_empty() {
        return;
    }

    #[derive(Tabled)]
    struct SubjectRow<'a> {
        #[tabled(rename = "Subject")]
        subject: &'a str,
        #[tabled(rename = "Sessions")]
        sessions: usize,
    }

    let mut table = Table::new(summary.subjects.iter().map(|(subject, &sessions)| SubjectRow {
        subject: subject.as_str(),
        sessions,
    }));
    table.with(Style::modern());
    println!("{table}");
}

pub fn show_devices(devices: &[DeviceInfo]) {
    if devices.is_empty() {
        println!("No V4L2 capture devices found.");
        return;
    }

    #[derive(Tabled)]
    struct DeviceRow<'a> {
        #[tabled(rename = "Device")]
        path: &'a str,
        #[tabled(rename = "Name")]
        name: &'a str,
        #[tabled(rename = "Driver")]
        driver: &'a str,
        #[tabled(rename = "Bus")]
        bus: &'a str,
    }

    let mut table = Table::new(devices.iter().map(|d| DeviceRow {
        path: &d.path,
        name: &d.name,
        driver: &d.driver,
        bus: &d.bus,
    }));
    table.with(Style::modern());
    println!("{table}");
}

/// Live feedback during a session: marks go to stdout, the rest to the log.
pub fn print_recognition(event: &Recognition) {
    match event {
        Recognition::Marked { .. } => println!("  ✓ {}", event.label()),
        Recognition::AlreadyMarked { .. } => tracing::debug!(label = %event.label(), "already marked"),
        Recognition::UnknownStudent { label, .. } => tracing::debug!(label, "matched label has no student row"),
        Recognition::LowConfidence { distance, .. } => tracing::debug!(?distance, "low confidence face"),
        Recognition::Error { message, .. } => tracing::debug!(%message, "recognition error"),
    }
}

pub fn show_session(summary: &SessionSummary) {
    println!(
        "Attendance session completed. {} students attended ({} frames, {} faces).",
        summary.attended.len(),
        summary.frames_processed,
        summary.faces_seen
    );
    for id in &summary.attended {
        println!("  {id}");
    }
}
