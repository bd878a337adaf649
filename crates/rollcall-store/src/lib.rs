//! rollcall-store — the flat CSV tables behind rollcall.
//!
//! A student table, one attendance file per date and exported reports. Files
//! are read and appended directly: no locking, no transactions, and a failed
//! append leaves whatever the previous append wrote.

pub mod attendance;
pub mod error;
pub mod layout;
pub mod record;
pub mod report;
pub mod students;

pub use attendance::{AttendanceBook, AttendanceRecord, SessionDetails, ALL_SUBJECTS};
pub use error::StoreError;
pub use layout::{today, DataLayout};
pub use record::Record;
pub use report::{export, statistics, student_summary, Statistics, StudentSummary};
pub use students::{NewStudent, Student, StudentTable};
