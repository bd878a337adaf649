use clap::{Args, Parser, Subcommand};
use rollcall_store::NewStudent;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rollcall", about = "Face-recognition attendance kept in CSV files")]
pub struct Cli {
    /// Config file (default: ./rollcall.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory, overriding the config file and environment
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data directories
    Init,
    /// Capture face samples for a new student and add them to the table
    Register(RegisterArgs),
    /// Train the face model from the captured samples
    Train,
    /// Run an attendance session until Ctrl-C
    Attend {
        #[arg(short, long)]
        subject: String,
        #[arg(short, long)]
        faculty: String,
        /// Session date, %d/%m/%Y (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Session time, %H:%M (default: now)
        #[arg(long)]
        time: Option<String>,
        /// Stop after this many frames
        #[arg(long)]
        max_frames: Option<u64>,
    },
    /// List attendance records
    Records {
        /// %d/%m/%Y (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Only this subject ("All" for every subject)
        #[arg(long)]
        subject: Option<String>,
    },
    /// Export a day's attendance to Reports/
    Export {
        /// %d/%m/%Y (default: today)
        #[arg(long)]
        date: Option<String>,
        #[arg(long, default_value = "csv")]
        format: String,
    },
    /// Show today's attendance statistics
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Show one student's attendance history
    Summary {
        /// Student PRN
        prn: String,
        #[arg(long)]
        json: bool,
    },
    /// List registered students
    Students {
        /// Show every column
        #[arg(short, long)]
        verbose: bool,
    },
    /// List V4L2 capture devices
    Devices,
}

#[derive(Args)]
pub struct RegisterArgs {
    #[arg(long)]
    pub prn: String,
    #[arg(long)]
    pub first_name: String,
    #[arg(long)]
    pub last_name: String,
    #[arg(long)]
    pub gender: String,
    /// %d/%m/%Y
    #[arg(long)]
    pub dob: String,
    #[arg(long)]
    pub roll_number: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub phone: String,
    #[arg(long)]
    pub department: String,
    #[arg(long)]
    pub course: String,
    #[arg(long)]
    pub year: String,
    #[arg(long)]
    pub semester: String,
}

impl From<RegisterArgs> for NewStudent {
    fn from(args: RegisterArgs) -> Self {
        Self {
            prn: args.prn,
            first_name: args.first_name,
            last_name: args.last_name,
            gender: args.gender,
            date_of_birth: args.dob,
            roll_number: args.roll_number,
            email: args.email,
            phone: args.phone,
            department: args.department,
            course: args.course,
            year: args.year,
            semester: args.semester,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_attend() {
        let cli = Cli::try_parse_from([
            "rollcall", "--data-dir", "/srv/class", "attend", "-s", "Maths", "-f", "Dr. Shah", "--max-frames", "30",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/srv/class")));
        match cli.command {
            Commands::Attend { subject, faculty, date, max_frames, .. } => {
                assert_eq!(subject, "Maths");
                assert_eq!(faculty, "Dr. Shah");
                assert_eq!(date, None);
                assert_eq!(max_frames, Some(30));
            }
            _ => panic!("expected attend"),
        }
    }

    #[test]
    fn test_register_args_convert() {
        let cli = Cli::try_parse_from([
            "rollcall", "register", "--prn", "P1", "--first-name", "Asha", "--last-name", "Rao", "--gender", "F",
            "--dob", "01/01/2005", "--roll-number", "7", "--email", "a@x.in", "--phone", "98", "--department", "CE",
            "--course", "BTech", "--year", "FY", "--semester", "1",
        ])
        .unwrap();
        let Commands::Register(args) = cli.command else {
            panic!("expected register");
        };
        let student = NewStudent::from(args);
        assert_eq!(student.date_of_birth, "01/01/2005");
        assert_eq!(student.missing_field(), None);
    }
}
