mod cli;
mod display;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use rollcall_engine::{
    AttendanceSession, AttendanceSystem, Config, EngineError, Registration, SessionSummary, TrainingReport,
};
use rollcall_hw::Camera;
use rollcall_store::NewStudent;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    let system = AttendanceSystem::new(config);
    let layout = system.layout().clone();

    match cli.command {
        Commands::Init => {
            system.init()?;
            println!("Data directories ready under {}", layout.root().display());
        }
        Commands::Register(args) => {
            system.init()?;
            let student = NewStudent::from(args);
            system.check_registration(&student)?;
            println!("Capturing samples for {} {}; Ctrl-C to stop early.", student.first_name, student.last_name);
            let worker = system.clone();
            let reg = run_until_ctrl_c(&system, move || register(&worker, &student)).await?;
            println!(
                "Captured {} images for serial {} in {}",
                reg.samples,
                reg.serial,
                reg.images_dir.display()
            );
        }
        Commands::Train => {
            let worker = system.clone();
            let report = tokio::task::spawn_blocking(move || train(&worker)).await??;
            println!(
                "Profile saved. Trained on {} images of {} students ({}).",
                report.images,
                report.students,
                report.model_path.display()
            );
        }
        Commands::Attend {
            subject,
            faculty,
            date,
            time,
            max_frames,
        } => {
            let mut details = AttendanceSession::starting_now(&subject, &faculty)?.details().clone();
            if let Some(date) = date {
                details.date = date;
            }
            if let Some(time) = time {
                details.time = time;
            }
            let session = AttendanceSession::new(details)?;
            println!(
                "Taking attendance for {} ({}); Ctrl-C to stop.",
                session.details().subject,
                session.details().faculty
            );
            let worker = system.clone();
            let summary = run_until_ctrl_c(&system, move || attend(&worker, session, max_frames)).await?;
            display::show_session(&summary);
        }
        Commands::Records { date, subject } => {
            let date = date.unwrap_or_else(rollcall_store::today);
            let records = layout.attendance().records(Some(&date), subject.as_deref())?;
            display::show_records(&date, records);
        }
        Commands::Export { date, format } => {
            let date = date.unwrap_or_else(rollcall_store::today);
            let path = rollcall_store::export(&layout, &date, &format)?;
            println!("Report exported to {}", path.display());
        }
        Commands::Stats { json } => {
            let today = rollcall_store::today();
            let stats = rollcall_store::statistics(&layout, &today)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                display::show_statistics(&today, &stats);
            }
        }
        Commands::Summary { prn, json } => {
            let summary = rollcall_store::student_summary(&layout, &prn)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                display::show_summary(&prn, &summary);
            }
        }
        Commands::Students { verbose } => {
            display::show_students(layout.students().all()?, verbose);
        }
        Commands::Devices => {
            display::show_devices(&Camera::list_devices());
        }
    }

    Ok(())
}

/// Run a blocking capture on the blocking pool; Ctrl-C sets the stop flag
/// and waits for the loop to finish its current frame.
async fn run_until_ctrl_c<T, F>(system: &AttendanceSystem, job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> std::result::Result<T, EngineError> + Send + 'static,
{
    let mut task = tokio::task::spawn_blocking(job);
    let output = tokio::select! {
        joined = &mut task => joined?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("listening for Ctrl-C")?;
            tracing::info!("stop requested");
            system.stop_attendance();
            task.await?
        }
    };
    Ok(output?)
}

fn register(system: &AttendanceSystem, student: &NewStudent) -> std::result::Result<Registration, EngineError> {
    let mut detector = system.load_detector(system.config().registration_threshold)?;
    let camera = system.open_camera()?;
    let mut stream = camera.stream(system.config().enhance_contrast)?;
    system.take_student_images(&mut stream, &mut detector, student)
}

fn train(system: &AttendanceSystem) -> std::result::Result<TrainingReport, EngineError> {
    let mut recognizer = system.load_recognizer()?;
    system.save_student_profile(&mut recognizer)
}

fn attend(
    system: &AttendanceSystem,
    session: AttendanceSession,
    max_frames: Option<u64>,
) -> std::result::Result<SessionSummary, EngineError> {
    let config = system.config();
    let mut detector = system.load_detector(config.detection_threshold)?;
    let mut recognizer = system.load_recognizer()?;
    let camera = system.open_camera()?;
    let mut stream = camera.stream(config.enhance_contrast)?;
    system.start_attendance(
        &mut stream,
        &mut detector,
        &mut recognizer,
        session,
        max_frames,
        display::print_recognition,
    )
}
