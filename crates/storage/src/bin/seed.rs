use std::fmt;

use chrono::{DateTime, Duration, Utc};
use lms_core::model::{Course, CourseId, ExamDraft, ExamId, Question, QuestionId, UserId};
use storage::repository::Storage;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    course_id: CourseId,
    exam_id: ExamId,
    instructor: UserId,
    time_limit_minutes: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidId { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
    InvalidTimeLimit { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
            ArgsError::InvalidTimeLimit { raw } => write!(f, "invalid --minutes value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_id(flag: &'static str, value: String) -> Result<u64, ArgsError> {
    value
        .parse::<u64>()
        .map_err(|_| ArgsError::InvalidId { flag, raw: value })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("LMS_DB_URL").unwrap_or_else(|_| "sqlite://lms.sqlite3".into());
        let mut course_id = CourseId::new(1);
        let mut exam_id = ExamId::new(1);
        let mut instructor = UserId::new(1);
        let mut time_limit_minutes = 1;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--course-id" => {
                    let value = require_value(&mut args, "--course-id")?;
                    course_id = CourseId::new(parse_id("--course-id", value)?);
                }
                "--exam-id" => {
                    let value = require_value(&mut args, "--exam-id")?;
                    exam_id = ExamId::new(parse_id("--exam-id", value)?);
                }
                "--instructor" => {
                    let value = require_value(&mut args, "--instructor")?;
                    instructor = UserId::new(parse_id("--instructor", value)?);
                }
                "--minutes" => {
                    let value = require_value(&mut args, "--minutes")?;
                    time_limit_minutes = value
                        .parse::<u32>()
                        .ok()
                        .filter(|m| *m > 0)
                        .ok_or(ArgsError::InvalidTimeLimit { raw: value })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            course_id,
            exam_id,
            instructor,
            time_limit_minutes,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://lms.sqlite3)");
    eprintln!("  --course-id <id>          Course id to upsert (default: 1)");
    eprintln!("  --exam-id <id>            Exam id to upsert (default: 1)");
    eprintln!("  --instructor <id>         Instructor user id (default: 1)");
    eprintln!("  --minutes <n>             Exam time limit in minutes (default: 1)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LMS_DB_URL, RUST_LOG");
}

fn sample_questions() -> Result<Vec<Question>, lms_core::model::ExamError> {
    let samples: [(&str, [&str; 4], usize); 3] = [
        (
            "Which keyword moves a value into a closure?",
            ["ref", "move", "static", "dyn"],
            1,
        ),
        (
            "What does the ? operator do on an Err value?",
            ["Returns it early", "Panics", "Ignores it", "Retries the call"],
            0,
        ),
        (
            "Which type owns a heap-allocated string?",
            ["&str", "char", "String", "[u8]"],
            2,
        ),
    ];

    samples
        .into_iter()
        .zip(1_u64..)
        .map(|((prompt, options, correct), id)| {
            Question::new(
                QuestionId::new(id),
                prompt,
                options.map(String::from).to_vec(),
                correct,
            )
        })
        .collect()
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let course = Course::new(
        args.course_id,
        "Rust Fundamentals",
        Some("Ownership, errors and the standard library".into()),
        args.instructor,
    )?;
    storage.courses.upsert_course(&course).await?;

    let exam = ExamDraft {
        id: args.exam_id,
        course_id: course.id(),
        title: "Rust Fundamentals: Checkpoint".into(),
        description: Some("Three quick questions".into()),
        time_limit_minutes: args.time_limit_minutes,
        available_from: now - Duration::days(1),
        available_until: now + Duration::days(30),
        questions: sample_questions()?,
    }
    .validate()?;
    storage.exams.upsert_exam(&exam).await?;

    tracing::info!(
        course_id = %course.id(),
        exam_id = %exam.id(),
        questions = exam.question_count(),
        db = %args.db_url,
        "seeded demo course and exam"
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = run().await {
        tracing::error!("{err}");
        std::process::exit(2);
    }
}
