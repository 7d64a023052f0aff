use std::fmt;

use chrono::{DateTime, Duration, Utc};
use lesson_core::model::{LessonId, ProgressEntry};
use storage::repository::Storage;
use storage::sqlite::DEFAULT_NAMESPACE;

/// Nominal lesson length used to turn the seeded percentages into seconds.
const SAMPLE_DURATION_SECS: f64 = 600.0;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    namespace: String,
    lessons: u32,
    prefix: String,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidLessons { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNamespace { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidLessons { raw } => write!(f, "invalid --lessons value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNamespace { raw } => write!(f, "invalid --namespace value: {raw:?}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("LESSON_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut namespace = std::env::var("LESSON_PROGRESS_NAMESPACE")
            .unwrap_or_else(|_| DEFAULT_NAMESPACE.into());
        let mut lessons = std::env::var("LESSON_SEED_LESSONS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(5);
        let mut prefix = "lesson-".to_string();
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
                "--namespace" => {
                    let value = require_value(&mut args, "--namespace")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidNamespace { raw: value });
                    }
                    namespace = value;
                }
                "--lessons" => {
                    let value = require_value(&mut args, "--lessons")?;
                    lessons = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidLessons { raw: value.clone() })?;
                }
                "--prefix" => {
                    prefix = require_value(&mut args, "--prefix")?;
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
            namespace,
            lessons,
            prefix,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --namespace <name>        Progress namespace (default: {DEFAULT_NAMESPACE})");
    eprintln!("  --lessons <n>             Number of lessons to record progress for (default: 5)");
    eprintln!("  --prefix <text>           Lesson id prefix (default: lesson-)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  LESSON_DB_URL, LESSON_PROGRESS_NAMESPACE, LESSON_SEED_LESSONS");
}

/// Fraction watched for the `i`-th seeded lesson. Cycles so the seeded data
/// covers unstarted, partial and completed lessons.
fn watch_level(i: u32) -> f64 {
    const LEVELS: [f64; 5] = [0.0, 0.25, 0.5, 0.92, 1.0];
    usize::try_from(i).map_or(0.0, |i| LEVELS[i % LEVELS.len()])
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite_with_namespace(&args.db_url, &args.namespace).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    for i in 0..args.lessons {
        let id = LessonId::new(format!("{}{}", args.prefix, i + 1));
        let accessed_at = now - Duration::minutes(i64::from(i) * 10);
        let entry = ProgressEntry::next(
            None,
            id,
            SAMPLE_DURATION_SECS * watch_level(i),
            SAMPLE_DURATION_SECS,
            accessed_at,
        )?;
        storage.progress.save_progress(&entry).await?;
    }

    println!(
        "Seeded progress for {} lessons into {} (namespace {})",
        args.lessons, args.db_url, args.namespace
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
