use std::fmt;

use lesson_core::Hierarchy;
use lesson_core::model::LessonId;
use services::{AppServices, CatalogOverview, Clock, ServicesConfig, parse_records};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNamespace { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNamespace { raw } => write!(f, "invalid --namespace value: {raw:?}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
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

fn parse_number<T: std::str::FromStr>(value: String, flag: &'static str) -> Result<T, ArgsError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw: value })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- tree     --records <file.json> [--json] [common]");
    eprintln!("  cargo run -p app -- progress --lesson <id> --seconds <s> --duration <s> [common]");
    eprintln!("  cargo run -p app -- recent   [--limit <n>] [--records <file.json>] [common]");
    eprintln!("  cargo run -p app -- next     --records <file.json> --lesson <id> [common]");
    eprintln!();
    eprintln!("Common options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:lessons.sqlite3)");
    eprintln!("  --namespace <name>        Progress namespace (default: lesson-progress)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LESSON_DB_URL, LESSON_PROGRESS_NAMESPACE, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Tree,
    Progress,
    Recent,
    Next,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "tree" => Some(Self::Tree),
            "progress" => Some(Self::Progress),
            "recent" => Some(Self::Recent),
            "next" => Some(Self::Next),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    db_url: Option<String>,
    namespace: Option<String>,
    records: Option<String>,
    lesson: Option<LessonId>,
    seconds: Option<f64>,
    duration: Option<f64>,
    limit: u32,
    json: bool,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            limit: 10,
            ..Self::default()
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = Some(value);
                }
                "--namespace" => {
                    let value = require_value(args, "--namespace")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidNamespace { raw: value });
                    }
                    parsed.namespace = Some(value);
                }
                "--records" => parsed.records = Some(require_value(args, "--records")?),
                "--lesson" => {
                    let value = require_value(args, "--lesson")?;
                    let id = value
                        .parse::<LessonId>()
                        .map_err(|_| ArgsError::InvalidNumber {
                            flag: "--lesson",
                            raw: value.clone(),
                        })?;
                    parsed.lesson = Some(id);
                }
                "--seconds" => {
                    parsed.seconds = Some(parse_number(require_value(args, "--seconds")?, "--seconds")?);
                }
                "--duration" => {
                    parsed.duration =
                        Some(parse_number(require_value(args, "--duration")?, "--duration")?);
                }
                "--limit" => {
                    parsed.limit = parse_number(require_value(args, "--limit")?, "--limit")?;
                }
                "--json" => parsed.json = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }

    fn records(&self) -> Result<&str, ArgsError> {
        self.records
            .as_deref()
            .ok_or(ArgsError::MissingFlag { flag: "--records" })
    }

    fn lesson(&self) -> Result<&LessonId, ArgsError> {
        self.lesson
            .as_ref()
            .ok_or(ArgsError::MissingFlag { flag: "--lesson" })
    }

    /// Environment configuration with command-line overrides applied.
    fn config(&self) -> Result<ServicesConfig, Box<dyn std::error::Error>> {
        let mut config = ServicesConfig::from_env()?;
        if let Some(db_url) = &self.db_url {
            config.db_url.clone_from(db_url);
        }
        if let Some(namespace) = &self.namespace {
            config.namespace.clone_from(namespace);
        }
        config.db_url = normalize_sqlite_url(config.db_url);
        Ok(config)
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") || raw.starts_with("sqlite:file:")
    {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" || db_url.starts_with("sqlite:file:") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn load_tree(services: &AppServices, path: &str) -> Result<Hierarchy, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    let records = parse_records(&raw)?;
    Ok(services.catalog().build(&records))
}

fn print_overview(view: &CatalogOverview) {
    println!(
        "{} areas, {} modules, {} lessons ({}% complete)",
        view.total_areas, view.total_modules, view.total_lessons, view.percent_complete
    );
    for area in &view.areas {
        println!("{} [{} lessons, {}%]", area.name, area.lesson_count, area.percent_complete);
        for module in &area.modules {
            println!(
                "  {} [{} min, {}%]",
                module.name, module.total_duration_minutes, module.percent_complete
            );
            for lesson in &module.lessons {
                let mark = if lesson.completed { "x" } else { " " };
                println!(
                    "    [{mark}] {} {} ({} min, {}% watched)",
                    lesson.id, lesson.name, lesson.duration_minutes, lesson.percent_watched
                );
            }
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let parsed = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    let config = parsed.config()?;
    prepare_sqlite_file(&config.db_url)?;
    let services = AppServices::new_sqlite(config, Clock::default()).await?;
    tracing::debug!(?cmd, "running command");

    match cmd {
        Command::Tree => {
            let tree = load_tree(&services, parsed.records()?)?;
            let view = services.catalog().overview(&tree).await?;
            if parsed.json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_overview(&view);
            }
        }
        Command::Progress => {
            let lesson = parsed.lesson()?;
            let seconds = parsed
                .seconds
                .ok_or(ArgsError::MissingFlag { flag: "--seconds" })?;
            let duration = parsed
                .duration
                .ok_or(ArgsError::MissingFlag { flag: "--duration" })?;
            let entry = services.progress().update(lesson, seconds, duration).await?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        Command::Recent => {
            if let Some(path) = parsed.records.as_deref() {
                let tree = load_tree(&services, path)?;
                let items = services.catalog().continue_watching(&tree, parsed.limit).await?;
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                let entries = services.progress().recent(parsed.limit).await?;
                println!("{}", serde_json::to_string_pretty(&entries)?);
            }
        }
        Command::Next => {
            let tree = load_tree(&services, parsed.records()?)?;
            match services.catalog().next_source(&tree, parsed.lesson()?)? {
                Some(source) => println!("{} {}", source.lesson_id, source.video_ref),
                None => println!("end of catalog"),
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
