mod config;
mod terminal;

use std::fmt;

use services::{CatalogService, Clock, ExamRunner};
use storage::repository::Storage;
use storage::sqlite::SqliteSettings;
use storage::sample;
use toeic_core::model::{ExamId, ExamSetup, SelectionError};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidExamId { raw: String },
    InvalidDbUrl { raw: String },
    Setup(SelectionError),
    SeedNeedsDb,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidExamId { raw } => write!(f, "invalid exam id: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::Setup(err) => write!(f, "invalid exam setup: {err}"),
            ArgsError::SeedNeedsDb => write!(f, "seed requires --db or TOEIC_DB_URL"),
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    List,
    Setup,
    Take,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "list" => Some(Self::List),
            "setup" => Some(Self::Setup),
            "take" => Some(Self::Take),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    db_url: Option<String>,
    exam_id: ExamId,
    setup: ExamSetup,
    json: bool,
}

impl Args {
    fn parse(
        config: &Config,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = config.db_url.clone();
        let mut exam_id = config.exam_id;
        let mut parts: Option<String> = None;
        let mut time: Option<String> = None;
        let mut query: Option<String> = None;
        let mut json = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = Some(value);
                }
                "--parts" => parts = Some(require_value(args, "--parts")?),
                "--time" => time = Some(require_value(args, "--time")?),
                "--query" => query = Some(require_value(args, "--query")?),
                "--json" => json = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                other if !other.starts_with('-') => {
                    exam_id = other
                        .parse()
                        .map_err(|_| ArgsError::InvalidExamId { raw: arg.clone() })?;
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let setup = match query {
            Some(q) if parts.is_none() && time.is_none() => ExamSetup::from_query_str(&q),
            Some(_) => return Err(ArgsError::UnknownArg("--query with --parts/--time".into())),
            None => ExamSetup::from_query(parts.as_deref(), time.as_deref()),
        }
        .map_err(ArgsError::Setup)?;

        Ok(Self {
            db_url: db_url.map(normalize_sqlite_url),
            exam_id,
            setup,
            json,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- list  [--db <sqlite_url>] [--json]");
    eprintln!("  cargo run -p app -- setup [exam_id] [--parts <all|1,2,..>] [--time <minutes>] [--json]");
    eprintln!("  cargo run -p app -- take  [exam_id] [--parts <all|1,2,..>] [--time <minutes>] [--json]");
    eprintln!("  cargo run -p app -- seed  --db <sqlite_url>");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>     Question bank (default: built-in sample bank in memory)");
    eprintln!("  --parts <list>        Parts to include, e.g. 1,2 (default: all)");
    eprintln!("  --time <minutes>      Custom time limit, 1 to 300 minutes");
    eprintln!("  --query <query>       Setup as a query string, e.g. parts=1,2&time=25");
    eprintln!("  --json                Print machine-readable output");
    eprintln!();
    eprintln!("Environment (a .env file is read if present):");
    eprintln!("  TOEIC_DB_URL, TOEIC_EXAM_ID, RUST_LOG");
    eprintln!("  TOEIC_DB_MAX_CONNECTIONS, TOEIC_DB_BUSY_TIMEOUT_MS");
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
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
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

fn init_tracing(filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn open_storage(
    db_url: Option<&str>,
    settings: SqliteSettings,
) -> Result<Storage, Box<dyn std::error::Error>> {
    match db_url {
        Some(url) => {
            prepare_sqlite_file(url)?;
            tracing::info!(
                db = url,
                max_connections = settings.max_connections,
                "opening question bank"
            );
            Ok(Storage::sqlite_with(url, settings).await?)
        }
        None => {
            tracing::info!("using the built-in sample question bank");
            Ok(Storage::sample()?)
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    init_tracing(&config.log_filter);

    let mut argv = std::env::args().skip(1).peekable();
    let cmd = match argv.peek().map(String::as_str) {
        None => Command::Take,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Take,
        Some(first) => match Command::from_arg(first) {
            Some(cmd) => {
                argv.next();
                cmd
            }
            // a bare exam id means "take"
            None if first.parse::<ExamId>().is_ok() => Command::Take,
            None => {
                let err = ArgsError::UnknownArg(first.to_string());
                eprintln!("{err}");
                print_usage();
                return Err(err.into());
            }
        },
    };

    let args = Args::parse(&config, &mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    match cmd {
        Command::List => {
            let storage = open_storage(args.db_url.as_deref(), config.sqlite).await?;
            let summaries = CatalogService::from_storage(&storage).list().await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                print!("{}", terminal::render_summaries(&summaries));
            }
        }
        Command::Setup => {
            let storage = open_storage(args.db_url.as_deref(), config.sqlite).await?;
            let preview = CatalogService::from_storage(&storage)
                .preview(args.exam_id, &args.setup)
                .await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&preview)?);
            } else {
                print!("{}", terminal::render_preview(&preview));
            }
        }
        Command::Take => {
            let storage = open_storage(args.db_url.as_deref(), config.sqlite).await?;
            let runner = ExamRunner::new(Clock::system(), storage.exams);
            let running = runner.start(args.exam_id, &args.setup).await?;
            match terminal::take_exam(running).await? {
                Some(result) if args.json => {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                }
                Some(result) => print!("{}", terminal::render_result(&result)),
                None => eprintln!("Exam abandoned; nothing was submitted."),
            }
            tracing::debug!(pending_timers = runner.timers().pending(), "exam closed");
        }
        Command::Seed => {
            let url = args.db_url.ok_or(ArgsError::SeedNeedsDb)?;
            let storage = open_storage(Some(&url), config.sqlite).await?;
            let exams = sample::seed_into(storage.writer.as_ref(), None).await?;
            println!("Seeded {} sample exam(s) into {url}", exams.len());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
