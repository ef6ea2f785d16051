//! Command-line front end for the daokit templates.
//!
//! # Responsibility
//! - Map flags onto explicit factory settings; no config files.
//! - Print results on stdout and failures on stderr with a non-zero exit code.

use clap::{Parser, Subcommand};
use daokit_core::{
    default_log_level, init_logging, init_stderr_logging, Calculator, DaoFactory,
    FileLineSourceFactory, User,
};
use log::info;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

// Keeps stdout/stderr readable unless a level is requested explicitly.
const STDERR_LOG_LEVEL: &str = "warn";

#[derive(Parser, Debug)]
#[command(name = "daokit")]
#[command(about = "Run resource-scoped templates against SQLite and line files")]
struct Args {
    /// Absolute directory for rolling log files; logs go to stderr when omitted
    #[arg(long, global = true)]
    log_dir: Option<String>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// How long SQLite waits on a locked database before failing
    #[arg(long, global = true)]
    busy_timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a health-check reply and the core version
    Ping,
    /// Sum the integers in a file, one per line
    Sum { file: PathBuf },
    /// Multiply the integers in a file, one per line
    Multiply { file: PathBuf },
    /// Concatenate the lines of a file
    Concat { file: PathBuf },
    /// Insert one user
    AddUser {
        #[arg(long)]
        db: PathBuf,
        id: String,
        name: String,
        password: String,
    },
    /// Print the number of stored users
    CountUsers {
        #[arg(long)]
        db: PathBuf,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = args.log_level.as_deref();
    let logging = match args.log_dir.as_deref() {
        Some(dir) => init_logging(level.unwrap_or(default_log_level()), dir),
        None => init_stderr_logging(level.unwrap_or(STDERR_LOG_LEVEL)),
    };
    if let Err(err) = logging {
        eprintln!("daokit: {err}");
        return ExitCode::FAILURE;
    }
    info!("event=cli_start module=cli status=ok command={:?}", args.command);

    let busy_timeout = args.busy_timeout_ms.map(Duration::from_millis);
    match run(args.command, busy_timeout) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("daokit: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(
    command: Command,
    busy_timeout: Option<Duration>,
) -> Result<String, Box<dyn std::error::Error>> {
    let output = match command {
        Command::Ping => format!(
            "daokit_core ping={} version={}",
            daokit_core::ping(),
            daokit_core::core_version()
        ),
        Command::Sum { file } => calculator().calc_sum(&locator(&file)?)?.to_string(),
        Command::Multiply { file } => calculator()
            .calc_multiply(&locator(&file)?)?
            .to_string(),
        Command::Concat { file } => calculator().concatenate(&locator(&file)?)?,
        Command::AddUser {
            db,
            id,
            name,
            password,
        } => {
            let wiring = dao_factory(db, busy_timeout);
            wiring
                .user_dao()
                .add(&User::new(id.as_str(), name, password))?;
            format!("added user {id} to {}", wiring.db_path().display())
        }
        Command::CountUsers { db } => dao_factory(db, busy_timeout)
            .user_dao()
            .get_count()?
            .to_string(),
    };
    Ok(output)
}

fn dao_factory(db: PathBuf, busy_timeout: Option<Duration>) -> DaoFactory {
    let wiring = DaoFactory::new(db);
    match busy_timeout {
        Some(timeout) => wiring.with_busy_timeout(timeout),
        None => wiring,
    }
}

fn calculator() -> Calculator<FileLineSourceFactory> {
    Calculator::new(FileLineSourceFactory::new())
}

fn locator(file: &Path) -> Result<String, String> {
    file.to_str()
        .map(str::to_string)
        .ok_or_else(|| format!("path `{}` is not valid UTF-8", file.display()))
}
