//! Non-interactive command runner behind `mess_ledger_cli`.

pub mod output;

use std::{
    io::{self, Read, Write},
    path::PathBuf,
};

use chrono::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{ConfigError, ConfigManager};
use crate::core::services::{RecordService, ServiceError};
use crate::core::time::SystemClock;
use crate::domain::{MembershipRoster, MonthBook, MonthKey};
use crate::errors::LedgerError;
use crate::storage::{BookStore, JsonStorage};
use crate::utils::build_info;

use output::MessageKind;

pub const USAGE: &str = "Usage: mess_ledger_cli [--data-dir DIR] <command>\n\
Commands:\n  \
report <unit> <YYYY-MM> [--json]\n  \
lock status <unit> <YYYY-MM>\n  \
lock request <unit> <YYYY-MM> --as <member>\n  \
lock open|close <unit> <YYYY-MM> --as <member> [--hours N]\n  \
import-roster <unit> < roster.json   (bootstrap, replaces the roster)\n  \
import-book <unit> <YYYY-MM> --as <manager> < book.json\n  \
version";

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}\n{usage}", usage = USAGE)]
    Usage(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parsed arguments: positionals plus `--flag [value]` options.
struct Args {
    positional: Vec<String>,
    data_dir: Option<PathBuf>,
    actor: Option<String>,
    hours: Option<String>,
    json: bool,
}

impl Args {
    fn parse<I: IntoIterator<Item = String>>(raw: I) -> Result<Self, CliError> {
        let mut args = Args {
            positional: Vec::new(),
            data_dir: None,
            actor: None,
            hours: None,
            json: false,
        };
        let mut iter = raw.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--data-dir" => args.data_dir = Some(PathBuf::from(flag_value(&mut iter, &arg)?)),
                "--as" => args.actor = Some(flag_value(&mut iter, &arg)?),
                "--hours" => args.hours = Some(flag_value(&mut iter, &arg)?),
                "--json" => args.json = true,
                flag if flag.starts_with("--") => {
                    return Err(CliError::Usage(format!("unknown option `{flag}`")));
                }
                _ => args.positional.push(arg),
            }
        }
        Ok(args)
    }

    fn unit(&self, index: usize) -> Result<Uuid, CliError> {
        let raw = self.required(index, "unit id")?;
        Uuid::parse_str(raw).map_err(|_| CliError::Usage(format!("invalid unit id `{raw}`")))
    }

    fn month(&self, index: usize) -> Result<MonthKey, CliError> {
        Ok(self.required(index, "month")?.parse()?)
    }

    fn actor(&self) -> Result<Uuid, CliError> {
        let raw = self
            .actor
            .as_deref()
            .ok_or_else(|| CliError::Usage("missing --as <member>".into()))?;
        Uuid::parse_str(raw).map_err(|_| CliError::Usage(format!("invalid member id `{raw}`")))
    }

    fn required(&self, index: usize, what: &str) -> Result<&str, CliError> {
        self.positional
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| CliError::Usage(format!("missing {what}")))
    }
}

fn flag_value(iter: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, CliError> {
    iter.next()
        .ok_or_else(|| CliError::Usage(format!("option `{flag}` needs a value")))
}

/// Runs one command. `args` excludes the program name.
pub fn run<I>(args: I, input: &mut dyn Read, out: &mut dyn Write) -> Result<(), CliError>
where
    I: IntoIterator<Item = String>,
{
    let args = Args::parse(args)?;
    let command = args
        .positional
        .first()
        .map(String::as_str)
        .ok_or_else(|| CliError::Usage("missing command".into()))?;

    if command == "version" {
        writeln!(out, "{}", build_info::summary_line())?;
        return Ok(());
    }

    let config_manager = ConfigManager::with_base_dir(args.data_dir.clone())?;
    let config = config_manager.load()?;
    let data_dir = args.data_dir.clone().or_else(|| config.data_dir.clone());
    let storage = JsonStorage::new(data_dir)?;
    let clock = SystemClock;
    let service = RecordService::over(&storage, &clock)
        .with_share_tolerance(config.share_tolerance)
        .with_settlement_options(config.settlement_options());

    match command {
        "report" => {
            let unit_id = args.unit(1)?;
            let month = args.month(2)?;
            let report = service.monthly_report(unit_id, month)?;
            if args.json {
                writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
            } else {
                output::render_report(out, &report, &config.currency)?;
            }
        }
        "lock" => {
            let action = args.required(1, "lock action")?;
            let unit_id = args.unit(2)?;
            let month = args.month(3)?;
            let state = match action {
                "status" => service.lock_status(unit_id, month)?,
                "request" => Some(service.request_unlock(args.actor()?, unit_id, month)?),
                "open" | "close" => {
                    let relock = match args.hours.as_deref() {
                        Some(raw) => {
                            let hours = raw.parse::<u32>().map_err(|_| {
                                CliError::Usage(format!("invalid --hours value `{raw}`"))
                            })?;
                            Some(Duration::hours(i64::from(hours)))
                        }
                        None => config.auto_relock_after(),
                    };
                    let is_locked = action == "close";
                    Some(service.set_lock_status(args.actor()?, unit_id, month, is_locked, relock)?)
                }
                other => return Err(CliError::Usage(format!("unknown lock action `{other}`"))),
            };
            output::render_lock(out, state.as_ref())?;
        }
        "import-roster" => {
            let unit_id = args.unit(1)?;
            let mut roster: MembershipRoster = serde_json::from_reader(input)?;
            roster.unit_id = unit_id;
            storage.save_roster(&roster)?;
            output::print(
                out,
                MessageKind::Success,
                format!("Imported {} members for unit {unit_id}", roster.members.len()),
            )?;
        }
        "import-book" => {
            let unit_id = args.unit(1)?;
            let month = args.month(2)?;
            let book: MonthBook = serde_json::from_reader(input)?;
            if book.unit_id != unit_id || book.month != month {
                return Err(CliError::Usage(format!(
                    "book is for {} / {}, not {unit_id} / {month}",
                    book.unit_id, book.month
                )));
            }
            service.import_book(args.actor()?, book)?;
            output::print(
                out,
                MessageKind::Success,
                format!("Imported book {month} for unit {unit_id}"),
            )?;
        }
        other => return Err(CliError::Usage(format!("unknown command `{other}`"))),
    }
    Ok(())
}

/// Entry point used by the binary: process arguments and standard streams.
pub fn run_cli() -> Result<(), CliError> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    run(
        std::env::args().skip(1),
        &mut stdin.lock(),
        &mut stdout.lock(),
    )
}
