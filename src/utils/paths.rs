use std::{
    env, fs,
    path::{Path, PathBuf},
};

use uuid::Uuid;

use crate::domain::MonthKey;

const DEFAULT_DIR_NAME: &str = ".mess_ledger";
const HOME_ENV: &str = "MESS_LEDGER_HOME";
const BOOKS_DIR: &str = "books";
const CONFIG_FILE: &str = "config.json";
const ROSTER_FILE: &str = "roster.json";

/// Returns the application data directory, defaulting to `~/.mess_ledger`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os(HOME_ENV) {
        return PathBuf::from(custom);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

pub fn resolve_base(custom: Option<PathBuf>) -> PathBuf {
    custom.unwrap_or_else(app_data_dir)
}

pub fn books_dir_in(base: &Path) -> PathBuf {
    base.join(BOOKS_DIR)
}

pub fn config_file_in(base: &Path) -> PathBuf {
    base.join(CONFIG_FILE)
}

pub fn unit_dir_in(books: &Path, unit_id: Uuid) -> PathBuf {
    books.join(unit_id.to_string())
}

pub fn roster_file_in(unit_dir: &Path) -> PathBuf {
    unit_dir.join(ROSTER_FILE)
}

pub fn book_file_in(unit_dir: &Path, month: MonthKey) -> PathBuf {
    unit_dir.join(format!("{month}.json"))
}

pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Sibling path used to stage a write before renaming over `path`.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{existing}.tmp"),
        None => "tmp".to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

/// Writes `data` to a temp file and renames it into place.
pub fn write_atomic(path: &Path, data: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let tmp = tmp_path(path);
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)
}
