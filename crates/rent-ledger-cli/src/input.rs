use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use rent_ledger_core::ledger::NewContract;

const CONTRACT_SHAPE: &str = concat!(
    r#"{"tenant": "...", "amount": "85000", "start_date": "YYYY-MM-DD", "#,
    r#""period_months": 6, "index_kind": "IPC", "mode": "cumulative"}"#
);

/// Contract fields from `--input <file>`, else from piped stdin.
/// `None` when no file was given and stdin is a terminal or empty.
pub fn read_new_contract(path: Option<&str>) -> Result<Option<NewContract>, Box<dyn Error>> {
    let (source, text) = match path {
        Some(path) => {
            let file = existing_file(path)?;
            let text = fs::read_to_string(&file)
                .map_err(|e| format!("cannot read {}: {e}", file.display()))?;
            (file.display().to_string(), text)
        }
        None if atty::is(atty::Stream::Stdin) => return Ok(None),
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            if text.trim().is_empty() {
                return Ok(None);
            }
            ("stdin".to_string(), text)
        }
    };
    parse_new_contract(&source, &text).map(Some)
}

fn parse_new_contract(source: &str, text: &str) -> Result<NewContract, Box<dyn Error>> {
    serde_json::from_str(text)
        .map_err(|e| format!("{source} is not a contract ({e}); expected {CONTRACT_SHAPE}").into())
}

/// Existing regular file; relative paths start at the working directory.
pub fn existing_file(path: &str) -> Result<PathBuf, String> {
    let path = Path::new(path);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| e.to_string())?
            .join(path)
    };
    match fs::metadata(&absolute) {
        Ok(meta) if meta.is_file() => Ok(absolute),
        Ok(_) => Err(format!("{} is not a file", absolute.display())),
        Err(e) => Err(format!("cannot open {}: {e}", absolute.display())),
    }
}
