//! Logged-in user, persisted between CLI invocations.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::RentLedgerError;
use crate::RentLedgerResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub logged_in_at: DateTime<Utc>,
}

pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn start(&self, username: &str, now: DateTime<Utc>) -> RentLedgerResult<Session> {
        let session = Session {
            username: username.to_string(),
            logged_in_at: now,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&session)?)?;
        info!(username, "session started");
        Ok(session)
    }

    /// Current session, if any. A corrupt session file counts as logged out.
    pub fn current(&self) -> RentLedgerResult<Option<Session>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(session) => Ok(Some(session)),
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        error = %e,
                        "ignoring unreadable session file"
                    );
                    Ok(None)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Username of the logged-in user, or `NotLoggedIn`.
    pub fn require(&self) -> RentLedgerResult<String> {
        self.current()?
            .map(|s| s.username)
            .ok_or(RentLedgerError::NotLoggedIn)
    }

    /// End the session. Returns whether one was active.
    pub fn end(&self) -> RentLedgerResult<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("session ended");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
