//! Registered users and password hashing.
//!
//! Hashes are stored as `pbkdf2-sha256$<rounds>$<salt-b64>$<key-b64>`, a
//! PBKDF2-HMAC-SHA256 key over a random 16-byte salt.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::info;

use crate::error::RentLedgerError;
use crate::types::User;
use crate::RentLedgerResult;

const HASH_SCHEME: &str = "pbkdf2-sha256";
const HASH_ROUNDS: u32 = 100_000;
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

// ---------------------------------------------------------------------------
// Password hashing
// ---------------------------------------------------------------------------

pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let key = derive_key(password, &salt, HASH_ROUNDS);
    format!(
        "{HASH_SCHEME}${HASH_ROUNDS}${}${}",
        BASE64.encode(salt),
        BASE64.encode(key)
    )
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(rounds), Some(salt_b64), Some(key_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if scheme != HASH_SCHEME {
        return false;
    }
    let (Ok(rounds), Ok(salt), Ok(expected)) = (
        rounds.parse::<u32>(),
        BASE64.decode(salt_b64),
        BASE64.decode(key_b64),
    ) else {
        return false;
    };
    if rounds == 0 || expected.len() != KEY_LEN {
        return false;
    }
    let candidate = derive_key(password, &salt, rounds);
    candidate.as_slice().ct_eq(expected.as_slice()).into()
}

fn derive_key(password: &str, salt: &[u8], rounds: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, rounds, &mut key);
    key
}

// ---------------------------------------------------------------------------
// User store
// ---------------------------------------------------------------------------

pub struct UserStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl UserStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn find(&self, username: &str) -> RentLedgerResult<Option<User>> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        Ok(self.read()?.into_iter().find(|u| u.username == username))
    }

    /// Create a user. Usernames are trimmed and must be unique.
    pub fn register(&self, username: &str, password: &str) -> RentLedgerResult<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(RentLedgerError::InvalidInput {
                field: "username".into(),
                reason: "Username must not be empty".into(),
            });
        }
        if password.is_empty() {
            return Err(RentLedgerError::InvalidInput {
                field: "password".into(),
                reason: "Password must not be empty".into(),
            });
        }

        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let mut users = self.read()?;
        if users.iter().any(|u| u.username == username) {
            return Err(RentLedgerError::UserExists(username.to_string()));
        }
        let user = User {
            username: username.to_string(),
            password_hash: hash_password(password),
        };
        users.push(user.clone());
        self.write(&users)?;
        info!(username, "user registered");
        Ok(user)
    }

    /// Check credentials. Unknown users and wrong passwords fail alike.
    pub fn authenticate(&self, username: &str, password: &str) -> RentLedgerResult<User> {
        match self.find(username.trim())? {
            Some(user) if verify_password(password, &user.password_hash) => Ok(user),
            _ => Err(RentLedgerError::AuthenticationFailed),
        }
    }

    fn read(&self) -> RentLedgerResult<Vec<User>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(Vec::new()),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                let path = self.path.display();
                RentLedgerError::Storage(format!("Failed to parse '{path}': {e}"))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, users: &[User]) -> RentLedgerResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(users)?)?;
        Ok(())
    }
}

fn poisoned() -> RentLedgerError {
    RentLedgerError::Storage("user store lock poisoned".into())
}
