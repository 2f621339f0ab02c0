//! Durable storage for the signed-in user's token pair.
//!
//! The request executor and the refresh coordinator only ever see the
//! [`CredentialStore`] trait, which is deliberately tiny: string values by
//! string key. Three implementations ship here: process memory (tests and
//! throwaway sessions), a JSON file in the quotebook home, and the OS keyring.

use parking_lot::Mutex;
use parking_lot::RwLock;
use quotebook_protocol::TokenPair;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const USER_ID_KEY: &str = "user_id";

const ALL_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_ID_KEY];

#[derive(Debug, Error)]
pub enum CredentialStoreError {
    #[error("credential file i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("credential file is malformed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Secure get/set/clear of credential strings.
///
/// Implementations must tolerate concurrent readers while the refresh
/// coordinator replaces a value.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CredentialStoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), CredentialStoreError>;

    fn clear(&self, key: &str) -> Result<(), CredentialStoreError>;

    fn store_tokens(&self, tokens: &TokenPair) -> Result<(), CredentialStoreError> {
        self.set(REFRESH_TOKEN_KEY, &tokens.refresh_token)?;
        self.set(ACCESS_TOKEN_KEY, &tokens.access_token)
    }

    fn token_pair(&self) -> Result<Option<TokenPair>, CredentialStoreError> {
        let Some(access_token) = self.get(ACCESS_TOKEN_KEY)? else {
            return Ok(None);
        };
        let Some(refresh_token) = self.get(REFRESH_TOKEN_KEY)? else {
            return Ok(None);
        };
        Ok(Some(TokenPair {
            access_token,
            refresh_token,
        }))
    }

    /// Removes every key this crate writes. Used on sign-out.
    fn clear_all(&self) -> Result<(), CredentialStoreError> {
        for key in ALL_KEYS {
            self.clear(key)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: &TokenPair) -> Self {
        let store = Self::new();
        {
            let mut values = store.values.write();
            values.insert(ACCESS_TOKEN_KEY.to_string(), tokens.access_token.clone());
            values.insert(REFRESH_TOKEN_KEY.to_string(), tokens.refresh_token.clone());
        }
        store
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>, CredentialStoreError> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CredentialStoreError> {
        self.values
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), CredentialStoreError> {
        self.values.write().remove(key);
        Ok(())
    }
}

/// Stores credentials as a JSON object in a single file readable only by the
/// current user.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCredentialStore {
    pub const FILE_NAME: &'static str = "credentials.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn in_home(home: &Path) -> Self {
        Self::new(home.join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, CredentialStoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<(), CredentialStoreError> {
        if values.is_empty() {
            return match std::fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(err.into()),
            };
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(values)?;
        let mut options = OpenOptions::new();
        options.truncate(true).write(true).create(true);
        #[cfg(unix)]
        {
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        file.write_all(json.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>, CredentialStoreError> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CredentialStoreError> {
        let _guard = self.lock.lock();
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)
    }

    fn clear(&self, key: &str) -> Result<(), CredentialStoreError> {
        let _guard = self.lock.lock();
        let mut values = self.read_all()?;
        if values.remove(key).is_some() {
            self.write_all(&values)?;
        }
        Ok(())
    }
}

/// Credentials kept in the platform keychain, one entry per key.
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service: String,
}

impl KeyringCredentialStore {
    pub const DEFAULT_SERVICE: &'static str = "quotebook";

    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, CredentialStoreError> {
        Ok(keyring::Entry::new(&self.service, key)?)
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SERVICE)
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>, CredentialStoreError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CredentialStoreError> {
        Ok(self.entry(key)?.set_password(value)?)
    }

    fn clear(&self, key: &str) -> Result<(), CredentialStoreError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
