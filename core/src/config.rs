//! `config.toml` loading and resolution.

use serde::Deserialize;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const CONFIG_TOML_FILE: &str = "config.toml";
pub const DEFAULT_BASE_URL: &str = "https://api.quotebook.app/v1/";
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_BUS_CAPACITY: usize = 256;
const DEFAULT_CONNECT_SECS: u64 = 30;
const DEFAULT_REQUEST_SECS: u64 = 60;

/// Where the signed-in token pair is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialsStoreMode {
    /// OS keychain. Default.
    #[default]
    Keyring,
    /// `credentials.json` in the quotebook home.
    File,
    /// Forgotten when the process exits.
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TimeoutsToml {
    pub connect_secs: Option<u64>,
    pub request_secs: Option<u64>,
}

/// Raw contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ConfigToml {
    pub base_url: Option<String>,
    pub page_size: Option<u32>,
    pub bus_capacity: Option<usize>,
    pub credentials_store: Option<CredentialsStoreMode>,
    #[serde(default)]
    pub timeouts: TimeoutsToml,
}

/// Values supplied on the command line; they win over `config.toml`.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub page_size: Option<u32>,
    pub credentials_store: Option<CredentialsStoreMode>,
}

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub quotebook_home: PathBuf,
    pub base_url: Url,
    pub page_size: u32,
    pub bus_capacity: usize,
    pub credentials_store: CredentialsStoreMode,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Config {
    /// Loads `config.toml` from the quotebook home and applies `overrides`.
    pub fn load(overrides: ConfigOverrides) -> std::io::Result<Self> {
        let quotebook_home = find_quotebook_home()?;
        Self::load_from_home(quotebook_home, overrides)
    }

    pub fn load_from_home(
        quotebook_home: PathBuf,
        overrides: ConfigOverrides,
    ) -> std::io::Result<Self> {
        let cfg = load_config_toml(&quotebook_home)?;
        Self::load_from_base_config_with_overrides(cfg, overrides, quotebook_home)
    }

    pub fn load_from_base_config_with_overrides(
        cfg: ConfigToml,
        overrides: ConfigOverrides,
        quotebook_home: PathBuf,
    ) -> std::io::Result<Self> {
        let ConfigOverrides {
            base_url,
            page_size,
            credentials_store,
        } = overrides;

        let base_url = base_url
            .or(cfg.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&base_url).map_err(|err| {
            std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("invalid base_url `{base_url}`: {err}"),
            )
        })?;

        let page_size = page_size.or(cfg.page_size).unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "page_size must be at least 1",
            ));
        }

        Ok(Self {
            quotebook_home,
            base_url,
            page_size,
            bus_capacity: cfg.bus_capacity.unwrap_or(DEFAULT_BUS_CAPACITY).max(1),
            credentials_store: credentials_store
                .or(cfg.credentials_store)
                .unwrap_or_default(),
            connect_timeout: Duration::from_secs(
                cfg.timeouts.connect_secs.unwrap_or(DEFAULT_CONNECT_SECS),
            ),
            request_timeout: Duration::from_secs(
                cfg.timeouts.request_secs.unwrap_or(DEFAULT_REQUEST_SECS),
            ),
        })
    }
}

/// Reads `config.toml`; a missing file is an empty config.
pub fn load_config_toml(quotebook_home: &Path) -> std::io::Result<ConfigToml> {
    let path = quotebook_home.join(CONFIG_TOML_FILE);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("{} not found, using defaults", path.display());
            return Ok(ConfigToml::default());
        }
        Err(err) => return Err(err),
    };
    toml::from_str(&contents).map_err(|err| {
        std::io::Error::new(
            ErrorKind::InvalidData,
            format!("failed to parse {}: {err}", path.display()),
        )
    })
}

/// Returns the quotebook home directory.
///
/// `QUOTEBOOK_HOME` wins when set and must point at an existing directory;
/// otherwise `~/.quotebook` is used, whether or not it exists yet.
pub fn find_quotebook_home() -> std::io::Result<PathBuf> {
    if let Ok(val) = std::env::var("QUOTEBOOK_HOME") {
        if !val.is_empty() {
            return PathBuf::from(val).canonicalize();
        }
    }

    let mut p = dirs::home_dir().ok_or_else(|| {
        std::io::Error::new(ErrorKind::NotFound, "could not find home directory")
    })?;
    p.push(".quotebook");
    Ok(p)
}
