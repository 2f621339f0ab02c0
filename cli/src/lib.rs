mod commands;
pub mod logging;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use quotebook_core::ConfigOverrides;
use quotebook_core::config::CredentialsStoreMode;
use std::path::PathBuf;

pub use commands::run;

#[derive(Debug, Parser)]
#[command(name = "quotebook", version, about = "Browse and publish book quotes")]
pub struct Cli {
    /// API base URL; overrides `base_url` in config.toml.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Items per page when listing.
    #[arg(long, global = true)]
    pub page_size: Option<u32>,

    /// Where to keep the signed-in tokens.
    #[arg(long, global = true, value_enum)]
    pub credentials_store: Option<StoreArg>,

    /// Also write logs to a daily file under `$QUOTEBOOK_HOME/log`.
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn config_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            base_url: self.base_url.clone(),
            page_size: self.page_size,
            credentials_store: self.credentials_store.map(CredentialsStoreMode::from),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreArg {
    Keyring,
    File,
    Memory,
}

impl From<StoreArg> for CredentialsStoreMode {
    fn from(value: StoreArg) -> Self {
        match value {
            StoreArg::Keyring => CredentialsStoreMode::Keyring,
            StoreArg::File => CredentialsStoreMode::File,
            StoreArg::Memory => CredentialsStoreMode::Memory,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and remember the session.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "QUOTEBOOK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget stored tokens.
    Logout,
    /// Show who is signed in.
    Status,
    /// List stories.
    Stories(StoriesArgs),
    /// List themes.
    Themes(ThemesArgs),
    /// Read or write a single story.
    #[command(subcommand)]
    Story(StoryCommand),
    /// Read or write a single theme.
    #[command(subcommand)]
    Theme(ThemeCommand),
}

#[derive(Debug, Args)]
pub struct StoriesArgs {
    /// Number of pages to fetch.
    #[arg(long, default_value_t = 1)]
    pub pages: u32,

    /// Defaults to public stories.
    #[command(subcommand)]
    pub view: Option<StoryListView>,
}

#[derive(Debug, Args)]
pub struct ThemesArgs {
    #[arg(long, default_value_t = 1)]
    pub pages: u32,

    #[command(subcommand)]
    pub view: Option<ThemeListView>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum StoryListView {
    Public,
    Mine,
    Author { user_id: String },
    Keyword { text: String },
    Theme { theme_id: String },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ThemeListView {
    Public,
    Mine,
    Author { user_id: String },
}

#[derive(Debug, Subcommand)]
pub enum StoryCommand {
    Show { id: String },
    Create(StoryFields),
    Update {
        id: String,
        #[command(flatten)]
        fields: StoryFields,
    },
    Delete { id: String },
}

#[derive(Debug, Clone, Args)]
pub struct StoryFields {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub quote: String,
    #[arg(long)]
    pub book_title: String,
    #[arg(long)]
    pub book_author: Option<String>,
    /// Repeat for several keywords.
    #[arg(long = "keyword")]
    pub keywords: Vec<String>,
    #[arg(long)]
    pub theme: Option<String>,
    #[arg(long)]
    pub private: bool,
    /// JPEG, PNG, WebP or HEIC file to attach.
    #[arg(long)]
    pub image: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum ThemeCommand {
    Create(ThemeFields),
    Update {
        id: String,
        #[command(flatten)]
        fields: ThemeFields,
    },
    Delete { id: String },
}

#[derive(Debug, Clone, Args)]
pub struct ThemeFields {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub private: bool,
    #[arg(long)]
    pub cover: Option<PathBuf>,
}
