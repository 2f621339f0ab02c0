use quotebook_backend_client::ApiError;
use quotebook_backend_client::AuthClient;
use quotebook_backend_client::ClientConfig;
use quotebook_backend_client::CredentialStore;
use quotebook_backend_client::EntityGateway;
use quotebook_backend_client::FileCredentialStore;
use quotebook_backend_client::HttpGateway;
use quotebook_backend_client::InMemoryCredentialStore;
use quotebook_backend_client::KeyringCredentialStore;
use quotebook_backend_client::RequestExecutor;
use quotebook_protocol::Story;
use quotebook_protocol::Theme;
use quotebook_protocol::UserId;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::bus::ChangeBus;
use crate::collection::CollectionController;
use crate::config::Config;
use crate::config::CredentialsStoreMode;
use crate::views::StoryView;
use crate::views::ThemeView;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("not signed in")]
    NotSignedIn,
}

/// Process-wide wiring: one credential store, one executor, one change bus
/// per entity type. Controllers handed out by the same session stay in sync
/// with each other.
pub struct Session {
    config: Config,
    auth: AuthClient,
    stories: Arc<dyn EntityGateway<Story>>,
    themes: Arc<dyn EntityGateway<Theme>>,
    story_bus: ChangeBus<Story>,
    theme_bus: ChangeBus<Theme>,
}

impl Session {
    pub fn new(config: Config) -> Result<Self, SessionError> {
        let credentials = credential_store(&config);
        Self::with_credentials(config, credentials)
    }

    pub fn with_credentials(
        config: Config,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, SessionError> {
        let client_config = ClientConfig {
            connect_timeout: config.connect_timeout,
            request_timeout: config.request_timeout,
            ..ClientConfig::new(config.base_url.clone())
        };
        let executor = Arc::new(RequestExecutor::new(&client_config, credentials)?);
        info!("session ready for {}", client_config.base_url);
        Ok(Self {
            auth: AuthClient::new(Arc::clone(&executor)),
            stories: Arc::new(HttpGateway::<Story>::new(Arc::clone(&executor))),
            themes: Arc::new(HttpGateway::<Theme>::new(executor)),
            story_bus: ChangeBus::new(config.bus_capacity),
            theme_bus: ChangeBus::new(config.bus_capacity),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    pub fn current_user(&self) -> Result<UserId, SessionError> {
        self.auth.current_user().ok_or(SessionError::NotSignedIn)
    }

    pub fn stories(&self, view: StoryView) -> CollectionController<Story> {
        CollectionController::new(
            view,
            Arc::clone(&self.stories),
            self.story_bus.clone(),
            self.config.page_size,
        )
    }

    pub fn themes(&self, view: ThemeView) -> CollectionController<Theme> {
        CollectionController::new(
            view,
            Arc::clone(&self.themes),
            self.theme_bus.clone(),
            self.config.page_size,
        )
    }

    pub fn my_stories(&self) -> Result<CollectionController<Story>, SessionError> {
        Ok(self.stories(StoryView::Mine(self.current_user()?)))
    }

    pub fn my_themes(&self) -> Result<CollectionController<Theme>, SessionError> {
        Ok(self.themes(ThemeView::Mine(self.current_user()?)))
    }
}

fn credential_store(config: &Config) -> Arc<dyn CredentialStore> {
    match config.credentials_store {
        CredentialsStoreMode::Keyring => Arc::new(KeyringCredentialStore::default()),
        CredentialsStoreMode::File => {
            Arc::new(FileCredentialStore::in_home(&config.quotebook_home))
        }
        CredentialsStoreMode::Memory => Arc::new(InMemoryCredentialStore::new()),
    }
}
