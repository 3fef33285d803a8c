//! Wiring of configuration, transport, credential store and dispatcher for one CLI run

use crate::error::{CliError, CliResult};
use baaskit_config::{ClientConfig, ConfigLoader};
use baaskit_dispatch::Dispatcher;
use baaskit_http::HttpTransport;
use baaskit_store::FileCredentialStore;
use baaskit_user::Accounts;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Used when neither the command line nor the configuration names a credentials file
pub const DEFAULT_CREDENTIALS_FILE: &str = ".baaskit/credentials.json";

pub struct App {
    pub config: ClientConfig,
    pub accounts: Accounts,
    credentials: PathBuf,
    store: Arc<FileCredentialStore>,
}

impl App {
    /// Load the configuration and start a dispatcher; must run inside the tokio runtime
    pub fn load(config_path: Option<&Path>, credentials: Option<&Path>) -> CliResult<Self> {
        let config = ConfigLoader::new().load_optional(config_path)?;
        Self::from_config(config, credentials)
    }

    pub fn from_config(config: ClientConfig, credentials: Option<&Path>) -> CliResult<Self> {
        let credentials = credentials
            .map(Path::to_path_buf)
            .or_else(|| config.credentials_file.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_FILE));

        let store = Arc::new(FileCredentialStore::open(&credentials)?);
        let transport = HttpTransport::new(config.timeouts)?;
        let dispatcher = Dispatcher::start(
            config.dispatcher_config(),
            Arc::new(transport),
            store.clone(),
            config.request_factory()?,
        )?;

        let mut accounts = Accounts::new(Arc::new(dispatcher));
        if let Some(policy) = config.retry.clone() {
            accounts = accounts.with_retry(policy);
        }
        debug!(base_url = %config.base_url(), credentials = %credentials.display(), "client ready");

        Ok(Self { config, accounts, credentials, store })
    }

    pub fn credentials_path(&self) -> &Path {
        &self.credentials
    }

    /// Name of the logged-in user, or an error telling how to log in
    pub fn require_current_user(&self) -> CliResult<String> {
        self.accounts.current_user().ok_or(CliError::NotLoggedIn)
    }

    /// Cancel whatever is still queued, wait for running requests and write the session out
    pub async fn shutdown(&self) {
        self.accounts.dispatcher().shutdown().await;
        if let Err(e) = self.store.flush().await {
            warn!(credentials = %self.credentials.display(), error = %e, "credentials not saved");
        }
    }
}
