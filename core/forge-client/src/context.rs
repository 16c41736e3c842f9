//! Everything a subcommand needs: config, local storage and the HTTP services.

use std::path::PathBuf;
use std::sync::Arc;

use skillforge_core::{
    load_client_config, ClientConfig, FileKeyValueStore, Services, SessionController,
    StorageConfig,
};
use tracing::{debug, warn};

use crate::http::HttpApi;

pub struct ClientContext {
    pub config: ClientConfig,
    pub kv: Arc<FileKeyValueStore>,
    pub api: Arc<HttpApi>,
}

/// Resolves the storage root. An explicit `--home` wins over the environment.
pub fn resolve_storage(home: Option<PathBuf>) -> Result<StorageConfig, String> {
    match home {
        Some(root) => Ok(StorageConfig::with_root(root)),
        None => Ok(StorageConfig::resolve()?),
    }
}

impl ClientContext {
    pub fn load(storage: StorageConfig, api_url: Option<String>) -> Result<Self, String> {
        storage.ensure_dirs()?;

        let config = match load_client_config(&storage.config_file()) {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, "Failed to load client config; using defaults");
                ClientConfig::default()
            }
        };
        let mut config = config.with_env_overrides();
        if let Some(url) = api_url {
            config.api_url = url;
        }
        debug!(
            api_url = %config.api_url,
            poll_interval_ms = config.poll_interval_ms,
            root = %storage.root().display(),
            "Client config loaded"
        );

        let kv = Arc::new(FileKeyValueStore::open(&storage.local_storage_file()));
        let api = Arc::new(HttpApi::new(&config.api_url, config.request_timeout())?);

        Ok(Self {
            config,
            kv,
            api,
        })
    }

    pub fn controller(&self) -> SessionController {
        SessionController::new(self.config.clone(), self.kv.clone())
    }

    pub fn services(&self) -> Services {
        Services {
            identity: self.api.clone(),
            conversations: self.api.clone(),
        }
    }
}
