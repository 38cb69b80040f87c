//! Static startup configuration: which backend is active and the access level of the session.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backend::document::DocumentBackend;
use crate::backend::local::LocalBackend;
use crate::backend::{Backend, BackendKind};
use crate::error::{Error, Result};
use crate::ids::EntityKind;
use crate::store::PartitionStore;
use crate::traits::{AccessControl, DocumentStore, KeyValueStore};

/// A store over whichever backend the configuration names.
pub type ConfiguredStore = PartitionStore<Box<dyn Backend>, AccessLevel>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Local snapshot, in memory when `path` is absent.
    Local {
        #[serde(default)]
        path: Option<PathBuf>,
    },
    Rest {
        #[serde(rename = "baseUrl")]
        base_url: String,
    },
    /// Document database; `url` is the connection string.
    Document {
        #[serde(default)]
        url: Option<String>,
    },
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Local { path: None }
    }
}

impl BackendConfig {
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendConfig::Local { .. } => BackendKind::Local,
            BackendConfig::Rest { .. } => BackendKind::Rest,
            BackendConfig::Document { .. } => BackendKind::Document,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    #[default]
    Admin,
    /// May browse every partition but change nothing.
    Viewer,
}

impl AccessControl for AccessLevel {
    fn can_write(&self, kind: EntityKind) -> Result<()> {
        match self {
            AccessLevel::Admin => Ok(()),
            AccessLevel::Viewer => Err(Error::AccessDenied(format!(
                "viewers cannot change {}",
                kind.partition_key()
            ))),
        }
    }

    fn can_read(&self, _kind: EntityKind) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub access: AccessLevel,
}

impl Config {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    pub fn check(&self) -> Result<()> {
        if let BackendConfig::Rest { base_url } = &self.backend {
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                return Err(Error::Config(format!(
                    "REST base URL must be http(s), got {base_url:?}"
                )));
            }
        }
        Ok(())
    }
}

impl Config {
    /// Build the configured backend and open a store over it with the configured access level.
    ///
    /// Durable engines live in the adapter crates, so the caller says how to open a key/value
    /// store for the local `path` and a document store for the document `url`. Only the one
    /// matching the configured backend is called.
    pub fn open_store<K, D>(
        &self,
        open_local: impl FnOnce(Option<&Path>) -> Result<K>,
        open_documents: impl FnOnce(Option<&str>) -> Result<D>,
    ) -> Result<ConfiguredStore>
    where
        K: KeyValueStore + 'static,
        D: DocumentStore + 'static,
    {
        self.check()?;
        let backend: Box<dyn Backend> = match &self.backend {
            BackendConfig::Local { path } => {
                Box::new(LocalBackend::new(open_local(path.as_deref())?))
            }
            BackendConfig::Rest { base_url } => rest_backend(base_url)?,
            BackendConfig::Document { url } => {
                Box::new(DocumentBackend::new(open_documents(url.as_deref())?))
            }
        };
        info!(backend = %self.backend.kind(), access = ?self.access, "opening configured store");
        PartitionStore::open(backend, self.access)
    }
}

#[cfg(feature = "http")]
fn rest_backend(base_url: &str) -> Result<Box<dyn Backend>> {
    use crate::backend::rest::{HttpTransport, RestBackend};
    Ok(Box::new(RestBackend::new(HttpTransport::new(base_url))))
}

#[cfg(not(feature = "http"))]
fn rest_backend(base_url: &str) -> Result<Box<dyn Backend>> {
    Err(Error::Config(format!(
        "REST backend at {base_url} needs the `http` feature"
    )))
}
