//! Manifest fetching and tool-module resolution.
//!
//! A manifest is a small JSON descriptor (`{ "js": "<module path>" }`)
//! fetched from a URL. The referenced module path resolves relative to the
//! manifest URL. Modules are not executed as fetched code: they resolve
//! against a statically-registered plugin table mapping module URLs to
//! spec-producing factories.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::error::ManifestError;
use crate::types::ToolSpec;

/// Fetches a manifest document from a URL.
#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Value, ManifestError>;
}

/// HTTP manifest fetcher. Non-2xx responses fail with the status code.
pub struct HttpManifestFetcher {
    client: reqwest::Client,
}

impl HttpManifestFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpManifestFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ManifestFetcher for HttpManifestFetcher {
    async fn fetch(&self, url: &str) -> Result<Value, ManifestError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ManifestError::Status(status.as_u16()));
        }
        Ok(response.json().await?)
    }
}

/// Extracts and resolves the module URL named by a manifest's `js` field.
pub fn resolve_module_url(manifest_url: &str, manifest: &Value) -> Result<Url, ManifestError> {
    let script = manifest
        .get("js")
        .and_then(Value::as_str)
        .ok_or(ManifestError::MissingScript)?;
    let base = Url::parse(manifest_url)?;
    Ok(base.join(script)?)
}

/// Resolves a module URL to the tool specs it exports.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self, module_url: &Url) -> Result<Vec<ToolSpec>, ManifestError>;
}

type SpecFactory = Box<dyn Fn() -> Vec<ToolSpec> + Send + Sync>;

/// The plugin table: module URLs mapped to registered spec factories. This
/// is the declared-interface stand-in for dynamically importing fetched
/// code.
#[derive(Default)]
pub struct StaticModuleLoader {
    modules: HashMap<String, SpecFactory>,
}

impl StaticModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the specs a module URL resolves to.
    pub fn register<F>(&mut self, module_url: impl Into<String>, factory: F)
    where
        F: Fn() -> Vec<ToolSpec> + Send + Sync + 'static,
    {
        self.modules.insert(module_url.into(), Box::new(factory));
    }
}

#[async_trait]
impl ModuleLoader for StaticModuleLoader {
    async fn load(&self, module_url: &Url) -> Result<Vec<ToolSpec>, ManifestError> {
        match self.modules.get(module_url.as_str()) {
            Some(factory) => Ok(factory()),
            None => Err(ManifestError::UnknownModule(module_url.to_string())),
        }
    }
}
