//! Configuration management.
//!
//! This module discovers the Amplify project a command runs against and
//! resolves everything derived from it:
//!
//! - **Project root**: the directory holding
//!   `amplify/#current-cloud-backend/amplify-meta.json`
//! - **Schema**: `amplify/#current-cloud-backend/api/<api>/schema.graphql`
//! - **Current environment**: `amplify/.config/local-env-info.json`
//! - **Other environments**: `recsync.json` at the project root
//! - **Credentials**: see [`session`]
//!
//! Priority everywhere: explicit flag > environment variable > project file > default.

mod session;

pub use session::{Auth, DefaultSessionProvider, Session, SessionProvider};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::schema::SchemaSource;

/// Location of the deployed backend description, relative to the project root.
const CLOUD_BACKEND_DIR: &str = "amplify/#current-cloud-backend";

/// Default number of records requested per list page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Connection details for one backend environment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentConfig {
    pub endpoint: String,
    pub api_id: String,
    /// Overrides the run's session for this environment.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Whether the API has conflict detection (`_version`, `_deleted`, `_lastChangedAt`).
    #[serde(default = "default_true")]
    pub versioned: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
struct RecsyncFile {
    #[serde(default)]
    environments: BTreeMap<String, EnvironmentConfig>,
}

/// A resolved physical table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub environment: String,
    pub model: String,
    /// `<Model>-<apiId>-<env>`.
    pub table_name: String,
    pub config: EnvironmentConfig,
}

/// Locates a model's table in a named environment.
pub trait TableResolver {
    /// # Errors
    ///
    /// Returns `EnvironmentNotFound` if the environment is not configured.
    fn resolve(&self, environment: &str, model: &str) -> Result<TableRef>;
}

/// An Amplify project on disk.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub app_id: String,
    pub api_name: String,
    /// Environment the cloud backend files were pulled from.
    pub env_name: String,
    current: EnvironmentConfig,
    environments: BTreeMap<String, EnvironmentConfig>,
}

impl Project {
    /// Find the project for this invocation.
    ///
    /// Uses `explicit` when given, otherwise walks up from the current
    /// directory to the first directory that contains the cloud backend.
    ///
    /// # Errors
    ///
    /// Returns `SchemaUnavailable` if no project is found.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(root) = explicit {
            return Self::load(root);
        }

        let cwd = std::env::current_dir()?;
        let root = cwd
            .ancestors()
            .find(|dir| dir.join(CLOUD_BACKEND_DIR).join("amplify-meta.json").exists())
            .ok_or(Error::SchemaUnavailable { path: cwd.clone() })?;
        Self::load(root)
    }

    /// Load the project rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaUnavailable` if `amplify-meta.json` is missing, or a
    /// configuration error if it lacks an AppSync API.
    pub fn load(root: &Path) -> Result<Self> {
        let meta_path = root.join(CLOUD_BACKEND_DIR).join("amplify-meta.json");
        if !meta_path.exists() {
            return Err(Error::SchemaUnavailable { path: meta_path });
        }

        let meta: serde_json::Value = serde_json::from_str(&fs::read_to_string(&meta_path)?)
            .map_err(|e| Error::Config(format!("Failed to parse amplify-meta.json: {e}")))?;

        let app_id = meta["providers"]["awscloudformation"]["AmplifyAppId"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        let apis = meta["api"]
            .as_object()
            .filter(|apis| !apis.is_empty())
            .ok_or_else(|| Error::Config("amplify-meta.json has no API".into()))?;
        let (api_name, api) = apis
            .iter()
            .find(|(_, api)| api["service"] == "AppSync")
            .or_else(|| apis.iter().next())
            .ok_or_else(|| Error::Config("amplify-meta.json has no API".into()))?;

        let output = &api["output"];
        let current = EnvironmentConfig {
            endpoint: output["GraphQLAPIEndpointOutput"]
                .as_str()
                .ok_or_else(|| Error::Config(format!("API {api_name} has no GraphQL endpoint")))?
                .to_string(),
            api_id: output["GraphQLAPIIdOutput"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            api_key: None,
            versioned: true,
        };

        let env_name = read_env_name(root).unwrap_or_else(|| "dev".to_string());
        let environments = read_recsync_file(root)?.environments;

        debug!(root = %root.display(), api = %api_name, env = %env_name, "loaded project");

        Ok(Self {
            root: root.to_path_buf(),
            app_id,
            api_name: api_name.clone(),
            env_name,
            current,
            environments,
        })
    }

    /// Path of the deployed GraphQL schema.
    #[must_use]
    pub fn schema_path(&self) -> PathBuf {
        self.root
            .join(CLOUD_BACKEND_DIR)
            .join("api")
            .join(&self.api_name)
            .join("schema.graphql")
    }

    /// Connection details of the current environment.
    #[must_use]
    pub fn current_environment(&self) -> TableRefBuilder<'_> {
        TableRefBuilder {
            environment: &self.env_name,
            config: self
                .environments
                .get(&self.env_name)
                .unwrap_or(&self.current),
        }
    }

    /// Names of every environment this project can reach.
    #[must_use]
    pub fn environment_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.environments.keys().cloned().collect();
        if !names.contains(&self.env_name) {
            names.push(self.env_name.clone());
            names.sort();
        }
        names
    }
}

/// An environment that has not yet been bound to a model.
#[derive(Debug, Clone, Copy)]
pub struct TableRefBuilder<'a> {
    environment: &'a str,
    config: &'a EnvironmentConfig,
}

impl TableRefBuilder<'_> {
    #[must_use]
    pub fn table(&self, model: &str) -> TableRef {
        TableRef {
            environment: self.environment.to_string(),
            model: model.to_string(),
            table_name: format!("{model}-{}-{}", self.config.api_id, self.environment),
            config: self.config.clone(),
        }
    }
}

impl TableResolver for Project {
    fn resolve(&self, environment: &str, model: &str) -> Result<TableRef> {
        if let Some(config) = self.environments.get(environment) {
            return Ok(TableRefBuilder {
                environment,
                config,
            }
            .table(model));
        }
        if environment == self.env_name {
            return Ok(self.current_environment().table(model));
        }
        Err(Error::EnvironmentNotFound {
            env: environment.to_string(),
            available: self.environment_names(),
        })
    }
}

impl SchemaSource for Project {
    fn schema_text(&self) -> Result<String> {
        let path = self.schema_path();
        if !path.exists() {
            return Err(Error::SchemaUnavailable { path });
        }
        Ok(fs::read_to_string(path)?)
    }
}

fn read_env_name(root: &Path) -> Option<String> {
    let path = root.join("amplify").join(".config").join("local-env-info.json");
    let content = fs::read_to_string(path).ok()?;
    let info: serde_json::Value = serde_json::from_str(&content).ok()?;
    info["envName"].as_str().map(String::from)
}

fn read_recsync_file(root: &Path) -> Result<RecsyncFile> {
    let path = root.join("recsync.json");
    if !path.exists() {
        return Ok(RecsyncFile::default());
    }
    let content = fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Failed to read recsync.json: {e}")))?;
    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse recsync.json: {e}")))
}

/// Records requested per list page.
///
/// Priority: `RECSYNC_PAGE_SIZE` env var > default.
#[must_use]
pub fn page_size() -> usize {
    std::env::var("RECSYNC_PAGE_SIZE")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE)
}
