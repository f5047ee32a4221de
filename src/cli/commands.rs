//! CLI command implementations
//!
//! Each command opens a fresh [`Session`]: a current-thread runtime and an
//! interactive registry over a [`FileBackend`]. Commands go through the
//! regular record protocol and wait for every side effect before returning,
//! so a value printed by `set` has already been persisted.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use crate::durable::FileBackend;
use crate::identity::{Namespace, StoreIdentity, DEFAULT_NAMESPACE_PART};
use crate::registry::{ExecutionContext, Registry, StoreRecord};
use crate::schema::{load_schema_file, AcceptAll, Schema};
use crate::value::{deep_equal, normalize, Slot};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::write_response;

/// Configuration file structure
///
/// ```json
/// { "data_dir": "./localdb-data", "db_name": "app", "store_name": "prefs" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Root directory of the file backend
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_namespace_part")]
    pub db_name: String,

    #[serde(default = "default_namespace_part")]
    pub store_name: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./localdb-data")
}

fn default_namespace_part() -> String {
    DEFAULT_NAMESPACE_PART.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            db_name: default_namespace_part(),
            store_name: default_namespace_part(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.db_name.is_empty() || self.store_name.is_empty() {
            return Err(CliError::config_error(
                "db_name and store_name must not be empty",
            ));
        }
        Ok(())
    }

    /// Config file (or defaults) with command-line flags applied on top
    pub fn resolve(cli: &Cli) -> CliResult<Self> {
        let mut config = match &cli.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(dir) = &cli.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(db) = &cli.db {
            config.db_name = db.clone();
        }
        if let Some(store) = &cli.store {
            config.store_name = store.clone();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn namespace(&self) -> Namespace {
        Namespace::new(&self.db_name, &self.store_name)
    }
}

/// One CLI invocation's runtime, backend and registry
pub struct Session {
    runtime: Runtime,
    backend: Arc<FileBackend>,
    registry: Registry,
    namespace: Namespace,
}

impl Session {
    pub fn open(config: &Config) -> CliResult<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CliError::io_error(format!("Failed to start runtime: {}", e)))?;

        let backend = Arc::new(FileBackend::new(&config.data_dir));
        let registry = Registry::builder()
            .context(ExecutionContext::Interactive)
            .durable_backend(backend.clone())
            .build();

        debug!(data_dir = %config.data_dir.display(), namespace = %config.namespace(), "session opened");
        Ok(Self {
            runtime,
            backend,
            registry,
            namespace: config.namespace(),
        })
    }

    fn identity(&self, key: &str) -> StoreIdentity {
        StoreIdentity {
            namespace: self.namespace.clone(),
            key: key.to_string(),
        }
    }

    /// Hydrate `record` and wait for hydration and any write-back
    async fn hydrated(&self, record: &Arc<StoreRecord>) {
        record.hydrate();
        self.registry.settle().await;
    }

    /// Stored value, `None` when absent
    pub fn get(&self, key: &str) -> Slot {
        let record = self.registry.get_or_create(
            self.identity(key),
            None,
            Arc::new(AcceptAll),
            deep_equal,
        );
        self.runtime.block_on(async {
            self.hydrated(&record).await;
            record.snapshot().value().cloned()
        })
    }

    /// Validate, repair and persist `value`; returns what was stored
    pub fn set(&self, key: &str, value: Value, schema: Arc<dyn Schema>, initial: Slot) -> Slot {
        let record = self
            .registry
            .get_or_create(self.identity(key), initial, schema, deep_equal);
        self.runtime.block_on(async {
            self.hydrated(&record).await;
            record.set_value(Some(value));
            self.registry.settle().await;
            record.snapshot().value().cloned()
        })
    }

    /// Remove the stored value; returns whether one existed
    pub fn remove(&self, key: &str) -> bool {
        let record = self.registry.get_or_create(
            self.identity(key),
            None,
            Arc::new(AcceptAll),
            deep_equal,
        );
        self.runtime.block_on(async {
            self.hydrated(&record).await;
            let existed = record.snapshot().value().is_some();
            record.set_value(None);
            self.registry.settle().await;
            existed
        })
    }

    pub fn list(&self) -> CliResult<Vec<String>> {
        Ok(self
            .runtime
            .block_on(self.backend.list_keys(&self.namespace))?)
    }
}

fn parse_json(what: &str, text: &str) -> CliResult<Value> {
    serde_json::from_str(text).map_err(|e| CliError::invalid_value(what, e))
}

/// Run the command named by the CLI args
pub fn run_command(cli: Cli) -> CliResult<()> {
    let config = Config::resolve(&cli)?;
    let session = Session::open(&config)?;

    match cli.command {
        Command::Get { key } => {
            let value = session.get(&key);
            write_response(json!({ "key": key, "value": value }))
        }
        Command::Set {
            key,
            value,
            schema,
            initial,
        } => {
            let value = parse_json("value", &value)?;
            let initial = match initial {
                Some(text) => normalize(Some(parse_json("initial", &text)?)),
                None => None,
            };
            let schema: Arc<dyn Schema> = match schema {
                Some(path) => Arc::new(load_schema_file(&path)?),
                None => Arc::new(AcceptAll),
            };
            let stored = session.set(&key, value, schema, initial);
            write_response(json!({ "key": key, "value": stored }))
        }
        Command::Rm { key } => {
            let removed = session.remove(&key);
            write_response(json!({ "key": key, "removed": removed }))
        }
        Command::List => {
            let keys = session.list()?;
            write_response(json!({ "keys": keys }))
        }
    }
}
