//! Bridge configuration.
//!
//! Loaded from a JSON file or built in code. Every field has a default, so
//! `{}` is a valid configuration:
//!
//! ```json
//! {
//!     "engine": { "type": "local", "path": "/var/lib/pathbridge" },
//!     "auto_create": { "databases": true, "collections": true, "objects": false }
//! }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use pathbridge_core::{Engine, EngineError, ResourceKind};
use pathbridge_engine::{LocalDiskEngine, MemoryEngine};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to open engine: {0}")]
    Engine(#[from] EngineError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    pub engine: EngineConfig,
    pub auto_create: AutoCreatePolicy,
}

impl BridgeConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Config for a local-disk engine rooted at `path`.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            engine: EngineConfig::Local { path: path.into() },
            ..Self::default()
        }
    }
}

/// Which engine backs the bridge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EngineConfig {
    #[default]
    Memory,
    Local {
        path: PathBuf,
    },
}

impl EngineConfig {
    pub fn build(&self) -> Result<Arc<dyn Engine>, ConfigError> {
        match self {
            EngineConfig::Memory => Ok(Arc::new(MemoryEngine::new())),
            EngineConfig::Local { path } => Ok(Arc::new(LocalDiskEngine::new(path.clone())?)),
        }
    }
}

/// Which missing resources the resolver may create on first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoCreatePolicy {
    pub databases: bool,
    pub collections: bool,
    pub objects: bool,
}

impl AutoCreatePolicy {
    /// Never create anything; every resource must already exist.
    pub const NEVER: AutoCreatePolicy = AutoCreatePolicy {
        databases: false,
        collections: false,
        objects: false,
    };

    pub fn allows(&self, kind: ResourceKind) -> bool {
        match kind {
            ResourceKind::Database => self.databases,
            ResourceKind::Collection => self.collections,
            ResourceKind::Object => self.objects,
        }
    }
}

impl Default for AutoCreatePolicy {
    fn default() -> Self {
        Self {
            databases: true,
            collections: true,
            objects: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        let config = BridgeConfig::from_json_str("{}").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.engine, EngineConfig::Memory);
        assert!(config.auto_create.allows(ResourceKind::Object));
    }

    #[test]
    fn parses_local_engine_and_partial_policy() {
        let config = BridgeConfig::from_json_str(
            r#"{
                "engine": { "type": "local", "path": "/tmp/data" },
                "auto_create": { "objects": false }
            }"#,
        )
        .unwrap();
        assert_eq!(
            config.engine,
            EngineConfig::Local {
                path: PathBuf::from("/tmp/data")
            }
        );
        assert!(config.auto_create.allows(ResourceKind::Database));
        assert!(config.auto_create.allows(ResourceKind::Collection));
        assert!(!config.auto_create.allows(ResourceKind::Object));
    }

    #[test]
    fn rejects_unknown_engine_and_fields() {
        assert!(matches!(
            BridgeConfig::from_json_str(r#"{"engine": {"type": "cloud"}}"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            BridgeConfig::from_json_str(r#"{"engines": {}}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = BridgeConfig::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn load_and_build_local_engine() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        let file = dir.path().join("bridge.json");
        std::fs::write(
            &file,
            serde_json::to_string(&BridgeConfig::local(&data)).unwrap(),
        )
        .unwrap();

        let config = BridgeConfig::load(&file).unwrap();
        config.engine.build().unwrap();
        assert!(data.is_dir());
    }
}
