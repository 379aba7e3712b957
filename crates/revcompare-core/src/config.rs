//! Comparison settings
//!
//! Settings are an explicit value handed to the engine. They can be read
//! from a TOML document (`[compare]` table) and overlaid with environment
//! variables.

use serde::{Deserialize, Serialize};
use std::env;

use crate::errors::{CompareError, Result};

pub const ENV_FOREIGN_OBJECTS_AS_ID: &str = "REVERSION_COMPARE_FOREIGN_OBJECTS_AS_ID";
pub const ENV_IGNORE_NOT_REGISTERED: &str = "REVERSION_COMPARE_IGNORE_NOT_REGISTERED";

/// Engine settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Compare relations by stored identifier instead of resolved object
    pub compare_foreign_objects_as_id: bool,
    /// Silently skip related objects whose model is not under version control
    pub ignore_not_registered_relations: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    compare: CompareConfig,
}

/// Environment reader, injectable for tests
pub trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads the process environment
pub struct ProcessEnv;

impl EnvReader for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl CompareConfig {
    /// Parse the `[compare]` table of a TOML document
    ///
    /// Missing table or keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the document is not valid TOML or a key has the
    /// wrong type.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(source).map_err(|e| CompareError::Config {
            message: e.to_string(),
        })?;
        Ok(file.compare)
    }

    /// Defaults overlaid with the process environment
    ///
    /// # Errors
    ///
    /// Returns `Config` if a variable holds something other than a boolean.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env(&ProcessEnv)
    }

    /// Overlay environment variables onto this config
    ///
    /// # Errors
    ///
    /// Returns `Config` if a variable holds something other than a boolean.
    pub fn with_env(mut self, env: &dyn EnvReader) -> Result<Self> {
        if let Some(raw) = env.get(ENV_FOREIGN_OBJECTS_AS_ID) {
            self.compare_foreign_objects_as_id = parse_flag(ENV_FOREIGN_OBJECTS_AS_ID, &raw)?;
        }
        if let Some(raw) = env.get(ENV_IGNORE_NOT_REGISTERED) {
            self.ignore_not_registered_relations = parse_flag(ENV_IGNORE_NOT_REGISTERED, &raw)?;
        }
        Ok(self)
    }

    pub fn with_foreign_objects_as_id(mut self, enabled: bool) -> Self {
        self.compare_foreign_objects_as_id = enabled;
        self
    }

    pub fn with_ignore_not_registered(mut self, enabled: bool) -> Self {
        self.ignore_not_registered_relations = enabled;
        self
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(CompareError::Config {
            message: format!("{} expects a boolean, got {:?}", key, other),
        }),
    }
}
