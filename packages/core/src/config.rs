//! Connection settings for the graph session
use serde::{Deserialize, Serialize};

/// Where and how to reach the graph store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Wire protocol, e.g. `bolt`
    pub protocol: String,

    pub host: String,

    pub port: u16,

    /// Database path appended to the uri; empty for the default database
    pub db_path: String,

    pub user: String,

    pub password: String,

    /// Full uri, taking precedence over protocol/host/port/db_path
    pub uri_override: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            protocol: "bolt".to_string(),
            host: "localhost".to_string(),
            port: 7474,
            db_path: String::new(),
            user: "neo4j".to_string(),
            password: "neo4j".to_string(),
            uri_override: None,
        }
    }
}

impl ConnectionConfig {
    /// Settings from the process environment.
    ///
    /// - `NEO4J_URI` - full uri override
    /// - `NEO4J_USER` / `NEO4J_PASSWORD` - credentials
    /// - `NODE_ENV` - deployment name (default `development`), selecting
    ///   the `cooper_<env>` database
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ConnectionConfig::from_env`], reading through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let env = lookup("NODE_ENV")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "development".to_string());

        Self {
            db_path: format!("cooper_{}", env),
            user: lookup("NEO4J_USER").unwrap_or(defaults.user.clone()),
            password: lookup("NEO4J_PASSWORD").unwrap_or(defaults.password.clone()),
            uri_override: lookup("NEO4J_URI").filter(|v| !v.is_empty()),
            ..defaults
        }
    }

    /// Uri handed to the connector
    pub fn uri(&self) -> String {
        if let Some(uri) = &self.uri_override {
            return uri.clone();
        }
        format!("{}://{}:{}/{}", self.protocol, self.host, self.port, self.db_path)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.uri_override.is_none() {
            if self.protocol.is_empty() {
                return Err("protocol cannot be empty".to_string());
            }
            if self.host.is_empty() {
                return Err("host cannot be empty".to_string());
            }
            if self.port == 0 {
                return Err("port must be greater than 0".to_string());
            }
        }

        if self.user.is_empty() {
            return Err("user cannot be empty".to_string());
        }

        Ok(())
    }
}
