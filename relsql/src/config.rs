//! Database configuration.
//!
//! Read from an optional file (any format the `config` crate understands,
//! e.g. `relsql.toml`) overlaid with `RELSQL_*` environment variables:
//!
//! ```toml
//! url = "postgres://localhost/suppliers"
//! max_connections = 8
//! acquire_timeout_secs = 30
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use sqlx::AnyPool;

use crate::{database, RelResult};

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Connection url, e.g. `sqlite://suppliers.db` or `postgres://...`
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    4
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }

    pub fn load(path: Option<&Path>) -> RelResult<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path));
        }

        let config = builder
            .add_source(::config::Environment::with_prefix("RELSQL").try_parsing(true))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub async fn connect(&self) -> RelResult<AnyPool> {
        database::connect(&self.url, self.max_connections, self.acquire_timeout()).await
    }
}
