//! Credential providers: environment variables and YAML key files
//!
//! A key file holds one or more named sections, each describing how to reach
//! a search endpoint:
//!
//! ```yaml
//! search_tweets_premium:
//!   account_type: premium
//!   endpoint: https://api.twitter.com/1.1/tweets/search/fullarchive/dev.json
//!   consumer_key: xxxx
//!   consumer_secret: yyyy
//! ```

use crate::error::{SearchError, SearchResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

/// Default section name looked up in key files
pub const DEFAULT_YAML_KEY: &str = "search_tweets_premium";

/// Application key/secret pair used for the client-credentials exchange
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    key: String,
    secret: String,
}

impl Credentials {
    pub fn new(key: &str, secret: &str) -> SearchResult<Self> {
        if key.trim().is_empty() {
            return Err(SearchError::ConfigError(
                "Application key is required".to_string(),
            ));
        }
        if secret.trim().is_empty() {
            return Err(SearchError::ConfigError(
                "Application secret is required".to_string(),
            ));
        }

        Ok(Self {
            key: key.to_string(),
            secret: secret.to_string(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"***")
            .finish()
    }
}

/// Anything that can hand out credentials for a run
pub trait CredentialProvider {
    fn get_credentials(&self) -> SearchResult<Credentials>;
}

/// Credentials read from a pair of environment variables
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    key_var: String,
    secret_var: String,
}

impl EnvCredentials {
    pub fn new(key_var: &str, secret_var: &str) -> Self {
        Self {
            key_var: key_var.to_string(),
            secret_var: secret_var.to_string(),
        }
    }
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new("APP_KEY", "APP_SECRET")
    }
}

impl CredentialProvider for EnvCredentials {
    fn get_credentials(&self) -> SearchResult<Credentials> {
        let read = |name: &str| {
            env::var(name).map_err(|_| {
                SearchError::ConfigError(format!("Environment variable {name} is not set"))
            })
        };

        Credentials::new(&read(&self.key_var)?, &read(&self.secret_var)?)
    }
}

/// One section of a key file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct KeyFileEntry {
    pub account_type: Option<String>,
    pub endpoint: Option<String>,
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    pub bearer_token: Option<String>,
}

impl KeyFileEntry {
    /// Replace fields with `SEARCHTWEETS_*` environment variables when set
    fn overwrite_from_env(&mut self) {
        let overrides = [
            ("SEARCHTWEETS_ACCOUNT_TYPE", &mut self.account_type),
            ("SEARCHTWEETS_ENDPOINT", &mut self.endpoint),
            ("SEARCHTWEETS_CONSUMER_KEY", &mut self.consumer_key),
            ("SEARCHTWEETS_CONSUMER_SECRET", &mut self.consumer_secret),
            ("SEARCHTWEETS_BEARER_TOKEN", &mut self.bearer_token),
        ];

        for (name, field) in overrides {
            if let Ok(value) = env::var(name) {
                if !value.is_empty() {
                    log::debug!("Key file field overridden by {name}");
                    *field = Some(value);
                }
            }
        }
    }

    /// Consumer key/secret, if both are present
    pub fn credentials(&self) -> SearchResult<Credentials> {
        match (&self.consumer_key, &self.consumer_secret) {
            (Some(key), Some(secret)) => Credentials::new(key, secret),
            _ => Err(SearchError::ConfigError(
                "Key file section needs both consumer_key and consumer_secret".to_string(),
            )),
        }
    }
}

/// A YAML key file and the section to read from it
#[derive(Debug, Clone)]
pub struct KeyFile {
    path: PathBuf,
    yaml_key: String,
    env_overwrite: bool,
}

impl KeyFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            yaml_key: DEFAULT_YAML_KEY.to_string(),
            env_overwrite: false,
        }
    }

    pub fn with_yaml_key(mut self, yaml_key: &str) -> Self {
        self.yaml_key = yaml_key.to_string();
        self
    }

    pub fn with_env_overwrite(mut self, env_overwrite: bool) -> Self {
        self.env_overwrite = env_overwrite;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the configured section
    pub fn load(&self) -> SearchResult<KeyFileEntry> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            SearchError::ConfigError(format!(
                "Cannot read key file {}: {e}",
                self.path.display()
            ))
        })?;

        parse_section(&contents, &self.yaml_key, self.env_overwrite)
    }
}

impl CredentialProvider for KeyFile {
    fn get_credentials(&self) -> SearchResult<Credentials> {
        self.load()?.credentials()
    }
}

fn parse_section(contents: &str, yaml_key: &str, env_overwrite: bool) -> SearchResult<KeyFileEntry> {
    // Other top-level entries may have any shape; only the selected one is typed
    let mut sections: HashMap<String, serde_yaml::Value> = serde_yaml::from_str(contents)?;

    let section = sections.remove(yaml_key).ok_or_else(|| {
        SearchError::ConfigError(format!("Key file has no section named '{yaml_key}'"))
    })?;
    let mut entry: KeyFileEntry = serde_yaml::from_value(section).map_err(|e| {
        SearchError::ConfigError(format!("Invalid key file section '{yaml_key}': {e}"))
    })?;

    if env_overwrite {
        entry.overwrite_from_env();
    }

    Ok(entry)
}
