use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::error::SqlKeywordError;
use crate::types::DatabaseType;

lazy_static! {
    static ref URL_PASSWORD: Regex =
        Regex::new(r"^(?P<head>[^:/?#]+://[^:/?#@]*:)[^/?#]*@").expect("static regex");
}

/// Backend options passed through to the connection factory.
///
/// `pool_size` and `echo` are understood by every backend; anything else lands in `extra`
/// and is interpreted (or rejected) by the backend that receives it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineOptions {
    #[serde(default)]
    pub pool_size: Option<u32>,
    #[serde(default)]
    pub echo: bool,
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, String>,
}

impl EngineOptions {
    /// Build options from loose `key=value` pairs as they arrive from a keyword call.
    ///
    /// # Errors
    /// Returns `SqlKeywordError::ParameterError` when a known key has an unparsable value.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, SqlKeywordError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut opts = EngineOptions::default();
        for (key, value) in pairs {
            opts.set(key.into(), value.into())?;
        }
        Ok(opts)
    }

    /// Set a single option by name.
    ///
    /// # Errors
    /// Returns `SqlKeywordError::ParameterError` when a known key has an unparsable value.
    pub fn set(&mut self, key: String, value: String) -> Result<(), SqlKeywordError> {
        match key.as_str() {
            "pool_size" => {
                let size = value.trim().parse::<u32>().map_err(|e| {
                    SqlKeywordError::ParameterError(format!("pool_size '{value}': {e}"))
                })?;
                if size == 0 {
                    return Err(SqlKeywordError::ParameterError(
                        "pool_size must be at least 1".to_string(),
                    ));
                }
                self.pool_size = Some(size);
            }
            "echo" => self.echo = parse_bool(&value)?,
            _ => {
                self.extra.insert(key, value);
            }
        }
        Ok(())
    }

    /// Fail with a `ConfigError` naming the first extra option outside `known`.
    ///
    /// # Errors
    /// Returns `SqlKeywordError::ConfigError` for an unsupported option.
    pub fn reject_unknown(&self, backend: &str, known: &[&str]) -> Result<(), SqlKeywordError> {
        match self.extra.keys().find(|k| !known.contains(&k.as_str())) {
            Some(key) => Err(SqlKeywordError::ConfigError(format!(
                "{backend} engine does not support option '{key}'"
            ))),
            None => Ok(()),
        }
    }
}

/// Parse the boolean spellings a test script may send.
///
/// # Errors
/// Returns `SqlKeywordError::ParameterError` for anything that is not a recognized boolean.
pub fn parse_bool(value: &str) -> Result<bool, SqlKeywordError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "none" | "" => Ok(false),
        other => Err(SqlKeywordError::ParameterError(format!(
            "expected a boolean, got '{other}'"
        ))),
    }
}

/// Everything `Connect To Db` needs to open and register an engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConnectParams {
    /// Host name, or a complete connection string containing `://`
    pub host_or_url: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// `dialect+driver`, e.g. `postgresql` or `mysql+pymysql`
    #[serde(default)]
    pub db_prefix: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub options: EngineOptions,
}

impl ConnectParams {
    #[must_use]
    pub fn new(host_or_url: impl Into<String>) -> Self {
        Self {
            host_or_url: host_or_url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn builder(host_or_url: impl Into<String>) -> ConnectParamsBuilder {
        ConnectParamsBuilder::new(host_or_url)
    }

    /// Load a connection profile from a JSON file.
    ///
    /// # Errors
    /// Returns `SqlKeywordError::ConfigError` if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SqlKeywordError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SqlKeywordError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            SqlKeywordError::ConfigError(format!("invalid profile {}: {e}", path.display()))
        })
    }

    /// Whether `host_or_url` already carries a full connection string.
    #[must_use]
    pub fn is_url(&self) -> bool {
        self.host_or_url.contains("://")
    }

    /// Assemble the connection string handed to the connection factory.
    ///
    /// # Errors
    /// Returns `SqlKeywordError::ConfigError` when no URL was given and `db_prefix` is missing.
    pub fn connection_string(&self) -> Result<String, SqlKeywordError> {
        if self.is_url() {
            return Ok(self.host_or_url.clone());
        }
        let prefix = self
            .db_prefix
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| {
                SqlKeywordError::ConfigError(
                    "db_prefix is required when host_or_url is not a connection string"
                        .to_string(),
                )
            })?;

        let mut url = format!("{prefix}://");
        if let Some(user) = &self.user {
            url.push_str(user);
            if let Some(password) = &self.password {
                url.push(':');
                url.push_str(password);
            }
            url.push('@');
        }
        url.push_str(&self.host_or_url);
        if let Some(port) = self.port {
            let _ = write!(url, ":{port}");
        }
        if let Some(database) = &self.database {
            url.push('/');
            url.push_str(database);
        }
        // the whole prefix counts, so `mariadb+mysqlconnector` gets the charset too
        if prefix.to_ascii_lowercase().contains("mysql") {
            url.push_str("?charset=utf8");
        }
        Ok(url)
    }
}

/// Fluent builder for [`ConnectParams`].
#[derive(Debug, Clone)]
pub struct ConnectParamsBuilder {
    params: ConnectParams,
}

impl ConnectParamsBuilder {
    #[must_use]
    pub fn new(host_or_url: impl Into<String>) -> Self {
        Self {
            params: ConnectParams::new(host_or_url),
        }
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.params.port = Some(port);
        self
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.params.database = Some(database.into());
        self
    }

    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.params.user = Some(user.into());
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.params.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn db_prefix(mut self, db_prefix: impl Into<String>) -> Self {
        self.params.db_prefix = Some(db_prefix.into());
        self
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.params.alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn options(mut self, options: EngineOptions) -> Self {
        self.params.options = options;
        self
    }

    #[must_use]
    pub fn finish(self) -> ConnectParams {
        self.params
    }
}

/// A connection string split into its scheme and the backend-specific remainder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionUrl {
    raw: String,
    scheme: String,
    dialect: DatabaseType,
}

impl ConnectionUrl {
    /// # Errors
    /// Returns `SqlKeywordError::ConfigError` when the string has no `scheme://` part.
    pub fn parse(raw: &str) -> Result<Self, SqlKeywordError> {
        let (scheme, _) = raw.split_once("://").ok_or_else(|| {
            SqlKeywordError::ConfigError(format!(
                "connection string has no scheme: {}",
                redact_connection_string(raw)
            ))
        })?;
        if scheme.is_empty() {
            return Err(SqlKeywordError::ConfigError(
                "connection string has an empty scheme".to_string(),
            ));
        }
        Ok(Self {
            raw: raw.to_string(),
            scheme: scheme.to_string(),
            dialect: DatabaseType::from_prefix(scheme),
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// `dialect+driver` exactly as written.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Dialect without the `+driver` suffix.
    #[must_use]
    pub fn dialect_name(&self) -> &str {
        self.scheme.split('+').next().unwrap_or(&self.scheme)
    }

    #[must_use]
    pub fn dialect(&self) -> DatabaseType {
        self.dialect
    }

    /// Everything after `scheme://`.
    #[must_use]
    pub fn remainder(&self) -> &str {
        &self.raw[self.scheme.len() + 3..]
    }

    /// The connection string with its `+driver` suffix removed from the scheme.
    #[must_use]
    pub fn without_driver(&self) -> String {
        format!("{}://{}", self.dialect_name(), self.remainder())
    }
}

/// Mask the password component of a connection string for logging.
#[must_use]
pub fn redact_connection_string(raw: &str) -> String {
    URL_PASSWORD.replace(raw, "${head}***@").into_owned()
}
