use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use super::args::{KeywordArgs, Signature};
use super::value::KeywordValue;
use crate::config::{ConnectParams, EngineOptions};
use crate::error::SqlKeywordError;
use crate::registry::{ConnectionRef, ConnectionRegistry};
use crate::session::SessionOptions;
use crate::types::RowValues;

/// Keywords every library instance provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinKeyword {
    ConnectToDb,
    SwitchConnection,
    CreateSession,
    CloseConnection,
    CloseAllConnections,
    Execute,
    Query,
    ExecuteSqlScript,
    CallStoredProcedure,
}

impl BuiltinKeyword {
    pub const ALL: [BuiltinKeyword; 9] = [
        BuiltinKeyword::ConnectToDb,
        BuiltinKeyword::SwitchConnection,
        BuiltinKeyword::CreateSession,
        BuiltinKeyword::CloseConnection,
        BuiltinKeyword::CloseAllConnections,
        BuiltinKeyword::Execute,
        BuiltinKeyword::Query,
        BuiltinKeyword::ExecuteSqlScript,
        BuiltinKeyword::CallStoredProcedure,
    ];

    #[must_use]
    pub fn signature(self) -> Signature {
        match self {
            BuiltinKeyword::ConnectToDb => Signature {
                keyword: "Connect To Db",
                params: &[
                    "hostOrUrl",
                    "port",
                    "database",
                    "user",
                    "password",
                    "dbPrefix",
                    "alias",
                ],
                varargs: false,
                kwargs: true,
            },
            BuiltinKeyword::SwitchConnection => Signature {
                keyword: "Switch Connection",
                params: &["indexOrAlias"],
                varargs: false,
                kwargs: false,
            },
            BuiltinKeyword::CreateSession => Signature {
                keyword: "Create Session",
                params: &["autoflush", "autocommit", "expireOnCommit", "info"],
                varargs: false,
                kwargs: true,
            },
            BuiltinKeyword::CloseConnection => Signature {
                keyword: "Close Connection",
                params: &[],
                varargs: false,
                kwargs: false,
            },
            BuiltinKeyword::CloseAllConnections => Signature {
                keyword: "Close All Connections",
                params: &[],
                varargs: false,
                kwargs: false,
            },
            BuiltinKeyword::Execute => Signature {
                keyword: "Execute",
                params: &["sql"],
                varargs: false,
                kwargs: false,
            },
            BuiltinKeyword::Query => Signature {
                keyword: "Query",
                params: &["sql"],
                varargs: true,
                kwargs: true,
            },
            BuiltinKeyword::ExecuteSqlScript => Signature {
                keyword: "Execute Sql Script",
                params: &["sqlFile"],
                varargs: false,
                kwargs: false,
            },
            BuiltinKeyword::CallStoredProcedure => Signature {
                keyword: "Call Stored Procedure",
                params: &["name"],
                varargs: true,
                kwargs: false,
            },
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        self.signature().keyword
    }

    /// Convert the string arguments and run the keyword against `registry`.
    ///
    /// # Errors
    /// Returns `ParameterError` for arguments that do not fit the keyword, or whatever the
    /// registry operation returns.
    pub async fn run(
        self,
        registry: &mut ConnectionRegistry,
        args: KeywordArgs,
    ) -> Result<KeywordValue, SqlKeywordError> {
        let mut bound = args.bind(&self.signature())?;
        match self {
            BuiltinKeyword::ConnectToDb => {
                let mut builder = ConnectParams::builder(bound.required("hostOrUrl")?);
                if let Some(port) = bound.optional_parsed::<u16>("port")? {
                    builder = builder.port(port);
                }
                if let Some(database) = bound.optional("database") {
                    builder = builder.database(database);
                }
                if let Some(user) = bound.optional("user") {
                    builder = builder.user(user);
                }
                if let Some(password) = bound.optional("password") {
                    builder = builder.password(password);
                }
                if let Some(prefix) = bound.optional("dbPrefix") {
                    builder = builder.db_prefix(prefix);
                }
                if let Some(alias) = bound.optional("alias") {
                    builder = builder.alias(alias);
                }
                let options = EngineOptions::from_pairs(std::mem::take(&mut bound.kwargs))?;
                let params = builder.options(options).finish();
                registry.connect(&params).await.map(KeywordValue::Index)
            }
            BuiltinKeyword::SwitchConnection => {
                let target = ConnectionRef::Alias(bound.required("indexOrAlias")?);
                registry.switch(target).map(KeywordValue::PreviousIndex)
            }
            BuiltinKeyword::CreateSession => {
                let mut options = SessionOptions::default()
                    .with_autoflush(bound.flag("autoflush", true)?)
                    .with_autocommit(bound.flag("autocommit", false)?)
                    .with_expire_on_commit(bound.flag("expireOnCommit", true)?);
                if let Some(info) = bound.optional("info") {
                    options.info = parse_info(&info)?;
                }
                options.extra = std::mem::take(&mut bound.kwargs);
                registry.create_session(options).map(KeywordValue::Session)
            }
            BuiltinKeyword::CloseConnection => {
                registry.close().await.map(|()| KeywordValue::None)
            }
            BuiltinKeyword::CloseAllConnections => {
                registry.close_all().await.map(|()| KeywordValue::None)
            }
            BuiltinKeyword::Execute => {
                let sql = bound.required("sql")?;
                registry.execute(&sql).await.map(KeywordValue::ResultSet)
            }
            BuiltinKeyword::Query => {
                let sql = bound.required("sql")?;
                registry
                    .query(&sql, &bound.varargs, &bound.kwargs)
                    .await
                    .map(KeywordValue::Rows)
            }
            BuiltinKeyword::ExecuteSqlScript => {
                let path = bound.required("sqlFile")?;
                registry.execute_script(path).await.map(KeywordValue::Count)
            }
            BuiltinKeyword::CallStoredProcedure => {
                let name = bound.required("name")?;
                let params: Vec<RowValues> =
                    bound.varargs.drain(..).map(RowValues::Text).collect();
                registry
                    .call_procedure(&name, &params)
                    .await
                    .map(KeywordValue::ResultSet)
            }
        }
    }
}

fn parse_info(raw: &str) -> Result<BTreeMap<String, JsonValue>, SqlKeywordError> {
    serde_json::from_str(raw).map_err(|e| {
        SqlKeywordError::ParameterError(format!("info must be a JSON object: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique() {
        let mut names: Vec<&str> = BuiltinKeyword::ALL.iter().map(|k| k.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), BuiltinKeyword::ALL.len());
    }

    #[test]
    fn info_must_be_an_object() {
        assert_eq!(parse_info(r#"{"team": "qa"}"#).unwrap()["team"], "qa");
        assert!(parse_info("[1, 2]").is_err());
    }
}
