#![cfg(feature = "sqlite")]

use std::path::Path;

use sql_keywords::keywords::{KeywordArgs, KeywordLibrary, KeywordValue};
use sql_keywords::{RowValues, SqlKeywordError};

fn sqlite_url(path: &Path) -> String {
    format!("sqlite:///{}", path.display())
}

#[test]
fn test04_sqlite_file_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = dir.path().join("kw.db");
    let mut lib = KeywordLibrary::new()?;

    lib.run_keyword(
        "Connect To Db",
        KeywordArgs::positional([sqlite_url(&db)])
            .named("alias", "file")
            .named("pool_size", "2")
            .named("foreign_keys", "true"),
    )?;
    lib.run_keyword(
        "Execute",
        KeywordArgs::positional([
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, score REAL)",
        ]),
    )?;
    let inserted = lib.run_keyword(
        "Execute",
        KeywordArgs::positional([
            "INSERT INTO users (name, score) VALUES ('alice', 1.5), ('bob', NULL)",
        ]),
    )?;
    match inserted {
        KeywordValue::ResultSet(rs) => assert_eq!(rs.rows_affected, 2),
        other => panic!("unexpected {other:?}"),
    }

    let rows = lib.run_keyword(
        "Query",
        KeywordArgs::positional(["SELECT {0}, score FROM {table} ORDER BY id", "name"])
            .named("table", "users"),
    )?;
    let rows = rows.as_rows().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("name").and_then(RowValues::as_text), Some("alice"));
    assert_eq!(rows[0].get("score").and_then(RowValues::as_float), Some(1.5));
    assert!(rows[1].get("score").is_some_and(RowValues::is_null));

    // a second connection to the same file sees the committed rows
    lib.run_keyword("Connect To Db", KeywordArgs::positional([sqlite_url(&db)]))?;
    let count = lib.query("SELECT COUNT(*) AS n FROM users", &[], &Default::default())?;
    assert_eq!(count[0].get("n").and_then(RowValues::as_int), Some(&2));

    lib.switch_connection("file")?;
    lib.close_all_connections()?;
    Ok(())
}

#[test]
fn test04_sqlite_memory_keeps_state_between_keywords() -> Result<(), SqlKeywordError> {
    let mut lib = KeywordLibrary::new()?;
    lib.run_keyword("Connect To Db", KeywordArgs::positional(["sqlite://"]))?;
    lib.execute("CREATE TABLE t (a INTEGER)")?;
    lib.execute("INSERT INTO t VALUES (1)")?;
    let rows = lib.query("SELECT a FROM t", &[], &Default::default())?;
    assert_eq!(rows.len(), 1);

    let session = lib.create_session(Default::default())?;
    lib.block_on(async {
        session.add("INSERT INTO t VALUES (2)").await?;
        session.commit().await
    })?;
    let rows = lib.query("SELECT a FROM t ORDER BY a", &[], &Default::default())?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].get("a").and_then(RowValues::as_int), Some(&2));
    Ok(())
}

#[test]
fn test04_sqlite_text_timestamps_and_flags() -> Result<(), SqlKeywordError> {
    let mut lib = KeywordLibrary::new()?;
    lib.run_keyword("Connect To Db", KeywordArgs::positional(["sqlite://"]))?;
    lib.execute("CREATE TABLE ev (at TEXT, done INTEGER)")?;
    lib.execute("INSERT INTO ev VALUES ('2024-01-02 03:04:05', 1)")?;
    lib.execute("INSERT INTO ev VALUES ('2024-01-02 03:04:05.250', 0)")?;

    let rows = lib.query("SELECT at, done FROM ev ORDER BY at", &[], &Default::default())?;
    let first = rows[0].get("at").and_then(RowValues::as_timestamp).unwrap();
    assert_eq!(first.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-01-02 03:04:05");
    let second = rows[1].get("at").and_then(RowValues::as_timestamp).unwrap();
    assert!(second > first);
    assert_eq!(rows[0].get("done").and_then(RowValues::as_bool), Some(&true));
    assert_eq!(rows[1].get("done").and_then(RowValues::as_bool), Some(&false));
    Ok(())
}

#[test]
fn test04_sqlite_rejects_procedures_and_unknown_options() -> Result<(), SqlKeywordError> {
    let mut lib = KeywordLibrary::new()?;
    let bad = lib.run_keyword(
        "Connect To Db",
        KeywordArgs::positional(["sqlite://"]).named("isolation_level", "AUTOCOMMIT"),
    );
    assert!(matches!(bad, Err(SqlKeywordError::ConfigError(_))));
    assert!(lib.registry().is_empty());

    lib.run_keyword("Connect To Db", KeywordArgs::positional(["sqlite://"]))?;
    let err = lib
        .run_keyword("Call Stored Procedure", KeywordArgs::positional(["anything", "1"]))
        .unwrap_err();
    assert!(matches!(err, SqlKeywordError::Unimplemented(_)));

    // the raw connection went back to the pool, so the single memory connection still works
    lib.execute("SELECT 1")?;
    Ok(())
}

#[test]
fn test04_unsupported_dialect() {
    let mut lib = KeywordLibrary::new().unwrap();
    let err = lib
        .run_keyword(
            "Connect To Db",
            KeywordArgs::positional(["127.0.0.1", "1521", "orcl", "u", "p", "oracle+cx_oracle"]),
        )
        .unwrap_err();
    assert!(matches!(err, SqlKeywordError::Unimplemented(_)));
}
