mod common;

use std::io::Write;
use std::sync::Arc;

use common::RecordingFactory;
use sql_keywords::config::ConnectParams;
use sql_keywords::keywords::{KeywordArgs, KeywordLibrary, KeywordValue};
use sql_keywords::{ConnectionRegistry, RowValues, SqlKeywordError};

const SCRIPT: &str = "\u{feff}-- seed data\n\
create table notes (id integer primary key, body text);\n\
/* block\n comment */\n\
insert into notes (body) values ('semi; colon');\n\
insert into notes (body) values ('-- not a comment');\n\
;\n\
select count(*) from notes where body like '%;%'\n";

#[tokio::test]
async fn test05_script_statements_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(SCRIPT.as_bytes())?;

    let factory = RecordingFactory::new();
    let mut reg = ConnectionRegistry::new(Arc::new(factory.clone()));
    reg.connect(&ConnectParams::new("fake://db")).await?;
    let count = reg.execute_script(file.path()).await?;
    assert_eq!(count, 4);

    let sql = factory.sql();
    assert_eq!(sql.len(), 4);
    assert!(sql[0].starts_with("CREATE TABLE notes"), "{}", sql[0]);
    assert!(sql[1].contains("'semi; colon'"), "{}", sql[1]);
    assert!(sql[2].contains("'-- not a comment'"), "{}", sql[2]);
    assert!(sql[3].starts_with("SELECT count(*)") || sql[3].starts_with("SELECT COUNT(*)"));
    assert!(sql.iter().all(|s| !s.ends_with(';') && !s.contains('\u{feff}')));
    assert!(sql.iter().all(|s| !s.contains("seed data") && !s.contains("block")));
    Ok(())
}

#[tokio::test]
async fn test05_script_errors() -> Result<(), Box<dyn std::error::Error>> {
    let factory = RecordingFactory::new();
    let mut reg = ConnectionRegistry::new(Arc::new(factory.clone()));

    let missing = reg.execute_script("/definitely/not/here.sql").await.unwrap_err();
    assert!(matches!(missing, SqlKeywordError::NoCurrentConnection));

    reg.connect(&ConnectParams::new("fake://db")).await?;
    let missing = reg.execute_script("/definitely/not/here.sql").await.unwrap_err();
    assert!(matches!(missing, SqlKeywordError::ScriptRead { .. }));

    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(b"insert into t values (1);\nFAIL now;\ninsert into t values (3);\n")?;
    assert!(reg.execute_script(file.path()).await.is_err());
    assert_eq!(factory.sql().len(), 2, "no statements after the failing one, no rollback");
    Ok(())
}

#[tokio::test]
async fn test05_unterminated_comment_runs_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let factory = RecordingFactory::new();
    let mut reg = ConnectionRegistry::new(Arc::new(factory.clone()));
    reg.connect(&ConnectParams::new("fake://db")).await?;

    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(b"select 1 /* unterminated ; comment\n; select 2;")?;
    let err = reg.execute_script(file.path()).await.unwrap_err();
    assert!(
        matches!(err, SqlKeywordError::ParameterError(ref m) if m.contains("unterminated")),
        "{err}"
    );
    assert!(factory.sql().is_empty(), "nothing runs from a script that does not scan");
    Ok(())
}

#[tokio::test]
async fn test05_column_aliases_do_not_merge() -> Result<(), Box<dyn std::error::Error>> {
    let factory = RecordingFactory::new();
    let mut reg = ConnectionRegistry::new(Arc::new(factory.clone()));
    reg.connect(&ConnectParams::new("fake://db")).await?;

    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(b"SELECT 'x' AS function, 1 AS begin;\nSELECT 2;\n")?;
    assert_eq!(reg.execute_script(file.path()).await?, 2);
    assert_eq!(factory.sql()[1], "SELECT 2");
    Ok(())
}

#[cfg(feature = "sqlite")]
#[test]
fn test05_sqlite_script_with_trigger() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let script = dir.path().join("schema.sql");
    std::fs::write(
        &script,
        "CREATE TABLE items (id INTEGER PRIMARY KEY, qty INTEGER);\n\
         CREATE TABLE audit (item_id INTEGER, note TEXT);\n\
         CREATE TRIGGER items_audit AFTER INSERT ON items\n\
         BEGIN\n\
           INSERT INTO audit (item_id, note) VALUES (NEW.id, 'added; ok');\n\
         END;\n\
         INSERT INTO items (qty) VALUES (3);\n",
    )?;

    let mut lib = KeywordLibrary::new()?;
    lib.run_keyword("Connect To Db", KeywordArgs::positional(["sqlite://"]))?;
    let ran = lib.run_keyword(
        "Execute Sql Script",
        KeywordArgs::positional([script.display().to_string()]),
    )?;
    assert!(matches!(ran, KeywordValue::Count(4)));

    let rows = lib.query("SELECT note FROM audit", &[], &Default::default())?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("note").and_then(RowValues::as_text), Some("added; ok"));
    Ok(())
}
