use postgres::Client;
use taskboard_core::{Error, Result};

const SCHEMA_LOCK_KEY: i64 = 0x7461736b626f6172; // "taskboar"

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS taskboard_documents (
  workspace TEXT NOT NULL,
  collection TEXT NOT NULL,
  doc_id TEXT NOT NULL,
  body JSONB NOT NULL,
  PRIMARY KEY (workspace, collection, doc_id)
);
"#;

pub fn ensure_schema(client: &mut Client) -> Result<()> {
    // Concurrent `CREATE TABLE IF NOT EXISTS` can still race on the catalog.
    client
        .query_one("SELECT pg_advisory_lock($1)", &[&SCHEMA_LOCK_KEY])
        .map_err(|e| Error::Storage(format!("{e:?}")))?;

    let res = client
        .batch_execute(SCHEMA_SQL)
        .map_err(|e| Error::Storage(format!("{e:?}")));

    let _ = client.query_one("SELECT pg_advisory_unlock($1)", &[&SCHEMA_LOCK_KEY]);

    res
}

pub fn reset_workspace_for_tests(client: &mut Client, workspace: &str) -> Result<()> {
    client
        .execute(
            "DELETE FROM taskboard_documents WHERE workspace = $1",
            &[&workspace],
        )
        .map_err(|e| Error::Storage(format!("{e:?}")))?;
    Ok(())
}
