use std::cell::RefCell;
use std::rc::Rc;

use postgres::{Client, Row};
use serde_json::{Map, Value};
use taskboard_core::{DocumentStore, Error, Result};
use tracing::trace;

fn storage_debug<E: std::fmt::Debug>(e: E) -> Error {
    Error::Storage(format!("{e:?}"))
}

fn body_of(row: &Row, column: usize) -> Result<Map<String, Value>> {
    match row.try_get::<_, Value>(column).map_err(storage_debug)? {
        Value::Object(fields) => Ok(fields),
        other => Err(Error::Storage(format!("document body is not an object: {other}"))),
    }
}

/// Document store over the `taskboard_documents` table. Clones share the connection.
#[derive(Clone)]
pub struct PostgresDocumentStore {
    client: Rc<RefCell<Client>>,
    workspace: String,
}

impl PostgresDocumentStore {
    pub fn new(client: Rc<RefCell<Client>>, workspace: impl Into<String>) -> Self {
        Self {
            client,
            workspace: workspace.into(),
        }
    }

    pub fn workspace(&self) -> &str {
        &self.workspace
    }
}

impl DocumentStore for PostgresDocumentStore {
    fn list(&self, collection: &str) -> Result<Vec<(String, Map<String, Value>)>> {
        let mut c = self.client.borrow_mut();
        let rows = c
            .query(
                "SELECT doc_id, body FROM taskboard_documents
                 WHERE workspace = $1 AND collection = $2
                 ORDER BY doc_id",
                &[&self.workspace, &collection],
            )
            .map_err(storage_debug)?;
        rows.iter()
            .map(|row| {
                let id: String = row.try_get(0).map_err(storage_debug)?;
                Ok((id, body_of(row, 1)?))
            })
            .collect()
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<Map<String, Value>>> {
        let mut c = self.client.borrow_mut();
        let row = c
            .query_opt(
                "SELECT body FROM taskboard_documents
                 WHERE workspace = $1 AND collection = $2 AND doc_id = $3",
                &[&self.workspace, &collection, &id],
            )
            .map_err(storage_debug)?;
        row.map(|row| body_of(&row, 0)).transpose()
    }

    fn set(&mut self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<()> {
        trace!(collection, id, "pg set");
        let body = Value::Object(fields);
        self.client
            .borrow_mut()
            .execute(
                "INSERT INTO taskboard_documents (workspace, collection, doc_id, body)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (workspace, collection, doc_id) DO UPDATE SET body = EXCLUDED.body",
                &[&self.workspace, &collection, &id, &body],
            )
            .map_err(storage_debug)?;
        Ok(())
    }

    fn update(&mut self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<()> {
        trace!(collection, id, "pg update");
        let patch = Value::Object(fields);
        let changed = self
            .client
            .borrow_mut()
            .execute(
                "UPDATE taskboard_documents SET body = body || $4::jsonb
                 WHERE workspace = $1 AND collection = $2 AND doc_id = $3",
                &[&self.workspace, &collection, &id, &patch],
            )
            .map_err(storage_debug)?;
        if changed == 0 {
            return Err(Error::Storage(format!("no document {collection}/{id} to update")));
        }
        Ok(())
    }

    fn delete(&mut self, collection: &str, id: &str) -> Result<()> {
        self.client
            .borrow_mut()
            .execute(
                "DELETE FROM taskboard_documents
                 WHERE workspace = $1 AND collection = $2 AND doc_id = $3",
                &[&self.workspace, &collection, &id],
            )
            .map_err(storage_debug)?;
        Ok(())
    }
}
