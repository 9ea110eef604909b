use crate::core::broker::DbBroker;
use crate::core::error;
use crate::core::schemas;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

pub fn db_connect(db_path: &str) -> Result<Connection, error::NestviewError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(error::NestviewError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(error::NestviewError::RusqliteError)?;
    Ok(conn)
}

pub fn document_db_path(root: &Path) -> PathBuf {
    root.join(schemas::DOCUMENT_DB_NAME)
}

pub fn initialize_document_db(root: &Path) -> Result<(), error::NestviewError> {
    fs::create_dir_all(root).map_err(|e| {
        error::NestviewError::DocumentInitializationError(format!(
            "cannot create {}: {}",
            root.display(),
            e
        ))
    })?;

    let db_path = document_db_path(root);
    let broker = DbBroker::new(root);
    broker.with_conn(&db_path, "nestview", "document.init", |conn| {
        conn.execute(schemas::DOCUMENT_DB_SCHEMA_OBJECTS, [])?;
        conn.execute(schemas::DOCUMENT_DB_SCHEMA_VIEW_STATE, [])?;
        conn.execute(schemas::DOCUMENT_DB_SCHEMA_SLOTS, [])?;
        conn.execute(schemas::DOCUMENT_DB_SCHEMA_INDEX, [])?;
        conn.execute(
            "INSERT OR IGNORE INTO view_state(key, value) VALUES(?1, ?2)",
            [schemas::VIEW_KEY_AREA, schemas::AREA_VIEW_3D],
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO view_state(key, value) VALUES(?1, '0')",
            [schemas::VIEW_KEY_ISOLATION],
        )?;
        Ok(())
    })
}
