//! Reference scene host backed by the store's `document.db`.
//!
//! Models just enough of a 3D document for the local-view controller:
//! named objects with hidden/selected/local-view flags, an active object,
//! the area the action is invoked from, and the document slot the view stack
//! is persisted into. Local view follows the usual tool semantics: switching
//! it on isolates the selected objects and fails when nothing is selected,
//! switching it off clears membership, and objects added while isolated join
//! the local view.

use crate::core::broker::DbBroker;
use crate::core::db;
use crate::core::error::NestviewError;
use crate::core::host::{Host, Selection};
use crate::core::schemas;
use crate::core::store::Store;
use crate::core::time;
use crate::plugins::view_stack::{DisplayState, PersistedStack};
use regex::Regex;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const ACTOR: &str = "scene";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    pub hidden: bool,
    pub selected: bool,
    pub local_view: bool,
}

pub struct SceneDocument {
    db_path: PathBuf,
    broker: DbBroker,
    overlay: Option<DisplayState>,
}

impl SceneDocument {
    /// Create the document if needed and open it.
    pub fn create(store: &Store) -> Result<Self, NestviewError> {
        db::initialize_document_db(&store.root)?;
        Self::open(store)
    }

    pub fn open(store: &Store) -> Result<Self, NestviewError> {
        let db_path = db::document_db_path(&store.root);
        if !db_path.exists() {
            return Err(NestviewError::NotFound(format!(
                "no document at {}. Run `nestview init` first.",
                db_path.display()
            )));
        }
        Ok(Self {
            db_path,
            broker: DbBroker::new(&store.root),
            overlay: None,
        })
    }

    fn with_conn<F, R>(&self, op: &str, f: F) -> Result<R, NestviewError>
    where
        F: FnOnce(&Connection) -> Result<R, NestviewError>,
    {
        self.broker.with_conn(&self.db_path, ACTOR, op, f)
    }

    pub fn objects(&self) -> Result<Vec<SceneObject>, NestviewError> {
        self.with_conn("scene.list", |conn| {
            let mut stmt = conn.prepare(
                "SELECT name, hidden, selected, local_view FROM objects ORDER BY name",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(SceneObject {
                    name: row.get(0)?,
                    hidden: row.get::<_, i64>(1)? != 0,
                    selected: row.get::<_, i64>(2)? != 0,
                    local_view: row.get::<_, i64>(3)? != 0,
                })
            })?;
            let mut out = Vec::new();
            for r in rows {
                out.push(r?);
            }
            Ok(out)
        })
    }

    /// Add an object. It becomes the only selected object and the active one;
    /// while isolated it also joins the local view.
    pub fn add_object(&mut self, name: &str) -> Result<(), NestviewError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(NestviewError::ValidationError(
                "object name must not be empty".to_string(),
            ));
        }
        self.with_conn("scene.add", |conn| {
            let exists: Option<String> = conn
                .query_row("SELECT name FROM objects WHERE name = ?1", [name], |row| {
                    row.get(0)
                })
                .optional()?;
            if exists.is_some() {
                return Err(NestviewError::ValidationError(format!(
                    "object '{}' already exists",
                    name
                )));
            }
            let isolated = isolation_flag(conn)?;
            conn.execute("UPDATE objects SET selected = 0", [])?;
            conn.execute(
                "INSERT INTO objects(name, hidden, selected, local_view, created_at) VALUES(?1, 0, 1, ?2, ?3)",
                params![name, isolated as i64, time::now_epoch_z()],
            )?;
            set_view_value(conn, schemas::VIEW_KEY_ACTIVE_OBJECT, Some(name))?;
            Ok(())
        })
    }

    pub fn remove_object(&mut self, name: &str) -> Result<(), NestviewError> {
        self.with_conn("scene.remove", |conn| {
            let removed = conn.execute("DELETE FROM objects WHERE name = ?1", [name])?;
            if removed == 0 {
                return Err(NestviewError::NotFound(format!("object '{}'", name)));
            }
            if view_value(conn, schemas::VIEW_KEY_ACTIVE_OBJECT)?.as_deref() == Some(name) {
                set_view_value(conn, schemas::VIEW_KEY_ACTIVE_OBJECT, None)?;
            }
            Ok(())
        })
    }

    /// Hide or reveal an object. Hidden objects are neither visible nor selected.
    pub fn set_hidden(&mut self, name: &str, hidden: bool) -> Result<(), NestviewError> {
        self.with_conn("scene.hide", |conn| {
            let changed = conn.execute(
                "UPDATE objects SET hidden = ?1, selected = CASE WHEN ?1 = 1 THEN 0 ELSE selected END WHERE name = ?2",
                params![hidden as i64, name],
            )?;
            if changed == 0 {
                return Err(NestviewError::NotFound(format!("object '{}'", name)));
            }
            Ok(())
        })
    }

    pub fn area(&self) -> Result<String, NestviewError> {
        self.with_conn("scene.area", |conn| {
            Ok(view_value(conn, schemas::VIEW_KEY_AREA)?
                .unwrap_or_else(|| schemas::AREA_VIEW_3D.to_string()))
        })
    }

    /// Switch the area the action is invoked from (e.g. `VIEW_3D`, `OUTLINER`).
    pub fn set_area(&mut self, area: &str) -> Result<(), NestviewError> {
        self.with_conn("scene.set_area", |conn| {
            set_view_value(conn, schemas::VIEW_KEY_AREA, Some(area))
        })
    }

    pub fn active_object(&self) -> Result<Option<String>, NestviewError> {
        self.with_conn("scene.active", |conn| {
            view_value(conn, schemas::VIEW_KEY_ACTIVE_OBJECT)
        })
    }

    /// Visible objects whose name matches `pattern`.
    pub fn names_matching(&self, pattern: &str) -> Result<Selection, NestviewError> {
        let re = Regex::new(pattern).map_err(|e| {
            NestviewError::ValidationError(format!("invalid pattern '{}': {}", pattern, e))
        })?;
        Ok(self
            .visible_object_ids()?
            .into_iter()
            .filter(|name| re.is_match(name))
            .collect())
    }

    /// Overlay last drawn by the controller, if any.
    pub fn last_overlay(&self) -> Option<&DisplayState> {
        self.overlay.as_ref()
    }
}

fn view_value(conn: &Connection, key: &str) -> Result<Option<String>, NestviewError> {
    Ok(conn
        .query_row(
            "SELECT value FROM view_state WHERE key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()?)
}

fn set_view_value(conn: &Connection, key: &str, value: Option<&str>) -> Result<(), NestviewError> {
    match value {
        Some(value) => conn.execute(
            "INSERT OR REPLACE INTO view_state(key, value) VALUES(?1, ?2)",
            [key, value],
        )?,
        None => conn.execute("DELETE FROM view_state WHERE key = ?1", [key])?,
    };
    Ok(())
}

fn isolation_flag(conn: &Connection) -> Result<bool, NestviewError> {
    Ok(view_value(conn, schemas::VIEW_KEY_ISOLATION)?.as_deref() == Some("1"))
}

fn visible_names(conn: &Connection, selected_only: bool) -> Result<Selection, NestviewError> {
    let isolated = isolation_flag(conn)?;
    let mut stmt = conn.prepare(
        "SELECT name FROM objects
         WHERE hidden = 0
           AND (?1 = 0 OR local_view = 1)
           AND (?2 = 0 OR selected = 1)",
    )?;
    let rows = stmt.query_map(params![isolated as i64, selected_only as i64], |row| {
        row.get::<_, String>(0)
    })?;
    let mut out = Selection::new();
    for r in rows {
        out.insert(r?);
    }
    Ok(out)
}

impl Host for SceneDocument {
    fn has_viewport_context(&self) -> bool {
        self.area()
            .map(|area| area == schemas::AREA_VIEW_3D)
            .unwrap_or(false)
    }

    fn selected_object_ids(&self) -> Result<Selection, NestviewError> {
        self.with_conn("scene.selected", |conn| visible_names(conn, true))
    }

    fn visible_object_ids(&self) -> Result<Selection, NestviewError> {
        self.with_conn("scene.visible", |conn| visible_names(conn, false))
    }

    fn is_isolation_active(&self) -> Result<bool, NestviewError> {
        self.with_conn("scene.isolation", isolation_flag)
    }

    fn object_exists(&self, id: &str) -> Result<bool, NestviewError> {
        self.with_conn("scene.exists", |conn| {
            let found: Option<i64> = conn
                .query_row("SELECT 1 FROM objects WHERE name = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(found.is_some())
        })
    }

    fn set_selection(
        &mut self,
        names: &Selection,
        active: Option<&str>,
    ) -> Result<(), NestviewError> {
        self.with_conn("scene.select", |conn| {
            let isolated = isolation_flag(conn)?;
            conn.execute("UPDATE objects SET selected = 0", [])?;
            // Only visible objects can be selected.
            for name in names {
                conn.execute(
                    "UPDATE objects SET selected = 1
                     WHERE name = ?1 AND hidden = 0 AND (?2 = 0 OR local_view = 1)",
                    params![name, isolated as i64],
                )?;
            }
            set_view_value(conn, schemas::VIEW_KEY_ACTIVE_OBJECT, active)
        })
    }

    fn toggle_isolation(&mut self) -> Result<(), NestviewError> {
        if !self.has_viewport_context() {
            return Err(NestviewError::ToggleFailed(
                "local view needs a 3D viewport".to_string(),
            ));
        }
        self.with_conn("scene.toggle_isolation", |conn| {
            if isolation_flag(conn)? {
                conn.execute("UPDATE objects SET local_view = 0", [])?;
                set_view_value(conn, schemas::VIEW_KEY_ISOLATION, Some("0"))?;
                return Ok(());
            }
            let selected = visible_names(conn, true)?;
            if selected.is_empty() {
                return Err(NestviewError::ToggleFailed(
                    "no objects selected".to_string(),
                ));
            }
            for name in &selected {
                conn.execute("UPDATE objects SET local_view = 1 WHERE name = ?1", [name])?;
            }
            set_view_value(conn, schemas::VIEW_KEY_ISOLATION, Some("1"))
        })
    }

    fn persist(&mut self, record: &PersistedStack) -> Result<(), NestviewError> {
        let payload = record.to_json()?;
        self.with_conn("scene.persist_stack", |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO document_slots(slot, payload, updated_at) VALUES(?1, ?2, ?3)",
                params![schemas::LOCAL_VIEW_STACK_SLOT, payload, time::now_epoch_z()],
            )?;
            Ok(())
        })
    }

    fn load(&self) -> Result<Option<PersistedStack>, NestviewError> {
        let payload: Option<String> = self.with_conn("scene.load_stack", |conn| {
            Ok(conn
                .query_row(
                    "SELECT payload FROM document_slots WHERE slot = ?1",
                    [schemas::LOCAL_VIEW_STACK_SLOT],
                    |row| row.get(0),
                )
                .optional()?)
        })?;
        payload
            .map(|payload| PersistedStack::from_json(&payload))
            .transpose()
    }

    fn render_overlay(&mut self, display: &DisplayState) {
        self.overlay = Some(display.clone());
    }
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "scene",
        "version": "0.1.0",
        "description": "SQLite-backed reference document for driving local view",
        "commands": [
            { "name": "add", "description": "Add objects (selected, joining local view when isolated)", "parameters": ["names"] },
            { "name": "remove", "description": "Delete objects", "parameters": ["names"] },
            { "name": "hide", "description": "Hide or reveal objects", "parameters": ["names", "reveal"] },
            { "name": "list", "description": "List objects and their flags" },
            { "name": "area", "description": "Set the area the action is invoked from", "parameters": ["area"] },
            { "name": "select", "description": "Replace the selection", "parameters": ["names", "pattern", "all", "none"] }
        ],
        "storage": [schemas::DOCUMENT_DB_NAME]
    })
}
