//! Centralized database schema definitions for the nestview document.
//!
//! A document is a single SQLite file ("document.db") with three tables:
//! 1. objects: scene objects with their visibility, selection and local-view flags.
//! 2. view_state: key/value view settings (isolation flag, active object, area).
//! 3. document_slots: named, document-scoped persistence slots.

pub const DOCUMENT_DB_NAME: &str = "document.db";

pub const DOCUMENT_DB_SCHEMA_OBJECTS: &str = "
    CREATE TABLE IF NOT EXISTS objects (
        name TEXT PRIMARY KEY,
        hidden INTEGER NOT NULL DEFAULT 0,
        selected INTEGER NOT NULL DEFAULT 0,
        local_view INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )
";

pub const DOCUMENT_DB_SCHEMA_VIEW_STATE: &str = "
    CREATE TABLE IF NOT EXISTS view_state (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
";

pub const DOCUMENT_DB_SCHEMA_SLOTS: &str = "
    CREATE TABLE IF NOT EXISTS document_slots (
        slot TEXT PRIMARY KEY,
        payload TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
";

pub const DOCUMENT_DB_SCHEMA_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_objects_local_view ON objects(local_view)";

// view_state keys
pub const VIEW_KEY_ISOLATION: &str = "isolation_active";
pub const VIEW_KEY_ACTIVE_OBJECT: &str = "active_object";
pub const VIEW_KEY_AREA: &str = "area";

/// Area type the view stack operates in.
pub const AREA_VIEW_3D: &str = "VIEW_3D";

/// Slot holding the serialized local-view stack.
pub const LOCAL_VIEW_STACK_SLOT: &str = "local_view_stack";

/// Event log written by the document broker.
pub const BROKER_EVENTS_NAME: &str = "broker.events.jsonl";

/// Event log written by the local-view controller.
pub const VIEW_EVENTS_NAME: &str = "view.events.jsonl";
