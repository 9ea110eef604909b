//! The local-view stack state container.
//!
//! Holds the runtime stack and its persisted mirror. Both are only mutated
//! together, so they compare equal after every public operation. The
//! persisted side is what gets serialized into the document slot.

use crate::core::error::NestviewError;
use crate::core::host::Selection;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Current layout of the stored stack record.
pub const STACK_SCHEMA_VERSION: u32 = 1;

/// Objects that were selected when one isolation level was entered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Level(Selection);

impl Level {
    pub fn new(members: Selection) -> Self {
        Self(members)
    }

    pub fn members(&self) -> &Selection {
        &self.0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    /// First member in iteration order; used as the active object.
    pub fn first(&self) -> Option<&str> {
        self.0.iter().next().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn extend(&mut self, names: &Selection) {
        self.0.extend(names.iter().cloned());
    }

    fn retain_resolved(&self, resolves: &impl Fn(&str) -> bool) -> Level {
        Level(
            self.0
                .iter()
                .filter(|name| resolves(name.as_str()))
                .cloned()
                .collect(),
        )
    }
}

impl From<Selection> for Level {
    fn from(members: Selection) -> Self {
        Self(members)
    }
}

/// Serialized form of the stack stored in the document slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistedStack {
    pub schema_version: u32,
    pub levels: Vec<Level>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredStack {
    Versioned {
        schema_version: u32,
        levels: Vec<Level>,
    },
    // Records written before the version field existed.
    Legacy(Vec<Level>),
}

impl PersistedStack {
    pub fn new(levels: Vec<Level>) -> Self {
        Self {
            schema_version: STACK_SCHEMA_VERSION,
            levels,
        }
    }

    pub fn to_json(&self) -> Result<String, NestviewError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a stored record. Unversioned legacy records are upgraded; an
    /// unreadable record or one from a newer schema is rejected with
    /// `ValidationError`.
    pub fn from_json(payload: &str) -> Result<Self, NestviewError> {
        let stored = serde_json::from_str::<StoredStack>(payload).map_err(|e| {
            NestviewError::ValidationError(format!("unreadable stack record: {}", e))
        })?;
        match stored {
            StoredStack::Legacy(levels) => Ok(Self::new(levels)),
            StoredStack::Versioned {
                schema_version,
                levels,
            } => {
                if schema_version > STACK_SCHEMA_VERSION {
                    return Err(NestviewError::ValidationError(format!(
                        "stack record schema_version {} is newer than supported {}",
                        schema_version, STACK_SCHEMA_VERSION
                    )));
                }
                Ok(Self::new(levels))
            }
        }
    }
}

/// Overlay text and visibility, derived from stack depth alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayState {
    pub text: String,
    pub visible: bool,
}

impl DisplayState {
    pub fn for_depth(depth: usize, label: &str) -> Self {
        if depth == 0 {
            Self::default()
        } else {
            Self {
                text: format!("{}: Level {}", label, depth),
                visible: true,
            }
        }
    }
}

/// Runtime stack plus its persisted mirror.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewStacks {
    runtime: Vec<Level>,
    persisted: Vec<Level>,
}

impl ViewStacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.runtime.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runtime.is_empty()
    }

    pub fn top(&self) -> Option<&Level> {
        self.runtime.last()
    }

    /// Runtime levels, outermost first.
    pub fn levels(&self) -> &[Level] {
        &self.runtime
    }

    pub fn persisted_levels(&self) -> &[Level] {
        &self.persisted
    }

    pub fn is_mirrored(&self) -> bool {
        self.runtime == self.persisted
    }

    pub fn clear(&mut self) {
        self.runtime.clear();
        self.persisted.clear();
    }

    pub fn push(&mut self, level: Level) {
        self.persisted.push(level.clone());
        self.runtime.push(level);
    }

    pub fn pop(&mut self) -> Option<Level> {
        self.persisted.pop();
        self.runtime.pop()
    }

    /// Union of every level's members.
    pub fn known(&self) -> FxHashSet<&str> {
        self.runtime
            .iter()
            .flat_map(|level| level.members().iter().map(String::as_str))
            .collect()
    }

    /// Fold objects visible now but unknown to every level into all levels.
    /// Membership only ever grows. Returns the newly folded names.
    pub fn reconcile(&mut self, visible: &Selection) -> Selection {
        let newly: Selection = {
            let known = self.known();
            visible
                .iter()
                .filter(|name| !known.contains(name.as_str()))
                .cloned()
                .collect()
        };
        if !newly.is_empty() {
            for level in self.runtime.iter_mut().chain(self.persisted.iter_mut()) {
                level.extend(&newly);
            }
        }
        newly
    }

    pub fn record(&self) -> PersistedStack {
        PersistedStack::new(self.persisted.clone())
    }

    pub fn display(&self, label: &str) -> DisplayState {
        DisplayState::for_depth(self.depth(), label)
    }
}

/// Rebuild both stacks from a stored record, dropping names that no longer
/// resolve to live objects. Levels that filter down to nothing are kept so
/// depth survives a reload.
pub fn on_document_load(
    persisted: Option<&PersistedStack>,
    resolves: impl Fn(&str) -> bool,
) -> ViewStacks {
    let mut stacks = ViewStacks::new();
    if let Some(record) = persisted {
        for level in &record.levels {
            stacks.push(level.retain_resolved(&resolves));
        }
    }
    stacks
}
