//! Host collaborator contract.
//!
//! The local-view controller never talks to a 3D tool directly. Everything it
//! needs from the outside world (selection, visibility, the isolation toggle,
//! the document persistence slot and the overlay) goes through [`Host`].
//!
//! All calls happen on one thread inside a single invocation; a host must not
//! interleave other input between them.

use crate::core::error::NestviewError;
use crate::plugins::view_stack::{DisplayState, PersistedStack};
use std::collections::BTreeSet;

/// Object identifier: the object's name, unique and stable within a document.
pub type ObjectId = String;

/// An unordered set of object names with deterministic iteration order.
pub type Selection = BTreeSet<ObjectId>;

pub trait Host {
    /// True when the action is invoked from a 3D viewport.
    fn has_viewport_context(&self) -> bool;

    fn selected_object_ids(&self) -> Result<Selection, NestviewError>;

    /// Every object visible in the current view state (the local-view set
    /// while isolated). Hosts that enumerate by sweeping the selection may
    /// leave it disturbed; the controller restores it afterwards.
    fn visible_object_ids(&self) -> Result<Selection, NestviewError>;

    fn is_isolation_active(&self) -> Result<bool, NestviewError>;

    fn object_exists(&self, id: &str) -> Result<bool, NestviewError>;

    /// Deselect everything, select `names`, and make `active` the focused object.
    fn set_selection(
        &mut self,
        names: &Selection,
        active: Option<&str>,
    ) -> Result<(), NestviewError>;

    /// Flip isolation for the current viewport. Failure is recoverable.
    fn toggle_isolation(&mut self) -> Result<(), NestviewError>;

    fn persist(&mut self, record: &PersistedStack) -> Result<(), NestviewError>;

    /// `None` when the document has never stored a stack.
    fn load(&self) -> Result<Option<PersistedStack>, NestviewError>;

    fn render_overlay(&mut self, display: &DisplayState);
}
