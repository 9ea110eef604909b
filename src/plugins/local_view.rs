//! Hierarchical local view.
//!
//! One user action drives everything: with nothing isolated it enters local
//! view on the selection; inside local view a different selection goes one
//! level deeper, and re-triggering with the level's own selection (or with
//! nothing selected) walks back up one level, leaving local view entirely
//! from the outermost level.
//!
//! [`LocalViewController::invoke`] is the pure decision step. It mutates the
//! stacks and returns the host commands to issue. [`LocalViewController::run`]
//! wraps it with a [`Host`]: it reads the host state, persists the stack,
//! applies the commands and renders the overlay.

use crate::core::config::NestviewConfig;
use crate::core::error::NestviewError;
use crate::core::host::{Host, ObjectId, Selection};
use crate::core::schemas;
use crate::core::store::Store;
use crate::core::time;
use crate::plugins::view_stack::{self, DisplayState, Level, ViewStacks};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_LABEL: &str = "Local View";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Invoked outside a 3D viewport; nothing happened.
    Rejected,
    /// Not isolated and nothing selected.
    Noop,
    Enter,
    Descend,
    Ascend,
    Exit,
    /// Isolated with no recorded level: the selection becomes the only level.
    Adopt,
}

impl Transition {
    pub fn mutates(self) -> bool {
        !matches!(self, Transition::Rejected | Transition::Noop)
    }

    pub fn op_name(self) -> &'static str {
        match self {
            Transition::Rejected => "local_view.rejected",
            Transition::Noop => "local_view.noop",
            Transition::Enter => "local_view.enter",
            Transition::Descend => "local_view.descend",
            Transition::Ascend => "local_view.ascend",
            Transition::Exit => "local_view.exit",
            Transition::Adopt => "local_view.adopt",
        }
    }
}

/// A command for the host, applied in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostCommand {
    ActivateIsolation,
    DeactivateIsolation,
    SetSelection {
        names: Selection,
        active: Option<ObjectId>,
    },
    ClearSelection,
}

impl HostCommand {
    fn select(level: &Level) -> Self {
        HostCommand::SetSelection {
            names: level.members().clone(),
            active: level.first().map(str::to_string),
        }
    }
}

/// Report of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub transition: Transition,
    pub depth_before: usize,
    pub depth_after: usize,
    pub selection: Selection,
    /// Names folded into every level by this invocation.
    pub reconciled: Selection,
    pub commands: Vec<HostCommand>,
    pub display: DisplayState,
    pub warnings: Vec<String>,
}

/// One line of `view.events.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub ts: String,
    pub event_id: String,
    pub op: String,
    pub transition: Transition,
    pub depth_before: usize,
    pub depth_after: usize,
    pub selection: Selection,
    pub reconciled: Selection,
    pub commands: Vec<HostCommand>,
    pub warnings: Vec<String>,
}

pub struct LocalViewController {
    stacks: ViewStacks,
    label: String,
    events_path: Option<PathBuf>,
}

impl Default for LocalViewController {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalViewController {
    pub fn new() -> Self {
        Self::with_stacks(ViewStacks::new())
    }

    pub fn with_stacks(stacks: ViewStacks) -> Self {
        Self {
            stacks,
            label: DEFAULT_LABEL.to_string(),
            events_path: None,
        }
    }

    /// Controller configured for a store: overlay label and event log.
    pub fn for_store(store: &Store, config: &NestviewConfig) -> Self {
        let mut controller = Self::new();
        controller.label = config.overlay.label.clone();
        if config.events.enabled {
            controller.events_path = Some(store.root.join(schemas::VIEW_EVENTS_NAME));
        }
        controller
    }

    pub fn stacks(&self) -> &ViewStacks {
        &self.stacks
    }

    pub fn depth(&self) -> usize {
        self.stacks.depth()
    }

    pub fn display(&self) -> DisplayState {
        self.stacks.display(&self.label)
    }

    /// Decide what the action means for this selection and view mode, update
    /// the stacks, and return the commands the host has to run.
    pub fn invoke(
        &mut self,
        selection: &Selection,
        isolation_active: bool,
        visible: &Selection,
    ) -> Invocation {
        let depth_before = self.stacks.depth();
        let mut commands = Vec::new();
        let mut reconciled = Selection::new();

        let transition = if !isolation_active {
            if selection.is_empty() {
                Transition::Noop
            } else {
                self.stacks.clear();
                self.stacks.push(Level::new(selection.clone()));
                commands.push(HostCommand::ActivateIsolation);
                Transition::Enter
            }
        } else {
            let wants_up = self
                .stacks
                .top()
                .map(|top| selection.is_empty() || top.members() == selection);
            match wants_up {
                None if selection.is_empty() => {
                    commands.push(HostCommand::DeactivateIsolation);
                    Transition::Exit
                }
                None => {
                    self.stacks.push(Level::new(selection.clone()));
                    commands.push(HostCommand::DeactivateIsolation);
                    commands.push(HostCommand::ActivateIsolation);
                    Transition::Adopt
                }
                Some(true) if depth_before > 1 => {
                    reconciled = self.stacks.reconcile(visible);
                    let pre_selection = selection.clone();

                    self.stacks.pop();
                    commands.push(HostCommand::DeactivateIsolation);
                    if let Some(parent) = self.stacks.top() {
                        commands.push(HostCommand::select(parent));
                    }
                    commands.push(HostCommand::ActivateIsolation);
                    if pre_selection.is_empty() {
                        commands.push(HostCommand::ClearSelection);
                    } else {
                        commands.push(HostCommand::select(&Level::new(pre_selection)));
                    }
                    Transition::Ascend
                }
                Some(true) => {
                    self.stacks.clear();
                    commands.push(HostCommand::DeactivateIsolation);
                    Transition::Exit
                }
                Some(false) => {
                    reconciled = self.stacks.reconcile(visible);
                    self.stacks.push(Level::new(selection.clone()));
                    commands.push(HostCommand::DeactivateIsolation);
                    commands.push(HostCommand::ActivateIsolation);
                    Transition::Descend
                }
            }
        };

        Invocation {
            transition,
            depth_before,
            depth_after: self.stacks.depth(),
            selection: selection.clone(),
            reconciled,
            commands,
            display: self.display(),
            warnings: Vec::new(),
        }
    }

    /// Run the action against a host.
    pub fn run<H: Host>(&mut self, host: &mut H) -> Result<Invocation, NestviewError> {
        if !host.has_viewport_context() {
            let depth = self.stacks.depth();
            let invocation = Invocation {
                transition: Transition::Rejected,
                depth_before: depth,
                depth_after: depth,
                selection: Selection::new(),
                reconciled: Selection::new(),
                commands: Vec::new(),
                display: self.display(),
                warnings: Vec::new(),
            };
            self.record_event(&invocation)?;
            return Ok(invocation);
        }

        let selection = host.selected_object_ids()?;
        let isolation_active = host.is_isolation_active()?;
        let visible = if isolation_active {
            // Only descend and ascend reconcile, and both need isolation.
            let visible = host.visible_object_ids()?;
            if host.selected_object_ids()? != selection {
                host.set_selection(&selection, selection.iter().next().map(String::as_str))?;
            }
            visible
        } else {
            Selection::new()
        };

        let mut invocation = self.invoke(&selection, isolation_active, &visible);
        if invocation.transition.mutates() {
            host.persist(&self.stacks.record())?;
        }
        for command in &invocation.commands {
            apply_command(host, command, &mut invocation.warnings)?;
        }
        host.render_overlay(&invocation.display);
        self.record_event(&invocation)?;
        Ok(invocation)
    }

    /// Re-hydrate both stacks from the host's document slot.
    /// Returns the resulting depth.
    pub fn load_document<H: Host>(&mut self, host: &H) -> Result<usize, NestviewError> {
        let record = match host.load() {
            Ok(record) => record,
            Err(NestviewError::ValidationError(msg)) => {
                eprintln!("Warning: ignoring stored view stack: {}", msg);
                None
            }
            Err(e) => return Err(e),
        };

        let mut live: FxHashSet<String> = FxHashSet::default();
        if let Some(record) = &record {
            for name in record.levels.iter().flat_map(|level| level.members()) {
                if !live.contains(name.as_str()) && host.object_exists(name)? {
                    live.insert(name.clone());
                }
            }
        }

        self.stacks = view_stack::on_document_load(record.as_ref(), |name| live.contains(name));
        Ok(self.stacks.depth())
    }

    fn record_event(&self, invocation: &Invocation) -> Result<(), NestviewError> {
        let Some(path) = &self.events_path else {
            return Ok(());
        };
        let event = TransitionEvent {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            op: invocation.transition.op_name().to_string(),
            transition: invocation.transition,
            depth_before: invocation.depth_before,
            depth_after: invocation.depth_after,
            selection: invocation.selection.clone(),
            reconciled: invocation.reconciled.clone(),
            commands: invocation.commands.clone(),
            warnings: invocation.warnings.clone(),
        };
        time::append_jsonl(path, &event)
    }
}

fn apply_command<H: Host>(
    host: &mut H,
    command: &HostCommand,
    warnings: &mut Vec<String>,
) -> Result<(), NestviewError> {
    match command {
        HostCommand::ActivateIsolation | HostCommand::DeactivateIsolation => {
            // The stacks are already updated; a failed flip is left for the
            // next action to correct.
            if let Err(e) = host.toggle_isolation() {
                let msg = format!("{} skipped: {}", command_label(command), e);
                eprintln!("Warning: {}", msg);
                warnings.push(msg);
            }
        }
        HostCommand::SetSelection { names, active } => {
            let mut live = Selection::new();
            for name in names {
                if host.object_exists(name)? {
                    live.insert(name.clone());
                }
            }
            let active = active
                .as_deref()
                .filter(|name| live.contains(*name))
                .or_else(|| live.iter().next().map(String::as_str));
            host.set_selection(&live, active)?;
        }
        HostCommand::ClearSelection => {
            host.set_selection(&Selection::new(), None)?;
        }
    }
    Ok(())
}

fn command_label(command: &HostCommand) -> &'static str {
    match command {
        HostCommand::ActivateIsolation => "activate isolation",
        HostCommand::DeactivateIsolation => "deactivate isolation",
        HostCommand::SetSelection { .. } => "set selection",
        HostCommand::ClearSelection => "clear selection",
    }
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "local_view",
        "version": "0.1.0",
        "description": "Hierarchical local-view navigation with selection memory",
        "commands": [
            { "name": "toggle", "description": "Enter, descend, ascend or exit local view from the current selection" },
            { "name": "status", "description": "Show stack depth, levels and overlay" },
            { "name": "load", "description": "Re-hydrate the stack from the document slot" }
        ],
        "storage": [schemas::VIEW_EVENTS_NAME, schemas::LOCAL_VIEW_STACK_SLOT]
    })
}
