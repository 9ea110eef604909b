use nestview::core::config::NestviewConfig;
use nestview::core::error::NestviewError;
use nestview::core::host::{Host, Selection};
use nestview::core::schemas;
use nestview::core::store::Store;
use nestview::plugins::local_view::{HostCommand, LocalViewController, Transition, TransitionEvent};
use nestview::plugins::view_stack::{DisplayState, Level, PersistedStack};
use std::cell::RefCell;
use std::fs;
use tempfile::tempdir;

fn sel(names: &[&str]) -> Selection {
    names.iter().map(|n| n.to_string()).collect()
}

/// In-memory host with the same local-view semantics as a 3D tool.
struct FakeHost {
    objects: Selection,
    selected: RefCell<Selection>,
    active: Option<String>,
    isolated: bool,
    local: Selection,
    viewport: bool,
    fail_next_toggles: usize,
    toggles: usize,
    slot: Option<String>,
    persist_calls: usize,
    overlay: Option<DisplayState>,
    sweep_selects_all: bool,
}

impl FakeHost {
    fn with_objects(names: &[&str]) -> Self {
        Self {
            objects: sel(names),
            selected: RefCell::new(Selection::new()),
            active: None,
            isolated: false,
            local: Selection::new(),
            viewport: true,
            fail_next_toggles: 0,
            toggles: 0,
            slot: None,
            persist_calls: 0,
            overlay: None,
            sweep_selects_all: false,
        }
    }

    fn select(&mut self, names: &[&str]) {
        *self.selected.borrow_mut() = sel(names);
    }

    fn visible(&self) -> Selection {
        if self.isolated {
            self.local.intersection(&self.objects).cloned().collect()
        } else {
            self.objects.clone()
        }
    }

    fn slot_record(&self) -> PersistedStack {
        PersistedStack::from_json(self.slot.as_deref().expect("slot written")).unwrap()
    }

    /// An object created while inside local view joins it.
    fn create(&mut self, name: &str) {
        self.objects.insert(name.to_string());
        if self.isolated {
            self.local.insert(name.to_string());
        }
    }
}

impl Host for FakeHost {
    fn has_viewport_context(&self) -> bool {
        self.viewport
    }

    fn selected_object_ids(&self) -> Result<Selection, NestviewError> {
        let visible = self.visible();
        Ok(self
            .selected
            .borrow()
            .intersection(&visible)
            .cloned()
            .collect())
    }

    fn visible_object_ids(&self) -> Result<Selection, NestviewError> {
        let visible = self.visible();
        if self.sweep_selects_all {
            *self.selected.borrow_mut() = visible.clone();
        }
        Ok(visible)
    }

    fn is_isolation_active(&self) -> Result<bool, NestviewError> {
        Ok(self.isolated)
    }

    fn object_exists(&self, id: &str) -> Result<bool, NestviewError> {
        Ok(self.objects.contains(id))
    }

    fn set_selection(
        &mut self,
        names: &Selection,
        active: Option<&str>,
    ) -> Result<(), NestviewError> {
        *self.selected.borrow_mut() = names.clone();
        self.active = active.map(str::to_string);
        Ok(())
    }

    fn toggle_isolation(&mut self) -> Result<(), NestviewError> {
        self.toggles += 1;
        if self.fail_next_toggles > 0 {
            self.fail_next_toggles -= 1;
            return Err(NestviewError::ToggleFailed("no region".to_string()));
        }
        if self.isolated {
            self.isolated = false;
            self.local.clear();
        } else {
            let selected = self.selected_object_ids()?;
            if selected.is_empty() {
                return Err(NestviewError::ToggleFailed("nothing selected".to_string()));
            }
            self.local = selected;
            self.isolated = true;
        }
        Ok(())
    }

    fn persist(&mut self, record: &PersistedStack) -> Result<(), NestviewError> {
        self.persist_calls += 1;
        self.slot = Some(record.to_json()?);
        Ok(())
    }

    fn load(&self) -> Result<Option<PersistedStack>, NestviewError> {
        self.slot
            .as_deref()
            .map(PersistedStack::from_json)
            .transpose()
    }

    fn render_overlay(&mut self, display: &DisplayState) {
        self.overlay = Some(display.clone());
    }
}

#[test]
fn descend_then_ascend_with_empty_selection_deselects() {
    let mut host = FakeHost::with_objects(&["Cube", "Sphere"]);
    let mut controller = LocalViewController::new();

    host.select(&["Cube", "Sphere"]);
    let inv = controller.run(&mut host).unwrap();
    assert_eq!(inv.transition, Transition::Enter);
    assert_eq!(controller.depth(), 1);
    assert!(host.isolated);

    host.select(&["Cube"]);
    let inv = controller.run(&mut host).unwrap();
    assert_eq!(inv.transition, Transition::Descend);
    assert_eq!(controller.depth(), 2);
    assert_eq!(host.local, sel(&["Cube"]));

    host.select(&[]);
    let inv = controller.run(&mut host).unwrap();
    assert_eq!(inv.transition, Transition::Ascend);
    assert_eq!(controller.depth(), 1);
    assert!(host.isolated);
    assert_eq!(host.local, sel(&["Cube", "Sphere"]));
    assert!(host.selected_object_ids().unwrap().is_empty());
    assert_eq!(
        host.overlay,
        Some(DisplayState {
            text: "Local View: Level 1".to_string(),
            visible: true,
        })
    );
}

#[test]
fn ascend_restores_pre_ascend_selection() {
    let mut host = FakeHost::with_objects(&["Cube", "Sphere", "Cone"]);
    let mut controller = LocalViewController::new();

    host.select(&["Cube", "Sphere", "Cone"]);
    controller.run(&mut host).unwrap();
    host.select(&["Cube", "Cone"]);
    controller.run(&mut host).unwrap();

    // Same selection as the level: go up and keep it selected.
    let inv = controller.run(&mut host).unwrap();
    assert_eq!(inv.transition, Transition::Ascend);
    assert_eq!(host.local, sel(&["Cone", "Cube", "Sphere"]));
    assert_eq!(host.selected_object_ids().unwrap(), sel(&["Cone", "Cube"]));
    assert_eq!(host.active.as_deref(), Some("Cone"));
}

#[test]
fn exit_clears_stacks_and_toggles_once() {
    let mut host = FakeHost::with_objects(&["Cube", "Sphere"]);
    let mut controller = LocalViewController::new();
    host.select(&["Cube", "Sphere"]);
    controller.run(&mut host).unwrap();
    let toggles_before = host.toggles;

    let inv = controller.run(&mut host).unwrap();
    assert_eq!(inv.transition, Transition::Exit);
    assert_eq!(inv.commands, vec![HostCommand::DeactivateIsolation]);
    assert_eq!(host.toggles - toggles_before, 1);
    assert!(!host.isolated);
    assert!(controller.stacks().is_empty());
    assert!(host.slot_record().levels.is_empty());
    assert_eq!(host.overlay, Some(DisplayState::default()));
}

#[test]
fn empty_selection_outside_local_view_does_nothing() {
    let mut host = FakeHost::with_objects(&["Cube"]);
    let mut controller = LocalViewController::new();

    let inv = controller.run(&mut host).unwrap();
    assert_eq!(inv.transition, Transition::Noop);
    assert!(inv.commands.is_empty());
    assert_eq!(host.toggles, 0);
    assert_eq!(host.persist_calls, 0);
    assert!(controller.stacks().is_empty());
}

#[test]
fn outside_viewport_is_rejected_without_side_effects() {
    let mut host = FakeHost::with_objects(&["Cube"]);
    let mut controller = LocalViewController::new();
    host.select(&["Cube"]);
    host.viewport = false;

    let inv = controller.run(&mut host).unwrap();
    assert_eq!(inv.transition, Transition::Rejected);
    assert_eq!(host.toggles, 0);
    assert_eq!(host.persist_calls, 0);
    assert!(host.overlay.is_none());
    assert!(controller.stacks().is_empty());
}

#[test]
fn failed_toggle_is_a_warning_and_keeps_the_stack() {
    let mut host = FakeHost::with_objects(&["Cube"]);
    let mut controller = LocalViewController::new();
    host.select(&["Cube"]);
    host.fail_next_toggles = 1;

    let inv = controller.run(&mut host).unwrap();
    assert_eq!(inv.transition, Transition::Enter);
    assert_eq!(inv.warnings.len(), 1);
    assert!(inv.warnings[0].contains("activate isolation"));
    // The logical stack moved on even though the view did not.
    assert_eq!(controller.depth(), 1);
    assert!(!host.isolated);
    assert_eq!(host.slot_record().levels.len(), 1);
}

#[test]
fn every_mutation_is_persisted_and_mirrored() {
    let mut host = FakeHost::with_objects(&["A", "B", "C"]);
    let mut controller = LocalViewController::new();
    let steps: [&[&str]; 5] = [&["A", "B", "C"], &["A", "B"], &["A"], &[], &[]];

    for (i, step) in steps.iter().enumerate() {
        host.select(step);
        controller.run(&mut host).unwrap();
        assert_eq!(host.persist_calls, i + 1);
        assert!(controller.stacks().is_mirrored());
        assert_eq!(
            host.slot_record().levels,
            controller.stacks().levels().to_vec()
        );
    }
    assert_eq!(controller.depth(), 1);
}

#[test]
fn objects_created_inside_a_level_stay_visible_after_ascend() {
    let mut host = FakeHost::with_objects(&["Cube", "Sphere"]);
    let mut controller = LocalViewController::new();
    host.select(&["Cube", "Sphere"]);
    controller.run(&mut host).unwrap();
    host.select(&["Cube"]);
    controller.run(&mut host).unwrap();

    host.create("Torus");
    host.select(&[]);
    let inv = controller.run(&mut host).unwrap();
    assert_eq!(inv.transition, Transition::Ascend);
    assert_eq!(inv.reconciled, sel(&["Torus"]));
    assert!(host.local.contains("Torus"));
    assert!(controller.stacks().levels()[0].contains("Torus"));
}

#[test]
fn reconciled_names_reach_every_open_level() {
    let mut host = FakeHost::with_objects(&["A", "B", "C"]);
    let mut controller = LocalViewController::new();
    host.select(&["A", "B", "C"]);
    controller.run(&mut host).unwrap();

    host.create("New1");
    host.select(&["A", "B"]);
    controller.run(&mut host).unwrap();
    host.create("New2");
    host.select(&["A"]);
    controller.run(&mut host).unwrap();
    host.select(&[]);
    controller.run(&mut host).unwrap();

    // New1 was folded in before level 2 existed; New2 landed in both.
    let levels = controller.stacks().levels();
    assert_eq!(levels.len(), 2);
    assert!(levels[0].contains("New1"));
    assert!(!levels[1].contains("New1"));
    for level in levels {
        assert!(level.contains("New2"));
    }
    assert!(levels[0].contains("C"));
}

#[test]
fn ascend_skips_objects_deleted_inside_the_level() {
    let mut host = FakeHost::with_objects(&["Cube", "Sphere"]);
    let mut controller = LocalViewController::new();
    host.select(&["Cube", "Sphere"]);
    controller.run(&mut host).unwrap();
    host.select(&["Cube"]);
    controller.run(&mut host).unwrap();

    host.objects.remove("Sphere");
    host.select(&[]);
    let inv = controller.run(&mut host).unwrap();
    assert_eq!(inv.transition, Transition::Ascend);
    assert!(inv.warnings.is_empty());
    assert_eq!(host.local, sel(&["Cube"]));
}

#[test]
fn selection_disturbed_by_visibility_sweep_is_restored() {
    let mut host = FakeHost::with_objects(&["Cube", "Sphere"]);
    let mut controller = LocalViewController::new();
    host.select(&["Cube", "Sphere"]);
    controller.run(&mut host).unwrap();

    host.sweep_selects_all = true;
    host.select(&["Cube"]);
    let inv = controller.run(&mut host).unwrap();
    assert_eq!(inv.transition, Transition::Descend);
    assert_eq!(controller.stacks().top().unwrap().members(), &sel(&["Cube"]));
    assert_eq!(host.selected_object_ids().unwrap(), sel(&["Cube"]));
}

#[test]
fn load_document_drops_stale_names() {
    let mut host = FakeHost::with_objects(&["Cube"]);
    host.slot = Some(
        PersistedStack::new(vec![
            Level::new(sel(&["Cube", "Deleted"])),
            Level::new(sel(&["Deleted"])),
        ])
        .to_json()
        .unwrap(),
    );

    let mut controller = LocalViewController::new();
    assert_eq!(controller.load_document(&host).unwrap(), 2);
    assert_eq!(controller.stacks().levels()[0].members(), &sel(&["Cube"]));
    assert!(controller.stacks().levels()[1].is_empty());
    assert!(controller.stacks().is_mirrored());

    let mut again = LocalViewController::new();
    host.slot = Some(controller.stacks().record().to_json().unwrap());
    again.load_document(&host).unwrap();
    assert_eq!(again.stacks(), controller.stacks());
}

#[test]
fn load_document_ignores_newer_records_and_legacy_loads() {
    let mut host = FakeHost::with_objects(&["Cube"]);
    host.slot = Some(r#"{"schema_version":7,"levels":[["Cube"]]}"#.to_string());
    let mut controller = LocalViewController::new();
    assert_eq!(controller.load_document(&host).unwrap(), 0);

    host.slot = Some(r#"[["Cube"],["Cube"]]"#.to_string());
    assert_eq!(controller.load_document(&host).unwrap(), 2);
}

#[test]
fn unreadable_record_loads_as_an_empty_stack() {
    let mut host = FakeHost::with_objects(&["Cube"]);
    host.slot = Some("{not json".to_string());
    let mut controller = LocalViewController::new();
    assert_eq!(controller.load_document(&host).unwrap(), 0);

    // The next mutation overwrites the broken record.
    host.select(&["Cube"]);
    controller.run(&mut host).unwrap();
    assert_eq!(host.slot_record().levels.len(), 1);
}

#[test]
fn load_then_continue_where_the_document_left_off() {
    let mut host = FakeHost::with_objects(&["Cube", "Sphere"]);
    let mut first = LocalViewController::new();
    host.select(&["Cube", "Sphere"]);
    first.run(&mut host).unwrap();
    host.select(&["Cube"]);
    first.run(&mut host).unwrap();

    // Reopen: a new controller sees the same depth and walks up.
    let mut second = LocalViewController::new();
    assert_eq!(second.load_document(&host).unwrap(), 2);
    host.select(&[]);
    let inv = second.run(&mut host).unwrap();
    assert_eq!(inv.transition, Transition::Ascend);
    assert_eq!(second.depth(), 1);
}

#[test]
fn events_are_logged_when_enabled() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let mut host = FakeHost::with_objects(&["Cube"]);
    host.select(&["Cube"]);

    let mut controller = LocalViewController::for_store(&store, &NestviewConfig::default());
    controller.run(&mut host).unwrap();
    controller.run(&mut host).unwrap();

    let content = fs::read_to_string(tmp.path().join(schemas::VIEW_EVENTS_NAME)).unwrap();
    let events: Vec<TransitionEvent> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].op, "local_view.enter");
    assert_eq!(events[1].op, "local_view.exit");
    assert_eq!(events[1].depth_before, 1);
    assert_eq!(events[1].depth_after, 0);
}

#[test]
fn events_are_not_logged_when_disabled() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let mut config = NestviewConfig::default();
    config.events.enabled = false;
    config.overlay.label = "Isolate".to_string();
    let mut host = FakeHost::with_objects(&["Cube"]);
    host.select(&["Cube"]);

    let mut controller = LocalViewController::for_store(&store, &config);
    let inv = controller.run(&mut host).unwrap();
    assert_eq!(inv.display.text, "Isolate: Level 1");
    assert!(!tmp.path().join(schemas::VIEW_EVENTS_NAME).exists());
}
