//! nestview: hierarchical local view for 3D scenes
//!
//! **Drill into nested selections and walk back out, one key at a time.**
//!
//! Local view (isolation mode) shows only a chosen subset of a scene. nestview
//! turns it into a stack: isolating again on a sub-selection goes one level
//! deeper, and re-triggering with the level's own selection, or with nothing
//! selected, goes back up one level and restores what was selected there.
//!
//! # Architecture
//!
//! ## The controller
//!
//! [`plugins::local_view::LocalViewController`] owns the runtime stack and its
//! persisted mirror ([`plugins::view_stack::ViewStacks`]). Each invocation is
//! classified as enter, descend, ascend or exit, the stacks are updated, and
//! a list of host commands is produced.
//!
//! ## The host
//!
//! Everything outside the stack (selection, visibility, the isolation toggle,
//! the document slot, the overlay) is reached through
//! [`crate::core::host::Host`]. The crate ships a SQLite-backed reference host,
//! [`plugins::scene::SceneDocument`], which the CLI drives.
//!
//! ## Reconcile
//!
//! Objects that show up while inside a level (created there, or revealed)
//! are folded into every level of the stack before descending or ascending,
//! so navigating never hides them again.
//!
//! # Examples
//!
//! ```bash
//! nestview init
//! nestview scene add Cube Sphere Cone
//! nestview select Cube Sphere
//! nestview toggle          # Local View: Level 1
//! nestview select Cube
//! nestview toggle          # Local View: Level 2
//! nestview select --none
//! nestview toggle          # back to Level 1
//! nestview status
//! ```
//!
//! # Crate Structure
//!
//! - [`core`](crate::core): store, document DB, broker, config, host contract, helpers
//! - [`plugins`]: the local-view controller, its stacks, and the scene host

pub mod core;
pub mod plugins;

use crate::core::{
    config,
    error::{self, NestviewError},
    host::{Host, Selection},
    output,
    store::{STORE_DIR, Store},
    time,
    tui::{self, BoxStyle, ItemStatus},
};
use plugins::{
    local_view::{self, LocalViewController, Transition},
    scene::{self, SceneDocument},
};

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

pub const NESTVIEW_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[clap(
    name = "nestview",
    version = env!("CARGO_PKG_VERSION"),
    about = "Hierarchical local view with selection memory"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a `.nestview` store with an empty document
    Init(InitCli),

    /// Edit the reference scene
    Scene(SceneCli),

    /// Replace the current selection
    Select(SelectCli),

    /// The local-view action: enter, descend, ascend or exit
    Toggle(FormatCli),

    /// Show stack depth, levels and overlay
    Status(FormatCli),

    /// Re-hydrate the stack from the document slot, dropping stale names
    Load(FormatCli),

    /// Print machine-readable command and storage description
    Schema,

    /// Print version
    Version,
}

#[derive(clap::Args, Debug)]
struct InitCli {
    /// Directory to initialize (defaults to current working directory).
    #[clap(short, long)]
    dir: Option<PathBuf>,
    /// Replace an existing store with a fresh one.
    #[clap(long)]
    force: bool,
}

#[derive(clap::Args, Debug)]
struct FormatCli {
    /// Output format: 'text' or 'json'.
    #[clap(long, default_value = "text")]
    format: String,
}

#[derive(clap::Args, Debug)]
struct SceneCli {
    #[clap(subcommand)]
    command: SceneCommand,
}

#[derive(Subcommand, Debug)]
enum SceneCommand {
    /// Add objects; each new object becomes the selection
    Add {
        #[clap(required = true)]
        names: Vec<String>,
    },
    /// Delete objects
    Remove {
        #[clap(required = true)]
        names: Vec<String>,
    },
    /// Hide objects (or reveal them with --reveal)
    Hide {
        #[clap(required = true)]
        names: Vec<String>,
        #[clap(long)]
        reveal: bool,
    },
    /// List objects with their flags
    List {
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// Set the area the action is invoked from
    Area { area: String },
}

#[derive(clap::Args, Debug)]
struct SelectCli {
    /// Object names to select.
    names: Vec<String>,
    /// Select visible objects whose name matches this regex.
    #[clap(long)]
    pattern: Option<String>,
    /// Select every visible object.
    #[clap(long, conflicts_with_all = ["none", "pattern"])]
    all: bool,
    /// Deselect everything.
    #[clap(long, conflicts_with_all = ["all", "pattern"])]
    none: bool,
}

fn find_project_root(start_dir: &Path) -> Result<PathBuf, NestviewError> {
    let mut current_dir = PathBuf::from(start_dir);
    loop {
        if current_dir.join(STORE_DIR).exists() {
            return Ok(current_dir);
        }
        if !current_dir.pop() {
            return Err(NestviewError::NotFound(
                "'.nestview' directory not found in current or parent directories. Run `nestview init` first.".to_string(),
            ));
        }
    }
}

fn open_workspace(
    current_dir: &Path,
) -> Result<(Store, config::NestviewConfig, SceneDocument), NestviewError> {
    let project_root = find_project_root(current_dir)?;
    let store = Store::for_project(&project_root);
    let config = config::load_config(&store)?;
    let scene = SceneDocument::open(&store)?;
    Ok((store, config, scene))
}

fn is_json(format: &str) -> Result<bool, NestviewError> {
    match format {
        "json" => Ok(true),
        "text" => Ok(false),
        other => Err(NestviewError::ValidationError(format!(
            "unknown format '{}': expected 'text' or 'json'",
            other
        ))),
    }
}

pub fn run() -> Result<(), error::NestviewError> {
    let cli = Cli::parse();
    let current_dir = std::env::current_dir()?;

    match cli.command {
        Command::Version => {
            println!("v{}", NESTVIEW_VERSION);
            Ok(())
        }
        Command::Schema => {
            let schema = serde_json::json!({
                "name": "nestview",
                "version": NESTVIEW_VERSION,
                "subsystems": [
                    local_view::schema(),
                    scene::schema(),
                    crate::core::broker::schema(),
                ]
            });
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
        Command::Init(init) => init_project(init, &current_dir),
        Command::Scene(scene_cli) => {
            let (_, _, mut scene) = open_workspace(&current_dir)?;
            run_scene_cli(&mut scene, scene_cli.command)
        }
        Command::Select(select) => {
            let (_, _, mut scene) = open_workspace(&current_dir)?;
            run_select(&mut scene, select)
        }
        Command::Toggle(fmt) => {
            let json = is_json(&fmt.format)?;
            let (store, config, mut scene) = open_workspace(&current_dir)?;
            run_toggle(&store, &config, &mut scene, json)
        }
        Command::Status(fmt) => {
            let json = is_json(&fmt.format)?;
            let (store, config, scene) = open_workspace(&current_dir)?;
            run_status(&store, &config, &scene, json)
        }
        Command::Load(fmt) => {
            let json = is_json(&fmt.format)?;
            let (store, config, mut scene) = open_workspace(&current_dir)?;
            run_load(&store, &config, &mut scene, json)
        }
    }
}

fn init_project(init: InitCli, current_dir: &Path) -> Result<(), NestviewError> {
    let target_dir = init.dir.unwrap_or_else(|| current_dir.to_path_buf());
    let target_dir = fs::canonicalize(&target_dir).map_err(NestviewError::IoError)?;
    let store = Store::for_project(&target_dir);

    if store.root.exists() {
        if !init.force {
            tui::render_box(
                "⚠  ALREADY INITIALIZED",
                "Use --force to start over",
                BoxStyle::Warning,
            );
            return Ok(());
        }
        fs::remove_dir_all(&store.root).map_err(NestviewError::IoError)?;
    }

    fs::create_dir_all(&store.root).map_err(NestviewError::IoError)?;
    config::write_config(&store, &config::NestviewConfig::default())?;
    SceneDocument::create(&store)?;

    tui::render_box("NESTVIEW READY", &target_dir.display().to_string(), BoxStyle::Success);
    tui::print_status_line("config.toml", ItemStatus::Info);
    tui::print_status_line("document.db", ItemStatus::Info);
    Ok(())
}

fn run_scene_cli(scene: &mut SceneDocument, command: SceneCommand) -> Result<(), NestviewError> {
    match command {
        SceneCommand::Add { names } => {
            for name in &names {
                scene.add_object(name)?;
                tui::print_status_line(&format!("added {}", name), ItemStatus::Selected);
            }
        }
        SceneCommand::Remove { names } => {
            for name in &names {
                scene.remove_object(name)?;
                tui::print_status_line(&format!("removed {}", name), ItemStatus::Info);
            }
        }
        SceneCommand::Hide { names, reveal } => {
            for name in &names {
                scene.set_hidden(name, !reveal)?;
                let verb = if reveal { "revealed" } else { "hid" };
                tui::print_status_line(&format!("{} {}", verb, name), ItemStatus::Info);
            }
        }
        SceneCommand::List { format } => {
            let objects = scene.objects()?;
            if is_json(&format)? {
                let out = time::command_envelope(
                    "scene.list",
                    "ok",
                    serde_json::json!({ "objects": objects }),
                );
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                let visible = scene.visible_object_ids()?;
                for object in objects {
                    let status = if object.selected && visible.contains(&object.name) {
                        ItemStatus::Selected
                    } else if visible.contains(&object.name) {
                        ItemStatus::Visible
                    } else {
                        ItemStatus::Hidden
                    };
                    tui::print_status_line(&object.name, status);
                }
            }
        }
        SceneCommand::Area { area } => {
            scene.set_area(&area)?;
            tui::print_status_line(&format!("area set to {}", area), ItemStatus::Info);
        }
    }
    Ok(())
}

fn run_select(scene: &mut SceneDocument, select: SelectCli) -> Result<(), NestviewError> {
    let names: Selection = if select.none {
        Selection::new()
    } else if select.all {
        scene.visible_object_ids()?
    } else {
        let mut names = Selection::new();
        for name in select.names {
            if !scene.object_exists(&name)? {
                return Err(NestviewError::NotFound(format!("object '{}'", name)));
            }
            names.insert(name);
        }
        if let Some(pattern) = &select.pattern {
            names.extend(scene.names_matching(pattern)?);
        }
        names
    };

    let active = names.iter().next().cloned();
    scene.set_selection(&names, active.as_deref())?;

    let selected = scene.selected_object_ids()?;
    tui::print_status_line(
        &format!("selected: {}", output::preview_names(&selected, 12, 40)),
        ItemStatus::Selected,
    );
    Ok(())
}

fn run_toggle(
    store: &Store,
    config: &config::NestviewConfig,
    scene: &mut SceneDocument,
    json: bool,
) -> Result<(), NestviewError> {
    let mut controller = LocalViewController::for_store(store, config);
    controller.load_document(&*scene)?;
    let invocation = controller.run(scene)?;

    if json {
        let status = match invocation.transition {
            Transition::Rejected => "rejected",
            _ if !invocation.warnings.is_empty() => "degraded",
            _ => "ok",
        };
        let out = time::command_envelope(
            "toggle",
            status,
            serde_json::json!({
                "transition": invocation.transition,
                "depth_before": invocation.depth_before,
                "depth": invocation.depth_after,
                "reconciled": invocation.reconciled,
                "commands": invocation.commands,
                "overlay": invocation.display,
                "warnings": invocation.warnings,
            }),
        );
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let message = match invocation.transition {
        Transition::Rejected => format!(
            "local view needs a 3D viewport (area: {}); nothing changed",
            scene.area()?
        ),
        Transition::Noop => "nothing selected; nothing to isolate".to_string(),
        Transition::Enter => "entered local view".to_string(),
        Transition::Adopt => "took over the active local view".to_string(),
        Transition::Descend => format!("descended to level {}", invocation.depth_after),
        Transition::Ascend => format!("ascended to level {}", invocation.depth_after),
        Transition::Exit => "left local view".to_string(),
    };
    let status = match invocation.transition {
        Transition::Rejected => ItemStatus::Warn,
        _ => ItemStatus::Info,
    };
    tui::print_status_line(&message, status);
    if !invocation.reconciled.is_empty() {
        tui::print_status_line(
            &format!(
                "folded into every level: {}",
                output::preview_names(&invocation.reconciled, 8, 40)
            ),
            ItemStatus::Info,
        );
    }
    for warning in &invocation.warnings {
        tui::print_status_line(warning, ItemStatus::Warn);
    }
    if config.overlay.enabled
        && let Some(display) = scene.last_overlay()
    {
        tui::render_overlay(display);
    }
    Ok(())
}

fn run_status(
    store: &Store,
    config: &config::NestviewConfig,
    scene: &SceneDocument,
    json: bool,
) -> Result<(), NestviewError> {
    let mut controller = LocalViewController::for_store(store, config);
    controller.load_document(scene)?;
    let stacks = controller.stacks();
    let display = controller.display();
    let isolation_active = scene.is_isolation_active()?;
    let selected = scene.selected_object_ids()?;

    if json {
        let out = time::command_envelope(
            "status",
            "ok",
            serde_json::json!({
                "depth": stacks.depth(),
                "isolation_active": isolation_active,
                "levels": stacks.levels(),
                "selected": selected,
                "active_object": scene.active_object()?,
                "area": scene.area()?,
                "overlay": display,
            }),
        );
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    tui::print_section("Local view");
    tui::print_status_line(
        &format!(
            "isolation {} | depth {}",
            if isolation_active { "on" } else { "off" },
            stacks.depth()
        ),
        ItemStatus::Info,
    );
    if isolation_active != !stacks.is_empty() {
        tui::print_status_line(
            "view mode and stack disagree; the next toggle re-syncs them",
            ItemStatus::Warn,
        );
    }
    for (index, level) in stacks.levels().iter().enumerate() {
        tui::print_status_line(
            &format!(
                "level {}: {}",
                index + 1,
                output::preview_names(level.members(), 12, 40)
            ),
            ItemStatus::Visible,
        );
    }
    tui::print_status_line(
        &format!("selected: {}", output::preview_names(&selected, 12, 40)),
        ItemStatus::Selected,
    );
    if config.overlay.enabled {
        tui::render_overlay(&display);
    }
    Ok(())
}

fn run_load(
    store: &Store,
    config: &config::NestviewConfig,
    scene: &mut SceneDocument,
    json: bool,
) -> Result<(), NestviewError> {
    // An unreadable slot still counts as present so it gets rewritten clean.
    let (stored, slot_present) = match scene.load() {
        Ok(record) => {
            let present = record.is_some();
            (record, present)
        }
        Err(NestviewError::ValidationError(_)) => (None, true),
        Err(e) => return Err(e),
    };
    let mut controller = LocalViewController::for_store(store, config);
    let depth = controller.load_document(&*scene)?;

    let mut dropped = 0;
    if let Some(stored) = &stored {
        let before: usize = stored.levels.iter().map(|level| level.len()).sum();
        let after: usize = controller.stacks().levels().iter().map(|level| level.len()).sum();
        dropped = before.saturating_sub(after);
    }
    if slot_present {
        scene.persist(&controller.stacks().record())?;
    }

    if json {
        let out = time::command_envelope(
            "load",
            "ok",
            serde_json::json!({
                "depth": depth,
                "slot_present": slot_present,
                "dropped": dropped,
                "levels": controller.stacks().levels(),
            }),
        );
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        tui::print_status_line(
            &format!("loaded depth {} ({} stale names dropped)", depth, dropped),
            ItemStatus::Info,
        );
    }
    Ok(())
}
