use crate::plugins::view_stack::DisplayState;
use std::env;

const MIN_BOX_WIDTH: usize = 30;
const MAX_BOX_WIDTH: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BoxStyle {
    Info,
    Success,
    Warning,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ItemStatus {
    Selected,
    Visible,
    Hidden,
    Info,
    Warn,
}

impl ItemStatus {
    pub fn icon(&self) -> &'static str {
        match self {
            ItemStatus::Selected => "◆",
            ItemStatus::Visible => "◇",
            ItemStatus::Hidden => "·",
            ItemStatus::Info => "▸",
            ItemStatus::Warn => "⚠",
        }
    }
}

pub fn terminal_width() -> usize {
    env::var("TERM_WIDTH")
        .ok()
        .and_then(|w| w.parse().ok())
        .or_else(|| env::var("COLUMNS").ok().and_then(|c| c.parse().ok()))
        .unwrap_or(80)
}

fn effective_width() -> usize {
    terminal_width().clamp(MIN_BOX_WIDTH, MAX_BOX_WIDTH)
}

fn indent() -> usize {
    (terminal_width().saturating_sub(effective_width())) / 2
}

pub fn box_top(width: usize) -> String {
    format!("╔{}╗", "═".repeat(width.saturating_sub(2)))
}

pub fn box_bottom(width: usize) -> String {
    format!("╚{}╝", "═".repeat(width.saturating_sub(2)))
}

pub fn box_row(left: &str, content: &str, right: &str, width: usize) -> String {
    let content_len = content.chars().count();
    let padding = width.saturating_sub(2).saturating_sub(content_len);
    let left_pad = padding / 2;
    let right_pad = padding - left_pad;
    format!(
        "{}{}{}{}{}",
        left,
        " ".repeat(left_pad),
        content,
        " ".repeat(right_pad),
        right
    )
}

pub fn render_box(title: &str, subtitle: &str, style: BoxStyle) {
    use colored::Colorize;

    let width = effective_width();
    let indent_s = " ".repeat(indent());
    let top = box_top(width);
    let title_row = box_row("║", title, "║", width);
    let subtitle_row = box_row("║", subtitle, "║", width);
    let bottom = box_bottom(width);

    let (top, title_row, subtitle_row, bottom) = match style {
        BoxStyle::Info => (
            top.bright_cyan(),
            title_row.bright_cyan().bold(),
            subtitle_row.cyan(),
            bottom.bright_cyan(),
        ),
        BoxStyle::Success => (
            top.bright_green(),
            title_row.bright_green().bold(),
            subtitle_row.green(),
            bottom.bright_green(),
        ),
        BoxStyle::Warning => (
            top.bright_yellow(),
            title_row.bright_yellow().bold(),
            subtitle_row.yellow(),
            bottom.bright_yellow(),
        ),
    };

    println!("{}{}", indent_s, top);
    println!("{}{}", indent_s, title_row);
    if !subtitle.is_empty() {
        println!("{}{}", indent_s, subtitle_row);
    }
    println!("{}{}", indent_s, bottom);
}

/// Draw the depth indicator the way a viewport would: centered, top of the
/// area. A hidden overlay draws nothing.
pub fn render_overlay(display: &DisplayState) {
    if !display.visible {
        return;
    }
    render_box(&display.text, "", BoxStyle::Info);
}

pub fn print_status_line(message: &str, status: ItemStatus) {
    use colored::Colorize;

    let icon = status.icon();
    let indent_s = " ".repeat(indent() + 2);
    let icon = match status {
        ItemStatus::Selected => icon.bright_green(),
        ItemStatus::Visible => icon.bright_white(),
        ItemStatus::Hidden => icon.bright_black(),
        ItemStatus::Info => icon.cyan(),
        ItemStatus::Warn => icon.bright_yellow(),
    };
    println!("{}{} {}", indent_s, icon, message.bright_white());
}

pub fn print_section(title: &str) {
    use colored::Colorize;
    let indent_s = " ".repeat(indent() + 2);
    println!();
    println!("{}{}", indent_s, title.bold());
}
