//! Theme constants for the docket web app
//!
//! Defines the color scheme as Rust constants and builds the stylesheet
//! from them, so badge colors and page colors stay in one place.

/// Background colors
pub mod background {
    /// Primary background color (darkest)
    pub const PRIMARY: &str = "#1a2332";
    /// Secondary background color
    pub const SECONDARY: &str = "#243447";
    /// Tertiary background color
    pub const TERTIARY: &str = "#2d4059";
}

/// Text colors
pub mod text {
    /// Primary text color
    pub const PRIMARY: &str = "#e8edf3";
    /// Secondary text color (muted)
    pub const SECONDARY: &str = "#b8c5d6";
}

/// Accent colors
pub mod accent {
    pub const BLUE: &str = "#4a90e2";
    pub const LIGHT: &str = "#6aa8f0";
}

/// Border colors
pub mod border {
    pub const DEFAULT: &str = "#3a4d66";
}

/// Status colors
pub mod status {
    /// Success color (green)
    pub const SUCCESS: &str = "#5cb85c";
    /// Warning color (orange)
    pub const WARNING: &str = "#f0ad4e";
    /// Danger color (red)
    pub const DANGER: &str = "#d9534f";
    /// Info color (light blue)
    pub const INFO: &str = "#5bc0de";
    /// Neutral color for finished or inactive items
    pub const MUTED: &str = "#7a8fa3";
}

/// Event kind colors, used on the calendar
pub mod event {
    pub const HEARING: &str = "#9b6ed8";
    pub const DEADLINE: &str = "#e85d5d";
    pub const MEETING: &str = "#20b2aa";
}

/// Badge color for an enumeration value, by its stable key.
pub fn badge_color(key: &str) -> &'static str {
    match key {
        // case status
        "open" => status::INFO,
        "closed" => status::MUTED,
        "suspended" => status::WARNING,
        // priority
        "low" => status::SUCCESS,
        "medium" => status::WARNING,
        "high" => status::DANGER,
        // event status
        "scheduled" => accent::BLUE,
        "done" => status::SUCCESS,
        "cancelled" => status::MUTED,
        // event kind
        "hearing" => event::HEARING,
        "deadline" => event::DEADLINE,
        "meeting" => event::MEETING,
        // transactions
        "income" | "paid" => status::SUCCESS,
        "expense" => status::DANGER,
        "pending" => status::WARNING,
        _ => background::TERTIARY,
    }
}

/// Stylesheet for every page.
pub fn stylesheet() -> String {
    format!(
        r#"
:root {{ color-scheme: dark; }}
* {{ box-sizing: border-box; }}
body {{ margin: 0; font-family: system-ui, sans-serif; background: {bg}; color: {fg}; }}
a {{ color: {accent_light}; }}
nav {{ display: flex; flex-wrap: wrap; gap: 4px; padding: 10px 16px; background: {bg2}; border-bottom: 1px solid {border}; }}
nav a {{ padding: 6px 12px; border-radius: 4px; color: {fg}; text-decoration: none; }}
nav a.active {{ background: {accent}; }}
nav .brand {{ font-weight: 700; margin-right: 16px; padding: 6px 0; }}
main {{ padding: 16px 24px; max-width: 1280px; }}
h1 {{ font-size: 1.5rem; margin: 8px 0 16px; }}
h2 {{ font-size: 1.15rem; margin: 24px 0 8px; color: {fg2}; }}
.flash {{ padding: 8px 12px; margin-bottom: 8px; border-left: 4px solid {warning}; background: {bg2}; }}
.flash.error {{ border-color: {danger}; }}
.cards {{ display: flex; flex-wrap: wrap; gap: 12px; }}
.card {{ background: {bg2}; border: 1px solid {border}; border-radius: 6px; padding: 12px 16px; min-width: 160px; }}
.card .value {{ font-size: 1.6rem; font-weight: 700; }}
.card .label {{ color: {fg2}; font-size: 0.85rem; }}
table {{ border-collapse: collapse; width: 100%; margin: 8px 0; }}
th, td {{ border: 1px solid {border}; padding: 6px 8px; text-align: left; vertical-align: top; }}
th {{ background: {bg3}; }}
td.actions {{ white-space: nowrap; }}
td.actions form {{ display: inline; }}
.badge {{ display: inline-block; padding: 2px 8px; border-radius: 10px; font-size: 0.8rem; color: #fff; }}
form.record {{ background: {bg2}; border: 1px solid {border}; border-radius: 6px; padding: 12px 16px; margin: 12px 0; }}
form.record label {{ display: block; margin: 8px 0 2px; color: {fg2}; font-size: 0.85rem; }}
input, select, textarea {{ background: {bg}; color: {fg}; border: 1px solid {border}; border-radius: 4px; padding: 5px 8px; }}
form.record input, form.record select, form.record textarea {{ width: 100%; }}
form.filters {{ display: flex; flex-wrap: wrap; gap: 8px; align-items: end; margin: 8px 0; }}
button, .button {{ background: {accent}; color: #fff; border: 0; border-radius: 4px; padding: 6px 12px; cursor: pointer; text-decoration: none; font-size: 0.9rem; }}
button.secondary {{ background: {bg3}; }}
button.danger {{ background: {danger}; }}
.calendar td {{ height: 90px; width: 14.28%; font-size: 0.8rem; }}
.calendar td.other {{ color: {muted}; }}
.calendar .day {{ font-weight: 700; }}
.calendar .event {{ display: block; margin: 2px 0; padding: 1px 4px; border-radius: 3px; color: #fff; overflow: hidden; text-overflow: ellipsis; white-space: nowrap; }}
.muted {{ color: {fg2}; }}
"#,
        bg = background::PRIMARY,
        bg2 = background::SECONDARY,
        bg3 = background::TERTIARY,
        fg = text::PRIMARY,
        fg2 = text::SECONDARY,
        accent = accent::BLUE,
        accent_light = accent::LIGHT,
        border = border::DEFAULT,
        warning = status::WARNING,
        danger = status::DANGER,
        muted = status::MUTED,
    )
}
