use crossterm::style::Stylize;

// ── Prefix ────────────────────────────────────────────────────────────
pub const PREFIX: &str = "[testbox]";

// ── Icon constants ────────────────────────────────────────────────────
pub const ICON_ERROR: &str = " \u{274C}  ";
pub const ICON_SUCCESS: &str = " \u{2705}  ";
pub const ICON_DOCKER: &str = " \u{1F433} ";

/// Marker printed between the prefix and the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    None,
    Error,
    Success,
    Docker,
}

impl Icon {
    pub fn glyph(self) -> &'static str {
        match self {
            Icon::None => "",
            Icon::Error => ICON_ERROR,
            Icon::Success => ICON_SUCCESS,
            Icon::Docker => ICON_DOCKER,
        }
    }
}

/// Format one output line (without the trailing newline).
pub fn format_line(icon: Icon, text: &str, colored: bool) -> String {
    if colored {
        format!("{} {}{}", PREFIX.cyan(), icon.glyph(), text)
    } else {
        format!("{PREFIX} {}{}", icon.glyph(), text)
    }
}
