//! Minimal terminal styling, trimmed to what `wit`'s diagnostics need.
//!
//! `anstream` for auto-detecting color support (respects
//! `NO_COLOR`/`CLICOLOR_FORCE`), `anstyle` for composable styles.
//! Use as `{ERROR}text{ERROR:#}`.

use anstyle::{AnsiColor, Color, Style};

/// Auto-detecting println that respects `NO_COLOR`, `CLICOLOR_FORCE`, and terminal capabilities.
pub use anstream::eprintln;
pub use anstream::println;

/// Error style (red).
pub const ERROR: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red)));

/// Hint style (dim/cyan).
pub const HINT: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan)));

/// Informational style (green).
pub const INFO: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green)));

pub const ERROR_EMOJI: &str = "✗";
pub const HINT_EMOJI: &str = "→";
pub const INFO_EMOJI: &str = "✓";
