//! Console styles for layer reports
//!
//! Styles collapse to plain text when stdout is not a color terminal, so
//! piped `parse` output stays free of escape codes.

use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Theme {
    /// Report titles and section rules
    pub title: Style,
    /// Labels of key/value lines
    pub label: Style,
    /// Language ids wherever they are printed
    pub language: Style,
    /// Secondary details such as file extensions
    pub detail: Style,
    pub ok: Style,
    pub failed: Style,
    pub caution: Style,
}

impl Theme {
    fn for_terminal() -> Self {
        if !console::Term::stdout().is_term() || !console::colors_enabled() {
            return Self::plain();
        }
        Self {
            title: Style::new().cyan().bold(),
            label: Style::new().white().dimmed(),
            language: Style::new().blue().bold(),
            detail: Style::new().bright_black(),
            ok: Style::new().green().bold(),
            failed: Style::new().red().bold(),
            caution: Style::new().yellow().bold(),
        }
    }

    fn plain() -> Self {
        let none = Style::new();
        Self {
            title: none.clone(),
            label: none.clone(),
            language: none.clone(),
            detail: none.clone(),
            ok: none.clone(),
            failed: none.clone(),
            caution: none,
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::for_terminal)
}
