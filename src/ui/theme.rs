use crate::resolver::Origin;
use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Styles for the few kinds of line the CLI prints
#[derive(Debug, Clone)]
pub struct Theme {
    pub heading: Style,
    pub ok: Style,
    pub problem: Style,
    pub caution: Style,
    /// Labels and source tags next to values
    pub label: Style,
    pub coordinate: Style,
    stored: Style,
    live: Style,
    fallback: Style,
}

impl Theme {
    pub fn detect() -> Self {
        if console::Term::stdout().is_term() {
            Self::colored()
        } else {
            Self::plain()
        }
    }

    pub fn colored() -> Self {
        Self {
            heading: Style::new().cyan().bold(),
            ok: Style::new().green().bold(),
            problem: Style::new().red().bold(),
            caution: Style::new().yellow().bold(),
            label: Style::new().white().dimmed(),
            coordinate: Style::new().bright_white().bold(),
            stored: Style::new().green(),
            live: Style::new().cyan(),
            fallback: Style::new().yellow(),
        }
    }

    pub fn plain() -> Self {
        let none = Style::new();
        Self {
            heading: none.clone(),
            ok: none.clone(),
            problem: none.clone(),
            caution: none.clone(),
            label: none.clone(),
            coordinate: none.clone(),
            stored: none.clone(),
            live: none.clone(),
            fallback: none,
        }
    }

    /// Tag style for a resolved coordinate, by where it came from
    pub fn origin(&self, origin: Origin) -> &Style {
        match origin {
            Origin::Stored => &self.stored,
            Origin::Live => &self.live,
            Origin::Fallback => &self.fallback,
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
