//! Theme for human-mode output.

use console::{Color, Style};

/// Colors and styles shared by all human-mode rendering.
#[derive(Debug, Clone)]
pub struct SnapTheme {
    pub accent: Style,
    pub success: Style,
    pub error: Style,
    pub warning: Style,
    pub muted: Style,

    pub header: Style,
    pub label: Style,
    pub value: Style,
    pub title: Style,
    pub price: Style,
    pub link: Style,
    pub search_id: Style,
}

impl Default for SnapTheme {
    fn default() -> Self {
        Self {
            accent: Style::new().fg(Color::Color256(33)),
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            warning: Style::new().yellow().bold(),
            muted: Style::new().fg(Color::Color256(245)),
            header: Style::new().fg(Color::Color256(33)).bold(),
            label: Style::new().dim(),
            value: Style::new().bold(),
            title: Style::new().bold(),
            price: Style::new().fg(Color::Color256(255)).bold(),
            link: Style::new().cyan().underlined(),
            search_id: Style::new().yellow().bold(),
        }
    }
}

impl SnapTheme {
    /// Theme with styling disabled on every style.
    pub fn plain() -> Self {
        let t = Self::default();
        let off = |s: Style| s.force_styling(false);
        Self {
            accent: off(t.accent),
            success: off(t.success),
            error: off(t.error),
            warning: off(t.warning),
            muted: off(t.muted),
            header: off(t.header),
            label: off(t.label),
            value: off(t.value),
            title: off(t.title),
            price: off(t.price),
            link: off(t.link),
            search_id: off(t.search_id),
        }
    }
}
