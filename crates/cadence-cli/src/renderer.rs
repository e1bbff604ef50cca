//! Terminal output for engine results.
//!
//! Output is produced as markdown by the command handlers; this module
//! decides how it reaches the terminal — styled through termimad, or
//! verbatim when color is disabled (piped output, tests, `--no-color`).

use anyhow::Result;
use termimad::{crossterm::style::Color, MadSkin};

/// Renders handler output to the terminal.
pub struct TerminalRenderer {
    skin: Option<MadSkin>,
}

impl TerminalRenderer {
    pub fn new(rich_enabled: bool) -> Self {
        Self {
            skin: rich_enabled.then(Self::skin),
        }
    }

    fn skin() -> MadSkin {
        let mut skin = MadSkin::default();
        skin.set_headers_fg(Color::Cyan);
        skin.bold.set_fg(Color::Yellow);
        skin
    }

    /// Prints markdown, styled or plain depending on configuration.
    pub fn render(&self, markdown: &str) -> Result<()> {
        match &self.skin {
            Some(skin) => skin.print_text(markdown),
            None => print!("{markdown}"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_mode_has_no_skin() {
        assert!(TerminalRenderer::new(false).skin.is_none());
    }

    #[test]
    fn test_rich_mode_builds_a_skin() {
        assert!(TerminalRenderer::new(true).skin.is_some());
    }
}
