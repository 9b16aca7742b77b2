//! Terminal rendering of the markdown produced by the core display types,
//! with a plain-text fallback.

use anyhow::Result;
use termimad::{crossterm::style::Color, MadSkin};

/// Renders markdown either through termimad or as plain text.
pub struct TerminalRenderer {
    rich_enabled: bool,
    skin: MadSkin,
}

impl TerminalRenderer {
    pub fn new(rich_enabled: bool) -> Self {
        let mut skin = MadSkin::default();
        skin.set_headers_fg(Color::Cyan);
        skin.bold.set_fg(Color::Yellow);
        skin.italic.set_fg(Color::Magenta);
        skin.code_block.set_bg(Color::AnsiValue(236));
        skin.inline_code.set_bg(Color::AnsiValue(236));

        Self { rich_enabled, skin }
    }

    /// Prints `markdown` to stdout.
    ///
    /// Rich mode styles inline markup line by line and keeps fenced file
    /// contents verbatim, so generated code is never reflowed.
    pub fn render(&self, markdown: &str) -> Result<()> {
        if !self.rich_enabled {
            print!("{markdown}");
            return Ok(());
        }

        let mut fence: Option<&str> = None;
        for line in markdown.lines() {
            let trimmed = line.trim_start();
            match fence {
                Some(marker) => {
                    if trimmed.starts_with(marker) && trimmed.trim_matches('`').is_empty() {
                        fence = None;
                    }
                    println!("{line}");
                }
                None if trimmed.starts_with("```") => {
                    let ticks = trimmed.len() - trimmed.trim_start_matches('`').len();
                    fence = Some(&trimmed[..ticks]);
                    println!("{line}");
                }
                None if line.starts_with('#') => println!("\x1b[36m{line}\x1b[0m"),
                None => {
                    self.skin.print_inline(line);
                    println!();
                }
            }
        }
        Ok(())
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new(true)
    }
}
