//! Console output: plain, error, coloured and large block text.

use std::fmt::Display;
use std::io::{self, Write};

/// ANSI foreground colours used by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    /// Red.
    Red,
    /// Green.
    Green,
    /// Blue.
    Blue,
    /// Magenta.
    Magenta,
}

impl Color {
    fn code(self) -> u8 {
        match self {
            Color::Red => 31,
            Color::Green => 32,
            Color::Blue => 34,
            Color::Magenta => 35,
        }
    }
}

/// User-facing output sink.
pub struct Console<W> {
    out: W,
    color: bool,
}

impl<W: Write> Console<W> {
    /// Wraps `out`; `color` enables ANSI escapes.
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    /// Returns `text` wrapped in colour escapes, or unchanged when colour is off.
    pub fn colorize(&self, text: impl Display, color: Color) -> String {
        if self.color {
            format!("\x1b[{}m{text}\x1b[0m", color.code())
        } else {
            text.to_string()
        }
    }

    /// Writes one line.
    pub fn log(&mut self, msg: impl Display) -> io::Result<()> {
        writeln!(self.out, "{msg}")?;
        self.out.flush()
    }

    /// Writes `text` as one line in `color`.
    pub fn log_color(&mut self, text: impl Display, color: Color) -> io::Result<()> {
        let line = self.colorize(text, color);
        self.log(line)
    }

    /// Writes an error line.
    pub fn errorlog(&mut self, msg: impl Display) -> io::Result<()> {
        let label = self.colorize("Error", Color::Red);
        let body = self.colorize(msg, Color::Red);
        self.log(format!("{label}: {body}"))
    }

    /// Writes `text` in large block letters.
    pub fn biglog(&mut self, text: impl Display, color: Color) -> io::Result<()> {
        for row in render_big(&text.to_string()) {
            let row = self.colorize(row, color);
            writeln!(self.out, "{row}")?;
        }
        self.out.flush()
    }

    /// Borrows the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

const GLYPH_ROWS: usize = 5;

/// Renders `text` as rows of block characters.
pub fn render_big(text: &str) -> Vec<String> {
    let glyphs: Vec<[&str; GLYPH_ROWS]> = text.chars().map(glyph).collect();
    (0..GLYPH_ROWS)
        .map(|row| {
            glyphs
                .iter()
                .map(|g| g[row])
                .collect::<Vec<_>>()
                .join(" ")
                .trim_end()
                .to_string()
        })
        .collect()
}

fn glyph(c: char) -> [&'static str; GLYPH_ROWS] {
    match c.to_ascii_uppercase() {
        'A' => [" ### ", "#   #", "#####", "#   #", "#   #"],
        'B' => ["#### ", "#   #", "#### ", "#   #", "#### "],
        'C' => [" ####", "#    ", "#    ", "#    ", " ####"],
        'D' => ["#### ", "#   #", "#   #", "#   #", "#### "],
        'E' => ["#####", "#    ", "#### ", "#    ", "#####"],
        'F' => ["#####", "#    ", "#### ", "#    ", "#    "],
        'G' => [" ####", "#    ", "#  ##", "#   #", " ####"],
        'H' => ["#   #", "#   #", "#####", "#   #", "#   #"],
        'I' => ["#####", "  #  ", "  #  ", "  #  ", "#####"],
        'J' => ["#####", "   # ", "   # ", "#  # ", " ##  "],
        'K' => ["#   #", "#  # ", "###  ", "#  # ", "#   #"],
        'L' => ["#    ", "#    ", "#    ", "#    ", "#####"],
        'M' => ["#   #", "## ##", "# # #", "#   #", "#   #"],
        'N' => ["#   #", "##  #", "# # #", "#  ##", "#   #"],
        'O' => [" ### ", "#   #", "#   #", "#   #", " ### "],
        'P' => ["#### ", "#   #", "#### ", "#    ", "#    "],
        'Q' => [" ### ", "#   #", "# # #", "#  # ", " ## #"],
        'R' => ["#### ", "#   #", "#### ", "#  # ", "#   #"],
        'S' => [" ####", "#    ", " ### ", "    #", "#### "],
        'T' => ["#####", "  #  ", "  #  ", "  #  ", "  #  "],
        'U' => ["#   #", "#   #", "#   #", "#   #", " ### "],
        'V' => ["#   #", "#   #", "#   #", " # # ", "  #  "],
        'W' => ["#   #", "#   #", "# # #", "## ##", "#   #"],
        'X' => ["#   #", " # # ", "  #  ", " # # ", "#   #"],
        'Y' => ["#   #", " # # ", "  #  ", "  #  ", "  #  "],
        'Z' => ["#####", "   # ", "  #  ", " #   ", "#####"],
        '0' => [" ### ", "#  ##", "# # #", "##  #", " ### "],
        '1' => ["  #  ", " ##  ", "  #  ", "  #  ", " ### "],
        '2' => [" ### ", "#   #", "  ## ", " #   ", "#####"],
        '3' => ["#### ", "    #", " ### ", "    #", "#### "],
        '4' => ["#   #", "#   #", "#####", "    #", "    #"],
        '5' => ["#####", "#    ", "#### ", "    #", "#### "],
        '6' => [" ### ", "#    ", "#### ", "#   #", " ### "],
        '7' => ["#####", "    #", "   # ", "  #  ", "  #  "],
        '8' => [" ### ", "#   #", " ### ", "#   #", " ### "],
        '9' => [" ### ", "#   #", " ####", "    #", " ### "],
        '-' => ["     ", "     ", "#####", "     ", "     "],
        _ => ["     "; GLYPH_ROWS],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_digits_have_five_rows() {
        let rows = render_big("10");
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], "  #    ###");
        assert_eq!(rows[4], " ###   ###");
    }

    #[test]
    fn colour_can_be_disabled() {
        let plain = Console::new(Vec::new(), false);
        assert_eq!(plain.colorize("x", Color::Red), "x");
        let fancy = Console::new(Vec::new(), true);
        assert_eq!(fancy.colorize("x", Color::Red), "\x1b[31mx\x1b[0m");
    }

    #[test]
    fn palette_covers_the_colours_the_cli_uses() {
        let fancy = Console::new(Vec::new(), true);
        let codes: Vec<String> = [Color::Red, Color::Green, Color::Blue, Color::Magenta]
            .into_iter()
            .map(|c| fancy.colorize("", c))
            .collect();
        assert_eq!(
            codes,
            ["\x1b[31m\x1b[0m", "\x1b[32m\x1b[0m", "\x1b[34m\x1b[0m", "\x1b[35m\x1b[0m"]
        );
    }

    #[test]
    fn errorlog_prefixes_message() {
        let mut console = Console::new(Vec::new(), false);
        console.errorlog("Missing parameter id").expect("write");
        assert_eq!(
            String::from_utf8(console.get_ref().clone()).expect("utf8"),
            "Error: Missing parameter id\n"
        );
    }
}
