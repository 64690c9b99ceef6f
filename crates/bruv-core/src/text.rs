//! Terminal text helpers shared by presentation code.

use std::env;

use unicode_width::UnicodeWidthStr;

const FALLBACK_SIZE: (u16, u16) = (80, 25);

/// Fit `text` to exactly `width` terminal columns.
///
/// Longer text is cut and ends in `...`; shorter text is padded with spaces.
/// Width is measured in display columns, so wide glyphs count double.
/// Control characters such as tabs are shown as single spaces. A glyph that
/// would straddle the cut is dropped and the gap padded.
///
/// ```
/// use bruv_core::text::fit_width;
///
/// assert_eq!(fit_width("Hello World", 8), "Hello...");
/// assert_eq!(fit_width("Hi", 4), "Hi  ");
/// ```
#[must_use]
pub fn fit_width(text: &str, width: usize) -> String {
    let text: String = text
        .chars()
        .map(|ch| if ch.is_control() { ' ' } else { ch })
        .collect();
    let text_width = UnicodeWidthStr::width(text.as_str());

    if text_width <= width {
        return format!("{text}{}", " ".repeat(width - text_width));
    }

    if width < 3 {
        return ".".repeat(width);
    }

    // Prefixes are measured whole: joined sequences aren't the sum of their chars.
    let target = width - 3;
    let mut kept = "";
    let mut kept_width = 0;
    for end in text.char_indices().map(|(i, ch)| i + ch.len_utf8()) {
        let prefix = &text[..end];
        let prefix_width = UnicodeWidthStr::width(prefix);
        if prefix_width > target {
            break;
        }
        kept = prefix;
        kept_width = prefix_width;
    }

    format!("{kept}{}...", " ".repeat(target - kept_width))
}

/// Terminal size as `(columns, rows)`.
///
/// Asks the terminal first, then `COLUMNS`/`LINES`, then assumes 80x25.
#[must_use]
pub fn terminal_size() -> (u16, u16) {
    if let Ok((columns, rows)) = crossterm::terminal::size() {
        if columns > 0 && rows > 0 {
            return (columns, rows);
        }
    }
    size_from_env(env::var("COLUMNS").ok(), env::var("LINES").ok())
}

fn size_from_env(columns: Option<String>, lines: Option<String>) -> (u16, u16) {
    let parse = |value: Option<String>, fallback: u16| {
        value
            .and_then(|v| v.trim().parse().ok())
            .filter(|v| *v > 0)
            .unwrap_or(fallback)
    };
    (
        parse(columns, FALLBACK_SIZE.0),
        parse(lines, FALLBACK_SIZE.1),
    )
}
