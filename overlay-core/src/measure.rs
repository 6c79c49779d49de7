//! Text measurement contract and word-wrap layout helpers.
//!
//! The geometry engine never talks to a font directly. It receives a
//! [`TextMeasure`] implementation and derives line counts and box heights from
//! the advance widths it reports.

use crate::TextStyle;

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f32 = 1.4;

/// Inner padding on each side of a text box, in overlay pixels.
pub const TEXT_PADDING: f32 = 8.0;

/// Measures rendered text.
pub trait TextMeasure {
    /// Advance width in pixels of a single line (no line breaks) drawn with `style`.
    fn line_width(&self, line: &str, style: &TextStyle) -> f32;
}

impl<T: TextMeasure + ?Sized> TextMeasure for &T {
    fn line_width(&self, line: &str, style: &TextStyle) -> f32 {
        (**self).line_width(line, style)
    }
}

impl<T: TextMeasure + ?Sized> TextMeasure for Box<T> {
    fn line_width(&self, line: &str, style: &TextStyle) -> f32 {
        (**self).line_width(line, style)
    }
}

/// A font-free measurer that gives every character the same advance.
///
/// Useful when no font file is available and in tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedAdvance {
    /// Advance of one character as a fraction of the font size.
    pub em_ratio: f32,
}

impl Default for FixedAdvance {
    fn default() -> Self {
        Self { em_ratio: 0.6 }
    }
}

impl TextMeasure for FixedAdvance {
    #[allow(clippy::cast_precision_loss)]
    fn line_width(&self, line: &str, style: &TextStyle) -> f32 {
        line.chars().count() as f32 * style.font_size * self.em_ratio
    }
}

/// Height of one line for `style`.
#[must_use]
pub fn line_height(style: &TextStyle) -> f32 {
    LINE_HEIGHT_FACTOR * style.font_size
}

/// Word-wrap `content` to `max_width`.
///
/// Explicit line breaks always start a new line. Words wider than the
/// available width are broken between characters.
#[must_use]
pub fn wrap_lines(
    content: &str,
    max_width: f32,
    style: &TextStyle,
    measure: &dyn TextMeasure,
) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in content.split('\n') {
        let mut line = String::new();
        for word in paragraph.split(' ') {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{line} {word}")
            };
            if measure.line_width(&candidate, style) <= max_width {
                line = candidate;
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if measure.line_width(word, style) <= max_width {
                line = word.to_string();
                continue;
            }
            for ch in word.chars() {
                line.push(ch);
                if line.chars().count() > 1 && measure.line_width(&line, style) > max_width {
                    line.pop();
                    lines.push(std::mem::take(&mut line));
                    line.push(ch);
                }
            }
        }
        lines.push(line);
    }
    lines
}

/// Minimum box height needed to show `content` word-wrapped inside a box
/// of `box_width`, padding included.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn content_height(
    content: &str,
    style: &TextStyle,
    box_width: f32,
    measure: &dyn TextMeasure,
) -> f32 {
    let available = (box_width - 2.0 * TEXT_PADDING).max(1.0);
    let lines = wrap_lines(content, available, style, measure).len();
    (lines as f32 * line_height(style) + 2.0 * TEXT_PADDING).ceil()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(size: f32) -> TextStyle {
        TextStyle {
            font_size: size,
            ..TextStyle::default()
        }
    }

    // 10px per character at size 10 makes widths easy to reason about.
    const MEASURE: FixedAdvance = FixedAdvance { em_ratio: 1.0 };

    #[test]
    fn test_explicit_breaks_are_kept() {
        let lines = wrap_lines("a\n\nb", 1000.0, &style(10.0), &MEASURE);
        assert_eq!(lines, vec!["a", "", "b"]);
    }

    #[test]
    fn test_greedy_word_wrap() {
        let lines = wrap_lines("aa bb cc", 50.0, &style(10.0), &MEASURE);
        assert_eq!(lines, vec!["aa bb", "cc"]);
    }

    #[test]
    fn test_long_word_breaks_between_characters() {
        let lines = wrap_lines("abcdefg", 30.0, &style(10.0), &MEASURE);
        assert_eq!(lines, vec!["abc", "def", "g"]);
    }

    #[test]
    fn test_content_height_counts_wrapped_lines() {
        // 66px box leaves 50px for text: "aa bb" fits, "cc" wraps.
        let height = content_height("aa bb cc", &style(10.0), 66.0, &MEASURE);
        assert!((height - (2.0 * 14.0 + 16.0)).abs() < f32::EPSILON);
    }
}
