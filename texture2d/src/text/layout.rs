//! Line breaking and alignment independent of the font backend.

use super::TextAlignment;

/// One laid out line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Characters of the line, without the separator it was broken at.
    pub text: String,
    /// Sum of the advances of the characters.
    pub width: f32,
}

impl Line {
    fn empty() -> Self {
        Self {
            text: String::new(),
            width: 0.0,
        }
    }
}

/// Splits the text into lines.
///
/// Lines are broken at `\n`. When `max_width` is set, lines are also wrapped at spaces, and
/// words wider than the box are broken between characters.
pub fn layout_lines(
    text: &str,
    max_width: Option<f32>,
    advance: impl Fn(char) -> f32,
) -> Vec<Line> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        match max_width {
            None => lines.push(measure(paragraph, &advance)),
            Some(max_width) => wrap_paragraph(paragraph, max_width, &advance, &mut lines),
        }
    }

    lines
}

fn measure(text: &str, advance: &impl Fn(char) -> f32) -> Line {
    Line {
        text: text.to_owned(),
        width: text.chars().map(advance).sum(),
    }
}

fn wrap_paragraph(
    paragraph: &str,
    max_width: f32,
    advance: &impl Fn(char) -> f32,
    lines: &mut Vec<Line>,
) {
    let space = advance(' ');
    let mut current = Line::empty();

    for word in paragraph.split(' ') {
        let word_line = measure(word, advance);
        let separator = if current.text.is_empty() { 0.0 } else { space };

        if current.width + separator + word_line.width <= max_width {
            if !current.text.is_empty() {
                current.text.push(' ');
            }
            current.text.push_str(word);
            current.width += separator + word_line.width;
            continue;
        }

        if !current.text.is_empty() {
            lines.push(std::mem::replace(&mut current, Line::empty()));
        }

        if word_line.width <= max_width {
            current = word_line;
            continue;
        }

        for c in word.chars() {
            let width = advance(c);
            if !current.text.is_empty() && current.width + width > max_width {
                lines.push(std::mem::replace(&mut current, Line::empty()));
            }
            current.text.push(c);
            current.width += width;
        }
    }

    lines.push(current);
}

/// Horizontal offset of a line of `line_width` inside a box of `box_width`.
pub fn line_offset(alignment: TextAlignment, line_width: f32, box_width: f32) -> f32 {
    let free = (box_width - line_width).max(0.0);
    match alignment {
        TextAlignment::Left => 0.0,
        TextAlignment::Center => free / 2.0,
        TextAlignment::Right => free,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(lines: &[Line]) -> Vec<&str> {
        lines.iter().map(|line| line.text.as_str()).collect()
    }

    #[test]
    fn splits_on_newlines_without_box() {
        let lines = layout_lines("ab\ncde", None, |_| 10.0);
        assert_eq!(texts(&lines), vec!["ab", "cde"]);
        assert_eq!(lines[1].width, 30.0);
    }

    #[test]
    fn wraps_at_spaces() {
        let lines = layout_lines("aa bb cc", Some(50.0), |_| 10.0);
        assert_eq!(texts(&lines), vec!["aa bb", "cc"]);
        assert_eq!(lines[0].width, 50.0);
    }

    #[test]
    fn breaks_long_words() {
        let lines = layout_lines("abcdefg", Some(30.0), |_| 10.0);
        assert_eq!(texts(&lines), vec!["abc", "def", "g"]);
    }

    #[test]
    fn keeps_empty_lines() {
        let lines = layout_lines("a\n\nb", Some(100.0), |_| 10.0);
        assert_eq!(texts(&lines), vec!["a", "", "b"]);
    }

    #[test]
    fn offsets() {
        assert_eq!(line_offset(TextAlignment::Left, 30.0, 100.0), 0.0);
        assert_eq!(line_offset(TextAlignment::Center, 30.0, 100.0), 35.0);
        assert_eq!(line_offset(TextAlignment::Right, 30.0, 100.0), 70.0);
        assert_eq!(line_offset(TextAlignment::Right, 130.0, 100.0), 0.0);
    }
}
