//! Word wrapping and block alignment for note text.

use kurbo::{Point, Rect};
use noteflow_core::shapes::{HorizontalAlign, VerticalAlign};

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT: f64 = 1.2;

/// A wrapped line positioned by its top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub origin: Point,
    pub width: f64,
}

/// Greedy word wrap. Explicit newlines always break; words wider than
/// `max_width` are split between characters.
pub fn wrap_text(text: &str, max_width: f64, measure: &mut dyn FnMut(&str) -> f64) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if measure(&candidate) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if measure(word) <= max_width {
                current = word.to_string();
            } else {
                let mut pieces = split_word(word, max_width, measure);
                current = pieces.pop().unwrap_or_default();
                lines.extend(pieces);
            }
        }
        lines.push(current);
    }
    lines
}

fn split_word(word: &str, max_width: f64, measure: &mut dyn FnMut(&str) -> f64) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for ch in word.chars() {
        current.push(ch);
        if measure(&current) > max_width && current.chars().count() > 1 {
            current.pop();
            pieces.push(std::mem::take(&mut current));
            current.push(ch);
        }
    }
    pieces.push(current);
    pieces
}

/// Wrap `text` into `area` and position every line.
///
/// Lines that would start below the bottom of `area` are dropped.
pub fn layout_text(
    text: &str,
    area: Rect,
    font_size: f64,
    h_align: HorizontalAlign,
    v_align: VerticalAlign,
    measure: &mut dyn FnMut(&str) -> f64,
) -> Vec<TextLine> {
    if text.trim().is_empty() || area.width() <= 0.0 || font_size <= 0.0 {
        return Vec::new();
    }
    let line_height = font_size * LINE_HEIGHT;
    let max_lines = ((area.height() / line_height).floor() as usize).max(1);
    let mut wrapped = wrap_text(text, area.width(), measure);
    while wrapped.last().is_some_and(|l| l.is_empty()) {
        wrapped.pop();
    }
    wrapped.truncate(max_lines);

    let block_height = wrapped.len() as f64 * line_height;
    let top = match v_align {
        VerticalAlign::Top => area.y0,
        VerticalAlign::Middle => area.y0 + (area.height() - block_height) / 2.0,
        VerticalAlign::Bottom => area.y1 - block_height,
    };
    wrapped
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            let width = measure(&line);
            let x = match h_align {
                HorizontalAlign::Left => area.x0,
                HorizontalAlign::Center => area.x0 + (area.width() - width) / 2.0,
                HorizontalAlign::Right => area.x1 - width,
            };
            TextLine {
                origin: Point::new(x, top + i as f64 * line_height),
                text: line,
                width,
            }
        })
        .collect()
}
