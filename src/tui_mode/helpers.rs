use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec!["".to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_width = 0;

    for word in text.split_whitespace() {
        let word_width = word.width();

        if word_width > width {
            if !current_line.is_empty() {
                lines.push(current_line.trim().to_string());
                current_line.clear();
                current_width = 0;
            }

            let mut chunk = String::new();
            let mut chunk_width = 0;
            for grapheme in word.graphemes(true) {
                let grapheme_width = grapheme.width().max(1);
                if chunk_width + grapheme_width > width {
                    lines.push(std::mem::take(&mut chunk));
                    chunk_width = 0;
                }
                chunk.push_str(grapheme);
                chunk_width += grapheme_width;
            }
            if !chunk.is_empty() {
                lines.push(chunk);
            }
            continue;
        }

        if current_width + word_width + 1 > width && !current_line.is_empty() {
            lines.push(current_line.trim().to_string());
            current_line.clear();
            current_width = 0;
        }

        if !current_line.is_empty() {
            current_line.push(' ');
            current_width += 1;
        }

        current_line.push_str(word);
        current_width += word_width;
    }

    if !current_line.is_empty() {
        lines.push(current_line.trim().to_string());
    }

    lines
}

fn is_operator(c: char) -> bool {
    matches!(c, '+' | '-' | '*' | '/' | 'x' | '÷')
}

/// Spaces binary operators out for display: `2+3x4` becomes `2 + 3 x 4`.
/// A minus that starts the expression or follows `(` or another operator
/// stays glued to its operand.
pub fn format_with_spaces(expr: &str) -> String {
    let mut result = String::new();
    let mut prev: Option<char> = None;

    for c in expr.chars().filter(|c| !c.is_whitespace()) {
        let unary = c == '-' && prev.map_or(true, |p| p == '(' || is_operator(p));
        if is_operator(c) && !unary {
            result.push(' ');
            result.push(c);
            result.push(' ');
        } else {
            result.push(c);
        }
        prev = Some(c);
    }

    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn highlight_expression(expr: &str, base_style: Style) -> Vec<Span<'static>> {
    let operator_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);

    let number_style = Style::default()
        .fg(Color::LightGreen);

    let percent_style = Style::default()
        .fg(Color::LightBlue)
        .add_modifier(Modifier::BOLD);

    let mut spans = Vec::new();
    let mut number = String::new();

    for c in expr.chars() {
        if c.is_ascii_digit() || c == '.' {
            number.push(c);
            continue;
        }

        if !number.is_empty() {
            spans.push(Span::styled(std::mem::take(&mut number), number_style));
        }

        match c {
            '%' => spans.push(Span::styled(c.to_string(), percent_style)),
            ' ' => spans.push(Span::raw(" ")),
            _ if is_operator(c) => spans.push(Span::styled(c.to_string(), operator_style)),
            // parentheses and anything the evaluator will reject
            _ => spans.push(Span::styled(c.to_string(), base_style)),
        }
    }

    if !number.is_empty() {
        spans.push(Span::styled(number, number_style));
    }

    spans
}
