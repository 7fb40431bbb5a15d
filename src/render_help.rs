use crate::tui_mode::app::App;
use ratatui::{
    layout::Alignment,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

fn heading(text: &'static str) -> Line<'static> {
    Line::from(Span::styled(text, Style::default().fg(Color::Cyan).add_modifier(Modifier::UNDERLINED)))
}

fn help_lines(app: &App) -> Vec<Line<'static>> {
    let rates = app
        .config
        .tax
        .rates
        .iter()
        .enumerate()
        .map(|(i, rate)| format!("F{} = {}%", i + 5, rate))
        .collect::<Vec<_>>()
        .join(", ");

    vec![
        Line::from(Span::styled("tabcalc - Calculator With a Running Tab", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))),
        Line::from(""),
        heading("Operations:"),
        Line::from("  + : Addition        (e.g., 5 + 3 = 8)"),
        Line::from("  - : Subtraction     (e.g., 10 - 4 = 6)"),
        Line::from("  * or x : Multiply   (e.g., 6x7 = 42)"),
        Line::from("  / or ÷ : Divide     (e.g., 15 / 3 = 5, 5 / 0 = 0)"),
        Line::from("  ( ) : Grouping      (unclosed '(' is closed for you)"),
        Line::from(""),
        heading("Percentages:"),
        Line::from("  50%      = 0.5"),
        Line::from("  50x10%   = 5       (10% of 50)"),
        Line::from("  100+5%   = 105     (adds 5% of 100)"),
        Line::from("  100-5%   = 95      (takes 5% of 100 off)"),
        Line::from(""),
        heading("Lines and Pages:"),
        Line::from("  Enter    : Commit the line (or finish editing)"),
        Line::from("  Up/Down  : Pick a committed line to edit"),
        Line::from("  Esc      : Stop editing"),
        Line::from("  Tab      : Next page, Shift+Tab : Previous page"),
        Line::from("  Ctrl+U   : Clear input, or drop the last line"),
        Line::from("  Ctrl+L   : Clear the page"),
        Line::from("  Ctrl+Z   : Undo the last change to the lines"),
        Line::from(""),
        heading("Tax:"),
        Line::from("  Ctrl+G          : Toggle GST mode"),
        Line::from(format!("  GST mode        : {}", rates)),
        Line::from(format!("  Basic mode      : F5 = {}%", app.ledger.default_rate())),
        Line::from("  Shift+F5..F7    : Take tax out instead of adding it (also F8..F10)"),
        Line::from(""),
        heading("Editing:"),
        Line::from("  ← → : Move cursor, Ctrl+←/→ : Move by terms"),
        Line::from("  Home/End : Move to start/end of line"),
        Line::from("  Ctrl+P : Smart parenthesis"),
        Line::from("  Ctrl+D : Show evaluation steps"),
        Line::from("  Paste : Only digits and operators are kept"),
        Line::from("  Ctrl+Y : Copy the grand total"),
        Line::from("  Ctrl+Q / Ctrl+C / quit : Exit"),
    ]
}

pub fn help_line_count(app: &App) -> usize {
    help_lines(app).len()
}

pub fn render_help(frame: &mut Frame, app: &mut App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" tabcalc Help ")
        .title_alignment(Alignment::Center)
        .style(Style::default().bg(Color::Black));

    let help_text = help_lines(app);
    let scroll = u16::try_from(app.help_scroll).unwrap_or(u16::MAX);

    let paragraph = Paragraph::new(help_text)
        .block(block)
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true })
        .scroll((scroll, 0));

    frame.render_widget(Clear, frame.size());
    frame.render_widget(paragraph, frame.size());
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabcalc::config::Config;

    #[test]
    fn test_help_scroll_stops_at_last_line() {
        let mut app = App::new(Config::default());
        let count = help_line_count(&app);
        for _ in 0..20_000 {
            app.scroll_help(10, count);
        }
        assert_eq!(app.help_scroll, count - 1);
        assert!(help_lines(&app)
            .iter()
            .any(|line| line.spans.iter().any(|span| span.content.contains("Ctrl+Y"))));
    }
}
