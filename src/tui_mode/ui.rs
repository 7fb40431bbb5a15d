use super::app::App;
use anyhow::Result;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{block::Title, Block, Borders, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use std::time::Duration;
use tabcalc::format::{format_number, DecimalPolicy, Grouping};
use tabcalc::ledger::LineItem;
use tabcalc::tax::TaxDirection;
use unicode_width::UnicodeWidthStr;
use super::clipboard::TotalClipboard;
use super::helpers::{format_with_spaces, highlight_expression, wrap_text};
use crate::render_help::{help_line_count, render_help};
use tracing::warn;

const MIN_TERMINAL_WIDTH: u16 = 50;
const MIN_TERMINAL_HEIGHT: u16 = 16;
const MAX_DETAIL_ROWS: usize = 8;

pub fn run_ui_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    let mut clipboard = TotalClipboard::default();

    loop {
        terminal.draw(|f| {
            if app.show_help {
                render_help(f, app);
            } else {
                ui(f, app);
            }
        })?;

        if app.should_quit {
            break;
        }

        if crossterm::event::poll(Duration::from_millis(50))? {
            match crossterm::event::read()? {
                Event::Key(KeyEvent { code: KeyCode::Char('y'), modifiers, kind: KeyEventKind::Press, .. })
                    if modifiers.contains(KeyModifiers::CONTROL) && !app.show_help =>
                {
                    copy_total(app, &mut clipboard);
                }
                Event::Key(KeyEvent { code, modifiers, kind, .. }) if kind == KeyEventKind::Press => {
                    app.status = None;
                    handle_key_event(app, code, modifiers);
                }
                Event::Mouse(event) => {
                    handle_mouse_event(app, event);
                }
                Event::Paste(text) if !app.show_help => app.paste(&text),
                _ => {}
            }
        }
    }
    Ok(())
}

fn copy_total(app: &mut App, clipboard: &mut TotalClipboard) {
    let total = app.clipboard_total();
    app.status = Some(match clipboard.set_text(&total) {
        Ok(()) => format!("Copied {}", total),
        Err(e) => {
            warn!(error = %e, "copy failed");
            "Clipboard unavailable".to_string()
        }
    });
}

fn rate_label(rate: f64) -> String {
    format_number(rate, DecimalPolicy::Auto, Grouping::None)
}

fn handle_key_event(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    if app.show_help {
        match code {
            KeyCode::Down => app.scroll_help(1, help_line_count(app)),
            KeyCode::Up => app.scroll_help(-1, help_line_count(app)),
            KeyCode::PageDown => app.scroll_help(10, help_line_count(app)),
            KeyCode::PageUp => app.scroll_help(-10, help_line_count(app)),
            KeyCode::Esc | KeyCode::F(1) => {
                app.show_help = false;
                app.help_scroll = 0;
            }
            _ => {}
        }
        return;
    }

    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    let shift = modifiers.contains(KeyModifiers::SHIFT);

    match code {
        KeyCode::Char('c') | KeyCode::Char('q') if ctrl => app.should_quit = true,
        KeyCode::Char('u') | KeyCode::Char('U') if ctrl => app.clear_input(),
        KeyCode::Char('l') if ctrl => app.clear_page(),
        KeyCode::Char('z') if ctrl => app.undo(),
        KeyCode::Char('g') if ctrl => app.ledger.toggle_gst_mode(),
        KeyCode::Char('d') if ctrl => app.show_details = !app.show_details,
        KeyCode::Char('p') if ctrl => app.insert_paren(),
        KeyCode::Char(c) if !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
            app.insert_char(c);
        }
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left if ctrl => app.move_cursor_by_words(-1),
        KeyCode::Right if ctrl => app.move_cursor_by_words(1),
        KeyCode::Left => app.move_cursor(-1),
        KeyCode::Right => app.move_cursor(1),
        KeyCode::Home => {
            app.cursor_position = 0;
            app.input_scroll = 0;
        }
        KeyCode::End => app.move_cursor_to_end(),
        KeyCode::Up => app.navigate_lines(-1),
        KeyCode::Down => app.navigate_lines(1),
        KeyCode::PageUp => app.lines_scroll = app.lines_scroll.saturating_sub(app.list_height.saturating_sub(1)),
        KeyCode::PageDown => app.lines_scroll = app.lines_scroll.saturating_add(app.list_height.saturating_sub(1)),
        KeyCode::Tab => app.switch_page(true),
        KeyCode::BackTab => app.switch_page(false),
        KeyCode::Enter => app.submit(),
        KeyCode::F(n @ 5..=7) => {
            let direction = if shift { TaxDirection::Remove } else { TaxDirection::Add };
            app.apply_tax((n - 5) as usize, direction);
        }
        KeyCode::F(n @ 8..=10) => app.apply_tax((n - 8) as usize, TaxDirection::Remove),
        KeyCode::F(1) => {
            app.show_help = true;
            app.help_scroll = 0;
        }
        KeyCode::Esc => app.stop_editing(),
        _ => {}
    }
}

fn handle_mouse_event(app: &mut App, event: crossterm::event::MouseEvent) {
    if app.show_help {
        match event.kind {
            MouseEventKind::ScrollDown => app.help_scroll = app.help_scroll.saturating_add(3),
            MouseEventKind::ScrollUp => app.help_scroll = app.help_scroll.saturating_sub(3),
            _ => {}
        }
    } else {
        match event.kind {
            MouseEventKind::ScrollDown => {
                app.lines_scroll = app.lines_scroll.saturating_add(3);
            }
            MouseEventKind::ScrollUp => {
                app.lines_scroll = app.lines_scroll.saturating_sub(3);
            }
            _ => {}
        }
    }
}

fn ui(frame: &mut Frame, app: &mut App) {
    let terminal_size = frame.size();

    app.terminal_too_small = terminal_size.width < MIN_TERMINAL_WIDTH ||
                             terminal_size.height < MIN_TERMINAL_HEIGHT;

    if app.terminal_too_small {
        render_resize_message(frame, terminal_size);
        return;
    }

    let steps = if app.show_details { app.trace_steps() } else { Vec::new() };
    let details_height = if app.show_details {
        steps.len().clamp(1, MAX_DETAIL_ROWS) as u16 + 2
    } else {
        0
    };

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(details_height),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(terminal_size);

    render_tabs(frame, app, layout[0]);
    render_lines(frame, app, layout[1]);
    if app.show_details {
        render_details(frame, app, &steps, layout[2]);
    }
    render_input(frame, app, layout[3]);
    render_total(frame, app, layout[4]);
    render_status(frame, app, layout[5]);
    app.list_height = layout[1].height as usize;
}

fn render_resize_message(frame: &mut Frame, area: Rect) {
    let message = format!(
        "Terminal too small! Min size: {}x{}. Current: {}x{}",
        MIN_TERMINAL_WIDTH,
        MIN_TERMINAL_HEIGHT,
        area.width,
        area.height
    );

    let text = vec![
        Line::from(Span::styled(
            message,
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Please resize your terminal window",
            Style::default().fg(Color::Yellow)
        )),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Resize Required ")
        .title_alignment(Alignment::Center);

    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, area);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = app
        .ledger
        .pages()
        .iter()
        .enumerate()
        .map(|(i, page)| {
            Line::from(format!(" {} · {} ", i + 1, app.config.format(page.total())))
        })
        .collect();

    let mode = if app.ledger.gst_mode() { " GST MODE " } else { " BASIC MODE " };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Pages ")
        .title(Title::from(Span::styled(mode, Style::default().fg(Color::LightBlue))).alignment(Alignment::Right));

    let tabs = Tabs::new(titles)
        .block(block)
        .select(app.ledger.current_page())
        .style(Style::default().fg(Color::Gray))
        .highlight_style(Style::default().fg(Color::Black).bg(Color::LightMagenta).add_modifier(Modifier::BOLD));

    frame.render_widget(tabs, area);
}

fn tax_rows(item: &LineItem, app: &App) -> Vec<(String, String, Style)> {
    let Some(tax) = item.tax else {
        return Vec::new();
    };

    let dim = Style::default().fg(Color::DarkGray);
    let (half_rate, half_amount) = tax.cgst();
    let mut rows = vec![
        (format!("CGST ({}%)", rate_label(half_rate)), app.config.format(half_amount), dim),
        (format!("SGST ({}%)", rate_label(half_rate)), app.config.format(half_amount), dim),
    ];
    let label = match tax.direction {
        TaxDirection::Add => format!("GST ({}%)", rate_label(tax.details.rate)),
        TaxDirection::Remove => format!("GST incl. ({}%)", rate_label(tax.details.rate)),
    };
    rows.push((label, app.config.format(tax.details.tax_amount), Style::default().fg(Color::LightBlue)));
    rows.push((
        "Item Total".to_string(),
        app.config.format(item.result),
        Style::default().add_modifier(Modifier::BOLD),
    ));
    rows
}

fn render_lines(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" Page {} ", app.ledger.current_page() + 1))
        .title_alignment(Alignment::Center);

    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    let page = app.ledger.page();
    if page.items.is_empty() {
        let empty_msg = Paragraph::new("No lines yet. Type an expression and press Enter.")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(empty_msg, inner_area);
        return;
    }

    let mut items = Vec::new();
    let mut start_indices = Vec::with_capacity(page.items.len());
    let wrap_width = inner_area.width.saturating_sub(4) as usize;

    for (i, item) in page.items.iter().enumerate() {
        start_indices.push(items.len());

        let is_selected = app.selected_line == Some(i);
        let base_style = Style::default()
            .fg(if is_selected { Color::Yellow } else { Color::Cyan });

        let expression = format_with_spaces(&item.expression);
        let shown = match item.tax {
            Some(tax) => tax.details.base,
            None => item.result,
        };

        for (line_idx, line) in wrap_text(&expression, wrap_width).into_iter().enumerate() {
            let mut spans = vec![];

            if line_idx == 0 {
                spans.push(Span::styled("> ", Style::default().fg(Color::Green)));
            } else {
                spans.push(Span::styled("  ", Style::default()));
            }
            spans.extend(highlight_expression(&line, base_style));

            if line_idx == 0 {
                spans.push(Span::styled(" = ", Style::default().fg(Color::Gray)));
                spans.push(Span::styled(
                    app.config.format(shown),
                    Style::default().fg(Color::LightMagenta).add_modifier(Modifier::BOLD)
                ));
            }

            items.push(ListItem::new(Line::from(spans)));
        }

        for (label, value, style) in tax_rows(item, app) {
            items.push(ListItem::new(Line::from(vec![
                Span::styled(format!("    {}: ", label), style),
                Span::styled(value, style),
            ])));
        }
    }
    app.item_start_indices = start_indices;

    if app.scroll_to_bottom {
        app.lines_scroll = items.len().saturating_sub(inner_area.height as usize);
        app.scroll_to_bottom = false;
    }
    app.lines_scroll = app.lines_scroll.min(items.len().saturating_sub(1));

    let selected_index = app
        .selected_line
        .and_then(|i| app.item_start_indices.get(i).copied());

    let list = List::new(items)
        .block(Block::default())
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

    let mut state = ListState::default()
        .with_selected(selected_index)
        .with_offset(app.lines_scroll);

    frame.render_stateful_widget(list, inner_area, &mut state);
}

fn render_details(frame: &mut Frame, app: &App, steps: &[tabcalc::Step], area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Steps ")
        .title_alignment(Alignment::Center);

    let lines: Vec<Line> = if steps.is_empty() {
        vec![Line::from(Span::styled("No steps to show", Style::default().fg(Color::DarkGray)))]
    } else {
        steps
            .iter()
            .enumerate()
            .map(|(j, step)| {
                Line::from(Span::styled(
                    format!("Step {}: {} = {}", j + 1, step.operation, app.config.format(step.result)),
                    Style::default().fg(Color::Magenta),
                ))
            })
            .collect()
    };

    // keep the last steps visible when there are more than fit
    let scroll = lines.len().saturating_sub(area.height.saturating_sub(2) as usize) as u16;
    frame.render_widget(Paragraph::new(lines).block(block).scroll((scroll, 0)), area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(status) = &app.status {
        let line = Line::from(Span::styled(status.as_str(), Style::default().fg(Color::Green)));
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    let keys = [
        ("Enter", "Commit"),
        ("Tab", "Page"),
        ("Up/Down", "Edit line"),
        ("F5-F7", "Tax"),
        ("Ctrl+G", "GST"),
        ("Ctrl+Y", "Copy"),
        ("F1", "Help"),
    ];

    let spans: Vec<Span> = keys
        .iter()
        .flat_map(|(key, desc)| {
            vec![
                Span::styled(
                    *key,
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(" {} ", desc),
                    Style::default().fg(Color::DarkGray),
                ),
            ]
        })
        .collect();

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_total(frame: &mut Frame, app: &App, area: Rect) {
    let rates: Vec<Span> = if app.ledger.gst_mode() {
        app.config
            .tax
            .rates
            .iter()
            .enumerate()
            .flat_map(|(i, rate)| {
                vec![
                    Span::styled(format!("F{}", i + 5), Style::default().fg(Color::Yellow)),
                    Span::styled(format!(" ±{}%  ", rate_label(*rate)), Style::default().fg(Color::DarkGray)),
                ]
            })
            .collect()
    } else {
        vec![
            Span::styled("F5", Style::default().fg(Color::Yellow)),
            Span::styled(
                format!(" ±{}%", rate_label(app.ledger.default_rate())),
                Style::default().fg(Color::DarkGray),
            ),
        ]
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Total ")
        .title(Title::from(Line::from(rates)).alignment(Alignment::Right));

    let total = Paragraph::new(Line::from(Span::styled(
        app.config.format(app.ledger.grand_total()),
        Style::default().fg(Color::LightGreen).add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Right)
    .block(block);

    frame.render_widget(total, area);
}

fn render_input(frame: &mut Frame, app: &mut App, area: Rect) {
    let title = match app.selected_line {
        Some(i) => format!(" Editing line {} ", i + 1),
        None => " Expression ".to_string(),
    };
    let preview = if app.input().is_empty() {
        String::new()
    } else {
        format!(" = {} ", app.config.format(app.ledger.live_preview()))
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if app.selected_line.is_some() { Color::Yellow } else { Color::DarkGray }))
        .title(title)
        .title(Title::from(Span::styled(preview, Style::default().fg(Color::LightMagenta))).alignment(Alignment::Right));

    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    let visible_width = (inner_area.width.saturating_sub(2)) as usize;
    let total_chars = app.input().chars().count();
    app.adjust_input_scroll(visible_width);

    let visible_input: String = app.input()
        .chars()
        .skip(app.input_scroll)
        .take(visible_width)
        .collect();

    let mut spans = vec![Span::raw("> ")];
    spans.extend(highlight_expression(&visible_input, Style::default()));
    frame.render_widget(Paragraph::new(Line::from(spans)), inner_area);

    let visible_cursor = app.cursor_position.saturating_sub(app.input_scroll);
    let byte_idx = super::app::App::char_index_to_byte_index(&visible_input, visible_cursor);
    let cursor_x = inner_area.x + 2 + visible_input[..byte_idx].width() as u16;
    let cursor_y = inner_area.y;
    frame.set_cursor(cursor_x, cursor_y);

    let scroll_indicator_style = Style::default().fg(Color::DarkGray);

    if app.input_scroll > 0 {
        let left_indicator = Paragraph::new("<").style(scroll_indicator_style);
        frame.render_widget(left_indicator, Rect::new(inner_area.x, inner_area.y, 1, 1));
    }

    if total_chars > app.input_scroll + visible_width {
        let right_indicator = Paragraph::new(">").style(scroll_indicator_style);
        frame.render_widget(
            right_indicator,
            Rect::new(inner_area.x + inner_area.width - 1, inner_area.y, 1, 1),
        );
    }
}
