use tabcalc::calc_engine::{evaluate_traced, EvaluationTrace, Step};
use tabcalc::config::Config;
use tabcalc::format::{format_number, DecimalPolicy, Grouping};
use tabcalc::ledger::{sanitize_paste, Ledger};
use tabcalc::tax::TaxDirection;

pub struct App {
    pub ledger: Ledger,
    pub config: Config,
    pub cursor_position: usize,
    pub input_scroll: usize,
    pub selected_line: Option<usize>,
    pub should_quit: bool,
    pub show_help: bool,
    pub help_scroll: usize,
    pub show_details: bool,
    pub list_height: usize,
    pub item_start_indices: Vec<usize>,
    pub lines_scroll: usize,
    pub scroll_to_bottom: bool,
    pub terminal_too_small: bool,
    pub status: Option<String>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let mut ledger = Ledger::new(config.ledger.pages, config.tax.default_rate);
        ledger.set_gst_mode(config.tax.gst_mode);
        App {
            ledger,
            config,
            cursor_position: 0,
            input_scroll: 0,
            selected_line: None,
            should_quit: false,
            show_help: false,
            help_scroll: 0,
            show_details: false,
            list_height: 5,
            item_start_indices: Vec::new(),
            lines_scroll: 0,
            scroll_to_bottom: false,
            terminal_too_small: false,
            status: None,
        }
    }

    pub fn input(&self) -> &str {
        self.ledger.input()
    }

    pub fn adjust_input_scroll(&mut self, visible_width: usize) {
        let total_chars = self.input().chars().count();
        let cursor_pos = self.cursor_position;

        if cursor_pos < self.input_scroll {
            self.input_scroll = cursor_pos;
        }
        else if cursor_pos >= self.input_scroll + visible_width {
            self.input_scroll = cursor_pos - visible_width + 1;
        }

        if self.input_scroll > total_chars.saturating_sub(visible_width) {
            self.input_scroll = total_chars.saturating_sub(visible_width);
        }
    }

    fn reset_cursor(&mut self) {
        self.cursor_position = 0;
        self.input_scroll = 0;
    }

    /// Enter: commits the input or finishes editing the selected line.
    pub fn submit(&mut self) {
        let input = self.input().trim().to_lowercase();
        match input.as_str() {
            "quit" | "exit" | "q" => {
                self.should_quit = true;
                return;
            }
            "help" => {
                self.show_help = true;
                self.ledger.set_input("");
                self.reset_cursor();
                return;
            }
            _ => {}
        }

        if self.ledger.commit().is_some() {
            self.selected_line = None;
            self.reset_cursor();
            self.scroll_to_bottom = true;
        }
    }

    /// Commits the input with tax at the configured rate `slot`.
    pub fn apply_tax(&mut self, slot: usize, direction: TaxDirection) {
        let rate = if self.ledger.gst_mode() {
            match self.config.tax.rates.get(slot) {
                Some(rate) => Some(*rate),
                None => return,
            }
        } else if slot == 0 {
            None
        } else {
            return;
        };

        if self.ledger.commit_with_tax(direction, rate).is_some() {
            self.selected_line = None;
            self.reset_cursor();
            self.scroll_to_bottom = true;
        }
    }

    pub fn insert_char(&mut self, c: char) {
        self.cursor_position = self.ledger.insert_str(self.cursor_position, &c.to_string());
    }

    pub fn insert_paren(&mut self) {
        let paren = self.ledger.paren_for_input();
        self.cursor_position = self.ledger.insert_str(self.cursor_position, paren);
    }

    pub fn paste(&mut self, text: &str) {
        let clean = sanitize_paste(text);
        if !clean.is_empty() {
            self.cursor_position = self.ledger.insert_str(self.cursor_position, &clean);
        }
    }

    pub fn backspace(&mut self) {
        self.cursor_position = self.ledger.delete_before(self.cursor_position);
    }

    pub fn delete(&mut self) {
        if self.cursor_position < self.input().chars().count() {
            self.cursor_position = self.ledger.delete_before(self.cursor_position + 1);
        }
    }

    pub fn move_cursor(&mut self, direction: i32) {
        match direction {
            -1 => self.cursor_position = self.cursor_position.saturating_sub(1),
            1 => self.cursor_position = (self.cursor_position + 1).min(self.input().chars().count()),
            _ => {}
        }
    }

    pub fn move_cursor_to_end(&mut self) {
        self.cursor_position = self.input().chars().count();
    }

    pub fn move_cursor_by_words(&mut self, direction: i32) {
        let input_chars: Vec<char> = self.input().chars().collect();
        let is_break = |c: char| c.is_whitespace() || "+-*/x÷".contains(c);
        let mut pos = self.cursor_position;

        if direction < 0 {
            while pos > 0 && is_break(input_chars[pos - 1]) {
                pos -= 1;
            }

            while pos > 0 && !is_break(input_chars[pos - 1]) {
                pos -= 1;
            }

            self.cursor_position = pos;
        } else {
            let len = input_chars.len();

            while pos < len && !is_break(input_chars[pos]) {
                pos += 1;
            }

            while pos < len && is_break(input_chars[pos]) {
                pos += 1;
            }

            self.cursor_position = pos.min(len);
        }
    }

    /// Up/Down: walks the committed lines of the page, loading each into the editor.
    pub fn navigate_lines(&mut self, direction: i32) {
        let count = self.ledger.page().items.len();
        if count == 0 {
            return;
        }

        let next = match (self.selected_line, direction < 0) {
            (None, true) => Some(count - 1),
            (None, false) => None,
            (Some(i), true) => Some(i.saturating_sub(1)),
            (Some(i), false) if i + 1 < count => Some(i + 1),
            (Some(_), false) => None,
        };

        match next {
            Some(i) => {
                let id = self.ledger.page().items[i].id;
                self.ledger.select_item(id);
                self.selected_line = Some(i);
                self.move_cursor_to_end();
            }
            None => self.stop_editing(),
        }
        self.scroll_to_bottom = false;
    }

    pub fn stop_editing(&mut self) {
        if self.ledger.active_item().is_some() {
            self.ledger.deselect();
        }
        self.selected_line = None;
        self.reset_cursor();
    }

    pub fn switch_page(&mut self, forward: bool) {
        let pages = self.ledger.pages().len();
        let current = self.ledger.current_page();
        let target = if forward { (current + 1) % pages } else { (current + pages - 1) % pages };
        self.ledger.switch_page(target);
        self.selected_line = None;
        self.reset_cursor();
        self.scroll_to_bottom = true;
    }

    /// Ctrl+U: clears the input, or drops the last line when it is empty.
    pub fn clear_input(&mut self) {
        self.ledger.clear_line();
        if self.ledger.active_item().is_none() {
            self.selected_line = None;
        }
        self.reset_cursor();
    }

    pub fn clear_page(&mut self) {
        self.ledger.clear_all();
        self.selected_line = None;
        self.reset_cursor();
        self.lines_scroll = 0;
    }

    pub fn undo(&mut self) {
        if self.ledger.undo() {
            self.selected_line = None;
            self.ledger.deselect();
            self.reset_cursor();
        }
    }

    /// Moves the help view by `delta` lines, keeping the last line reachable.
    pub fn scroll_help(&mut self, delta: i32, line_count: usize) {
        let max = line_count.saturating_sub(1);
        let target = if delta < 0 {
            self.help_scroll.saturating_sub(delta.unsigned_abs() as usize)
        } else {
            self.help_scroll.saturating_add(delta as usize)
        };
        self.help_scroll = target.min(max);
    }

    /// Grand total as a bare number, the way it is put on the clipboard.
    pub fn clipboard_total(&self) -> String {
        format_number(self.ledger.grand_total(), DecimalPolicy::Auto, Grouping::None)
    }

    /// Steps of the current input for the details panel.
    pub fn trace_steps(&self) -> Vec<Step> {
        let mut trace = EvaluationTrace::new(true);
        match evaluate_traced(self.input(), &mut trace) {
            Ok(_) => trace.steps,
            Err(_) => Vec::new(),
        }
    }

    pub fn char_index_to_byte_index(s: &str, char_index: usize) -> usize {
        s.char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or_else(|| s.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App::new(Config::default())
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            app.insert_char(c);
        }
    }

    #[test]
    fn test_help_scroll_is_clamped() {
        let mut app = app();
        for _ in 0..10_000 {
            app.scroll_help(10, 40);
        }
        assert_eq!(app.help_scroll, 39);
        app.scroll_help(-100, 40);
        assert_eq!(app.help_scroll, 0);
        app.scroll_help(1, 0);
        assert_eq!(app.help_scroll, 0);
    }

    #[test]
    fn test_clipboard_total() {
        let mut app = app();
        type_str(&mut app, "1000");
        app.apply_tax(0, TaxDirection::Add);
        type_str(&mut app, "234.5");
        assert_eq!(app.clipboard_total(), "1414.5");
        app.submit();
        assert_eq!(app.clipboard_total(), "1414.5");
    }

    #[test]
    fn test_typing_and_submit() {
        let mut app = app();
        type_str(&mut app, "2+3");
        assert_eq!(app.cursor_position, 3);
        assert_eq!(app.ledger.grand_total(), 5.0);
        app.submit();
        assert_eq!(app.input(), "");
        assert_eq!(app.cursor_position, 0);
        assert_eq!(app.ledger.page_total(), 5.0);
    }

    #[test]
    fn test_cursor_editing() {
        let mut app = app();
        type_str(&mut app, "12");
        app.move_cursor(-1);
        app.insert_char('5');
        assert_eq!(app.input(), "152");
        app.delete();
        assert_eq!(app.input(), "15");
        app.backspace();
        assert_eq!(app.input(), "1");
        assert_eq!(app.cursor_position, 1);
    }

    #[test]
    fn test_word_moves() {
        let mut app = app();
        type_str(&mut app, "120+35x4");
        app.move_cursor_by_words(-1);
        assert_eq!(app.cursor_position, 7);
        app.move_cursor_by_words(-1);
        assert_eq!(app.cursor_position, 4);
        app.move_cursor_by_words(1);
        assert_eq!(app.cursor_position, 7);
    }

    #[test]
    fn test_navigate_lines_edits_in_place() {
        let mut app = app();
        type_str(&mut app, "10");
        app.submit();
        type_str(&mut app, "20");
        app.submit();

        app.navigate_lines(-1);
        assert_eq!(app.selected_line, Some(1));
        assert_eq!(app.input(), "20");
        app.navigate_lines(-1);
        assert_eq!(app.input(), "10");
        app.insert_char('0');
        assert_eq!(app.ledger.page_total(), 120.0);

        app.navigate_lines(1);
        app.navigate_lines(1);
        assert_eq!(app.selected_line, None);
        assert_eq!(app.input(), "");
    }

    #[test]
    fn test_tax_slots() {
        let mut app = app();
        type_str(&mut app, "100");
        app.apply_tax(1, TaxDirection::Add);
        // outside GST mode only the default rate is bound
        assert_eq!(app.input(), "100");
        app.apply_tax(0, TaxDirection::Add);
        assert!((app.ledger.page_total() - 118.0).abs() < 1e-9);

        app.ledger.toggle_gst_mode();
        type_str(&mut app, "100");
        app.apply_tax(0, TaxDirection::Add);
        assert!((app.ledger.page_total() - 223.0).abs() < 1e-9);
    }

    #[test]
    fn test_switch_page_wraps() {
        let mut app = app();
        app.switch_page(false);
        assert_eq!(app.ledger.current_page(), 3);
        app.switch_page(true);
        assert_eq!(app.ledger.current_page(), 0);
    }

    #[test]
    fn test_paren_and_paste() {
        let mut app = app();
        type_str(&mut app, "5");
        app.insert_paren();
        assert_eq!(app.input(), "5x(");
        app.paste("1,000");
        app.insert_paren();
        assert_eq!(app.input(), "5x(1000)");
        assert_eq!(app.cursor_position, 8);
    }

    #[test]
    fn test_trace_steps() {
        let mut app = app();
        type_str(&mut app, "2x3+1");
        let steps = app.trace_steps();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].result, 7.0);
        type_str(&mut app, "+");
        assert!(app.trace_steps().is_empty());
    }

    #[test]
    fn test_quit_command() {
        let mut app = app();
        type_str(&mut app, "quit");
        app.submit();
        assert!(app.should_quit);
    }
}
