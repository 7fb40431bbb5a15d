//! Pages of committed lines and the running total.
//!
//! The ledger owns the input buffer. While no committed line is selected the
//! buffer is the "active line" whose live preview counts toward the total;
//! after [`Ledger::select_item`] edits go straight into the selected line.

use crate::calc_engine::evaluate;
use crate::tax::{self, TaxDirection, TaxLine};
use tracing::{debug, info};

const UNDO_DEPTH: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub id: u64,
    pub expression: String,
    pub result: f64,
    pub tax: Option<TaxLine>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<LineItem>,
}

impl Page {
    pub fn total(&self) -> f64 {
        self.items.iter().map(|item| item.result).sum()
    }
}

#[derive(Debug, Clone)]
pub struct Ledger {
    pages: Vec<Page>,
    current_page: usize,
    input: String,
    active_item: Option<u64>,
    next_id: u64,
    gst_mode: bool,
    default_rate: f64,
    undo_stack: Vec<Vec<Page>>,
}

impl Ledger {
    pub fn new(page_count: usize, default_rate: f64) -> Self {
        Ledger {
            pages: vec![Page::default(); page_count.max(1)],
            current_page: 0,
            input: String::new(),
            active_item: None,
            next_id: 1,
            gst_mode: false,
            default_rate,
            undo_stack: Vec::new(),
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self) -> &Page {
        &self.pages[self.current_page]
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn active_item(&self) -> Option<u64> {
        self.active_item
    }

    pub fn gst_mode(&self) -> bool {
        self.gst_mode
    }

    pub fn toggle_gst_mode(&mut self) {
        self.gst_mode = !self.gst_mode;
    }

    pub fn set_gst_mode(&mut self, on: bool) {
        self.gst_mode = on;
    }

    pub fn default_rate(&self) -> f64 {
        self.default_rate
    }

    fn active_index(&self) -> Option<usize> {
        let id = self.active_item?;
        self.page().items.iter().position(|item| item.id == id)
    }

    fn snapshot(&mut self) {
        if self.undo_stack.len() == UNDO_DEPTH {
            self.undo_stack.remove(0);
        }
        self.undo_stack.push(self.pages.clone());
    }

    fn take_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn reset_input(&mut self) {
        self.input.clear();
        self.active_item = None;
    }

    /// Replaces the input buffer. A selected line follows the edit and loses
    /// its tax breakdown.
    pub fn set_input(&mut self, input: &str) {
        self.input = input.to_string();
        if let Some(idx) = self.active_index() {
            let result = evaluate(&self.input);
            let item = &mut self.pages[self.current_page].items[idx];
            item.expression = self.input.clone();
            item.result = result;
            item.tax = None;
        }
    }

    /// Inserts `text` at char position `pos`, returning the new cursor position.
    pub fn insert_str(&mut self, pos: usize, text: &str) -> usize {
        let mut chars: Vec<char> = self.input.chars().collect();
        let pos = pos.min(chars.len());
        chars.splice(pos..pos, text.chars());
        let input: String = chars.into_iter().collect();
        self.set_input(&input);
        pos + text.chars().count()
    }

    /// Deletes the char before `pos`, returning the new cursor position.
    pub fn delete_before(&mut self, pos: usize) -> usize {
        let mut chars: Vec<char> = self.input.chars().collect();
        let pos = pos.min(chars.len());
        if pos == 0 {
            return 0;
        }
        chars.remove(pos - 1);
        let input: String = chars.into_iter().collect();
        self.set_input(&input);
        pos - 1
    }

    pub fn live_preview(&self) -> f64 {
        if self.input.is_empty() {
            0.0
        } else {
            evaluate(&self.input)
        }
    }

    /// Finishes editing a selected line, or appends the input as a new line.
    pub fn commit(&mut self) -> Option<u64> {
        if let Some(id) = self.active_item {
            self.reset_input();
            return Some(id);
        }
        if self.input.is_empty() {
            return None;
        }

        self.snapshot();
        let id = self.take_id();
        let result = evaluate(&self.input);
        debug!(id, expression = %self.input, result, "committed line");
        self.pages[self.current_page].items.push(LineItem {
            id,
            expression: std::mem::take(&mut self.input),
            result,
            tax: None,
        });
        Some(id)
    }

    /// Evaluates the input as a base amount and commits it with tax applied.
    pub fn commit_with_tax(&mut self, direction: TaxDirection, rate: Option<f64>) -> Option<u64> {
        if self.input.is_empty() {
            return None;
        }
        let rate = rate.unwrap_or(self.default_rate);
        let base = evaluate(&self.input);
        let (total, details) = tax::apply(base, rate, direction);

        self.snapshot();
        let selected = self.active_index().zip(self.active_item);
        let id = match selected {
            Some((_, id)) => id,
            None => self.take_id(),
        };
        let item = LineItem {
            id,
            expression: std::mem::take(&mut self.input),
            result: total,
            tax: Some(TaxLine { direction, details }),
        };
        debug!(id, base, rate, total, "committed taxed line");

        // a selected line is replaced in place
        let items = &mut self.pages[self.current_page].items;
        match selected {
            Some((idx, _)) => items[idx] = item,
            None => items.push(item),
        }
        self.active_item = None;
        Some(id)
    }

    /// Starts editing a committed line of the current page.
    pub fn select_item(&mut self, id: u64) -> bool {
        match self.page().items.iter().find(|item| item.id == id) {
            Some(item) => {
                self.input = item.expression.clone();
                self.active_item = Some(id);
                true
            }
            None => false,
        }
    }

    pub fn deselect(&mut self) {
        self.reset_input();
    }

    /// Clears the input, or drops the last line when the input is already empty.
    pub fn clear_line(&mut self) {
        if !self.input.is_empty() {
            self.set_input("");
        } else if !self.page().items.is_empty() {
            self.snapshot();
            let removed = self.pages[self.current_page].items.pop();
            if removed.map(|item| item.id) == self.active_item {
                self.active_item = None;
            }
        }
    }

    pub fn clear_all(&mut self) {
        self.snapshot();
        self.pages[self.current_page].items.clear();
        self.reset_input();
        info!(page = self.current_page, "cleared page");
    }

    pub fn switch_page(&mut self, idx: usize) -> bool {
        if idx >= self.pages.len() {
            return false;
        }
        self.current_page = idx;
        self.reset_input();
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.switch_page(self.current_page + 1)
    }

    pub fn prev_page(&mut self) -> bool {
        match self.current_page.checked_sub(1) {
            Some(idx) => self.switch_page(idx),
            None => false,
        }
    }

    pub fn page_total(&self) -> f64 {
        self.page().total()
    }

    /// Page total plus the live preview of an uncommitted input.
    pub fn grand_total(&self) -> f64 {
        match self.active_item {
            Some(_) => self.page_total(),
            None => self.page_total() + self.live_preview(),
        }
    }

    pub fn undo(&mut self) -> bool {
        match self.undo_stack.pop() {
            Some(pages) => {
                self.pages = pages;
                if self.active_index().is_none() {
                    self.active_item = None;
                }
                true
            }
            None => false,
        }
    }

    /// What the `()` key inserts for the current input.
    pub fn paren_for_input(&self) -> &'static str {
        let open = self.input.matches('(').count();
        let close = self.input.matches(')').count();
        let last = self.input.chars().last();

        if open > close && !matches!(last, Some('(' | '+' | '-' | 'x' | '÷')) {
            ")"
        } else if matches!(last, Some(c) if c.is_ascii_digit() || c == ')') {
            "x("
        } else {
            "("
        }
    }
}

/// Strips everything but digits and operators from pasted text.
pub fn sanitize_paste(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_digit() || ".+-*/()%".contains(*c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> Ledger {
        Ledger::new(4, 18.0)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_commit_and_total() {
        let mut l = ledger();
        l.set_input("2+3");
        assert_eq!(l.live_preview(), 5.0);
        assert_eq!(l.grand_total(), 5.0);

        let id = l.commit().unwrap();
        assert_eq!(l.input(), "");
        assert_eq!(l.page().items[0].id, id);
        assert_eq!(l.page().items[0].result, 5.0);

        l.set_input("10%");
        assert_eq!(l.page_total(), 5.0);
        assert!(close(l.grand_total(), 5.1));
    }

    #[test]
    fn test_empty_commit_is_noop() {
        let mut l = ledger();
        assert_eq!(l.commit(), None);
        assert!(l.page().items.is_empty());
    }

    #[test]
    fn test_malformed_line_counts_as_zero() {
        let mut l = ledger();
        l.set_input("5+");
        l.commit();
        assert_eq!(l.page().items[0].result, 0.0);
        assert_eq!(l.grand_total(), 0.0);
    }

    #[test]
    fn test_gst_end_to_end() {
        let mut l = ledger();
        l.set_input("1000");
        let id = l.commit_with_tax(TaxDirection::Add, None).unwrap();
        let item = &l.page().items[0];
        assert_eq!(item.id, id);
        assert_eq!(item.expression, "1000");
        assert!(close(item.result, 1180.0));
        let tax = item.tax.unwrap();
        assert_eq!(tax.details.base, 1000.0);
        assert!(close(tax.details.tax_amount, 180.0));
        assert!(close(l.grand_total(), 1180.0));
    }

    #[test]
    fn test_tax_remove_with_rate() {
        let mut l = ledger();
        l.set_input("105");
        l.commit_with_tax(TaxDirection::Remove, Some(5.0));
        assert!(close(l.page_total(), 100.0));
        assert_eq!(l.commit_with_tax(TaxDirection::Add, None), None);
    }

    #[test]
    fn test_edit_selected_line() {
        let mut l = ledger();
        l.set_input("1000");
        let id = l.commit_with_tax(TaxDirection::Add, None).unwrap();
        l.set_input("7");

        assert!(l.select_item(id));
        assert_eq!(l.input(), "1000");
        // live preview of the selected line is already part of the page
        assert!(close(l.grand_total(), 1180.0));

        let cursor = l.insert_str(4, "0");
        assert_eq!(cursor, 5);
        assert_eq!(l.page().items[0].expression, "10000");
        assert_eq!(l.page().items[0].result, 10000.0);
        assert!(l.page().items[0].tax.is_none());

        assert_eq!(l.commit(), Some(id));
        assert_eq!(l.active_item(), None);
        assert_eq!(l.input(), "");
        assert_eq!(l.page().items.len(), 1);
    }

    #[test]
    fn test_tax_on_selected_line_replaces_it() {
        let mut l = ledger();
        l.set_input("50");
        l.commit();
        l.set_input("200");
        let id = l.commit().unwrap();

        l.select_item(id);
        assert_eq!(l.commit_with_tax(TaxDirection::Add, Some(5.0)), Some(id));
        assert_eq!(l.page().items.len(), 2);
        assert!(close(l.page().items[1].result, 210.0));
        assert_eq!(l.active_item(), None);
        assert!(close(l.grand_total(), 260.0));
    }

    #[test]
    fn test_delete_before() {
        let mut l = ledger();
        l.set_input("12÷3");
        assert_eq!(l.delete_before(0), 0);
        assert_eq!(l.delete_before(3), 2);
        assert_eq!(l.input(), "123");
        assert_eq!(l.delete_before(99), 2);
        assert_eq!(l.input(), "12");
    }

    #[test]
    fn test_clear_line() {
        let mut l = ledger();
        l.set_input("4");
        l.commit();
        l.set_input("9");
        l.clear_line();
        assert_eq!(l.input(), "");
        assert_eq!(l.page().items.len(), 1);
        l.clear_line();
        assert!(l.page().items.is_empty());
        l.clear_line();
        assert!(l.page().items.is_empty());
    }

    #[test]
    fn test_pages_are_independent() {
        let mut l = ledger();
        l.set_input("10");
        l.commit();
        l.set_input("99");
        assert!(l.next_page());
        assert_eq!(l.input(), "");
        assert_eq!(l.grand_total(), 0.0);
        l.set_input("3");
        l.commit();
        assert_eq!(l.page_total(), 3.0);

        assert!(l.prev_page());
        assert_eq!(l.page_total(), 10.0);
        assert!(!l.prev_page());
        assert!(!l.switch_page(4));
        assert!(l.switch_page(3));
        assert!(!l.next_page());
    }

    #[test]
    fn test_clear_all_and_undo() {
        let mut l = ledger();
        for expr in ["1", "2", "3"] {
            l.set_input(expr);
            l.commit();
        }
        l.clear_all();
        assert_eq!(l.page_total(), 0.0);

        assert!(l.undo());
        assert_eq!(l.page_total(), 6.0);
        assert!(l.undo());
        assert_eq!(l.page_total(), 3.0);
        assert!(l.undo());
        assert!(l.undo());
        assert!(!l.undo());
        assert!(l.page().items.is_empty());
    }

    #[test]
    fn test_undo_drops_stale_selection() {
        let mut l = ledger();
        l.set_input("8");
        let id = l.commit().unwrap();
        l.select_item(id);
        l.undo();
        assert_eq!(l.active_item(), None);
    }

    #[test]
    fn test_paren_for_input() {
        let mut l = ledger();
        assert_eq!(l.paren_for_input(), "(");
        l.set_input("5");
        assert_eq!(l.paren_for_input(), "x(");
        l.set_input("5x(2");
        assert_eq!(l.paren_for_input(), ")");
        l.set_input("5x(2+");
        assert_eq!(l.paren_for_input(), "(");
        l.set_input("(2)");
        assert_eq!(l.paren_for_input(), "x(");
    }

    #[test]
    fn test_sanitize_paste() {
        assert_eq!(sanitize_paste("₹1,234.50 + 18%"), "1234.50+18%");
        assert_eq!(sanitize_paste("abc"), "");
    }

    #[test]
    fn test_at_least_one_page() {
        let l = Ledger::new(0, 18.0);
        assert_eq!(l.pages().len(), 1);
    }
}
