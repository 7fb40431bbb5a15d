use anyhow::{bail, Result};
use std::io::{stdin, stdout, Write};
use tabcalc::calc_engine::{evaluate_traced, EvaluationTrace};
use tabcalc::config::Config;
use tabcalc::ledger::Ledger;
use tabcalc::tax::TaxDirection;
use termion::{
    clear::CurrentLine as ClearLine,
    color,
    cursor::{DetectCursorPos, Goto},
    event::Key,
    input::TermRead,
    raw::IntoRawMode,
};
use unicode_width::UnicodeWidthStr;

const PROMPT: &str = "Expression: ";

// Функция для преобразования позиции символа в байтовую позицию
fn char_index_to_byte_index(s: &str, char_index: usize) -> usize {
    s.char_indices()
        .nth(char_index)
        .map(|(i, _)| i)
        .unwrap_or_else(|| s.len())
}

/// A committed line with an optional `@` tax suffix: `1000 @+`, `1180 @-5`.
#[derive(Debug, PartialEq)]
enum Entry<'a> {
    Plain(&'a str),
    Taxed(&'a str, TaxDirection, Option<f64>),
}

fn parse_entry(input: &str) -> Result<Entry<'_>> {
    let Some((expr, suffix)) = input.rsplit_once('@') else {
        return Ok(Entry::Plain(input));
    };

    let suffix = suffix.trim();
    let direction = match suffix.chars().next() {
        Some('+') => TaxDirection::Add,
        Some('-') => TaxDirection::Remove,
        _ => bail!("tax suffix must start with '+' or '-'"),
    };
    let rate = match suffix[1..].trim().trim_end_matches('%') {
        "" => None,
        rate => Some(rate.parse::<f64>().map_err(|_| anyhow::anyhow!("invalid rate '{}'", rate))?),
    };
    Ok(Entry::Taxed(expr.trim(), direction, rate))
}

pub fn run_line(config: Config) -> Result<()> {
    println!("tabcalc line mode");
    println!("Supports: +, -, * (x), / (÷), parentheses, 50%, 100+5%");
    println!("Tax: '1000 @+' adds {}% tax, '1180 @-5' takes 5% out", config.tax.default_rate);
    println!("Commands: total, list, page N, pop, undo, clear, details <expr>, quit");
    println!("\rNavigation: ←/→, Backspace/Delete, Home/End, ↑/↓ for history\n");

    let mut stdout = stdout().into_raw_mode()?;
    let mut ledger = Ledger::new(config.ledger.pages, config.tax.default_rate);
    let mut history: Vec<String> = Vec::new();
    let mut history_index = 0;

    loop {
        write!(stdout, "{}{}", ClearLine, PROMPT)?;
        stdout.flush()?;

        let mut expression = String::new();
        let mut cursor_pos = 0;  // позиция курсора в символах
        let (_, initial_y) = stdout.cursor_pos()?;

        let stdin = stdin();
        let mut keys = stdin.keys();

        loop {
            let preview = if expression.is_empty() {
                String::new()
            } else {
                ledger.set_input(&expression);
                format!("   = {}", config.format(ledger.live_preview()))
            };
            write!(
                stdout,
                "{}{}{}{}{}{}",
                Goto(1, initial_y),
                ClearLine,
                PROMPT,
                expression,
                color::Fg(color::LightBlack),
                preview
            )?;
            write!(stdout, "{}", color::Fg(color::Reset))?;

            let byte_pos = char_index_to_byte_index(&expression, cursor_pos);
            let column = 1 + PROMPT.len() + expression[..byte_pos].width();
            write!(stdout, "{}", Goto(column as u16, initial_y))?;
            stdout.flush()?;

            let key = match keys.next() {
                Some(key) => key?,
                None => return Ok(()),
            };
            match key {
                Key::Char('\n') => break,
                Key::Ctrl('c') | Key::Ctrl('d') => {
                    write!(stdout, "\r\nGoodbye!\r\n")?;
                    return Ok(());
                }
                Key::Char(c) => {
                    let byte_idx = char_index_to_byte_index(&expression, cursor_pos);
                    expression.insert(byte_idx, c);
                    cursor_pos += 1;
                }
                Key::Backspace if cursor_pos > 0 => {
                    cursor_pos -= 1;
                    let byte_idx = char_index_to_byte_index(&expression, cursor_pos);
                    if let Some(c) = expression[byte_idx..].chars().next() {
                        expression.drain(byte_idx..byte_idx + c.len_utf8());
                    }
                }
                Key::Delete if cursor_pos < expression.chars().count() => {
                    let byte_idx = char_index_to_byte_index(&expression, cursor_pos);
                    if let Some(c) = expression[byte_idx..].chars().next() {
                        expression.drain(byte_idx..byte_idx + c.len_utf8());
                    }
                }
                Key::Left if cursor_pos > 0 => cursor_pos -= 1,
                Key::Right if cursor_pos < expression.chars().count() => cursor_pos += 1,
                Key::Home => cursor_pos = 0,
                Key::End => cursor_pos = expression.chars().count(),
                Key::Up => {
                    if history_index > 0 {
                        history_index -= 1;
                        expression = history[history_index].clone();
                        cursor_pos = expression.chars().count();
                    }
                }
                Key::Down => {
                    if history_index < history.len().saturating_sub(1) {
                        history_index += 1;
                        expression = history[history_index].clone();
                        cursor_pos = expression.chars().count();
                    } else {
                        history_index = history.len();
                        expression.clear();
                        cursor_pos = 0;
                    }
                }
                _ => {}
            }
        }

        ledger.set_input("");
        let input = expression.trim();
        if input.is_empty() {
            write!(stdout, "\r\n")?;
            continue;
        }

        history.push(input.to_string());
        history_index = history.len();

        write!(stdout, "\r\n")?;
        for line in handle_input(&mut ledger, &config, input) {
            write!(stdout, "  {}\r\n", line)?;
        }
        write!(stdout, "\r\n")?;

        if matches!(input.to_lowercase().as_str(), "quit" | "exit" | "q") {
            return Ok(());
        }
    }
}

/// Applies one submitted line to the ledger and returns what to print.
fn handle_input(ledger: &mut Ledger, config: &Config, input: &str) -> Vec<String> {
    let lower = input.to_lowercase();
    let mut words = lower.split_whitespace();

    match (words.next(), words.next()) {
        (Some("quit" | "exit" | "q"), None) => return vec!["Goodbye!".to_string()],
        (Some("total"), None) => return vec![page_summary(ledger, config)],
        (Some("undo"), None) => {
            let msg = if ledger.undo() { "Undone" } else { "Nothing to undo" };
            return vec![msg.to_string(), page_summary(ledger, config)];
        }
        (Some("clear"), None) => {
            ledger.clear_all();
            return vec![page_summary(ledger, config)];
        }
        (Some("pop"), None) => {
            ledger.clear_line();
            return vec![page_summary(ledger, config)];
        }
        (Some("list"), None) => {
            let mut out: Vec<String> = ledger
                .page()
                .items
                .iter()
                .enumerate()
                .map(|(i, item)| format!("{:>3}. {} = {}", i + 1, item.expression, config.format(item.result)))
                .collect();
            out.push(page_summary(ledger, config));
            return out;
        }
        (Some("page"), Some(n)) => {
            return match n.parse::<usize>() {
                Ok(n) if n >= 1 && ledger.switch_page(n - 1) => vec![page_summary(ledger, config)],
                _ => vec![format!("Pages are numbered 1 to {}", ledger.pages().len())],
            };
        }
        (Some("page"), None) => return vec![format!("Usage: page N (1 to {})", ledger.pages().len())],
        (Some("details"), None) => return vec!["Usage: details <expr>".to_string()],
        (Some("details"), Some(_)) => {
            let expr = input["details".len()..].trim();
            let mut trace = EvaluationTrace::new(true);
            return match evaluate_traced(expr, &mut trace) {
                Ok(result) => {
                    let mut out: Vec<String> = trace
                        .steps
                        .iter()
                        .enumerate()
                        .map(|(i, step)| format!("Step {}: {} = {}", i + 1, step.operation, step.result))
                        .collect();
                    out.push(format!("{} = {}", expr, config.format(result)));
                    out
                }
                Err(e) => vec![format!("{} = Error: {}", expr, e)],
            };
        }
        _ => {}
    }

    let entry = match parse_entry(input) {
        Ok(entry) => entry,
        Err(e) => return vec![format!("Error: {}", e)],
    };

    let committed = match entry {
        Entry::Plain(expr) => {
            ledger.set_input(expr);
            ledger.commit()
        }
        Entry::Taxed(expr, direction, rate) => {
            ledger.set_input(expr);
            ledger.commit_with_tax(direction, rate)
        }
    };

    let Some(item) = committed.and_then(|id| ledger.page().items.iter().find(|item| item.id == id)) else {
        return vec!["Empty base, nothing committed".to_string(), page_summary(ledger, config)];
    };

    let mut out = vec![format!("{} = {}", item.expression, config.format(item.result))];
    if let Some(tax) = item.tax {
        out.push(format!(
            "base {}, tax {}% = {}",
            config.format(tax.details.base),
            tax.details.rate,
            config.format(tax.details.tax_amount)
        ));
    }
    out.push(page_summary(ledger, config));
    out
}

fn page_summary(ledger: &Ledger, config: &Config) -> String {
    format!(
        "Page {} total: {}",
        ledger.current_page() + 1,
        config.format(ledger.page_total())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Ledger, Config) {
        let config = Config::default();
        (Ledger::new(config.ledger.pages, config.tax.default_rate), config)
    }

    #[test]
    fn test_parse_entry() {
        assert_eq!(parse_entry("2+2").unwrap(), Entry::Plain("2+2"));
        assert_eq!(
            parse_entry("1000 @+").unwrap(),
            Entry::Taxed("1000", TaxDirection::Add, None)
        );
        assert_eq!(
            parse_entry("1180@-18%").unwrap(),
            Entry::Taxed("1180", TaxDirection::Remove, Some(18.0))
        );
        assert!(parse_entry("100 @x").is_err());
        assert!(parse_entry("100 @+abc").is_err());
    }

    #[test]
    fn test_commit_lines() {
        let (mut ledger, config) = setup();
        let out = handle_input(&mut ledger, &config, "100-5%");
        assert_eq!(out, vec!["100-5% = 95.00", "Page 1 total: 95.00"]);

        let out = handle_input(&mut ledger, &config, "1000 @+");
        assert_eq!(out[0], "1000 = 1,180.00");
        assert_eq!(out[2], "Page 1 total: 1,275.00");
    }

    #[test]
    fn test_commands() {
        let (mut ledger, config) = setup();
        handle_input(&mut ledger, &config, "7");
        assert_eq!(handle_input(&mut ledger, &config, "page 2"), vec!["Page 2 total: 0.00"]);
        assert_eq!(handle_input(&mut ledger, &config, "page 9"), vec!["Pages are numbered 1 to 4"]);
        handle_input(&mut ledger, &config, "page 1");
        assert_eq!(handle_input(&mut ledger, &config, "list"), vec!["  1. 7 = 7.00", "Page 1 total: 7.00"]);
        handle_input(&mut ledger, &config, "pop");
        assert_eq!(ledger.page_total(), 0.0);
        assert_eq!(handle_input(&mut ledger, &config, "undo")[1], "Page 1 total: 7.00");
    }

    #[test]
    fn test_empty_base_commits_nothing() {
        let (mut ledger, config) = setup();
        handle_input(&mut ledger, &config, "1000 @+");

        let out = handle_input(&mut ledger, &config, "@+");
        assert_eq!(out, vec!["Empty base, nothing committed", "Page 1 total: 1,180.00"]);
        assert_eq!(ledger.page().items.len(), 1);
    }

    #[test]
    fn test_commands_without_argument() {
        let (mut ledger, config) = setup();
        assert_eq!(handle_input(&mut ledger, &config, "page"), vec!["Usage: page N (1 to 4)"]);
        assert_eq!(handle_input(&mut ledger, &config, "details"), vec!["Usage: details <expr>"]);
        assert!(ledger.page().items.is_empty());
    }

    #[test]
    fn test_details() {
        let (mut ledger, config) = setup();
        let out = handle_input(&mut ledger, &config, "details 2+3x4");
        assert_eq!(out, vec!["Step 1: 3 * 4 = 12", "Step 2: 2 + 12 = 14", "2+3x4 = 14.00"]);
        assert!(ledger.page().items.is_empty());
    }
}
