//! Arithmetic expression evaluation.
//!
//! The pipeline is: glyph normalization, percentage rewrite, allow-list check,
//! tokenization, Shunting-Yard conversion to postfix, and a stack machine that
//! runs the postfix sequence. [`evaluate`] folds every failure into `0.0` so a
//! live preview can call it on each keystroke; [`try_evaluate`] keeps the error.

use crate::error::EvalError;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    /// Unary minus.
    Neg,
}

impl Op {
    fn precedence(self) -> u8 {
        match self {
            Op::Neg => 3,
            Op::Mul | Op::Div => 2,
            Op::Add | Op::Sub => 1,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Op::Add => '+',
            Op::Sub | Op::Neg => '-',
            Op::Mul => '*',
            Op::Div => '/',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token {
    Number(f64),
    Op(Op),
    LParen,
    RParen,
}

pub struct Step {
    pub operation: String,
    pub result: f64,
}

pub struct EvaluationTrace {
    pub steps: Vec<Step>,
    pub detailed_mode: bool,
}

impl EvaluationTrace {
    pub fn new(detailed_mode: bool) -> Self {
        EvaluationTrace {
            steps: Vec::new(),
            detailed_mode,
        }
    }

    pub fn add_step(&mut self, operation: String, result: f64) {
        if self.detailed_mode {
            self.steps.push(Step { operation, result });
        }
    }
}

/// Replaces the keypad glyphs `x` and `÷` with `*` and `/`.
pub fn normalize_glyphs(expr: &str) -> String {
    expr.chars()
        .map(|c| match c {
            'x' => '*',
            '÷' => '/',
            _ => c,
        })
        .collect()
}

fn is_numeral_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.'
}

fn is_decimal_numeral(s: &str) -> bool {
    s.chars().any(|c| c.is_ascii_digit()) && s.chars().filter(|&c| c == '.').count() <= 1
}

fn numeral_end(chars: &[char], start: usize) -> usize {
    let mut end = start;
    while end < chars.len() && is_numeral_char(chars[end]) {
        end += 1;
    }
    end
}

/// Rewrites percentage suffixes into plain arithmetic in one left-to-right pass.
///
/// `A+B%` and `A-B%` become `A+(A*(B/100))` and `A-(A*(B/100))`; any other
/// `N%` becomes `(N/100)`. Text produced by a substitution is never scanned
/// again. A `%` that does not follow a numeral is left alone.
pub fn rewrite_percentages(expr: &str) -> String {
    let chars: Vec<char> = expr.chars().collect();
    let mut out = String::with_capacity(expr.len());
    let mut i = 0;

    while i < chars.len() {
        if !is_numeral_char(chars[i]) {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        let a_end = numeral_end(&chars, i);
        let a: String = chars[i..a_end].iter().collect();

        if is_decimal_numeral(&a) && a_end < chars.len() && matches!(chars[a_end], '+' | '-') {
            let b_start = a_end + 1;
            let b_end = numeral_end(&chars, b_start);
            let b: String = chars[b_start..b_end].iter().collect();
            if is_decimal_numeral(&b) && chars.get(b_end) == Some(&'%') {
                out.push_str(&format!("{a}{}({a}*({b}/100))", chars[a_end]));
                i = b_end + 1;
                continue;
            }
        }

        if chars.get(a_end) == Some(&'%') {
            out.push_str(&format!("({a}/100)"));
            i = a_end + 1;
        } else {
            out.push_str(&a);
            i = a_end;
        }
    }
    out
}

fn check_allowed(expr: &str) -> Result<(), EvalError> {
    match expr
        .chars()
        .find(|&c| !(is_numeral_char(c) || "+-*/()".contains(c) || c.is_whitespace()))
    {
        Some(c) => Err(EvalError::UnknownCharacter(c)),
        None => Ok(()),
    }
}

fn flush_number(pending: &mut String, tokens: &mut Vec<Token>) -> Result<(), EvalError> {
    if pending.is_empty() {
        return Ok(());
    }
    let token = pending
        .parse::<f64>()
        .map(Token::Number)
        .map_err(|_| EvalError::InvalidNumber(pending.clone()))?;
    tokens.push(token);
    pending.clear();
    Ok(())
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut pending = String::new();

    for c in input.chars() {
        if is_numeral_char(c) {
            pending.push(c);
            continue;
        }
        flush_number(&mut pending, &mut tokens)?;

        match c {
            _ if c.is_whitespace() => {}
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            '+' => tokens.push(Token::Op(Op::Add)),
            '*' => tokens.push(Token::Op(Op::Mul)),
            '/' => tokens.push(Token::Op(Op::Div)),
            '-' => {
                let unary = matches!(tokens.last(), None | Some(Token::Op(_)) | Some(Token::LParen));
                tokens.push(Token::Op(if unary { Op::Neg } else { Op::Sub }));
            }
            _ => return Err(EvalError::UnknownCharacter(c)),
        }
    }
    flush_number(&mut pending, &mut tokens)?;

    Ok(tokens)
}

/// Shunting-Yard conversion. Unmatched parentheses in either direction are dropped.
pub fn to_postfix(tokens: &[Token]) -> Vec<Token> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut stack: Vec<Token> = Vec::new();

    for &token in tokens {
        match token {
            Token::Number(_) => output.push(token),
            Token::LParen => stack.push(token),
            Token::RParen => {
                while let Some(top) = stack.pop() {
                    if top == Token::LParen {
                        break;
                    }
                    output.push(top);
                }
            }
            Token::Op(op) => {
                // equal precedence pops, unary minus included
                while let Some(&Token::Op(top)) = stack.last() {
                    if top.precedence() < op.precedence() {
                        break;
                    }
                    output.push(Token::Op(top));
                    stack.pop();
                }
                stack.push(token);
            }
        }
    }

    while let Some(top) = stack.pop() {
        if top != Token::LParen {
            output.push(top);
        }
    }
    output
}

fn apply(op: Op, a: f64, b: f64) -> f64 {
    match op {
        Op::Add => a + b,
        Op::Sub => a - b,
        Op::Mul => a * b,
        Op::Div if b == 0.0 => 0.0,
        Op::Div => a / b,
        Op::Neg => -b,
    }
}

/// Runs a postfix sequence on a value stack.
pub fn eval_postfix(postfix: &[Token], trace: &mut EvaluationTrace) -> Result<f64, EvalError> {
    if postfix.is_empty() {
        return Err(EvalError::Empty);
    }

    let mut stack: Vec<f64> = Vec::with_capacity(postfix.len());
    for token in postfix {
        match *token {
            Token::Number(n) => stack.push(n),
            Token::Op(Op::Neg) => {
                let a = stack.pop().ok_or(EvalError::StackUnderflow)?;
                let result = -a;
                trace.add_step(format!("-({})", a), result);
                stack.push(result);
            }
            Token::Op(op) => {
                let b = stack.pop().ok_or(EvalError::StackUnderflow)?;
                let a = stack.pop().ok_or(EvalError::StackUnderflow)?;
                let result = apply(op, a, b);
                trace.add_step(format!("{} {} {}", a, op.symbol(), b), result);
                stack.push(result);
            }
            // to_postfix never emits parentheses
            Token::LParen | Token::RParen => {}
        }
    }

    match stack.as_slice() {
        [result] => Ok(*result),
        [] => Err(EvalError::Empty),
        rest => Err(EvalError::LeftoverOperands(rest.len())),
    }
}

pub fn evaluate_traced(expr: &str, trace: &mut EvaluationTrace) -> Result<f64, EvalError> {
    let rewritten = rewrite_percentages(&normalize_glyphs(expr));
    check_allowed(&rewritten)?;

    let tokens = tokenize(&rewritten)?;
    let postfix = to_postfix(&tokens);
    let result = eval_postfix(&postfix, trace)?;

    if result.is_finite() {
        Ok(result)
    } else {
        Err(EvalError::NonFinite(result))
    }
}

pub fn try_evaluate(expr: &str) -> Result<f64, EvalError> {
    evaluate_traced(expr, &mut EvaluationTrace::new(false))
}

/// Evaluates `expr`, returning `0.0` for empty, malformed or non-finite input.
pub fn evaluate(expr: &str) -> f64 {
    match try_evaluate(expr) {
        Ok(result) => result,
        Err(e) => {
            debug!(expr, error = %e, "expression evaluated to zero");
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn postfix_of(expr: &str) -> Vec<Token> {
        to_postfix(&tokenize(expr).unwrap())
    }

    #[test]
    fn test_precedence() {
        assert_eq!(evaluate("2+3*4"), 14.0);
        assert_eq!(evaluate("(2+3)*4"), 20.0);
        assert_eq!(evaluate("8/4*2"), 4.0);
    }

    #[test]
    fn test_left_associativity() {
        assert_eq!(evaluate("10-3-2"), 5.0);
        assert_eq!(evaluate("64/4/2"), 8.0);
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(evaluate("-5+3"), -2.0);
        assert_eq!(evaluate("3*-2"), -6.0);
        assert_eq!(evaluate("-(2+3)"), -5.0);
        assert_eq!(evaluate("2--3"), 5.0);
        assert_eq!(evaluate("3*--2"), 6.0);
    }

    #[test]
    fn test_leading_double_minus_is_malformed() {
        assert_eq!(
            postfix_of("--5"),
            vec![Token::Op(Op::Neg), Token::Number(5.0), Token::Op(Op::Neg)]
        );
        assert_eq!(try_evaluate("--5"), Err(EvalError::StackUnderflow));
        assert_eq!(evaluate("--5"), 0.0);
    }

    #[test]
    fn test_tokenize_classifies_minus() {
        assert_eq!(
            tokenize("-1-(-2)").unwrap(),
            vec![
                Token::Op(Op::Neg),
                Token::Number(1.0),
                Token::Op(Op::Sub),
                Token::LParen,
                Token::Op(Op::Neg),
                Token::Number(2.0),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_tokenize_whitespace_splits_numbers() {
        assert_eq!(
            tokenize(" 12  3 ").unwrap(),
            vec![Token::Number(12.0), Token::Number(3.0)]
        );
        assert_eq!(try_evaluate("12 3"), Err(EvalError::LeftoverOperands(2)));
    }

    #[test]
    fn test_tokenize_rejects() {
        assert_eq!(tokenize("2^3"), Err(EvalError::UnknownCharacter('^')));
        assert_eq!(tokenize("1.2.3"), Err(EvalError::InvalidNumber("1.2.3".to_string())));
    }

    #[test]
    fn test_postfix_order() {
        assert_eq!(
            postfix_of("1+2*3"),
            vec![
                Token::Number(1.0),
                Token::Number(2.0),
                Token::Number(3.0),
                Token::Op(Op::Mul),
                Token::Op(Op::Add),
            ]
        );
        assert_eq!(
            postfix_of("(1+2"),
            vec![Token::Number(1.0), Token::Number(2.0), Token::Op(Op::Add)]
        );
    }

    #[test]
    fn test_rewrite_percentages() {
        assert_eq!(rewrite_percentages("100-5%"), "100-(100*(5/100))");
        assert_eq!(rewrite_percentages("100+5%+10%"), "100+(100*(5/100))+(10/100)");
        assert_eq!(rewrite_percentages("50*10%"), "50*(10/100)");
        assert_eq!(rewrite_percentages("2*5+3%"), "2*5+(5*(3/100))");
        assert_eq!(rewrite_percentages("10-5-2%"), "10-5-(5*(2/100))");
        assert_eq!(rewrite_percentages("12.5+2.5%"), "12.5+(12.5*(2.5/100))");
        assert_eq!(rewrite_percentages("100 + 5%"), "100 + (5/100)");
        assert_eq!(rewrite_percentages("(5)%"), "(5)%");
    }

    #[test]
    fn test_percentages() {
        assert_eq!(evaluate("50%"), 0.5);
        assert_eq!(evaluate("50*10%"), 5.0);
        assert_eq!(evaluate("100+5%"), 105.0);
        assert_eq!(evaluate("100-5%"), 95.0);
        assert_eq!(evaluate("200-10%"), 180.0);
        assert_eq!(evaluate("200x10%"), 20.0);
    }

    #[test]
    fn test_stray_percent_is_rejected() {
        assert_eq!(try_evaluate("%5"), Err(EvalError::UnknownCharacter('%')));
        assert_eq!(evaluate("(5)%"), 0.0);
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(evaluate("5/0"), 0.0);
        assert_eq!(evaluate("1+5/0"), 1.0);
        assert_eq!(evaluate("5/(2-2)+3"), 3.0);
    }

    #[test]
    fn test_malformed_is_zero() {
        for expr in ["", "   ", "5+", "+", "abc", "5//2", "()", "*3", "1 2"] {
            assert_eq!(evaluate(expr), 0.0, "expression {:?}", expr);
        }
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(try_evaluate("abc").unwrap_err().kind(), ErrorKind::LexicalReject);
        assert_eq!(try_evaluate("5+").unwrap_err().kind(), ErrorKind::StructuralMalformed);
        assert_eq!(try_evaluate("").unwrap_err(), EvalError::Empty);
        assert_eq!(try_evaluate("5//2"), Err(EvalError::StackUnderflow));
    }

    #[test]
    fn test_non_finite_is_zero() {
        let huge = format!("1{}", "0".repeat(400));
        assert!(matches!(try_evaluate(&huge), Err(EvalError::NonFinite(_))));
        assert_eq!(evaluate(&huge), 0.0);
    }

    #[test]
    fn test_tolerant_parentheses() {
        assert_eq!(evaluate("(5+3"), 8.0);
        assert_eq!(evaluate("5+3)"), 8.0);
        assert_eq!(evaluate("((2+3)*2"), 10.0);
    }

    #[test]
    fn test_glyphs() {
        assert_eq!(evaluate("6x7"), 42.0);
        assert_eq!(evaluate("6÷3"), 2.0);
        assert_eq!(normalize_glyphs("2x3÷4"), "2*3/4");
    }

    #[test]
    fn test_decimals() {
        assert_eq!(evaluate(".5+.25"), 0.75);
        assert_eq!(evaluate("1.+1"), 2.0);
        assert_eq!(evaluate("0.1+0.2"), 0.1 + 0.2);
    }

    #[test]
    fn test_trace_steps() {
        let mut trace = EvaluationTrace::new(true);
        let result = evaluate_traced("2+3*4", &mut trace).unwrap();
        assert_eq!(result, 14.0);
        let ops: Vec<&str> = trace.steps.iter().map(|s| s.operation.as_str()).collect();
        assert_eq!(ops, vec!["3 * 4", "2 + 12"]);

        let mut quiet = EvaluationTrace::new(false);
        evaluate_traced("2+3*4", &mut quiet).unwrap();
        assert!(quiet.steps.is_empty());
    }

    #[test]
    fn test_repeatable() {
        let expr = "(12.5+7.5)*3-10%";
        assert_eq!(evaluate(expr), evaluate(expr));
    }
}
