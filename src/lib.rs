//! Calculator with a running tab.
//!
//! [`calc_engine`] evaluates arithmetic expressions; [`ledger`] keeps committed
//! lines on several pages and derives the running total.

pub mod calc_engine;
pub mod config;
pub mod error;
pub mod format;
pub mod ledger;
pub mod tax;

pub use calc_engine::{evaluate, evaluate_traced, try_evaluate, EvaluationTrace, Step};
pub use error::{ConfigError, ErrorKind, EvalError};
