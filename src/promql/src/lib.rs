//! PromQL expression parsing for dashboard migration.
//!
//! This crate recognizes the subset of PromQL that dashboard panels
//! actually contain and normalizes each expression into a flat
//! [`ParsedExpr`] record. It is deliberately not a full grammar: the
//! goal is a best-effort structural read that never fails, so that a
//! migration can proceed over any input.
//!
//! # Example
//! ```
//! use promql::{parse, AggOp, Func};
//!
//! let parsed = parse("sum by (method) (rate(http_requests_total[5m]))");
//! assert_eq!(parsed.agg, Some(AggOp::Sum));
//! assert_eq!(parsed.by, vec!["method"]);
//! assert_eq!(parsed.func, Some(Func::Rate));
//! assert_eq!(parsed.metric, "http_requests_total");
//! ```

pub mod parser;
pub mod types;

pub use parser::{parse, parse_label_set, split_csv};
pub use types::{AggOp, CmpOp, Comparison, Func, LabelMatcher, MatcherOp, ParsedExpr};
