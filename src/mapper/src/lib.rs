//! Conversion of Grafana dashboards into the SigNoz import format.
//!
//! [`convert`] drives the whole pipeline: panel ordering and grid packing,
//! panel-type mapping through [`Rules`], template-variable translation, and
//! per-panel query building. [`builder`] holds the expression-to-builder-query
//! mapping, the semantic core of the conversion.

pub mod builder;
pub mod convert;
pub mod rules;

pub use builder::{apply_replacements, build_query};
pub use convert::convert;
pub use rules::{Replacement, Rules, RulesError};

/// Returns `value` unless it is blank, in which case `fallback` is used.
pub(crate) fn non_empty(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
