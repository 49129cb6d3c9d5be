//! Types produced by the expression parser.
//!
//! A [`ParsedExpr`] is a flat, normalized view of one dashboard query
//! expression: the base metric, its selector, and whatever wrapping
//! (functions, aggregation, offset, comparison) was recognized around it.

/// Label matcher operators matching Prometheus semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherOp {
    /// Exact string match (=)
    Equal,
    /// Not equal (!=)
    NotEqual,
    /// Regex match (=~)
    RegexMatch,
    /// Regex not match (!~)
    RegexNotMatch,
}

impl std::fmt::Display for MatcherOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::RegexMatch => write!(f, "=~"),
            Self::RegexNotMatch => write!(f, "!~"),
        }
    }
}

/// A single label matcher from a selector, e.g. `code="200"`.
///
/// Matchers keep the insertion order of the source selector; duplicate
/// label names are preserved, not merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMatcher {
    /// Label name
    pub name: String,
    /// Match operation
    pub op: MatcherOp,
    /// Value to match against, without the surrounding quotes
    pub value: String,
}

impl LabelMatcher {
    /// Create a new equality matcher
    pub fn equal(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            op: MatcherOp::Equal,
            value: value.to_string(),
        }
    }

    /// Create a new not-equal matcher
    pub fn not_equal(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            op: MatcherOp::NotEqual,
            value: value.to_string(),
        }
    }

    /// Create a new regex matcher
    pub fn regex_match(name: &str, pattern: &str) -> Self {
        Self {
            name: name.to_string(),
            op: MatcherOp::RegexMatch,
            value: pattern.to_string(),
        }
    }

    /// Create a new regex not-match matcher
    pub fn regex_not_match(name: &str, pattern: &str) -> Self {
        Self {
            name: name.to_string(),
            op: MatcherOp::RegexNotMatch,
            value: pattern.to_string(),
        }
    }
}

/// Functions the parser recognizes around a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Rate,
    Irate,
    Increase,
    HistogramQuantile,
}

impl Func {
    /// The function name as written in an expression.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rate => "rate",
            Self::Irate => "irate",
            Self::Increase => "increase",
            Self::HistogramQuantile => "histogram_quantile",
        }
    }

    /// Whether this is one of the counter-rate functions
    /// (`rate`, `irate`, `increase`).
    pub fn is_rate_family(&self) -> bool {
        matches!(self, Self::Rate | Self::Irate | Self::Increase)
    }
}

impl std::fmt::Display for Func {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregation operators the parser recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggOp {
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

impl AggOp {
    /// The operator name as written in an expression.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count",
        }
    }
}

impl std::fmt::Display for AggOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison operators accepted after an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

impl CmpOp {
    /// The operator as written in an expression.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }
}

impl std::fmt::Display for CmpOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trailing scalar comparison, e.g. `> bool 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    /// Comparison operator
    pub op: CmpOp,
    /// Right-hand operand, a numeric literal kept as written
    pub value: String,
    /// Whether the `bool` modifier was present
    pub is_bool: bool,
}

/// Normalized parse of one query expression.
///
/// Every field is optional in the sense that an absent construct leaves
/// it empty; only `metric` is always populated for non-empty input (an
/// unrecognized expression degrades to the whole string as the metric).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedExpr {
    /// Base metric identifier
    pub metric: String,
    /// Selector constraints on the metric, in source order
    pub labels: Vec<LabelMatcher>,
    /// Outermost recognized function
    pub func: Option<Func>,
    /// Function wrapped by `histogram_quantile`, if any
    pub inner_func: Option<Func>,
    /// Bracketed range token, verbatim (e.g. `[5m]`)
    pub range: String,
    /// Outer aggregation operator
    pub agg: Option<AggOp>,
    /// Grouping label names, insertion order preserved
    pub by: Vec<String>,
    /// Numeric literal argument to `histogram_quantile`
    pub quantile: String,
    /// Trailing offset duration, verbatim (e.g. `1m`)
    pub offset: String,
    /// Trailing scalar comparison
    pub cmp: Option<Comparison>,
}

impl ParsedExpr {
    /// A record carrying only a metric name, all other fields empty.
    pub fn bare(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            ..Self::default()
        }
    }

    /// Append a grouping label unless it is already present.
    pub fn push_by(&mut self, label: &str) {
        if !self.by.iter().any(|b| b == label) {
            self.by.push(label.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matcher_op_display() {
        assert_eq!(format!("{}", MatcherOp::Equal), "=");
        assert_eq!(format!("{}", MatcherOp::NotEqual), "!=");
        assert_eq!(format!("{}", MatcherOp::RegexMatch), "=~");
        assert_eq!(format!("{}", MatcherOp::RegexNotMatch), "!~");
    }

    #[test]
    fn test_func_rate_family() {
        assert!(Func::Rate.is_rate_family());
        assert!(Func::Irate.is_rate_family());
        assert!(Func::Increase.is_rate_family());
        assert!(!Func::HistogramQuantile.is_rate_family());
    }

    #[test]
    fn test_cmp_op_display() {
        assert_eq!(CmpOp::Ge.as_str(), ">=");
        assert_eq!(format!("{}", CmpOp::Ne), "!=");
    }

    #[test]
    fn test_push_by_deduplicates() {
        let mut parsed = ParsedExpr::bare("m");
        parsed.push_by("le");
        parsed.push_by("code");
        parsed.push_by("le");
        assert_eq!(parsed.by, vec!["le", "code"]);
    }
}
