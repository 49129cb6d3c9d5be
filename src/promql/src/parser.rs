//! Shape-recognizing parser for the dashboard subset of PromQL.
//!
//! Dashboards use a narrow slice of the language, so instead of a full
//! grammar this parser tries a fixed sequence of shape recognizers, each
//! returning `Option<ParsedExpr>`:
//!
//! 1. trailing comparison: `<expr> <op> [bool] <number>`
//! 2. trailing offset: `<expr> offset <duration>`
//! 3. `histogram_quantile(<q>, <expr>)`
//! 4. aggregation: `agg(<expr>) by (labels)` or `agg by (labels) (<expr>)`
//! 5. rate-family leaf: `rate|irate|increase(metric{labels}[range])`
//! 6. plain leaf: `metric{labels}[range]`
//!
//! Balanced outer parentheses and scalar arithmetic (`expr * 100`,
//! `1024 / expr`) are stripped up front. Parsing never fails: input that
//! matches no shape degrades to a record carrying the whole trimmed
//! string as the metric name.

use crate::types::{AggOp, CmpOp, Comparison, Func, LabelMatcher, MatcherOp, ParsedExpr};

const CMP_OPS: [(&str, CmpOp); 6] = [
    (">=", CmpOp::Ge),
    ("<=", CmpOp::Le),
    ("==", CmpOp::Eq),
    ("!=", CmpOp::Ne),
    (">", CmpOp::Gt),
    ("<", CmpOp::Lt),
];

const AGG_OPS: [(&str, AggOp); 5] = [
    ("sum", AggOp::Sum),
    ("avg", AggOp::Avg),
    ("min", AggOp::Min),
    ("max", AggOp::Max),
    ("count", AggOp::Count),
];

const RATE_FUNCS: [(&str, Func); 3] = [
    ("rate", Func::Rate),
    ("irate", Func::Irate),
    ("increase", Func::Increase),
];

/// Parse a query expression into its normalized form.
///
/// Recognizers run in fixed precedence order; the first match wins and
/// recurses on its inner expression. Unrecognized input is returned as a
/// bare metric, never an error.
///
/// # Examples
/// ```
/// use promql::parse;
///
/// let parsed = parse("rate(http_requests_total{code=\"200\"}[5m])");
/// assert_eq!(parsed.metric, "http_requests_total");
/// assert_eq!(parsed.range, "[5m]");
/// ```
pub fn parse(expr: &str) -> ParsedExpr {
    let e = strip_outer_parens(expr.trim());
    let e = strip_arithmetic(e);

    if let Some(parsed) = try_comparison(e) {
        return parsed;
    }
    if let Some(parsed) = try_offset(e) {
        return parsed;
    }
    if let Some(parsed) = try_histogram_quantile(e) {
        return parsed;
    }
    if let Some(parsed) = try_aggregation(e) {
        return parsed;
    }
    if let Some(parsed) = try_rate_function(e) {
        return parsed;
    }
    if let Some(parsed) = try_selector(e) {
        return parsed;
    }
    ParsedExpr::bare(e)
}

/// Remove outer parentheses while the whole string is one balanced group.
///
/// A partial wrap like `(a) + (b)` is left alone: the leading paren must
/// close exactly at the final character for a strip to happen.
fn strip_outer_parens(mut s: &str) -> &str {
    loop {
        s = s.trim();
        let bytes = s.as_bytes();
        if bytes.len() < 2 || bytes[0] != b'(' || bytes[bytes.len() - 1] != b')' {
            return s;
        }
        if !is_single_group(s) {
            return s;
        }
        s = &s[1..s.len() - 1];
    }
}

/// Whether `s` is one `(...)` group whose opening paren closes at the end.
fn is_single_group(s: &str) -> bool {
    let mut depth = 0i32;
    for (i, b) in s.bytes().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
                if depth == 0 && i != s.len() - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Drop scalar arithmetic at paren depth 0, keeping the non-numeric side.
///
/// Scans left to right; at each top-level `* / + -` the split is taken as
/// soon as either side is a pure numeric literal. Chained arithmetic
/// between two non-literals is left untouched.
fn strip_arithmetic(s: &str) -> &str {
    let mut depth = 0i32;
    for (i, b) in s.bytes().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => {
                if depth > 0 {
                    depth -= 1;
                }
            }
            b'*' | b'/' | b'+' | b'-' if depth == 0 => {
                let left = s[..i].trim();
                let right = s[i + 1..].trim();
                if is_number(right) {
                    return strip_outer_parens(left);
                }
                if is_number(left) {
                    return strip_outer_parens(right);
                }
            }
            _ => {}
        }
    }
    s
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit() || b == b'.')
}

/// `<expr> <op> [bool] <number>` at the end of the string.
fn try_comparison(e: &str) -> Option<ParsedExpr> {
    // rightmost operator wins, so the recursive left side keeps any
    // earlier operators intact
    for i in (0..e.len()).rev() {
        if !e.is_char_boundary(i) {
            continue;
        }
        for (token, op) in CMP_OPS {
            if !e[i..].starts_with(token) {
                continue;
            }
            let Some(value) = comparison_rhs(&e[i + token.len()..]) else {
                continue;
            };
            let mut parsed = parse(e[..i].trim());
            parsed.cmp = Some(Comparison {
                op,
                value: value.to_string(),
                is_bool: e.contains(" bool "),
            });
            return Some(parsed);
        }
    }
    None
}

/// The tail after a comparison operator: optional `bool`, then a number
/// running to the end of the string.
fn comparison_rhs(s: &str) -> Option<&str> {
    let s = s.trim_start();
    let s = match s.strip_prefix("bool") {
        Some(rest) if rest.starts_with(char::is_whitespace) => rest.trim_start(),
        _ => s,
    };
    is_cmp_number(s).then_some(s)
}

/// Digits with at most one interior decimal point, e.g. `0`, `12.5`.
fn is_cmp_number(s: &str) -> bool {
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s, None),
    };
    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match frac_part {
        Some(f) => !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()),
        None => true,
    }
}

/// `<expr> offset <duration>`, split at the last `offset` keyword.
fn try_offset(e: &str) -> Option<ParsedExpr> {
    let i = e.rfind(" offset ")?;
    if i == 0 {
        return None;
    }
    let duration = e[i + " offset ".len()..].trim();
    let mut parsed = parse(e[..i].trim());
    parsed.offset = duration.to_string();
    Some(parsed)
}

/// `histogram_quantile(<q>, <expr>)` with the inner expression running to
/// the final closing parenthesis.
fn try_histogram_quantile(e: &str) -> Option<ParsedExpr> {
    let rest = e.strip_prefix("histogram_quantile")?;
    let rest = rest.trim_start().strip_prefix('(')?;
    let rest = rest.trim_start();
    let q_len = quantile_token(rest)?;
    let quantile = &rest[..q_len];
    let rest = rest[q_len..].trim_start().strip_prefix(',')?;
    let inner = rest.strip_suffix(')')?;
    if inner.trim().is_empty() {
        return None;
    }

    let mut parsed = parse(inner);
    parsed.inner_func = parsed.func.take();
    parsed.func = Some(Func::HistogramQuantile);
    parsed.quantile = quantile.to_string();
    // histogram bucket queries always carry the le dimension
    parsed.push_by("le");
    Some(parsed)
}

/// Length of a leading numeric literal like `0.95`, `.5`, or `12`.
fn quantile_token(s: &str) -> Option<usize> {
    let end = s
        .bytes()
        .position(|b| !b.is_ascii_digit() && b != b'.')
        .unwrap_or(s.len());
    let token = &s[..end];
    if token.is_empty() || token.ends_with('.') {
        return None;
    }
    let dots = token.bytes().filter(|&b| b == b'.').count();
    let digits = token.bytes().filter(|b| b.is_ascii_digit()).count();
    (dots <= 1 && digits >= 1).then_some(end)
}

/// Aggregation with `by(...)` trailing or leading, or no `by` at all.
fn try_aggregation(e: &str) -> Option<ParsedExpr> {
    let (keyword, agg) = AGG_OPS.iter().find(|(keyword, _)| e.starts_with(keyword))?;
    let rest = e[keyword.len()..].trim_start();

    // `agg(<expr>) by (labels)` first: the leading-by recognizer would
    // otherwise swallow the trailing clause into its inner expression
    if let Some(parsed) = agg_trailing_by(rest, *agg) {
        return Some(parsed);
    }
    agg_leading_by(rest, *agg)
}

/// `( <expr> ) by ( <labels> )` after the aggregation keyword.
fn agg_trailing_by(rest: &str, agg: AggOp) -> Option<ParsedExpr> {
    let rest = rest.strip_prefix('(')?;
    let body = rest.trim_end().strip_suffix(')')?;
    // the final parenthesized group holds the label list
    let open = body.rfind('(')?;
    let labels = &body[open + 1..];
    if labels.contains(')') {
        return None;
    }
    let before = body[..open].trim_end().strip_suffix("by")?;
    let inner = before.trim_end().strip_suffix(')')?;
    if inner.trim().is_empty() {
        return None;
    }

    let mut parsed = parse(inner);
    parsed.agg = Some(agg);
    if !labels.trim().is_empty() {
        parsed.by = split_csv(labels);
    }
    Some(parsed)
}

/// `[by ( <labels> )] ( <expr> )` after the aggregation keyword.
fn agg_leading_by(rest: &str, agg: AggOp) -> Option<ParsedExpr> {
    let (labels, rest) = match rest.strip_prefix("by") {
        Some(after) => {
            let after = after.trim_start().strip_prefix('(')?;
            let close = after.find(')')?;
            (Some(&after[..close]), after[close + 1..].trim_start())
        }
        None => (None, rest),
    };
    let inner = rest.strip_prefix('(')?.strip_suffix(')')?;
    if inner.trim().is_empty() {
        return None;
    }

    let mut parsed = parse(inner);
    parsed.agg = Some(agg);
    if let Some(labels) = labels {
        if !labels.trim().is_empty() {
            parsed.by = split_csv(labels);
        }
    }
    Some(parsed)
}

/// Leaf form `rate|irate|increase(metric{labels}[range])`.
fn try_rate_function(e: &str) -> Option<ParsedExpr> {
    let (keyword, func) = RATE_FUNCS.iter().find(|(keyword, _)| e.starts_with(keyword))?;
    let rest = e[keyword.len()..].trim_start();
    let body = rest.strip_prefix('(')?.strip_suffix(')')?;
    let (metric, labels, range) = selector_parts(body)?;
    Some(ParsedExpr {
        metric,
        labels: parse_label_set(&labels),
        func: Some(*func),
        range,
        ..ParsedExpr::default()
    })
}

/// Leaf form `metric{labels}[range]`.
fn try_selector(e: &str) -> Option<ParsedExpr> {
    let (metric, labels, range) = selector_parts(e)?;
    Some(ParsedExpr {
        metric,
        labels: parse_label_set(&labels),
        range,
        ..ParsedExpr::default()
    })
}

/// Split `metric {labels}? [range]?` into its three parts.
///
/// The selector block runs to the first `}` and the range block to the
/// first `]`; label values containing `}` therefore push the whole
/// expression into the bare-metric fallback.
fn selector_parts(s: &str) -> Option<(String, String, String)> {
    let s = s.trim();
    let metric_len = metric_ident_len(s);
    if metric_len == 0 {
        return None;
    }
    let metric = &s[..metric_len];
    let mut rest = s[metric_len..].trim_start();

    let mut labels = "";
    if rest.starts_with('{') {
        let close = rest.find('}')?;
        labels = &rest[..=close];
        rest = rest[close + 1..].trim_start();
    }

    let mut range = "";
    if rest.starts_with('[') {
        let close = rest.find(']')?;
        if close == 1 {
            // empty range brackets
            return None;
        }
        range = &rest[..=close];
        rest = rest[close + 1..].trim_start();
    }

    rest.is_empty()
        .then(|| (metric.to_string(), labels.to_string(), range.to_string()))
}

/// Length of a leading metric identifier (`[a-zA-Z_:][a-zA-Z0-9_:]*`).
fn metric_ident_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    match bytes.first() {
        Some(&b) if b.is_ascii_alphabetic() || b == b'_' || b == b':' => {}
        _ => return 0,
    }
    bytes[1..]
        .iter()
        .position(|&b| !(b.is_ascii_alphanumeric() || b == b'_' || b == b':'))
        .map_or(s.len(), |p| p + 1)
}

/// Length of a leading label identifier (`[a-zA-Z_][a-zA-Z0-9_.:]*`).
fn label_ident_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    match bytes.first() {
        Some(&b) if b.is_ascii_alphabetic() || b == b'_' => {}
        _ => return 0,
    }
    bytes[1..]
        .iter()
        .position(|&b| !(b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || b == b':'))
        .map_or(s.len(), |p| p + 1)
}

/// Parse a `{key=... , ...}` selector block into matchers.
///
/// The surrounding braces are optional. Malformed entries are skipped,
/// not errored.
pub fn parse_label_set(s: &str) -> Vec<LabelMatcher> {
    let mut s = s.trim();
    if s.is_empty() {
        return Vec::new();
    }
    if let Some(stripped) = s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        s = stripped;
    }
    split_csv(s)
        .iter()
        .filter_map(|part| parse_matcher(part))
        .collect()
}

/// A single `key<op>"value"` entry; `None` when malformed.
fn parse_matcher(part: &str) -> Option<LabelMatcher> {
    let part = part.trim();
    let name_len = label_ident_len(part);
    if name_len == 0 {
        return None;
    }
    let name = &part[..name_len];
    let rest = part[name_len..].trim_start();

    // two-character operators first so `=~` is not read as `=`
    let (op, op_len) = if rest.starts_with("=~") {
        (MatcherOp::RegexMatch, 2)
    } else if rest.starts_with("!~") {
        (MatcherOp::RegexNotMatch, 2)
    } else if rest.starts_with("!=") {
        (MatcherOp::NotEqual, 2)
    } else if rest.starts_with('=') {
        (MatcherOp::Equal, 1)
    } else {
        return None;
    };

    let rest = rest[op_len..].trim_start().strip_prefix('"')?;
    let close = rest.rfind('"')?;
    if !rest[close + 1..].trim().is_empty() {
        return None;
    }
    Some(LabelMatcher {
        name: name.to_string(),
        op,
        value: rest[..close].to_string(),
    })
}

/// Split on commas outside double quotes, trimming each piece. A
/// trailing empty piece is dropped.
pub fn split_csv(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    for c in s.chars() {
        match c {
            '"' => {
                in_quote = !in_quote;
                current.push(c);
            }
            ',' if !in_quote => {
                out.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        out.push(current.trim().to_string());
    }
    out
}
