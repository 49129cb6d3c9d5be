//! Expression-to-builder-query mapping.
//!
//! Each panel target's expression is parsed into a [`ParsedExpr`] and then
//! projected onto a SigNoz builder query item: aggregation metadata, label
//! filters, group-by dimensions, post-processing functions and having
//! clauses. The translation is best-effort and lossy, so the composite
//! query also carries every source expression verbatim for manual cleanup.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use uuid::Uuid;

use grafana::Target;
use promql::{Func, LabelMatcher, MatcherOp, ParsedExpr};
use signoz::{
    AttributeKey, BuilderQuery, BuilderQueryItem, FilterItem, FilterSet, FunctionEntry, Having,
    NamedQuery, Query,
};

use crate::non_empty;
use crate::rules::Replacement;

static TEMPLATE_REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{?([a-zA-Z0-9_.]+)\}?").expect("template reference regex"));
static LEGEND_PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_.:]*)\s*\}\}").expect("legend placeholder regex")
});

/// Applies the configured regex replacements to an expression, in order.
/// An unparsable pattern is skipped with a warning so a single bad rule
/// cannot block a conversion.
pub fn apply_replacements(expr: &str, replacements: &[Replacement]) -> String {
    let mut out = expr.to_string();
    for rep in replacements {
        if rep.pattern.is_empty() {
            continue;
        }
        match Regex::new(&rep.pattern) {
            Ok(re) => out = re.replace_all(&out, rep.replacement.as_str()).into_owned(),
            Err(err) => {
                tracing::warn!(pattern = %rep.pattern, "skipping invalid replacement pattern: {err}");
            }
        }
    }
    out
}

/// Builds the composite widget query for a panel's targets. Expressions
/// are expected to have replacement rules already applied. Targets with a
/// blank expression contribute nothing; the rest keep their target order.
pub fn build_query(targets: &[Target]) -> Query {
    let mut query_data = Vec::new();
    let mut promql_queries = Vec::new();
    let mut exprs = Vec::new();

    for target in targets {
        let expr = target.expr.trim();
        if expr.is_empty() {
            continue;
        }
        let parsed = promql::parse(expr);
        let name = non_empty(&target.ref_id, "A");
        query_data.push(builder_item(&parsed, &name, &target.legend_format));
        promql_queries.push(NamedQuery {
            disabled: false,
            legend: non_empty(&target.legend_format, ""),
            name,
            query: expr.to_string(),
        });
        exprs.push(expr.to_string());
    }

    Query {
        query_type: "builder".to_string(),
        builder: BuilderQuery {
            query_data,
            query_formulas: Vec::new(),
        },
        promql: promql_queries,
        clickhouse_sql: vec![NamedQuery {
            disabled: false,
            legend: String::new(),
            name: "A".to_string(),
            query: String::new(),
        }],
        id: Uuid::new_v4().to_string(),
        grafana_exprs: exprs,
    }
}

fn builder_item(parsed: &ParsedExpr, name: &str, legend: &str) -> BuilderQueryItem {
    BuilderQueryItem {
        aggregate_attribute: AttributeKey::metric(&parsed.metric, metric_type(parsed)),
        aggregate_operator: aggregate_operator(parsed),
        data_source: "metrics".to_string(),
        disabled: false,
        expression: name.to_string(),
        filters: FilterSet {
            items: filter_items(&parsed.labels),
            op: "AND".to_string(),
        },
        functions: function_entries(parsed),
        group_by: group_by(parsed, legend),
        having: having_entries(parsed),
        legend: non_empty(legend, ""),
        limit: None,
        order_by: Vec::new(),
        query_name: name.to_string(),
        reduce_to: "avg".to_string(),
        space_aggregation: "sum".to_string(),
        step_interval: 60,
        time_aggregation: time_aggregation(parsed).to_string(),
    }
}

/// Counter when the recognized shape is rate-like, looking through a
/// histogram_quantile wrapper at the inner function; Gauge otherwise.
/// This only tags the attribute id, it does not change execution.
fn metric_type(parsed: &ParsedExpr) -> &'static str {
    match parsed.func {
        Some(f) if f.is_rate_family() => "Counter",
        Some(Func::HistogramQuantile) => match parsed.inner_func {
            Some(f) if f.is_rate_family() => "Counter",
            _ => "Gauge",
        },
        _ => "Gauge",
    }
}

fn aggregate_operator(parsed: &ParsedExpr) -> String {
    match parsed.agg {
        Some(agg) => agg.as_str().to_string(),
        None => "avg".to_string(),
    }
}

fn time_aggregation(parsed: &ParsedExpr) -> &'static str {
    match parsed.func {
        Some(f) if f.is_rate_family() => "rate",
        Some(Func::HistogramQuantile) => match parsed.inner_func {
            Some(f) if f.is_rate_family() => "rate",
            _ => "avg",
        },
        _ => "avg",
    }
}

fn filter_items(matchers: &[LabelMatcher]) -> Vec<FilterItem> {
    matchers
        .iter()
        .map(|matcher| {
            let op = match matcher.op {
                MatcherOp::RegexMatch => "regex".to_string(),
                MatcherOp::RegexNotMatch => "nregex".to_string(),
                other => other.to_string(),
            };
            FilterItem {
                id: format!("f_{}", matcher.name),
                key: AttributeKey::tag(&matcher.name),
                op,
                value: rewrite_template_refs(&matcher.value),
            }
        })
        .collect()
}

/// Group-by dimensions, by precedence: explicit `by(...)` labels, else
/// legend `{{name}}` placeholders, else labels whose matcher value looks
/// like a dashboard template reference. Each source is deduplicated while
/// keeping first-seen order.
fn group_by(parsed: &ParsedExpr, legend: &str) -> Vec<AttributeKey> {
    let mut labels: Vec<String> = Vec::new();
    for label in &parsed.by {
        push_unique(&mut labels, label);
    }
    if labels.is_empty() {
        for placeholder in LEGEND_PLACEHOLDER_RE.captures_iter(legend) {
            push_unique(&mut labels, &placeholder[1]);
        }
    }
    if labels.is_empty() {
        for matcher in &parsed.labels {
            if looks_templated(&matcher.value) {
                push_unique(&mut labels, &matcher.name);
            }
        }
    }
    labels.iter().map(|label| AttributeKey::tag(label)).collect()
}

fn push_unique(labels: &mut Vec<String>, label: &str) {
    if !labels.iter().any(|existing| existing == label) {
        labels.push(label.to_string());
    }
}

fn function_entries(parsed: &ParsedExpr) -> Vec<FunctionEntry> {
    let mut functions = Vec::new();
    if parsed.func == Some(Func::HistogramQuantile) {
        let mut args = Map::new();
        args.insert("q".to_string(), Value::String(parsed.quantile.clone()));
        args.insert("leLabel".to_string(), Value::String("le".to_string()));
        functions.push(FunctionEntry {
            name: "histogram_quantile".to_string(),
            args,
        });
    }
    if !parsed.offset.is_empty() {
        let mut args = Map::new();
        args.insert("duration".to_string(), Value::String(parsed.offset.clone()));
        functions.push(FunctionEntry {
            name: "offset".to_string(),
            args,
        });
    }
    functions
}

fn having_entries(parsed: &ParsedExpr) -> Vec<Having> {
    match &parsed.cmp {
        Some(cmp) if !cmp.value.is_empty() => vec![Having {
            column_name: "#SIGNOZ_VALUE".to_string(),
            op: cmp.op.as_str().to_string(),
            value: cmp.value.clone(),
        }],
        _ => Vec::new(),
    }
}

fn looks_templated(value: &str) -> bool {
    value.contains('$') || value.contains("{{")
}

/// Rewrites `$name` and `${name}` variable references into the `{{.name}}`
/// placeholder form; values without references pass through unchanged.
fn rewrite_template_refs(value: &str) -> String {
    TEMPLATE_REF_RE.replace_all(value, "{{.${1}}}").into_owned()
}
