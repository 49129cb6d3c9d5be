//! Typed model of the SigNoz dashboard import format, plus JSON
//! encode/decode helpers and a lightweight structural validator.
//!
//! The field spelling follows the import format verbatim, including its
//! quirks (`timePreferance`, `panelTypes`, `isJSON`). Decoding is lenient:
//! every struct fills missing fields with defaults so dashboards exported
//! by other tools still read back.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Panel types the import format accepts.
pub const SUPPORTED_PANEL_TYPES: [&str; 9] = [
    "graph",
    "timeseries",
    "bar",
    "histogram",
    "pie",
    "table",
    "value",
    "list",
    "row",
];

#[derive(Debug, thiserror::Error)]
pub enum SignozError {
    #[error("failed to access dashboard file: {0}")]
    Io(#[from] std::io::Error),
    #[error("dashboard JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level SigNoz dashboard document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Dashboard {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub version: String,
    pub tags: Vec<String>,
    pub layout: Vec<Layout>,
    pub widgets: Vec<Widget>,
    /// Variable objects keyed by generated UUID.
    pub variables: Map<String, Value>,
    #[serde(rename = "panelMap", skip_serializing_if = "Map::is_empty")]
    pub panel_map: Map<String, Value>,
    #[serde(rename = "uploadedGrafana", skip_serializing_if = "is_false")]
    pub uploaded_grafana: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Grid placement of one widget. The `i` field carries the widget id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub h: i64,
    pub w: i64,
    pub x: i64,
    pub y: i64,
    pub i: String,
    pub moved: bool,
    #[serde(rename = "static")]
    pub is_static: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Widget {
    pub id: String,
    pub title: String,
    #[serde(rename = "panelTypes")]
    pub panel_type: String,
    /// The import format spells this key `timePreferance`.
    #[serde(rename = "timePreferance")]
    pub time_preference: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub query: Query,
}

/// Composite widget query: structured builder form plus the verbatim
/// source expressions and placeholder entries for the other query modes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    #[serde(rename = "queryType")]
    pub query_type: String,
    pub builder: BuilderQuery,
    pub promql: Vec<NamedQuery>,
    pub clickhouse_sql: Vec<NamedQuery>,
    pub id: String,
    /// Original dashboard expressions, preserved for manual follow-up.
    #[serde(rename = "_grafanaExprs")]
    pub grafana_exprs: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderQuery {
    #[serde(rename = "queryData")]
    pub query_data: Vec<BuilderQueryItem>,
    #[serde(rename = "queryFormulas")]
    pub query_formulas: Vec<Value>,
}

/// One `promql` or `clickhouse_sql` entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NamedQuery {
    pub disabled: bool,
    pub legend: String,
    pub name: String,
    pub query: String,
}

/// One structured builder query derived from a single expression.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderQueryItem {
    #[serde(rename = "aggregateAttribute")]
    pub aggregate_attribute: AttributeKey,
    #[serde(rename = "aggregateOperator")]
    pub aggregate_operator: String,
    #[serde(rename = "dataSource")]
    pub data_source: String,
    pub disabled: bool,
    pub expression: String,
    pub filters: FilterSet,
    pub functions: Vec<FunctionEntry>,
    #[serde(rename = "groupBy")]
    pub group_by: Vec<AttributeKey>,
    pub having: Vec<Having>,
    pub legend: String,
    /// Always serialized, `null` when unset.
    pub limit: Option<u64>,
    #[serde(rename = "orderBy")]
    pub order_by: Vec<Value>,
    #[serde(rename = "queryName")]
    pub query_name: String,
    #[serde(rename = "reduceTo")]
    pub reduce_to: String,
    #[serde(rename = "spaceAggregation")]
    pub space_aggregation: String,
    #[serde(rename = "stepInterval")]
    pub step_interval: u32,
    #[serde(rename = "timeAggregation")]
    pub time_aggregation: String,
}

/// A metric or label attribute reference. The `id` encodes
/// `<key>--<dataType>--<type>--true` as the import format expects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeKey {
    #[serde(rename = "dataType")]
    pub data_type: String,
    pub id: String,
    #[serde(rename = "isColumn")]
    pub is_column: bool,
    #[serde(rename = "isJSON")]
    pub is_json: bool,
    pub key: String,
    #[serde(rename = "type")]
    pub key_type: String,
}

impl AttributeKey {
    /// Aggregate attribute for a metric with the given type tag
    /// (`Counter` or `Gauge`).
    pub fn metric(key: &str, metric_type: &str) -> Self {
        AttributeKey {
            data_type: "float64".to_string(),
            id: format!("{key}--float64--{metric_type}--true"),
            is_column: true,
            is_json: false,
            key: key.to_string(),
            key_type: metric_type.to_string(),
        }
    }

    /// String tag attribute used for filters and group-by dimensions.
    pub fn tag(key: &str) -> Self {
        AttributeKey {
            data_type: "string".to_string(),
            id: format!("{key}--string--tag--true"),
            is_column: true,
            is_json: false,
            key: key.to_string(),
            key_type: "tag".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSet {
    pub items: Vec<FilterItem>,
    pub op: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterItem {
    pub id: String,
    pub key: AttributeKey,
    pub op: String,
    pub value: String,
}

/// Post-aggregation comparison against the computed value column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Having {
    #[serde(rename = "columnName")]
    pub column_name: String,
    pub op: String,
    pub value: String,
}

/// A query post-processing function such as `histogram_quantile`
/// or `offset`, with free-form arguments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionEntry {
    pub name: String,
    pub args: Map<String, Value>,
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// Writes the dashboard as pretty-printed JSON with a trailing newline.
pub fn write_dashboard(mut writer: impl Write, dash: &Dashboard) -> Result<(), SignozError> {
    serde_json::to_writer_pretty(&mut writer, dash)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Reads a SigNoz dashboard JSON file from disk.
pub fn read_dashboard_file(path: impl AsRef<Path>) -> Result<Dashboard, SignozError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Checks the dashboard against the structural expectations of the import
/// format, collected from public dashboard examples. Returns one
/// human-readable finding per problem; an empty list means the dashboard
/// looks importable. This is not an official schema check.
pub fn validate(dash: &Dashboard) -> Vec<String> {
    let mut issues = Vec::new();
    if dash.title.is_empty() {
        issues.push("title is required".to_string());
    }
    if dash.widgets.is_empty() {
        issues.push("at least one widget is required".to_string());
    }

    let mut ids = std::collections::HashSet::new();
    for (i, widget) in dash.widgets.iter().enumerate() {
        if widget.id.is_empty() {
            issues.push(format!("widgets[{i}]: id is required"));
        }
        if widget.title.is_empty() {
            issues.push(format!("widgets[{i}]: title is required"));
        }
        if !SUPPORTED_PANEL_TYPES.contains(&widget.panel_type.as_str()) {
            issues.push(format!(
                "widgets[{i}]: unsupported panelTypes '{}'",
                widget.panel_type
            ));
        }
        if widget.time_preference.is_empty() {
            issues.push(format!("widgets[{i}]: timePreferance is required"));
        }
        if !ids.insert(widget.id.clone()) {
            issues.push(format!("duplicate widget id '{}'", widget.id));
        }
    }

    for (i, layout) in dash.layout.iter().enumerate() {
        if layout.i.is_empty() {
            issues.push(format!("layout[{i}]: i (id) is required"));
        }
        if !ids.contains(&layout.i) {
            issues.push(format!(
                "layout[{i}]: references unknown widget id '{}'",
                layout.i
            ));
        }
        if layout.w <= 0 || layout.h <= 0 {
            issues.push(format!("layout[{i}]: width/height must be > 0"));
        }
    }
    issues
}
