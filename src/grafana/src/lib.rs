//! Lenient data model for Grafana dashboard JSON.
//!
//! Grafana exports vary wildly between versions, so every field is optional
//! on the wire: missing keys decode to their default value and unknown keys
//! are ignored. Only the fields the conversion pipeline consumes are modeled.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum GrafanaError {
    #[error("failed to read dashboard file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode dashboard JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Top-level Grafana dashboard document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dashboard {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub templating: Templating,
    #[serde(default)]
    pub panels: Vec<Panel>,
}

impl Dashboard {
    /// Decodes a dashboard from any reader producing dashboard JSON.
    /// Nested row panels are flattened so `panels` only holds leaves.
    pub fn from_reader(reader: impl Read) -> Result<Self, GrafanaError> {
        let mut dash: Dashboard = serde_json::from_reader(reader)?;
        dash.panels = flatten_panels(&dash.panels);
        Ok(dash)
    }

    /// Reads and decodes a dashboard JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GrafanaError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

/// Template variable container (`templating.list`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Templating {
    #[serde(default)]
    pub list: Vec<Variable>,
}

/// A single template variable definition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Variable {
    #[serde(default)]
    pub name: String,
    /// Variable kind, e.g. `query`, `custom`, `interval`.
    #[serde(default, rename = "type")]
    pub var_type: String,
    /// Either a plain string or a `{query, refId}` object depending on the
    /// Grafana version, so it is kept as raw JSON.
    #[serde(default)]
    pub query: Value,
    #[serde(default)]
    pub current: Value,
    #[serde(default)]
    pub label: String,
    #[serde(default, rename = "includeAll")]
    pub include_all: bool,
    #[serde(default)]
    pub multi: bool,
}

/// A dashboard panel. Row panels carry their children in `panels`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Panel {
    #[serde(default)]
    pub id: i64,
    #[serde(default, rename = "type")]
    pub panel_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub datasource: Value,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default, rename = "gridPos")]
    pub grid_pos: Option<GridPos>,
    #[serde(default)]
    pub panels: Vec<Panel>,
}

/// Panel placement on the 24-column Grafana grid.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct GridPos {
    #[serde(default)]
    pub h: i64,
    #[serde(default)]
    pub w: i64,
    #[serde(default)]
    pub x: i64,
    #[serde(default)]
    pub y: i64,
}

/// One query target attached to a panel.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Target {
    #[serde(default, rename = "refId")]
    pub ref_id: String,
    #[serde(default)]
    pub expr: String,
    #[serde(default, rename = "queryType")]
    pub query_type: String,
    #[serde(default)]
    pub datasource: Value,
    #[serde(default, rename = "legendFormat")]
    pub legend_format: String,
    #[serde(default)]
    pub format: String,
}

/// Replaces every panel that has children with those children, recursively,
/// preserving document order. Childless panels, including empty row headers,
/// are kept as-is.
pub fn flatten_panels(panels: &[Panel]) -> Vec<Panel> {
    let mut out = Vec::new();
    for panel in panels {
        if panel.panels.is_empty() {
            out.push(panel.clone());
        } else {
            out.extend(flatten_panels(&panel.panels));
        }
    }
    out
}
