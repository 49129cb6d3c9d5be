//! Mapping rules controlling panel-type translation and query rewriting.

use std::collections::HashMap;
use std::path::Path;

use figment::{
    providers::{Format, Json, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("failed to load rules file: {0}")]
    Load(#[from] Box<figment::Error>),
}

/// Conversion rules, overridable from a JSON file. A rules file only needs
/// the fields it wants to change; everything else keeps its default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Rules {
    /// Lower-cased Grafana panel type to SigNoz panel type.
    pub panel_type_map: HashMap<String, String>,
    /// Target panel type for unmapped Grafana types.
    pub default_panel: String,
    /// Regex replacements applied to every query expression, in order,
    /// before the expression is parsed.
    pub query_replacements: Vec<Replacement>,
    pub default_width: i64,
    pub default_height: i64,
}

/// One regex rewrite of a query expression.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Replacement {
    #[serde(rename = "match")]
    pub pattern: String,
    pub replacement: String,
}

impl Default for Rules {
    fn default() -> Self {
        let panel_type_map = [
            ("graph", "graph"),
            ("timeseries", "graph"),
            ("barchart", "bar"),
            ("bar-gauge", "bar"),
            ("gauge", "value"),
            ("stat", "value"),
            ("singlestat", "value"),
            ("table", "table"),
            ("piechart", "pie"),
            ("pie-chart", "pie"),
            ("heatmap", "histogram"),
            ("histogram", "histogram"),
            ("text", "value"),
            ("logs", "list"),
        ]
        .into_iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect();

        Rules {
            panel_type_map,
            default_panel: "graph".to_string(),
            query_replacements: Vec::new(),
            default_width: 6,
            default_height: 6,
        }
    }
}

impl Rules {
    /// Loads rules, layering an optional JSON file over the defaults.
    /// A path that does not exist or holds malformed JSON is an error;
    /// `None` yields the defaults unchanged.
    pub fn load(path: Option<&Path>) -> Result<Self, RulesError> {
        let Some(path) = path else {
            return Ok(Rules::default());
        };
        let mut rules: Rules = Figment::from(Serialized::defaults(Rules::default()))
            .merge(Json::file_exact(path))
            .extract()
            .map_err(Box::new)?;

        let defaults = Rules::default();
        if rules.default_panel.is_empty() {
            rules.default_panel = defaults.default_panel;
        }
        if rules.default_width == 0 {
            rules.default_width = defaults.default_width;
        }
        if rules.default_height == 0 {
            rules.default_height = defaults.default_height;
        }
        Ok(rules)
    }

    /// Resolves the SigNoz panel type for a Grafana panel type, falling
    /// back to the default panel for unknown or empty mappings.
    pub fn mapped_panel_type(&self, grafana_type: &str) -> String {
        let key = grafana_type.to_lowercase();
        match self.panel_type_map.get(&key) {
            Some(mapped) if !mapped.is_empty() => mapped.clone(),
            _ => self.default_panel.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_rules() {
        let rules = Rules::default();
        assert_eq!(rules.default_panel, "graph");
        assert_eq!(rules.default_width, 6);
        assert_eq!(rules.default_height, 6);
        assert!(rules.query_replacements.is_empty());
        assert_eq!(rules.panel_type_map["timeseries"], "graph");
        assert_eq!(rules.panel_type_map["heatmap"], "histogram");
    }

    #[test]
    fn test_load_without_path_returns_defaults() {
        let rules = Rules::load(None).unwrap();
        assert_eq!(rules.default_panel, "graph");
        assert_eq!(rules.panel_type_map.len(), Rules::default().panel_type_map.len());
    }

    #[test]
    fn test_partial_file_layers_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"defaultPanel": "table", "panelTypeMap": {{"speedometer": "value"}}}}"#
        )
        .unwrap();

        let rules = Rules::load(Some(file.path())).unwrap();
        assert_eq!(rules.default_panel, "table");
        // New entries extend the default map instead of replacing it.
        assert_eq!(rules.panel_type_map["speedometer"], "value");
        assert_eq!(rules.panel_type_map["graph"], "graph");
        assert_eq!(rules.default_width, 6);
    }

    #[test]
    fn test_zero_dimensions_fall_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"defaultWidth": 0, "defaultHeight": 12}}"#).unwrap();

        let rules = Rules::load(Some(file.path())).unwrap();
        assert_eq!(rules.default_width, 6);
        assert_eq!(rules.default_height, 12);
    }

    #[test]
    fn test_replacements_decode() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"queryReplacements": [{{"match": "old_metric", "replacement": "new_metric"}}]}}"#
        )
        .unwrap();

        let rules = Rules::load(Some(file.path())).unwrap();
        assert_eq!(rules.query_replacements.len(), 1);
        assert_eq!(rules.query_replacements[0].pattern, "old_metric");
        assert_eq!(rules.query_replacements[0].replacement, "new_metric");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(Rules::load(Some(Path::new("/nonexistent/rules.json"))).is_err());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        assert!(Rules::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_mapped_panel_type_lowercases_and_defaults() {
        let rules = Rules::default();
        assert_eq!(rules.mapped_panel_type("Timeseries"), "graph");
        assert_eq!(rules.mapped_panel_type("stat"), "value");
        assert_eq!(rules.mapped_panel_type("alertlist"), "graph");
        assert_eq!(rules.mapped_panel_type(""), "graph");
    }
}
