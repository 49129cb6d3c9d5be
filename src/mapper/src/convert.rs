//! Whole-dashboard conversion: panel ordering, panel-type mapping, grid
//! packing and template-variable translation.

use serde_json::{json, Map, Value};
use uuid::Uuid;

use signoz::{Dashboard, Layout, Widget};

use crate::builder::{apply_replacements, build_query};
use crate::non_empty;
use crate::rules::Rules;

const GRID_COLUMNS: i64 = 24;

/// Converts a decoded Grafana dashboard into a SigNoz dashboard. The
/// conversion is total: panels with unknown types or unparsable queries
/// still produce widgets, marked as migrated in their description.
pub fn convert(dash: &grafana::Dashboard, rules: &Rules) -> Dashboard {
    let mut out = Dashboard {
        title: non_empty(&dash.title, "Migrated Grafana Dashboard"),
        uuid: None,
        version: "v4".to_string(),
        tags: vec!["migrated".to_string(), "grafana".to_string()],
        layout: Vec::new(),
        widgets: Vec::new(),
        variables: build_variables(dash),
        panel_map: Map::new(),
        uploaded_grafana: false,
        description: "Converted from Grafana dashboard JSON".to_string(),
    };

    // Keep the visual order: position sorts before id, top row first.
    let mut panels = dash.panels.clone();
    panels.sort_by(|a, b| match (a.grid_pos, b.grid_pos) {
        (None, None) => a.id.cmp(&b.id),
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (Some(_), None) => std::cmp::Ordering::Less,
        (Some(pa), Some(pb)) => pa.y.cmp(&pb.y).then(pa.x.cmp(&pb.x)),
    });

    let mut cur_x = 0;
    let mut cur_y = 0;
    let mut row_h = 0;

    for panel in &panels {
        let original_type = panel.panel_type.to_lowercase();
        let mapped = rules.mapped_panel_type(&panel.panel_type);
        let targets = rewritten_targets(panel, rules);
        let id = format!("w_{}", panel.id);

        out.widgets.push(Widget {
            id: id.clone(),
            title: non_empty(&panel.title, &capitalize(&mapped)),
            panel_type: mapped,
            time_preference: "GLOBAL_TIME".to_string(),
            description: format!(
                "Migrated from Grafana (type: {original_type}); original queries preserved in _grafanaExprs."
            ),
            query: build_query(&targets),
        });

        let mut w = rules.default_width;
        let mut h = rules.default_height;
        if let Some(pos) = panel.grid_pos {
            if pos.w > 0 {
                w = pos.w;
            }
            if pos.h > 0 {
                h = pos.h;
            }
        }

        if cur_x + w > GRID_COLUMNS {
            cur_x = 0;
            cur_y += row_h;
            row_h = 0;
        }
        out.layout.push(Layout {
            h,
            w,
            x: cur_x,
            y: cur_y,
            i: id,
            moved: false,
            is_static: false,
        });
        cur_x += w;
        if h > row_h {
            row_h = h;
        }
    }

    out
}

/// Clones the panel targets with replacement rules applied to each
/// expression, so parsing and the preserved originals agree.
fn rewritten_targets(panel: &grafana::Panel, rules: &Rules) -> Vec<grafana::Target> {
    panel
        .targets
        .iter()
        .map(|target| {
            let mut target = target.clone();
            target.expr = apply_replacements(&target.expr, &rules.query_replacements);
            target
        })
        .collect()
}

fn build_variables(dash: &grafana::Dashboard) -> Map<String, Value> {
    let mut out = Map::new();
    for (i, var) in dash.templating.list.iter().enumerate() {
        let id = Uuid::new_v4().to_string();
        let var_type = if var.var_type.is_empty() {
            "TEXT".to_string()
        } else {
            var.var_type.to_uppercase()
        };
        let name = if var.name.is_empty() {
            format!("var_{i}")
        } else {
            var.name.clone()
        };
        out.insert(
            id.clone(),
            json!({
                "id": id,
                "name": name,
                "type": var_type,
                "modificationUUID": Uuid::new_v4().to_string(),
                "queryValue": var.query,
                "multiSelect": var.multi,
                "showALLOption": var.include_all,
                "order": i,
                "description": var.label,
                "sort": "DISABLED",
                "customValue": "",
                "textboxValue": "",
                "allSelected": false,
            }),
        );
    }
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grafana::{GridPos, Panel, Target, Templating, Variable};

    fn panel(id: i64, panel_type: &str, title: &str, grid_pos: Option<GridPos>) -> Panel {
        Panel {
            id,
            panel_type: panel_type.to_string(),
            title: title.to_string(),
            grid_pos,
            ..Panel::default()
        }
    }

    fn pos(w: i64, h: i64, x: i64, y: i64) -> Option<GridPos> {
        Some(GridPos { h, w, x, y })
    }

    #[test]
    fn test_dashboard_scaffolding() {
        let dash = grafana::Dashboard::default();
        let out = convert(&dash, &Rules::default());
        assert_eq!(out.title, "Migrated Grafana Dashboard");
        assert_eq!(out.version, "v4");
        assert_eq!(out.tags, vec!["migrated".to_string(), "grafana".to_string()]);
        assert_eq!(out.description, "Converted from Grafana dashboard JSON");
        assert!(out.uuid.is_none());
        assert!(!out.uploaded_grafana);
        assert!(out.widgets.is_empty());
    }

    #[test]
    fn test_widget_mapping_and_description() {
        let dash = grafana::Dashboard {
            title: "Node stats".to_string(),
            panels: vec![panel(3, "Heatmap", "Latency", None)],
            ..grafana::Dashboard::default()
        };
        let out = convert(&dash, &Rules::default());
        let widget = &out.widgets[0];
        assert_eq!(widget.id, "w_3");
        assert_eq!(widget.title, "Latency");
        assert_eq!(widget.panel_type, "histogram");
        assert_eq!(widget.time_preference, "GLOBAL_TIME");
        assert_eq!(
            widget.description,
            "Migrated from Grafana (type: heatmap); original queries preserved in _grafanaExprs."
        );
    }

    #[test]
    fn test_unknown_type_and_blank_title_fallbacks() {
        let dash = grafana::Dashboard {
            panels: vec![panel(1, "alertlist", "  ", None), panel(2, "stat", "", None)],
            ..grafana::Dashboard::default()
        };
        let out = convert(&dash, &Rules::default());
        assert_eq!(out.widgets[0].panel_type, "graph");
        assert_eq!(out.widgets[0].title, "Graph");
        assert_eq!(out.widgets[1].panel_type, "value");
        assert_eq!(out.widgets[1].title, "Value");
    }

    #[test]
    fn test_panels_sorted_by_position_then_id() {
        let dash = grafana::Dashboard {
            panels: vec![
                panel(9, "graph", "no pos", None),
                panel(2, "graph", "second row", pos(12, 8, 0, 8)),
                panel(4, "graph", "first right", pos(12, 8, 12, 0)),
                panel(1, "graph", "no pos early", None),
                panel(3, "graph", "first left", pos(12, 8, 0, 0)),
            ],
            ..grafana::Dashboard::default()
        };
        let out = convert(&dash, &Rules::default());
        let ids: Vec<&str> = out.widgets.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["w_3", "w_4", "w_2", "w_1", "w_9"]);
    }

    #[test]
    fn test_grid_packing_wraps_rows() {
        let dash = grafana::Dashboard {
            panels: vec![
                panel(1, "graph", "a", pos(12, 8, 0, 0)),
                panel(2, "graph", "b", pos(12, 4, 12, 0)),
                panel(3, "graph", "c", pos(12, 6, 0, 1)),
            ],
            ..grafana::Dashboard::default()
        };
        let out = convert(&dash, &Rules::default());
        let placed: Vec<(i64, i64, i64, i64)> =
            out.layout.iter().map(|l| (l.x, l.y, l.w, l.h)).collect();
        assert_eq!(placed, vec![(0, 0, 12, 8), (12, 0, 12, 4), (0, 8, 12, 6)]);
        assert!(out.layout.iter().all(|l| !l.moved && !l.is_static));
    }

    #[test]
    fn test_default_widget_size_without_grid_pos() {
        let dash = grafana::Dashboard {
            panels: vec![panel(1, "graph", "a", None)],
            ..grafana::Dashboard::default()
        };
        let out = convert(&dash, &Rules::default());
        assert_eq!(out.layout[0].w, 6);
        assert_eq!(out.layout[0].h, 6);
    }

    #[test]
    fn test_variables_best_effort_translation() {
        let dash = grafana::Dashboard {
            templating: Templating {
                list: vec![
                    Variable {
                        name: "job".to_string(),
                        var_type: "query".to_string(),
                        query: json!("label_values(up, job)"),
                        label: "Job".to_string(),
                        include_all: true,
                        multi: true,
                        ..Variable::default()
                    },
                    Variable::default(),
                ],
            },
            ..grafana::Dashboard::default()
        };
        let out = convert(&dash, &Rules::default());
        assert_eq!(out.variables.len(), 2);

        let find = |name: &str| {
            out.variables
                .values()
                .find(|v| v["name"] == name)
                .cloned()
                .unwrap()
        };
        let job = find("job");
        assert_eq!(job["type"], "QUERY");
        assert_eq!(job["queryValue"], "label_values(up, job)");
        assert_eq!(job["multiSelect"], true);
        assert_eq!(job["showALLOption"], true);
        assert_eq!(job["order"], 0);
        assert_eq!(job["description"], "Job");
        assert_eq!(job["sort"], "DISABLED");
        assert_eq!(job["allSelected"], false);
        // The entry key is the generated id.
        let key = out
            .variables
            .iter()
            .find(|(_, v)| v["name"] == "job")
            .map(|(k, _)| k.clone())
            .unwrap();
        assert_eq!(job["id"], Value::String(key));

        let unnamed = find("var_1");
        assert_eq!(unnamed["type"], "TEXT");
        assert_eq!(unnamed["order"], 1);
    }

    #[test]
    fn test_replacements_rewrite_before_parsing() {
        let rules = Rules {
            query_replacements: vec![crate::Replacement {
                pattern: "legacy_requests".to_string(),
                replacement: "http_requests_total".to_string(),
            }],
            ..Rules::default()
        };
        let dash = grafana::Dashboard {
            panels: vec![Panel {
                id: 1,
                panel_type: "graph".to_string(),
                title: "Req".to_string(),
                targets: vec![Target {
                    ref_id: "A".to_string(),
                    expr: "rate(legacy_requests[5m])".to_string(),
                    ..Target::default()
                }],
                ..Panel::default()
            }],
            ..grafana::Dashboard::default()
        };
        let out = convert(&dash, &rules);
        let query = &out.widgets[0].query;
        assert_eq!(
            query.builder.query_data[0].aggregate_attribute.key,
            "http_requests_total"
        );
        assert_eq!(query.promql[0].query, "rate(http_requests_total[5m])");
        assert_eq!(
            query.grafana_exprs,
            vec!["rate(http_requests_total[5m])".to_string()]
        );
    }
}
