use std::fs::File;

use mapper::Rules;
use serde_json::Value;

const SAMPLE: &str = "testdata/sample-grafana.json";

#[test]
fn test_sample_dashboard_decodes_flattened() {
    let dash = grafana::Dashboard::from_file(SAMPLE).unwrap();
    assert_eq!(dash.title, "Sample Grafana Dashboard");
    assert_eq!(dash.panels.len(), 4);
    assert_eq!(dash.panels[0].panel_type, "graph");
    let ids: Vec<i64> = dash.panels.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
}

#[test]
fn test_convert_produces_valid_dashboard() {
    let dash = grafana::Dashboard::from_file(SAMPLE).unwrap();
    let converted = mapper::convert(&dash, &Rules::default());

    assert!(signoz::validate(&converted).is_empty());
    assert_eq!(converted.title, "Sample Grafana Dashboard");
    assert_eq!(converted.version, "v4");
    assert_eq!(converted.widgets.len(), dash.panels.len());

    let types: Vec<&str> = converted
        .widgets
        .iter()
        .map(|w| w.panel_type.as_str())
        .collect();
    assert_eq!(types, vec!["graph", "graph", "value", "table"]);

    let ids: Vec<&str> = converted.widgets.iter().map(|w| w.id.as_str()).collect();
    assert_eq!(ids, vec!["w_1", "w_2", "w_3", "w_4"]);

    // Grid packing keeps the two wide panels on the first row and wraps
    // the host row below them.
    let placed: Vec<(i64, i64)> = converted.layout.iter().map(|l| (l.x, l.y)).collect();
    assert_eq!(placed, vec![(0, 0), (12, 0), (0, 8), (6, 8)]);
}

#[test]
fn test_convert_translates_queries() {
    let dash = grafana::Dashboard::from_file(SAMPLE).unwrap();
    let converted = mapper::convert(&dash, &Rules::default());

    let request_rate = &converted.widgets[0].query;
    let item = &request_rate.builder.query_data[0];
    assert_eq!(item.aggregate_operator, "sum");
    assert_eq!(item.time_aggregation, "rate");
    assert_eq!(
        item.aggregate_attribute.id,
        "http_requests_total--float64--Counter--true"
    );
    let group: Vec<&str> = item.group_by.iter().map(|k| k.key.as_str()).collect();
    assert_eq!(group, vec!["code"]);
    let ops: Vec<(&str, &str, &str)> = item
        .filters
        .items
        .iter()
        .map(|f| (f.key.key.as_str(), f.op.as_str(), f.value.as_str()))
        .collect();
    assert_eq!(ops, vec![("job", "=", "api"), ("instance", "regex", "{{.instance}}")]);
    assert_eq!(item.legend, "{{code}}");
    assert_eq!(request_rate.promql[0].name, "A");

    let latency = &converted.widgets[1].query;
    let item = &latency.builder.query_data[0];
    assert_eq!(item.functions[0].name, "histogram_quantile");
    assert_eq!(item.functions[0].args["q"], "0.95");
    let group: Vec<&str> = item.group_by.iter().map(|k| k.key.as_str()).collect();
    assert_eq!(group, vec!["le"]);

    // The uptime expression does not fit the recognized shapes and falls
    // back to an opaque metric, still yielding a widget query.
    let uptime = &converted.widgets[2].query;
    assert_eq!(uptime.builder.query_data.len(), 1);
    assert_eq!(
        uptime.grafana_exprs,
        vec!["time() - node_boot_time_seconds".to_string()]
    );
}

#[test]
fn test_convert_translates_variables() {
    let dash = grafana::Dashboard::from_file(SAMPLE).unwrap();
    let converted = mapper::convert(&dash, &Rules::default());

    assert_eq!(converted.variables.len(), 1);
    let var = converted.variables.values().next().unwrap();
    assert_eq!(var["name"], "instance");
    assert_eq!(var["type"], "QUERY");
    assert_eq!(var["description"], "Instance");
    assert_eq!(var["multiSelect"], true);
    assert_eq!(var["showALLOption"], true);
    assert_eq!(var["queryValue"], "label_values(node_cpu_seconds_total, instance)");
}

#[test]
fn test_written_file_compares_clean_against_source() {
    let dash = grafana::Dashboard::from_file(SAMPLE).unwrap();
    let rules = Rules::default();
    let converted = mapper::convert(&dash, &rules);

    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("converted-sample.json");
    signoz::write_dashboard(File::create(&out_path).unwrap(), &converted).unwrap();

    let back = signoz::read_dashboard_file(&out_path).unwrap();
    assert_eq!(back.widgets.len(), converted.widgets.len());

    let mut report = Vec::new();
    let mismatches =
        compare::compare_dashboards(&mut report, SAMPLE, &out_path, &rules).unwrap();
    let text = String::from_utf8(report).unwrap();
    assert_eq!(mismatches, 0, "unexpected mismatches:\n{text}");
    assert!(text.starts_with("OK:"));
}

#[test]
fn test_written_wire_format() {
    let dash = grafana::Dashboard::from_file(SAMPLE).unwrap();
    let converted = mapper::convert(&dash, &Rules::default());

    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("converted-sample.json");
    signoz::write_dashboard(File::create(&out_path).unwrap(), &converted).unwrap();

    let raw = std::fs::read_to_string(&out_path).unwrap();
    assert!(raw.ends_with('\n'));
    let value: Value = serde_json::from_str(&raw).unwrap();

    assert_eq!(value["tags"], serde_json::json!(["migrated", "grafana"]));
    let widget = &value["widgets"][0];
    assert_eq!(widget["panelTypes"], "graph");
    assert_eq!(widget["timePreferance"], "GLOBAL_TIME");
    assert!(widget["description"]
        .as_str()
        .unwrap()
        .starts_with("Migrated from Grafana (type: graph)"));

    let query = &widget["query"];
    assert_eq!(query["queryType"], "builder");
    assert!(query["builder"]["queryFormulas"].as_array().unwrap().is_empty());
    assert_eq!(query["clickhouse_sql"][0]["name"], "A");
    assert!(query["_grafanaExprs"].as_array().unwrap().len() == 1);

    let item = &query["builder"]["queryData"][0];
    assert!(item["limit"].is_null());
    assert_eq!(item["stepInterval"], 60);
    assert_eq!(item["reduceTo"], "avg");
    assert_eq!(item["spaceAggregation"], "sum");
    assert_eq!(item["aggregateAttribute"]["isJSON"], false);

    let layout = &value["layout"][0];
    assert_eq!(layout["i"], "w_1");
    assert_eq!(layout["static"], false);
}
