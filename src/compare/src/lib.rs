//! Structural comparison of a source Grafana dashboard against a converted
//! SigNoz dashboard. Widgets are matched to panels through the `w_<id>`
//! naming scheme; differences are reported as human-readable lines.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use mapper::Rules;
use signoz::Widget;

#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    #[error("failed to read Grafana dashboard: {0}")]
    Grafana(#[from] grafana::GrafanaError),
    #[error("failed to read SigNoz dashboard: {0}")]
    Signoz(#[from] signoz::SignozError),
    #[error("failed to write comparison report: {0}")]
    Io(#[from] std::io::Error),
}

/// Compares the panels of a Grafana dashboard file against the widgets of
/// a SigNoz dashboard file, using `rules` to derive the expected panel
/// types. Differences are written to `out`; the mismatch count is
/// returned, with a trailing summary line either way.
pub fn compare_dashboards(
    mut out: impl Write,
    grafana_path: impl AsRef<Path>,
    signoz_path: impl AsRef<Path>,
    rules: &Rules,
) -> Result<usize, CompareError> {
    let grafana_path = grafana_path.as_ref();
    let signoz_path = signoz_path.as_ref();
    let source = grafana::Dashboard::from_file(grafana_path)?;
    let converted = signoz::read_dashboard_file(signoz_path)?;

    let widgets = index_widgets(&converted.widgets);

    let mut mismatches = 0usize;
    for panel in &source.panels {
        let Some(widget) = widgets.get(&panel.id) else {
            writeln!(
                out,
                "missing: grafana panel id {} title={:?} type={:?} not found in SigNoz widgets",
                panel.id, panel.title, panel.panel_type
            )?;
            mismatches += 1;
            continue;
        };

        let expected = rules.mapped_panel_type(&panel.panel_type);
        if widget.panel_type != expected {
            writeln!(
                out,
                "type mismatch: id={} title={:?} grafana={:?} expected_signoz={:?} got={:?}",
                panel.id, panel.title, panel.panel_type, expected, widget.panel_type
            )?;
            mismatches += 1;
        }
        if widget.title.trim() != panel.title.trim() {
            writeln!(
                out,
                "title mismatch: id={} grafana={:?} signoz={:?}",
                panel.id, panel.title, widget.title
            )?;
            mismatches += 1;
        }
    }

    if mismatches > 0 {
        writeln!(
            out,
            "\nCompared {} vs {}: {} mismatch(es).",
            file_name(grafana_path),
            file_name(signoz_path),
            mismatches
        )?;
    } else {
        writeln!(
            out,
            "OK: Grafana panels match expected SigNoz widgets by id/title/type."
        )?;
    }
    Ok(mismatches)
}

/// Indexes widgets by the numeric part of their `w_<id>` id. Plain
/// numeric ids are accepted too; anything else is left out of the index.
fn index_widgets(widgets: &[Widget]) -> HashMap<i64, &Widget> {
    let mut index = HashMap::new();
    for widget in widgets {
        let trimmed = widget.id.strip_prefix("w_").unwrap_or(&widget.id);
        if let Ok(id) = trimmed.parse::<i64>() {
            index.insert(id, widget);
        }
    }
    index
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
