//! Terminal rendering of dump reports and query results

use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL};

use sqlport_core::{QueryResult, Value};
use sqlport_dump::DumpOutcome;

/// Summary table for a finished or cancelled dump, plus one row per failure
pub fn render_dump_outcome(outcome: &DumpOutcome) -> String {
    let report = outcome.report();
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Status", "Objects", "Failed", "Rows", "Batches"]);
    table.add_row(vec![
        Cell::new(if outcome.is_cancelled() {
            "cancelled"
        } else if report.is_complete() {
            "complete"
        } else {
            "partial"
        }),
        Cell::new(format!("{} of {}", report.success_count(), report.total())),
        Cell::new(report.failures.len()),
        Cell::new(report.rows_written),
        Cell::new(report.batches_written),
    ]);

    let mut rendered = table.to_string();
    if !report.failures.is_empty() {
        let mut failures = Table::new();
        failures
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Object", "Reason"]);
        for failure in &report.failures {
            failures.add_row(vec![failure.object.to_string(), failure.reason()]);
        }
        rendered.push('\n');
        rendered.push_str(&failures.to_string());
    }
    rendered
}

/// Rows of a query result; NULL is shown as `NULL`
pub fn render_query_result(result: &QueryResult) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(result.column_names());
    for row in &result.rows {
        table.add_row(row.values.iter().map(display_value));
    }
    table.to_string()
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Bytes(bytes) if bytes.len() <= 16 => {
            bytes.iter().map(|b| format!("{b:02X}")).collect::<String>()
        }
        other => other.to_string(),
    }
}
