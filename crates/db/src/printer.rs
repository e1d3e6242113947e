use comfy_table::{Cell, Table};
use index::{IndexStats, TableIndex};
use serde::Serialize;
use storage::{Tuple, TupleSchema};

const MAX_DISPLAY_ROWS: usize = 20;

/// One index's shape and counters, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexReport {
    pub name: String,
    pub kind: &'static str,
    pub unique: bool,
    pub columns: Vec<usize>,
    pub entries: usize,
    pub memory_bytes: usize,
    pub stats: IndexStats,
}

impl IndexReport {
    pub fn from_index(index: &dyn TableIndex) -> Self {
        let scheme = index.scheme();
        Self {
            name: index.name().to_string(),
            kind: index.type_name(),
            unique: scheme.unique,
            columns: scheme.column_indices.clone(),
            entries: index.size(),
            memory_bytes: index.memory_estimate(),
            stats: index.stats(),
        }
    }
}

pub fn format_reports(reports: &[IndexReport]) -> String {
    let mut table = Table::new();
    table.set_header(vec![
        "index", "type", "unique", "columns", "entries", "memory", "inserts", "deletes",
        "updates", "lookups",
    ]);
    for report in reports {
        let columns = report
            .columns
            .iter()
            .map(|column| column.to_string())
            .collect::<Vec<_>>()
            .join(",");
        table.add_row(vec![
            Cell::new(&report.name),
            Cell::new(report.kind),
            Cell::new(report.unique),
            Cell::new(columns),
            Cell::new(report.entries),
            Cell::new(format_bytes(report.memory_bytes)),
            Cell::new(report.stats.inserts),
            Cell::new(report.stats.deletes),
            Cell::new(report.stats.updates),
            Cell::new(report.stats.lookups),
        ]);
    }
    table.to_string()
}

pub fn reports_to_json(reports: &[IndexReport]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(reports)
}

pub fn format_rows(schema: &TupleSchema, rows: &[Tuple]) -> String {
    let total_rows = rows.len();
    let mut table = Table::new();
    let mut headers = vec![Cell::new("address")];
    headers.extend(schema.columns().iter().map(|column| Cell::new(&column.name)));
    table.set_header(headers);

    for row in rows.iter().take(MAX_DISPLAY_ROWS) {
        let address = row
            .address()
            .map(|address| address.to_string())
            .unwrap_or_default();
        let mut cells = vec![Cell::new(address)];
        cells.extend(row.values().iter().map(Cell::new));
        table.add_row(cells);
    }

    let mut output = table.to_string();
    output.push('\n');
    output.push_str(&format!("({} rows)", total_rows));

    let hidden_rows = total_rows.saturating_sub(MAX_DISPLAY_ROWS);
    if hidden_rows > 0 {
        output.push('\n');
        output.push_str(&format!("... ({} rows hidden)", hidden_rows));
    }
    output
}

fn format_bytes(len: usize) -> String {
    if len >= 1024 * 1024 {
        format!("{}MB", len.div_ceil(1024 * 1024))
    } else if len >= 1024 {
        format!("{}KB", len.div_ceil(1024))
    } else {
        format!("{}B", len)
    }
}
