use std::cmp::Ordering;

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use pkdb_core::{PipelineState, StudySummary};
use pkdb_model::{IssueReport, IssueSeverity, MeasurementKind, RecordIssue, RecordKind};
use pkdb_units::CanonicalUnitTable;

/// Record kinds in processing order.
const KIND_ORDER: [RecordKind; 4] = [
    RecordKind::Intervention,
    RecordKind::Characteristica,
    RecordKind::Output,
    RecordKind::Timecourse,
];

pub fn print_summary(state: &PipelineState) {
    println!("{}", summary_line(&state.report.study, &state.summary));
    println!("{}", summary_table(&state.summary));
    if let Some(table) = issue_table(&state.report) {
        println!();
        println!("Issues:");
        println!("{table}");
    }
}

/// One-line outcome of a study run.
pub fn summary_line(study: &str, summary: &StudySummary) -> String {
    let (total, converted, unchanged, rejected) = summary.kinds.values().fold(
        (0, 0, 0, 0),
        |(t, c, u, r), kind| (t + kind.total, c + kind.converted, u + kind.unchanged, r + kind.rejected),
    );
    format!(
        "Study {study}: {total} records, {converted} converted, {unchanged} unchanged, \
         {rejected} rejected, {} PK bundle(s)",
        summary.bundles
    )
}

pub fn summary_table(summary: &StudySummary) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Kind"),
        header_cell("Records"),
        header_cell("Converted"),
        header_cell("Unchanged"),
        header_cell("Rejected"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 1..=4 {
        align_column(&mut table, index, CellAlignment::Right);
    }

    let mut totals = [0usize; 4];
    for kind in KIND_ORDER {
        let counts = summary.kind(kind);
        if counts.total == 0 {
            continue;
        }
        totals[0] += counts.total;
        totals[1] += counts.converted;
        totals[2] += counts.unchanged;
        totals[3] += counts.rejected;
        table.add_row(vec![
            kind_cell(kind),
            Cell::new(counts.total),
            count_cell(counts.converted, Color::Green),
            dim_cell(counts.unchanged),
            count_cell(counts.rejected, Color::Red),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(totals[0]).add_attribute(Attribute::Bold),
        count_cell(totals[1], Color::Green).add_attribute(Attribute::Bold),
        dim_cell(totals[2]).add_attribute(Attribute::Bold),
        count_cell(totals[3], Color::Red).add_attribute(Attribute::Bold),
    ]);
    table
}

/// Issues ordered by severity, then record. `None` when there are none.
pub fn issue_table(report: &IssueReport) -> Option<Table> {
    if report.is_empty() {
        return None;
    }
    let mut issues: Vec<&RecordIssue> = report.issues.iter().collect();
    issues.sort_by(|a, b| {
        let severity = severity_rank(b.severity).cmp(&severity_rank(a.severity));
        if severity != Ordering::Equal {
            return severity;
        }
        a.record.cmp(&b.record)
    });

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Record"),
        header_cell("Severity"),
        header_cell("Field"),
        header_cell("Unit"),
        header_cell("Message"),
    ]);
    apply_issue_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Center);
    for issue in issues {
        table.add_row(vec![
            Cell::new(issue.record.to_string())
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            severity_cell(issue.severity),
            optional_cell(issue.field.map(|f| f.as_str())),
            optional_cell(issue.unit.as_deref()),
            Cell::new(&issue.message),
        ]);
    }
    Some(table)
}

/// Canonical units per category, optionally restricted to one kind.
pub fn units_table(canonical: &CanonicalUnitTable, kind: Option<MeasurementKind>) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Kind"),
        header_cell("Category"),
        header_cell("Canonical"),
        header_cell("Allowed"),
    ]);
    apply_table_style(&mut table);
    for entry in canonical
        .iter()
        .filter(|entry| kind.is_none_or(|kind| entry.kind == kind))
    {
        let units = entry
            .canonical
            .iter()
            .map(|unit| unit.symbol())
            .collect::<Vec<_>>()
            .join(", ");
        let allowed = if entry.allowed.is_empty() {
            dim_cell("any")
        } else {
            Cell::new(
                entry
                    .allowed
                    .iter()
                    .map(|unit| unit.symbol())
                    .collect::<Vec<_>>()
                    .join(", "),
            )
        };
        table.add_row(vec![
            Cell::new(entry.kind.as_str()),
            Cell::new(&entry.category).add_attribute(Attribute::Bold),
            Cell::new(units).fg(Color::Green),
            allowed,
        ]);
    }
    table
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn apply_issue_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(160);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn kind_cell(kind: RecordKind) -> Cell {
    Cell::new(kind.as_str())
        .fg(Color::Blue)
        .add_attribute(Attribute::Bold)
}

fn severity_cell(severity: IssueSeverity) -> Cell {
    match severity {
        IssueSeverity::Reject => Cell::new("REJECT")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
        IssueSeverity::Warning => Cell::new("WARN").fg(Color::Yellow),
    }
}

fn severity_rank(severity: IssueSeverity) -> u8 {
    match severity {
        IssueSeverity::Reject => 2,
        IssueSeverity::Warning => 1,
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn optional_cell(value: Option<&str>) -> Cell {
    match value {
        Some(value) => Cell::new(value),
        None => dim_cell("-"),
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
