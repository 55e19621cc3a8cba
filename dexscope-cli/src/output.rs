use comfy_table::{presets, CellAlignment, ContentArrangement, Table};
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::info::{DebugInfo, TryInfo},
};

/// Print `data` as JSON (if `--json`) or call `display_fn` for human-readable output.
pub fn print_output<T: Serialize>(
    data: &T,
    opts: &GlobalOptions,
    display_fn: impl FnOnce(&T),
) -> anyhow::Result<()> {
    if opts.json {
        let json = serde_json::to_string_pretty(data)?;
        println!("{json}");
    } else {
        display_fn(data);
    }
    Ok(())
}

/// Prints `label: value` pairs with the values lined up.
pub fn print_fields(indent: &str, fields: &[(&str, String)]) {
    let width = fields.iter().map(|(label, _)| label.len()).max().unwrap_or(0) + 1;
    for (label, value) in fields {
        println!("{indent}{:<width$}  {value}", format!("{label}:"));
    }
}

/// Prints one row per handler: the covered range, the caught type and the catch address.
pub fn print_try_table(tries: &[TryInfo]) {
    print_indented("  ", &try_table(tries));
}

fn try_table(tries: &[TryInfo]) -> Table {
    let mut table = borderless(&[
        ("Start", CellAlignment::Right),
        ("End", CellAlignment::Right),
        ("Type", CellAlignment::Left),
        ("Catch", CellAlignment::Right),
    ]);
    for item in tries {
        for handler in &item.handlers {
            let type_name = handler
                .type_key
                .map_or_else(|| "<any>".to_string(), |key| format!("type@{key}"));
            table.add_row(vec![
                item.start.clone(),
                item.end.clone(),
                type_name,
                handler.address.clone(),
            ]);
        }
    }
    table
}

/// Prints the header of a debug program followed by its row count per kind.
pub fn print_debug_summary(debug: &DebugInfo) {
    let mut fields = vec![
        ("Line start", debug.line_start.to_string()),
        ("Parameters", debug.parameter_count.to_string()),
        ("Rows", debug.row_count.to_string()),
        ("Advance rows", debug.advance_rows.to_string()),
    ];
    if let (Some(first), Some(last)) = (debug.first_line, debug.last_line) {
        fields.push(("Lines", format!("{first}..={last}")));
    }
    print_fields("  ", &fields);

    if debug.kinds.is_empty() {
        return;
    }
    let mut table = borderless(&[("Kind", CellAlignment::Left), ("Rows", CellAlignment::Right)]);
    for (kind, count) in &debug.kinds {
        table.add_row(vec![kind.clone(), count.to_string()]);
    }
    print_indented("  ", &table);
}

// Whitespace-separated columns, two spaces apart, no padding at the outer edges.
fn borderless(columns: &[(&str, CellAlignment)]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(columns.iter().map(|(name, _)| *name).collect::<Vec<_>>());

    let last = columns.len().saturating_sub(1);
    for (i, (_, alignment)) in columns.iter().enumerate() {
        if let Some(column) = table.column_mut(i) {
            column.set_cell_alignment(*alignment);
            column.set_padding((u16::from(i != 0), u16::from(i != last)));
        }
    }
    table
}

fn print_indented(indent: &str, table: &Table) {
    for line in table.to_string().lines() {
        println!("{indent}{}", line.trim_end());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::info::HandlerInfo;

    #[test]
    fn try_table_has_a_row_per_handler() {
        let tries = vec![TryInfo {
            start: "0x0002".to_string(),
            end: "0x0006".to_string(),
            handlers: vec![
                HandlerInfo {
                    type_key: Some(3),
                    address: "0x0006".to_string(),
                },
                HandlerInfo {
                    type_key: None,
                    address: "0x0008".to_string(),
                },
            ],
        }];

        let text = try_table(&tries).to_string();
        let rows: Vec<Vec<&str>> = text
            .lines()
            .map(|line| line.split_whitespace().collect())
            .collect();
        assert_eq!(
            rows,
            vec![
                vec!["Start", "End", "Type", "Catch"],
                vec!["0x0002", "0x0006", "type@3", "0x0006"],
                vec!["0x0002", "0x0006", "<any>", "0x0008"],
            ]
        );
    }
}
