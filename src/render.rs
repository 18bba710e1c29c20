use crate::commands::DbResult;
use crate::db_types::Row;

pub const HELP: &str = "\
*** Table management ***
  create_table <name> <column:type> ...   create a table (types: int, str, bool)
  drop_table <name>                       drop a table and its records
  list_tables                             list all tables
  info <name>                             show a table's columns and record count

*** Records ***
  insert into <name> values (<v1>, <v2>, ...)                    add a record
  select from <name> [where <column> = <value>]                 show records
  update <name> set <column>=<value>[, ...] where <column>=<value>  change records
  delete from <name> [where <column> = <value>]                 remove records

*** General ***
  help                                    show this help
  exit                                    leave the program";

/// Text shown to the user for a successful command.
pub fn render(result: &DbResult) -> String {
    match result {
        DbResult::Created { table, schema } => {
            format!("Table \"{}\" created with columns: {}", table, schema)
        }
        DbResult::Dropped { table } => format!("Table \"{}\" dropped.", table),
        DbResult::Tables(names) if names.is_empty() => "No tables yet.".to_string(),
        DbResult::Tables(names) => names
            .iter()
            .map(|name| format!("- {}", name))
            .collect::<Vec<_>>()
            .join("\n"),
        DbResult::Inserted { table, id } => {
            format!("Record with ID={} inserted into \"{}\".", id, table)
        }
        DbResult::Rows { columns, rows } => render_table(columns, rows),
        DbResult::Updated { count: 0, .. } | DbResult::Deleted { count: 0, .. } => {
            "No matching records found.".to_string()
        }
        DbResult::Updated {
            table,
            id: Some(id),
            ..
        } => format!("Record with ID={} in \"{}\" updated.", id, table),
        DbResult::Updated { count, .. } => format!("Records updated: {}", count),
        DbResult::Deleted { table, count: 1 } => {
            format!("Record deleted from \"{}\".", table)
        }
        DbResult::Deleted { count, .. } => format!("Records deleted: {}", count),
        DbResult::Info {
            table,
            schema,
            row_count,
        } => format!(
            "Table: {}\nColumns: {}\nRecords: {}",
            table, schema, row_count
        ),
        DbResult::Help => HELP.to_string(),
        DbResult::Exit => "Exiting...".to_string(),
    }
}

/// Boxed ASCII table, one line per row, cells left-aligned.
pub fn render_table(columns: &[String], rows: &[Row]) -> String {
    if rows.is_empty() {
        return "No records.".to_string();
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|col| row.get(col).map(ToString::to_string).unwrap_or_default())
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for line in &cells {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let border = {
        let parts: Vec<String> = widths.iter().map(|w| "-".repeat(w + 2)).collect();
        format!("+{}+", parts.join("+"))
    };
    let format_line = |values: &[String]| {
        let parts: Vec<String> = values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!(" {:<width$} ", v, width = *w))
            .collect();
        format!("|{}|", parts.join("|"))
    };

    let mut out = Vec::with_capacity(cells.len() + 4);
    out.push(border.clone());
    out.push(format_line(columns));
    out.push(border.clone());
    for line in &cells {
        out.push(format_line(line));
    }
    out.push(border);
    out.join("\n")
}
