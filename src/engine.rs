//! Row store: type coercion, ID assignment and filter-driven CRUD over one
//! table's rows. Nothing here touches storage; callers load and save.

use log::debug;

use crate::db_types::{Assignments, ColumnType, Filter, ID_COLUMN, Row, Schema, Value};
use crate::error::{DbError, Result};

/// Converts `value` to the column's declared type.
pub fn coerce(column: &str, value: Value, col_type: ColumnType) -> Result<Value> {
    if value.column_type() == col_type {
        return Ok(value);
    }

    let converted = match (col_type, &value) {
        (ColumnType::Bool, Value::Text(s)) if s.eq_ignore_ascii_case("true") => Some(Value::Bool(true)),
        (ColumnType::Bool, Value::Text(s)) if s.eq_ignore_ascii_case("false") => Some(Value::Bool(false)),
        (ColumnType::Int, Value::Text(s)) => s.trim().parse().ok().map(Value::Int),
        (ColumnType::Text, Value::Int(_) | Value::Bool(_)) => Some(Value::Text(value.to_string())),
        _ => None,
    };

    converted.ok_or_else(|| {
        DbError::validation(format!(
            "value '{}' for column \"{}\" cannot be converted to {}",
            value, column, col_type
        ))
    })
}

/// `max(ID) + 1`, or 1 for an empty table.
pub fn next_id(rows: &[Row]) -> i64 {
    rows.iter()
        .filter_map(Row::id)
        .max()
        .map_or(1, |max| max + 1)
}

fn matches(row: &Row, filter: Option<&Filter>) -> bool {
    match filter {
        None => true,
        Some(filter) => filter
            .iter()
            .all(|(column, expected)| row.get(column) == Some(expected)),
    }
}

/// Validates and appends one row built from `values` in schema order.
/// Returns the new row's ID. `rows` is untouched on error.
pub fn insert(schema: &Schema, values: Vec<Value>, rows: &mut Vec<Row>) -> Result<i64> {
    let expected = schema.data_column_count();
    if values.len() != expected {
        return Err(DbError::validation(format!(
            "expected {} values, got {}",
            expected,
            values.len()
        )));
    }

    let id = next_id(rows);
    let mut row = Row::new();
    row.insert(ID_COLUMN, Value::Int(id));
    for ((column, col_type), value) in schema.data_columns().zip(values) {
        row.insert(column, coerce(column, value, col_type)?);
    }

    debug!("insert: ID={}", id);
    rows.push(row);
    Ok(id)
}

/// Rows matching every filter entry by type and value. `None` selects all.
pub fn select<'a>(rows: &'a [Row], filter: Option<&Filter>) -> Vec<&'a Row> {
    rows.iter().filter(|row| matches(row, filter)).collect()
}

/// Writes `assignments` onto every matching row and returns how many
/// matched. Keys are not checked against any schema here.
pub fn update(rows: &mut [Row], assignments: &Assignments, filter: Option<&Filter>) -> usize {
    let mut matched = 0;
    for row in rows.iter_mut().filter(|row| matches(row, filter)) {
        for (column, value) in assignments.iter() {
            row.insert(column, value.clone());
        }
        matched += 1;
    }
    debug!("update: {} rows matched", matched);
    matched
}

/// Removes matching rows, keeping the rest in order. `None` removes all.
pub fn delete(rows: &mut Vec<Row>, filter: Option<&Filter>) -> usize {
    let before = rows.len();
    match filter {
        None => rows.clear(),
        Some(_) => rows.retain(|row| !matches(row, filter)),
    }
    let deleted = before - rows.len();
    debug!("delete: {} rows removed", deleted);
    deleted
}
