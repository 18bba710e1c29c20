use crate::db_types::{Assignments, Filter, Row, Schema, Value};
use crate::error::{DbError, Result};
use crate::parser::{parse_assignment_map, parse_filter, parse_value_list, split_unquoted, unquote};

const USAGE_CREATE: &str = "create_table <name> <column:type> ...";
const USAGE_DROP: &str = "drop_table <name>";
const USAGE_INSERT: &str = "insert into <name> values (<v1>, <v2>, ...)";
const USAGE_SELECT: &str = "select from <name> [where <column> = <value>]";
const USAGE_UPDATE: &str = "update <name> set <column>=<value>[, ...] where <column>=<value>";
const USAGE_DELETE: &str = "delete from <name> [where <column> = <value>]";
const USAGE_INFO: &str = "info <name>";

#[derive(Debug, Clone, PartialEq)]
pub enum DbCommand {
    CreateTable {
        table: String,
        columns: Vec<String>,
    },
    DropTable {
        table: String,
    },
    ListTables,
    Insert {
        table: String,
        values: Vec<Value>,
    },
    Select {
        table: String,
        filter: Option<Filter>,
    },
    Update {
        table: String,
        assignments: Assignments,
        filter: Filter,
    },
    Delete {
        table: String,
        filter: Option<Filter>,
    },
    Info {
        table: String,
    },
    Help,
    Exit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DbResult {
    Created {
        table: String,
        schema: Schema,
    },
    Dropped {
        table: String,
    },
    Tables(Vec<String>),
    Inserted {
        table: String,
        id: i64,
    },
    Rows {
        columns: Vec<String>,
        rows: Vec<Row>,
    },
    Updated {
        table: String,
        count: usize,
        /// Set when exactly one row changed.
        id: Option<i64>,
    },
    Deleted {
        table: String,
        count: usize,
    },
    Info {
        table: String,
        schema: Schema,
        row_count: usize,
    },
    Help,
    Exit,
}

fn usage(form: &str) -> DbError {
    DbError::parse(format!("usage: {}", form))
}

fn is_kw(word: &str, kw: &str) -> bool {
    word.eq_ignore_ascii_case(kw)
}

type Words<'a> = Vec<(usize, &'a str)>;

/// Table names may be written quoted; the quotes are not part of the name.
fn table_name(word: &str) -> String {
    unquote(word).to_string()
}

/// Text of `line` following the `i`th word.
fn rest_after<'a>(line: &'a str, words: &Words<'a>, i: usize) -> &'a str {
    let (offset, word) = words[i];
    line[offset + word.len()..].trim()
}

/// Parses one shell input line.
pub fn parse_command(line: &str) -> Result<DbCommand> {
    let line = line.trim();
    let words: Words = split_unquoted(line, char::is_whitespace)?
        .into_iter()
        .filter(|(_, w)| !w.is_empty())
        .collect();

    let Some(&(_, head)) = words.first() else {
        return Err(DbError::parse("empty command"));
    };

    match head.to_ascii_lowercase().as_str() {
        "exit" => Ok(DbCommand::Exit),
        "help" => Ok(DbCommand::Help),
        "list_tables" => Ok(DbCommand::ListTables),
        "create_table" => {
            if words.len() < 3 {
                return Err(usage(USAGE_CREATE));
            }
            Ok(DbCommand::CreateTable {
                table: table_name(words[1].1),
                columns: words[2..].iter().map(|(_, w)| w.to_string()).collect(),
            })
        }
        "drop_table" => match words.as_slice() {
            [_, (_, table)] => Ok(DbCommand::DropTable {
                table: table_name(table),
            }),
            _ => Err(usage(USAGE_DROP)),
        },
        "info" => match words.as_slice() {
            [_, (_, table)] => Ok(DbCommand::Info {
                table: table_name(table),
            }),
            _ => Err(usage(USAGE_INFO)),
        },
        "insert" => parse_insert(line, &words),
        "select" => parse_select(line, &words),
        "update" => parse_update(line, &words),
        "delete" => parse_delete(line, &words),
        _ => Err(DbError::parse(format!(
            "unknown command '{}', type 'help' for the list of commands",
            head
        ))),
    }
}

fn parse_insert(line: &str, words: &Words) -> Result<DbCommand> {
    if words.len() < 5 || !is_kw(words[1].1, "into") || !is_kw(words[3].1, "values") {
        return Err(usage(USAGE_INSERT));
    }
    Ok(DbCommand::Insert {
        table: table_name(words[2].1),
        values: parse_value_list(rest_after(line, words, 3))?,
    })
}

/// Optional trailing `where <filter>` starting at word `i`.
fn parse_optional_where(line: &str, words: &Words, i: usize, form: &str) -> Result<Option<Filter>> {
    match words.get(i) {
        None => Ok(None),
        Some((_, w)) if is_kw(w, "where") => Ok(Some(parse_filter(rest_after(line, words, i))?)),
        Some(_) => Err(usage(form)),
    }
}

fn parse_select(line: &str, words: &Words) -> Result<DbCommand> {
    if words.len() < 3 || !is_kw(words[1].1, "from") {
        return Err(usage(USAGE_SELECT));
    }
    Ok(DbCommand::Select {
        table: table_name(words[2].1),
        filter: parse_optional_where(line, words, 3, USAGE_SELECT)?,
    })
}

fn parse_delete(line: &str, words: &Words) -> Result<DbCommand> {
    if words.len() < 3 || !is_kw(words[1].1, "from") {
        return Err(usage(USAGE_DELETE));
    }
    Ok(DbCommand::Delete {
        table: table_name(words[2].1),
        filter: parse_optional_where(line, words, 3, USAGE_DELETE)?,
    })
}

fn parse_update(line: &str, words: &Words) -> Result<DbCommand> {
    if words.len() < 4 || !is_kw(words[2].1, "set") {
        return Err(usage(USAGE_UPDATE));
    }

    let where_idx = (3..words.len())
        .find(|&i| is_kw(words[i].1, "where"))
        .ok_or_else(|| DbError::parse(format!("update requires a where clause; usage: {}", USAGE_UPDATE)))?;

    let (set_offset, set_word) = words[2];
    let (where_offset, _) = words[where_idx];
    let assignments = parse_assignment_map(&line[set_offset + set_word.len()..where_offset])?;
    if assignments.is_empty() {
        return Err(usage(USAGE_UPDATE));
    }

    Ok(DbCommand::Update {
        table: table_name(words[1].1),
        assignments,
        filter: parse_filter(rest_after(line, words, where_idx))?,
    })
}
