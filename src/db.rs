use log::info;

use crate::commands::{DbCommand, DbResult};
use crate::config::META_KEY;
use crate::db_types::{Assignments, Filter, ID_COLUMN, Row, Schema, Value};
use crate::engine;
use crate::error::{DbError, Result};
use crate::guard::{Confirm, confirmed, timed};
use crate::registry::Registry;
use crate::storage::BlobStore;

/// Executes commands against a blob store. Holds no table state between
/// commands: every call reloads what it needs and saves what it changed.
#[derive(Debug)]
pub struct Database<S> {
    store: S,
}

impl<S: BlobStore> Database<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    async fn load_registry(&self) -> Result<Registry> {
        Ok(self.store.load(META_KEY).await?)
    }

    async fn load_rows(&self, table: &str) -> Result<Vec<Row>> {
        Ok(self.store.load(table).await?)
    }

    pub async fn execute<C: Confirm>(&mut self, cmd: DbCommand, confirm: &mut C) -> Result<DbResult> {
        match cmd {
            DbCommand::CreateTable { table, columns } => self.create_table(table, columns).await,

            DbCommand::DropTable { table } => self.drop_table(table, confirm).await,

            DbCommand::ListTables => Ok(DbResult::Tables(self.load_registry().await?.names())),

            DbCommand::Insert { table, values } => self.insert(table, values).await,

            DbCommand::Select { table, filter } => self.select(table, filter).await,

            DbCommand::Update {
                table,
                assignments,
                filter,
            } => self.update(table, assignments, filter).await,

            DbCommand::Delete { table, filter } => self.delete(table, filter, confirm).await,

            DbCommand::Info { table } => self.info(table).await,

            DbCommand::Help => Ok(DbResult::Help),

            DbCommand::Exit => Ok(DbResult::Exit),
        }
    }

    async fn create_table(&mut self, table: String, columns: Vec<String>) -> Result<DbResult> {
        if table == META_KEY {
            return Err(DbError::validation(format!("\"{}\" is a reserved name", table)));
        }

        let mut registry = self.load_registry().await?;
        let schema = registry.create_table(&table, columns.as_slice())?.clone();
        self.store.save(META_KEY, &registry).await?;

        info!("created table {} ({})", table, schema);
        Ok(DbResult::Created { table, schema })
    }

    async fn drop_table<C: Confirm>(&mut self, table: String, confirm: &mut C) -> Result<DbResult> {
        let mut registry = self.load_registry().await?;
        registry.schema(&table)?;

        confirmed(confirm, "drop_table", || registry.drop_table(&table)).await?;
        // Rows go first so a failed remove leaves the table registered.
        self.store.remove(&table).await?;
        self.store.save(META_KEY, &registry).await?;

        info!("dropped table {}", table);
        Ok(DbResult::Dropped { table })
    }

    async fn insert(&mut self, table: String, values: Vec<Value>) -> Result<DbResult> {
        let registry = self.load_registry().await?;
        let schema = registry.schema(&table)?;

        let mut rows = self.load_rows(&table).await?;
        let id = timed("insert", || engine::insert(schema, values, &mut rows))?;
        self.store.save(&table, &rows).await?;

        Ok(DbResult::Inserted { table, id })
    }

    async fn select(&self, table: String, filter: Option<Filter>) -> Result<DbResult> {
        let registry = self.load_registry().await?;
        let schema = registry.schema(&table)?;
        if let Some(filter) = &filter {
            check_columns(&table, schema, filter)?;
        }

        let rows = self.load_rows(&table).await?;
        let selected: Vec<Row> = timed("select", || {
            engine::select(&rows, filter.as_ref())
                .into_iter()
                .cloned()
                .collect()
        });

        Ok(DbResult::Rows {
            columns: schema.column_names(),
            rows: selected,
        })
    }

    async fn update(&mut self, table: String, assignments: Assignments, filter: Filter) -> Result<DbResult> {
        let registry = self.load_registry().await?;
        let schema = registry.schema(&table)?;
        check_columns(&table, schema, &filter)?;
        let assignments = coerce_assignments(&table, schema, assignments)?;

        let mut rows = self.load_rows(&table).await?;
        let matched_ids: Vec<i64> = engine::select(&rows, Some(&filter))
            .into_iter()
            .filter_map(Row::id)
            .collect();
        let count = timed("update", || engine::update(&mut rows, &assignments, Some(&filter)));
        if count > 0 {
            self.store.save(&table, &rows).await?;
        }

        let id = match matched_ids.as_slice() {
            [id] if count == 1 => Some(*id),
            _ => None,
        };
        Ok(DbResult::Updated { table, count, id })
    }

    async fn delete<C: Confirm>(
        &mut self,
        table: String,
        filter: Option<Filter>,
        confirm: &mut C,
    ) -> Result<DbResult> {
        let registry = self.load_registry().await?;
        let schema = registry.schema(&table)?;
        if let Some(filter) = &filter {
            check_columns(&table, schema, filter)?;
        }

        let mut rows = self.load_rows(&table).await?;
        let count = confirmed(confirm, "delete", || {
            Ok(timed("delete", || engine::delete(&mut rows, filter.as_ref())))
        })
        .await?;
        if count > 0 {
            self.store.save(&table, &rows).await?;
        }

        Ok(DbResult::Deleted { table, count })
    }

    async fn info(&self, table: String) -> Result<DbResult> {
        let registry = self.load_registry().await?;
        let schema = registry.schema(&table)?.clone();
        let row_count = self.load_rows(&table).await?.len();

        Ok(DbResult::Info {
            table,
            schema,
            row_count,
        })
    }
}

fn check_columns(table: &str, schema: &Schema, filter: &Filter) -> Result<()> {
    for column in filter.keys() {
        if schema.column_type(column).is_none() {
            return Err(DbError::not_found(format!(
                "column \"{}\" does not exist in table \"{}\"",
                column, table
            )));
        }
    }
    Ok(())
}

/// Schema checks the engine leaves to its callers: known columns only, no
/// writes to `ID`, values converted to the declared types.
fn coerce_assignments(table: &str, schema: &Schema, assignments: Assignments) -> Result<Assignments> {
    check_columns(table, schema, &assignments)?;

    let mut coerced = Assignments::new();
    for (column, value) in assignments.iter() {
        if column == ID_COLUMN {
            return Err(DbError::validation(format!("column \"{}\" cannot be updated", ID_COLUMN)));
        }
        let col_type = schema
            .column_type(column)
            .ok_or_else(|| DbError::not_found(format!("column \"{}\"", column)))?;
        coerced.insert(column, engine::coerce(column, value.clone(), col_type)?);
    }
    Ok(coerced)
}
