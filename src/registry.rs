use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::db_types::{ColumnType, ID_COLUMN, Schema};
use crate::error::{DbError, Result};

/// Table name -> schema. Loaded, changed and saved as a whole per command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    tables: BTreeMap<String, Schema>,
}

impl Registry {
    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.tables.get(name)
    }

    /// Like `get`, but a missing table is an error.
    pub fn schema(&self, name: &str) -> Result<&Schema> {
        self.get(name)
            .ok_or_else(|| DbError::not_found(format!("table \"{}\" does not exist", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Adds `name` with columns from `name:type` specs. On any error the
    /// registry is left as it was.
    pub fn create_table<S: AsRef<str>>(&mut self, name: &str, column_specs: &[S]) -> Result<&Schema> {
        if !is_identifier(name) {
            return Err(DbError::validation(format!(
                "invalid table name \"{}\" (letters, digits and '_' only)",
                name
            )));
        }
        if self.contains(name) {
            return Err(DbError::validation(format!(
                "table \"{}\" already exists",
                name
            )));
        }

        let mut declared: Vec<(String, ColumnType)> = Vec::with_capacity(column_specs.len());
        for spec in column_specs {
            let (col, col_type) = parse_column_spec(spec.as_ref())?;
            if col == ID_COLUMN {
                return Err(DbError::validation(format!(
                    "column \"{}\" is managed automatically",
                    ID_COLUMN
                )));
            }
            if declared.iter().any(|(c, _)| *c == col) {
                return Err(DbError::validation(format!(
                    "column \"{}\" is declared more than once",
                    col
                )));
            }
            declared.push((col, col_type));
        }

        debug!("create_table {}: {} columns", name, declared.len());
        let schema = self
            .tables
            .entry(name.to_string())
            .or_insert_with(|| Schema::new(declared));
        Ok(schema)
    }

    /// Removes `name` and returns its schema.
    pub fn drop_table(&mut self, name: &str) -> Result<Schema> {
        let schema = self
            .tables
            .remove(name)
            .ok_or_else(|| DbError::not_found(format!("table \"{}\" does not exist", name)))?;
        debug!("drop_table {}", name);
        Ok(schema)
    }
}

// Table names double as storage keys, so keep them path-safe.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_column_spec(spec: &str) -> Result<(String, ColumnType)> {
    let mut parts = spec.split(':');
    let (Some(col), Some(kind), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(DbError::validation(format!(
            "invalid column spec '{}' (expected name:type)",
            spec
        )));
    };
    if col.is_empty() {
        return Err(DbError::validation(format!(
            "invalid column spec '{}' (empty column name)",
            spec
        )));
    }
    Ok((col.to_string(), kind.parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Registry {
        let mut registry = Registry::default();
        registry
            .create_table("users", &["name:str", "age:int", "active:bool"])
            .unwrap();
        registry
    }

    #[test]
    fn test_create_table_prepends_id() {
        let registry = users();
        let schema = registry.get("users").unwrap();
        assert_eq!(
            schema.column_names(),
            vec!["ID", "name", "age", "active"]
        );
        assert_eq!(schema.column_type("ID"), Some(ColumnType::Int));
        assert_eq!(schema.column_type("age"), Some(ColumnType::Int));
        assert_eq!(schema.column_type("name"), Some(ColumnType::Text));
    }

    #[test]
    fn test_create_then_drop_round_trip() {
        let before = users();
        let mut registry = before.clone();

        registry.create_table("orders", &["total:int"]).unwrap();
        assert_eq!(registry.names().len(), 2);
        registry.drop_table("orders").unwrap();

        assert_eq!(registry, before);
    }

    #[test]
    fn test_create_existing_table_fails() {
        let mut registry = users();
        let before = registry.clone();
        let err = registry.create_table("users", &["x:int"]).unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert_eq!(registry, before);
    }

    #[test]
    fn test_invalid_type_kind_leaves_registry_unmodified() {
        let mut registry = users();
        let before = registry.clone();
        let err = registry
            .create_table("prices", &["item:str", "price:float"])
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert_eq!(registry, before);
    }

    #[test]
    fn test_malformed_column_specs() {
        let mut registry = Registry::default();
        for bad in ["name", "a:b:c", ":int", "ID:int"] {
            assert!(
                registry.create_table("t", &[bad]).is_err(),
                "spec {:?} should be rejected",
                bad
            );
        }
        assert!(registry
            .create_table("t", &["a:int", "a:str"])
            .is_err());
        assert!(registry.names().is_empty());
    }

    #[test]
    fn test_table_name_must_be_identifier() {
        let mut registry = Registry::default();
        for bad in ["../etc", "a b", "1users", "", "users.json"] {
            assert!(registry.create_table(bad, &["x:int"]).is_err(), "{:?}", bad);
        }
        assert!(registry.create_table("_user_2", &["x:int"]).is_ok());
    }

    #[test]
    fn test_drop_missing_table() {
        let mut registry = users();
        let err = registry.drop_table("ghosts").unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
        assert_eq!(registry.names(), vec!["users"]);
    }

    #[test]
    fn test_registry_json_layout() {
        let registry = users();
        let json = serde_json::to_string(&registry).unwrap();
        assert_eq!(
            json,
            r#"{"users":{"ID":"int","name":"str","age":"int","active":"bool"}}"#
        );
        let back: Registry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, registry);
    }
}
