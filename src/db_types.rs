use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DbError;

/// Name of the auto-managed key column every schema starts with.
pub const ID_COLUMN: &str = "ID";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "str")]
    Text,
    #[serde(rename = "bool")]
    Bool,
}

impl ColumnType {
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::Int => "int",
            ColumnType::Text => "str",
            ColumnType::Bool => "bool",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" => Ok(ColumnType::Int),
            "str" => Ok(ColumnType::Text),
            "bool" => Ok(ColumnType::Bool),
            _ => Err(DbError::validation(format!(
                "unknown column type '{}' (expected int, str or bool)",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Value {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Int(_) => ColumnType::Int,
            Value::Text(_) => ColumnType::Text,
            Value::Bool(_) => ColumnType::Bool,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Text(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Insertion-ordered string-keyed map, serialized as a JSON object with keys
/// in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fields<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for Fields<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> Fields<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Overwrites an existing key in place, or appends a new one.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Serialize> Serialize for Fields<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct FieldsVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for FieldsVisitor<V> {
    type Value = Fields<V>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of column names")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut fields = Fields::new();
        while let Some((k, v)) = access.next_entry::<String, V>()? {
            fields.insert(k, v);
        }
        Ok(fields)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Fields<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FieldsVisitor(PhantomData))
    }
}

/// One record: `ID` first, then the declared columns in schema order.
pub type Row = Fields<Value>;

/// Column -> expected value, all of which must hold.
pub type Filter = Fields<Value>;

/// Column -> new value for `update ... set`.
pub type Assignments = Fields<Value>;

impl Row {
    pub fn id(&self) -> Option<i64> {
        match self.get(ID_COLUMN) {
            Some(Value::Int(id)) => Some(*id),
            _ => None,
        }
    }
}

/// Ordered column declaration of a table, always led by `ID: int`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    columns: Fields<ColumnType>,
}

impl Schema {
    /// Builds a schema from the declared columns, prepending `ID`.
    pub fn new(declared: impl IntoIterator<Item = (String, ColumnType)>) -> Self {
        let mut columns = Fields::new();
        columns.insert(ID_COLUMN, ColumnType::Int);
        for (name, col_type) in declared {
            columns.insert(name, col_type);
        }
        Self { columns }
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns.get(name).copied()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.keys().map(str::to_string).collect()
    }

    /// All columns, `ID` included.
    pub fn columns(&self) -> impl Iterator<Item = (&str, ColumnType)> {
        self.columns.iter().map(|(name, ty)| (name, *ty))
    }

    /// Columns the caller supplies values for.
    pub fn data_columns(&self) -> impl Iterator<Item = (&str, ColumnType)> {
        self.columns().filter(|(name, _)| *name != ID_COLUMN)
    }

    pub fn data_column_count(&self) -> usize {
        self.data_columns().count()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let specs: Vec<String> = self
            .columns()
            .map(|(name, ty)| format!("{}:{}", name, ty))
            .collect();
        f.write_str(&specs.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_insert_overwrites_in_place() {
        let mut fields: Fields<Value> = Fields::new();
        fields.insert("a", Value::Int(1));
        fields.insert("b", Value::Int(2));
        fields.insert("a", Value::Int(3));

        let keys: Vec<&str> = fields.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(fields.get("a"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_schema_serializes_in_column_order() {
        let schema = Schema::new(vec![
            ("name".to_string(), ColumnType::Text),
            ("age".to_string(), ColumnType::Int),
            ("active".to_string(), ColumnType::Bool),
        ]);

        let json = serde_json::to_string(&schema).unwrap();
        assert_eq!(
            json,
            r#"{"ID":"int","name":"str","age":"int","active":"bool"}"#
        );

        let back: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
        assert_eq!(back.data_column_count(), 3);
    }

    #[test]
    fn test_row_json_layout() {
        let json = r#"{"ID":1,"name":"Sergei","age":28,"active":true}"#;
        let row: Row = serde_json::from_str(json).unwrap();

        assert_eq!(row.id(), Some(1));
        assert_eq!(row.get("name"), Some(&Value::Text("Sergei".into())));
        assert_eq!(row.get("age"), Some(&Value::Int(28)));
        assert_eq!(row.get("active"), Some(&Value::Bool(true)));
        assert_eq!(serde_json::to_string(&row).unwrap(), json);
    }

    #[test]
    fn test_column_type_from_str() {
        assert_eq!("int".parse::<ColumnType>().unwrap(), ColumnType::Int);
        assert_eq!("str".parse::<ColumnType>().unwrap(), ColumnType::Text);
        assert_eq!("bool".parse::<ColumnType>().unwrap(), ColumnType::Bool);
        assert!(matches!(
            "float".parse::<ColumnType>(),
            Err(DbError::Validation(_))
        ));
    }

    #[test]
    fn test_schema_display() {
        let schema = Schema::new(vec![("name".to_string(), ColumnType::Text)]);
        assert_eq!(schema.to_string(), "ID:int, name:str");
    }
}
