//! Column Mapping
//!
//! Describes how each entity's remote row is laid out in SQLite and
//! converts between JSON row values and SQL values. Rows keep the same
//! snake_case field names as the hosted service.

use rusqlite::types::Value as SqlValue;
use serde_json::Value;
use taskdeck::models::Entity;
use taskdeck::{Project, Task, TeamMember};

use crate::domain::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    /// JSON bool stored as 0/1
    Bool,
    /// Arrays and objects stored as JSON text
    Json,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn text(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Text,
    }
}

const fn flag(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Bool,
    }
}

const fn json(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Json,
    }
}

/// Data columns of an entity table; `id`, `user_id` and `created_at` are implied
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub columns: &'static [Column],
}

impl TableSpec {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// `id, user_id, created_at, <data columns>` in select order
    pub fn select_list(&self) -> String {
        let mut names = vec!["id", "user_id", "created_at"];
        names.extend(self.columns.iter().map(|c| c.name));
        names.join(", ")
    }
}

/// Entities the local gateway can persist
pub trait Stored: Entity {
    const LAYOUT: TableSpec;
}

impl Stored for Task {
    const LAYOUT: TableSpec = TableSpec {
        columns: &[
            text("title"),
            text("description"),
            text("category"),
            text("priority"),
            text("status"),
            text("assignee"),
            json("tags"),
            json("subtasks"),
            text("due_date"),
            flag("completed"),
        ],
    };
}

impl Stored for Project {
    const LAYOUT: TableSpec = TableSpec {
        columns: &[
            text("title"),
            text("description"),
            text("start_date"),
            text("end_date"),
            text("budget"),
            text("priority"),
            text("category"),
            json("team_members"),
            text("status"),
            text("color"),
            text("bg"),
        ],
    };
}

impl Stored for TeamMember {
    const LAYOUT: TableSpec = TableSpec {
        columns: &[
            text("name"),
            text("role"),
            text("email"),
            text("department"),
            text("access_level"),
            text("status"),
        ],
    };
}

pub fn to_sql(column: &Column, value: &Value) -> DomainResult<SqlValue> {
    Ok(match (column.kind, value) {
        (_, Value::Null) => SqlValue::Null,
        (ColumnKind::Text, Value::String(s)) => SqlValue::Text(s.clone()),
        (ColumnKind::Text, Value::Number(n)) => SqlValue::Text(n.to_string()),
        (ColumnKind::Bool, Value::Bool(b)) => SqlValue::Integer(i64::from(*b)),
        (ColumnKind::Json, v @ (Value::Array(_) | Value::Object(_))) => SqlValue::Text(serde_json::to_string(v)?),
        (_, other) => {
            return Err(DomainError::InvalidInput(format!(
                "unexpected value for {}: {}",
                column.name, other
            )))
        }
    })
}

pub fn from_sql(column: &Column, value: SqlValue) -> DomainResult<Value> {
    Ok(match (column.kind, value) {
        (_, SqlValue::Null) => Value::Null,
        (ColumnKind::Bool, SqlValue::Integer(i)) => Value::Bool(i != 0),
        (ColumnKind::Json, SqlValue::Text(s)) => serde_json::from_str(&s)?,
        (_, SqlValue::Text(s)) => Value::String(s),
        (_, SqlValue::Integer(i)) => Value::from(i),
        (_, SqlValue::Real(f)) => Value::from(f),
        (_, SqlValue::Blob(_)) => {
            return Err(DomainError::Internal(format!("blob in column {}", column.name)))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bool_and_json_columns() {
        let completed = flag("completed");
        assert_eq!(to_sql(&completed, &json!(true)).unwrap(), SqlValue::Integer(1));
        assert_eq!(from_sql(&completed, SqlValue::Integer(0)).unwrap(), json!(false));

        let tags = json("tags");
        let stored = to_sql(&tags, &json!(["a", "b"])).unwrap();
        assert_eq!(stored, SqlValue::Text(r#"["a","b"]"#.into()));
        assert_eq!(from_sql(&tags, stored).unwrap(), json!(["a", "b"]));
    }

    #[test]
    fn test_null_passes_through() {
        let due = text("due_date");
        assert_eq!(to_sql(&due, &Value::Null).unwrap(), SqlValue::Null);
        assert_eq!(from_sql(&due, SqlValue::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_rejects_mismatched_value() {
        assert!(to_sql(&flag("completed"), &json!("yes")).is_err());
        assert!(to_sql(&text("title"), &json!(["x"])).is_err());
    }

    #[test]
    fn test_select_list() {
        assert_eq!(
            TeamMember::LAYOUT.select_list(),
            "id, user_id, created_at, name, role, email, department, access_level, status"
        );
        assert!(Task::LAYOUT.column("due_date").is_some());
        assert!(Task::LAYOUT.column("user_id").is_none());
    }
}
