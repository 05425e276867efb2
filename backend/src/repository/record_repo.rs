//! Entity Row Repository
//!
//! One generic SQLite repository for every stored entity; the column
//! layout comes from the entity's `TableSpec`.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde_json::{Map, Value};
use taskdeck::AccountId;
use tokio::sync::Mutex;

use super::table::{from_sql, to_sql, Stored};
use super::traits::Repository;
use crate::domain::{DomainError, DomainResult};

pub struct RecordRepository<E> {
    conn: Arc<Mutex<Connection>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Stored> RecordRepository<E> {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            _entity: PhantomData,
        }
    }

    fn read_row(row: &Row<'_>) -> rusqlite::Result<Vec<SqlValue>> {
        (0..E::LAYOUT.columns.len() + 3).map(|i| row.get(i)).collect()
    }

    /// Rebuild the JSON row from `select_list` order
    fn decode(values: Vec<SqlValue>) -> DomainResult<E::Row> {
        let mut values = values.into_iter();
        let mut object = Map::new();
        for key in ["id", "user_id", "created_at"] {
            let value = match values.next() {
                Some(SqlValue::Text(s)) => Value::String(s),
                _ => return Err(DomainError::Internal(format!("{}.{} is not text", E::TABLE, key))),
            };
            object.insert(key.to_string(), value);
        }
        for (column, value) in E::LAYOUT.columns.iter().zip(values) {
            object.insert(column.name.to_string(), from_sql(column, value)?);
        }
        serde_json::from_value(Value::Object(object))
            .map_err(|e| DomainError::Internal(format!("corrupt {} row: {}", E::TABLE, e)))
    }

    fn select_one(conn: &Connection, owner: &AccountId, id: &str) -> DomainResult<Option<E::Row>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?1 AND user_id = ?2",
            E::LAYOUT.select_list(),
            E::TABLE
        );
        let values = conn
            .query_row(&sql, params![id, owner.as_str()], Self::read_row)
            .optional()?;
        values.map(Self::decode).transpose()
    }

    fn object(value: Value) -> DomainResult<Map<String, Value>> {
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(DomainError::InvalidInput(format!("{} payload is not an object", E::TABLE))),
        }
    }
}

#[async_trait]
impl<E: Stored> Repository<E> for RecordRepository<E> {
    async fn create(&self, owner: &AccountId, row: &E::NewRow) -> DomainResult<E::Row> {
        let fields = Self::object(serde_json::to_value(row)?)?;
        if let Some(claimed) = fields.get("user_id").and_then(Value::as_str) {
            if claimed != owner.as_str() {
                return Err(DomainError::Unauthorized(format!("cannot insert {} for another account", E::TABLE)));
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let mut names = vec!["id", "user_id", "created_at"];
        let mut values = vec![
            SqlValue::Text(id.clone()),
            SqlValue::Text(owner.as_str().to_string()),
            SqlValue::Text(created_at),
        ];
        for column in E::LAYOUT.columns {
            if let Some(value) = fields.get(column.name) {
                names.push(column.name);
                values.push(to_sql(column, value)?);
            }
        }

        let placeholders = (1..=names.len()).map(|i| format!("?{}", i)).collect::<Vec<_>>().join(", ");
        let sql = format!("INSERT INTO {} ({}) VALUES ({})", E::TABLE, names.join(", "), placeholders);

        let conn = self.conn.lock().await;
        conn.execute(&sql, params_from_iter(values))?;
        Self::select_one(&conn, owner, &id)?
            .ok_or_else(|| DomainError::Internal(format!("inserted {} {} vanished", E::TABLE, id)))
    }

    async fn find_by_id(&self, owner: &AccountId, id: &str) -> DomainResult<Option<E::Row>> {
        let conn = self.conn.lock().await;
        Self::select_one(&conn, owner, id)
    }

    async fn list(&self, owner: &AccountId) -> DomainResult<Vec<E::Row>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
            E::LAYOUT.select_list(),
            E::TABLE
        );
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![owner.as_str()], Self::read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(Self::decode).collect()
    }

    async fn update(&self, owner: &AccountId, id: &str, patch: &E::RowPatch) -> DomainResult<()> {
        let fields = Self::object(serde_json::to_value(patch)?)?;
        let mut assignments = Vec::new();
        let mut values = Vec::new();
        for (name, value) in &fields {
            let column = E::LAYOUT
                .column(name)
                .ok_or_else(|| DomainError::InvalidInput(format!("{} has no updatable column {}", E::TABLE, name)))?;
            values.push(to_sql(column, value)?);
            assignments.push(format!("{} = ?{}", column.name, values.len()));
        }

        if assignments.is_empty() {
            // Nothing to write; still report a missing row
            return match self.find_by_id(owner, id).await? {
                Some(_) => Ok(()),
                None => Err(DomainError::NotFound(format!("{} {}", E::TABLE, id))),
            };
        }

        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{} AND user_id = ?{}",
            E::TABLE,
            assignments.join(", "),
            values.len() + 1,
            values.len() + 2
        );
        values.push(SqlValue::Text(id.to_string()));
        values.push(SqlValue::Text(owner.as_str().to_string()));
        let conn = self.conn.lock().await;
        let changed = conn.execute(&sql, params_from_iter(values))?;

        if changed == 0 {
            return Err(DomainError::NotFound(format!("{} {}", E::TABLE, id)));
        }
        Ok(())
    }

    async fn delete(&self, owner: &AccountId, id: &str) -> DomainResult<()> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1 AND user_id = ?2", E::TABLE),
            params![id, owner.as_str()],
        )?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("{} {}", E::TABLE, id)));
        }
        Ok(())
    }
}
