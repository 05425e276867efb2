//! Profile Repository

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use taskdeck::{AccountId, Profile, ProfileFlag};
use tokio::sync::Mutex;

use crate::domain::{DomainError, DomainResult};

pub struct ProfileRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProfileRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub async fn find(&self, id: &AccountId) -> DomainResult<Option<Profile>> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                "SELECT id, email, full_name, avatar_url, is_premium, created_at FROM profiles WHERE id = ?1",
                params![id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, bool>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(id, email, full_name, avatar_url, is_premium, created_at)| {
            Ok(Profile {
                id: AccountId::new(id),
                email,
                full_name,
                avatar_url,
                is_premium,
                created_at: parse_timestamp(&created_at)?,
            })
        })
        .transpose()
    }

    pub async fn set_flag(&self, id: &AccountId, flag: ProfileFlag, value: bool) -> DomainResult<()> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            &format!("UPDATE profiles SET {} = ?1 WHERE id = ?2", flag.column()),
            params![value, id.as_str()],
        )?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("profile {}", id)));
        }
        Ok(())
    }
}

pub(crate) fn insert_profile(conn: &Connection, profile: &Profile) -> DomainResult<()> {
    conn.execute(
        "INSERT INTO profiles (id, email, full_name, avatar_url, is_premium, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            profile.id.as_str(),
            profile.email,
            profile.full_name,
            profile.avatar_url,
            profile.is_premium,
            profile.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        ],
    )?;
    Ok(())
}

pub(crate) fn parse_timestamp(raw: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DomainError::Internal(format!("bad timestamp {:?}: {}", raw, e)))
}
