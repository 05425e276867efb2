//! Account and Session Repositories
//!
//! Credentials and issued sessions for the local gateway. The newest
//! unrevoked session is what `restore_session` hands back after a restart.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use taskdeck::{AccountId, Profile, Session};
use tokio::sync::Mutex;

use super::profile_repo::{insert_profile, parse_timestamp};
use crate::domain::{hash_password, Account, DomainError, DomainResult};

pub struct AccountRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AccountRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Register an account and its profile in one transaction; emails are
    /// unique (case-insensitive).
    ///
    /// Neither row is kept if either insert fails.
    pub async fn register(&self, email: &str, password: &str, full_name: &str) -> DomainResult<(Account, Profile)> {
        let account = new_account(email, password)?;
        let profile = Profile {
            id: account.id.clone(),
            email: Some(account.email.clone()),
            full_name: Some(full_name.to_string()),
            avatar_url: Some(String::new()),
            is_premium: false,
            created_at: account.created_at,
        };

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        insert_account(&tx, &account)?;
        insert_profile(&tx, &profile)?;
        tx.commit()?;
        Ok((account, profile))
    }

    pub async fn find_by_email(&self, email: &str) -> DomainResult<Option<Account>> {
        let email = normalize_email(email)?;
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                "SELECT id, email, password_hash, salt, created_at FROM accounts WHERE email = ?1",
                params![email],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(id, email, password_hash, salt, created_at)| {
            Ok(Account {
                id: AccountId::new(id),
                email,
                password_hash,
                salt,
                created_at: parse_timestamp(&created_at)?,
            })
        })
        .transpose()
    }

    /// Same error for unknown email and wrong password
    pub async fn verify(&self, email: &str, password: &str) -> DomainResult<Account> {
        match self.find_by_email(email).await? {
            Some(account) if account.verify(password) => Ok(account),
            _ => Err(DomainError::Unauthorized("Invalid login credentials".into())),
        }
    }
}

fn new_account(email: &str, password: &str) -> DomainResult<Account> {
    let email = normalize_email(email)?;
    if password.is_empty() {
        return Err(DomainError::InvalidInput("password must not be empty".into()));
    }
    let salt = uuid::Uuid::new_v4().simple().to_string();
    Ok(Account {
        id: AccountId::new(uuid::Uuid::new_v4().to_string()),
        password_hash: hash_password(&salt, password),
        salt,
        email,
        created_at: Utc::now(),
    })
}

fn insert_account(conn: &Connection, account: &Account) -> DomainResult<()> {
    conn.execute(
        "INSERT INTO accounts (id, email, password_hash, salt, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            account.id.as_str(),
            account.email,
            account.password_hash,
            account.salt,
            account.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        ],
    )
    .map_err(|e| match DomainError::from(e) {
        DomainError::Conflict(_) => DomainError::Conflict("User already registered".into()),
        other => other,
    })?;
    Ok(())
}

fn normalize_email(email: &str) -> DomainResult<String> {
    let email = email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(DomainError::InvalidInput(format!("invalid email {:?}", email)));
    }
    Ok(email)
}

pub struct SessionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SessionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub async fn issue(&self, account: &Account) -> DomainResult<Session> {
        let session = Session {
            account: account.id.clone(),
            email: Some(account.email.clone()),
            access_token: uuid::Uuid::new_v4().simple().to_string(),
        };
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO sessions (token, account_id, email, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                session.access_token,
                session.account.as_str(),
                session.email,
                Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;
        Ok(session)
    }

    pub async fn latest(&self) -> DomainResult<Option<Session>> {
        let conn = self.conn.lock().await;
        let session = conn
            .query_row(
                "SELECT token, account_id, email FROM sessions ORDER BY created_at DESC, rowid DESC LIMIT 1",
                [],
                |row| {
                    Ok(Session {
                        access_token: row.get(0)?,
                        account: AccountId::new(row.get::<_, String>(1)?),
                        email: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(session)
    }

    pub async fn revoke(&self, token: &str) -> DomainResult<()> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        Ok(())
    }
}
