//! Hosted Gateway
//!
//! Talks to the hosted service over HTTP: row access through the
//! `/rest/v1/<table>` endpoints and sessions through `/auth/v1`.

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{AuthGateway, RemoteTable, Session};
use crate::error::{GatewayError, GatewayResult};
use crate::models::{AccountId, Entity, Profile, ProfileFlag};

const PROFILES: &str = "profiles";

/// HTTP client for the hosted data service
pub struct RestGateway {
    http: Client,
    base_url: String,
    anon_key: String,
    session: RwLock<Option<Session>>,
}

#[derive(Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: AuthUser,
}

impl RestGateway {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> GatewayResult<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            session: RwLock::new(None),
        })
    }

    /// Resume a session obtained elsewhere (e.g. persisted by the caller)
    pub fn with_session(self, session: Session) -> Self {
        *self.session.write() = Some(session);
        self
    }

    pub fn session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    /// Attach the api key and the session token (or the anon key when signed out)
    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self
            .session
            .read()
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone());
        request.header("apikey", &self.anon_key).bearer_auth(token)
    }

    async fn send(&self, request: RequestBuilder) -> GatewayResult<Response> {
        let response = self.authed(request).send().await.map_err(transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(map_status(status, error_message(&body, status)))
    }

    /// PATCH/DELETE with `return=representation`; an empty result means no row matched
    async fn mutate_one(&self, request: RequestBuilder, what: String) -> GatewayResult<()> {
        let request = request.header("Prefer", "return=representation");
        let rows: Vec<Value> = self.send(request).await?.json().await.map_err(transport)?;
        if rows.is_empty() {
            return Err(GatewayError::NotFound(what));
        }
        Ok(())
    }

    fn store_session(&self, token: TokenResponse) -> Session {
        let session = Session {
            account: AccountId::new(token.user.id),
            email: token.user.email,
            access_token: token.access_token,
        };
        *self.session.write() = Some(session.clone());
        session
    }
}

fn transport(e: reqwest::Error) -> GatewayError {
    GatewayError::Transport(e.to_string())
}

/// Map a non-success HTTP status onto the gateway taxonomy
pub(crate) fn map_status(status: StatusCode, message: String) -> GatewayError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Auth(message),
        StatusCode::NOT_FOUND => GatewayError::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            GatewayError::Validation(message)
        }
        _ => GatewayError::Transport(message),
    }
}

/// Pull a readable message out of an error body
pub(crate) fn error_message(body: &str, status: StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["message", "msg", "error_description", "error"] {
            if let Some(text) = value.get(key).and_then(Value::as_str) {
                return text.to_string();
            }
        }
    }
    match body.trim() {
        "" => status.to_string(),
        text => text.to_string(),
    }
}

#[async_trait]
impl<E: Entity> RemoteTable<E> for RestGateway {
    async fn list(&self) -> GatewayResult<Vec<E::Row>> {
        let request = self
            .http
            .get(self.table_url(E::TABLE))
            .query(&[("select", "*"), ("order", "created_at.desc")]);
        self.send(request).await?.json().await.map_err(transport)
    }

    async fn insert(&self, row: E::NewRow) -> GatewayResult<E::Row> {
        let request = self
            .http
            .post(self.table_url(E::TABLE))
            .header("Prefer", "return=representation")
            .json(&[row]);
        let rows: Vec<E::Row> = self.send(request).await?.json().await.map_err(transport)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| GatewayError::Validation(format!("insert into {} returned no row", E::TABLE)))
    }

    async fn update(&self, id: &str, patch: E::RowPatch) -> GatewayResult<()> {
        let request = self
            .http
            .patch(self.table_url(E::TABLE))
            .query(&[("id", format!("eq.{}", id))])
            .json(&patch);
        self.mutate_one(request, format!("{} {}", E::TABLE, id)).await
    }

    async fn delete(&self, id: &str) -> GatewayResult<()> {
        let request = self
            .http
            .delete(self.table_url(E::TABLE))
            .query(&[("id", format!("eq.{}", id))]);
        self.mutate_one(request, format!("{} {}", E::TABLE, id)).await
    }
}

#[async_trait]
impl AuthGateway for RestGateway {
    async fn restore_session(&self) -> GatewayResult<Option<Session>> {
        Ok(self.session())
    }

    async fn sign_in(&self, email: &str, password: &str) -> GatewayResult<Session> {
        let request = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        let token: TokenResponse = self.send(request).await?.json().await.map_err(transport)?;
        Ok(self.store_session(token))
    }

    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> GatewayResult<Session> {
        let request = self.http.post(self.auth_url("signup")).json(&json!({
            "email": email,
            "password": password,
            "data": { "full_name": full_name },
        }));
        let body: Value = self.send(request).await?.json().await.map_err(transport)?;
        let token: TokenResponse = serde_json::from_value(body)
            .map_err(|_| GatewayError::Auth("Check your email to confirm the account".to_string()))?;
        let session = self.store_session(token);

        let profile = json!([{
            "id": session.account,
            "email": email,
            "full_name": full_name,
            "avatar_url": "",
            "is_premium": false,
        }]);
        let request = self.http.post(self.table_url(PROFILES)).json(&profile);
        if let Err(e) = self.send(request).await {
            // A database trigger may already have created it
            log::warn!("[auth] profile insert after sign-up failed: {}", e);
        }
        Ok(session)
    }

    async fn sign_out(&self) -> GatewayResult<()> {
        let request = self.http.post(self.auth_url("logout"));
        let result = self.send(request).await.map(|_| ());
        *self.session.write() = None;
        result
    }

    async fn fetch_profile(&self, account: &AccountId) -> GatewayResult<Profile> {
        let request = self
            .http
            .get(self.table_url(PROFILES))
            .query(&[("select", "*".to_string()), ("id", format!("eq.{}", account))]);
        let rows: Vec<Profile> = self.send(request).await?.json().await.map_err(transport)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| GatewayError::NotFound(format!("profile {}", account)))
    }

    async fn update_profile_flag(
        &self,
        account: &AccountId,
        flag: ProfileFlag,
        value: bool,
    ) -> GatewayResult<()> {
        let mut body = serde_json::Map::new();
        body.insert(flag.column().to_string(), Value::Bool(value));
        let request = self
            .http
            .patch(self.table_url(PROFILES))
            .query(&[("id", format!("eq.{}", account))])
            .json(&body);
        self.mutate_one(request, format!("profile {}", account)).await
    }
}
