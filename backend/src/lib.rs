//! Taskdeck Backend
//!
//! Layered architecture:
//! - domain: Local accounts and the errors raised below the gateway
//! - repository: SQLite data access for rows, profiles, accounts and sessions
//! - gateway: The remote data contract served from the local database
//!
//! `Backend::open` turns an `AppConfig` into a started `AppContext`.

use std::sync::Arc;

use taskdeck::{AppConfig, AppContext, ConfigError, GatewayConfig, GatewayError};
use thiserror::Error;

mod domain;
mod gateway;
mod repository;

pub use domain::DomainError;
pub use gateway::LocalGateway;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Application state shared with the UI layer
pub struct Backend {
    pub config: AppConfig,
    pub context: AppContext,
}

impl Backend {
    /// Validate `config`, install logging, build the context and restore
    /// the previous session.
    ///
    /// A failed session restore is logged and leaves the context signed out.
    pub async fn open(config: AppConfig) -> Result<Self, BackendError> {
        config.validate()?;

        if let Some(dir) = &config.log_dir {
            if let Err(e) = rolling_logger::init_logger(dir, "Taskdeck") {
                log::warn!("[backend] file logging disabled: {}", e);
            }
        }

        let context = match &config.gateway {
            GatewayConfig::Hosted { url, .. } => {
                log::info!("[backend] using hosted service at {}", url);
                AppContext::hosted(&config)?
            }
            GatewayConfig::Local { db_path } => {
                log::info!("[backend] using local database {}", db_path.display());
                let gateway = Arc::new(LocalGateway::open(db_path).await?);
                AppContext::new(gateway, config.trial_policy())
            }
        };

        if let Err(e) = context.start().await {
            log::error!("[backend] session restore failed: {}", e);
        }
        let _ = rolling_logger::info("[backend] ready");

        Ok(Self { config, context })
    }
}
