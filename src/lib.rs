//! Taskdeck Client Core
//!
//! Layered architecture:
//! - models: Entities, drafts, patches and their remote row shapes
//! - schedule: Due date/time mapping between local and remote shapes
//! - gateway: Remote data service contract and the hosted implementation
//! - store: Optimistic entity stores
//! - auth / entitlement: Session, profile and trial/premium state
//! - context: Application-wide container wiring it all together
//! - views: Derived read models (kanban, calendar, dashboard, search)

pub mod config;
pub mod error;
pub mod models;
pub mod schedule;
pub mod gateway;
pub mod store;
pub mod auth;
pub mod entitlement;
pub mod context;
pub mod views;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{AppConfig, ConfigError, GatewayConfig};
pub use error::{GatewayError, GatewayResult};
pub use models::{
    AccountId, Entity, Profile, ProfileFlag, Project, ProjectDraft, ProjectPatch, Task, TaskDraft,
    TaskPatch, TeamMember, TeamMemberDraft, TeamMemberPatch,
};
pub use gateway::{AccountSource, AuthGateway, Gateway, RemoteTable, RestGateway, Session};
pub use store::{EntityStore, ProjectStore, StoreSnapshot, SyncOutcome, SyncTicket, TaskStore, TeamStore};
pub use auth::{AuthSnapshot, AuthStore};
pub use entitlement::{Clock, Entitlement, EntitlementEngine, Feature, SystemClock, TrialPolicy, TrialState};
pub use context::AppContext;
