//! Account Profile
//!
//! One row per account; `created_at` starts the trial window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AccountId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: AccountId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
    pub created_at: DateTime<Utc>,
}

/// Boolean profile columns that may be flipped remotely
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileFlag {
    IsPremium,
}

impl ProfileFlag {
    /// Remote column name
    pub fn column(&self) -> &'static str {
        match self {
            ProfileFlag::IsPremium => "is_premium",
        }
    }
}
