//! Team Member Entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, Entity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Department {
    #[default]
    Engineering,
    Design,
    Marketing,
    Sales,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AccessLevel {
    Admin,
    #[default]
    Member,
    Viewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MemberStatus {
    Online,
    Busy,
    #[serde(rename = "On Leave")]
    OnLeave,
    #[default]
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: String,
    pub name: String,
    pub role: String,
    pub email: String,
    pub department: Department,
    pub access_level: AccessLevel,
    pub status: MemberStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TeamMemberDraft {
    pub name: String,
    pub role: String,
    pub email: String,
    pub department: Department,
    pub access_level: AccessLevel,
    pub status: MemberStatus,
}

impl TeamMemberDraft {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TeamMemberPatch {
    name: Option<String>,
    role: Option<String>,
    email: Option<String>,
    department: Option<Department>,
    access_level: Option<AccessLevel>,
    status: Option<MemberStatus>,
}

impl TeamMemberPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn department(mut self, department: Department) -> Self {
        self.department = Some(department);
        self
    }

    pub fn access_level(mut self, level: AccessLevel) -> Self {
        self.access_level = Some(level);
        self
    }

    pub fn status(mut self, status: MemberStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// Member row in the remote `team_members` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMemberRow {
    pub id: String,
    pub user_id: AccountId,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    pub email: String,
    pub department: Department,
    pub access_level: AccessLevel,
    pub status: MemberStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTeamMemberRow {
    pub user_id: AccountId,
    pub name: String,
    pub role: String,
    pub email: String,
    pub department: Department,
    pub access_level: AccessLevel,
    pub status: MemberStatus,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TeamMemberRowPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<Department>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_level: Option<AccessLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MemberStatus>,
}

impl Entity for TeamMember {
    type Row = TeamMemberRow;
    type Draft = TeamMemberDraft;
    type NewRow = NewTeamMemberRow;
    type Patch = TeamMemberPatch;
    type RowPatch = TeamMemberRowPatch;

    const TABLE: &'static str = "team_members";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_row(row: TeamMemberRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            role: row.role.unwrap_or_default(),
            email: row.email,
            department: row.department,
            access_level: row.access_level,
            status: row.status,
            created_at: row.created_at,
        }
    }

    fn new_row(draft: &TeamMemberDraft, owner: &AccountId) -> NewTeamMemberRow {
        NewTeamMemberRow {
            user_id: owner.clone(),
            name: draft.name.clone(),
            role: draft.role.clone(),
            email: draft.email.clone(),
            department: draft.department,
            access_level: draft.access_level,
            status: draft.status,
        }
    }

    fn row_patch(patch: &TeamMemberPatch) -> TeamMemberRowPatch {
        TeamMemberRowPatch {
            name: patch.name.clone(),
            role: patch.role.clone(),
            email: patch.email.clone(),
            department: patch.department,
            access_level: patch.access_level,
            status: patch.status,
        }
    }

    fn apply(&mut self, patch: &TeamMemberPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(role) = &patch.role {
            self.role = role.clone();
        }
        if let Some(email) = &patch.email {
            self.email = email.clone();
        }
        if let Some(department) = patch.department {
            self.department = department;
        }
        if let Some(level) = patch.access_level {
            self.access_level = level;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_access_level_round_trips_through_row() {
        let draft = TeamMemberDraft {
            access_level: AccessLevel::Admin,
            status: MemberStatus::OnLeave,
            ..TeamMemberDraft::new("Grace", "grace@example.com")
        };
        let new_row = serde_json::to_value(TeamMember::new_row(&draft, &AccountId::new("u-1"))).unwrap();
        assert_eq!(new_row["access_level"], json!("Admin"));
        assert_eq!(new_row["status"], json!("On Leave"));
    }

    #[test]
    fn test_patch_applies_only_given_fields() {
        let mut member = TeamMember {
            id: "m-1".into(),
            name: "Grace".into(),
            role: "Lead".into(),
            email: "grace@example.com".into(),
            department: Department::Engineering,
            access_level: AccessLevel::Member,
            status: MemberStatus::Online,
            created_at: Utc::now(),
        };
        member.apply(&TeamMemberPatch::new().access_level(AccessLevel::Viewer));
        assert_eq!(member.access_level, AccessLevel::Viewer);
        assert_eq!(member.role, "Lead");
    }
}
