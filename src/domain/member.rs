//! Membership roster snapshot supplied by the membership collaborator.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::{Identifiable, NamedEntity};

/// Label reported when a member's display name cannot be resolved.
pub const UNKNOWN_MEMBER_NAME: &str = "Unknown";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Manager,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Role::Member => "member",
            Role::Manager => "manager",
            Role::Admin => "admin",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Member {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub status: MemberStatus,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl Member {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
            status: MemberStatus::Active,
            roles: vec![Role::Member],
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        if !self.roles.contains(&role) {
            self.roles.push(role);
        }
        self
    }

    pub fn inactive(mut self) -> Self {
        self.status = MemberStatus::Inactive;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

impl Identifiable for Member {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for Member {
    fn name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => UNKNOWN_MEMBER_NAME,
        }
    }
}

/// Immutable roster of one housing unit. Callers re-fetch it after any
/// membership change instead of mutating a shared copy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MembershipRoster {
    #[serde(default)]
    pub unit_id: Uuid,
    #[serde(default)]
    pub members: Vec<Member>,
}

impl MembershipRoster {
    pub fn new(unit_id: Uuid, members: Vec<Member>) -> Self {
        Self { unit_id, members }
    }

    pub fn member(&self, id: Uuid) -> Option<&Member> {
        self.members.iter().find(|member| member.id == id)
    }

    pub fn active_members(&self) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(|member| member.is_active())
    }

    pub fn active_count(&self) -> usize {
        self.active_members().count()
    }

    pub fn has_role(&self, member_id: Uuid, role: Role) -> bool {
        self.member(member_id)
            .map(|member| member.has_role(role))
            .unwrap_or(false)
    }
}
