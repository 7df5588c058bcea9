// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use time::OffsetDateTime;

use crate::ids::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    P1,
    P2,
    P3,
    P4,
}

impl Priority {
    pub const ALL: [Self; 4] = [Self::P1, Self::P2, Self::P3, Self::P4];

    pub const fn level(self) -> u8 {
        match self {
            Self::P1 => 1,
            Self::P2 => 2,
            Self::P3 => 3,
            Self::P4 => 4,
        }
    }

    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            1 => Some(Self::P1),
            2 => Some(Self::P2),
            3 => Some(Self::P3),
            4 => Some(Self::P4),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::P3 => "P3",
            Self::P4 => "P4",
        }
    }

    pub const fn badge_color(self) -> &'static str {
        match self {
            Self::P1 => "purple",
            Self::P2 => "red",
            Self::P3 => "orange",
            Self::P4 => "yellow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Open,
    Resolved,
}

impl RequestStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Resolved => "resolved",
        }
    }
}

/// Canonical assignee value. Every legacy spelling of "nobody" (`null`,
/// `-1`, `0`, `""`) collapses into [`Assignee::Unassigned`] on ingestion.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Assignee {
    #[default]
    Unassigned,
    User(UserId),
}

impl Assignee {
    pub const UNASSIGNED_LABEL: &'static str = "Unassigned";

    pub fn from_legacy_id(raw: Option<i64>) -> Self {
        match raw {
            Some(id) if id > 0 => Self::User(UserId::new(id)),
            _ => Self::Unassigned,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("unassigned")
            || trimmed.eq_ignore_ascii_case("null")
        {
            return Some(Self::Unassigned);
        }
        trimmed
            .parse::<i64>()
            .ok()
            .map(|id| Self::from_legacy_id(Some(id)))
    }

    pub const fn to_wire(self) -> Option<i64> {
        match self {
            Self::Unassigned => None,
            Self::User(id) => Some(id.get()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub description: String,
    pub member_team_ids: BTreeSet<TeamId>,
    pub initial_team_id: Option<TeamId>,
}

impl Department {
    pub fn has_team(&self, team_id: TeamId) -> bool {
        self.member_team_ids.contains(&team_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub description: String,
    /// Lookup hint only; membership is decided by [`Department::member_team_ids`].
    pub department_id: Option<DepartmentId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub team_ids: BTreeSet<TeamId>,
}

impl User {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_owned()
        }
    }

    pub fn is_member_of(&self, team_id: TeamId) -> bool {
        self.team_ids.contains(&team_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestType {
    pub id: RequestTypeId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    /// User who raised the request; the "my requests" list filters on it.
    pub requester: Option<UserId>,
    pub created_at: OffsetDateTime,
    pub priority: Priority,
    pub is_outage: bool,
    pub title: String,
    pub description: String,
    pub department_id: Option<DepartmentId>,
    pub team_id: Option<TeamId>,
    pub assignee: Assignee,
    pub type_id: Option<RequestTypeId>,
    pub status: RequestStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestUpdate {
    pub id: UpdateId,
    pub request_id: RequestId,
    pub author_name: String,
    pub created_at: OffsetDateTime,
    pub content: String,
}

/// Orders updates oldest first; ties fall back to id so the list is stable.
pub fn sort_updates(updates: &mut [RequestUpdate]) {
    updates.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}

/// Orders requests newest first, the way the "my requests" list shows them.
pub fn sort_newest_first(requests: &mut [Request]) {
    requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingKey {
    UserPasswordMinLength,
}

impl SettingKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserPasswordMinLength => "user_password_min_length",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub name: String,
    pub value: String,
}

impl Setting {
    pub fn as_usize(&self) -> Option<usize> {
        self.value.trim().parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthOutcome {
    Token(String),
    Rejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FormKind {
    Login,
    NewRequest,
    EditRequest,
    AddUpdate,
    ResolveRequest,
    NewDepartment,
    NewTeam,
    NewUser,
}

impl FormKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Login => "sign in",
            Self::NewRequest => "new request",
            Self::EditRequest => "edit request",
            Self::AddUpdate => "add update",
            Self::ResolveRequest => "resolve request",
            Self::NewDepartment => "new department",
            Self::NewTeam => "new team",
            Self::NewUser => "new user",
        }
    }

    /// Verb phrase used in failure notifications.
    pub const fn action(self) -> &'static str {
        match self {
            Self::Login => "sign in",
            Self::NewRequest => "create the request",
            Self::EditRequest => "save the request",
            Self::AddUpdate => "add the update",
            Self::ResolveRequest => "resolve the request",
            Self::NewDepartment => "create the department",
            Self::NewTeam => "create the team",
            Self::NewUser => "create the user",
        }
    }
}

/// Request tables rendered on the dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TableKind {
    Unassigned,
    OwnRequests,
}

impl TableKind {
    pub const ALL: [Self; 2] = [Self::Unassigned, Self::OwnRequests];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Unassigned => "unassigned requests",
            Self::OwnRequests => "my requests",
        }
    }
}
