// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod fake;
pub mod rows;
mod server;

pub use fake::{Call, FakeBackend};
pub use server::{MockServer, RecordedRequest, Route};

use reqman_app::{
    Assignee, Department, DepartmentId, FetchError, Priority, Request, RequestId, RequestStatus,
    RequestType, RequestTypeId, RequestUpdate, Team, TeamId, UpdateId, User, UserId,
};
use std::collections::BTreeSet;
use time::{Duration, OffsetDateTime, macros::datetime};

pub const ROOT_USERNAME: &str = "root";
pub const ROOT_PASSWORD: &str = "hunter22";
pub const PASSWORD_MIN_LENGTH: usize = 8;

const TITLE_SUBJECTS: [&str; 10] = [
    "Printer",
    "VPN",
    "Laptop",
    "Badge reader",
    "Shared drive",
    "Email",
    "Monitor",
    "Phone",
    "Wi-Fi",
    "Projector",
];

const TITLE_PROBLEMS: [&str; 8] = [
    "down",
    "slow",
    "not connecting",
    "keeps rebooting",
    "access needed",
    "making noise",
    "out of warranty",
    "flickering",
];

const DESCRIPTION_OPENERS: [&str; 5] = [
    "Since this morning",
    "After the last update",
    "On the third floor",
    "For the whole team",
    "Intermittently",
];

/// Org chart, users and requests shared by the integration tests.
///
/// Department 2 owns teams 5 and 6; team 5 has no members. Request 7 sits in
/// department 2, team 5 and carries the legacy `-1` assignee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgFixture {
    pub departments: Vec<Department>,
    pub teams: Vec<Team>,
    pub users: Vec<User>,
    pub request_types: Vec<RequestType>,
    pub requests: Vec<Request>,
    pub updates: Vec<RequestUpdate>,
}

pub fn fixture_datetime() -> OffsetDateTime {
    datetime!(2026-02-19 12:34:56 UTC)
}

pub fn fixture_org() -> OrgFixture {
    let departments = vec![
        department(1, "Service Desk", &[1, 2], Some(1)),
        department(2, "Infrastructure", &[5, 6], Some(5)),
    ];
    let teams = vec![
        team(1, "Front Desk", Some(1)),
        team(2, "Field Support", Some(1)),
        team(5, "Networks", Some(2)),
        team(6, "Servers", Some(2)),
        team(9, "Facilities", None),
    ];
    let users = vec![
        user(1, ROOT_USERNAME, "Root", "Admin", &[1]),
        user(3, "ada", "Ada", "Lovelace", &[6]),
        user(4, "grace", "Grace", "Hopper", &[1, 2]),
        user(5, "linus", "", "", &[2, 6]),
    ];
    let request_types = vec![
        RequestType {
            id: RequestTypeId::new(1),
            name: "Incident".to_owned(),
        },
        RequestType {
            id: RequestTypeId::new(2),
            name: "Service request".to_owned(),
        },
    ];

    let base = fixture_datetime();
    let requests = vec![
        Request {
            id: RequestId::new(3),
            requester: Some(UserId::new(1)),
            created_at: base - Duration::days(3),
            priority: Priority::P3,
            is_outage: false,
            title: "Laptop slow".to_owned(),
            description: "Takes ten minutes to boot.".to_owned(),
            department_id: Some(DepartmentId::new(2)),
            team_id: Some(TeamId::new(6)),
            assignee: Assignee::User(UserId::new(3)),
            type_id: Some(RequestTypeId::new(2)),
            status: RequestStatus::Open,
        },
        Request {
            id: RequestId::new(4),
            requester: Some(UserId::new(4)),
            created_at: base - Duration::days(2),
            priority: Priority::P4,
            is_outage: false,
            title: "Badge reader access needed".to_owned(),
            description: String::new(),
            department_id: None,
            team_id: None,
            assignee: Assignee::Unassigned,
            type_id: Some(RequestTypeId::new(2)),
            status: RequestStatus::Open,
        },
        Request {
            id: RequestId::new(7),
            requester: Some(UserId::new(1)),
            created_at: base - Duration::days(1),
            priority: Priority::P1,
            is_outage: true,
            title: "VPN not connecting".to_owned(),
            description: "Nobody on the east site can connect.".to_owned(),
            department_id: Some(DepartmentId::new(2)),
            team_id: Some(TeamId::new(5)),
            assignee: Assignee::from_legacy_id(Some(-1)),
            type_id: Some(RequestTypeId::new(1)),
            status: RequestStatus::Open,
        },
        Request {
            id: RequestId::new(8),
            requester: Some(UserId::new(1)),
            created_at: base - Duration::hours(5),
            priority: Priority::P2,
            is_outage: false,
            title: "Printer down".to_owned(),
            description: "Paper jam light stays on.".to_owned(),
            department_id: Some(DepartmentId::new(1)),
            team_id: Some(TeamId::new(2)),
            assignee: Assignee::User(UserId::new(4)),
            type_id: Some(RequestTypeId::new(1)),
            status: RequestStatus::Resolved,
        },
    ];
    let updates = vec![
        RequestUpdate {
            id: UpdateId::new(11),
            request_id: RequestId::new(7),
            author_name: "ada".to_owned(),
            created_at: base - Duration::hours(20),
            content: "Checking the concentrator logs.".to_owned(),
        },
        RequestUpdate {
            id: UpdateId::new(10),
            request_id: RequestId::new(7),
            author_name: ROOT_USERNAME.to_owned(),
            created_at: base - Duration::hours(23),
            content: "Reported by several users.".to_owned(),
        },
    ];

    OrgFixture {
        departments,
        teams,
        users,
        request_types,
        requests,
        updates,
    }
}

pub fn forbidden(endpoint: &str) -> FetchError {
    FetchError::HttpError {
        endpoint: endpoint.to_owned(),
        status: 403,
        message: Some("Permission denied.".to_owned()),
    }
}

pub fn unreachable(endpoint: &str) -> FetchError {
    FetchError::NetworkFailure {
        endpoint: endpoint.to_owned(),
        reason: "connection refused".to_owned(),
    }
}

fn department(id: i64, name: &str, teams: &[i64], initial: Option<i64>) -> Department {
    Department {
        id: DepartmentId::new(id),
        name: name.to_owned(),
        description: format!("{name} department"),
        member_team_ids: teams.iter().copied().map(TeamId::new).collect(),
        initial_team_id: initial.map(TeamId::new),
    }
}

fn team(id: i64, name: &str, department: Option<i64>) -> Team {
    Team {
        id: TeamId::new(id),
        name: name.to_owned(),
        description: format!("{name} team"),
        department_id: department.map(DepartmentId::new),
    }
}

fn user(id: i64, username: &str, first: &str, last: &str, teams: &[i64]) -> User {
    User {
        id: UserId::new(id),
        first_name: first.to_owned(),
        last_name: last.to_owned(),
        username: username.to_owned(),
        team_ids: teams.iter().copied().map(TeamId::new).collect::<BTreeSet<_>>(),
    }
}

/// Seeded generator for bulk request rows. Same seed, same rows.
#[derive(Debug, Clone)]
pub struct RequestFaker {
    state: u64,
}

impl RequestFaker {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// `n` requests with ids counting up from `first_id`.
    pub fn requests(&mut self, first_id: i64, n: usize, requester: UserId) -> Vec<Request> {
        (first_id..)
            .take(n)
            .map(|id| self.request(RequestId::new(id), requester))
            .collect()
    }

    pub fn title(&mut self) -> String {
        let subject = self.pick(&TITLE_SUBJECTS);
        let problem = self.pick(&TITLE_PROBLEMS);
        format!("{subject} {problem}")
    }

    /// Builds an open, unassigned request raised by `requester` somewhere in
    /// the 30 days before the fixture timestamp.
    pub fn request(&mut self, id: RequestId, requester: UserId) -> Request {
        let opener = self.pick(&DESCRIPTION_OPENERS);
        let minutes = self.below(30 * 24 * 60) as i64;
        let priority = Priority::ALL[self.below(Priority::ALL.len())];
        Request {
            id,
            requester: Some(requester),
            created_at: fixture_datetime() - Duration::minutes(minutes),
            priority,
            is_outage: priority == Priority::P1,
            title: self.title(),
            description: format!("{opener} it has not worked."),
            department_id: None,
            team_id: None,
            assignee: Assignee::Unassigned,
            type_id: Some(RequestTypeId::new(1)),
            status: RequestStatus::Open,
        }
    }

    fn pick<'a>(&mut self, values: &'a [&'a str]) -> &'a str {
        values[self.below(values.len())]
    }

    // splitmix64
    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn below(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % n as u64) as usize
    }
}
