// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Encoders for the positional rows the server returns, used to feed mock
//! servers with fixture data.

use reqman_app::{Department, Request, RequestStatus, RequestType, RequestUpdate, Team, User};
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::macros::format_description;

/// Formats a timestamp the way the server's JSON encoder does, e.g.
/// `Thu, 19 Feb 2026 12:34:56 GMT`.
pub fn http_date(at: OffsetDateTime) -> String {
    let format = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    at.to_offset(time::UtcOffset::UTC)
        .format(&format)
        .unwrap_or_default()
}

pub fn department(department: &Department) -> Value {
    let teams: Vec<i64> = department
        .member_team_ids
        .iter()
        .map(|team| team.get())
        .collect();
    json!([
        department.id.get(),
        department.name,
        teams,
        department.description,
        department.initial_team_id.map(|team| team.get()),
    ])
}

pub fn team(team: &Team, members: &[User]) -> Value {
    let users: Vec<i64> = members
        .iter()
        .filter(|user| user.is_member_of(team.id))
        .map(|user| user.id.get())
        .collect();
    json!([team.id.get(), team.name, users, team.description])
}

pub fn user(user: &User) -> Value {
    json!([
        user.id.get(),
        user.username,
        format!("{}@example.com", user.username),
        "",
        "Thu, 01 Jan 2026 00:00:00 GMT",
        [],
        1,
        false,
        user.first_name,
        user.last_name,
    ])
}

pub fn request_type(request_type: &RequestType) -> Value {
    json!([request_type.id.get(), request_type.name])
}

/// The unassigned value goes out as the legacy `-1`.
pub fn request(request: &Request) -> Value {
    let resolved = request.status == RequestStatus::Resolved;
    json!([
        request.id.get(),
        request.requester.map(|user| user.get()),
        http_date(request.created_at),
        request.priority.level(),
        request.is_outage,
        request.title,
        request.description,
        request.department_id.map(|department| department.get()),
        request.team_id.map(|team| team.get()),
        request.assignee.to_wire().unwrap_or(-1),
        0,
        request.type_id.map(|type_id| type_id.get()),
        resolved,
        Value::Null,
    ])
}

pub fn update(update: &RequestUpdate) -> Value {
    json!([
        update.id.get(),
        http_date(update.created_at),
        update.author_name,
        update.request_id.get(),
        update.content,
    ])
}

pub fn setting(id: i64, name: &str, value: &str) -> Value {
    json!([id, name, value])
}

pub fn list<T>(items: &[T], encode: impl Fn(&T) -> Value) -> String {
    Value::Array(items.iter().map(encode).collect()).to_string()
}
