// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Decoding of the server's database rows.
//!
//! Rows arrive either as positional arrays in table column order or as keyed
//! objects. Each accessor takes both the column index and the key.

use anyhow::{Context, Result, anyhow, bail};
use reqman_app::{
    Assignee, Department, DepartmentId, Priority, Request, RequestId, RequestStatus, RequestType,
    RequestTypeId, RequestUpdate, Setting, Team, TeamId, UpdateId, User, UserId,
};
use serde_json::Value;
use std::collections::BTreeSet;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct Row<'a> {
    value: &'a Value,
}

impl<'a> Row<'a> {
    fn new(value: &'a Value) -> Result<Self> {
        match value {
            Value::Array(_) | Value::Object(_) => Ok(Self { value }),
            other => bail!("expected a row, got {}", kind_of(other)),
        }
    }

    fn field(self, index: usize, key: &str) -> Option<&'a Value> {
        let field = match self.value {
            Value::Array(items) => items.get(index),
            Value::Object(map) => map.get(key),
            _ => None,
        };
        field.filter(|value| !value.is_null())
    }

    fn id(self, index: usize, key: &str) -> Result<i64> {
        let value = self
            .field(index, key)
            .ok_or_else(|| anyhow!("missing {key}"))?;
        integer(value).ok_or_else(|| anyhow!("{key} is not an integer: {value}"))
    }

    /// Absent, null, empty and non-numeric values all read as `None`.
    fn optional_id(self, index: usize, key: &str) -> Option<i64> {
        let value = self.field(index, key)?;
        let parsed = integer(value);
        if parsed.is_none() && !matches!(value, Value::String(text) if text.trim().is_empty()) {
            debug!(column = key, %value, "ignoring non-numeric reference");
        }
        parsed
    }

    fn text(self, index: usize, key: &str) -> String {
        match self.field(index, key) {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }

    fn required_text(self, index: usize, key: &str) -> Result<String> {
        match self.field(index, key) {
            Some(Value::String(text)) => Ok(text.clone()),
            Some(other) => bail!("{key} is not text: {other}"),
            None => bail!("missing {key}"),
        }
    }

    fn flag(self, index: usize, key: &str) -> bool {
        match self.field(index, key) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(number)) => number.as_i64().is_some_and(|n| n != 0),
            Some(Value::String(text)) => matches!(text.trim(), "true" | "t" | "1"),
            _ => false,
        }
    }

    fn ids(self, index: usize, key: &str) -> Result<Vec<i64>> {
        match self.field(index, key) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| integer(item).ok_or_else(|| anyhow!("{key} holds a non-id: {item}")))
                .collect(),
            Some(Value::String(text)) => parse_id_array(text)
                .with_context(|| format!("{key} is not an id list: {text:?}")),
            Some(other) => bail!("{key} is not an id list: {other}"),
        }
    }

    fn timestamp(self, index: usize, key: &str) -> Result<OffsetDateTime> {
        let text = self.required_text(index, key)?;
        parse_timestamp(&text).with_context(|| format!("{key} has an unreadable timestamp"))
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Postgres array literal such as `{5,6}`.
fn parse_id_array(text: &str) -> Result<Vec<i64>> {
    let inner = text
        .trim()
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or_else(|| anyhow!("expected {{...}}"))?;
    inner
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<i64>().with_context(|| format!("bad id {part:?}")))
        .collect()
}

/// Accepts RFC 3339, HTTP dates (`Tue, 01 Oct 2024 10:00:00 GMT`) and naive
/// `YYYY-MM-DD HH:MM:SS[.ffffff]` values, the last read as UTC.
pub fn parse_timestamp(text: &str) -> Result<OffsetDateTime> {
    let text = text.trim();
    if let Ok(parsed) = OffsetDateTime::parse(text, &Rfc3339) {
        return Ok(parsed);
    }

    let rfc2822 = match text.strip_suffix(" GMT").or_else(|| text.strip_suffix(" UTC")) {
        Some(rest) => format!("{rest} +0000"),
        None => text.to_owned(),
    };
    if let Ok(parsed) = OffsetDateTime::parse(&rfc2822, &Rfc2822) {
        return Ok(parsed);
    }

    let naive = text.replacen('T', " ", 1);
    let naive = naive.split('.').next().unwrap_or_default();
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    PrimitiveDateTime::parse(naive, &format)
        .map(PrimitiveDateTime::assume_utc)
        .with_context(|| format!("unrecognized timestamp {text:?}"))
}

/// Single-row endpoints sometimes wrap their row in a one-element list.
pub fn single_row(value: &Value) -> &Value {
    if let Value::Array(items) = value
        && items.len() == 1
        && matches!(items[0], Value::Array(_) | Value::Object(_))
    {
        return &items[0];
    }
    value
}

/// List endpoints answer `{}` when there is nothing to list.
pub fn rows(value: &Value) -> Result<&[Value]> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(fields) if fields.is_empty() => Ok(&[]),
        other => bail!("expected a list of rows, got {}", kind_of(other)),
    }
}

pub fn department(value: &Value) -> Result<Department> {
    let row = Row::new(value)?;
    Ok(Department {
        id: DepartmentId::new(row.id(0, "id")?),
        name: row.required_text(1, "name")?,
        member_team_ids: row.ids(2, "teams")?.into_iter().map(TeamId::new).collect(),
        description: row.text(3, "description"),
        initial_team_id: row.optional_id(4, "initial_assignment").map(TeamId::new),
    })
}

pub fn team(value: &Value) -> Result<Team> {
    let row = Row::new(value)?;
    Ok(Team {
        id: TeamId::new(row.id(0, "id")?),
        name: row.required_text(1, "name")?,
        description: row.text(3, "description"),
        department_id: row.optional_id(usize::MAX, "department").map(DepartmentId::new),
    })
}

/// Users listed under a team are stamped with that team's id.
pub fn user(value: &Value, listed_under: Option<TeamId>) -> Result<User> {
    let row = Row::new(value)?;
    let mut team_ids: BTreeSet<TeamId> = row
        .ids(usize::MAX, "teams")?
        .into_iter()
        .map(TeamId::new)
        .collect();
    team_ids.extend(listed_under);
    Ok(User {
        id: UserId::new(row.id(0, "id")?),
        username: row.required_text(1, "username")?,
        first_name: row.text(8, "firstname"),
        last_name: row.text(9, "lastname"),
        team_ids,
    })
}

pub fn request_type(value: &Value) -> Result<RequestType> {
    let row = Row::new(value)?;
    Ok(RequestType {
        id: RequestTypeId::new(row.id(0, "id")?),
        name: row.required_text(1, "name")?,
    })
}

pub fn request(value: &Value) -> Result<Request> {
    let row = Row::new(value)?;
    let level = row.id(3, "priority")?;
    let priority =
        Priority::from_level(level).ok_or_else(|| anyhow!("priority {level} is out of range"))?;
    let status = if row.flag(12, "resolved") {
        RequestStatus::Resolved
    } else {
        RequestStatus::Open
    };
    Ok(Request {
        id: RequestId::new(row.id(0, "id")?),
        requester: row.optional_id(1, "requester").map(UserId::new),
        created_at: row.timestamp(2, "requested_at")?,
        priority,
        is_outage: row.flag(4, "outage"),
        title: row.text(5, "title"),
        description: row.text(6, "description"),
        department_id: row.optional_id(7, "department").map(DepartmentId::new),
        team_id: row.optional_id(8, "team").map(TeamId::new),
        assignee: Assignee::from_legacy_id(row.optional_id(9, "assignee")),
        type_id: row.optional_id(11, "type").map(RequestTypeId::new),
        status,
    })
}

pub fn update(value: &Value) -> Result<RequestUpdate> {
    let row = Row::new(value)?;
    Ok(RequestUpdate {
        id: UpdateId::new(row.id(0, "id")?),
        created_at: row.timestamp(1, "created_at")?,
        author_name: row.text(2, "author"),
        request_id: RequestId::new(row.id(3, "request_id")?),
        content: row.text(4, "content"),
    })
}

pub fn setting(value: &Value) -> Result<Setting> {
    let row = Row::new(single_row(value))?;
    Ok(Setting {
        name: row.required_text(1, "name")?,
        value: row.text(2, "value"),
    })
}
