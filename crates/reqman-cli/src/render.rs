// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Plain-text rendering of dashboard state for the terminal.

use reqman_app::{
    Choices, EntityCache, Notification, NotificationLevel, Organisation, Priority, Request,
    RequestStatus, RequestUpdate, TableKind, TableView, User,
};
use std::fmt;
use time::OffsetDateTime;
use time::macros::format_description;

const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    pub color: bool,
}

impl Style {
    pub const PLAIN: Self = Self { color: false };

    fn paint(self, code: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{code}m{text}{RESET}")
        } else {
            text.to_owned()
        }
    }
}

fn ansi_code(color: &str) -> &'static str {
    match color {
        "purple" => "35",
        "red" => "31",
        "orange" => "38;5;208",
        "yellow" => "33",
        _ => "0",
    }
}

pub fn priority_badge(priority: Priority, is_outage: bool, style: Style) -> String {
    let badge = style.paint(ansi_code(priority.badge_color()), &format!("[{}]", priority.label()));
    if is_outage {
        format!("{badge} {}", style.paint("1;31", "OUTAGE"))
    } else {
        badge
    }
}

pub fn timestamp(value: OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    value
        .format(format)
        .unwrap_or_else(|_| value.unix_timestamp().to_string())
}

pub fn table(kind: TableKind, view: &TableView, style: Style) -> String {
    let rows = match view {
        TableView::PermissionDenied(text) => return format!("{text}\n"),
        TableView::Rows(rows) => rows,
    };
    if rows.is_empty() {
        return format!("No {}.\n", kind.label());
    }

    let id_width = rows
        .iter()
        .map(|request| request.id.to_string().len())
        .max()
        .unwrap_or(2)
        .max(2);
    let mut out = format!(
        "{:>id_width$}  {:<4}  {:<8}  {:<16}  TITLE\n",
        "ID", "PRI", "STATUS", "CREATED"
    );
    for request in rows {
        out.push_str(&table_row(request, id_width, style));
        out.push('\n');
    }
    out
}

fn table_row(request: &Request, id_width: usize, style: Style) -> String {
    let badge = style.paint(
        ansi_code(request.priority.badge_color()),
        &format!("{:<4}", request.priority.label()),
    );
    let title = if request.is_outage {
        format!("{} {}", style.paint("1;31", "OUTAGE"), request.title)
    } else {
        request.title.clone()
    };
    format!(
        "{:>id_width$}  {badge}  {:<8}  {:<16}  {title}",
        request.id,
        request.status.as_str(),
        timestamp(request.created_at),
    )
}

/// One select list, the selected option marked with `*`.
pub fn choices<T: Copy + PartialEq>(label: &str, choices: &Choices<T>) -> String {
    let mut out = format!("{label}:\n");
    if choices.options.is_empty() {
        out.push_str("    (none available)\n");
        return out;
    }
    for option in &choices.options {
        let marker = if choices.selected == Some(option.value) {
            '*'
        } else {
            ' '
        };
        out.push_str(&format!("  {marker} {}\n", option.label));
    }
    out
}

/// The values a flag accepts, each with the id to pass.
pub fn offered<T: Copy + PartialEq + fmt::Display>(label: &str, choices: &Choices<T>) -> String {
    let mut out = format!("{label}:\n");
    if choices.options.is_empty() {
        out.push_str("    (none available)\n");
        return out;
    }
    for option in &choices.options {
        out.push_str(&format!("  {:>3}  {}\n", option.value, option.label));
    }
    out
}

pub fn updates(updates: &[RequestUpdate]) -> String {
    if updates.is_empty() {
        return "No updates yet.\n".to_owned();
    }
    let mut out = String::new();
    for update in updates {
        out.push_str(&format!(
            "{}  {}: {}\n",
            timestamp(update.created_at),
            update.author_name,
            update.content
        ));
    }
    out
}

/// The open request with its edit selects and update history.
pub fn request_detail(cache: &EntityCache, style: Style) -> String {
    let Some(request) = cache.current_request() else {
        return "No request is open.\n".to_owned();
    };
    let selection = cache.selection();
    let mut out = String::new();
    out.push_str(&format!(
        "#{} {} {}\n",
        request.id,
        priority_badge(request.priority, request.is_outage, style),
        request.title
    ));
    let status = match request.status {
        RequestStatus::Open => style.paint("32", request.status.as_str()),
        RequestStatus::Resolved => style.paint("2", request.status.as_str()),
    };
    out.push_str(&format!(
        "status: {status}    created: {}\n",
        timestamp(request.created_at)
    ));
    if !request.description.trim().is_empty() {
        out.push_str(&format!("\n{}\n\n", request.description.trim()));
    }
    out.push_str(&choices("department", selection.department()));
    out.push_str(&choices("team", selection.team()));
    out.push_str(&choices("assignee", selection.assignee()));
    out.push_str(&choices("type", &cache.type_choices()));
    out.push_str("\nupdates:\n");
    out.push_str(&updates(cache.updates()));
    out
}

pub fn organisation(org: &Organisation) -> String {
    if org.departments.is_empty() {
        return "No departments.\n".to_owned();
    }
    let mut out = String::new();
    for department in &org.departments {
        out.push_str(&format!("{:>3}  {}\n", department.id, department.name));
        for team in org.teams_of(department) {
            let initial = if department.initial_team_id == Some(team.id) {
                " (initial)"
            } else {
                ""
            };
            out.push_str(&format!("       - {} {}{initial}\n", team.id, team.name));
        }
    }
    out
}

pub fn teams(org: &Organisation) -> String {
    if org.teams.is_empty() {
        return "No teams.\n".to_owned();
    }
    let mut out = String::new();
    for team in &org.teams {
        let departments: Vec<&str> = org
            .departments
            .iter()
            .filter(|department| department.has_team(team.id))
            .map(|department| department.name.as_str())
            .collect();
        let departments = if departments.is_empty() {
            "no department".to_owned()
        } else {
            departments.join(", ")
        };
        out.push_str(&format!("{:>3}  {}  [{departments}]\n", team.id, team.name));
    }
    out
}

pub fn user(user: &User, org: &Organisation) -> String {
    let teams: Vec<String> = user
        .team_ids
        .iter()
        .map(|id| {
            org.team_name(*id)
                .map_or_else(|| format!("team {id}"), str::to_owned)
        })
        .collect();
    let teams = if teams.is_empty() {
        "none".to_owned()
    } else {
        teams.join(", ")
    };
    format!(
        "{} ({})\nid: {}\nteams: {teams}\n",
        user.display_name(),
        user.username,
        user.id
    )
}

pub fn notification(notification: &Notification, style: Style) -> String {
    let title = match notification.level {
        NotificationLevel::Info => style.paint("32", &notification.title),
        NotificationLevel::Warning => style.paint("33", &notification.title),
        NotificationLevel::Error => style.paint("31", &notification.title),
    };
    if notification.message.is_empty() {
        format!("{title}\n")
    } else {
        format!("{title}: {}\n", notification.message)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Style, choices, notification, offered, organisation, priority_badge, table, user,
    };
    use reqman_app::{
        Assignee, Choices, DepartmentId, Notification, Organisation, Priority, SelectOption,
        TableKind, TableView, UserId,
    };
    use reqman_testkit::fixture_org;

    #[test]
    fn badges_are_plain_without_color() {
        assert_eq!(priority_badge(Priority::P3, false, Style::PLAIN), "[P3]");
        assert_eq!(priority_badge(Priority::P1, true, Style::PLAIN), "[P1] OUTAGE");
    }

    #[test]
    fn colored_badge_uses_the_priority_color() {
        let badge = priority_badge(Priority::P2, false, Style { color: true });
        assert_eq!(badge, "\x1b[31m[P2]\x1b[0m");
    }

    #[test]
    fn table_lists_one_row_per_request() {
        let org = fixture_org();
        let text = table(
            TableKind::OwnRequests,
            &TableView::Rows(org.requests.clone()),
            Style::PLAIN,
        );
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), org.requests.len() + 1);
        assert!(lines[0].contains("TITLE"));
        assert!(text.contains("OUTAGE VPN not connecting"));
        assert!(text.contains("resolved"));
    }

    #[test]
    fn denied_and_empty_tables_explain_themselves() {
        let denied = TableView::PermissionDenied("Permission denied.".to_owned());
        assert_eq!(
            table(TableKind::Unassigned, &denied, Style::PLAIN),
            "Permission denied.\n"
        );
        assert_eq!(
            table(TableKind::Unassigned, &TableView::Rows(Vec::new()), Style::PLAIN),
            "No unassigned requests.\n"
        );
    }

    #[test]
    fn selected_option_is_marked() {
        let options = Choices {
            options: vec![
                SelectOption {
                    value: Assignee::Unassigned,
                    label: "Unassigned".to_owned(),
                },
                SelectOption {
                    value: Assignee::User(UserId::new(3)),
                    label: "Ada Lovelace".to_owned(),
                },
            ],
            selected: Some(Assignee::User(UserId::new(3))),
        };
        assert_eq!(
            choices("assignee", &options),
            "assignee:\n    Unassigned\n  * Ada Lovelace\n"
        );
        assert_eq!(
            choices::<Assignee>("team", &Choices::default()),
            "team:\n    (none available)\n"
        );
    }

    #[test]
    fn organisation_nests_teams_under_departments() {
        let fixture = fixture_org();
        let org = Organisation {
            departments: fixture.departments,
            teams: fixture.teams,
        };
        let text = organisation(&org);
        assert!(text.contains("Infrastructure"));
        assert!(text.contains("- 5 Networks (initial)"));
        assert!(!text.contains("Facilities"));

        let linus = fixture
            .users
            .iter()
            .find(|candidate| candidate.username == "linus")
            .expect("fixture user");
        assert_eq!(
            user(linus, &org),
            "linus (linus)\nid: 5\nteams: Field Support, Servers\n"
        );
    }

    #[test]
    fn notifications_show_title_and_message() {
        let text = notification(
            &Notification::error("Could not create the team", "connection refused"),
            Style::PLAIN,
        );
        assert_eq!(text, "Could not create the team: connection refused\n");
    }

    #[test]
    fn offered_values_show_the_id_to_pass() {
        let departments = Choices {
            options: vec![
                SelectOption {
                    value: DepartmentId::new(1),
                    label: "Service Desk".to_owned(),
                },
                SelectOption {
                    value: DepartmentId::new(12),
                    label: "Infrastructure".to_owned(),
                },
            ],
            selected: None,
        };
        assert_eq!(
            offered("departments", &departments),
            "departments:\n    1  Service Desk\n   12  Infrastructure\n"
        );
        assert_eq!(
            offered::<DepartmentId>("types", &Choices::default()),
            "types:\n    (none available)\n"
        );
    }

    #[test]
    fn warnings_keep_their_message() {
        let warning = Notification::warning(
            "Update added, but the history could not be reloaded",
            "timeout",
        );
        let text = notification(&warning, Style::PLAIN);
        assert_eq!(
            text,
            "Update added, but the history could not be reloaded: timeout\n"
        );
    }
}
