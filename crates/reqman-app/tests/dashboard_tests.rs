// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use reqman_app::{
    AddUpdateInput, Assignee, Dashboard, DepartmentId, FieldName, FormKind, FormPayload, Intent,
    LoginInput, NewRequestInput, NewTeamInput, NewUserInput, NotificationLevel, PasswordPolicy,
    RequestId, RequestStatus, RequestTypeId, TableKind, TableView, TeamId, UserId, ViewEvent,
};
use reqman_testkit::{
    Call, FakeBackend, PASSWORD_MIN_LENGTH, ROOT_PASSWORD, RequestFaker, forbidden, unreachable,
};

fn dashboard() -> Dashboard<FakeBackend> {
    Dashboard::new(FakeBackend::new())
}

fn notifications(events: &[ViewEvent]) -> Vec<(NotificationLevel, String)> {
    events
        .iter()
        .filter_map(|event| match event {
            ViewEvent::Notification(notification) => {
                Some((notification.level, notification.title.clone()))
            }
            _ => None,
        })
        .collect()
}

fn error_titles(events: &[ViewEvent]) -> Vec<String> {
    notifications(events)
        .into_iter()
        .filter(|(level, _)| *level == NotificationLevel::Error)
        .map(|(_, title)| title)
        .collect()
}

fn field_validity(events: &[ViewEvent], wanted: FieldName) -> Option<bool> {
    events.iter().rev().find_map(|event| match event {
        ViewEvent::FieldValidated { field, valid, .. } if *field == wanted => Some(*valid),
        _ => None,
    })
}

fn table_ids(dashboard: &Dashboard<FakeBackend>, kind: TableKind) -> Vec<RequestId> {
    dashboard
        .table(kind)
        .map(|view| view.rows().iter().map(|request| request.id).collect())
        .unwrap_or_default()
}

fn open(dashboard: &mut Dashboard<FakeBackend>, id: i64) -> Vec<ViewEvent> {
    dashboard.dispatch(Intent::RequestOpened(RequestId::new(id)))
}

#[test]
fn opening_a_request_seeds_every_select_in_order() {
    let mut dashboard = dashboard();
    let events = open(&mut dashboard, 7);

    assert_eq!(events[0], ViewEvent::RequestLoaded(RequestId::new(7)));
    assert!(error_titles(&events).is_empty(), "{events:?}");
    assert!(events.contains(&ViewEvent::UpdatesChanged {
        request_id: RequestId::new(7),
        count: 2,
    }));

    let selection = dashboard.cache().selection();
    assert_eq!(selection.department().selected, Some(DepartmentId::new(2)));
    assert_eq!(selection.team().values(), vec![TeamId::new(5), TeamId::new(6)]);
    assert_eq!(selection.team().selected, Some(TeamId::new(5)));
    assert_eq!(selection.assignee().values(), vec![Assignee::Unassigned]);
    assert_eq!(selection.selected_assignee(), Assignee::Unassigned);

    assert_eq!(
        dashboard.backend().calls(),
        &[
            Call::GetRequest(RequestId::new(7)),
            Call::ListDepartments,
            Call::ListTeams,
            Call::ListRequestTypes,
            Call::ListUsersInTeam(TeamId::new(5)),
            Call::ListRequestUpdates(RequestId::new(7)),
        ]
    );

    let updates: Vec<_> = dashboard.cache().updates().iter().map(|u| u.id.get()).collect();
    assert_eq!(updates, vec![10, 11]);
}

#[test]
fn stored_assignee_is_selected_when_they_belong_to_the_team() {
    let mut dashboard = dashboard();
    open(&mut dashboard, 3);

    let selection = dashboard.cache().selection();
    assert_eq!(selection.team().selected, Some(TeamId::new(6)));
    assert_eq!(
        selection.assignee().values(),
        vec![
            Assignee::Unassigned,
            Assignee::User(UserId::new(3)),
            Assignee::User(UserId::new(5)),
        ]
    );
    assert_eq!(selection.selected_assignee(), Assignee::User(UserId::new(3)));
    assert_eq!(selection.assignee().selected, Some(Assignee::User(UserId::new(3))));
}

#[test]
fn superseded_load_is_discarded() {
    let mut dashboard = dashboard();
    let first = dashboard.begin_load(RequestId::new(7));
    let second = dashboard.begin_load(RequestId::new(3));

    let events = dashboard.complete_load(first);
    assert_eq!(events, vec![ViewEvent::StaleResponseDiscarded(RequestId::new(7))]);
    assert_eq!(dashboard.cache().current_request_id(), None);

    let events = dashboard.complete_load(second);
    assert_eq!(events[0], ViewEvent::RequestLoaded(RequestId::new(3)));
    assert_eq!(dashboard.cache().current_request_id(), Some(RequestId::new(3)));
}

#[test]
fn closing_the_view_invalidates_a_pending_load() {
    let mut dashboard = dashboard();
    let ticket = dashboard.begin_load(RequestId::new(7));
    assert_eq!(
        dashboard.dispatch(Intent::RequestClosed),
        vec![ViewEvent::RequestCleared]
    );

    let events = dashboard.complete_load(ticket);
    assert_eq!(events, vec![ViewEvent::StaleResponseDiscarded(RequestId::new(7))]);
    assert!(dashboard.cache().current_request().is_none());
}

#[test]
fn missing_request_reports_and_leaves_the_view_empty() {
    let mut dashboard = dashboard();
    let events = open(&mut dashboard, 404);
    assert_eq!(error_titles(&events), vec!["Could not load request 404".to_owned()]);
    assert!(dashboard.cache().current_request().is_none());
}

#[test]
fn failed_listing_degrades_to_empty_options() {
    let mut dashboard = dashboard();
    dashboard
        .backend_mut()
        .fail(Call::ListTeams, unreachable("/api/teams"));

    let events = open(&mut dashboard, 7);
    assert!(events.contains(&ViewEvent::RequestLoaded(RequestId::new(7))));
    assert_eq!(error_titles(&events), vec!["Could not load teams".to_owned()]);
    assert!(dashboard.cache().selection().team().options.is_empty());
    assert_eq!(
        dashboard.cache().selection().assignee().values(),
        vec![Assignee::Unassigned]
    );
}

#[test]
fn changing_department_resets_team_and_assignee() {
    let mut dashboard = dashboard();
    open(&mut dashboard, 3);
    dashboard.backend_mut().clear_calls();

    let events = dashboard.dispatch(Intent::DepartmentChanged(Some(DepartmentId::new(1))));
    assert!(error_titles(&events).is_empty(), "{events:?}");

    let selection = dashboard.cache().selection();
    assert_eq!(selection.team().values(), vec![TeamId::new(1), TeamId::new(2)]);
    assert_eq!(selection.team().selected, None);
    assert_eq!(selection.assignee().values(), vec![Assignee::Unassigned]);
    assert_eq!(selection.selected_assignee(), Assignee::Unassigned);
    assert!(dashboard.backend().calls().is_empty());
}

#[test]
fn changing_team_fetches_its_members() {
    let mut dashboard = dashboard();
    open(&mut dashboard, 7);
    dashboard.backend_mut().clear_calls();

    let events = dashboard.dispatch(Intent::TeamChanged(Some(TeamId::new(6))));
    assert!(events.contains(&ViewEvent::AssigneeOptionsChanged(
        dashboard.cache().selection().assignee().clone()
    )));
    assert_eq!(
        dashboard.backend().calls(),
        &[Call::ListUsersInTeam(TeamId::new(6))]
    );
    assert_eq!(
        dashboard.cache().selection().assignee().values(),
        vec![
            Assignee::Unassigned,
            Assignee::User(UserId::new(3)),
            Assignee::User(UserId::new(5)),
        ]
    );

    let events = dashboard.dispatch(Intent::AssigneeChanged(Assignee::User(UserId::new(3))));
    assert!(error_titles(&events).is_empty());
    assert_eq!(
        dashboard.cache().selection().selected_assignee(),
        Assignee::User(UserId::new(3))
    );

    let events = dashboard.dispatch(Intent::AssigneeChanged(Assignee::User(UserId::new(4))));
    assert_eq!(error_titles(&events), vec!["Could not change assignee".to_owned()]);
}

#[test]
fn team_outside_the_department_is_refused() {
    let mut dashboard = dashboard();
    open(&mut dashboard, 7);

    let events = dashboard.dispatch(Intent::TeamChanged(Some(TeamId::new(1))));
    assert_eq!(error_titles(&events), vec!["Could not change team".to_owned()]);
    assert_eq!(
        dashboard.cache().selection().team().selected,
        Some(TeamId::new(5))
    );
}

#[test]
fn created_request_shows_up_in_the_unassigned_table() {
    let mut dashboard = dashboard();
    let events = dashboard.dispatch(Intent::FormSubmitted(FormPayload::NewRequest(
        NewRequestInput {
            title: "Printer down".to_owned(),
            description: "Won't print".to_owned(),
            type_id: Some(RequestTypeId::new(1)),
            department_id: Some(DepartmentId::new(2)),
        },
    )));

    assert!(events.contains(&ViewEvent::Submitted(FormKind::NewRequest)));
    assert!(events.contains(&ViewEvent::TableChanged(TableKind::Unassigned)));
    assert_eq!(
        dashboard.backend().calls(),
        &[Call::CreateRequest, Call::ListUnassignedRequests]
    );

    let rows = dashboard
        .table(TableKind::Unassigned)
        .map(TableView::rows)
        .unwrap_or_default();
    let created = rows
        .iter()
        .find(|request| request.id == RequestId::new(9))
        .expect("new request should be listed");
    assert_eq!(created.title, "Printer down");
    assert_eq!(created.description, "Won't print");
    assert_eq!(created.department_id, Some(DepartmentId::new(2)));
    assert_eq!(created.type_id, Some(RequestTypeId::new(1)));
    assert_eq!(created.assignee, Assignee::Unassigned);
}

#[test]
fn invalid_form_never_reaches_the_backend() {
    let mut dashboard = dashboard();
    let events = dashboard.dispatch(Intent::FormSubmitted(FormPayload::NewRequest(
        NewRequestInput {
            title: "   ".to_owned(),
            description: String::new(),
            type_id: None,
            department_id: None,
        },
    )));
    assert_eq!(error_titles(&events), vec!["Could not create the request".to_owned()]);
    assert!(dashboard.backend().calls().is_empty());
}

#[test]
fn forbidden_table_shows_permission_text() {
    let mut dashboard = dashboard();
    dashboard
        .backend_mut()
        .fail(Call::ListUnassignedRequests, forbidden("/api/requests/unassigned"));

    let events = dashboard.dispatch(Intent::TableRefreshRequested(TableKind::Unassigned));
    assert_eq!(events, vec![ViewEvent::TableChanged(TableKind::Unassigned)]);
    match dashboard.table(TableKind::Unassigned) {
        Some(TableView::PermissionDenied(text)) => {
            assert!(text.starts_with("Permission denied"), "{text}");
        }
        other => panic!("expected permission text, got {other:?}"),
    }
}

#[test]
fn unreachable_table_is_empty_with_a_notification() {
    let mut dashboard = dashboard();
    dashboard
        .backend_mut()
        .fail(Call::ListOwnRequests, unreachable("/api/requests/user/self"));

    let events = dashboard.dispatch(Intent::TableRefreshRequested(TableKind::OwnRequests));
    assert_eq!(error_titles(&events), vec!["Could not load my requests".to_owned()]);
    assert_eq!(
        dashboard.table(TableKind::OwnRequests),
        Some(&TableView::Rows(Vec::new()))
    );
}

#[test]
fn own_requests_are_listed_newest_first() {
    let mut dashboard = dashboard();
    dashboard.dispatch(Intent::TableRefreshRequested(TableKind::OwnRequests));
    assert_eq!(
        table_ids(&dashboard, TableKind::OwnRequests),
        vec![RequestId::new(8), RequestId::new(7), RequestId::new(3)]
    );
}

#[test]
fn many_own_requests_stay_sorted() {
    let mut backend = FakeBackend::new();
    let mut faker = RequestFaker::new(7);
    for id in 100..160 {
        let requester = if id % 3 == 0 { UserId::new(4) } else { UserId::new(1) };
        backend
            .org
            .requests
            .push(faker.request(RequestId::new(id), requester));
    }
    let mut dashboard = Dashboard::new(backend);
    dashboard.dispatch(Intent::TableRefreshRequested(TableKind::OwnRequests));

    let rows = dashboard
        .table(TableKind::OwnRequests)
        .map(TableView::rows)
        .unwrap_or_default();
    assert_eq!(rows.len(), 3 + 40);
    assert!(rows.iter().all(|request| request.requester == Some(UserId::new(1))));
    assert!(
        rows.windows(2)
            .all(|pair| pair[0].created_at >= pair[1].created_at),
        "rows should be newest first"
    );
}

#[test]
fn password_stays_invalid_until_the_policy_resolves() {
    let mut dashboard = dashboard();
    let events = dashboard.dispatch(Intent::FieldChanged {
        form: FormKind::NewUser,
        field: FieldName::Password,
        value: "short".to_owned(),
    });
    assert!(events.contains(&ViewEvent::PasswordPolicyChanged(PasswordPolicy::MinLength(
        PASSWORD_MIN_LENGTH
    ))));
    assert_eq!(field_validity(&events, FieldName::Password), Some(false));

    let events = dashboard.dispatch(Intent::FieldChanged {
        form: FormKind::NewUser,
        field: FieldName::Password,
        value: "long enough".to_owned(),
    });
    assert_eq!(field_validity(&events, FieldName::Password), Some(true));
    assert_eq!(dashboard.backend().count(Call::GetSetting), 1);
}

#[test]
fn unavailable_policy_is_asked_for_only_once() {
    let mut dashboard = dashboard();
    dashboard.backend_mut().fail(
        Call::GetSetting,
        unreachable("/api/settings/user_password_min_length"),
    );

    for value in ["short", "much longer password"] {
        let events = dashboard.dispatch(Intent::FieldChanged {
            form: FormKind::NewUser,
            field: FieldName::Password,
            value: value.to_owned(),
        });
        assert_eq!(field_validity(&events, FieldName::Password), Some(false));
    }
    assert_eq!(dashboard.password_policy(), PasswordPolicy::Pending);
    assert_eq!(dashboard.backend().count(Call::GetSetting), 1);
}

#[test]
fn email_field_checks_the_address_shape() {
    let mut dashboard = dashboard();
    for (value, expected) in [("not-an-email", false), ("ada@example.org", true)] {
        let events = dashboard.dispatch(Intent::FieldChanged {
            form: FormKind::NewUser,
            field: FieldName::Email,
            value: value.to_owned(),
        });
        assert_eq!(field_validity(&events, FieldName::Email), Some(expected), "{value}");
    }
    assert_eq!(dashboard.backend().count(Call::GetSetting), 0);
    assert_eq!(
        dashboard
            .validator(FormKind::NewUser)
            .and_then(|validator| validator.validity(FieldName::Email)),
        Some(true)
    );
}

#[test]
fn editing_the_open_request_reloads_it() {
    let mut dashboard = dashboard();
    open(&mut dashboard, 7);
    dashboard.dispatch(Intent::TeamChanged(Some(TeamId::new(6))));
    dashboard.dispatch(Intent::AssigneeChanged(Assignee::User(UserId::new(3))));
    let input = dashboard
        .cache()
        .edit_input()
        .expect("request 7 is open");

    let events = dashboard.dispatch(Intent::FormSubmitted(FormPayload::EditRequest(input)));
    assert!(events.contains(&ViewEvent::Submitted(FormKind::EditRequest)));
    assert!(events.contains(&ViewEvent::RequestLoaded(RequestId::new(7))));

    let stored = dashboard
        .backend()
        .request(RequestId::new(7))
        .expect("fixture request");
    assert_eq!(stored.team_id, Some(TeamId::new(6)));
    assert_eq!(stored.assignee, Assignee::User(UserId::new(3)));
    assert_eq!(
        dashboard.cache().selection().selected_assignee(),
        Assignee::User(UserId::new(3))
    );
    assert!(!table_ids(&dashboard, TableKind::Unassigned).contains(&RequestId::new(7)));
}

#[test]
fn resolving_removes_the_request_from_the_queue() {
    let mut dashboard = dashboard();
    dashboard.dispatch(Intent::TableRefreshRequested(TableKind::Unassigned));
    assert!(table_ids(&dashboard, TableKind::Unassigned).contains(&RequestId::new(7)));

    let events = dashboard.dispatch(Intent::FormSubmitted(FormPayload::ResolveRequest(
        RequestId::new(7),
    )));
    assert!(events.contains(&ViewEvent::Submitted(FormKind::ResolveRequest)));
    assert_eq!(
        dashboard
            .backend()
            .request(RequestId::new(7))
            .map(|request| request.status),
        Some(RequestStatus::Resolved)
    );
    assert!(!table_ids(&dashboard, TableKind::Unassigned).contains(&RequestId::new(7)));
}

#[test]
fn write_refreshes_own_requests_only_once_shown() {
    let mut dashboard = dashboard();
    dashboard.dispatch(Intent::TableRefreshRequested(TableKind::OwnRequests));
    dashboard.backend_mut().clear_calls();

    dashboard.dispatch(Intent::FormSubmitted(FormPayload::ResolveRequest(
        RequestId::new(3),
    )));
    assert_eq!(dashboard.backend().count(Call::ListUnassignedRequests), 1);
    assert_eq!(dashboard.backend().count(Call::ListOwnRequests), 1);
}

#[test]
fn adding_an_update_refreshes_the_count() {
    let mut dashboard = dashboard();
    open(&mut dashboard, 7);

    let events = dashboard.dispatch(Intent::FormSubmitted(FormPayload::AddUpdate(
        AddUpdateInput {
            request_id: RequestId::new(7),
            content: "Rebooted the concentrator".to_owned(),
        },
    )));
    assert_eq!(
        events,
        vec![
            ViewEvent::Submitted(FormKind::AddUpdate),
            ViewEvent::UpdatesChanged {
                request_id: RequestId::new(7),
                count: 3,
            },
        ]
    );
    let last = dashboard.cache().updates().last().expect("three updates");
    assert_eq!(last.content, "Rebooted the concentrator");
    assert_eq!(last.author_name, "root");
}

#[test]
fn failed_history_reload_after_an_update_warns() {
    let mut dashboard = dashboard();
    open(&mut dashboard, 7);
    dashboard.backend_mut().fail(
        Call::ListRequestUpdates(RequestId::new(7)),
        unreachable("/api/requests/7/updates"),
    );

    let events = dashboard.dispatch(Intent::FormSubmitted(FormPayload::AddUpdate(
        AddUpdateInput {
            request_id: RequestId::new(7),
            content: "Rebooted the concentrator".to_owned(),
        },
    )));
    assert_eq!(events[0], ViewEvent::Submitted(FormKind::AddUpdate));
    assert_eq!(
        notifications(&events),
        vec![(
            NotificationLevel::Warning,
            "Update added, but the history could not be reloaded".to_owned()
        )]
    );
    assert!(error_titles(&events).is_empty());
    assert_eq!(
        dashboard
            .backend()
            .count(Call::AddRequestUpdate(RequestId::new(7))),
        1
    );
    assert_eq!(dashboard.cache().updates().len(), 2);
}

#[test]
fn failed_write_produces_a_notification() {
    let mut dashboard = dashboard();
    dashboard
        .backend_mut()
        .fail(Call::CreateTeam, unreachable("/api/teams/new"));

    let events = dashboard.dispatch(Intent::FormSubmitted(FormPayload::NewTeam(NewTeamInput {
        name: "Facilities".to_owned(),
        description: String::new(),
    })));
    assert_eq!(error_titles(&events), vec!["Could not create the team".to_owned()]);
    assert!(!events.contains(&ViewEvent::Submitted(FormKind::NewTeam)));
}

#[test]
fn created_team_appears_in_the_organisation() {
    let mut dashboard = dashboard();
    let events = dashboard.dispatch(Intent::FormSubmitted(FormPayload::NewTeam(NewTeamInput {
        name: "Payroll".to_owned(),
        description: "Salary questions".to_owned(),
    })));
    assert!(events.contains(&ViewEvent::OrganisationLoaded));
    assert_eq!(
        dashboard.organisation().team_name(TeamId::new(10)),
        Some("Payroll")
    );
}

#[test]
fn sign_in_outcomes() {
    let mut dashboard = Dashboard::new(FakeBackend::new().signed_out());

    let events = dashboard.dispatch(Intent::FormSubmitted(FormPayload::Login(LoginInput {
        username: "root".to_owned(),
        password: "wrong".to_owned(),
    })));
    assert_eq!(error_titles(&events), vec!["Sign in failed".to_owned()]);

    let events = dashboard.dispatch(Intent::FormSubmitted(FormPayload::Login(LoginInput {
        username: " root ".to_owned(),
        password: ROOT_PASSWORD.to_owned(),
    })));
    assert!(events.contains(&ViewEvent::SessionStarted {
        username: "root".to_owned(),
    }));

    assert_eq!(dashboard.load_profile(), vec![ViewEvent::ProfileLoaded]);
    assert_eq!(
        dashboard.profile().map(|user| user.username.as_str()),
        Some("root")
    );
}

#[test]
fn signed_out_profile_reports_the_failure() {
    let mut dashboard = Dashboard::new(FakeBackend::new().signed_out());
    let events = dashboard.load_profile();
    assert_eq!(error_titles(&events), vec!["Could not load your profile".to_owned()]);
    assert!(dashboard.profile().is_none());
}

fn new_user(password: &str) -> NewUserInput {
    NewUserInput {
        first_name: "Margaret".to_owned(),
        last_name: "Hamilton".to_owned(),
        username: "margaret".to_owned(),
        email: "margaret@example.org".to_owned(),
        password: password.to_owned(),
        team_ids: vec![TeamId::new(5)],
    }
}

#[test]
fn new_user_password_is_checked_against_the_policy() {
    let mut dashboard = dashboard();
    let events = dashboard.dispatch(Intent::FormSubmitted(FormPayload::NewUser(new_user(
        "short",
    ))));
    assert_eq!(error_titles(&events), vec!["Could not create the user".to_owned()]);
    assert_eq!(dashboard.backend().count(Call::CreateUser), 0);

    let events = dashboard.dispatch(Intent::FormSubmitted(FormPayload::NewUser(new_user(
        "apollo-guidance",
    ))));
    assert!(events.contains(&ViewEvent::Submitted(FormKind::NewUser)));
    assert_eq!(dashboard.backend().count(Call::GetSetting), 1);
    assert!(
        dashboard
            .backend()
            .org
            .users
            .iter()
            .any(|user| user.username == "margaret" && user.is_member_of(TeamId::new(5)))
    );

    let events = dashboard.dispatch(Intent::FormSubmitted(FormPayload::NewUser(new_user(
        "apollo-guidance",
    ))));
    assert_eq!(error_titles(&events), vec!["Could not create the user".to_owned()]);
}

#[test]
fn new_request_form_lists_departments_and_types() {
    let mut dashboard = dashboard();
    let events = dashboard.prepare_new_request();
    assert_eq!(events, vec![ViewEvent::NewRequestFormReady]);

    let form = dashboard.new_request_form();
    assert_eq!(
        form.departments.values(),
        vec![DepartmentId::new(1), DepartmentId::new(2)]
    );
    assert_eq!(
        form.types.values(),
        vec![RequestTypeId::new(1), RequestTypeId::new(2)]
    );
    assert_eq!(form.departments.selected, None);
}
