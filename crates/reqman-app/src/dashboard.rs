// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Intent-driven controller tying the backend, the entity cache and the
//! form validators together.
//!
//! Every intent runs its fetches strictly in sequence and answers with the
//! view events a renderer needs to repaint. Reads that fail degrade to empty
//! data with a log line; writes that fail always produce a notification.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::{
    Applied, Assignee, AuthOutcome, Backend, Choices, Department, DepartmentId, EntityCache,
    FetchError, FetchResult, FieldName, FormKind, FormPayload, FormValidator, LoadTicket,
    PasswordPolicy, Request, RequestId, RequestSnapshot, RequestTypeId, SelectionChange,
    SettingKey, Team, TeamId, TableKind, User, department_choices, sort_newest_first,
    type_choices,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    RequestOpened(RequestId),
    RequestClosed,
    DepartmentChanged(Option<DepartmentId>),
    TeamChanged(Option<TeamId>),
    AssigneeChanged(Assignee),
    TypeChanged(Option<RequestTypeId>),
    FieldChanged {
        form: FormKind,
        field: FieldName,
        value: String,
    },
    FormSubmitted(FormPayload),
    TableRefreshRequested(TableKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    /// The action went through but what is shown may be out of date.
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: title.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableView {
    Rows(Vec<Request>),
    /// Shown in place of the table when the server answers 403.
    PermissionDenied(String),
}

impl TableView {
    pub fn rows(&self) -> &[Request] {
        match self {
            Self::Rows(rows) => rows,
            Self::PermissionDenied(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Organisation {
    pub departments: Vec<Department>,
    pub teams: Vec<Team>,
}

impl Organisation {
    pub fn teams_of<'a>(
        &'a self,
        department: &'a Department,
    ) -> impl Iterator<Item = &'a Team> + 'a {
        self.teams
            .iter()
            .filter(move |team| department.has_team(team.id))
    }

    pub fn team_name(&self, id: TeamId) -> Option<&str> {
        self.teams
            .iter()
            .find(|team| team.id == id)
            .map(|team| team.name.as_str())
    }
}

/// Option lists for the new request form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewRequestForm {
    pub departments: Choices<DepartmentId>,
    pub types: Choices<RequestTypeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    RequestLoaded(RequestId),
    RequestCleared,
    StaleResponseDiscarded(RequestId),
    StaleMembersDiscarded(TeamId),
    DepartmentOptionsChanged(Choices<DepartmentId>),
    TeamOptionsChanged(Choices<TeamId>),
    AssigneeOptionsChanged(Choices<Assignee>),
    TypeOptionsChanged(Choices<RequestTypeId>),
    UpdatesChanged { request_id: RequestId, count: usize },
    FieldValidated {
        form: FormKind,
        field: FieldName,
        valid: bool,
    },
    PasswordPolicyChanged(PasswordPolicy),
    TableChanged(TableKind),
    OrganisationLoaded,
    ProfileLoaded,
    NewRequestFormReady,
    SessionStarted { username: String },
    Submitted(FormKind),
    Notification(Notification),
}

pub struct Dashboard<B> {
    backend: B,
    cache: EntityCache,
    validators: BTreeMap<FormKind, FormValidator>,
    password_policy: PasswordPolicy,
    policy_fetched: bool,
    tables: BTreeMap<TableKind, TableView>,
    organisation: Organisation,
    profile: Option<User>,
    new_request_form: NewRequestForm,
}

impl<B: Backend> Dashboard<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cache: EntityCache::new(),
            validators: BTreeMap::new(),
            password_policy: PasswordPolicy::Pending,
            policy_fetched: false,
            tables: BTreeMap::new(),
            organisation: Organisation::default(),
            profile: None,
            new_request_form: NewRequestForm::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    pub fn table(&self, kind: TableKind) -> Option<&TableView> {
        self.tables.get(&kind)
    }

    pub fn validator(&self, form: FormKind) -> Option<&FormValidator> {
        self.validators.get(&form)
    }

    pub fn password_policy(&self) -> PasswordPolicy {
        self.password_policy
    }

    pub fn organisation(&self) -> &Organisation {
        &self.organisation
    }

    pub fn profile(&self) -> Option<&User> {
        self.profile.as_ref()
    }

    pub fn new_request_form(&self) -> &NewRequestForm {
        &self.new_request_form
    }

    pub fn dispatch(&mut self, intent: Intent) -> Vec<ViewEvent> {
        match intent {
            Intent::RequestOpened(id) => {
                let ticket = self.begin_load(id);
                self.complete_load(ticket)
            }
            Intent::RequestClosed => {
                self.cache.clear();
                self.validators.remove(&FormKind::EditRequest);
                self.validators.remove(&FormKind::AddUpdate);
                vec![ViewEvent::RequestCleared]
            }
            Intent::DepartmentChanged(department) => {
                match self.cache.change_department(department) {
                    Ok(change) => {
                        let mut events = vec![ViewEvent::DepartmentOptionsChanged(
                            self.cache.selection().department().clone(),
                        )];
                        events.extend(self.follow_selection_change(change));
                        events
                    }
                    Err(error) => {
                        vec![error_notification("Could not change department", &error)]
                    }
                }
            }
            Intent::TeamChanged(team) => match self.cache.change_team(team) {
                Ok(change) => self.follow_selection_change(change),
                Err(error) => vec![error_notification("Could not change team", &error)],
            },
            Intent::AssigneeChanged(assignee) => match self.cache.change_assignee(assignee) {
                Ok(()) => vec![ViewEvent::AssigneeOptionsChanged(
                    self.cache.selection().assignee().clone(),
                )],
                Err(error) => vec![error_notification("Could not change assignee", &error)],
            },
            Intent::TypeChanged(type_id) => match self.cache.change_type(type_id) {
                Ok(()) => vec![ViewEvent::TypeOptionsChanged(self.cache.type_choices())],
                Err(error) => vec![error_notification("Could not change request type", &error)],
            },
            Intent::FieldChanged { form, field, value } => self.field_changed(form, field, &value),
            Intent::FormSubmitted(payload) => self.submit(payload),
            Intent::TableRefreshRequested(kind) => self.refresh_table(kind, true),
        }
    }

    /// Starts a request load. Any ticket handed out earlier goes stale.
    pub fn begin_load(&mut self, id: RequestId) -> LoadTicket {
        self.validators.remove(&FormKind::EditRequest);
        self.validators.remove(&FormKind::AddUpdate);
        self.cache.begin_load(id)
    }

    /// Fetches everything the request view needs and installs it, unless a
    /// newer load or a close superseded `ticket` in the meantime.
    pub fn complete_load(&mut self, ticket: LoadTicket) -> Vec<ViewEvent> {
        let id = ticket.request_id();
        let mut events = Vec::new();
        debug!(request = %id, "loading request");

        let request = match self.backend.get_request(id) {
            Ok(request) => request,
            Err(error) => {
                events.push(read_failed(&format!("load request {id}"), &error));
                return events;
            }
        };
        if !self.cache.is_current(ticket) {
            debug!(request = %id, "request load superseded");
            events.push(ViewEvent::StaleResponseDiscarded(id));
            return events;
        }

        let departments = degrade(self.backend.list_departments(), "load departments", &mut events);
        let teams = degrade(self.backend.list_teams(), "load teams", &mut events);
        let request_types = degrade(
            self.backend.list_request_types(),
            "load request types",
            &mut events,
        );
        let members = match request.team_id {
            Some(team) => degrade(
                self.backend.list_users_in_team(team),
                &format!("load members of team {team}"),
                &mut events,
            ),
            None => Vec::new(),
        };
        let updates = degrade(
            self.backend.list_request_updates(id),
            "load request updates",
            &mut events,
        );

        let snapshot = RequestSnapshot {
            request,
            departments,
            teams,
            request_types,
            members,
            updates,
        };
        match self.cache.apply_snapshot(ticket, snapshot) {
            Applied::Stale => {
                debug!(request = %id, "discarding stale request snapshot");
                events.push(ViewEvent::StaleResponseDiscarded(id));
            }
            Applied::Current => {
                let selection = self.cache.selection();
                events.push(ViewEvent::RequestLoaded(id));
                events.push(ViewEvent::DepartmentOptionsChanged(selection.department().clone()));
                events.push(ViewEvent::TeamOptionsChanged(selection.team().clone()));
                events.push(ViewEvent::AssigneeOptionsChanged(selection.assignee().clone()));
                events.push(ViewEvent::TypeOptionsChanged(self.cache.type_choices()));
                events.push(self.updates_changed(id));
            }
        }
        events
    }

    /// Loads the department and team listings shown on the organisation page.
    pub fn load_organisation(&mut self) -> Vec<ViewEvent> {
        let mut events = Vec::new();
        let departments = degrade(self.backend.list_departments(), "load departments", &mut events);
        let teams = degrade(self.backend.list_teams(), "load teams", &mut events);
        self.organisation = Organisation { departments, teams };
        events.push(ViewEvent::OrganisationLoaded);
        events
    }

    pub fn load_profile(&mut self) -> Vec<ViewEvent> {
        match self.backend.current_user() {
            Ok(user) => {
                self.profile = Some(user);
                vec![ViewEvent::ProfileLoaded]
            }
            Err(error) => {
                self.profile = None;
                vec![read_failed("load your profile", &error)]
            }
        }
    }

    pub fn prepare_new_request(&mut self) -> Vec<ViewEvent> {
        let mut events = Vec::new();
        let departments = degrade(
            self.backend.list_request_departments(),
            "load request departments",
            &mut events,
        );
        let types = degrade(
            self.backend.list_request_types(),
            "load request types",
            &mut events,
        );
        self.new_request_form = NewRequestForm {
            departments: department_choices(&departments, None),
            types: type_choices(&types, None),
        };
        events.push(ViewEvent::NewRequestFormReady);
        events
    }

    fn follow_selection_change(&mut self, change: SelectionChange) -> Vec<ViewEvent> {
        let mut events = Vec::new();
        if change.teams {
            events.push(ViewEvent::TeamOptionsChanged(
                self.cache.selection().team().clone(),
            ));
        }
        if let Some(team) = change.members_needed {
            match self.backend.list_users_in_team(team) {
                Ok(members) => {
                    if self.cache.apply_team_members(team, members) == Applied::Stale {
                        debug!(team = %team, "discarding members of deselected team");
                        events.push(ViewEvent::StaleMembersDiscarded(team));
                    }
                }
                Err(error) => {
                    events.push(read_failed(&format!("load members of team {team}"), &error));
                }
            }
        }
        if change.assignees {
            events.push(ViewEvent::AssigneeOptionsChanged(
                self.cache.selection().assignee().clone(),
            ));
        }
        events
    }

    fn field_changed(&mut self, form: FormKind, field: FieldName, value: &str) -> Vec<ViewEvent> {
        let mut events = Vec::new();
        if field == FieldName::Password && !self.policy_fetched {
            events.extend(self.resolve_password_policy(form));
        }
        let valid = self
            .validators
            .entry(form)
            .or_default()
            .field_changed(field, value, self.password_policy);
        events.push(ViewEvent::FieldValidated { form, field, valid });
        events
    }

    /// Fetches the minimum password length once. A failed or malformed
    /// answer leaves the policy pending for the rest of the session.
    fn resolve_password_policy(&mut self, requesting: FormKind) -> Vec<ViewEvent> {
        self.policy_fetched = true;
        let key = SettingKey::UserPasswordMinLength;
        let setting = match self.backend.get_setting(key.as_str()) {
            Ok(setting) => setting,
            Err(error) => {
                warn!(endpoint = error.endpoint(), %error, "password policy unavailable");
                return Vec::new();
            }
        };
        let Some(min) = setting.as_usize() else {
            warn!(value = %setting.value, "password minimum length is not a number");
            return Vec::new();
        };

        self.password_policy = PasswordPolicy::MinLength(min);
        info!(min_length = min, "password policy resolved");
        let mut events = vec![ViewEvent::PasswordPolicyChanged(self.password_policy)];
        for (form, validator) in &mut self.validators {
            if *form == requesting {
                continue;
            }
            if let Some(valid) = validator.revalidate_password(self.password_policy) {
                events.push(ViewEvent::FieldValidated {
                    form: *form,
                    field: FieldName::Password,
                    valid,
                });
            }
        }
        events
    }

    fn submit(&mut self, payload: FormPayload) -> Vec<ViewEvent> {
        let kind = payload.kind();
        if let Err(error) = payload.validate() {
            return vec![error_notification(format!("Could not {}", kind.action()), &error)];
        }

        match payload {
            FormPayload::Login(login) => {
                let username = login.username.trim().to_owned();
                match self.backend.authenticate(&username, &login.password) {
                    Ok(AuthOutcome::Token(_)) => {
                        info!(user = %username, "signed in");
                        vec![
                            ViewEvent::Submitted(kind),
                            ViewEvent::SessionStarted { username },
                        ]
                    }
                    Ok(AuthOutcome::Rejected(message)) => {
                        info!(user = %username, "sign in rejected");
                        vec![ViewEvent::Notification(Notification::error(
                            "Sign in failed",
                            message,
                        ))]
                    }
                    Err(error) => vec![write_failed(kind, &error)],
                }
            }
            FormPayload::NewRequest(input) => {
                if let Err(error) = self.backend.create_request(&input) {
                    return vec![write_failed(kind, &error)];
                }
                let mut events = vec![
                    ViewEvent::Submitted(kind),
                    ViewEvent::Notification(Notification::info(
                        "Request submitted",
                        format!("\"{}\" was added to the queue", input.title.trim()),
                    )),
                ];
                events.extend(self.refresh_after_write());
                events
            }
            FormPayload::EditRequest(input) => {
                if let Err(error) = self.backend.edit_request(&input) {
                    return vec![write_failed(kind, &error)];
                }
                let mut events = vec![
                    ViewEvent::Submitted(kind),
                    ViewEvent::Notification(Notification::info(
                        "Request updated",
                        format!("request {} was saved", input.request_id),
                    )),
                ];
                events.extend(self.reload_if_open(input.request_id));
                events.extend(self.refresh_after_write());
                events
            }
            FormPayload::AddUpdate(input) => {
                if let Err(error) = self.backend.add_request_update(&input) {
                    return vec![write_failed(kind, &error)];
                }
                let mut events = vec![ViewEvent::Submitted(kind)];
                match self.backend.list_request_updates(input.request_id) {
                    Ok(updates) => {
                        if self.cache.set_updates(input.request_id, updates) == Applied::Current {
                            events.push(self.updates_changed(input.request_id));
                        }
                    }
                    Err(error) => {
                        log_read_failure("reload request updates", &error);
                        events.push(ViewEvent::Notification(Notification::warning(
                            "Update added, but the history could not be reloaded",
                            error.to_string(),
                        )));
                    }
                }
                events
            }
            FormPayload::ResolveRequest(id) => {
                if let Err(error) = self.backend.resolve_request(id) {
                    return vec![write_failed(kind, &error)];
                }
                let mut events = vec![
                    ViewEvent::Submitted(kind),
                    ViewEvent::Notification(Notification::info(
                        "Request resolved",
                        format!("request {id} was marked resolved"),
                    )),
                ];
                events.extend(self.reload_if_open(id));
                events.extend(self.refresh_after_write());
                events
            }
            FormPayload::NewDepartment(input) => {
                if let Err(error) = self.backend.create_department(&input) {
                    return vec![write_failed(kind, &error)];
                }
                let mut events = vec![
                    ViewEvent::Submitted(kind),
                    ViewEvent::Notification(Notification::info(
                        "Department created",
                        format!("{} was created", input.name.trim()),
                    )),
                ];
                events.extend(self.load_organisation());
                events
            }
            FormPayload::NewTeam(input) => {
                if let Err(error) = self.backend.create_team(&input) {
                    return vec![write_failed(kind, &error)];
                }
                let mut events = vec![
                    ViewEvent::Submitted(kind),
                    ViewEvent::Notification(Notification::info(
                        "Team created",
                        format!("{} was created", input.name.trim()),
                    )),
                ];
                events.extend(self.load_organisation());
                events
            }
            FormPayload::NewUser(input) => {
                let mut events = Vec::new();
                if !self.policy_fetched {
                    events.extend(self.resolve_password_policy(kind));
                }
                if !self.password_policy.accepts(&input.password) {
                    let message = match self.password_policy {
                        PasswordPolicy::MinLength(min) => {
                            format!("password must be at least {min} characters")
                        }
                        PasswordPolicy::Pending => {
                            "password policy is unavailable -- retry once the server answers"
                                .to_owned()
                        }
                    };
                    events.push(ViewEvent::Notification(Notification::error(
                        format!("Could not {}", kind.action()),
                        message,
                    )));
                    return events;
                }
                if let Err(error) = self.backend.create_user(&input) {
                    events.push(write_failed(kind, &error));
                    return events;
                }
                events.push(ViewEvent::Submitted(kind));
                events.push(ViewEvent::Notification(Notification::info(
                    "User created",
                    format!("{} can now sign in", input.username.trim()),
                )));
                events
            }
        }
    }

    fn reload_if_open(&mut self, id: RequestId) -> Vec<ViewEvent> {
        if self.cache.current_request_id() != Some(id) {
            return Vec::new();
        }
        let ticket = self.cache.begin_load(id);
        self.complete_load(ticket)
    }

    /// The unassigned table is always refreshed after a request write; the
    /// other tables only when they are on screen.
    fn refresh_after_write(&mut self) -> Vec<ViewEvent> {
        let kinds: Vec<TableKind> = TableKind::ALL
            .into_iter()
            .filter(|kind| *kind == TableKind::Unassigned || self.tables.contains_key(kind))
            .collect();
        kinds
            .into_iter()
            .flat_map(|kind| self.refresh_table(kind, false))
            .collect()
    }

    fn refresh_table(&mut self, kind: TableKind, notify: bool) -> Vec<ViewEvent> {
        let result = match kind {
            TableKind::Unassigned => self.backend.list_unassigned_requests(),
            TableKind::OwnRequests => self.backend.list_own_requests(),
        };
        let mut events = Vec::new();
        let view = match result {
            Ok(mut rows) => {
                if kind == TableKind::OwnRequests {
                    sort_newest_first(&mut rows);
                }
                debug!(table = kind.label(), rows = rows.len(), "table refreshed");
                TableView::Rows(rows)
            }
            Err(error) if error.is_permission_denied() => {
                info!(table = kind.label(), "table hidden, permission denied");
                TableView::PermissionDenied(permission_denied_text(kind, &error))
            }
            Err(error) => {
                let action = format!("load {}", kind.label());
                if notify {
                    events.push(read_failed(&action, &error));
                } else {
                    log_read_failure(&action, &error);
                }
                TableView::Rows(Vec::new())
            }
        };
        self.tables.insert(kind, view);
        events.push(ViewEvent::TableChanged(kind));
        events
    }

    fn updates_changed(&self, request_id: RequestId) -> ViewEvent {
        ViewEvent::UpdatesChanged {
            request_id,
            count: self.cache.updates().len(),
        }
    }
}

fn permission_denied_text(kind: TableKind, error: &FetchError) -> String {
    match error {
        FetchError::HttpError {
            message: Some(message),
            ..
        } if message.trim().starts_with("Permission denied") => message.trim().to_owned(),
        FetchError::HttpError {
            message: Some(message),
            ..
        } if !message.trim().is_empty() => format!("Permission denied: {}", message.trim()),
        _ => format!("Permission denied: you cannot view {}", kind.label()),
    }
}

fn log_read_failure(action: &str, error: &FetchError) {
    warn!(endpoint = error.endpoint(), %error, "could not {action}");
}

/// Logs a failed user-initiated read and returns the notification for it.
fn read_failed(action: &str, error: &FetchError) -> ViewEvent {
    log_read_failure(action, error);
    ViewEvent::Notification(Notification::error(
        format!("Could not {action}"),
        error.to_string(),
    ))
}

fn degrade<T: Default>(result: FetchResult<T>, action: &str, events: &mut Vec<ViewEvent>) -> T {
    match result {
        Ok(value) => value,
        Err(error) => {
            events.push(read_failed(action, &error));
            T::default()
        }
    }
}

fn write_failed(kind: FormKind, error: &FetchError) -> ViewEvent {
    warn!(endpoint = error.endpoint(), %error, form = kind.label(), "write failed");
    ViewEvent::Notification(Notification::error(
        format!("Could not {}", kind.action()),
        error.to_string(),
    ))
}

fn error_notification(title: impl Into<String>, error: &anyhow::Error) -> ViewEvent {
    ViewEvent::Notification(Notification::error(title, format!("{error:#}")))
}
