// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use reqman_api::{Client, Session};
use reqman_app::{
    AddUpdateInput, Backend, Dashboard, FieldName, FormKind, FormPayload, Intent, LoginInput,
    NewRequestInput, NewTeamInput, NewUserInput, NotificationLevel, RequestId, TableKind, TeamId,
    TeamPicker, ViewEvent,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::debug;

use crate::command::{Command, EditArgs, NewDepartmentArgs, NewRequestArgs, NewUserArgs};
use crate::render::{self, Style};

/// Backends that hold a sign-in worth keeping between runs.
pub trait SessionSource {
    fn current_session(&self) -> Option<Session>;
}

impl SessionSource for Client {
    fn current_session(&self) -> Option<Session> {
        self.session().cloned()
    }
}

pub struct Runtime<B> {
    dashboard: Dashboard<B>,
    session_path: PathBuf,
    password: Option<String>,
    style: Style,
}

impl<B: Backend + SessionSource> Runtime<B> {
    pub fn new(backend: B, session_path: PathBuf, style: Style) -> Self {
        Self {
            dashboard: Dashboard::new(backend),
            session_path,
            password: None,
            style,
        }
    }

    /// Password for `login` and `new-user`; without one it is read from
    /// stdin.
    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password;
        self
    }

    pub fn dashboard(&self) -> &Dashboard<B> {
        &self.dashboard
    }

    pub fn execute(&mut self, command: Command, out: &mut dyn Write) -> Result<()> {
        debug!(?command, "executing");
        match command {
            Command::Login { username } => self.login(username, out),
            Command::Logout => {
                if Session::remove(&self.session_path)? {
                    writeln!(out, "Signed out.")?;
                } else {
                    writeln!(out, "No saved session.")?;
                }
                Ok(())
            }
            Command::WhoAmI => {
                let mut events = self.dashboard.load_profile();
                events.extend(self.dashboard.load_organisation());
                if let Some(user) = self.dashboard.profile() {
                    write!(out, "{}", render::user(user, self.dashboard.organisation()))?;
                }
                self.report(&events, out)
            }
            Command::Mine => self.show_table(TableKind::OwnRequests, out),
            Command::Unassigned => self.show_table(TableKind::Unassigned, out),
            Command::Show(id) => {
                let events = self.dashboard.dispatch(Intent::RequestOpened(id));
                if events.contains(&ViewEvent::RequestLoaded(id)) {
                    write!(out, "{}", render::request_detail(self.dashboard.cache(), self.style))?;
                }
                self.report(&events, out)
            }
            Command::NewRequest(args) => self.new_request(args, out),
            Command::Edit(args) => self.edit(args, out),
            Command::Update {
                request_id,
                content,
            } => {
                self.open(request_id, out)?;
                let events = self.dashboard.dispatch(Intent::FormSubmitted(FormPayload::AddUpdate(
                    AddUpdateInput {
                        request_id,
                        content,
                    },
                )));
                let reloaded = events
                    .iter()
                    .any(|event| matches!(event, ViewEvent::UpdatesChanged { .. }));
                if reloaded {
                    write!(out, "{}", render::updates(self.dashboard.cache().updates()))?;
                }
                self.report(&events, out)
            }
            Command::Resolve(id) => {
                let events = self
                    .dashboard
                    .dispatch(Intent::FormSubmitted(FormPayload::ResolveRequest(id)));
                self.report(&events, out)
            }
            Command::Departments => {
                let events = self.dashboard.load_organisation();
                write!(out, "{}", render::organisation(self.dashboard.organisation()))?;
                self.report(&events, out)
            }
            Command::Teams => {
                let events = self.dashboard.load_organisation();
                write!(out, "{}", render::teams(self.dashboard.organisation()))?;
                self.report(&events, out)
            }
            Command::NewTeam { name, description } => {
                let events = self.dashboard.dispatch(Intent::FormSubmitted(FormPayload::NewTeam(
                    NewTeamInput { name, description },
                )));
                self.report(&events, out)
            }
            Command::NewDepartment(args) => self.new_department(args, out),
            Command::NewUser(args) => self.new_user(args, out),
            Command::Check => {
                match self.dashboard.backend().current_session() {
                    Some(session) => writeln!(out, "session: signed in as {}", session.user)?,
                    None => writeln!(out, "session: signed out")?,
                }
                Ok(())
            }
        }
    }

    fn login(&mut self, username: String, out: &mut dyn Write) -> Result<()> {
        let password = self.password(&format!("password for {username}"))?;
        let events = self
            .dashboard
            .dispatch(Intent::FormSubmitted(FormPayload::Login(LoginInput {
                username,
                password,
            })));
        for event in &events {
            if let ViewEvent::SessionStarted { username } = event {
                if let Some(session) = self.dashboard.backend().current_session() {
                    session.save(&self.session_path)?;
                }
                writeln!(out, "Signed in as {username}.")?;
            }
        }
        self.report(&events, out)
    }

    fn show_table(&mut self, kind: TableKind, out: &mut dyn Write) -> Result<()> {
        let events = self.dashboard.dispatch(Intent::TableRefreshRequested(kind));
        if let Some(view) = self.dashboard.table(kind) {
            write!(out, "{}", render::table(kind, view, self.style))?;
        }
        self.report(&events, out)
    }

    /// Checks the department and type against what the new request form
    /// offers; an omitted one is listed so the next run can pass it.
    fn new_request(&mut self, args: NewRequestArgs, out: &mut dyn Write) -> Result<()> {
        let events = self.dashboard.prepare_new_request();
        self.report(&events, out)?;

        let form = self.dashboard.new_request_form();
        match args.department_id {
            Some(id) if !form.departments.contains(id) => bail!(
                "department {id} is not offered for new requests\n{}",
                render::offered("departments", &form.departments).trim_end()
            ),
            Some(_) => {}
            None => write!(
                out,
                "{}",
                render::offered("no --department given; offered", &form.departments)
            )?,
        }
        match args.type_id {
            Some(id) if !form.types.contains(id) => bail!(
                "request type {id} is not offered for new requests\n{}",
                render::offered("types", &form.types).trim_end()
            ),
            Some(_) => {}
            None => write!(
                out,
                "{}",
                render::offered("no --type given; offered", &form.types)
            )?,
        }

        let events = self
            .dashboard
            .dispatch(Intent::FormSubmitted(FormPayload::NewRequest(NewRequestInput {
                title: args.title,
                description: args.description,
                type_id: args.type_id,
                department_id: args.department_id,
            })));
        self.report(&events, out)
    }

    fn open(&mut self, id: RequestId, out: &mut dyn Write) -> Result<()> {
        let events = self.dashboard.dispatch(Intent::RequestOpened(id));
        let loaded = events.contains(&ViewEvent::RequestLoaded(id));
        self.report(&events, out)?;
        if !loaded {
            bail!("request {id} could not be opened");
        }
        Ok(())
    }

    /// Applies the passed flags through the same selection intents the
    /// dashboard uses, so a department change resets the team below it.
    fn edit(&mut self, args: EditArgs, out: &mut dyn Write) -> Result<()> {
        self.open(args.request_id, out)?;

        let mut intents = Vec::new();
        if let Some(department) = args.department_id {
            intents.push(Intent::DepartmentChanged(department));
        }
        if let Some(team) = args.team_id {
            intents.push(Intent::TeamChanged(team));
        }
        if let Some(assignee) = args.assignee {
            intents.push(Intent::AssigneeChanged(assignee));
        }
        if let Some(type_id) = args.type_id {
            intents.push(Intent::TypeChanged(type_id));
        }
        for intent in intents {
            let events = self.dashboard.dispatch(intent);
            self.report(&events, out)?;
        }

        let Some(mut input) = self.dashboard.cache().edit_input() else {
            bail!("request {} is no longer open", args.request_id);
        };
        if let Some(title) = args.title {
            input.title = title;
        }
        if let Some(description) = args.description {
            input.description = description;
        }

        let events = self
            .dashboard
            .dispatch(Intent::FormSubmitted(FormPayload::EditRequest(input)));
        if events.contains(&ViewEvent::RequestLoaded(args.request_id)) {
            write!(out, "{}", render::request_detail(self.dashboard.cache(), self.style))?;
        }
        self.report(&events, out)
    }

    fn new_department(&mut self, args: NewDepartmentArgs, out: &mut dyn Write) -> Result<()> {
        let events = self.dashboard.load_organisation();
        self.report(&events, out)?;

        let picker = self.pick_teams(&args.team_ids)?;
        if let Some(initial) = args.initial_team_id
            && !picker
                .initial_team_options()
                .iter()
                .any(|option| option.value == initial)
        {
            bail!("initial team {initial} must be one of the teams passed with --team");
        }
        let input = picker.department_input(&args.name, &args.description, args.initial_team_id);
        let events = self
            .dashboard
            .dispatch(Intent::FormSubmitted(FormPayload::NewDepartment(input)));
        self.report(&events, out)
    }

    fn new_user(&mut self, args: NewUserArgs, out: &mut dyn Write) -> Result<()> {
        let password = self.password(&format!("password for new user {}", args.username))?;

        let fields = [
            (FieldName::FirstName, args.first_name.as_str()),
            (FieldName::LastName, args.last_name.as_str()),
            (FieldName::Username, args.username.as_str()),
            (FieldName::Email, args.email.as_str()),
            (FieldName::Password, password.as_str()),
        ];
        let mut invalid = Vec::new();
        for (field, value) in fields {
            let events = self.dashboard.dispatch(Intent::FieldChanged {
                form: FormKind::NewUser,
                field,
                value: value.to_owned(),
            });
            let rejected = events.iter().any(|event| {
                matches!(
                    event,
                    ViewEvent::FieldValidated { field: checked, valid: false, .. }
                        if *checked == field
                )
            });
            if rejected {
                invalid.push(field.as_str());
            }
        }
        if !invalid.is_empty() {
            bail!(
                "invalid new user fields: {} -- names and username must be non-empty, email must look like name@domain.tld, and the password must meet the server minimum",
                invalid.join(", ")
            );
        }

        let events = self.dashboard.load_organisation();
        self.report(&events, out)?;
        let team_ids = self.pick_teams(&args.team_ids)?.picked_ids();

        let events = self
            .dashboard
            .dispatch(Intent::FormSubmitted(FormPayload::NewUser(NewUserInput {
                first_name: args.first_name,
                last_name: args.last_name,
                username: args.username,
                email: args.email,
                password,
                team_ids,
            })));
        self.report(&events, out)
    }

    /// Runs `teams` through the organisation's team picker. Expects the
    /// organisation to be loaded.
    fn pick_teams(&self, teams: &[TeamId]) -> Result<TeamPicker> {
        let mut picker = TeamPicker::new(&self.dashboard.organisation().teams);
        for team in teams {
            if !picker.pick(*team) {
                let offered: Vec<String> = picker
                    .available()
                    .iter()
                    .map(|option| format!("{} ({})", option.value, option.label))
                    .collect();
                bail!(
                    "team {team} is unknown or listed twice; still available: {}",
                    if offered.is_empty() {
                        "none".to_owned()
                    } else {
                        offered.join(", ")
                    }
                );
            }
        }
        Ok(picker)
    }

    fn password(&mut self, prompt: &str) -> Result<String> {
        if let Some(password) = self.password.take() {
            return Ok(password);
        }
        eprint!("{prompt}: ");
        io::stderr().flush().ok();
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("read password from stdin; set REQMAN_PASSWORD to skip the prompt")?;
        Ok(line.trim_end_matches(['\r', '\n']).to_owned())
    }

    /// Prints info and warning notifications; error notifications become the
    /// command's error so the process exits non-zero.
    fn report(&self, events: &[ViewEvent], out: &mut dyn Write) -> Result<()> {
        let mut failures = Vec::new();
        for event in events {
            let ViewEvent::Notification(notification) = event else {
                continue;
            };
            match notification.level {
                NotificationLevel::Info | NotificationLevel::Warning => {
                    write!(out, "{}", render::notification(notification, self.style))?;
                }
                NotificationLevel::Error => {
                    failures.push(render::notification(notification, Style::PLAIN));
                }
            }
        }
        if failures.is_empty() {
            return Ok(());
        }
        bail!("{}", failures.concat().trim_end())
    }
}
