// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

use crate::{
    Assignee, DepartmentId, FormKind, RequestId, RequestTypeId, SelectOption, Team, TeamId,
    is_email, is_present,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRequestInput {
    pub title: String,
    pub description: String,
    pub type_id: Option<RequestTypeId>,
    pub department_id: Option<DepartmentId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequestInput {
    pub request_id: RequestId,
    pub title: String,
    pub description: String,
    pub department_id: Option<DepartmentId>,
    pub team_id: Option<TeamId>,
    pub assignee: Assignee,
    pub type_id: Option<RequestTypeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddUpdateInput {
    pub request_id: RequestId,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDepartmentInput {
    pub name: String,
    pub description: String,
    pub initial_team_id: Option<TeamId>,
    pub team_ids: Vec<TeamId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTeamInput {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserInput {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub team_ids: Vec<TeamId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPayload {
    Login(LoginInput),
    NewRequest(NewRequestInput),
    EditRequest(EditRequestInput),
    AddUpdate(AddUpdateInput),
    ResolveRequest(RequestId),
    NewDepartment(NewDepartmentInput),
    NewTeam(NewTeamInput),
    NewUser(NewUserInput),
}

impl FormPayload {
    pub fn kind(&self) -> FormKind {
        match self {
            Self::Login(_) => FormKind::Login,
            Self::NewRequest(_) => FormKind::NewRequest,
            Self::EditRequest(_) => FormKind::EditRequest,
            Self::AddUpdate(_) => FormKind::AddUpdate,
            Self::ResolveRequest(_) => FormKind::ResolveRequest,
            Self::NewDepartment(_) => FormKind::NewDepartment,
            Self::NewTeam(_) => FormKind::NewTeam,
            Self::NewUser(_) => FormKind::NewUser,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Login(login) => login.validate(),
            Self::NewRequest(request) => request.validate(),
            Self::EditRequest(edit) => edit.validate(),
            Self::AddUpdate(update) => update.validate(),
            Self::ResolveRequest(_) => Ok(()),
            Self::NewDepartment(department) => department.validate(),
            Self::NewTeam(team) => team.validate(),
            Self::NewUser(user) => user.validate(),
        }
    }
}

impl LoginInput {
    pub fn validate(&self) -> Result<()> {
        if !is_present(&self.username) {
            bail!("username is required -- enter your username and retry");
        }
        if self.password.is_empty() {
            bail!("password is required -- enter your password and retry");
        }
        Ok(())
    }
}

impl NewRequestInput {
    /// The request form only refuses a submission where every field is blank.
    pub fn validate(&self) -> Result<()> {
        if !is_present(&self.title) && !is_present(&self.description) && self.type_id.is_none() {
            bail!("request is empty -- enter a title, description, or type and retry");
        }
        Ok(())
    }
}

impl EditRequestInput {
    pub fn validate(&self) -> Result<()> {
        if !is_present(&self.title) {
            bail!("request title is required -- enter a title and retry");
        }
        if self.team_id.is_some() && self.department_id.is_none() {
            bail!("a team can only be set together with its department");
        }
        if self.assignee != Assignee::Unassigned && self.team_id.is_none() {
            bail!("an assignee can only be set together with a team");
        }
        Ok(())
    }
}

impl AddUpdateInput {
    pub fn validate(&self) -> Result<()> {
        if !is_present(&self.content) {
            bail!("update text is empty -- write an update and retry");
        }
        Ok(())
    }
}

impl NewDepartmentInput {
    pub fn validate(&self) -> Result<()> {
        if !is_present(&self.name) {
            bail!("department name is required -- enter a valid department name");
        }
        if self.team_ids.is_empty() {
            bail!("no teams selected -- add at least one team to the department");
        }
        if let Some(initial) = self.initial_team_id
            && !self.team_ids.contains(&initial)
        {
            bail!("initial team {initial} must be one of the department's teams");
        }
        Ok(())
    }
}

impl NewTeamInput {
    pub fn validate(&self) -> Result<()> {
        if !is_present(&self.name) {
            bail!("team name is required -- enter a valid team name");
        }
        Ok(())
    }
}

impl NewUserInput {
    /// Shape checks only; the password length depends on a server setting
    /// and is checked against the resolved policy at submit time.
    pub fn validate(&self) -> Result<()> {
        let required = [
            (&self.first_name, "first name"),
            (&self.last_name, "last name"),
            (&self.username, "username"),
        ];
        for (value, label) in required {
            if !is_present(value) {
                bail!("{label} is required -- enter a {label} and retry");
            }
        }
        if !is_email(&self.email) {
            bail!("email {:?} is not a valid address -- use the form name@domain.tld", self.email);
        }
        if self.password.trim().is_empty() {
            bail!("password is required -- enter a password and retry");
        }
        Ok(())
    }
}

/// Builds the member-team list of the new department and new user forms.
/// Picked teams leave the available list; for departments they also become
/// candidates for the initial team.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TeamPicker {
    available: Vec<SelectOption<TeamId>>,
    picked: Vec<SelectOption<TeamId>>,
}

impl TeamPicker {
    pub fn new(teams: &[Team]) -> Self {
        Self {
            available: teams
                .iter()
                .map(|team| SelectOption {
                    value: team.id,
                    label: team.name.clone(),
                })
                .collect(),
            picked: Vec::new(),
        }
    }

    /// Moves a team into the picked list. Picking a team twice, or one that
    /// is not offered, changes nothing.
    pub fn pick(&mut self, team: TeamId) -> bool {
        let Some(index) = self.available.iter().position(|option| option.value == team) else {
            return false;
        };
        let option = self.available.remove(index);
        self.picked.push(option);
        true
    }

    pub fn remove(&mut self, team: TeamId) -> bool {
        let Some(index) = self.picked.iter().position(|option| option.value == team) else {
            return false;
        };
        let option = self.picked.remove(index);
        self.available.push(option);
        true
    }

    pub fn available(&self) -> &[SelectOption<TeamId>] {
        &self.available
    }

    pub fn picked(&self) -> &[SelectOption<TeamId>] {
        &self.picked
    }

    pub fn picked_ids(&self) -> Vec<TeamId> {
        self.picked.iter().map(|option| option.value).collect()
    }

    /// Initial-team candidates for a department are exactly the picked teams.
    pub fn initial_team_options(&self) -> &[SelectOption<TeamId>] {
        &self.picked
    }

    /// Builds the department payload; without an explicit initial team the
    /// first picked team is used.
    pub fn department_input(
        &self,
        name: &str,
        description: &str,
        initial_team_id: Option<TeamId>,
    ) -> NewDepartmentInput {
        NewDepartmentInput {
            name: name.trim().to_owned(),
            description: description.trim().to_owned(),
            initial_team_id: initial_team_id.or_else(|| self.picked.first().map(|o| o.value)),
            team_ids: self.picked_ids(),
        }
    }
}
