// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

use crate::{
    Assignee, Choices, Department, DepartmentId, EditRequestInput, Request, RequestId, RequestType,
    RequestTypeId, RequestUpdate, SelectionChain, SelectionChange, Team, TeamId, User,
    sort_updates, type_choices,
};

/// Identifies one `load_request` round. A ticket goes stale as soon as
/// another request is opened or the cache is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    request_id: RequestId,
    generation: u64,
}

impl LoadTicket {
    pub fn request_id(self) -> RequestId {
        self.request_id
    }
}

/// Everything fetched for one "view request" interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSnapshot {
    pub request: Request,
    pub departments: Vec<Department>,
    pub teams: Vec<Team>,
    pub request_types: Vec<RequestType>,
    /// Members of `request.team_id`, empty when the request has no team.
    pub members: Vec<User>,
    pub updates: Vec<RequestUpdate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Current,
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntityCache {
    generation: u64,
    pending: Option<LoadTicket>,
    current_request: Option<Request>,
    departments: Vec<Department>,
    teams: Vec<Team>,
    request_types: Vec<RequestType>,
    assignees_for_selected_team: Vec<User>,
    updates: Vec<RequestUpdate>,
    selection: SelectionChain,
    selected_type: Option<RequestTypeId>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_load(&mut self, request_id: RequestId) -> LoadTicket {
        self.generation += 1;
        let ticket = LoadTicket {
            request_id,
            generation: self.generation,
        };
        self.pending = Some(ticket);
        ticket
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.pending == Some(ticket)
    }

    /// Installs a snapshot and seeds the selection chain from the request's
    /// stored department, team and assignee. Superseded tickets are dropped.
    pub fn apply_snapshot(&mut self, ticket: LoadTicket, snapshot: RequestSnapshot) -> Applied {
        if !self.is_current(ticket) || snapshot.request.id != ticket.request_id {
            return Applied::Stale;
        }

        let RequestSnapshot {
            request,
            departments,
            teams,
            request_types,
            members,
            mut updates,
        } = snapshot;

        self.selection = SelectionChain::seed(
            &departments,
            &teams,
            &members,
            request.department_id,
            request.team_id,
            request.assignee,
        );
        self.assignees_for_selected_team = match self.selection.team().selected {
            Some(team) => members
                .into_iter()
                .filter(|user| user.is_member_of(team))
                .collect(),
            None => Vec::new(),
        };
        sort_updates(&mut updates);
        self.selected_type = request.type_id;
        self.updates = updates;
        self.departments = departments;
        self.teams = teams;
        self.request_types = request_types;
        self.current_request = Some(request);
        Applied::Current
    }

    pub fn clear(&mut self) {
        let generation = self.generation;
        *self = Self {
            generation,
            ..Self::default()
        };
    }

    pub fn current_request(&self) -> Option<&Request> {
        self.current_request.as_ref()
    }

    pub fn current_request_id(&self) -> Option<RequestId> {
        self.current_request.as_ref().map(|request| request.id)
    }

    pub fn departments(&self) -> &[Department] {
        &self.departments
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn request_types(&self) -> &[RequestType] {
        &self.request_types
    }

    pub fn assignees_for_selected_team(&self) -> &[User] {
        &self.assignees_for_selected_team
    }

    pub fn updates(&self) -> &[RequestUpdate] {
        &self.updates
    }

    pub fn selection(&self) -> &SelectionChain {
        &self.selection
    }

    pub fn type_choices(&self) -> Choices<RequestTypeId> {
        type_choices(&self.request_types, self.selected_type)
    }

    /// Edit payload reflecting the stored text fields and the current
    /// selections.
    pub fn edit_input(&self) -> Option<EditRequestInput> {
        let request = self.current_request.as_ref()?;
        Some(EditRequestInput {
            request_id: request.id,
            title: request.title.clone(),
            description: request.description.clone(),
            department_id: self.selection.department().selected,
            team_id: self.selection.team().selected,
            assignee: self.selection.selected_assignee(),
            type_id: self.selected_type,
        })
    }

    pub fn change_department(
        &mut self,
        department: Option<DepartmentId>,
    ) -> Result<SelectionChange> {
        self.ensure_loaded()?;
        if let Some(id) = department
            && !self.departments.iter().any(|d| d.id == id)
        {
            bail!("department {id} is not one of the loaded departments");
        }
        let change = self
            .selection
            .select_department(&self.departments, &self.teams, department);
        if change.assignees {
            self.assignees_for_selected_team.clear();
        }
        Ok(change)
    }

    pub fn change_team(&mut self, team: Option<TeamId>) -> Result<SelectionChange> {
        self.ensure_loaded()?;
        if let Some(id) = team
            && !self.selection.team().contains(id)
        {
            bail!("team {id} does not belong to the selected department");
        }
        let change = self.selection.select_team(team);
        if change.assignees {
            self.assignees_for_selected_team.clear();
        }
        Ok(change)
    }

    /// Installs the member list fetched for `team`; dropped when the team
    /// selection has moved on in the meantime.
    pub fn apply_team_members(&mut self, team: TeamId, members: Vec<User>) -> Applied {
        if !self.selection.apply_members(team, &members) {
            return Applied::Stale;
        }
        self.assignees_for_selected_team = members
            .into_iter()
            .filter(|user| user.is_member_of(team))
            .collect();
        Applied::Current
    }

    pub fn change_assignee(&mut self, assignee: Assignee) -> Result<()> {
        self.ensure_loaded()?;
        if !self.selection.select_assignee(assignee) {
            bail!("assignee is not a member of the selected team");
        }
        Ok(())
    }

    pub fn change_type(&mut self, type_id: Option<RequestTypeId>) -> Result<()> {
        self.ensure_loaded()?;
        if let Some(id) = type_id
            && !self.request_types.iter().any(|t| t.id == id)
        {
            bail!("request type {id} is not one of the loaded types");
        }
        self.selected_type = type_id;
        Ok(())
    }

    pub fn set_updates(
        &mut self,
        request_id: RequestId,
        mut updates: Vec<RequestUpdate>,
    ) -> Applied {
        if self.current_request_id() != Some(request_id) {
            return Applied::Stale;
        }
        sort_updates(&mut updates);
        self.updates = updates;
        Applied::Current
    }

    fn ensure_loaded(&self) -> Result<()> {
        if self.current_request.is_none() {
            bail!("no request is open -- open a request before editing it");
        }
        Ok(())
    }
}
