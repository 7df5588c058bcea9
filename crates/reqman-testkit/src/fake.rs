// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;

use reqman_app::{
    AddUpdateInput, Assignee, AuthOutcome, Backend, Department, DepartmentId, EditRequestInput,
    FetchError, FetchResult, NewDepartmentInput, NewRequestInput, NewTeamInput, NewUserInput,
    Priority, Request, RequestId, RequestStatus, RequestType, RequestUpdate, Setting, SettingKey,
    Team, TeamId, UpdateId, User, UserId,
};
use time::Duration;

use crate::{
    OrgFixture, PASSWORD_MIN_LENGTH, ROOT_PASSWORD, ROOT_USERNAME, fixture_datetime, fixture_org,
};

/// One backend method, as recorded by [`FakeBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Call {
    ListDepartments,
    GetDepartment(DepartmentId),
    ListRequestDepartments,
    ListTeams,
    GetTeam(TeamId),
    ListUsersInTeam(TeamId),
    ListRequestTypes,
    GetRequest(RequestId),
    ListRequestUpdates(RequestId),
    ListUnassignedRequests,
    ListOwnRequests,
    CurrentUser,
    CreateRequest,
    AddRequestUpdate(RequestId),
    EditRequest(RequestId),
    ResolveRequest(RequestId),
    CreateDepartment,
    CreateTeam,
    CreateUser,
    Authenticate,
    GetSetting,
}

/// In-memory backend over an [`OrgFixture`]. Writes mutate the fixture the
/// way the server would; failures can be injected per call.
#[derive(Debug, Clone)]
pub struct FakeBackend {
    pub org: OrgFixture,
    pub settings: BTreeMap<String, String>,
    signed_in: Option<UserId>,
    failures: BTreeMap<Call, FetchError>,
    calls: Vec<Call>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    /// Fixture data with `root` signed in.
    pub fn new() -> Self {
        Self::with_org(fixture_org())
    }

    pub fn with_org(org: OrgFixture) -> Self {
        let settings = BTreeMap::from([(
            SettingKey::UserPasswordMinLength.as_str().to_owned(),
            PASSWORD_MIN_LENGTH.to_string(),
        )]);
        Self {
            org,
            settings,
            signed_in: Some(UserId::new(1)),
            failures: BTreeMap::new(),
            calls: Vec::new(),
        }
    }

    pub fn signed_out(mut self) -> Self {
        self.signed_in = None;
        self
    }

    pub fn fail(&mut self, call: Call, error: FetchError) {
        self.failures.insert(call, error);
    }

    pub fn recover(&mut self, call: Call) {
        self.failures.remove(&call);
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls.iter().filter(|recorded| **recorded == call).count()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn request(&self, id: RequestId) -> Option<&Request> {
        self.org.requests.iter().find(|request| request.id == id)
    }

    fn record(&mut self, call: Call) -> FetchResult<()> {
        self.calls.push(call);
        match self.failures.get(&call) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn signed_in_user(&self, endpoint: &str) -> FetchResult<&User> {
        self.signed_in
            .and_then(|id| self.org.users.iter().find(|user| user.id == id))
            .ok_or_else(|| FetchError::HttpError {
                endpoint: endpoint.to_owned(),
                status: 401,
                message: Some("Authentication required".to_owned()),
            })
    }

    fn request_mut(&mut self, id: RequestId, endpoint: &str) -> FetchResult<&mut Request> {
        self.org
            .requests
            .iter_mut()
            .find(|request| request.id == id)
            .ok_or_else(|| not_found(endpoint))
    }
}

fn not_found(endpoint: &str) -> FetchError {
    FetchError::HttpError {
        endpoint: endpoint.to_owned(),
        status: 404,
        message: Some("Not found.".to_owned()),
    }
}

impl Backend for FakeBackend {
    fn list_departments(&mut self) -> FetchResult<Vec<Department>> {
        self.record(Call::ListDepartments)?;
        Ok(self.org.departments.clone())
    }

    fn get_department(&mut self, id: DepartmentId) -> FetchResult<Department> {
        self.record(Call::GetDepartment(id))?;
        self.org
            .departments
            .iter()
            .find(|department| department.id == id)
            .cloned()
            .ok_or_else(|| not_found(&format!("/api/departments/{id}")))
    }

    fn list_request_departments(&mut self) -> FetchResult<Vec<Department>> {
        self.record(Call::ListRequestDepartments)?;
        Ok(self.org.departments.clone())
    }

    fn list_teams(&mut self) -> FetchResult<Vec<Team>> {
        self.record(Call::ListTeams)?;
        Ok(self.org.teams.clone())
    }

    fn get_team(&mut self, id: TeamId) -> FetchResult<Team> {
        self.record(Call::GetTeam(id))?;
        self.org
            .teams
            .iter()
            .find(|team| team.id == id)
            .cloned()
            .ok_or_else(|| not_found(&format!("/api/teams/{id}")))
    }

    fn list_users_in_team(&mut self, team: TeamId) -> FetchResult<Vec<User>> {
        self.record(Call::ListUsersInTeam(team))?;
        Ok(self
            .org
            .users
            .iter()
            .filter(|user| user.is_member_of(team))
            .cloned()
            .collect())
    }

    fn list_request_types(&mut self) -> FetchResult<Vec<RequestType>> {
        self.record(Call::ListRequestTypes)?;
        Ok(self.org.request_types.clone())
    }

    fn get_request(&mut self, id: RequestId) -> FetchResult<Request> {
        self.record(Call::GetRequest(id))?;
        self.request(id)
            .cloned()
            .ok_or_else(|| not_found(&format!("/api/requests/{id}")))
    }

    fn list_request_updates(&mut self, request: RequestId) -> FetchResult<Vec<RequestUpdate>> {
        self.record(Call::ListRequestUpdates(request))?;
        Ok(self
            .org
            .updates
            .iter()
            .filter(|update| update.request_id == request)
            .cloned()
            .collect())
    }

    fn list_unassigned_requests(&mut self) -> FetchResult<Vec<Request>> {
        self.record(Call::ListUnassignedRequests)?;
        Ok(self
            .org
            .requests
            .iter()
            .filter(|request| {
                request.assignee == Assignee::Unassigned && request.status == RequestStatus::Open
            })
            .cloned()
            .collect())
    }

    fn list_own_requests(&mut self) -> FetchResult<Vec<Request>> {
        self.record(Call::ListOwnRequests)?;
        let me = self.signed_in_user("/api/requests/user/self")?.id;
        Ok(self
            .org
            .requests
            .iter()
            .filter(|request| request.requester == Some(me))
            .cloned()
            .collect())
    }

    fn current_user(&mut self) -> FetchResult<User> {
        self.record(Call::CurrentUser)?;
        self.signed_in_user("/api/users/self").cloned()
    }

    fn create_request(&mut self, input: &NewRequestInput) -> FetchResult<()> {
        self.record(Call::CreateRequest)?;
        let requester = self.signed_in_user("/api/requests/new")?.id;
        let next = self
            .org
            .requests
            .iter()
            .map(|request| request.id.get())
            .max()
            .unwrap_or(0)
            + 1;
        self.org.requests.push(Request {
            id: RequestId::new(next),
            requester: Some(requester),
            created_at: fixture_datetime() + Duration::minutes(next),
            priority: Priority::P4,
            is_outage: false,
            title: input.title.trim().to_owned(),
            description: input.description.trim().to_owned(),
            department_id: input.department_id,
            team_id: None,
            assignee: Assignee::Unassigned,
            type_id: input.type_id,
            status: RequestStatus::Open,
        });
        Ok(())
    }

    fn add_request_update(&mut self, input: &AddUpdateInput) -> FetchResult<()> {
        self.record(Call::AddRequestUpdate(input.request_id))?;
        let endpoint = format!("/api/requests/{}/updates/new", input.request_id);
        let author = self.signed_in_user(&endpoint)?.username.clone();
        if self.request(input.request_id).is_none() {
            return Err(not_found(&endpoint));
        }
        let next = self
            .org
            .updates
            .iter()
            .map(|update| update.id.get())
            .max()
            .unwrap_or(0)
            + 1;
        self.org.updates.push(RequestUpdate {
            id: UpdateId::new(next),
            request_id: input.request_id,
            author_name: author,
            created_at: fixture_datetime() + Duration::minutes(next),
            content: input.content.trim().to_owned(),
        });
        Ok(())
    }

    fn edit_request(&mut self, input: &EditRequestInput) -> FetchResult<()> {
        self.record(Call::EditRequest(input.request_id))?;
        let endpoint = format!("/api/requests/{}/edit", input.request_id);
        let request = self.request_mut(input.request_id, &endpoint)?;
        request.title = input.title.trim().to_owned();
        request.description = input.description.trim().to_owned();
        request.department_id = input.department_id;
        request.team_id = input.team_id;
        request.assignee = input.assignee;
        request.type_id = input.type_id;
        Ok(())
    }

    fn resolve_request(&mut self, id: RequestId) -> FetchResult<()> {
        self.record(Call::ResolveRequest(id))?;
        let endpoint = format!("/api/requests/{id}/resolve");
        self.request_mut(id, &endpoint)?.status = RequestStatus::Resolved;
        Ok(())
    }

    fn create_department(&mut self, input: &NewDepartmentInput) -> FetchResult<()> {
        self.record(Call::CreateDepartment)?;
        let next = self
            .org
            .departments
            .iter()
            .map(|department| department.id.get())
            .max()
            .unwrap_or(0)
            + 1;
        self.org.departments.push(Department {
            id: DepartmentId::new(next),
            name: input.name.trim().to_owned(),
            description: input.description.trim().to_owned(),
            member_team_ids: input.team_ids.iter().copied().collect(),
            initial_team_id: input.initial_team_id,
        });
        Ok(())
    }

    fn create_team(&mut self, input: &NewTeamInput) -> FetchResult<()> {
        self.record(Call::CreateTeam)?;
        let next = self
            .org
            .teams
            .iter()
            .map(|team| team.id.get())
            .max()
            .unwrap_or(0)
            + 1;
        self.org.teams.push(Team {
            id: TeamId::new(next),
            name: input.name.trim().to_owned(),
            description: input.description.trim().to_owned(),
            department_id: None,
        });
        Ok(())
    }

    fn create_user(&mut self, input: &NewUserInput) -> FetchResult<()> {
        self.record(Call::CreateUser)?;
        let username = input.username.trim();
        if self.org.users.iter().any(|user| user.username == username) {
            return Err(FetchError::HttpError {
                endpoint: "/api/users/new".to_owned(),
                status: 400,
                message: Some("User already exists".to_owned()),
            });
        }
        let next = self
            .org
            .users
            .iter()
            .map(|user| user.id.get())
            .max()
            .unwrap_or(0)
            + 1;
        self.org.users.push(User {
            id: UserId::new(next),
            first_name: input.first_name.trim().to_owned(),
            last_name: input.last_name.trim().to_owned(),
            username: username.to_owned(),
            team_ids: input.team_ids.iter().copied().collect(),
        });
        Ok(())
    }

    fn authenticate(&mut self, username: &str, password: &str) -> FetchResult<AuthOutcome> {
        self.record(Call::Authenticate)?;
        if username == ROOT_USERNAME && password == ROOT_PASSWORD {
            self.signed_in = Some(UserId::new(1));
            return Ok(AuthOutcome::Token(format!("token-{username}")));
        }
        Ok(AuthOutcome::Rejected("Invalid username or password.".to_owned()))
    }

    fn get_setting(&mut self, name: &str) -> FetchResult<Setting> {
        self.record(Call::GetSetting)?;
        self.settings
            .get(name)
            .map(|value| Setting {
                name: name.to_owned(),
                value: value.clone(),
            })
            .ok_or_else(|| not_found(&format!("/api/settings/{name}")))
    }
}
