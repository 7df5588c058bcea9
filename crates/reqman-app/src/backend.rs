// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{
    AddUpdateInput, AuthOutcome, Department, DepartmentId, EditRequestInput, FetchResult,
    NewDepartmentInput, NewRequestInput, NewTeamInput, NewUserInput, Request, RequestId,
    RequestType, RequestUpdate, Setting, Team, TeamId, User,
};

/// One call per API resource. Implementations issue exactly one round trip
/// per method and never retry.
pub trait Backend {
    fn list_departments(&mut self) -> FetchResult<Vec<Department>>;
    fn get_department(&mut self, id: DepartmentId) -> FetchResult<Department>;
    /// Department list offered on the new request form.
    fn list_request_departments(&mut self) -> FetchResult<Vec<Department>>;
    fn list_teams(&mut self) -> FetchResult<Vec<Team>>;
    fn get_team(&mut self, id: TeamId) -> FetchResult<Team>;
    fn list_users_in_team(&mut self, team: TeamId) -> FetchResult<Vec<User>>;
    fn list_request_types(&mut self) -> FetchResult<Vec<RequestType>>;
    fn get_request(&mut self, id: RequestId) -> FetchResult<Request>;
    fn list_request_updates(&mut self, request: RequestId) -> FetchResult<Vec<RequestUpdate>>;
    fn list_unassigned_requests(&mut self) -> FetchResult<Vec<Request>>;
    fn list_own_requests(&mut self) -> FetchResult<Vec<Request>>;
    fn current_user(&mut self) -> FetchResult<User>;
    fn create_request(&mut self, input: &NewRequestInput) -> FetchResult<()>;
    fn add_request_update(&mut self, input: &AddUpdateInput) -> FetchResult<()>;
    fn edit_request(&mut self, input: &EditRequestInput) -> FetchResult<()>;
    fn resolve_request(&mut self, id: RequestId) -> FetchResult<()>;
    fn create_department(&mut self, input: &NewDepartmentInput) -> FetchResult<()>;
    fn create_team(&mut self, input: &NewTeamInput) -> FetchResult<()>;
    fn create_user(&mut self, input: &NewUserInput) -> FetchResult<()>;
    /// A rejected sign-in is an [`AuthOutcome::Rejected`], not an error.
    fn authenticate(&mut self, username: &str, password: &str) -> FetchResult<AuthOutcome>;
    fn get_setting(&mut self, name: &str) -> FetchResult<Setting>;
}
