// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod session;
pub mod wire;

pub use session::Session;

use anyhow::{Context, Result, bail};
use reqman_app::{
    AddUpdateInput, AuthOutcome, Backend, Department, DepartmentId, EditRequestInput, FetchError,
    FetchResult, NewDepartmentInput, NewRequestInput, NewTeamInput, NewUserInput, Request,
    RequestId, RequestType, RequestUpdate, Setting, Team, TeamId, User,
};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use reqwest::header::COOKIE;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Blocking client for the RequestManager JSON API. Every method issues a
/// single HTTP call; nothing is retried.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
    session: Option<Session>,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            bail!("server.base_url must not be empty");
        }
        let parsed = Url::parse(trimmed)
            .with_context(|| format!("server.base_url {trimmed:?} is not a valid URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "server.base_url must use http or https, got {:?}",
                parsed.scheme()
            );
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url: trimmed.to_owned(),
            timeout,
            http,
            session: None,
        })
    }

    pub fn with_session(mut self, session: Option<Session>) -> Self {
        self.session = session;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn with_cookies(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.session {
            Some(session) => builder.header(COOKIE, session.cookie_header()),
            None => builder,
        }
    }

    fn get(&self, path: &str) -> FetchResult<Value> {
        debug!(method = "GET", endpoint = path, "api call");
        let builder = self.with_cookies(self.http.get(self.url(path)));
        self.send(path, builder)
    }

    fn post(&self, path: &str, body: &Value) -> FetchResult<Value> {
        debug!(method = "POST", endpoint = path, "api call");
        let builder = self.with_cookies(self.http.post(self.url(path)).json(body));
        self.send(path, builder)
    }

    /// Posts a write and checks the `{success}`/`{error}` acknowledgement.
    fn write(&self, path: &str, body: &Value) -> FetchResult<()> {
        let answer = self.post(path, body)?;
        acknowledgement(path, &answer)
    }

    fn send(&self, endpoint: &str, builder: RequestBuilder) -> FetchResult<Value> {
        let response = builder
            .send()
            .map_err(|error| connection_error(endpoint, self.timeout, &error))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|error| connection_error(endpoint, self.timeout, &error))?;
        if !status.is_success() {
            return Err(http_error(endpoint, status, &body));
        }
        serde_json::from_str(&body).map_err(|error| FetchError::DecodeFailure {
            endpoint: endpoint.to_owned(),
            reason: format!("invalid JSON: {error}"),
        })
    }

    fn list<T>(&self, path: &str, decode: impl Fn(&Value) -> Result<T>) -> FetchResult<Vec<T>> {
        let answer = self.get(path)?;
        let rows = wire::rows(&answer).map_err(|error| decode_failure(path, &error))?;
        rows.iter()
            .enumerate()
            .map(|(index, row)| {
                decode(row)
                    .with_context(|| format!("row {index}"))
                    .map_err(|error| decode_failure(path, &error))
            })
            .collect()
    }

    fn one<T>(&self, path: &str, decode: impl Fn(&Value) -> Result<T>) -> FetchResult<T> {
        let answer = self.get(path)?;
        decode(wire::single_row(&answer)).map_err(|error| decode_failure(path, &error))
    }
}

fn decode_failure(endpoint: &str, error: &anyhow::Error) -> FetchError {
    FetchError::DecodeFailure {
        endpoint: endpoint.to_owned(),
        reason: format!("{error:#}"),
    }
}

fn connection_error(endpoint: &str, timeout: Duration, error: &reqwest::Error) -> FetchError {
    let reason = if error.is_timeout() {
        format!("no answer within {}ms -- check that the server is running", timeout.as_millis())
    } else {
        format!("{error} -- check server.base_url and that the server is running")
    };
    FetchError::NetworkFailure {
        endpoint: endpoint.to_owned(),
        reason,
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
    message: Option<String>,
}

fn http_error(endpoint: &str, status: StatusCode, body: &str) -> FetchError {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope
            .error
            .or(envelope.message)
            .filter(|message| !message.trim().is_empty()),
        Err(_) if body.len() < 100 && !body.contains('<') && !body.trim().is_empty() => {
            Some(body.trim().to_owned())
        }
        Err(_) => None,
    };
    FetchError::HttpError {
        endpoint: endpoint.to_owned(),
        status: status.as_u16(),
        message,
    }
}

fn acknowledgement(endpoint: &str, answer: &Value) -> FetchResult<()> {
    let rejected = |message: &str| FetchError::Rejected {
        endpoint: endpoint.to_owned(),
        message: message.to_owned(),
    };
    if let Some(error) = answer.get("error").and_then(Value::as_str) {
        return Err(rejected(error));
    }
    if answer.get("success") == Some(&Value::Bool(false)) {
        let message = answer
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("the server did not accept the change");
        return Err(rejected(message));
    }
    Ok(())
}

fn id_or_null<T: Into<i64>>(id: Option<T>) -> Value {
    id.map_or(Value::Null, |id| Value::from(id.into()))
}

impl Backend for Client {
    fn list_departments(&mut self) -> FetchResult<Vec<Department>> {
        self.list("/api/departments", wire::department)
    }

    fn get_department(&mut self, id: DepartmentId) -> FetchResult<Department> {
        self.one(&format!("/api/departments/{id}"), wire::department)
    }

    fn list_request_departments(&mut self) -> FetchResult<Vec<Department>> {
        self.list("/api/requests/departments", wire::department)
    }

    fn list_teams(&mut self) -> FetchResult<Vec<Team>> {
        self.list("/api/teams", wire::team)
    }

    fn get_team(&mut self, id: TeamId) -> FetchResult<Team> {
        self.one(&format!("/api/teams/{id}"), wire::team)
    }

    fn list_users_in_team(&mut self, team: TeamId) -> FetchResult<Vec<User>> {
        self.list(&format!("/api/teams/{team}/users"), |row| {
            wire::user(row, Some(team))
        })
    }

    fn list_request_types(&mut self) -> FetchResult<Vec<RequestType>> {
        self.list("/api/requests/types", wire::request_type)
    }

    fn get_request(&mut self, id: RequestId) -> FetchResult<Request> {
        self.one(&format!("/api/requests/{id}"), wire::request)
    }

    fn list_request_updates(&mut self, request: RequestId) -> FetchResult<Vec<RequestUpdate>> {
        self.list(&format!("/api/requests/{request}/updates"), wire::update)
    }

    fn list_unassigned_requests(&mut self) -> FetchResult<Vec<Request>> {
        self.list("/api/requests/unassigned", wire::request)
    }

    fn list_own_requests(&mut self) -> FetchResult<Vec<Request>> {
        self.list("/api/requests/user/self", wire::request)
    }

    fn current_user(&mut self) -> FetchResult<User> {
        self.one("/api/users/self", |row| wire::user(row, None))
    }

    fn create_request(&mut self, input: &NewRequestInput) -> FetchResult<()> {
        let body = json!({
            "request-title": input.title.trim(),
            "request-description": input.description.trim(),
            "request-type": id_or_null(input.type_id.map(|id| id.get())),
            "request-department": id_or_null(input.department_id.map(|id| id.get())),
        });
        self.write("/api/requests/new", &body)
    }

    fn add_request_update(&mut self, input: &AddUpdateInput) -> FetchResult<()> {
        let body = json!({ "update-content": input.content.trim() });
        self.write(
            &format!("/api/requests/{}/updates/new", input.request_id),
            &body,
        )
    }

    fn edit_request(&mut self, input: &EditRequestInput) -> FetchResult<()> {
        let body = json!({
            "request-title": input.title.trim(),
            "request-description": input.description.trim(),
            "request-department": id_or_null(input.department_id.map(|id| id.get())),
            "request-team": id_or_null(input.team_id.map(|id| id.get())),
            "request-assignee": id_or_null(input.assignee.to_wire()),
            "request-type": id_or_null(input.type_id.map(|id| id.get())),
        });
        self.write(&format!("/api/requests/{}/edit", input.request_id), &body)
    }

    fn resolve_request(&mut self, id: RequestId) -> FetchResult<()> {
        self.write(&format!("/api/requests/{id}/resolve"), &json!({}))
    }

    fn create_department(&mut self, input: &NewDepartmentInput) -> FetchResult<()> {
        let teams: Vec<i64> = input.team_ids.iter().map(|team| team.get()).collect();
        let body = json!({
            "name": input.name.trim(),
            "description": input.description.trim(),
            "initial_team": id_or_null(input.initial_team_id.map(|id| id.get())),
            "teams": teams,
        });
        self.write("/api/departments/new", &body)
    }

    fn create_team(&mut self, input: &NewTeamInput) -> FetchResult<()> {
        let body = json!({
            "name": input.name.trim(),
            "description": input.description.trim(),
        });
        self.write("/api/teams/new", &body)
    }

    fn create_user(&mut self, input: &NewUserInput) -> FetchResult<()> {
        let teams: Vec<i64> = input.team_ids.iter().map(|team| team.get()).collect();
        let body = json!({
            "firstname": input.first_name.trim(),
            "lastname": input.last_name.trim(),
            "username": input.username.trim(),
            "email": input.email.trim(),
            "password": input.password,
            "teams": teams,
        });
        self.write("/api/users/new", &body)
    }

    fn authenticate(&mut self, username: &str, password: &str) -> FetchResult<AuthOutcome> {
        let endpoint = "/api/authenticate";
        let answer = self.post(
            endpoint,
            &json!({ "username": username, "password": password }),
        );
        let answer = match answer {
            Ok(answer) => answer,
            Err(FetchError::HttpError {
                message: Some(message),
                ..
            }) => return Ok(AuthOutcome::Rejected(message)),
            Err(error) => return Err(error),
        };

        match answer.get("token").and_then(Value::as_str) {
            Some(token) if !token.is_empty() => {
                let user = answer
                    .get("user")
                    .and_then(Value::as_str)
                    .unwrap_or(username)
                    .to_owned();
                info!(user = %user, "authenticated");
                self.session = Some(Session {
                    auth_token: token.to_owned(),
                    user,
                });
                Ok(AuthOutcome::Token(token.to_owned()))
            }
            _ => {
                let message = answer
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("username or password incorrect")
                    .to_owned();
                Ok(AuthOutcome::Rejected(message))
            }
        }
    }

    fn get_setting(&mut self, name: &str) -> FetchResult<Setting> {
        let path = format!("/api/settings/{name}");
        let answer = self.get(&path)?;
        wire::setting(&answer).map_err(|error| decode_failure(&path, &error))
    }
}

#[cfg(test)]
mod tests {
    use super::{Client, acknowledgement, http_error, id_or_null};
    use reqman_app::FetchError;
    use reqwest::StatusCode;
    use serde_json::{Value, json};
    use std::time::Duration;

    #[test]
    fn base_url_must_be_absolute_http() {
        for bad in ["", "   ", "localhost:5000", "ftp://example.com"] {
            assert!(
                Client::new(bad, Duration::from_secs(1)).is_err(),
                "{bad:?} should be rejected"
            );
        }
        let client = Client::new("http://127.0.0.1:5000/", Duration::from_secs(1))
            .expect("valid base url");
        assert_eq!(client.base_url(), "http://127.0.0.1:5000");
        assert!(client.session().is_none());
    }

    #[test]
    fn http_error_prefers_server_message() {
        let error = http_error(
            "/api/requests/unassigned",
            StatusCode::FORBIDDEN,
            r#"{"error":"Permission denied."}"#,
        );
        assert_eq!(
            error,
            FetchError::HttpError {
                endpoint: "/api/requests/unassigned".to_owned(),
                status: 403,
                message: Some("Permission denied.".to_owned()),
            }
        );

        let html = http_error("/x", StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(html.status(), Some(502));
        assert!(matches!(html, FetchError::HttpError { message: None, .. }));
    }

    #[test]
    fn acknowledgement_detects_rejections() {
        assert!(acknowledgement("/w", &json!({"success": "Team added."})).is_ok());
        assert!(acknowledgement("/w", &json!({"success": true})).is_ok());

        let failed = acknowledgement("/w", &json!({"success": false, "message": "duplicate"}))
            .expect_err("success false should be rejected");
        assert!(matches!(
            failed,
            FetchError::Rejected { ref message, .. } if message == "duplicate"
        ));

        let error = acknowledgement("/w", &json!({"error": "Adding department failed."}))
            .expect_err("error key should be rejected");
        assert!(error.to_string().contains("Adding department failed."));
    }

    #[test]
    fn missing_ids_serialize_as_null() {
        assert_eq!(id_or_null::<i64>(None), Value::Null);
        assert_eq!(id_or_null(Some(5_i64)), json!(5));
    }
}
