// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Response, Server};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Canned answer for one method and path. Routes answer every matching
/// request, not just the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub method: String,
    pub path: String,
    pub status: u16,
    pub body: String,
}

impl Route {
    pub fn new(method: &str, path: &str, status: u16, body: impl Into<String>) -> Self {
        Self {
            method: method.to_owned(),
            path: path.to_owned(),
            status,
            body: body.into(),
        }
    }

    pub fn get(path: &str, body: impl Into<String>) -> Self {
        Self::new("GET", path, 200, body)
    }

    pub fn post(path: &str, body: impl Into<String>) -> Self {
        Self::new("POST", path, 200, body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub body: String,
    pub cookie: Option<String>,
}

impl RecordedRequest {
    pub fn json(&self) -> Result<serde_json::Value> {
        serde_json::from_str(&self.body).map_err(|error| anyhow!("decode request body: {error}"))
    }
}

/// `tiny_http` server on an ephemeral localhost port. Unknown routes answer
/// 404 with a JSON error body.
pub struct MockServer {
    base_url: String,
    stop: Arc<AtomicBool>,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: Option<JoinHandle<()>>,
}

impl MockServer {
    pub fn start(routes: Vec<Route>) -> Result<Self> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let base_url = format!("http://{}", server.server_addr());
        let stop = Arc::new(AtomicBool::new(false));
        let recorded = Arc::new(Mutex::new(Vec::new()));

        let handle = {
            let stop = Arc::clone(&stop);
            let recorded = Arc::clone(&recorded);
            thread::spawn(move || serve(&server, &routes, &stop, &recorded))
        };

        Ok(Self {
            base_url,
            stop,
            recorded,
            handle: Some(handle),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.recorded
            .lock()
            .map(|recorded| recorded.clone())
            .unwrap_or_default()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve(
    server: &Server,
    routes: &[Route],
    stop: &AtomicBool,
    recorded: &Mutex<Vec<RecordedRequest>>,
) {
    while !stop.load(Ordering::SeqCst) {
        let mut request = match server.recv_timeout(POLL_INTERVAL) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(_) => break,
        };

        let mut body = String::new();
        let _ = request.as_reader().read_to_string(&mut body);
        let method = request.method().to_string();
        let url = request.url().to_owned();
        let path = url.split('?').next().unwrap_or_default().to_owned();
        let cookie = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("Cookie"))
            .map(|header| header.value.as_str().to_owned());

        if let Ok(mut recorded) = recorded.lock() {
            recorded.push(RecordedRequest {
                method: method.clone(),
                url,
                body,
                cookie,
            });
        }

        let (status, body) = routes
            .iter()
            .find(|route| route.method == method && route.path == path)
            .map(|route| (route.status, route.body.clone()))
            .unwrap_or_else(|| (404, r#"{"error":"Not found."}"#.to_owned()));

        let mut response = Response::from_string(body).with_status_code(status);
        if let Ok(header) = Header::from_bytes("Content-Type", "application/json") {
            response = response.with_header(header);
        }
        let _ = request.respond(response);
    }
}
