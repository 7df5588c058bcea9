// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

pub const STATUS_FORBIDDEN: u16 = 403;

/// Uniform failure signal for every API call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("cannot reach {endpoint}: {reason}")]
    NetworkFailure { endpoint: String, reason: String },

    #[error("{endpoint} returned HTTP {status}{}", detail_suffix(.message))]
    HttpError {
        endpoint: String,
        status: u16,
        message: Option<String>,
    },

    #[error("unexpected response from {endpoint}: {reason}")]
    DecodeFailure { endpoint: String, reason: String },

    #[error("{endpoint} rejected the change: {message}")]
    Rejected { endpoint: String, message: String },
}

fn detail_suffix(message: &Option<String>) -> String {
    match message {
        Some(message) if !message.is_empty() => format!(": {message}"),
        _ => String::new(),
    }
}

impl FetchError {
    pub fn endpoint(&self) -> &str {
        match self {
            Self::NetworkFailure { endpoint, .. }
            | Self::HttpError { endpoint, .. }
            | Self::DecodeFailure { endpoint, .. }
            | Self::Rejected { endpoint, .. } => endpoint,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        self.status() == Some(STATUS_FORBIDDEN)
    }
}

pub type FetchResult<T> = Result<T, FetchError>;
