// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Token pair the server expects back as the `auth_token` and `user`
/// cookies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub auth_token: String,
    pub user: String,
}

impl Session {
    pub fn cookie_header(&self) -> String {
        format!("auth_token={}; user={}", self.auth_token, self.user)
    }

    /// Reads a saved session. A missing file means "signed out".
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("read session file {}", path.display()));
            }
        };
        let session = serde_json::from_str(&raw).with_context(|| {
            format!(
                "parse session file {} -- run `reqman logout` and sign in again",
                path.display()
            )
        })?;
        Ok(Some(session))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create session directory {}", parent.display()))?;
        }
        let encoded = serde_json::to_string_pretty(self).context("encode session")?;
        fs::write(path, encoded)
            .with_context(|| format!("write session file {}", path.display()))?;
        Ok(())
    }

    /// Deletes a saved session; returns whether one existed.
    pub fn remove(path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(false),
            Err(error) => {
                Err(error).with_context(|| format!("remove session file {}", path.display()))
            }
        }
    }
}
