// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use reqman_app::{Assignee, DepartmentId, RequestId, RequestTypeId, TeamId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { username: String },
    Logout,
    WhoAmI,
    Mine,
    Unassigned,
    Show(RequestId),
    NewRequest(NewRequestArgs),
    Edit(EditArgs),
    Update { request_id: RequestId, content: String },
    Resolve(RequestId),
    Departments,
    Teams,
    NewTeam { name: String, description: String },
    NewDepartment(NewDepartmentArgs),
    NewUser(NewUserArgs),
    Check,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewRequestArgs {
    pub title: String,
    pub description: String,
    pub type_id: Option<RequestTypeId>,
    pub department_id: Option<DepartmentId>,
}

/// Only the flags that were passed change the request; an explicit `none`
/// clears a department, team or type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditArgs {
    pub request_id: RequestId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub type_id: Option<Option<RequestTypeId>>,
    pub department_id: Option<Option<DepartmentId>>,
    pub team_id: Option<Option<TeamId>>,
    pub assignee: Option<Assignee>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewDepartmentArgs {
    pub name: String,
    pub description: String,
    pub team_ids: Vec<TeamId>,
    pub initial_team_id: Option<TeamId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewUserArgs {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub team_ids: Vec<TeamId>,
}

impl Command {
    pub fn parse(name: &str, args: &[String]) -> Result<Self> {
        let mut args = Args::new(name, args);
        let command = match name {
            "login" => Self::Login {
                username: args.positional("username")?,
            },
            "logout" => Self::Logout,
            "whoami" => Self::WhoAmI,
            "mine" => Self::Mine,
            "unassigned" => Self::Unassigned,
            "show" => Self::Show(RequestId::new(args.positional_id("request id")?)),
            "new-request" => {
                let mut parsed = NewRequestArgs::default();
                while let Some(flag) = args.next_flag()? {
                    match flag.as_str() {
                        "--title" => parsed.title = args.value(&flag)?,
                        "--description" => parsed.description = args.value(&flag)?,
                        "--type" => parsed.type_id = Some(RequestTypeId::new(args.id(&flag)?)),
                        "--department" => {
                            parsed.department_id = Some(DepartmentId::new(args.id(&flag)?));
                        }
                        _ => return Err(args.unknown(&flag)),
                    }
                }
                Self::NewRequest(parsed)
            }
            "edit" => {
                let mut parsed = EditArgs {
                    request_id: RequestId::new(args.positional_id("request id")?),
                    title: None,
                    description: None,
                    type_id: None,
                    department_id: None,
                    team_id: None,
                    assignee: None,
                };
                while let Some(flag) = args.next_flag()? {
                    match flag.as_str() {
                        "--title" => parsed.title = Some(args.value(&flag)?),
                        "--description" => parsed.description = Some(args.value(&flag)?),
                        "--type" => {
                            parsed.type_id = Some(args.optional_id(&flag)?.map(RequestTypeId::new));
                        }
                        "--department" => {
                            parsed.department_id =
                                Some(args.optional_id(&flag)?.map(DepartmentId::new));
                        }
                        "--team" => {
                            parsed.team_id = Some(args.optional_id(&flag)?.map(TeamId::new));
                        }
                        "--assignee" => {
                            let raw = args.value(&flag)?;
                            let assignee = Assignee::parse(&raw).ok_or_else(|| {
                                anyhow!("--assignee expects a user id or `unassigned`, got {raw:?}")
                            })?;
                            parsed.assignee = Some(assignee);
                        }
                        _ => return Err(args.unknown(&flag)),
                    }
                }
                Self::Edit(parsed)
            }
            "update" => {
                let request_id = RequestId::new(args.positional_id("request id")?);
                let words = args.rest();
                if words.is_empty() {
                    bail!("update requires the update text, for example `reqman update 7 rebooted the switch`");
                }
                Self::Update {
                    request_id,
                    content: words.join(" "),
                }
            }
            "resolve" => Self::Resolve(RequestId::new(args.positional_id("request id")?)),
            "departments" => Self::Departments,
            "teams" => Self::Teams,
            "new-team" => {
                let mut name = String::new();
                let mut description = String::new();
                while let Some(flag) = args.next_flag()? {
                    match flag.as_str() {
                        "--name" => name = args.value(&flag)?,
                        "--description" => description = args.value(&flag)?,
                        _ => return Err(args.unknown(&flag)),
                    }
                }
                Self::NewTeam { name, description }
            }
            "new-department" => {
                let mut parsed = NewDepartmentArgs::default();
                while let Some(flag) = args.next_flag()? {
                    match flag.as_str() {
                        "--name" => parsed.name = args.value(&flag)?,
                        "--description" => parsed.description = args.value(&flag)?,
                        "--team" => parsed.team_ids.push(TeamId::new(args.id(&flag)?)),
                        "--initial-team" => {
                            parsed.initial_team_id = Some(TeamId::new(args.id(&flag)?));
                        }
                        _ => return Err(args.unknown(&flag)),
                    }
                }
                Self::NewDepartment(parsed)
            }
            "new-user" => {
                let mut parsed = NewUserArgs::default();
                while let Some(flag) = args.next_flag()? {
                    match flag.as_str() {
                        "--first-name" => parsed.first_name = args.value(&flag)?,
                        "--last-name" => parsed.last_name = args.value(&flag)?,
                        "--username" => parsed.username = args.value(&flag)?,
                        "--email" => parsed.email = args.value(&flag)?,
                        "--team" => parsed.team_ids.push(TeamId::new(args.id(&flag)?)),
                        _ => return Err(args.unknown(&flag)),
                    }
                }
                Self::NewUser(parsed)
            }
            "check" => Self::Check,
            unknown => {
                bail!("unknown command {unknown:?}; run with --help to see supported commands")
            }
        };
        args.finish()?;
        Ok(command)
    }

    /// Logout must work even when the saved session no longer parses.
    pub const fn reads_session(&self) -> bool {
        !matches!(self, Self::Logout)
    }
}

struct Args<'a> {
    command: &'a str,
    rest: std::slice::Iter<'a, String>,
}

impl<'a> Args<'a> {
    fn new(command: &'a str, args: &'a [String]) -> Self {
        Self {
            command,
            rest: args.iter(),
        }
    }

    fn positional(&mut self, what: &str) -> Result<String> {
        self.rest
            .next()
            .filter(|arg| !arg.starts_with("--"))
            .cloned()
            .ok_or_else(|| anyhow!("{} requires a {what}", self.command))
    }

    fn positional_id(&mut self, what: &str) -> Result<i64> {
        let raw = self.positional(what)?;
        parse_id(&raw).with_context(|| format!("{} {what}", self.command))
    }

    fn next_flag(&mut self) -> Result<Option<String>> {
        match self.rest.next() {
            None => Ok(None),
            Some(arg) if arg.starts_with("--") => Ok(Some(arg.clone())),
            Some(arg) => bail!(
                "unexpected argument {arg:?} for {}; values follow their flag",
                self.command
            ),
        }
    }

    fn value(&mut self, flag: &str) -> Result<String> {
        self.rest
            .next()
            .cloned()
            .ok_or_else(|| anyhow!("{flag} requires a value"))
    }

    fn id(&mut self, flag: &str) -> Result<i64> {
        let raw = self.value(flag)?;
        parse_id(&raw).with_context(|| flag.to_owned())
    }

    fn optional_id(&mut self, flag: &str) -> Result<Option<i64>> {
        let raw = self.value(flag)?;
        if raw.eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        parse_id(&raw).map(Some).with_context(|| flag.to_owned())
    }

    fn rest(&mut self) -> Vec<String> {
        self.rest.by_ref().cloned().collect()
    }

    fn unknown(&self, flag: &str) -> anyhow::Error {
        anyhow!(
            "unknown option {flag:?} for {}; run with --help to see supported options",
            self.command
        )
    }

    fn finish(mut self) -> Result<()> {
        match self.rest.next() {
            None => Ok(()),
            Some(extra) => bail!("unexpected argument {extra:?} for {}", self.command),
        }
    }
}

fn parse_id(raw: &str) -> Result<i64> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => bail!("expected a positive id, got {raw:?}"),
    }
}
