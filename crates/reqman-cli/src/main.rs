// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod command;
mod config;
mod render;
mod runtime;

use anyhow::{Context, Result, anyhow};
use command::Command;
use config::Config;
use render::Style;
use reqman_api::{Client, Session};
use runtime::Runtime;
use std::env;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `reqman --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;
    setup_logging(options.verbose, config.log_filter());

    let Some(command) = options.command else {
        print_help();
        return Ok(());
    };

    let session_path = config.session_path()?;
    let session = if command.reads_session() {
        Session::load(&session_path)?
    } else {
        None
    };
    let client = Client::new(config.base_url(), config.timeout()?)
        .with_context(|| {
            format!(
                "invalid [server] config in {}; fix base_url/timeout values",
                options.config_path.display()
            )
        })?
        .with_session(session);

    if command == Command::Check {
        println!("config: {}", options.config_path.display());
        println!("server: {} (timeout {:?})", client.base_url(), client.timeout());
    }

    let style = Style {
        color: io::stdout().is_terminal() && env::var_os("NO_COLOR").is_none(),
    };
    let mut runtime =
        Runtime::new(client, session_path, style).with_password(env::var("REQMAN_PASSWORD").ok());
    let stdout = io::stdout();
    let mut out = stdout.lock();
    runtime.execute(command, &mut out)
}

/// `RUST_LOG` wins over the config filter; `--verbose` wins over both.
fn setup_logging(verbose: bool, configured: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(configured))
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_thread_ids(false),
        )
        .with(filter)
        .init();
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    verbose: bool,
    print_config_path: bool,
    print_example: bool,
    show_help: bool,
    command: Option<Command>,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        verbose: false,
        print_config_path: false,
        print_example: false,
        show_help: false,
        command: None,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--verbose" | "-v" => {
                options.verbose = true;
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            flag if flag.starts_with('-') => {
                return Err(anyhow!(
                    "unknown argument {flag:?}; run with --help to see supported options"
                ));
            }
            name => {
                let rest: Vec<String> = iter.map(|arg| arg.as_ref().to_owned()).collect();
                options.command = Some(Command::parse(name, &rest)?);
                break;
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("reqman: RequestManager dashboard client");
    println!();
    println!("usage: reqman [options] <command> [args]");
    println!();
    println!("options:");
    println!("  --config <path>          Use a specific config path");
    println!("  --verbose, -v            Log at debug level");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --help                   Show this help");
    println!();
    println!("commands:");
    println!("  login <username>         Sign in (password from REQMAN_PASSWORD or stdin)");
    println!("  logout                   Forget the saved session");
    println!("  whoami                   Show the signed-in user");
    println!("  mine                     List your requests, newest first");
    println!("  unassigned               List unassigned requests");
    println!("  show <id>                Show a request with its selects and updates");
    println!("  new-request --title <t> --description <d> [--type <id>] [--department <id>]");
    println!("  edit <id> [--title <t>] [--description <d>] [--department <id|none>]");
    println!("            [--team <id|none>] [--assignee <id|unassigned>] [--type <id|none>]");
    println!("  update <id> <text...>    Add an update to a request");
    println!("  resolve <id>             Mark a request resolved");
    println!("  departments              List departments and their teams");
    println!("  teams                    List teams");
    println!("  new-team --name <n> [--description <d>]");
    println!("  new-department --name <n> [--description <d>] --team <id>... [--initial-team <id>]");
    println!("  new-user --first-name <f> --last-name <l> --username <u> --email <e> [--team <id>...]");
    println!("  check                    Validate config and saved session, then exit");
}
