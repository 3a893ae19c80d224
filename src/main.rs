// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Devbox entry point.
//!
//! Loads settings, restores the audit mirror and dispatches one command
//! against the configured cluster backend.

mod cli_parser;
mod runtime_init;

use std::process::ExitCode;

use devbox_core::cli::{commands, EXIT_USAGE};

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("help");
    let rest = args.get(2..).unwrap_or(&[]);

    match command {
        "help" | "--help" | "-h" => {
            if let Some(sub) = args.get(2) {
                cli_parser::print_command_help(sub);
            } else {
                cli_parser::print_usage();
            }
            return ExitCode::SUCCESS;
        }
        "version" | "--version" | "-V" => {
            println!("devbox {}", env!("CARGO_PKG_VERSION"));
            return ExitCode::SUCCESS;
        }
        _ => {}
    }

    runtime_init::init_tracing();

    if command == "config" {
        return run_config_cmd(rest);
    }

    let settings = match runtime_init::load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return exit(EXIT_USAGE);
        }
    };
    let ctx = runtime_init::build_context(settings);

    let code = match command {
        "apply" => commands::run_apply(&ctx, rest).await,
        "delete" => commands::run_delete(&ctx, rest).await,
        "list" | "ls" => commands::run_list(&ctx, rest).await,
        "events" => commands::run_events(&ctx, rest),
        "audit" => commands::run_audit(&ctx, rest),
        "alerts" => commands::run_alerts(&ctx, rest).await,
        _ => {
            eprintln!("Unknown command: {}", command);
            cli_parser::print_usage();
            EXIT_USAGE
        }
    };
    exit(code)
}

fn run_config_cmd(rest: &[String]) -> ExitCode {
    let sub = rest.first().map(|s| s.as_str()).unwrap_or("show");
    match sub {
        "show" => match runtime_init::load_settings() {
            Ok(settings) => exit(commands::run_config_show(&settings)),
            Err(e) => {
                eprintln!("Configuration error: {}", e);
                exit(EXIT_USAGE)
            }
        },
        "defaults" => exit(commands::run_config_defaults()),
        "validate" => exit(commands::run_config_validate(runtime_init::config_path().as_deref())),
        _ => {
            eprintln!("Unknown config subcommand: {}", sub);
            cli_parser::print_command_help("config");
            exit(EXIT_USAGE)
        }
    }
}

fn exit(code: i32) -> ExitCode {
    ExitCode::from(code as u8)
}
