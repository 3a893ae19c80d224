// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Help text for the devbox binary.

/// Print general usage information.
pub fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "devbox - ephemeral per-team developer environments v{}

USAGE:
    devbox <COMMAND> [OPTIONS]

COMMANDS:
    apply        Create or update an environment from a JSON spec
    delete       Delete an environment's workload, service and autoscaler
    list         List environments with live status and usage
    events       Show the most recent audit events
    audit        Query the persisted audit trail
    alerts       Handle an alert batch (idle scale-down)
    config       Manage configuration (show, defaults, validate)
    version      Show version information
    help         Show this help message

OPTIONS:
    -h, --help     Show help for command
    -V, --version  Show version information

EXAMPLES:
    devbox apply env.json                 # Apply and wait for completion
    devbox delete red dev --owner ana     # Delete red/dev
    devbox list --team red                # Environments of team red
    devbox events --limit 20              # Last 20 events
    devbox audit --team red --kind scale  # Scale-downs for team red
    devbox alerts - < batch.json          # Alert batch from stdin

ENVIRONMENT:
    DEVBOX_CONFIG      TOML settings file
    DEVBOX_BACKEND     kubectl (default) or memory
    DEVBOX_LOG_FORMAT  json for structured logs
    RUST_LOG           Log level (debug, info, warn, error)
    AUDIT_PATH         Audit file (default /data/audit.jsonl)
    SERVICE_TYPE       ClusterIP, NodePort or LoadBalancer
    HPA_ENABLED        Create autoscalers (true/false)

EXIT CODES:
    0  Success
    1  Operation failed
    2  Usage or configuration error
",
        version
    );
}

/// Print detailed help for a specific command.
pub fn print_command_help(command: &str) {
    match command {
        "apply" => print_apply_help(),
        "delete" => print_delete_help(),
        "list" | "ls" => print_list_help(),
        "events" => print_events_help(),
        "audit" => print_audit_help(),
        "alerts" => print_alerts_help(),
        "config" => print_config_help(),
        _ => {
            eprintln!(
                "No detailed help available for '{}'. Use 'devbox help' for general usage.",
                command
            );
        }
    }
}

fn print_apply_help() {
    eprintln!(
        "devbox apply - Create or update an environment

USAGE:
    devbox apply <SPEC.json|->

SPEC FIELDS:
    name, team     DNS-1123 labels (lowercased)
    base_image     Container image
    owner          Optional owner label
    cpu, memory    Requests (default 500m, 1Gi)
    gpu            GPU count (default 0)
    pool           Optional node pool
    priority       Optional priority class

DESCRIPTION:
    Validates the spec, then creates or replaces the namespace, workload,
    service and autoscaler. Re-applying the same spec is safe and restores
    an environment scaled to zero.

EXIT CODES:
    0  Environment ready
    1  Invalid spec or backend failure
    2  Unreadable spec file
"
    );
}

fn print_delete_help() {
    eprintln!(
        "devbox delete - Delete an environment

USAGE:
    devbox delete <TEAM> <NAME> [OPTIONS]

OPTIONS:
    --owner OWNER  Owner recorded in the audit trail

DESCRIPTION:
    Deletes the workload (foreground), service and autoscaler. Members that
    are already gone are skipped. The namespace is kept.
"
    );
}

fn print_list_help() {
    eprintln!(
        "devbox list - List environments

USAGE:
    devbox list [OPTIONS]

OPTIONS:
    --team TEAM  Only this team's environments
    --json       Output in JSON format
"
    );
}

fn print_events_help() {
    eprintln!(
        "devbox events - Recent audit events

USAGE:
    devbox events [OPTIONS]

OPTIONS:
    --limit N  Number of events (default 50)
    --json     Output in JSON format
"
    );
}

fn print_audit_help() {
    eprintln!(
        "devbox audit - Query the audit trail

USAGE:
    devbox audit [OPTIONS]

OPTIONS:
    --team TEAM    Filter by namespace
    --owner OWNER  Filter by owner
    --kind KIND    create, delete or scale
    --limit N      Maximum records (default 100, capped by audit.query_max)

Output is one JSON record per line, newest first.
"
    );
}

fn print_alerts_help() {
    eprintln!(
        "devbox alerts - Handle an alert batch

USAGE:
    devbox alerts <BATCH.json|-> [OPTIONS]

OPTIONS:
    --json  Output in JSON format

DESCRIPTION:
    Firing alerts named by alerts.idle_alert_name (default EnvIdleCPU) with
    namespace and env/app labels scale their workload to zero replicas.

EXIT CODES:
    0  Every matching alert was handled
    1  At least one scale-down failed
"
    );
}

fn print_config_help() {
    eprintln!(
        "devbox config - Manage configuration

USAGE:
    devbox config <SUBCOMMAND>

SUBCOMMANDS:
    show           Show effective configuration
    validate       Validate configuration file and environment
    defaults       Show default configuration
"
    );
}
