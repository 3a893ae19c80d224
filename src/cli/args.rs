// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Minimal flag scanner for subcommand arguments.

use std::collections::BTreeMap;

/// Positional arguments and flags after the subcommand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    pub positional: Vec<String>,
    values: BTreeMap<String, String>,
    switches: Vec<String>,
}

impl ParsedArgs {
    pub fn value(&self, flag: &str) -> Option<&str> {
        self.values.get(flag).map(String::as_str)
    }

    pub fn switch(&self, flag: &str) -> bool {
        self.switches.iter().any(|s| s == flag)
    }

    /// Parse a numeric flag value.
    pub fn number(&self, flag: &str) -> Result<Option<usize>, String> {
        match self.value(flag) {
            None => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| format!("Invalid value for {}: {}", flag, raw)),
        }
    }
}

/// Split `args` into positionals, `--flag VALUE` pairs and bare switches.
///
/// `-` counts as a positional (stdin).
pub fn parse(args: &[String], value_flags: &[&str], switch_flags: &[&str]) -> Result<ParsedArgs, String> {
    let mut parsed = ParsedArgs::default();
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        if value_flags.contains(&arg) {
            match args.get(i + 1) {
                Some(value) => {
                    parsed.values.insert(arg.to_string(), value.clone());
                    i += 2;
                }
                None => return Err(format!("Missing value for {}", arg)),
            }
        } else if switch_flags.contains(&arg) {
            parsed.switches.push(arg.to_string());
            i += 1;
        } else if arg.starts_with("--") {
            return Err(format!("Unknown argument: {}", arg));
        } else {
            parsed.positional.push(arg.to_string());
            i += 1;
        }
    }
    Ok(parsed)
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
