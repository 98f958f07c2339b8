//! Variable builtins: export, unset, env
//!
//! Session variables shadow the startup environment. Both are visible to
//! `$NAME` expansion and to `env`.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::CommandResult;

/// True for names expansion can see (`\w+`).
pub(crate) fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// export builtin - set session variables.
///
/// Usage: export NAME=VALUE...
///
/// A bare `NAME` is accepted and ignored; with no arguments the merged
/// environment is printed as `declare -x` lines.
pub struct Export;

#[async_trait]
impl Builtin for Export {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        if ctx.args.is_empty() {
            let output = merged(&ctx)
                .iter()
                .map(|(k, v)| format!("declare -x {k}=\"{v}\"\n"))
                .collect::<String>();
            return Ok(CommandResult::ok(output));
        }

        let mut output = String::new();
        let mut exit_code = 0;
        for arg in ctx.args {
            let (name, value) = arg.split_once('=').unwrap_or((arg.as_str(), ""));
            if !is_valid_name(name) {
                output.push_str(&format!("shimsh: export: `{arg}': not a valid identifier\n"));
                exit_code = 1;
                continue;
            }
            if !arg.contains('=') {
                continue;
            }
            ctx.session
                .variables
                .insert(name.to_string(), value.to_string());
            ctx.log(format!("shimsh: export {name}"));
        }

        Ok(CommandResult::err(output, exit_code))
    }
}

/// unset builtin - remove session variables.
///
/// The startup environment is immutable; unsetting an inherited name only
/// drops a session override.
pub struct Unset;

#[async_trait]
impl Builtin for Unset {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        for name in ctx.args {
            if ctx.session.variables.remove(name).is_some() {
                ctx.log(format!("shimsh: unset {name}"));
            }
        }
        Ok(CommandResult::ok(""))
    }
}

/// env builtin - print the environment, sorted.
pub struct Env;

#[async_trait]
impl Builtin for Env {
    async fn execute(&self, ctx: Context<'_>) -> Result<CommandResult> {
        let output = merged(&ctx)
            .iter()
            .map(|(k, v)| format!("{k}={v}\n"))
            .collect::<String>();
        Ok(CommandResult::ok(output))
    }
}

fn merged<'c>(ctx: &'c Context<'_>) -> BTreeMap<&'c str, &'c str> {
    let mut all: BTreeMap<&str, &str> = ctx
        .env
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    for (k, v) in &ctx.session.variables {
        all.insert(k, v);
    }
    all
}
