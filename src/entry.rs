use std::ffi::OsString;
use std::path::Path;

use clap::{CommandFactory, FromArgMatches};

use crate::args::RunnerArgs;
use crate::config::DEFAULT_CONFIG_FILES;
use crate::error::AppResult;

/// Parses the command line, installs logging and drives the run on a
/// multi-threaded runtime.
///
/// # Errors
///
/// Returns an error when argument parsing, runtime setup or the run fails.
pub fn run() -> AppResult<()> {
    let Some(args) = parse_args()? else {
        return Ok(());
    };

    crate::logger::init_logging(args.verbose);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(crate::app::run(args))
}

fn parse_args() -> AppResult<Option<RunnerArgs>> {
    let mut cmd = RunnerArgs::command();
    let raw_args: Vec<OsString> = std::env::args_os().collect();

    if should_show_help(&raw_args) {
        cmd.print_help()?;
        println!();
        return Ok(None);
    }

    let matches = cmd.get_matches_from(raw_args);
    let args = RunnerArgs::from_arg_matches(&matches)?;

    Ok(Some(args))
}

/// A bare invocation prints help unless a default collection is present.
fn should_show_help(raw_args: &[OsString]) -> bool {
    let treat_as_empty =
        matches!(raw_args, [] | [_]) || matches!(raw_args, [_, second] if second == "--");
    if !treat_as_empty {
        return false;
    }
    if std::env::var_os("REQPILOT_CONFIG").is_some() {
        return false;
    }

    !has_default_config()
}

fn has_default_config() -> bool {
    DEFAULT_CONFIG_FILES
        .iter()
        .any(|path| Path::new(path).exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_never_show_help() -> Result<(), String> {
        let raw = vec![OsString::from("reqpilot"), OsString::from("--no-fail")];
        if should_show_help(&raw) {
            return Err("Explicit flags should run, not print help".to_owned());
        }
        Ok(())
    }

    #[test]
    fn bare_invocation_follows_default_config() -> Result<(), String> {
        let raw = vec![OsString::from("reqpilot")];
        let dashdash = vec![OsString::from("reqpilot"), OsString::from("--")];
        if std::env::var_os("REQPILOT_CONFIG").is_some() {
            return Ok(());
        }
        let expected = !has_default_config();
        if should_show_help(&raw) != expected || should_show_help(&dashdash) != expected {
            return Err("Bare invocation should print help only without a collection".to_owned());
        }
        Ok(())
    }
}
