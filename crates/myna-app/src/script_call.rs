//! Rebuild the option list of a parsed command line, filling in defaults.
//!
//! Used to record exactly how a program was invoked, including options the
//! caller left at their default.

use clap::{ArgAction, ArgMatches, Command};

/// Returns one `"--option value"` entry per option.
///
/// Boolean flags appear only when they differ from their default. Every
/// other option that has a value (given or defaulted) is included.
/// Positional arguments are skipped.
pub fn script_call_with_defaults(command: &Command, matches: &ArgMatches) -> Vec<String> {
    let mut call = Vec::new();
    for arg in command.get_arguments() {
        let option = match (arg.get_long(), arg.get_short()) {
            (Some(long), _) => format!("--{long}"),
            (None, Some(short)) => format!("-{short}"),
            (None, None) => continue,
        };
        let id = arg.get_id().as_str();
        match arg.get_action() {
            ArgAction::Help
            | ArgAction::HelpShort
            | ArgAction::HelpLong
            | ArgAction::Version => {}
            ArgAction::SetTrue => {
                if let Ok(Some(true)) = matches.try_get_one::<bool>(id) {
                    call.push(option);
                }
            }
            ArgAction::SetFalse => {
                if let Ok(Some(false)) = matches.try_get_one::<bool>(id) {
                    call.push(option);
                }
            }
            _ => {
                if let Ok(Some(raw)) = matches.try_get_raw(id) {
                    let values: Vec<String> =
                        raw.map(|v| v.to_string_lossy().to_string()).collect();
                    if !values.is_empty() {
                        call.push(format!("{option} {}", values.join(" ")));
                    }
                }
            }
        }
    }
    call
}
