//! Rendering phase specifications into argv lists.
//!
//! Commands never pass through a shell: a command line is split into words
//! here and the words are substituted individually.

use indexmap::IndexMap;
use myna_core::document::scalar_to_string;
use myna_settings::CommandTemplate;
use serde_yaml::Value;

/// Split a command line into words.
///
/// Whitespace separates words; single quotes are literal, double quotes allow
/// `\"` and `\\`, and a backslash outside quotes escapes the next character.
pub fn split_command_line(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err("unterminated single quote".to_string()),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\')) => current.push(c),
                            Some(c) => {
                                current.push('\\');
                                current.push(c);
                            }
                            None => return Err("unterminated double quote".to_string()),
                        },
                        Some(c) => current.push(c),
                        None => return Err("unterminated double quote".to_string()),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(c) => current.push(c),
                    None => return Err("trailing backslash".to_string()),
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Argv for one command record, before substitution.
pub fn template_argv(template: &CommandTemplate) -> Result<Vec<String>, String> {
    match template {
        CommandTemplate::Line(line) => split_command_line(line),
        CommandTemplate::Argv(values) => values_to_words(values),
        CommandTemplate::Program { program, args } => {
            let mut argv = vec![program.clone()];
            argv.extend(values_to_words(args)?);
            Ok(argv)
        }
    }
}

fn values_to_words(values: &[Value]) -> Result<Vec<String>, String> {
    values
        .iter()
        .map(|v| scalar_to_string(v).ok_or_else(|| format!("non-scalar argument {v:?}")))
        .collect()
}

fn option_value(value: &Value) -> Option<String> {
    match value {
        Value::Sequence(items) => Some(
            items
                .iter()
                .filter_map(scalar_to_string)
                .collect::<Vec<_>>()
                .join(","),
        ),
        other => scalar_to_string(other),
    }
}

/// Command-line flags for an application phase script.
///
/// Workspace defaults come first, then step values, a step value replacing the
/// default of the same key. `true` becomes `--key`; `false` and null are
/// dropped; anything else becomes `--key value`.
pub fn option_args(
    step: &str,
    defaults: &IndexMap<String, Value>,
    options: &IndexMap<String, Value>,
) -> Vec<String> {
    let mut args = Vec::new();
    let merged = defaults
        .iter()
        .filter(|(k, _)| !options.contains_key(*k))
        .chain(options.iter());

    for (key, value) in merged {
        if key == "exec" {
            tracing::warn!(
                step,
                "the \"exec\" option is obsolete; set \"executable\" on the step instead"
            );
            continue;
        }
        match value {
            Value::Bool(true) => args.push(format!("--{key}")),
            Value::Bool(false) | Value::Null => {}
            other => {
                if let Some(v) = option_value(other) {
                    args.push(format!("--{key}"));
                    args.push(v);
                }
            }
        }
    }
    args
}

/// Literal replacements applied to every word of a rendered command.
#[derive(Debug, Clone, Default)]
pub struct Substitutions {
    pairs: Vec<(String, String)>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, pattern: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((pattern.into(), value.into()));
        self
    }

    pub fn apply(&self, word: &str) -> String {
        self.pairs
            .iter()
            .fold(word.to_string(), |acc, (pattern, value)| acc.replace(pattern, value))
    }
}
