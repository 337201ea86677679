use devconsole_types::escape_html;

use crate::filter::Filter;

/// A help listing line
#[derive(Clone, Copy, Debug)]
pub struct CommandInfo {
    pub name: &'static str,
    pub description: &'static str,
}

/// Everything `help()` lists
pub const COMMANDS: &[CommandInfo] = &[
    CommandInfo {
        name: ":$",
        description: "Load jQuery",
    },
    CommandInfo {
        name: ":_",
        description: "Load underscore",
    },
    CommandInfo {
        name: "/text",
        description: "Show only logs containing text",
    },
];

/// Raw console input, classified once up front
#[derive(Clone, Debug)]
pub enum ConsoleInput {
    /// `:cmd`
    Command(Command),
    /// `/text`, matched literally
    FilterSet(Filter),
    /// `/text` that could not be compiled
    InvalidFilter(regex::Error),
    /// Anything else
    Evaluate(String),
}

impl ConsoleInput {
    pub fn parse(raw: &str) -> Self {
        if let Some(cmd) = raw.strip_prefix(':') {
            Self::Command(Command::parse(cmd))
        } else if let Some(text) = raw.strip_prefix('/') {
            match Filter::literal(text) {
                Ok(filter) => Self::FilterSet(filter),
                Err(e) => Self::InvalidFilter(e),
            }
        } else {
            Self::Evaluate(raw.to_string())
        }
    }
}

/// Console commands
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Load a helper library by name
    Load(&'static str),
    Unknown(String),
}

impl Command {
    pub fn parse(cmd: &str) -> Self {
        match cmd.trim() {
            "$" => Self::Load("jQuery"),
            "_" => Self::Load("underscore"),
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Markup of the help listing
pub fn help_markup() -> String {
    let items: String = COMMANDS
        .iter()
        .map(|cmd| {
            format!(
                r#"<li><span class="console-cmd">{}</span>{}</li>"#,
                escape_html(cmd.name),
                escape_html(cmd.description)
            )
        })
        .collect();
    format!(r#"<div class="console-help"><ul>{}</ul></div>"#, items)
}
