//! Host directives
//!
//! Lines starting with `.` drive console operations that have no typed
//! form, e.g. `.warn disk almost full` or `.group startup`. Everything else
//! is handed to [`Console::input`].

use anyhow::{Context, Result, bail};

use devconsole_logs::{Console, Filter, LogValue, MaxEntries};

/// A parsed host directive
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Log(Vec<LogValue>),
    Info(Vec<LogValue>),
    Warn(Vec<LogValue>),
    Error(Vec<LogValue>),
    Debug(Vec<LogValue>),
    Group(Vec<LogValue>),
    GroupCollapsed(Vec<LogValue>),
    GroupEnd,
    Assert(bool, Vec<LogValue>),
    Html(String),
    Count(String),
    Time(String),
    TimeEnd(String),
    Filter(String),
    MaxEntries(MaxEntries),
    Header(bool),
    Active(bool),
    Clear,
}

/// One line of host input
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Directive(Directive),
    Console(String),
}

impl Line {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.strip_prefix('.') {
            Some(rest) => Directive::parse(rest).map(Line::Directive),
            None => Ok(Line::Console(raw.to_string())),
        }
    }
}

impl Directive {
    /// Parse a directive without its leading `.`
    pub fn parse(s: &str) -> Result<Self> {
        let (name, rest) = s.split_once(' ').unwrap_or((s, ""));
        let rest = rest.trim();

        let directive = match name {
            "log" => Directive::Log(parse_args(rest)),
            "info" => Directive::Info(parse_args(rest)),
            "warn" => Directive::Warn(parse_args(rest)),
            "error" => Directive::Error(parse_args(rest)),
            "debug" => Directive::Debug(parse_args(rest)),
            "group" => Directive::Group(parse_args(rest)),
            "groupCollapsed" => Directive::GroupCollapsed(parse_args(rest)),
            "groupEnd" => Directive::GroupEnd,
            "assert" => {
                let (cond, args) = rest.split_once(' ').unwrap_or((rest, ""));
                let cond = parse_bool(cond).context("assert expects true or false")?;
                Directive::Assert(cond, parse_args(args.trim()))
            }
            "html" => Directive::Html(rest.to_string()),
            "count" => Directive::Count(label_or_default(rest)),
            "time" => Directive::Time(label_or_default(rest)),
            "timeEnd" => Directive::TimeEnd(label_or_default(rest)),
            "filter" => Directive::Filter(rest.to_string()),
            "max" => match MaxEntries::parse(rest) {
                Some(max) => Directive::MaxEntries(max),
                None => bail!("Invalid entry limit '{}'", rest),
            },
            "header" => Directive::Header(parse_bool(rest).context("header expects on or off")?),
            "show" => Directive::Active(true),
            "hide" => Directive::Active(false),
            "clear" => Directive::Clear,
            _ => bail!("Unknown directive '.{}'", name),
        };

        Ok(directive)
    }

    /// Run the directive against a console
    pub fn apply(self, console: &mut Console) -> Result<()> {
        match self {
            Directive::Log(args) => console.log(args),
            Directive::Info(args) => console.info(args),
            Directive::Warn(args) => console.warn(args),
            Directive::Error(args) => console.error(args),
            Directive::Debug(args) => console.debug(args),
            Directive::Group(args) => console.group(args),
            Directive::GroupCollapsed(args) => console.group_collapsed(args),
            Directive::GroupEnd => console.group_end(),
            Directive::Assert(cond, args) => console.assert(cond, args),
            Directive::Html(markup) => console.html(markup),
            Directive::Count(label) => console.count(&label),
            Directive::Time(name) => console.time(&name),
            Directive::TimeEnd(name) => console.time_end(&name),
            Directive::Filter(pattern) => console.filter(parse_filter(&pattern)?),
            Directive::MaxEntries(max) => console.max_entries(max),
            Directive::Header(flag) => console.display_header(flag),
            Directive::Active(flag) => console.set_active(flag),
            Directive::Clear => console.clear(),
        };
        Ok(())
    }
}

/// `all`, a kind tag such as `warn`, or a regex
fn parse_filter(text: &str) -> Result<Filter> {
    if text.is_empty() || text == "all" {
        return Ok(Filter::All);
    }
    if let Some(filter) = Filter::from_tag(text) {
        return Ok(filter);
    }
    Filter::pattern(text).with_context(|| format!("Invalid filter pattern '{}'", text))
}

/// A single JSON literal, or the raw text as a string
fn parse_args(rest: &str) -> Vec<LogValue> {
    if rest.is_empty() {
        return Vec::new();
    }
    let value = serde_json::from_str(rest).unwrap_or_else(|_| LogValue::String(rest.to_string()));
    vec![value]
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "true" | "on" | "1" => Some(true),
        "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn label_or_default(rest: &str) -> String {
    if rest.is_empty() {
        "default".to_string()
    } else {
        rest.to_string()
    }
}
