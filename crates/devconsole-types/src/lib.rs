//! Shared types for devconsole
//!
//! This crate contains the log entry model consumed by the console engine:
//! entry kinds, identifiers, construction options and the rendered markup of
//! a single entry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A console argument. Anything the host can log is expressed as JSON.
pub type LogValue = serde_json::Value;

// ============================================================================
// Entry Kinds
// ============================================================================

/// Type tag of a console entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryKind {
    Log,
    Info,
    Warn,
    Error,
    Debug,
    Dir,
    Table,
    Html,
    Input,
    Output,
    Group,
    GroupCollapsed,
    GroupEnd,
}

impl EntryKind {
    /// Parse a type tag (`log`, `groupCollapsed`, ...)
    pub fn from_tag(s: &str) -> Option<Self> {
        let kind = match s {
            "log" => Self::Log,
            "info" => Self::Info,
            "warn" => Self::Warn,
            "error" => Self::Error,
            "debug" => Self::Debug,
            "dir" => Self::Dir,
            "table" => Self::Table,
            "html" => Self::Html,
            "input" => Self::Input,
            "output" => Self::Output,
            "group" => Self::Group,
            "groupCollapsed" => Self::GroupCollapsed,
            "groupEnd" => Self::GroupEnd,
            _ => return None,
        };
        Some(kind)
    }

    /// The type tag as written by callers
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Debug => "debug",
            Self::Dir => "dir",
            Self::Table => "table",
            Self::Html => "html",
            Self::Input => "input",
            Self::Output => "output",
            Self::Group => "group",
            Self::GroupCollapsed => "groupCollapsed",
            Self::GroupEnd => "groupEnd",
        }
    }

    /// Whether this entry opens a nested scope
    pub fn is_group_start(&self) -> bool {
        matches!(self, Self::Group | Self::GroupCollapsed)
    }

    /// Whether consecutive entries of this kind may collapse into one
    pub fn is_dedup_eligible(&self) -> bool {
        !matches!(
            self,
            Self::Html | Self::GroupEnd | Self::Group | Self::GroupCollapsed
        )
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Entries
// ============================================================================

/// Stable identifier of an entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl EntryId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "log{}", self.0)
    }
}

/// Everything needed to construct an entry
#[derive(Clone, Debug)]
pub struct EntryOptions {
    pub kind: EntryKind,
    pub args: Vec<LogValue>,
    pub id: EntryId,
    pub display_header: bool,
    pub ignore_filter: bool,
    /// Originating source location, if the host captured one
    pub source: Option<String>,
    /// Elapsed time shown in the header
    pub time: Option<Duration>,
}

impl EntryOptions {
    /// Create options for a plain entry; the id is assigned by the store
    pub fn new(kind: EntryKind, args: Vec<LogValue>) -> Self {
        Self {
            kind,
            args,
            id: EntryId::new(0),
            display_header: false,
            ignore_filter: false,
            source: None,
            time: None,
        }
    }

    /// Always show this entry, whatever the active filter
    pub fn ignoring_filter(mut self) -> Self {
        self.ignore_filter = true;
        self
    }

    /// Attach the originating source location
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_time(mut self, time: Duration) -> Self {
        self.time = Some(time);
        self
    }
}

/// A single recorded console event
#[derive(Clone, Debug)]
pub struct Entry {
    id: EntryId,
    kind: EntryKind,
    args: Vec<LogValue>,
    /// Comparable identity; only set for a single primitive argument
    value: Option<LogValue>,
    source: Option<String>,
    time: Option<Duration>,
    count: u32,
    display_header: bool,
    ignore_filter: bool,
    markup: String,
}

impl Entry {
    /// Build an entry and render its markup
    pub fn new(options: EntryOptions) -> Self {
        let value = match options.args.as_slice() {
            [single] if is_primitive(single) => Some(single.clone()),
            _ => None,
        };

        let mut entry = Self {
            id: options.id,
            kind: options.kind,
            args: options.args,
            value,
            source: options.source,
            time: options.time,
            count: 1,
            display_header: options.display_header,
            ignore_filter: options.ignore_filter,
            markup: String::new(),
        };
        entry.markup = entry.render();
        entry
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn value(&self) -> Option<&LogValue> {
        self.value.as_ref()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn time(&self) -> Option<Duration> {
        self.time
    }

    /// Repeat counter, 1 for an entry seen once
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn ignore_filter(&self) -> bool {
        self.ignore_filter
    }

    /// Rendered markup of this entry (one list item)
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Arguments that cannot be compared by value (objects, arrays, or more
    /// than one argument) and must stay inspectable on their own.
    pub fn has_extra_args(&self) -> bool {
        self.value.is_none() && !self.args.is_empty()
    }

    /// Plain text of the arguments, without markup
    pub fn text(&self) -> String {
        self.args
            .iter()
            .map(format_value)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Record one more consecutive occurrence
    pub fn add_count(&mut self) {
        self.count = self.count.saturating_add(1);
        self.markup = self.render();
    }

    /// Replace the elapsed time shown in the header
    pub fn update_time(&mut self, time: Duration) {
        self.time = Some(time);
        self.markup = self.render();
    }

    fn render(&self) -> String {
        let body = if self.kind == EntryKind::Html {
            self.text()
        } else {
            escape_html(&self.text())
        };

        let mut out = format!(
            r#"<li class="console-log-item console-{kind}"><div class="console-log-content" data-id="{id}" data-type="{kind}">"#,
            kind = self.kind,
            id = self.id,
        );
        if self.display_header {
            let elapsed = self.time.unwrap_or_default();
            out.push_str(&format!(
                r#"<div class="console-header">+{:.3}s</div>"#,
                elapsed.as_secs_f64()
            ));
        }
        if self.count > 1 {
            out.push_str(&format!(r#"<span class="console-count">{}</span>"#, self.count));
        }
        out.push_str(&body);
        out.push_str("</div></li>");
        out
    }
}

/// Strings render raw, everything else as compact JSON
pub fn format_value(value: &LogValue) -> String {
    match value {
        LogValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_primitive(value: &LogValue) -> bool {
    !matches!(value, LogValue::Array(_) | LogValue::Object(_))
}

/// Escape text for inclusion in markup
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Reverse of [`escape_html`] for the entities it produces
pub fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
