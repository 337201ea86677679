use regex::Regex;
use std::rc::Rc;
use std::sync::LazyLock;

use devconsole_types::{Entry, EntryKind, unescape_html};

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid markup tag regex"));

/// Predicate deciding which entries are visible in rendered output
#[derive(Clone, Default)]
pub enum Filter {
    /// Accept every entry
    #[default]
    All,

    /// Regex tested against the entry markup with tags stripped
    Pattern(Regex),

    /// Exact type tag equality
    Kind(EntryKind),

    /// Arbitrary caller-supplied predicate
    Custom(Rc<dyn Fn(&Entry) -> bool>),
}

impl Filter {
    /// Create a regex filter from a pattern string
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::Pattern(Regex::new(pattern)?))
    }

    /// Create a regex filter matching `text` literally. Fails only when the
    /// text is too long to compile.
    pub fn literal(text: &str) -> Result<Self, regex::Error> {
        Self::pattern(&regex::escape(text))
    }

    /// Create a type tag filter (`"error"`, `"warn"`, ...)
    pub fn from_tag(tag: &str) -> Option<Self> {
        EntryKind::from_tag(tag).map(Self::Kind)
    }

    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&Entry) -> bool + 'static,
    {
        Self::Custom(Rc::new(predicate))
    }

    /// Check if an entry passes this filter. Never mutates the entry.
    pub fn matches(&self, entry: &Entry) -> bool {
        if entry.ignore_filter() {
            return true;
        }

        match self {
            Self::All => true,
            Self::Pattern(re) => re.is_match(&stripped_text(entry.markup())),
            Self::Kind(kind) => entry.kind() == *kind,
            Self::Custom(predicate) => predicate(entry),
        }
    }

    /// Check if filter is the accept-all sentinel
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str("Filter::All"),
            Self::Pattern(re) => f.debug_tuple("Filter::Pattern").field(&re.as_str()).finish(),
            Self::Kind(kind) => f.debug_tuple("Filter::Kind").field(kind).finish(),
            Self::Custom(_) => f.write_str("Filter::Custom(..)"),
        }
    }
}

/// Markup with every tag removed and entities decoded
pub(crate) fn stripped_text(markup: &str) -> String {
    unescape_html(&TAG_RE.replace_all(markup, ""))
}
