use std::collections::VecDeque;
use std::fmt;
use std::num::NonZeroUsize;

use tracing::{debug, trace};

use devconsole_types::{Entry, EntryId, EntryKind};

/// Maximum number of retained entries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MaxEntries {
    Bounded(NonZeroUsize),
    #[default]
    Unbounded,
}

impl MaxEntries {
    /// Parse a positive count or `"infinite"`
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("infinite") {
            return Some(Self::Unbounded);
        }
        s.parse::<NonZeroUsize>().ok().map(Self::Bounded)
    }

    /// Treats zero as unbounded
    pub fn from_count(count: usize) -> Self {
        NonZeroUsize::new(count).map_or(Self::Unbounded, Self::Bounded)
    }

    pub fn limit(&self) -> Option<usize> {
        match self {
            Self::Bounded(n) => Some(n.get()),
            Self::Unbounded => None,
        }
    }
}

impl fmt::Display for MaxEntries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(n) => write!(f, "{}", n),
            Self::Unbounded => f.write_str("infinite"),
        }
    }
}

/// Depth of group scopes still open in the store
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GroupTracker {
    depth: usize,
}

impl GroupTracker {
    pub fn open(&mut self) {
        self.depth += 1;
    }

    /// Close the innermost scope; never goes below zero
    pub fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn reset(&mut self) {
        self.depth = 0;
    }
}

/// How a candidate entry ended up in the store
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Insertion {
    /// Stored as a new entry
    Appended,
    /// Collapsed into the previous identical entry
    Repeated,
    /// A `groupEnd` with no open group; not recorded
    Dropped,
}

/// Entries removed by the retention policy
#[derive(Debug, Default)]
pub struct Eviction {
    /// Evicted entries, oldest first
    pub evicted: Vec<Entry>,

    /// A group was evicted whose closing marker never arrived
    pub unbalanced: bool,
}

impl Eviction {
    pub fn is_empty(&self) -> bool {
        self.evicted.is_empty()
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.evicted.iter().any(|e| e.id() == id)
    }
}

/// Result of [`LogStore::insert`]
#[derive(Debug)]
pub struct InsertReport {
    /// Id of the stored entry: the new one, or the one whose counter grew
    pub id: EntryId,
    pub kind: EntryKind,
    pub insertion: Insertion,
    pub eviction: Eviction,
}

impl InsertReport {
    /// Whether the inserted entry was evicted by its own insertion
    pub fn self_evicted(&self) -> bool {
        self.eviction.contains(self.id)
    }
}

/// Ordered log store with run-length deduplication and bounded retention
#[derive(Debug, Default)]
pub struct LogStore {
    /// Retained entries, oldest first
    entries: VecDeque<Entry>,

    /// Index of the last entry when it may absorb repeats
    last_entry: Option<usize>,

    /// Open group scopes
    groups: GroupTracker,

    /// Retention limit
    max_entries: MaxEntries,

    /// Next entry ID
    next_id: u64,
}

impl LogStore {
    /// Create an empty store with the given retention limit
    pub fn new(max_entries: MaxEntries) -> Self {
        Self {
            max_entries,
            ..Self::default()
        }
    }

    /// Allocate a fresh entry id
    pub fn next_id(&mut self) -> EntryId {
        self.next_id += 1;
        EntryId::new(self.next_id)
    }

    /// Record a candidate entry, collapsing it into the previous entry when
    /// identical, then apply the retention policy
    pub fn insert(&mut self, candidate: Entry) -> InsertReport {
        let kind = candidate.kind();

        if kind == EntryKind::GroupEnd && self.groups.depth() == 0 {
            trace!(id = %candidate.id(), "dropping groupEnd without open group");
            return InsertReport {
                id: candidate.id(),
                kind,
                insertion: Insertion::Dropped,
                eviction: Eviction::default(),
            };
        }

        let (id, insertion) = match self.repeat_target(&candidate) {
            Some(last) => {
                last.add_count();
                if let Some(time) = candidate.time() {
                    last.update_time(time);
                }
                debug!(id = %last.id(), count = last.count(), "repeated entry");
                (last.id(), Insertion::Repeated)
            }
            None => {
                let id = candidate.id();
                if kind == EntryKind::GroupEnd {
                    self.groups.close();
                } else if kind.is_group_start() {
                    self.groups.open();
                }
                self.entries.push_back(candidate);
                self.last_entry = kind
                    .is_dedup_eligible()
                    .then(|| self.entries.len() - 1);
                trace!(%id, %kind, len = self.entries.len(), "appended entry");
                (id, Insertion::Appended)
            }
        };

        let eviction = self.enforce();

        InsertReport {
            id,
            kind,
            insertion,
            eviction,
        }
    }

    /// The last entry, if the candidate repeats it
    fn repeat_target(&mut self, candidate: &Entry) -> Option<&mut Entry> {
        if !candidate.kind().is_dedup_eligible()
            || candidate.source().is_some()
            || candidate.has_extra_args()
        {
            return None;
        }

        let last = self.entries.get_mut(self.last_entry?)?;
        let same = last.kind() == candidate.kind()
            && last.value() == candidate.value()
            && !last.has_extra_args();
        same.then_some(last)
    }

    /// Evict oldest entries until the store fits its limit. A group and all
    /// of its descendants are evicted together.
    pub fn enforce(&mut self) -> Eviction {
        let mut eviction = Eviction::default();
        let Some(limit) = self.max_entries.limit() else {
            return eviction;
        };

        while self.entries.len() > limit {
            let Some(oldest) = self.entries.pop_front() else {
                break;
            };
            let opens_group = oldest.kind().is_group_start();
            eviction.evicted.push(oldest);

            if !opens_group {
                continue;
            }

            let mut depth = 1usize;
            while depth > 0 {
                let Some(next) = self.entries.pop_front() else {
                    break;
                };
                match next.kind() {
                    EntryKind::Group | EntryKind::GroupCollapsed => depth += 1,
                    EntryKind::GroupEnd => depth -= 1,
                    _ => {}
                }
                eviction.evicted.push(next);
            }
            if depth > 0 {
                eviction.unbalanced = true;
            }
        }

        if !eviction.is_empty() {
            let removed = eviction.evicted.len();
            self.last_entry = self.last_entry.and_then(|i| i.checked_sub(removed));
            if eviction.unbalanced {
                self.groups.reset();
            }
            debug!(
                removed,
                remaining = self.entries.len(),
                unbalanced = eviction.unbalanced,
                "evicted entries"
            );
        }

        eviction
    }

    /// Change the retention limit, evicting immediately if it shrank
    pub fn set_max_entries(&mut self, max_entries: MaxEntries) -> Eviction {
        self.max_entries = max_entries;
        self.enforce()
    }

    pub fn max_entries(&self) -> MaxEntries {
        self.max_entries
    }

    /// Get entry by id
    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id() == id)
    }

    /// The entry that would absorb an identical next insert
    pub fn last_entry(&self) -> Option<&Entry> {
        self.entries.get(self.last_entry?)
    }

    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &Entry> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Number of group scopes still open
    pub fn group_depth(&self) -> usize {
        self.groups.depth()
    }

    /// Total entry count
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all entries, the repeat target and open groups
    pub fn clear(&mut self) {
        self.entries.clear();
        self.last_entry = None;
        self.groups.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devconsole_types::EntryOptions;
    use serde_json::json;

    fn push(store: &mut LogStore, kind: EntryKind, text: &str) -> InsertReport {
        let mut options = EntryOptions::new(kind, vec![json!(text)]);
        options.id = store.next_id();
        store.insert(Entry::new(options))
    }

    fn bounded(n: usize) -> MaxEntries {
        MaxEntries::from_count(n)
    }

    fn kinds(store: &LogStore) -> Vec<EntryKind> {
        store.entries().map(|e| e.kind()).collect()
    }

    #[test]
    fn test_parse_max_entries() {
        assert_eq!(MaxEntries::parse("infinite"), Some(MaxEntries::Unbounded));
        assert_eq!(MaxEntries::parse("5").and_then(|m| m.limit()), Some(5));
        assert_eq!(MaxEntries::parse("0"), None);
        assert_eq!(MaxEntries::parse("-3"), None);
        assert_eq!(MaxEntries::from_count(0), MaxEntries::Unbounded);
    }

    #[test]
    fn test_repeats_collapse() {
        let mut store = LogStore::new(MaxEntries::Unbounded);
        let first = push(&mut store, EntryKind::Log, "a");
        let second = push(&mut store, EntryKind::Log, "a");
        let third = push(&mut store, EntryKind::Log, "a");

        assert_eq!(first.insertion, Insertion::Appended);
        assert_eq!(second.insertion, Insertion::Repeated);
        assert_eq!(third.id, first.id);
        assert_eq!(store.len(), 1);
        assert_eq!(store.last_entry().map(|e| e.count()), Some(3));
    }

    #[test]
    fn test_different_kind_or_value_does_not_collapse() {
        let mut store = LogStore::new(MaxEntries::Unbounded);
        push(&mut store, EntryKind::Log, "a");
        push(&mut store, EntryKind::Warn, "a");
        push(&mut store, EntryKind::Warn, "b");
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_source_or_objects_do_not_collapse() {
        let mut store = LogStore::new(MaxEntries::Unbounded);
        for _ in 0..2 {
            let mut options =
                EntryOptions::new(EntryKind::Log, vec![json!("a")]).with_source("app.js:3");
            options.id = store.next_id();
            store.insert(Entry::new(options));
        }
        for _ in 0..2 {
            let mut options = EntryOptions::new(EntryKind::Log, vec![json!({"k": 1})]);
            options.id = store.next_id();
            store.insert(Entry::new(options));
        }
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_html_and_group_end_break_runs() {
        let mut store = LogStore::new(MaxEntries::Unbounded);
        push(&mut store, EntryKind::Log, "a");
        push(&mut store, EntryKind::Html, "<hr>");
        push(&mut store, EntryKind::Log, "a");
        assert_eq!(store.len(), 3);

        push(&mut store, EntryKind::Group, "g");
        push(&mut store, EntryKind::Log, "a");
        push(&mut store, EntryKind::GroupEnd, "");
        assert!(store.last_entry().is_none());
        push(&mut store, EntryKind::Log, "a");
        assert_eq!(store.len(), 7);
    }

    #[test]
    fn test_groups_never_collapse() {
        let mut store = LogStore::new(MaxEntries::Unbounded);
        push(&mut store, EntryKind::Group, "g");
        push(&mut store, EntryKind::Group, "g");
        assert_eq!(store.len(), 2);
        assert_eq!(store.group_depth(), 2);
    }

    #[test]
    fn test_repeat_updates_time() {
        use std::time::Duration;

        let mut store = LogStore::new(MaxEntries::Unbounded);
        for ms in [10, 20] {
            let mut options = EntryOptions::new(EntryKind::Info, vec![json!("t")])
                .with_time(Duration::from_millis(ms));
            options.id = store.next_id();
            store.insert(Entry::new(options));
        }
        assert_eq!(
            store.last_entry().and_then(|e| e.time()),
            Some(Duration::from_millis(20))
        );
    }

    #[test]
    fn test_bounded_evicts_oldest() {
        let mut store = LogStore::new(bounded(2));
        push(&mut store, EntryKind::Log, "x");
        push(&mut store, EntryKind::Log, "y");
        let report = push(&mut store, EntryKind::Log, "z");

        assert_eq!(report.eviction.evicted.len(), 1);
        let texts: Vec<_> = store.entries().map(|e| e.text()).collect();
        assert_eq!(texts, vec!["y", "z"]);
        assert_eq!(store.last_entry().map(|e| e.text()), Some("z".to_string()));
    }

    #[test]
    fn test_group_evicted_atomically() {
        let mut store = LogStore::new(bounded(4));
        push(&mut store, EntryKind::Group, "g");
        push(&mut store, EntryKind::Log, "in");
        push(&mut store, EntryKind::GroupEnd, "");
        push(&mut store, EntryKind::Log, "after");
        let report = push(&mut store, EntryKind::Log, "last");

        assert_eq!(report.eviction.evicted.len(), 3);
        assert!(!report.eviction.unbalanced);
        assert_eq!(kinds(&store), vec![EntryKind::Log, EntryKind::Log]);
        assert_eq!(store.group_depth(), 0);
    }

    #[test]
    fn test_nested_group_evicted_with_parent() {
        let mut store = LogStore::new(bounded(6));
        push(&mut store, EntryKind::Group, "outer");
        push(&mut store, EntryKind::GroupCollapsed, "inner");
        push(&mut store, EntryKind::Log, "deep");
        push(&mut store, EntryKind::GroupEnd, "");
        push(&mut store, EntryKind::GroupEnd, "");
        push(&mut store, EntryKind::Log, "a");
        push(&mut store, EntryKind::Log, "b");

        assert_eq!(kinds(&store), vec![EntryKind::Log, EntryKind::Log]);
        assert_eq!(store.group_depth(), 0);
    }

    #[test]
    fn test_unterminated_group_evicts_everything() {
        let mut store = LogStore::new(bounded(2));
        push(&mut store, EntryKind::Group, "open");
        push(&mut store, EntryKind::Log, "a");
        assert_eq!(store.group_depth(), 1);

        let report = push(&mut store, EntryKind::Log, "b");
        assert!(report.eviction.unbalanced);
        assert!(report.self_evicted());
        assert!(store.is_empty());
        assert_eq!(store.group_depth(), 0);
        assert!(store.last_entry().is_none());
    }

    #[test]
    fn test_group_end_evicted_by_its_own_insert() {
        let mut store = LogStore::new(bounded(2));
        push(&mut store, EntryKind::Group, "g");
        push(&mut store, EntryKind::Log, "a");
        let report = push(&mut store, EntryKind::GroupEnd, "");

        assert!(report.self_evicted());
        assert!(!report.eviction.unbalanced);
        assert!(store.is_empty());
        assert_eq!(store.group_depth(), 0);
    }

    #[test]
    fn test_orphan_group_end_dropped() {
        let mut store = LogStore::new(MaxEntries::Unbounded);
        let report = push(&mut store, EntryKind::GroupEnd, "");
        assert_eq!(report.insertion, Insertion::Dropped);
        assert!(store.is_empty());
        assert_eq!(store.group_depth(), 0);
    }

    #[test]
    fn test_shrinking_limit_trims() {
        let mut store = LogStore::new(MaxEntries::Unbounded);
        for text in ["a", "b", "c", "d"] {
            push(&mut store, EntryKind::Log, text);
        }
        let eviction = store.set_max_entries(bounded(1));
        assert_eq!(eviction.evicted.len(), 3);
        assert_eq!(store.len(), 1);
        assert_eq!(store.max_entries().to_string(), "1");
    }

    #[test]
    fn test_clear() {
        let mut store = LogStore::new(MaxEntries::Unbounded);
        push(&mut store, EntryKind::Group, "g");
        push(&mut store, EntryKind::Log, "a");
        store.clear();
        assert!(store.is_empty());
        assert!(store.last_entry().is_none());
        assert_eq!(store.group_depth(), 0);
    }
}
