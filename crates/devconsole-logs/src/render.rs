//! Rendered representation of the log list
//!
//! The output is kept as a tree of scopes: the root list plus one nested
//! list per group. The current scope is an index into that tree, so the
//! engine never holds a pointer into a live output surface.

use std::collections::HashMap;

use tracing::debug;

use devconsole_types::{Entry, EntryId, EntryKind};

use crate::filter::{Filter, stripped_text};

/// Handle of a list in the scope tree
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    pub const ROOT: ScopeId = ScopeId(0);
}

#[derive(Clone, Debug)]
struct Row {
    id: EntryId,
    markup: String,
    text: String,
}

#[derive(Clone, Debug)]
enum Item {
    Row(Row),
    Scope(ScopeId),
}

#[derive(Clone, Debug)]
struct Scope {
    parent: Option<ScopeId>,
    collapsed: bool,
    attached: bool,
    items: Vec<Item>,
}

impl Scope {
    fn new(parent: Option<ScopeId>, collapsed: bool) -> Self {
        Self {
            parent,
            collapsed,
            attached: true,
            items: Vec::new(),
        }
    }
}

/// Tree of rendered rows and nested group lists
#[derive(Clone, Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    current: ScopeId,
    /// Scope holding each rendered row
    rows: HashMap<EntryId, ScopeId>,
    /// Nested list opened by each group entry
    owned: HashMap<EntryId, ScopeId>,
    /// Detached slots ready for reuse
    free: Vec<ScopeId>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(None, false)],
            current: ScopeId::ROOT,
            rows: HashMap::new(),
            owned: HashMap::new(),
            free: Vec::new(),
        }
    }

    /// Drop everything and point back at the root list
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// The list new rows are appended to
    pub fn current(&self) -> ScopeId {
        self.current
    }

    /// Nesting depth of the current scope
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut scope = self.current;
        while let Some(parent) = self.scopes[scope.0].parent {
            depth += 1;
            scope = parent;
        }
        depth
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.rows.contains_key(&id)
    }

    pub fn append_row(&mut self, entry: &Entry) {
        let row = Row {
            id: entry.id(),
            markup: entry.markup().to_string(),
            text: row_text(entry),
        };
        self.scopes[self.current.0].items.push(Item::Row(row));
        self.rows.insert(entry.id(), self.current);
    }

    /// Re-render a row in place. Returns false if the entry has no row.
    pub fn update_row(&mut self, entry: &Entry) -> bool {
        let Some(&scope) = self.rows.get(&entry.id()) else {
            return false;
        };
        let row = self.scopes[scope.0].items.iter_mut().find_map(|item| match item {
            Item::Row(row) if row.id == entry.id() => Some(row),
            _ => None,
        });
        match row {
            Some(row) => {
                row.markup = entry.markup().to_string();
                row.text = row_text(entry);
                true
            }
            None => false,
        }
    }

    /// Open a nested list for `owner` and make it current
    pub fn open_scope(&mut self, owner: EntryId, collapsed: bool) {
        let scope = Scope::new(Some(self.current), collapsed);
        let id = match self.free.pop() {
            Some(id) => {
                self.scopes[id.0] = scope;
                id
            }
            None => {
                self.scopes.push(scope);
                ScopeId(self.scopes.len() - 1)
            }
        };
        self.scopes[self.current.0].items.push(Item::Scope(id));
        self.owned.insert(owner, id);
        self.current = id;
    }

    /// Make the parent of the current list current; stays at the root
    pub fn close_scope(&mut self) {
        if let Some(parent) = self.scopes[self.current.0].parent {
            self.current = parent;
        }
    }

    /// Remove an entry's row and, for a group, its nested list with
    /// everything inside it
    pub fn remove_entry(&mut self, id: EntryId) {
        if let Some(scope) = self.rows.remove(&id) {
            self.scopes[scope.0]
                .items
                .retain(|item| !matches!(item, Item::Row(row) if row.id == id));
        }

        if let Some(child) = self.owned.remove(&id) {
            if let Some(parent) = self.scopes[child.0].parent {
                self.scopes[parent.0]
                    .items
                    .retain(|item| !matches!(item, Item::Scope(s) if *s == child));
            }
            self.detach(child);
        }

        if !self.is_attached(self.current) {
            self.current = ScopeId::ROOT;
        }
    }

    fn detach(&mut self, scope: ScopeId) {
        self.scopes[scope.0].attached = false;
        let items = std::mem::take(&mut self.scopes[scope.0].items);
        for item in items {
            match item {
                Item::Row(row) => {
                    self.rows.remove(&row.id);
                }
                Item::Scope(child) => self.detach(child),
            }
        }
        self.owned.retain(|_, s| *s != scope);
        self.free.push(scope);
    }

    /// Slots in the scope arena, live or free
    #[cfg(test)]
    pub(crate) fn arena_len(&self) -> usize {
        self.scopes.len()
    }

    /// Whether a scope is still reachable from the root list
    pub fn is_attached(&self, mut scope: ScopeId) -> bool {
        loop {
            let node = &self.scopes[scope.0];
            if !node.attached {
                return false;
            }
            match node.parent {
                Some(parent) => scope = parent,
                None => return true,
            }
        }
    }

    /// Follow the last nested list of each level, `depth` levels down
    pub fn trailing_scope(&self, depth: usize) -> ScopeId {
        let mut scope = ScopeId::ROOT;
        for _ in 0..depth {
            let last = self.scopes[scope.0].items.iter().rev().find_map(|item| match item {
                Item::Scope(s) => Some(*s),
                Item::Row(_) => None,
            });
            match last {
                Some(s) => scope = s,
                None => break,
            }
        }
        scope
    }

    /// Rows visible to a reader (contents of collapsed groups excluded)
    pub fn visible_rows(&self) -> usize {
        self.count_rows(ScopeId::ROOT)
    }

    fn count_rows(&self, scope: ScopeId) -> usize {
        self.scopes[scope.0]
            .items
            .iter()
            .map(|item| match item {
                Item::Row(_) => 1,
                Item::Scope(s) if self.scopes[s.0].collapsed => 0,
                Item::Scope(s) => self.count_rows(*s),
            })
            .sum()
    }

    /// Ids of rendered rows in document order
    pub fn row_ids(&self) -> Vec<EntryId> {
        let mut ids = Vec::new();
        self.collect_ids(ScopeId::ROOT, &mut ids);
        ids
    }

    fn collect_ids(&self, scope: ScopeId, ids: &mut Vec<EntryId>) {
        for item in &self.scopes[scope.0].items {
            match item {
                Item::Row(row) => ids.push(row.id),
                Item::Scope(s) => self.collect_ids(*s, ids),
            }
        }
    }

    /// Markup of the whole list. Scopes still open are closed.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_markup(ScopeId::ROOT, &mut out);
        out
    }

    fn write_markup(&self, scope: ScopeId, out: &mut String) {
        for item in &self.scopes[scope.0].items {
            match item {
                Item::Row(row) => out.push_str(&row.markup),
                Item::Scope(s) => {
                    if self.scopes[s.0].collapsed {
                        out.push_str(
                            r#"<ul class="console-logs console-group-container console-hidden">"#,
                        );
                    } else {
                        out.push_str(r#"<ul class="console-logs console-group-container">"#);
                    }
                    self.write_markup(*s, out);
                    out.push_str("</ul>");
                }
            }
        }
    }

    /// Indented plain-text outline; collapsed groups hide their contents
    pub fn to_text(&self) -> String {
        let mut lines = Vec::new();
        self.write_text(ScopeId::ROOT, 0, &mut lines);
        lines.join("\n")
    }

    fn write_text(&self, scope: ScopeId, indent: usize, lines: &mut Vec<String>) {
        for item in &self.scopes[scope.0].items {
            match item {
                Item::Row(row) => lines.push(format!("{}{}", "  ".repeat(indent), row.text)),
                Item::Scope(s) if self.scopes[s.0].collapsed => {}
                Item::Scope(s) => self.write_text(*s, indent + 1, lines),
            }
        }
    }
}

fn row_text(entry: &Entry) -> String {
    let marker = match entry.kind() {
        EntryKind::Input => "> ",
        EntryKind::Output => "< ",
        EntryKind::Warn => "[warn] ",
        EntryKind::Error => "[error] ",
        EntryKind::Group => "v ",
        EntryKind::GroupCollapsed => "> ",
        _ => "",
    };
    let body = match entry.kind() {
        EntryKind::Html => stripped_text(&entry.text()),
        _ => entry.text(),
    };
    if entry.count() > 1 {
        format!("{}({}) {}", marker, entry.count(), body)
    } else {
        format!("{}{}", marker, body)
    }
}

/// Scroll state of the output. `offset` is the first visible row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    height: usize,
    offset: usize,
    rows: usize,
}

impl Viewport {
    pub fn new(height: usize) -> Self {
        Self {
            height: height.max(1),
            offset: 0,
            rows: 0,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    fn max_offset(&self) -> usize {
        self.rows.saturating_sub(self.height)
    }

    /// Whether the last row is in view
    pub fn is_at_bottom(&self) -> bool {
        self.offset >= self.max_offset()
    }

    pub fn scroll_to_bottom(&mut self) {
        self.offset = self.max_offset();
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.offset = self.offset.saturating_sub(n);
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.offset = (self.offset + n).min(self.max_offset());
    }

    /// Track a new row count without moving, unless rows vanished
    fn sync(&mut self, rows: usize) {
        self.rows = rows;
        self.offset = self.offset.min(self.max_offset());
    }
}

/// Sole writer of the output: keeps the scope tree and viewport in step
/// with the log store
#[derive(Clone, Debug)]
pub struct Renderer {
    tree: ScopeTree,
    viewport: Viewport,
}

impl Renderer {
    pub fn new(viewport_height: usize) -> Self {
        Self {
            tree: ScopeTree::new(),
            viewport: Viewport::new(viewport_height),
        }
    }

    pub fn tree(&self) -> &ScopeTree {
        &self.tree
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn is_at_bottom(&self) -> bool {
        self.viewport.is_at_bottom()
    }

    pub fn scroll_to_bottom(&mut self) {
        self.viewport.scroll_to_bottom();
    }

    /// Append one row to the current scope
    pub fn append(&mut self, entry: &Entry) {
        self.tree.append_row(entry);
        self.sync();
    }

    /// Re-render a row whose counter or time changed, appending it if it
    /// had no row yet
    pub fn refresh(&mut self, entry: &Entry) {
        if !self.tree.update_row(entry) {
            self.append(entry);
        }
    }

    /// Drop the row of a single entry
    pub fn remove(&mut self, entry: &Entry) {
        self.tree.remove_entry(entry.id());
        self.sync();
    }

    /// Open the nested list for a group entry
    pub fn open_group(&mut self, entry: &Entry) {
        self.tree
            .open_scope(entry.id(), entry.kind() == EntryKind::GroupCollapsed);
    }

    pub fn close_group(&mut self) {
        self.tree.close_scope();
    }

    /// Remove rows of evicted entries; falls back to the root list when the
    /// current list went with them
    pub fn evict<'a, I>(&mut self, evicted: I)
    where
        I: IntoIterator<Item = &'a Entry>,
    {
        for entry in evicted {
            self.tree.remove_entry(entry.id());
        }
        self.sync();
    }

    /// Render `entries` from scratch through `filter`. Group markers always
    /// shape the nesting; only their header rows are filtered.
    pub fn rebuild<'a, I>(&mut self, entries: I, filter: &Filter)
    where
        I: IntoIterator<Item = &'a Entry>,
    {
        let mut tree = ScopeTree::new();
        let mut open = 0usize;

        for entry in entries {
            let kind = entry.kind();
            if kind == EntryKind::GroupEnd {
                if open > 0 {
                    tree.close_scope();
                    open -= 1;
                }
                continue;
            }

            if filter.matches(entry) {
                tree.append_row(entry);
            }
            if kind.is_group_start() {
                tree.open_scope(entry.id(), kind == EntryKind::GroupCollapsed);
                open += 1;
            }
        }

        tree.current = tree.trailing_scope(open);
        self.tree = tree;
        self.sync();
        self.viewport.scroll_to_bottom();

        debug!(
            rows = self.tree.visible_rows(),
            open_groups = open,
            "rebuilt output"
        );
    }

    /// Empty output pointing at the root list
    pub fn reset(&mut self) {
        self.tree.reset();
        self.sync();
        self.viewport.scroll_to_bottom();
    }

    pub fn markup(&self) -> String {
        self.tree.to_markup()
    }

    pub fn text(&self) -> String {
        self.tree.to_text()
    }

    fn sync(&mut self) {
        self.viewport.sync(self.tree.visible_rows());
    }
}
