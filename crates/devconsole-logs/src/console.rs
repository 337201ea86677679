use std::collections::HashMap;
use std::time::Instant;

use serde_json::json;
use tracing::{debug, warn};

use devconsole_types::{Entry, EntryId, EntryKind, EntryOptions, LogValue, escape_html};

use crate::buffer::{Insertion, LogStore, MaxEntries};
use crate::command::{Command, ConsoleInput, help_markup};
use crate::error::LoadError;
use crate::eval::{Evaluator, JsonEvaluator};
use crate::events::{ConsoleEvent, EventBus, EventKind, ListenerId};
use crate::filter::Filter;
use crate::loader::{HelperLoader, LoadOutcome};
use crate::render::Renderer;

/// Default number of rows in view
const DEFAULT_VIEWPORT_HEIGHT: usize = 40;

/// Console settings
#[derive(Clone, Copy, Debug)]
pub struct ConsoleConfig {
    pub max_entries: MaxEntries,
    pub display_header: bool,
    pub viewport_height: usize,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            max_entries: MaxEntries::Unbounded,
            display_header: false,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
        }
    }
}

/// The log list of a developer console: records entries, keeps the
/// rendered output in step and notifies observers
pub struct Console {
    store: LogStore,
    renderer: Renderer,
    filter: Filter,
    events: EventBus,

    /// Running totals for `count`
    counters: HashMap<String, u64>,

    /// Start instants for `time`
    timers: HashMap<String, Instant>,

    display_header: bool,

    /// Whether the panel is visible; hidden panels record without rendering
    active: bool,

    started: Instant,
    evaluator: Box<dyn Evaluator>,
    loader: Option<Box<dyn HelperLoader>>,
}

impl Default for Console {
    fn default() -> Self {
        Self::new(ConsoleConfig::default())
    }
}

impl Console {
    pub fn new(config: ConsoleConfig) -> Self {
        Self {
            store: LogStore::new(config.max_entries),
            renderer: Renderer::new(config.viewport_height),
            filter: Filter::All,
            events: EventBus::new(),
            counters: HashMap::new(),
            timers: HashMap::new(),
            display_header: config.display_header,
            active: true,
            started: Instant::now(),
            evaluator: Box::new(JsonEvaluator),
            loader: None,
        }
    }

    /// Replace the evaluator used for plain input
    pub fn with_evaluator(mut self, evaluator: impl Evaluator + 'static) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    pub fn with_loader(mut self, loader: impl HelperLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Whether entries created from now on show a header
    pub fn display_header(&mut self, flag: bool) -> &mut Self {
        self.display_header = flag;
        self
    }

    /// Change the retention limit; shrinking trims and re-renders
    pub fn max_entries(&mut self, max_entries: MaxEntries) -> &mut Self {
        let eviction = self.store.set_max_entries(max_entries);
        if !eviction.is_empty() {
            self.render();
        }
        self
    }

    /// Show or hide the panel. Showing it re-renders everything recorded
    /// while hidden.
    pub fn set_active(&mut self, active: bool) -> &mut Self {
        let was_active = self.active;
        self.active = active;
        if active && !was_active {
            self.render();
        }
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    pub fn on<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(&ConsoleEvent<'_>) + 'static,
    {
        self.events.on(kind, listener)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    // ------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------

    /// Record an entry and append it to the output. Returns the id of the
    /// stored entry, which is the previous one when the entry repeated it.
    pub fn insert(&mut self, mut options: EntryOptions) -> EntryId {
        let at_bottom = self.renderer.is_at_bottom();

        options.id = self.store.next_id();
        options.display_header = self.display_header;
        if self.display_header && options.time.is_none() {
            options.time = Some(self.started.elapsed());
        }

        let report = self.store.insert(Entry::new(options));
        if report.insertion == Insertion::Dropped {
            return report.id;
        }

        if !report.eviction.is_empty() {
            self.renderer.evict(&report.eviction.evicted);
        }

        if report.self_evicted() {
            // nothing left to render; observers still hear about it
            if let Some(entry) = report.eviction.evicted.iter().find(|e| e.id() == report.id) {
                self.events.emit(&ConsoleEvent::Insert(entry));
            }
            return report.id;
        }

        let Some(entry) = self.store.get(report.id) else {
            return report.id;
        };

        if report.kind == EntryKind::GroupEnd {
            self.renderer.close_group();
        } else {
            match report.insertion {
                // the count badge is part of the filtered text
                Insertion::Repeated if self.active && self.filter.matches(entry) => {
                    self.renderer.refresh(entry)
                }
                Insertion::Repeated => self.renderer.remove(entry),
                _ => {
                    if self.active && self.filter.matches(entry) {
                        self.renderer.append(entry);
                    }
                    if report.kind.is_group_start() {
                        self.renderer.open_group(entry);
                    }
                }
            }
        }

        self.events.emit(&ConsoleEvent::Insert(entry));

        if at_bottom {
            self.renderer.scroll_to_bottom();
        }

        report.id
    }

    fn insert_args(&mut self, kind: EntryKind, args: Vec<LogValue>) -> &mut Self {
        self.insert(EntryOptions::new(kind, args));
        self
    }

    pub fn log(&mut self, args: Vec<LogValue>) -> &mut Self {
        self.insert_args(EntryKind::Log, args)
    }

    pub fn info(&mut self, args: Vec<LogValue>) -> &mut Self {
        self.insert_args(EntryKind::Info, args)
    }

    pub fn warn(&mut self, args: Vec<LogValue>) -> &mut Self {
        self.insert_args(EntryKind::Warn, args)
    }

    pub fn error(&mut self, args: Vec<LogValue>) -> &mut Self {
        self.insert_args(EntryKind::Error, args)
    }

    pub fn debug(&mut self, args: Vec<LogValue>) -> &mut Self {
        self.insert_args(EntryKind::Debug, args)
    }

    pub fn dir(&mut self, args: Vec<LogValue>) -> &mut Self {
        self.insert_args(EntryKind::Dir, args)
    }

    pub fn table(&mut self, args: Vec<LogValue>) -> &mut Self {
        self.insert_args(EntryKind::Table, args)
    }

    /// Open an expanded group
    pub fn group(&mut self, mut args: Vec<LogValue>) -> &mut Self {
        if args.is_empty() {
            args.push(json!("console.group"));
        }
        self.insert_args(EntryKind::Group, args)
    }

    /// Open a group that starts collapsed
    pub fn group_collapsed(&mut self, mut args: Vec<LogValue>) -> &mut Self {
        if args.is_empty() {
            args.push(json!("console.groupCollapsed"));
        }
        self.insert_args(EntryKind::GroupCollapsed, args)
    }

    pub fn group_end(&mut self) -> &mut Self {
        self.insert_args(EntryKind::GroupEnd, Vec::new())
    }

    /// Record an error when `condition` is false; otherwise do nothing
    pub fn assert(&mut self, condition: bool, mut args: Vec<LogValue>) -> &mut Self {
        if condition {
            return self;
        }
        args.insert(0, json!("Assertion failed: "));
        self.insert(EntryOptions::new(EntryKind::Error, args).ignoring_filter());
        self
    }

    /// Record raw markup
    pub fn html(&mut self, markup: impl Into<String>) -> &mut Self {
        self.insert_args(EntryKind::Html, vec![LogValue::String(markup.into())])
    }

    /// Record an evaluation result
    pub fn output(&mut self, value: LogValue) -> &mut Self {
        self.insert(EntryOptions::new(EntryKind::Output, vec![value]).ignoring_filter());
        self
    }

    /// Record the command help listing
    pub fn help(&mut self) -> &mut Self {
        let markup = LogValue::String(help_markup());
        self.insert(EntryOptions::new(EntryKind::Html, vec![markup]).ignoring_filter());
        self
    }

    /// Count calls per label and show the running total
    pub fn count(&mut self, label: &str) -> &mut Self {
        let count = self.counters.entry(label.to_string()).or_insert(0);
        *count += 1;
        let markup = format!(
            r#"<div class="console-blue">{}: {}</div>"#,
            escape_html(label),
            count
        );
        self.html(markup)
    }

    /// Start a named timer
    pub fn time(&mut self, name: &str) -> &mut Self {
        self.timers.insert(name.to_string(), Instant::now());
        self
    }

    /// Stop a named timer and show the elapsed time. Unknown names are
    /// ignored.
    pub fn time_end(&mut self, name: &str) -> &mut Self {
        let Some(start) = self.timers.remove(name) else {
            return self;
        };
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        let markup = format!(
            r#"<div class="console-blue">{}: {:.3}ms</div>"#,
            escape_html(name),
            elapsed_ms
        );
        self.html(markup)
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    /// Handle a line typed into the console
    pub fn input(&mut self, raw: &str) -> &mut Self {
        match ConsoleInput::parse(raw) {
            ConsoleInput::Command(cmd) => self.run_command(cmd),
            ConsoleInput::FilterSet(filter) => self.filter(filter),
            ConsoleInput::InvalidFilter(e) => {
                warn!(error = %e, "filter rejected");
                self.insert(
                    EntryOptions::new(EntryKind::Error, vec![json!(format!("Invalid filter: {}", e))])
                        .ignoring_filter(),
                );
                self
            }
            ConsoleInput::Evaluate(code) => {
                self.insert(EntryOptions::new(EntryKind::Input, vec![json!(code)]).ignoring_filter());

                match self.evaluator.eval(&code) {
                    Ok(value) => self.output(value),
                    Err(e) => {
                        debug!(error = %e, "evaluation failed");
                        self.insert(
                            EntryOptions::new(EntryKind::Error, vec![json!(e.to_string())])
                                .ignoring_filter(),
                        );
                        self
                    }
                }
            }
        }
    }

    fn run_command(&mut self, cmd: Command) -> &mut Self {
        match cmd {
            Command::Load(name) => match self.loader.as_mut() {
                Some(loader) => {
                    debug!(name, "loading helper library");
                    loader.load(name);
                    self
                }
                None => self.finish_load(LoadOutcome::failed(name, LoadError::NoLoader)),
            },
            Command::Unknown(cmd) => {
                warn!(command = %cmd, "unknown console command");
                self.warn(vec![json!("Unknown command")]).help()
            }
        }
    }

    /// Report a helper library load that completed
    pub fn finish_load(&mut self, outcome: LoadOutcome) -> &mut Self {
        match outcome.result {
            Ok(()) => self.log(vec![json!(format!("{} is loaded", outcome.name))]),
            Err(e) => {
                warn!(name = %outcome.name, error = %e, "helper library failed to load");
                self.warn(vec![json!(format!("Failed to load {}", outcome.name))])
            }
        }
    }

    // ------------------------------------------------------------------
    // Filtering and rendering
    // ------------------------------------------------------------------

    /// Replace the active filter and re-render
    pub fn filter(&mut self, filter: Filter) -> &mut Self {
        debug!(?filter, "filter changed");
        self.filter = filter;
        self.events.emit(&ConsoleEvent::Filter(&self.filter));
        self.render()
    }

    pub fn active_filter(&self) -> &Filter {
        &self.filter
    }

    /// Re-render the whole output from the store
    pub fn render(&mut self) -> &mut Self {
        self.renderer.rebuild(self.store.entries(), &self.filter);
        self
    }

    /// Drop every entry and reset the output to an empty root list
    pub fn clear(&mut self) -> &mut Self {
        self.store.clear();
        self.renderer.reset();
        self.render()
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Look up an entry by id, e.g. for a click on its rendered row
    pub fn entry(&self, id: EntryId) -> Option<&Entry> {
        self.store.get(id)
    }

    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &Entry> + ExactSizeIterator {
        self.store.entries()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn group_depth(&self) -> usize {
        self.store.group_depth()
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Scroll the output; used by hosts that let readers page back
    pub fn scroll_up(&mut self, rows: usize) -> &mut Self {
        self.renderer.viewport_mut().scroll_up(rows);
        self
    }

    pub fn scroll_down(&mut self, rows: usize) -> &mut Self {
        self.renderer.viewport_mut().scroll_down(rows);
        self
    }

    /// Current output markup
    pub fn markup(&self) -> String {
        self.renderer.markup()
    }

    /// Current output as an indented text outline
    pub fn text(&self) -> String {
        self.renderer.text()
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("entries", &self.store.len())
            .field("max_entries", &self.store.max_entries())
            .field("filter", &self.filter)
            .field("active", &self.active)
            .field("events", &self.events)
            .finish()
    }
}
