use std::collections::HashMap;

use devconsole_types::Entry;

use crate::filter::Filter;

/// Kinds of notifications a console emits
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Insert,
    Filter,
}

/// A notification, fired synchronously after the state change
#[derive(Clone, Copy, Debug)]
pub enum ConsoleEvent<'a> {
    /// An entry was inserted, or its repeat counter grew
    Insert(&'a Entry),
    /// The active filter was replaced
    Filter(&'a Filter),
}

impl ConsoleEvent<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Insert(_) => EventKind::Insert,
            Self::Filter(_) => EventKind::Filter,
        }
    }
}

/// Handle returned by [`EventBus::on`], used to unsubscribe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&ConsoleEvent<'_>)>;

/// Typed listener registry
#[derive(Default)]
pub struct EventBus {
    listeners: HashMap<EventKind, Vec<(ListenerId, Listener)>>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one kind of event
    pub fn on<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(&ConsoleEvent<'_>) + 'static,
    {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners
            .entry(kind)
            .or_default()
            .push((id, Box::new(listener)));
        id
    }

    /// Unsubscribe; returns false if the listener was not registered
    pub fn off(&mut self, id: ListenerId) -> bool {
        for listeners in self.listeners.values_mut() {
            if let Some(pos) = listeners.iter().position(|(lid, _)| *lid == id) {
                drop(listeners.remove(pos));
                return true;
            }
        }
        false
    }

    /// Call every listener of the event's kind, in subscription order
    pub fn emit(&mut self, event: &ConsoleEvent<'_>) {
        if let Some(listeners) = self.listeners.get_mut(&event.kind()) {
            for (_, listener) in listeners.iter_mut() {
                listener(event);
            }
        }
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.get(&kind).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("insert", &self.listener_count(EventKind::Insert))
            .field("filter", &self.listener_count(EventKind::Filter))
            .finish()
    }
}
