//! Event handler registry for wiring callbacks to simulated UI events.
//!
//! A component registers a handler while rendering and keeps the returned
//! [`EventHandlerId`] in a ref; the embedding application (or a test)
//! dispatches events to that id between renders. Thread-local, like the
//! instance runtime.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// Unique identifier for a registered event handler.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct EventHandlerId(usize);

impl fmt::Display for EventHandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An erased event handler. Wrap a [`BoxedCallback`](crate::BoxedCallback)
/// invocation in one of these to connect it to an event source.
pub type EventCallback = Box<dyn Fn() + 'static>;

struct EventRegistry {
    handlers: HashMap<EventHandlerId, Rc<dyn Fn() + 'static>>,
    next_id: usize,
}

impl EventRegistry {
    fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            next_id: 0,
        }
    }
}

thread_local! {
    static EVENT_REGISTRY: RefCell<EventRegistry> = RefCell::new(EventRegistry::new());
}

/// Register an event handler and return its id.
pub fn register_handler(callback: EventCallback) -> EventHandlerId {
    EVENT_REGISTRY.with(|registry| {
        let mut registry = registry.borrow_mut();
        let id = EventHandlerId(registry.next_id);
        registry.next_id += 1;
        registry.handlers.insert(id, Rc::from(callback));
        trace!(handler = %id, "handler registered");
        id
    })
}

/// Remove a handler. Returns `true` if it was registered.
pub fn remove_handler(id: EventHandlerId) -> bool {
    EVENT_REGISTRY.with(|registry| registry.borrow_mut().handlers.remove(&id).is_some())
}

/// Dispatch an event to the handler with the given id.
///
/// Returns `true` if a handler was found and called. The handler runs
/// outside the registry borrow, so it may register or remove handlers
/// itself.
pub fn dispatch_event(id: EventHandlerId) -> bool {
    let handler = EVENT_REGISTRY.with(|registry| registry.borrow().handlers.get(&id).cloned());

    match handler {
        Some(handler) => {
            handler();
            true
        }
        None => {
            debug!(handler = %id, "dispatch to unknown handler");
            false
        }
    }
}

/// Clear all registered handlers and reset id assignment.
pub fn clear_handlers() {
    EVENT_REGISTRY.with(|registry| {
        *registry.borrow_mut() = EventRegistry::new();
    });
}

/// The number of registered handlers.
pub fn handler_count() -> usize {
    EVENT_REGISTRY.with(|registry| registry.borrow().handlers.len())
}
