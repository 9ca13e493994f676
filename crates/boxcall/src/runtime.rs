//! Component-instance runtime: render lifecycle and dirty tracking.
//!
//! The runtime supplies the two capabilities hooks depend on: persistent
//! per-instance storage (a [`HookRegistry`](crate::hooks) per instance) and a
//! render stack so hooks know which instance is currently being rendered.
//! Nested renders of *different* instances are allowed (a parent rendering a
//! memoized child); re-entering a render of the same instance is an error.
//!
//! There is no scheduler. State setters only mark an instance dirty; the
//! embedding application drains [`take_dirty`] and calls [`render_instance`]
//! again in its own loop.

use crate::hooks::HookRegistry;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, trace};

/// Unique identifier for a component instance.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct InstanceId(usize);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors from the instance runtime.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuntimeError {
    /// The instance was never created, or has been disposed.
    #[error("unknown component instance {0}")]
    UnknownInstance(InstanceId),
    /// A render of this instance is already on the render stack.
    #[error("render already in progress for component instance {0}")]
    RenderInProgress(InstanceId),
}

struct Runtime {
    /// Hook storage per live instance.
    registries: HashMap<InstanceId, HookRegistry>,
    /// Instances currently being rendered, outermost first.
    render_stack: Vec<InstanceId>,
    /// Instances whose state changed since their last render.
    /// Order-preserving, deduplicated.
    dirty: Vec<InstanceId>,
    next_id: usize,
}

impl Runtime {
    fn new() -> Self {
        Self {
            registries: HashMap::new(),
            render_stack: Vec::new(),
            dirty: Vec::new(),
            next_id: 0,
        }
    }
}

thread_local! {
    static RUNTIME: RefCell<Runtime> = RefCell::new(Runtime::new());
}

/// Create a new component instance with empty hook storage.
pub fn create_instance() -> InstanceId {
    RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        let id = InstanceId(rt.next_id);
        rt.next_id += 1;
        rt.registries.insert(id, HookRegistry::new());
        trace!(instance = %id, "instance created");
        id
    })
}

/// Dispose of an instance, dropping its hook storage and dirty flag.
pub fn dispose_instance(id: InstanceId) {
    RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        rt.registries.remove(&id);
        rt.dirty.retain(|d| *d != id);
        trace!(instance = %id, "instance disposed");
    });
}

/// Run `f` as one render (invocation cycle) of `id`.
///
/// Hooks called inside `f` are served from this instance's registry, in call
/// order. The registry validates on completion that the hook count matches
/// the previous render. The instance's dirty flag is cleared when the render
/// begins.
pub fn render_instance<R>(id: InstanceId, f: impl FnOnce() -> R) -> Result<R, RuntimeError> {
    RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        if rt.render_stack.contains(&id) {
            return Err(RuntimeError::RenderInProgress(id));
        }
        let registry = rt
            .registries
            .get_mut(&id)
            .ok_or(RuntimeError::UnknownInstance(id))?;
        registry.begin_render();
        rt.dirty.retain(|d| *d != id);
        rt.render_stack.push(id);
        Ok(())
    })?;

    trace!(instance = %id, "render begin");
    let result = f();
    trace!(instance = %id, "render end");

    RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        rt.render_stack.pop();
        // The registry can only have vanished if f disposed its own instance.
        if let Some(registry) = rt.registries.get_mut(&id) {
            registry.end_render();
        }
    });

    Ok(result)
}

/// Mark an instance as needing a re-render.
///
/// Unknown instances are ignored: a setter may outlive the instance that
/// created it.
pub fn mark_dirty(id: InstanceId) {
    RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        if !rt.registries.contains_key(&id) {
            debug!(instance = %id, "mark_dirty on disposed instance, ignoring");
            return;
        }
        if !rt.dirty.contains(&id) {
            rt.dirty.push(id);
        }
    });
}

/// Drain the instances marked dirty since the last drain, in marking order.
pub fn take_dirty() -> Vec<InstanceId> {
    RUNTIME.with(|rt| std::mem::take(&mut rt.borrow_mut().dirty))
}

/// The instance currently being rendered, if any.
pub fn current_instance() -> Option<InstanceId> {
    RUNTIME.with(|rt| rt.borrow().render_stack.last().copied())
}

/// Drop all runtime state (instances, dirty flags, render stack).
///
/// For tests and app restart.
pub fn clear() {
    RUNTIME.with(|rt| {
        *rt.borrow_mut() = Runtime::new();
    });
}

/// Run `f` against the hook registry of the instance on top of the render
/// stack. Panics if no render is in progress — hooks are only valid during
/// a render.
pub(crate) fn with_current_registry<R>(
    hook_type: &'static str,
    f: impl FnOnce(&mut HookRegistry) -> R,
) -> R {
    RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        let Some(&id) = rt.render_stack.last() else {
            panic!(
                "\n\n\x1b[1;31mboxcall hooks error: `{}` called outside of render!\x1b[0m\n\
                Hooks can only be called while a component instance is rendering.\n\
                Make sure you're not calling hooks in:\n\
                - Event handlers\n\
                - Async callbacks\n\
                - Static initializers\n",
                hook_type
            );
        };
        let registry = rt
            .registries
            .get_mut(&id)
            .expect("rendering instance has no registry - this is a bug in boxcall");
        f(registry)
    })
}
