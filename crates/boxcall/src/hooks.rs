//! Hooks: persistent per-instance storage and the boxed-callback hook.
//!
//! Hooks let a component function keep state across renders without owning a
//! state struct. Each component instance has a registry of slots; a hook
//! claims the next slot every time it is called, so hooks are identified by
//! their position in the call sequence.
//!
//! # Quick start
//!
//! ```ignore
//! use boxcall::{runtime, use_boxed_callback, use_state};
//!
//! let app = runtime::create_instance();
//!
//! runtime::render_instance(app, || {
//!     let (clicks, set_clicks) = use_state(|| 0);
//!
//!     // Stable identity across renders, always-fresh `clicks`.
//!     let on_click = use_boxed_callback(move |_event: (), ()| {
//!         set_clicks.set(clicks + 1);
//!     }, ());
//!
//!     // Hand `on_click` to a memoized child: it will never re-render
//!     // because of this prop.
//! })?;
//! ```
//!
//! # Rules of hooks
//!
//! Hooks must be called in the **exact same order** on every render of an
//! instance. Never call a hook:
//!
//! - inside a conditional or a loop with varying iterations,
//! - after an early return,
//! - outside of a render (event handlers, async callbacks).
//!
//! The registry panics with a diagnostic message when it detects a count or
//! order mismatch between renders, or a hook call outside of any render.

use crate::callback::{BoxedCallback, CallBox};
use crate::runtime::{self, with_current_registry, InstanceId};
use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

// ============================================================================
// Hook registry
// ============================================================================

/// Metadata about a registered hook, for diagnostics.
#[derive(Debug, Clone)]
pub struct HookMeta {
    /// The hook function name (e.g. "use_ref", "use_boxed_callback").
    pub hook_type: &'static str,
    /// The stored value type (from `std::any::type_name`).
    pub value_type: &'static str,
}

/// One slot: the value cell plus its metadata.
struct HookEntry {
    slot: Box<dyn Any>,
    meta: HookMeta,
}

/// Per-instance hook storage, indexed by call order.
pub(crate) struct HookRegistry {
    hooks: Vec<HookEntry>,
    /// Next slot to serve during the current render.
    current_index: usize,
    /// Hook count observed by the previous render.
    expected_count: Option<usize>,
    render_count: usize,
}

impl HookRegistry {
    pub(crate) fn new() -> Self {
        Self {
            hooks: Vec::new(),
            current_index: 0,
            expected_count: None,
            render_count: 0,
        }
    }

    pub(crate) fn begin_render(&mut self) {
        self.current_index = 0;
    }

    pub(crate) fn end_render(&mut self) {
        if let Some(expected) = self.expected_count
            && self.current_index != expected
        {
            panic!(
                "\n\n\x1b[1;31mboxcall hooks error: Hook count mismatch!\x1b[0m\n\
                Previous render had {} hooks, current render has {} hooks.\n\
                Render number: {}\n\n\
                This usually happens when:\n\
                - A hook is called inside a conditional (if/match)\n\
                - A hook is called inside a loop with varying iterations\n\
                - A hook is called inside an early return\n\n\
                Hooks must be called in the exact same order every render.\n",
                expected, self.current_index, self.render_count
            );
        }

        self.expected_count = Some(self.current_index);
        self.render_count += 1;
    }

    /// Serve the slot at the current index, creating it on the first render.
    ///
    /// The slot is an `Rc<RefCell<T>>` so hooks can hand out handles that
    /// outlive the registry borrow; the stored value itself never needs to
    /// be `Clone`.
    pub(crate) fn use_slot<T: 'static>(
        &mut self,
        hook_type: &'static str,
        init: impl FnOnce() -> T,
    ) -> Rc<RefCell<T>> {
        let index = self.current_index;
        self.current_index += 1;

        if index < self.hooks.len() {
            let entry = &self.hooks[index];

            if entry.meta.hook_type != hook_type {
                panic!(
                    "\n\n\x1b[1;31mboxcall hooks error: Hook order mismatch at index {}!\x1b[0m\n\
                    Previous render: `{}`\n\
                    Current render: `{}`\n\n\
                    Hooks must be called in the exact same order every render.\n",
                    index, entry.meta.hook_type, hook_type
                );
            }

            entry
                .slot
                .downcast_ref::<Rc<RefCell<T>>>()
                .expect("hook slot type mismatch - this is a bug in boxcall")
                .clone()
        } else {
            let slot = Rc::new(RefCell::new(init()));
            self.hooks.push(HookEntry {
                slot: Box::new(Rc::clone(&slot)),
                meta: HookMeta {
                    hook_type,
                    value_type: std::any::type_name::<T>(),
                },
            });
            slot
        }
    }

    fn meta(&self) -> Vec<HookMeta> {
        self.hooks.iter().map(|entry| entry.meta.clone()).collect()
    }
}

/// Metadata for every hook registered on the instance currently rendering.
///
/// Panics outside of a render.
pub fn hooks_debug_info() -> Vec<HookMeta> {
    with_current_registry("hooks_debug_info", |registry| registry.meta())
}

// ============================================================================
// use_ref
// ============================================================================

/// Create or retrieve a mutable cell that persists across renders.
///
/// Mutating a ref never marks the instance dirty. The initializer runs only
/// on the first render; the stored value does not need to be `Clone`.
///
/// # Example
///
/// ```ignore
/// let render_count = use_ref(|| 0);
/// *render_count.borrow_mut() += 1;
/// ```
pub fn use_ref<T: 'static>(init: impl FnOnce() -> T) -> RefHandle<T> {
    let inner = with_current_registry("use_ref", |registry| registry.use_slot("use_ref", init));
    RefHandle { inner }
}

/// Handle to a cell created by [`use_ref`].
pub struct RefHandle<T> {
    inner: Rc<RefCell<T>>,
}

impl<T> RefHandle<T> {
    /// Borrow the current value.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.inner.borrow()
    }

    /// Mutably borrow the current value.
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.inner.borrow_mut()
    }

    /// Replace the value.
    pub fn set(&self, value: T) {
        *self.inner.borrow_mut() = value;
    }
}

impl<T: Clone> RefHandle<T> {
    /// Clone out the current value.
    pub fn get(&self) -> T {
        self.inner.borrow().clone()
    }
}

impl<T> Clone for RefHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

// ============================================================================
// use_memo
// ============================================================================

struct MemoState<T, D> {
    value: Option<T>,
    deps: Option<D>,
}

/// Memoize a computation on explicit dependencies.
///
/// `compute` runs on the first render and whenever `deps` differ from the
/// previous render; otherwise the cached value is returned.
pub fn use_memo<T, F, D>(compute: F, deps: D) -> T
where
    T: Clone + 'static,
    F: FnOnce() -> T,
    D: PartialEq + 'static,
{
    let state = with_current_registry("use_memo", |registry| {
        registry.use_slot("use_memo", || MemoState::<T, D> {
            value: None,
            deps: None,
        })
    });
    let mut state = state.borrow_mut();

    let stale = match &state.deps {
        None => true,
        Some(old) => old != &deps,
    };

    if stale {
        let value = compute();
        state.value = Some(value.clone());
        state.deps = Some(deps);
        value
    } else {
        state
            .value
            .clone()
            .expect("memoized value missing after first compute - this is a bug in boxcall")
    }
}

// ============================================================================
// use_state
// ============================================================================

/// Create or retrieve a state value plus a setter.
///
/// The value is read at render time. Calling the setter overwrites the slot
/// and marks the owning instance dirty; it never renders anything itself —
/// the embedding application drains [`runtime::take_dirty`] and re-renders.
///
/// # Example
///
/// ```ignore
/// let (clicks, set_clicks) = use_state(|| 0);
/// // later, from an event handler:
/// set_clicks.set(clicks + 1);
/// ```
pub fn use_state<T: Clone + 'static>(init: impl FnOnce() -> T) -> (T, StateSetter<T>) {
    let slot = with_current_registry("use_state", |registry| registry.use_slot("use_state", init));
    let instance = runtime::current_instance()
        .expect("render stack empty after hook access - this is a bug in boxcall");
    let value = slot.borrow().clone();
    (value, StateSetter { slot, instance })
}

/// Setter half of [`use_state`]. Cloneable into event callbacks.
pub struct StateSetter<T> {
    slot: Rc<RefCell<T>>,
    instance: InstanceId,
}

impl<T> StateSetter<T> {
    /// Store a new value and mark the owning instance dirty.
    pub fn set(&self, value: T) {
        *self.slot.borrow_mut() = value;
        runtime::mark_dirty(self.instance);
    }
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
            instance: self.instance,
        }
    }
}

// ============================================================================
// use_boxed_callback
// ============================================================================

/// Wrap a callback so consumers get a stable identity with always-fresh
/// contents.
///
/// On every render this overwrites, in place, a persistent [`CallBox`]
/// holding the current `callback` and trailing `args`; the returned
/// [`BoxedCallback`] is memoized on the cell's identity, so it compares
/// equal across renders for the lifetime of the instance. Invoking the
/// handle forwards the call-time parameter first and the *current* trailing
/// arguments after it, to the *current* callback.
///
/// Use a tuple for several call-time parameters, and `()` for no trailing
/// arguments. No validation is performed on either.
///
/// # Example
///
/// ```ignore
/// let (clicks, set_clicks) = use_state(|| 0);
///
/// // `clicks` is boxed as a trailing argument: the callback always sees
/// // the value from the most recent render, never a stale capture.
/// let on_click = use_boxed_callback(move |_event: (), current: i32| {
///     set_clicks.set(current + 1);
/// }, clicks);
/// ```
pub fn use_boxed_callback<P, A, R, F>(callback: F, args: A) -> BoxedCallback<P, A, R>
where
    F: FnMut(P, A) -> R + 'static,
    P: 'static,
    A: Clone + 'static,
    R: 'static,
{
    let mut fresh = Some(CallBox::new(callback, args));

    let cell = with_current_registry("use_boxed_callback", |registry| {
        registry.use_slot("use_boxed_callback", || {
            fresh
                .take()
                .expect("boxed-callback initializer ran twice - this is a bug in boxcall")
        })
    });

    // First render: the initializer consumed `fresh` and the cell is already
    // current. Every later render: overwrite both fields in place.
    if let Some(fresh) = fresh.take() {
        cell.borrow_mut().refresh(fresh);
    }

    let key = Rc::as_ptr(&cell) as usize;
    use_memo(move || BoxedCallback::from_cell(cell), key)
}

// ============================================================================
// use_memo_child
// ============================================================================

/// Render a child component instance only when its props change.
///
/// The child gets its own instance (and hook registry) created on the first
/// render and kept for the parent's lifetime. On every parent render the
/// props are compared against the previous render's props with `PartialEq`;
/// the child renders only when they differ. For [`BoxedCallback`] props that
/// comparison is pointer equality, so a child whose only prop is a boxed
/// callback renders exactly once.
///
/// Returns the child's [`InstanceId`] so the embedding application can
/// re-render or dispose it directly.
pub fn use_memo_child<P, F>(props: P, render: F) -> InstanceId
where
    P: PartialEq + 'static,
    F: FnOnce(&P),
{
    let child_slot = with_current_registry("use_memo_child", |registry| {
        registry.use_slot("use_memo_child", || ChildState::<P> {
            instance: None,
            props: None,
        })
    });

    // Created lazily outside the registry borrow: creating an instance
    // touches the runtime.
    let child_id = {
        let mut state = child_slot.borrow_mut();
        match state.instance {
            Some(id) => id,
            None => {
                let id = runtime::create_instance();
                state.instance = Some(id);
                id
            }
        }
    };

    let changed = child_slot.borrow().props.as_ref() != Some(&props);
    if changed {
        runtime::render_instance(child_id, || render(&props))
            .expect("memoized child instance is live and not mid-render");
        child_slot.borrow_mut().props = Some(props);
    }

    child_id
}

struct ChildState<P> {
    instance: Option<InstanceId>,
    props: Option<P>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{clear, create_instance, render_instance, take_dirty};
    use std::cell::Cell;

    #[test]
    fn use_ref_persists_across_renders() {
        clear();
        let id = create_instance();

        render_instance(id, || {
            let cell = use_ref(|| 0);
            *cell.borrow_mut() = 42;
        })
        .unwrap();

        let value = render_instance(id, || {
            let cell = use_ref(|| 0); // init ignored
            *cell.borrow()
        })
        .unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn use_ref_accepts_non_clone_values() {
        struct Opaque(#[allow(dead_code)] Box<dyn FnMut()>);

        clear();
        let id = create_instance();
        render_instance(id, || {
            let cell = use_ref(|| Opaque(Box::new(|| {})));
            cell.set(Opaque(Box::new(|| {})));
        })
        .unwrap();
    }

    #[test]
    fn use_memo_recomputes_only_when_deps_change() {
        clear();
        let id = create_instance();
        let mut computed = 0;

        for (dep, expected_value, expected_computes) in
            [("a", 1, 1), ("a", 1, 1), ("b", 3, 2)]
        {
            let value = render_instance(id, || {
                use_memo(
                    || {
                        computed += 1;
                        computed * 2 - 1
                    },
                    dep,
                )
            })
            .unwrap();
            assert_eq!(value, expected_value);
            assert_eq!(computed, expected_computes);
        }
    }

    #[test]
    fn use_state_setter_updates_value_and_marks_dirty() {
        clear();
        let id = create_instance();

        let (value, setter) = render_instance(id, || use_state(|| 10)).unwrap();
        assert_eq!(value, 10);
        assert_eq!(take_dirty(), Vec::new());

        setter.set(11);
        assert_eq!(take_dirty(), vec![id]);

        let (value, _) = render_instance(id, || use_state(|| 10)).unwrap();
        assert_eq!(value, 11);
    }

    #[test]
    fn boxed_callback_identity_is_stable_across_renders() {
        clear();
        let id = create_instance();

        let wrap = || {
            render_instance(id, || {
                let cb: BoxedCallback<(), ()> = use_boxed_callback(|(), ()| {}, ());
                cb
            })
            .unwrap()
        };

        let first = wrap();
        let second = wrap();
        let third = wrap();
        assert!(first.ptr_eq(&second));
        assert_eq!(second, third);
    }

    #[test]
    fn boxed_callback_forwards_the_latest_callback_and_args() {
        clear();
        let id = create_instance();
        let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));

        let log1 = Rc::clone(&log);
        render_instance(id, || {
            let _: BoxedCallback<(), (&'static str,)> = use_boxed_callback(
                move |(), (tag,)| log1.borrow_mut().push(format!("cb1:{tag}")),
                ("a",),
            );
        })
        .unwrap();

        let log2 = Rc::clone(&log);
        let cb = render_instance(id, || {
            let cb: BoxedCallback<(), (&'static str,)> = use_boxed_callback(
                move |(), (tag,)| log2.borrow_mut().push(format!("cb2:{tag}")),
                ("b",),
            );
            cb
        })
        .unwrap();

        cb.call(());
        assert_eq!(*log.borrow(), vec!["cb2:b".to_string()]);
    }

    #[test]
    fn boxed_callback_appends_args_after_call_params() {
        clear();
        let id = create_instance();
        let received: Rc<RefCell<Vec<i32>>> = Rc::new(RefCell::new(Vec::new()));

        let received_clone = Rc::clone(&received);
        let cb = render_instance(id, || {
            let cb: BoxedCallback<(i32, i32), (i32, i32)> = use_boxed_callback(
                move |(x, y), (a, b)| received_clone.borrow_mut().extend([x, y, a, b]),
                (3, 4),
            );
            cb
        })
        .unwrap();

        cb.call((1, 2));
        assert_eq!(*received.borrow(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn boxed_callback_with_no_extra_args_passes_params_unchanged() {
        clear();
        let id = create_instance();

        let cb = render_instance(id, || {
            let cb: BoxedCallback<i32, (), i32> = use_boxed_callback(|x, ()| x + 1, ());
            cb
        })
        .unwrap();

        assert_eq!(cb.call(41), 42);
    }

    #[test]
    fn memo_child_renders_only_when_props_change() {
        clear();
        let id = create_instance();
        let child_renders = Rc::new(Cell::new(0));

        let mut render_with = |prop: i32| {
            let child_renders = Rc::clone(&child_renders);
            render_instance(id, move || {
                use_memo_child(prop, |_| {
                    let count = use_ref(|| 0);
                    *count.borrow_mut() += 1;
                    child_renders.set(*count.borrow());
                });
            })
            .unwrap();
        };

        render_with(1);
        render_with(1);
        assert_eq!(child_renders.get(), 1);

        render_with(2);
        assert_eq!(child_renders.get(), 2);
    }

    #[test]
    fn hooks_debug_info_lists_hooks_in_call_order() {
        clear();
        let id = create_instance();

        let meta = render_instance(id, || {
            let _ = use_ref(|| 0);
            let _ = use_state(|| 0);
            hooks_debug_info()
        })
        .unwrap();

        let types: Vec<&str> = meta.iter().map(|m| m.hook_type).collect();
        assert_eq!(types, vec!["use_ref", "use_state"]);
    }

    #[test]
    #[should_panic(expected = "outside of render")]
    fn hook_outside_render_panics() {
        clear();
        let _ = use_ref(|| 0);
    }

    #[test]
    #[should_panic(expected = "Hook count mismatch")]
    fn hook_count_mismatch_panics() {
        clear();
        let id = create_instance();

        render_instance(id, || {
            let _ = use_ref(|| 0);
            let _ = use_ref(|| 0);
        })
        .unwrap();

        render_instance(id, || {
            let _ = use_ref(|| 0);
        })
        .unwrap();
    }

    #[test]
    #[should_panic(expected = "Hook order mismatch")]
    fn hook_order_mismatch_panics() {
        clear();
        let id = create_instance();

        render_instance(id, || {
            let _ = use_ref(|| 0);
            let _ = use_state(|| 0);
        })
        .unwrap();

        render_instance(id, || {
            let _ = use_state(|| 0);
            let _ = use_ref(|| 0);
        })
        .unwrap();
    }
}
