//! Stable-identity boxed callbacks for render-cycle UIs.
//!
//! The core idea: a component instance owns one mutable cell holding its
//! current callback and trailing arguments. A wrapper handle captures the
//! cell by reference and is handed out once; every render overwrites the
//! cell's contents, never its identity. Consumers that compare the handle
//! with shallow equality (see [`use_memo_child`]) never see it change, so
//! they skip re-rendering — yet every invocation runs the freshest callback
//! with the freshest arguments.
//!
//! [`use_boxed_callback`] is that idea as a hook; the [`runtime`] module
//! supplies the per-instance storage and render lifecycle it relies on, and
//! [`events`] gives tests and demos a way to simulate UI events.

pub mod callback;
pub mod events;
pub mod hooks;
pub mod runtime;

pub use callback::{BoxedCallback, CallBox};

pub use hooks::{
    hooks_debug_info, use_boxed_callback, use_memo, use_memo_child, use_ref, use_state, HookMeta,
    RefHandle, StateSetter,
};

pub use runtime::{
    create_instance, current_instance, dispose_instance, mark_dirty, render_instance, take_dirty,
    InstanceId, RuntimeError,
};

pub use events::{
    clear_handlers, dispatch_event, handler_count, register_handler, remove_handler, EventCallback,
    EventHandlerId,
};
