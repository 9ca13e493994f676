//! The boxed-callback cell and its stable wrapper handle.
//!
//! A [`CallBox`] is a single mutable record holding the current callback and
//! the current trailing arguments. It lives behind an `Rc<RefCell<...>>`
//! whose identity never changes for the lifetime of the owning component
//! instance; only the field contents are overwritten.
//!
//! A [`BoxedCallback`] is the handle given out to consumers. It captures the
//! cell by reference, so invoking it always runs the *current* callback with
//! the *current* trailing arguments, while the handle itself compares equal
//! across renders. That pointer equality is what lets shallow-equality
//! memoization skip re-rendering children that only receive the handle.
//!
//! # Example
//!
//! ```ignore
//! let cell = Rc::new(RefCell::new(CallBox::new(|x: i32, (a,): (i32,)| x + a, (10,))));
//! let cb = BoxedCallback::from_cell(Rc::clone(&cell));
//!
//! assert_eq!(cb.call(1), 11);
//!
//! // Refresh the cell in place; the handle identity is unchanged.
//! cell.borrow_mut().refresh(CallBox::new(|x, (a,)| x * a, (3,)));
//! assert_eq!(cb.call(2), 6);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// The mutable record behind a boxed callback.
///
/// `P` is the call-time parameter (use a tuple for several), `A` the trailing
/// arguments appended on every invocation (use `()` for none), and `R` the
/// callback's return value.
pub struct CallBox<P, A, R = ()> {
    callback: Box<dyn FnMut(P, A) -> R>,
    args: A,
}

impl<P, A, R> CallBox<P, A, R> {
    /// Create a record holding `callback` and `args`.
    pub fn new<F>(callback: F, args: A) -> Self
    where
        F: FnMut(P, A) -> R + 'static,
    {
        Self {
            callback: Box::new(callback),
            args,
        }
    }

    /// Overwrite both fields in place.
    ///
    /// The record's identity (the cell it lives in) is untouched; every
    /// handle that captured the cell observes the new contents on its next
    /// invocation.
    pub fn refresh(&mut self, fresh: CallBox<P, A, R>) {
        self.callback = fresh.callback;
        self.args = fresh.args;
    }

    /// The current trailing arguments.
    pub fn args(&self) -> &A {
        &self.args
    }
}

impl<P, A: Clone, R> CallBox<P, A, R> {
    /// Invoke the current callback with `params` first and a clone of the
    /// current trailing arguments appended.
    pub fn invoke(&mut self, params: P) -> R {
        let args = self.args.clone();
        (self.callback)(params, args)
    }
}

impl<P, A: fmt::Debug, R> fmt::Debug for CallBox<P, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallBox").field("args", &self.args).finish_non_exhaustive()
    }
}

/// A callback handle with stable identity and always-fresh contents.
///
/// Cloning shares the underlying cell. Equality is pointer equality on the
/// cell, so two handles produced from the same cell compare equal no matter
/// how often the cell's contents were refreshed in between.
pub struct BoxedCallback<P, A, R = ()> {
    cell: Rc<RefCell<CallBox<P, A, R>>>,
}

impl<P, A, R> BoxedCallback<P, A, R> {
    /// Wrap an existing cell.
    pub fn from_cell(cell: Rc<RefCell<CallBox<P, A, R>>>) -> Self {
        Self { cell }
    }

    /// Whether two handles share the same underlying cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }
}

impl<P, A: Clone, R> BoxedCallback<P, A, R> {
    /// Invoke the *current* callback with `params` followed by the *current*
    /// trailing arguments.
    ///
    /// The cell is borrowed for the duration of the call, so the callback
    /// must not re-enter `use_boxed_callback` for the same cell (the host
    /// render model never does: wrapping happens during render, invocation
    /// happens between renders).
    pub fn call(&self, params: P) -> R {
        self.cell.borrow_mut().invoke(params)
    }
}

impl<P, A, R> Clone for BoxedCallback<P, A, R> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<P, A, R> PartialEq for BoxedCallback<P, A, R> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<P, A, R> Eq for BoxedCallback<P, A, R> {}

impl<P, A, R> fmt::Debug for BoxedCallback<P, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedCallback")
            .field("cell", &Rc::as_ptr(&self.cell))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn cell_of<P, A, R>(boxed: CallBox<P, A, R>) -> Rc<RefCell<CallBox<P, A, R>>> {
        Rc::new(RefCell::new(boxed))
    }

    #[test]
    fn forwards_params_then_args() {
        let received = Rc::new(RefCell::new(Vec::new()));
        let received_clone = Rc::clone(&received);

        let cb: BoxedCallback<(i32, i32), (i32, i32)> =
            BoxedCallback::from_cell(cell_of(CallBox::new(
                move |(x, y), (a, b)| {
                    received_clone.borrow_mut().extend([x, y, a, b]);
                },
                (30, 40),
            )));

        cb.call((10, 20));
        assert_eq!(*received.borrow(), vec![10, 20, 30, 40]);
    }

    #[test]
    fn no_extra_args() {
        let cb: BoxedCallback<i32, (), i32> =
            BoxedCallback::from_cell(cell_of(CallBox::new(|x, ()| x * 2, ())));
        assert_eq!(cb.call(21), 42);
    }

    #[test]
    fn refresh_swaps_callback_and_args_without_changing_identity() {
        let cell = cell_of(CallBox::new(|x: i32, (a,): (i32,)| x + a, (1,)));
        let cb = BoxedCallback::from_cell(Rc::clone(&cell));
        let before = cb.clone();

        assert_eq!(cb.call(10), 11);

        cell.borrow_mut().refresh(CallBox::new(|x, (a,)| x * a, (5,)));
        assert_eq!(cell.borrow().args(), &(5,));

        // Latest contents, same identity.
        assert_eq!(cb.call(10), 50);
        assert!(cb.ptr_eq(&before));
        assert_eq!(cb, before);
    }

    #[test]
    fn refresh_never_runs_the_old_callback() {
        let old_runs = Rc::new(Cell::new(0));
        let old_runs_clone = Rc::clone(&old_runs);

        let cell = cell_of(CallBox::new(
            move |(), ()| old_runs_clone.set(old_runs_clone.get() + 1),
            (),
        ));
        let cb = BoxedCallback::from_cell(Rc::clone(&cell));

        cell.borrow_mut().refresh(CallBox::new(|(), ()| {}, ()));
        cell.borrow_mut().refresh(CallBox::new(|(), ()| {}, ()));
        cb.call(());

        assert_eq!(old_runs.get(), 0);
    }

    #[test]
    fn distinct_cells_compare_unequal() {
        let a: BoxedCallback<(), ()> =
            BoxedCallback::from_cell(cell_of(CallBox::new(|(), ()| {}, ())));
        let b: BoxedCallback<(), ()> =
            BoxedCallback::from_cell(cell_of(CallBox::new(|(), ()| {}, ())));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }
}
