use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::warn;

use crate::runtime::{NodeId, NodeKind, Runtime};

struct ObservableInner<T> {
    id: NodeId,
    rt: Weak<Runtime>,
    value: RefCell<T>,
}

impl<T> Drop for ObservableInner<T> {
    fn drop(&mut self) {
        if let Some(rt) = self.rt.upgrade() {
            rt.release(self.id);
        }
    }
}

/// Mutable cell whose reads are tracked by the store.
///
/// Handles are cheap to clone and share the same cell.
pub struct Observable<T> {
    inner: Rc<ObservableInner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Observable")
            .field(&*self.inner.value.borrow())
            .finish()
    }
}

impl<T> Observable<T> {
    pub(crate) fn new(rt: &Rc<Runtime>, value: T) -> Self {
        let id = rt.register(NodeKind::Observable);
        Self {
            inner: Rc::new(ObservableInner {
                id,
                rt: Rc::downgrade(rt),
                value: RefCell::new(value),
            }),
        }
    }

    fn track(&self) {
        if let Some(rt) = self.inner.rt.upgrade() {
            rt.track(self.inner.id);
        }
    }

    fn changed(&self) {
        if let Some(rt) = self.inner.rt.upgrade() {
            if let Err(err) = rt.mark_changed(self.inner.id) {
                warn!(?err, "write left reactions unsettled");
            }
        }
    }

    /// Reads the value by reference.
    ///
    /// `f` must not write to this observable.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.inner.value.borrow())
    }

    /// Mutates the value in place. Always counts as a change.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = f(&mut self.inner.value.borrow_mut());
        self.changed();
        result
    }

    /// Stores `value` unconditionally and returns the previous value.
    pub fn replace(&self, value: T) -> T {
        let previous = self.inner.value.replace(value);
        self.changed();
        previous
    }
}

impl<T: Clone> Observable<T> {
    pub fn get(&self) -> T {
        self.with(T::clone)
    }
}

impl<T: PartialEq> Observable<T> {
    /// Stores `value` if it differs from the current one.
    ///
    /// Returns whether the value changed.
    pub fn set(&self, value: T) -> bool {
        if *self.inner.value.borrow() == value {
            return false;
        }
        *self.inner.value.borrow_mut() = value;
        self.changed();
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::Store;

    #[test]
    fn set_reports_whether_the_value_changed() {
        let store = Store::new();
        let count = store.observable(1);
        assert!(!count.set(1));
        assert!(count.set(2));
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn update_mutates_in_place() {
        let store = Store::new();
        let list = store.observable(vec![1, 2]);
        list.update(|values| values.push(3));
        assert_eq!(list.with(|values| values.len()), 3);
    }
}
