use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::runtime::{NodeId, Reaction, Runtime};

/// Decides whether two selected values count as the same.
pub struct Equality<T> {
    eq: Rc<dyn Fn(&T, &T) -> bool>,
}

impl<T> Clone for Equality<T> {
    fn clone(&self) -> Self {
        Self {
            eq: self.eq.clone(),
        }
    }
}

impl<T> fmt::Debug for Equality<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Equality")
    }
}

impl<T: PartialEq + 'static> Default for Equality<T> {
    fn default() -> Self {
        Self::new(|a: &T, b: &T| a == b)
    }
}

impl<T: 'static> Equality<T> {
    pub fn new(eq: impl Fn(&T, &T) -> bool + 'static) -> Self {
        Self { eq: Rc::new(eq) }
    }

    /// Treats every new value as a change.
    pub fn never() -> Self {
        Self::new(|_, _| false)
    }

    /// Compares a projection of the value instead of the whole value.
    pub fn by_key<K: PartialEq>(key: impl Fn(&T) -> K + 'static) -> Self {
        Self::new(move |a, b| key(a) == key(b))
    }

    pub fn eq(&self, a: &T, b: &T) -> bool {
        (self.eq)(a, b)
    }
}

impl<T: 'static> Equality<Rc<T>> {
    /// Compares shared values by pointer.
    pub fn identity() -> Self {
        Self::new(|a, b| Rc::ptr_eq(a, b))
    }
}

pub(crate) struct ReactionCell<T> {
    id: NodeId,
    rt: Weak<Runtime>,
    selector: Box<dyn Fn() -> T>,
    equality: Equality<T>,
    callback: RefCell<Box<dyn FnMut(&T)>>,
    last: RefCell<Option<T>>,
    disposed: Cell<bool>,
}

impl<T> ReactionCell<T> {
    pub(crate) fn new(
        id: NodeId,
        rt: Weak<Runtime>,
        selector: Box<dyn Fn() -> T>,
        equality: Equality<T>,
        callback: Box<dyn FnMut(&T)>,
    ) -> Self {
        Self {
            id,
            rt,
            selector,
            equality,
            callback: RefCell::new(callback),
            last: RefCell::new(None),
            disposed: Cell::new(false),
        }
    }
}

impl<T: 'static> Reaction for ReactionCell<T> {
    fn run(&self) {
        if self.disposed.get() {
            return;
        }
        let Some(rt) = self.rt.upgrade() else {
            return;
        };
        let primed = self.last.borrow().is_some();
        if primed && !rt.sources_changed(self.id) {
            return;
        }
        let next = rt.evaluate(self.id, || (self.selector)());
        let notify = match self.last.borrow().as_ref() {
            Some(previous) => !self.equality.eq(previous, &next),
            None => true,
        };
        if !notify || self.disposed.get() {
            return;
        }
        *self.last.borrow_mut() = Some(next);
        let last = self.last.borrow();
        if let Some(value) = last.as_ref() {
            rt.untracked(|| {
                if let Ok(mut callback) = self.callback.try_borrow_mut() {
                    callback(value);
                }
            });
        }
    }

    fn mark_disposed(&self) {
        self.disposed.set(true);
    }

    fn is_disposed(&self) -> bool {
        self.disposed.get()
    }
}

/// Registration of a selector and callback on a [`crate::Store`].
///
/// Dropping the handle releases the subscription; [`Subscription::dispose`]
/// does so explicitly and may be called any number of times.
#[must_use = "dropping a subscription releases it immediately"]
pub struct Subscription {
    id: NodeId,
    rt: Weak<Runtime>,
    reaction: Rc<dyn Reaction>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Subscription {
    pub(crate) fn new(id: NodeId, rt: Weak<Runtime>, reaction: Rc<dyn Reaction>) -> Self {
        Self { id, rt, reaction }
    }

    pub fn is_active(&self) -> bool {
        !self.reaction.is_disposed()
    }

    /// Stops further callbacks. Safe to call repeatedly.
    pub fn dispose(&self) {
        if self.reaction.is_disposed() {
            return;
        }
        self.reaction.mark_disposed();
        if let Some(rt) = self.rt.upgrade() {
            rt.release(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}
