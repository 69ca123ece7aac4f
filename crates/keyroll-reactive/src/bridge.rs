use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::{Equality, Observable, Store, Subscription};

/// Asks the rendering framework for another frame.
pub trait RepaintTrigger {
    fn request_repaint(&self);
}

/// Adapts a plain closure into a [`RepaintTrigger`].
pub struct Repaint<F>(pub F);

impl<F: Fn()> RepaintTrigger for Repaint<F> {
    fn request_repaint(&self) {
        (self.0)()
    }
}

#[cfg(feature = "egui")]
impl RepaintTrigger for egui::Context {
    fn request_repaint(&self) {
        egui::Context::request_repaint(self);
    }
}

/// Keeps a view's copy of a store slice in sync with the store.
///
/// The bridge owns one subscription. It is created with an explicit
/// dependency value and reused across frames until [`SelectorBridge::update`]
/// is called with different dependencies. The first value is captured by the
/// subscription itself, so changes between construction and the first
/// [`SelectorBridge::value`] call are never lost. Later changes are parked in
/// an inbox and trigger a repaint.
pub struct SelectorBridge<T, D = ()> {
    store: Store,
    deps: D,
    equality: Equality<T>,
    current: T,
    inbox: Rc<RefCell<Option<T>>>,
    trigger: Rc<dyn RepaintTrigger>,
    subscription: Subscription,
}

impl<T: Clone + 'static, D: PartialEq> SelectorBridge<T, D> {
    pub fn new<S>(
        store: &Store,
        deps: D,
        selector: S,
        equality: Equality<T>,
        trigger: Rc<dyn RepaintTrigger>,
    ) -> Self
    where
        S: Fn() -> T + 'static,
    {
        let inbox = Rc::new(RefCell::new(None));
        let selector: Rc<dyn Fn() -> T> = Rc::new(selector);
        let subscription = connect(store, selector.clone(), &equality, &inbox, &trigger);
        let current = match inbox.borrow_mut().take() {
            Some(value) => value,
            None => store.untracked(|| selector()),
        };
        Self {
            store: store.clone(),
            deps,
            equality,
            current,
            inbox,
            trigger,
            subscription,
        }
    }

    /// Latest value, picking up any change delivered since the last call.
    pub fn value(&mut self) -> &T {
        self.sync();
        &self.current
    }

    /// Moves a delivered change into the current value.
    ///
    /// Returns whether the value was replaced.
    pub fn sync(&mut self) -> bool {
        match self.inbox.borrow_mut().take() {
            Some(value) => {
                self.current = value;
                true
            }
            None => false,
        }
    }

    pub fn has_update(&self) -> bool {
        self.inbox.borrow().is_some()
    }

    pub fn deps(&self) -> &D {
        &self.deps
    }

    pub fn is_connected(&self) -> bool {
        self.subscription.is_active()
    }

    /// Resubscribes with `selector` when `deps` differ from the current ones.
    ///
    /// Returns whether a new subscription was made.
    pub fn update<S>(&mut self, deps: D, selector: S) -> bool
    where
        S: Fn() -> T + 'static,
    {
        if deps == self.deps {
            return false;
        }
        self.subscription.dispose();
        let selector: Rc<dyn Fn() -> T> = Rc::new(selector);
        self.inbox.borrow_mut().take();
        self.subscription = connect(
            &self.store,
            selector.clone(),
            &self.equality,
            &self.inbox,
            &self.trigger,
        );
        self.deps = deps;
        if !self.sync() {
            self.current = self.store.untracked(|| selector());
        }
        true
    }
}

impl<T: Clone + PartialEq + 'static> SelectorBridge<T, ()> {
    /// Mirrors a single observable.
    pub fn getter(
        store: &Store,
        observable: &Observable<T>,
        trigger: Rc<dyn RepaintTrigger>,
    ) -> Self {
        let observable = observable.clone();
        Self::new(
            store,
            (),
            move || observable.get(),
            Equality::default(),
            trigger,
        )
    }
}

fn connect<T: Clone + 'static>(
    store: &Store,
    selector: Rc<dyn Fn() -> T>,
    equality: &Equality<T>,
    inbox: &Rc<RefCell<Option<T>>>,
    trigger: &Rc<dyn RepaintTrigger>,
) -> Subscription {
    let inbox = inbox.clone();
    let trigger = trigger.clone();
    let initial = Cell::new(true);
    store.subscribe_with(
        move || selector(),
        equality.clone(),
        move |value: &T| {
            *inbox.borrow_mut() = Some(value.clone());
            if !initial.replace(false) {
                trigger.request_repaint();
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    fn counter() -> (Rc<Cell<u32>>, Rc<dyn RepaintTrigger>) {
        let repaints = Rc::new(Cell::new(0));
        let trigger = {
            let repaints = repaints.clone();
            Rc::new(Repaint(move || repaints.set(repaints.get() + 1))) as Rc<dyn RepaintTrigger>
        };
        (repaints, trigger)
    }

    #[test]
    fn captures_value_at_construction_without_repaint() {
        let store = Store::new();
        let zoom = store.observable(3);
        let (repaints, trigger) = counter();
        let mut bridge = SelectorBridge::getter(&store, &zoom, trigger);
        assert_eq!(*bridge.value(), 3);
        assert_eq!(repaints.get(), 0);
    }

    #[test]
    fn change_before_first_read_is_not_missed() {
        let store = Store::new();
        let zoom = store.observable(3);
        let (repaints, trigger) = counter();
        let mut bridge = SelectorBridge::getter(&store, &zoom, trigger);
        zoom.set(4);
        assert!(bridge.has_update());
        assert_eq!(*bridge.value(), 4);
        assert_eq!(repaints.get(), 1);
    }

    #[test]
    fn same_deps_keep_the_subscription() {
        let store = Store::new();
        let values = store.observable(vec![1, 2, 3]);
        let (_, trigger) = counter();
        let selector_for = |index: usize| {
            let values = values.clone();
            move || values.with(|v| v[index])
        };
        let mut bridge = SelectorBridge::new(
            &store,
            0usize,
            selector_for(0),
            Equality::default(),
            trigger,
        );
        assert!(!bridge.update(0, selector_for(0)));
        assert_eq!(store.subscription_count(), 1);

        assert!(bridge.update(2, selector_for(2)));
        assert_eq!(*bridge.value(), 3);
        assert_eq!(store.subscription_count(), 1);
    }

    #[test]
    fn dropping_the_bridge_releases_its_subscription() {
        let store = Store::new();
        let zoom = store.observable(1);
        let (_, trigger) = counter();
        let bridge = SelectorBridge::getter(&store, &zoom, trigger);
        assert_eq!(store.subscription_count(), 1);
        drop(bridge);
        assert_eq!(store.subscription_count(), 0);
    }
}
