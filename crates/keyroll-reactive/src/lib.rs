//! Single-threaded reactive store.
//!
//! State lives in [`Observable`] cells. [`Computed`] values record the cells
//! they read while evaluating and are recomputed lazily, only after one of
//! those dependencies changed. [`Subscription`]s run a selector against the
//! store and call back whenever the selected value changes under an
//! [`Equality`]. Writes inside [`Store::batch`] are collected and subscribers
//! run once, in registration order, after the outermost batch ends.

mod bridge;
mod computed;
mod error;
mod observable;
mod runtime;
mod subscription;

use std::rc::Rc;

use tracing::warn;

pub use bridge::{Repaint, RepaintTrigger, SelectorBridge};
pub use computed::Computed;
pub use error::StoreError;
pub use observable::Observable;
pub use runtime::MAX_FLUSH_ROUNDS;
pub use subscription::{Equality, Subscription};

use runtime::{NodeKind, Runtime};
use subscription::ReactionCell;

/// Handle to one reactive graph.
///
/// Cloning the handle shares the graph. All observables, computed values and
/// subscriptions created from a store belong to it; [`Store::dispose`]
/// releases every subscription at once.
#[derive(Clone, Default)]
pub struct Store {
    rt: Rc<Runtime>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new observable cell holding `value`.
    pub fn observable<T: 'static>(&self, value: T) -> Observable<T> {
        Observable::new(&self.rt, value)
    }

    /// Creates a computed value compared with `PartialEq`.
    pub fn computed<T, F>(&self, compute: F) -> Computed<T>
    where
        T: PartialEq + 'static,
        F: Fn() -> T + 'static,
    {
        self.computed_with(Equality::default(), compute)
    }

    /// Creates a computed value whose changes are gated by `equality`.
    pub fn computed_with<T, F>(&self, equality: Equality<T>, compute: F) -> Computed<T>
    where
        T: 'static,
        F: Fn() -> T + 'static,
    {
        Computed::new(&self.rt, equality, Box::new(compute))
    }

    /// Subscribes `callback` to the value produced by `selector`.
    ///
    /// The callback runs immediately with the current value and afterwards
    /// every time the selected value is no longer equal to the last value it
    /// was called with.
    pub fn subscribe<T, S, C>(&self, selector: S, callback: C) -> Subscription
    where
        T: PartialEq + 'static,
        S: Fn() -> T + 'static,
        C: FnMut(&T) + 'static,
    {
        self.subscribe_with(selector, Equality::default(), callback)
    }

    /// Like [`Store::subscribe`] with a caller supplied equality.
    pub fn subscribe_with<T, S, C>(
        &self,
        selector: S,
        equality: Equality<T>,
        callback: C,
    ) -> Subscription
    where
        T: 'static,
        S: Fn() -> T + 'static,
        C: FnMut(&T) + 'static,
    {
        let id = self.rt.register(NodeKind::Reaction);
        let cell = Rc::new(ReactionCell::new(
            id,
            Rc::downgrade(&self.rt),
            Box::new(selector),
            equality,
            Box::new(callback),
        ));
        self.rt.register_reaction(id, cell.clone());
        // Writes made by the first callback are flushed after it returns.
        let ((), flushed) = self.rt.batch(|| runtime::Reaction::run(&*cell));
        if let Err(err) = flushed {
            warn!(?err, "first subscriber call left reactions unsettled");
        }
        Subscription::new(id, Rc::downgrade(&self.rt), cell)
    }

    /// Subscribes `callback` to changes of `selector` without the initial call.
    pub fn reaction<T, S, C>(&self, selector: S, mut callback: C) -> Subscription
    where
        T: PartialEq + 'static,
        S: Fn() -> T + 'static,
        C: FnMut(&T) + 'static,
    {
        let mut primed = false;
        self.subscribe(selector, move |value| {
            if primed {
                callback(value);
            }
            primed = true;
        })
    }

    /// Runs `effect` now and again whenever anything it read changes.
    pub fn autorun<F>(&self, effect: F) -> Subscription
    where
        F: FnMut() + 'static,
    {
        let effect = std::cell::RefCell::new(effect);
        self.subscribe_with(
            move || {
                if let Ok(mut effect) = effect.try_borrow_mut() {
                    effect();
                }
            },
            Equality::never(),
            |_| {},
        )
    }

    /// Groups writes so that subscribers are notified once afterwards.
    ///
    /// A flush that fails to settle is logged and kept for
    /// [`Store::take_failed_flush`]; use [`Store::transaction`] to get it
    /// back directly.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        let (value, flushed) = self.rt.batch(f);
        if let Err(err) = flushed {
            warn!(?err, "batch left reactions unsettled");
        }
        value
    }

    /// Like [`Store::batch`], reporting a reaction loop as an error.
    pub fn transaction<R>(&self, f: impl FnOnce() -> R) -> Result<R, StoreError> {
        let (value, flushed) = self.rt.batch(f);
        if flushed.is_err() {
            self.rt.take_failed_flush();
        }
        flushed.map(|()| value)
    }

    /// Error of the last flush that did not settle outside a
    /// [`Store::transaction`], if any. Taking it clears it.
    pub fn take_failed_flush(&self) -> Option<StoreError> {
        self.rt.take_failed_flush()
    }

    /// Runs `f` without recording dependencies for the surrounding evaluation.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        self.rt.untracked(f)
    }

    pub fn subscription_count(&self) -> usize {
        self.rt.reaction_count()
    }

    /// Releases every subscription registered on this store.
    pub fn dispose(&self) {
        self.rt.dispose_reactions();
    }
}
