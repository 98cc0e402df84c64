// ABOUTME: Mutable observable cell
// ABOUTME: Tracked reads, change-only notification and disposal checks against the owning scope

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{ReactiveError, ReactiveResult};
use crate::graph::{NodeId, Source, Subscribers};
use crate::scope::ScopeInner;

/// A mutable value that notifies the effects and memos that read it.
///
/// Cloning a `Signal` clones the handle, not the value.
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

struct SignalInner<T> {
    value: RefCell<T>,
    subscribers: Subscribers,
    /// `None` for free-standing signals, which can never be disposed
    owner: Option<Weak<ScopeInner>>,
}

impl<T: 'static> Source for SignalInner<T> {
    fn unsubscribe(&self, observer: NodeId) {
        self.subscribers.remove(observer);
    }
}

impl<T: Clone + PartialEq + 'static> Signal<T> {
    /// Create a signal that belongs to no scope
    pub fn new(value: T) -> Self {
        Self::with_owner(value, None)
    }

    pub(crate) fn with_owner(value: T, owner: Option<Weak<ScopeInner>>) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                value: RefCell::new(value),
                subscribers: Subscribers::default(),
                owner,
            }),
        }
    }

    /// Current value, subscribing the running observer
    pub fn get(&self) -> T {
        self.track();
        self.inner.value.borrow().clone()
    }

    /// Current value without subscribing anything
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value, subscribing the running observer.
    ///
    /// `f` must not write to this signal.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.inner.value.borrow())
    }

    /// Replace the value. Subscribers are notified only when it changed.
    pub fn set(&self, value: T) -> ReactiveResult<()> {
        self.ensure_live()?;

        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return Ok(());
            }
            *current = value;
        }

        self.inner.subscribers.notify();
        Ok(())
    }

    /// Modify the value in place through a copy, then [`set`](Self::set) it
    pub fn update(&self, f: impl FnOnce(&mut T)) -> ReactiveResult<()> {
        let mut next = self.get_untracked();
        f(&mut next);
        self.set(next)
    }

    /// True once the owning scope was disposed or dropped
    pub fn is_disposed(&self) -> bool {
        match &self.inner.owner {
            None => false,
            Some(owner) => owner.upgrade().map_or(true, |scope| scope.is_disposed()),
        }
    }

    /// Number of effects and memos currently subscribed
    pub fn observer_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// A handle that does not keep the signal alive
    pub fn downgrade(&self) -> WeakSignal<T> {
        WeakSignal {
            inner: Rc::downgrade(&self.inner),
        }
    }

    fn ensure_live(&self) -> ReactiveResult<()> {
        if self.is_disposed() {
            Err(ReactiveError::Disposed)
        } else {
            Ok(())
        }
    }

    fn track(&self) {
        self.inner.subscribers.track(|| {
            let source: Weak<SignalInner<T>> = Rc::downgrade(&self.inner);
            source as Weak<dyn Source>
        });
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("value", &*self.inner.value.borrow())
            .finish()
    }
}

/// Non-owning reference to a [`Signal`]
pub struct WeakSignal<T> {
    inner: Weak<SignalInner<T>>,
}

impl<T> WeakSignal<T> {
    pub fn upgrade(&self) -> Option<Signal<T>> {
        self.inner.upgrade().map(|inner| Signal { inner })
    }
}

impl<T> Clone for WeakSignal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Scope;
    use rstest::rstest;

    #[test]
    fn test_get_and_set() {
        let signal = Signal::new(1);
        assert_eq!(signal.get(), 1);

        signal.set(2).unwrap();
        assert_eq!(signal.get(), 2);
        assert_eq!(signal.get_untracked(), 2);
    }

    #[rstest]
    #[case::same_value(1, 1, 0)]
    #[case::new_value(1, 2, 1)]
    #[case::negated(3, -3, 1)]
    fn test_set_notifies_only_on_change(
        #[case] initial: i32,
        #[case] next: i32,
        #[case] expected_runs: usize,
    ) {
        let scope = Scope::new();
        let signal = scope.signal(initial);
        {
            let signal = signal.clone();
            scope.effect(move || {
                signal.get();
            });
        }
        scope.flush().unwrap();

        signal.set(next).unwrap();

        assert_eq!(scope.flush().unwrap(), expected_runs);
    }

    #[test]
    fn test_update_modifies_in_place() {
        let signal = Signal::new(vec!["a".to_string()]);
        signal.update(|list| list.push("b".to_string())).unwrap();
        assert_eq!(signal.get(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_free_signal_is_never_disposed() {
        let signal = Signal::new("x".to_string());
        assert!(!signal.is_disposed());
        assert!(signal.set("y".to_string()).is_ok());
    }

    #[test]
    fn test_set_after_scope_dispose_fails() {
        let scope = Scope::new();
        let signal = scope.signal(10);

        scope.dispose();

        assert_eq!(signal.set(11), Err(ReactiveError::Disposed));
        // Reads keep returning the last value
        assert_eq!(signal.get(), 10);
    }

    #[test]
    fn test_set_after_scope_dropped_fails() {
        let signal = {
            let scope = Scope::new();
            scope.signal(true)
        };

        assert!(signal.is_disposed());
        assert_eq!(signal.set(false), Err(ReactiveError::Disposed));
    }

    #[test]
    fn test_weak_signal_does_not_keep_value_alive() {
        let signal = Signal::new(3);
        let weak = signal.downgrade();
        assert_eq!(weak.upgrade().map(|s| s.get()), Some(3));

        drop(signal);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_debug_shows_value() {
        let signal = Signal::new(42);
        assert_eq!(format!("{:?}", signal), "Signal { value: 42 }");
    }
}
