// ABOUTME: Ownership group for signals, memos and effects
// ABOUTME: Holds the deferred effect queue and releases everything it created on dispose

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::effect::{Effect, EffectInner};
use crate::error::{ReactiveError, ReactiveResult};
use crate::memo::Memo;
use crate::signal::Signal;

/// Upper bound on effect runs within one [`Scope::flush`]
pub const MAX_EFFECT_RUNS: usize = 10_000;

pub(crate) trait Disposable {
    fn dispose(&self);
}

/// Groups reactive nodes so they can be released together.
///
/// Signals created by a scope refuse writes once it is disposed (or
/// dropped); its effects stop running and its memos stop listening.
#[derive(Clone, Default)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

#[derive(Default)]
pub(crate) struct ScopeInner {
    queue: RefCell<VecDeque<Rc<EffectInner>>>,
    owned: RefCell<Vec<Rc<dyn Disposable>>>,
    disposed: Cell<bool>,
}

impl ScopeInner {
    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    pub(crate) fn enqueue(&self, effect: Rc<EffectInner>) {
        if !self.is_disposed() {
            self.queue.borrow_mut().push_back(effect);
        }
    }
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal<T: Clone + PartialEq + 'static>(&self, value: T) -> Signal<T> {
        Signal::with_owner(value, Some(Rc::downgrade(&self.inner)))
    }

    pub fn memo<T: Clone + 'static>(&self, compute: impl Fn() -> T + 'static) -> Memo<T> {
        let memo = Memo::new(compute);
        self.inner.owned.borrow_mut().push(memo.inner.clone());
        memo
    }

    /// Register a side effect. Its first run is queued, not immediate; it
    /// re-runs on the flush after anything it read changes.
    pub fn effect(&self, run: impl FnMut() + 'static) -> Effect {
        let inner = EffectInner::new(Rc::downgrade(&self.inner), Box::new(run));

        if self.is_disposed() {
            inner.set_disposed();
        } else {
            self.inner.owned.borrow_mut().push(inner.clone());
            inner.schedule();
        }

        Effect { inner }
    }

    /// Run queued effects until the queue is empty, returning how many ran.
    ///
    /// Effects queued by other effects run in the same flush, in FIFO order.
    pub fn flush(&self) -> ReactiveResult<usize> {
        let mut runs = 0;

        loop {
            let next = self.inner.queue.borrow_mut().pop_front();
            let Some(effect) = next else {
                break;
            };

            if runs == MAX_EFFECT_RUNS {
                self.inner.queue.borrow_mut().push_front(effect);
                warn!("Effects still pending after {} runs", MAX_EFFECT_RUNS);
                return Err(ReactiveError::Unsettled(MAX_EFFECT_RUNS));
            }

            effect.run();
            runs += 1;
        }

        Ok(runs)
    }

    /// Number of effects waiting for the next flush
    pub fn pending(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Release every node this scope created. Idempotent.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }

        self.inner.queue.borrow_mut().clear();
        let owned = std::mem::take(&mut *self.inner.owned.borrow_mut());
        debug!("Disposing scope with {} reactive nodes", owned.len());

        for node in owned {
            node.dispose();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::untracked;
    use pretty_assertions::assert_eq;

    fn recorder() -> Rc<RefCell<Vec<i32>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn test_effect_waits_for_flush() {
        let scope = Scope::new();
        let count = scope.signal(1);
        let seen = recorder();

        {
            let (count, seen) = (count.clone(), seen.clone());
            scope.effect(move || seen.borrow_mut().push(count.get()));
        }

        assert!(seen.borrow().is_empty());
        assert_eq!(scope.pending(), 1);

        assert_eq!(scope.flush().unwrap(), 1);
        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn test_effect_batches_changes_between_flushes() {
        let scope = Scope::new();
        let count = scope.signal(0);
        let seen = recorder();

        {
            let (count, seen) = (count.clone(), seen.clone());
            scope.effect(move || seen.borrow_mut().push(count.get()));
        }
        scope.flush().unwrap();

        count.set(1).unwrap();
        count.set(2).unwrap();
        count.set(3).unwrap();
        assert_eq!(scope.pending(), 1);

        scope.flush().unwrap();
        assert_eq!(*seen.borrow(), vec![0, 3]);
    }

    #[test]
    fn test_setting_equal_value_does_not_queue() {
        let scope = Scope::new();
        let count = scope.signal(7);
        {
            let count = count.clone();
            scope.effect(move || {
                count.get();
            });
        }
        scope.flush().unwrap();

        count.set(7).unwrap();
        assert_eq!(scope.pending(), 0);
    }

    #[test]
    fn test_untracked_reads_do_not_subscribe() {
        let scope = Scope::new();
        let tracked = scope.signal(1);
        let ignored = scope.signal(1);
        let seen = recorder();

        {
            let (tracked, ignored, seen) = (tracked.clone(), ignored.clone(), seen.clone());
            scope.effect(move || {
                let other = untracked(|| ignored.get());
                seen.borrow_mut().push(tracked.get() + other);
            });
        }
        scope.flush().unwrap();

        ignored.set(100).unwrap();
        assert_eq!(scope.pending(), 0);

        tracked.set(2).unwrap();
        scope.flush().unwrap();
        assert_eq!(*seen.borrow(), vec![2, 102]);
    }

    #[test]
    fn test_effects_chain_within_one_flush() {
        let scope = Scope::new();
        let source = scope.signal(1);
        let mirror = scope.signal(0);
        let seen = recorder();

        {
            let (source, mirror) = (source.clone(), mirror.clone());
            scope.effect(move || {
                mirror.set(source.get() * 10).unwrap();
            });
        }
        {
            let (mirror, seen) = (mirror.clone(), seen.clone());
            scope.effect(move || seen.borrow_mut().push(mirror.get()));
        }

        scope.flush().unwrap();
        assert_eq!(*seen.borrow(), vec![10]);

        source.set(2).unwrap();
        scope.flush().unwrap();
        assert_eq!(*seen.borrow(), vec![10, 20]);
    }

    #[test]
    fn test_effect_observes_memo() {
        let scope = Scope::new();
        let base = scope.signal(2);
        let squared = {
            let base = base.clone();
            scope.memo(move || base.get() * base.get())
        };
        let seen = recorder();

        {
            let (squared, seen) = (squared.clone(), seen.clone());
            scope.effect(move || seen.borrow_mut().push(squared.get()));
        }
        scope.flush().unwrap();

        base.set(3).unwrap();
        scope.flush().unwrap();
        assert_eq!(*seen.borrow(), vec![4, 9]);
    }

    #[test]
    fn test_dispose_stops_effects_and_rejects_writes() {
        let scope = Scope::new();
        let count = scope.signal(0);
        let seen = recorder();

        let effect = {
            let (count, seen) = (count.clone(), seen.clone());
            scope.effect(move || seen.borrow_mut().push(count.get()))
        };
        scope.flush().unwrap();

        scope.dispose();
        assert!(scope.is_disposed());
        assert!(effect.is_disposed());
        assert_eq!(count.set(1), Err(ReactiveError::Disposed));
        assert_eq!(count.observer_count(), 0);
        assert_eq!(scope.flush().unwrap(), 0);
        assert_eq!(*seen.borrow(), vec![0]);

        // Idempotent
        scope.dispose();
    }

    #[test]
    fn test_effect_on_disposed_scope_never_runs() {
        let scope = Scope::new();
        scope.dispose();

        let effect = scope.effect(|| panic!("must not run"));
        assert!(effect.is_disposed());
        assert_eq!(scope.flush().unwrap(), 0);
    }

    #[test]
    fn test_disposing_one_effect_keeps_others() {
        let scope = Scope::new();
        let count = scope.signal(0);
        let first = recorder();
        let second = recorder();

        let effect = {
            let (count, first) = (count.clone(), first.clone());
            scope.effect(move || first.borrow_mut().push(count.get()))
        };
        {
            let (count, second) = (count.clone(), second.clone());
            scope.effect(move || second.borrow_mut().push(count.get()));
        }
        scope.flush().unwrap();

        effect.dispose();
        count.set(5).unwrap();
        scope.flush().unwrap();

        assert_eq!(*first.borrow(), vec![0]);
        assert_eq!(*second.borrow(), vec![0, 5]);
    }

    #[test]
    fn test_runaway_effect_is_reported() {
        let scope = Scope::new();
        let count = scope.signal(0u64);
        {
            let count = count.clone();
            scope.effect(move || {
                let next = count.get() + 1;
                count.set(next).unwrap();
            });
        }

        assert_eq!(
            scope.flush(),
            Err(ReactiveError::Unsettled(MAX_EFFECT_RUNS))
        );
        assert_eq!(scope.pending(), 1);
    }
}
