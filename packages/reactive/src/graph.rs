// ABOUTME: Dependency tracking internals shared by signals, memos and effects
// ABOUTME: Holds the thread-local current observer and subscriber bookkeeping

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

pub(crate) type NodeId = u64;

/// Something that re-runs when a value it read changes (effects and memos)
pub(crate) trait Observer {
    fn id(&self) -> NodeId;
    fn mark_dirty(&self);
    fn add_source(&self, source: Weak<dyn Source>);
}

/// Something that can be read under tracking (signals and memos)
pub(crate) trait Source {
    fn unsubscribe(&self, observer: NodeId);
}

thread_local! {
    static CURRENT_OBSERVER: RefCell<Option<Rc<dyn Observer>>> = const { RefCell::new(None) };
    static NEXT_NODE_ID: Cell<NodeId> = const { Cell::new(1) };
}

pub(crate) fn next_node_id() -> NodeId {
    NEXT_NODE_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    })
}

fn current_observer() -> Option<Rc<dyn Observer>> {
    CURRENT_OBSERVER.with(|current| current.borrow().clone())
}

struct ObserverGuard {
    previous: Option<Rc<dyn Observer>>,
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_OBSERVER.with(|current| *current.borrow_mut() = previous);
    }
}

/// Run `f` with `observer` installed as the tracking target, restoring the
/// previous one afterwards (also on unwind).
pub(crate) fn with_observer<R>(observer: Option<Rc<dyn Observer>>, f: impl FnOnce() -> R) -> R {
    let previous = CURRENT_OBSERVER.with(|current| current.replace(observer));
    let _guard = ObserverGuard { previous };
    f()
}

/// Run `f` without subscribing the running effect or memo to anything it reads.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    with_observer(None, f)
}

/// Observers subscribed to one source
#[derive(Default)]
pub(crate) struct Subscribers {
    entries: RefCell<Vec<(NodeId, Weak<dyn Observer>)>>,
}

impl Subscribers {
    /// Subscribe the current observer, if any. `source` is only built when a
    /// new subscription is actually made.
    pub(crate) fn track(&self, source: impl FnOnce() -> Weak<dyn Source>) {
        let Some(observer) = current_observer() else {
            return;
        };

        let id = observer.id();
        {
            let mut entries = self.entries.borrow_mut();
            if entries.iter().any(|(existing, _)| *existing == id) {
                return;
            }
            entries.push((id, Rc::downgrade(&observer)));
        }
        observer.add_source(source());
    }

    pub(crate) fn notify(&self) {
        // Collect first: marking may subscribe or unsubscribe observers
        let observers: Vec<Rc<dyn Observer>> = {
            let mut entries = self.entries.borrow_mut();
            entries.retain(|(_, observer)| observer.strong_count() > 0);
            entries
                .iter()
                .filter_map(|(_, observer)| observer.upgrade())
                .collect()
        };

        for observer in observers {
            observer.mark_dirty();
        }
    }

    pub(crate) fn remove(&self, observer: NodeId) {
        self.entries
            .borrow_mut()
            .retain(|(existing, _)| *existing != observer);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

/// Sources an observer read during its last run
#[derive(Default)]
pub(crate) struct Sources {
    entries: RefCell<Vec<Weak<dyn Source>>>,
}

impl Sources {
    pub(crate) fn push(&self, source: Weak<dyn Source>) {
        self.entries.borrow_mut().push(source);
    }

    /// Detach `observer` from everything it subscribed to
    pub(crate) fn clear(&self, observer: NodeId) {
        let entries = std::mem::take(&mut *self.entries.borrow_mut());
        for source in entries.iter().filter_map(Weak::upgrade) {
            source.unsubscribe(observer);
        }
    }
}
