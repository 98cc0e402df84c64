// ABOUTME: Lazily recomputed derived cell
// ABOUTME: Tracks whatever its closure reads and recomputes on the next read after a change

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::graph::{next_node_id, with_observer, NodeId, Observer, Source, Sources, Subscribers};
use crate::scope::Disposable;

/// A cached value derived from other signals and memos.
///
/// Dependencies are discovered on every recomputation, so a memo that reads
/// a different set of signals each time stays correctly subscribed.
pub struct Memo<T> {
    pub(crate) inner: Rc<MemoInner<T>>,
}

pub(crate) struct MemoInner<T> {
    id: NodeId,
    compute: Box<dyn Fn() -> T>,
    value: RefCell<Option<T>>,
    dirty: Cell<bool>,
    disposed: Cell<bool>,
    subscribers: Subscribers,
    sources: Sources,
    this: Weak<MemoInner<T>>,
}

impl<T: 'static> Observer for MemoInner<T> {
    fn id(&self) -> NodeId {
        self.id
    }

    fn mark_dirty(&self) {
        if !self.dirty.replace(true) {
            self.subscribers.notify();
        }
    }

    fn add_source(&self, source: Weak<dyn Source>) {
        self.sources.push(source);
    }
}

impl<T: 'static> Source for MemoInner<T> {
    fn unsubscribe(&self, observer: NodeId) {
        self.subscribers.remove(observer);
    }
}

impl<T: 'static> Disposable for MemoInner<T> {
    fn dispose(&self) {
        self.disposed.set(true);
        self.sources.clear(self.id);
    }
}

impl<T: Clone + 'static> MemoInner<T> {
    fn read(&self) -> T {
        if let (false, Some(value)) = (self.dirty.get(), self.value.borrow().as_ref()) {
            return value.clone();
        }

        self.sources.clear(self.id);
        self.dirty.set(false);

        // A disposed memo still answers reads, it just stops listening
        let observer = if self.disposed.get() {
            None
        } else {
            self.this
                .upgrade()
                .map(|this| this as Rc<dyn Observer>)
        };
        let next = with_observer(observer, || (self.compute)());

        *self.value.borrow_mut() = Some(next.clone());
        next
    }
}

impl<T: Clone + 'static> Memo<T> {
    /// Create a memo that belongs to no scope. Nothing is computed until the
    /// first read.
    pub fn new(compute: impl Fn() -> T + 'static) -> Self {
        let inner = Rc::new_cyclic(|this| MemoInner {
            id: next_node_id(),
            compute: Box::new(compute),
            value: RefCell::new(None),
            dirty: Cell::new(true),
            disposed: Cell::new(false),
            subscribers: Subscribers::default(),
            sources: Sources::default(),
            this: this.clone(),
        });
        Self { inner }
    }

    /// Current value, recomputing if a dependency changed since the last read
    pub fn get(&self) -> T {
        self.inner.subscribers.track(|| {
            let source: Weak<MemoInner<T>> = Rc::downgrade(&self.inner);
            source as Weak<dyn Source>
        });
        self.inner.read()
    }

    /// Like [`get`](Self::get) but without subscribing the running observer
    pub fn get_untracked(&self) -> T {
        self.inner.read()
    }
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}
