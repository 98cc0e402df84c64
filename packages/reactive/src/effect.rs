// ABOUTME: Deferred side effects
// ABOUTME: Effects are queued on their scope when a dependency changes and run on flush

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::graph::{next_node_id, with_observer, NodeId, Observer, Source, Sources};
use crate::scope::{Disposable, ScopeInner};

/// Handle to a side effect registered on a [`Scope`](crate::Scope).
///
/// The scope keeps the effect alive; dropping the handle does not stop it.
#[derive(Clone)]
pub struct Effect {
    pub(crate) inner: Rc<EffectInner>,
}

pub(crate) struct EffectInner {
    id: NodeId,
    run: RefCell<Box<dyn FnMut()>>,
    queued: Cell<bool>,
    disposed: Cell<bool>,
    sources: Sources,
    scope: Weak<ScopeInner>,
    this: Weak<EffectInner>,
}

impl Observer for EffectInner {
    fn id(&self) -> NodeId {
        self.id
    }

    fn mark_dirty(&self) {
        self.schedule();
    }

    fn add_source(&self, source: Weak<dyn Source>) {
        self.sources.push(source);
    }
}

impl Disposable for EffectInner {
    fn dispose(&self) {
        self.disposed.set(true);
        self.sources.clear(self.id);
    }
}

impl EffectInner {
    pub(crate) fn new(scope: Weak<ScopeInner>, run: Box<dyn FnMut()>) -> Rc<Self> {
        Rc::new_cyclic(|this| EffectInner {
            id: next_node_id(),
            run: RefCell::new(run),
            queued: Cell::new(false),
            disposed: Cell::new(false),
            sources: Sources::default(),
            scope,
            this: this.clone(),
        })
    }

    /// Put the effect on its scope's queue unless it is already waiting there
    pub(crate) fn schedule(&self) {
        if self.disposed.get() || self.queued.replace(true) {
            return;
        }

        match (self.scope.upgrade(), self.this.upgrade()) {
            (Some(scope), Some(this)) => scope.enqueue(this),
            _ => self.queued.set(false),
        }
    }

    pub(crate) fn run(&self) {
        self.queued.set(false);
        if self.disposed.get() {
            return;
        }

        // Re-entrant flush from inside this very effect: leave it for the outer run
        let Ok(mut run) = self.run.try_borrow_mut() else {
            return;
        };

        self.sources.clear(self.id);
        let observer = self.this.upgrade().map(|this| this as Rc<dyn Observer>);
        with_observer(observer, || (*run)());
    }

    pub(crate) fn set_disposed(&self) {
        self.disposed.set(true);
    }
}

impl Effect {
    /// Stop the effect and detach it from everything it depends on
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// True while the effect waits in its scope's queue
    pub fn is_queued(&self) -> bool {
        self.inner.queued.get()
    }
}
