// ABOUTME: Fine-grained reactive primitives used by the settings engine
// ABOUTME: Signals, lazily derived memos, deferred effects and scopes with grouped disposal

//! Reading a [`Signal`] or [`Memo`] while an [`Effect`] or memo is running
//! subscribes that observer automatically. Effects never run inline: a
//! change queues them on their [`Scope`], and [`Scope::flush`] drains the
//! queue. Everything here is single-threaded (`Rc`/`RefCell`).

mod effect;
mod error;
mod graph;
mod memo;
mod scope;
mod signal;

pub use effect::Effect;
pub use error::{ReactiveError, ReactiveResult};
pub use graph::untracked;
pub use memo::Memo;
pub use scope::{Scope, MAX_EFFECT_RUNS};
pub use signal::{Signal, WeakSignal};
