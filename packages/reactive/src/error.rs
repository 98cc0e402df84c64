// ABOUTME: Error types for the reactive primitives
// ABOUTME: Disposed-resource and unsettled-effect failures

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReactiveError {
    #[error("Cannot operate on a disposed resource")]
    Disposed,

    #[error("Effects did not settle after {0} runs")]
    Unsettled(usize),
}

pub type ReactiveResult<T> = Result<T, ReactiveError>;
