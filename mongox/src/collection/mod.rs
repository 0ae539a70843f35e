//! Driver-backed operations wrapped with callbacks.
//!
//! Each operation builds an [`OpContext`], runs the `Before*` slot of the
//! collection's [`Callbacks`], forwards to the driver and runs the matching
//! `After*` slot. Both phases see the same `started_at`.

use crate::{Callbacks, OpContext, OpType, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub use aggregator::Aggregator;
pub use creator::Creator;
pub use deleter::Deleter;
pub use finder::Finder;
pub use updater::Updater;

mod aggregator;
mod creator;
mod deleter;
mod finder;
mod updater;

#[derive(Debug)]
pub struct Collection<T: Send + Sync> {
    inner: mongodb::Collection<T>,
    callbacks: Arc<Callbacks>,
}

impl<T: Send + Sync> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            callbacks: self.callbacks.clone(),
        }
    }
}

impl<T: Send + Sync> Collection<T> {
    /// Wraps a driver collection with the default [`Callbacks`].
    pub fn new(inner: mongodb::Collection<T>) -> Self {
        Self::with_callbacks(inner, Arc::new(Callbacks::new()))
    }

    pub fn with_callbacks(inner: mongodb::Collection<T>, callbacks: Arc<Callbacks>) -> Self {
        Self { inner, callbacks }
    }

    pub fn inner(&self) -> &mongodb::Collection<T> {
        &self.inner
    }

    pub fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn finder(&self) -> Finder<'_, T> {
        Finder::new(self)
    }

    pub fn creator(&self) -> Creator<'_, T> {
        Creator::new(self)
    }

    pub fn updater(&self) -> Updater<'_, T> {
        Updater::new(self)
    }

    pub fn deleter(&self) -> Deleter<'_, T> {
        Deleter::new(self)
    }

    pub fn aggregator(&self) -> Aggregator<'_, T> {
        Aggregator::new(self)
    }

    fn context(&self, op: OpType, started_at: DateTime<Utc>) -> OpContext<'_> {
        OpContext::new(op, self.inner.name(), started_at)
    }

    fn run(&self, mut ctx: OpContext<'_>) -> Result<()> {
        self.callbacks.execute(&mut ctx)
    }
}

impl<T: Send + Sync> From<mongodb::Collection<T>> for Collection<T> {
    fn from(value: mongodb::Collection<T>) -> Self {
        Self::new(value)
    }
}
