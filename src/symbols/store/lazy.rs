//! Hydrate-once slots for entity data that lives in the symbol file.
//!
//! An entity created while authoring holds its data directly. An entity read from a bound store
//! only knows the file offset of its data; the first accessor reads it, and every later accessor
//! returns the same shared value.
//!
//! Lock order: a slot's own lock is taken before the store lock inside the hydration closure.
//! The store never takes a slot lock while holding its own.

use std::sync::{Arc, Mutex};

use crate::Result;

enum LazyState<T> {
    /// Built in memory by the author.
    Authoring(Arc<T>),
    /// Stored in the bound file at this offset, not read yet.
    Unhydrated(u32),
    /// Read from the bound file.
    Hydrated(Arc<T>),
}

pub(crate) struct Lazy<T> {
    state: Mutex<LazyState<T>>,
}

impl<T> Lazy<T> {
    pub(crate) fn authoring(value: T) -> Self {
        Lazy {
            state: Mutex::new(LazyState::Authoring(Arc::new(value))),
        }
    }

    pub(crate) fn unhydrated(offset: u32) -> Self {
        Lazy {
            state: Mutex::new(LazyState::Unhydrated(offset)),
        }
    }

    /// A bound slot whose value needs no file access.
    pub(crate) fn hydrated(value: T) -> Self {
        Lazy {
            state: Mutex::new(LazyState::Hydrated(Arc::new(value))),
        }
    }

    /// Return the value, running `hydrate` with the stored offset on first access.
    ///
    /// A failed hydration leaves the slot unhydrated so the error repeats on the next call.
    pub(crate) fn get_or_hydrate<F>(&self, hydrate: F) -> Result<Arc<T>>
    where
        F: FnOnce(u32) -> Result<T>,
    {
        let mut state = lock!(self.state);
        match &*state {
            LazyState::Authoring(value) | LazyState::Hydrated(value) => Ok(Arc::clone(value)),
            LazyState::Unhydrated(offset) => {
                let value = Arc::new(hydrate(*offset)?);
                *state = LazyState::Hydrated(Arc::clone(&value));
                Ok(value)
            }
        }
    }

    pub(crate) fn is_loaded(&self) -> bool {
        self.state
            .lock()
            .map(|state| !matches!(*state, LazyState::Unhydrated(_)))
            .unwrap_or(false)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.state.lock() {
            Ok(state) => match &*state {
                LazyState::Authoring(value) => f.debug_tuple("Authoring").field(value).finish(),
                LazyState::Unhydrated(offset) => f.debug_tuple("Unhydrated").field(offset).finish(),
                LazyState::Hydrated(value) => f.debug_tuple("Hydrated").field(value).finish(),
            },
            Err(_) => f.write_str("Poisoned"),
        }
    }
}
