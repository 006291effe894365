use std::{
    any::{Any, TypeId},
    cell::RefCell,
    collections::HashMap,
    fmt::Debug,
    hash::Hash,
    rc::Rc,
};

use crate::{ActionContext, Signal, SignalContext, StateConfig};

#[cfg(test)]
mod tests;

/// Key type usable with a [`SignalStore`].
///
/// Blanket-implemented; application key enums qualify automatically.
pub trait StoreKey: Eq + Hash + Clone + Debug + 'static {}
impl<K: Eq + Hash + Clone + Debug + 'static> StoreKey for K {}

/// Keyed map of [`Signal`] cells, lazily seeded from a [`StateConfig`].
///
/// Cells are materialized from their configured default on first access and
/// live until the store is dropped. Handles already given out keep their cell
/// alive past that point (the cell is shared, not owned exclusively by the
/// store).
pub struct SignalStore<K: StoreKey> {
    config: StateConfig<K>,
    cells: RefCell<HashMap<K, Rc<dyn Any>>>,
}

impl<K: StoreKey> SignalStore<K> {
    pub fn new(config: StateConfig<K>) -> Self {
        Self {
            config,
            cells: RefCell::new(HashMap::new()),
        }
    }

    /// Returns the signal registered under `key`.
    ///
    /// The first access for a key materializes its cell from the configured
    /// default. Repeated calls with the same key return handles to the same
    /// cell, so dependents bound through any handle observe writes through
    /// every other one.
    pub fn signal<T: 'static>(&self, key: &K) -> Result<Signal<T>, StoreError<K>> {
        let seed = self
            .config
            .seed(key)
            .ok_or_else(|| StoreError::UnknownKey(key.clone()))?;
        if seed.type_id != TypeId::of::<T>() {
            return Err(StoreError::TypeMismatch {
                key: key.clone(),
                requested: std::any::type_name::<T>(),
                stored: seed.type_name,
            });
        }
        let mut cells = self.cells.borrow_mut();
        let cell = cells
            .entry(key.clone())
            .or_insert_with(|| seed.materialize());
        Ok(cell
            .downcast_ref::<Signal<T>>()
            .expect("cell type verified against the seed")
            .clone())
    }

    /// Gets the current value for `key` and adds a dependency on its cell to the specified `SignalContext`.
    pub fn get<T: Clone + 'static>(
        &self,
        key: &K,
        sc: &mut SignalContext,
    ) -> Result<T, StoreError<K>> {
        Ok(self.signal::<T>(key)?.get(sc))
    }

    /// Overwrites the value for `key` and notifies the dependents of its cell.
    pub fn set<T: 'static>(
        &self,
        key: &K,
        value: T,
        ac: &mut ActionContext,
    ) -> Result<(), StoreError<K>> {
        self.signal::<T>(key)?.set(value, ac);
        Ok(())
    }

    /// Updates the value for `key` in place through `f`, then notifies the dependents of its cell.
    pub fn update<T: 'static>(
        &self,
        key: &K,
        f: impl FnOnce(&mut T),
        ac: &mut ActionContext,
    ) -> Result<(), StoreError<K>> {
        self.signal::<T>(key)?.update(f, ac);
        Ok(())
    }

    /// Returns true if `key` is registered in the configuration.
    pub fn contains(&self, key: &K) -> bool {
        self.config.contains(key)
    }
    /// Returns true if the cell for `key` has already been materialized.
    pub fn is_materialized(&self, key: &K) -> bool {
        self.cells.borrow().contains_key(key)
    }
    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.config.len()
    }
    pub fn is_empty(&self) -> bool {
        self.config.is_empty()
    }
    pub fn config(&self) -> &StateConfig<K> {
        &self.config
    }
}
impl<K: StoreKey> Debug for SignalStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Error returned by keyed store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError<K> {
    /// The key has no entry in the default-state configuration.
    UnknownKey(K),
    /// The cell registered under the key holds a different value type.
    TypeMismatch {
        key: K,
        requested: &'static str,
        stored: &'static str,
    },
}
impl<K: Debug> std::fmt::Display for StoreError<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::UnknownKey(key) => {
                write!(f, "the key {key:?} is not registered in the default state")
            }
            StoreError::TypeMismatch {
                key,
                requested,
                stored,
            } => {
                write!(f, "the cell for key {key:?} holds `{stored}`, not `{requested}`")
            }
        }
    }
}
impl<K: Debug> std::error::Error for StoreError<K> {}
