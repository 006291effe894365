use std::{
    any::{Any, TypeId},
    collections::HashMap,
    rc::Rc,
};

use derive_ex::derive_ex;

use crate::{store::StoreKey, Signal};


/// Immutable default-state configuration for a [`SignalStore`](crate::SignalStore).
///
/// Enumerates the initial value for every key a store may serve. Built once
/// at application setup and shared by reference: cloning is cheap, and any
/// number of store scopes can be created from the same configuration without
/// their cells aliasing.
#[derive_ex(Clone, bound())]
pub struct StateConfig<K: StoreKey>(Rc<HashMap<K, Seed>>);

impl<K: StoreKey> StateConfig<K> {
    pub fn builder() -> StateConfigBuilder<K> {
        StateConfigBuilder {
            seeds: HashMap::new(),
        }
    }

    pub(crate) fn seed(&self, key: &K) -> Option<&Seed> {
        self.0.get(key)
    }
    pub fn contains(&self, key: &K) -> bool {
        self.0.contains_key(key)
    }
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.0.keys()
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
impl<K: StoreKey> std::fmt::Debug for StateConfig<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

/// Builder for [`StateConfig`].
///
/// Registering the same key twice keeps the last registration.
pub struct StateConfigBuilder<K: StoreKey> {
    seeds: HashMap<K, Seed>,
}

impl<K: StoreKey> StateConfigBuilder<K> {
    /// Register `value` as the default for `key`.
    ///
    /// The value is cloned into each store cell that materializes from it.
    pub fn with<T: Clone + 'static>(mut self, key: K, value: T) -> Self {
        self.seeds.insert(key, Seed::of(move || value.clone()));
        self
    }
    /// Register a default for `key` produced on demand.
    ///
    /// Use this for defaults that are expensive to build or not `Clone`.
    pub fn with_fn<T: 'static>(mut self, key: K, make: impl Fn() -> T + 'static) -> Self {
        self.seeds.insert(key, Seed::of(make));
        self
    }
    pub fn build(self) -> StateConfig<K> {
        StateConfig(Rc::new(self.seeds))
    }
}

pub(crate) struct Seed {
    make: Box<dyn Fn() -> Rc<dyn Any>>,
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
}

impl Seed {
    fn of<T: 'static>(make_value: impl Fn() -> T + 'static) -> Self {
        Self {
            make: Box::new(move || Rc::new(Signal::new(make_value())) as Rc<dyn Any>),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }
    /// Create a fresh cell holding the configured default.
    pub(crate) fn materialize(&self) -> Rc<dyn Any> {
        (self.make)()
    }
}
