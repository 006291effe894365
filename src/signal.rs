use std::{
    cell::{RefCell, RefMut},
    rc::Rc,
};

use derive_ex::derive_ex;
use serde::{Deserialize, Serialize};

use crate::{
    core::{
        schedule_notify, BindKey, BindSink, BindSource, NotifyContext, NotifyLevel, SinkBindings,
        Slot, UpdateContext, ValueRef,
    },
    read_signal::ReadNode,
    ActionContext, ReadSignal, SignalContext, ToReadSignal,
};

#[cfg(test)]
mod tests;

/// Reactive mutable cell.
///
/// Similar to `Rc<RefCell<T>>`, but with added functionality to observe changes.
/// Clones share the same cell, so a handle obtained twice behaves identically
/// to a handle cloned once.
#[derive(Default)]
#[derive_ex(Clone, bound())]
pub struct Signal<T: 'static>(Rc<SignalNode<T>>);

impl<T: 'static> Signal<T> {
    /// Create a new `Signal` with the given initial value.
    pub fn new(value: T) -> Self {
        Self(Rc::new(SignalNode {
            sinks: RefCell::new(SinkBindings::new()),
            value: RefCell::new(value),
        }))
    }

    /// Obtains a reference to the current value and adds a dependency on this signal to the specified `SignalContext`.
    pub fn borrow<'a>(&'a self, sc: &mut SignalContext) -> ValueRef<'a, T> {
        self.0.bind(sc);
        self.0.value.borrow().into()
    }

    /// Gets the current value and adds a dependency on this signal to the specified `SignalContext`.
    pub fn get(&self, sc: &mut SignalContext) -> T
    where
        T: Clone,
    {
        self.borrow(sc).clone()
    }

    /// Sets the value of the signal and notifies the dependents.
    pub fn set(&self, value: T, ac: &mut ActionContext) {
        *self.0.value.borrow_mut() = value;
        self.0.notify_raw(ac.nc());
    }

    /// Sets the value of the signal and notifies the dependents only if the current value is different from the specified value.
    pub fn set_dedup(&self, value: T, ac: &mut ActionContext)
    where
        T: PartialEq,
    {
        let mut this_value = self.0.value.borrow_mut();
        if *this_value != value {
            *this_value = value;
            self.0.notify_raw(ac.nc());
        }
    }

    /// Updates the value in place through `f`, then notifies the dependents.
    pub fn update(&self, f: impl FnOnce(&mut T), ac: &mut ActionContext) {
        f(&mut self.0.value.borrow_mut());
        self.0.notify_raw(ac.nc());
    }

    /// Mutably borrows the value.
    ///
    /// This method can only borrow one signal at a time.
    /// To borrow more than one signal at a time, use [`borrow_mut_loose`](Self::borrow_mut_loose).
    ///
    /// When the borrow ends after a mutable dereference, notifications are sent to the dependents.
    pub fn borrow_mut<'a>(&'a self, ac: &'a mut ActionContext) -> SignalRefMut<'a, T> {
        SignalRefMut {
            value: self.0.value.borrow_mut(),
            is_dirty: false,
            node: &self.0,
            nc: Some(ac.nc()),
        }
    }

    /// Mutably borrows the value, deferring the notification through the runtime queue.
    ///
    /// This method can be used to borrow multiple signals simultaneously.
    /// Panic if you try to borrow or read the same signal while borrowing.
    pub fn borrow_mut_loose(&self, _ac: &mut ActionContext) -> SignalRefMut<'_, T> {
        SignalRefMut {
            value: self.0.value.borrow_mut(),
            is_dirty: false,
            node: &self.0,
            nc: None,
        }
    }

    /// Returns a read-only handle sharing this cell.
    pub fn to_read_signal(&self) -> ReadSignal<T> {
        ReadSignal::from_node(self.0.clone())
    }

    /// Returns true if both handles refer to the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl<T: std::fmt::Debug> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.value.try_borrow() {
            Ok(value) => std::fmt::Debug::fmt(&*value, f),
            Err(_) => write!(f, "<borrowed>"),
        }
    }
}
impl<T> Serialize for Signal<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        match self.0.value.try_borrow() {
            Ok(value) => T::serialize(&*value, serializer),
            Err(_) => Err(serde::ser::Error::custom("borrowed")),
        }
    }
}
impl<'de, T> Deserialize<'de> for Signal<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Signal<T>, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        T::deserialize(deserializer).map(|value| Signal::new(value))
    }
}
impl<T> ToReadSignal for Signal<T> {
    type Value = T;
    fn to_read_signal(&self) -> ReadSignal<Self::Value> {
        self.to_read_signal()
    }
}

#[derive(Default)]
struct SignalNode<T: 'static> {
    sinks: RefCell<SinkBindings>,
    value: RefCell<T>,
}
impl<T: 'static> SignalNode<T> {
    fn bind(self: &Rc<Self>, sc: &mut SignalContext) {
        self.sinks.borrow_mut().bind(self.clone(), Slot(0), sc);
    }
    fn notify_raw(&self, nc: &mut NotifyContext) {
        self.sinks.borrow_mut().notify(NotifyLevel::Dirty, nc)
    }
    fn schedule_notify(self: &Rc<Self>, nc: &mut Option<&mut NotifyContext>) {
        if let Some(nc) = nc {
            self.notify_raw(nc);
        } else {
            let node = Rc::downgrade(self);
            schedule_notify(node, Slot(0))
        }
    }
}

impl<T: 'static> BindSource for SignalNode<T> {
    fn check(self: Rc<Self>, _slot: Slot, key: BindKey, uc: &mut UpdateContext) -> bool {
        self.sinks.borrow().is_dirty(key, uc)
    }

    fn unbind(self: Rc<Self>, _slot: Slot, key: BindKey, uc: &mut UpdateContext) {
        self.sinks.borrow_mut().unbind(key, uc);
    }
}
impl<T: 'static> BindSink for SignalNode<T> {
    fn notify(self: Rc<Self>, _slot: Slot, _level: NotifyLevel, nc: &mut NotifyContext) {
        self.notify_raw(nc);
    }
}

impl<T: 'static> ReadNode for SignalNode<T> {
    type Value = T;
    fn borrow<'a>(
        self: Rc<Self>,
        inner: &'a Self,
        sc: &mut SignalContext,
    ) -> ValueRef<'a, Self::Value> {
        self.bind(sc);
        inner.value.borrow().into()
    }
}

/// RAII mutable borrow of a [`Signal`]'s value.
pub struct SignalRefMut<'a, T: 'static> {
    value: RefMut<'a, T>,
    is_dirty: bool,
    node: &'a Rc<SignalNode<T>>,
    nc: Option<&'a mut NotifyContext>,
}
impl<T> std::ops::Deref for SignalRefMut<'_, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.value
    }
}
impl<T> std::ops::DerefMut for SignalRefMut<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.is_dirty = true;
        &mut self.value
    }
}
impl<T> Drop for SignalRefMut<'_, T> {
    fn drop(&mut self) {
        if self.is_dirty {
            self.node.schedule_notify(&mut self.nc);
        }
    }
}
