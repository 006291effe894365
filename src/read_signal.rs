use std::{any::Any, rc::Rc};

use derive_ex::derive_ex;

use crate::{core::ValueRef, effect, SignalContext, Subscription};

mod compute;


use compute::{compute_node, compute_node_dedup};

/// A node observable through a [`ReadSignal`].
///
/// Implement this to build custom reactive primitives on top of the
/// [`core`](crate::core) module.
pub trait ReadNode: 'static {
    type Value: ?Sized + 'static;
    fn borrow<'a>(
        self: Rc<Self>,
        inner: &'a Self,
        sc: &mut SignalContext,
    ) -> ValueRef<'a, Self::Value>;
}

trait DynReadNode {
    type Value: ?Sized + 'static;
    fn dyn_borrow<'a>(
        self: Rc<Self>,
        inner: &'a dyn Any,
        sc: &mut SignalContext,
    ) -> ValueRef<'a, Self::Value>;

    fn as_any(&self) -> &dyn Any;
}

impl<S: ReadNode + 'static> DynReadNode for S {
    type Value = S::Value;

    fn dyn_borrow<'a>(
        self: Rc<Self>,
        inner: &'a dyn Any,
        sc: &mut SignalContext,
    ) -> ValueRef<'a, Self::Value> {
        self.borrow(inner.downcast_ref().unwrap(), sc)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive_ex(Clone)]
enum RawReadSignal<T: ?Sized + 'static> {
    StaticRef(&'static T),
    Node(Rc<dyn DynReadNode<Value = T>>),
}

/// Read-only handle to a reactive value.
///
/// Similar to `Rc<dyn Fn() -> &T>`, but with added functionality to observe
/// changes in the result. Obtained from a writable
/// [`Signal`](crate::Signal), a computation ([`new`](Self::new)), a constant,
/// or a custom [`ReadNode`].
#[derive_ex(Clone)]
pub struct ReadSignal<T: ?Sized + 'static>(RawReadSignal<T>);

impl<T: ?Sized + 'static> ReadSignal<T> {
    /// Create a memoized signal computed from other signals.
    ///
    /// The computation runs lazily: only while observed, and only when one of
    /// the signals it read last time has changed.
    pub fn new(f: impl Fn(&mut SignalContext) -> T + 'static) -> Self
    where
        T: Sized,
    {
        Self::from_node(compute_node(f))
    }
    /// Like [`new`](Self::new), but dependents are notified only when the
    /// computed value actually changed.
    pub fn new_dedup(f: impl Fn(&mut SignalContext) -> T + 'static) -> Self
    where
        T: Sized + PartialEq,
    {
        Self::from_node(compute_node_dedup(f))
    }

    pub fn from_value(value: T) -> Self
    where
        T: Sized,
    {
        Self::from_node(Rc::new(ConstantNode { value }))
    }
    pub fn from_static_ref(value: &'static T) -> Self {
        ReadSignal(RawReadSignal::StaticRef(value))
    }
    pub fn from_node(node: Rc<impl ReadNode<Value = T>>) -> Self {
        ReadSignal(RawReadSignal::Node(node))
    }

    /// Obtains a reference to the current value and adds a dependency on this signal to the specified `SignalContext`.
    pub fn borrow<'a>(&'a self, sc: &mut SignalContext) -> ValueRef<'a, T> {
        match &self.0 {
            RawReadSignal::StaticRef(value) => ValueRef::from(*value),
            RawReadSignal::Node(node) => node.clone().dyn_borrow(node.as_any(), sc),
        }
    }
    /// Gets the current value and adds a dependency on this signal to the specified `SignalContext`.
    pub fn get(&self, sc: &mut SignalContext) -> <T as ToOwned>::Owned
    where
        T: ToOwned,
    {
        self.borrow(sc).into_owned()
    }

    /// Projects this signal through a reference-returning function.
    pub fn map<U: ?Sized + 'static>(&self, f: impl Fn(&T) -> &U + 'static) -> ReadSignal<U> {
        ReadSignal::from_node(Rc::new(MapNode {
            source: self.clone(),
            map: f,
        }))
    }

    /// Call `f` with the current value and again whenever it changes.
    ///
    /// Runs when the runtime performs its tasks, like [`effect`].
    pub fn subscribe(&self, mut f: impl FnMut(&T) + 'static) -> Subscription {
        let this = self.clone();
        effect(move |sc| f(&this.borrow(sc)))
    }
}
impl<T: ?Sized + 'static> ToReadSignal for ReadSignal<T> {
    type Value = T;
    fn to_read_signal(&self) -> ReadSignal<Self::Value> {
        self.clone()
    }
}

struct ConstantNode<T> {
    value: T,
}
impl<T: 'static> ReadNode for ConstantNode<T> {
    type Value = T;

    fn borrow<'a>(
        self: Rc<Self>,
        inner: &'a Self,
        _sc: &mut SignalContext,
    ) -> ValueRef<'a, Self::Value> {
        ValueRef::from(&inner.value)
    }
}

struct MapNode<T: ?Sized + 'static, F> {
    source: ReadSignal<T>,
    map: F,
}
impl<T, F, U> ReadNode for MapNode<T, F>
where
    T: ?Sized + 'static,
    F: Fn(&T) -> &U + 'static,
    U: ?Sized + 'static,
{
    type Value = U;

    fn borrow<'a>(
        self: Rc<Self>,
        inner: &'a Self,
        sc: &mut SignalContext,
    ) -> ValueRef<'a, Self::Value> {
        ValueRef::map(inner.source.borrow(sc), &inner.map)
    }
}

/// Conversion into a [`ReadSignal`].
pub trait ToReadSignal {
    type Value: ?Sized + 'static;
    fn to_read_signal(&self) -> ReadSignal<Self::Value>;
}
impl<T> ToReadSignal for &T
where
    T: ?Sized + ToReadSignal,
{
    type Value = T::Value;
    fn to_read_signal(&self) -> ReadSignal<Self::Value> {
        (*self).to_read_signal()
    }
}
