use std::{
    cell::{Cell, Ref, RefCell},
    rc::Rc,
};

use crate::{
    core::{
        BindKey, BindSink, BindSource, Discard, NotifyContext, NotifyLevel, SinkBindings, Slot,
        SourceBinder, UpdateContext, ValueRef,
    },
    SignalContext,
};

use super::ReadNode;

pub(super) fn compute_node<T, F>(f: F) -> Rc<ComputeNode<T, Plain<F>>>
where
    T: 'static,
    F: Fn(&mut SignalContext) -> T + 'static,
{
    ComputeNode::with_compute(Plain(f))
}

pub(super) fn compute_node_dedup<T, F>(f: F) -> Rc<ComputeNode<T, Dedup<F>>>
where
    T: PartialEq + 'static,
    F: Fn(&mut SignalContext) -> T + 'static,
{
    ComputeNode::with_compute(Dedup(f))
}

pub(super) trait ComputeFn<T>: 'static {
    /// True if a recomputation can turn out to be a no-op,
    /// in which case dependents are only notified `MaybeDirty`.
    const FILTER: bool;
    fn call(&mut self, value: &mut Option<T>, sc: &mut SignalContext) -> bool;
}

pub(super) struct Plain<F>(F);

impl<T, F> ComputeFn<T> for Plain<F>
where
    T: 'static,
    F: Fn(&mut SignalContext) -> T + 'static,
{
    const FILTER: bool = false;
    fn call(&mut self, value: &mut Option<T>, sc: &mut SignalContext) -> bool {
        *value = Some((self.0)(sc));
        true
    }
}

pub(super) struct Dedup<F>(F);

impl<T, F> ComputeFn<T> for Dedup<F>
where
    T: PartialEq + 'static,
    F: Fn(&mut SignalContext) -> T + 'static,
{
    const FILTER: bool = true;
    fn call(&mut self, value: &mut Option<T>, sc: &mut SignalContext) -> bool {
        let value_new = (self.0)(sc);
        if value.as_ref() == Some(&value_new) {
            false
        } else {
            *value = Some(value_new);
            true
        }
    }
}

struct ComputeData<T, C> {
    value: Option<T>,
    compute: C,
    sb: SourceBinder,
}

/// Memoized computation node.
///
/// The cached value is discarded once the last observer unbinds.
pub(super) struct ComputeNode<T, C>
where
    T: 'static,
    C: ComputeFn<T>,
{
    sinks: RefCell<SinkBindings>,
    data: RefCell<ComputeData<T, C>>,
    discard_scheduled: Cell<bool>,
}

impl<T, C> ComputeNode<T, C>
where
    T: 'static,
    C: ComputeFn<T>,
{
    fn with_compute(compute: C) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            sinks: RefCell::new(SinkBindings::new()),
            data: RefCell::new(ComputeData {
                value: None,
                compute,
                sb: SourceBinder::new(this, Slot(0)),
            }),
            discard_scheduled: Cell::new(false),
        })
    }

    fn watch(self: &Rc<Self>, sc: &mut SignalContext) {
        self.sinks.borrow_mut().bind(self.clone(), Slot(0), sc);
        self.update(sc.uc());
    }
    fn update(self: &Rc<Self>, uc: &mut UpdateContext) {
        if uc.borrow(&self.data).sb.is_clean() {
            return;
        }
        let d = &mut *self.data.borrow_mut();
        let is_dirty = if d.sb.check(uc) {
            d.sb.update(|sc| d.compute.call(&mut d.value, sc), uc)
        } else {
            false
        };
        self.sinks.borrow_mut().update(is_dirty, uc);
    }
    fn try_schedule_discard(self: &Rc<Self>, uc: &mut UpdateContext) {
        if self.sinks.borrow().is_empty() && !self.discard_scheduled.replace(true) {
            uc.schedule_discard(self.clone(), Slot(0));
        }
    }
}

impl<T, C> ReadNode for ComputeNode<T, C>
where
    T: 'static,
    C: ComputeFn<T>,
{
    type Value = T;

    fn borrow<'a>(
        self: Rc<Self>,
        inner: &'a Self,
        sc: &mut SignalContext,
    ) -> ValueRef<'a, Self::Value> {
        self.watch(sc);
        Ref::map(inner.data.borrow(), |d| {
            d.value.as_ref().expect("the computed value is not cached")
        })
        .into()
    }
}

impl<T, C> BindSource for ComputeNode<T, C>
where
    T: 'static,
    C: ComputeFn<T>,
{
    fn check(self: Rc<Self>, _slot: Slot, key: BindKey, uc: &mut UpdateContext) -> bool {
        self.update(uc);
        self.sinks.borrow().is_dirty(key, uc)
    }

    fn unbind(self: Rc<Self>, _slot: Slot, key: BindKey, uc: &mut UpdateContext) {
        self.sinks.borrow_mut().unbind(key, uc);
        self.try_schedule_discard(uc);
    }
}
impl<T, C> BindSink for ComputeNode<T, C>
where
    T: 'static,
    C: ComputeFn<T>,
{
    fn notify(self: Rc<Self>, slot: Slot, level: NotifyLevel, nc: &mut NotifyContext) {
        if self.data.borrow_mut().sb.on_notify(slot, level) {
            self.sinks
                .borrow_mut()
                .notify(level.with_filter(C::FILTER), nc)
        }
    }
}
impl<T, C> Discard for ComputeNode<T, C>
where
    T: 'static,
    C: ComputeFn<T>,
{
    fn discard(self: Rc<Self>, _slot: Slot, uc: &mut UpdateContext) {
        self.discard_scheduled.set(false);
        if self.sinks.borrow().is_empty() {
            let d = &mut *self.data.borrow_mut();
            d.value = None;
            d.sb.clear(uc);
        }
    }
}
