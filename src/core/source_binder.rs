use std::rc::Weak;

use crate::SignalContext;

use super::{BindSink, Dirty, NotifyLevel, Slot, SourceBindings, UpdateContext};

/// Dependency bookkeeping for a sink node with a single bind point.
///
/// Combines the recorded sources with the node's own dirty flag and
/// implements the check-then-recompute protocol used by derived signals,
/// effects and other sink nodes.
pub struct SourceBinder {
    sources: SourceBindings,
    dirty: Dirty,
    sink: Weak<dyn BindSink>,
    slot: Slot,
}
impl SourceBinder {
    pub fn new(sink: &Weak<impl BindSink>, slot: Slot) -> Self {
        Self {
            sources: SourceBindings::new(),
            dirty: Dirty::Dirty,
            sink: sink.clone(),
            slot,
        }
    }
    pub fn is_clean(&self) -> bool {
        self.dirty.is_clean()
    }

    /// Return whether the node needs to recompute, resolving `MaybeDirty` by
    /// checking the recorded sources.
    pub fn check(&mut self, uc: &mut UpdateContext) -> bool {
        if self.dirty == Dirty::MaybeDirty {
            self.dirty = Dirty::from_is_dirty(self.sources.check(uc));
        }
        self.dirty == Dirty::Dirty
    }
    /// Recompute through `f`, rebuilding the recorded sources.
    pub fn update<T>(
        &mut self,
        f: impl FnOnce(&mut SignalContext) -> T,
        uc: &mut UpdateContext,
    ) -> T {
        self.dirty = Dirty::Clean;
        self.sources.update(self.sink.clone(), self.slot, f, uc)
    }
    pub fn clear(&mut self, uc: &mut UpdateContext) {
        self.sources.clear(uc);
        self.dirty = Dirty::Dirty;
    }
    /// Returns true if the node was clean and its dependents should be notified.
    pub fn on_notify(&mut self, slot: Slot, level: NotifyLevel) -> bool {
        let mut need_notify = false;
        if slot == self.slot {
            need_notify = self.dirty.needs_notify();
            self.dirty |= level;
        }
        need_notify
    }
}
