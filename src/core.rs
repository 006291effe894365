//! Low-level reactive runtime.
//!
//! This module owns the dependency graph and the scheduler queues. The
//! higher-level primitives ([`Signal`](crate::Signal),
//! [`ReadSignal`](crate::ReadSignal), [`effect`](crate::effect),
//! [`SignalStore`](crate::SignalStore)) are built on top of it, and custom
//! primitives can be too.

use std::{
    any::Any,
    cell::{Ref, RefCell},
    cmp::{max, min},
    mem::{replace, swap, take, transmute},
    rc::{Rc, Weak},
    thread::AccessError,
};

use derive_ex::{derive_ex, Ex};
use parse_display::Display;
use slabmap::SlabMap;

use crate::utils::ISizeMap;

mod dirty;
mod source_binder;
mod value_ref;

pub use dirty::{Dirty, NotifyLevel};
pub use source_binder::SourceBinder;
pub use value_ref::ValueRef;


thread_local! {
    static GLOBALS: RefCell<Globals> = RefCell::new(Globals::new());
}

struct Globals {
    is_runtime_exists: bool,
    unbinds: Vec<Vec<SourceBinding>>,
    actions: Vec<Action>,
    notifys: Vec<NotifyTask>,
    tasks: Tasks,
}
impl Globals {
    fn new() -> Self {
        Self {
            is_runtime_exists: false,
            unbinds: Vec::new(),
            actions: Vec::new(),
            notifys: Vec::new(),
            tasks: Tasks::new(),
        }
    }
    fn with<T>(f: impl FnOnce(&mut Self) -> T) -> T {
        GLOBALS.with(|g| f(&mut g.borrow_mut()))
    }
    fn try_with<T>(f: impl FnOnce(&mut Self) -> T) -> Result<T, AccessError> {
        GLOBALS.try_with(|g| f(&mut g.borrow_mut()))
    }
    fn schedule_task(kind: TaskKind, task: Task) {
        Self::with(|g| g.tasks.push(kind, task))
    }
    fn get_notifys(notifys: &mut Vec<NotifyTask>) -> bool {
        Self::with(|g| swap(notifys, &mut g.notifys));
        !notifys.is_empty()
    }
    fn get_tasks(kind: Option<TaskKind>, tasks: &mut Vec<Task>) {
        Self::with(|g| g.tasks.drain(kind, tasks))
    }
    fn get_actions(actions: &mut Vec<Action>) -> bool {
        Self::with(|g| swap(actions, &mut g.actions));
        !actions.is_empty()
    }
    fn swap_vec<T>(f: impl FnOnce(&mut Self) -> &mut Vec<T>, values: &mut Vec<T>) -> bool {
        Self::with(|g| swap(f(g), values));
        !values.is_empty()
    }
    fn assert_exists(&self) {
        if !self.is_runtime_exists {
            panic!("`Runtime` is not created.");
        }
    }
    fn push_action(&mut self, action: Action) {
        self.assert_exists();
        self.actions.push(action);
    }
    fn push_notify(&mut self, sink: Weak<dyn BindSink>, slot: Slot) {
        self.notifys.push(NotifyTask { sink, slot });
    }
    fn finish_runtime(&mut self) {
        self.is_runtime_exists = false;
    }
}

/// Reactive runtime.
///
/// Drives all deferred work: spawned actions, invalidation notifications,
/// effect tasks and cache discards. Only one `Runtime` can exist per thread.
#[derive_ex(Default)]
#[default(Self::new())]
pub struct Runtime {
    rt: RawRuntime,
    notifys_buffer: Vec<NotifyTask>,
    actions_buffer: Vec<Action>,
    tasks_buffer: Vec<Task>,
    unbinds_buffer: Vec<Vec<SourceBinding>>,
}
impl Runtime {
    pub fn new() -> Self {
        if Globals::with(|g| replace(&mut g.is_runtime_exists, true)) {
            panic!("Only one `Runtime` can exist in the same thread at the same time.");
        }
        Self {
            rt: RawRuntime::new(),
            notifys_buffer: Vec::new(),
            actions_buffer: Vec::new(),
            tasks_buffer: Vec::new(),
            unbinds_buffer: Vec::new(),
        }
    }

    /// Context for changing state.
    pub fn ac(&mut self) -> &mut ActionContext {
        ActionContext::new(self)
    }
    fn nc(&mut self) -> &mut NotifyContext {
        self.ac().nc()
    }
    fn uc(&mut self) -> UpdateContext {
        UpdateContext(self.sc_raw())
    }
    /// Context for retrieving state.
    pub fn sc(&mut self) -> SignalContext {
        self.apply_notify();
        self.sc_raw()
    }
    fn sc_raw(&mut self) -> SignalContext {
        SignalContext {
            rt: &mut self.rt,
            sink: None,
        }
    }

    /// Perform scheduled actions.
    ///
    /// Returns `true` if any action was performed.
    pub fn run_actions(&mut self) -> bool {
        let mut handled = false;
        let mut actions = take(&mut self.actions_buffer);
        while Globals::get_actions(&mut actions) {
            for action in actions.drain(..) {
                action.call(self.ac());
                handled = true;
            }
        }
        self.actions_buffer = actions;
        handled
    }

    /// Perform scheduled tasks.
    ///
    /// If `kind` is `None`, all tasks are executed.
    ///
    /// Returns `true` if any task was performed.
    pub fn run_tasks(&mut self, kind: Option<TaskKind>) -> bool {
        self.apply_notify();
        let mut tasks = take(&mut self.tasks_buffer);
        Globals::get_tasks(kind, &mut tasks);
        let handled = !tasks.is_empty();
        for task in tasks.drain(..) {
            task.run(&mut self.uc());
        }
        self.tasks_buffer = tasks;
        handled
    }
    fn apply_unbind(&mut self) -> bool {
        let mut handled = false;
        let mut unbinds = take(&mut self.unbinds_buffer);
        while Globals::swap_vec(|g| &mut g.unbinds, &mut unbinds) {
            for unbind in unbinds.drain(..) {
                for sb in unbind {
                    sb.unbind(&mut self.uc());
                }
                handled = true;
            }
        }
        self.unbinds_buffer = unbinds;
        handled
    }
    fn apply_notify(&mut self) -> bool {
        let mut handled = self.apply_unbind();
        let mut notifys = take(&mut self.notifys_buffer);
        while Globals::get_notifys(&mut notifys) {
            for notify in notifys.drain(..) {
                notify.call_notify(self.nc());
                handled = true;
            }
        }
        self.notifys_buffer = notifys;
        handled
    }

    /// Perform scheduled cache discards.
    ///
    /// Returns `true` if any discard was performed.
    pub fn run_discards(&mut self) -> bool {
        let mut handled = false;
        loop {
            if let Some(task) = self.rt.discards.pop() {
                task.call_discard(&mut self.uc());
                handled = true;
                continue;
            }
            if self.apply_unbind() {
                handled = true;
                continue;
            }
            break;
        }
        handled
    }

    /// Repeat [`run_actions`](Self::run_actions), [`run_tasks`](Self::run_tasks)
    /// and [`run_discards`](Self::run_discards) until there is no more work.
    pub fn update(&mut self) {
        loop {
            if self.run_actions() {
                continue;
            }
            if self.run_tasks(None) {
                continue;
            }
            if self.run_discards() {
                continue;
            }
            break;
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        Globals::with(|g| g.finish_runtime());
    }
}

struct RawRuntime {
    discards: Vec<DiscardTask>,
}

impl RawRuntime {
    fn new() -> Self {
        Self {
            discards: Vec::new(),
        }
    }
}

/// Identifies one of several bind points a node exposes.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Slot(pub usize);

/// Identifies one edge in a source's sink table.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct BindKey(usize);

struct SourceBinding {
    source: Rc<dyn BindSource>,
    slot: Slot,
    key: BindKey,
}
impl SourceBinding {
    fn is_same(&self, node: &Rc<dyn BindSource>, slot: Slot) -> bool {
        Rc::ptr_eq(&self.source, node) && self.slot == slot
    }
    fn check(&self, uc: &mut UpdateContext) -> bool {
        self.source.clone().check(self.slot, self.key, uc)
    }
    fn unbind(self, uc: &mut UpdateContext) {
        self.source.unbind(self.slot, self.key, uc);
    }
}

/// The source half of the edges recorded while one sink recomputed.
#[derive(Default)]
pub struct SourceBindings(Vec<SourceBinding>);

impl SourceBindings {
    pub fn new() -> Self {
        Self::default()
    }
    /// Return true if any source reports an actual change.
    pub fn check(&self, uc: &mut UpdateContext) -> bool {
        for source in &self.0 {
            if source.check(uc) {
                return true;
            }
        }
        false
    }

    /// Run `f` with dependency tracking directed at `sink`, replacing the previously recorded sources.
    ///
    /// Sources re-read in the same order are reused without touching their sink tables.
    pub fn update<T>(
        &mut self,
        sink: Weak<dyn BindSink>,
        slot: Slot,
        f: impl FnOnce(&mut SignalContext) -> T,
        uc: &mut UpdateContext,
    ) -> T {
        let mut sink = Sink {
            sink,
            slot,
            sources: take(self),
            sources_len: 0,
        };
        let mut sc = SignalContext {
            rt: &mut *uc.0.rt,
            sink: Some(&mut sink),
        };
        let ret = f(&mut sc);
        *self = sink.sources;
        for b in self.0.drain(sink.sources_len..) {
            b.unbind(uc);
        }
        ret
    }
    pub fn clear(&mut self, uc: &mut UpdateContext) {
        for b in self.0.drain(..) {
            b.unbind(uc)
        }
    }
}
impl Drop for SourceBindings {
    fn drop(&mut self) {
        if !self.0.is_empty() {
            let _ = Globals::try_with(|g| g.unbinds.push(take(&mut self.0)));
        }
    }
}

struct SinkBinding {
    sink: Weak<dyn BindSink>,
    slot: Slot,
    dirty: Dirty,
}

impl SinkBinding {
    fn notify(&self, level: NotifyLevel, nc: &mut NotifyContext) {
        if let Some(node) = self.sink.upgrade() {
            node.notify(self.slot, level, nc)
        }
    }
}

/// The sink half of a source's edges.
#[derive(Default)]
pub struct SinkBindings(SlabMap<SinkBinding>);

impl SinkBindings {
    pub fn new() -> Self {
        Self(SlabMap::new())
    }
    /// Record the currently recomputing sink (if any) as a dependent of `this`.
    pub fn bind(&mut self, this: Rc<dyn BindSource>, this_slot: Slot, sc: &mut SignalContext) {
        let Some(sink) = &mut sc.sink else {
            return;
        };
        let sources_index = sink.sources_len;
        if let Some(source_old) = sink.sources.0.get(sources_index) {
            if source_old.is_same(&this, this_slot) {
                sink.sources_len += 1;
                self.0[source_old.key.0].dirty = Dirty::Clean;
                return;
            }
        }
        let key = BindKey(self.0.insert(SinkBinding {
            sink: sink.sink.clone(),
            slot: sink.slot,
            dirty: Dirty::Clean,
        }));
        if let Some(old) = sink.push(SourceBinding {
            source: this,
            slot: this_slot,
            key,
        }) {
            old.unbind(sc.uc());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn is_dirty(&self, key: BindKey, _uc: &mut UpdateContext) -> bool {
        match self.0[key.0].dirty {
            Dirty::Clean => false,
            Dirty::MaybeDirty => panic!("`is_dirty` called before `update()`"),
            Dirty::Dirty => true,
        }
    }
    /// Unbinds the dependency identified by the given `key`.
    pub fn unbind(&mut self, key: BindKey, _uc: &mut UpdateContext) {
        self.0.remove(key.0);
    }

    pub fn notify(&mut self, level: NotifyLevel, nc: &mut NotifyContext) {
        self.0.optimize();
        for binding in self.0.values_mut() {
            if binding.dirty.needs_notify() {
                binding.notify(level, nc);
            }
            binding.dirty |= level;
        }
    }
    /// Resolve `MaybeDirty` edges after the source recomputed (or verified its sources).
    pub fn update(&mut self, is_dirty: bool, _uc: &mut UpdateContext) {
        self.0.optimize();
        for binding in self.0.values_mut() {
            if binding.dirty == Dirty::MaybeDirty {
                binding.dirty = Dirty::from_is_dirty(is_dirty);
            }
        }
    }
}

struct Sink {
    sink: Weak<dyn BindSink>,
    slot: Slot,
    sources: SourceBindings,
    sources_len: usize,
}
impl Sink {
    #[must_use]
    fn push(&mut self, binding: SourceBinding) -> Option<SourceBinding> {
        let index = self.sources_len;
        self.sources_len += 1;
        if index < self.sources.0.len() {
            Some(replace(&mut self.sources.0[index], binding))
        } else {
            self.sources.0.push(binding);
            None
        }
    }
}

/// Context for validating caches and rebuilding dependency edges.
#[repr(transparent)]
pub struct UpdateContext<'s>(SignalContext<'s>);

impl<'s> UpdateContext<'s> {
    fn new<'a>(sc: &'a mut SignalContext<'s>) -> &'a mut Self {
        unsafe { transmute(sc) }
    }

    /// Register a task to discard a cache.
    ///
    /// Registered tasks are called when [`Runtime::run_discards`] is called.
    pub fn schedule_discard(&mut self, discard: Rc<dyn Discard>, slot: Slot) {
        self.0.rt.discards.push(DiscardTask {
            node: discard,
            slot,
        })
    }

    /// Borrow a [`RefCell`] that succeeds if there are no cyclic dependencies.
    pub fn borrow<'a, T>(&self, cell: &'a RefCell<T>) -> Ref<'a, T> {
        match cell.try_borrow() {
            Ok(b) => b,
            Err(_) => panic!("detect cyclic dependency"),
        }
    }
}

/// Context for state invalidation notification.
#[repr(transparent)]
pub struct NotifyContext(ActionContext);

impl NotifyContext {
    fn new(ac: &mut ActionContext) -> &mut Self {
        unsafe { transmute(ac) }
    }
}

/// Schedules a state invalidation notification.
///
/// If a [`NotifyContext`] is available, this function should not be used and
/// the notification should be delivered directly.
pub fn schedule_notify(node: Weak<dyn BindSink>, slot: Slot) {
    let _ = Globals::try_with(|g| g.push_notify(node, slot));
}

/// Context for retrieving state and tracking dependencies.
pub struct SignalContext<'s> {
    rt: &'s mut RawRuntime,
    sink: Option<&'s mut Sink>,
}

impl<'s> SignalContext<'s> {
    pub fn uc(&mut self) -> &mut UpdateContext<'s> {
        UpdateContext::new(self)
    }

    /// Call a function with a [`SignalContext`] that does not track dependencies.
    pub fn untrack<T>(&mut self, f: impl FnOnce(&mut SignalContext<'s>) -> T) -> T {
        struct UntrackGuard<'s, 'a> {
            sc: &'a mut SignalContext<'s>,
            sink: Option<&'s mut Sink>,
        }
        impl Drop for UntrackGuard<'_, '_> {
            fn drop(&mut self) {
                self.sc.sink = self.sink.take();
            }
        }
        f(UntrackGuard {
            sink: self.sink.take(),
            sc: self,
        }
        .sc)
    }
}

/// A node that depends on other nodes.
pub trait BindSink: 'static {
    fn notify(self: Rc<Self>, slot: Slot, level: NotifyLevel, nc: &mut NotifyContext);
}

/// A node that other nodes can depend on.
pub trait BindSource: 'static {
    /// Return whether the value observed through `key` actually changed,
    /// recomputing if necessary.
    fn check(self: Rc<Self>, slot: Slot, key: BindKey, uc: &mut UpdateContext) -> bool;
    fn unbind(self: Rc<Self>, slot: Slot, key: BindKey, uc: &mut UpdateContext);
}

#[derive(Clone)]
struct NotifyTask {
    sink: Weak<dyn BindSink>,
    slot: Slot,
}
impl NotifyTask {
    fn call_notify(&self, nc: &mut NotifyContext) {
        if let Some(sink) = self.sink.upgrade() {
            sink.notify(self.slot, NotifyLevel::Dirty, nc)
        }
    }
}

/// A node holding a discardable cache.
pub trait Discard {
    fn discard(self: Rc<Self>, slot: Slot, uc: &mut UpdateContext);
}
struct DiscardTask {
    node: Rc<dyn Discard>,
    slot: Slot,
}
impl DiscardTask {
    fn call_discard(self, uc: &mut UpdateContext) {
        self.node.discard(self.slot, uc)
    }
}

/// Context for changing state.
#[repr(transparent)]
pub struct ActionContext(Runtime);

impl ActionContext {
    fn new(rt: &mut Runtime) -> &mut Self {
        unsafe { transmute(rt) }
    }
    pub fn nc(&mut self) -> &mut NotifyContext {
        NotifyContext::new(self)
    }
    pub fn sc(&mut self) -> SignalContext {
        self.0.sc()
    }
}

/// Spawns a new action.
///
/// The action runs the next time [`Runtime::run_actions`] (or [`Runtime::update`]) is called.
pub fn spawn_action(f: impl FnOnce(&mut ActionContext) + 'static) {
    Action(Box::new(f)).schedule()
}

struct Action(Box<dyn FnOnce(&mut ActionContext)>);

impl Action {
    fn call(self, ac: &mut ActionContext) {
        (self.0)(ac)
    }
    fn schedule(self) {
        let _ = Globals::try_with(|g| g.push_action(self));
    }
}

/// A unit of deferred work run with an [`UpdateContext`].
pub struct Task(RawTask);

impl Task {
    pub fn new(f: impl FnOnce(&mut UpdateContext) + 'static) -> Self {
        Task(RawTask::Box(Box::new(f)))
    }
    pub fn from_weak_fn<T: Any>(
        this: Weak<T>,
        f: impl Fn(Rc<T>, &mut UpdateContext) + Copy + 'static,
    ) -> Self {
        Task(RawTask::Weak {
            this,
            f: Box::new(move |this, uc| {
                if let Some(this) = this.upgrade() {
                    f(this.downcast().unwrap(), uc)
                }
            }),
        })
    }

    pub fn schedule_with(self, kind: TaskKind) {
        Globals::schedule_task(kind, self)
    }
    pub fn schedule(self) {
        self.schedule_with(TaskKind::default());
    }
    fn run(self, uc: &mut UpdateContext) {
        match self.0 {
            RawTask::Box(f) => f(uc),
            RawTask::Weak { this, f } => f(this, uc),
        }
    }
}

enum RawTask {
    Box(Box<dyn FnOnce(&mut UpdateContext)>),
    Weak {
        this: Weak<dyn Any>,
        #[allow(clippy::type_complexity)]
        f: Box<dyn Fn(Weak<dyn Any>, &mut UpdateContext)>,
    },
}

/// Kind of tasks performed by the reactive runtime.
///
/// Kinds with a smaller `id` are run first by [`Runtime::run_tasks`].
#[derive(Clone, Copy, Display, Debug, Ex)]
#[derive_ex(PartialEq, Eq, Hash, Default)]
#[display("{id}: {name}")]
#[default(Self::new(0, "<default>"))]
pub struct TaskKind {
    id: i8,
    #[eq(ignore)]
    name: &'static str,
}
impl TaskKind {
    pub const fn new(id: i8, name: &'static str) -> Self {
        Self { id, name }
    }
}

struct Tasks {
    tasks: ISizeMap<Vec<Task>>,
    start: isize,
    last: isize,
}
impl Tasks {
    fn new() -> Self {
        Self {
            tasks: ISizeMap::new(),
            start: isize::MAX,
            last: isize::MIN,
        }
    }

    fn set_empty(&mut self) {
        self.start = isize::MAX;
        self.last = isize::MIN;
    }
    fn push(&mut self, kind: TaskKind, task: Task) {
        let index = kind.id as isize;
        self.tasks[index].push(task);
        self.start = min(self.start, index);
        self.last = max(self.last, index);
    }
    fn drain(&mut self, kind: Option<TaskKind>, to: &mut Vec<Task>) {
        if let Some(kind) = kind {
            let index = kind.id as isize;
            if let Some(tasks) = self.tasks.get_mut(index) {
                to.append(tasks)
            }
            if self.start == index {
                self.start += 1;
            }
            if self.start > self.last {
                self.set_empty();
            }
        } else {
            for index in self.start..=self.last {
                to.append(&mut self.tasks[index])
            }
            self.set_empty();
        }
    }
}
