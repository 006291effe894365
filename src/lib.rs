//! Signals-based state management built around a keyed signal store.
//!
//! Application state lives in reactive cells:
//!
//! - [`Signal<T>`](Signal): a mutable cell that notifies dependents on write.
//! - [`ReadSignal<T>`](ReadSignal): a read-only handle, including memoized computations.
//! - [`effect`]: a function that is called again when a dependent signal changes.
//!
//! On top of the cells, [`SignalStore`] keeps one signal per application key,
//! materialized lazily from the defaults registered in a [`StateConfig`].
//! Reads go through a [`SignalContext`] and writes through an
//! [`ActionContext`], both handed out by the [`core::Runtime`] driving the
//! whole thing; the compiler keeps state calculations and state changes
//! apart.
//!
//! # Example
//!
//! ```
//! use gentleman_signals::{core::Runtime, ReadSignal, SignalStore, StateConfig};
//!
//! #[derive(Clone, PartialEq, Eq, Hash, Debug)]
//! enum AppKey {
//!     Counter,
//!     UserName,
//! }
//!
//! let mut rt = Runtime::new();
//! let config = StateConfig::builder()
//!     .with(AppKey::Counter, 0_i32)
//!     .with(AppKey::UserName, String::from("anonymous"))
//!     .build();
//! let store = SignalStore::new(config);
//!
//! let counter = store.signal::<i32>(&AppKey::Counter).unwrap();
//! assert_eq!(counter.get(&mut rt.sc()), 0);
//!
//! let label = ReadSignal::new({
//!     let counter = counter.clone();
//!     move |sc| format!("count: {}", counter.get(sc))
//! });
//! let _s = label.subscribe(|label| println!("{label}"));
//! rt.update(); // prints "count: 0"
//!
//! counter.set(5, rt.ac());
//! rt.update(); // prints "count: 5"
//!
//! // the store hands out the same cell every time
//! assert!(counter.ptr_eq(&store.signal(&AppKey::Counter).unwrap()));
//! ```

pub mod core;

mod config;
mod effect_fn;
mod read_signal;
mod signal;
mod store;
mod subscription;
mod utils;

pub use self::core::{spawn_action, ActionContext, SignalContext, TaskKind, ValueRef};
pub use config::{StateConfig, StateConfigBuilder};
pub use effect_fn::{effect, effect_with};
pub use read_signal::{ReadNode, ReadSignal, ToReadSignal};
pub use signal::{Signal, SignalRefMut};
pub use store::{SignalStore, StoreError, StoreKey};
pub use subscription::Subscription;
