use assert_call::{call, CallRecorder};
use rstest::rstest;

use crate::{core::Runtime, effect, SignalStore, StateConfig, StoreError};

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
enum Key {
    Counter,
    Name,
    Flag,
}

fn config() -> StateConfig<Key> {
    StateConfig::builder()
        .with(Key::Counter, 0_i32)
        .with(Key::Name, String::from("anonymous"))
        .with(Key::Flag, false)
        .build()
}

#[test]
fn defaults_before_any_write() {
    let mut rt = Runtime::new();
    let store = SignalStore::new(config());
    assert_eq!(store.get::<i32>(&Key::Counter, &mut rt.sc()).unwrap(), 0);
    assert_eq!(
        store.get::<String>(&Key::Name, &mut rt.sc()).unwrap(),
        "anonymous"
    );
    assert!(!store.get::<bool>(&Key::Flag, &mut rt.sc()).unwrap());
}

#[test]
fn set_then_get_reflects_value() {
    let mut rt = Runtime::new();
    let store = SignalStore::new(config());
    store.set(&Key::Counter, 42, rt.ac()).unwrap();
    assert_eq!(store.get::<i32>(&Key::Counter, &mut rt.sc()).unwrap(), 42);
}

#[test]
fn signal_identity_is_stable() {
    let store = SignalStore::new(config());
    let a = store.signal::<i32>(&Key::Counter).unwrap();
    let b = store.signal::<i32>(&Key::Counter).unwrap();
    assert!(a.ptr_eq(&b));
}

#[test]
fn writes_visible_through_every_handle() {
    let mut rt = Runtime::new();
    let store = SignalStore::new(config());
    let a = store.signal::<i32>(&Key::Counter).unwrap();
    let b = store.signal::<i32>(&Key::Counter).unwrap();
    a.set(7, rt.ac());
    assert_eq!(b.get(&mut rt.sc()), 7);
}

#[test]
fn cells_materialize_lazily() {
    let store = SignalStore::new(config());
    assert!(!store.is_materialized(&Key::Counter));

    store.signal::<i32>(&Key::Counter).unwrap();
    assert!(store.is_materialized(&Key::Counter));
    assert!(!store.is_materialized(&Key::Name));
}

#[test]
fn set_materializes_the_cell() {
    let mut rt = Runtime::new();
    let store = SignalStore::new(config());
    store.set(&Key::Counter, 1, rt.ac()).unwrap();
    assert!(store.is_materialized(&Key::Counter));
    assert_eq!(store.get::<i32>(&Key::Counter, &mut rt.sc()).unwrap(), 1);
}

#[rstest]
#[case(Key::Counter)]
#[case(Key::Name)]
#[case(Key::Flag)]
fn registered_keys_are_known(#[case] key: Key) {
    let store = SignalStore::new(config());
    assert!(store.contains(&key));
    assert!(!store.is_materialized(&key));
}

#[test]
fn unknown_key() {
    let store = SignalStore::new(StateConfig::builder().with(Key::Counter, 0_i32).build());
    assert_eq!(
        store.signal::<i32>(&Key::Name).unwrap_err(),
        StoreError::UnknownKey(Key::Name)
    );
    assert!(!store.contains(&Key::Name));
}

#[test]
fn type_mismatch() {
    let store = SignalStore::new(config());
    let err = store.signal::<u8>(&Key::Counter).unwrap_err();
    assert!(matches!(err, StoreError::TypeMismatch { .. }));
    // no cell is created on a failed access
    assert!(!store.is_materialized(&Key::Counter));
}

#[test]
fn error_messages() {
    let store = SignalStore::new(config());
    let message = store.signal::<String>(&Key::Counter).unwrap_err().to_string();
    assert!(message.contains("Counter"));
    assert!(message.contains("i32"));

    let store = SignalStore::new(StateConfig::<Key>::builder().build());
    assert_eq!(
        store.signal::<i32>(&Key::Flag).unwrap_err().to_string(),
        "the key Flag is not registered in the default state"
    );
}

#[test]
fn update_through_store() {
    let mut rt = Runtime::new();
    let store = SignalStore::new(config());
    store
        .update(&Key::Name, |name: &mut String| name.push('!'), rt.ac())
        .unwrap();
    assert_eq!(
        store.get::<String>(&Key::Name, &mut rt.sc()).unwrap(),
        "anonymous!"
    );
}

#[test]
fn store_writes_reach_effects() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let store = SignalStore::new(config());
    let counter = store.signal::<i32>(&Key::Counter).unwrap();
    let _e = effect(move |sc| {
        call!("{}", counter.get(sc));
    });
    rt.update();
    cr.verify("0");

    store.set(&Key::Counter, 1, rt.ac()).unwrap();
    rt.update();
    cr.verify("1");
}

#[test]
fn stores_from_one_config_do_not_alias() {
    let mut rt = Runtime::new();
    let config = config();
    let store_a = SignalStore::new(config.clone());
    let store_b = SignalStore::new(config);

    store_a.set(&Key::Counter, 5, rt.ac()).unwrap();
    assert_eq!(store_b.get::<i32>(&Key::Counter, &mut rt.sc()).unwrap(), 0);

    let a = store_a.signal::<i32>(&Key::Counter).unwrap();
    let b = store_b.signal::<i32>(&Key::Counter).unwrap();
    assert!(!a.ptr_eq(&b));
}

#[test]
fn handles_survive_store_drop() {
    let mut rt = Runtime::new();
    let store = SignalStore::new(config());
    let counter = store.signal::<i32>(&Key::Counter).unwrap();
    drop(store);

    counter.set(3, rt.ac());
    assert_eq!(counter.get(&mut rt.sc()), 3);
}

#[test]
fn len_counts_registered_keys() {
    let store = SignalStore::new(config());
    assert_eq!(store.len(), 3);
    assert!(!store.is_empty());
    assert_eq!(store.config().len(), 3);
}
