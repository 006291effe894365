use assert_call::{call, CallRecorder};

use crate::{core::Runtime, effect, Signal};

#[test]
fn new() {
    let mut rt = Runtime::new();
    let s = Signal::new(10);
    assert_eq!(s.get(&mut rt.sc()), 10);
}

#[test]
fn set() {
    let mut rt = Runtime::new();
    let s = Signal::new(10);
    assert_eq!(s.get(&mut rt.sc()), 10);

    s.set(20, rt.ac());
    assert_eq!(s.get(&mut rt.sc()), 20);

    s.set(30, rt.ac());
    assert_eq!(s.get(&mut rt.sc()), 30);
}

#[test]
fn set_effect() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let s = Signal::new(10);
    let s0 = s.clone();
    let _e = effect(move |sc| {
        call!("{}", s0.get(sc));
    });
    cr.verify(());
    rt.update();
    cr.verify("10");

    s.set(20, rt.ac());
    cr.verify(());
    rt.update();
    cr.verify("20");

    s.set(30, rt.ac());
    s.set(40, rt.ac());
    rt.update();
    cr.verify("40");
}

#[test]
fn set_dedup_effect() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let s = Signal::new(10);
    let s0 = s.clone();
    let _e = effect(move |sc| {
        call!("{}", s0.get(sc));
    });

    cr.verify(());
    rt.update();
    cr.verify("10");

    s.set(10, rt.ac());
    rt.update();
    cr.verify("10");

    s.set_dedup(10, rt.ac());
    rt.update();
    cr.verify(());

    s.set_dedup(20, rt.ac());
    rt.update();
    cr.verify("20");
}

#[test]
fn update_in_place() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let s = Signal::new(vec![1, 2]);
    let s0 = s.clone();
    let _e = effect(move |sc| {
        call!("{:?}", s0.get(sc));
    });
    rt.update();
    cr.verify("[1, 2]");

    s.update(|v| v.push(3), rt.ac());
    rt.update();
    cr.verify("[1, 2, 3]");
}

#[test]
fn borrow_mut_notifies_only_on_deref_mut() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let s = Signal::new(10);
    let s0 = s.clone();
    let _e = effect(move |sc| {
        call!("{}", s0.get(sc));
    });
    rt.update();
    cr.verify("10");

    let b = s.borrow_mut(rt.ac());
    assert_eq!(*b, 10);
    drop(b);
    rt.update();
    cr.verify(());

    let mut b = s.borrow_mut(rt.ac());
    *b = 20;
    drop(b);
    rt.update();
    cr.verify("20");
}

#[test]
fn borrow_mut_loose_two_signals() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let a = Signal::new(1);
    let b = Signal::new(2);
    let (a0, b0) = (a.clone(), b.clone());
    let _e = effect(move |sc| {
        call!("{}-{}", a0.get(sc), b0.get(sc));
    });
    rt.update();
    cr.verify("1-2");

    let mut ba = a.borrow_mut_loose(rt.ac());
    let mut bb = b.borrow_mut_loose(rt.ac());
    *ba += 10;
    *bb += 10;
    drop(ba);
    drop(bb);
    rt.update();
    cr.verify("11-12");
}

#[test]
fn untrack_does_not_subscribe() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let a = Signal::new(1);
    let b = Signal::new(10);
    let (a0, b0) = (a.clone(), b.clone());
    let _e = effect(move |sc| {
        let tracked = a0.get(sc);
        let untracked = sc.untrack(|sc| b0.get(sc));
        call!("{tracked}-{untracked}");
    });
    rt.update();
    cr.verify("1-10");

    b.set(20, rt.ac());
    rt.update();
    cr.verify(());

    a.set(2, rt.ac());
    rt.update();
    cr.verify("2-20");
}

#[test]
fn clone_shares_the_cell() {
    let mut rt = Runtime::new();
    let s = Signal::new(1);
    let s2 = s.clone();
    assert!(s.ptr_eq(&s2));

    s2.set(5, rt.ac());
    assert_eq!(s.get(&mut rt.sc()), 5);
}

#[test]
fn to_read_signal_tracks_writes() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let s = Signal::new(1);
    let r = s.to_read_signal();
    let _e = r.subscribe(|v| {
        call!("{v}");
    });
    rt.update();
    cr.verify("1");

    s.set(2, rt.ac());
    rt.update();
    cr.verify("2");
}

#[test]
fn debug_formats_value() {
    let s = Signal::new(5);
    assert_eq!(format!("{s:?}"), "5");
}

#[test]
fn serde_value_transparent() {
    let mut rt = Runtime::new();
    let s = Signal::new(5);
    assert_eq!(serde_json::to_string(&s).unwrap(), "5");

    let s: Signal<i32> = serde_json::from_str("7").unwrap();
    assert_eq!(s.get(&mut rt.sc()), 7);
}
