use assert_call::{call, CallRecorder};

use super::Subscription;

#[test]
fn from_fn_runs_on_drop() {
    let mut cr = CallRecorder::new();
    let s = Subscription::from_fn(|| call!("unsubscribed"));
    cr.verify(());
    drop(s);
    cr.verify("unsubscribed");
}

#[test]
fn empty_is_inert() {
    let _s = Subscription::empty();
    let _s = Subscription::default();
}
