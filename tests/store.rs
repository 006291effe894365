use assert_call::{call, CallRecorder};
use gentleman_signals::{
    core::Runtime, spawn_action, ReadSignal, SignalStore, StateConfig, StoreError,
};

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
enum AppKey {
    Count,
    Step,
    Label,
}

fn app_config() -> StateConfig<AppKey> {
    StateConfig::builder()
        .with(AppKey::Count, 0_i32)
        .with(AppKey::Step, 1_i32)
        .with(AppKey::Label, String::from("counter"))
        .build()
}

#[test]
fn counter_scenario() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let store = SignalStore::new(app_config());

    let count = store.signal::<i32>(&AppKey::Count).unwrap();
    let step = store.signal::<i32>(&AppKey::Step).unwrap();
    let label = store.signal::<String>(&AppKey::Label).unwrap();

    let rendered = ReadSignal::new({
        let (count, label) = (count.clone(), label.clone());
        move |sc| format!("{}: {}", label.get(sc), count.get(sc))
    });
    let _view = rendered.subscribe(|s| {
        call!("{s}");
    });
    rt.update();
    cr.verify("counter: 0");

    // one "click": increment by the configured step
    let (count2, step2) = (count.clone(), step.clone());
    spawn_action(move |ac| {
        let by = step2.get(&mut ac.sc());
        count2.update(|c| *c += by, ac);
    });
    rt.update();
    cr.verify("counter: 1");

    store.set(&AppKey::Step, 10, rt.ac()).unwrap();
    rt.update();
    cr.verify(()); // the step is not rendered

    let (count2, step2) = (count.clone(), step.clone());
    spawn_action(move |ac| {
        let by = step2.get(&mut ac.sc());
        count2.update(|c| *c += by, ac);
    });
    rt.update();
    cr.verify("counter: 11");

    store
        .set(&AppKey::Label, String::from("clicks"), rt.ac())
        .unwrap();
    rt.update();
    cr.verify("clicks: 11");
}

#[test]
fn component_scopes_share_configuration() {
    let mut rt = Runtime::new();
    let config = app_config();

    // one store per component scope, seeded from the same defaults
    let scope_a = SignalStore::new(config.clone());
    let scope_b = SignalStore::new(config);

    scope_a.set(&AppKey::Count, 5, rt.ac()).unwrap();
    assert_eq!(scope_a.get::<i32>(&AppKey::Count, &mut rt.sc()).unwrap(), 5);
    assert_eq!(scope_b.get::<i32>(&AppKey::Count, &mut rt.sc()).unwrap(), 0);
}

#[test]
fn store_errors_are_std_errors() {
    let store = SignalStore::new(StateConfig::builder().with(AppKey::Count, 0_i32).build());

    let err: Box<dyn std::error::Error> = Box::new(store.signal::<i32>(&AppKey::Label).unwrap_err());
    assert_eq!(
        err.to_string(),
        "the key Label is not registered in the default state"
    );

    let err = store.signal::<String>(&AppKey::Count).unwrap_err();
    assert!(matches!(err, StoreError::TypeMismatch { .. }));
}

#[test]
fn teardown_drops_cells_but_not_live_handles() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let store = SignalStore::new(app_config());
    let count = store.signal::<i32>(&AppKey::Count).unwrap();

    let _e = {
        let count = count.clone();
        gentleman_signals::effect(move |sc| {
            call!("{}", count.get(sc));
        })
    };
    rt.update();
    cr.verify("0");

    drop(store);

    count.set(1, rt.ac());
    rt.update();
    cr.verify("1");
}
