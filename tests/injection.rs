use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wired_inject::prelude::*;
use wired_inject::SpecificationExtractor;
use wired_inject_testing::{init_tracing, RecordingContainer};

pub trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

struct English;

impl Greeter for English {
    fn greet(&self, name: &str) -> String {
        format!("Hello {name}")
    }
}

fn settings(source: serde_json::Value) -> Value {
    Settings::from_json_str(&source.to_string())
        .unwrap()
        .into_value()
}

fn counting_factory(
    calls: Arc<AtomicUsize>,
    signature: Signature,
) -> FnFactory<i64> {
    FnFactory::new("counting", signature, move |kwargs| {
        calls.fetch_add(1, Ordering::SeqCst);
        kwargs.take_data::<i64>("param")
    })
}

#[test]
fn test_settings_key_reaches_factory() {
    init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let signature = Signature::new().declare(
        Declaration::new::<i64>("param").wired(Wired::of::<Settings>().key("max_number")),
    );
    let injector = Injector::new(counting_factory(calls.clone(), signature));

    let mut registry = Registry::new();
    registry.register_value(
        settings(json!({ "max_number": 10 })),
        Capability::of::<Settings>(),
        Registration::default(),
    );

    assert_eq!(injector.invoke(&registry.create_container()).unwrap(), 10);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_bare_marker_keeps_identity() {
    #[derive(Injectable)]
    struct Welcome {
        #[wired]
        greeter: Arc<dyn Greeter>,
    }

    let greeter: Arc<dyn Greeter> = Arc::new(English);
    let mut registry = Registry::new();
    registry.register_singleton(greeter.clone(), Registration::default());

    let welcome = Injector::<Constructor<Welcome>>::of()
        .invoke(&registry.create_container())
        .unwrap();
    assert!(Arc::ptr_eq(&welcome.greeter, &greeter));
    assert_eq!(welcome.greeter.greet("Ian"), "Hello Ian");
}

#[test]
fn test_unregistered_capability_skips_factory() {
    let calls = Arc::new(AtomicUsize::new(0));
    let signature =
        Signature::new().declare(Declaration::new::<dyn Greeter>("param").marker());
    let injector = Injector::new(counting_factory(calls.clone(), signature));
    let container = RecordingContainer::new();

    let err = injector.invoke(&container).unwrap_err();
    assert!(matches!(err, WiredError::Resolution { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(container.lookups().len(), 1);
}

#[test]
fn test_resolved_value_overrides_preset() {
    let calls = Arc::new(AtomicUsize::new(0));
    let signature = Signature::new()
        .declare(Declaration::new::<i64>("param").wired(Wired::of::<Settings>().key("x")));
    let injector = Injector::new(counting_factory(calls, signature))
        .with_preset("param", Value::data(1));

    let container =
        RecordingContainer::new().with_value(Capability::of::<Settings>(), "", settings(json!({ "x": 2 })));
    assert_eq!(injector.invoke(&container).unwrap(), 2);
}

#[test]
fn test_no_caching_across_containers() {
    let calls = Arc::new(AtomicUsize::new(0));
    let signature = Signature::new()
        .declare(Declaration::new::<i64>("param").wired(Wired::of::<Settings>().key("n")));
    let injector = Injector::new(counting_factory(calls.clone(), signature));

    let first = RecordingContainer::new().with_value(
        Capability::of::<Settings>(),
        "",
        settings(json!({ "n": 1 })),
    );
    let second = RecordingContainer::new().with_value(
        Capability::of::<Settings>(),
        "",
        settings(json!({ "n": 2 })),
    );

    assert_eq!(injector.invoke(&first).unwrap(), 1);
    assert_eq!(injector.invoke(&second).unwrap(), 2);
    assert_eq!(injector.invoke(&first).unwrap(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(first.lookups().len(), 2);
}

#[test]
fn test_key_and_call_projections() {
    let service = settings(json!({ "tables": { "lucky": [3, 5, 7] } }));
    let container = RecordingContainer::new()
        .with_value(Capability::of::<Settings>(), "", service)
        .with_value(
            Capability::of::<dyn Greeter>(),
            "shouting",
            Value::callable(|invocation| {
                let name = invocation
                    .get("name")
                    .and_then(|name| name.as_str())
                    .unwrap_or("there");
                Ok(Value::data(name.to_uppercase()))
            }),
        );

    let signature = Signature::new()
        .declare(
            Declaration::new::<i64>("lucky").wired(
                Wired::of::<Settings>().key("tables.lucky"),
            ),
        )
        .declare(
            Declaration::new::<String>("shout").wired(
                Wired::of::<dyn Greeter>()
                    .named("shouting")
                    .call(Invocation::new().kwarg("name", "ian")),
            ),
        );
    let factory = FnFactory::new("projections", signature, |kwargs| {
        let lucky = kwargs.take_data::<Vec<i64>>("lucky")?;
        let shout = kwargs.take_data::<String>("shout")?;
        Ok((lucky, shout))
    });

    let (lucky, shout) = Injector::new(factory).invoke(&container).unwrap();
    assert_eq!(lucky, vec![3, 5, 7]);
    assert_eq!(shout, "IAN");
}

#[test]
fn test_missing_key_is_key_access_error() {
    let container = RecordingContainer::new().with_value(
        Capability::of::<Settings>(),
        "",
        settings(json!({ "present": true })),
    );
    let signature = Signature::new()
        .declare(Declaration::new::<bool>("flag").wired(Wired::of::<Settings>().key("absent")));
    let factory = FnFactory::new("flagged", signature, |kwargs| kwargs.take_data::<bool>("flag"));

    let err = Injector::new(factory).invoke(&container).unwrap_err();
    assert!(matches!(err, WiredError::KeyAccess { ref key, .. } if key == "absent"));
}

#[test]
fn test_deferred_type_resolves_through_alias() {
    let greeter: Arc<dyn Greeter> = Arc::new(English);
    let container = RecordingContainer::new().with(greeter);
    let signature = Signature::new().declare(Declaration::deferred("greeter", "IGreeter").marker());
    let factory = FnFactory::new("deferred", signature, |kwargs| {
        Ok(kwargs.take::<dyn Greeter>("greeter")?.greet("you"))
    });

    let unresolved = Injector::new(FnFactory::new(
        "deferred",
        Signature::new().declare(Declaration::deferred("greeter", "IGreeter").marker()),
        |kwargs| Ok(kwargs.take::<dyn Greeter>("greeter")?.greet("you")),
    ));
    let err = unresolved.invoke(&container).unwrap_err();
    assert!(matches!(err, WiredError::TypeConfiguration { .. }));
    assert!(container.lookups().is_empty());

    let injector = Injector::new(factory)
        .with_extractor(SpecificationExtractor::new().with_alias::<dyn Greeter>("IGreeter"));
    assert_eq!(injector.invoke(&container).unwrap(), "Hello you");
}

#[test]
fn test_unexpected_preset_is_construction_error() {
    #[derive(Injectable)]
    struct Plain {
        #[wired]
        greeter: Arc<dyn Greeter>,
    }

    let container = RecordingContainer::new().with(Arc::new(English) as Arc<dyn Greeter>);
    let err = Injector::<Constructor<Plain>>::of()
        .with_preset("extra", Value::data(1))
        .invoke(&container)
        .map(|plain| plain.greeter.greet("x"))
        .unwrap_err();
    assert!(matches!(err, WiredError::Construction { .. }));
}

#[test]
fn test_shared_injector_across_threads() {
    let mut registry = Registry::new();
    registry.register_value(
        settings(json!({ "param": 5 })),
        Capability::of::<Settings>(),
        Registration::default(),
    );
    let container = Arc::new(registry.create_container());
    let calls = Arc::new(AtomicUsize::new(0));
    let signature = Signature::new()
        .declare(Declaration::new::<i64>("param").wired(Wired::of::<Settings>().key("param")));
    let injector = Arc::new(Injector::new(counting_factory(calls.clone(), signature)));

    let handles = (0..4)
        .map(|_| {
            let injector = injector.clone();
            let container = container.clone();
            std::thread::spawn(move || injector.invoke(container.as_ref()).unwrap())
        })
        .collect::<Vec<_>>();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 5);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[test]
fn test_context_reaches_container() {
    let container = RecordingContainer::new()
        .with_value(Capability::of::<Settings>(), "", settings(json!({ "x": 4 })));
    let signature = Signature::new()
        .declare(
            Declaration::new::<i64>("param")
                .wired(Wired::of::<Settings>().key("x").context(Value::new(1_u8))),
        )
        .declare(Declaration::new::<i64>("plain").wired(Wired::of::<Settings>().key("x")));
    let factory = FnFactory::new("contextual", signature, |kwargs| {
        Ok(kwargs.take_data::<i64>("param")? + kwargs.take_data::<i64>("plain")?)
    });

    assert_eq!(Injector::new(factory).invoke(&container).unwrap(), 8);
    let lookups = container.lookups();
    assert_eq!(lookups.len(), 2);
    // Specifications resolve in parameter name order
    assert!(lookups[0].with_context);
    assert!(!lookups[1].with_context);
}
