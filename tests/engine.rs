use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rundag::{AggregateError, Dep, RunContext, RundagError, deps, must};

type TestResult = Result<(), Box<dyn Error>>;

fn failing(id: &str, msg: &'static str) -> Dep {
    Dep::func_named(id, move || async move {
        Err::<(), anyhow::Error>(anyhow::anyhow!(msg))
    })
}

#[tokio::test]
async fn serial_runs_in_order() -> TestResult {
    let ctx = RunContext::new();
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let step = |name: &'static str| {
        let log = Arc::clone(&log);
        Dep::func_named(name, move || async move {
            log.lock().unwrap().push(name);
        })
    };

    ctx.serial("_test", deps![step("a"), step("b"), step("c")])
        .await?;
    assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    Ok(())
}

#[tokio::test]
async fn serial_stops_at_the_first_error() -> TestResult {
    let ctx = RunContext::new();
    let later = Arc::new(AtomicUsize::new(0));

    let count = |name: &'static str, c: Arc<AtomicUsize>| {
        Dep::func_named(name, move || async move {
            c.fetch_add(1, Ordering::SeqCst);
        })
    };

    let err = ctx
        .serial(
            "_test",
            deps![
                failing("a", "banana"),
                count("b", Arc::clone(&later)),
                count("c", Arc::clone(&later)),
            ],
        )
        .await
        .unwrap_err();

    assert_eq!(format!("{err:#}"), "running a: banana");
    assert_eq!(later.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn parallel_collects_all_errors() -> TestResult {
    let ctx = RunContext::new();
    let err = ctx
        .parallel("_test", deps![failing("a", "banana"), failing("b", "melon")])
        .await
        .unwrap_err();

    let agg = err
        .downcast_ref::<AggregateError>()
        .expect("parallel failures aggregate");
    let messages: Vec<String> = agg.errors().iter().map(|e| format!("{e:#}")).collect();
    assert_eq!(messages.len(), 2);
    assert!(messages.contains(&"running a: banana".to_string()), "{messages:?}");
    assert!(messages.contains(&"running b: melon".to_string()), "{messages:?}");
    Ok(())
}

#[tokio::test]
async fn identity_executes_at_most_once_within_one_call() -> TestResult {
    let ctx = RunContext::new();
    let counter = Arc::new(AtomicUsize::new(0));

    let tick = || {
        let c = Arc::clone(&counter);
        Dep::func_named("tick", move || async move {
            c.fetch_add(1, Ordering::SeqCst);
        })
    };

    ctx.serial("_test", deps![tick(), tick(), tick()]).await?;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn memoizes_under_parallel_fan_in() -> TestResult {
    let ctx = RunContext::new();
    let counter = Arc::new(AtomicUsize::new(0));

    let branch = |name: &'static str| {
        let c = Arc::clone(&counter);
        Dep::func_named(name, move |ctx: RunContext| async move {
            ctx.serial(
                name,
                deps![Dep::func_named("x", move || async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                })],
            )
            .await
        })
    };

    ctx.parallel("_test", deps![branch("left"), branch("right")])
        .await?;

    assert_eq!(counter.load(Ordering::SeqCst), 1);

    // Both branches recorded an edge to the same node, which therefore
    // appears twice in the tree with one shared outcome.
    let report = ctx.report().render();
    assert_eq!(report.matches("x [took ").count(), 2, "{report}");
    Ok(())
}

#[tokio::test]
async fn failed_identities_replay_their_cached_error() -> TestResult {
    let ctx = RunContext::new();
    let counter = Arc::new(AtomicUsize::new(0));

    let flaky = || {
        let c = Arc::clone(&counter);
        Dep::func_named("flaky", move || async move {
            c.fetch_add(1, Ordering::SeqCst);
            Err::<(), anyhow::Error>(anyhow::anyhow!("boom"))
        })
    };

    let first = ctx.serial("_test", deps![flaky()]).await.unwrap_err();
    let second = ctx.serial("_other", deps![flaky()]).await.unwrap_err();

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(format!("{first:#}"), "running flaky: boom");
    assert_eq!(format!("{second:#}"), "running flaky: boom");
    Ok(())
}

#[tokio::test]
async fn panics_are_contained_as_errors() -> TestResult {
    async fn kaboom() {
        panic!("xxx");
    }

    let ctx = RunContext::new();
    let err = ctx
        .serial("_test", deps![Dep::func(kaboom)])
        .await
        .unwrap_err();

    let message = format!("{err:#}");
    assert!(message.contains("panic in"), "{message}");
    assert!(message.contains("xxx"), "{message}");
    assert!(
        matches!(
            err.downcast_ref::<RundagError>(),
            Some(RundagError::Panicked { .. })
        ),
        "{message}"
    );
    Ok(())
}

#[tokio::test]
async fn replayed_panics_stay_structured() -> TestResult {
    let ctx = RunContext::new();

    async fn grenade_body() {
        panic!("yyy");
    }

    let grenade = || Dep::func_named("grenade", grenade_body);

    let first = ctx.serial("_test", deps![grenade()]).await.unwrap_err();
    let second = ctx.serial("_other", deps![grenade()]).await.unwrap_err();

    for err in [first, second] {
        assert!(
            matches!(
                err.downcast_ref::<RundagError>(),
                Some(RundagError::Panicked { .. })
            ),
            "{err:#}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn abandoned_callers_do_not_lose_the_outcome() -> TestResult {
    let ctx = RunContext::new();
    let counter = Arc::new(AtomicUsize::new(0));

    let slow = || {
        let c = Arc::clone(&counter);
        Dep::func_named("slow", move || async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            c.fetch_add(1, Ordering::SeqCst);
        })
    };

    // First caller gives up long before the body finishes.
    tokio::select! {
        res = ctx.serial("_test", deps![slow()]) => res?,
        _ = tokio::time::sleep(Duration::from_millis(5)) => {}
    }

    // A later reference to the same identity still observes the real result.
    ctx.serial("_later", deps![slow()]).await?;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn must_failures_unwind_quietly() {
    let payload = std::panic::catch_unwind(|| {
        must(Err::<(), anyhow::Error>(anyhow::anyhow!("nope")))
    })
    .expect_err("must aborts on error");
    assert!(payload.is::<rundag::must::Abort>());
}

#[tokio::test]
async fn must_aborts_with_the_original_error() -> TestResult {
    async fn guarded() {
        must(Err::<(), anyhow::Error>(anyhow::anyhow!("explosion")));
    }

    let ctx = RunContext::new();
    let err = ctx
        .serial("_test", deps![Dep::func(guarded)])
        .await
        .unwrap_err();

    let message = format!("{err:#}");
    assert!(message.ends_with(": explosion"), "{message}");
    assert!(!message.contains("panic"), "{message}");
    Ok(())
}

#[tokio::test]
async fn nested_must_propagates_the_wrapped_serial_error() -> TestResult {
    let ctx = RunContext::new();

    let outer = Dep::func_named("outer", |ctx: RunContext| async move {
        must(ctx.serial("outer", deps![failing("inner", "explosion")]).await);
    });

    let err = ctx.serial("_test", deps![outer]).await.unwrap_err();
    assert_eq!(
        format!("{err:#}"),
        "running outer: running inner: explosion"
    );
    Ok(())
}

#[tokio::test]
async fn parallel_with_no_dependencies_is_a_noop() -> TestResult {
    let ctx = RunContext::new();
    ctx.parallel("_test", deps![]).await?;
    ctx.serial("_test", deps![]).await?;
    Ok(())
}
