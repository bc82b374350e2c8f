#![cfg(test)]
use std::sync::{Arc, Mutex};
use std::time::Duration;

use multiping_common::{Classification, FailureKind, ProbeOutcome, ProtocolId, RunConfig, RunStatus};
use multiping_core::Progress;
use tokio::time::Instant;

use crate::support::{ScriptedProber, Step, config, engine, hosts};

/*************************************************************
                      Concurrency bound
**************************************************************/

#[tokio::test(start_paused = true)]
async fn never_exceeds_max_concurrency() {
    let prober = Arc::new(
        ScriptedProber::new("mock").with_default(Step::SucceedAfter(Duration::from_millis(10))),
    );
    let addresses: Vec<String> = (0..50).map(|i| format!("10.0.0.{i}")).collect();
    let addresses: Vec<&str> = addresses.iter().map(String::as_str).collect();
    let config = RunConfig {
        max_concurrency: 4,
        ..config("mock", 0)
    };

    let report = engine(&[prober.clone()])
        .run(&hosts(&addresses), &config)
        .await
        .unwrap();

    assert_eq!(report.results().len(), 50);
    assert_eq!(report.status(), RunStatus::Completed);
    assert_eq!(prober.max_in_flight(), 4);
}

#[tokio::test(start_paused = true)]
async fn retries_share_the_concurrency_bound() {
    let prober = Arc::new(ScriptedProber::new("mock").with_default(Step::Timeout));
    let config = RunConfig {
        max_concurrency: 2,
        per_attempt_timeout: Duration::from_millis(100),
        ..config("mock", 2)
    };

    let report = engine(&[prober.clone()])
        .run(&hosts(&["a", "b", "c", "d", "e"]), &config)
        .await
        .unwrap();

    assert_eq!(prober.call_count(), 15);
    assert!(prober.max_in_flight() <= 2);
    assert_eq!(report.counters().unreachable, 5);
}

#[tokio::test(start_paused = true)]
async fn single_slot_runs_targets_in_submission_order() {
    let prober = Arc::new(ScriptedProber::new("mock"));
    let config = RunConfig {
        max_concurrency: 1,
        ..config("mock", 0)
    };

    engine(&[prober.clone()])
        .run(&hosts(&["first", "second", "third"]), &config)
        .await
        .unwrap();

    let order: Vec<String> = prober.calls().into_iter().map(|call| call.address).collect();
    assert_eq!(order, ["first", "second", "third"]);
}

/*************************************************************
                Misbehaving probers and timeouts
**************************************************************/

#[tokio::test(start_paused = true)]
async fn panicking_prober_is_isolated() {
    let prober = Arc::new(ScriptedProber::new("mock").script("boom", vec![Step::Panic]));

    let report = engine(&[prober.clone()])
        .run(&hosts(&["ok1", "boom", "ok2"]), &config("mock", 0))
        .await
        .unwrap();

    let mock = ProtocolId::new("mock");
    let boom = report.result("boom", &mock).unwrap();
    assert_eq!(boom.classification(), Classification::Errored);
    assert_eq!(
        boom.attempts(),
        [ProbeOutcome::failure(
            FailureKind::Other,
            "prober panicked: scripted panic on boom"
        )]
    );
    assert_eq!(
        report.result("ok1", &mock).unwrap().classification(),
        Classification::Reachable
    );
    assert_eq!(
        report.result("ok2", &mock).unwrap().classification(),
        Classification::Reachable
    );
    assert_eq!(report.status(), RunStatus::CompletedWithFailures);
}

#[tokio::test(start_paused = true)]
async fn hung_prober_frees_its_slot_after_grace() {
    let prober = Arc::new(ScriptedProber::new("mock").script("hang", vec![Step::Hang]));
    let config = RunConfig {
        max_concurrency: 1,
        per_attempt_timeout: Duration::from_secs(1),
        abandon_grace: Duration::from_millis(250),
        ..config("mock", 0)
    };
    let start = Instant::now();

    let report = engine(&[prober.clone()])
        .run(&hosts(&["hang", "ok"]), &config)
        .await
        .unwrap();

    let mock = ProtocolId::new("mock");
    let hang = report.result("hang", &mock).unwrap();
    assert_eq!(hang.attempts(), [ProbeOutcome::Timeout]);
    assert_eq!(hang.classification(), Classification::Unreachable);
    assert!(!hang.is_abandoned());

    let ok_started = prober.call_times("ok")[0];
    assert!(ok_started - start >= Duration::from_millis(1250));
    assert_eq!(report.status(), RunStatus::CompletedWithFailures);
    assert_eq!(report.abort_cause(), None);
}

#[tokio::test(start_paused = true)]
async fn attempt_deadline_follows_the_protocol_timeout() {
    let prober = Arc::new(ScriptedProber::new("mock"));
    let config = RunConfig {
        per_attempt_timeout: Duration::from_millis(700),
        ..config("mock", 0)
    };

    engine(&[prober.clone()])
        .run(&hosts(&["a"]), &config)
        .await
        .unwrap();

    let call = &prober.calls()[0];
    assert_eq!(call.deadline - call.at, Duration::from_millis(700));
}

/*************************************************************
                          Progress
**************************************************************/

#[tokio::test(start_paused = true)]
async fn progress_is_reported_for_every_result() {
    let prober = Arc::new(
        ScriptedProber::new("mock").script("down", vec![Step::Fail(FailureKind::ConnectionRefused)]),
    );
    let seen: Arc<Mutex<Vec<Progress>>> = Arc::default();
    let sink = Arc::clone(&seen);

    engine(&[prober.clone()])
        .with_progress(Arc::new(move |progress| sink.lock().unwrap().push(progress)))
        .run(&hosts(&["a", "down", "c"]), &config("mock", 0))
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|progress| progress.total == 3));
    assert_eq!(
        seen.iter().map(|progress| progress.resolved).collect::<Vec<_>>(),
        [1, 2, 3]
    );

    let last = seen[2].counters;
    assert_eq!(last.total, 3);
    assert_eq!(last.reachable, 2);
    assert_eq!(last.unreachable, 1);
}
