#![cfg(test)]
use std::sync::Arc;
use std::time::Duration;

use multiping_common::{
    Backoff, Classification, ConfigurationError, Counters, FailureKind, ProbeOutcome, ProtocolId,
    ProtocolSpec, RunConfig, RunStatus,
};
use tokio::time::Instant;

use crate::support::{ScriptedProber, Step, config, engine, hosts};

/*************************************************************
                  Classification and retries
**************************************************************/

/// One healthy host, one refusing connections, one never answering; a single
/// retry is allowed.
#[tokio::test(start_paused = true)]
async fn mixed_fleet_with_one_retry() {
    let prober = Arc::new(
        ScriptedProber::new("mock")
            .script("a", vec![Step::Succeed])
            .script("b", vec![Step::Fail(FailureKind::ConnectionRefused)])
            .script("c", vec![Step::Timeout]),
    );
    let config = RunConfig {
        retry_backoff: Backoff::Constant(Duration::from_millis(100)),
        ..config("mock", 1)
    };

    let report = engine(&[prober.clone()])
        .run(&hosts(&["a", "b", "c"]), &config)
        .await
        .unwrap();

    let mock = ProtocolId::new("mock");
    let a = report.result("a", &mock).unwrap();
    let b = report.result("b", &mock).unwrap();
    let c = report.result("c", &mock).unwrap();

    assert_eq!(a.classification(), Classification::Reachable);
    assert_eq!(a.attempts().len(), 1);
    assert_eq!(b.classification(), Classification::Unreachable);
    assert_eq!(b.attempts().len(), 2);
    assert_eq!(c.classification(), Classification::Unreachable);
    assert_eq!(c.attempts(), [ProbeOutcome::Timeout, ProbeOutcome::Timeout]);

    assert_eq!(
        report.counters(),
        Counters {
            total: 3,
            reachable: 1,
            unreachable: 2,
            errored: 0,
        }
    );
    assert_eq!(report.status(), RunStatus::CompletedWithFailures);
    assert_eq!(report.status().exit_code(), 1);
    assert_eq!(prober.call_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn healthy_fleet_completes() {
    let prober = Arc::new(ScriptedProber::new("mock"));
    let report = engine(&[prober.clone()])
        .run(&hosts(&["a", "b", "c", "d"]), &config("mock", 3))
        .await
        .unwrap();

    assert_eq!(report.status(), RunStatus::Completed);
    assert_eq!(report.status().exit_code(), 0);
    assert!(report.results().iter().all(|r| r.attempts().len() == 1));
    assert_eq!(prober.call_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_follow_the_final_failure_kind() {
    let prober = Arc::new(
        ScriptedProber::new("mock")
            .script("unreachable", vec![Step::Fail(FailureKind::NetworkUnreachable)])
            .script("garbled", vec![Step::Fail(FailureKind::ProtocolError)])
            .script("broken", vec![Step::Fail(FailureKind::Other)])
            .script("late", vec![Step::Timeout, Step::Timeout, Step::Fail(FailureKind::Other)]),
    );

    let report = engine(&[prober.clone()])
        .run(&hosts(&["unreachable", "garbled", "broken", "late"]), &config("mock", 2))
        .await
        .unwrap();

    let classes: Vec<Classification> = report.results().iter().map(|r| r.classification()).collect();
    assert_eq!(
        classes,
        [
            Classification::Unreachable,
            Classification::Errored,
            Classification::Errored,
            Classification::Errored,
        ]
    );
    assert!(report.results().iter().all(|r| r.attempts().len() == 3));
    assert_eq!(report.counters().errored, 3);
    assert_eq!(report.status(), RunStatus::CompletedWithFailures);
}

#[tokio::test(start_paused = true)]
async fn success_after_failures_stops_retrying() {
    let prober = Arc::new(ScriptedProber::new("mock").script(
        "flaky",
        vec![
            Step::Fail(FailureKind::ConnectionRefused),
            Step::Timeout,
            Step::Succeed,
        ],
    ));

    let report = engine(&[prober.clone()])
        .run(&hosts(&["flaky"]), &config("mock", 5))
        .await
        .unwrap();

    let result = &report.results()[0];
    assert_eq!(result.classification(), Classification::Reachable);
    assert_eq!(result.attempts().len(), 3);
    assert_eq!(prober.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn backoff_separates_attempts() {
    let prober = Arc::new(ScriptedProber::new("mock").with_default(Step::Fail(FailureKind::ConnectionRefused)));
    let backoff = Backoff::Exponential {
        base: Duration::from_millis(100),
        max: Duration::from_millis(300),
    };
    let config = RunConfig {
        retry_backoff: backoff,
        ..config("mock", 4)
    };

    engine(&[prober.clone()])
        .run(&hosts(&["x"]), &config)
        .await
        .unwrap();

    let times = prober.call_times("x");
    assert_eq!(times.len(), 5);
    for (i, pair) in times.windows(2).enumerate() {
        let gap = pair[1] - pair[0];
        assert!(
            gap >= backoff.delay(i as u32),
            "gap {gap:?} before attempt {} is shorter than {:?}",
            i + 2,
            backoff.delay(i as u32)
        );
    }
}

#[tokio::test(start_paused = true)]
async fn protocol_overrides_apply_per_target() {
    let steady = Arc::new(ScriptedProber::new("steady").with_default(Step::Fail(FailureKind::ConnectionRefused)));
    let stubborn = Arc::new(ScriptedProber::new("stubborn").with_default(Step::Fail(FailureKind::ConnectionRefused)));
    let config = RunConfig {
        max_retries: 0,
        retry_backoff: Backoff::None,
        enabled_protocols: vec![
            ProtocolSpec::new("steady"),
            ProtocolSpec::new("stubborn").with_retries(3),
        ],
        ..RunConfig::default()
    };

    let report = engine(&[steady.clone(), stubborn.clone()])
        .run(&hosts(&["h1", "h2"]), &config)
        .await
        .unwrap();

    assert_eq!(report.results().len(), 4);
    assert_eq!(steady.call_count(), 2);
    assert_eq!(stubborn.call_count(), 8);
}

/*************************************************************
                     Configuration errors
**************************************************************/

#[tokio::test(start_paused = true)]
async fn unknown_protocol_is_rejected_before_probing() {
    let prober = Arc::new(ScriptedProber::new("mock"));
    let config = RunConfig {
        enabled_protocols: vec![ProtocolSpec::new("mock"), ProtocolSpec::new("carrier-pigeon")],
        ..RunConfig::default()
    };

    let err = engine(&[prober.clone()])
        .run(&hosts(&["a", "b"]), &config)
        .await
        .unwrap_err();

    assert_eq!(err, ConfigurationError::UnknownProtocol(ProtocolId::new("carrier-pigeon")));
    assert_eq!(prober.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn duplicate_hosts_are_rejected() {
    let prober = Arc::new(ScriptedProber::new("mock"));
    let err = engine(&[prober.clone()])
        .run(&hosts(&["a", "A"]), &config("mock", 0))
        .await
        .unwrap_err();

    assert_eq!(err, ConfigurationError::DuplicateHost("A".to_string()));
    assert_eq!(prober.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn oversized_backoff_is_rejected_before_probing() {
    let prober = Arc::new(ScriptedProber::new("mock").with_default(Step::Fail(FailureKind::ConnectionRefused)));
    let config = RunConfig {
        retry_backoff: "100000000000".parse().unwrap(),
        global_deadline: Some(Duration::from_secs(5)),
        ..config("mock", 1)
    };

    let err = engine(&[prober.clone()])
        .run(&hosts(&["a"]), &config)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ConfigurationError::InvalidValue { field: "retry_backoff", .. }
    ));
    assert_eq!(prober.call_count(), 0);
}

/*************************************************************
                         Report shape
**************************************************************/

#[tokio::test(start_paused = true)]
async fn results_keep_submission_order() {
    let prober = Arc::new(
        ScriptedProber::new("mock")
            .script("slow", vec![Step::SucceedAfter(Duration::from_millis(300))])
            .script("fast", vec![Step::SucceedAfter(Duration::from_millis(10))]),
    );
    let config = RunConfig {
        max_concurrency: 2,
        ..config("mock", 0)
    };

    let report = engine(&[prober.clone()])
        .run(&hosts(&["slow", "fast"]), &config)
        .await
        .unwrap();

    let order: Vec<&str> = report
        .results()
        .iter()
        .map(|r| r.target().host().address())
        .collect();
    assert_eq!(order, ["slow", "fast"]);
}

#[tokio::test(start_paused = true)]
async fn report_timestamps_cover_the_run() {
    let prober = Arc::new(ScriptedProber::new("mock").with_default(Step::SucceedAfter(Duration::from_millis(400))));
    let start = Instant::now();

    let report = engine(&[prober.clone()])
        .run(&hosts(&["a"]), &config("mock", 0))
        .await
        .unwrap();

    assert!(report.elapsed() >= Duration::from_millis(400));
    assert!(report.elapsed() <= start.elapsed());
    assert_eq!(report.finished_at(), report.started_at() + report.elapsed());
}
