#![cfg(test)]
//! Built-in probers against services bound on the loopback interface.

use std::time::Duration;

use multiping_common::{
    Classification, ConfigurationError, FailureKind, Host, ProtocolId, ProtocolSpec, RunConfig,
    RunStatus,
};
use multiping_core::{Engine, Registry};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const LOOPBACK: &str = "127.0.0.1";

/// Accepts connections forever and answers each with `reply`, if any.
async fn serve(reply: Option<&'static str>) -> anyhow::Result<u16> {
    let listener = TcpListener::bind((LOOPBACK, 0)).await?;
    let port = listener.local_addr()?.port();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                if let Some(reply) = reply {
                    let _ = stream.write_all(reply.as_bytes()).await;
                }
                let _ = stream.shutdown().await;
            });
        }
    });
    Ok(port)
}

/// A port nothing listens on.
async fn closed_port() -> anyhow::Result<u16> {
    let listener = TcpListener::bind((LOOPBACK, 0)).await?;
    Ok(listener.local_addr()?.port())
}

fn config(protocols: Vec<ProtocolSpec>) -> RunConfig {
    RunConfig {
        per_attempt_timeout: Duration::from_secs(2),
        enabled_protocols: protocols,
        ..RunConfig::default()
    }
}

fn engine() -> Engine {
    Engine::new(Registry::with_defaults())
}

/*************************************************************
                      Reachable services
**************************************************************/

#[tokio::test]
async fn http_and_tcp_against_loopback() -> anyhow::Result<()> {
    let http_port = serve(Some("HTTP/1.1 204 No Content\r\nContent-Length: 0\r\n\r\n")).await?;
    let tcp_port = serve(None).await?;
    let config = config(vec![
        ProtocolSpec::new("http").with_option("port", http_port.to_string()),
        ProtocolSpec::new("tcp").with_option("port", tcp_port.to_string()),
    ]);

    let report = engine().run(&[Host::new(LOOPBACK)], &config).await?;

    assert_eq!(report.status(), RunStatus::Completed);
    assert_eq!(report.results().len(), 2);
    for result in report.results() {
        assert_eq!(result.classification(), Classification::Reachable);
        assert!(result.latency().is_some());
    }
    Ok(())
}

/*************************************************************
                     Unreachable services
**************************************************************/

#[tokio::test]
async fn closed_port_is_unreachable() -> anyhow::Result<()> {
    let port = closed_port().await?;
    let config = RunConfig {
        max_retries: 1,
        retry_backoff: multiping_common::Backoff::None,
        ..config(vec![ProtocolSpec::new("tcp").with_option("port", port.to_string())])
    };

    let report = engine().run(&[Host::new(LOOPBACK)], &config).await?;

    let result = report
        .result(LOOPBACK, &ProtocolId::new("tcp"))
        .expect("one result per target");
    assert_eq!(result.classification(), Classification::Unreachable);
    assert_eq!(result.attempts().len(), 2);
    assert_eq!(
        result.final_outcome().and_then(|outcome| outcome.failure_kind()),
        Some(FailureKind::ConnectionRefused)
    );
    assert_eq!(report.status(), RunStatus::CompletedWithFailures);
    assert_eq!(report.status().exit_code(), 1);
    Ok(())
}

#[tokio::test]
async fn non_http_service_is_errored() -> anyhow::Result<()> {
    let port = serve(Some("SSH-2.0-OpenSSH_9.6\r\n")).await?;
    let config = config(vec![ProtocolSpec::new("http").with_option("port", port.to_string())]);

    let report = engine().run(&[Host::new(LOOPBACK)], &config).await?;

    let result = &report.results()[0];
    assert_eq!(result.classification(), Classification::Errored);
    assert_eq!(
        result.final_outcome().and_then(|outcome| outcome.failure_kind()),
        Some(FailureKind::ProtocolError)
    );
    assert_eq!(report.counters().errored, 1);
    Ok(())
}

/*************************************************************
                       Option checking
**************************************************************/

#[tokio::test]
async fn bad_prober_options_fail_before_probing() {
    let config = config(vec![ProtocolSpec::new("tcp").with_option("port", "seventy")]);

    let err = engine()
        .run(&[Host::new(LOOPBACK)], &config)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ConfigurationError::InvalidOption { ref protocol, .. } if protocol.as_str() == "tcp"
    ));
}

#[tokio::test]
async fn icmp_takes_no_options() {
    let config = config(vec![ProtocolSpec::new("icmp").with_option("ttl", "3")]);

    let err = engine()
        .run(&[Host::new(LOOPBACK)], &config)
        .await
        .unwrap_err();

    assert!(matches!(err, ConfigurationError::InvalidOption { .. }));
}
