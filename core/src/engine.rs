use multiping_common::{ConfigurationError, Host, RunConfig, RunReport};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::aggregator::{Aggregator, ProgressCallback};
use crate::dispatcher::Dispatcher;
use crate::registry::Registry;
use crate::targets::expand;

const RESULT_CHANNEL_CAPACITY: usize = 64;

/// Runs `hosts` against `config` with the built-in probers.
pub async fn run(hosts: &[Host], config: &RunConfig) -> Result<RunReport, ConfigurationError> {
    Engine::new(Registry::with_defaults()).run(hosts, config).await
}

#[derive(Clone)]
pub struct Engine {
    registry: Registry,
    cancel: CancellationToken,
    on_progress: Option<ProgressCallback>,
}

impl Engine {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            cancel: CancellationToken::new(),
            on_progress: None,
        }
    }

    /// Cancelling `token` stops the run; unresolved targets are abandoned.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Validates the configuration, probes every (host, protocol) target and
    /// returns the sealed report. Configuration problems are reported before
    /// any probe is sent.
    pub async fn run(
        &self,
        hosts: &[Host],
        config: &RunConfig,
    ) -> Result<RunReport, ConfigurationError> {
        config.validate()?;
        let targets = expand(
            hosts,
            &config.enabled_protocols,
            &self.registry,
            config.budget(),
        )?;

        info!(
            "probing {} target(s) across {} host(s), {} at a time",
            targets.len(),
            hosts.len(),
            config.max_concurrency
        );

        let dispatcher = Dispatcher::new(self.registry.clone(), config)
            .with_cancellation(self.cancel.clone());
        let mut aggregator = Aggregator::new(targets.len()).with_progress(self.on_progress.clone());
        let (tx, rx) = mpsc::channel(RESULT_CHANNEL_CAPACITY);

        let (summary, ()) = tokio::join!(dispatcher.dispatch(targets, tx), aggregator.collect(rx));
        let report = aggregator.seal(summary);

        info!(
            "run finished in {:?}: {:?}",
            report.elapsed(),
            report.status()
        );
        Ok(report)
    }
}
