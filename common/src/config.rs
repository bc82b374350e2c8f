use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigurationError;
use crate::network::protocol::ProtocolSpec;

pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);
pub const DEFAULT_ABANDON_GRACE: Duration = Duration::from_millis(250);
/// Longest delay a backoff may insert between two attempts of a target.
pub const MAX_BACKOFF: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_BACKOFF_CEILING: Duration = Duration::from_secs(10);

/// Everything a run needs besides the inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Upper bound on attempts in flight at any instant, across all targets.
    pub max_concurrency: usize,
    /// Per-attempt timeout unless a protocol overrides it.
    pub per_attempt_timeout: Duration,
    /// Retries after the first attempt unless a protocol overrides it.
    pub max_retries: u32,
    pub retry_backoff: Backoff,
    /// Bounds the whole run. Targets still unresolved when it elapses are
    /// abandoned and the run is reported as aborted.
    pub global_deadline: Option<Duration>,
    /// How long an attempt may overrun its deadline before its slot is
    /// reclaimed without the prober's cooperation.
    pub abandon_grace: Duration,
    pub enabled_protocols: Vec<ProtocolSpec>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_CONCURRENCY,
            per_attempt_timeout: DEFAULT_TIMEOUT,
            max_retries: 0,
            retry_backoff: Backoff::Constant(DEFAULT_BACKOFF),
            global_deadline: None,
            abandon_grace: DEFAULT_ABANDON_GRACE,
            enabled_protocols: vec![ProtocolSpec::new("icmp")],
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_concurrency == 0 {
            return Err(invalid("max_concurrency", "must be greater than zero"));
        }
        if self.per_attempt_timeout.is_zero() {
            return Err(invalid("per_attempt_timeout", "must be greater than zero"));
        }
        if self.global_deadline.is_some_and(|deadline| deadline.is_zero()) {
            return Err(invalid("global_deadline", "must be greater than zero"));
        }
        if self.retry_backoff.longest() > MAX_BACKOFF {
            return Err(invalid(
                "retry_backoff",
                &format!("delays may not exceed {}s", MAX_BACKOFF.as_secs()),
            ));
        }
        if self.enabled_protocols.is_empty() {
            return Err(ConfigurationError::NoProtocols);
        }
        for spec in &self.enabled_protocols {
            if spec.timeout().is_some_and(|timeout| timeout.is_zero()) {
                return Err(ConfigurationError::InvalidOption {
                    protocol: spec.id().clone(),
                    reason: "timeout must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn budget(&self) -> AttemptBudget {
        AttemptBudget {
            timeout: self.per_attempt_timeout,
            retries: self.max_retries,
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}

/// Run-wide attempt defaults a [`ProtocolSpec`] may override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptBudget {
    pub timeout: Duration,
    pub retries: u32,
}

impl AttemptBudget {
    pub fn for_spec(&self, spec: &ProtocolSpec) -> AttemptBudget {
        AttemptBudget {
            timeout: spec.timeout().unwrap_or(self.timeout),
            retries: spec.retries().unwrap_or(self.retries),
        }
    }
}

/// Delay inserted before retry `n + 1`, as a function of the failed attempt's
/// index `n` (0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    None,
    Constant(Duration),
    /// `base * 2^n`, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Upper bound of [`Backoff::delay`] over every attempt.
    pub fn longest(&self) -> Duration {
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Constant(delay) => delay,
            Backoff::Exponential { max, .. } => max,
        }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Constant(delay) => delay,
            Backoff::Exponential { base, max } => {
                let factor: u32 = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
                base.checked_mul(factor).unwrap_or(max).min(max)
            }
        }
    }
}

impl fmt::Display for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backoff::None => f.write_str("none"),
            Backoff::Constant(delay) => write!(f, "const:{}", delay.as_millis()),
            Backoff::Exponential { base, max } => {
                write!(f, "exp:{}:{}", base.as_millis(), max.as_millis())
            }
        }
    }
}

impl FromStr for Backoff {
    type Err = String;

    /// Accepts `none`, `<ms>`, `const:<ms>`, `exp:<base_ms>` and
    /// `exp:<base_ms>:<max_ms>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if lower == "none" || lower == "0" {
            return Ok(Backoff::None);
        }

        let mut parts = lower.split(':');
        let kind = parts.next().unwrap_or_default();
        match kind {
            "const" | "constant" => {
                let delay = parse_millis(parts.next(), s)?;
                Ok(Backoff::Constant(delay))
            }
            "exp" | "exponential" => {
                let base = parse_millis(parts.next(), s)?;
                let max = match parts.next() {
                    Some(max) => parse_millis(Some(max), s)?,
                    None => DEFAULT_BACKOFF_CEILING.max(base),
                };
                if max < base {
                    return Err(format!("backoff ceiling is below its base in '{s}'"));
                }
                Ok(Backoff::Exponential { base, max })
            }
            _ => Ok(Backoff::Constant(parse_millis(Some(kind), s)?)),
        }
    }
}

fn parse_millis(part: Option<&str>, original: &str) -> Result<Duration, String> {
    let Some(part) = part else {
        return Err(format!("missing milliseconds in backoff '{original}'"));
    };
    part.parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| format!("invalid milliseconds '{part}' in backoff '{original}': {e}"))
}
