use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::{const_rwlock, RwLock};
use tracing::{debug, error};

use crate::metrics::MetricValue;
use crate::{Client, Config, StatsdResult};

static GLOBAL: RwLock<Option<Arc<Statsd>>> = const_rwlock(None);

/// A configured, fire-and-forget StatsD emitter.
///
/// Every emission opens a fresh [`Client`], sends a single metric and closes the client again.
/// Failures are logged through `tracing` and never returned.
#[derive(Debug, Clone, PartialEq)]
pub struct Statsd {
    config: Config,
    addr: String,
}

impl Statsd {
    /// Create an emitter from `config`. A sample rate of zero is treated as unset and becomes 1.
    ///
    /// # Examples
    ///
    /// ```
    ///   use statsd_udp::{Config, Statsd};
    ///
    ///   let statsd = Statsd::new(Config::new("127.0.0.1", 8125, "myproj", true, 0.0));
    ///
    ///   assert_eq!(1.0, statsd.config().sample_rate);
    ///   assert_eq!("127.0.0.1:8125", statsd.addr());
    /// ```
    pub fn new(config: Config) -> Self {
        let config = config.normalized();
        let addr = config.addr();
        Statsd { config, addr }
    }

    /// The normalized configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The collector address every emission is sent to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Increment a counter by one at the default sample rate.
    pub fn incr(&self, stat: &str) {
        self.incr_by_val(stat, 1)
    }

    /// Increment a counter by `val` at the default sample rate.
    pub fn incr_by_val(&self, stat: &str, val: i64) {
        self.incr_with_sampling(stat, val, self.config.sample_rate)
    }

    /// Increment a counter by `val` at `sample_rate`. A `val` of zero sends nothing.
    pub fn incr_with_sampling(&self, stat: &str, val: i64, sample_rate: f32) {
        if val == 0 {
            return;
        }
        self.send(stat, MetricValue::Count(val), sample_rate)
    }

    /// Decrement a counter by one at the default sample rate.
    pub fn decr(&self, stat: &str) {
        self.decr_by_val(stat, 1)
    }

    /// Decrement a counter by `val` at the default sample rate.
    pub fn decr_by_val(&self, stat: &str, val: i64) {
        self.decr_with_sampling(stat, val, self.config.sample_rate)
    }

    /// Decrement a counter by `val` at `sample_rate`. A `val` of zero sends nothing.
    pub fn decr_with_sampling(&self, stat: &str, val: i64, sample_rate: f32) {
        if val == 0 {
            return;
        }
        // The client applies the sign itself and only accepts positive magnitudes.
        self.send_with(stat, sample_rate, |client, stat, rate| {
            client.decr_with_sampling(stat, val, rate)
        })
    }

    /// Set a gauge at the default sample rate.
    pub fn gauge(&self, stat: &str, val: i64) {
        self.gauge_with_sampling(stat, val, self.config.sample_rate)
    }

    /// Set a gauge at `sample_rate`.
    pub fn gauge_with_sampling(&self, stat: &str, val: i64, sample_rate: f32) {
        self.send(stat, MetricValue::Gauge(val), sample_rate)
    }

    /// Set a floating point gauge at the default sample rate.
    pub fn fgauge(&self, stat: &str, val: f64) {
        self.fgauge_with_sampling(stat, val, self.config.sample_rate)
    }

    /// Set a floating point gauge at `sample_rate`.
    pub fn fgauge_with_sampling(&self, stat: &str, val: f64, sample_rate: f32) {
        self.send(stat, MetricValue::FGauge(val), sample_rate)
    }

    /// Record a duration at the default sample rate, truncated to whole milliseconds.
    pub fn timing_by_value(&self, stat: &str, duration: TimeDelta) {
        self.timing_by_value_with_sampling(stat, duration, self.config.sample_rate)
    }

    /// Record a duration at `sample_rate`, truncated to whole milliseconds.
    pub fn timing_by_value_with_sampling(&self, stat: &str, duration: TimeDelta, sample_rate: f32) {
        self.send(stat, MetricValue::Timing(duration.num_milliseconds()), sample_rate)
    }

    /// Record the time elapsed between `start` and `end` at the default sample rate.
    pub fn timing(&self, stat: &str, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.timing_with_sampling(stat, start, end, self.config.sample_rate)
    }

    /// Record the time elapsed between `start` and `end` at `sample_rate`.
    pub fn timing_with_sampling(&self, stat: &str, start: DateTime<Utc>, end: DateTime<Utc>, sample_rate: f32) {
        self.timing_by_value_with_sampling(stat, end - start, sample_rate)
    }

    /// Time how long it takes for a block of code to execute and return its output.
    pub fn time<F, O>(&self, stat: &str, block: F) -> O
    where
        F: FnOnce() -> O,
    {
        let start = Utc::now();
        let output = block();
        self.timing(stat, start, Utc::now());
        output
    }

    fn send(&self, stat: &str, value: MetricValue, sample_rate: f32) {
        self.send_with(stat, sample_rate, |client, stat, rate| match value {
            MetricValue::Count(v) => client.incr_with_sampling(stat, v, rate),
            MetricValue::Gauge(v) => client.gauge_with_sampling(stat, v, rate),
            MetricValue::FGauge(v) => client.fgauge_with_sampling(stat, v, rate),
            MetricValue::Timing(v) => client.timing_with_sampling(stat, v, rate),
        })
    }

    fn send_with<F>(&self, stat: &str, sample_rate: f32, dispatch: F)
    where
        F: FnOnce(&Client, &str, f32) -> StatsdResult,
    {
        if !self.config.enable || stat.is_empty() {
            return;
        }

        let mut client = match Client::new(&self.addr, &self.config.project) {
            Ok(client) => client,
            Err(e) => {
                error!(error = %e, addr = %self.addr, "Failed to open StatsD client.");
                return;
            }
        };

        if let Err(e) = dispatch(&client, stat, sample_rate) {
            error!(error = %e, stat, "Failed to send metric.");
        }
        client.close();
    }
}

/// Install `config` as the process-wide configuration, replacing any previous one.
///
/// A sample rate of zero is treated as unset and becomes 1.
pub fn setup(config: Config) {
    let statsd = Statsd::new(config);
    debug!(addr = %statsd.addr, project = %statsd.config.project, enable = statsd.config.enable, "Configured StatsD.");
    *GLOBAL.write() = Some(Arc::new(statsd));
}

/// The emitter installed by [`setup`], if any.
pub fn global() -> Option<Arc<Statsd>> {
    GLOBAL.read().clone()
}

fn with_global<F>(f: F)
where
    F: FnOnce(&Statsd),
{
    // The read guard is released before any I/O happens.
    if let Some(statsd) = global() {
        f(&statsd)
    }
}

/// The current time, for use with [`timing`].
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Increment a counter by one.
pub fn incr(stat: &str) {
    with_global(|s| s.incr(stat))
}

/// Increment a counter by `val`. Zero sends nothing.
pub fn incr_by_val(stat: &str, val: i64) {
    with_global(|s| s.incr_by_val(stat, val))
}

/// Increment a counter by `val` with a probability of `sample_rate`.
pub fn incr_with_sampling(stat: &str, val: i64, sample_rate: f32) {
    with_global(|s| s.incr_with_sampling(stat, val, sample_rate))
}

/// Decrement a counter by one.
pub fn decr(stat: &str) {
    with_global(|s| s.decr(stat))
}

/// Decrement a counter by `val`. Zero sends nothing.
pub fn decr_by_val(stat: &str, val: i64) {
    with_global(|s| s.decr_by_val(stat, val))
}

/// Decrement a counter by `val` with a probability of `sample_rate`.
pub fn decr_with_sampling(stat: &str, val: i64, sample_rate: f32) {
    with_global(|s| s.decr_with_sampling(stat, val, sample_rate))
}

/// Set a gauge.
pub fn gauge(stat: &str, val: i64) {
    with_global(|s| s.gauge(stat, val))
}

/// Set a gauge with a probability of `sample_rate`.
pub fn gauge_with_sampling(stat: &str, val: i64, sample_rate: f32) {
    with_global(|s| s.gauge_with_sampling(stat, val, sample_rate))
}

/// Set a floating point gauge.
pub fn fgauge(stat: &str, val: f64) {
    with_global(|s| s.fgauge(stat, val))
}

/// Set a floating point gauge with a probability of `sample_rate`.
pub fn fgauge_with_sampling(stat: &str, val: f64, sample_rate: f32) {
    with_global(|s| s.fgauge_with_sampling(stat, val, sample_rate))
}

/// Record a duration, truncated to whole milliseconds.
pub fn timing_by_value(stat: &str, duration: TimeDelta) {
    with_global(|s| s.timing_by_value(stat, duration))
}

/// Record a duration with a probability of `sample_rate`.
pub fn timing_by_value_with_sampling(stat: &str, duration: TimeDelta, sample_rate: f32) {
    with_global(|s| s.timing_by_value_with_sampling(stat, duration, sample_rate))
}

/// Record the time elapsed between `start` and `end`.
pub fn timing(stat: &str, start: DateTime<Utc>, end: DateTime<Utc>) {
    with_global(|s| s.timing(stat, start, end))
}

/// Record the time elapsed between `start` and `end` with a probability of `sample_rate`.
pub fn timing_with_sampling(stat: &str, start: DateTime<Utc>, end: DateTime<Utc>, sample_rate: f32) {
    with_global(|s| s.timing_with_sampling(stat, start, end, sample_rate))
}

/// Time how long it takes for a block of code to execute. The block runs even when nothing is
/// configured.
pub fn time<F, O>(stat: &str, block: F) -> O
where
    F: FnOnce() -> O,
{
    match global() {
        Some(statsd) => statsd.time(stat, block),
        None => block(),
    }
}
