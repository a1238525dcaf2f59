//! A fire-and-forget client for sending metrics to StatsD over UDP
//!
//! Counters, gauges and timers are encoded in the plain StatsD line protocol, optionally sampled,
//! and written as one datagram per metric. There are two ways to use the crate: a low level
//! [`Client`] that owns a socket and reports every failure, and a process-wide façade that opens a
//! client per call and never lets a metrics failure reach the caller.
//!
//! ## Usage
//!
//! Configure the façade once at startup, then emit from anywhere:
//!
//! ```
//! use statsd_udp::ConfigBuilder;
//!
//! statsd_udp::setup(
//!     ConfigBuilder::new()
//!         .host("127.0.0.1".into())
//!         .port(8125)
//!         .project("myapp".into())
//!         .build(),
//! );
//!
//! // Increment a counter, sends `myapp.login.count:1|c`
//! statsd_udp::incr("login.count");
//!
//! // Report a gauge, sampled at 10%
//! statsd_udp::gauge_with_sampling("queue_depth", 42, 0.1);
//!
//! // Report a duration between two points in time
//! let start = statsd_udp::now();
//! // Some time consuming code
//! statsd_udp::timing("latency", start, statsd_udp::now());
//! ```
//!
//! Or hold an explicit handle instead of the process-wide one:
//!
//! ```
//! use statsd_udp::{Config, Statsd};
//!
//! let statsd = Statsd::new(Config::default());
//! statsd.fgauge("load", 0.75);
//! ```
//!
//! Use the client directly when errors matter:
//!
//! ```
//! use statsd_udp::Client;
//!
//! let client = Client::new("127.0.0.1:8125", "myapp").unwrap();
//!
//! // Increment a counter
//! client.incr("my_counter", 1)
//!     .unwrap_or_else(|e| println!("Encountered error: {}", e));
//!
//! // Decrement a counter, sampled at 50%
//! client.decr_with_sampling("my_counter", 2, 0.5)
//!     .unwrap_or_else(|e| println!("Encountered error: {}", e));
//!
//! // Report your own timing in ms
//! client.timing("my_timing", 500)
//!     .unwrap_or_else(|e| println!("Encountered error: {}", e));
//!
//! // Report a value as a gauge
//! client.gauge("my_gauge", 12345)
//!     .unwrap_or_else(|e| println!("Encountered error: {}", e));
//! ```

#![cfg_attr(feature = "unstable", feature(test))]
#![deny(
    warnings,
    missing_debug_implementations,
    missing_copy_implementations,
    missing_docs
)]

use std::borrow::Cow;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use chrono::Utc;
use tracing::warn;

pub use self::error::{StatsdError, StatsdResult};
pub use self::facade::*;
use self::metrics::{Metric, MetricValue};
use self::sampling::{check_count, check_sample_rate, should_fire};

mod error;
mod facade;
mod metrics;
mod sampling;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8125;
const DEFAULT_SAMPLE_RATE: f32 = 1.0;

/// Upper bound on how long opening the socket or writing a datagram may block.
pub const SOCKET_TIMEOUT: Duration = Duration::from_secs(5);

/// The configuration of the process-wide StatsD façade.
#[derive(Debug, PartialEq, Clone)]
pub struct Config {
    /// The host of the StatsD collector.
    pub host: String,
    /// The port of the StatsD collector.
    pub port: u16,
    /// A namespace to prefix all metrics with, joined with a '.'.
    pub project: String,
    /// When false, every emission is a no-op.
    pub enable: bool,
    /// The sample rate used when a call doesn't give one. Zero means "unset" and becomes 1.
    pub sample_rate: f32,
}

impl Default for Config {
    /// Create a new config struct with all the default settings.
    ///
    /// # Examples
    ///
    /// ```
    ///   use statsd_udp::Config;
    ///
    ///   let config = Config::default();
    ///
    ///   assert_eq!(
    ///       Config {
    ///           host: "127.0.0.1".into(),
    ///           port: 8125,
    ///           project: String::new(),
    ///           enable: true,
    ///           sample_rate: 1.0,
    ///       },
    ///       config
    ///   )
    /// ```
    fn default() -> Self {
        Config {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            project: String::new(),
            enable: true,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl Config {
    /// Create a new config struct by supplying values for all fields.
    ///
    /// # Examples
    ///
    /// ```
    ///   use statsd_udp::Config;
    ///
    ///   let config = Config::new("10.1.2.3", 8125, "analytics", true, 0.5);
    /// ```
    pub fn new(host: &str, port: u16, project: &str, enable: bool, sample_rate: f32) -> Self {
        Config {
            host: host.into(),
            port,
            project: project.into(),
            enable,
            sample_rate,
        }
    }

    /// The `host:port` address of the collector, bracketing IPv6 literals.
    ///
    /// # Examples
    ///
    /// ```
    ///   use statsd_udp::Config;
    ///
    ///   assert_eq!("10.1.2.3:8125", Config::new("10.1.2.3", 8125, "", true, 1.0).addr());
    ///   assert_eq!("[::1]:8125", Config::new("::1", 8125, "", true, 1.0).addr());
    /// ```
    pub fn addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    // An unset rate is indistinguishable from zero, and zero would silence everything.
    pub(crate) fn normalized(mut self) -> Self {
        if self.sample_rate == 0.0 {
            self.sample_rate = DEFAULT_SAMPLE_RATE;
        }
        self
    }
}

/// Struct that allows build a `Config` for the StatsD façade.
#[derive(Default, Debug)]
pub struct ConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    project: Option<String>,
    enable: Option<bool>,
    sample_rate: Option<f32>,
}

impl ConfigBuilder {
    /// Create a new `ConfigBuilder` struct.
    ///
    /// # Examples
    ///
    /// ```
    ///   use statsd_udp::ConfigBuilder;
    ///
    ///   let config_builder = ConfigBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Will allow the builder to generate a `Config` struct with the provided value.
    ///
    /// # Examples
    ///
    /// ```
    ///   use statsd_udp::ConfigBuilder;
    ///
    ///   let config_builder = ConfigBuilder::new().host(String::from("10.1.2.3"));
    /// ```
    pub fn host(&mut self, host: String) -> &mut ConfigBuilder {
        self.host = Some(host);
        self
    }

    /// Will allow the builder to generate a `Config` struct with the provided value.
    ///
    /// # Examples
    ///
    /// ```
    ///   use statsd_udp::ConfigBuilder;
    ///
    ///   let config_builder = ConfigBuilder::new().port(9125);
    /// ```
    pub fn port(&mut self, port: u16) -> &mut ConfigBuilder {
        self.port = Some(port);
        self
    }

    /// Will allow the builder to generate a `Config` struct with the provided value.
    ///
    /// # Examples
    ///
    /// ```
    ///   use statsd_udp::ConfigBuilder;
    ///
    ///   let config_builder = ConfigBuilder::new().project(String::from("myproj"));
    /// ```
    pub fn project(&mut self, project: String) -> &mut ConfigBuilder {
        self.project = Some(project);
        self
    }

    /// Will allow the builder to generate a `Config` struct with the provided value.
    pub fn enable(&mut self, enable: bool) -> &mut ConfigBuilder {
        self.enable = Some(enable);
        self
    }

    /// Will allow the builder to generate a `Config` struct with the provided value.
    pub fn sample_rate(&mut self, sample_rate: f32) -> &mut ConfigBuilder {
        self.sample_rate = Some(sample_rate);
        self
    }

    /// Will construct a `Config` with all of the provided values and fall back to the default values if they aren't provided.
    ///
    /// # Examples
    ///
    /// ```
    ///   use statsd_udp::{Config, ConfigBuilder};
    ///
    ///   let config = ConfigBuilder::new().project(String::from("myproj")).sample_rate(0.25).build();
    ///
    ///   assert_eq!(
    ///       Config {
    ///           host: "127.0.0.1".into(),
    ///           port: 8125,
    ///           project: String::from("myproj"),
    ///           enable: true,
    ///           sample_rate: 0.25,
    ///       },
    ///       config
    ///   )
    /// ```
    pub fn build(&self) -> Config {
        let defaults = Config::default();
        Config {
            host: self.host.clone().unwrap_or(defaults.host),
            port: self.port.unwrap_or(defaults.port),
            project: self.project.clone().unwrap_or(defaults.project),
            enable: self.enable.unwrap_or(defaults.enable),
            sample_rate: self.sample_rate.unwrap_or(defaults.sample_rate),
        }
    }
}

/// The client struct that handles sending metrics to the StatsD server.
///
/// Every operation validates its input before touching the network and reports failures to the
/// caller. Nothing is retried or buffered.
#[derive(Debug)]
pub struct Client {
    socket: Option<UdpSocket>,
    addr: String,
    prefix: String,
}

impl PartialEq for Client {
    fn eq(&self, other: &Self) -> bool {
        // Ignore `socket`, which will never be the same
        self.addr == other.addr && self.prefix == other.prefix
    }
}

impl Client {
    /// Open a UDP socket connected to `addr`. Every metric name will be prefixed with `prefix`
    /// followed by a '.', unless `prefix` is empty. Trailing dots on `prefix` are dropped.
    ///
    /// # Examples
    ///
    /// ```
    ///   use statsd_udp::Client;
    ///
    ///   let client = Client::new("127.0.0.1:8125", "myproj.").unwrap();
    /// ```
    pub fn new(addr: &str, prefix: &str) -> Result<Self, StatsdError> {
        let remote = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| StatsdError::UnresolvedAddress(addr.into()))?;
        let local = match remote {
            SocketAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            SocketAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };

        let socket = UdpSocket::bind(local)?;
        socket.set_write_timeout(Some(SOCKET_TIMEOUT))?;
        socket.connect(remote)?;

        Ok(Client {
            socket: Some(socket),
            addr: addr.into(),
            prefix: prefix.trim_end_matches('.').into(),
        })
    }

    /// The address this client sends to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// The namespace every metric is prefixed with, without its trailing '.'.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Release the socket. Sending afterwards fails with [`StatsdError::NotConnected`]; closing
    /// twice is fine.
    pub fn close(&mut self) {
        self.socket = None;
    }

    /// Increment a StatsD counter by `count`, which must be positive
    ///
    /// # Examples
    ///
    /// ```
    ///   use statsd_udp::Client;
    ///
    ///   let client = Client::new("127.0.0.1:8125", "").unwrap();
    ///   client.incr("counter", 1)
    ///       .unwrap_or_else(|e| println!("Encountered error: {}", e));
    /// ```
    pub fn incr<'a, S>(&self, stat: S, count: i64) -> StatsdResult
    where
        S: Into<Cow<'a, str>>,
    {
        self.incr_with_sampling(stat, count, 1.0)
    }

    /// Increment a StatsD counter by `count`, sent with a probability of `sample_rate`
    pub fn incr_with_sampling<'a, S>(&self, stat: S, count: i64, sample_rate: f32) -> StatsdResult
    where
        S: Into<Cow<'a, str>>,
    {
        check_sample_rate(sample_rate)?;
        check_count(count)?;
        if !should_fire(sample_rate) {
            return Ok(());
        }
        self.send(&Metric::new(stat.into().as_ref(), MetricValue::Count(count), sample_rate))
    }

    /// Decrement a StatsD counter by `count`, which must be positive
    ///
    /// # Examples
    ///
    /// ```
    ///   use statsd_udp::Client;
    ///
    ///   let client = Client::new("127.0.0.1:8125", "").unwrap();
    ///   client.decr("counter", 1)
    ///       .unwrap_or_else(|e| println!("Encountered error: {}", e));
    /// ```
    pub fn decr<'a, S>(&self, stat: S, count: i64) -> StatsdResult
    where
        S: Into<Cow<'a, str>>,
    {
        self.decr_with_sampling(stat, count, 1.0)
    }

    /// Decrement a StatsD counter by `count`, sent with a probability of `sample_rate`
    pub fn decr_with_sampling<'a, S>(&self, stat: S, count: i64, sample_rate: f32) -> StatsdResult
    where
        S: Into<Cow<'a, str>>,
    {
        check_sample_rate(sample_rate)?;
        check_count(count)?;
        if !should_fire(sample_rate) {
            return Ok(());
        }
        self.send(&Metric::new(stat.into().as_ref(), MetricValue::Count(-count), sample_rate))
    }

    /// Send your own timing metric in milliseconds
    ///
    /// # Examples
    ///
    /// ```
    ///   use statsd_udp::Client;
    ///
    ///   let client = Client::new("127.0.0.1:8125", "").unwrap();
    ///   client.timing("timing", 350)
    ///       .unwrap_or_else(|e| println!("Encountered error: {}", e));
    /// ```
    pub fn timing<'a, S>(&self, stat: S, ms: i64) -> StatsdResult
    where
        S: Into<Cow<'a, str>>,
    {
        self.timing_with_sampling(stat, ms, 1.0)
    }

    /// Send your own timing metric in milliseconds, with a probability of `sample_rate`
    pub fn timing_with_sampling<'a, S>(&self, stat: S, ms: i64, sample_rate: f32) -> StatsdResult
    where
        S: Into<Cow<'a, str>>,
    {
        check_sample_rate(sample_rate)?;
        if !should_fire(sample_rate) {
            return Ok(());
        }
        self.send(&Metric::new(stat.into().as_ref(), MetricValue::Timing(ms), sample_rate))
    }

    /// Time how long it takes for a block of code to execute.
    ///
    /// # Examples
    ///
    /// ```
    ///   use statsd_udp::Client;
    ///   use std::thread;
    ///   use std::time::Duration;
    ///
    ///   let client = Client::new("127.0.0.1:8125", "").unwrap();
    ///   client.time("timer", || {
    ///       thread::sleep(Duration::from_millis(20))
    ///   }).unwrap_or_else(|(_, e)| println!("Encountered error: {}", e))
    /// ```
    pub fn time<'a, F, O, S>(&self, stat: S, block: F) -> Result<O, (O, StatsdError)>
    where
        F: FnOnce() -> O,
        S: Into<Cow<'a, str>>,
    {
        let start_time = Utc::now();
        let output = block();
        let end_time = Utc::now();
        match self.timing(stat, (end_time - start_time).num_milliseconds()) {
            Ok(()) => Ok(output),
            Err(error) => Err((output, error)),
        }
    }

    /// Report a value as a gauge.
    ///
    /// The protocol reads a leading sign as a relative change, so a negative value is sent as a
    /// reset to zero followed by the value itself.
    ///
    /// # Examples
    ///
    /// ```
    ///   use statsd_udp::Client;
    ///
    ///   let client = Client::new("127.0.0.1:8125", "").unwrap();
    ///   client.gauge("gauge", 12345)
    ///       .unwrap_or_else(|e| println!("Encountered error: {}", e));
    /// ```
    pub fn gauge<'a, S>(&self, stat: S, value: i64) -> StatsdResult
    where
        S: Into<Cow<'a, str>>,
    {
        self.gauge_with_sampling(stat, value, 1.0)
    }

    /// Report a value as a gauge, with a probability of `sample_rate`
    pub fn gauge_with_sampling<'a, S>(&self, stat: S, value: i64, sample_rate: f32) -> StatsdResult
    where
        S: Into<Cow<'a, str>>,
    {
        check_sample_rate(sample_rate)?;
        if !should_fire(sample_rate) {
            return Ok(());
        }
        let stat = stat.into();
        if value < 0 {
            self.reset_gauge(stat.as_ref());
        }
        self.send(&Metric::new(stat.as_ref(), MetricValue::Gauge(value), sample_rate))
    }

    /// Report a floating point value as a gauge
    ///
    /// # Examples
    ///
    /// ```
    ///   use statsd_udp::Client;
    ///
    ///   let client = Client::new("127.0.0.1:8125", "").unwrap();
    ///   client.fgauge("gauge", 0.75)
    ///       .unwrap_or_else(|e| println!("Encountered error: {}", e));
    /// ```
    pub fn fgauge<'a, S>(&self, stat: S, value: f64) -> StatsdResult
    where
        S: Into<Cow<'a, str>>,
    {
        self.fgauge_with_sampling(stat, value, 1.0)
    }

    /// Report a floating point value as a gauge, with a probability of `sample_rate`
    pub fn fgauge_with_sampling<'a, S>(&self, stat: S, value: f64, sample_rate: f32) -> StatsdResult
    where
        S: Into<Cow<'a, str>>,
    {
        check_sample_rate(sample_rate)?;
        if !should_fire(sample_rate) {
            return Ok(());
        }
        let stat = stat.into();
        if value < 0.0 {
            self.reset_gauge(stat.as_ref());
        }
        self.send(&Metric::new(stat.as_ref(), MetricValue::FGauge(value), sample_rate))
    }

    fn reset_gauge(&self, stat: &str) {
        if let Err(error) = self.send(&Metric::new(stat, MetricValue::Gauge(0), 1.0)) {
            warn!(%error, stat, "Failed to reset gauge before sending a negative value.");
        }
    }

    fn send(&self, metric: &Metric<'_>) -> StatsdResult {
        let socket = self.socket.as_ref().ok_or(StatsdError::NotConnected)?;
        let formatted_metric = metric.format_for_send(&self.prefix);
        socket.send(formatted_metric.as_bytes())?;
        Ok(())
    }
}


#[cfg(all(feature = "unstable", test))]
mod bench {
    extern crate test;

    use super::*;

    use self::test::Bencher;

    #[bench]
    fn bench_incr(b: &mut Bencher) {
        let client = Client::new("127.0.0.1:8125", "bench").unwrap();
        b.iter(|| {
            let _ = client.incr("bench.incr", 1);
        })
    }

    #[bench]
    fn bench_incr_sampled(b: &mut Bencher) {
        let client = Client::new("127.0.0.1:8125", "bench").unwrap();
        b.iter(|| {
            let _ = client.incr_with_sampling("bench.incr", 1, 0.1);
        })
    }

    #[bench]
    fn bench_gauge(b: &mut Bencher) {
        let client = Client::new("127.0.0.1:8125", "bench").unwrap();
        let mut i = 0;
        b.iter(|| {
            let _ = client.gauge("bench.gauge", i);
            i += 1;
        })
    }

    #[bench]
    fn bench_format(b: &mut Bencher) {
        let mut i = 0;
        b.iter(|| {
            let metric = Metric::new("bench.timing", MetricValue::Timing(i), 0.5);
            i += 1;
            metric.format_for_send("bench")
        })
    }

    #[bench]
    fn bench_facade_incr(b: &mut Bencher) {
        let statsd = Statsd::new(Config::new("127.0.0.1", 8125, "bench", true, 1.0));
        b.iter(|| statsd.incr("bench.facade"))
    }
}
