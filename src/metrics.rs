use std::fmt;

/// The value carried by a single metric event, tagged with its StatsD type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Count(i64),
    Gauge(i64),
    FGauge(f64),
    Timing(i64),
}

impl MetricValue {
    fn type_code(&self) -> &'static str {
        match self {
            MetricValue::Count(_) => "c",
            MetricValue::Gauge(_) | MetricValue::FGauge(_) => "g",
            MetricValue::Timing(_) => "ms",
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Count(v) | MetricValue::Gauge(v) | MetricValue::Timing(v) => write!(f, "{}", v),
            // f64's Display never switches to exponent notation
            MetricValue::FGauge(v) => write!(f, "{}", v),
        }
    }
}

pub struct Metric<'a> {
    stat: &'a str,
    value: MetricValue,
    sample_rate: f32,
}

impl<'a> Metric<'a> {
    pub fn new(stat: &'a str, value: MetricValue, sample_rate: f32) -> Self {
        Metric {
            stat,
            value,
            sample_rate,
        }
    }

    // my_count:1|c
    // my_count:-1|c|@0.500000
    // myproj.my_gauge:1.5|g
    pub fn format_for_send(&self, prefix: &str) -> String {
        let mut buf = String::with_capacity(prefix.len() + self.stat.len() + 24);
        if !prefix.is_empty() {
            buf.push_str(prefix);
            buf.push('.');
        }
        buf.push_str(self.stat);
        buf.push(':');
        buf.push_str(&self.value.to_string());
        buf.push('|');
        buf.push_str(self.value.type_code());
        if self.sample_rate != 1.0 {
            buf.push_str(&format!("|@{:.6}", self.sample_rate));
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_metric() {
        let metric = Metric::new("x", MetricValue::Count(5), 1.0);

        assert_eq!("x:5|c", metric.format_for_send(""))
    }

    #[test]
    fn test_count_metric_negative() {
        let metric = Metric::new("decr", MetricValue::Count(-1), 1.0);

        assert_eq!("decr:-1|c", metric.format_for_send(""))
    }

    #[test]
    fn test_sampled_metric() {
        let metric = Metric::new("x", MetricValue::Count(5), 0.5);

        assert_eq!("x:5|c|@0.500000", metric.format_for_send(""))
    }

    #[test]
    fn test_sampled_metric_with_prefix() {
        let metric = Metric::new("requests", MetricValue::Count(5), 0.25);

        assert_eq!("myapp.requests:5|c|@0.250000", metric.format_for_send("myapp"))
    }

    #[test]
    fn test_gauge_metric() {
        let metric = Metric::new("queue_depth", MetricValue::Gauge(42), 1.0);

        assert_eq!("myapp.queue_depth:42|g", metric.format_for_send("myapp"))
    }

    #[test]
    fn test_fgauge_metric() {
        let metric = Metric::new("load", MetricValue::FGauge(-2.5), 1.0);

        assert_eq!("load:-2.5|g", metric.format_for_send(""))
    }

    #[test]
    fn test_fgauge_metric_no_exponent() {
        assert_eq!("big:10000000000000000000000|g", Metric::new("big", MetricValue::FGauge(1e22), 1.0).format_for_send(""));
        assert_eq!("small:0.0001|g", Metric::new("small", MetricValue::FGauge(0.0001), 1.0).format_for_send(""));
        assert_eq!("whole:42|g", Metric::new("whole", MetricValue::FGauge(42.0), 1.0).format_for_send(""));
    }

    #[test]
    fn test_timing_metric() {
        let metric = Metric::new("latency", MetricValue::Timing(123), 1.0);

        assert_eq!("myapp.latency:123|ms", metric.format_for_send("myapp"))
    }
}
