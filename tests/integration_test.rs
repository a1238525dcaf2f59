mod support;

use statsd_udp::{Client, StatsdError};

use crate::support::{create_server, TestServer};

async fn create_client(prefix: &str) -> (TestServer, Client) {
    let server = create_server().await;
    let client = Client::new(&server.addr(), prefix).expect("unable to create client");
    (server, client)
}

#[tokio::test(flavor = "multi_thread")]
async fn whole_test() {
    let (mut server, client) = create_client("myapp").await;

    client.incr("requests", 1).expect("unable to send stat");
    client.incr_with_sampling("requests", 5, 1.0).expect("unable to send stat");
    client.decr("requests", 2).expect("unable to send stat");
    client.gauge("queue_depth", 42).expect("unable to send stat");
    client.fgauge("load", 0.75).expect("unable to send stat");
    client.timing("latency", 123).expect("unable to send stat");

    assert_eq!(Some("myapp.requests:1|c".into()), server.next_metric().await);
    assert_eq!(Some("myapp.requests:5|c".into()), server.next_metric().await);
    assert_eq!(Some("myapp.requests:-2|c".into()), server.next_metric().await);
    assert_eq!(Some("myapp.queue_depth:42|g".into()), server.next_metric().await);
    assert_eq!(Some("myapp.load:0.75|g".into()), server.next_metric().await);
    assert_eq!(Some("myapp.latency:123|ms".into()), server.next_metric().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn sampled_metric_carries_rate() {
    let (mut server, client) = create_client("").await;

    // Each attempt fires half the time.
    for _ in 0..64 {
        client.incr_with_sampling("x", 5, 0.5).expect("unable to send stat");
    }

    let metric = server.next_metric().await;
    assert_eq!(Some("x:5|c|@0.500000".into()), metric);
}

#[tokio::test(flavor = "multi_thread")]
async fn negative_gauge_sends_reset_then_value() {
    let (mut server, client) = create_client("").await;

    client.gauge("x", -5).expect("unable to send stat");

    assert_eq!(Some("x:0|g".into()), server.next_metric().await);
    assert_eq!(Some("x:-5|g".into()), server.next_metric().await);
    server.assert_silent().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_input_sends_nothing() {
    let (mut server, client) = create_client("").await;

    for count in [0, -1, -100] {
        assert!(matches!(client.incr("x", count), Err(StatsdError::InvalidCount(_))));
        assert!(matches!(client.decr("x", count), Err(StatsdError::InvalidCount(_))));
    }
    for rate in [-0.1, 1.1] {
        assert!(matches!(
            client.timing_with_sampling("x", 1, rate),
            Err(StatsdError::InvalidSampleRate(_))
        ));
        assert!(matches!(
            client.fgauge_with_sampling("x", -1.0, rate),
            Err(StatsdError::InvalidSampleRate(_))
        ));
    }

    server.assert_silent().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn closed_client_is_not_connected() {
    let (mut server, mut client) = create_client("").await;

    client.close();

    assert!(matches!(client.timing("x", 1), Err(StatsdError::NotConnected)));
    server.assert_silent().await;
}
