use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::timeout;

pub struct TestServer {
    addr: SocketAddr,
    messages: UnboundedReceiver<String>,
}

pub async fn create_server() -> TestServer {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let socket = UdpSocket::bind("127.0.0.1:0")
        .await
        .expect("unable to bind test server");
    let addr = socket.local_addr().expect("unable to read test server address");

    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut buf = [0; 512];
        loop {
            let (amt, _) = socket
                .recv_from(&mut buf)
                .await
                .expect("unable to read from socket");

            let message = String::from_utf8(buf[..amt].to_vec())
                .expect("unable to decode buffer to utf8 string");
            if tx.send(message).is_err() {
                break;
            }
        }
    });

    TestServer { addr, messages: rx }
}

impl TestServer {
    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Waits up to a second for the next datagram.
    pub async fn next_metric(&mut self) -> Option<String> {
        timeout(Duration::from_secs(1), self.messages.recv())
            .await
            .ok()
            .flatten()
    }

    pub async fn assert_silent(&mut self) {
        if let Ok(Some(message)) = timeout(Duration::from_millis(200), self.messages.recv()).await {
            panic!("expected no datagram, received {:?}", message);
        }
    }
}
