//! Shared helpers for the relay integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use relaychat::prelude::*;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::task::JoinHandle;

pub const READ_TIMEOUT: Duration = Duration::from_secs(3);

/// A relay running on an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub registry: Arc<Registry>,
    task: JoinHandle<Result<(), RelayError>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(RelayServer::builder()).await
    }

    pub async fn start_with(builder: RelayServerBuilder) -> Self {
        let server = builder
            .bind("127.0.0.1:0".parse().unwrap())
            .build()
            .await
            .expect("server should bind");
        let addr = server.local_addr().unwrap();
        let registry = server.registry();
        let task = tokio::spawn(server.run());
        Self {
            addr,
            registry,
            task,
        }
    }

    /// Polls until the registry holds exactly `ids`.
    pub async fn wait_for_members(&self, ids: &[ClientId]) {
        let registry = Arc::clone(&self.registry);
        eventually(|| registry.identities() == ids, "registry membership").await;
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A raw line client, so tests see exactly what goes over the wire.
pub struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect to relay");
        let (reader, writer) = stream.into_split();
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    pub async fn send(&mut self, line: &str) {
        self.send_raw(format!("{line}\n").as_bytes()).await;
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.expect("write to relay");
    }

    /// Reads the next line, failing the test if none arrives in time.
    pub async fn recv(&mut self) -> String {
        tokio::time::timeout(READ_TIMEOUT, self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .expect("read from relay")
            .expect("relay closed the connection")
    }

    /// Waits for the relay to close this connection, skipping any lines.
    pub async fn expect_closed(&mut self) {
        let closed = tokio::time::timeout(READ_TIMEOUT, async {
            loop {
                match self.lines.next_line().await {
                    Ok(Some(_)) => continue,
                    Ok(None) | Err(_) => return,
                }
            }
        })
        .await;
        assert!(closed.is_ok(), "relay did not close the connection");
    }

    /// Asserts nothing arrives within a short window.
    pub async fn expect_silence(&mut self) {
        let result =
            tokio::time::timeout(Duration::from_millis(200), self.lines.next_line()).await;
        assert!(result.is_err(), "unexpected line: {result:?}");
    }
}

/// Polls `condition` until it holds, failing the test after [`READ_TIMEOUT`].
pub async fn eventually(mut condition: impl FnMut() -> bool, what: &str) {
    let polled = tokio::time::timeout(READ_TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "timed out waiting for {what}");
}

/// Runs `fut` with the standard timeout.
pub async fn within<T>(fut: impl Future<Output = T>, what: &str) -> T {
    tokio::time::timeout(READ_TIMEOUT, fut)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
}
