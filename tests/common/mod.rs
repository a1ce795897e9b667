//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use rpc_mux::config::ServerConfig;
use rpc_mux::net::Listener;
use rpc_mux::{HttpServer, Mux, RemoteClient, RemoteFunctionTable, RemoteFunctions, Shutdown};

pub const MOUNT_PATH: &str = "/api/remote";

/// A server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Shutdown,
    handle: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn client(&self) -> RemoteClient {
        RemoteClient::new(self.url(MOUNT_PATH))
    }

    /// Trigger shutdown and wait for the accept loop to drain.
    pub async fn stop(self) -> std::io::Result<()> {
        self.shutdown.trigger();
        self.handle.await.expect("server task panicked")
    }
}

/// Start a server for `mux` with default settings.
pub async fn spawn_server(mux: Mux) -> TestServer {
    spawn_server_with(ServerConfig::default(), mux).await
}

pub async fn spawn_server_with(mut config: ServerConfig, mux: Mux) -> TestServer {
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();
    config.timeouts.shutdown_grace_secs = 2;

    let listener = Listener::from_tcp(tcp, config.listener.max_connections);
    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    let handle = tokio::spawn(HttpServer::new(config, mux).run(listener, shutdown_rx));

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

/// A mux serving `table` at `MOUNT_PATH`.
pub fn rpc_mux(table: RemoteFunctionTable) -> Mux {
    Mux::new().handle(MOUNT_PATH, RemoteFunctions::new(table))
}
