//! HTTP server and graceful shutdown.
//!
//! On SIGTERM or Ctrl-C the server:
//! 1. Stops calling `listener.accept()`; no new connections are made.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns from [`Server::serve`], which lets `main` exit cleanly.
//!
//! In-flight requests are still bounded by the configured request timeout,
//! so draining never outlasts the slowest allowed response.

use std::convert::Infallible;
use std::net::{SocketAddr, ToSocketAddrs};

use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Config;
use crate::error::Error;
use crate::lifecycle::App;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `ip:port` string. Use
    /// [`from_config`](Server::from_config) for host names.
    ///
    /// ```rust,no_run
    /// use sluice::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: &str) -> Self {
        match addr.parse() {
            Ok(addr) => Self { addr },
            Err(_) => panic!("invalid socket address `{addr}`"),
        }
    }

    /// Resolves `config.host:config.port`, taking the first address.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let address = config.address();
        let addr = address
            .to_socket_addrs()
            .map_err(|_| Error::Address(address.clone()))?
            .next()
            .ok_or(Error::Address(address))?;
        Ok(Self { addr })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Starts accepting connections and running each request through `app`.
    ///
    /// Returns only after a full graceful shutdown.
    pub async fn serve(self, app: App) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, name = %app.config().name, routes = app.router().len(), "listening");

        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Shutdown is checked first so a signal stops accepting at once,
                // even with connections queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let app = app.clone();
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let app = app.clone();
                            async move { Ok::<_, Infallible>(app.handle(req, Some(remote_addr)).await) }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the set stays bounded.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("stopped");
        Ok(())
    }
}

/// Resolves on the first SIGTERM or SIGINT. Only Ctrl-C exists on Windows.
///
/// If a handler cannot be installed that signal is logged and ignored.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_resolves_literal_addresses() {
        let config = Config::new().host("127.0.0.1").port(4321);
        assert_eq!(Server::from_config(&config).unwrap().addr(), "127.0.0.1:4321".parse().unwrap());
    }

    #[test]
    #[should_panic(expected = "invalid socket address")]
    fn bind_rejects_garbage() {
        Server::bind("not an address");
    }
}
