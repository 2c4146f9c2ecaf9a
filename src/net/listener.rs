//! TCP listener and accept loop.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections until told to stop
//! - Serve each connection with hyper (HTTP/1.1 and HTTP/2)
//! - Drain open connections once accepting has stopped
//!
//! # Design Decisions
//! - Transient accept errors are logged and retried after a short pause
//! - Any other accept error is fatal: it is reported once, accepting stops,
//!   and existing connections are kept for the drain
//! - The listening socket is dropped before the drain starts, so new
//!   connections are refused while in-flight requests finish

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{extract::ConnectInfo, Router};
use hyper::{body::Incoming, Request};
use hyper_util::{
    rt::{TokioExecutor, TokioIo, TokioTimer},
    server::{conn::auto, graceful::GracefulShutdown},
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, watch};
use tower::Service;

use crate::config::AppConfig;
use crate::error::StartupError;
use crate::net::connection::{ConnectionTracker, IdleTimeout, InFlight};

/// Pause after a transient accept error.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Connection-level timeouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Time allowed to receive a complete request head.
    pub header_read_timeout: Option<Duration>,
    /// Time a connection may sit without any traffic.
    pub idle_timeout: Option<Duration>,
}

impl ConnectionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            header_read_timeout: config.read_timeout(),
            idle_timeout: config.idle_timeout(),
        }
    }

    fn builder(&self) -> auto::Builder<TokioExecutor> {
        let mut builder = auto::Builder::new(TokioExecutor::new());
        if let Some(timeout) = self.header_read_timeout {
            builder
                .http1()
                .timer(TokioTimer::new())
                .header_read_timeout(timeout);
        }
        builder
    }
}

/// A bound listener, not yet accepting.
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind to `addr` (`host:port`).
    pub async fn bind(addr: &str) -> Result<Self, StartupError> {
        let bind_error = |source| StartupError::Bind {
            addr: addr.to_string(),
            source,
        };

        let inner = TcpListener::bind(addr).await.map_err(bind_error)?;
        let local_addr = inner.local_addr().map_err(bind_error)?;

        tracing::debug!(address = %local_addr, "Listener bound");

        Ok(Self { inner, local_addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept and serve connections until `stop` flips to `true`, then drain.
    ///
    /// Returns once every connection accepted here has closed. A fatal accept
    /// error is sent on `fatal`; the loop then waits for `stop` before draining.
    pub async fn serve(
        self,
        app: Router,
        settings: ConnectionSettings,
        tracker: ConnectionTracker,
        mut stop: watch::Receiver<bool>,
        fatal: oneshot::Sender<StartupError>,
    ) {
        let Listener { inner, local_addr } = self;
        let builder = settings.builder();
        let graceful = GracefulShutdown::new();
        let mut fatal = Some(fatal);

        loop {
            tokio::select! {
                _ = stop_requested(&mut stop) => break,
                accepted = inner.accept() => match accepted {
                    Ok((stream, peer)) => {
                        serve_connection(&builder, &graceful, &tracker, &app, settings, stream, peer);
                    }
                    Err(err) if is_transient(&err) => {
                        tracing::warn!(error = %err, "Transient accept error");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                    Err(err) => {
                        tracing::error!(address = %local_addr, error = %err, "Accept loop failed");
                        if let Some(tx) = fatal.take() {
                            let _ = tx.send(StartupError::Accept(err));
                        }
                        stop_requested(&mut stop).await;
                        break;
                    }
                }
            }
        }

        drop(inner);
        tracing::debug!(
            open_connections = tracker.active_count(),
            "Stopped accepting, draining connections"
        );
        graceful.shutdown().await;
        tracing::debug!("All connections drained");
    }
}

fn serve_connection(
    builder: &auto::Builder<TokioExecutor>,
    graceful: &GracefulShutdown,
    tracker: &ConnectionTracker,
    app: &Router,
    settings: ConnectionSettings,
    stream: TcpStream,
    peer: SocketAddr,
) {
    let in_flight = InFlight::default();
    let io = TokioIo::new(IdleTimeout::new(stream, settings.idle_timeout, in_flight.clone()));

    let app = app.clone();
    let service = hyper::service::service_fn(move |mut req: Request<Incoming>| {
        req.extensions_mut().insert(ConnectInfo(peer));
        let request = in_flight.enter();
        let response = app.clone().call(req);
        async move {
            let response = response.await;
            drop(request);
            response
        }
    });

    let conn = graceful.watch(builder.serve_connection(io, service).into_owned());
    let guard = tracker.track();

    tokio::spawn(async move {
        if let Err(err) = conn.await {
            tracing::debug!(peer_addr = %peer, error = %err, "Connection closed with error");
        }
        drop(guard);
    });
}

async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    // A dropped sender also means nobody can keep us running.
    let _ = stop.wait_for(|stopped| *stopped).await;
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    ) || is_descriptor_exhaustion(err)
}

fn is_descriptor_exhaustion(err: &io::Error) -> bool {
    // EMFILE / ENFILE
    matches!(err.raw_os_error(), Some(23) | Some(24))
}
