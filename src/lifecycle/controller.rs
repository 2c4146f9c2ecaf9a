//! Lifecycle controller.
//!
//! # Responsibilities
//! - Own the listening socket from bind to close
//! - Run the accept loop on a background task
//! - Race an OS signal against a fatal listener error
//! - Drain in-flight requests within a bounded deadline
//!
//! # Design Decisions
//! - Every transition goes through one `watch` channel, so a transition is
//!   claimed atomically and observers never see a state skipped
//! - Only the caller that moves the server out of `Running` drives the
//!   drain; every other `stop` returns `Ok` at once
//! - The drain deadline bounds the wait, not the work: connections still
//!   open when it elapses are abandoned, never interrupted by this layer

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use axum::Router;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::error::{LifecycleError, ShutdownError, StartupError};
use crate::lifecycle::signals::{self, Signal};
use crate::lifecycle::state::LifecycleState;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{ConnectionSettings, Listener};

/// Why the server is shutting down.
#[derive(Debug, Clone)]
pub enum TerminationReason {
    /// SIGINT or SIGTERM arrived.
    Signal(Signal),
    /// The listener could not bind or its accept loop failed.
    StartupFailure(Arc<StartupError>),
}

/// State observed by both the controller and its accept task.
#[derive(Debug)]
struct Shared {
    state: watch::Sender<LifecycleState>,
    local_addr: OnceLock<SocketAddr>,
}

impl Shared {
    /// Move from `from` to `to`; false if the state was not `from`.
    fn transition(&self, from: LifecycleState, to: LifecycleState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == from && state.can_transition_to(to) {
                *state = to;
                true
            } else {
                false
            }
        })
    }
}

/// HTTP server with an explicit start / await / stop lifecycle.
pub struct Server {
    addr: String,
    app: Router,
    settings: ConnectionSettings,
    shared: Arc<Shared>,
    tracker: ConnectionTracker,
    stop_tx: watch::Sender<bool>,
    fatal_tx: Mutex<Option<oneshot::Sender<StartupError>>>,
    fatal_rx: tokio::sync::Mutex<oneshot::Receiver<StartupError>>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    termination: OnceLock<TerminationReason>,
}

impl Server {
    /// Create an idle server that will serve `app` on the configured address.
    pub fn new(config: &AppConfig, app: Router) -> Self {
        let (state, _) = watch::channel(LifecycleState::Idle);
        let (stop_tx, _) = watch::channel(false);
        let (fatal_tx, fatal_rx) = oneshot::channel();

        Self {
            addr: config.http_addr.clone(),
            app,
            settings: ConnectionSettings::from_config(config),
            shared: Arc::new(Shared {
                state,
                local_addr: OnceLock::new(),
            }),
            tracker: ConnectionTracker::new(),
            stop_tx,
            fatal_tx: Mutex::new(Some(fatal_tx)),
            fatal_rx: tokio::sync::Mutex::new(fatal_rx),
            accept_task: Mutex::new(None),
            termination: OnceLock::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.shared.state.borrow()
    }

    /// Number of connections currently open.
    pub fn open_connections(&self) -> usize {
        self.tracker.active_count()
    }

    /// Bind and accept on a background task; returns immediately.
    ///
    /// Bind and accept failures are not returned here. They surface through
    /// [`Server::await_termination`] as [`TerminationReason::StartupFailure`].
    pub fn start(&self) -> Result<(), LifecycleError> {
        let mut accept_task = self
            .accept_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let state = self.state();
        if accept_task.is_some() || state != LifecycleState::Idle {
            return Err(LifecycleError::AlreadyStarted { state });
        }

        let fatal_tx = self
            .fatal_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(fatal_tx) = fatal_tx else {
            return Err(LifecycleError::AlreadyStarted { state });
        };

        let task = AcceptTask {
            addr: self.addr.clone(),
            app: self.app.clone(),
            settings: self.settings,
            shared: Arc::clone(&self.shared),
            tracker: self.tracker.clone(),
            stop: self.stop_tx.subscribe(),
            fatal: fatal_tx,
        };
        *accept_task = Some(tokio::spawn(task.run()));
        Ok(())
    }

    /// Address actually bound, once the bind attempt has finished.
    ///
    /// `None` if the bind failed or the server was stopped before binding.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        let mut state = self.shared.state.subscribe();
        let _ = state
            .wait_for(|state| *state != LifecycleState::Idle)
            .await;
        self.shared.local_addr.get().copied()
    }

    /// Wait for SIGINT/SIGTERM or a fatal listener error, whichever comes first.
    pub async fn await_termination(&self) -> TerminationReason {
        self.await_termination_with(signals::wait_for_signal()).await
    }

    /// Like [`Server::await_termination`] with a custom signal source.
    ///
    /// The first call decides the reason; later calls return the same value.
    pub async fn await_termination_with<F>(&self, signal: F) -> TerminationReason
    where
        F: Future<Output = io::Result<Signal>>,
    {
        if let Some(reason) = self.termination.get() {
            return reason.clone();
        }

        let mut fatal_rx = self.fatal_rx.lock().await;
        if let Some(reason) = self.termination.get() {
            return reason.clone();
        }

        let signal = async {
            match signal.await {
                Ok(signal) => signal,
                Err(err) => {
                    tracing::error!(error = %err, "Failed to listen for termination signals");
                    std::future::pending().await
                }
            }
        };
        let fatal = async {
            match (&mut *fatal_rx).await {
                Ok(err) => err,
                // The accept task finished without error: only a signal can end the wait.
                Err(_) => std::future::pending().await,
            }
        };

        let reason = tokio::select! {
            signal = signal => {
                tracing::info!(signal = %signal, "Termination signal received");
                TerminationReason::Signal(signal)
            }
            err = fatal => {
                tracing::error!(error = %err, "server exited with error");
                TerminationReason::StartupFailure(Arc::new(err))
            }
        };

        let _ = self.termination.set(reason.clone());
        reason
    }

    /// Stop accepting, then wait up to `deadline` for open connections to finish.
    ///
    /// Idempotent: once a shutdown has begun, further calls return `Ok`
    /// immediately.
    pub async fn stop(&self, deadline: Duration) -> Result<(), ShutdownError> {
        let mut claimed = None;
        self.shared.state.send_if_modified(|state| match *state {
            LifecycleState::Running => {
                *state = LifecycleState::Stopping;
                claimed = Some(LifecycleState::Running);
                true
            }
            LifecycleState::Idle => {
                *state = LifecycleState::Stopped;
                claimed = Some(LifecycleState::Idle);
                true
            }
            LifecycleState::Stopping | LifecycleState::Stopped => false,
        });

        match claimed {
            Some(LifecycleState::Running) => {}
            Some(_) => {
                // Never bound; a bind still in flight sees `Stopped` and gives up.
                self.stop_tx.send_replace(true);
                return Ok(());
            }
            None => {
                tracing::debug!(state = %self.state(), "Shutdown already requested");
                return Ok(());
            }
        }

        tracing::info!(
            deadline_ms = deadline.as_millis() as u64,
            open_connections = self.tracker.active_count(),
            "server stopping"
        );
        self.stop_tx.send_replace(true);

        let accept_task = self
            .accept_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let outcome = match accept_task {
            None => Ok(()),
            Some(mut handle) => match tokio::time::timeout(deadline, &mut handle).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(err)) => Err(ShutdownError::Aborted(err.to_string())),
                Err(_) => {
                    handle.abort();
                    Err(ShutdownError::TimedOut {
                        deadline,
                        open_connections: self.tracker.active_count(),
                    })
                }
            },
        };

        self.shared
            .transition(LifecycleState::Stopping, LifecycleState::Stopped);
        if outcome.is_ok() {
            tracing::debug!("Drain complete");
        }
        outcome
    }
}

/// Everything the background accept task owns.
struct AcceptTask {
    addr: String,
    app: Router,
    settings: ConnectionSettings,
    shared: Arc<Shared>,
    tracker: ConnectionTracker,
    stop: watch::Receiver<bool>,
    fatal: oneshot::Sender<StartupError>,
}

impl AcceptTask {
    async fn run(self) {
        tracing::info!(addr = %self.addr, "server starting");

        let listener = match Listener::bind(&self.addr).await {
            Ok(listener) => listener,
            Err(err) => {
                self.shared
                    .transition(LifecycleState::Idle, LifecycleState::Stopped);
                let _ = self.fatal.send(err);
                return;
            }
        };

        let local_addr = listener.local_addr();
        let _ = self.shared.local_addr.set(local_addr);
        if !self
            .shared
            .transition(LifecycleState::Idle, LifecycleState::Running)
        {
            tracing::debug!(address = %local_addr, "Stopped before bind completed, closing listener");
            return;
        }

        tracing::info!(address = %local_addr, "server listening");
        listener
            .serve(self.app, self.settings, self.tracker, self.stop, self.fatal)
            .await;
    }
}
