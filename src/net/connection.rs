//! Per-connection bookkeeping.
//!
//! # Responsibilities
//! - Count open connections so a timed-out drain can report what it abandoned
//! - Count requests in flight on each connection
//! - Close connections that stay silent longer than the idle timeout
//!
//! # Design Decisions
//! - Counts are held by RAII guards, so a panicking task still releases its
//!   slot
//! - Idle time is measured on the socket itself: any byte read or written
//!   re-arms the timer
//! - A connection with a request in flight is never idle; the timer is held
//!   back until the last response has been produced

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::{Instant, Sleep};

/// Tracks open connections.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active_count: Arc<AtomicUsize>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection. The returned guard releases it on drop.
    pub fn track(&self) -> ActiveGuard {
        ActiveGuard::acquire(&self.active_count)
    }

    pub fn active_count(&self) -> usize {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Requests being handled on a single connection.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    requests: Arc<AtomicUsize>,
}

impl InFlight {
    /// Mark a request as started. The returned guard ends it on drop.
    pub fn enter(&self) -> ActiveGuard {
        ActiveGuard::acquire(&self.requests)
    }

    pub fn is_busy(&self) -> bool {
        self.requests.load(Ordering::SeqCst) > 0
    }
}

/// Keeps one unit counted for as long as it lives.
#[derive(Debug)]
pub struct ActiveGuard {
    count: Arc<AtomicUsize>,
}

impl ActiveGuard {
    fn acquire(count: &Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self {
            count: Arc::clone(count),
        }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Stream wrapper failing I/O with `TimedOut` after a period of inactivity.
///
/// While `in_flight` reports a request being handled the timer keeps being
/// pushed back. With no timeout configured it is a plain pass-through.
#[derive(Debug)]
pub struct IdleTimeout<S> {
    inner: S,
    idle: Option<(Duration, Pin<Box<Sleep>>)>,
    in_flight: InFlight,
}

impl<S> IdleTimeout<S> {
    pub fn new(inner: S, timeout: Option<Duration>, in_flight: InFlight) -> Self {
        let idle = timeout.map(|duration| (duration, Box::pin(tokio::time::sleep(duration))));
        Self {
            inner,
            idle,
            in_flight,
        }
    }

    fn touch(&mut self) {
        if let Some((duration, sleep)) = self.idle.as_mut() {
            sleep.as_mut().reset(Instant::now() + *duration);
        }
    }

    fn poll_expired(&mut self, cx: &mut Context<'_>) -> Poll<io::Error> {
        if self.in_flight.is_busy() {
            self.touch();
            return Poll::Pending;
        }
        match self.idle.as_mut() {
            Some((_, sleep)) => sleep
                .as_mut()
                .poll(cx)
                .map(|()| io::Error::new(io::ErrorKind::TimedOut, "connection idle timeout")),
            None => Poll::Pending,
        }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for IdleTimeout<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(result) => {
                if buf.filled().len() > before {
                    this.touch();
                }
                Poll::Ready(result)
            }
            Poll::Pending => this.poll_expired(cx).map(Err),
        }
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for IdleTimeout<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(result) => {
                if matches!(result, Ok(n) if n > 0) {
                    this.touch();
                }
                Poll::Ready(result)
            }
            Poll::Pending => this.poll_expired(cx).map(Err),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}
