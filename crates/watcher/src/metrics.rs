use core::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use std::time::Instant;

use metrics::{Counter, Histogram};
use metrics_derive::Metrics;

/// The metrics recorded for a single L1 RPC method by [`crate::MetricsListener`].
#[derive(Metrics)]
#[metrics(scope = "bridge_l1_rpc")]
pub(crate) struct L1RpcMetrics {
    /// A histogram of the call durations in seconds.
    pub(crate) call_duration_seconds: Histogram,
    /// A counter on the completed calls.
    pub(crate) calls: Counter,
}

/// A future yielding the output of the inner future along with the time elapsed between the
/// creation of the [`MeteredFuture`] and the completion of the inner future.
#[derive(Debug)]
pub(crate) struct MeteredFuture<F> {
    fut: F,
    started_at: Instant,
}

impl<F> MeteredFuture<F> {
    /// Returns a new [`MeteredFuture`], starting the clock.
    pub(crate) fn new(fut: F) -> Self {
        Self { fut, started_at: Instant::now() }
    }
}

impl<F: Future + Unpin> Future for MeteredFuture<F> {
    type Output = (Duration, F::Output);

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.fut).poll(cx) {
            Poll::Ready(output) => Poll::Ready((this.started_at.elapsed(), output)),
            Poll::Pending => Poll::Pending,
        }
    }
}
