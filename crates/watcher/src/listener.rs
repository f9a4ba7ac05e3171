//! Instrumentation hook observing every outbound L1 call.

use crate::metrics::{L1RpcMetrics, MeteredFuture};
use std::{collections::HashMap, fmt::Debug, future::IntoFuture, time::Duration};

use auto_impl::auto_impl;
use parking_lot::Mutex;

/// An observer notified after each L1 RPC round trip completes, successfully or not.
///
/// The hook runs inline on the caller's path: implementations must return quickly and cannot
/// influence the outcome of the observed call.
#[auto_impl(&, Arc, Box)]
pub trait L1CallListener: Send + Sync + Debug {
    /// Called with the logical name of the completed call and its duration.
    fn on_l1_call(&self, call: &'static str, duration: Duration);
}

/// A [`L1CallListener`] which discards all observations.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl L1CallListener for NoopListener {
    fn on_l1_call(&self, _call: &'static str, _duration: Duration) {}
}

/// A [`L1CallListener`] forwarding observations to the installed `metrics` recorder, labelled by
/// the RPC method.
#[derive(Debug, Default)]
pub struct MetricsListener {
    methods: Mutex<HashMap<&'static str, L1RpcMetrics>>,
}

impl L1CallListener for MetricsListener {
    fn on_l1_call(&self, call: &'static str, duration: Duration) {
        let mut methods = self.methods.lock();
        let metrics = methods
            .entry(call)
            .or_insert_with(|| L1RpcMetrics::new_with_labels(&[("method", call)]));
        metrics.call_duration_seconds.record(duration.as_secs_f64());
        metrics.calls.increment(1);
    }
}

/// Awaits the request, reporting its duration to the listener under `call` once it completes.
pub(crate) async fn observe_call<F: IntoFuture>(
    listener: &dyn L1CallListener,
    call: &'static str,
    request: F,
) -> F::Output {
    tracing::trace!(target: "bridge::watcher", call, "dispatching L1 request");
    let (duration, output) = MeteredFuture::new(Box::pin(request.into_future())).await;
    listener.on_l1_call(call, duration);
    output
}
