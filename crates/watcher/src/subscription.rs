//! The handle and delivery task of a `LogStateUpdate` subscription.

use crate::{
    constants::{calls, UNSUBSCRIBE_GRACE_PERIOD},
    listener::observe_call,
    L1CallListener, StateAnchorEvent, SubscriptionError,
};
use std::{sync::Arc, time::Duration};

use alloy_primitives::U256;
use alloy_provider::Provider;
use alloy_rpc_types_eth::Log;
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tokio_util::sync::CancellationToken;

/// The lifecycle of a [`L1Subscription`].
///
/// `Idle -> Active -> { Cancelled | Errored }`. Both terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionState {
    /// The filter is being installed. Handles are only returned once it is, so they never report
    /// this state.
    Idle,
    /// Events are being delivered.
    Active,
    /// The subscription was cancelled or its sink was dropped.
    Cancelled,
    /// The subscription failed. The error is available on [`L1Subscription::err`].
    Errored,
}

impl SubscriptionState {
    /// Returns true if no further events will be delivered.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Errored)
    }
}

/// A live `LogStateUpdate` subscription.
///
/// Dropping the handle cancels the subscription without waiting for the delivery task.
#[derive(Debug)]
pub struct L1Subscription {
    filter_id: U256,
    cancel: CancellationToken,
    state: watch::Receiver<SubscriptionState>,
    err: Option<oneshot::Receiver<SubscriptionError>>,
    task: Option<JoinHandle<()>>,
}

impl L1Subscription {
    /// Spawns the delivery task for the installed filter and returns its handle.
    pub(crate) fn spawn<P>(
        provider: P,
        filter_id: U256,
        sink: mpsc::Sender<StateAnchorEvent>,
        listener: Arc<dyn L1CallListener>,
        poll_interval: Duration,
        cancel: CancellationToken,
        shutdown: CancellationToken,
    ) -> Self
    where
        P: Provider + 'static,
    {
        let (state_tx, state) = watch::channel(SubscriptionState::Active);
        let (err_tx, err) = oneshot::channel();

        let task = DeliveryTask {
            provider,
            filter_id,
            sink,
            listener,
            poll_interval,
            cancel: cancel.clone(),
            shutdown,
            state: state_tx,
            err: Some(err_tx),
        };

        Self { filter_id, cancel, state, err: Some(err), task: Some(tokio::spawn(task.run())) }
    }

    /// Returns the id of the filter installed on the endpoint.
    pub const fn filter_id(&self) -> U256 {
        self.filter_id
    }

    /// Returns the current state of the subscription.
    pub fn state(&self) -> SubscriptionState {
        *self.state.borrow()
    }

    /// Returns a receiver notified on each state transition.
    pub fn state_changes(&self) -> watch::Receiver<SubscriptionState> {
        self.state.clone()
    }

    /// Returns true if the subscription reached a terminal state.
    pub fn is_terminated(&self) -> bool {
        self.state().is_terminal()
    }

    /// Waits for the terminal error of the subscription.
    ///
    /// Returns `None` if the subscription ended without error, or if the error was already taken.
    pub async fn err(&mut self) -> Option<SubscriptionError> {
        self.err.take()?.await.ok()
    }

    /// Requests the subscription to stop, without waiting for it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancels the subscription and waits for the delivery task to release the sink. The task is
    /// aborted if it does not exit within [`UNSUBSCRIBE_GRACE_PERIOD`].
    pub async fn unsubscribe(mut self) {
        self.cancel.cancel();
        let Some(mut task) = self.task.take() else { return };

        if tokio::time::timeout(UNSUBSCRIBE_GRACE_PERIOD, &mut task).await.is_err() {
            tracing::warn!(
                target: "bridge::watcher",
                filter_id = %self.filter_id,
                "subscription did not stop within the grace period, aborting"
            );
            task.abort();
        }
    }
}

impl Drop for L1Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// The reason delivery stopped.
#[derive(Debug)]
enum Exit {
    Cancelled,
    Failed(SubscriptionError),
}

/// Polls the installed filter and forwards the decoded events to the sink.
struct DeliveryTask<P> {
    provider: P,
    filter_id: U256,
    sink: mpsc::Sender<StateAnchorEvent>,
    listener: Arc<dyn L1CallListener>,
    poll_interval: Duration,
    cancel: CancellationToken,
    shutdown: CancellationToken,
    state: watch::Sender<SubscriptionState>,
    err: Option<oneshot::Sender<SubscriptionError>>,
}

impl<P: Provider> DeliveryTask<P> {
    async fn run(mut self) {
        tracing::debug!(target: "bridge::watcher", filter_id = %self.filter_id, "subscription active");

        match self.deliver().await {
            Exit::Cancelled => {
                self.uninstall().await;
                tracing::debug!(target: "bridge::watcher", filter_id = %self.filter_id, "subscription cancelled");
                self.state.send_replace(SubscriptionState::Cancelled);
            }
            Exit::Failed(err) => {
                if matches!(err, SubscriptionError::ConnectionClosed) {
                    self.uninstall().await;
                }
                tracing::warn!(target: "bridge::watcher", filter_id = %self.filter_id, %err, "subscription failed");
                if let Some(tx) = self.err.take() {
                    let _ = tx.send(err);
                }
                self.state.send_replace(SubscriptionState::Errored);
            }
        }
    }

    async fn deliver(&self) -> Exit {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Exit::Cancelled,
                _ = self.shutdown.cancelled() => return Exit::Failed(SubscriptionError::ConnectionClosed),
                _ = interval.tick() => {}
            }

            let changes = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Exit::Cancelled,
                _ = self.shutdown.cancelled() => return Exit::Failed(SubscriptionError::ConnectionClosed),
                res = observe_call(
                    &*self.listener,
                    calls::GET_FILTER_CHANGES,
                    self.provider.get_filter_changes::<Log>(self.filter_id),
                ) => res,
            };
            let logs = match changes {
                Ok(logs) => logs,
                Err(err) => return Exit::Failed(err.into()),
            };

            for log in logs {
                if log.removed {
                    tracing::warn!(target: "bridge::watcher", ?log, "skipping removed log");
                    continue
                }
                let event = match StateAnchorEvent::try_from(&log) {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(target: "bridge::watcher", ?err, ?log, "skipping undecodable log");
                        continue
                    }
                };

                tracing::trace!(target: "bridge::watcher", %event, "delivering state anchor event");
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Exit::Cancelled,
                    _ = self.shutdown.cancelled() => return Exit::Failed(SubscriptionError::ConnectionClosed),
                    res = self.sink.send(event) => if res.is_err() {
                        tracing::debug!(target: "bridge::watcher", "event sink dropped");
                        return Exit::Cancelled
                    }
                }
            }
        }
    }

    async fn uninstall(&self) {
        uninstall_filter(&self.provider, &*self.listener, self.filter_id).await
    }
}

/// Makes a single attempt at removing the filter from the endpoint. Failures are only logged.
pub(crate) async fn uninstall_filter<P: Provider>(
    provider: &P,
    listener: &dyn L1CallListener,
    filter_id: U256,
) {
    let res =
        observe_call(listener, calls::UNINSTALL_FILTER, provider.uninstall_filter(filter_id)).await;
    if let Err(err) = res {
        tracing::debug!(target: "bridge::watcher", %filter_id, %err, "failed to uninstall filter");
    }
}
