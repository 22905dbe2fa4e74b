//! Refresh actor task
//!
//! Owns the refresh state. Every mutation happens on this task while handling
//! one message, so reading and setting `in_flight` can never be split by an
//! `.await` and a second refresh cannot slip in.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use super::commands::{RefreshCommand, RefreshOutcome};
use crate::transport::{ApiRequest, Transport};

/// Single-flight refresh state
///
/// `waiters` is empty whenever `in_flight` is false.
#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

/// Observable view of the refresh state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSnapshot {
    /// Whether a refresh call is running
    pub in_flight: bool,
    /// Requests parked until it settles
    pub waiters: usize,
    /// Refresh cycles finished so far (success or failure)
    pub completed_cycles: u64,
}

pub(super) struct RefreshActor<T> {
    transport: Arc<T>,
    refresh_path: String,
    state: RefreshState,
    completed_cycles: u64,
    snapshot_tx: watch::Sender<RefreshSnapshot>,
}

impl<T: Transport + 'static> RefreshActor<T> {
    pub(super) fn new(
        transport: Arc<T>,
        refresh_path: String,
        snapshot_tx: watch::Sender<RefreshSnapshot>,
    ) -> Self {
        Self {
            transport,
            refresh_path,
            state: RefreshState::default(),
            completed_cycles: 0,
            snapshot_tx,
        }
    }

    /// Spawn the actor loop; it stops when every command sender is dropped
    pub(super) fn spawn(self, command_rx: mpsc::UnboundedReceiver<RefreshCommand>) {
        tokio::spawn(self.run(command_rx));
    }

    async fn run(mut self, mut command_rx: mpsc::UnboundedReceiver<RefreshCommand>) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<RefreshOutcome>();

        loop {
            // Commands first: a 401 queued before the outcome joins this cycle
            tokio::select! {
                biased;

                command = command_rx.recv() => match command {
                    Some(RefreshCommand::AwaitRefresh { request_id, waiter }) => {
                        self.enqueue(&request_id, waiter, &done_tx);
                    }
                    None => break,
                },
                Some(outcome) = done_rx.recv() => self.release(outcome),
            }
        }

        if !self.state.waiters.is_empty() {
            log::debug!(
                "Refresh actor stopped with {} waiter(s) pending",
                self.state.waiters.len()
            );
        }
    }

    fn enqueue(
        &mut self,
        request_id: &str,
        waiter: oneshot::Sender<RefreshOutcome>,
        done_tx: &mpsc::UnboundedSender<RefreshOutcome>,
    ) {
        self.state.waiters.push_back(waiter);

        if self.state.in_flight {
            log::debug!(
                "Request {request_id} joined in-flight session refresh ({} waiting)",
                self.state.waiters.len()
            );
        } else {
            self.state.in_flight = true;
            log::info!("Session expired (request {request_id}); refreshing");
            self.start_refresh(done_tx.clone());
        }

        self.publish();
    }

    fn start_refresh(&self, done_tx: mpsc::UnboundedSender<RefreshOutcome>) {
        let transport = Arc::clone(&self.transport);
        let request = ApiRequest::post(self.refresh_path.clone());

        tokio::spawn(async move {
            let outcome = transport
                .execute(request)
                .await
                .map(|_| ())
                .map_err(Arc::new);
            let _ = done_tx.send(outcome);
        });
    }

    /// Settle the current cycle and resume waiters in FIFO order
    ///
    /// The state is reset before any waiter runs, so a 401 seen by a resumed
    /// request starts a fresh cycle instead of joining this one.
    fn release(&mut self, outcome: RefreshOutcome) {
        let waiters = std::mem::take(&mut self.state.waiters);
        self.state.in_flight = false;
        self.completed_cycles += 1;
        self.publish();

        match &outcome {
            Ok(()) => log::info!("Session refreshed; resuming {} request(s)", waiters.len()),
            Err(e) => log::warn!("Session refresh failed: {e}; failing {} request(s)", waiters.len()),
        }

        for waiter in waiters {
            // Receiver gone means the caller stopped waiting
            let _ = waiter.send(outcome.clone());
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(RefreshSnapshot {
            in_flight: self.state.in_flight,
            waiters: self.state.waiters.len(),
            completed_cycles: self.completed_cycles,
        });
    }
}
