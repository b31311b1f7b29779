use crate::error::IpcError;
use crate::ipc::ViolationSink;
use crate::ipc::message::{IpcMessage, MessageKind};
use crate::registry::{PaymentOutcome, Registry};
use crate::violation::Avn;
use bytes::Bytes;
use std::sync::mpsc::{Receiver, SyncSender, TryRecvError};

/// Scheduler side of the billing boundary. Violations go out fire-and-forget;
/// payment confirmations come back on a separate status channel and are
/// matched to registry entries by id.
pub struct ViolationRouter {
    billing: SyncSender<Bytes>,
    status: Receiver<Bytes>,
}

impl ViolationRouter {
    pub fn new(billing: SyncSender<Bytes>, status: Receiver<Bytes>) -> Self {
        ViolationRouter { billing, status }
    }

    /// Applies every confirmation already waiting, without blocking.
    /// Returns the number of AVNs that changed to Paid.
    pub fn poll_status(&mut self, registry: &mut Registry) -> usize {
        let mut settled = 0;
        loop {
            let frame = match self.status.try_recv() {
                Ok(frame) => frame,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::debug!("billing status channel closed");
                    break;
                }
            };
            let message = match IpcMessage::decode(&frame) {
                Ok(message) if message.kind == MessageKind::PaymentConfirmation => message,
                Ok(message) => {
                    tracing::warn!(kind = ?message.kind, "unexpected status message");
                    continue;
                }
                Err(err) => {
                    tracing::warn!(%err, "dropping malformed status frame");
                    continue;
                }
            };

            match registry.settle(message.violation_id, message.rupees()) {
                Ok(PaymentOutcome::Settled) => settled += 1,
                Ok(PaymentOutcome::AlreadySettled) => {
                    tracing::debug!(avn = message.violation_id, "confirmation for an AVN already paid")
                }
                Err(err) => tracing::warn!(%err, "payment confirmation rejected"),
            }
        }
        settled
    }
}

impl ViolationSink for ViolationRouter {
    fn route(&mut self, avn: &Avn) -> Result<(), IpcError> {
        self.billing
            .send(IpcMessage::violation_created(avn).encode())
            .map_err(|_| IpcError::Disconnected("billing service"))?;
        tracing::info!(avn = avn.id, airline = %avn.airline, flight = %avn.flight_number, "AVN routed to billing");
        Ok(())
    }
}
