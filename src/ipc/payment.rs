use crate::ipc::message::{IpcMessage, MessageKind};
use bytes::Bytes;
use std::sync::mpsc::{Receiver, SyncSender};
use std::thread;
use std::time::Duration;

/// Simulated payment processor: confirms every request to billing after a
/// fixed processing delay.
pub struct PaymentService {
    inbox: Receiver<Bytes>,
    billing: SyncSender<Bytes>,
    delay: Duration,
}

impl PaymentService {
    pub fn new(inbox: Receiver<Bytes>, billing: SyncSender<Bytes>, delay: Duration) -> Self {
        PaymentService { inbox, billing, delay }
    }

    pub fn run(self) {
        tracing::info!("payment service started");
        while let Ok(frame) = self.inbox.recv() {
            let request = match IpcMessage::decode(&frame) {
                Ok(message) if message.kind == MessageKind::PaymentRequest => message,
                Ok(message) => {
                    tracing::warn!(kind = ?message.kind, "payment service ignored a message");
                    continue;
                }
                Err(err) => {
                    tracing::warn!(%err, "payment service dropped a malformed frame");
                    continue;
                }
            };

            tracing::info!(avn = request.violation_id, amount = request.amount, "processing payment");
            thread::sleep(self.delay);

            let confirmation =
                IpcMessage::payment_confirmation(request.violation_id, &request.airline, request.amount);
            if self.billing.send(confirmation.encode()).is_err() {
                tracing::debug!("billing service gone, payment service stopping");
                break;
            }
        }
        tracing::info!("payment service stopped");
    }
}
