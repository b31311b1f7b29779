use crate::error::IpcError;
use crate::ipc::message::{IpcMessage, MessageKind};
use crate::violation::{AvnId, Rupees};
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::time::{Duration, Instant};

#[derive(Clone, Copy)]
enum Peer {
    Billing,
    Payments,
}

/// Airline-facing query client. Lives on the front-end thread; every call
/// waits at most its timeout for a reply and gives up without retrying.
pub struct AirlinePortal {
    billing: SyncSender<Bytes>,
    payments: SyncSender<Bytes>,
    replies: Receiver<Bytes>,
    notifications: VecDeque<IpcMessage>,
    backlog: usize,
    reply_timeout: Duration,
    payment_timeout: Duration,
}

impl AirlinePortal {
    pub fn new(
        billing: SyncSender<Bytes>,
        payments: SyncSender<Bytes>,
        replies: Receiver<Bytes>,
        backlog: usize,
        reply_timeout: Duration,
        payment_delay: Duration,
    ) -> Self {
        AirlinePortal {
            billing,
            payments,
            replies,
            notifications: VecDeque::with_capacity(backlog),
            backlog,
            reply_timeout,
            payment_timeout: payment_delay + reply_timeout,
        }
    }

    /// Billing's view of one AVN, `None` if billing does not know it or did
    /// not answer in time.
    pub fn query_violation(&mut self, id: AvnId) -> Result<Option<IpcMessage>, IpcError> {
        self.request(Peer::Billing, IpcMessage::query_violation(id))?;
        self.wait_for(self.reply_timeout, |m| {
            m.kind == MessageKind::QueryViolation && m.violation_id == id
        })
    }

    pub fn query_airline(&mut self, airline: &str) -> Result<Option<IpcMessage>, IpcError> {
        self.request(Peer::Billing, IpcMessage::query_airline(airline))?;
        self.wait_for(self.reply_timeout, |m| {
            m.kind == MessageKind::QueryAirline && m.airline == airline
        })
    }

    pub fn request_payment(&mut self, id: AvnId, airline: &str, amount: Rupees) -> Result<(), IpcError> {
        tracing::info!(avn = id, airline, amount, "payment requested");
        self.request(Peer::Payments, IpcMessage::payment_request(id, airline, amount))
    }

    /// Waits out the processing delay plus the reply timeout.
    pub fn await_confirmation(&mut self, id: AvnId) -> Result<Option<IpcMessage>, IpcError> {
        self.wait_for(self.payment_timeout, |m| {
            m.kind == MessageKind::PaymentConfirmation && m.violation_id == id
        })
    }

    /// Buffered notifications plus everything already waiting on the channel.
    pub fn take_notifications(&mut self) -> Vec<IpcMessage> {
        self.drain();
        self.notifications.drain(..).collect()
    }

    fn request(&mut self, peer: Peer, message: IpcMessage) -> Result<(), IpcError> {
        // Billing never blocks on us, so the reply channel must have room.
        self.drain();
        let (to, name) = match peer {
            Peer::Billing => (&self.billing, "billing service"),
            Peer::Payments => (&self.payments, "payment service"),
        };
        to.send(message.encode()).map_err(|_| IpcError::Disconnected(name))
    }

    fn drain(&mut self) {
        loop {
            match self.replies.try_recv() {
                Ok(frame) => match IpcMessage::decode(&frame) {
                    Ok(message) => self.keep(message),
                    Err(err) => tracing::warn!(%err, "portal dropped a malformed frame"),
                },
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn keep(&mut self, message: IpcMessage) {
        if self.notifications.len() == self.backlog {
            self.notifications.pop_front();
        }
        self.notifications.push_back(message);
    }

    fn wait_for(
        &mut self,
        timeout: Duration,
        matches: impl Fn(&IpcMessage) -> bool,
    ) -> Result<Option<IpcMessage>, IpcError> {
        if let Some(pos) = self.notifications.iter().position(&matches) {
            return Ok(self.notifications.remove(pos));
        }

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.replies.recv_timeout(remaining) {
                Ok(frame) => match IpcMessage::decode(&frame) {
                    Ok(message) if matches(&message) => return Ok(Some(message)),
                    Ok(message) => self.keep(message),
                    Err(err) => tracing::warn!(%err, "portal dropped a malformed frame"),
                },
                Err(RecvTimeoutError::Timeout) => {
                    tracing::debug!(?timeout, "no reply from billing");
                    return Ok(None);
                }
                Err(RecvTimeoutError::Disconnected) => return Err(IpcError::Disconnected("billing service")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    struct Peers {
        billing: Receiver<Bytes>,
        payments: Receiver<Bytes>,
        replies: SyncSender<Bytes>,
    }

    fn portal() -> (AirlinePortal, Peers) {
        let (billing_tx, billing) = mpsc::sync_channel(8);
        let (payments_tx, payments) = mpsc::sync_channel(8);
        let (replies, replies_rx) = mpsc::sync_channel(8);
        let portal = AirlinePortal::new(
            billing_tx,
            payments_tx,
            replies_rx,
            2,
            Duration::from_millis(50),
            Duration::from_millis(10),
        );
        (portal, Peers { billing, payments, replies })
    }

    fn reply(peers: &Peers, message: IpcMessage) {
        peers.replies.send(message.encode()).unwrap();
    }

    #[test]
    fn test_query_skips_unrelated_messages() {
        let (mut portal, peers) = portal();
        let mut answer = IpcMessage::query_violation(1000);
        answer.details = "UNPAID".to_string();
        reply(&peers, IpcMessage::new(MessageKind::ViolationCreated));
        reply(&peers, answer.clone());

        assert_eq!(Some(answer), portal.query_violation(1000).unwrap());

        let request = IpcMessage::decode(&peers.billing.recv().unwrap()).unwrap();
        assert_eq!(MessageKind::QueryViolation, request.kind);

        let buffered = portal.take_notifications();
        assert_eq!(1, buffered.len());
        assert_eq!(MessageKind::ViolationCreated, buffered[0].kind);
    }

    #[test]
    fn test_query_times_out() {
        let (mut portal, _peers) = portal();
        assert_eq!(None, portal.query_airline("PIA").unwrap());
    }

    #[test]
    fn test_disconnected_billing() {
        let (mut portal, peers) = portal();
        drop(peers);
        assert!(matches!(portal.query_violation(1), Err(IpcError::Disconnected(_))));
    }

    #[test]
    fn test_payment_round_trip() {
        let (mut portal, peers) = portal();
        portal.request_payment(1000, "PIA", 575_000).unwrap();
        let request = IpcMessage::decode(&peers.payments.recv().unwrap()).unwrap();
        assert_eq!(MessageKind::PaymentRequest, request.kind);
        assert_eq!(575_000, request.rupees());

        reply(&peers, IpcMessage::payment_confirmation(1000, "PIA", 575_000.0));
        let confirmation = portal.await_confirmation(1000).unwrap().unwrap();
        assert_eq!(1000, confirmation.violation_id);
    }

    #[test]
    fn test_backlog_keeps_newest() {
        let (mut portal, peers) = portal();
        for id in 1..=3 {
            reply(&peers, IpcMessage::query_violation(id));
        }
        let kept: Vec<AvnId> = portal.take_notifications().iter().map(|m| m.violation_id).collect();
        assert_eq!(vec![2, 3], kept);
    }
}
