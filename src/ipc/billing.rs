use crate::ipc::message::{IpcMessage, MessageKind, parse_type_tag};
use crate::violation::{AvnId, Rupees, SpeedBand, fine_for, service_fee};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::mpsc::{Receiver, SyncSender, TrySendError};

/// The billing service's own copy of an AVN.
#[derive(Clone, Debug, PartialEq)]
pub struct BillingRecord {
    pub id: AvnId,
    pub airline: String,
    pub flight_number: String,
    pub recorded_speed: i32,
    pub band: SpeedBand,
    pub total: Rupees,
    pub paid: bool,
}

impl BillingRecord {
    fn status(&self) -> &'static str {
        if self.paid { "PAID" } else { "UNPAID" }
    }
}

/// Consumes violations, payment confirmations and portal queries from one
/// inbox. Stops once every sender into the inbox is gone.
pub struct BillingService {
    inbox: Receiver<Bytes>,
    portal: SyncSender<Bytes>,
    status: SyncSender<Bytes>,
    records: BTreeMap<AvnId, BillingRecord>,
}

impl BillingService {
    pub fn new(inbox: Receiver<Bytes>, portal: SyncSender<Bytes>, status: SyncSender<Bytes>) -> Self {
        BillingService {
            inbox,
            portal,
            status,
            records: BTreeMap::new(),
        }
    }

    pub fn run(mut self) {
        tracing::info!("billing service started");
        while let Ok(frame) = self.inbox.recv() {
            match IpcMessage::decode(&frame) {
                Ok(message) => self.handle(message),
                Err(err) => tracing::warn!(%err, "billing service dropped a malformed frame"),
            }
        }
        tracing::info!(records = self.records.len(), "billing service stopped");
    }

    fn handle(&mut self, message: IpcMessage) {
        match message.kind {
            MessageKind::ViolationCreated => self.create(message),
            MessageKind::PaymentConfirmation => self.confirm(message),
            MessageKind::QueryViolation => self.answer_violation(message.violation_id),
            MessageKind::QueryAirline => self.answer_airline(&message.airline),
            MessageKind::PaymentRequest => {
                tracing::warn!(avn = message.violation_id, "payment request sent to billing, ignoring")
            }
        }
    }

    fn create(&mut self, message: IpcMessage) {
        let Some(flight_type) = parse_type_tag(&message.details) else {
            tracing::warn!(avn = message.violation_id, tag = %message.details, "unknown flight type tag");
            return;
        };
        let fine = fine_for(flight_type);
        let record = BillingRecord {
            id: message.violation_id,
            airline: message.airline,
            flight_number: message.flight_number,
            recorded_speed: message.amount as i32,
            band: SpeedBand::new(message.min_speed, message.max_speed),
            total: fine + service_fee(fine),
            paid: false,
        };
        tracing::info!(
            avn = record.id,
            airline = %record.airline,
            flight = %record.flight_number,
            total = record.total,
            "billing record created"
        );

        let notice = IpcMessage {
            violation_id: record.id,
            airline: record.airline.clone(),
            flight_number: record.flight_number.clone(),
            amount: record.total as f64,
            min_speed: record.band.min,
            max_speed: record.band.max,
            details: record.status().to_string(),
            ..IpcMessage::new(MessageKind::ViolationCreated)
        };
        self.records.insert(record.id, record);
        self.notify_portal(notice);
    }

    fn confirm(&mut self, message: IpcMessage) {
        let Some(record) = self.records.get_mut(&message.violation_id) else {
            tracing::warn!(avn = message.violation_id, "payment confirmed for unknown AVN");
            return;
        };
        if message.rupees() < record.total {
            tracing::warn!(
                avn = record.id,
                required = record.total,
                offered = message.rupees(),
                "short payment rejected"
            );
            return;
        }
        record.paid = true;
        tracing::info!(avn = record.id, amount = message.amount, "payment confirmed");

        let confirmation = IpcMessage::payment_confirmation(record.id, &record.airline, message.amount);
        forward(&self.status, "scheduler", &confirmation);
        self.notify_portal(confirmation);
    }

    fn answer_violation(&self, id: AvnId) {
        if let Some(record) = self.records.get(&id) {
            let reply = IpcMessage {
                violation_id: record.id,
                airline: record.airline.clone(),
                flight_number: record.flight_number.clone(),
                amount: record.total as f64,
                min_speed: record.band.min,
                max_speed: record.band.max,
                details: record.status().to_string(),
                ..IpcMessage::new(MessageKind::QueryViolation)
            };
            self.notify_portal(reply);
        }
    }

    fn answer_airline(&self, airline: &str) {
        let mut summary = String::new();
        let mut count = 0;
        for record in self.records.values().filter(|r| r.airline == airline) {
            let _ = writeln!(summary, "#{} {} {}", record.id, record.total, record.status());
            count += 1;
        }
        tracing::debug!(airline, count, "airline query answered");

        let reply = IpcMessage {
            violation_id: count,
            airline: airline.to_string(),
            details: summary,
            ..IpcMessage::new(MessageKind::QueryAirline)
        };
        self.notify_portal(reply);
    }

    fn notify_portal(&self, message: IpcMessage) {
        forward(&self.portal, "portal", &message);
    }
}

/// Never blocks: a full peer loses the message.
fn forward(to: &SyncSender<Bytes>, peer: &'static str, message: &IpcMessage) {
    match to.try_send(message.encode()) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            tracing::warn!(peer, kind = ?message.kind, avn = message.violation_id, "peer backlog full, message dropped")
        }
        Err(TrySendError::Disconnected(_)) => {
            tracing::debug!(peer, kind = ?message.kind, "peer gone, message dropped")
        }
    }
}
