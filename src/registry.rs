use crate::airline::{Airline, AirlineName};
use crate::error::RegistryError;
use crate::time::Tick;
use crate::violation::{Avn, AvnId, PaymentStatus, Rupees};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentOutcome {
    Settled,
    /// The AVN was already paid; nothing was charged.
    AlreadySettled,
}

/// Owns every AVN ever issued plus the airline table. Airlines only hold AVN ids.
pub struct Registry {
    airlines: BTreeMap<AirlineName, Airline>,
    avns: BTreeMap<AvnId, Avn>,
}

impl Registry {
    pub fn new(airlines: Vec<Airline>) -> Registry {
        Registry {
            airlines: airlines.into_iter().map(|a| (a.name.clone(), a)).collect(),
            avns: BTreeMap::new(),
        }
    }

    pub fn airlines(&self) -> impl Iterator<Item = &Airline> + Clone {
        self.airlines.values()
    }

    pub fn airline(&self, name: &str) -> Result<&Airline, RegistryError> {
        self.airlines
            .get(name)
            .ok_or_else(|| RegistryError::UnknownAirline(name.to_string()))
    }

    pub fn record(&mut self, avn: Avn) -> AvnId {
        let id = avn.id;
        match self.airlines.get_mut(&avn.airline) {
            Some(airline) => airline.violations.push(id),
            None => tracing::warn!(avn = id, airline = %avn.airline, "AVN issued for unlisted airline"),
        }
        self.avns.insert(id, avn);
        id
    }

    pub fn get(&self, id: AvnId) -> Result<&Avn, RegistryError> {
        self.avns.get(&id).ok_or(RegistryError::UnknownViolation(id))
    }

    pub fn all(&self) -> impl Iterator<Item = &Avn> {
        self.avns.values()
    }

    pub fn unpaid(&self) -> impl Iterator<Item = &Avn> {
        self.avns.values().filter(|a| !a.is_settled())
    }

    pub fn violations_for(&self, airline: &str) -> Result<Vec<&Avn>, RegistryError> {
        let airline = self.airline(airline)?;
        Ok(airline
            .violations
            .iter()
            .filter_map(|id| self.avns.get(id))
            .collect())
    }

    /// Validates a payment without applying it.
    pub fn check_payment(&self, id: AvnId, amount: Rupees) -> Result<PaymentOutcome, RegistryError> {
        let avn = self.get(id)?;
        if avn.is_settled() {
            return Ok(PaymentOutcome::AlreadySettled);
        }
        if amount < avn.total {
            return Err(RegistryError::InsufficientPayment {
                id,
                required: avn.total,
                offered: amount,
                shortfall: avn.total - amount,
            });
        }
        Ok(PaymentOutcome::Settled)
    }

    pub fn settle(&mut self, id: AvnId, amount: Rupees) -> Result<PaymentOutcome, RegistryError> {
        let outcome = self.check_payment(id, amount)?;
        if outcome == PaymentOutcome::Settled {
            if let Some(avn) = self.avns.get_mut(&id) {
                avn.status = PaymentStatus::Paid;
                tracing::info!(avn = id, amount, "AVN paid");
            }
        }
        Ok(outcome)
    }

    /// Flags unpaid AVNs whose due date has passed. Returns how many changed.
    pub fn mark_overdue(&mut self, now: Tick) -> usize {
        let mut changed = 0;
        for avn in self.avns.values_mut() {
            if avn.status == PaymentStatus::Unpaid && now > avn.due_at {
                avn.status = PaymentStatus::Overdue;
                changed += 1;
            }
        }
        changed
    }
}
