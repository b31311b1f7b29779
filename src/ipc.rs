//! Billing boundary: bounded channels between the scheduler and the billing
//! and payment threads.

pub mod billing;
pub mod message;
pub mod payment;
pub mod portal;
pub mod router;

use crate::config::IpcConfig;
use crate::error::IpcError;
use crate::ipc::billing::BillingService;
use crate::ipc::payment::PaymentService;
use crate::ipc::portal::AirlinePortal;
use crate::ipc::router::ViolationRouter;
use crate::violation::Avn;
use bytes::Bytes;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Where the scheduler sends each AVN it issues.
pub trait ViolationSink {
    fn route(&mut self, avn: &Avn) -> Result<(), IpcError>;
}

pub struct Collaborators {
    pub router: ViolationRouter,
    pub portal: AirlinePortal,
    handles: Vec<JoinHandle<()>>,
}

impl Collaborators {
    /// Closing the router and portal ends closes the payment inbox, which in
    /// turn closes the billing inbox; both threads are then joined.
    pub fn shutdown(self) {
        let Collaborators {
            router,
            portal,
            handles,
        } = self;
        drop(router);
        drop(portal);
        join_all(handles);
    }
}

/// Builds every channel and starts the billing and payment threads.
pub fn spawn(config: &IpcConfig) -> Result<Collaborators, IpcError> {
    let capacity = config.channel_capacity;
    let (billing_tx, billing_rx) = mpsc::sync_channel::<Bytes>(capacity);
    let (payment_tx, payment_rx) = mpsc::sync_channel::<Bytes>(capacity);
    let (portal_tx, portal_rx) = mpsc::sync_channel::<Bytes>(capacity);
    let (status_tx, status_rx) = mpsc::sync_channel::<Bytes>(capacity);

    let billing = BillingService::new(billing_rx, portal_tx, status_tx);
    let billing_handle = spawn_named("billing-service", move || billing.run())?;

    let payment = PaymentService::new(
        payment_rx,
        billing_tx.clone(),
        Duration::from_millis(config.payment_delay_millis),
    );
    let payment_handle = match spawn_named("payment-service", move || payment.run()) {
        Ok(handle) => handle,
        Err(err) => {
            drop(billing_tx);
            join_all(vec![billing_handle]);
            return Err(err);
        }
    };

    let portal = AirlinePortal::new(
        billing_tx.clone(),
        payment_tx,
        portal_rx,
        capacity,
        Duration::from_millis(config.reply_timeout_millis),
        Duration::from_millis(config.payment_delay_millis),
    );
    let router = ViolationRouter::new(billing_tx, status_rx);

    Ok(Collaborators {
        router,
        portal,
        handles: vec![billing_handle, payment_handle],
    })
}

fn spawn_named<F>(name: &'static str, f: F) -> Result<JoinHandle<()>, IpcError>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .map_err(|source| IpcError::Spawn { name, source })
}

fn join_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        let name = handle.thread().name().unwrap_or("collaborator").to_string();
        if handle.join().is_err() {
            tracing::error!(thread = %name, "collaborator panicked");
        }
    }
}
