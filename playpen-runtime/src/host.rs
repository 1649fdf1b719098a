//! Host side of the message channel
//!
//! [`MessageTarget`] plays the role of the host window: the isolated context
//! posts to it, and at most one listener is subscribed to it at a time. The
//! isolated context never sees the target itself; it only receives a
//! [`HostPort`], which can post messages stamped with its run id and nothing
//! else.

use crate::abi::{RuntimeError, RuntimeResult};
use parking_lot::RwLock;
use playpen_types::{Envelope, RunId};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Host-side receiving end that sandboxes post to
#[derive(Debug, Clone, Default)]
pub struct MessageTarget {
    listener: Arc<RwLock<Option<UnboundedSender<Envelope>>>>,
}

impl MessageTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the single listener
    ///
    /// Fails while another [`Subscription`] is alive.
    pub fn subscribe(&self) -> RuntimeResult<Subscription> {
        let mut slot = self.listener.write();
        if slot.as_ref().is_some_and(|tx| !tx.is_closed()) {
            return Err(RuntimeError::ListenerAlreadyMounted);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *slot = Some(tx);
        debug!("message listener mounted");

        Ok(Subscription {
            rx,
            target: self.clone(),
        })
    }

    /// Whether a listener is currently mounted
    pub fn is_listening(&self) -> bool {
        self.listener
            .read()
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Deliver an envelope to the listener, if any
    ///
    /// Returns `false` when nobody is listening; the envelope is dropped.
    pub fn post(&self, envelope: Envelope) -> bool {
        match self.listener.read().as_ref() {
            Some(tx) => tx.send(envelope).is_ok(),
            None => false,
        }
    }

    /// Create the outbound capability handed to one run
    pub fn port(&self, origin: RunId, cancel: CancelToken) -> HostPort {
        HostPort {
            origin,
            target: self.clone(),
            cancel,
        }
    }
}

/// The mounted listener
///
/// Dropping it unmounts the listener; posts made afterwards are discarded.
#[derive(Debug)]
pub struct Subscription {
    rx: UnboundedReceiver<Envelope>,
    target: MessageTarget,
}

impl Subscription {
    /// Wait for the next envelope
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    /// Take the next envelope if one is already queued
    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.rx.close();
        let mut slot = self.target.listener.write();
        if slot.as_ref().is_some_and(|tx| tx.is_closed()) {
            *slot = None;
        }
        debug!("message listener unmounted");
    }
}

/// Cooperative cancellation for one run
///
/// The worker polls [`CancelToken::is_cancelled`] at its cancellation points;
/// async hosts can await [`CancelToken::cancelled`] instead.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(CancellationToken);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }

    /// Resolves once the run has been cancelled
    pub async fn cancelled(&self) {
        self.0.cancelled().await;
    }
}

/// Outbound capability granted to the isolated context
///
/// Everything the script can do to the host goes through [`HostPort::post_message`].
#[derive(Debug, Clone)]
pub struct HostPort {
    origin: RunId,
    target: MessageTarget,
    cancel: CancelToken,
}

impl HostPort {
    pub fn origin(&self) -> RunId {
        self.origin
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Post a structured message to the host
    pub fn post_message(&self, data: Value) -> bool {
        if self.cancel.is_cancelled() {
            debug!(origin = %self.origin, "dropping message from cancelled run");
            return false;
        }

        let delivered = self.target.post(Envelope::new(self.origin, data));
        if !delivered {
            trace!(origin = %self.origin, "no listener mounted, message discarded");
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_listener() {
        let target = MessageTarget::new();
        let _first = target.subscribe().unwrap();

        let second = target.subscribe();
        assert!(matches!(second, Err(RuntimeError::ListenerAlreadyMounted)));
    }

    #[test]
    fn test_remount_after_drop() {
        let target = MessageTarget::new();
        let first = target.subscribe().unwrap();
        drop(first);

        assert!(!target.is_listening());
        assert!(target.subscribe().is_ok());
    }

    #[test]
    fn test_port_stamps_origin() {
        let target = MessageTarget::new();
        let mut sub = target.subscribe().unwrap();
        let port = target.port(RunId::new(7), CancelToken::new());

        assert!(port.post_message(json!({ "type": "console", "data": ["1"] })));

        let envelope = sub.try_recv().unwrap();
        assert_eq!(envelope.origin, RunId::new(7));
        assert_eq!(envelope.data["data"][0], "1");
    }

    #[test]
    fn test_post_without_listener_is_dropped() {
        let target = MessageTarget::new();
        let port = target.port(RunId::new(1), CancelToken::new());
        assert!(!port.post_message(json!(null)));
    }

    #[test]
    fn test_cancelled_port_stops_posting() {
        let target = MessageTarget::new();
        let mut sub = target.subscribe().unwrap();
        let cancel = CancelToken::new();
        let port = target.port(RunId::new(1), cancel.clone());

        cancel.cancel();
        assert!(!port.post_message(json!({ "type": "console", "data": [] })));
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_cancel_is_shared_between_clones() {
        let cancel = CancelToken::new();
        let worker = cancel.clone();
        assert!(!worker.is_cancelled());

        let waiter = tokio::spawn(async move { worker.cancelled().await });
        cancel.cancel();

        waiter.await.unwrap();
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_fifo_order() {
        let target = MessageTarget::new();
        let mut sub = target.subscribe().unwrap();
        let port = target.port(RunId::new(1), CancelToken::new());

        for i in 0..5 {
            port.post_message(json!(i));
        }
        let received: Vec<_> = std::iter::from_fn(|| sub.try_recv()).map(|e| e.data).collect();
        assert_eq!(received, vec![json!(0), json!(1), json!(2), json!(3), json!(4)]);
    }
}
