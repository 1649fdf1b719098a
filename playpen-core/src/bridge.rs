//! Message bridge from the isolated context to the log.
//!
//! The bridge owns the single listener on a [`MessageTarget`]. Each received
//! envelope is decoded, checked against the [`OriginPolicy`] and, if it is a
//! diagnostic, appended to the [`LogStore`] one line per payload item.
//! Dropping the bridge unmounts the listener.

use crate::config::OriginPolicy;
use crate::log::LogStore;
use playpen_runtime::{MessageTarget, RuntimeResult, Subscription};
use playpen_types::{DiagnosticEvent, Envelope, InboundMessage, RunId};
use tracing::{debug, warn};

/// The mounted host-side listener
#[derive(Debug)]
pub struct MessageBridge {
    subscription: Subscription,
    policy: OriginPolicy,
    current: Option<RunId>,
}

impl MessageBridge {
    /// Mount the listener on `target`
    ///
    /// Fails if another listener is already mounted there.
    pub fn mount(target: &MessageTarget, policy: OriginPolicy) -> RuntimeResult<Self> {
        let subscription = target.subscribe()?;
        debug!(?policy, "message bridge mounted");
        Ok(Self {
            subscription,
            policy,
            current: None,
        })
    }

    pub fn policy(&self) -> OriginPolicy {
        self.policy
    }

    /// Record the most recent run; used by [`OriginPolicy::CurrentRun`]
    pub fn track_run(&mut self, run: RunId) {
        self.current = Some(run);
    }

    /// Deliver everything already received, without waiting
    ///
    /// Returns the number of diagnostic events appended.
    pub fn pump(&mut self, log: &mut LogStore) -> usize {
        let mut delivered = 0;
        while let Some(envelope) = self.subscription.try_recv() {
            if self.deliver(envelope, log) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Wait for the next accepted diagnostic event and append it
    ///
    /// Ignored messages are skipped. Returns the event, or `None` if the
    /// channel has closed.
    pub async fn recv(&mut self, log: &mut LogStore) -> Option<DiagnosticEvent> {
        loop {
            let envelope = self.subscription.recv().await?;
            if let Some(event) = self.accept(envelope) {
                log.append(event.payload.iter().cloned());
                return Some(event);
            }
        }
    }

    fn deliver(&self, envelope: Envelope, log: &mut LogStore) -> bool {
        match self.accept(envelope) {
            Some(event) => {
                log.append(event.payload);
                true
            }
            None => false,
        }
    }

    fn accept(&self, envelope: Envelope) -> Option<DiagnosticEvent> {
        if self.policy == OriginPolicy::CurrentRun && self.current != Some(envelope.origin) {
            warn!(origin = %envelope.origin, current = ?self.current, "dropping message from stale run");
            return None;
        }

        match InboundMessage::decode(&envelope.data) {
            InboundMessage::Unknown => {
                debug!(origin = %envelope.origin, data = %envelope.data, "ignoring unrecognized message");
                None
            }
            message => {
                let event = message.into_event()?;
                debug!(origin = %envelope.origin, kind = ?event.kind, items = event.payload.len(), "diagnostic received");
                Some(event)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playpen_runtime::{CancelToken, RuntimeError};
    use serde_json::json;

    fn post(target: &MessageTarget, origin: u64, data: serde_json::Value) {
        assert!(target.post(Envelope::new(RunId::new(origin), data)));
    }

    #[test]
    fn test_pump_appends_payload_items() {
        let target = MessageTarget::new();
        let mut bridge = MessageBridge::mount(&target, OriginPolicy::Any).unwrap();
        let mut log = LogStore::new();

        post(&target, 1, json!({ "type": "console", "data": ["\"a\"", "1"] }));
        post(&target, 1, json!({ "type": "console_error", "data": ["Error: boom"] }));

        assert_eq!(bridge.pump(&mut log), 2);
        assert_eq!(log.lines(), ["\"a\"", "1", "Error: boom"]);
    }

    #[test]
    fn test_unknown_kinds_are_ignored() {
        let target = MessageTarget::new();
        let mut bridge = MessageBridge::mount(&target, OriginPolicy::Any).unwrap();
        let mut log = LogStore::new();

        post(&target, 1, json!({ "type": "resize", "data": ["100"] }));
        post(&target, 1, json!("console"));
        post(&target, 1, json!({ "data": ["no type"] }));
        post(&target, 1, json!({ "type": "console", "data": ["kept"] }));

        assert_eq!(bridge.pump(&mut log), 1);
        assert_eq!(log.lines(), ["kept"]);
    }

    #[test]
    fn test_second_listener_is_refused() {
        let target = MessageTarget::new();
        let _bridge = MessageBridge::mount(&target, OriginPolicy::Any).unwrap();

        let err = MessageBridge::mount(&target, OriginPolicy::Any).unwrap_err();
        assert!(matches!(err, RuntimeError::ListenerAlreadyMounted));
    }

    #[test]
    fn test_remount_after_drop() {
        let target = MessageTarget::new();
        drop(MessageBridge::mount(&target, OriginPolicy::Any).unwrap());

        assert!(!target.is_listening());
        assert!(!target.post(Envelope::new(RunId::new(1), json!({}))));
        assert!(MessageBridge::mount(&target, OriginPolicy::Any).is_ok());
    }

    #[test]
    fn test_current_run_policy_drops_stale_origins() {
        let target = MessageTarget::new();
        let mut bridge = MessageBridge::mount(&target, OriginPolicy::CurrentRun).unwrap();
        let mut log = LogStore::new();
        bridge.track_run(RunId::new(2));

        post(&target, 1, json!({ "type": "console", "data": ["stale"] }));
        post(&target, 2, json!({ "type": "console", "data": ["fresh"] }));

        assert_eq!(bridge.pump(&mut log), 1);
        assert_eq!(log.lines(), ["fresh"]);
    }

    #[test]
    fn test_any_policy_keeps_stale_origins() {
        let target = MessageTarget::new();
        let mut bridge = MessageBridge::mount(&target, OriginPolicy::Any).unwrap();
        let mut log = LogStore::new();
        bridge.track_run(RunId::new(2));

        post(&target, 1, json!({ "type": "console", "data": ["stale"] }));
        bridge.pump(&mut log);

        assert_eq!(log.lines(), ["stale"]);
    }

    #[tokio::test]
    async fn test_recv_skips_ignored_messages() {
        let target = MessageTarget::new();
        let mut bridge = MessageBridge::mount(&target, OriginPolicy::Any).unwrap();
        let mut log = LogStore::new();

        let port = target.port(RunId::new(1), CancelToken::new());
        tokio::spawn(async move {
            port.post_message(json!({ "type": "other" }));
            port.post_message(json!({ "type": "console", "data": [1, null] }));
        });

        let event = bridge.recv(&mut log).await.unwrap();
        assert_eq!(event, DiagnosticEvent::log(vec!["1".into(), "null".into()]));
        assert_eq!(log.lines(), ["1", "null"]);
    }
}
