//! Voice SDK events as relayed by the browser, and the hub that fans them out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::models::transcript::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptType {
    Partial,
    Final,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptMessage {
    pub role: Role,
    pub transcript_type: TranscriptType,
    pub transcript: String,
}

/// Payload of a `message` event. Only transcripts matter here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SdkMessage {
    Transcript(TranscriptMessage),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum VoiceEvent {
    CallStart,
    CallEnd,
    Message { message: SdkMessage },
    SpeechStart,
    SpeechEnd,
    Error {
        #[serde(default)]
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CallStart,
    CallEnd,
    Message,
    SpeechStart,
    SpeechEnd,
    Error,
}

impl VoiceEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            VoiceEvent::CallStart => EventKind::CallStart,
            VoiceEvent::CallEnd => EventKind::CallEnd,
            VoiceEvent::Message { .. } => EventKind::Message,
            VoiceEvent::SpeechStart => EventKind::SpeechStart,
            VoiceEvent::SpeechEnd => EventKind::SpeechEnd,
            VoiceEvent::Error { .. } => EventKind::Error,
        }
    }
}

pub type EventHandler = Arc<dyn Fn(&VoiceEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionHandle {
    kind: EventKind,
    id: u64,
}

/// Per-call fan-out of SDK events to subscribed handlers.
#[derive(Default)]
pub struct EventHub {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(SubscriptionHandle, EventHandler)>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, kind: EventKind, handler: EventHandler) -> SubscriptionHandle {
        let handle = SubscriptionHandle {
            kind,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };
        self.lock().push((handle, handler));
        handle
    }

    /// Returns false if the handle was already removed.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut handlers = self.lock();
        let before = handlers.len();
        handlers.retain(|(h, _)| *h != handle);
        handlers.len() != before
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    /// Handlers run outside the lock so they may subscribe or unsubscribe.
    pub fn emit(&self, event: &VoiceEvent) {
        let kind = event.kind();
        let targets: Vec<EventHandler> = self
            .lock()
            .iter()
            .filter(|(h, _)| h.kind == kind)
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in targets {
            handler(event);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionHandle, EventHandler)>> {
        self.handlers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_relayed_transcript_deserializes() {
        let event: VoiceEvent = serde_json::from_str(
            r#"{"type":"message","message":{"type":"transcript","role":"user","transcriptType":"final","transcript":"Hello"}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            VoiceEvent::Message {
                message: SdkMessage::Transcript(TranscriptMessage {
                    role: Role::User,
                    transcript_type: TranscriptType::Final,
                    transcript: "Hello".into(),
                })
            }
        );
    }

    #[test]
    fn test_non_transcript_message_is_other() {
        let event: VoiceEvent =
            serde_json::from_str(r#"{"type":"message","message":{"type":"function-call"}}"#).unwrap();
        assert_eq!(event, VoiceEvent::Message { message: SdkMessage::Other });
    }

    #[test]
    fn test_emit_reaches_only_matching_kind_until_unsubscribed() {
        let hub = EventHub::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let handle = hub.subscribe(
            EventKind::CallStart,
            Arc::new(move |_: &VoiceEvent| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        hub.emit(&VoiceEvent::CallStart);
        hub.emit(&VoiceEvent::SpeechStart);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(hub.unsubscribe(handle));
        assert!(!hub.unsubscribe(handle));
        hub.emit(&VoiceEvent::CallStart);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(hub.subscriber_count(), 0);
    }
}
