//! Capture agent - turns DOM events into interaction records

use std::sync::Arc;

use lat_core::{
    CaptureError, Clock, EventDetail, EventType, InteractionRecord, RuntimeMessage,
    RuntimeMessenger, SystemClock,
};
use tracing::{debug, trace, warn};

use crate::dom::{DomEvent, ElementSnapshot, Page};
use crate::sanitize;
use crate::throttle::ScrollGate;

/// What happened to a DOM event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handoff {
    /// A record was handed to the messenger
    Sent,
    /// Dropped by the scroll gate
    Throttled,
    /// Building or sending failed; the failure was logged
    Failed,
}

/// Page-local observer, one per page context
///
/// Handlers take `&mut self`: a page runs its listeners one at a time, so
/// the scroll gate needs no synchronization.
pub struct CaptureAgent<P: Page, M: RuntimeMessenger> {
    page: P,
    messenger: M,
    clock: Arc<dyn Clock>,
    scroll_gate: ScrollGate,
}

impl<P: Page, M: RuntimeMessenger> CaptureAgent<P, M> {
    pub fn new(page: P, messenger: M) -> Self {
        Self::with_clock(page, messenger, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(page: P, messenger: M, clock: Arc<dyn Clock>) -> Self {
        Self {
            page,
            messenger,
            clock,
            scroll_gate: ScrollGate::default(),
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    /// Handle one DOM event
    ///
    /// Never fails: errors are logged and the event is dropped.
    pub fn handle(&mut self, event: &DomEvent) -> Handoff {
        let target = event.target.as_ref();

        let (target, detail) = match event.kind {
            EventType::Click
            | EventType::Input
            | EventType::Submit
            | EventType::Focus
            | EventType::Blur => (target.cloned(), EventDetail::None),
            EventType::Change => (target.cloned(), change_detail(target)),
            EventType::Copy => (
                target.cloned(),
                EventDetail::Clipboard(lat_core::ClipboardOperation::Copy),
            ),
            EventType::Paste => (
                target.cloned(),
                EventDetail::Clipboard(lat_core::ClipboardOperation::Paste),
            ),
            EventType::Cut => (
                target.cloned(),
                EventDetail::Clipboard(lat_core::ClipboardOperation::Cut),
            ),
            EventType::Scroll => {
                if !self.scroll_gate.try_pass(self.clock.monotonic()) {
                    trace!("Scroll notification throttled");
                    return Handoff::Throttled;
                }
                (
                    self.page.scrolling_element(),
                    EventDetail::Scroll(self.page.scroll_metrics()),
                )
            }
            EventType::VisibilityChange => (
                None,
                EventDetail::Visibility(self.page.visibility_state()),
            ),
            EventType::BeforeUnload => (None, EventDetail::None),
        };

        let record = self.build_record(event.kind, target.as_ref(), detail);
        match self.send(&record) {
            Ok(()) => {
                debug!(event_type = %record.event_type, "Interaction handed off");
                Handoff::Sent
            }
            Err(e) => {
                warn!(event_type = %record.event_type, error = %e, "sendMessage failed");
                Handoff::Failed
            }
        }
    }

    /// Reduce an event target to a sanitized record
    pub fn build_record(
        &self,
        event_type: EventType,
        target: Option<&ElementSnapshot>,
        detail: EventDetail,
    ) -> InteractionRecord {
        InteractionRecord {
            timestamp: self.clock.now(),
            url: self.page.url(),
            title: self.page.title(),
            event_type,
            element_tag: target.and_then(|t| non_empty(Some(&t.tag_name))),
            element_type: target.and_then(|t| non_empty(t.input_type.as_ref())),
            element_id: target.and_then(|t| non_empty(t.id.as_ref())),
            element_name: target.and_then(|t| non_empty(t.name.as_ref())),
            element_label: self.label_for(target),
            value_preview: sanitize::value_preview(target),
            extra: detail.into_fields(),
        }
    }

    fn label_for(&self, target: Option<&ElementSnapshot>) -> Option<String> {
        let id = target.and_then(|t| t.id.as_deref()).filter(|id| !id.is_empty())?;
        match self.page.label_for(id) {
            Ok(text) => text.as_deref().and_then(sanitize::label_text),
            Err(e) => {
                debug!(error = %e, "Label lookup failed");
                None
            }
        }
    }

    fn send(&self, record: &InteractionRecord) -> Result<(), CaptureError> {
        let message = RuntimeMessage::browser_event(record)?;
        self.messenger.send_message(message)?;
        Ok(())
    }
}

fn non_empty(s: Option<&String>) -> Option<String> {
    s.filter(|s| !s.is_empty()).cloned()
}

fn change_detail(target: Option<&ElementSnapshot>) -> EventDetail {
    let change_kind = target.and_then(|t| {
        let kind = t.kind();
        if !kind.is_empty() {
            Some(kind)
        } else {
            Some(t.tag()).filter(|tag| !tag.is_empty())
        }
    });
    EventDetail::Change {
        change_kind,
        checked: target.and_then(|t| t.checked),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use lat_core::{ManualClock, PlatformError};
    use serde_json::Value;

    use super::*;
    use crate::dom::PageSnapshot;

    /// Messenger that keeps every message it is given
    #[derive(Default, Clone)]
    struct RecordingMessenger {
        sent: Arc<Mutex<Vec<RuntimeMessage>>>,
    }

    impl RecordingMessenger {
        fn records(&self) -> Vec<InteractionRecord> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|m| serde_json::from_value(m.payload.clone()).unwrap())
                .collect()
        }
    }

    impl RuntimeMessenger for RecordingMessenger {
        fn send_message(&self, message: RuntimeMessage) -> Result<(), PlatformError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }
    }

    /// Messenger for a page with no extension context
    struct DisconnectedMessenger;

    impl RuntimeMessenger for DisconnectedMessenger {
        fn send_message(&self, _message: RuntimeMessage) -> Result<(), PlatformError> {
            Err(PlatformError::NoReceiver)
        }
    }

    fn page() -> PageSnapshot {
        PageSnapshot::new("https://example.com/settings", "Settings")
            .with_label("submit-btn", "Save changes")
    }

    fn agent() -> (
        CaptureAgent<PageSnapshot, RecordingMessenger>,
        RecordingMessenger,
        Arc<ManualClock>,
    ) {
        let messenger = RecordingMessenger::default();
        let clock = Arc::new(ManualClock::default());
        let agent = CaptureAgent::with_clock(page(), messenger.clone(), clock.clone());
        (agent, messenger, clock)
    }

    #[test]
    fn test_click_on_labelled_button() {
        let (mut agent, messenger, _) = agent();
        let button = ElementSnapshot::new("BUTTON")
            .with_type("submit")
            .with_id("submit-btn")
            .with_text("Save");

        assert_eq!(
            agent.handle(&DomEvent::new(EventType::Click, button)),
            Handoff::Sent
        );

        let records = messenger.records();
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.event_type, EventType::Click);
        assert_eq!(rec.element_tag.as_deref(), Some("BUTTON"));
        assert_eq!(rec.element_id.as_deref(), Some("submit-btn"));
        assert_eq!(rec.element_label.as_deref(), Some("Save changes"));
        assert_eq!(rec.value_preview.as_deref(), Some("Save"));
        assert_eq!(rec.url, "https://example.com/settings");
        assert_eq!(rec.title, "Settings");
        assert!(rec.extra.is_empty());
    }

    #[test]
    fn test_message_is_tagged_browser_event() {
        let (mut agent, messenger, _) = agent();
        agent.handle(&DomEvent::new(EventType::Focus, ElementSnapshot::new("INPUT")));

        let sent = messenger.sent.lock().unwrap();
        assert!(sent[0].is_browser_event());
    }

    #[test]
    fn test_typing_email_into_text_input() {
        let (mut agent, messenger, _) = agent();
        let field = ElementSnapshot::new("INPUT")
            .with_type("text")
            .with_name("email");

        let mut typed = String::new();
        for c in "hello@example.com".chars() {
            typed.push(c);
            let snapshot = field.clone().with_value(&typed);
            agent.handle(&DomEvent::new(EventType::Input, snapshot));
        }

        let records = messenger.records();
        // No debouncing: one record per keystroke
        assert_eq!(records.len(), 17);
        let last = records.last().unwrap();
        assert_eq!(last.value_preview.as_deref(), Some("hello@example.com"));
        assert_eq!(last.element_name.as_deref(), Some("email"));
        assert!(last.element_label.is_none());
    }

    #[test]
    fn test_long_input_capped_at_30_chars() {
        let (mut agent, messenger, _) = agent();
        let value = "The quick brown fox jumps over the lazy dog";
        agent.handle(&DomEvent::new(
            EventType::Input,
            ElementSnapshot::new("INPUT").with_type("text").with_value(value),
        ));

        let preview = messenger.records()[0].value_preview.clone().unwrap();
        assert_eq!(preview, &value[..30]);
    }

    #[test]
    fn test_password_input_never_previewed() {
        let (mut agent, messenger, _) = agent();
        for _ in 0..25 {
            let secret = uuid::Uuid::new_v4().to_string();
            let field = ElementSnapshot::new("INPUT")
                .with_type("password")
                .with_id("pw")
                .with_value(&secret);
            for kind in [
                EventType::Input,
                EventType::Change,
                EventType::Focus,
                EventType::Blur,
                EventType::Paste,
            ] {
                agent.handle(&DomEvent::new(kind, field.clone()));
            }
        }

        let sent = messenger.sent.lock().unwrap();
        assert_eq!(sent.len(), 125);
        for message in sent.iter() {
            assert_eq!(message.payload["value_preview"], Value::Null);
        }
    }

    #[test]
    fn test_change_on_checkbox_records_kind_and_state() {
        let (mut agent, messenger, _) = agent();
        let checkbox = ElementSnapshot::new("INPUT")
            .with_type("checkbox")
            .with_id("newsletter")
            .with_checked(true);

        agent.handle(&DomEvent::new(EventType::Change, checkbox));

        let rec = &messenger.records()[0];
        assert_eq!(rec.extra_field("change_kind"), Some(&Value::from("checkbox")));
        assert_eq!(rec.extra_field("checked"), Some(&Value::from(true)));
    }

    #[test]
    fn test_change_on_select_falls_back_to_type_then_tag() {
        let (mut agent, messenger, _) = agent();
        agent.handle(&DomEvent::new(
            EventType::Change,
            ElementSnapshot::new("SELECT").with_type("select-one"),
        ));
        agent.handle(&DomEvent::new(EventType::Change, ElementSnapshot::new("DETAILS")));

        let records = messenger.records();
        assert_eq!(
            records[0].extra_field("change_kind"),
            Some(&Value::from("select-one"))
        );
        assert_eq!(records[0].extra_field("checked"), Some(&Value::Null));
        assert_eq!(
            records[1].extra_field("change_kind"),
            Some(&Value::from("details"))
        );
    }

    #[test]
    fn test_focus_and_blur_carry_no_extra() {
        let (mut agent, messenger, _) = agent();
        let el = ElementSnapshot::new("INPUT").with_type("search");
        agent.handle(&DomEvent::new(EventType::Focus, el.clone()));
        agent.handle(&DomEvent::new(EventType::Blur, el));

        for rec in messenger.records() {
            assert!(rec.extra.is_empty());
        }
    }

    #[test]
    fn test_clipboard_operation_recorded_without_content() {
        let (mut agent, messenger, _) = agent();
        let el = ElementSnapshot::new("TEXTAREA");
        agent.handle(&DomEvent::new(EventType::Copy, el.clone()));
        agent.handle(&DomEvent::new(EventType::Paste, el.clone()));
        agent.handle(&DomEvent::new(EventType::Cut, el));

        let ops: Vec<_> = messenger
            .records()
            .iter()
            .map(|r| r.extra_field("clipboard_operation").cloned().unwrap())
            .collect();
        assert_eq!(ops, vec!["copy", "paste", "cut"]);
    }

    #[test]
    fn test_scroll_throttled_to_one_per_second() {
        let (mut agent, messenger, clock) = agent();

        let mut outcomes = Vec::new();
        for _ in 0..20 {
            outcomes.push(agent.handle(&DomEvent::document(EventType::Scroll)));
            clock.advance(Duration::from_millis(40));
        }
        assert_eq!(
            outcomes.iter().filter(|o| **o == Handoff::Sent).count(),
            1
        );
        assert_eq!(outcomes[1], Handoff::Throttled);

        clock.advance(Duration::from_millis(1000));
        assert_eq!(
            agent.handle(&DomEvent::document(EventType::Scroll)),
            Handoff::Sent
        );
        assert_eq!(messenger.records().len(), 2);
    }

    #[test]
    fn test_scroll_record_carries_geometry() {
        let (mut agent, messenger, _) = agent();
        agent.page_mut().scroll = lat_core::ScrollMetrics {
            scroll_x: 0.0,
            scroll_y: 1200.0,
            viewport_width: 1440,
            viewport_height: 900,
            document_height: Some(5400),
        };

        agent.handle(&DomEvent::document(EventType::Scroll));

        let rec = &messenger.records()[0];
        assert_eq!(rec.element_tag.as_deref(), Some("HTML"));
        assert_eq!(rec.extra_field("scroll_y"), Some(&Value::from(1200.0)));
        assert_eq!(rec.extra_field("document_height"), Some(&Value::from(5400)));
    }

    #[test]
    fn test_visibility_change_targets_document() {
        let (mut agent, messenger, _) = agent();
        agent.page_mut().visibility = "hidden".to_string();

        agent.handle(&DomEvent::document(EventType::VisibilityChange));

        let rec = &messenger.records()[0];
        assert!(rec.element_tag.is_none());
        assert!(rec.element_id.is_none());
        assert!(rec.value_preview.is_none());
        assert_eq!(rec.extra_field("visibility"), Some(&Value::from("hidden")));
    }

    #[test]
    fn test_before_unload_has_no_element_fields() {
        let (mut agent, messenger, _) = agent();
        agent.handle(&DomEvent::document(EventType::BeforeUnload));

        let rec = &messenger.records()[0];
        assert_eq!(rec.event_type, EventType::BeforeUnload);
        assert!(rec.element_tag.is_none());
        assert!(rec.extra.is_empty());
    }

    #[test]
    fn test_empty_attributes_become_absent() {
        let (mut agent, messenger, _) = agent();
        agent.handle(&DomEvent::new(
            EventType::Click,
            ElementSnapshot::new("DIV").with_id("").with_name(""),
        ));

        let rec = &messenger.records()[0];
        assert!(rec.element_id.is_none());
        assert!(rec.element_name.is_none());
        assert!(rec.element_label.is_none());
    }

    #[test]
    fn test_label_lookup_failure_leaves_label_absent() {
        let (mut agent, messenger, _) = agent();
        agent.handle(&DomEvent::new(
            EventType::Click,
            ElementSnapshot::new("BUTTON").with_id("we\"ird").with_text("Go"),
        ));

        let rec = &messenger.records()[0];
        assert!(rec.element_label.is_none());
        assert_eq!(rec.value_preview.as_deref(), Some("Go"));
    }

    #[test]
    fn test_missing_messaging_channel_is_swallowed() {
        let mut agent = CaptureAgent::new(page(), DisconnectedMessenger);

        let first = agent.handle(&DomEvent::new(EventType::Click, ElementSnapshot::new("A")));
        let second = agent.handle(&DomEvent::new(EventType::Click, ElementSnapshot::new("A")));

        assert_eq!(first, Handoff::Failed);
        assert_eq!(second, Handoff::Failed);
    }

    #[test]
    fn test_record_timestamp_comes_from_clock() {
        let (agent, _, clock) = agent();
        let rec = agent.build_record(EventType::Submit, None, EventDetail::None);
        assert_eq!(rec.timestamp, clock.now());
    }
}
