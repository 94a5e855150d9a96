use tracing::{info, warn};

use super::model::StackEvent;

/// Cursor over the event list CloudFormation returns newest-first. Tracks
/// the last event id already emitted; each poll yields only strictly newer
/// events, oldest-first. The first poll yields the full available history.
#[derive(Debug, Default)]
pub struct EventStream {
    last_seen: Option<String>,
}

impl EventStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// `events` must be newest-first, as returned by the provider.
    pub fn new_events(&mut self, events: &[StackEvent]) -> Vec<StackEvent> {
        let fresh: Vec<StackEvent> = events
            .iter()
            .take_while(|event| Some(&event.event_id) != self.last_seen.as_ref())
            .cloned()
            .collect();

        if let Some(newest) = events.first() {
            self.last_seen = Some(newest.event_id.clone());
        }

        fresh.into_iter().rev().collect()
    }
}

fn is_failed_status(resource_status: &str) -> bool {
    resource_status.ends_with("_FAILED")
}

/// Emits one log line per event, oldest-first.
pub fn log_events(events: &[StackEvent]) {
    for event in events {
        let timestamp = event.timestamp.format("%Y-%m-%d %H:%M:%S");
        let resource = format!("{} {}", event.resource_type, event.logical_resource_id);

        let status = match &event.resource_status_reason {
            Some(reason) => format!("{} ({})", event.resource_status, reason),
            None => event.resource_status.clone(),
        };

        if is_failed_status(&event.resource_status) {
            warn!("{} - {} {}", timestamp, resource, status);
        } else {
            info!("{} - {} {}", timestamp, resource, status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event(id: &str, status: &str) -> StackEvent {
        StackEvent {
            event_id: id.to_string(),
            timestamp: Utc.with_ymd_and_hms(2016, 4, 11, 9, 30, 0).unwrap(),
            resource_type: "AWS::CloudFormation::Stack".to_string(),
            logical_resource_id: "app".to_string(),
            resource_status: status.to_string(),
            resource_status_reason: None,
        }
    }

    #[test]
    fn first_poll_emits_full_history_oldest_first() {
        let mut stream = EventStream::new();

        // newest-first, as the provider returns them
        let history = vec![event("3", "CREATE_COMPLETE"), event("2", "CREATE_IN_PROGRESS"), event("1", "CREATE_IN_PROGRESS")];
        let fresh = stream.new_events(&history);

        let ids: Vec<&str> = fresh.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn only_new_events_are_emitted_on_later_polls() {
        let mut stream = EventStream::new();

        stream.new_events(&[event("2", "CREATE_IN_PROGRESS"), event("1", "CREATE_IN_PROGRESS")]);

        let fresh = stream.new_events(&[
            event("4", "CREATE_COMPLETE"),
            event("3", "CREATE_IN_PROGRESS"),
            event("2", "CREATE_IN_PROGRESS"),
            event("1", "CREATE_IN_PROGRESS"),
        ]);

        let ids: Vec<&str> = fresh.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, vec!["3", "4"]);
    }

    #[test]
    fn unchanged_list_emits_nothing() {
        let mut stream = EventStream::new();
        let history = vec![event("2", "CREATE_COMPLETE"), event("1", "CREATE_IN_PROGRESS")];

        stream.new_events(&history);
        assert!(stream.new_events(&history).is_empty());
        assert!(stream.new_events(&history).is_empty());
    }

    #[test]
    fn empty_list_is_harmless() {
        let mut stream = EventStream::new();
        assert!(stream.new_events(&[]).is_empty());

        // cursor still unset, so history arrives in full afterwards
        let fresh = stream.new_events(&[event("1", "CREATE_IN_PROGRESS")]);
        assert_eq!(fresh.len(), 1);
    }

    #[test]
    fn truncated_tail_does_not_reemit() {
        let mut stream = EventStream::new();

        stream.new_events(&[event("5", "a"), event("4", "b"), event("3", "c")]);

        // provider re-paginates and drops the old tail; only 6 is new
        let fresh = stream.new_events(&[event("6", "d"), event("5", "a")]);
        let ids: Vec<&str> = fresh.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, vec!["6"]);
    }

    #[test]
    fn failed_statuses_are_classified() {
        assert!(is_failed_status("CREATE_FAILED"));
        assert!(!is_failed_status("CREATE_COMPLETE"));
        assert!(!is_failed_status("UPDATE_IN_PROGRESS"));
    }
}
