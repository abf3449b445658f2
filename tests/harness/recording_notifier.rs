use std::sync::{Arc, Mutex};

use killzone::domain::Position;
use killzone::service::{CycleSummary, Event, Notifier};

/// Thread-safe event collector for notification assertions in tests.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().expect("lock notifier events").len()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("lock notifier events").clone()
    }

    pub fn opened(&self) -> Vec<Position> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::PositionOpened(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn closed(&self) -> Vec<Position> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::PositionClosed(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn cycles(&self) -> Vec<CycleSummary> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::CycleCompleted(s) => Some(s),
                _ => None,
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: Event) {
        self.events
            .lock()
            .expect("lock notifier events")
            .push(event);
    }
}
