/// Events published by the test host and consumed by reporters.
use eyre::WrapErr;
use once_cell::sync::Lazy;
use std::{ops::Deref, sync::Mutex};
use tokio::sync::broadcast;

use crate::{
    notification::{Notification, Outcome},
    sink::Level,
};

pub static CHANNEL: Lazy<Mutex<Option<broadcast::Sender<Event>>>> =
    Lazy::new(|| Mutex::new(Some(broadcast::channel(1000).0)));

/// Publish an event to every subscribed reporter.
pub fn publish(event: impl Into<Event>) -> eyre::Result<()> {
    let Ok(guard) = CHANNEL.lock() else {
        eyre::bail!("failed to acquire event channel lock");
    };
    let Some(tx) = guard.deref() else {
        eyre::bail!("event channel has been already closed");
    };

    tx.send(event.into())
        .wrap_err("failed to publish event to the event channel")?;

    Ok(())
}

/// Subscribe to the channel to receive test failure events.
pub fn subscribe() -> eyre::Result<broadcast::Receiver<Event>> {
    let Ok(guard) = CHANNEL.lock() else {
        eyre::bail!("failed to acquire event channel lock");
    };
    let Some(tx) = guard.deref() else {
        eyre::bail!("event channel has been already closed");
    };

    Ok(tx.subscribe())
}

/// Close the channel. Subscribed reporters drain what was already published and stop.
pub fn close() -> eyre::Result<()> {
    let Ok(mut guard) = CHANNEL.lock() else {
        eyre::bail!("failed to acquire event channel lock");
    };
    guard.take();
    Ok(())
}

/// Lifecycle events a reporter can subscribe to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum EventKind {
    Failed,
    Error,
    Incomplete,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [EventKind::Failed, EventKind::Error, EventKind::Incomplete];

    /// Severity a failure of this kind is logged at.
    pub fn level(&self) -> Level {
        match self {
            EventKind::Failed | EventKind::Error => Level::Error,
            EventKind::Incomplete => Level::Warning,
        }
    }
}

impl From<Outcome> for EventKind {
    fn from(outcome: Outcome) -> EventKind {
        match outcome {
            Outcome::Failed => EventKind::Failed,
            Outcome::Error => EventKind::Error,
            Outcome::Incomplete => EventKind::Incomplete,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub notification: Notification,
}

impl From<Notification> for Event {
    fn from(notification: Notification) -> Event {
        Event {
            kind: notification.outcome().into(),
            notification,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::notification::TestFailure;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(EventKind::Failed, Level::Error; "failed")]
    #[test_case(EventKind::Error, Level::Error; "error")]
    #[test_case(EventKind::Incomplete, Level::Warning; "incomplete")]
    fn level(kind: EventKind, level: Level) {
        assert_eq!(kind.level(), level);
    }

    #[test]
    fn names() {
        let names: Vec<&'static str> = EventKind::ALL.iter().map(|k| (*k).into()).collect();
        assert_eq!(names, vec!["failed", "error", "incomplete"]);
    }

    #[test]
    fn event_from_notification() {
        let failure = TestFailure::new("a", "a", Outcome::Incomplete, "todo", "");
        let event = Event::from(Notification::Plain(failure));
        assert_eq!(event.kind, EventKind::Incomplete);
    }
}
