//! Push notifications to connected viewers.
//!
//! The transport itself lives outside this crate. [`WatchNotifier`] bridges
//! to it through a tokio watch channel: the transport holds the receiver and
//! forwards whatever was published last.

use std::fmt::Debug;

use tokio::sync::watch;

use crate::service::ViewPayload;

/// Event name pushed after an interactive view request.
pub const CHART_UPDATE_EVENT: &str = "servers-chart-update";

/// Kind of view request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Session {
    /// Initial render; there is nobody to push to yet.
    #[default]
    Initial,
    /// A live session able to receive pushed events.
    Interactive,
}

impl Session {
    pub fn is_interactive(&self) -> bool {
        matches!(self, Session::Interactive)
    }
}

/// Pushes an event with the current view to live viewers.
pub trait ViewerNotifier: Send + Sync + Debug {
    fn notify(&self, event: &str, payload: &ViewPayload);
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl ViewerNotifier for NoopNotifier {
    fn notify(&self, _event: &str, _payload: &ViewPayload) {}
}

/// The last event published by a [`WatchNotifier`].
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub event: String,
    pub payload: ViewPayload,
}

/// Publishes notifications on a watch channel.
///
/// # Example
///
/// ```
/// use fleetwatch::WatchNotifier;
///
/// let (notifier, receiver) = WatchNotifier::create();
/// assert!(receiver.borrow().is_none());
/// # drop(notifier);
/// ```
#[derive(Debug)]
pub struct WatchNotifier {
    sender: watch::Sender<Option<Notification>>,
}

impl WatchNotifier {
    /// Create a notifier together with a receiver for the transport side.
    pub fn create() -> (Self, watch::Receiver<Option<Notification>>) {
        let (sender, receiver) = watch::channel(None);
        (Self { sender }, receiver)
    }

    /// Another receiver for the same notifications.
    pub fn subscribe(&self) -> watch::Receiver<Option<Notification>> {
        self.sender.subscribe()
    }
}

impl ViewerNotifier for WatchNotifier {
    fn notify(&self, event: &str, payload: &ViewPayload) {
        // Succeeds even when no receiver is listening.
        self.sender.send_replace(Some(Notification {
            event: event.to_string(),
            payload: payload.clone(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta};

    fn payload() -> ViewPayload {
        let computed_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        ViewPayload {
            entities: Vec::<fleetwatch_types::ViewRecord>::new().into(),
            computed_at,
            next_recompute_at: computed_at + TimeDelta::seconds(5),
            took: std::time::Duration::from_millis(3),
        }
    }

    #[test]
    fn test_session_default_is_initial() {
        assert_eq!(Session::default(), Session::Initial);
        assert!(!Session::Initial.is_interactive());
        assert!(Session::Interactive.is_interactive());
    }

    #[test]
    fn test_watch_notifier_publishes_latest() {
        let (notifier, mut receiver) = WatchNotifier::create();
        assert!(!receiver.has_changed().unwrap());

        notifier.notify(CHART_UPDATE_EVENT, &payload());

        assert!(receiver.has_changed().unwrap());
        let notification = receiver.borrow_and_update().clone().unwrap();
        assert_eq!(notification.event, "servers-chart-update");
        assert_eq!(notification.payload, payload());
    }

    #[test]
    fn test_watch_notifier_without_receivers() {
        let (notifier, receiver) = WatchNotifier::create();
        drop(receiver);

        notifier.notify(CHART_UPDATE_EVENT, &payload());

        let late = notifier.subscribe();
        assert!(late.borrow().is_some());
    }
}
