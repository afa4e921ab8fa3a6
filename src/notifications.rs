//! A thread-safe notification center for experimentation client events.
//!
//! The experimentation client fires three kinds of notifications: decision (an experiment was
//! evaluated for a user), track (a conversion event was forwarded), and datafile-change (a new
//! project configuration became active). [`NotificationCenter`] is the registry that client
//! implementations emit through and that the destination plugin registers its listeners with.
//!
//! Registration returns a [`ListenerHandle`] so that callers can later remove exactly the
//! listeners they added, rather than wiping the whole registry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::event::Properties;

/// A decision notification payload: an experiment was evaluated for a user.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionNotification {
    /// Kind of decision, e.g. `"flag"` or `"ab-test"`.
    pub decision_type: String,
    /// The user the decision was made for.
    pub user_id: String,
    /// Attributes of the user at decision time.
    pub attributes: Properties,
    /// Decision metadata (experiment key, variation key, ...).
    pub decision_info: Properties,
}

/// A track notification payload: a conversion event reached the experimentation backend.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackNotification {
    /// Key of the tracked event.
    pub event_key: String,
    /// The user the event was tracked for.
    pub user_id: String,
    /// Event tags, if any were attached.
    pub tags: Option<Properties>,
}

/// A listener for decision notifications.
pub type DecisionListener = Box<dyn Fn(&DecisionNotification) + Send + Sync>;
/// A listener for track notifications.
pub type TrackListener = Box<dyn Fn(&TrackNotification) + Send + Sync>;
/// A listener for datafile-change notifications.
pub type DatafileListener = Box<dyn Fn() + Send + Sync>;

/// Identifies a registered listener so it can be removed later.
///
/// Handles are unique across all listener kinds for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

fn next_handle() -> ListenerHandle {
    ListenerHandle(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
}

/// A thread-safe (`Sync`) registry of notification listeners.
///
/// Listeners are invoked in registration order and without the registry lock held, so a listener
/// may safely call back into the center (e.g., to register or remove listeners).
#[derive(Default)]
pub struct NotificationCenter {
    decision: Mutex<Vec<(ListenerHandle, Arc<DecisionListener>)>>,
    track: Mutex<Vec<(ListenerHandle, Arc<TrackListener>)>>,
    datafile: Mutex<Vec<(ListenerHandle, Arc<DatafileListener>)>>,
}

impl NotificationCenter {
    /// Create a new empty notification center.
    pub fn new() -> NotificationCenter {
        NotificationCenter::default()
    }

    /// Register a listener for decision notifications.
    pub fn add_decision_listener(&self, listener: DecisionListener) -> ListenerHandle {
        let handle = next_handle();
        self.decision
            .lock()
            .expect("thread holding listener lock should not panic")
            .push((handle, Arc::new(listener)));
        handle
    }

    /// Register a listener for track notifications.
    pub fn add_track_listener(&self, listener: TrackListener) -> ListenerHandle {
        let handle = next_handle();
        self.track
            .lock()
            .expect("thread holding listener lock should not panic")
            .push((handle, Arc::new(listener)));
        handle
    }

    /// Register a listener for datafile-change notifications.
    pub fn add_datafile_listener(&self, listener: DatafileListener) -> ListenerHandle {
        let handle = next_handle();
        self.datafile
            .lock()
            .expect("thread holding listener lock should not panic")
            .push((handle, Arc::new(listener)));
        handle
    }

    /// Remove the listener identified by `handle`, whatever its kind.
    ///
    /// Returns whether a listener was actually removed. Removing an unknown (or already removed)
    /// handle is a no-op.
    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        fn remove<T: ?Sized>(
            listeners: &Mutex<Vec<(ListenerHandle, Arc<T>)>>,
            handle: ListenerHandle,
        ) -> bool {
            let mut listeners = listeners
                .lock()
                .expect("thread holding listener lock should not panic");
            let before = listeners.len();
            listeners.retain(|(h, _)| *h != handle);
            listeners.len() != before
        }

        remove(&self.decision, handle) || remove(&self.track, handle) || remove(&self.datafile, handle)
    }

    /// Remove all registered listeners of all kinds.
    pub fn clear_all(&self) {
        self.decision
            .lock()
            .expect("thread holding listener lock should not panic")
            .clear();
        self.track
            .lock()
            .expect("thread holding listener lock should not panic")
            .clear();
        self.datafile
            .lock()
            .expect("thread holding listener lock should not panic")
            .clear();
    }

    /// Deliver a decision notification to all decision listeners.
    pub fn emit_decision(&self, notification: &DecisionNotification) {
        for listener in self.snapshot(&self.decision) {
            (*listener)(notification);
        }
    }

    /// Deliver a track notification to all track listeners.
    pub fn emit_track(&self, notification: &TrackNotification) {
        for listener in self.snapshot(&self.track) {
            (*listener)(notification);
        }
    }

    /// Deliver a datafile-change notification to all datafile listeners.
    pub fn emit_datafile_change(&self) {
        for listener in self.snapshot(&self.datafile) {
            (*listener)();
        }
    }

    // Listeners are cloned out under the lock and invoked after it is released.
    fn snapshot<T: ?Sized>(&self, listeners: &Mutex<Vec<(ListenerHandle, Arc<T>)>>) -> Vec<Arc<T>> {
        listeners
            .lock()
            .expect("thread holding listener lock should not panic")
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    fn decision() -> DecisionNotification {
        DecisionNotification {
            decision_type: "ab-test".to_owned(),
            user_id: "u1".to_owned(),
            attributes: Properties::new(),
            decision_info: Properties::new(),
        }
    }

    #[test]
    fn emits_to_registered_listeners_in_order() {
        let center = NotificationCenter::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            center.add_decision_listener(Box::new(move |_| {
                seen.lock().unwrap().push(tag);
            }));
        }

        center.emit_decision(&decision());

        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn removed_listener_no_longer_fires() {
        let center = NotificationCenter::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let handle = {
            let calls = Arc::clone(&calls);
            center.add_decision_listener(Box::new(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            }))
        };

        center.emit_decision(&decision());
        assert!(center.remove_listener(handle));
        center.emit_decision(&decision());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_unknown_handle_is_noop() {
        let center = NotificationCenter::new();
        let handle = center.add_track_listener(Box::new(|_| {}));

        assert!(center.remove_listener(handle));
        assert!(!center.remove_listener(handle));
    }

    #[test]
    fn removal_only_affects_the_targeted_listener() {
        let center = NotificationCenter::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = {
            let calls = Arc::clone(&calls);
            center.add_datafile_listener(Box::new(move || {
                calls.fetch_add(1, Ordering::SeqCst);
            }))
        };
        {
            let calls = Arc::clone(&calls);
            center.add_datafile_listener(Box::new(move || {
                calls.fetch_add(10, Ordering::SeqCst);
            }));
        }

        center.remove_listener(first);
        center.emit_datafile_change();

        assert_eq!(calls.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn clear_all_removes_every_kind() {
        let center = NotificationCenter::new();
        let calls = Arc::new(AtomicUsize::new(0));

        {
            let calls = Arc::clone(&calls);
            center.add_decision_listener(Box::new(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            }));
        }
        {
            let calls = Arc::clone(&calls);
            center.add_track_listener(Box::new(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            }));
        }
        {
            let calls = Arc::clone(&calls);
            center.add_datafile_listener(Box::new(move || {
                calls.fetch_add(1, Ordering::SeqCst);
            }));
        }

        center.clear_all();
        center.emit_decision(&decision());
        center.emit_track(&TrackNotification {
            event_key: "Purchase".to_owned(),
            user_id: "u1".to_owned(),
            tags: None,
        });
        center.emit_datafile_change();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listener_may_reenter_the_center() {
        let center = Arc::new(NotificationCenter::new());
        let inner_calls = Arc::new(AtomicUsize::new(0));

        {
            let center = Arc::clone(&center);
            let inner_calls = Arc::clone(&inner_calls);
            center.clone().add_decision_listener(Box::new(move |_| {
                // Registering from inside a callback must not deadlock.
                let inner_calls = Arc::clone(&inner_calls);
                center.add_decision_listener(Box::new(move |_| {
                    inner_calls.fetch_add(1, Ordering::SeqCst);
                }));
            }));
        }

        center.emit_decision(&decision());
        center.emit_decision(&decision());

        // The listener registered during the first emission fires on the second.
        assert_eq!(inner_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn emission_with_no_listeners_is_noop() {
        let center = NotificationCenter::new();
        center.emit_decision(&decision());
        center.emit_datafile_change();
    }
}
