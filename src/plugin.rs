//! The Optimizely Full Stack destination plugin.

use std::sync::{Arc, Mutex, RwLock, Weak};

use serde_json::Value;

use crate::analytics::{AnalyticsSink, DestinationPlugin, NoopAnalyticsSink};
use crate::event::{IdentifyEvent, Properties, TrackEvent};
use crate::experiment::{ExperimentClient, UserContext};
use crate::notifications::ListenerHandle;
use crate::settings::{OptimizelySettings, RemoteSettings, UpdateType};
use crate::Error;

/// Name under which this destination registers with the pipeline and under which its settings
/// are keyed in the remote settings blob.
pub const PLUGIN_KEY: &str = "Optimizely X";

/// Name of the synthesized event re-emitted into the pipeline for every experiment decision.
///
/// Track events carrying this exact name never trigger a decide call, which keeps the decision
/// echo from looping back into another decision.
pub const EXPERIMENT_VIEWED_EVENT: &str = "Experiment Viewed";

/// A destination plugin that bridges the analytics pipeline to an Optimizely Full Stack style
/// experimentation client.
///
/// The plugin forwards identify events as user-context replacement and track events as
/// experimentation conversion events (normalizing a `revenue` property from major to minor
/// currency units along the way), and re-emits experiment decisions into the pipeline as
/// [`EXPERIMENT_VIEWED_EVENT`] track events.
///
/// All failures at the experimentation boundary are logged and swallowed; the plugin never
/// disrupts the host analytics stream.
///
/// # Examples
/// ```no_run
/// # use std::sync::Arc;
/// # use segment_optimizely_fullstack::{ExperimentClient, OptimizelyDestination, Properties};
/// # fn test(client: Arc<dyn ExperimentClient>) {
/// let destination = OptimizelyDestination::new(client, "checkout-experiment")
///     .analytics(|event: &str, properties: Properties| {
///         println!("{event}: {properties:?}");
///     });
/// # }
/// ```
pub struct OptimizelyDestination {
    client: Arc<dyn ExperimentClient>,
    experiment_key: String,
    analytics: Arc<dyn AnalyticsSink>,
    settings: RwLock<Option<OptimizelySettings>>,
    // At most one active user context at a time; replaced on every identify and on every track
    // that resolves an effective user id.
    user_context: Mutex<Option<Arc<dyn UserContext>>>,
    listeners: Mutex<Vec<ListenerHandle>>,
}

impl OptimizelyDestination {
    /// Create a new destination around the given experimentation client.
    ///
    /// `experiment_key` is the experiment evaluated (for its notification side effect) after
    /// every forwarded track event. Until [`OptimizelyDestination::analytics`] is called,
    /// decision echoes are dropped.
    pub fn new(
        client: Arc<dyn ExperimentClient>,
        experiment_key: impl Into<String>,
    ) -> OptimizelyDestination {
        OptimizelyDestination {
            client,
            experiment_key: experiment_key.into(),
            analytics: Arc::new(NoopAnalyticsSink),
            settings: RwLock::new(None),
            user_context: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Set the sink through which `"Experiment Viewed"` events are emitted back into the
    /// pipeline.
    pub fn analytics(mut self, analytics: impl AnalyticsSink + 'static) -> OptimizelyDestination {
        self.analytics = Arc::new(analytics);
        self
    }

    /// Currently active settings, if the initial settings delivery has happened.
    pub fn settings(&self) -> Option<OptimizelySettings> {
        self.settings
            .read()
            .expect("thread holding settings lock should not panic")
            .clone()
    }

    fn register_listeners(&self, settings: &OptimizelySettings) {
        let notifications = self.client.notifications();
        let mut handles = self
            .listeners
            .lock()
            .expect("thread holding listener lock should not panic");

        if settings.listen {
            let analytics = Arc::clone(&self.analytics);
            handles.push(notifications.add_decision_listener(Box::new(move |notification| {
                let mut properties = Properties::new();
                properties.insert(
                    "type".to_owned(),
                    Value::String(notification.decision_type.clone()),
                );
                properties.insert(
                    "userId".to_owned(),
                    Value::String(notification.user_id.clone()),
                );
                properties.insert(
                    "attributes".to_owned(),
                    Value::String(flatten_pairs(&notification.attributes)),
                );
                properties.insert(
                    "decisionInfo".to_owned(),
                    Value::String(flatten_pairs(&notification.decision_info)),
                );
                analytics.track(EXPERIMENT_VIEWED_EVENT, properties);
            })));
        }

        handles.push(notifications.add_track_listener(Box::new(|notification| {
            log::debug!(
                target: "optimizely",
                "received track notification: {} for user {}",
                notification.event_key,
                notification.user_id,
            );
        })));

        // A weak reference keeps the listener from pinning the client alive through its own
        // notification center.
        let client = Arc::downgrade(&self.client);
        handles.push(notifications.add_datafile_listener(Box::new(move || {
            datafile_changed(&client);
        })));
    }

    // Fire-and-forget client startup. `update` returns immediately; identify/track calls that
    // arrive before startup completes may not produce decisions.
    fn start_client_async(&self) {
        let client = Arc::clone(&self.client);
        let spawned = std::thread::Builder::new()
            .name("optimizely-init".to_owned())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        let err = Error::from(err);
                        log::warn!(target: "optimizely", "failed to build init runtime: {err}");
                        return;
                    }
                };

                match runtime.block_on(client.start()) {
                    Ok(()) => {
                        log::info!(target: "optimizely", "experimentation client started");
                    }
                    Err(err) => {
                        log::warn!(target: "optimizely", "experimentation client failed to start: {err}");
                    }
                }
            });

        if let Err(err) = spawned {
            log::warn!(target: "optimizely", "failed to spawn init thread: {err}");
        }
    }

    fn replace_user_context(&self, context: Arc<dyn UserContext>) {
        let mut slot = self
            .user_context
            .lock()
            .expect("thread holding user context lock should not panic");
        *slot = Some(context);
    }
}

impl DestinationPlugin for OptimizelyDestination {
    fn key(&self) -> &str {
        PLUGIN_KEY
    }

    fn update(&self, settings: &RemoteSettings, update_type: UpdateType) {
        if update_type != UpdateType::Initial {
            return;
        }

        let Some(decoded) = settings.integration_settings::<OptimizelySettings>(PLUGIN_KEY) else {
            log::debug!(target: "optimizely", "no usable settings for {PLUGIN_KEY:?}, skipping initialization");
            return;
        };

        {
            let mut slot = self
                .settings
                .write()
                .expect("thread holding settings lock should not panic");
            *slot = Some(decoded.clone());
        }

        self.register_listeners(&decoded);
        self.start_client_async();
    }

    fn identify(&self, event: IdentifyEvent) -> IdentifyEvent {
        if let Some(user_id) = &event.user_id {
            let context = self.client.create_user_context(user_id);
            self.replace_user_context(context);
        }

        event
    }

    fn track(&self, event: TrackEvent) -> TrackEvent {
        let track_known_users = self.settings().map(|settings| settings.track_known_users);

        // Mutations apply to the forwarded copy only; the pipeline gets the event back untouched.
        let mut forwarded = event.clone();
        if let Some(properties) = forwarded.properties.as_mut() {
            if let Some(cents) = properties.get("revenue").and_then(revenue_in_cents) {
                properties.insert("revenue".to_owned(), Value::from(cents));
            }
        }

        let mut user_id = event.user_id.clone();

        if user_id.is_none() && track_known_users == Some(true) {
            log::warn!(
                target: "optimizely",
                "only events with a userId are forwarded while trackKnownUsers is enabled",
            );
        }

        if track_known_users == Some(false) {
            user_id = event.anonymous_id.clone();
        }

        if let Some(user_id) = user_id {
            let context = self.client.create_user_context(&user_id);
            self.replace_user_context(Arc::clone(&context));

            if let Err(err) = context.track_event(&forwarded.event, forwarded.properties.as_ref())
            {
                log::warn!(
                    target: "optimizely",
                    "failed to forward {:?} for user {user_id:?}: {err}",
                    forwarded.event,
                );
            }

            if event.event != EXPERIMENT_VIEWED_EVENT {
                let _ = context.decide(&self.experiment_key);
            }
        }

        event
    }

    fn reset(&self) {
        let handles: Vec<ListenerHandle> = self
            .listeners
            .lock()
            .expect("thread holding listener lock should not panic")
            .drain(..)
            .collect();

        let notifications = self.client.notifications();
        for handle in handles {
            notifications.remove_listener(handle);
        }
        // The stored user context is intentionally left in place; reset only unwires
        // notification listeners.
    }
}

/// Convert a `revenue` property from major to minor currency units.
///
/// Integer revenue is multiplied by 100; floating-point revenue is multiplied by 100 and
/// truncated toward zero. Returns `None` for non-numeric values, leaving the property untouched.
fn revenue_in_cents(revenue: &Value) -> Option<i64> {
    let Value::Number(number) = revenue else {
        return None;
    };
    if let Some(units) = number.as_i64() {
        Some(units.saturating_mul(100))
    } else {
        number.as_f64().map(|units| (units * 100.0) as i64)
    }
}

/// Flatten a property map into `"k=v"` pairs joined by `;`.
fn flatten_pairs(map: &Properties) -> String {
    map.iter()
        .map(|(key, value)| match value {
            Value::String(s) => format!("{key}={s}"),
            other => format!("{key}={other}"),
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn datafile_changed(client: &Weak<dyn ExperimentClient>) {
    let Some(client) = client.upgrade() else {
        return;
    };
    match client.current_config() {
        Ok(config) => {
            log::debug!(target: "optimizely", "datafile changed, revision = {}", config.revision);
        }
        Err(err) => {
            log::debug!(target: "optimizely", "datafile changed but config is unavailable: {err}");
        }
    }
}
