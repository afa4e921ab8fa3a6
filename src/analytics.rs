//! The boundary with the host analytics pipeline.

use crate::event::{IdentifyEvent, Properties, TrackEvent};
use crate::settings::{RemoteSettings, UpdateType};

/// A destination-type pipeline plugin.
///
/// The host pipeline drives plugins through this trait: it delivers remote settings updates,
/// passes every identify/track event through and expects it back (destinations observe events,
/// they do not filter them), and calls [`reset`](DestinationPlugin::reset) on user logout.
pub trait DestinationPlugin: Send + Sync {
    /// Fixed name under which this plugin is registered and keyed in remote settings.
    fn key(&self) -> &str;

    /// Called when remote settings are delivered or refreshed.
    fn update(&self, settings: &RemoteSettings, update_type: UpdateType);

    /// Called for every identify event. Must return the event so it continues through the
    /// pipeline.
    fn identify(&self, event: IdentifyEvent) -> IdentifyEvent;

    /// Called for every track event. Must return the event so it continues through the pipeline.
    fn track(&self, event: TrackEvent) -> TrackEvent;

    /// Called on user logout to clear plugin-held state.
    fn reset(&self);
}

/// A handle for emitting synthesized track events back into the host pipeline.
///
/// The destination uses this to re-publish experiment decisions as `"Experiment Viewed"` events.
///
/// ```no_run
/// # use segment_optimizely_fullstack::{AnalyticsSink, Properties};
/// struct MyPipeline;
///
/// impl AnalyticsSink for MyPipeline {
///     fn track(&self, event: &str, properties: Properties) {
///         // Enqueue the event into the pipeline here
///     }
/// }
/// ```
///
/// # Errors
///
/// This method should not return errors and should not panic. Failures that occur while emitting
/// should be handled internally within the implementation.
pub trait AnalyticsSink: Send + Sync {
    /// Emits a track event with the given name and properties into the pipeline.
    fn track(&self, event: &str, properties: Properties);
}

pub(crate) struct NoopAnalyticsSink;
impl AnalyticsSink for NoopAnalyticsSink {
    fn track(&self, _event: &str, _properties: Properties) {}
}

impl<T: Fn(&str, Properties) + Send + Sync> AnalyticsSink for T {
    fn track(&self, event: &str, properties: Properties) {
        self(event, properties);
    }
}
