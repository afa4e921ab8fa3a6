//! A Segment-style destination plugin that bridges an analytics event pipeline to an Optimizely
//! Full Stack style feature-experimentation client.
//!
//! # Overview
//!
//! The crate revolves around [`OptimizelyDestination`], a destination plugin driven by the host
//! pipeline through the [`DestinationPlugin`] trait. On the initial remote settings delivery it
//! decodes [`OptimizelySettings`], registers notification listeners, and starts the
//! experimentation client in the background. From then on it forwards identify events as
//! user-context replacement and track events as experimentation conversion events, and re-emits
//! experiment decisions back into the pipeline as `"Experiment Viewed"` track events.
//!
//! The experimentation client itself is behind the [`ExperimentClient`] and [`UserContext`]
//! traits; the host pipeline's outward surface is behind [`AnalyticsSink`]:
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use segment_optimizely_fullstack::{ExperimentClient, OptimizelyDestination, Properties};
//! # fn test(client: Arc<dyn ExperimentClient>) {
//! let destination = OptimizelyDestination::new(client, "checkout-experiment")
//!     .analytics(|event: &str, properties: Properties| {
//!         println!("re-emitting {event}: {properties:?}");
//!     });
//! # }
//! ```
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum, but never reach the host pipeline: settings
//! decode failures skip initialization, a failed client start is logged and not retried, and
//! per-event forwarding failures are logged and swallowed. A best-effort telemetry bridge must
//! not disrupt the analytics stream it is attached to.
//!
//! # Logging
//!
//! The crate uses the [`log`](https://docs.rs/log/latest/log/) crate (target `"optimizely"`) for
//! all diagnostics, including every swallowed failure. Consider integrating a `log`-compatible
//! logger implementation for visibility into plugin operations.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

mod analytics;
mod error;
mod event;
mod experiment;
mod notifications;
mod plugin;
mod settings;

pub use analytics::{AnalyticsSink, DestinationPlugin};
pub use error::{Error, Result};
pub use event::{IdentifyEvent, Properties, TrackEvent};
pub use experiment::{Decision, ExperimentClient, ProjectConfig, UserContext};
pub use notifications::{
    DatafileListener, DecisionListener, DecisionNotification, ListenerHandle, NotificationCenter,
    TrackListener, TrackNotification,
};
pub use plugin::{OptimizelyDestination, EXPERIMENT_VIEWED_EVENT, PLUGIN_KEY};
pub use settings::{OptimizelySettings, RemoteSettings, UpdateType};
