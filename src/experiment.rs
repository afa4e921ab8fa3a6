//! The boundary with the feature-experimentation client.
//!
//! The destination plugin talks to the experimentation SDK exclusively through these traits, so
//! the actual client (and the in-memory fakes used in tests) stay interchangeable.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::event::Properties;
use crate::notifications::NotificationCenter;
use crate::Result;

/// A feature-experimentation client.
///
/// Implementations own datafile management, bucketing and decision evaluation; the destination
/// plugin only starts the client, creates user contexts, and wires notification listeners.
#[async_trait::async_trait]
pub trait ExperimentClient: Send + Sync {
    /// Start the client: fetch the datafile and become ready to serve decisions.
    ///
    /// The destination calls this once, on a background thread, after the initial settings
    /// delivery. It is never retried.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClientStart`](crate::Error::ClientStart) when the client cannot reach a
    /// usable state. The destination logs the failure and remains usable; decisions are simply
    /// unavailable.
    async fn start(&self) -> Result<()>;

    /// Create a user context for the given user id.
    ///
    /// Contexts are cheap, standalone handles; creating a new one does not invalidate previously
    /// created contexts.
    fn create_user_context(&self, user_id: &str) -> Arc<dyn UserContext>;

    /// The client's notification center, used to register and remove listeners.
    fn notifications(&self) -> &NotificationCenter;

    /// Snapshot of the currently active project configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationUnavailable`](crate::Error::ConfigurationUnavailable) if no
    /// datafile has been fetched yet.
    fn current_config(&self) -> Result<ProjectConfig>;
}

/// A per-user handle into the experimentation client.
pub trait UserContext: Send + Sync {
    /// The user id this context was created for.
    fn user_id(&self) -> &str;

    /// Forward a conversion event to the experimentation backend.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventForward`](crate::Error::EventForward) when the event cannot be
    /// accepted. The destination logs and swallows this.
    fn track_event(&self, event_key: &str, tags: Option<&Properties>) -> Result<()>;

    /// Evaluate the experiment identified by `key` for this user.
    ///
    /// Evaluation fires the client's decision notification as a side effect, which is the only
    /// reason the destination calls it — the returned [`Decision`] is discarded.
    fn decide(&self, key: &str) -> Decision;
}

/// The outcome of a decide call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    /// Variation the user was bucketed into, if any.
    pub variation_key: Option<String>,
    /// Whether the flag/experiment is enabled for the user.
    pub enabled: bool,
}

/// A snapshot of the client's active project configuration.
///
/// Only the revision is of interest here; it is logged when the datafile changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Datafile revision identifier.
    pub revision: String,
}
