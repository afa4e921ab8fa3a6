//! Decoding of remotely delivered integration settings.
//!
//! The host pipeline delivers a nested settings blob keyed by integration name. The plugin only
//! looks at its own entry and silently skips the update when that entry is absent or fails to
//! decode — a malformed remote settings payload must never take the analytics stream down.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The kind of settings update delivered by the host pipeline.
///
/// Only [`UpdateType::Initial`] triggers plugin initialization; refreshes are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateType {
    /// First settings delivery after the pipeline came up.
    Initial,
    /// A periodic refresh of remote settings.
    Refresh,
}

/// The remote settings blob delivered to [`DestinationPlugin::update`](crate::DestinationPlugin::update).
///
/// Integration settings are kept as raw JSON values; each plugin decodes its own entry with
/// [`RemoteSettings::integration_settings`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteSettings {
    /// Per-integration settings, keyed by integration name.
    #[serde(default)]
    pub integrations: HashMap<String, serde_json::Value>,
}

impl RemoteSettings {
    /// Decode the settings entry for the integration identified by `key`.
    ///
    /// Returns `None` when the entry is absent or does not decode into `T`. Decode failures are
    /// logged at debug level and otherwise swallowed.
    pub fn integration_settings<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.integrations.get(key)?;
        serde_json::from_value(raw.clone())
            .map_err(|err| {
                log::debug!(target: "optimizely", "failed to decode settings for {key:?}: {err}");
            })
            .ok()
    }
}

/// Settings controlling the Optimizely destination, decoded from the remote settings blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizelySettings {
    /// Datafile polling interval, in seconds. Passed through to the client; `None` keeps the
    /// client default.
    #[serde(default)]
    pub periodic_download_interval: Option<u64>,
    /// When true, only events carrying a known user id are forwarded. When false, the anonymous
    /// id is used instead of the user id.
    pub track_known_users: bool,
    /// Whether to re-emit decision notifications into the pipeline as `"Experiment Viewed"`
    /// events.
    pub listen: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn remote(value: serde_json::Value) -> RemoteSettings {
        serde_json::from_value(json!({ "integrations": { "Optimizely X": value } })).unwrap()
    }

    #[test]
    fn decodes_full_settings() {
        let settings = remote(json!({
            "periodicDownloadInterval": 300,
            "trackKnownUsers": true,
            "listen": false,
        }));

        assert_eq!(
            settings.integration_settings::<OptimizelySettings>("Optimizely X"),
            Some(OptimizelySettings {
                periodic_download_interval: Some(300),
                track_known_users: true,
                listen: false,
            })
        );
    }

    #[test]
    fn polling_interval_is_optional() {
        let settings = remote(json!({"trackKnownUsers": false, "listen": true}));

        let decoded = settings
            .integration_settings::<OptimizelySettings>("Optimizely X")
            .unwrap();
        assert_eq!(decoded.periodic_download_interval, None);
        assert!(!decoded.track_known_users);
        assert!(decoded.listen);
    }

    #[test]
    fn missing_required_field_is_skipped() {
        let settings = remote(json!({"listen": true}));

        assert_eq!(
            settings.integration_settings::<OptimizelySettings>("Optimizely X"),
            None
        );
    }

    #[test]
    fn unknown_integration_key_is_skipped() {
        let settings = remote(json!({"trackKnownUsers": true, "listen": true}));

        assert_eq!(
            settings.integration_settings::<OptimizelySettings>("Some Other Integration"),
            None
        );
    }

    #[test]
    fn empty_blob_decodes_to_no_integrations() {
        let settings: RemoteSettings = serde_json::from_value(json!({})).unwrap();
        assert!(settings.integrations.is_empty());
    }
}
