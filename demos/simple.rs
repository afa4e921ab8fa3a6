use std::sync::Arc;

use segment_optimizely_fullstack::{
    Decision, DecisionNotification, DestinationPlugin, ExperimentClient, IdentifyEvent,
    NotificationCenter, OptimizelyDestination, ProjectConfig, Properties, RemoteSettings,
    TrackEvent, UpdateType, UserContext,
};

/// A tiny in-memory experimentation client: every decide call buckets the user into
/// "treatment" and fires a decision notification.
#[derive(Default)]
struct DemoClient {
    notifications: NotificationCenter,
}

struct DemoContext {
    user_id: String,
    client: Arc<DemoClient>,
}

/// Local wrapper so the library trait can be implemented for a shared client
/// without violating the orphan rule.
struct DemoHandle(Arc<DemoClient>);

#[async_trait::async_trait]
impl ExperimentClient for DemoHandle {
    async fn start(&self) -> segment_optimizely_fullstack::Result<()> {
        Ok(())
    }

    fn create_user_context(&self, user_id: &str) -> Arc<dyn UserContext> {
        Arc::new(DemoContext {
            user_id: user_id.to_owned(),
            client: Arc::clone(&self.0),
        })
    }

    fn notifications(&self) -> &NotificationCenter {
        &self.0.notifications
    }

    fn current_config(&self) -> segment_optimizely_fullstack::Result<ProjectConfig> {
        Ok(ProjectConfig {
            revision: "1".to_owned(),
        })
    }
}

impl UserContext for DemoContext {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn track_event(
        &self,
        event_key: &str,
        tags: Option<&Properties>,
    ) -> segment_optimizely_fullstack::Result<()> {
        println!("tracked {event_key:?} for {:?} with tags {tags:?}", self.user_id);
        Ok(())
    }

    fn decide(&self, key: &str) -> Decision {
        self.client.notifications.emit_decision(&DecisionNotification {
            decision_type: "ab-test".to_owned(),
            user_id: self.user_id.clone(),
            attributes: Properties::new(),
            decision_info: [
                ("experiment".to_owned(), key.into()),
                ("variation".to_owned(), "treatment".into()),
            ]
            .into_iter()
            .collect(),
        });
        Decision {
            variation_key: Some("treatment".to_owned()),
            enabled: true,
        }
    }
}

pub fn main() {
    // Configure env_logger to see plugin logs.
    env_logger::Builder::from_env(env_logger::Env::new().default_filter_or("optimizely")).init();

    let client = Arc::new(DemoClient::default());
    let destination = OptimizelyDestination::new(Arc::new(DemoHandle(client)), "checkout-experiment")
        .analytics(|event: &str, properties: Properties| {
            println!("re-emitted {event:?}: {properties:?}");
        });

    // Remote settings as the pipeline would deliver them on startup.
    let settings: RemoteSettings = serde_json::from_str(
        r#"{
            "integrations": {
                "Optimizely X": { "trackKnownUsers": true, "listen": true }
            }
        }"#,
    )
    .expect("settings blob should be valid JSON");
    destination.update(&settings, UpdateType::Initial);

    destination.identify(IdentifyEvent {
        user_id: Some("user-1".to_owned()),
        ..IdentifyEvent::default()
    });

    let mut purchase = TrackEvent::new("Purchase");
    purchase.user_id = Some("user-1".to_owned());
    purchase.properties = Some(
        [("revenue".to_owned(), 10.into())]
            .into_iter()
            .collect::<Properties>(),
    );
    destination.track(purchase);

    // Give the background init thread a moment to log its outcome.
    std::thread::sleep(std::time::Duration::from_millis(100));
}
