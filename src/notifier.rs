//! Webhook delivery for alerts
//!
//! Delivery is fire-and-log: a failing webhook endpoint never blocks or
//! fails the alert pipeline, since the alert record itself is already the
//! source of truth.

use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tracing::{error, info, instrument};

use crate::{Alert, AlertKind};

#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client"),
            url,
        }
    }

    /// POST one alert to the configured webhook
    #[instrument(skip(self, alert), fields(alert_id = alert.id))]
    pub async fn notify(&self, alert: &Alert) {
        let payload = json!({
            "message": alert.message,
            "device_id": alert.device_id,
            "kind": match alert.kind {
                AlertKind::Down => "down",
                AlertKind::Recovery => "recovery",
            },
            "timestamp": alert.created_at.to_rfc3339(),
        });

        match self.client.post(&self.url).json(&payload).send().await {
            Ok(response) => {
                if response.status().is_success() {
                    info!("delivered alert #{} to webhook", alert.id);
                } else {
                    error!(
                        "webhook rejected alert #{} with status {}",
                        alert.id,
                        response.status()
                    );
                }
            }
            Err(e) => {
                error!("failed to deliver alert #{}: {e}", alert.id);
            }
        }
    }
}
